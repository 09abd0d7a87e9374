use crate::Config;
use crate::database::migration::Migrator;
use crate::database::{DatabaseManager, DatabaseManagerImpl};
use clap::Subcommand;
use sea_orm_migration::MigratorTrait;
use tracing::info;

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum MigrateAction {
    /// Apply pending migrations
    Up,
    /// Roll back applied migrations
    Down {
        #[arg(short, long, default_value = "1")]
        steps: u32,
    },
    /// List applied and pending migrations
    Status,
}

pub async fn handle_migrate_command(
    action: MigrateAction,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let database = DatabaseManagerImpl::new_from_config(config).await?;
    let connection = database.connection();

    match action {
        MigrateAction::Up => {
            database.migrate().await?;
        }
        MigrateAction::Down { steps } => {
            info!(steps, "Rolling back migrations");
            Migrator::down(connection, Some(steps)).await?;
            info!("Rollback completed");
        }
        MigrateAction::Status => {
            for migration in Migrator::get_applied_migrations(connection).await? {
                println!("applied  {}", migration.name());
            }
            for migration in Migrator::get_pending_migrations(connection).await? {
                println!("pending  {}", migration.name());
            }
        }
    }

    Ok(())
}
