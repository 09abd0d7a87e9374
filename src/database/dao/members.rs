use crate::database::entities::{AccountId, MemberRecord, NewMember, members};
use crate::database::{DatabaseError, DatabaseResult};
use chrono::Utc;
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set, SqlErr, sea_query::OnConflict,
};

/// Members DAO for database operations
#[derive(Clone)]
pub struct MembersDao {
    db: DatabaseConnection,
}

impl MembersDao {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a member unless one with the same email already exists.
    ///
    /// Returns the new id, or `None` when the email was taken, including
    /// by a concurrent insert that won the race.
    pub async fn insert_if_absent(&self, member: &NewMember) -> DatabaseResult<Option<AccountId>> {
        let now = Utc::now();
        let active_model = members::ActiveModel {
            id: ActiveValue::NotSet,
            email: Set(member.email.clone()),
            display_name: Set(member.display_name.clone()),
            profile_image: Set(member.profile_image.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let on_conflict = OnConflict::column(members::Column::Email)
            .do_nothing()
            .to_owned();

        let result = members::Entity::insert(active_model)
            .on_conflict(on_conflict)
            .exec(&self.db)
            .await;

        match result {
            Ok(inserted) => Ok(Some(inserted.last_insert_id)),
            Err(DbErr::RecordNotInserted) => Ok(None),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(None)
            }
            Err(err) => Err(DatabaseError::Database(err.to_string())),
        }
    }

    /// Find member by email
    pub async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<MemberRecord>> {
        let member = members::Entity::find()
            .filter(members::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(member)
    }

    /// Find member by ID
    pub async fn find_by_id(&self, account_id: AccountId) -> DatabaseResult<Option<MemberRecord>> {
        let member = members::Entity::find_by_id(account_id)
            .one(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(member)
    }

    pub async fn count_by_email(&self, email: &str) -> DatabaseResult<u64> {
        members::Entity::find()
            .filter(members::Column::Email.eq(email))
            .count(&self.db)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use crate::database::{DatabaseManager, DatabaseManagerImpl};
    use crate::database::entities::NewMember;

    async fn migrated_db() -> DatabaseManagerImpl {
        let db = DatabaseManagerImpl::connect("sqlite::memory:", 1).await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let db = migrated_db().await;
        let dao = db.members();

        let member = NewMember::new("a@x.com", "Alice")
            .with_profile_image(Some("https://img.example/a.png"));
        let id = dao.insert_if_absent(&member).await.unwrap().unwrap();

        let by_email = dao.find_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, id);
        assert_eq!(by_email.display_name, "Alice");
        assert_eq!(
            by_email.profile_image.as_deref(),
            Some("https://img.example/a.png")
        );

        let by_id = dao.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_insert_conflict_returns_none() {
        let db = migrated_db().await;
        let dao = db.members();

        let first = dao
            .insert_if_absent(&NewMember::new("dup@x.com", "First"))
            .await
            .unwrap();
        assert!(first.is_some());

        let second = dao
            .insert_if_absent(&NewMember::new("dup@x.com", "Second"))
            .await
            .unwrap();
        assert!(second.is_none());

        // First write wins
        let stored = dao.find_by_email("dup@x.com").await.unwrap().unwrap();
        assert_eq!(stored.display_name, "First");
        assert_eq!(dao.count_by_email("dup@x.com").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_missing_member() {
        let db = migrated_db().await;
        let dao = db.members();

        assert!(dao.find_by_email("nobody@x.com").await.unwrap().is_none());
        assert!(dao.find_by_id(999).await.unwrap().is_none());
    }
}
