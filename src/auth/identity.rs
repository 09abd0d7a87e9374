use crate::database::DatabaseManager;
use crate::database::entities::{AccountId, NewMember};
use crate::error::AppError;
use std::sync::Arc;
use tracing::{debug, info};

/// Local member resolved from a provider email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    pub account_id: AccountId,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub identity: LocalIdentity,
    /// True when this call created the member
    pub created: bool,
}

/// Maps a provider email onto exactly one member, creating it on first
/// sight. Safe to call concurrently for the same email: the loser of an
/// insert race re-reads the winner's row.
pub struct IdentityResolver {
    database: Arc<dyn DatabaseManager>,
}

impl IdentityResolver {
    pub fn new(database: Arc<dyn DatabaseManager>) -> Self {
        Self { database }
    }

    pub async fn resolve(
        &self,
        email: &str,
        display_name: &str,
        avatar_url: Option<&str>,
    ) -> Result<ResolvedIdentity, AppError> {
        let members = self.database.members();

        if let Some(existing) = members.find_by_email(email).await? {
            debug!(account_id = existing.id, "Resolved existing member");
            return Ok(ResolvedIdentity {
                identity: LocalIdentity {
                    account_id: existing.id,
                    email: existing.email,
                    display_name: existing.display_name,
                },
                created: false,
            });
        }

        let new_member = NewMember::new(email, display_name).with_profile_image(avatar_url);
        if let Some(account_id) = members.insert_if_absent(&new_member).await? {
            info!(account_id, "Created member on first login");
            return Ok(ResolvedIdentity {
                identity: LocalIdentity {
                    account_id,
                    email: new_member.email,
                    display_name: new_member.display_name,
                },
                created: true,
            });
        }

        // Lost the insert race; the row now exists
        let winner = members.find_by_email(email).await?.ok_or_else(|| {
            AppError::Internal(format!("member for {email} vanished after insert conflict"))
        })?;
        debug!(account_id = winner.id, "Insert conflict, using existing member");

        Ok(ResolvedIdentity {
            identity: LocalIdentity {
                account_id: winner.id,
                email: winner.email,
                display_name: winner.display_name,
            },
            created: false,
        })
    }
}
