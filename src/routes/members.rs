use crate::{
    api_response::ApiResponse, auth::CurrentMember, database::entities::AccountId,
    error::AppError, server::Server,
};
use axum::{Json, Router, extract::State, routing::get};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberProfile {
    pub account_id: AccountId,
    pub email: String,
    pub display_name: String,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Whether a live Kakao credential is cached; `None` when the cache
    /// could not be asked
    pub provider_linked: Option<bool>,
}

/// Routes that require a session; the caller layers the auth middleware
pub fn create_member_routes() -> Router<Server> {
    Router::new().route("/me", get(me_handler))
}

pub async fn me_handler(
    State(server): State<Server>,
    CurrentMember(member): CurrentMember,
) -> Result<Json<ApiResponse<MemberProfile>>, AppError> {
    let provider_linked = match server.credential_cache.get(member.id).await {
        Ok(token) => Some(token.is_some()),
        Err(err) => {
            warn!(account_id = member.id, error = %err, "Credential cache degraded");
            None
        }
    };

    let profile = MemberProfile {
        account_id: member.id,
        email: member.email,
        display_name: member.display_name,
        profile_image: member.profile_image,
        created_at: member.created_at,
        provider_linked,
    };

    Ok(Json(ApiResponse::success(profile, "member profile")))
}
