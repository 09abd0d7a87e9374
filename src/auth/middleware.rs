use crate::database::entities::MemberRecord;
use crate::error::AppError;
use crate::server::Server;
use crate::utils::RequestIdExt;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::{trace, warn};

/// Token from an `Authorization: Bearer <token>` header, if well formed
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Requires a live session token; puts the member record and its claims
/// into request extensions.
pub async fn session_auth_middleware(
    State(server): State<Server>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let request_id = request.extensions().request_id();
    let token = extract_bearer(request.headers()).ok_or_else(|| {
        AppError::Unauthorized("Missing or malformed Authorization header".to_string())
    })?;

    let claims = server.jwt_service.validate(token)?;

    let member = server
        .database
        .members()
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(account_id = claims.sub, %request_id, "Session for unknown member");
            AppError::Unauthorized("Member not found".to_string())
        })?;

    trace!(account_id = member.id, %request_id, "Session authenticated");

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(member);

    Ok(next.run(request).await)
}

/// Member placed in extensions by [`session_auth_middleware`]
pub struct CurrentMember(pub MemberRecord);

impl<S> FromRequestParts<S> for CurrentMember
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<MemberRecord>()
            .cloned()
            .map(CurrentMember)
            .ok_or_else(|| AppError::Unauthorized("Missing member authentication".to_string()))
    }
}
