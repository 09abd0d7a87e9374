pub mod config;
pub mod identity;
pub mod jwt;
pub mod login;
pub mod middleware;

pub use config::JwtConfig;
pub use identity::{IdentityResolver, LocalIdentity, ResolvedIdentity};
pub use jwt::{JwtService, JwtServiceImpl, SessionClaims};
pub use login::{LoginOutcome, LoginService, LoginSettings, LoginStage};
pub use middleware::{CurrentMember, extract_bearer, session_auth_middleware};
