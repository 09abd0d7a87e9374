pub mod auth;
pub mod health;
pub mod members;

pub use auth::create_auth_routes;
pub use health::create_health_routes;
pub use members::create_member_routes;
