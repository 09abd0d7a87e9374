pub mod members;

pub use members::Entity as Members;
pub use members::NewMember;

// Type aliases
pub type MemberRecord = members::Model;
pub type AccountId = i32;
