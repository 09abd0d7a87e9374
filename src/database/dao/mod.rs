pub mod members;

pub use members::MembersDao;
