pub mod login_attempts;
pub mod session;
pub mod transaction;
pub mod user;
