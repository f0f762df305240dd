pub mod flash;
pub mod session_auth;

pub use flash::FlashMessage;
pub use session_auth::{current_user, require_login, require_superuser};
