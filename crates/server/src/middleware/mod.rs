pub mod session_auth;

pub use session_auth::{get_current_user, require_auth};
