pub mod auth;
pub mod two_fa;

pub use auth::{login, login_with_backup_code, login_with_totp, logout, me, refresh_token, register};
pub use two_fa::{disable_two_factor, enable_two_factor, verify_two_factor};
