// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const LOGIN_SUCCEEDED: &str = "auth.login.succeeded";
pub const LOGIN_FAILED: &str = "auth.login.failed";
pub const REFRESH_SUCCEEDED: &str = "auth.refresh.succeeded";
pub const REFRESH_REJECTED: &str = "auth.refresh.rejected";
pub const LOGOUT: &str = "auth.logout";
pub const PASSWORD_CHANGED: &str = "auth.password.changed";
pub const GATE_REJECTED: &str = "auth.gate.rejected";
