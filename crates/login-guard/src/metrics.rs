// ==============
// aidlink-login-guard/src/metrics.rs

//! Central place for login-limiter metric keys
pub const FAILURES_RECORDED: &str = "login_limiter.failures_recorded";
pub const LOCKOUTS_TRIGGERED: &str = "login_limiter.lockouts_triggered";
pub const RECORDS_SWEPT: &str = "login_limiter.records_swept";
pub const TRACKED_IDENTIFIERS: &str = "login_limiter.tracked_identifiers";
