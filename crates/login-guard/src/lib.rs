// ============================
// aidlink-login-guard/src/lib.rs
// ============================
//! Login attempt limiting for the AidLink coordination backend.
//!
//! Tracks failed logins per normalized account email and blocks further
//! attempts once too many failures land inside one counting window. The
//! auth layer owns a [`LoginAttemptLimiter`], consults it before
//! verifying credentials, records failures after bad ones, and clears
//! the history after good ones. A [`Sweeper`] drops long-stale records
//! in the background so the table stays bounded.

pub mod clock;
pub mod config;
pub mod limiter;
pub mod metrics;
pub mod sweep;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, LimiterSettings, Settings, SweepSettings};
pub use limiter::LoginAttemptLimiter;
pub use sweep::Sweeper;
