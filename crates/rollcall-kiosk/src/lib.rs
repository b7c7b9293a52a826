//! rollcall-kiosk — The attendance kiosk service layer.
//!
//! Exposes the user-facing actions as plain synchronous request/response
//! functions over the store, so any front end (CLI, GUI, test harness)
//! can drive one capture-match-record cycle at a time. No event loop,
//! no background work.

pub mod config;
pub mod service;

pub use config::{Config, ConfigError};
pub use service::{Kiosk, KioskError, KioskStatus, MarkEvent, MarkReport, Registration};
