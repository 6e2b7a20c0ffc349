//! Staff Portal: onboarding workflow for home-healthcare staff.

pub mod config;
pub mod error;
pub mod onboarding;
pub mod server;
pub mod store;
pub mod uploads;
