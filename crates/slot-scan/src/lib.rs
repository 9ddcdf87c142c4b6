//! # Slot Scan
//!
//! This crate finds open vaccination sessions on the CoWIN API and reports them.
//! It resolves state and district names, fetches the appointment calendar,
//! filters sessions against the user's criteria and hands the resulting report
//! to a [`notification_services::Notifier`] on a fixed interval.

/// Types for search criteria and scan errors
mod scan_types;
pub use scan_types::*;

/// HTTP client and response types for the CoWIN API
mod cowin_client;
pub use cowin_client::*;

/// State and district name resolution with a lifetime cache
mod location_resolver;
pub use location_resolver::*;

/// Session eligibility rules
mod eligibility;
pub use eligibility::*;

/// Text report of matching sessions
mod report;
pub use report::*;

/// Poll loop tying everything together
mod executor;
pub use executor::*;

#[cfg(test)]
mod test_support;
