//! Shared building blocks for the channel workspace.
//!
//! ## Architecture
//!
//! - **common** (this crate): error location tracking and HTTP status helpers
//! - **channel-core**: duplex channel manager with HTTP fallback
//! - **channel-console**: application wiring logging, config and the manager together

pub mod error;
pub mod http_status;

#[cfg(test)]
mod tests;

pub use error::error_location::ErrorLocation;
pub use http_status::HttpStatusCode;
