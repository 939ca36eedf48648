//! Integration tests for ledfleet
//!
//! Every test starts real nodes on ephemeral localhost ports.

pub mod fixtures;

mod api_test;
mod error_scenarios;
mod fleet_test;
