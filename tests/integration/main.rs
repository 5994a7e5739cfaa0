//! Integration tests for Kin-Harvest
//!
//! These tests run whole harvests against wiremock servers and temp-file
//! SQLite databases.

mod common;
mod harvest_tests;
mod store_tests;
