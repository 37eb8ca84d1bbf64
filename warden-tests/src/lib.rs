//! Warden Tests - Integration and randomized tests for Warden.
//!
//! Tests drive a full availability service over in-memory metadata stores.
//!
//! ## Test Organization
//!
//! **Integration Tests** (`*_tests.rs`):
//! - `availability_tests`: End-to-end routing and queryability scenarios
//! - `randomized_tests`: Seeded random clusters checked against properties
//!
//! **Support Modules**:
//! - `properties`: Routing invariants and their checkers
//! - `scenarios`: Cluster fixture, seeds, and view builders
//!
//! ## Naming Conventions
//!
//! - Integration tests: `test_<component>_<scenario>`
//! - Randomized tests: `test_random_<property>`
//! - Unit tests: Inline in each crate under `#[cfg(test)]`

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod properties;
pub mod scenarios;

#[cfg(test)]
mod randomized_tests;
