//! Integration test suite for Waypath.
//!
//! Exercises the wallet end to end against in-memory data sources: fund
//! discovery under gap limits and flaky sources, transaction building from
//! discovered funds, and the size and balance invariants under random input.

pub mod helpers;
