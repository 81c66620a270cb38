//! PostgreSQL integration tests for the inspection store.
//!
//! Requires a running PostgreSQL database reachable at `TEST_DATABASE_URL`.
//!
//! Run with: cargo test --test postgres -- --ignored

mod test_helpers;

mod test_items;
mod test_locking;
