//! Testing utilities
//!
//! See [`arbor_test`] for the in-memory store, fixtures and mocks.

pub use arbor_test::*;
