//! Shared test utilities for deckhand integration tests.
//!
//! This module provides:
//! - `TestHarness` for an isolated intake stack (temp staging directory,
//!   in-memory database, SQLite-backed queue)
//! - mail and queue fakes with injectable failures

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::{body_stream, multipart_upload, TestHarness, TEST_BOUNDARY};
