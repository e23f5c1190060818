//! Shared test utilities for kobomail integration tests.
//!
//! This module provides:
//! - `EmailBuilder` for composing raw MIME messages
//! - `FakeMailbox`, an in-memory `Mailbox`
//! - `RecordingNotifier` and `TestHarness` for running the pipeline

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::*;
