//! Testing utilities.
//!
//! Provides an in-memory transport and response builders for testing code
//! that drives a [`crate::governor::Governor`].

mod mock;

pub use mock::{disclosure_response, response_with_headers, RecordedRequest, ScriptedTransport};
