//! Inference endpoint client for Codeweaver.
//!
//! [`CodeModelClient`] implements `codeweaver_core::CodeGenerator` on top of
//! any `CompletionEndpoint`; [`HttpEndpoint`] is the production transport.
//! The retry behaviour lives in [`retry`] as a pure state machine.

pub mod client;
pub mod http;
pub mod retry;

pub use client::CodeModelClient;
pub use http::HttpEndpoint;
pub use retry::{Disposition, Resume, RetryPolicy, RetryState};
