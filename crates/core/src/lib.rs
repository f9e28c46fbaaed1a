//! # Codeweaver Core
//!
//! Domain types, traits, and error definitions for the Codeweaver code
//! generation service. This crate has **no framework dependencies**; it
//! defines the domain model that the provider, store, and gateway crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`CompletionEndpoint`] — one HTTP round-trip to the inference service
//! - [`CodeGenerator`] — prompt in, code out (the retrying model client)
//! - [`GenerationStore`] — users and generation records
//!
//! Implementations live in their respective crates, so tests can swap in
//! scripted endpoints and in-memory stores.

pub mod error;
pub mod generation;
pub mod language;
pub mod provider;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, StoreError, ValidationError};
pub use generation::{GenerateInput, Generation, NewGeneration, User};
pub use language::Language;
pub use provider::{ChatMessage, CodeGenerator, CompletionEndpoint, CompletionRequest, EndpointReply, Role};
pub use store::GenerationStore;
