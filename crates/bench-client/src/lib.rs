//! Inference client for KServe v2 style HTTP prediction endpoints.
//!
//! The [`InferenceClient`] trait abstracts the transport so the evaluation
//! driver can run against the real HTTP adapter or a mock. Retry policy is a
//! separate decorator ([`RetryClient`]), never built into the adapter.

pub mod client;
pub mod retry;
pub mod wire;

pub use client::{HttpInferenceClient, InferenceClient, InferenceError, InferenceResult};
pub use retry::RetryClient;
