//! Bounded-concurrency HTTP request batches.
//!
//! A batch is built from scalar-or-sequence inputs (urls, query params, form
//! bodies, json bodies, result keys) broadcast to a common length, then
//! executed concurrently under a global in-flight cap and a per-host
//! connection cap. Transient failures retry with exponential backoff; item
//! failures never abort siblings. Results come back keyed by the caller's
//! identifiers, or in completion order when no keys were supplied.

pub mod backoff;
pub mod client;
pub mod collection;
pub mod descriptor;
pub mod error;
pub mod parse;
pub mod pools;
pub mod retry;

pub use backoff::Backoff;
pub use client::{BatchProgress, ClientConfig, NoProgress, RequestClient};
pub use collection::{ItemFailure, ItemResult, ResultCollection};
pub use descriptor::{Batch, BatchSpec, Field, Params, RequestDescriptor, ResponseKind};
pub use error::RequestError;
pub use parse::{Payload, PayloadParser, ResponseParser};
pub use pools::{AgentPool, ProxyPool};
pub use retry::{Disposition, RetryPolicy};
