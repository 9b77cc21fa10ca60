//! Transport layer for the agent server.
//!
//! Only HTTP is provided: a small JSON API in front of the agent pool.

pub mod http;

pub use http::{HttpTransport, router};

use crate::error::AgentResult;
use std::future::Future;

/// Trait for server transports.
pub trait Transport: Send + Sync {
    /// Start the transport and block until it shuts down.
    fn run(&self) -> impl Future<Output = AgentResult<()>> + Send;

    /// Get the name of this transport for logging.
    fn name(&self) -> &'static str;
}
