//! Streaming message tracking.

mod model;
mod registry;

pub use model::{StreamState, StreamStatus};
pub use registry::StreamRegistry;
