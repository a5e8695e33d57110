//! Download reliability policy.
//!
//! ```text
//! fetch → [Semaphore permit] → [timeout] → transport.get → [RetryPolicy] ↺
//! ```

pub mod retry;

pub use retry::{RetryConfig, RetryPolicy};
