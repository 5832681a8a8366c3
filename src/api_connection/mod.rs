pub mod connection;
pub mod endpoints;

pub use connection::{ApiConnectionError, CompletionBackend, LlmClient};
pub use endpoints::Provider;
