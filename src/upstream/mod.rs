pub mod classify;
pub mod client;
pub mod transport;

pub use classify::{classify_upstream_failure, mentions_insufficient_credits};
pub use client::OpenRouterClient;
pub use transport::{ReqwestTransport, TransportResponse, UpstreamTransport};
