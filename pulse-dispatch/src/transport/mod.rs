//! Delivery channels and the selector choosing between them.

pub mod http_client;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod pixel;
pub mod selector;

use std::future::Future;

use pulse_core::errors::TransportError;
use pulse_core::wire::BatchResponse;

pub use http_client::HttpTransport;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockTransport, PostReply};
pub use selector::{SelectorConfig, TransportSelector};

/// A primary-channel request: a JSON array body posted to `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryRequest {
    pub url: String,
    pub project_id: u64,
    pub body: String,
}

/// Which channel carried a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Primary,
    Pixel,
}

/// Circumstances of a delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryContext {
    /// The page is going away; only the pixel channel can be relied on.
    pub unloading: bool,
}

/// The I/O seam. Implementations perform exactly one request per call and do
/// not retry; timeouts and retries belong to the selector and scheduler.
pub trait Transport {
    /// POST a batch. Returns the parsed envelope for any structured response.
    ///
    /// A cross-origin rejection must surface as [`TransportError::Blocked`].
    fn post(
        &self,
        request: PrimaryRequest,
    ) -> impl Future<Output = Result<BatchResponse, TransportError>>;

    /// Fire a pixel GET. Only success or failure is observable.
    fn pixel(&self, url: String) -> impl Future<Output = Result<(), TransportError>>;
}
