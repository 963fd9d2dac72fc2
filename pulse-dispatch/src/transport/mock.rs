//! Scripted in-process transport for tests and offline embedding.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use pulse_core::errors::TransportError;
use pulse_core::wire::{ApiResponse, BatchResponse, ItemResult};

use super::{PrimaryRequest, Transport};

/// Scripted reply to a primary request.
#[derive(Debug, Clone)]
pub enum PostReply {
    /// Accept every element.
    AcceptAll,
    /// Return this envelope.
    Respond(BatchResponse),
    /// Fail the request.
    Fail(TransportError),
}

#[derive(Debug, Default)]
struct Inner {
    post_script: VecDeque<PostReply>,
    pixel_script: VecDeque<Result<(), TransportError>>,
    posts: Vec<PrimaryRequest>,
    pixels: Vec<String>,
    latency: Duration,
}

/// Transport that replays scripted replies and records every request.
///
/// Unscripted requests succeed. Clones share the script and the log.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    inner: Rc<RefCell<Inner>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every request by `latency` (on the tokio clock).
    pub fn with_latency(self, latency: Duration) -> Self {
        self.inner.borrow_mut().latency = latency;
        self
    }

    pub fn script_post(&self, reply: PostReply) -> &Self {
        self.inner.borrow_mut().post_script.push_back(reply);
        self
    }

    pub fn script_pixel(&self, reply: Result<(), TransportError>) -> &Self {
        self.inner.borrow_mut().pixel_script.push_back(reply);
        self
    }

    /// Primary requests received so far.
    pub fn posts(&self) -> Vec<PrimaryRequest> {
        self.inner.borrow().posts.clone()
    }

    /// Pixel URLs received so far.
    pub fn pixels(&self) -> Vec<String> {
        self.inner.borrow().pixels.clone()
    }

    /// Number of wire elements in each primary request body.
    pub fn post_sizes(&self) -> Vec<usize> {
        self.inner
            .borrow()
            .posts
            .iter()
            .map(|p| element_count(&p.body))
            .collect()
    }

    async fn wait(&self) {
        let latency = self.inner.borrow().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

fn element_count(body: &str) -> usize {
    serde_json::from_str::<Vec<serde_json::Value>>(body).map_or(0, |v| v.len())
}

impl Transport for MockTransport {
    async fn post(&self, request: PrimaryRequest) -> Result<BatchResponse, TransportError> {
        let count = element_count(&request.body);
        let reply = {
            let mut inner = self.inner.borrow_mut();
            inner.posts.push(request);
            inner.post_script.pop_front().unwrap_or(PostReply::AcceptAll)
        };
        self.wait().await;

        match reply {
            PostReply::AcceptAll => Ok(ApiResponse {
                code: 200,
                message: "ok".to_string(),
                data: Some((0..count).map(ItemResult::created).collect()),
                timestamp: None,
            }),
            PostReply::Respond(response) => Ok(response),
            PostReply::Fail(e) => Err(e),
        }
    }

    async fn pixel(&self, url: String) -> Result<(), TransportError> {
        let reply = {
            let mut inner = self.inner.borrow_mut();
            inner.pixels.push(url);
            inner.pixel_script.pop_front().unwrap_or(Ok(()))
        };
        self.wait().await;
        reply
    }
}
