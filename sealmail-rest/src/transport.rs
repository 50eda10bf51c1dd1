//! Transport layer abstraction.
//!
//! The entity client never talks HTTP directly. It hands a fully prepared
//! [`RestRequest`] to a [`Transport`], which returns the raw response body
//! or a typed [`RestError`].

use crate::error::RestResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media type of request and response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Json,
}

impl MediaType {
    pub fn as_mime(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
        }
    }
}

/// A single request as handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub path: String,
    pub method: HttpMethod,
    pub query_params: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
    pub media_type: MediaType,
}

/// Performs one request and returns the response body.
///
/// Timeouts and retries are the implementation's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: RestRequest) -> RestResult<String>;
}

/// A mock transport for testing.
pub mod mock {
    use super::*;
    use std::sync::{Mutex, PoisonError};

    type Handler = Box<dyn Fn(&RestRequest) -> RestResult<String> + Send + Sync>;

    /// Records every request and answers through a handler closure.
    pub struct MockTransport {
        handler: Handler,
        requests: Mutex<Vec<RestRequest>>,
    }

    impl MockTransport {
        /// Creates a mock answering every request with `handler`.
        pub fn new<F>(handler: F) -> Self
        where
            F: Fn(&RestRequest) -> RestResult<String> + Send + Sync + 'static,
        {
            Self {
                handler: Box::new(handler),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Creates a mock that answers every request with the same body.
        pub fn responding(body: impl Into<String>) -> Self {
            let body = body.into();
            Self::new(move |_| Ok(body.clone()))
        }

        /// All requests received so far, in arrival order.
        pub fn requests(&self) -> Vec<RestRequest> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Number of requests received so far.
        pub fn request_count(&self) -> usize {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn request(&self, request: RestRequest) -> RestResult<String> {
            let response = (self.handler)(&request);
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request);
            // Yield so concurrent callers actually interleave.
            tokio::task::yield_now().await;
            response
        }
    }
}
