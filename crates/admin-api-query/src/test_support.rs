//! In-crate test doubles.

use std::collections::VecDeque;
use std::sync::Mutex;

use admin_api_core::{ApiError, ApiResult};
use async_trait::async_trait;
use serde_json::Value;

use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Replies from a queue and records every request.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    replies: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl Recorder {
    pub(crate) fn replying(bodies: impl IntoIterator<Item = Value>) -> Self {
        Self {
            replies: Mutex::new(bodies.into_iter().map(HttpResponse::ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn push(&self, response: HttpResponse) {
        self.replies.lock().unwrap().push_back(response);
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for Recorder {
    async fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ApiError::ConnectionError("no reply queued".to_string()))
    }
}
