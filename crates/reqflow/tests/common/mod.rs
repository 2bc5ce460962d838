//! Common test utilities and fixtures
//!
//! - [`FakeTransport`] answers from a closure and records every request
//! - [`echo_transport`] reflects the request body back with the method added

#![allow(dead_code)]

use async_trait::async_trait;
use reqflow::prelude::*;
use reqflow_transport::{ResponseBody, Result as TransportResult};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

type Responder = dyn Fn(&HttpRequest, u32) -> TransportResult<HttpResponse> + Send + Sync;

/// Transport double that records requests and answers from a closure.
///
/// The closure receives the request and the 0-based dispatch count.
pub struct FakeTransport {
    responder: Box<Responder>,
    calls: AtomicU32,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&HttpRequest, u32) -> TransportResult<HttpResponse> + Send + Sync + 'static,
    {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Always answer with `status` and `body`.
    pub fn status(status: u16, body: &'static str) -> Arc<Self> {
        Self::new(move |_, _| Ok(HttpResponse::new(status, body)))
    }

    /// Always fail with the error `make` builds.
    pub fn failing<F>(make: F) -> Arc<Self>
    where
        F: Fn() -> TransportError + Send + Sync + 'static,
    {
        Self::new(move |_, _| Err(make()))
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send_http(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(&request, call)
    }
}

/// Reflects a JSON object body back with a `method` field set to the verb
/// that was used. Requests without a body get `{"method": ...}`.
pub fn echo_transport() -> Arc<FakeTransport> {
    FakeTransport::new(|request, _| {
        let mut value: serde_json::Value = match &request.body {
            Some(body) => serde_json::from_slice(body)
                .map_err(|e| TransportError::Other(e.to_string()))?,
            None => serde_json::json!({}),
        };
        value["method"] = serde_json::Value::String(request.method.to_string());
        let body = serde_json::to_vec(&value).map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(HttpResponse::new(200, ResponseBody::from(body)))
    })
}

/// A client pointed at `http://svc.test` over `transport`.
pub fn client(transport: Arc<FakeTransport>) -> Client {
    Client::builder(transport).base_url("http://svc.test").build()
}
