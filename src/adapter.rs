use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    time::{Duration, Instant},
};

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client as ReqwestClient, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub type ProbeBytes = Bytes;
pub type TransportFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;
pub type TransportResult<T> = Result<T, TransportError>;

const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportErrorKind {
    Connect,
    Send,
    Receive,
    Timeout,
    Decode,
    Internal,
}

/// Failure to obtain a response at all. HTTP error statuses are not errors;
/// they come back as a [`ProbeResponse`].
#[derive(Clone, Debug, thiserror::Error)]
#[error("transport error {kind:?} status={status:?} {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connect, None, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, None, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Internal, None, message)
    }

    fn from_reqwest(kind: TransportErrorKind, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else {
            kind
        };
        Self {
            kind,
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<sonic_rs::Error> for TransportError {
    fn from(err: sonic_rs::Error) -> Self {
        Self::new(TransportErrorKind::Decode, None, err.to_string())
    }
}

#[derive(Clone, Debug)]
pub struct ProbeRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, ProbeBytes)>,
    pub body: Option<ProbeBytes>,
    pub timeout: Option<Duration>,
}

impl ProbeRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<ProbeBytes>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<ProbeBytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_json_body<T: Serialize>(self, payload: &T) -> TransportResult<Self> {
        let body = sonic_rs::to_vec(payload)?;
        Ok(self
            .with_header(CONTENT_TYPE.as_str(), Bytes::from_static(JSON_CONTENT_TYPE.as_bytes()))
            .with_body(body))
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Clone, Debug)]
pub struct ProbeResponse {
    pub status: u16,
    pub headers: Vec<(String, ProbeBytes)>,
    pub body: ProbeBytes,
    pub elapsed: Duration,
}

impl ProbeResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Total elapsed time of the exchange, in whole microseconds.
    pub fn elapsed_micros(&self) -> u128 {
        self.elapsed.as_micros()
    }

    pub fn json<T: DeserializeOwned>(&self) -> TransportResult<T> {
        Ok(sonic_rs::from_slice(&self.body)?)
    }
}

pub trait Transport: Send + Sync {
    fn execute(&self, request: ProbeRequest) -> TransportFuture<TransportResult<ProbeResponse>>;
}

pub type SharedTransport = dyn Transport + Send + Sync;

#[derive(Clone)]
pub struct Client {
    transport: Arc<SharedTransport>,
}

impl Client {
    pub fn new() -> Self {
        Self::with_transport(ReqwestTransport::new())
    }

    pub fn with_transport<T>(transport: T) -> Self
    where
        T: Transport + 'static,
    {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub async fn execute(&self, request: ProbeRequest) -> TransportResult<ProbeResponse> {
        self.transport.execute(request).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: ReqwestClient::new(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: ProbeRequest) -> TransportFuture<TransportResult<ProbeResponse>> {
        let client = self.client.clone();
        Box::pin(async move {
            let mut req = client.request(request.method.clone(), &request.url);

            for (key, value) in request.headers {
                let value = HeaderValue::from_bytes(value.as_ref())
                    .map_err(|err| TransportError::internal(err.to_string()))?;
                req = req.header(key, value);
            }

            if let Some(body) = request.body {
                req = req.body(body);
            }

            if let Some(timeout) = request.timeout {
                req = req.timeout(timeout);
            }

            // Clock covers send through the last body byte.
            let start = Instant::now();
            let resp = req
                .send()
                .await
                .map_err(|err| TransportError::from_reqwest(TransportErrorKind::Send, err))?;

            let status = resp.status().as_u16();
            let headers = resp
                .headers()
                .iter()
                .map(|(name, value)| (name.to_string(), Bytes::copy_from_slice(value.as_ref())))
                .collect();
            let body = resp
                .bytes()
                .await
                .map_err(|err| TransportError::from_reqwest(TransportErrorKind::Receive, err))?;
            let elapsed = start.elapsed();

            Ok(ProbeResponse {
                status,
                headers,
                body,
                elapsed,
            })
        })
    }
}
