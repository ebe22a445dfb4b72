//! In-memory stand-in for the movie catalog, for deterministic probe tests.
//!
//! Reads report a synthetic elapsed time: the cold latency on the first read
//! of a key, the warm latency afterwards. Faults are scripted per request
//! through a [`MockBehaviorPlan`].

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use bytes::Bytes;
use reqwest::Method;

use crate::adapter::{
    ProbeRequest, ProbeResponse, Transport, TransportError, TransportFuture, TransportResult,
};
use crate::movie::MoviePayload;

pub const DEFAULT_COLD_LATENCY: Duration = Duration::from_micros(900);
pub const DEFAULT_WARM_LATENCY: Duration = Duration::from_micros(90);
pub const DEFAULT_WRITE_LATENCY: Duration = Duration::from_micros(300);

#[derive(Clone, Debug, Default)]
pub enum MockBehavior {
    #[default]
    Pass,
    /// Served normally, but only after the delay; the delay counts toward elapsed.
    Delay(Duration),
    Reject {
        status: u16,
        reason: String,
    },
    ConnectError {
        reason: String,
    },
    TimeoutError {
        reason: String,
    },
    Drop,
}

impl MockBehavior {
    pub fn delay(ms: u64) -> Self {
        Self::Delay(Duration::from_millis(ms))
    }

    pub fn reject(status: u16, reason: impl Into<String>) -> Self {
        Self::Reject {
            status,
            reason: reason.into(),
        }
    }

    pub fn connect_error(reason: impl Into<String>) -> Self {
        Self::ConnectError {
            reason: reason.into(),
        }
    }

    pub fn timeout_error(reason: impl Into<String>) -> Self {
        Self::TimeoutError {
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MockBehaviorPlan {
    request: VecDeque<MockBehavior>,
}

impl MockBehaviorPlan {
    pub fn push(&mut self, behavior: MockBehavior) -> &mut Self {
        self.request.push_back(behavior);
        self
    }

    /// `count` passes, for skipping ahead to a later request.
    pub fn pass_n(&mut self, count: usize) -> &mut Self {
        for _ in 0..count {
            self.request.push_back(MockBehavior::Pass);
        }
        self
    }

    pub fn pop(&mut self) -> MockBehavior {
        self.request.pop_front().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.request.len()
    }

    pub fn is_empty(&self) -> bool {
        self.request.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct MockCatalogSnapshot {
    pub request_count: usize,
    pub post_count: usize,
    pub get_count: usize,
    pub stored_count: usize,
    pub last_url: Option<String>,
    pub last_status: Option<u16>,
    pub behavior_remaining: usize,
    pub elapsed_total: Duration,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct MockCatalogState {
    request_count: usize,
    post_count: usize,
    get_count: usize,
    last_url: Option<String>,
    last_status: Option<u16>,
    behavior_plan: MockBehaviorPlan,
    movies: HashMap<String, MoviePayload>,
    warm: HashSet<String>,
    outbound_log: Vec<ProbeRequest>,
    last_error: Option<String>,
    elapsed_total: Duration,
}

impl MockCatalogState {
    fn snapshot(&self) -> MockCatalogSnapshot {
        MockCatalogSnapshot {
            request_count: self.request_count,
            post_count: self.post_count,
            get_count: self.get_count,
            stored_count: self.movies.len(),
            last_url: self.last_url.clone(),
            last_status: self.last_status,
            behavior_remaining: self.behavior_plan.len(),
            elapsed_total: self.elapsed_total,
            last_error: self.last_error.clone(),
        }
    }
}

enum Route {
    Collection,
    Movie(String),
    Unknown,
}

#[derive(Clone, Debug)]
pub struct MockCatalog {
    state: Arc<Mutex<MockCatalogState>>,
    base_path: String,
    cold_latency: Duration,
    warm_latency: Duration,
    write_latency: Duration,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockCatalogState::default())),
            base_path: "/movies".to_string(),
            cold_latency: DEFAULT_COLD_LATENCY,
            warm_latency: DEFAULT_WARM_LATENCY,
            write_latency: DEFAULT_WRITE_LATENCY,
        }
    }

    pub fn with_behavior_plan(behavior_plan: MockBehaviorPlan) -> Self {
        let catalog = Self::new();
        catalog
            .state
            .lock()
            .expect("mock-catalog mutex poisoned while installing behavior plan")
            .behavior_plan = behavior_plan;
        catalog
    }

    pub fn with_latency(mut self, cold: Duration, warm: Duration) -> Self {
        self.cold_latency = cold;
        self.warm_latency = warm;
        self
    }

    pub fn snapshot(&self) -> MockCatalogSnapshot {
        self.state
            .lock()
            .expect("mock-catalog mutex poisoned while taking snapshot")
            .snapshot()
    }

    /// Stores a movie without going through a request; it starts cold.
    pub fn seed(&self, payload: MoviePayload) {
        self.state
            .lock()
            .expect("mock-catalog mutex poisoned while seeding")
            .movies
            .insert(payload.key(), payload);
    }

    pub fn movie(&self, key: &str) -> Option<MoviePayload> {
        self.state
            .lock()
            .expect("mock-catalog mutex poisoned while reading movie")
            .movies
            .get(key)
            .cloned()
    }

    /// Forgets which keys have been read, so the next pass is cold again.
    pub fn evict_cache(&self) {
        self.state
            .lock()
            .expect("mock-catalog mutex poisoned while evicting cache")
            .warm
            .clear();
    }

    pub fn outbound(&self) -> Vec<ProbeRequest> {
        self.state
            .lock()
            .expect("mock-catalog mutex poisoned while reading outbound log")
            .outbound_log
            .clone()
    }

    fn route(&self, url: &str) -> Route {
        let path = match url.find("://") {
            Some(scheme_end) => {
                let rest = &url[scheme_end + 3..];
                rest.find('/').map_or("", |slash| &rest[slash..])
            }
            None => url,
        };
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = path.trim_end_matches('/');

        if path == self.base_path {
            return Route::Collection;
        }
        match path.strip_prefix(self.base_path.as_str()) {
            Some(rest) => match rest.strip_prefix('/') {
                Some(key) if !key.is_empty() && !key.contains('/') => Route::Movie(key.to_string()),
                _ => Route::Unknown,
            },
            None => Route::Unknown,
        }
    }

    fn create(&self, request: &ProbeRequest) -> (u16, Bytes, Duration) {
        self.state
            .lock()
            .expect("mock-catalog mutex poisoned while counting post")
            .post_count += 1;
        let Some(body) = request.body.as_ref() else {
            return (400, Bytes::from_static(b"missing body"), Duration::ZERO);
        };
        let payload: MoviePayload = match sonic_rs::from_slice(body) {
            Ok(payload) => payload,
            Err(err) => return (400, Bytes::from(err.to_string()), Duration::ZERO),
        };
        let key = payload.key();

        let mut state = self
            .state
            .lock()
            .expect("mock-catalog mutex poisoned while storing movie");
        if state.movies.contains_key(&key) {
            return (
                500,
                Bytes::from(format!("duplicate key value violates unique constraint: {key}")),
                self.write_latency,
            );
        }
        match sonic_rs::to_vec(&payload) {
            Ok(stored) => {
                state.movies.insert(key, payload);
                (200, Bytes::from(stored), self.write_latency)
            }
            Err(err) => (500, Bytes::from(err.to_string()), self.write_latency),
        }
    }

    fn fetch(&self, key: &str) -> (u16, Bytes, Duration) {
        let mut state = self
            .state
            .lock()
            .expect("mock-catalog mutex poisoned while reading movie");
        state.get_count += 1;
        let Some(payload) = state.movies.get(key) else {
            return (404, Bytes::new(), self.cold_latency);
        };
        let encoded = sonic_rs::to_vec(payload);
        let latency = if state.warm.insert(key.to_string()) {
            self.cold_latency
        } else {
            self.warm_latency
        };
        match encoded {
            Ok(body) => (200, Bytes::from(body), latency),
            Err(err) => (500, Bytes::from(err.to_string()), latency),
        }
    }

    fn record(&self, status: u16, elapsed: Duration) {
        let mut state = self
            .state
            .lock()
            .expect("mock-catalog mutex poisoned while recording response");
        state.last_status = Some(status);
        state.elapsed_total += elapsed;
    }

    fn fail(&self, error: TransportError) -> TransportError {
        let mut state = self
            .state
            .lock()
            .expect("mock-catalog mutex poisoned while recording error");
        state.last_error = Some(error.message.clone());
        state.last_status = None;
        error
    }
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockCatalog {
    fn execute(&self, request: ProbeRequest) -> TransportFuture<TransportResult<ProbeResponse>> {
        let catalog = self.clone();
        Box::pin(async move {
            let behavior = {
                let mut state = catalog
                    .state
                    .lock()
                    .expect("mock-catalog mutex poisoned while updating state before execute");
                state.request_count += 1;
                state.last_url = Some(request.url.clone());
                state.last_error = None;
                state.outbound_log.push(request.clone());
                state.behavior_plan.pop()
            };

            let mut delay = Duration::ZERO;
            match behavior {
                MockBehavior::Pass => {}
                MockBehavior::Delay(duration) => {
                    tokio::time::sleep(duration).await;
                    delay = duration;
                }
                MockBehavior::Reject { status, reason } => {
                    catalog.record(status, Duration::ZERO);
                    return Ok(ProbeResponse {
                        status,
                        headers: Vec::new(),
                        body: Bytes::from(reason),
                        elapsed: Duration::ZERO,
                    });
                }
                MockBehavior::ConnectError { reason } => {
                    return Err(catalog.fail(TransportError::connect(reason)));
                }
                MockBehavior::TimeoutError { reason } => {
                    return Err(catalog.fail(TransportError::timeout(reason)));
                }
                MockBehavior::Drop => {
                    return Err(catalog.fail(TransportError::timeout(
                        "mock catalog dropped response",
                    )));
                }
            }

            let (status, body, latency) = match (catalog.route(&request.url), &request.method) {
                (Route::Collection, &Method::POST) => catalog.create(&request),
                (Route::Movie(key), &Method::GET) => catalog.fetch(&key),
                (Route::Collection | Route::Movie(_), _) => {
                    (405, Bytes::from_static(b"method not allowed"), Duration::ZERO)
                }
                (Route::Unknown, _) => (404, Bytes::new(), Duration::ZERO),
            };
            let elapsed = latency + delay;

            catalog.record(status, elapsed);

            let headers = if !(200..300).contains(&status) || body.is_empty() {
                Vec::new()
            } else {
                vec![(
                    "content-type".to_string(),
                    Bytes::from_static(b"application/json"),
                )]
            };

            Ok(ProbeResponse {
                status,
                headers,
                body,
                elapsed,
            })
        })
    }
}
