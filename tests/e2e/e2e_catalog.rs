use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use movies_probe::probe;
use movies_probe::{
    CatalogClient, Client, MoviePayload, PayloadVariant, ProbeConfig, ProbeError,
    TransportErrorKind,
};
use tokio::net::TcpListener;
use tokio::time::sleep;

const COLD_READ: Duration = Duration::from_millis(3);

#[derive(Clone, Default)]
struct AppState {
    store: Arc<Mutex<HashMap<String, String>>>,
    cached: Arc<Mutex<HashSet<String>>>,
}

#[tokio::test]
async fn e2e_run_sees_warm_reads_beat_cold_reads() {
    let server = TestServer::start().await;
    let catalog = CatalogClient::new(Client::new(), server.url("/movies"));
    let config = ProbeConfig {
        base_url: server.url("/movies"),
        populate_start: 123,
        populate_end: 133,
        fetch_start: 123,
        fetch_end: 133,
        seed: Some(11),
        ..ProbeConfig::default()
    };

    let outcome = probe::run(&catalog, &config, true)
        .await
        .expect("run against live server");

    let populated = outcome.populate.expect("population ran");
    assert_eq!(populated.succeeded(), 10);

    let cold = outcome.comparison.cold.mean_micros().expect("cold mean");
    let warm = outcome.comparison.warm.mean_micros().expect("warm mean");
    assert!(cold >= COLD_READ.as_micros() as f64, "cold {cold} µs");
    assert!(warm < cold, "warm {warm} µs should beat cold {cold} µs");
}

#[tokio::test]
async fn e2e_second_population_comes_back_as_500s() {
    let server = TestServer::start().await;
    let catalog = CatalogClient::new(Client::new(), server.url("/movies"));

    let first = probe::post_sample(&catalog, PayloadVariant::A)
        .await
        .expect("first post");
    let second = probe::post_sample(&catalog, PayloadVariant::A)
        .await
        .expect("second post");

    assert_eq!(first, 200);
    assert_eq!(second, 500);
}

#[tokio::test]
async fn e2e_fetch_movie_round_trips_slugged_payload() {
    let server = TestServer::start().await;
    let catalog = CatalogClient::new(Client::new(), server.url("/movies/"));
    let payload = MoviePayload::sample(PayloadVariant::B);

    let created = catalog.create(&payload).await.expect("create");
    assert_eq!(created.status, 200);

    let fetched = catalog
        .fetch_movie("test-movie-a")
        .await
        .expect("fetch")
        .expect("stored");
    assert_eq!(fetched, payload);
    assert!(catalog.fetch_movie("nope").await.expect("fetch").is_none());
}

#[tokio::test]
async fn e2e_closed_port_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let catalog = CatalogClient::new(Client::new(), format!("http://{addr}/movies"));
    let err = probe::post_sample(&catalog, PayloadVariant::A)
        .await
        .expect_err("nothing is listening");
    match err {
        ProbeError::Transport(err) => assert_eq!(err.kind(), TransportErrorKind::Connect),
        other => panic!("expected transport error, got {other:?}"),
    }
}

struct TestServer {
    base_url: String,
    task: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start() -> Self {
        let state = AppState::default();
        let app = Router::new()
            .route("/movies", post(create_handler))
            .route("/movies/{key}", get(fetch_handler))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let base_url = format!("http://{}", addr);

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { base_url, task }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn create_handler(State(state): State<AppState>, body: Bytes) -> (StatusCode, String) {
    let payload: MoviePayload = match sonic_rs::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()),
    };
    let key = payload.key();
    let encoded = String::from_utf8(body.to_vec()).unwrap_or_default();

    let mut store = state.store.lock().expect("store lock");
    if store.contains_key(&key) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("duplicate key {key}"),
        );
    }
    store.insert(key, encoded.clone());
    (StatusCode::OK, encoded)
}

async fn fetch_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> (StatusCode, String) {
    let stored = state.store.lock().expect("store lock").get(&key).cloned();
    let Some(stored) = stored else {
        return (StatusCode::NOT_FOUND, String::new());
    };
    let first_read = state.cached.lock().expect("cache lock").insert(key);
    if first_read {
        sleep(COLD_READ).await;
    }
    (StatusCode::OK, stored)
}
