//! HTTP server for GeoIP lookups.
//!
//! Endpoints:
//! - `/` - usage text with the served dataset type
//! - `/country/{ip}`, `/city/{ip}`, `/region/{ip}` - lookups, `?format=json` for JSON
//! - `/health` - liveness check with one live lookup
//! - `/cache/stats` - query cache counters
//!
//! Connections are served from an accept loop so every connection carries a
//! request-head timeout and an idle timeout, not just a per-request one.

mod connection;
mod handlers;
mod types;

use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;

use crate::config::REQUEST_TIMEOUT;
use handlers::{
    cache_stats_handler, city_handler, country_handler, health_handler, region_handler,
    root_handler, usage,
};
pub use connection::ConnectionTimeouts;
pub use types::AppState;

/// Pause after a failed accept, e.g. when file descriptors run out.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Builds the router with every endpoint and the per-request timeout.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/country/:ip", get(country_handler))
        .route("/city/:ip", get(city_handler))
        .route("/region/:ip", get(region_handler))
        .route("/country/", get(|| async { usage("country") }))
        .route("/city/", get(|| async { usage("city") }))
        .route("/region/", get(|| async { usage("region") }))
        .route("/health", get(health_handler))
        .route("/cache/stats", get(cache_stats_handler))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(state)
}

/// Binds the listener on all interfaces.
pub async fn bind(port: u16) -> Result<TcpListener, anyhow::Error> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP server to port {}: {}", port, e))?;
    log::info!("GeoIP API listening on http://0.0.0.0:{}/", port);
    Ok(listener)
}

/// Serves until `shutdown` is cancelled, then stops accepting and drains
/// in-flight requests.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), anyhow::Error> {
    serve_with_timeouts(listener, state, shutdown, ConnectionTimeouts::default()).await
}

/// [`serve`] with explicit per-connection time limits.
pub async fn serve_with_timeouts(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
    timeouts: ConnectionTimeouts,
) -> Result<(), anyhow::Error> {
    let app = router(state);
    let mut connections = JoinSet::new();

    loop {
        let stream = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => stream,
                Err(e) => {
                    log::warn!("Failed to accept connection: {}", e);
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            },
        };
        connections.spawn(connection::serve_connection(
            stream,
            app.clone(),
            timeouts,
            shutdown.clone(),
        ));
        while connections.try_join_next().is_some() {}
    }

    drop(listener);
    log::info!(
        "HTTP server stopped accepting, draining {} connection(s)",
        connections.len()
    );
    while connections.join_next().await.is_some() {}
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geoip::testing::{city_record, StaticDataset};
    use crate::geoip::{DatasetHandle, DatasetManager};
    use crate::query::QueryService;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tower::ServiceExt;

    fn state(dataset: StaticDataset, cache_enabled: bool) -> AppState {
        let handle = DatasetHandle::from_dataset(Box::new(dataset), "test.mmdb").unwrap();
        let manager = Arc::new(DatasetManager::new(handle));
        AppState {
            service: Arc::new(QueryService::new(manager, cache_enabled, 100)),
        }
    }

    fn city_state() -> AppState {
        state(
            StaticDataset::city()
                .with("8.8.8.8", city_record("US", "Mountain View", "CA"))
                .with("1.1.1.1", city_record("AU", "Sydney", ""))
                .with("9.9.9.9", city_record("CH", "", "ZH")),
            false,
        )
    }

    async fn request(state: AppState, uri: &str) -> (StatusCode, String) {
        let response = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_city_text_formats() {
        assert_eq!(
            request(city_state(), "/city/8.8.8.8").await,
            (StatusCode::OK, "US|Mountain View|CA\n".to_string())
        );
        assert_eq!(request(city_state(), "/city/1.1.1.1").await.1, "AU|Sydney\n");
        assert_eq!(request(city_state(), "/city/9.9.9.9").await.1, "CH||ZH\n");
        assert_eq!(request(city_state(), "/city/192.0.2.1").await.1, "XX\n");
    }

    #[tokio::test]
    async fn test_country_and_region_text() {
        assert_eq!(request(city_state(), "/country/8.8.8.8").await.1, "US\n");
        assert_eq!(request(city_state(), "/region/8.8.8.8").await.1, "US|CA\n");
        assert_eq!(request(city_state(), "/region/1.1.1.1").await.1, "AU\n");
    }

    #[tokio::test]
    async fn test_json_format() {
        let (status, body) = request(city_state(), "/city/8.8.8.8?format=json").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ip": "8.8.8.8",
                "country": "US",
                "city": "Mountain View",
                "region": "CA"
            })
        );

        let (_, body) = request(city_state(), "/region/192.0.2.1?format=json").await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json, serde_json::json!({"ip": "192.0.2.1", "country": "XX"}));

        // Any other format value falls back to text.
        assert_eq!(
            request(city_state(), "/country/8.8.8.8?format=xml").await.1,
            "US\n"
        );
    }

    #[tokio::test]
    async fn test_country_dataset_has_no_city_detail() {
        let country = state(
            StaticDataset::country().with("8.8.8.8", city_record("US", "Mountain View", "CA")),
            false,
        );
        assert_eq!(request(country, "/city/8.8.8.8").await.1, "US\n");
    }

    #[tokio::test]
    async fn test_invalid_ip_is_bad_request() {
        let (status, body) = request(city_state(), "/country/not-an-ip").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Invalid IP address\n");
    }

    #[tokio::test]
    async fn test_bare_prefix_shows_usage() {
        let (status, body) = request(city_state(), "/region/").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.starts_with("Usage: /region/{ip}"));
    }

    #[tokio::test]
    async fn test_root_names_dataset_type() {
        let (status, body) = request(city_state(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Database Type: City"));
        assert_eq!(request(city_state(), "/unknown").await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health() {
        assert_eq!(
            request(city_state(), "/health").await,
            (StatusCode::OK, "OK".to_string())
        );
    }

    #[tokio::test]
    async fn test_cache_stats_endpoint() {
        let state = state(
            StaticDataset::city().with("8.8.8.8", city_record("US", "Mountain View", "CA")),
            true,
        );
        request(state.clone(), "/country/8.8.8.8").await;
        request(state.clone(), "/country/8.8.8.8").await;

        let (_, body) = request(state, "/cache/stats").await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["enabled"], true);
        assert_eq!(json["hits"], 1);
        assert_eq!(json["misses"], 1);
        assert_eq!(json["size"], 1);
        assert_eq!(json["capacity"], 100);
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(serve(listener, city_state(), shutdown.clone()));
        shutdown.cancel();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), server)
            .await
            .expect("server did not stop")
            .unwrap();
        assert!(result.is_ok());
    }

    fn short_timeouts() -> ConnectionTimeouts {
        ConnectionTimeouts {
            header_read: Duration::from_millis(300),
            idle: Duration::from_millis(400),
            close_grace: Duration::from_millis(300),
        }
    }

    async fn start(timeouts: ConnectionTimeouts) -> (std::net::SocketAddr, CancellationToken) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        tokio::spawn(serve_with_timeouts(
            listener,
            city_state(),
            shutdown.clone(),
            timeouts,
        ));
        (addr, shutdown)
    }

    /// Reads until the peer closes, returning everything received.
    async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            match stream.read(&mut buf).await {
                Ok(0) | Err(_) => return received,
                Ok(n) => received.extend_from_slice(&buf[..n]),
            }
        }
    }

    #[tokio::test]
    async fn test_incomplete_request_head_is_cut_off() {
        let (addr, shutdown) = start(short_timeouts()).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        // Final blank line never arrives.
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: x\r\n")
            .await
            .unwrap();

        let started = Instant::now();
        tokio::time::timeout(Duration::from_secs(5), read_until_closed(&mut stream))
            .await
            .expect("connection stayed open past the header read timeout");
        assert!(started.elapsed() < Duration::from_secs(5));
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_idle_keep_alive_connection_is_closed() {
        let (addr, shutdown) = start(short_timeouts()).await;
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: x\r\n\r\n")
            .await
            .unwrap();

        let received =
            tokio::time::timeout(Duration::from_secs(5), read_until_closed(&mut stream))
                .await
                .expect("idle keep-alive connection was never closed");
        let received = String::from_utf8_lossy(&received);
        assert!(received.starts_with("HTTP/1.1 200 OK"), "{}", received);
        assert!(received.ends_with("OK"), "{}", received);
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_cancel_closes_open_connections() {
        let timeouts = ConnectionTimeouts {
            idle: Duration::from_secs(60),
            ..short_timeouts()
        };
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(serve_with_timeouts(
            listener,
            city_state(),
            shutdown.clone(),
            timeouts,
        ));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /country/8.8.8.8 HTTP/1.1\r\nHost: x\r\n\r\n")
            .await
            .unwrap();
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        while !received.ends_with(b"US\n") {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed before the response");
            received.extend_from_slice(&buf[..n]);
        }

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server did not drain")
            .unwrap()
            .unwrap();
        assert!(read_until_closed(&mut stream).await.is_empty());
    }
}
