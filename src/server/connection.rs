//! Serving one accepted connection.
//!
//! hyper bounds how long a client may take to send a request head. Keep-alive
//! connections with nothing in flight are closed after the idle timeout, and a
//! connection that is closing gets a fixed grace period before it is dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::Router;
use hyper::body::Incoming;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use crate::config::{CONNECTION_IDLE_TIMEOUT, REQUEST_TIMEOUT};

/// Time limits applied to every accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionTimeouts {
    /// Limit for receiving a complete request head
    pub header_read: Duration,
    /// Limit for a keep-alive connection with no request in flight
    pub idle: Duration,
    /// Time a closing connection gets to finish what it is writing
    pub close_grace: Duration,
}

impl Default for ConnectionTimeouts {
    fn default() -> Self {
        Self {
            header_read: REQUEST_TIMEOUT,
            idle: CONNECTION_IDLE_TIMEOUT,
            close_grace: REQUEST_TIMEOUT,
        }
    }
}

/// Requests in flight on one connection, and when the last one finished.
struct Activity {
    in_flight: AtomicUsize,
    last_finished: Mutex<Instant>,
}

impl Activity {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            last_finished: Mutex::new(Instant::now()),
        }
    }

    fn begin(self: &Arc<Self>) -> RequestGuard {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        RequestGuard(Arc::clone(self))
    }

    /// Zero while a request is running.
    fn idle_for(&self) -> Duration {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return Duration::ZERO;
        }
        self.last_finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }
}

struct RequestGuard(Arc<Activity>);

impl Drop for RequestGuard {
    fn drop(&mut self) {
        *self
            .0
            .last_finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Serves HTTP/1 or HTTP/2 on `stream` until the client leaves, a timeout
/// fires, or `shutdown` is cancelled.
pub(crate) async fn serve_connection(
    stream: TcpStream,
    app: Router,
    timeouts: ConnectionTimeouts,
    shutdown: CancellationToken,
) {
    let activity = Arc::new(Activity::new());
    let service = {
        let activity = Arc::clone(&activity);
        hyper::service::service_fn(move |request: Request<Incoming>| {
            let guard = activity.begin();
            let app = app.clone();
            async move {
                let response = app.oneshot(request).await;
                drop(guard);
                response
            }
        })
    };

    let mut builder = Builder::new(TokioExecutor::new());
    builder
        .http1()
        .timer(TokioTimer::new())
        .header_read_timeout(timeouts.header_read);
    let connection = builder.serve_connection(TokioIo::new(stream), service);
    tokio::pin!(connection);

    let check_every = (timeouts.idle / 4)
        .min(Duration::from_secs(1))
        .max(Duration::from_millis(10));
    let mut close_by: Option<tokio::time::Instant> = None;
    loop {
        tokio::select! {
            result = connection.as_mut() => {
                if let Err(e) = result {
                    log::debug!("Connection closed with error: {}", e);
                }
                return;
            }
            _ = shutdown.cancelled(), if close_by.is_none() => {
                connection.as_mut().graceful_shutdown();
                close_by = Some(tokio::time::Instant::now() + timeouts.close_grace);
            }
            _ = tokio::time::sleep(check_every), if close_by.is_none() => {
                if activity.idle_for() >= timeouts.idle {
                    log::debug!("Closing connection idle for {:?}", timeouts.idle);
                    connection.as_mut().graceful_shutdown();
                    close_by = Some(tokio::time::Instant::now() + timeouts.close_grace);
                }
            }
            _ = tokio::time::sleep_until(close_by.unwrap_or_else(tokio::time::Instant::now)),
                if close_by.is_some() => {
                log::debug!(
                    "Connection did not close within {:?}, dropping it",
                    timeouts.close_grace
                );
                return;
            }
        }
    }
}
