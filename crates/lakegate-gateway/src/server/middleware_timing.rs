//! Request timing middleware.
//!
//! One log line per request with method, path, status, and elapsed
//! time; the elapsed time is echoed back in an `x-process-time`
//! header. Forwarded credential headers are never logged.

use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

pub async fn process_time_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let start = Instant::now();
    let mut response = next.run(request).await;
    let elapsed = start.elapsed();

    let millis = elapsed.as_secs_f64() * 1000.0;
    if let Ok(value) = HeaderValue::from_str(&format!("{:.4}", elapsed.as_secs_f64())) {
        response.headers_mut().insert("x-process-time", value);
    }

    info!(
        "[Gateway] {} {} -> {} ({:.1}ms)",
        method,
        path,
        response.status().as_u16(),
        millis
    );

    response
}
