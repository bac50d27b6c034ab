// Chunked newline-delimited JSON streaming of snapshots
use crate::domain::snapshot::Snapshot;
use axum::body::Body;
use axum::http::{Response, StatusCode, header};
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Stream every published snapshot as one JSON line.
///
/// The current snapshot is sent first. When nothing is published for
/// `keep_alive`, a bare newline is sent so displays can refresh their clock.
/// The stream ends when `shutdown` flips to true or the publisher goes away.
pub fn snapshot_stream(
    mut rx: watch::Receiver<Arc<Snapshot>>,
    mut shutdown: watch::Receiver<bool>,
    keep_alive: Duration,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    async_stream::stream! {
        let current = rx.borrow_and_update().clone();
        yield serialize_line(&current);

        loop {
            if *shutdown.borrow() {
                break;
            }

            let changed = tokio::select! {
                changed = tokio::time::timeout(keep_alive, rx.changed()) => changed,
                stopped = shutdown.changed() => {
                    if stopped.is_err() {
                        break;
                    }
                    continue;
                }
            };

            match changed {
                Ok(Ok(())) => {
                    let latest = rx.borrow_and_update().clone();
                    yield serialize_line(&latest);
                }
                // Publisher dropped: the service is shutting down
                Ok(Err(_)) => break,
                Err(_) => {
                    yield Ok(Bytes::from_static(b"\n"));
                }
            }
        }
    }
}

fn serialize_line(snapshot: &Snapshot) -> Result<Bytes, std::io::Error> {
    let json = serde_json::to_vec(snapshot)?;
    let mut line = BytesMut::with_capacity(json.len() + 1);
    line.put_slice(&json);
    line.put_u8(b'\n');
    Ok(line.freeze())
}

/// Create a chunked NDJSON response that follows the snapshot channel
pub fn snapshot_stream_response(
    rx: watch::Receiver<Arc<Snapshot>>,
    shutdown: watch::Receiver<bool>,
    keep_alive: Duration,
) -> Result<Response<Body>, StatusCode> {
    let body = Body::from_stream(snapshot_stream(rx, shutdown, keep_alive));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
        .map_err(|e| {
            tracing::error!(error=%e, "failed to build snapshot stream response");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}
