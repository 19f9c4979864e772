//! Async client for the graph worker thread.

use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use flowscope_graph::{WorkerRequest, WorkerResponse};
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, warn};

use crate::error::{WorkerError, WorkerResult};
use crate::worker::{protocol_handler, spawn_worker, Handler};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<WorkerResult<WorkerResponse>>>>>;

/// Async client for the graph worker.
///
/// Each request carries an id; responses are matched to waiting callers by
/// that id, so several requests can be in flight at once. When the worker
/// exits, every pending request is rejected with [`WorkerError::WorkerExited`].
///
/// Must be created inside a Tokio runtime.
pub struct WorkerClient {
    /// Sender for encoded requests.
    requests: mpsc::Sender<String>,

    /// Map of pending request ids to response channels.
    pending: Pending,

    /// Handle to the background reader task.
    reader_task: tokio::task::JoinHandle<()>,

    _thread: JoinHandle<()>,
}

impl WorkerClient {
    /// Spawn a worker thread serving the graph protocol.
    pub fn spawn() -> WorkerResult<Self> {
        Self::spawn_with_handler(protocol_handler())
    }

    /// Spawn a worker thread answering with a custom handler.
    pub fn spawn_with_handler(handler: Handler) -> WorkerResult<Self> {
        let worker = spawn_worker(handler).map_err(WorkerError::SpawnFailed)?;
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let reader_task = Self::spawn_reader_task(worker.responses, pending.clone());

        Ok(Self {
            requests: worker.requests,
            pending,
            reader_task,
            _thread: worker.handle,
        })
    }

    /// Spawn the background task that routes responses to waiting callers.
    fn spawn_reader_task(
        mut responses: tokio::sync::mpsc::UnboundedReceiver<String>,
        pending: Pending,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(line) = responses.recv().await {
                let value = match serde_json::from_str::<serde_json::Value>(&line) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(error = %e, "worker response is not JSON");
                        continue;
                    }
                };
                let request_id = value.get("requestId").and_then(serde_json::Value::as_u64);
                let Some(request_id) = request_id else {
                    warn!("worker response has no request id");
                    continue;
                };

                let response = serde_json::from_value::<WorkerResponse>(value)
                    .map_err(WorkerError::DeserializeFailed);
                if let Err(e) = &response {
                    warn!(request_id, error = %e, "failed to parse worker response");
                }
                let mut pending = pending.lock().await;
                match pending.remove(&request_id) {
                    Some(tx) => {
                        let _ = tx.send(response);
                    }
                    None => debug!(request_id, "dropping unclaimed response"),
                }
            }

            // Worker exited - reject everything still waiting
            let mut pending = pending.lock().await;
            if !pending.is_empty() {
                warn!(pending = pending.len(), "graph worker exited with requests in flight");
            }
            for (_, tx) in pending.drain() {
                let _ = tx.send(Err(WorkerError::WorkerExited));
            }
        })
    }

    /// Send a request and wait for its response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be encoded or the worker exits
    /// before answering.
    pub async fn request(&self, request: &WorkerRequest) -> WorkerResult<WorkerResponse> {
        let id = request.request_id();
        let line = serde_json::to_string(request).map_err(WorkerError::SerializeFailed)?;

        // Register response channel
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        if self.requests.send(line).is_err() {
            self.pending.lock().await.remove(&id);
            return Err(WorkerError::WorkerExited);
        }

        rx.await?
    }

    /// Stop waiting for a request. Its response, if one still arrives, is dropped.
    pub async fn discard(&self, request_id: u64) {
        self.pending.lock().await.remove(&request_id);
    }

    /// Release every pending request.
    pub async fn discard_all(&self) {
        self.pending.lock().await.clear();
    }

    /// Number of requests waiting for a response.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Returns `false` once the worker has exited.
    pub fn is_alive(&self) -> bool {
        !self.reader_task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowscope_graph::protocol::LayoutRequest;
    use flowscope_graph::{FlowNodeKind, LayoutAlgorithm, LayoutDirection, SizingHints};

    fn layout_request(request_id: u64) -> WorkerRequest {
        WorkerRequest::Layout(LayoutRequest {
            request_id,
            nodes: vec![SizingHints {
                id: "a".to_string(),
                node_type: FlowNodeKind::TableNode,
                column_count: 2,
                filter_count: 0,
                is_collapsed: false,
            }],
            edges: vec![],
            direction: LayoutDirection::LR,
            algorithm: LayoutAlgorithm::Rank,
        })
    }

    #[tokio::test]
    async fn test_request_round_trip() {
        let client = WorkerClient::spawn().unwrap();
        let response = client.request(&layout_request(5)).await.unwrap();
        assert_eq!(response.request_id(), 5);
        let WorkerResponse::Layout(layout) = response else {
            panic!("expected a layout response");
        };
        assert!(layout.positions.contains_key("a"));
        assert_eq!(client.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_panicking_worker_rejects_pending() {
        let client = WorkerClient::spawn_with_handler(Box::new(|_| panic!("boom"))).unwrap();
        let err = client.request(&layout_request(1)).await.unwrap_err();
        assert!(err.is_worker_exited());
    }

    #[tokio::test]
    async fn test_malformed_response_rejects_its_request() {
        let handler: Handler = Box::new(|line| {
            let request: serde_json::Value = serde_json::from_str(line).unwrap();
            serde_json::json!({
                "requestId": request["requestId"],
                "positions": "not a map",
            })
            .to_string()
        });
        let client = WorkerClient::spawn_with_handler(handler).unwrap();

        let err = client.request(&layout_request(7)).await.unwrap_err();
        assert!(matches!(err, WorkerError::DeserializeFailed(_)));
        assert!(!err.is_worker_exited());
        assert_eq!(client.pending_count().await, 0);
        assert!(client.is_alive());
    }
}
