//! Last-request-wins graph computation.
//!
//! Graph builds and layouts run on the worker thread, each on its own logical
//! channel. Every request gets a fresh id; a newer request on the same channel
//! supersedes any older one still in flight. Superseded results are never
//! returned, whichever order the responses arrive in.

use std::sync::atomic::{AtomicU64, Ordering};

use flowscope_graph::protocol::{GraphResponse, LayoutRequest, LayoutResponse};
use flowscope_graph::{handle_request, WorkerRequest, WorkerResponse};
use tracing::{debug, warn};

use crate::client::WorkerClient;
use crate::error::{WorkerError, WorkerResult};

/// Result of a request that may have been overtaken by a newer one.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ready(T),
    Superseded,
}

impl<T> Outcome<T> {
    pub fn is_superseded(&self) -> bool {
        matches!(self, Outcome::Superseded)
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Outcome::Ready(value) => Some(value),
            Outcome::Superseded => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Graph,
    Layout,
}

/// Graph and layout computation with supersede and fallback.
///
/// Without a worker (or once the worker has died) requests are computed on
/// the calling task.
pub struct GraphService {
    client: Option<WorkerClient>,
    next_id: AtomicU64,
    latest_graph: AtomicU64,
    latest_layout: AtomicU64,
    /// Requests with an id at or below this were cancelled
    cancelled_through: AtomicU64,
}

impl GraphService {
    /// Service backed by a fresh worker thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread cannot be spawned.
    pub fn spawn() -> WorkerResult<Self> {
        Ok(Self::with_client(Some(WorkerClient::spawn()?)))
    }

    /// Service computing everything on the calling task.
    pub fn synchronous() -> Self {
        Self::with_client(None)
    }

    pub fn with_client(client: Option<WorkerClient>) -> Self {
        Self {
            client,
            next_id: AtomicU64::new(0),
            latest_graph: AtomicU64::new(0),
            latest_layout: AtomicU64::new(0),
            cancelled_through: AtomicU64::new(0),
        }
    }

    pub fn has_worker(&self) -> bool {
        self.client.as_ref().is_some_and(WorkerClient::is_alive)
    }

    /// Build a table or script graph.
    ///
    /// A build failure is logged and answered with the empty graph the worker
    /// sent back.
    pub async fn build_graph(&self, request: WorkerRequest) -> Outcome<GraphResponse> {
        match self.dispatch(Channel::Graph, request).await {
            Outcome::Ready(WorkerResponse::Graph(response)) => {
                if let Some(error) = &response.error {
                    warn!(request_id = response.request_id, %error, "graph build failed");
                }
                Outcome::Ready(response)
            }
            Outcome::Ready(WorkerResponse::Layout(response)) => {
                warn!(request_id = response.request_id, "layout response to a graph request");
                Outcome::Ready(GraphResponse {
                    request_id: response.request_id,
                    error: Some("unexpected layout response".to_string()),
                    ..GraphResponse::default()
                })
            }
            Outcome::Superseded => Outcome::Superseded,
        }
    }

    /// Compute a layout. A layout the worker could not compute is an error.
    pub async fn layout(&self, request: LayoutRequest) -> Outcome<WorkerResult<LayoutResponse>> {
        match self.dispatch(Channel::Layout, WorkerRequest::Layout(request)).await {
            Outcome::Ready(WorkerResponse::Layout(response)) => match response.error {
                Some(error) => Outcome::Ready(Err(WorkerError::Remote(error))),
                None => Outcome::Ready(Ok(response)),
            },
            Outcome::Ready(WorkerResponse::Graph(response)) => {
                let error = response
                    .error
                    .unwrap_or_else(|| "unexpected graph response".to_string());
                Outcome::Ready(Err(WorkerError::Remote(error)))
            }
            Outcome::Superseded => Outcome::Superseded,
        }
    }

    /// Supersede every request in flight and release pending entries.
    pub async fn cancel(&self) {
        let last = self.next_id.load(Ordering::SeqCst);
        self.cancelled_through.fetch_max(last, Ordering::SeqCst);
        debug!(cancelled_through = last, "cancelled graph requests");
        if let Some(client) = &self.client {
            client.discard_all().await;
        }
    }

    fn latest(&self, channel: Channel) -> &AtomicU64 {
        match channel {
            Channel::Graph => &self.latest_graph,
            Channel::Layout => &self.latest_layout,
        }
    }

    fn is_superseded(&self, channel: Channel, id: u64) -> bool {
        id <= self.cancelled_through.load(Ordering::SeqCst)
            || self.latest(channel).load(Ordering::SeqCst) != id
    }

    async fn dispatch(
        &self,
        channel: Channel,
        mut request: WorkerRequest,
    ) -> Outcome<WorkerResponse> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest(channel).fetch_max(id, Ordering::SeqCst);
        request.set_request_id(id);

        // Let the caller's loading state render before any work starts.
        tokio::task::yield_now().await;
        if self.is_superseded(channel, id) {
            debug!(request_id = id, ?channel, "superseded before dispatch");
            return Outcome::Superseded;
        }

        let response = match &self.client {
            Some(client) if client.is_alive() => match client.request(&request).await {
                Ok(response) => Some(response),
                Err(e) => {
                    if self.is_superseded(channel, id) {
                        return Outcome::Superseded;
                    }
                    warn!(
                        request_id = id,
                        error = %e,
                        "worker request failed, computing on the calling task"
                    );
                    None
                }
            },
            _ => None,
        };
        let response = response.unwrap_or_else(|| handle_request(request));

        if self.is_superseded(channel, id) {
            debug!(request_id = id, ?channel, "discarding superseded response");
            return Outcome::Superseded;
        }
        Outcome::Ready(response)
    }
}
