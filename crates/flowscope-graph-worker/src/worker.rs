//! The background thread that serves graph requests.
//!
//! Requests and responses cross the thread boundary as JSON lines, the same
//! shape a browser worker would receive, so nothing but plain data is shared.

use std::io;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{debug, warn};

/// Name given to the worker thread.
pub const WORKER_THREAD_NAME: &str = "flowscope-graph-worker";

/// Turns one encoded request into one encoded response.
pub type Handler = Box<dyn FnMut(&str) -> String + Send + 'static>;

/// Channels and handle of a running worker thread.
pub(crate) struct WorkerThread {
    pub(crate) requests: mpsc::Sender<String>,
    pub(crate) responses: UnboundedReceiver<String>,
    pub(crate) handle: JoinHandle<()>,
}

/// Start a worker thread that answers every request with `handler`.
///
/// The thread stops when the request sender is dropped, or when the handler
/// panics. Either way the response channel closes, which is how the client
/// learns the worker is gone.
pub(crate) fn spawn_worker(mut handler: Handler) -> io::Result<WorkerThread> {
    let (request_tx, request_rx) = mpsc::channel::<String>();
    let (response_tx, response_rx) = unbounded_channel::<String>();

    let handle = thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || {
            debug!("graph worker started");
            while let Ok(request) = request_rx.recv() {
                let response = handler(&request);
                if response_tx.send(response).is_err() {
                    warn!("graph worker response channel closed");
                    break;
                }
            }
            debug!("graph worker stopped");
        })?;

    Ok(WorkerThread {
        requests: request_tx,
        responses: response_rx,
        handle,
    })
}

/// Handler serving the graph protocol.
pub fn protocol_handler() -> Handler {
    Box::new(flowscope_graph::handle_json)
}
