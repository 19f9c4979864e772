//! Background computation for FlowScope lineage views.
//!
//! Graph builds and layouts run on a dedicated worker thread behind an async
//! client. The [`GraphService`] adds last-request-wins semantics and falls back
//! to computing on the calling task when the worker is unavailable, and the
//! [`RenderSession`] drives the two-stage render of a view.
//!
//! # Architecture
//!
//! ```text
//! RenderSession ──► GraphService ──► WorkerClient ══ JSON lines ══► worker thread
//!      │                 │                                           (handle_json)
//!      ▼                 └── sync fallback: handle_request
//! StagingController
//! ```

mod client;
mod error;
pub mod service;
pub mod session;
mod worker;

pub use client::WorkerClient;
pub use error::{WorkerError, WorkerResult};
pub use service::{GraphService, Outcome};
pub use session::{RenderSession, RenderStatus};
pub use worker::{protocol_handler, Handler, WORKER_THREAD_NAME};
