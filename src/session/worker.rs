//! Off-thread export protocol.
//!
//! A host sends `start` messages and receives zero or more `progress` messages followed by
//! exactly one `result` or `error` per task. Messages are serde-tagged by `type` so they can
//! cross a process or FFI boundary as JSON unchanged.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::adjust::model::EditingAdjustments;
use crate::assets::source::SourceInput;
use crate::config::{BackendChoice, RendererOpts};
use crate::film::model::FilmProfileInput;
use crate::foundation::cancel::CancellationToken;
use crate::foundation::core::{RenderMode, TargetSize};
use crate::foundation::error::{FilmError, FilmResult};
use crate::session::context::{
    ExportRequest, ExportStage, QualityProfile, RenderRequest, RendererContext,
};

/// Slot used by worker exports.
const WORKER_SLOT: &str = "worker";

/// Export job description carried by [`WorkerRequest::Start`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPayload {
    /// Caller-chosen id echoed on every response.
    pub task_id: String,
    /// Encoded source.
    pub source: SourceInput,
    /// Output MIME type.
    pub output_type: String,
    /// JPEG quality `1..=100`.
    #[serde(default)]
    pub quality: Option<u8>,
    /// Longest output edge; source size when absent.
    #[serde(default)]
    pub max_dimension: Option<u32>,
    /// Adjustment stack.
    #[serde(default)]
    pub adjustments: EditingAdjustments,
    /// Explicit film profile.
    #[serde(default)]
    pub film_profile: Option<FilmProfileInput>,
    /// Per-asset seed identity.
    #[serde(default)]
    pub seed_key: Option<String>,
    /// Per-asset seed salt.
    #[serde(default)]
    pub seed_salt: Option<String>,
    /// Seed for `perExport` modules; random when absent.
    #[serde(default)]
    pub export_seed: Option<u64>,
    /// Backend override for this task.
    #[serde(default)]
    pub renderer: Option<BackendChoice>,
}

impl StartPayload {
    fn into_export(self, cancel: CancellationToken) -> ExportRequest {
        let mut render = RenderRequest::new(self.source, self.adjustments);
        render.film_profile = self.film_profile;
        render.mode = RenderMode::Export;
        render.quality = QualityProfile::Full;
        render.target_size = match self.max_dimension {
            Some(max) if max > 0 => TargetSize::MaxDimension { max },
            _ => TargetSize::Source,
        };
        render.seed_key = self.seed_key;
        render.seed_salt = self.seed_salt;
        render.export_seed = self.export_seed;
        render.strict_errors = true;
        render.render_slot = Some(WORKER_SLOT.to_string());
        render.cancel = cancel;
        ExportRequest {
            render,
            mime: self.output_type,
            quality: self.quality,
        }
    }
}

/// Host to worker.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkerRequest {
    /// Begin an export.
    Start {
        /// Job description.
        payload: StartPayload,
    },
}

/// Worker to host.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WorkerResponse {
    /// Intermediate progress in `[0, 1]`.
    Progress {
        /// Task this belongs to.
        task_id: String,
        /// Fraction complete.
        progress: f32,
        /// Phase being entered.
        stage: ExportStage,
    },
    /// Terminal success.
    Result {
        /// Task this belongs to.
        task_id: String,
        /// Encoded output.
        blob: Vec<u8>,
    },
    /// Terminal failure.
    Error {
        /// Task this belongs to.
        task_id: String,
        /// Display form of the failure.
        message: String,
    },
}

impl WorkerResponse {
    /// Task id of any response.
    pub fn task_id(&self) -> &str {
        match self {
            Self::Progress { task_id, .. }
            | Self::Result { task_id, .. }
            | Self::Error { task_id, .. } => task_id,
        }
    }

    /// Whether this is the last message of its task.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

type CancelMap = Arc<Mutex<HashMap<String, CancellationToken>>>;

/// Handle to a background export thread.
///
/// Tasks run one at a time in submission order. Each backend choice gets its own
/// [`RendererContext`], built on first use and kept for the worker's lifetime.
#[derive(Debug)]
pub struct ExportWorker {
    requests: Option<mpsc::Sender<WorkerRequest>>,
    responses: mpsc::Receiver<WorkerResponse>,
    cancels: CancelMap,
    thread: Option<JoinHandle<()>>,
}

impl ExportWorker {
    /// Start the worker thread.
    pub fn spawn(opts: RendererOpts) -> FilmResult<Self> {
        let (req_tx, req_rx) = mpsc::channel::<WorkerRequest>();
        let (res_tx, res_rx) = mpsc::channel::<WorkerResponse>();
        let cancels = CancelMap::default();
        let shared = Arc::clone(&cancels);
        let thread = std::thread::Builder::new()
            .name("filmlab-export".to_string())
            .spawn(move || worker_loop(opts, req_rx, res_tx, shared))
            .map_err(|e| FilmError::Other(anyhow::anyhow!("spawn export worker: {e}")))?;
        Ok(Self {
            requests: Some(req_tx),
            responses: res_rx,
            cancels,
            thread: Some(thread),
        })
    }

    /// Queue a request.
    pub fn send(&self, req: WorkerRequest) -> FilmResult<()> {
        let WorkerRequest::Start { payload } = &req;
        self.cancels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(payload.task_id.clone())
            .or_default();
        self.requests
            .as_ref()
            .ok_or_else(|| FilmError::context_unavailable("export worker shut down"))?
            .send(req)
            .map_err(|_| FilmError::context_unavailable("export worker is not running"))
    }

    /// Next response, blocking. `None` once the worker has exited and drained.
    pub fn recv(&self) -> Option<WorkerResponse> {
        self.responses.recv().ok()
    }

    /// Next response, waiting at most `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<WorkerResponse> {
        self.responses.recv_timeout(timeout).ok()
    }

    /// Cancel a queued or running task. Returns whether the task was known.
    pub fn cancel(&self, task_id: &str) -> bool {
        match self
            .cancels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(task_id)
        {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stop accepting requests, finish queued ones and join the thread.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.requests = None;
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("export worker panicked");
        }
    }
}

impl Drop for ExportWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    opts: RendererOpts,
    requests: mpsc::Receiver<WorkerRequest>,
    responses: mpsc::Sender<WorkerResponse>,
    cancels: CancelMap,
) {
    let mut contexts: HashMap<BackendChoice, RendererContext> = HashMap::new();
    for req in requests {
        let WorkerRequest::Start { payload } = req;
        let task_id = payload.task_id.clone();
        let choice = payload.renderer.unwrap_or(opts.backend);
        let cancel = cancels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&task_id)
            .cloned()
            .unwrap_or_default();
        let ctx = contexts.entry(choice).or_insert_with(|| {
            RendererContext::new(RendererOpts {
                backend: choice,
                ..opts.clone()
            })
        });

        let span = tracing::debug_span!("export_task", task = %task_id);
        let _enter = span.enter();
        let export = payload.into_export(cancel);
        let result = ctx.export_with_progress(&export, &mut |stage, progress| {
            // The host may have stopped listening; the task still runs to completion.
            let _ = responses.send(WorkerResponse::Progress {
                task_id: task_id.clone(),
                progress,
                stage,
            });
        });
        cancels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&task_id);

        let terminal = match result {
            Ok(blob) => WorkerResponse::Result { task_id, blob },
            Err(err) => {
                tracing::warn!(error = %err, "export task failed");
                WorkerResponse::Error {
                    task_id,
                    message: err.to_string(),
                }
            }
        };
        if responses.send(terminal).is_err() {
            tracing::debug!("export host disconnected; stopping worker");
            break;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/worker.rs"]
mod tests;
