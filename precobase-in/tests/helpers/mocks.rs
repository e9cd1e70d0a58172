//! Mock completion services
//!
//! Deterministic stand-ins for the external classifier so tests never
//! touch the network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use precobase_in::classifier::completion::{CompletionError, CompletionRequest, CompletionService};

/// Replays a fixed script of responses, one per call.
///
/// Panics when called more often than scripted, which also makes it a
/// call counter: `calls()` asserts how often the classifier actually
/// reached out.
pub struct ScriptedCompletion {
    script: Mutex<VecDeque<Result<String, CompletionError>>>,
    calls: AtomicUsize,
}

impl ScriptedCompletion {
    pub fn new(responses: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Script a single successful response
    pub fn single(response: &str) -> Self {
        Self::new(vec![Ok(response.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .expect("ScriptedCompletion called more often than scripted")
    }
}

/// Answers every call with the same response
pub struct UniformCompletion {
    response: String,
    calls: AtomicUsize,
}

impl UniformCompletion {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for UniformCompletion {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

/// Fails every call with a timeout
pub struct TimeoutCompletion;

#[async_trait]
impl CompletionService for TimeoutCompletion {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        Err(CompletionError::Timeout)
    }
}

/// Parks the first call until released, so tests can observe a batch
/// mid-flight. Signals on `started` when the call arrives; later calls
/// pass straight through.
pub struct GatedCompletion {
    response: String,
    started_tx: tokio::sync::mpsc::UnboundedSender<()>,
    release_rx: Mutex<Option<tokio::sync::oneshot::Receiver<()>>>,
}

impl GatedCompletion {
    #[allow(clippy::type_complexity)]
    pub fn new(
        response: &str,
    ) -> (
        std::sync::Arc<Self>,
        tokio::sync::mpsc::UnboundedReceiver<()>,
        tokio::sync::oneshot::Sender<()>,
    ) {
        let (started_tx, started_rx) = tokio::sync::mpsc::unbounded_channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel();
        let mock = std::sync::Arc::new(Self {
            response: response.to_string(),
            started_tx,
            release_rx: Mutex::new(Some(release_rx)),
        });
        (mock, started_rx, release_tx)
    }
}

#[async_trait]
impl CompletionService for GatedCompletion {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, CompletionError> {
        let _ = self.started_tx.send(());
        let receiver = self.release_rx.lock().expect("gate mutex poisoned").take();
        if let Some(receiver) = receiver {
            let _ = receiver.await;
        }
        Ok(self.response.clone())
    }
}
