//! Run context: identity, cancellation, provider concurrency caps
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Cooperative cancellation flag, checked between stages and calls.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-provider concurrency caps, shared across concurrent runs.
///
/// Caps are injected configuration; a provider without a cap is
/// unbounded. Acquisition is fair FIFO per tokio's semaphore.
#[derive(Debug, Default)]
pub struct ProviderGate {
    limits: HashMap<String, Arc<Semaphore>>,
}

impl ProviderGate {
    pub fn new(caps: &HashMap<String, usize>) -> Self {
        let limits = caps
            .iter()
            .map(|(name, cap)| (name.clone(), Arc::new(Semaphore::new(*cap))))
            .collect();
        Self { limits }
    }

    /// No caps at all.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Wait for a slot on the named provider. Returns `None` when the
    /// provider is uncapped; the permit releases its slot on drop.
    pub async fn acquire(&self, provider: &str) -> Option<OwnedSemaphorePermit> {
        let semaphore = self.limits.get(provider)?.clone();
        // acquire_owned only errs on close, which we never do
        semaphore.acquire_owned().await.ok()
    }

    /// Remaining slots for a capped provider, `None` when uncapped.
    pub fn available(&self, provider: &str) -> Option<usize> {
        self.limits.get(provider).map(|s| s.available_permits())
    }
}

/// Identity and control surface of one run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub agent_id: String,
    pub cancel: CancelToken,
    pub providers: Arc<ProviderGate>,
}

impl RunContext {
    pub fn new(agent_id: impl Into<String>, providers: Arc<ProviderGate>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            agent_id: agent_id.into(),
            cancel: CancelToken::new(),
            providers,
        }
    }
}
