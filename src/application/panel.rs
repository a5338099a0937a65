// Panel lifecycle - a delayed, one-shot load feeding a display state
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "lowercase")]
pub enum PanelState<T> {
    Loading,
    Loaded(T),
    Empty,
}

impl<T> PanelState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Wire name of the lifecycle stage, as in the serialized form.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Loaded(_) => "loaded",
            Self::Empty => "empty",
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Loaded(data) => Some(data),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PanelState<U> {
        match self {
            Self::Loading => PanelState::Loading,
            Self::Loaded(data) => PanelState::Loaded(f(data)),
            Self::Empty => PanelState::Empty,
        }
    }
}

/// What the background load did with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The panel was still mounted and took the result
    Applied,
    /// The panel was gone by the time the result arrived
    Discarded,
    /// The panel was gone before the delay elapsed; nothing was fetched
    Skipped,
}

/// A display panel that loads its content once, after a delay.
///
/// The panel owns its state. The background task only holds a weak
/// reference, so once the panel is dropped or unmounted a late result
/// has nowhere to go and is discarded.
pub struct Panel<T> {
    name: &'static str,
    state: Arc<watch::Sender<PanelState<T>>>,
    task: JoinHandle<LoadOutcome>,
}

impl<T> Panel<T>
where
    T: Send + Sync + 'static,
{
    pub fn mount<F, Fut>(name: &'static str, delay: Duration, load: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Option<T>> + Send + 'static,
    {
        let (sender, _) = watch::channel(PanelState::Loading);
        let state = Arc::new(sender);
        let task = tokio::spawn(run_load(name, delay, Arc::downgrade(&state), load));
        tracing::debug!("{} panel mounted (delay {:?})", name, delay);
        Self { name, state, task }
    }

    pub fn state(&self) -> PanelState<T>
    where
        T: Clone,
    {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PanelState<T>> {
        self.state.subscribe()
    }

    /// Tear the panel down, handing back the load task so the caller can
    /// see what became of the pending result.
    pub fn unmount(self) -> JoinHandle<LoadOutcome> {
        tracing::debug!("{} panel unmounted", self.name);
        drop(self.state);
        self.task
    }
}

async fn run_load<T, F, Fut>(
    name: &'static str,
    delay: Duration,
    state: Weak<watch::Sender<PanelState<T>>>,
    load: F,
) -> LoadOutcome
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if state.strong_count() == 0 {
        tracing::debug!("{} panel unmounted before loading, skipping fetch", name);
        return LoadOutcome::Skipped;
    }

    let result = load().await;

    let Some(state) = state.upgrade() else {
        tracing::debug!("{} panel unmounted, discarding late result", name);
        return LoadOutcome::Discarded;
    };
    let next = match result {
        Some(data) => PanelState::Loaded(data),
        None => {
            tracing::warn!("{} panel has no data to show", name);
            PanelState::Empty
        }
    };
    state.send_replace(next);
    LoadOutcome::Applied
}
