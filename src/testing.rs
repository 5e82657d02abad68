//! Test doubles for the engine and surface host

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::player::{EngineError, MediaEngine, StreamTier};
use crate::stream::RenderParams;
use crate::surface::{SurfaceHost, SurfaceObserver, ViewHandle};

/// A call received by [`RecordingEngine`]
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    StartDecode(String, StreamTier, Vec<ViewHandle>),
    StopDecode(String, StreamTier),
    UpdateRemote(String, StreamTier, Vec<ViewHandle>),
    BindLocal(Vec<ViewHandle>),
    RenderParams(String, StreamTier, RenderParams),
    LocalRenderParams(RenderParams),
}

/// Engine that records every call and can be told to fail
#[derive(Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
    fail_next: Mutex<Option<EngineError>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn take_calls(&self) -> Vec<EngineCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    pub fn starts(&self) -> Vec<EngineCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, EngineCall::StartDecode(..)))
            .collect()
    }

    pub fn stops(&self) -> Vec<EngineCall> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, EngineCall::StopDecode(..)))
            .collect()
    }

    /// Make the next call fail with `error`
    pub fn fail_next(&self, error: EngineError) {
        *self.fail_next.lock() = Some(error);
    }

    fn record(&self, call: EngineCall) -> impl Future<Output = Result<(), EngineError>> + Send {
        self.calls.lock().push(call);
        let result = match self.fail_next.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        };
        async move {
            tokio::task::yield_now().await;
            result
        }
    }
}

impl MediaEngine for RecordingEngine {
    fn start_decode(
        &self,
        subject_id: &str,
        tier: StreamTier,
        surfaces: &[ViewHandle],
    ) -> impl Future<Output = Result<(), EngineError>> + Send {
        self.record(EngineCall::StartDecode(subject_id.into(), tier, surfaces.to_vec()))
    }

    fn stop_decode(
        &self,
        subject_id: &str,
        tier: StreamTier,
    ) -> impl Future<Output = Result<(), EngineError>> + Send {
        self.record(EngineCall::StopDecode(subject_id.into(), tier))
    }

    fn update_remote_surfaces(
        &self,
        subject_id: &str,
        tier: StreamTier,
        surfaces: &[ViewHandle],
    ) -> impl Future<Output = Result<(), EngineError>> + Send {
        self.record(EngineCall::UpdateRemote(subject_id.into(), tier, surfaces.to_vec()))
    }

    fn bind_local_surfaces(
        &self,
        surfaces: &[ViewHandle],
    ) -> impl Future<Output = Result<(), EngineError>> + Send {
        self.record(EngineCall::BindLocal(surfaces.to_vec()))
    }

    fn set_render_params(
        &self,
        subject_id: &str,
        tier: StreamTier,
        params: RenderParams,
    ) -> impl Future<Output = Result<(), EngineError>> + Send {
        self.record(EngineCall::RenderParams(subject_id.into(), tier, params))
    }

    fn set_local_render_params(
        &self,
        params: RenderParams,
    ) -> impl Future<Output = Result<(), EngineError>> + Send {
        self.record(EngineCall::LocalRenderParams(params))
    }
}

#[derive(Default)]
struct HostState {
    detached: HashSet<ViewHandle>,
    visibility_observed: HashSet<ViewHandle>,
    size_observed: HashSet<ViewHandle>,
    visibility_created: usize,
    live_visibility: usize,
    live_size: usize,
}

#[derive(Clone, Copy, PartialEq)]
enum ObserverKind {
    Visibility,
    Size,
}

struct FakeObserver {
    kind: ObserverKind,
    state: Arc<Mutex<HostState>>,
    connected: bool,
}

impl SurfaceObserver for FakeObserver {
    fn observe(&mut self, view: &ViewHandle) {
        let mut state = self.state.lock();
        let set = match self.kind {
            ObserverKind::Visibility => &mut state.visibility_observed,
            ObserverKind::Size => &mut state.size_observed,
        };
        set.insert(view.clone());
    }

    fn unobserve(&mut self, view: &ViewHandle) {
        let mut state = self.state.lock();
        let set = match self.kind {
            ObserverKind::Visibility => &mut state.visibility_observed,
            ObserverKind::Size => &mut state.size_observed,
        };
        set.remove(view);
    }

    fn disconnect(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        let mut state = self.state.lock();
        match self.kind {
            ObserverKind::Visibility => {
                state.visibility_observed.clear();
                state.live_visibility -= 1;
            }
            ObserverKind::Size => {
                state.size_observed.clear();
                state.live_size -= 1;
            }
        }
    }
}

/// Surface host where every view is attached unless detached explicitly
#[derive(Default)]
pub struct FakeSurfaceHost {
    state: Arc<Mutex<HostState>>,
}

impl FakeSurfaceHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detach(&self, view: &ViewHandle) {
        self.state.lock().detached.insert(view.clone());
    }

    pub fn is_visibility_observed(&self, view: &ViewHandle) -> bool {
        self.state.lock().visibility_observed.contains(view)
    }

    pub fn is_size_observed(&self, view: &ViewHandle) -> bool {
        self.state.lock().size_observed.contains(view)
    }

    pub fn visibility_observers_created(&self) -> usize {
        self.state.lock().visibility_created
    }

    pub fn live_visibility_observers(&self) -> usize {
        self.state.lock().live_visibility
    }

    pub fn live_size_observers(&self) -> usize {
        self.state.lock().live_size
    }
}

impl SurfaceHost for FakeSurfaceHost {
    fn contains(&self, view: &ViewHandle) -> bool {
        !self.state.lock().detached.contains(view)
    }

    fn visibility_observer(&self, _root: Option<&ViewHandle>) -> Box<dyn SurfaceObserver> {
        let mut state = self.state.lock();
        state.visibility_created += 1;
        state.live_visibility += 1;
        Box::new(FakeObserver {
            kind: ObserverKind::Visibility,
            state: Arc::clone(&self.state),
            connected: true,
        })
    }

    fn size_observer(&self) -> Box<dyn SurfaceObserver> {
        self.state.lock().live_size += 1;
        Box::new(FakeObserver {
            kind: ObserverKind::Size,
            state: Arc::clone(&self.state),
            connected: true,
        })
    }
}

/// Install a test subscriber honoring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
