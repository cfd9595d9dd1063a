// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Media sessions: the registered state shared with the dispatcher, and the
// handle callers drive playback through.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use medialink_core::error::Result;
use medialink_core::types::{MediaErrorValue, MediaId, MediaState, PlayOptions};

use crate::backend::{BackendKind, MediaControl};

/// Called with no arguments when a session reaches STOPPED.
pub type SuccessCallback = Arc<dyn Fn() + Send + Sync>;
/// Called with the payload of every ERROR status.
pub type ErrorCallback = Arc<dyn Fn(&MediaErrorValue) + Send + Sync>;
/// Called with every new state.
pub type StatusCallback = Arc<dyn Fn(MediaState) + Send + Sync>;

/// The three optional callbacks a session is constructed with.
#[derive(Clone, Default)]
pub struct Callbacks {
    pub success: Option<SuccessCallback>,
    pub error: Option<ErrorCallback>,
    pub status: Option<StatusCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.success = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&MediaErrorValue) + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(f));
        self
    }

    pub fn on_status(mut self, f: impl Fn(MediaState) + Send + Sync + 'static) -> Self {
        self.status = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .field("status", &self.status.is_some())
            .finish()
    }
}

/// Last-known values reported by the backing. `-1` means unknown.
#[derive(Debug, Clone, Copy)]
struct Cached {
    duration: f64,
    position: f64,
}

/// Registered state of one session.
///
/// This is what the registry indexes and the dispatcher mutates. It outlives
/// `release()`: only the backing handle is discarded.
#[derive(Debug)]
pub struct SessionCore {
    id: MediaId,
    src: String,
    callbacks: Callbacks,
    cached: Mutex<Cached>,
    created_at: DateTime<Utc>,
}

impl SessionCore {
    /// Build the state for a new session with a freshly generated id.
    pub fn new(src: impl Into<String>, callbacks: Callbacks) -> Self {
        Self {
            id: MediaId::new(),
            src: src.into(),
            callbacks,
            cached: Mutex::new(Cached {
                duration: -1.0,
                position: -1.0,
            }),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> MediaId {
        self.id
    }

    pub fn src(&self) -> &str {
        &self.src
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    /// Cached duration in seconds, `-1` until a DURATION status arrives.
    pub fn duration(&self) -> f64 {
        self.cached.lock().expect("session lock poisoned").duration
    }

    /// Cached position in seconds, `-1` until a POSITION status arrives.
    pub fn position(&self) -> f64 {
        self.cached.lock().expect("session lock poisoned").position
    }

    pub(crate) fn set_duration(&self, duration: f64) {
        self.cached.lock().expect("session lock poisoned").duration = duration;
    }

    pub(crate) fn set_position(&self, position: f64) {
        self.cached.lock().expect("session lock poisoned").position = position;
    }

    /// Hand an error payload to the error callback, if there is one.
    pub(crate) fn report_error(&self, value: &MediaErrorValue) {
        if let Some(cb) = &self.callbacks.error {
            cb(value);
        }
    }
}

/// Caller-facing handle to one media session.
///
/// Cheap to clone. Every operation is routed to the backing chosen when the
/// manager was built. In-flight bridged operations can be abandoned with
/// [`MediaSession::cancel_pending`].
#[derive(Clone)]
pub struct MediaSession {
    core: Arc<SessionCore>,
    control: Arc<dyn MediaControl>,
    cancel: Arc<Mutex<CancellationToken>>,
    parent: CancellationToken,
}

impl MediaSession {
    pub(crate) fn new(
        core: Arc<SessionCore>,
        control: Arc<dyn MediaControl>,
        parent: CancellationToken,
    ) -> Self {
        Self {
            core,
            control,
            cancel: Arc::new(Mutex::new(parent.child_token())),
            parent,
        }
    }

    pub fn id(&self) -> MediaId {
        self.core.id()
    }

    pub fn src(&self) -> &str {
        self.core.src()
    }

    pub fn backend(&self) -> BackendKind {
        self.control.kind()
    }

    /// Synchronous read of the cached duration (`-1` when unknown).
    pub fn get_duration(&self) -> f64 {
        self.core.duration()
    }

    /// Synchronous read of the cached position (`-1` when unknown).
    pub fn cached_position(&self) -> f64 {
        self.core.position()
    }

    /// Abandon every operation currently waiting on the backing. They resolve
    /// to `MediaLinkError::Cancelled`; later operations are unaffected.
    pub fn cancel_pending(&self) {
        let mut token = self.cancel.lock().expect("cancel lock poisoned");
        token.cancel();
        *token = self.parent.child_token();
    }

    fn token(&self) -> CancellationToken {
        self.cancel.lock().expect("cancel lock poisoned").clone()
    }

    pub async fn play(&self) -> Result<()> {
        self.play_with(PlayOptions::default()).await
    }

    pub async fn play_with(&self, options: PlayOptions) -> Result<()> {
        self.control.play(options, &self.token()).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.control.pause(&self.token()).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.control.stop(&self.token()).await
    }

    /// Seek to `milliseconds` from the start of the source.
    pub async fn seek_to(&self, milliseconds: f64) -> Result<()> {
        self.control.seek_to(milliseconds, &self.token()).await
    }

    /// Current playback position in seconds.
    pub async fn get_current_position(&self) -> Result<f64> {
        self.control.get_current_position(&self.token()).await
    }

    pub async fn set_volume(&self, level: f64) -> Result<()> {
        self.control.set_volume(level, &self.token()).await
    }

    pub async fn set_rate(&self, rate: f64) -> Result<()> {
        self.control.set_rate(rate, &self.token()).await
    }

    pub async fn get_current_amplitude(&self) -> Result<f64> {
        self.control.get_current_amplitude(&self.token()).await
    }

    pub async fn start_record(&self) -> Result<()> {
        self.control.start_record(&self.token()).await
    }

    pub async fn stop_record(&self) -> Result<()> {
        self.control.stop_record(&self.token()).await
    }

    pub async fn pause_record(&self) -> Result<()> {
        self.control.pause_record(&self.token()).await
    }

    pub async fn resume_record(&self) -> Result<()> {
        self.control.resume_record(&self.token()).await
    }

    /// Release the backing resource. The session stays registered.
    pub async fn release(&self) -> Result<()> {
        self.control.release(&self.token()).await
    }
}

impl std::fmt::Debug for MediaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSession")
            .field("id", &self.core.id())
            .field("src", &self.core.src())
            .field("backend", &self.control.kind())
            .finish()
    }
}
