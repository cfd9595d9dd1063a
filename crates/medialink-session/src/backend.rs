// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The capability interface shared by both backings, and the startup probe
// that picks one.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use medialink_bridge::traits::CommandBridge;
use medialink_core::config::{BackendPreference, MediaConfig};
use medialink_core::error::Result;
use medialink_core::types::PlayOptions;

use crate::session::SessionCore;

/// Which backing a session is driven by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Wraps a local audio primitive.
    Direct,
    /// Forwards to native code over a command bridge.
    Bridged,
}

/// Per-session operations. One implementation per backing.
///
/// The direct backing ignores `cancel` (its calls complete immediately);
/// the bridged backing abandons the pending reply when it fires.
#[async_trait]
pub trait MediaControl: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn play(&self, options: PlayOptions, cancel: &CancellationToken) -> Result<()>;

    async fn pause(&self, cancel: &CancellationToken) -> Result<()>;

    async fn stop(&self, cancel: &CancellationToken) -> Result<()>;

    async fn seek_to(&self, milliseconds: f64, cancel: &CancellationToken) -> Result<()>;

    async fn get_current_position(&self, cancel: &CancellationToken) -> Result<f64>;

    async fn set_volume(&self, level: f64, cancel: &CancellationToken) -> Result<()>;

    async fn set_rate(&self, rate: f64, cancel: &CancellationToken) -> Result<()>;

    async fn get_current_amplitude(&self, cancel: &CancellationToken) -> Result<f64>;

    async fn start_record(&self, cancel: &CancellationToken) -> Result<()>;

    async fn stop_record(&self, cancel: &CancellationToken) -> Result<()>;

    async fn pause_record(&self, cancel: &CancellationToken) -> Result<()>;

    async fn resume_record(&self, cancel: &CancellationToken) -> Result<()>;

    async fn release(&self, cancel: &CancellationToken) -> Result<()>;
}

/// Opens per-session controls for freshly registered sessions.
pub trait MediaBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Bring up the backing for a session that is already registered.
    ///
    /// Direct: creates the primitive and emits STARTING. Bridged: issues the
    /// `create` command. Neither waits for the native side.
    fn open(&self, session: Arc<SessionCore>) -> Result<Arc<dyn MediaControl>>;
}

/// Choose the backing for this process.
pub fn probe_backend(config: &MediaConfig, bridge: &dyn CommandBridge) -> BackendKind {
    let kind = match config.backend {
        BackendPreference::Direct => BackendKind::Direct,
        BackendPreference::Bridged => BackendKind::Bridged,
        BackendPreference::Auto if bridge.is_available() => BackendKind::Bridged,
        BackendPreference::Auto => BackendKind::Direct,
    };
    info!(
        platform = bridge.platform_name(),
        preference = ?config.backend,
        backend = ?kind,
        "media backend selected"
    );
    kind
}
