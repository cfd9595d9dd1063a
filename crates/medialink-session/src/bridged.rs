// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridged backing: no local primitive, every operation is a named command
// sent to native code.
//
// Each command carries the session id as its first argument. A failed
// command is reported to the session's error callback and returned to the
// caller. Cancellation abandons the pending reply; whatever the native side
// answers later is discarded.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use medialink_bridge::traits::CommandBridge;
use medialink_core::error::{MediaLinkError, Result};
use medialink_core::types::{MediaErrorValue, PlayOptions, coerce_number};

use crate::backend::{BackendKind, MediaBackend, MediaControl};
use crate::session::SessionCore;
use crate::signature::{self, Arg};

/// Command names understood by the native side.
pub mod commands {
    pub const CREATE: &str = "create";
    pub const START_PLAYING: &str = "startPlayingAudio";
    pub const STOP_PLAYING: &str = "stopPlayingAudio";
    pub const SEEK_TO: &str = "seekToAudio";
    pub const PAUSE_PLAYING: &str = "pausePlayingAudio";
    pub const GET_CURRENT_POSITION: &str = "getCurrentPositionAudio";
    pub const GET_CURRENT_AMPLITUDE: &str = "getCurrentAmplitudeAudio";
    pub const START_RECORDING: &str = "startRecordingAudio";
    pub const STOP_RECORDING: &str = "stopRecordingAudio";
    pub const PAUSE_RECORDING: &str = "pauseRecordingAudio";
    pub const RESUME_RECORDING: &str = "resumeRecordingAudio";
    pub const RELEASE: &str = "release";
    pub const SET_VOLUME: &str = "setVolume";
    pub const SET_RATE: &str = "setRate";
}

/// Backing that forwards every session to a native command bridge.
pub struct BridgedBackend {
    bridge: Arc<dyn CommandBridge>,
    namespace: String,
}

impl BridgedBackend {
    pub fn new(bridge: Arc<dyn CommandBridge>, namespace: impl Into<String>) -> Self {
        Self {
            bridge,
            namespace: namespace.into(),
        }
    }
}

impl MediaBackend for BridgedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Bridged
    }

    /// Fails with `RuntimeUnavailable` outside a Tokio runtime, since the
    /// `create` reply is watched by a spawned task.
    fn open(&self, session: Arc<SessionCore>) -> Result<Arc<dyn MediaControl>> {
        let runtime = Handle::try_current().map_err(|_| MediaLinkError::RuntimeUnavailable)?;
        let control = Arc::new(BridgedControl {
            session,
            bridge: Arc::clone(&self.bridge),
            namespace: self.namespace.clone(),
        });

        // Issue `create` now; its outcome only matters if it fails.
        let args = vec![control.id_arg(), Value::from(control.session.src())];
        let (tx, rx) = oneshot::channel();
        control.bridge.exec(&control.namespace, commands::CREATE, args, tx);
        let session = Arc::clone(&control.session);
        runtime.spawn(async move {
            match rx.await {
                Ok(Ok(_)) => debug!(media_id = %session.id(), "native session created"),
                Ok(Err(payload)) => {
                    warn!(media_id = %session.id(), %payload, "native create failed");
                    session.report_error(&MediaErrorValue::from_value(&payload));
                }
                Err(_) => {
                    warn!(media_id = %session.id(), "bridge dropped the create reply");
                    session.report_error(&MediaErrorValue::text(
                        MediaLinkError::BridgeClosed.to_string(),
                    ));
                }
            }
        });

        Ok(control as Arc<dyn MediaControl>)
    }
}

struct BridgedControl {
    session: Arc<SessionCore>,
    bridge: Arc<dyn CommandBridge>,
    namespace: String,
}

impl BridgedControl {
    fn id_arg(&self) -> Value {
        Value::from(self.session.id().to_string())
    }

    /// Send one command and wait for its reply or for `cancel`.
    async fn call(
        &self,
        command: &str,
        extra: Vec<Value>,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let mut args = Vec::with_capacity(extra.len() + 1);
        args.push(self.id_arg());
        args.extend(extra);

        let (tx, rx) = oneshot::channel();
        debug!(media_id = %self.session.id(), command, "bridge command");
        self.bridge.exec(&self.namespace, command, args, tx);

        let outcome = tokio::select! {
            reply = rx => reply,
            _ = cancel.cancelled() => {
                debug!(media_id = %self.session.id(), command, "command cancelled, late reply will be discarded");
                return Err(MediaLinkError::Cancelled);
            }
        };

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(payload)) => {
                warn!(media_id = %self.session.id(), command, %payload, "bridge command failed");
                self.session.report_error(&MediaErrorValue::from_value(&payload));
                Err(MediaLinkError::Bridge(format!("{command}: {payload}")))
            }
            Err(_) => {
                warn!(media_id = %self.session.id(), command, "bridge dropped the reply");
                self.session
                    .report_error(&MediaErrorValue::text(MediaLinkError::BridgeClosed.to_string()));
                Err(MediaLinkError::BridgeClosed)
            }
        }
    }

    async fn call_unit(&self, command: &str, extra: Vec<Value>, cancel: &CancellationToken) -> Result<()> {
        self.call(command, extra, cancel).await.map(|_| ())
    }

    /// Reply that must be numeric.
    async fn call_number(&self, command: &str, cancel: &CancellationToken) -> Result<f64> {
        let value = self.call(command, Vec::new(), cancel).await?;
        coerce_number(&value).ok_or_else(|| {
            MediaLinkError::Bridge(format!("{command}: expected a number, got {value}"))
        })
    }
}

#[async_trait]
impl MediaControl for BridgedControl {
    fn kind(&self) -> BackendKind {
        BackendKind::Bridged
    }

    async fn play(&self, options: PlayOptions, cancel: &CancellationToken) -> Result<()> {
        let mut extra = vec![Value::from(self.session.src())];
        if !options.is_empty() {
            extra.push(serde_json::to_value(options)?);
        }
        self.call_unit(commands::START_PLAYING, extra, cancel).await
    }

    async fn pause(&self, cancel: &CancellationToken) -> Result<()> {
        self.call_unit(commands::PAUSE_PLAYING, Vec::new(), cancel).await
    }

    async fn stop(&self, cancel: &CancellationToken) -> Result<()> {
        self.call_unit(commands::STOP_PLAYING, Vec::new(), cancel).await?;
        // A stopped session is rewound to the start.
        self.session.set_position(0.0);
        Ok(())
    }

    async fn seek_to(&self, milliseconds: f64, cancel: &CancellationToken) -> Result<()> {
        signature::check("N", &[Arg::Number(milliseconds)])?;
        let reply = self
            .call(commands::SEEK_TO, vec![Value::from(milliseconds)], cancel)
            .await?;
        // Native answers with the new position when it has one.
        if let Some(position) = coerce_number(&reply) {
            self.session.set_position(position);
        }
        Ok(())
    }

    async fn get_current_position(&self, cancel: &CancellationToken) -> Result<f64> {
        let position = self.call_number(commands::GET_CURRENT_POSITION, cancel).await?;
        self.session.set_position(position);
        Ok(position)
    }

    async fn set_volume(&self, level: f64, cancel: &CancellationToken) -> Result<()> {
        signature::check("N", &[Arg::Number(level)])?;
        self.call_unit(commands::SET_VOLUME, vec![Value::from(level)], cancel).await
    }

    async fn set_rate(&self, rate: f64, cancel: &CancellationToken) -> Result<()> {
        signature::check("N", &[Arg::Number(rate)])?;
        self.call_unit(commands::SET_RATE, vec![Value::from(rate)], cancel).await
    }

    async fn get_current_amplitude(&self, cancel: &CancellationToken) -> Result<f64> {
        self.call_number(commands::GET_CURRENT_AMPLITUDE, cancel).await
    }

    async fn start_record(&self, cancel: &CancellationToken) -> Result<()> {
        let extra = vec![Value::from(self.session.src())];
        self.call_unit(commands::START_RECORDING, extra, cancel).await
    }

    async fn stop_record(&self, cancel: &CancellationToken) -> Result<()> {
        self.call_unit(commands::STOP_RECORDING, Vec::new(), cancel).await
    }

    async fn pause_record(&self, cancel: &CancellationToken) -> Result<()> {
        self.call_unit(commands::PAUSE_RECORDING, Vec::new(), cancel).await
    }

    async fn resume_record(&self, cancel: &CancellationToken) -> Result<()> {
        self.call_unit(commands::RESUME_RECORDING, Vec::new(), cancel).await
    }

    async fn release(&self, cancel: &CancellationToken) -> Result<()> {
        self.call_unit(commands::RELEASE, Vec::new(), cancel).await
    }
}
