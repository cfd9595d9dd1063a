// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the two media backings.
//
// A `CommandBridge` forwards named commands to native code and carries the
// standing status subscription back. An `AudioPrimitive` is a local object
// that plays one source and raises lifecycle events.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use medialink_core::error::Result;
use medialink_core::types::MediaErrorCode;

/// Outcome of one bridge command: the native result, or the native error
/// payload (a `{code, message}` object or a plain string).
pub type CommandOutcome = std::result::Result<Value, Value>;

/// One-shot reply slot handed to [`CommandBridge::exec`].
pub type CommandReply = oneshot::Sender<CommandOutcome>;

/// Asynchronous request/response bridge into native code.
pub trait CommandBridge: Send + Sync {
    /// Human-readable platform name (e.g. "Android").
    fn platform_name(&self) -> &str;

    /// Whether native media handling is actually reachable through this bridge.
    fn is_available(&self) -> bool;

    /// Send `command` with `args` under `namespace`.
    ///
    /// The implementation answers through `reply` at most once, at any later
    /// time. Dropping `reply` without answering is reported to the caller as
    /// a closed bridge. There is no ordering guarantee between commands.
    fn exec(&self, namespace: &str, command: &str, args: Vec<Value>, reply: CommandReply);

    /// Open the standing subscription named `action`.
    ///
    /// Every inbound payload is delivered on the returned receiver. The
    /// subscription ends when the bridge drops its sender; pushes made while
    /// no subscription is open are lost.
    fn subscribe(&self, namespace: &str, action: &str) -> Result<mpsc::UnboundedReceiver<Value>>;
}

/// Lifecycle events raised by an [`AudioPrimitive`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimitiveEvent {
    /// The primitive started fetching its source.
    LoadStart,
    /// Playback actually started.
    Playing,
    /// The source duration became known or changed (seconds).
    DurationChange(Option<f64>),
    /// Loading or playback failed with a native media error code.
    Error(MediaErrorCode),
    /// Playback reached the end of the source.
    Ended,
}

/// Observer attached to a primitive at creation. May be called from any thread.
pub type EventSink = Arc<dyn Fn(PrimitiveEvent) + Send + Sync>;

/// A local audio player bound to a single source.
///
/// Times are in seconds. Any method may fail; callers convert failures into
/// ERROR statuses.
pub trait AudioPrimitive: Send {
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn current_time(&self) -> Result<f64>;

    fn set_current_time(&mut self, seconds: f64) -> Result<()>;

    fn set_volume(&mut self, level: f64) -> Result<()>;

    fn set_playback_rate(&mut self, rate: f64) -> Result<()>;

    fn set_looping(&mut self, looping: bool) -> Result<()>;
}

/// Creates primitives for the direct backing.
pub trait PrimitiveFactory: Send + Sync {
    /// Create a primitive playing `src`, with `events` attached as its observer.
    fn create(&self, src: &str, events: EventSink) -> Result<Box<dyn AudioPrimitive>>;
}
