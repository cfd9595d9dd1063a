// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Status dispatcher.
//
// Fans `(id, msgType, value)` triples out to the owning session. Both
// backings route every status through here. Protocol violations (unknown id,
// unknown type, uncoercible value) are logged and swallowed.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace, warn};

use medialink_core::types::{
    MediaErrorValue, MediaId, MediaState, MessageType, Status, coerce_number,
};

use crate::registry::Registry;

#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Deliver a typed status.
    pub fn emit(&self, id: &MediaId, status: Status) {
        let (msg_type, value) = status.into_wire();
        self.dispatch(id, msg_type, &value);
    }

    /// Deliver a status whose id arrived as text (e.g. from the native side).
    pub fn dispatch_raw(&self, id: &str, msg_type: u32, value: &Value) {
        match id.parse::<MediaId>() {
            Ok(id) => self.dispatch(&id, msg_type, value),
            Err(_) => warn!(media_id = id, msg_type, "unknown media id"),
        }
    }

    /// Deliver one status to the session registered under `id`.
    ///
    /// Callbacks run after the registry lock is released, so they may call
    /// back into the manager.
    pub fn dispatch(&self, id: &MediaId, msg_type: u32, value: &Value) {
        let Some(session) = self.registry.get(id) else {
            warn!(media_id = %id, msg_type, "unknown media id");
            return;
        };

        match MessageType::from_code(msg_type) {
            Some(MessageType::State) => {
                let Some(state) = coerce_state(value) else {
                    warn!(media_id = %id, %value, "STATE status with no valid state");
                    return;
                };
                debug!(media_id = %id, state = %state, "state change");
                let callbacks = session.callbacks();
                if let Some(cb) = &callbacks.status {
                    cb(state);
                }
                // STOPPED doubles as "completed successfully".
                if state == MediaState::Stopped {
                    if let Some(cb) = &callbacks.success {
                        cb();
                    }
                }
            }
            Some(MessageType::Duration) => match coerce_number(value) {
                Some(duration) => {
                    trace!(media_id = %id, duration, "duration updated");
                    session.set_duration(duration);
                }
                None => warn!(media_id = %id, %value, "DURATION status is not a number"),
            },
            Some(MessageType::Position) => match coerce_number(value) {
                Some(position) => {
                    trace!(media_id = %id, position, "position updated");
                    session.set_position(position);
                }
                None => warn!(media_id = %id, %value, "POSITION status is not a number"),
            },
            Some(MessageType::Error) => {
                let error = MediaErrorValue::from_value(value);
                debug!(media_id = %id, ?error, "error status");
                session.report_error(&error);
            }
            None => warn!(media_id = %id, msg_type, "unrecognized status message type"),
        }
    }
}

fn coerce_state(value: &Value) -> Option<MediaState> {
    let n = coerce_number(value)?;
    if n < 0.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
        return None;
    }
    MediaState::from_code(n as u32)
}
