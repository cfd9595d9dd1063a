// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where no native media service exists.
//
// Every command is answered with a "not available" error and the status
// subscription cannot be opened, so the capability probe falls back to the
// direct backing.

use serde_json::Value;
use tokio::sync::mpsc;

use medialink_core::error::{MediaLinkError, Result};

use crate::traits::{CommandBridge, CommandReply};

/// No-op bridge returned on non-mobile platforms.
pub struct StubBridge;

impl CommandBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn exec(&self, namespace: &str, command: &str, _args: Vec<Value>, reply: CommandReply) {
        tracing::warn!(namespace, command, "CommandBridge::exec called on stub bridge");
        let message = MediaLinkError::PlatformUnavailable.to_string();
        // The caller may already have given up on the reply.
        let _ = reply.send(Err(Value::from(message)));
    }

    fn subscribe(&self, namespace: &str, action: &str) -> Result<mpsc::UnboundedReceiver<Value>> {
        tracing::warn!(namespace, action, "CommandBridge::subscribe called on stub bridge");
        Err(MediaLinkError::PlatformUnavailable)
    }
}
