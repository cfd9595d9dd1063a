// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Standing status subscription for the bridged backing.
//
// The channel is opened once, only after the platform signals readiness, and
// then routes every native push through the dispatcher. If it cannot be
// opened, or the bridge closes it, pushes are lost: there is no retry and no
// buffering.

use std::sync::Arc;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use medialink_bridge::traits::CommandBridge;
use medialink_core::error::{MediaLinkError, Result};
use medialink_core::types::ChannelMessage;

use crate::dispatcher::Dispatcher;

/// Action carried by status envelopes.
pub const STATUS_ACTION: &str = "status";

/// Fires the readiness gate. Dropping it without firing keeps the gate shut
/// forever.
#[derive(Debug)]
pub struct ReadySignal(watch::Sender<bool>);

impl ReadySignal {
    pub fn fire(&self) {
        self.0.send_replace(true);
    }
}

/// Platform-readiness gate the channel waits on.
#[derive(Debug, Clone)]
pub struct Readiness(watch::Receiver<bool>);

impl Readiness {
    /// A gate plus the signal that opens it.
    pub fn pair() -> (ReadySignal, Readiness) {
        let (tx, rx) = watch::channel(false);
        (ReadySignal(tx), Readiness(rx))
    }

    /// A gate that is already open.
    pub fn ready() -> Readiness {
        let (signal, readiness) = Self::pair();
        signal.fire();
        readiness
    }

    pub fn is_ready(&self) -> bool {
        *self.0.borrow()
    }

    /// Wait until the gate opens. Returns false if the signal was dropped
    /// without firing.
    pub async fn wait(&mut self) -> bool {
        self.0.wait_for(|ready| *ready).await.is_ok()
    }
}

/// How the channel task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEnd {
    /// Readiness never came.
    NeverReady,
    /// The bridge refused the subscription.
    Refused,
    /// The bridge closed the subscription.
    Closed,
    /// The owning manager shut down.
    Shutdown,
}

/// Route one inbound payload. Anything that is not a well-formed status
/// envelope is logged and ignored.
pub fn route_message(dispatcher: &Dispatcher, payload: &Value) {
    let message: ChannelMessage = match serde_json::from_value(payload.clone()) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, %payload, "malformed channel message");
            return;
        }
    };
    if message.action != STATUS_ACTION {
        warn!(action = %message.action, "unknown media action");
        return;
    }
    match message.status {
        Some(status) => dispatcher.dispatch_raw(&status.id, status.msg_type, &status.value),
        None => warn!("status message without a status body"),
    }
}

/// Spawn the channel task: wait for readiness, subscribe, then pump.
///
/// Fails with `RuntimeUnavailable` when called outside a Tokio runtime.
pub fn establish(
    bridge: Arc<dyn CommandBridge>,
    namespace: String,
    action: String,
    dispatcher: Dispatcher,
    mut readiness: Readiness,
    shutdown: CancellationToken,
) -> Result<JoinHandle<ChannelEnd>> {
    let runtime = Handle::try_current().map_err(|_| MediaLinkError::RuntimeUnavailable)?;
    Ok(runtime.spawn(async move {
        let ready = tokio::select! {
            ready = readiness.wait() => ready,
            _ = shutdown.cancelled() => return ChannelEnd::Shutdown,
        };
        if !ready {
            warn!("platform never became ready, status channel not opened");
            return ChannelEnd::NeverReady;
        }

        let mut rx = match bridge.subscribe(&namespace, &action) {
            Ok(rx) => rx,
            Err(e) => {
                warn!(error = %e, platform = bridge.platform_name(), "status channel unavailable");
                return ChannelEnd::Refused;
            }
        };
        info!(namespace = %namespace, action = %action, "status channel open");

        loop {
            tokio::select! {
                payload = rx.recv() => match payload {
                    Some(payload) => {
                        debug!(%payload, "channel message");
                        route_message(&dispatcher, &payload);
                    }
                    None => {
                        warn!("status channel closed by the bridge, later pushes are lost");
                        return ChannelEnd::Closed;
                    }
                },
                _ = shutdown.cancelled() => {
                    info!("status channel shut down");
                    return ChannelEnd::Shutdown;
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridged::testing::FakeBridge;
    use crate::registry::Registry;
    use crate::session::{Callbacks, SessionCore};
    use medialink_bridge::stub::StubBridge;
    use serde_json::json;
    use std::sync::Mutex;

    fn setup() -> (Dispatcher, Arc<SessionCore>) {
        let registry = Arc::new(Registry::new());
        let core = Arc::new(SessionCore::new("clip.mp3", Callbacks::new()));
        registry.insert(core.clone()).unwrap();
        (Dispatcher::new(registry), core)
    }

    fn envelope(id: &str, msg_type: u32, value: Value) -> Value {
        json!({"action": "status", "status": {"id": id, "msgType": msg_type, "value": value}})
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn status_envelopes_reach_the_dispatcher() {
        let (dispatcher, core) = setup();
        route_message(&dispatcher, &envelope(&core.id().to_string(), 2, json!(180)));
        assert_eq!(core.duration(), 180.0);
    }

    #[test]
    fn unknown_actions_and_garbage_are_ignored() {
        let (dispatcher, core) = setup();
        route_message(&dispatcher, &json!({"action": "volume", "status": null}));
        route_message(&dispatcher, &json!([1, 2, 3]));
        route_message(&dispatcher, &json!({"action": "status"}));
        assert_eq!(core.duration(), -1.0);
    }

    #[tokio::test]
    async fn channel_waits_for_readiness() {
        let (dispatcher, core) = setup();
        let bridge = Arc::new(FakeBridge::default());
        let (signal, readiness) = Readiness::pair();
        let shutdown = CancellationToken::new();
        let handle = establish(
            bridge.clone(),
            "Media".into(),
            "messageChannel".into(),
            dispatcher,
            readiness,
            shutdown.clone(),
        )
        .unwrap();

        settle().await;
        assert_eq!(*bridge.subscriptions.lock().unwrap(), 0);

        signal.fire();
        settle().await;
        assert_eq!(*bridge.subscriptions.lock().unwrap(), 1);

        assert!(bridge.push(envelope(&core.id().to_string(), 3, json!("4.5"))));
        settle().await;
        assert_eq!(core.position(), 4.5);

        shutdown.cancel();
        assert_eq!(handle.await.unwrap(), ChannelEnd::Shutdown);
    }

    #[tokio::test]
    async fn closed_channel_is_not_reopened() {
        let (dispatcher, _core) = setup();
        let bridge = Arc::new(FakeBridge::default());
        let handle = establish(
            bridge.clone(),
            "Media".into(),
            "messageChannel".into(),
            dispatcher,
            Readiness::ready(),
            CancellationToken::new(),
        )
        .unwrap();
        settle().await;
        bridge.close_channel();

        assert_eq!(handle.await.unwrap(), ChannelEnd::Closed);
        assert_eq!(*bridge.subscriptions.lock().unwrap(), 1);
        assert!(!bridge.push(json!({"action": "status"})));
    }

    #[tokio::test]
    async fn unsupported_platform_refuses() {
        let (dispatcher, _core) = setup();
        let handle = establish(
            Arc::new(StubBridge),
            "Media".into(),
            "messageChannel".into(),
            dispatcher,
            Readiness::ready(),
            CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(handle.await.unwrap(), ChannelEnd::Refused);
    }

    #[tokio::test]
    async fn dropped_signal_means_never_ready() {
        let (dispatcher, _core) = setup();
        let (signal, readiness) = Readiness::pair();
        drop(signal);
        let handle = establish(
            Arc::new(StubBridge),
            "Media".into(),
            "messageChannel".into(),
            dispatcher,
            readiness,
            CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(handle.await.unwrap(), ChannelEnd::NeverReady);
    }

    #[test]
    fn establishing_outside_a_runtime_is_an_error() {
        let (dispatcher, _core) = setup();
        let bridge = Arc::new(FakeBridge::default());
        let result = establish(
            bridge.clone(),
            "Media".into(),
            "messageChannel".into(),
            dispatcher,
            Readiness::ready(),
            CancellationToken::new(),
        );
        assert!(matches!(result, Err(MediaLinkError::RuntimeUnavailable)));
        assert_eq!(*bridge.subscriptions.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn pushes_fire_callbacks_in_arrival_order() {
        let registry = Arc::new(Registry::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let core = Arc::new(SessionCore::new(
            "clip.mp3",
            Callbacks::new().on_status(move |s| sink.lock().unwrap().push(s.code())),
        ));
        registry.insert(core.clone()).unwrap();
        let bridge = Arc::new(FakeBridge::default());
        let shutdown = CancellationToken::new();
        let _handle = establish(
            bridge.clone(),
            "Media".into(),
            "messageChannel".into(),
            Dispatcher::new(registry),
            Readiness::ready(),
            shutdown.clone(),
        )
        .unwrap();
        settle().await;

        let id = core.id().to_string();
        for state in [1, 2, 3, 2, 4] {
            bridge.push(envelope(&id, 1, json!(state)));
        }
        settle().await;
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 2, 4]);
        shutdown.cancel();
    }
}
