// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// MediaManager owns the registry, the dispatcher, and the backing chosen at
// startup. Sessions are created through it and stay registered until the
// caller forgets them or the manager shuts down.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use medialink_bridge::traits::{CommandBridge, PrimitiveFactory};
use medialink_core::config::MediaConfig;
use medialink_core::error::{MediaLinkError, Result};
use medialink_core::types::MediaId;

use crate::backend::{BackendKind, MediaBackend, probe_backend};
use crate::bridged::BridgedBackend;
use crate::channel::{self, ChannelEnd, Readiness};
use crate::direct::DirectBackend;
use crate::dispatcher::Dispatcher;
use crate::registry::Registry;
use crate::session::{Callbacks, MediaSession, SessionCore};
use crate::signature::{self, Arg};

/// Shape of `create(src, success?, error?, status?)`.
const CREATE_SIGNATURE: &str = "Sfff";

pub struct MediaManager {
    config: MediaConfig,
    registry: Arc<Registry>,
    dispatcher: Dispatcher,
    backend: Arc<dyn MediaBackend>,
    shutdown: CancellationToken,
    channel: Mutex<Option<JoinHandle<ChannelEnd>>>,
}

impl MediaManager {
    fn with_backend(
        config: MediaConfig,
        registry: Arc<Registry>,
        dispatcher: Dispatcher,
        backend: Arc<dyn MediaBackend>,
    ) -> Self {
        info!(backend = ?backend.kind(), "media manager ready");
        Self {
            config,
            registry,
            dispatcher,
            backend,
            shutdown: CancellationToken::new(),
            channel: Mutex::new(None),
        }
    }

    /// Manager whose sessions wrap primitives built by `factory`.
    pub fn direct(config: MediaConfig, factory: Arc<dyn PrimitiveFactory>) -> Self {
        let registry = Arc::new(Registry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry));
        let backend = Arc::new(DirectBackend::new(
            factory,
            dispatcher.clone(),
            config.default_volume,
        ));
        Self::with_backend(config, registry, dispatcher, backend)
    }

    /// Manager whose sessions forward to native code over `bridge`.
    ///
    /// The status channel is opened once `readiness` fires. Outside a Tokio
    /// runtime no channel is opened and `create` fails with
    /// `RuntimeUnavailable`.
    pub fn bridged(config: MediaConfig, bridge: Arc<dyn CommandBridge>, readiness: Readiness) -> Self {
        let registry = Arc::new(Registry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry));
        let backend = Arc::new(BridgedBackend::new(
            Arc::clone(&bridge),
            config.namespace.clone(),
        ));
        let manager = Self::with_backend(config, registry, dispatcher, backend);
        manager.open_channel(bridge, readiness);
        manager
    }

    /// Manager for this process: probes the platform bridge and falls back to
    /// primitives built by `factory` when no native media service exists.
    pub fn new(config: MediaConfig, factory: Arc<dyn PrimitiveFactory>, readiness: Readiness) -> Self {
        Self::from_probe(config, medialink_bridge::platform_bridge(), factory, readiness)
    }

    /// Probe the platform once and build the matching manager.
    pub fn from_probe(
        config: MediaConfig,
        bridge: Arc<dyn CommandBridge>,
        factory: Arc<dyn PrimitiveFactory>,
        readiness: Readiness,
    ) -> Self {
        match probe_backend(&config, bridge.as_ref()) {
            BackendKind::Bridged => Self::bridged(config, bridge, readiness),
            BackendKind::Direct => Self::direct(config, factory),
        }
    }

    fn open_channel(&self, bridge: Arc<dyn CommandBridge>, readiness: Readiness) {
        let mut slot = self.channel.lock().expect("channel lock poisoned");
        if slot.is_some() {
            debug!("status channel already established");
            return;
        }
        match channel::establish(
            bridge,
            self.config.namespace.clone(),
            self.config.channel_action.clone(),
            self.dispatcher.clone(),
            readiness,
            self.shutdown.child_token(),
        ) {
            Ok(handle) => *slot = Some(handle),
            Err(e) => warn!(error = %e, "status channel not established"),
        }
    }

    /// Register a new session and bring up its backing.
    ///
    /// The backing reports progress asynchronously through `callbacks`; this
    /// returns as soon as the session is registered.
    #[instrument(skip(self, callbacks), fields(backend = ?self.backend.kind()))]
    pub fn create(&self, src: &str, callbacks: Callbacks) -> Result<MediaSession> {
        signature::check(
            CREATE_SIGNATURE,
            &[
                Arg::Str(src.trim()),
                Arg::Callback(callbacks.success.is_some()),
                Arg::Callback(callbacks.error.is_some()),
                Arg::Callback(callbacks.status.is_some()),
            ],
        )?;

        let core = Arc::new(SessionCore::new(src, callbacks));
        let id = core.id();
        self.registry.insert(Arc::clone(&core))?;

        let control = match self.backend.open(Arc::clone(&core)) {
            Ok(control) => control,
            Err(e) => {
                warn!(media_id = %id, error = %e, "backing refused the session");
                self.registry.remove(&id);
                return Err(e);
            }
        };
        info!(media_id = %id, "media session created");
        Ok(MediaSession::new(core, control, self.shutdown.child_token()))
    }

    pub fn get(&self, id: &MediaId) -> Option<Arc<SessionCore>> {
        self.registry.get(id)
    }

    /// Drop a session from the registry. Later statuses for it are ignored.
    pub fn forget(&self, id: &MediaId) -> Result<Arc<SessionCore>> {
        let removed = self
            .registry
            .remove(id)
            .ok_or(MediaLinkError::UnknownSession(*id))?;
        debug!(media_id = %id, "media session forgotten");
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    /// Cancel every pending operation, close the status channel, and drop
    /// all sessions.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.registry.clear();
        info!("media manager shut down");
    }
}

impl Drop for MediaManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for MediaManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaManager")
            .field("backend", &self.backend.kind())
            .field("sessions", &self.registry.len())
            .finish()
    }
}
