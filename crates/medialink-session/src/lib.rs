// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// MediaLink Session: id-keyed media sessions, the status dispatcher, and the
// two backings (a local audio primitive, or native code over a command
// bridge) behind one capability interface.

pub mod backend;
pub mod bridged;
pub mod channel;
pub mod direct;
pub mod dispatcher;
pub mod manager;
pub mod registry;
pub mod session;
pub mod signature;

pub use backend::{BackendKind, MediaBackend, MediaControl, probe_backend};
pub use bridged::BridgedBackend;
pub use channel::{ReadySignal, Readiness};
pub use direct::DirectBackend;
pub use dispatcher::Dispatcher;
pub use manager::MediaManager;
pub use registry::Registry;
pub use session::{Callbacks, MediaSession, SessionCore};
