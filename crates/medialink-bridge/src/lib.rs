// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! medialink: native platform bridge abstractions.
//!
//! This crate defines the seams the media backings plug into: the
//! [`traits::CommandBridge`] used by the bridged backing and the
//! [`traits::AudioPrimitive`] / [`traits::PrimitiveFactory`] pair used by the
//! direct backing. It also selects the command bridge for the target OS.

use std::sync::Arc;

pub mod traits;

#[cfg(target_os = "android")]
pub mod android;

#[cfg(not(target_os = "android"))]
pub mod stub;

/// Retrieves the command bridge implementation for the target operating system.
///
/// On platforms without a native media service this is the stub bridge, which
/// reports itself unavailable so the probe picks the direct backing.
pub fn platform_bridge() -> Arc<dyn traits::CommandBridge> {
    #[cfg(target_os = "android")]
    {
        // Android: uses `jni-rs` to call the host's MediaBridge class.
        Arc::new(android::AndroidBridge::new())
    }
    #[cfg(not(target_os = "android"))]
    {
        Arc::new(stub::StubBridge)
    }
}

/// Run a blocking native call off the async workers.
///
/// Inside a Tokio runtime the job goes to the blocking pool; otherwise it
/// runs inline on the calling thread.
#[cfg_attr(not(target_os = "android"), allow(dead_code))]
pub(crate) fn offload<F>(job: F)
where
    F: FnOnce() + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn_blocking(job);
        }
        Err(_) => job(),
    }
}
