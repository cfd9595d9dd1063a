// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for medialink.

use thiserror::Error;

use crate::types::MediaId;

/// Top-level error type for all medialink operations.
#[derive(Debug, Error)]
pub enum MediaLinkError {
    // -- Caller errors --
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown media id {0}")]
    UnknownSession(MediaId),

    #[error("operation not supported: {0}")]
    NotSupported(String),

    // -- Backing errors --
    #[error("audio primitive failed: {0}")]
    Primitive(String),

    #[error("command bridge error: {0}")]
    Bridge(String),

    #[error("command bridge dropped the reply")]
    BridgeClosed,

    #[error("operation cancelled")]
    Cancelled,

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform --
    #[error("feature not available on this platform")]
    PlatformUnavailable,

    #[error("no async runtime is running on this thread")]
    RuntimeUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MediaLinkError>;
