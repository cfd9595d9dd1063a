// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable descriptions of media errors.
//
// Every technical error and every ERROR status value is mapped to plain
// English with a suggestion. Hosts show these instead of raw codes.

use crate::error::MediaLinkError;
use crate::types::{MediaErrorCode, MediaErrorValue};

/// Severity of an error from the listener's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip or interrupted load. Starting playback again may work.
    Transient,
    /// The caller must do something different (pick another file, call in order).
    ActionRequired,
    /// Cannot be fixed by trying again on this device.
    Permanent,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `MediaLinkError` into a `HumanError`.
pub fn humanize_error(err: &MediaLinkError) -> HumanError {
    match err {
        MediaLinkError::InvalidArgument(detail) => HumanError {
            message: "The audio request was malformed.".into(),
            suggestion: format!("Check the file location and options passed in. ({detail})"),
            severity: Severity::ActionRequired,
        },

        MediaLinkError::UnknownSession(_) => HumanError {
            message: "That audio clip is no longer loaded.".into(),
            suggestion: "Load the clip again before controlling it.".into(),
            severity: Severity::ActionRequired,
        },

        MediaLinkError::NotSupported(what) => HumanError {
            message: "This device can't do that with audio.".into(),
            suggestion: format!("The {what} feature isn't available here."),
            severity: Severity::Permanent,
        },

        MediaLinkError::Primitive(_) => HumanError {
            message: "The audio player ran into a problem.".into(),
            suggestion: "Try playing the clip again.".into(),
            severity: Severity::Transient,
        },

        MediaLinkError::Bridge(_) | MediaLinkError::BridgeClosed => HumanError {
            message: "The device's audio service didn't respond properly.".into(),
            suggestion: "Try again. If this keeps happening, restart the app.".into(),
            severity: Severity::Transient,
        },

        MediaLinkError::Cancelled => HumanError {
            message: "The audio request was cancelled.".into(),
            suggestion: "Start it again if you still need it.".into(),
            severity: Severity::Transient,
        },

        MediaLinkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The audio file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Pick the file again.".into(),
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. Your device's storage may be full.".into(),
                    severity: Severity::Transient,
                }
            }
        }

        MediaLinkError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            severity: Severity::Transient,
        },

        MediaLinkError::PlatformUnavailable => HumanError {
            message: "Audio isn't available on this device.".into(),
            suggestion: "Some features require a phone or tablet.".into(),
            severity: Severity::Permanent,
        },

        MediaLinkError::RuntimeUnavailable => HumanError {
            message: "The audio service was started too early.".into(),
            suggestion: "Load audio once the app has finished starting.".into(),
            severity: Severity::ActionRequired,
        },
    }
}

/// Describe the payload of an ERROR status.
pub fn humanize_media_error(value: &MediaErrorValue) -> HumanError {
    match value {
        MediaErrorValue::Code { code, .. } => humanize_code(*code),
        MediaErrorValue::Text(text) => {
            if text.to_ascii_lowercase().contains("not supported") {
                HumanError {
                    message: "This device can't do that with audio.".into(),
                    suggestion: format!("({text})"),
                    severity: Severity::Permanent,
                }
            } else {
                HumanError {
                    message: "The audio player reported a problem.".into(),
                    suggestion: format!("Try again. (Detail: {text})"),
                    severity: Severity::Transient,
                }
            }
        }
    }
}

fn humanize_code(code: MediaErrorCode) -> HumanError {
    match code {
        MediaErrorCode::NoneActive => HumanError {
            message: "Nothing is playing.".into(),
            suggestion: "Start playback before using that control.".into(),
            severity: Severity::ActionRequired,
        },
        MediaErrorCode::Aborted => HumanError {
            message: "Loading the audio was stopped.".into(),
            suggestion: "Check the file exists and is an audio file, then try again.".into(),
            severity: Severity::ActionRequired,
        },
        MediaErrorCode::Network => HumanError {
            message: "The audio couldn't be downloaded.".into(),
            suggestion: "Check your connection and try again.".into(),
            severity: Severity::Transient,
        },
        MediaErrorCode::Decode => HumanError {
            message: "The audio file seems to be damaged.".into(),
            suggestion: "Try a different copy of the file.".into(),
            severity: Severity::Permanent,
        },
        MediaErrorCode::NoneSupported => HumanError {
            message: "This type of audio file isn't supported.".into(),
            suggestion: "Try converting it to MP3 or AAC first.".into(),
            severity: Severity::Permanent,
        },
    }
}
