// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Argument-shape checks driven by a compact type signature.
//
// One character per argument:
//   S  non-empty string      N  finite number
//   F  callback              *  anything
// A lowercase letter marks the argument optional (it may be absent).

use medialink_core::error::{MediaLinkError, Result};

/// One argument as seen by the shape check.
#[derive(Debug, Clone, Copy)]
pub enum Arg<'a> {
    Str(&'a str),
    Number(f64),
    /// A callback slot; `false` when the caller passed none.
    Callback(bool),
    Absent,
}

impl Arg<'_> {
    fn is_absent(&self) -> bool {
        matches!(self, Arg::Absent | Arg::Callback(false))
    }

    fn kind(&self) -> &'static str {
        match self {
            Arg::Str(_) => "string",
            Arg::Number(_) => "number",
            Arg::Callback(_) => "callback",
            Arg::Absent => "nothing",
        }
    }
}

/// Check `args` against `signature`, failing on the first mismatch.
pub fn check(signature: &str, args: &[Arg<'_>]) -> Result<()> {
    let expected: Vec<char> = signature.chars().collect();
    if args.len() > expected.len() {
        return Err(MediaLinkError::InvalidArgument(format!(
            "expected at most {} arguments, got {}",
            expected.len(),
            args.len()
        )));
    }

    for (index, letter) in expected.iter().enumerate() {
        let arg = args.get(index).copied().unwrap_or(Arg::Absent);
        let optional = letter.is_ascii_lowercase();
        if arg.is_absent() {
            if optional || *letter == '*' {
                continue;
            }
            return Err(mismatch(index, *letter, &arg));
        }
        let ok = match letter.to_ascii_uppercase() {
            'S' => matches!(arg, Arg::Str(s) if !s.trim().is_empty()),
            'N' => matches!(arg, Arg::Number(n) if n.is_finite()),
            'F' => matches!(arg, Arg::Callback(true)),
            '*' => true,
            other => {
                return Err(MediaLinkError::InvalidArgument(format!(
                    "bad signature character {other:?}"
                )));
            }
        };
        if !ok {
            return Err(mismatch(index, *letter, &arg));
        }
    }
    Ok(())
}

fn mismatch(index: usize, letter: char, arg: &Arg<'_>) -> MediaLinkError {
    let wanted = match letter.to_ascii_uppercase() {
        'S' => "a non-empty string",
        'N' => "a finite number",
        'F' => "a callback",
        _ => "a value",
    };
    MediaLinkError::InvalidArgument(format!(
        "argument {index}: wanted {wanted}, got {}",
        arg.kind()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_shape_accepts_optional_callbacks() {
        let args = [
            Arg::Str("song.mp3"),
            Arg::Callback(true),
            Arg::Callback(false),
            Arg::Absent,
        ];
        assert!(check("Sfff", &args).is_ok());
        assert!(check("Sfff", &[Arg::Str("song.mp3")]).is_ok());
    }

    #[test]
    fn empty_source_is_rejected() {
        let err = check("Sfff", &[Arg::Str("  ")]).unwrap_err();
        assert!(matches!(err, MediaLinkError::InvalidArgument(_)));
    }

    #[test]
    fn missing_required_argument_is_rejected() {
        assert!(check("N", &[]).is_err());
        assert!(check("N", &[Arg::Number(f64::NAN)]).is_err());
        assert!(check("N", &[Arg::Number(1500.0)]).is_ok());
    }

    #[test]
    fn wrong_kind_is_rejected() {
        assert!(check("S", &[Arg::Number(1.0)]).is_err());
        assert!(check("*", &[Arg::Number(1.0)]).is_ok());
    }

    #[test]
    fn too_many_arguments_are_rejected() {
        assert!(check("S", &[Arg::Str("a"), Arg::Str("b")]).is_err());
    }
}
