// crates/manifest-gate-core/src/core/encoding.rs
// ============================================================================
// Module: Source Encoding
// Description: Locale-derived source encodings and strict byte decoding.
// Purpose: Decode manifest bytes exactly as the execution locale would.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A manifest script is decoded with the encoding its execution locale
//! implies, unless a `coding:` magic comment on one of the first two lines
//! names another. Decoding is strict: the first byte that is invalid for the
//! encoding fails with `invalid multibyte char (<ENCODING>)` on that byte's
//! line. The locale is always passed in explicitly; nothing here reads the
//! process environment.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Encodings
// ============================================================================

/// Text encodings a manifest source can be decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextEncoding {
    /// UTF-8.
    #[serde(rename = "UTF-8")]
    Utf8,
    /// 7-bit ASCII.
    #[serde(rename = "US-ASCII")]
    UsAscii,
    /// ISO-8859-1; every byte decodes.
    #[serde(rename = "ISO-8859-1")]
    Latin1,
}

impl TextEncoding {
    /// Returns the canonical encoding name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "UTF-8",
            Self::UsAscii => "US-ASCII",
            Self::Latin1 => "ISO-8859-1",
        }
    }

    /// Maps an encoding label (case-insensitive) to an encoding.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Some(Self::Utf8),
            "us-ascii" | "ascii" | "ansi-x3.4-1968" | "646" => Some(Self::UsAscii),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Some(Self::Latin1),
            _ => None,
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// SECTION: Locale
// ============================================================================

/// Execution locale, e.g. `C` or `en_US.UTF-8`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutionLocale {
    /// Locale name as given.
    name: String,
    /// Encoding the locale implies.
    encoding: TextEncoding,
}

impl ExecutionLocale {
    /// Interprets a locale name.
    ///
    /// `C` and `POSIX` imply US-ASCII; an explicit codeset (`.UTF-8`,
    /// `.ISO-8859-1`) is honored; an empty name implies UTF-8; any other name
    /// without a recognized codeset implies US-ASCII.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let encoding = locale_encoding(&name);
        Self {
            name,
            encoding,
        }
    }

    /// Returns the UTF-8 locale used when none is configured.
    #[must_use]
    pub fn utf8() -> Self {
        Self::new("C.UTF-8")
    }

    /// Returns the locale name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the encoding the locale implies.
    #[must_use]
    pub const fn encoding(&self) -> TextEncoding {
        self.encoding
    }
}

impl Default for ExecutionLocale {
    fn default() -> Self {
        Self::utf8()
    }
}

/// Derives the encoding for a locale name.
fn locale_encoding(name: &str) -> TextEncoding {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return TextEncoding::Utf8;
    }
    if trimmed == "C" || trimmed == "POSIX" {
        return TextEncoding::UsAscii;
    }
    let codeset = trimmed
        .split_once('.')
        .map(|(_, rest)| rest.split_once('@').map_or(rest, |(codeset, _)| codeset));
    codeset.and_then(TextEncoding::from_label).unwrap_or(TextEncoding::UsAscii)
}

// ============================================================================
// SECTION: Decoding
// ============================================================================

/// Decoding failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// A byte sequence is invalid for the encoding.
    #[error("invalid multibyte char ({encoding})")]
    InvalidBytes {
        /// Encoding in effect.
        encoding: TextEncoding,
        /// 1-based line of the first invalid byte.
        line: usize,
    },
    /// A magic comment names an encoding that is not supported.
    #[error("unknown encoding name - {label}")]
    UnknownEncoding {
        /// Label as written.
        label: String,
        /// 1-based line of the magic comment.
        line: usize,
    },
}

impl DecodeError {
    /// Returns the 1-based line of the failure.
    #[must_use]
    pub const fn line(&self) -> usize {
        match self {
            Self::InvalidBytes {
                line, ..
            }
            | Self::UnknownEncoding {
                line, ..
            } => *line,
        }
    }
}

/// Byte-order mark stripped before UTF-8 decoding.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decodes `bytes` strictly with `encoding`.
///
/// # Errors
///
/// Returns [`DecodeError::InvalidBytes`] at the line of the first invalid
/// byte.
pub fn decode(bytes: &[u8], encoding: TextEncoding) -> Result<String, DecodeError> {
    match encoding {
        TextEncoding::Utf8 => {
            let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
            std::str::from_utf8(body).map(str::to_string).map_err(|err| {
                DecodeError::InvalidBytes {
                    encoding,
                    line: line_of(body, err.valid_up_to()),
                }
            })
        }
        TextEncoding::UsAscii => match bytes.iter().position(|byte| !byte.is_ascii()) {
            Some(offset) => Err(DecodeError::InvalidBytes {
                encoding,
                line: line_of(bytes, offset),
            }),
            None => Ok(bytes.iter().map(|&byte| char::from(byte)).collect()),
        },
        TextEncoding::Latin1 => Ok(bytes.iter().map(|&byte| char::from(byte)).collect()),
    }
}

/// Returns the 1-based line containing byte `offset`.
fn line_of(bytes: &[u8], offset: usize) -> usize {
    bytes[.. offset.min(bytes.len())].iter().filter(|&&byte| byte == b'\n').count() + 1
}

/// Looks for a `coding:` magic comment on the first two lines.
///
/// # Errors
///
/// Returns [`DecodeError::UnknownEncoding`] when the comment names an
/// unsupported encoding.
pub fn magic_comment_encoding(bytes: &[u8]) -> Result<Option<TextEncoding>, DecodeError> {
    for (index, line) in bytes.split(|&byte| byte == b'\n').take(2).enumerate() {
        let Some(label) = magic_label(line) else {
            continue;
        };
        return TextEncoding::from_label(label).map(Some).ok_or_else(|| {
            DecodeError::UnknownEncoding {
                label: label.to_string(),
                line: index + 1,
            }
        });
    }
    Ok(None)
}

/// Extracts the label from a `# coding: label` style comment line.
fn magic_label(line: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(line).ok()?.trim_start();
    let comment = text.strip_prefix('#')?;
    let start = comment.find("coding")? + "coding".len();
    let rest = comment[start ..].strip_prefix([':', '='])?.trim_start();
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'))
        .unwrap_or(rest.len());
    let label = &rest[.. end];
    if label.is_empty() { None } else { Some(label) }
}

/// Decodes a script source: magic comment first, then the locale encoding.
///
/// # Errors
///
/// Returns [`DecodeError`] for unknown magic-comment encodings or invalid
/// bytes.
pub fn decode_script(
    bytes: &[u8],
    locale: &ExecutionLocale,
) -> Result<(String, TextEncoding), DecodeError> {
    let encoding = magic_comment_encoding(bytes)?.unwrap_or_else(|| locale.encoding());
    decode(bytes, encoding).map(|text| (text, encoding))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
