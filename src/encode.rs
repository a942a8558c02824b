// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Content encoding for remote delivery.
//!
//! Content travels through several readers before it lands in a page record:
//! the remote login shell that starts the runner, and the Ruby parser that
//! reads the runner program. Each reader has its own quoting rules. Each rule
//! set is modeled as an [`EncodingLayer`] with an escape function and its
//! exact inverse, so every boundary can be tested on its own.
//!
//! # Delivery Channels
//!
//! Pagesync never interpolates content into a command line. The runner
//! program is written to the standard input of the SSH channel, which is a
//! raw byte stream. Thus, the only reader that ever sees page content is the
//! Ruby parser, and each value crosses exactly one quoting boundary:
//!
//! - __Body__: placed in a raw heredoc via [`Heredoc`]. Ruby does no escape
//!   processing in `<<'DELIM'` heredocs, so the body goes through
//!   untouched. The only hazard is the delimiter showing up inside the body,
//!   which is detected and rejected.
//! - __Inline fields__: short values like the title and date become Ruby
//!   double-quoted string literals via [`RubyString`].
//! - __Remote command__: the `cd <app_dir> && <runner>` line handed to ssh
//!   is read by the remote login shell, so each of its words goes through
//!   [`ShellWord`].
//!
//! Ruby drops carriage returns at the end of heredoc lines. Bodies that
//! contain a carriage return are delivered as a [`RubyString`] literal
//! instead, which keeps them byte-for-byte intact.

use crate::upsert::UpsertInstruction;

use tracing::debug;

/// Default heredoc delimiter for page bodies.
pub const DEFAULT_DELIMITER: &str = "PAGESYNC_BODY";

/// A single quoting boundary.
///
/// # Invariant
///
/// - `unescape(escape(raw)) == raw` for every input `escape` accepts.
pub trait EncodingLayer {
    /// Name of the boundary for error reporting.
    fn name(&self) -> &'static str;

    /// Escape raw text so it survives being read by this layer's reader.
    fn escape(&self, raw: &str) -> Result<String>;

    /// Undo [`EncodingLayer::escape`] the way this layer's reader would.
    fn unescape(&self, escaped: &str) -> Result<String>;
}

/// Ruby double-quoted string literal.
///
/// Backslash, double quote, backtick, `$`, and `#` are always
/// backslash-escaped so they can never trigger interpolation or terminate the
/// literal. Control characters are spelled out as escape sequences.
#[derive(Debug, Default, Clone, Copy)]
pub struct RubyString;

impl EncodingLayer for RubyString {
    fn name(&self) -> &'static str {
        "ruby string"
    }

    fn escape(&self, raw: &str) -> Result<String> {
        let mut out = String::with_capacity(raw.len() + 2);
        out.push('"');
        for ch in raw.chars() {
            match ch {
                '\\' | '"' | '`' | '$' | '#' => {
                    out.push('\\');
                    out.push(ch);
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                // INVARIANT: Fixed width escape, digits after it stay literal.
                ch if ch.is_ascii_control() => out.push_str(&format!("\\u{:04X}", ch as u32)),
                ch => out.push(ch),
            }
        }
        out.push('"');

        Ok(out)
    }

    fn unescape(&self, escaped: &str) -> Result<String> {
        let inner = escaped
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .ok_or_else(|| self.malformed("missing surrounding double quotes"))?;

        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '\\' => match chars.next() {
                    Some(ch @ ('\\' | '"' | '`' | '$' | '#')) => out.push(ch),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('u') => {
                        let hex: String = chars.by_ref().take(4).collect();
                        let ch = u32::from_str_radix(&hex, 16)
                            .ok()
                            .filter(|_| hex.len() == 4)
                            .and_then(char::from_u32)
                            .ok_or_else(|| self.malformed(format!("bad unicode escape {hex:?}")))?;
                        out.push(ch);
                    }
                    Some(other) => {
                        return Err(self.malformed(format!("unexpected escape \\{other}")))
                    }
                    None => return Err(self.malformed("dangling backslash")),
                },
                '"' => return Err(self.malformed("unescaped double quote")),
                ch => out.push(ch),
            }
        }

        Ok(out)
    }
}

/// POSIX shell word in single quotes.
///
/// Everything between single quotes is literal to a POSIX shell. Embedded
/// single quotes close the quote, emit an escaped quote, and reopen it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellWord;

impl EncodingLayer for ShellWord {
    fn name(&self) -> &'static str {
        "shell word"
    }

    fn escape(&self, raw: &str) -> Result<String> {
        Ok(format!("'{}'", raw.replace('\'', "'\\''")))
    }

    fn unescape(&self, escaped: &str) -> Result<String> {
        let mut out = String::with_capacity(escaped.len());
        let mut quoted = false;
        let mut chars = escaped.chars();
        while let Some(ch) = chars.next() {
            match (quoted, ch) {
                (true, '\'') => quoted = false,
                (true, ch) => out.push(ch),
                (false, '\'') => quoted = true,
                (false, '\\') => match chars.next() {
                    Some(ch) => out.push(ch),
                    None => return Err(self.malformed("dangling backslash")),
                },
                (false, ch) => {
                    return Err(self.malformed(format!("unquoted character {ch:?}")))
                }
            }
        }

        if quoted {
            return Err(self.malformed("unterminated single quote"));
        }

        Ok(out)
    }
}

/// Raw Ruby heredoc.
///
/// Escaping yields the heredoc block that follows the `<<'DELIM'` opener,
/// i.e., the body, one padding newline, and the terminator line. The runner
/// program strips the padding newline again with `.delete_suffix("\n")`,
/// which is what keeps a body's trailing newlines, or lack thereof, exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heredoc {
    delimiter: String,
}

impl Heredoc {
    /// Construct new heredoc layer.
    ///
    /// # Errors
    ///
    /// - Return [`EncodeError::InvalidDelimiter`] if delimiter is not made of
    ///   uppercase ASCII letters, digits, and underscores, starting with a
    ///   letter or underscore.
    pub fn new(delimiter: impl Into<String>) -> Result<Self> {
        let delimiter = delimiter.into();
        let mut chars = delimiter.chars();
        let valid = chars
            .next()
            .is_some_and(|ch| ch.is_ascii_uppercase() || ch == '_')
            && chars.all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_');

        if !valid {
            return Err(EncodeError::InvalidDelimiter { delimiter });
        }

        Ok(Self { delimiter })
    }

    /// Heredoc opener expression that evaluates to the original body.
    pub fn opener(&self) -> String {
        format!("<<'{}'.delete_suffix(\"\\n\")", self.delimiter)
    }

    /// Delimiter terminating the heredoc.
    pub fn delimiter(&self) -> &str {
        self.delimiter.as_str()
    }

    fn collides(&self, raw: &str) -> bool {
        raw.contains(self.delimiter.as_str())
    }
}

impl EncodingLayer for Heredoc {
    fn name(&self) -> &'static str {
        "heredoc"
    }

    fn escape(&self, raw: &str) -> Result<String> {
        if self.collides(raw) {
            return Err(EncodeError::DelimiterCollision {
                delimiter: self.delimiter.clone(),
            });
        }

        Ok(format!("{raw}\n{}\n", self.delimiter))
    }

    fn unescape(&self, escaped: &str) -> Result<String> {
        let terminator = format!("\n{}\n", self.delimiter);
        escaped
            .strip_suffix(terminator.as_str())
            .map(ToString::to_string)
            .ok_or_else(|| self.malformed(format!("missing terminator {:?}", self.delimiter)))
    }
}

/// Body of a page, encoded for the runner program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Raw heredoc, opener expression followed by block on the next lines.
    Heredoc { opener: String, block: String },

    /// Ruby string literal for bodies a heredoc cannot carry intact.
    Literal(String),
}

/// Upsert instruction with every field encoded for the runner program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedUpsert {
    /// Ruby literal of the page title to match.
    pub match_key: String,

    /// Encoded page body.
    pub body: Payload,

    /// Ruby literal of the publication date in `YYYY-MM-DD` form.
    pub published_at: String,
}

/// Encoder for everything that crosses into the remote runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEncoder {
    heredoc: Heredoc,
}

impl ContentEncoder {
    /// Construct new content encoder with target heredoc delimiter.
    ///
    /// # Errors
    ///
    /// - Return [`EncodeError::InvalidDelimiter`] if delimiter is not a valid
    ///   heredoc identifier.
    pub fn new(delimiter: impl Into<String>) -> Result<Self> {
        Ok(Self {
            heredoc: Heredoc::new(delimiter)?,
        })
    }

    /// Encode short field as Ruby string literal.
    pub fn inline(&self, raw: &str) -> Result<String> {
        RubyString.escape(raw)
    }

    /// Encode page body.
    ///
    /// # Errors
    ///
    /// - Return [`EncodeError::DelimiterCollision`] if heredoc delimiter
    ///   occurs inside the body. Checked for every body, regardless of the
    ///   delivery form it ends up using.
    pub fn payload(&self, body: &str) -> Result<Payload> {
        if self.heredoc.collides(body) {
            return Err(EncodeError::DelimiterCollision {
                delimiter: self.heredoc.delimiter.clone(),
            });
        }

        if body.contains('\r') {
            debug!("body contains carriage returns, deliver as string literal");
            return Ok(Payload::Literal(RubyString.escape(body)?));
        }

        Ok(Payload::Heredoc {
            opener: self.heredoc.opener(),
            block: self.heredoc.escape(body)?,
        })
    }

    /// Decode page body the way the runner program would.
    pub fn decode_payload(&self, payload: &Payload) -> Result<String> {
        match payload {
            Payload::Heredoc { block, .. } => self.heredoc.unescape(block),
            Payload::Literal(literal) => RubyString.unescape(literal),
        }
    }

    /// Encode every field of an upsert instruction.
    ///
    /// # Errors
    ///
    /// - Return [`EncodeError::DelimiterCollision`] if heredoc delimiter
    ///   occurs inside the body.
    pub fn encode_upsert(&self, instruction: &UpsertInstruction) -> Result<EncodedUpsert> {
        Ok(EncodedUpsert {
            match_key: self.inline(&instruction.match_key)?,
            body: self.payload(&instruction.fields.body)?,
            published_at: self.inline(
                &instruction
                    .fields
                    .published_at_if_unset
                    .format("%Y-%m-%d")
                    .to_string(),
            )?,
        })
    }
}

trait Malformed {
    fn malformed(&self, reason: impl Into<String>) -> EncodeError;
}

impl<L: EncodingLayer> Malformed for L {
    fn malformed(&self, reason: impl Into<String>) -> EncodeError {
        EncodeError::Malformed {
            layer: self.name(),
            reason: reason.into(),
        }
    }
}

/// Content encoding error types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// Heredoc delimiter shows up inside the content it should terminate.
    #[error("heredoc delimiter {delimiter:?} occurs inside content body")]
    DelimiterCollision { delimiter: String },

    /// Heredoc delimiter cannot be used as a Ruby heredoc identifier.
    #[error("invalid heredoc delimiter {delimiter:?}")]
    InvalidDelimiter { delimiter: String },

    /// Encoded text does not follow the layer's quoting rules.
    #[error("malformed {layer} encoding: {reason}")]
    Malformed { layer: &'static str, reason: String },
}

/// Friendly result alias :3
pub type Result<T, E = EncodeError> = std::result::Result<T, E>;
