// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Content identity derivation.
//!
//! Every content file maps onto exactly one remote page. The link between the
//! two is the page's __identity__: a title derived purely from the filename.
//! Nothing about the file's content or location participates, so running an
//! import twice over the same directory always produces the same identities.
//!
//! # Filename Layout
//!
//! Content files follow the layout `[NN-]words-of-the-title.md`. The leading
//! digits are an ordering prefix. They are dropped from the identity, so a
//! file can be renumbered without losing track of its remote page. Dashes in
//! the remainder become spaces. Thus, "07-deep-dive.md" has the identity
//! "deep dive".
//!
//! The first two digits of the ordering prefix double as a publication year
//! hint. "07-deep-dive.md" hints at 2007-01-01. Files without such a prefix
//! fall back to a configured year. The hint is only ever a default. A remote
//! page that already carries a publish date keeps it.
//!
//! # Identity Collisions
//!
//! Two filenames that differ only by ordering prefix, e.g., "01-intro.md" and
//! "02-intro.md", collapse onto the same identity. They are treated as the
//! same page, and whichever file gets imported last wins. This is what makes
//! renumbering safe, but it also means an accidental duplicate silently
//! overwrites its twin. The batch importer logs a warning whenever it sees
//! this happen.

use chrono::NaiveDate;

/// Century that two-digit year hints are offset from.
const YEAR_HINT_CENTURY: i32 = 2000;

/// Rules for deriving identities from content filenames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRules {
    extension: String,
    fallback_date: NaiveDate,
}

impl IdentityRules {
    /// Construct new identity rules.
    ///
    /// The `extension` is stripped from filenames before derivation, and is
    /// given without its leading dot. The `fallback_date` is used for files
    /// that carry no year hint.
    pub fn new(extension: impl Into<String>, fallback_date: NaiveDate) -> Self {
        Self {
            extension: extension.into(),
            fallback_date,
        }
    }

    /// File extension eligible for import, without leading dot.
    pub fn extension(&self) -> &str {
        self.extension.as_str()
    }

    /// Derive identity and publication date hint from a filename.
    ///
    /// Never fails. Filenames that do not follow the expected layout simply
    /// yield a less pretty identity, and the fallback date.
    pub fn derive(&self, filename: &str) -> (String, NaiveDate) {
        (self.identity(filename), self.published_at(filename))
    }

    fn identity(&self, filename: &str) -> String {
        let stem = filename
            .strip_suffix(self.extension.as_str())
            .and_then(|rest| rest.strip_suffix('.'))
            .unwrap_or(filename);

        // INVARIANT: Only drop digits when a separator follows them.
        //   - "2024.md" stays "2024", "01-intro.md" becomes "intro".
        let digits = stem.trim_start_matches(|c: char| c.is_ascii_digit());
        let stem = match digits.strip_prefix('-') {
            Some(rest) if digits.len() < stem.len() => rest,
            _ => stem,
        };

        stem.replace('-', " ")
    }

    fn published_at(&self, filename: &str) -> NaiveDate {
        let hint = filename.get(..2).filter(|yy| yy.bytes().all(|b| b.is_ascii_digit()));
        hint.and_then(|yy| yy.parse::<i32>().ok())
            .and_then(|yy| NaiveDate::from_ymd_opt(YEAR_HINT_CENTURY + yy, 1, 1))
            .unwrap_or(self.fallback_date)
    }
}

/// A piece of content ready to be imported.
///
/// Constructed fresh for every file on every run. The body is kept verbatim,
/// no escaping of any kind has been applied yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// Stable title used to match remote page.
    pub identity: String,

    /// Verbatim file content.
    pub body: String,

    /// Default publication date, only applied to pages without one.
    pub published_at: NaiveDate,
}

impl ContentItem {
    /// Construct new content item from a filename and its content.
    pub fn new(rules: &IdentityRules, filename: &str, body: impl Into<String>) -> Self {
        let (identity, published_at) = rules.derive(filename);
        Self {
            identity,
            body: body.into(),
            published_at,
        }
    }
}
