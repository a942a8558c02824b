// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Teaser pages.
//!
//! A __teaser__ is a public preview of an existing page. It copies the
//! original page, prefixes its title with "(Preview) ", and cuts its body
//! down to the first few words. Unlike imports, teasers are not idempotent.
//! Every request creates a fresh copy.

/// Default number of words kept in a teaser body.
pub const DEFAULT_TEASER_WORDS: usize = 500;

/// Request to create a teaser page from an existing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeaserInstruction {
    slug: String,
    words: usize,
}

impl TeaserInstruction {
    /// Construct new teaser instruction.
    ///
    /// # Errors
    ///
    /// - Return [`TeaserError::EmptySlug`] if slug is empty or blank.
    /// - Return [`TeaserError::ZeroWords`] if no words would be kept.
    pub fn new(slug: impl Into<String>, words: usize) -> Result<Self> {
        let slug = slug.into();
        if slug.trim().is_empty() {
            return Err(TeaserError::EmptySlug);
        }

        if words == 0 {
            return Err(TeaserError::ZeroWords);
        }

        Ok(Self { slug, words })
    }

    /// Slug of page to copy.
    pub fn slug(&self) -> &str {
        self.slug.as_str()
    }

    /// Number of leading words to keep.
    pub fn words(&self) -> usize {
        self.words
    }
}

/// Teaser request error types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TeaserError {
    /// No page slug given.
    #[error("teaser needs a page slug")]
    EmptySlug,

    /// Teaser would have an empty body.
    #[error("teaser must keep at least one word")]
    ZeroWords,
}

/// Friendly result alias :3
pub type Result<T, E = TeaserError> = std::result::Result<T, E>;
