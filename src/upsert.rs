// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Upsert instructions.
//!
//! An __upsert__ is the unit of work pagesync sends to the remote store for
//! every content file: find the page whose title matches, create it if
//! missing, set its body, and set its publish date only if it has none yet.
//! Applying the same upsert twice leaves the store exactly as the first
//! application did, which is what makes repeated imports safe.
//!
//! Instructions are plain data. Nothing here escapes or formats anything, see
//! [`ContentEncoder`](crate::encode::ContentEncoder) for that.

use crate::identity::ContentItem;

use chrono::NaiveDate;

/// Find-or-create instruction for a single page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertInstruction {
    /// Title of page to find or create.
    pub match_key: String,

    /// Fields to assign once page is found.
    pub fields: UpsertFields,
}

/// Field assignments of an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertFields {
    /// Page body, always assigned.
    pub body: String,

    /// Publish date, only assigned if page has none.
    pub published_at_if_unset: NaiveDate,
}

impl From<&ContentItem> for UpsertInstruction {
    fn from(item: &ContentItem) -> Self {
        Self {
            match_key: item.identity.clone(),
            fields: UpsertFields {
                body: item.body.clone(),
                published_at_if_unset: item.published_at,
            },
        }
    }
}

impl From<ContentItem> for UpsertInstruction {
    fn from(item: ContentItem) -> Self {
        Self {
            match_key: item.identity,
            fields: UpsertFields {
                body: item.body,
                published_at_if_unset: item.published_at,
            },
        }
    }
}
