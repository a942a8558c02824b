// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Idempotent page import into a remote content store.
//!
//! Pagesync takes a directory of Markdown files and turns each one into a
//! page of a remote content store, by running a small program on the store's
//! own runner over SSH. Imports can be repeated at will. Each file maps onto
//! the same page on every run, so pages get updated in place instead of
//! duplicated.
//!
//! # Pipeline
//!
//! For every content file:
//!
//! 1. [`identity`] derives the page title and a publish date hint from the
//!    filename.
//! 2. [`upsert`] describes the find-or-create of the page as plain data.
//! 3. [`encode`] escapes every field for the single quoting boundary it
//!    crosses.
//! 4. [`remote`] renders the runner program, and executes it over one SSH
//!    session.
//!
//! [`batch`] drives this pipeline over a whole directory, and [`config`]
//! resolves the settings it needs.

pub mod batch;
pub mod config;
pub mod encode;
pub mod identity;
pub mod path;
pub mod remote;
pub mod teaser;
pub mod upsert;
