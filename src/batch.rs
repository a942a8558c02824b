// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Batch import of content directories.
//!
//! The importer walks one content directory, and imports each eligible file
//! as its own page through a [`RemoteExecutor`]. Files are handled one at a
//! time, in whatever order the file system lists them. A file that fails to
//! import is recorded, and the importer moves on to the next one. Only a
//! directory that cannot be listed at all stops the batch.
//!
//! # Ordering
//!
//! Enumeration order only matters when two files share an identity, see
//! [`identity`](crate::identity). The last file that imports successfully
//! wins, and a warning is logged each time it overwrites an earlier one. A
//! later file that fails to import leaves the earlier page content alone.

use crate::{
    encode::{ContentEncoder, EncodeError},
    identity::{ContentItem, IdentityRules},
    remote::{script::render_upsert, ExecutionResult, RemoteError, RemoteExecutor},
    upsert::UpsertInstruction,
};

use indicatif::{ProgressBar, ProgressStyle};
use std::{
    collections::HashMap,
    error::Error,
    ffi::OsStr,
    fmt::{Display, Formatter, Result as FmtResult},
    fs::{read_dir, read_to_string},
    path::{Path, PathBuf},
};
use tracing::{error, info, instrument, warn};

/// Settings of batch import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    /// Directory holding content files.
    pub content_dir: PathBuf,

    /// Identity derivation rules, also decides eligible extension.
    pub rules: IdentityRules,

    /// Encoder for runner programs.
    pub encoder: ContentEncoder,
}

/// Batch importer of content directory.
#[derive(Debug)]
pub struct Importer<E>
where
    E: RemoteExecutor,
{
    settings: ImportSettings,
    executor: E,
    bar: ProgressBar,
}

impl<E> Importer<E>
where
    E: RemoteExecutor,
{
    /// Construct new importer.
    pub fn new(settings: ImportSettings, executor: E, bar: ProgressBar) -> Self {
        Self {
            settings,
            executor,
            bar,
        }
    }

    /// List eligible content files in enumeration order.
    ///
    /// # Errors
    ///
    /// - Return [`BatchError::ListDir`] if content directory cannot be read.
    pub fn content_files(&self) -> Result<Vec<PathBuf>> {
        let content_dir = &self.settings.content_dir;
        let list_err = |err| BatchError::ListDir {
            source: err,
            content_dir: content_dir.clone(),
        };

        let extension = OsStr::new(self.settings.rules.extension());
        let mut files = Vec::new();
        for entry in read_dir(content_dir).map_err(list_err)? {
            let path = entry.map_err(list_err)?.path();
            if path.is_file() && path.extension() == Some(extension) {
                files.push(path);
            }
        }

        Ok(files)
    }

    /// Import every eligible content file.
    ///
    /// Failures of single files end up in the returned report.
    ///
    /// # Errors
    ///
    /// - Return [`BatchError::ListDir`] if content directory cannot be read.
    /// - Return [`BatchError::IndicatifStyleTemplate`] if progress bar cannot
    ///   be styled.
    #[instrument(skip(self), fields(content_dir = %self.settings.content_dir.display()))]
    pub fn run(&self) -> Result<BatchReport> {
        let files = self.content_files()?;
        info!("import {} file(s)", files.len());

        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}] {pos}/{len}",
        )?
        .progress_chars("-Cco.");
        self.bar.set_style(style);
        self.bar.set_length(files.len() as u64);

        let mut report = BatchReport::default();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        for path in files {
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.bar.set_message(filename.clone());

            let (identity, _) = self.settings.rules.derive(&filename);
            match self.import_file(&path, &filename) {
                Ok(()) => {
                    // INVARIANT: Only successful imports overwrite a page.
                    if let Some(previous) = seen.insert(identity.clone(), path.clone()) {
                        warn!(
                            "{} overwrote page {identity:?} imported from {}",
                            path.display(),
                            previous.display()
                        );
                    }
                    report.imported.push(ImportedItem { path, identity });
                }
                Err(failure) => {
                    error!("failed to import {}: {}", path.display(), failure.reason());
                    report.failed.push(FailedItem {
                        path,
                        identity,
                        failure,
                    });
                }
            }
            self.bar.inc(1);
        }
        self.bar.finish_and_clear();

        info!("{report}");
        Ok(report)
    }

    #[instrument(skip(self, path), level = "debug")]
    fn import_file(&self, path: &Path, filename: &str) -> Result<(), ImportFailure> {
        let body = read_to_string(path).map_err(ImportFailure::Read)?;
        let item = ContentItem::new(&self.settings.rules, filename, body);
        info!("import {:?} from {filename}", item.identity);

        let instruction = UpsertInstruction::from(item);
        let encoded = self.settings.encoder.encode_upsert(&instruction)?;
        let program = render_upsert(filename, &encoded);

        let result = self.executor.execute(&program)?;
        if !result.succeeded {
            return Err(ImportFailure::Remote(result));
        }

        Ok(())
    }
}

/// Summary of batch import.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Files imported successfully, in import order.
    pub imported: Vec<ImportedItem>,

    /// Files that failed to import, in import order.
    pub failed: Vec<FailedItem>,
}

impl BatchReport {
    /// Check that no file failed.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Total number of files processed.
    pub fn total(&self) -> usize {
        self.imported.len() + self.failed.len()
    }
}

impl Display for BatchReport {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "imported {} of {} file(s), {} failed",
            self.imported.len(),
            self.total(),
            self.failed.len()
        )?;

        for item in &self.failed {
            write!(fmt, "\n  {}: {}", item.path.display(), item.failure.reason())?;
        }

        Ok(())
    }
}

/// Successfully imported content file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedItem {
    /// Path to content file.
    pub path: PathBuf,

    /// Identity content file was imported under.
    pub identity: String,
}

/// Content file that failed to import.
#[derive(Debug)]
pub struct FailedItem {
    /// Path to content file.
    pub path: PathBuf,

    /// Identity derived from content file.
    pub identity: String,

    /// Reason for failure.
    pub failure: ImportFailure,
}

/// Reasons a single content file fails to import.
#[derive(Debug, thiserror::Error)]
pub enum ImportFailure {
    /// Content file cannot be read as UTF-8 text.
    #[error("failed to read content file")]
    Read(#[source] std::io::Error),

    /// Content cannot be encoded for delivery.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// Command channel fails.
    #[error(transparent)]
    Channel(#[from] RemoteError),

    /// Remote program ran but failed.
    #[error("{0}")]
    Remote(ExecutionResult),
}

impl ImportFailure {
    /// Failure message followed by every underlying cause.
    pub fn reason(&self) -> String {
        let mut reason = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            reason.push_str(": ");
            reason.push_str(&cause.to_string());
            source = cause.source();
        }

        reason
    }
}

/// Batch import error types.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// Content directory cannot be listed.
    #[error("failed to list content directory {:?}", content_dir.display())]
    ListDir {
        #[source]
        source: std::io::Error,
        content_dir: PathBuf,
    },

    /// Style template cannot be set for progress bar.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),
}

/// Friendly result alias :3
pub type Result<T, E = BatchError> = std::result::Result<T, E>;
