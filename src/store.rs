// src/store.rs
// =============================================================================
// Persists the visited set between runs as a one-column CSV file:
//
//   URL
//   https://example.com/
//   https://example.com/about
//
// The file is read once at startup and rewritten once at the end of the run.
// Nothing is appended while the crawl is going, so an interrupted process
// can lose progress but cannot leave a half-written file behind.
// =============================================================================

use crate::canonical::{canonicalize, CanonicalUrl};
use crate::error::{CrawlError, Result};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Name of the principal column in the state file
const URL_COLUMN: &str = "URL";

// Reads and writes the visited-URL state file
#[derive(Debug, Clone)]
pub struct VisitedStore {
    path: PathBuf,
}

impl VisitedStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Loads the previously visited URLs
    //
    // - A missing or empty file is a fresh start, not an error.
    // - Rows are canonicalized again so older files still deduplicate.
    // - Blank, malformed or unparsable rows are skipped with a warning.
    // - A file without a URL column is refused: it is not ours, and flushing
    //   over it later would destroy someone else's data.
    pub fn load(&self) -> Result<HashSet<CanonicalUrl>> {
        let mut visited = HashSet::new();

        let metadata = match fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no existing state file, starting fresh");
                return Ok(visited);
            }
            Err(source) => return Err(self.persistence_error(source)),
        };

        if metadata.len() == 0 {
            warn!(path = %self.path.display(), "state file is empty, starting fresh");
            return Ok(visited);
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.csv_error(e))?;

        let headers = reader.headers().map_err(|e| self.csv_error(e))?.clone();
        let column = headers
            .iter()
            .position(|h| h.trim() == URL_COLUMN)
            .ok_or_else(|| CrawlError::CorruptState {
                path: self.path.clone(),
                reason: format!("missing '{}' column (found: {:?})", URL_COLUMN, headers),
            })?;

        let mut skipped = 0usize;
        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "skipping malformed state row");
                    skipped += 1;
                    continue;
                }
            };

            let value = record.get(column).unwrap_or("").trim();
            if value.is_empty() {
                continue;
            }

            match canonicalize(value, None) {
                Ok(url) => {
                    visited.insert(url);
                }
                Err(e) => {
                    warn!(error = %e, "skipping unparsable URL in state file");
                    skipped += 1;
                }
            }
        }

        info!(
            path = %self.path.display(),
            loaded = visited.len(),
            skipped,
            "loaded visited URLs"
        );
        Ok(visited)
    }

    // Overwrites the state file with the full visited set
    //
    // Every URL is written exactly once, sorted so diffs between runs stay
    // readable. The rows go to a sibling temp file first and are then renamed
    // over the target, so readers only ever see the old or the new file.
    pub fn flush<'a, I>(&self, urls: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a CanonicalUrl>,
    {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.persistence_error(e))?;
        }

        let mut rows: Vec<&CanonicalUrl> = urls.into_iter().collect();
        rows.sort();
        rows.dedup();

        let temp_path = self.temp_path();
        let written = self.write_rows(&temp_path, &rows);

        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            self.persistence_error(e)
        })?;

        info!(path = %self.path.display(), saved = rows.len(), "saved visited URLs");
        Ok(rows.len())
    }

    fn write_rows(&self, temp_path: &Path, rows: &[&CanonicalUrl]) -> Result<()> {
        let mut writer = csv::Writer::from_path(temp_path).map_err(|e| self.csv_error(e))?;

        writer
            .write_record([URL_COLUMN])
            .map_err(|e| self.csv_error(e))?;
        for url in rows {
            writer
                .write_record([url.as_str()])
                .map_err(|e| self.csv_error(e))?;
        }

        writer.flush().map_err(|e| self.persistence_error(e))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "visited.csv".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persistence_error(&self, source: std::io::Error) -> CrawlError {
        CrawlError::Persistence {
            path: self.path.clone(),
            source,
        }
    }

    // csv errors are either I/O (persistence) or format problems (corrupt)
    fn csv_error(&self, error: csv::Error) -> CrawlError {
        if error.is_io_error() {
            match error.into_kind() {
                csv::ErrorKind::Io(source) => self.persistence_error(source),
                other => CrawlError::CorruptState {
                    path: self.path.clone(),
                    reason: format!("{:?}", other),
                },
            }
        } else {
            CrawlError::CorruptState {
                path: self.path.clone(),
                reason: error.to_string(),
            }
        }
    }
}
