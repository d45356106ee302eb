use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use walkdir::WalkDir;

use crate::cancel::CancelToken;
use crate::error::{ClasspathError, Result};
use crate::filter::relative_filter_path;
use crate::source::{is_system_archive, ClasspathElement};
use crate::spec::ScanSpec;

/// The change-detection fast path: descends the same tree as a full walk,
/// under the same filter, but never opens a file. Archives are stat'ed as a
/// whole rather than enumerated.
pub struct TimestampScanner<'a> {
    spec: &'a ScanSpec,
    cancel: CancelToken,
}

impl<'a> TimestampScanner<'a> {
    pub fn new(spec: &'a ScanSpec) -> Self {
        Self {
            spec,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(spec: &'a ScanSpec, cancel: CancelToken) -> Self {
        Self { spec, cancel }
    }

    /// Maximum modification time over the classpath, epoch milliseconds.
    pub fn scan(&self, elements: &[ClasspathElement]) -> Result<u64> {
        let mut max_ms = 0u64;
        for element in elements {
            self.cancel.check()?;
            let outcome = match element {
                ClasspathElement::Dir(dir) if self.spec.scan_directories => {
                    self.scan_dir(dir, &mut max_ms)
                }
                ClasspathElement::Archive(path) if self.spec.scan_archives => {
                    self.scan_archive(path, &mut max_ms)
                }
                ClasspathElement::File(path) => stat_into(path, &mut max_ms),
                _ => Ok(()),
            };
            match outcome {
                Ok(()) => {}
                Err(ClasspathError::Cancelled) => return Err(ClasspathError::Cancelled),
                Err(err) => {
                    tracing::warn!(
                        element = %element.path().display(),
                        error = %err,
                        "skipping unreadable classpath element"
                    );
                }
            }
        }
        Ok(max_ms)
    }

    fn scan_dir(&self, root: &Path, max_ms: &mut u64) -> Result<()> {
        let spec = self.spec;
        let iter = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                match relative_filter_path(root, entry.path(), true) {
                    Some(path) => spec.classify(&path).permits_descent(),
                    None => false,
                }
            });
        for entry in iter {
            self.cancel.check()?;
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "unreadable directory entry");
                    continue;
                }
            };
            if let Ok(metadata) = entry.metadata() {
                if let Ok(modified) = metadata.modified() {
                    observe(max_ms, modified);
                }
            }
        }
        Ok(())
    }

    fn scan_archive(&self, path: &Path, max_ms: &mut u64) -> Result<()> {
        let leaf = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if !self.spec.accepts_archive_name(&leaf) {
            return Ok(());
        }
        if self.spec.blacklist_system_archives && is_system_archive(path) {
            return Ok(());
        }
        stat_into(path, max_ms)
    }
}

fn stat_into(path: &Path, max_ms: &mut u64) -> Result<()> {
    let metadata = std::fs::metadata(path)?;
    if let Ok(modified) = metadata.modified() {
        observe(max_ms, modified);
    }
    Ok(())
}

fn observe(max_ms: &mut u64, time: SystemTime) {
    let ms = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);
    if ms > *max_ms {
        *max_ms = ms;
    }
}
