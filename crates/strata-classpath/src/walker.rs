use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use walkdir::WalkDir;

use strata_classfile::{parse_classfile, ClassfileRecord};

use crate::cancel::CancelToken;
use crate::error::{ClasspathError, Result};
use crate::filter::{parent_dir_path, relative_filter_path, PathMatch};
use crate::source::{is_system_archive, ClasspathElement};
use crate::spec::ScanSpec;
use crate::stats::ScanStats;

/// Receives what the walker finds.
///
/// Parsing is a pure function of the file bytes; everything stateful
/// (aggregation, match dispatch) happens behind this seam.
pub trait ScanSink {
    /// A classfile record that survived the first-occurrence shadowing rule.
    /// `origin` is the file that defined it, or the enclosing archive.
    fn classfile(&mut self, record: ClassfileRecord, origin: &Path);

    /// A non-class resource whose relative path matched a registered file
    /// pattern. The bytes are only valid for the duration of the call.
    fn resource(&mut self, absolute_path: &Path, relative_path: &str, bytes: &[u8]);
}

/// Walks classpath elements in order, applying the path filter, shadowing
/// rule, and per-file error policy. Per-file and per-element failures are
/// logged and skipped; only cancellation aborts the walk.
pub struct ClasspathWalker<'a> {
    spec: &'a ScanSpec,
    cancel: CancelToken,
}

struct WalkContext {
    /// Class names seen so far, across all elements. First occurrence wins.
    encountered: HashSet<String>,
    last_modified_ms: u64,
}

impl WalkContext {
    fn observe_mtime(&mut self, ms: u64) {
        if ms > self.last_modified_ms {
            self.last_modified_ms = ms;
        }
    }
}

impl<'a> ClasspathWalker<'a> {
    pub fn new(spec: &'a ScanSpec) -> Self {
        Self {
            spec,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(spec: &'a ScanSpec, cancel: CancelToken) -> Self {
        Self { spec, cancel }
    }

    /// Walk every element in order. Returns the maximum modification time
    /// observed (epoch milliseconds), 0 for an empty classpath.
    pub fn walk(
        &self,
        elements: &[ClasspathElement],
        stats: &ScanStats,
        sink: &mut dyn ScanSink,
    ) -> Result<u64> {
        let mut ctx = WalkContext {
            encountered: HashSet::new(),
            last_modified_ms: 0,
        };
        for element in elements {
            self.cancel.check()?;
            let outcome = match element {
                ClasspathElement::Dir(dir) if self.spec.scan_directories => {
                    self.walk_dir(dir, &mut ctx, stats, sink)
                }
                ClasspathElement::Archive(path) if self.spec.scan_archives => {
                    self.walk_archive(path, &mut ctx, stats, sink)
                }
                ClasspathElement::File(path) => self.walk_plain_file(path, &mut ctx, stats, sink),
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
        Ok(ctx.last_modified_ms)
    }

    fn walk_dir(
        &self,
        root: &Path,
        ctx: &mut WalkContext,
        stats: &ScanStats,
        sink: &mut dyn ScanSink,
    ) -> Result<()> {
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
                    ctx.observe_mtime(system_time_ms(modified));
                }
            }
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(rel) = relative_filter_path(root, entry.path(), false) else {
                continue;
            };
            self.visit_file(entry.path(), &rel, ctx, stats, sink);
        }
        Ok(())
    }

    /// Dispatch one file that traversal reached, class or resource.
    fn visit_file(
        &self,
        absolute: &Path,
        rel: &str,
        ctx: &mut WalkContext,
        stats: &ScanStats,
        sink: &mut dyn ScanSink,
    ) {
        let spec = self.spec;
        if spec.classify(rel) == PathMatch::Blacklisted {
            return;
        }
        let dir_match = spec.classify(&parent_dir_path(rel));

        if rel.ends_with(".class") {
            let eligible = dir_match.permits_file_scan()
                || (dir_match == PathMatch::AtWhitelistedClassPackage
                    && spec.is_whitelisted_class_file(rel));
            if !eligible || self.skip_descriptor(rel) {
                return;
            }
            match std::fs::read(absolute) {
                Ok(bytes) => self.parse_and_emit(absolute, &bytes, ctx, stats, sink),
                Err(err) => {
                    tracing::warn!(path = %absolute.display(), error = %err, "unreadable classfile")
                }
            }
        } else if dir_match.permits_file_scan() && spec.matches_file(&rel[1..]) {
            match std::fs::read(absolute) {
                Ok(bytes) => {
                    stats.record_resource_matched();
                    sink.resource(absolute, &rel[1..], &bytes);
                }
                Err(err) => {
                    tracing::warn!(path = %absolute.display(), error = %err, "unreadable resource")
                }
            }
        }
    }

    fn walk_archive(
        &self,
        path: &Path,
        ctx: &mut WalkContext,
        stats: &ScanStats,
        sink: &mut dyn ScanSink,
    ) -> Result<()> {
        let spec = self.spec;
        let leaf = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if !spec.accepts_archive_name(&leaf) {
            tracing::debug!(archive = %path.display(), "archive name not whitelisted");
            return Ok(());
        }
        if spec.blacklist_system_archives && is_system_archive(path) {
            tracing::debug!(archive = %path.display(), "skipping system archive");
            return Ok(());
        }

        if let Ok(metadata) = std::fs::metadata(path) {
            if let Ok(modified) = metadata.modified() {
                ctx.observe_mtime(system_time_ms(modified));
            }
        }

        let file = File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        let now_ms = system_time_ms(SystemTime::now());
        let mut warned_future_timestamp = false;

        for index in 0..archive.len() {
            self.cancel.check()?;
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(archive = %path.display(), index, error = %err, "unreadable archive entry");
                    continue;
                }
            };
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().replace('\\', "/");
            let rel = format!("/{}", name.trim_start_matches('/'));

            let entry_ms = msdos_to_epoch_ms(&entry.last_modified());
            ctx.observe_mtime(entry_ms);
            if entry_ms > now_ms && !warned_future_timestamp {
                warned_future_timestamp = true;
                tracing::warn!(
                    archive = %path.display(),
                    entry = %name,
                    "archive entry timestamp is in the future"
                );
            }

            // Prefix-filtered entries are dropped before decompression.
            if spec.classify(&rel) == PathMatch::Blacklisted {
                continue;
            }
            let dir_match = spec.classify(&parent_dir_path(&rel));

            if rel.ends_with(".class") {
                let eligible = dir_match.permits_file_scan()
                    || (dir_match == PathMatch::AtWhitelistedClassPackage
                        && spec.is_whitelisted_class_file(&rel));
                if !eligible || self.skip_descriptor(&rel) {
                    continue;
                }
                let mut bytes = Vec::with_capacity(entry.size() as usize);
                match entry.read_to_end(&mut bytes) {
                    Ok(_) => self.parse_and_emit(path, &bytes, ctx, stats, sink),
                    Err(err) => {
                        tracing::warn!(archive = %path.display(), entry = %name, error = %err, "unreadable archive entry")
                    }
                }
            } else if dir_match.permits_file_scan() && spec.matches_file(&rel[1..]) {
                let mut bytes = Vec::with_capacity(entry.size() as usize);
                match entry.read_to_end(&mut bytes) {
                    Ok(_) => {
                        stats.record_resource_matched();
                        sink.resource(path, &rel[1..], &bytes);
                    }
                    Err(err) => {
                        tracing::warn!(archive = %path.display(), entry = %name, error = %err, "unreadable archive entry")
                    }
                }
            }
        }
        Ok(())
    }

    /// A bare file on the classpath is a single-file unit: no package
    /// structure, file patterns only.
    fn walk_plain_file(
        &self,
        path: &Path,
        ctx: &mut WalkContext,
        stats: &ScanStats,
        sink: &mut dyn ScanSink,
    ) -> Result<()> {
        let metadata = std::fs::metadata(path)?;
        if let Ok(modified) = metadata.modified() {
            ctx.observe_mtime(system_time_ms(modified));
        }
        let leaf = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if self.spec.matches_file(&leaf) {
            let bytes = std::fs::read(path)?;
            stats.record_resource_matched();
            sink.resource(path, &leaf, &bytes);
        }
        Ok(())
    }

    fn parse_and_emit(
        &self,
        origin: &Path,
        bytes: &[u8],
        ctx: &mut WalkContext,
        stats: &ScanStats,
        sink: &mut dyn ScanSink,
    ) {
        match parse_classfile(bytes, self.spec.parse_options()) {
            Ok(record) => {
                if ctx.encountered.insert(record.fqn.clone()) {
                    stats.record_classfile_parsed();
                    sink.classfile(record, origin);
                } else {
                    tracing::debug!(class = %record.fqn, origin = %origin.display(), "shadowed duplicate class");
                    stats.record_class_shadowed();
                }
            }
            Err(err) if err.is_not_a_classfile() => {
                tracing::debug!(origin = %origin.display(), "file is not a classfile");
                stats.record_classfile_skipped();
            }
            Err(err) => {
                tracing::warn!(origin = %origin.display(), error = %err, "malformed classfile skipped");
                stats.record_classfile_skipped();
            }
        }
    }

    /// Module descriptors and multi-release trees are invisible unless module
    /// scanning is on; package descriptors carry no type of their own.
    fn skip_descriptor(&self, rel: &str) -> bool {
        if rel.ends_with("/package-info.class") || rel == "/package-info.class" {
            return true;
        }
        if self.spec.scan_modules {
            return false;
        }
        rel.ends_with("/module-info.class")
            || rel == "/module-info.class"
            || rel.starts_with("/META-INF/versions/")
    }
}

fn system_time_ms(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// ZIP entries carry MS-DOS local times; fold one down to epoch
/// milliseconds.
fn msdos_to_epoch_ms(datetime: &zip::DateTime) -> u64 {
    let (year, month, day) = (
        i64::from(datetime.year()),
        i64::from(datetime.month()),
        i64::from(datetime.day()),
    );
    let adjusted_year = year - i64::from(month <= 2);
    let era = adjusted_year.div_euclid(400);
    let year_of_era = adjusted_year.rem_euclid(400);
    let shifted_month = (month + 9) % 12;
    let day_of_year = (153 * shifted_month + 2) / 5 + day - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    let days_since_epoch = era * 146097 + day_of_era - 719_468;

    let seconds = days_since_epoch * 86_400
        + i64::from(datetime.hour()) * 3_600
        + i64::from(datetime.minute()) * 60
        + i64::from(datetime.second());
    if seconds < 0 {
        0
    } else {
        (seconds as u64) * 1_000
    }
}
