use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;

use strata_classfile::{ClassfileRecord, ConstantValue};
use strata_classpath::{
    CancelToken, Classpath, ClasspathError, ClasspathWalker, ScanSink, ScanSpec, ScanStats,
    TimestampScanner,
};

use crate::error::ScanError;
use crate::hierarchy::HierarchyBuilder;
use crate::result::ScanResult;
use crate::subscription::Subscription;

/// Owns the scan configuration, the classpath, and the registered match
/// subscriptions. One scanner instance holds at most one resolved graph at a
/// time; a new full scan rebuilds it from scratch.
pub struct Scanner {
    spec: ScanSpec,
    classpath: Classpath,
    subscriptions: Vec<Subscription>,
    cancel: CancelToken,
    stats: ScanStats,
    last_scan_mtime: Option<u64>,
}

impl Scanner {
    pub fn new(spec: ScanSpec, classpath: Classpath) -> Self {
        Self {
            spec,
            classpath,
            subscriptions: Vec::new(),
            cancel: CancelToken::new(),
            stats: ScanStats::default(),
            last_scan_mtime: None,
        }
    }

    /// A handle the caller can trip from another thread to abort the scan.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Report every transitive subclass of `superclass` once the scan
    /// resolves. Passing an interface name here fails the scan.
    pub fn match_subclasses_of(
        &mut self,
        superclass: &str,
        handler: impl FnMut(&str) + 'static,
    ) -> &mut Self {
        self.subscriptions.push(Subscription::SubclassesOf {
            superclass: superclass.to_string(),
            handler: Box::new(handler),
        });
        self
    }

    /// Report every class implementing `interface`, directly or through
    /// super-interfaces or superclasses.
    pub fn match_classes_implementing(
        &mut self,
        interface: &str,
        handler: impl FnMut(&str) + 'static,
    ) -> &mut Self {
        self.subscriptions.push(Subscription::ClassesImplementing {
            interface: interface.to_string(),
            handler: Box::new(handler),
        });
        self
    }

    pub fn match_classes_with_annotation(
        &mut self,
        annotation: &str,
        handler: impl FnMut(&str) + 'static,
    ) -> &mut Self {
        self.subscriptions.push(Subscription::ClassesWithAnnotation {
            annotation: annotation.to_string(),
            handler: Box::new(handler),
        });
        self
    }

    /// Report the compile-time constant of a static final field, delivered
    /// while the declaring classfile is being parsed. Registering any
    /// constant subscription turns on constant extraction for the scan.
    pub fn match_static_final_constant(
        &mut self,
        class: &str,
        field: &str,
        handler: impl FnMut(&str, &str, &ConstantValue) + 'static,
    ) -> &mut Self {
        self.subscriptions.push(Subscription::StaticFinalConstant {
            class: class.to_string(),
            field: field.to_string(),
            handler: Box::new(handler),
        });
        self
    }

    /// Report non-class resources whose relative path matches `pattern`,
    /// delivered during traversal; the byte slice is only valid inside the
    /// callback.
    pub fn match_file_pattern(
        &mut self,
        pattern: &str,
        handler: impl FnMut(&Path, &str, &[u8]) + 'static,
    ) -> Result<&mut Self, ScanError> {
        let regex = Regex::new(pattern).map_err(|err| {
            ScanError::Configuration(format!("invalid file pattern {pattern:?}: {err}"))
        })?;
        self.subscriptions.push(Subscription::FilePattern {
            pattern: pattern.to_string(),
            regex,
            handler: Box::new(handler),
        });
        Ok(self)
    }

    /// Run a full scan: walk the classpath, resolve the hierarchy, dispatch
    /// subscriptions, and return the frozen result.
    pub fn scan(&mut self) -> Result<ScanResult, ScanError> {
        let spec = self.effective_spec()?;
        let mut sink = EngineSink {
            builder: HierarchyBuilder::new(),
            origins: BTreeMap::new(),
            subscriptions: &mut self.subscriptions,
            cancel: self.cancel.clone(),
            error: None,
        };
        let walker = ClasspathWalker::with_cancel(&spec, self.cancel.clone());
        let walked = walker.walk(self.classpath.elements(), &self.stats, &mut sink);

        let EngineSink {
            builder,
            origins,
            error,
            ..
        } = sink;
        let last_modified = match walked {
            Ok(ms) => ms,
            // A structural error inside the sink trips the cancel token; the
            // stored error is the real cause.
            Err(ClasspathError::Cancelled) => {
                return Err(error.unwrap_or(ScanError::Classpath(ClasspathError::Cancelled)));
            }
            Err(err) => return Err(err.into()),
        };
        if let Some(err) = error {
            return Err(err);
        }

        let result = builder.finalize(last_modified).with_origins(origins);
        tracing::debug!(
            classes = result.all_classes().count(),
            interfaces = result.all_interfaces().count(),
            last_modified_ms = last_modified,
            "classpath scan resolved"
        );
        dispatch_resolved(&mut self.subscriptions, &result)?;
        self.last_scan_mtime = Some(last_modified);
        Ok(result)
    }

    /// The change-detection fast path: re-reads only modification times
    /// under the same filter as a full scan. True when anything moved, or
    /// when no full scan has run yet.
    pub fn is_classpath_modified_since_last_scan(&self) -> Result<bool, ScanError> {
        let Some(previous) = self.last_scan_mtime else {
            return Ok(true);
        };
        let scanner = TimestampScanner::with_cancel(&self.spec, self.cancel.clone());
        let max = scanner.scan(self.classpath.elements())?;
        Ok(max > previous)
    }

    /// The spec the walker actually runs with: the caller's spec plus
    /// whatever the subscriptions imply.
    fn effective_spec(&self) -> Result<ScanSpec, ScanError> {
        let mut spec = self.spec.clone();
        if self
            .subscriptions
            .iter()
            .any(|s| matches!(s, Subscription::StaticFinalConstant { .. }))
        {
            spec = spec.enable_static_final_constants();
        }
        for subscription in &self.subscriptions {
            if let Subscription::FilePattern { pattern, .. } = subscription {
                spec = spec.file_pattern(pattern)?;
            }
        }
        Ok(spec)
    }
}

/// Bridges the walker to the hierarchy builder and the traversal-time
/// subscriptions.
struct EngineSink<'a> {
    builder: HierarchyBuilder,
    origins: BTreeMap<String, PathBuf>,
    subscriptions: &'a mut Vec<Subscription>,
    cancel: CancelToken,
    error: Option<ScanError>,
}

impl ScanSink for EngineSink<'_> {
    fn classfile(&mut self, record: ClassfileRecord, origin: &Path) {
        if self.error.is_some() {
            return;
        }
        self.origins
            .insert(record.fqn.clone(), origin.to_path_buf());
        for subscription in self.subscriptions.iter_mut() {
            if let Subscription::StaticFinalConstant {
                class,
                field,
                handler,
            } = subscription
            {
                if *class != record.fqn {
                    continue;
                }
                if let Some(constant) = record
                    .static_final_constants
                    .iter()
                    .find(|c| c.field_name == *field)
                {
                    handler(&record.fqn, &constant.field_name, &constant.value);
                }
            }
        }
        if let Err(err) = self.builder.add_record(&record) {
            self.error = Some(err);
            self.cancel.cancel();
        }
    }

    fn resource(&mut self, absolute_path: &Path, relative_path: &str, bytes: &[u8]) {
        for subscription in self.subscriptions.iter_mut() {
            if let Subscription::FilePattern { regex, handler, .. } = subscription {
                if regex.is_match(relative_path) {
                    handler(absolute_path, relative_path, bytes);
                }
            }
        }
    }
}

/// The single post-resolution dispatch site. The configuration check runs
/// before any callback fires.
fn dispatch_resolved(
    subscriptions: &mut [Subscription],
    result: &ScanResult,
) -> Result<(), ScanError> {
    for subscription in subscriptions.iter() {
        if let Subscription::SubclassesOf { superclass, .. } = subscription {
            if result.interface(superclass).is_some() {
                return Err(ScanError::Configuration(format!(
                    "{superclass} is an interface; subclass matching applies to classes"
                )));
            }
        }
    }

    for subscription in subscriptions.iter_mut() {
        match subscription {
            Subscription::SubclassesOf {
                superclass,
                handler,
            } => {
                if let Some(node) = result.class(superclass) {
                    for name in &node.all_subclasses {
                        handler(name);
                    }
                }
            }
            Subscription::ClassesImplementing { interface, handler } => {
                for name in result.classes_implementing(interface) {
                    handler(name);
                }
            }
            Subscription::ClassesWithAnnotation {
                annotation,
                handler,
            } => {
                for name in result.classes_with_annotation(annotation) {
                    handler(name);
                }
            }
            // Delivered during traversal.
            Subscription::StaticFinalConstant { .. } | Subscription::FilePattern { .. } => {}
        }
    }
    Ok(())
}
