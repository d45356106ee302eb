use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::hierarchy::{ClassNode, InterfaceNode};

/// The frozen outcome of one full scan. All tables are keyed by dotted
/// fully-qualified name; sequences are ordered by first encounter in
/// classpath order, so serializing the same classpath twice yields identical
/// bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    class_by_name: BTreeMap<String, ClassNode>,
    interface_by_name: BTreeMap<String, InterfaceNode>,
    classes_by_annotation: BTreeMap<String, Vec<String>>,
    classes_by_interface: BTreeMap<String, Vec<String>>,
    class_origins: BTreeMap<String, PathBuf>,
    last_modified_ms: u64,
}

impl ScanResult {
    pub(crate) fn from_parts(
        class_by_name: BTreeMap<String, ClassNode>,
        interface_by_name: BTreeMap<String, InterfaceNode>,
        classes_by_annotation: BTreeMap<String, Vec<String>>,
        classes_by_interface: BTreeMap<String, Vec<String>>,
        last_modified_ms: u64,
    ) -> Self {
        Self {
            class_by_name,
            interface_by_name,
            classes_by_annotation,
            classes_by_interface,
            class_origins: BTreeMap::new(),
            last_modified_ms,
        }
    }

    pub(crate) fn with_origins(mut self, class_origins: BTreeMap<String, PathBuf>) -> Self {
        self.class_origins = class_origins;
        self
    }

    pub fn class(&self, fqn: &str) -> Option<&ClassNode> {
        self.class_by_name.get(fqn)
    }

    pub fn interface(&self, fqn: &str) -> Option<&InterfaceNode> {
        self.interface_by_name.get(fqn)
    }

    /// Every class node, placeholders included, in name order.
    pub fn all_classes(&self) -> impl Iterator<Item = &ClassNode> + '_ {
        self.class_by_name.values()
    }

    pub fn all_interfaces(&self) -> impl Iterator<Item = &InterfaceNode> + '_ {
        self.interface_by_name.values()
    }

    /// Names of all transitive subclasses of `fqn`, empty when unknown.
    pub fn subclasses_of(&self, fqn: &str) -> Vec<&str> {
        self.class(fqn)
            .map(|node| node.all_subclasses.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Classes implementing `fqn` directly, through a super-interface, or
    /// through a superclass.
    pub fn classes_implementing(&self, fqn: &str) -> &[String] {
        self.classes_by_interface
            .get(fqn)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn classes_with_annotation(&self, fqn: &str) -> &[String] {
        self.classes_by_annotation
            .get(fqn)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The file (or enclosing archive) whose bytes defined `fqn`. Absent for
    /// placeholders and for types parsed by a caller-driven builder.
    pub fn origin_of(&self, fqn: &str) -> Option<&Path> {
        self.class_origins.get(fqn).map(PathBuf::as_path)
    }

    /// Maximum modification time observed during the scan, epoch
    /// milliseconds; 0 for an empty classpath.
    pub fn last_modified_ms(&self) -> u64 {
        self.last_modified_ms
    }
}
