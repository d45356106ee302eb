use std::collections::BTreeSet;

use regex::Regex;

use strata_classfile::ParseOptions;

use crate::error::ClasspathError;
use crate::filter::parent_dir_path;

/// An archive leaf-name glob compiled to an anchored regex. `*` matches any
/// run of characters; every other character, `.` included, is literal.
#[derive(Clone, Debug)]
pub(crate) struct NamePattern(Regex);

impl NamePattern {
    fn from_glob(glob: &str) -> Result<Self, ClasspathError> {
        let mut pattern = String::with_capacity(glob.len() + 8);
        pattern.push('^');
        for ch in glob.chars() {
            if ch == '*' {
                pattern.push_str(".*");
            } else {
                let mut buf = [0u8; 4];
                pattern.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
            }
        }
        pattern.push('$');
        let regex = Regex::new(&pattern).map_err(|source| ClasspathError::Pattern {
            pattern: glob.to_string(),
            source,
        })?;
        Ok(Self(regex))
    }

    fn matches(&self, leaf: &str) -> bool {
        self.0.is_match(leaf)
    }
}

/// Immutable description of what a scan should look at.
///
/// Package prefixes are stored slash-normalized with a leading and trailing
/// `/` and kept sorted so that nested prefixes resolve the same way on every
/// run. An empty whitelist means "everything not blacklisted".
#[derive(Clone, Debug)]
pub struct ScanSpec {
    pub(crate) whitelist_packages: Vec<String>,
    pub(crate) blacklist_packages: Vec<String>,
    pub(crate) whitelist_classes: BTreeSet<String>,
    pub(crate) blacklist_classes: BTreeSet<String>,
    pub(crate) whitelist_class_parents: BTreeSet<String>,
    pub(crate) whitelist_archives: Vec<NamePattern>,
    pub(crate) blacklist_archives: Vec<NamePattern>,
    pub(crate) file_patterns: Vec<Regex>,
    pub(crate) scan_directories: bool,
    pub(crate) scan_archives: bool,
    pub(crate) scan_modules: bool,
    pub(crate) blacklist_system_archives: bool,
    pub(crate) field_info: bool,
    pub(crate) static_final_constants: bool,
    pub(crate) annotation_info: bool,
}

impl Default for ScanSpec {
    fn default() -> Self {
        Self {
            whitelist_packages: Vec::new(),
            blacklist_packages: Vec::new(),
            whitelist_classes: BTreeSet::new(),
            blacklist_classes: BTreeSet::new(),
            whitelist_class_parents: BTreeSet::new(),
            whitelist_archives: Vec::new(),
            blacklist_archives: Vec::new(),
            file_patterns: Vec::new(),
            scan_directories: true,
            scan_archives: true,
            scan_modules: false,
            blacklist_system_archives: true,
            field_info: false,
            static_final_constants: false,
            annotation_info: false,
        }
    }
}

impl ScanSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the scan to a package and everything below it. Accepts dotted
    /// (`com.example`) or slashed (`com/example`) form.
    pub fn whitelist_package(mut self, package: &str) -> Self {
        insert_sorted(&mut self.whitelist_packages, normalize_package(package));
        self
    }

    /// Exclude a package and everything below it. Blacklisting wins over
    /// whitelisting at every level.
    pub fn blacklist_package(mut self, package: &str) -> Self {
        insert_sorted(&mut self.blacklist_packages, normalize_package(package));
        self
    }

    /// Whitelist one specific class, scanned even when its package is not
    /// whitelisted.
    pub fn whitelist_class(mut self, class: &str) -> Self {
        let path = normalize_class_path(class);
        self.whitelist_class_parents.insert(parent_dir_path(&path));
        self.whitelist_classes.insert(path);
        self
    }

    pub fn blacklist_class(mut self, class: &str) -> Self {
        self.blacklist_classes.insert(normalize_class_path(class));
        self
    }

    /// Only scan archives whose leaf name matches the glob (e.g.
    /// `spring-*.jar`).
    pub fn whitelist_archive(mut self, glob: &str) -> Result<Self, ClasspathError> {
        self.whitelist_archives.push(NamePattern::from_glob(glob)?);
        Ok(self)
    }

    pub fn blacklist_archive(mut self, glob: &str) -> Result<Self, ClasspathError> {
        self.blacklist_archives.push(NamePattern::from_glob(glob)?);
        Ok(self)
    }

    /// Register a regex matched against the relative path of every non-class
    /// file inside whitelisted paths.
    pub fn file_pattern(mut self, pattern: &str) -> Result<Self, ClasspathError> {
        let regex = Regex::new(pattern).map_err(|source| ClasspathError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        self.file_patterns.push(regex);
        Ok(self)
    }

    pub fn scan_directories(mut self, enabled: bool) -> Self {
        self.scan_directories = enabled;
        self
    }

    pub fn scan_archives(mut self, enabled: bool) -> Self {
        self.scan_archives = enabled;
        self
    }

    /// When enabled, `module-info.class` descriptors and multi-release
    /// `META-INF/versions` trees are scanned like ordinary class files.
    pub fn scan_modules(mut self, enabled: bool) -> Self {
        self.scan_modules = enabled;
        self
    }

    pub fn blacklist_system_archives(mut self, enabled: bool) -> Self {
        self.blacklist_system_archives = enabled;
        self
    }

    pub fn enable_field_info(mut self) -> Self {
        self.field_info = true;
        self
    }

    pub fn enable_static_final_constants(mut self) -> Self {
        self.static_final_constants = true;
        self
    }

    pub fn enable_annotation_info(mut self) -> Self {
        self.annotation_info = true;
        self
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            field_info: self.field_info,
            static_final_constants: self.static_final_constants,
            annotation_info: self.annotation_info,
        }
    }

    pub fn matches_file(&self, relative_path: &str) -> bool {
        self.file_patterns.iter().any(|r| r.is_match(relative_path))
    }

    pub fn accepts_archive_name(&self, leaf: &str) -> bool {
        if self.blacklist_archives.iter().any(|p| p.matches(leaf)) {
            return false;
        }
        self.whitelist_archives.is_empty() || self.whitelist_archives.iter().any(|p| p.matches(leaf))
    }

    pub fn is_whitelisted_class_file(&self, relative_path: &str) -> bool {
        self.whitelist_classes.contains(relative_path)
    }
}

fn insert_sorted(list: &mut Vec<String>, value: String) {
    if let Err(position) = list.binary_search(&value) {
        list.insert(position, value);
    }
}

fn normalize_package(package: &str) -> String {
    let slashed = package.replace('.', "/");
    let trimmed = slashed.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

fn normalize_class_path(class: &str) -> String {
    let stripped = class.strip_suffix(".class").unwrap_or(class);
    let slashed = stripped.replace('.', "/");
    format!("/{}.class", slashed.trim_matches('/'))
}
