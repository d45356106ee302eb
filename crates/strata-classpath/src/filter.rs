use crate::spec::ScanSpec;

/// How one relative path inside a classpath element relates to the
/// whitelist/blacklist configuration.
///
/// Paths are slash-separated, start with `/`, and directories end with `/`
/// (the default package is exactly `/`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathMatch {
    /// A blacklist prefix covers the path. Blacklisting wins at every level.
    Blacklisted,
    /// The package of a specifically whitelisted class; only those classes
    /// are scanned here.
    AtWhitelistedClassPackage,
    /// The path is itself a whitelisted prefix.
    AtWhitelist,
    /// A strict ancestor of some whitelisted prefix; traversal descends but
    /// files here are not scanned.
    AncestorOfWhitelist,
    /// Below a whitelisted prefix.
    WithinWhitelist,
    NotWithinWhitelist,
}

impl PathMatch {
    pub fn permits_descent(self) -> bool {
        matches!(
            self,
            PathMatch::AncestorOfWhitelist
                | PathMatch::AtWhitelist
                | PathMatch::WithinWhitelist
                | PathMatch::AtWhitelistedClassPackage
        )
    }

    pub fn permits_file_scan(self) -> bool {
        matches!(self, PathMatch::AtWhitelist | PathMatch::WithinWhitelist)
    }
}

impl ScanSpec {
    /// Classify a relative path. First match wins, in this order: blacklist,
    /// whitelisted-class package, exact whitelist, ancestor, prefix.
    pub fn classify(&self, relative_path: &str) -> PathMatch {
        let path = relative_path;

        if self.blacklist_packages.iter().any(|p| path.starts_with(p.as_str())) {
            return PathMatch::Blacklisted;
        }
        if self.blacklist_classes.contains(path) {
            return PathMatch::Blacklisted;
        }
        if self.whitelist_class_parents.contains(path) {
            return PathMatch::AtWhitelistedClassPackage;
        }
        if self.at_whitelist(path) {
            return PathMatch::AtWhitelist;
        }
        if path == "/" || self.ancestor_of_whitelist(path) {
            return PathMatch::AncestorOfWhitelist;
        }
        if self.within_whitelist(path) {
            return PathMatch::WithinWhitelist;
        }
        PathMatch::NotWithinWhitelist
    }

    // No whitelist at all means "scan everything not blacklisted".
    // Whitelisting a specific class is still a whitelist.
    fn implicit_root(&self) -> bool {
        self.whitelist_packages.is_empty() && self.whitelist_class_parents.is_empty()
    }

    fn at_whitelist(&self, path: &str) -> bool {
        if self.implicit_root() {
            return path == "/";
        }
        self.whitelist_packages
            .binary_search_by(|p| p.as_str().cmp(path))
            .is_ok()
    }

    fn ancestor_of_whitelist(&self, path: &str) -> bool {
        // Packages holding specifically whitelisted classes count as
        // whitelisted prefixes here, or the walker could never reach them.
        self.whitelist_packages
            .iter()
            .chain(self.whitelist_class_parents.iter())
            .any(|p| p.len() > path.len() && p.starts_with(path))
    }

    fn within_whitelist(&self, path: &str) -> bool {
        if self.implicit_root() {
            return true;
        }
        self.whitelist_packages
            .iter()
            .any(|p| path.starts_with(p.as_str()))
    }
}

/// Build the slash-separated filter path (`/a/b/` or `/a/b/C.class`) for an
/// entry below `root`, normalizing host separators.
pub(crate) fn relative_filter_path(
    root: &std::path::Path,
    path: &std::path::Path,
    is_dir: bool,
) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut out = String::from("/");
    let mut first = true;
    for component in rel.components() {
        if !first {
            out.push('/');
        }
        out.push_str(&component.as_os_str().to_string_lossy());
        first = false;
    }
    if is_dir && !out.ends_with('/') {
        out.push('/');
    }
    Some(out)
}

/// The enclosing directory of a filter path, `/` for top-level entries.
pub(crate) fn parent_dir_path(path: &str) -> String {
    match path.trim_end_matches('/').rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => path[..=index].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn six_states_resolve_in_order() {
        let spec = ScanSpec::new()
            .whitelist_package("com.x")
            .blacklist_package("com.x.internal");

        assert_eq!(spec.classify("/"), PathMatch::AncestorOfWhitelist);
        assert_eq!(spec.classify("/com/"), PathMatch::AncestorOfWhitelist);
        assert_eq!(spec.classify("/com/x/"), PathMatch::AtWhitelist);
        assert_eq!(spec.classify("/com/x/deep/"), PathMatch::WithinWhitelist);
        assert_eq!(spec.classify("/com/x/Y.class"), PathMatch::WithinWhitelist);
        assert_eq!(
            spec.classify("/com/x/internal/"),
            PathMatch::Blacklisted
        );
        assert_eq!(
            spec.classify("/com/x/internal/Z.class"),
            PathMatch::Blacklisted
        );
        assert_eq!(spec.classify("/org/"), PathMatch::NotWithinWhitelist);
    }

    #[test]
    fn empty_whitelist_means_scan_everything() {
        let spec = ScanSpec::new();
        assert_eq!(spec.classify("/"), PathMatch::AtWhitelist);
        assert_eq!(spec.classify("/anything/"), PathMatch::WithinWhitelist);
        assert_eq!(spec.classify("/a/b/C.class"), PathMatch::WithinWhitelist);
    }

    #[test]
    fn blacklist_wins_over_whitelist() {
        let spec = ScanSpec::new()
            .whitelist_package("com.x")
            .blacklist_package("com.x");
        assert_eq!(spec.classify("/com/x/"), PathMatch::Blacklisted);
    }

    #[test]
    fn whitelisted_class_package_and_reachability() {
        let spec = ScanSpec::new().whitelist_class("com.solo.Only");
        assert_eq!(
            spec.classify("/com/solo/"),
            PathMatch::AtWhitelistedClassPackage
        );
        // Ancestors of the class package still permit descent.
        assert!(spec.classify("/com/").permits_descent());
        assert!(spec.classify("/").permits_descent());
        assert!(!spec.classify("/com/solo/").permits_file_scan());
        assert!(spec.is_whitelisted_class_file("/com/solo/Only.class"));
        assert!(!spec.is_whitelisted_class_file("/com/solo/Other.class"));
    }

    #[test]
    fn blacklisted_class_is_excluded_exactly() {
        let spec = ScanSpec::new().blacklist_class("com.x.Hidden");
        assert_eq!(
            spec.classify("/com/x/Hidden.class"),
            PathMatch::Blacklisted
        );
        assert_eq!(
            spec.classify("/com/x/Visible.class"),
            PathMatch::WithinWhitelist
        );
    }

    #[test]
    fn nested_prefixes_resolve_deterministically() {
        let spec = ScanSpec::new()
            .whitelist_package("com.a.b")
            .whitelist_package("com.a");
        assert_eq!(spec.classify("/com/a/"), PathMatch::AtWhitelist);
        assert_eq!(spec.classify("/com/a/b/"), PathMatch::AtWhitelist);
        assert_eq!(spec.classify("/com/a/c/"), PathMatch::WithinWhitelist);
    }

    #[test]
    fn parent_paths() {
        assert_eq!(parent_dir_path("/com/x/Y.class"), "/com/x/");
        assert_eq!(parent_dir_path("/Y.class"), "/");
        assert_eq!(parent_dir_path("/com/x/"), "/com/");
        assert_eq!(parent_dir_path("/com/"), "/");
    }
}
