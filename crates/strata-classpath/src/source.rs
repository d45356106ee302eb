use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const ARCHIVE_EXTENSIONS: [&str; 4] = ["jar", "zip", "war", "ear"];

const SYSTEM_ARCHIVE_NAMES: [&str; 5] =
    ["rt.jar", "jce.jar", "jsse.jar", "charsets.jar", "jfr.jar"];

/// One ordered element of the classpath. Order is significant: the first
/// element defining a class shadows every later definition of the same name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClasspathElement {
    Dir(PathBuf),
    Archive(PathBuf),
    File(PathBuf),
}

impl ClasspathElement {
    pub fn path(&self) -> &Path {
        match self {
            ClasspathElement::Dir(p) | ClasspathElement::Archive(p) | ClasspathElement::File(p) => {
                p
            }
        }
    }

    fn for_path(path: PathBuf) -> Option<Self> {
        let metadata = std::fs::metadata(&path).ok()?;
        if metadata.is_dir() {
            Some(ClasspathElement::Dir(path))
        } else if has_archive_extension(&path) {
            Some(ClasspathElement::Archive(path))
        } else {
            Some(ClasspathElement::File(path))
        }
    }
}

fn has_archive_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            ARCHIVE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// True for the classic JRE runtime jars and anything under a `jre/lib` tree.
/// Anything subtler belongs to the host-runtime adapter producing the paths.
pub fn is_system_archive(path: &Path) -> bool {
    let leaf = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if SYSTEM_ARCHIVE_NAMES
        .iter()
        .any(|known| leaf.eq_ignore_ascii_case(known))
    {
        return true;
    }
    let normalized = path.to_string_lossy().replace('\\', "/");
    normalized.contains("/jre/lib/")
}

/// Adapter seam for host runtimes that know where their classpath comes
/// from. Implementations return candidate paths in priority order; the core
/// dedups and classifies them.
pub trait ClasspathSource {
    fn classpath(&self) -> Vec<PathBuf>;
}

/// An ordered, de-duplicated sequence of classpath elements. Duplicate path
/// strings keep their first occurrence; paths that do not exist are dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classpath {
    elements: Vec<ClasspathElement>,
}

impl Classpath {
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut seen: HashSet<String> = HashSet::new();
        let mut elements = Vec::new();
        for path in paths {
            let path: PathBuf = path.into();
            if !seen.insert(path.to_string_lossy().to_string()) {
                continue;
            }
            match ClasspathElement::for_path(path.clone()) {
                Some(element) => elements.push(element),
                None => {
                    tracing::debug!(path = %path.display(), "dropping missing classpath element")
                }
            }
        }
        Self { elements }
    }

    /// Split a platform classpath string (`:` on Unix, `;` on Windows).
    pub fn from_joined(joined: &str) -> Self {
        let separator = if cfg!(windows) { ';' } else { ':' };
        Self::from_paths(
            joined
                .split(separator)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        )
    }

    pub fn from_source(source: &dyn ClasspathSource) -> Self {
        Self::from_paths(source.classpath())
    }

    pub fn elements(&self) -> &[ClasspathElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
