use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClasspathError>;

#[derive(Debug, Error)]
pub enum ClasspathError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("classfile error: {0}")]
    Classfile(#[from] strata_classfile::Error),
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },
    #[error("scan cancelled")]
    Cancelled,
}
