use thiserror::Error;

use strata_classpath::ClasspathError;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Classpath(#[from] ClasspathError),
    #[error("invalid scan configuration: {0}")]
    Configuration(String),
    #[error("class {class} cannot have both {existing} and {proposed} as its direct superclass")]
    SuperclassConflict {
        class: String,
        existing: String,
        proposed: String,
    },
}

impl ScanError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Classpath(ClasspathError::Cancelled))
    }
}
