#![forbid(unsafe_code)]

mod cancel;
mod error;
mod filter;
mod source;
mod spec;
mod stats;
mod timestamp;
mod walker;

pub use crate::cancel::CancelToken;
pub use crate::error::{ClasspathError, Result};
pub use crate::filter::PathMatch;
pub use crate::source::{is_system_archive, Classpath, ClasspathElement, ClasspathSource};
pub use crate::spec::ScanSpec;
pub use crate::stats::ScanStats;
pub use crate::timestamp::TimestampScanner;
pub use crate::walker::{ClasspathWalker, ScanSink};
