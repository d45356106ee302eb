use std::path::Path;

use regex::Regex;

use strata_classfile::ConstantValue;

pub type ClassMatchHandler = Box<dyn FnMut(&str)>;
pub type ConstantMatchHandler = Box<dyn FnMut(&str, &str, &ConstantValue)>;
pub type FileMatchHandler = Box<dyn FnMut(&Path, &str, &[u8])>;

/// One registered match subscription. The first three kinds fire after the
/// hierarchy is resolved; constants and file patterns fire during traversal,
/// where the bytes are the source of truth.
pub(crate) enum Subscription {
    SubclassesOf {
        superclass: String,
        handler: ClassMatchHandler,
    },
    ClassesImplementing {
        interface: String,
        handler: ClassMatchHandler,
    },
    ClassesWithAnnotation {
        annotation: String,
        handler: ClassMatchHandler,
    },
    StaticFinalConstant {
        class: String,
        field: String,
        handler: ConstantMatchHandler,
    },
    FilePattern {
        pattern: String,
        regex: Regex,
        handler: FileMatchHandler,
    },
}
