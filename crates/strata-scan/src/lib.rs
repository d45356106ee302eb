//! Reflection-free classpath scanning.
//!
//! A [`Scanner`] walks an ordered classpath, parses raw `.class` binaries,
//! and assembles a queryable graph of classes, interfaces, and annotations
//! without loading anything into a JVM. Match subscriptions fire either
//! during traversal (static-final constants, file patterns) or once the
//! hierarchy has been resolved (subclasses, implementations, annotations).

#![forbid(unsafe_code)]

mod error;
mod hierarchy;
mod result;
mod scanner;
mod subscription;

pub use crate::error::ScanError;
pub use crate::hierarchy::{ClassNode, FieldSummary, HierarchyBuilder, InterfaceNode};
pub use crate::result::ScanResult;
pub use crate::scanner::Scanner;
pub use crate::subscription::{ClassMatchHandler, ConstantMatchHandler, FileMatchHandler};

pub use strata_classfile::{ClassfileRecord, ConstantValue};
pub use strata_classpath::{
    CancelToken, Classpath, ClasspathElement, ClasspathError, ClasspathSource, ScanSpec, ScanStats,
};
