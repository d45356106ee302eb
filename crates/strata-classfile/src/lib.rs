#![forbid(unsafe_code)]

mod annotation;
mod classfile;
mod constant;
mod constant_pool;
mod cursor;
mod descriptor;
mod error;

pub use crate::annotation::{Annotation, ElementValue};
pub use crate::classfile::{
    parse_classfile, ClassfileRecord, FieldRecord, ParseOptions, StaticFinalConstant,
    ACC_ANNOTATION, ACC_FINAL, ACC_INTERFACE, ACC_STATIC,
};
pub use crate::constant::ConstantValue;
pub use crate::constant_pool::{ConstantPool, PoolEntry};
pub use crate::descriptor::{
    internal_to_fqn, object_descriptor_to_fqn, parse_field_descriptor, BaseType, FieldType,
};
pub use crate::error::{Error, Result};
