use std::collections::BTreeSet;

use crate::annotation::Annotation;
use crate::constant::ConstantValue;
use crate::constant_pool::ConstantPool;
use crate::cursor::ByteCursor;
use crate::descriptor::{internal_to_fqn, parse_field_descriptor, FieldType};
use crate::error::{Error, Result};

pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ANNOTATION: u16 = 0x2000;

const ACC_STATIC_FINAL: u16 = ACC_STATIC | ACC_FINAL;

/// Knobs that bound how deep the parser reads into each class file.
///
/// Everything needed for the type graph (names, superclass, interfaces,
/// annotation types) is always extracted; these flags only widen the output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub field_info: bool,
    pub static_final_constants: bool,
    pub annotation_info: bool,
}

/// Everything the scanner keeps from one parsed class file.
#[derive(Clone, Debug)]
pub struct ClassfileRecord {
    pub fqn: String,
    pub is_interface: bool,
    pub is_annotation: bool,
    pub superclass_fqn: Option<String>,
    /// Declared interfaces in source order, duplicates preserved.
    pub interface_fqns: Vec<String>,
    /// Types of the runtime-visible class annotations.
    pub annotation_fqns: BTreeSet<String>,
    /// Full annotations with element values; empty unless
    /// [`ParseOptions::annotation_info`] is set.
    pub annotations: Vec<Annotation>,
    pub static_final_constants: Vec<StaticFinalConstant>,
    /// Per-field records; empty unless [`ParseOptions::field_info`] is set.
    pub fields: Vec<FieldRecord>,
}

#[derive(Clone, Debug)]
pub struct StaticFinalConstant {
    pub field_name: String,
    pub descriptor: String,
    pub value: ConstantValue,
}

#[derive(Clone, Debug)]
pub struct FieldRecord {
    pub name: String,
    pub descriptor: String,
    pub field_type: FieldType,
    pub access_flags: u16,
}

/// Parse a single class file held in memory.
///
/// Fails with [`Error::NotAClassfile`] when the input is not a class file at
/// all; any other error means the file claimed to be a class file but its
/// structure was inconsistent.
pub fn parse_classfile(bytes: &[u8], options: ParseOptions) -> Result<ClassfileRecord> {
    let mut cursor = ByteCursor::new(bytes);
    let magic = cursor.u32()?;
    if magic != 0xCAFEBABE {
        return Err(Error::NotAClassfile { magic });
    }

    let _minor_version = cursor.u16()?;
    let _major_version = cursor.u16()?;
    let pool = ConstantPool::parse(&mut cursor)?;

    let access_flags = cursor.u16()?;
    let fqn = internal_to_fqn(pool.class_internal_name(cursor.u16()?)?);

    let super_index = cursor.u16()?;
    let superclass_fqn = if super_index == 0 {
        None
    } else {
        Some(internal_to_fqn(pool.class_internal_name(super_index)?))
    };

    let interfaces_count = cursor.u16()? as usize;
    let mut interface_fqns = Vec::with_capacity(interfaces_count);
    for _ in 0..interfaces_count {
        interface_fqns.push(internal_to_fqn(pool.class_internal_name(cursor.u16()?)?));
    }

    let mut static_final_constants = Vec::new();
    let mut fields = Vec::new();
    let fields_count = cursor.u16()? as usize;
    for _ in 0..fields_count {
        parse_field(
            &mut cursor,
            &pool,
            options,
            &mut static_final_constants,
            &mut fields,
        )?;
    }

    // Methods carry nothing the type graph needs; walk them by length only.
    let methods_count = cursor.u16()? as usize;
    for _ in 0..methods_count {
        cursor.take(6)?; // access_flags, name_index, descriptor_index
        let attributes_count = cursor.u16()? as usize;
        for _ in 0..attributes_count {
            cursor.take(2)?;
            let length = cursor.u32()? as usize;
            cursor.take(length)?;
        }
    }

    let mut annotations = Vec::new();
    let attributes_count = cursor.u16()? as usize;
    for _ in 0..attributes_count {
        let name_index = cursor.u16()?;
        let length = cursor.u32()? as usize;
        let info = cursor.take(length)?;
        if pool.utf8(name_index)? == "RuntimeVisibleAnnotations" {
            let mut sub = ByteCursor::new(info);
            let count = sub.u16()? as usize;
            for _ in 0..count {
                annotations.push(Annotation::parse(&mut sub, &pool)?);
            }
            if !sub.is_empty() {
                return Err(Error::Layout(
                    "annotation attribute is longer than its annotations",
                ));
            }
        }
    }
    if !cursor.is_empty() {
        return Err(Error::Layout("trailing bytes after the class attributes"));
    }

    let annotation_fqns = annotations.iter().map(|a| a.type_fqn.clone()).collect();
    if !options.annotation_info {
        annotations.clear();
    }

    Ok(ClassfileRecord {
        fqn,
        is_interface: access_flags & ACC_INTERFACE != 0,
        is_annotation: access_flags & ACC_ANNOTATION != 0,
        superclass_fqn,
        interface_fqns,
        annotation_fqns,
        annotations,
        static_final_constants,
        fields,
    })
}

fn parse_field(
    cursor: &mut ByteCursor<'_>,
    pool: &ConstantPool,
    options: ParseOptions,
    constants: &mut Vec<StaticFinalConstant>,
    fields: &mut Vec<FieldRecord>,
) -> Result<()> {
    let access_flags = cursor.u16()?;
    let name = pool.utf8(cursor.u16()?)?.to_string();
    let descriptor = pool.utf8(cursor.u16()?)?.to_string();
    let is_static_final = access_flags & ACC_STATIC_FINAL == ACC_STATIC_FINAL;

    let attributes_count = cursor.u16()? as usize;
    for _ in 0..attributes_count {
        let name_index = cursor.u16()?;
        let length = cursor.u32()? as usize;
        let info = cursor.take(length)?;
        if options.static_final_constants
            && is_static_final
            && pool.utf8(name_index)? == "ConstantValue"
        {
            let mut sub = ByteCursor::new(info);
            let value_index = sub.u16()?;
            if !sub.is_empty() {
                return Err(Error::Layout("oversized ConstantValue attribute"));
            }
            if let Some(value) = coerce_constant(pool, value_index, &descriptor)? {
                constants.push(StaticFinalConstant {
                    field_name: name.clone(),
                    descriptor: descriptor.clone(),
                    value,
                });
            }
        }
    }

    if options.field_info {
        let field_type = parse_field_descriptor(&descriptor)?;
        fields.push(FieldRecord {
            name,
            descriptor,
            field_type,
            access_flags,
        });
    }
    Ok(())
}

/// Narrow a ConstantValue pool entry to the field's declared type.
///
/// Returns `None` for descriptors that cannot carry a compile-time constant.
fn coerce_constant(
    pool: &ConstantPool,
    index: u16,
    descriptor: &str,
) -> Result<Option<ConstantValue>> {
    let value = match descriptor {
        "B" => ConstantValue::Byte(pool.integer(index)? as i8),
        "C" => {
            let code = pool.integer(index)?;
            let ch = char::from_u32(code as u32)
                .ok_or(Error::BadCharConstant { value: code })?;
            ConstantValue::Char(ch)
        }
        "S" => ConstantValue::Short(pool.integer(index)? as i16),
        "Z" => ConstantValue::Boolean(pool.integer(index)? != 0),
        "I" => ConstantValue::Int(pool.integer(index)?),
        "J" => ConstantValue::Long(pool.long(index)?),
        "F" => ConstantValue::Float(pool.float(index)?),
        "D" => ConstantValue::Double(pool.double(index)?),
        "Ljava/lang/String;" => ConstantValue::Str(pool.string_constant(index)?.to_string()),
        _ => return Ok(None),
    };
    Ok(Some(value))
}
