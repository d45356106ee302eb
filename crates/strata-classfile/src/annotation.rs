use crate::constant::ConstantValue;
use crate::constant_pool::ConstantPool;
use crate::cursor::ByteCursor;
use crate::descriptor::{internal_to_fqn, object_descriptor_to_fqn};
use crate::error::{Error, Result};

/// A runtime-visible annotation on a class.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub type_fqn: String,
    pub elements: Vec<(String, ElementValue)>,
}

impl Annotation {
    pub(crate) fn parse(cursor: &mut ByteCursor<'_>, pool: &ConstantPool) -> Result<Self> {
        let type_index = cursor.u16()?;
        let descriptor = pool.utf8(type_index)?;
        let type_fqn = object_descriptor_to_fqn(descriptor)
            .ok_or_else(|| Error::BadDescriptor(descriptor.to_string()))?;

        let pair_count = cursor.u16()? as usize;
        let mut elements = Vec::with_capacity(pair_count);
        for _ in 0..pair_count {
            let name = pool.utf8(cursor.u16()?)?.to_string();
            let value = ElementValue::parse(cursor, pool)?;
            elements.push((name, value));
        }

        Ok(Self { type_fqn, elements })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementValue {
    Const(ConstantValue),
    EnumConst { type_fqn: String, const_name: String },
    ClassRef(String),
    Nested(Box<Annotation>),
    Array(Vec<ElementValue>),
}

impl ElementValue {
    fn parse(cursor: &mut ByteCursor<'_>, pool: &ConstantPool) -> Result<Self> {
        let tag = cursor.byte()?;
        match tag {
            b'B' | b'C' | b'I' | b'S' | b'Z' => {
                let value = pool.integer(cursor.u16()?)?;
                let narrowed = match tag {
                    b'B' => ConstantValue::Byte(value as i8),
                    b'C' => ConstantValue::Char(
                        char::from_u32(value as u32)
                            .ok_or(Error::BadCharConstant { value })?,
                    ),
                    b'I' => ConstantValue::Int(value),
                    b'S' => ConstantValue::Short(value as i16),
                    b'Z' => ConstantValue::Boolean(value != 0),
                    _ => unreachable!(),
                };
                Ok(ElementValue::Const(narrowed))
            }
            b'D' => Ok(ElementValue::Const(ConstantValue::Double(
                pool.double(cursor.u16()?)?,
            ))),
            b'F' => Ok(ElementValue::Const(ConstantValue::Float(
                pool.float(cursor.u16()?)?,
            ))),
            b'J' => Ok(ElementValue::Const(ConstantValue::Long(
                pool.long(cursor.u16()?)?,
            ))),
            b's' => Ok(ElementValue::Const(ConstantValue::Str(
                pool.utf8(cursor.u16()?)?.to_string(),
            ))),
            b'e' => {
                let type_descriptor = pool.utf8(cursor.u16()?)?;
                let type_fqn = object_descriptor_to_fqn(type_descriptor)
                    .unwrap_or_else(|| internal_to_fqn(type_descriptor));
                let const_name = pool.utf8(cursor.u16()?)?.to_string();
                Ok(ElementValue::EnumConst {
                    type_fqn,
                    const_name,
                })
            }
            b'c' => {
                let descriptor = pool.utf8(cursor.u16()?)?;
                let name = object_descriptor_to_fqn(descriptor)
                    .unwrap_or_else(|| internal_to_fqn(descriptor));
                Ok(ElementValue::ClassRef(name))
            }
            b'@' => Ok(ElementValue::Nested(Box::new(Annotation::parse(
                cursor, pool,
            )?))),
            b'[' => {
                let len = cursor.u16()? as usize;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(ElementValue::parse(cursor, pool)?);
                }
                Ok(ElementValue::Array(values))
            }
            _ => Err(Error::BadAnnotationValue { tag }),
        }
    }
}
