use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Base(BaseType),
    Object(String),
    Array(Box<FieldType>),
}

/// Convert a slash-separated internal name to its dotted fully-qualified form.
pub fn internal_to_fqn(internal: &str) -> String {
    internal.replace('/', ".")
}

/// Peel `L...;` off an object descriptor and return the dotted name inside.
pub fn object_descriptor_to_fqn(descriptor: &str) -> Option<String> {
    descriptor
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
        .map(internal_to_fqn)
}

pub fn parse_field_descriptor(descriptor: &str) -> Result<FieldType> {
    let (ty, rest) = parse_field_type(descriptor)?;
    if !rest.is_empty() {
        return Err(Error::BadDescriptor(descriptor.to_string()));
    }
    Ok(ty)
}

fn parse_field_type(input: &str) -> Result<(FieldType, &str)> {
    let Some(first) = input.bytes().next() else {
        return Err(Error::BadDescriptor(input.to_string()));
    };
    match first as char {
        'B' => Ok((FieldType::Base(BaseType::Byte), &input[1..])),
        'C' => Ok((FieldType::Base(BaseType::Char), &input[1..])),
        'D' => Ok((FieldType::Base(BaseType::Double), &input[1..])),
        'F' => Ok((FieldType::Base(BaseType::Float), &input[1..])),
        'I' => Ok((FieldType::Base(BaseType::Int), &input[1..])),
        'J' => Ok((FieldType::Base(BaseType::Long), &input[1..])),
        'S' => Ok((FieldType::Base(BaseType::Short), &input[1..])),
        'Z' => Ok((FieldType::Base(BaseType::Boolean), &input[1..])),
        'L' => match input.find(';') {
            Some(end) => Ok((
                FieldType::Object(internal_to_fqn(&input[1..end])),
                &input[end + 1..],
            )),
            None => Err(Error::BadDescriptor(input.to_string())),
        },
        '[' => {
            let (component, rest) = parse_field_type(&input[1..])?;
            Ok((FieldType::Array(Box::new(component)), rest))
        }
        _ => Err(Error::BadDescriptor(input.to_string())),
    }
}
