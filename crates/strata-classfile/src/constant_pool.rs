use crate::cursor::ByteCursor;
use crate::error::{Error, Result};

/// One resolved constant pool slot.
///
/// Symbolic references that the scanner never follows (member refs, method
/// handles, dynamic call sites) are consumed from the stream but collapsed to
/// [`PoolEntry::Skipped`]; they still occupy their slot so that indices of
/// later entries line up.
#[derive(Debug, Clone)]
pub enum PoolEntry {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    StringRef { utf8_index: u16 },
    Skipped(&'static str),
}

impl PoolEntry {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            PoolEntry::Utf8(_) => "Utf8",
            PoolEntry::Integer(_) => "Integer",
            PoolEntry::Float(_) => "Float",
            PoolEntry::Long(_) => "Long",
            PoolEntry::Double(_) => "Double",
            PoolEntry::Class { .. } => "Class",
            PoolEntry::StringRef { .. } => "String",
            PoolEntry::Skipped(kind) => kind,
        }
    }
}

/// The 1-indexed constant pool.
///
/// Class and String entries store the index of their Utf8 target rather than
/// the resolved text: the target may sit later in the pool, so resolution has
/// to wait until the whole pool has been read. The accessors below perform
/// that second pass on demand.
#[derive(Debug, Clone)]
pub struct ConstantPool {
    entries: Vec<Option<PoolEntry>>,
}

impl ConstantPool {
    pub fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let count = cursor.u16()? as usize;
        if count == 0 {
            return Err(Error::Layout("constant pool count of zero"));
        }

        let mut entries = vec![None; count];
        let mut index = 1usize;
        while index < count {
            let tag = cursor.byte()?;
            let entry = match tag {
                1 => {
                    let len = cursor.u16()? as usize;
                    let bytes = cursor.take(len)?;
                    PoolEntry::Utf8(decode_modified_utf8(bytes)?)
                }
                3 => PoolEntry::Integer(cursor.u32()? as i32),
                4 => PoolEntry::Float(f32::from_bits(cursor.u32()?)),
                5 => PoolEntry::Long(cursor.u64()? as i64),
                6 => PoolEntry::Double(f64::from_bits(cursor.u64()?)),
                7 => PoolEntry::Class {
                    name_index: cursor.u16()?,
                },
                8 => PoolEntry::StringRef {
                    utf8_index: cursor.u16()?,
                },
                // Fieldref / Methodref / InterfaceMethodref / NameAndType
                9..=12 => {
                    cursor.take(4)?;
                    PoolEntry::Skipped("MemberRef")
                }
                15 => {
                    cursor.take(3)?;
                    PoolEntry::Skipped("MethodHandle")
                }
                16 => {
                    cursor.take(2)?;
                    PoolEntry::Skipped("MethodType")
                }
                // Dynamic / InvokeDynamic
                17 | 18 => {
                    cursor.take(4)?;
                    PoolEntry::Skipped("Dynamic")
                }
                // Module / Package (module-info descriptors)
                19 | 20 => {
                    cursor.take(2)?;
                    PoolEntry::Skipped("Module")
                }
                other => return Err(Error::BadPoolTag { tag: other }),
            };

            // Long and Double occupy two slots; the second stays unused.
            let wide = matches!(entry, PoolEntry::Long(_) | PoolEntry::Double(_));
            entries[index] = Some(entry);
            if wide {
                if index + 1 >= count {
                    return Err(Error::Layout(
                        "long or double constant occupies the last pool slot",
                    ));
                }
                index += 2;
            } else {
                index += 1;
            }
        }

        Ok(Self { entries })
    }

    pub fn get(&self, index: u16) -> Result<&PoolEntry> {
        let idx = index as usize;
        if idx == 0 || idx >= self.entries.len() {
            return Err(Error::BadPoolIndex { index });
        }
        self.entries[idx]
            .as_ref()
            .ok_or(Error::BadPoolIndex { index })
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            PoolEntry::Utf8(s) => Ok(s.as_str()),
            other => Err(self.mismatch(index, "Utf8", other)),
        }
    }

    /// The slash-separated internal name behind a Class entry.
    pub fn class_internal_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            PoolEntry::Class { name_index } => self.utf8(*name_index),
            other => Err(self.mismatch(index, "Class", other)),
        }
    }

    pub fn string_constant(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            PoolEntry::StringRef { utf8_index } => self.utf8(*utf8_index),
            other => Err(self.mismatch(index, "String", other)),
        }
    }

    pub fn integer(&self, index: u16) -> Result<i32> {
        match self.get(index)? {
            PoolEntry::Integer(v) => Ok(*v),
            other => Err(self.mismatch(index, "Integer", other)),
        }
    }

    pub fn long(&self, index: u16) -> Result<i64> {
        match self.get(index)? {
            PoolEntry::Long(v) => Ok(*v),
            other => Err(self.mismatch(index, "Long", other)),
        }
    }

    pub fn float(&self, index: u16) -> Result<f32> {
        match self.get(index)? {
            PoolEntry::Float(v) => Ok(*v),
            other => Err(self.mismatch(index, "Float", other)),
        }
    }

    pub fn double(&self, index: u16) -> Result<f64> {
        match self.get(index)? {
            PoolEntry::Double(v) => Ok(*v),
            other => Err(self.mismatch(index, "Double", other)),
        }
    }

    fn mismatch(&self, index: u16, expected: &'static str, found: &PoolEntry) -> Error {
        Error::WrongPoolEntry {
            index,
            expected,
            found: found.kind(),
        }
    }
}

/// Decode the modified UTF-8 used by class files.
///
/// This is standard UTF-8 for the BMP except that NUL is encoded as
/// `0xC0 0x80` and characters beyond U+FFFF are encoded as a CESU-8 style
/// surrogate pair of three-byte sequences. Decoding goes through UTF-16 code
/// units; identifiers may legally contain unpaired surrogates, so the final
/// conversion is lossy rather than rejecting the whole class file.
fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        let b = bytes[i];
        match b {
            0x00..=0x7F => {
                units.push(b as u16);
                i += 1;
            }
            b if b & 0xE0 == 0xC0 => {
                let b2 = *bytes.get(i + 1).ok_or(Error::BadStringEncoding)?;
                if b == 0xC0 && b2 == 0x80 {
                    units.push(0);
                } else if b2 & 0xC0 == 0x80 {
                    units.push((u16::from(b & 0x1F) << 6) | u16::from(b2 & 0x3F));
                } else {
                    return Err(Error::BadStringEncoding);
                }
                i += 2;
            }
            b if b & 0xF0 == 0xE0 => {
                if i + 2 >= bytes.len() {
                    return Err(Error::BadStringEncoding);
                }
                let (b2, b3) = (bytes[i + 1], bytes[i + 2]);
                if b2 & 0xC0 != 0x80 || b3 & 0xC0 != 0x80 {
                    return Err(Error::BadStringEncoding);
                }
                units.push(
                    (u16::from(b & 0x0F) << 12)
                        | (u16::from(b2 & 0x3F) << 6)
                        | u16::from(b3 & 0x3F),
                );
                i += 3;
            }
            // Four-byte sequences never appear in modified UTF-8.
            _ => return Err(Error::BadStringEncoding),
        }
    }
    Ok(String::from_utf16_lossy(&units))
}
