use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a byte stream could not be understood as a class file.
///
/// Only [`Error::NotAClassfile`] means the input is some other kind of file.
/// Every other variant means the file announced itself as a class file and
/// then broke the format partway through; the scanner logs those and moves
/// on to the next file.
#[derive(Debug)]
pub enum Error {
    /// The first four bytes were not the class-file magic.
    NotAClassfile { magic: u32 },
    /// The input ran out inside a structure that promised more bytes.
    Truncated,
    /// A reference pointed at a constant-pool slot that holds nothing (index
    /// zero, past the end, or the ghost slot after a long/double).
    BadPoolIndex { index: u16 },
    BadPoolTag { tag: u8 },
    /// A reference resolved to a pool entry of the wrong kind.
    WrongPoolEntry {
        index: u16,
        expected: &'static str,
        found: &'static str,
    },
    /// A string constant was not valid modified UTF-8.
    BadStringEncoding,
    BadDescriptor(String),
    /// An annotation element carried a value tag outside the format.
    BadAnnotationValue { tag: u8 },
    /// A char-typed constant held a value outside the character range.
    BadCharConstant { value: i32 },
    /// Counts, lengths, or section order did not line up.
    Layout(&'static str),
}

impl Error {
    /// True when the input is simply not a class file (bad magic), as opposed
    /// to a class file with a structural defect.
    pub fn is_not_a_classfile(&self) -> bool {
        matches!(self, Error::NotAClassfile { .. })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotAClassfile { magic } => {
                write!(f, "not a class file (input starts with 0x{magic:08x})")
            }
            Error::Truncated => f.write_str("class file ends in the middle of a structure"),
            Error::BadPoolIndex { index } => {
                write!(f, "constant pool has no entry at index {index}")
            }
            Error::BadPoolTag { tag } => {
                write!(f, "constant pool entry carries unknown tag {tag}")
            }
            Error::WrongPoolEntry {
                index,
                expected,
                found,
            } => write!(
                f,
                "constant pool entry {index} holds a {found} where a {expected} was needed"
            ),
            Error::BadStringEncoding => {
                f.write_str("string constant is not valid modified UTF-8")
            }
            Error::BadDescriptor(descriptor) => {
                write!(f, "cannot parse type descriptor {descriptor:?}")
            }
            Error::BadAnnotationValue { tag } => {
                write!(f, "annotation element carries unknown value tag {tag}")
            }
            Error::BadCharConstant { value } => {
                write!(f, "char constant {value} does not denote a character")
            }
            Error::Layout(detail) => {
                write!(f, "class file structure is inconsistent: {detail}")
            }
        }
    }
}

impl std::error::Error for Error {}
