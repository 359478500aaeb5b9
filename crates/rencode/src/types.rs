//! Core types for the rencode binary format.
//!
//! The tag space is carved into fixed points and ranges; the range
//! predicates below are what the decoder dispatches on. These values are
//! part of the Deluge wire contract and must not change.

pub(crate) const CHR_LIST: u8 = 59;
pub(crate) const CHR_DICT: u8 = 60;
pub(crate) const CHR_INT: u8 = 61;
pub(crate) const CHR_INT1: u8 = 62;
pub(crate) const CHR_INT2: u8 = 63;
pub(crate) const CHR_INT4: u8 = 64;
pub(crate) const CHR_INT8: u8 = 65;
pub(crate) const CHR_FLOAT32: u8 = 66;
pub(crate) const CHR_FLOAT64: u8 = 44;
pub(crate) const CHR_TRUE: u8 = 67;
pub(crate) const CHR_FALSE: u8 = 68;
pub(crate) const CHR_NONE: u8 = 69;
pub(crate) const CHR_TERM: u8 = 127;

pub(crate) const INT_POS_FIXED_START: u8 = 0;
pub(crate) const INT_POS_FIXED_COUNT: u8 = 44;
pub(crate) const INT_NEG_FIXED_START: u8 = 70;
pub(crate) const INT_NEG_FIXED_COUNT: u8 = 32;
pub(crate) const DICT_FIXED_START: u8 = 102;
pub(crate) const DICT_FIXED_COUNT: u8 = 25;
pub(crate) const STR_FIXED_START: u8 = 128;
pub(crate) const STR_FIXED_COUNT: u8 = 64;
pub(crate) const LIST_FIXED_START: u8 = STR_FIXED_START + STR_FIXED_COUNT;
pub(crate) const LIST_FIXED_COUNT: u8 = 64;

/// Longest accepted decimal form of a big integer, sign included.
pub(crate) const MAX_INT_LENGTH: usize = 64;

pub(crate) const fn is_fixed_pos_int(code: u8) -> bool {
    code < INT_POS_FIXED_START + INT_POS_FIXED_COUNT
}

pub(crate) const fn is_fixed_neg_int(code: u8) -> bool {
    code >= INT_NEG_FIXED_START && code < INT_NEG_FIXED_START + INT_NEG_FIXED_COUNT
}

pub(crate) const fn is_fixed_str(code: u8) -> bool {
    code >= STR_FIXED_START && code < STR_FIXED_START + STR_FIXED_COUNT
}

// LIST_FIXED_START + LIST_FIXED_COUNT is 256; the range runs to the end of
// the byte.
pub(crate) const fn is_fixed_list(code: u8) -> bool {
    code >= LIST_FIXED_START
}

pub(crate) const fn is_fixed_dict(code: u8) -> bool {
    code >= DICT_FIXED_START && code < DICT_FIXED_START + DICT_FIXED_COUNT
}

#[derive(Debug)]
pub enum Error {
    /// The leading byte falls outside every assigned tag range.
    UnsupportedCode(u8),
    /// The stream ended inside a value.
    Truncated,
    /// A big integer's decimal form exceeds [`MAX_INT_LENGTH`] characters.
    /// Enforced at encode time; carries the offending length.
    NumberTooLong(usize),
    /// The wire value cannot populate the requested target type.
    TypeMismatch {
        value: &'static str,
        target: &'static str,
    },
    /// Structurally invalid input (bad length prefix, bad bignum literal).
    Malformed(&'static str),
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnsupportedCode(code) => write!(f, "unsupported code {}", code),
            Error::Truncated => write!(f, "unexpected end of stream"),
            Error::NumberTooLong(len) => {
                write!(f, "number is longer than {} characters ({})", MAX_INT_LENGTH, len)
            }
            Error::TypeMismatch { value, target } => {
                write!(f, "cannot decode a rencode {} into a {}", value, target)
            }
            Error::Malformed(msg) => write!(f, "{}", msg),
            Error::Io(err) => write!(f, "i/o error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::Truncated,
            _ => Error::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
