//! Streaming rencode encoder.
//!
//! ## Invariants
//! - **Narrowest form**: integers take the smallest encoding that holds
//!   them; strings and containers take the fixed-count form whenever the
//!   length fits the tag byte.
//! - **Determinism**: equal values produce identical bytes. Dict keys are
//!   emitted in byte-lexicographic order.
//! - **No partial output on encode errors**: an oversized big integer is
//!   rejected before its tag is written.

use std::collections::BTreeMap;
use std::io::Write;

use num_bigint::BigInt;

use crate::types::Error;
use crate::types::Result;
use crate::types::CHR_DICT;
use crate::types::CHR_FALSE;
use crate::types::CHR_FLOAT32;
use crate::types::CHR_FLOAT64;
use crate::types::CHR_INT;
use crate::types::CHR_INT1;
use crate::types::CHR_INT2;
use crate::types::CHR_INT4;
use crate::types::CHR_INT8;
use crate::types::CHR_LIST;
use crate::types::CHR_NONE;
use crate::types::CHR_TERM;
use crate::types::CHR_TRUE;
use crate::types::DICT_FIXED_COUNT;
use crate::types::DICT_FIXED_START;
use crate::types::INT_NEG_FIXED_COUNT;
use crate::types::INT_NEG_FIXED_START;
use crate::types::INT_POS_FIXED_COUNT;
use crate::types::INT_POS_FIXED_START;
use crate::types::LIST_FIXED_COUNT;
use crate::types::LIST_FIXED_START;
use crate::types::MAX_INT_LENGTH;
use crate::types::STR_FIXED_COUNT;
use crate::types::STR_FIXED_START;
use crate::value::Value;

/// Writes one self-contained wire value per [`Encoder::encode`] call.
pub struct Encoder<W: Write> {
    w: W,
}

impl<W: Write> Encoder<W> {
    pub fn new(w: W) -> Self {
        Self { w }
    }

    pub fn into_inner(self) -> W {
        self.w
    }

    pub fn encode(&mut self, v: &Value) -> Result<()> {
        match v {
            Value::None => self.write(&[CHR_NONE]),
            Value::Bool(true) => self.write(&[CHR_TRUE]),
            Value::Bool(false) => self.write(&[CHR_FALSE]),
            Value::Int(n) => self.encode_int(*n),
            Value::BigInt(b) => self.encode_big_int(b),
            Value::Float32(f) => {
                self.write(&[CHR_FLOAT32])?;
                self.write(&f.to_be_bytes())
            }
            Value::Float64(f) => {
                self.write(&[CHR_FLOAT64])?;
                self.write(&f.to_be_bytes())
            }
            Value::Bytes(b) => self.encode_bytes(b),
            Value::Text(s) => self.encode_bytes(s.as_bytes()),
            Value::List(items) => self.encode_list(items),
            Value::Dict(map) => self.encode_dict(map),
        }
    }

    fn encode_int(&mut self, n: i64) -> Result<()> {
        if 0 <= n && n < i64::from(INT_POS_FIXED_COUNT) {
            self.write(&[INT_POS_FIXED_START + n as u8])
        } else if -i64::from(INT_NEG_FIXED_COUNT) <= n && n < 0 {
            self.write(&[(i64::from(INT_NEG_FIXED_START) - 1 - n) as u8])
        } else if i64::from(i8::MIN) <= n && n <= i64::from(i8::MAX) {
            self.write(&[CHR_INT1, n as u8])
        } else if i64::from(i16::MIN) <= n && n <= i64::from(i16::MAX) {
            self.write(&[CHR_INT2])?;
            self.write(&(n as i16).to_be_bytes())
        } else if i64::from(i32::MIN) <= n && n <= i64::from(i32::MAX) {
            self.write(&[CHR_INT4])?;
            self.write(&(n as i32).to_be_bytes())
        } else {
            self.write(&[CHR_INT8])?;
            self.write(&n.to_be_bytes())
        }
    }

    fn encode_big_int(&mut self, b: &BigInt) -> Result<()> {
        let literal = b.to_string();
        if literal.len() > MAX_INT_LENGTH {
            return Err(Error::NumberTooLong(literal.len()));
        }
        self.write(&[CHR_INT])?;
        self.write(literal.as_bytes())?;
        self.write(&[CHR_TERM])
    }

    fn encode_bytes(&mut self, b: &[u8]) -> Result<()> {
        if b.len() < usize::from(STR_FIXED_COUNT) {
            self.write(&[STR_FIXED_START + b.len() as u8])?;
            return self.write(b);
        }
        // Long form: decimal length, ':', payload. No terminator.
        self.write(format!("{}:", b.len()).as_bytes())?;
        self.write(b)
    }

    fn encode_list(&mut self, items: &[Value]) -> Result<()> {
        let fixed = items.len() < usize::from(LIST_FIXED_COUNT);
        if fixed {
            self.write(&[LIST_FIXED_START + items.len() as u8])?;
        } else {
            self.write(&[CHR_LIST])?;
        }
        for item in items {
            self.encode(item)?;
        }
        if !fixed {
            self.write(&[CHR_TERM])?;
        }
        Ok(())
    }

    fn encode_dict(&mut self, map: &BTreeMap<String, Value>) -> Result<()> {
        let fixed = map.len() < usize::from(DICT_FIXED_COUNT);
        if fixed {
            self.write(&[DICT_FIXED_START + map.len() as u8])?;
        } else {
            self.write(&[CHR_DICT])?;
        }
        // BTreeMap iterates keys in byte-lexicographic order.
        for (key, value) in map {
            self.encode_bytes(key.as_bytes())?;
            self.encode(value)?;
        }
        if !fixed {
            self.write(&[CHR_TERM])?;
        }
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.w.write_all(bytes)?;
        Ok(())
    }
}

/// Encodes one value into a fresh buffer.
pub fn to_bytes(v: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    Encoder::new(&mut buf).encode(v)?;
    Ok(buf)
}
