//! Streaming rencode decoder.
//!
//! ## Invariants
//! - **One value per call**: [`Decoder::decode_value`] consumes exactly the
//!   bytes of one wire value, leaving the reader positioned at the next.
//! - **Lookahead is one byte**: only the terminated container forms need to
//!   peek (for TERM), so the decoder works over any `io::Read`.
//! - A truncated stream surfaces as [`Error::Truncated`] from any sub-parse.

use std::collections::BTreeMap;
use std::io::Read;
use std::str;

use num_bigint::BigInt;

use crate::types::is_fixed_dict;
use crate::types::is_fixed_list;
use crate::types::is_fixed_neg_int;
use crate::types::is_fixed_pos_int;
use crate::types::is_fixed_str;
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
use crate::types::DICT_FIXED_START;
use crate::types::INT_NEG_FIXED_START;
use crate::types::INT_POS_FIXED_START;
use crate::types::LIST_FIXED_START;
use crate::types::STR_FIXED_START;
use crate::value::FromValue;
use crate::value::Value;

pub struct Decoder<R: Read> {
    r: R,
    peeked: Option<u8>,
}

impl<R: Read> Decoder<R> {
    pub fn new(r: R) -> Self {
        Self { r, peeked: None }
    }

    /// Reads one value and returns its canonical representation.
    pub fn decode_value(&mut self) -> Result<Value> {
        let code = self.read_byte()?;
        match code {
            CHR_NONE => Ok(Value::None),
            CHR_TRUE => Ok(Value::Bool(true)),
            CHR_FALSE => Ok(Value::Bool(false)),
            CHR_INT1 => Ok(Value::Int(i64::from(i8::from_be_bytes(self.read_array()?)))),
            CHR_INT2 => Ok(Value::Int(i64::from(i16::from_be_bytes(self.read_array()?)))),
            CHR_INT4 => Ok(Value::Int(i64::from(i32::from_be_bytes(self.read_array()?)))),
            CHR_INT8 => Ok(Value::Int(i64::from_be_bytes(self.read_array()?))),
            CHR_INT => self.decode_big_int(),
            CHR_FLOAT32 => Ok(Value::Float32(f32::from_be_bytes(self.read_array()?))),
            CHR_FLOAT64 => Ok(Value::Float64(f64::from_be_bytes(self.read_array()?))),
            CHR_LIST => self.decode_list(None),
            CHR_DICT => self.decode_dict(None),
            code if is_fixed_pos_int(code) => {
                Ok(Value::Int(i64::from(code - INT_POS_FIXED_START)))
            }
            code if is_fixed_neg_int(code) => {
                Ok(Value::Int(-1 - i64::from(code - INT_NEG_FIXED_START)))
            }
            code if is_fixed_str(code) => self.decode_string(usize::from(code - STR_FIXED_START)),
            code if code.is_ascii_digit() => {
                let len = self.decode_string_len(code)?;
                self.decode_string(len)
            }
            code if is_fixed_list(code) => {
                self.decode_list(Some(usize::from(code - LIST_FIXED_START)))
            }
            code if is_fixed_dict(code) => {
                self.decode_dict(Some(usize::from(code - DICT_FIXED_START)))
            }
            code => Err(Error::UnsupportedCode(code)),
        }
    }

    /// Reads one value and coerces it into a typed slot.
    pub fn decode<T: FromValue>(&mut self) -> Result<T> {
        T::from_value(self.decode_value()?)
    }

    /// ASCII decimal digits up to TERM. Fits in 64 bits when it can; keeps
    /// the bignum representation otherwise.
    fn decode_big_int(&mut self) -> Result<Value> {
        let digits = self.read_until(CHR_TERM)?;
        let literal = str::from_utf8(&digits)
            .map_err(|_| Error::Malformed("big integer literal is not ascii"))?;
        if let Ok(n) = literal.parse::<i64>() {
            return Ok(Value::Int(n));
        }
        let big = literal
            .parse::<BigInt>()
            .map_err(|_| Error::Malformed("invalid big integer literal"))?;
        Ok(Value::BigInt(big))
    }

    /// Decimal length started by `first`, closed by ':'.
    fn decode_string_len(&mut self, first: u8) -> Result<usize> {
        let mut digits = vec![first];
        digits.extend(self.read_until(b':')?);
        str::from_utf8(&digits)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or(Error::Malformed("invalid string length prefix"))
    }

    fn decode_string(&mut self, len: usize) -> Result<Value> {
        let mut data = vec![0u8; len];
        self.read_exact(&mut data)?;
        // Wire strings carry no encoding; report text when the bytes allow it.
        Ok(match String::from_utf8(data) {
            Ok(text) => Value::Text(text),
            Err(raw) => Value::Bytes(raw.into_bytes()),
        })
    }

    fn decode_list(&mut self, count: Option<usize>) -> Result<Value> {
        let mut items = Vec::with_capacity(count.unwrap_or(0));
        match count {
            Some(n) => {
                for _ in 0..n {
                    items.push(self.decode_value()?);
                }
            }
            None => {
                while self.peek_byte()? != CHR_TERM {
                    items.push(self.decode_value()?);
                }
                self.read_byte()?;
            }
        }
        Ok(Value::List(items))
    }

    fn decode_dict(&mut self, count: Option<usize>) -> Result<Value> {
        let mut map = BTreeMap::new();
        match count {
            Some(n) => {
                for _ in 0..n {
                    let key = self.decode_key()?;
                    map.insert(key, self.decode_value()?);
                }
            }
            None => {
                while self.peek_byte()? != CHR_TERM {
                    let key = self.decode_key()?;
                    map.insert(key, self.decode_value()?);
                }
                self.read_byte()?;
            }
        }
        Ok(Value::Dict(map))
    }

    fn decode_key(&mut self) -> Result<String> {
        match self.decode_value()? {
            Value::Text(key) => Ok(key),
            other => Err(Error::TypeMismatch {
                value: other.kind(),
                target: "dict key",
            }),
        }
    }

    fn read_byte(&mut self) -> Result<u8> {
        if let Some(b) = self.peeked.take() {
            return Ok(b);
        }
        let mut buf = [0u8; 1];
        eprintln!("DECODER: about to read 1 byte");
        self.r.read_exact(&mut buf)?;
        eprintln!("DECODER: read byte {:02x}", buf[0]);
        Ok(buf[0])
    }

    fn peek_byte(&mut self) -> Result<u8> {
        if let Some(b) = self.peeked {
            return Ok(b);
        }
        let mut buf = [0u8; 1];
        self.r.read_exact(&mut buf)?;
        self.peeked = Some(buf[0]);
        Ok(buf[0])
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let mut start = 0;
        if let Some(b) = self.peeked.take() {
            buf[0] = b;
            start = 1;
        }
        self.r.read_exact(&mut buf[start..])?;
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Bytes up to, excluding, `delim`. The delimiter is consumed.
    fn read_until(&mut self, delim: u8) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let b = self.read_byte()?;
            if b == delim {
                return Ok(out);
            }
            out.push(b);
        }
    }
}

/// Decodes exactly one value from `bytes`; trailing bytes are an error.
pub fn from_bytes(bytes: &[u8]) -> Result<Value> {
    let mut dec = Decoder::new(bytes);
    let value = dec.decode_value()?;
    match dec.read_byte() {
        Err(Error::Truncated) => Ok(value),
        Ok(_) => Err(Error::Malformed("trailing bytes after value")),
        Err(err) => Err(err),
    }
}
