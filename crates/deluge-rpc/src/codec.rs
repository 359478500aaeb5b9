//! RPC envelope framing for the daemon's wire protocol.
//!
//! Every message is one zlib stream carrying one rencoded value; there is
//! no length prefix, so frame boundaries are the zlib end-of-stream marker.
//!
//! ## Invariants
//! - One successful [`Codec::write_request`] puts exactly one complete zlib
//!   stream on the wire, as a single contiguous write.
//! - A result payload is stashed between the header read and the body read
//!   and is consumed exactly once.

use std::collections::BTreeMap;
use std::io;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;

use flate2::bufread::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rencode::Value;
use tracing::trace;

use crate::error::Error;
use crate::error::Result;

const RPC_RESPONSE: i64 = 1;
const RPC_ERROR: i64 = 2;
const RPC_EVENT: i64 = 3;

/// Response routing data, populated even when the header read fails with a
/// remote error so the caller can match the failure to its request.
#[derive(Debug, Default)]
pub struct ResponseHeader {
    pub seq: u64,
}

/// Wire codec bound to one connection. Not internally synchronized; the
/// harness serializes access.
pub struct Codec<S> {
    stream: BufReader<S>,
    resp_body: Option<Value>,
}

impl<S: Read + Write> Codec<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
            resp_body: None,
        }
    }

    /// Sends `[[seq, method, args, kwargs]]` as one compressed frame.
    ///
    /// `body` follows the daemon's calling convention: a list is taken as
    /// positional arguments, a dict is searched for `args`/`kwargs` entries
    /// (case-insensitive, other keys ignored), anything else means a call
    /// with no arguments.
    pub fn write_request(&mut self, seq: u64, method: &str, body: &Value) -> Result<()> {
        let (args, kwargs) = split_body(body);
        self.write_request_parts(seq, method, args, kwargs)
    }

    /// The explicit positional/keyword form of [`Codec::write_request`].
    pub fn write_request_parts(
        &mut self,
        seq: u64,
        method: &str,
        args: Vec<Value>,
        kwargs: BTreeMap<String, Value>,
    ) -> Result<()> {
        let call = Value::List(vec![
            Value::from(seq),
            Value::from(method),
            Value::List(args),
            Value::Dict(kwargs),
        ]);
        let request = Value::List(vec![call]);

        let mut zw = ZlibEncoder::new(Vec::new(), Compression::default());
        rencode::Encoder::new(&mut zw).encode(&request)?;
        let frame = zw.finish().map_err(Error::Transport)?;

        eprintln!("CLIENT frame bytes ({}): {:02x?}", frame.len(), frame);
        trace!(seq, method, frame_len = frame.len(), "write request");
        let sock = self.stream.get_mut();
        sock.write_all(&frame).map_err(Error::Transport)?;
        sock.flush().map_err(Error::Transport)?;
        Ok(())
    }

    /// Reads one response frame and classifies it.
    ///
    /// `resp.seq` is set before the kind is dispatched, so a remote error
    /// still routes to the right caller. A result payload is stashed for
    /// [`Codec::read_response_body`]; an error, event, or unknown kind
    /// consumes the frame and surfaces as `Err`.
    pub fn read_response_header(&mut self, resp: &mut ResponseHeader) -> Result<()> {
        let frame = self.read_frame()?;
        let Value::List(items) = frame else {
            return Err(Error::Protocol("response is not a list"));
        };
        let [kind, seq, payload]: [Value; 3] = items
            .try_into()
            .map_err(|_| Error::Protocol("response is not a three-element list"))?;

        let kind = kind
            .as_i64()
            .map_err(|_| Error::Protocol("response kind is not an integer"))?;
        resp.seq = seq
            .as_u64()
            .map_err(|_| Error::Protocol("response seq is not an unsigned integer"))?;
        trace!(seq = resp.seq, kind, "read response header");

        match kind {
            RPC_RESPONSE => {
                self.resp_body = Some(payload);
                Ok(())
            }
            RPC_ERROR => Err(remote_error(payload)),
            RPC_EVENT => Err(Error::EventNotSupported),
            other => Err(Error::UnknownMessageType(other)),
        }
    }

    /// Takes the stashed result payload. Absent stash (the header carried
    /// an error, or the body was already taken) is not a failure.
    pub fn read_response_body(&mut self) -> Option<Value> {
        self.resp_body.take()
    }

    pub fn get_ref(&self) -> &S {
        self.stream.get_ref()
    }

    pub fn into_inner(self) -> S {
        self.stream.into_inner()
    }

    /// One zlib stream, one rencoded value. The stream is drained past the
    /// value so the compressed trailer is consumed and the next frame
    /// starts aligned in the read buffer.
    fn read_frame(&mut self) -> Result<Value> {
        let mut zr = ZlibDecoder::new(&mut self.stream);
        let value = rencode::Decoder::new(&mut zr).decode_value()?;
        io::copy(&mut zr, &mut io::sink()).map_err(Error::Transport)?;
        Ok(value)
    }
}

/// Formats a daemon-side exception payload, `[exception_type,
/// exception_msg, ...]` with any further entries ignored.
fn remote_error(payload: Value) -> Error {
    let Value::List(entries) = payload else {
        return Error::Protocol("error response payload is not a list");
    };
    let mut entries = entries.into_iter();
    let exception = entries.next().map(text_of).unwrap_or_default();
    let message = entries.next().map(text_of).unwrap_or_default();
    Error::Remote { exception, message }
}

fn text_of(v: Value) -> String {
    match v {
        Value::Text(s) => s,
        Value::Bytes(b) => String::from_utf8_lossy(&b).into_owned(),
        other => format!("{:?}", other),
    }
}

/// Splits a caller-supplied body into positional and keyword arguments.
pub(crate) fn split_body(body: &Value) -> (Vec<Value>, BTreeMap<String, Value>) {
    match body {
        Value::List(items) => (items.clone(), BTreeMap::new()),
        Value::Dict(map) => {
            let mut args = Vec::new();
            let mut kwargs = BTreeMap::new();
            for (key, value) in map {
                if key.eq_ignore_ascii_case("args") {
                    if let Value::List(items) = value {
                        args = items.clone();
                    }
                } else if key.eq_ignore_ascii_case("kwargs") {
                    if let Value::Dict(entries) = value {
                        kwargs = entries.clone();
                    }
                }
            }
            (args, kwargs)
        }
        _ => (Vec::new(), BTreeMap::new()),
    }
}
