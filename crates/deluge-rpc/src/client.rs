//! Synchronous RPC client bound to one connection.
//!
//! The codec underneath is single-threaded by contract; the client
//! serializes whole call exchanges behind a mutex and matches each response
//! to its request by the echoed sequence number.

use std::collections::BTreeMap;
use std::io::Read;
use std::io::Write;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use rencode::FromValue;
use rencode::Value;

use crate::codec::Codec;
use crate::codec::ResponseHeader;
use crate::error::Error;
use crate::error::Result;

pub struct Client<S> {
    codec: Mutex<Codec<S>>,
    seq: AtomicU64,
}

impl<S: Read + Write> Client<S> {
    /// Binds a client to an established bidirectional stream.
    pub fn new(stream: S) -> Self {
        Self {
            codec: Mutex::new(Codec::new(stream)),
            seq: AtomicU64::new(1),
        }
    }

    /// Invokes `method` on the daemon and coerces the result into `T`.
    pub fn call<T: FromValue>(&self, method: &str, body: impl Into<Value>) -> Result<T> {
        let value = self.call_value(method, body)?;
        T::from_value(value).map_err(Error::Codec)
    }

    /// Invokes `method` and returns the raw result value.
    pub fn call_value(&self, method: &str, body: impl Into<Value>) -> Result<Value> {
        let body = body.into();
        self.exchange(|codec, seq| codec.write_request(seq, method, &body))
    }

    /// Invokes `method` with an explicit positional/keyword split.
    pub fn call_with(
        &self,
        method: &str,
        args: Vec<Value>,
        kwargs: BTreeMap<String, Value>,
    ) -> Result<Value> {
        self.exchange(|codec, seq| codec.write_request_parts(seq, method, args, kwargs))
    }

    fn exchange(&self, write: impl FnOnce(&mut Codec<S>, u64) -> Result<()>) -> Result<Value> {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let mut codec = self.codec.lock().unwrap_or_else(|poison| poison.into_inner());

        write(&mut codec, seq)?;
        eprintln!("CLIENT: write done for seq {seq}, reading header...");

        let mut header = ResponseHeader::default();
        codec.read_response_header(&mut header)?;
        eprintln!("CLIENT: got header for seq {seq}");
        if header.seq != seq {
            // Drop the misrouted payload; the stash must not leak into the
            // next exchange.
            codec.read_response_body();
            return Err(Error::SeqMismatch {
                expected: seq,
                got: header.seq,
            });
        }
        Ok(codec.read_response_body().unwrap_or(Value::None))
    }

    /// Closes the connection. Any error after this is a transport error.
    pub fn close(self) {
        drop(self);
    }

    /// Hands the underlying stream back, discarding codec state.
    pub fn into_inner(self) -> S {
        self.codec
            .into_inner()
            .unwrap_or_else(|poison| poison.into_inner())
            .into_inner()
    }
}
