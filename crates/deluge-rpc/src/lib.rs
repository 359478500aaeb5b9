//! Synchronous RPC client for the Deluge BitTorrent daemon.
//!
//! Each call is packaged as the rencoded tuple `[[seq, method, args,
//! kwargs]]`, compressed into exactly one zlib stream, and written over a
//! TLS tunnel; each response is one zlib stream carrying `[kind, seq,
//! payload]`. There is no length prefix; frame boundaries come from the
//! zlib end-of-stream marker.
//!
//! ```no_run
//! let client = deluge_rpc::dial("127.0.0.1:58846")?;
//! let version: String = client.call("daemon.info", deluge_rpc::Value::None)?;
//! # Ok::<(), deluge_rpc::Error>(())
//! ```

mod client;
mod codec;
mod error;
mod transport;

#[cfg(test)]
mod tests;

pub use client::Client;

pub use codec::Codec;
pub use codec::ResponseHeader;

pub use error::Error;
pub use error::Result;

pub use transport::dial;
pub use transport::TlsStream;

pub use rencode::FromValue;
pub use rencode::Value;
