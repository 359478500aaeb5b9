//! Codec for the rencode binary serialization format.
//!
//! rencode is the compact, self-describing, type-tagged format the Deluge
//! BitTorrent daemon speaks on its RPC socket: bencode-inspired, with
//! single-byte forms for small integers and short strings, fixed-count and
//! terminated container shapes, and an ASCII-decimal bignum escape hatch.
//! The encoder here is bit-exact against existing Deluge peers: equal
//! values always produce identical bytes.

pub mod types;
pub mod value;
pub mod encoder;
pub mod decoder;

pub use types::Error;
pub use types::Result;

pub use value::FromValue;
pub use value::Value;

pub use encoder::to_bytes;
pub use encoder::Encoder;

pub use decoder::from_bytes;
pub use decoder::Decoder;
