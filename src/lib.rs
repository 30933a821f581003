//! An RFC 7049 (CBOR) codec built as two mirrored pipelines: a pull
//! parser/decoder over any [`std::io::Read`] source and a composer/encoder
//! over any [`std::io::Write`] sink.
//!
//! Decoding is either *typed* ([`decode::Decoder::decode`] into a
//! destination implementing [`decode::Decode`]) or *blind* (into the
//! dynamic [`Value`] sum). Encoding dispatches monomorphically for known
//! scalar shapes and generically for containers, records and dynamic
//! values. The RFC's semantic tags (date-times, bignums, decimal
//! fractions, big floats, expected encodings, URIs, regular expressions,
//! MIME) are built in; further tags and user value types hook in through
//! the process-wide [`registry`].

pub mod decode;
pub mod encode;
pub mod parser;
pub mod reader;
pub mod record;
pub mod registry;
pub mod value;

mod tags;

#[cfg(test)]
mod decode_tests;


pub use decode::{Decode, DecodeOptions, Decoder};
pub use encode::{Encode, EncodeOptions, Encoder};
pub use value::{Bytes, Mime, Value};
