use crate::parser::{Major, Parser};
use crate::value::{Bytes, Value};
use crate::{parser, registry};
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] parser::Error),

    #[error("incorrect type, expecting {0}, found {1}")]
    IncorrectType(String, String),

    #[error("break received outside an indefinite-length item")]
    UnexpectedBreak,

    #[error("chunked string contains an invalid chunk")]
    InvalidChunk,

    #[error("map has a key but no value")]
    PartialMap,

    #[error("maximum recursion depth reached")]
    MaxRecursion,

    #[error("unsupported simple value {0}")]
    UnsupportedSimple(u8),

    #[error("unknown tag {0}")]
    UnknownTag(u64),

    #[error("invalid content for tag {0}: {1}")]
    TagContent(u64, String),

    #[error("strict mode: duplicated key {0} in map")]
    DuplicateKey(String),

    #[error("strict mode: key {0} does not match any record field")]
    UnknownKey(String),

    #[error("strict mode: record has {fields} fields but item carries {entries} entries")]
    LengthMismatch { fields: usize, entries: usize },

    #[error("record keys must be strings, {0} received")]
    NonStringKey(Major),

    #[error("key {0} matches both a field name and another field's rename")]
    AmbiguousField(String),

    #[error("failed to decode record field {field}: {source}")]
    Field {
        field: &'static str,
        source: Box<Error>,
    },

    #[error(transparent)]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    IntOverflow(#[from] std::num::TryFromIntError),

    #[error(transparent)]
    Registry(#[from] registry::Error),
}

/// The host shape a decode destination declares, checked against the
/// shape a parsed header announces before any payload is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F16,
    F32,
    F64,
    Bool,
    Bytes,
    Text,
    Array,
    Map,
    Null,
    Undefined,
    Simple,
    Any,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TargetKind::U8 => "unsigned 8-bit integer",
            TargetKind::U16 => "unsigned 16-bit integer",
            TargetKind::U32 => "unsigned 32-bit integer",
            TargetKind::U64 => "unsigned 64-bit integer",
            TargetKind::I8 => "signed 8-bit integer",
            TargetKind::I16 => "signed 16-bit integer",
            TargetKind::I32 => "signed 32-bit integer",
            TargetKind::I64 => "signed 64-bit integer",
            TargetKind::F16 => "half-precision float",
            TargetKind::F32 => "single-precision float",
            TargetKind::F64 => "double-precision float",
            TargetKind::Bool => "boolean",
            TargetKind::Bytes => "byte string",
            TargetKind::Text => "text string",
            TargetKind::Array => "array",
            TargetKind::Map => "map",
            TargetKind::Null => "null",
            TargetKind::Undefined => "undefined",
            TargetKind::Simple => "simple value",
            TargetKind::Any => "dynamic value",
        })
    }
}

/// The host shape implied by a (major, additional-info) pair.
///
/// `None` only for headers that carry no value shape of their own (the
/// break opcode); tags are handled before this table is consulted.
fn expected_kind(major: Major, info: u8) -> Option<TargetKind> {
    match major {
        Major::Unsigned => Some(match info {
            0..=24 => TargetKind::U8,
            25 => TargetKind::U16,
            26 => TargetKind::U32,
            _ => TargetKind::U64,
        }),
        Major::Negative => Some(match info {
            0..=24 => TargetKind::I8,
            25 => TargetKind::I16,
            26 => TargetKind::I32,
            _ => TargetKind::I64,
        }),
        Major::Bytes => Some(TargetKind::Bytes),
        Major::Text => Some(TargetKind::Text),
        Major::Array => Some(TargetKind::Array),
        Major::Map => Some(TargetKind::Map),
        Major::Tag => None,
        Major::Simple => match info {
            20 | 21 => Some(TargetKind::Bool),
            22 => Some(TargetKind::Null),
            23 => Some(TargetKind::Undefined),
            25 => Some(TargetKind::F16),
            26 => Some(TargetKind::F32),
            27 => Some(TargetKind::F64),
            31 => None,
            _ => Some(TargetKind::Simple),
        },
    }
}

pub(crate) fn header_type_name(major: Major, info: u8) -> String {
    if major == Major::Tag {
        return "tagged value".to_string();
    }
    match expected_kind(major, info) {
        Some(kind) => kind.to_string(),
        None => "break".to_string(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Reject duplicate keys, unknown record keys and length mismatches
    /// instead of silently accepting them.
    pub strict: bool,
    /// Maximum container nesting accepted before the decode fails.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict: false,
            max_depth: 256,
        }
    }
}

/// Reads CBOR data items from an input stream into typed or dynamic
/// destinations.
///
/// Each [`decode`](Decoder::decode) call consumes exactly one data item;
/// callers wanting a stream invoke it in a loop. A `Decoder` is not safe
/// for concurrent use.
pub struct Decoder<'a> {
    pub(crate) parser: Parser<'a>,
    pub(crate) strict: bool,
    depth: usize,
}

/// A type that can be decoded from a single CBOR data item.
pub trait Decode: Sized {
    /// The shape this destination declares, matched against the parsed
    /// header. [`TargetKind::Any`] skips the check; the implementation
    /// then validates the header itself.
    const KIND: TargetKind;

    fn decode_value(d: &mut Decoder, hdr: (Major, u8)) -> Result<Self, Error>;
}

impl<'a> Decoder<'a> {
    pub fn new(src: &'a mut dyn std::io::Read) -> Self {
        Self::with_options(src, DecodeOptions::default())
    }

    pub fn with_options(src: &'a mut dyn std::io::Read, options: DecodeOptions) -> Self {
        Self {
            parser: Parser::new(src),
            strict: options.strict,
            depth: options.max_depth,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Reads the next data item and decodes it into `T`.
    pub fn decode<T: Decode>(&mut self) -> Result<T, Error> {
        let hdr = self.parse()?;
        if self.parser.is_break() {
            return Err(Error::UnexpectedBreak);
        }
        self.decode_after_header(hdr)
    }

    /// Reads the next data item through the handler registered for `T`.
    pub fn decode_any<T: Any + Default>(&mut self) -> Result<T, Error> {
        let (decode, _) = registry::lookup_type(TypeId::of::<T>()).ok_or(
            registry::Error::TypeNotRegistered(std::any::type_name::<T>()),
        )?;
        let mut out = T::default();
        decode(self, &mut out)?;
        Ok(out)
    }

    pub(crate) fn parse(&mut self) -> Result<(Major, u8), Error> {
        Ok(self.parser.parse_information()?)
    }

    pub(crate) fn decode_after_header<T: Decode>(&mut self, hdr: (Major, u8)) -> Result<T, Error> {
        self.check_target(T::KIND, hdr)?;
        T::decode_value(self, hdr)
    }

    fn check_target(&self, kind: TargetKind, (major, info): (Major, u8)) -> Result<(), Error> {
        if kind == TargetKind::Any {
            return Ok(());
        }
        if major == Major::Tag {
            // Tag 4 (decimal fraction) decodes into an f32 destination and
            // tag 34 (base64 text) into a text destination; everything else
            // routes through a tag-aware target.
            if matches!(kind, TargetKind::F32 | TargetKind::Text) {
                return Ok(());
            }
            return Err(Error::IncorrectType(
                kind.to_string(),
                "tagged value".to_string(),
            ));
        }
        match expected_kind(major, info) {
            Some(found) if found == kind => Ok(()),
            Some(found) => Err(Error::IncorrectType(kind.to_string(), found.to_string())),
            None => Ok(()),
        }
    }

    pub(crate) fn descend<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        if self.depth == 0 {
            return Err(Error::MaxRecursion);
        }
        self.depth -= 1;
        let r = f(self);
        self.depth += 1;
        r
    }

    /// Reads the payload of a byte or text string item, reassembling
    /// indefinite-length chunks.
    pub(crate) fn decode_string_payload(
        &mut self,
        (major, info): (Major, u8),
    ) -> Result<Vec<u8>, Error> {
        if info != 31 {
            let n: usize = self.parser.buflen().try_into()?;
            return Ok(self.parser.scan(n)?.to_vec());
        }
        let mut out = Vec::new();
        loop {
            let (chunk_major, chunk_info) = self.parse()?;
            if self.parser.is_break() {
                return Ok(out);
            }
            // Each chunk must be a definite-length string of the outer major.
            if chunk_major != major || chunk_info == 31 {
                return Err(Error::InvalidChunk);
            }
            let n: usize = self.parser.buflen().try_into()?;
            out.extend_from_slice(self.parser.scan(n)?);
        }
    }

    pub(crate) fn decode_text_payload(&mut self, hdr: (Major, u8)) -> Result<String, Error> {
        Ok(String::from_utf8(self.decode_string_payload(hdr)?)?)
    }

    /// Decodes the next item blindly and discards it.
    pub(crate) fn skip_item(&mut self) -> Result<(), Error> {
        self.decode::<Value>().map(|_| ())
    }

    /// Decodes one data item with no predeclared destination shape.
    pub(crate) fn decode_blind(&mut self, hdr: (Major, u8)) -> Result<Value, Error> {
        let (major, info) = hdr;
        match major {
            Major::Unsigned => Ok(match info {
                0..=24 => Value::U8(self.parser.parse_uint8()?),
                25 => Value::U16(self.parser.parse_uint16()?),
                26 => Value::U32(self.parser.parse_uint32()?),
                _ => Value::U64(self.parser.parse_uint64()?),
            }),
            Major::Negative => Ok(match info {
                0..=24 => Value::I8(negative_i8(self.parser.parse_uint8()?)?),
                25 => Value::I16(negative_i16(self.parser.parse_uint16()?)?),
                26 => Value::I32(negative_i32(self.parser.parse_uint32()?)?),
                _ => Value::I64(negative_i64(self.parser.parse_uint64()?)?),
            }),
            Major::Bytes => Ok(Value::Bytes(self.decode_string_payload(hdr)?)),
            Major::Text => Ok(Value::Text(self.decode_text_payload(hdr)?)),
            Major::Array => self.descend(|d| {
                let mut items = Vec::new();
                if info != 31 {
                    let n: usize = d.parser.buflen().try_into()?;
                    for _ in 0..n {
                        let hdr = d.parse()?;
                        if d.parser.is_break() {
                            return Err(Error::UnexpectedBreak);
                        }
                        items.push(d.decode_blind(hdr)?);
                    }
                } else {
                    loop {
                        let hdr = d.parse()?;
                        if d.parser.is_break() {
                            break;
                        }
                        items.push(d.decode_blind(hdr)?);
                    }
                }
                Ok(Value::Array(items))
            }),
            Major::Map => self.descend(|d| {
                let mut pairs: Vec<(Value, Value)> = Vec::new();
                if info != 31 {
                    let n: usize = d.parser.buflen().try_into()?;
                    for _ in 0..n {
                        let hdr = d.parse()?;
                        if d.parser.is_break() {
                            return Err(Error::UnexpectedBreak);
                        }
                        let key = d.decode_blind(hdr)?;
                        d.push_blind_pair(&mut pairs, key)?;
                    }
                } else {
                    loop {
                        let hdr = d.parse()?;
                        if d.parser.is_break() {
                            break;
                        }
                        let key = d.decode_blind(hdr)?;
                        d.push_blind_pair(&mut pairs, key)?;
                    }
                }
                Ok(Value::Map(pairs))
            }),
            Major::Tag => self.descend(|d| d.decode_tag(d.parser.buflen())),
            Major::Simple => match info {
                20 => Ok(Value::Bool(false)),
                21 => Ok(Value::Bool(true)),
                22 => Ok(Value::Null),
                23 => Ok(Value::Undefined),
                24 => Err(Error::UnsupportedSimple(self.parser.buflen() as u8)),
                25 => Ok(Value::F16(self.parser.parse_float16()?)),
                26 => Ok(Value::F32(self.parser.parse_float32()?)),
                27 => Ok(Value::F64(self.parser.parse_float64()?)),
                31 => Err(Error::UnexpectedBreak),
                _ => Err(Error::UnsupportedSimple(info)),
            },
        }
    }

    fn push_blind_pair(&mut self, pairs: &mut Vec<(Value, Value)>, key: Value) -> Result<(), Error> {
        if self.strict && pairs.iter().any(|(k, _)| *k == key) {
            return Err(Error::DuplicateKey(format!("{key:?}")));
        }
        let hdr = self.parse()?;
        if self.parser.is_break() {
            return Err(Error::PartialMap);
        }
        let value = self.decode_blind(hdr)?;
        // A duplicated key overwrites, as with the typed map destinations.
        pairs.retain(|(k, _)| *k != key);
        pairs.push((key, value));
        Ok(())
    }
}

pub(crate) fn negative_i8(arg: u8) -> Result<i8, Error> {
    Ok(i8::try_from(-1i16 - i16::from(arg))?)
}

pub(crate) fn negative_i16(arg: u16) -> Result<i16, Error> {
    Ok(i16::try_from(-1i32 - i32::from(arg))?)
}

pub(crate) fn negative_i32(arg: u32) -> Result<i32, Error> {
    Ok(i32::try_from(-1i64 - i64::from(arg))?)
}

pub(crate) fn negative_i64(arg: u64) -> Result<i64, Error> {
    Ok(i64::try_from(-1i128 - i128::from(arg))?)
}

impl Decode for u8 {
    const KIND: TargetKind = TargetKind::U8;

    fn decode_value(d: &mut Decoder, _: (Major, u8)) -> Result<Self, Error> {
        Ok(d.parser.parse_uint8()?)
    }
}

impl Decode for u16 {
    const KIND: TargetKind = TargetKind::U16;

    fn decode_value(d: &mut Decoder, _: (Major, u8)) -> Result<Self, Error> {
        Ok(d.parser.parse_uint16()?)
    }
}

impl Decode for u32 {
    const KIND: TargetKind = TargetKind::U32;

    fn decode_value(d: &mut Decoder, _: (Major, u8)) -> Result<Self, Error> {
        Ok(d.parser.parse_uint32()?)
    }
}

impl Decode for u64 {
    const KIND: TargetKind = TargetKind::U64;

    fn decode_value(d: &mut Decoder, _: (Major, u8)) -> Result<Self, Error> {
        Ok(d.parser.parse_uint64()?)
    }
}

impl Decode for i8 {
    const KIND: TargetKind = TargetKind::I8;

    fn decode_value(d: &mut Decoder, _: (Major, u8)) -> Result<Self, Error> {
        let arg = d.parser.parse_uint8()?;
        negative_i8(arg)
    }
}

impl Decode for i16 {
    const KIND: TargetKind = TargetKind::I16;

    fn decode_value(d: &mut Decoder, _: (Major, u8)) -> Result<Self, Error> {
        let arg = d.parser.parse_uint16()?;
        negative_i16(arg)
    }
}

impl Decode for i32 {
    const KIND: TargetKind = TargetKind::I32;

    fn decode_value(d: &mut Decoder, _: (Major, u8)) -> Result<Self, Error> {
        let arg = d.parser.parse_uint32()?;
        negative_i32(arg)
    }
}

impl Decode for i64 {
    const KIND: TargetKind = TargetKind::I64;

    fn decode_value(d: &mut Decoder, _: (Major, u8)) -> Result<Self, Error> {
        let arg = d.parser.parse_uint64()?;
        negative_i64(arg)
    }
}

impl Decode for bool {
    const KIND: TargetKind = TargetKind::Bool;

    fn decode_value(d: &mut Decoder, _: (Major, u8)) -> Result<Self, Error> {
        Ok(d.parser.parse_bool())
    }
}

impl Decode for half::f16 {
    const KIND: TargetKind = TargetKind::F16;

    fn decode_value(d: &mut Decoder, _: (Major, u8)) -> Result<Self, Error> {
        Ok(d.parser.parse_float16()?)
    }
}

impl Decode for f32 {
    const KIND: TargetKind = TargetKind::F32;

    fn decode_value(d: &mut Decoder, hdr: (Major, u8)) -> Result<Self, Error> {
        match hdr.0 {
            Major::Simple => Ok(d.parser.parse_float32()?),
            Major::Tag => d.decode_decimal_fraction(d.parser.buflen()),
            _ => unreachable!(),
        }
    }
}

impl Decode for f64 {
    const KIND: TargetKind = TargetKind::F64;

    fn decode_value(d: &mut Decoder, _: (Major, u8)) -> Result<Self, Error> {
        Ok(d.parser.parse_float64()?)
    }
}

impl Decode for Bytes {
    const KIND: TargetKind = TargetKind::Bytes;

    fn decode_value(d: &mut Decoder, hdr: (Major, u8)) -> Result<Self, Error> {
        Ok(Bytes(d.decode_string_payload(hdr)?))
    }
}

impl Decode for String {
    const KIND: TargetKind = TargetKind::Text;

    fn decode_value(d: &mut Decoder, hdr: (Major, u8)) -> Result<Self, Error> {
        match hdr.0 {
            Major::Tag => match d.parser.buflen() {
                34 => d.decode_base64_text(),
                id => Err(Error::TagContent(
                    id,
                    "only tag 34 decodes into a text destination".to_string(),
                )),
            },
            _ => d.decode_text_payload(hdr),
        }
    }
}

impl Decode for Value {
    const KIND: TargetKind = TargetKind::Any;

    fn decode_value(d: &mut Decoder, hdr: (Major, u8)) -> Result<Self, Error> {
        d.decode_blind(hdr)
    }
}

impl<T: Decode> Decode for Option<T> {
    const KIND: TargetKind = TargetKind::Any;

    fn decode_value(d: &mut Decoder, hdr: (Major, u8)) -> Result<Self, Error> {
        if d.parser.is_null() || d.parser.is_undefined() {
            return Ok(None);
        }
        d.decode_after_header(hdr).map(Some)
    }
}

impl<T: Decode> Decode for Vec<T> {
    const KIND: TargetKind = TargetKind::Array;

    fn decode_value(d: &mut Decoder, (_, info): (Major, u8)) -> Result<Self, Error> {
        d.descend(|d| {
            let mut items = Vec::new();
            if info != 31 {
                let n: usize = d.parser.buflen().try_into()?;
                for _ in 0..n {
                    let hdr = d.parse()?;
                    if d.parser.is_break() {
                        return Err(Error::UnexpectedBreak);
                    }
                    items.push(d.decode_after_header(hdr)?);
                }
            } else {
                loop {
                    let hdr = d.parse()?;
                    if d.parser.is_break() {
                        break;
                    }
                    items.push(d.decode_after_header(hdr)?);
                }
            }
            Ok(items)
        })
    }
}

impl<K, V> Decode for HashMap<K, V>
where
    K: Decode + Eq + Hash + std::fmt::Debug,
    V: Decode,
{
    const KIND: TargetKind = TargetKind::Map;

    fn decode_value(d: &mut Decoder, (_, info): (Major, u8)) -> Result<Self, Error> {
        d.descend(|d| {
            let mut out = HashMap::new();
            if info != 31 {
                let n: usize = d.parser.buflen().try_into()?;
                for _ in 0..n {
                    let hdr = d.parse()?;
                    if d.parser.is_break() {
                        return Err(Error::UnexpectedBreak);
                    }
                    let key: K = d.decode_after_header(hdr)?;
                    if d.strict && out.contains_key(&key) {
                        return Err(Error::DuplicateKey(format!("{key:?}")));
                    }
                    let hdr = d.parse()?;
                    if d.parser.is_break() {
                        return Err(Error::PartialMap);
                    }
                    out.insert(key, d.decode_after_header(hdr)?);
                }
            } else {
                loop {
                    let hdr = d.parse()?;
                    if d.parser.is_break() {
                        break;
                    }
                    let key: K = d.decode_after_header(hdr)?;
                    if d.strict && out.contains_key(&key) {
                        return Err(Error::DuplicateKey(format!("{key:?}")));
                    }
                    let hdr = d.parse()?;
                    if d.parser.is_break() {
                        return Err(Error::PartialMap);
                    }
                    out.insert(key, d.decode_after_header(hdr)?);
                }
            }
            Ok(out)
        })
    }
}

impl<K, V> Decode for BTreeMap<K, V>
where
    K: Decode + Ord + std::fmt::Debug,
    V: Decode,
{
    const KIND: TargetKind = TargetKind::Map;

    fn decode_value(d: &mut Decoder, (_, info): (Major, u8)) -> Result<Self, Error> {
        d.descend(|d| {
            let mut out = BTreeMap::new();
            if info != 31 {
                let n: usize = d.parser.buflen().try_into()?;
                for _ in 0..n {
                    let hdr = d.parse()?;
                    if d.parser.is_break() {
                        return Err(Error::UnexpectedBreak);
                    }
                    let key: K = d.decode_after_header(hdr)?;
                    if d.strict && out.contains_key(&key) {
                        return Err(Error::DuplicateKey(format!("{key:?}")));
                    }
                    let hdr = d.parse()?;
                    if d.parser.is_break() {
                        return Err(Error::PartialMap);
                    }
                    out.insert(key, d.decode_after_header(hdr)?);
                }
            } else {
                loop {
                    let hdr = d.parse()?;
                    if d.parser.is_break() {
                        break;
                    }
                    let key: K = d.decode_after_header(hdr)?;
                    if d.strict && out.contains_key(&key) {
                        return Err(Error::DuplicateKey(format!("{key:?}")));
                    }
                    let hdr = d.parse()?;
                    if d.parser.is_break() {
                        return Err(Error::PartialMap);
                    }
                    out.insert(key, d.decode_after_header(hdr)?);
                }
            }
            Ok(out)
        })
    }
}
