use crate::parser::Major;
use crate::registry;
use crate::value::{Bytes, Mime, Value};
use base64::prelude::*;
use num_bigint::{BigInt, Sign};
use num_rational::BigRational;
use num_traits::{Float, ToPrimitive};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("canonical mode: {0}")]
    CanonicalMode(String),

    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("while encoding big num: {0}")]
    BigNum(String),

    #[error("while encoding big float: {0}")]
    BigFloat(String),

    #[error("while encoding date-time: {0}")]
    DateTime(String),

    #[error("while encoding record field {field}: {source}")]
    Record {
        field: &'static str,
        source: Box<Error>,
    },
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EncodeOptions {
    /// Shortest-form arguments, canonical NaN/Infinity, map keys sorted by
    /// encoded byte sequence.
    pub canonical: bool,
    /// Reject values that would otherwise be emitted as an approximation.
    pub strict: bool,
}

/// Emits one data item at a time: a header byte, then the narrowest
/// argument encoding for the value, then any payload.
pub struct Composer<'a> {
    w: &'a mut dyn std::io::Write,
    header: u8,
    canonical: bool,
    strict: bool,
}

impl<'a> Composer<'a> {
    pub fn new(w: &'a mut dyn std::io::Write) -> Self {
        Self::with_options(w, EncodeOptions::default())
    }

    pub fn with_options(w: &'a mut dyn std::io::Write, options: EncodeOptions) -> Self {
        Self {
            w,
            header: 0,
            canonical: options.canonical,
            strict: options.strict,
        }
    }

    pub fn is_canonical(&self) -> bool {
        self.canonical
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// The most recently written header byte.
    pub fn header(&self) -> u8 {
        self.header
    }

    pub(crate) fn write_raw(&mut self, buf: &[u8]) -> Result<(), Error> {
        if buf.is_empty() {
            return Ok(());
        }
        self.w.write_all(buf)?;
        Ok(())
    }

    /// Writes the header byte for a (major, additional-info) pair.
    pub fn compose_information(&mut self, major: Major, info: u8) -> Result<(), Error> {
        self.header = ((major as u8) << 5) | info;
        let header = self.header;
        self.write_raw(&[header])
    }

    /// Writes `value` as the argument of `major` in the fewest bytes.
    pub fn compose_uint(&mut self, major: Major, value: u64) -> Result<(), Error> {
        if value < 24 {
            self.compose_information(major, value as u8)
        } else if value <= u64::from(u8::MAX) {
            self.compose_information(major, 24)?;
            self.compose_uint8(value as u8)
        } else if value <= u64::from(u16::MAX) {
            self.compose_information(major, 25)?;
            self.compose_uint16(value as u16)
        } else if value <= u64::from(u32::MAX) {
            self.compose_information(major, 26)?;
            self.compose_uint32(value as u32)
        } else {
            self.compose_information(major, 27)?;
            self.compose_uint64(value)
        }
    }

    /// Writes a one-byte argument. Canonical mode refuses values below 24,
    /// which must ride inline in the header byte.
    pub fn compose_uint8(&mut self, value: u8) -> Result<(), Error> {
        if self.canonical && value < 24 {
            return Err(Error::CanonicalMode(format!(
                "{value} must be sent inline in the header byte"
            )));
        }
        self.write_raw(&[value])
    }

    pub fn compose_uint16(&mut self, value: u16) -> Result<(), Error> {
        self.write_raw(&value.to_be_bytes())
    }

    pub fn compose_uint32(&mut self, value: u32) -> Result<(), Error> {
        self.write_raw(&value.to_be_bytes())
    }

    pub fn compose_uint64(&mut self, value: u64) -> Result<(), Error> {
        self.write_raw(&value.to_be_bytes())
    }

    pub fn compose_int(&mut self, value: i64) -> Result<(), Error> {
        if value < 0 {
            self.compose_uint(Major::Negative, !value as u64)
        } else {
            self.compose_uint(Major::Unsigned, value as u64)
        }
    }

    pub fn compose_bool(&mut self, value: bool) -> Result<(), Error> {
        self.compose_information(Major::Simple, if value { 21 } else { 20 })
    }

    pub fn compose_null(&mut self) -> Result<(), Error> {
        self.compose_information(Major::Simple, 22)
    }

    pub fn compose_undefined(&mut self) -> Result<(), Error> {
        self.compose_information(Major::Simple, 23)
    }

    pub fn compose_float16(&mut self, value: half::f16) -> Result<(), Error> {
        self.compose_information(Major::Simple, 25)?;
        self.write_raw(&value.to_be_bytes())
    }

    pub fn compose_float32(&mut self, value: f32) -> Result<(), Error> {
        self.compose_information(Major::Simple, 26)?;
        self.write_raw(&value.to_be_bytes())
    }

    pub fn compose_float64(&mut self, value: f64) -> Result<(), Error> {
        self.compose_information(Major::Simple, 27)?;
        self.write_raw(&value.to_be_bytes())
    }

    /// Single-precision quiet NaN.
    pub fn compose_nan(&mut self) -> Result<(), Error> {
        self.write_raw(&[0xFA, 0x7F, 0xC0, 0x00, 0x00])
    }

    /// Single-precision infinity.
    pub fn compose_infinity(&mut self, negative: bool) -> Result<(), Error> {
        if negative {
            self.write_raw(&[0xFA, 0xFF, 0x80, 0x00, 0x00])
        } else {
            self.write_raw(&[0xFA, 0x7F, 0x80, 0x00, 0x00])
        }
    }

    /// Double-precision quiet NaN.
    pub fn compose_double_precision_nan(&mut self) -> Result<(), Error> {
        self.write_raw(&[0xFB, 0x7F, 0xF8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
    }

    /// Double-precision infinity.
    pub fn compose_double_precision_infinity(&mut self, negative: bool) -> Result<(), Error> {
        if negative {
            self.write_raw(&[0xFB, 0xFF, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
        } else {
            self.write_raw(&[0xFB, 0x7F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
        }
    }

    /// The canonical (half-precision) NaN, `0xf9 0x7e 0x00`.
    pub fn compose_canonical_nan(&mut self) -> Result<(), Error> {
        self.write_raw(&[0xF9, 0x7E, 0x00])
    }

    /// The canonical (half-precision) infinities, `0xf9 0x7c/0xfc 0x00`.
    pub fn compose_canonical_infinity(&mut self, negative: bool) -> Result<(), Error> {
        if negative {
            self.write_raw(&[0xF9, 0xFC, 0x00])
        } else {
            self.write_raw(&[0xF9, 0x7C, 0x00])
        }
    }

    pub fn compose_bytes(&mut self, value: &[u8]) -> Result<(), Error> {
        self.compose_uint(Major::Bytes, value.len() as u64)?;
        self.write_raw(value)
    }

    /// Text strings are byte strings with major 3; the UTF-8 bytes are
    /// written as-is.
    pub fn compose_string(&mut self, value: &str) -> Result<(), Error> {
        self.compose_uint(Major::Text, value.len() as u64)?;
        self.write_raw(value.as_bytes())
    }

    pub fn compose_tag(&mut self, id: u64) -> Result<(), Error> {
        self.compose_uint(Major::Tag, id)
    }

    /// Tag 2 prelude plus the magnitude as a big-endian byte string.
    pub fn compose_big_uint(&mut self, value: &BigInt) -> Result<(), Error> {
        if value.sign() == Sign::Minus {
            return Err(Error::BigNum(format!("{value} is negative, tag 2 carries non-negatives")));
        }
        self.compose_tag(2)?;
        self.compose_bytes(&value.to_bytes_be().1)
    }

    /// Tag 3 prelude plus `-1 - value` as a big-endian byte string.
    pub fn compose_big_int(&mut self, value: &BigInt) -> Result<(), Error> {
        if value.sign() != Sign::Minus {
            return Err(Error::BigNum(format!("{value} is not negative, tag 3 carries negatives")));
        }
        self.compose_tag(3)?;
        let magnitude = -value - BigInt::from(1);
        self.compose_bytes(&magnitude.to_bytes_be().1)
    }

    /// Tag 1 prelude plus the Unix timestamp as an integer argument.
    pub fn compose_epoch_date_time(&mut self, value: &OffsetDateTime) -> Result<(), Error> {
        if self.strict && value.nanosecond() != 0 {
            return Err(Error::DateTime(format!(
                "{value} carries sub-second precision that an epoch integer would lose"
            )));
        }
        self.compose_tag(1)?;
        self.compose_int(value.unix_timestamp())
    }

    /// Tag 5 prelude plus `[exp, mant]` such that `value = mant * 2^exp`.
    ///
    /// Exact whenever the reduced denominator is a power of two; otherwise
    /// strict mode rejects the value and non-strict mode encodes the
    /// nearest double.
    pub fn compose_big_float(&mut self, value: &BigRational) -> Result<(), Error> {
        let (exp, mant) = match power_of_two_parts(value) {
            Some(parts) => parts,
            None if self.strict => {
                return Err(Error::BigFloat(format!(
                    "denominator of {value} is not a power of two"
                )))
            }
            None => {
                let approx = value
                    .to_f64()
                    .filter(|f| f.is_finite())
                    .ok_or_else(|| Error::BigFloat(format!("{value} is not representable")))?;
                float_parts(approx)
            }
        };
        self.compose_tag(5)?;
        self.compose_information(Major::Array, 2)?;
        self.compose_int(exp)?;
        match i64::try_from(&mant) {
            Ok(m) => self.compose_int(m),
            Err(_) if mant.sign() == Sign::Minus => self.compose_big_int(&mant),
            Err(_) => self.compose_big_uint(&mant),
        }
    }

    /// Tag 35 prelude plus the pattern as a text string.
    pub fn compose_regexp(&mut self, value: &regex::Regex) -> Result<(), Error> {
        self.compose_tag(35)?;
        self.compose_string(value.as_str())
    }

    /// Tag 36 prelude plus the formatted media type.
    pub fn compose_mime(&mut self, value: &Mime) -> Result<(), Error> {
        self.compose_tag(36)?;
        self.compose_string(&value.to_string())
    }
}

/// `(exp, mant)` with `value = mant * 2^exp`, when the reduced denominator
/// is a power of two.
fn power_of_two_parts(value: &BigRational) -> Option<(i64, BigInt)> {
    let denom = value.denom();
    if denom.magnitude().count_ones() != 1 {
        return None;
    }
    let shift = denom.trailing_zeros().unwrap_or(0);
    Some((-(i64::try_from(shift).ok()?), value.numer().clone()))
}

/// Exact `(exp, mant)` decomposition of a finite double.
fn float_parts(value: f64) -> (i64, BigInt) {
    let (mantissa, exponent, sign) = Float::integer_decode(value);
    let mut mant = BigInt::from(mantissa);
    if sign < 0 {
        mant = -mant;
    }
    (i64::from(exponent), mant)
}

/// Writes CBOR data items to an output stream.
///
/// Known value shapes go through the monomorphic [`Encode`]
/// implementations; containers, records and dynamic values take the
/// generic path. An `Encoder` is not safe for concurrent use.
pub struct Encoder<'a> {
    composer: Composer<'a>,
}

/// A value that can be encoded as a single CBOR data item.
pub trait Encode {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error>;
}

impl<'a> Encoder<'a> {
    pub fn new(w: &'a mut dyn std::io::Write) -> Self {
        Self::with_options(w, EncodeOptions::default())
    }

    pub fn with_options(w: &'a mut dyn std::io::Write, options: EncodeOptions) -> Self {
        Self {
            composer: Composer::with_options(w, options),
        }
    }

    pub fn is_canonical(&self) -> bool {
        self.composer.is_canonical()
    }

    pub fn is_strict(&self) -> bool {
        self.composer.is_strict()
    }

    pub fn composer(&mut self) -> &mut Composer<'a> {
        &mut self.composer
    }

    fn options(&self) -> EncodeOptions {
        EncodeOptions {
            canonical: self.composer.canonical,
            strict: self.composer.strict,
        }
    }

    /// Writes `value` as one data item.
    pub fn encode<T: Encode + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        value.encode(self)
    }

    /// Writes a value of a type known only at run time through the handler
    /// registered for it.
    pub fn encode_any(&mut self, value: &dyn Any) -> Result<(), Error> {
        match registry::lookup_type(value.type_id()) {
            Some((_, encode)) => encode(value, self),
            None => Err(Error::UnsupportedValue(
                "type is not a registered extension".to_string(),
            )),
        }
    }

    /// Emits a map header for `len` pairs followed by the encoded pairs,
    /// sorted by encoded key bytes in canonical mode.
    fn encode_map_pairs<'v, K, V>(
        &mut self,
        len: usize,
        pairs: impl Iterator<Item = (&'v K, &'v V)>,
    ) -> Result<(), Error>
    where
        K: Encode + 'v + ?Sized,
        V: Encode + 'v + ?Sized,
    {
        self.composer.compose_uint(Major::Map, len as u64)?;
        if self.is_canonical() {
            let options = self.options();
            let mut encoded = Vec::with_capacity(len);
            for (key, value) in pairs {
                let mut key_buf = Vec::new();
                Encoder::with_options(&mut key_buf, options).encode(key)?;
                let mut value_buf = Vec::new();
                Encoder::with_options(&mut value_buf, options).encode(value)?;
                encoded.push((key_buf, value_buf));
            }
            // RFC 7049 3.9: shorter keys sort first, then byte-wise.
            encoded.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| a.0.cmp(&b.0)));
            for (key_buf, value_buf) in encoded {
                self.composer.write_raw(&key_buf)?;
                self.composer.write_raw(&value_buf)?;
            }
            Ok(())
        } else {
            for (key, value) in pairs {
                self.encode(key)?;
                self.encode(value)?;
            }
            Ok(())
        }
    }
}

pub(crate) fn encode_float16(c: &mut Composer, value: half::f16) -> Result<(), Error> {
    if value.is_nan() {
        c.compose_canonical_nan()
    } else if value.is_infinite() {
        c.compose_canonical_infinity(value.is_sign_negative())
    } else {
        c.compose_float16(value)
    }
}

pub(crate) fn encode_float32(c: &mut Composer, value: f32) -> Result<(), Error> {
    if value.is_nan() {
        if c.is_canonical() {
            c.compose_canonical_nan()
        } else {
            c.compose_nan()
        }
    } else if value.is_infinite() {
        if c.is_canonical() {
            c.compose_canonical_infinity(value.is_sign_negative())
        } else {
            c.compose_infinity(value.is_sign_negative())
        }
    } else {
        c.compose_float32(value)
    }
}

pub(crate) fn encode_float64(c: &mut Composer, value: f64) -> Result<(), Error> {
    if value.is_nan() {
        if c.is_canonical() {
            c.compose_canonical_nan()
        } else {
            c.compose_double_precision_nan()
        }
    } else if value.is_infinite() {
        if c.is_canonical() {
            c.compose_canonical_infinity(value.is_sign_negative())
        } else {
            c.compose_double_precision_infinity(value.is_sign_negative())
        }
    } else {
        c.compose_float64(value)
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        (**self).encode(enc)
    }
}

impl Encode for () {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        enc.composer.compose_null()
    }
}

impl Encode for bool {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        enc.composer.compose_bool(*self)
    }
}

macro_rules! encode_unsigned {
    ($($t:ty),*) => {
        $(impl Encode for $t {
            fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
                enc.composer.compose_uint(Major::Unsigned, *self as u64)
            }
        })*
    };
}

macro_rules! encode_signed {
    ($($t:ty),*) => {
        $(impl Encode for $t {
            fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
                enc.composer.compose_int(*self as i64)
            }
        })*
    };
}

encode_unsigned!(u8, u16, u32, u64, usize);
encode_signed!(i8, i16, i32, i64, isize);

impl Encode for half::f16 {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        encode_float16(&mut enc.composer, *self)
    }
}

impl Encode for f32 {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        encode_float32(&mut enc.composer, *self)
    }
}

impl Encode for f64 {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        encode_float64(&mut enc.composer, *self)
    }
}

impl Encode for str {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        enc.composer.compose_string(self)
    }
}

impl Encode for String {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        enc.composer.compose_string(self)
    }
}

impl Encode for Bytes {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        enc.composer.compose_bytes(&self.0)
    }
}

impl Encode for BigInt {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        if self.sign() == Sign::Minus {
            enc.composer.compose_big_int(self)
        } else {
            enc.composer.compose_big_uint(self)
        }
    }
}

impl Encode for OffsetDateTime {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        enc.composer.compose_epoch_date_time(self)
    }
}

impl Encode for BigRational {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        enc.composer.compose_big_float(self)
    }
}

impl Encode for Mime {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        enc.composer.compose_mime(self)
    }
}

impl Encode for url::Url {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        enc.composer.compose_tag(32)?;
        enc.composer.compose_string(self.as_str())
    }
}

impl Encode for regex::Regex {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        enc.composer.compose_regexp(self)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        match self {
            Some(value) => value.encode(enc),
            None => enc.composer.compose_null(),
        }
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        enc.composer.compose_uint(Major::Array, self.len() as u64)?;
        for item in self {
            item.encode(enc)?;
        }
        Ok(())
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        self.as_slice().encode(enc)
    }
}

impl<K: Encode, V: Encode> Encode for HashMap<K, V> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        enc.encode_map_pairs(self.len(), self.iter())
    }
}

impl<K: Encode, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        enc.encode_map_pairs(self.len(), self.iter())
    }
}

impl Encode for Value {
    fn encode(&self, enc: &mut Encoder) -> Result<(), Error> {
        match self {
            Value::Null => enc.composer.compose_null(),
            Value::Undefined => enc.composer.compose_undefined(),
            Value::Bool(v) => enc.composer.compose_bool(*v),
            Value::U8(v) => enc.composer.compose_uint(Major::Unsigned, u64::from(*v)),
            Value::U16(v) => enc.composer.compose_uint(Major::Unsigned, u64::from(*v)),
            Value::U32(v) => enc.composer.compose_uint(Major::Unsigned, u64::from(*v)),
            Value::U64(v) => enc.composer.compose_uint(Major::Unsigned, *v),
            Value::I8(v) => enc.composer.compose_int(i64::from(*v)),
            Value::I16(v) => enc.composer.compose_int(i64::from(*v)),
            Value::I32(v) => enc.composer.compose_int(i64::from(*v)),
            Value::I64(v) => enc.composer.compose_int(*v),
            Value::F16(v) => encode_float16(&mut enc.composer, *v),
            Value::F32(v) => encode_float32(&mut enc.composer, *v),
            Value::F64(v) => encode_float64(&mut enc.composer, *v),
            Value::Bytes(v) => enc.composer.compose_bytes(v),
            Value::Text(v) => enc.composer.compose_string(v),
            Value::Array(items) => {
                enc.composer.compose_uint(Major::Array, items.len() as u64)?;
                for item in items {
                    item.encode(enc)?;
                }
                Ok(())
            }
            Value::Map(pairs) => {
                enc.encode_map_pairs(pairs.len(), pairs.iter().map(|(k, v)| (k, v)))
            }
            Value::BigNum(v) => v.encode(enc),
            Value::Tag(id, inner) => {
                enc.composer.compose_tag(*id)?;
                inner.encode(enc)
            }
            Value::DateTime(v) => enc.composer.compose_epoch_date_time(v),
            Value::Rational(v) => enc.composer.compose_big_float(v),
            Value::Base64Url(v) => {
                let payload = BASE64_URL_SAFE
                    .decode(v)
                    .map_err(|e| Error::UnsupportedValue(format!("invalid base64url data: {e}")))?;
                enc.composer.compose_tag(21)?;
                enc.composer.compose_bytes(&payload)
            }
            Value::Base64(v) => {
                let payload = BASE64_STANDARD
                    .decode(v)
                    .map_err(|e| Error::UnsupportedValue(format!("invalid base64 data: {e}")))?;
                enc.composer.compose_tag(22)?;
                enc.composer.compose_bytes(&payload)
            }
            Value::Base16(v) => {
                let payload = hex::decode(v)
                    .map_err(|e| Error::UnsupportedValue(format!("invalid base16 data: {e}")))?;
                enc.composer.compose_tag(23)?;
                enc.composer.compose_bytes(&payload)
            }
            Value::Url(v) => v.encode(enc),
            Value::Regexp(v) => enc.composer.compose_regexp(v),
            Value::Mime(v) => enc.composer.compose_mime(v),
        }
    }
}
