//! Decode semantics for the RFC 7049 built-in tag registry (section 2.4).

use crate::decode::{header_type_name, negative_i64, Decode, Decoder, Error, TargetKind};
use crate::parser::Major;
use crate::registry;
use crate::value::{Mime, Value};
use base64::prelude::*;
use num_bigint::{BigInt, Sign};
use num_rational::BigRational;
use regex::Regex;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use url::Url;

// Exponents past this magnitude would make tag 5 rationals allocate
// gigabyte-sized integers from a few bytes of input.
const MAX_BIG_FLOAT_EXP: i64 = 1 << 20;

impl Decoder<'_> {
    /// Dispatches a major-6 item by tag id: built-in tags per RFC 7049,
    /// then the process-wide tag registry, then (non-strict only)
    /// preservation as [`Value::Tag`].
    pub(crate) fn decode_tag(&mut self, id: u64) -> Result<Value, Error> {
        match id {
            0 => self.decode_string_date_time().map(Value::DateTime),
            1 => self.decode_epoch_date_time().map(Value::DateTime),
            2 => self.decode_positive_bignum().map(Value::BigNum),
            3 => self.decode_negative_bignum().map(Value::BigNum),
            4 => self.decode_decimal_fraction(4).map(Value::F32),
            5 => self.decode_big_float().map(Value::Rational),
            21 => Ok(Value::Base64Url(
                BASE64_URL_SAFE
                    .encode(self.decode_tagged_payload(21)?)
                    .into_bytes(),
            )),
            22 => Ok(Value::Base64(
                BASE64_STANDARD
                    .encode(self.decode_tagged_payload(22)?)
                    .into_bytes(),
            )),
            23 => Ok(Value::Base16(
                hex::encode(self.decode_tagged_payload(23)?).into_bytes(),
            )),
            24 => {
                // Embedded CBOR data item, surfaced verbatim.
                let hdr = self.parse()?;
                if hdr.0 != Major::Bytes {
                    return Err(Error::TagContent(
                        24,
                        format!("expected byte string, found {}", hdr.0),
                    ));
                }
                let payload = self.decode_string_payload(hdr)?;
                Ok(Value::Tag(24, Box::new(Value::Bytes(payload))))
            }
            32 => self.decode_uri().map(Value::Url),
            33 => self.decode_base64_uri().map(Value::Url),
            34 => self.decode_base64_text().map(Value::Text),
            35 => self.decode_regexp().map(Value::Regexp),
            36 => self.decode_mime().map(Value::Mime),
            _ => match registry::lookup_tag(id) {
                Some(handler) => handler(self),
                None if !self.is_strict() => {
                    let hdr = self.parse()?;
                    if self.parser.is_break() {
                        return Err(Error::UnexpectedBreak);
                    }
                    let inner = self.descend(|d| d.decode_blind(hdr))?;
                    Ok(Value::Tag(id, Box::new(inner)))
                }
                None => Err(Error::UnknownTag(id)),
            },
        }
    }

    /// Tag 0: an RFC 3339 date-time string.
    pub(crate) fn decode_string_date_time(&mut self) -> Result<OffsetDateTime, Error> {
        let hdr = self.parse()?;
        if hdr.0 != Major::Text {
            return Err(Error::TagContent(
                0,
                format!("expected UTF-8 string, found {}", hdr.0),
            ));
        }
        self.rfc3339_date_time(hdr)
    }

    fn rfc3339_date_time(&mut self, hdr: (Major, u8)) -> Result<OffsetDateTime, Error> {
        let text = self.decode_text_payload(hdr)?;
        OffsetDateTime::parse(&text, &Rfc3339).map_err(|e| Error::TagContent(0, e.to_string()))
    }

    /// Tag 1: seconds since the Unix epoch as an integer or float.
    pub(crate) fn decode_epoch_date_time(&mut self) -> Result<OffsetDateTime, Error> {
        let hdr = self.parse()?;
        self.epoch_date_time(hdr)
    }

    fn epoch_date_time(&mut self, (major, info): (Major, u8)) -> Result<OffsetDateTime, Error> {
        match major {
            Major::Unsigned => {
                let secs = i64::try_from(self.parser.buflen())?;
                OffsetDateTime::from_unix_timestamp(secs)
                    .map_err(|e| Error::TagContent(1, e.to_string()))
            }
            Major::Negative => {
                let secs = negative_i64(self.parser.buflen())?;
                OffsetDateTime::from_unix_timestamp(secs)
                    .map_err(|e| Error::TagContent(1, e.to_string()))
            }
            Major::Simple if matches!(info, 25 | 26 | 27) => {
                let secs = match info {
                    25 => f64::from(self.parser.parse_float16()?),
                    26 => f64::from(self.parser.parse_float32()?),
                    _ => self.parser.parse_float64()?,
                };
                if !secs.is_finite() {
                    return Err(Error::TagContent(1, format!("{secs} is not a timestamp")));
                }
                OffsetDateTime::UNIX_EPOCH
                    .checked_add(time::Duration::saturating_seconds_f64(secs))
                    .ok_or_else(|| Error::TagContent(1, format!("{secs} is out of range")))
            }
            _ => Err(Error::TagContent(
                1,
                format!("can't decode {major} as an epoch timestamp"),
            )),
        }
    }

    /// Tag 2: an unsigned bignum carried as a big-endian byte string.
    pub(crate) fn decode_positive_bignum(&mut self) -> Result<BigInt, Error> {
        Ok(BigInt::from_bytes_be(
            Sign::Plus,
            &self.bignum_payload(2)?,
        ))
    }

    /// Tag 3: `-1 - n` for the big-endian byte string `n`.
    pub(crate) fn decode_negative_bignum(&mut self) -> Result<BigInt, Error> {
        let magnitude = BigInt::from_bytes_be(Sign::Plus, &self.bignum_payload(3)?);
        Ok(BigInt::from(-1) - magnitude)
    }

    fn bignum_payload(&mut self, id: u64) -> Result<Vec<u8>, Error> {
        let hdr = self.parse()?;
        if hdr.0 != Major::Bytes {
            return Err(Error::TagContent(
                id,
                format!("expected byte string, found {}", hdr.0),
            ));
        }
        self.decode_string_payload(hdr)
    }

    /// Tag 4: `mant * 10^exp` as a single-precision float.
    pub(crate) fn decode_decimal_fraction(&mut self, id: u64) -> Result<f32, Error> {
        if id != 4 {
            return Err(Error::TagContent(
                id,
                "only tag 4 decodes into a single-precision float".to_string(),
            ));
        }
        self.open_exponent_array(4)?;
        let exp = self.tag_integer(4, "exponent")?;
        let mant = self.tag_integer(4, "mantissa")?;
        let exp = exp.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        Ok((mant as f64 * 10f64.powi(exp)) as f32)
    }

    /// Tag 5: `mant * 2^exp` kept exact as a rational.
    pub(crate) fn decode_big_float(&mut self) -> Result<BigRational, Error> {
        self.open_exponent_array(5)?;
        let exp = self.tag_integer(5, "exponent")?;
        let mant = {
            let hdr = self.parse()?;
            match hdr.0 {
                Major::Unsigned => BigInt::from(self.parser.buflen()),
                Major::Negative => BigInt::from(-1i128 - i128::from(self.parser.buflen())),
                Major::Tag => match self.parser.buflen() {
                    2 => self.decode_positive_bignum()?,
                    3 => self.decode_negative_bignum()?,
                    other => {
                        return Err(Error::TagContent(
                            5,
                            format!("mantissa can't carry tag {other}"),
                        ))
                    }
                },
                major => {
                    return Err(Error::TagContent(
                        5,
                        format!("mantissa must be an integer or bignum, found {major}"),
                    ))
                }
            }
        };
        if exp.unsigned_abs() > MAX_BIG_FLOAT_EXP as u64 {
            return Err(Error::TagContent(5, format!("exponent {exp} out of range")));
        }
        if exp >= 0 {
            Ok(BigRational::from(mant << exp as usize))
        } else {
            Ok(BigRational::new(mant, BigInt::from(1) << (-exp) as usize))
        }
    }

    fn open_exponent_array(&mut self, id: u64) -> Result<(), Error> {
        let (major, info) = self.parse()?;
        if major != Major::Array {
            return Err(Error::TagContent(
                id,
                format!("must be represented as an array of two elements, found {major}"),
            ));
        }
        if info == 31 || self.parser.buflen() != 2 {
            return Err(Error::TagContent(
                id,
                "must be an array of exactly two elements".to_string(),
            ));
        }
        Ok(())
    }

    fn tag_integer(&mut self, id: u64, what: &str) -> Result<i64, Error> {
        let (major, _) = self.parse()?;
        match major {
            Major::Unsigned => Ok(i64::try_from(self.parser.buflen())?),
            Major::Negative => negative_i64(self.parser.buflen()),
            major => Err(Error::TagContent(
                id,
                format!("{what} must be an integer, found {major}"),
            )),
        }
    }

    /// Tags 21/22/23 wrap a byte or text string to be re-encoded.
    fn decode_tagged_payload(&mut self, id: u64) -> Result<Vec<u8>, Error> {
        let hdr = self.parse()?;
        if !matches!(hdr.0, Major::Bytes | Major::Text) {
            return Err(Error::TagContent(
                id,
                format!("expected string or bytes, found {}", hdr.0),
            ));
        }
        self.decode_string_payload(hdr)
    }

    /// Tag 32: a URI in a text string.
    pub(crate) fn decode_uri(&mut self) -> Result<Url, Error> {
        let text = self.tagged_text(32)?;
        Url::parse(&text).map_err(|e| Error::TagContent(32, e.to_string()))
    }

    /// Tag 33: a base64url-encoded URI.
    pub(crate) fn decode_base64_uri(&mut self) -> Result<Url, Error> {
        let text = self.tagged_text(33)?;
        let decoded = BASE64_URL_SAFE
            .decode(text)
            .map_err(|e| Error::TagContent(33, e.to_string()))?;
        let decoded = String::from_utf8(decoded)?;
        Url::parse(&decoded).map_err(|e| Error::TagContent(33, e.to_string()))
    }

    /// Tag 34: base64-encoded text.
    pub(crate) fn decode_base64_text(&mut self) -> Result<String, Error> {
        let text = self.tagged_text(34)?;
        let decoded = BASE64_STANDARD
            .decode(text)
            .map_err(|e| Error::TagContent(34, e.to_string()))?;
        Ok(String::from_utf8(decoded)?)
    }

    /// Tag 35: a regular expression, compiled.
    pub(crate) fn decode_regexp(&mut self) -> Result<Regex, Error> {
        let text = self.tagged_text(35)?;
        Regex::new(&text).map_err(|e| Error::TagContent(35, e.to_string()))
    }

    /// Tag 36: a MIME media type.
    pub(crate) fn decode_mime(&mut self) -> Result<Mime, Error> {
        let text = self.tagged_text(36)?;
        Mime::parse(&text).map_err(|e| Error::TagContent(36, e.to_string()))
    }

    fn tagged_text(&mut self, id: u64) -> Result<String, Error> {
        let hdr = self.parse()?;
        if hdr.0 != Major::Text {
            return Err(Error::TagContent(
                id,
                format!("expected string, found {}", hdr.0),
            ));
        }
        self.decode_text_payload(hdr)
    }
}

impl Decode for BigInt {
    const KIND: TargetKind = TargetKind::Any;

    fn decode_value(d: &mut Decoder, hdr: (Major, u8)) -> Result<Self, Error> {
        if hdr.0 != Major::Tag {
            return Err(Error::IncorrectType(
                "big num".to_string(),
                header_type_name(hdr.0, hdr.1),
            ));
        }
        match d.parser.buflen() {
            2 => d.decode_positive_bignum(),
            3 => d.decode_negative_bignum(),
            id => Err(Error::TagContent(
                id,
                "big nums are carried by tags 2 and 3".to_string(),
            )),
        }
    }
}

impl Decode for OffsetDateTime {
    const KIND: TargetKind = TargetKind::Any;

    fn decode_value(d: &mut Decoder, hdr: (Major, u8)) -> Result<Self, Error> {
        match hdr.0 {
            Major::Text => d.rfc3339_date_time(hdr),
            Major::Tag => match d.parser.buflen() {
                0 => d.decode_string_date_time(),
                1 => d.decode_epoch_date_time(),
                id => Err(Error::TagContent(
                    id,
                    "date-times are carried by tags 0 and 1".to_string(),
                )),
            },
            _ => d.epoch_date_time(hdr),
        }
    }
}

impl Decode for BigRational {
    const KIND: TargetKind = TargetKind::Any;

    fn decode_value(d: &mut Decoder, hdr: (Major, u8)) -> Result<Self, Error> {
        if hdr.0 != Major::Tag {
            return Err(Error::IncorrectType(
                "big float".to_string(),
                header_type_name(hdr.0, hdr.1),
            ));
        }
        match d.parser.buflen() {
            5 => d.decode_big_float(),
            id => Err(Error::TagContent(
                id,
                "big floats are carried by tag 5".to_string(),
            )),
        }
    }
}

impl Decode for Url {
    const KIND: TargetKind = TargetKind::Any;

    fn decode_value(d: &mut Decoder, hdr: (Major, u8)) -> Result<Self, Error> {
        if hdr.0 != Major::Tag {
            return Err(Error::IncorrectType(
                "URI".to_string(),
                header_type_name(hdr.0, hdr.1),
            ));
        }
        match d.parser.buflen() {
            32 => d.decode_uri(),
            33 => d.decode_base64_uri(),
            id => Err(Error::TagContent(
                id,
                "URIs are carried by tags 32 and 33".to_string(),
            )),
        }
    }
}

impl Decode for Regex {
    const KIND: TargetKind = TargetKind::Any;

    fn decode_value(d: &mut Decoder, hdr: (Major, u8)) -> Result<Self, Error> {
        if hdr.0 != Major::Tag {
            return Err(Error::IncorrectType(
                "regular expression".to_string(),
                header_type_name(hdr.0, hdr.1),
            ));
        }
        match d.parser.buflen() {
            35 => d.decode_regexp(),
            id => Err(Error::TagContent(
                id,
                "regular expressions are carried by tag 35".to_string(),
            )),
        }
    }
}

impl Decode for Mime {
    const KIND: TargetKind = TargetKind::Any;

    fn decode_value(d: &mut Decoder, hdr: (Major, u8)) -> Result<Self, Error> {
        if hdr.0 != Major::Tag {
            return Err(Error::IncorrectType(
                "MIME message".to_string(),
                header_type_name(hdr.0, hdr.1),
            ));
        }
        match d.parser.buflen() {
            36 => d.decode_mime(),
            id => Err(Error::TagContent(
                id,
                "MIME messages are carried by tag 36".to_string(),
            )),
        }
    }
}
