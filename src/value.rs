use num_bigint::BigInt;
use num_rational::BigRational;
use thiserror::Error;

/// A CBOR byte string.
///
/// Distinct from `Vec<T>` destinations, which decode from (and encode to)
/// CBOR arrays.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Bytes(v)
    }
}

impl From<&[u8]> for Bytes {
    fn from(v: &[u8]) -> Self {
        Bytes(v.to_vec())
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Error, Debug)]
pub enum MimeError {
    #[error("media type {0:?} has no type/subtype separator")]
    MissingSlash(String),

    #[error("media type parameter {0:?} has no value")]
    MissingValue(String),
}

/// A MIME media type: a `type/subtype` pair plus its parameters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Mime {
    pub content_type: String,
    pub params: Vec<(String, String)>,
}

impl Mime {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Parses a `type/subtype; key=value; ...` media type string.
    pub fn parse(s: &str) -> Result<Self, MimeError> {
        let mut parts = s.split(';');
        let content_type = parts.next().unwrap_or_default().trim().to_ascii_lowercase();
        if !content_type.contains('/') {
            return Err(MimeError::MissingSlash(content_type));
        }
        let mut params = Vec::new();
        for part in parts {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| MimeError::MissingValue(part.to_string()))?;
            params.push((key.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
        Ok(Self {
            content_type,
            params,
        })
    }
}

impl std::str::FromStr for Mime {
    type Err = MimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mime::parse(s)
    }
}

impl std::fmt::Display for Mime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.content_type)?;
        for (key, value) in &self.params {
            write!(f, "; {key}={value}")?;
        }
        Ok(())
    }
}

/// A decoded data item with no predeclared destination type.
///
/// Integers carry the narrowest width matching the wire argument; the tag
/// variants carry the host value the corresponding RFC 7049 tag produces.
/// Tags with no built-in or registered handler are preserved as
/// [`Value::Tag`].
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Undefined,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F16(half::f16),
    F32(f32),
    F64(f64),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
    BigNum(BigInt),
    Tag(u64, Box<Value>),
    DateTime(time::OffsetDateTime),
    Rational(BigRational),
    Base64Url(Vec<u8>),
    Base64(Vec<u8>),
    Base16(Vec<u8>),
    Url(url::Url),
    Regexp(regex::Regex),
    Mime(Mime),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::U8(_) => "unsigned 8-bit integer",
            Value::U16(_) => "unsigned 16-bit integer",
            Value::U32(_) => "unsigned 32-bit integer",
            Value::U64(_) => "unsigned 64-bit integer",
            Value::I8(_) => "signed 8-bit integer",
            Value::I16(_) => "signed 16-bit integer",
            Value::I32(_) => "signed 32-bit integer",
            Value::I64(_) => "signed 64-bit integer",
            Value::F16(_) => "half-precision float",
            Value::F32(_) => "single-precision float",
            Value::F64(_) => "double-precision float",
            Value::Bytes(_) => "byte string",
            Value::Text(_) => "text string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::BigNum(_) => "big num",
            Value::Tag(..) => "tagged value",
            Value::DateTime(_) => "date-time",
            Value::Rational(_) => "big float",
            Value::Base64Url(_) => "base64url data",
            Value::Base64(_) => "base64 data",
            Value::Base16(_) => "base16 data",
            Value::Url(_) => "URI",
            Value::Regexp(_) => "regular expression",
            Value::Mime(_) => "MIME message",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) | (Undefined, Undefined) => true,
            (Bool(a), Bool(b)) => a == b,
            (U8(a), U8(b)) => a == b,
            (U16(a), U16(b)) => a == b,
            (U32(a), U32(b)) => a == b,
            (U64(a), U64(b)) => a == b,
            (I8(a), I8(b)) => a == b,
            (I16(a), I16(b)) => a == b,
            (I32(a), I32(b)) => a == b,
            (I64(a), I64(b)) => a == b,
            (F16(a), F16(b)) => a == b,
            (F32(a), F32(b)) => a == b,
            (F64(a), F64(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (Text(a), Text(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (BigNum(a), BigNum(b)) => a == b,
            (Tag(a, av), Tag(b, bv)) => a == b && av == bv,
            (DateTime(a), DateTime(b)) => a == b,
            (Rational(a), Rational(b)) => a == b,
            (Base64Url(a), Base64Url(b)) => a == b,
            (Base64(a), Base64(b)) => a == b,
            (Base16(a), Base16(b)) => a == b,
            (Url(a), Url(b)) => a == b,
            (Regexp(a), Regexp(b)) => a.as_str() == b.as_str(),
            (Mime(a), Mime(b)) => a == b,
            _ => false,
        }
    }
}
