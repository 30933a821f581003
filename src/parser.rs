use crate::reader::Reader;
use thiserror::Error;

/// The break opcode terminating indefinite-length items.
pub const BREAK: u8 = 0xFF;

pub(crate) const HDR_FALSE: u8 = 0xF4;
pub(crate) const HDR_NULL: u8 = 0xF6;
pub(crate) const HDR_UNDEFINED: u8 = 0xF7;

#[derive(Error, Debug)]
pub enum Error {
    #[error("could not read from source: {0}")]
    Io(#[from] std::io::Error),

    #[error("needed {wanted} bytes but only {got} were available")]
    ShortRead { wanted: usize, got: usize },

    #[error("scratch buffer exhausted: wanted {wanted} bytes, {available} left")]
    BufferExhausted { wanted: usize, available: usize },

    #[error("invalid additional info {0}")]
    InvalidInfo(u8),

    #[error("additional info 31 (indefinite) is not valid for major type {0}")]
    InvalidIndefinite(Major),
}

/// The eight major types carried in the top three bits of a header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Major {
    Unsigned,
    Negative,
    Bytes,
    Text,
    Array,
    Map,
    Tag,
    Simple,
}

impl Major {
    fn from_header(header: u8) -> Self {
        match header >> 5 {
            0 => Major::Unsigned,
            1 => Major::Negative,
            2 => Major::Bytes,
            3 => Major::Text,
            4 => Major::Array,
            5 => Major::Map,
            6 => Major::Tag,
            7 => Major::Simple,
            _ => unreachable!(),
        }
    }
}

impl std::fmt::Display for Major {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Major::Unsigned => "unsigned integer",
            Major::Negative => "negative integer",
            Major::Bytes => "byte string",
            Major::Text => "text string",
            Major::Array => "array",
            Major::Map => "map",
            Major::Tag => "tag",
            Major::Simple => "simple/float",
        })
    }
}

/// Splits each data item into a (major, additional-info) pair and fills the
/// scratch buffer with the item's argument bytes, without interpreting them.
pub struct Parser<'a> {
    reader: Reader<'a>,
    header: u8,
    indefinite: bool,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a mut dyn std::io::Read) -> Self {
        Self {
            reader: Reader::new(src),
            header: 0,
            indefinite: false,
        }
    }

    /// True if the most recent header byte was the break opcode.
    pub fn is_break(&self) -> bool {
        self.header == BREAK
    }

    /// True if the most recent header byte was the null opcode.
    pub fn is_null(&self) -> bool {
        self.header == HDR_NULL
    }

    /// True if the most recent header byte was the undefined opcode.
    pub fn is_undefined(&self) -> bool {
        self.header == HDR_UNDEFINED
    }

    /// True if the most recent header opened an indefinite-length item.
    pub fn is_indefinite(&self) -> bool {
        self.indefinite
    }

    /// The most recently parsed header byte.
    pub fn header(&self) -> u8 {
        self.header
    }

    /// Parses the initial byte of the next data item.
    ///
    /// Inline arguments (info <= 23) land in the scratch buffer as a single
    /// byte; info 24..=27 pulls the 1/2/4/8-byte big-endian argument into
    /// the scratch; info 31 flags an indefinite-length item and is accepted
    /// only for strings, containers and major 7. Info 28..=30 is ill-formed.
    pub fn parse_information(&mut self) -> Result<(Major, u8), Error> {
        self.indefinite = false;
        self.header = self.reader.scan1()?;
        let major = Major::from_header(self.header);
        let info = self.header & 0x1F;
        if info <= 23 {
            self.reader.load_inline(info);
            return Ok((major, info));
        }
        match info {
            24..=27 => {
                self.reader.scan(1 << (info - 24))?;
                Ok((major, info))
            }
            31 => match major {
                Major::Unsigned | Major::Negative | Major::Tag => {
                    Err(Error::InvalidIndefinite(major))
                }
                _ => {
                    self.indefinite = true;
                    self.reader.clear();
                    Ok((major, info))
                }
            },
            _ => Err(Error::InvalidInfo(info)),
        }
    }

    /// The unsigned argument held in the scratch buffer, whatever its width.
    ///
    /// Does not consume the scratch; typed re-reads below do.
    pub fn buflen(&self) -> u64 {
        let info = self.header & 0x1F;
        if info <= 23 {
            return u64::from(info);
        }
        match self.reader.scratch() {
            [a] => u64::from(*a),
            [a, b] => u64::from(u16::from_be_bytes([*a, *b])),
            buf @ [_, _, _, _] => u64::from(u32::from_be_bytes(buf.try_into().unwrap())),
            buf @ [_, _, _, _, _, _, _, _] => u64::from_be_bytes(buf.try_into().unwrap()),
            _ => 0,
        }
    }

    /// Reads `n` payload bytes from the source into the scratch buffer.
    pub fn scan(&mut self, n: usize) -> Result<&[u8], Error> {
        self.reader.scan(n)
    }

    pub fn parse_uint8(&mut self) -> Result<u8, Error> {
        Ok(self.reader.take(1)?[0])
    }

    pub fn parse_uint16(&mut self) -> Result<u16, Error> {
        Ok(u16::from_be_bytes(self.reader.take(2)?.try_into().unwrap()))
    }

    pub fn parse_uint32(&mut self) -> Result<u32, Error> {
        Ok(u32::from_be_bytes(self.reader.take(4)?.try_into().unwrap()))
    }

    pub fn parse_uint64(&mut self) -> Result<u64, Error> {
        Ok(u64::from_be_bytes(self.reader.take(8)?.try_into().unwrap()))
    }

    pub fn parse_float16(&mut self) -> Result<half::f16, Error> {
        Ok(half::f16::from_be_bytes(
            self.reader.take(2)?.try_into().unwrap(),
        ))
    }

    pub fn parse_float32(&mut self) -> Result<f32, Error> {
        Ok(f32::from_be_bytes(self.reader.take(4)?.try_into().unwrap()))
    }

    pub fn parse_float64(&mut self) -> Result<f64, Error> {
        Ok(f64::from_be_bytes(self.reader.take(8)?.try_into().unwrap()))
    }

    pub fn parse_bool(&self) -> bool {
        self.header != HDR_FALSE
    }
}
