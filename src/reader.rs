use crate::parser::Error;

/// Pull-oriented byte source feeding the parser.
///
/// Bytes are pulled from the underlying source into a scratch buffer with
/// [`scan`](Reader::scan); typed re-reads then consume the scratch through
/// [`take`](Reader::take) without touching the source again.
pub struct Reader<'a> {
    src: &'a mut dyn std::io::Read,
    buf: Vec<u8>,
    off: usize,
}

impl<'a> Reader<'a> {
    pub fn new(src: &'a mut dyn std::io::Read) -> Self {
        Self {
            src,
            buf: Vec::new(),
            off: 0,
        }
    }

    /// Reads exactly `n` bytes from the source into the scratch buffer.
    ///
    /// A source that runs dry before `n` bytes arrive is a
    /// [`ShortRead`](Error::ShortRead) carrying both counts. A zero-length
    /// scan returns empty without touching the source.
    pub fn scan(&mut self, n: usize) -> Result<&[u8], Error> {
        self.buf.clear();
        self.off = 0;
        if n == 0 {
            return Ok(&self.buf);
        }
        self.buf.resize(n, 0);
        let mut got = 0;
        while got < n {
            match self.src.read(&mut self.buf[got..]) {
                Ok(0) => return Err(Error::ShortRead { wanted: n, got }),
                Ok(read) => got += read,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(&self.buf)
    }

    /// Reads a single byte from the source.
    pub fn scan1(&mut self) -> Result<u8, Error> {
        Ok(self.scan(1)?[0])
    }

    /// Re-reads `n` bytes from the scratch buffer at the current offset.
    ///
    /// Never blocks; asking for more bytes than the scratch holds is a
    /// [`BufferExhausted`](Error::BufferExhausted) error.
    pub fn take(&mut self, n: usize) -> Result<&[u8], Error> {
        let available = self.buf.len() - self.off;
        if n > available {
            return Err(Error::BufferExhausted {
                wanted: n,
                available,
            });
        }
        let start = self.off;
        self.off += n;
        Ok(&self.buf[start..self.off])
    }

    /// Replaces the scratch buffer with a single inline byte.
    pub(crate) fn load_inline(&mut self, b: u8) {
        self.buf.clear();
        self.buf.push(b);
        self.off = 0;
    }

    /// Empties the scratch buffer.
    pub(crate) fn clear(&mut self) {
        self.buf.clear();
        self.off = 0;
    }

    /// The scratch buffer contents, regardless of the current offset.
    pub(crate) fn scratch(&self) -> &[u8] {
        &self.buf
    }
}
