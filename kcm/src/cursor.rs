use crate::Error;
use nom::{
    bytes::complete::take,
    number::{complete, Endianness},
    IResult,
};

type ParseResult<'a, T> = IResult<&'a [u8], T, nom::error::Error<&'a [u8]>>;

/// Sequential reader over an in-memory buffer.
///
/// Every read either consumes exactly the bytes it asks for or fails with
/// `Error::KCM_TRUNCATED_INPUT` and leaves the offset untouched.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    offset: usize,
    endianness: Endianness,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8], endianness: Endianness) -> Self {
        Self {
            buf,
            offset: 0,
            endianness,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    fn advance<T>(
        &mut self,
        parser: impl FnOnce(&'a [u8]) -> ParseResult<'a, T>,
    ) -> anyhow::Result<T> {
        let (rest, value) =
            parser(&self.buf[self.offset..]).map_err(|_| Error::KCM_TRUNCATED_INPUT)?;
        self.offset = self.buf.len() - rest.len();
        Ok(value)
    }

    pub fn read_u8(&mut self) -> anyhow::Result<u8> {
        self.advance(complete::u8)
    }

    pub fn read_u32(&mut self) -> anyhow::Result<u32> {
        let endianness = self.endianness;
        self.advance(|input| complete::u32(endianness)(input))
    }

    pub fn read_bytes(&mut self, count: usize) -> anyhow::Result<&'a [u8]> {
        self.advance(|input| take(count)(input))
    }

    pub fn read_fixed<const N: usize>(&mut self) -> anyhow::Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut buf = [0; N];
        buf.copy_from_slice(bytes);
        Ok(buf)
    }

    // data ::=
    //     length (32 bits)
    //     value (length bytes)
    pub fn read_data(&mut self) -> anyhow::Result<&'a [u8]> {
        let start = self.offset;
        let size = self.read_u32()? as usize;
        match self.read_bytes(size) {
            Ok(data) => Ok(data),
            Err(err) => {
                self.offset = start;
                Err(err)
            }
        }
    }

    pub fn read_string(&mut self) -> anyhow::Result<String> {
        let start = self.offset;
        let data = self.read_data()?;
        match std::str::from_utf8(data) {
            Ok(string) => Ok(string.to_owned()),
            Err(_) => {
                self.offset = start;
                Err(Error::KCM_INVALID_ENCODING.into())
            }
        }
    }

    /// Calls `read_element` exactly `count` times and collects the results in
    /// order, stopping at the first failure.
    pub fn read_array<T>(
        &mut self,
        count: u32,
        mut read_element: impl FnMut(&mut Self) -> anyhow::Result<T>,
    ) -> anyhow::Result<Vec<T>> {
        // `count` is untrusted; cap the preallocation by what is left.
        let mut elements = Vec::with_capacity((count as usize).min(self.remaining()));
        for _ in 0..count {
            elements.push(read_element(self)?);
        }
        Ok(elements)
    }
}
