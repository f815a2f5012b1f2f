use std::{
    io::{BufReader, Read},
    mem,
};

use byteorder::{BigEndian, ByteOrder};
use framewise_pool::{PoolRef, Scratch, MAX_RETAINED_CAPACITY, SCRATCH_SIZE};
use num_bigint::BigUint;

use crate::{
    binary::BinaryUnmarshal,
    error::{Error, Result},
    time::Timestamp,
};

macro_rules! impl_get_int {
    ($($(#[$doc:meta])* $fn:ident() -> $ty:ty => $read:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $fn(&mut self) -> Result<$ty> {
                const SIZE: usize = mem::size_of::<$ty>();

                let scratch = self.read_fixed(SIZE)?;
                Ok(BigEndian::$read(&scratch[..SIZE]))
            }
        )*
    };
}

/// A reader for framed byte sequences produced by [`crate::Encoder`].
///
/// Values must be read back in the same order they were written;
/// the wire format carries no type information to check this.
///
/// A failed read leaves the source at an unspecified position. The
/// decoder should be discarded afterwards.
#[derive(Debug)]
pub struct Decoder<R> {
    reader: R,
}

impl<'a> Decoder<&'a [u8]> {
    /// Creates a decoder over an in-memory byte slice.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { reader: data }
    }
}

impl<R: Read> Decoder<BufReader<R>> {
    /// Creates a decoder over a stream, wrapping it in a [`BufReader`].
    ///
    /// Reads block until the stream delivers enough data. Deadlines
    /// must be configured on the stream itself.
    #[inline]
    pub fn from_stream(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }
}

impl<R: Read> Decoder<R> {
    /// Consumes the decoder and returns the underlying source.
    #[inline]
    pub fn into_inner(self) -> R {
        self.reader
    }

    // Fills exactly `n` leading bytes of `scratch`, or fails.
    fn fill_scratch(&mut self, scratch: &mut Scratch, n: usize) -> Result<()> {
        debug_assert!(n <= SCRATCH_SIZE);

        self.reader
            .read_exact(&mut scratch[..n])
            .map_err(|e| Error::read(n, e))
    }

    fn read_fixed(&mut self, n: usize) -> Result<PoolRef<'static, Scratch>> {
        let mut scratch = framewise_pool::scratch().get();
        self.fill_scratch(&mut scratch, n)?;

        Ok(scratch)
    }

    /// Reads exactly `size` bytes in chunks of up to 8 bytes.
    ///
    /// Any chunk which cannot be filled aborts the whole segment.
    fn read_data_segment(&mut self, size: usize) -> Result<Vec<u8>> {
        let mut scratch = framewise_pool::scratch().get();
        let mut buffer = framewise_pool::payload().get();
        buffer.reserve(size.min(MAX_RETAINED_CAPACITY));

        let mut processed = 0;
        while processed < size {
            let step = (size - processed).min(SCRATCH_SIZE);
            self.fill_scratch(&mut scratch, step)?;

            buffer.extend_from_slice(&scratch[..step]);
            processed += step;
        }

        // Detach the result from pooled memory before it's recycled.
        Ok(buffer.to_vec())
    }

    /// Reads a single unsigned byte.
    pub fn get_uint8(&mut self) -> Result<u8> {
        let scratch = self.read_fixed(1)?;
        Ok(scratch[0])
    }

    /// Reads a single signed byte.
    #[inline]
    pub fn get_int8(&mut self) -> Result<i8> {
        self.get_uint8().map(|v| v as i8)
    }

    /// Reads a [`bool`]; any non-zero byte is `true`.
    #[inline]
    pub fn get_bool(&mut self) -> Result<bool> {
        self.get_uint8().map(|v| v != 0)
    }

    impl_get_int! {
        /// Reads a [`u16`] value.
        get_uint16() -> u16 => read_u16,
        /// Reads a [`u32`] value.
        get_uint32() -> u32 => read_u32,
        /// Reads a [`u64`] value.
        get_uint64() -> u64 => read_u64,
        /// Reads an [`i16`] value.
        get_int16() -> i16 => read_i16,
        /// Reads an [`i32`] value.
        get_int32() -> i32 => read_i32,
        /// Reads an [`i64`] value.
        get_int64() -> i64 => read_i64,
    }

    /// Reads a string prefixed with its byte length as [`u16`].
    ///
    /// Invalid UTF-8 sequences are replaced with `U+FFFD`. Use
    /// [`Decoder::get_data_segment_with_2bytes_header`] to get at
    /// the raw bytes instead.
    pub fn get_string(&mut self) -> Result<String> {
        let data = self.get_data_segment_with_2bytes_header()?;

        Ok(String::from_utf8(data)
            .unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()))
    }

    /// Reads a non-negative integer prefixed with its byte length
    /// as [`u8`].
    pub fn get_big_int_with_byte_header(&mut self) -> Result<BigUint> {
        let data = self.get_data_segment_with_byte_header()?;
        Ok(BigUint::from_bytes_be(&data))
    }

    /// Reads a timestamp in its canonical binary form, prefixed with
    /// its length as [`u8`].
    pub fn get_time_with_byte_header<T: Timestamp>(&mut self) -> Result<T> {
        let data = self.get_data_segment_with_byte_header()?;
        T::decode_binary(&data).map_err(Error::unmarshal)
    }

    /// Reads a raw segment of exactly `size` bytes.
    #[inline]
    pub fn get_data_segment(&mut self, size: usize) -> Result<Vec<u8>> {
        self.read_data_segment(size)
    }

    /// Reads a segment prefixed with its length as [`u8`].
    pub fn get_data_segment_with_byte_header(&mut self) -> Result<Vec<u8>> {
        let len = self.get_uint8()?;
        self.read_data_segment(len as usize)
    }

    /// Reads a segment prefixed with its length as [`u16`].
    pub fn get_data_segment_with_2bytes_header(&mut self) -> Result<Vec<u8>> {
        let len = self.get_uint16()?;
        self.read_data_segment(len as usize)
    }

    /// Reads a raw segment of `size` bytes and decodes `dest` from it.
    pub fn unmarshal_data_segment<T>(&mut self, size: usize, dest: &mut T) -> Result<()>
    where
        T: BinaryUnmarshal + ?Sized,
    {
        let data = self.get_data_segment(size)?;
        dest.unmarshal_binary(&data).map_err(Error::unmarshal)
    }

    /// Reads a segment with a [`u8`] length prefix and decodes `dest`
    /// from it.
    pub fn unmarshal_data_segment_with_byte_header<T>(&mut self, dest: &mut T) -> Result<()>
    where
        T: BinaryUnmarshal + ?Sized,
    {
        let data = self.get_data_segment_with_byte_header()?;
        dest.unmarshal_binary(&data).map_err(Error::unmarshal)
    }

    /// Reads a segment with a [`u16`] length prefix and decodes `dest`
    /// from it.
    pub fn unmarshal_data_segment_with_2bytes_header<T>(&mut self, dest: &mut T) -> Result<()>
    where
        T: BinaryUnmarshal + ?Sized,
    {
        let data = self.get_data_segment_with_2bytes_header()?;
        dest.unmarshal_binary(&data).map_err(Error::unmarshal)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, ErrorKind};

    use super::*;

    // Hands out at most one byte per call.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match (self.0.split_first(), buf.first_mut()) {
                (Some((&b, rest)), Some(slot)) => {
                    *slot = b;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    #[test]
    fn segment_spanning_many_chunks() {
        let data: Vec<u8> = (0..=20).collect();
        let mut dec = Decoder::new(data.as_slice());

        assert_eq!(dec.read_data_segment(19).unwrap(), &data[..19]);
        assert_eq!(dec.get_uint16().unwrap(), 0x1314);
    }

    #[test]
    fn short_reads_are_completed() {
        let mut dec = Decoder { reader: Trickle(&[0, 0, 0, 3, 1, 2, 3]) };

        assert_eq!(dec.get_uint32().unwrap(), 3);
        assert_eq!(dec.read_data_segment(3).unwrap(), [1, 2, 3]);
    }

    #[test]
    fn eof_reports_failed_step() {
        let mut dec = Decoder::new(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);

        match dec.read_data_segment(12) {
            Err(Error::Read { wanted, source }) => {
                assert_eq!(wanted, 4);
                assert_eq!(source.kind(), ErrorKind::UnexpectedEof);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn zero_sized_segment() {
        let mut dec = Decoder::new(&[]);
        assert!(dec.read_data_segment(0).unwrap().is_empty());
    }
}
