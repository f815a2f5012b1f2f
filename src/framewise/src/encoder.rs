use std::mem;

use byteorder::{BigEndian, ByteOrder};
use framewise_pool::{PoolRef, Scratch};
use num_bigint::BigUint;

use crate::{
    binary::BinaryMarshal,
    error::{Error, Result},
    time::Timestamp,
};

macro_rules! impl_put_int {
    ($($(#[$doc:meta])* $fn:ident($ty:ty) => $write:ident),* $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $fn(&mut self, value: $ty) -> Result<()> {
                const SIZE: usize = mem::size_of::<$ty>();

                let (scratch, payload) = self.buffers()?;
                BigEndian::$write(&mut scratch[..SIZE], value);
                payload.extend_from_slice(&scratch[..SIZE]);

                Ok(())
            }
        )*
    };
}

enum State {
    Active {
        scratch: PoolRef<'static, Scratch>,
        payload: PoolRef<'static, Vec<u8>>,
    },
    Finalized,
}

/// A builder for framed byte sequences.
///
/// Every encoder checks out a scratch buffer and a payload accumulator
/// from the global pools and holds on to them until
/// [`Encoder::collect_data_and_release_buffers`] is called, or the
/// encoder is dropped.
///
/// Quantities of multiple bytes are always written in big-endian byte
/// ordering. A failed write never leaves partial data behind.
pub struct Encoder {
    state: State,
}

impl Encoder {
    /// Creates a new [`Encoder`] over pooled buffers.
    pub fn new() -> Self {
        Self {
            state: State::Active {
                scratch: framewise_pool::scratch().get(),
                payload: framewise_pool::payload().get(),
            },
        }
    }

    fn buffers(&mut self) -> Result<(&mut Scratch, &mut Vec<u8>)> {
        match &mut self.state {
            State::Active { scratch, payload } => Ok((&mut **scratch, &mut **payload)),
            State::Finalized => {
                log::debug!("Rejecting write to a released encoder");
                Err(Error::Released)
            }
        }
    }

    fn payload(&mut self) -> Result<&mut Vec<u8>> {
        self.buffers().map(|(_, payload)| payload)
    }

    /// Gets the number of bytes encoded so far.
    ///
    /// This is zero for a released encoder.
    #[inline]
    pub fn len(&self) -> usize {
        match &self.state {
            State::Active { payload, .. } => payload.len(),
            State::Finalized => 0,
        }
    }

    /// Indicates whether no bytes have been encoded so far.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Indicates whether the encoder has already been finalized.
    #[inline]
    pub fn is_released(&self) -> bool {
        matches!(self.state, State::Finalized)
    }

    /// Reserves capacity for at least `nbytes` more bytes.
    ///
    /// When the message layout allows making educated guesses about
    /// its size, use this to avoid repeated reallocation.
    pub fn reserve(&mut self, nbytes: usize) -> Result<()> {
        self.payload()?.reserve(nbytes);
        Ok(())
    }

    /// Finalizes the encoder and returns the encoded bytes.
    ///
    /// The returned vector is independent of the pooled memory, which
    /// is handed back to the pools. Any write after this fails with
    /// [`Error::Released`], and so does a second call.
    pub fn collect_data_and_release_buffers(&mut self) -> Result<Vec<u8>> {
        match mem::replace(&mut self.state, State::Finalized) {
            State::Active { scratch, payload } => {
                let data = payload.to_vec();

                payload.release();
                scratch.release();

                Ok(data)
            }

            State::Finalized => Err(Error::Released),
        }
    }

    /// Writes a single unsigned byte.
    pub fn put_uint8(&mut self, value: u8) -> Result<()> {
        let (scratch, payload) = self.buffers()?;
        scratch[0] = value;
        payload.extend_from_slice(&scratch[..1]);

        Ok(())
    }

    /// Writes a single signed byte.
    #[inline]
    pub fn put_int8(&mut self, value: i8) -> Result<()> {
        self.put_uint8(value as u8)
    }

    /// Writes a [`bool`] as a single byte of `0` or `1`.
    #[inline]
    pub fn put_bool(&mut self, value: bool) -> Result<()> {
        self.put_uint8(value as u8)
    }

    impl_put_int! {
        /// Writes a [`u16`] value.
        put_uint16(u16) => write_u16,
        /// Writes a [`u32`] value.
        put_uint32(u32) => write_u32,
        /// Writes a [`u64`] value.
        put_uint64(u64) => write_u64,
        /// Writes an [`i16`] value.
        put_int16(i16) => write_i16,
        /// Writes an [`i32`] value.
        put_int32(i32) => write_i32,
        /// Writes an [`i64`] value.
        put_int64(i64) => write_i64,
    }

    /// Writes a string prefixed with its byte length as [`u16`].
    #[inline]
    pub fn put_string(&mut self, value: &str) -> Result<()> {
        self.put_variadic_data_with_2bytes_header(value.as_bytes())
    }

    /// Writes a non-negative integer of arbitrary precision.
    ///
    /// The minimal big-endian bytes of the magnitude are written with a
    /// [`u8`] length prefix, so values of up to 255 bytes are supported.
    /// Zero has an empty magnitude.
    pub fn put_big_int_with_byte_header(&mut self, value: &BigUint) -> Result<()> {
        if value.bits() == 0 {
            return self.put_variadic_data_with_byte_header(&[]);
        }

        self.put_variadic_data_with_byte_header(&value.to_bytes_be())
    }

    /// Writes a timestamp in its canonical binary form, prefixed with
    /// its length as [`u8`].
    pub fn put_time_with_byte_header<T: Timestamp>(&mut self, value: &T) -> Result<()> {
        self.payload()?;

        let data = value.marshal_binary().map_err(Error::marshal)?;
        self.put_variadic_data_with_byte_header(&data)
    }

    /// Writes `data` prefixed with its length as [`u8`].
    ///
    /// Fails with [`Error::PayloadTooLarge`] for more than 255 bytes.
    pub fn put_variadic_data_with_byte_header(&mut self, data: &[u8]) -> Result<()> {
        let payload = self.payload()?;
        let len = u8::try_from(data.len()).map_err(|_| Error::PayloadTooLarge {
            len: data.len(),
            max: u8::MAX as usize,
        })?;

        payload.push(len);
        payload.extend_from_slice(data);

        Ok(())
    }

    /// Writes `data` prefixed with its length as [`u16`].
    ///
    /// Fails with [`Error::PayloadTooLarge`] for more than 65535 bytes.
    pub fn put_variadic_data_with_2bytes_header(&mut self, data: &[u8]) -> Result<()> {
        let (scratch, payload) = self.buffers()?;
        let len = u16::try_from(data.len()).map_err(|_| Error::PayloadTooLarge {
            len: data.len(),
            max: u16::MAX as usize,
        })?;

        BigEndian::write_u16(&mut scratch[..2], len);
        payload.extend_from_slice(&scratch[..2]);
        payload.extend_from_slice(data);

        Ok(())
    }

    /// Writes raw `data` without any header.
    ///
    /// The reader must know the length of the segment in advance.
    /// Empty segments are rejected with [`Error::PayloadTooSmall`].
    pub fn put_fixed_size_data_segment(&mut self, data: &[u8]) -> Result<()> {
        let payload = self.payload()?;
        if data.is_empty() {
            return Err(Error::PayloadTooSmall);
        }

        payload.extend_from_slice(data);
        Ok(())
    }

    /// Encodes `value` and writes it with a [`u8`] length prefix.
    pub fn marshal_variadic_data_with_byte_header<T>(&mut self, value: &T) -> Result<()>
    where
        T: BinaryMarshal + ?Sized,
    {
        self.payload()?;

        let data = value.marshal_binary().map_err(Error::marshal)?;
        self.put_variadic_data_with_byte_header(&data)
    }

    /// Encodes `value` and writes it with a [`u16`] length prefix.
    pub fn marshal_variadic_data_with_2bytes_header<T>(&mut self, value: &T) -> Result<()>
    where
        T: BinaryMarshal + ?Sized,
    {
        self.payload()?;

        let data = value.marshal_binary().map_err(Error::marshal)?;
        self.put_variadic_data_with_2bytes_header(&data)
    }

    /// Encodes `value` and writes it as a raw segment.
    pub fn marshal_fixed_size_data_segment<T>(&mut self, value: &T) -> Result<()>
    where
        T: BinaryMarshal + ?Sized,
    {
        self.payload()?;

        let data = value.marshal_binary().map_err(Error::marshal)?;
        self.put_fixed_size_data_segment(&data)
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
