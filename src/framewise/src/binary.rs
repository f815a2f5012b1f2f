//! Values which know how to encode and decode themselves.

use std::{convert::Infallible, error::Error as StdError};

/// A value with its own binary encoding.
///
/// Used by the `marshal_*` family of [`crate::Encoder`] methods,
/// which apply framing around the produced bytes.
pub trait BinaryMarshal {
    /// The error produced when encoding fails.
    type Error: StdError + Send + Sync + 'static;

    /// Encodes `self` into a new byte vector.
    fn marshal_binary(&self) -> Result<Vec<u8>, Self::Error>;
}

/// A value that can restore itself from its binary encoding.
///
/// The counterpart of [`BinaryMarshal`], used by the `unmarshal_*`
/// family of [`crate::Decoder`] methods.
pub trait BinaryUnmarshal {
    /// The error produced when decoding fails.
    type Error: StdError + Send + Sync + 'static;

    /// Overwrites `self` with the value decoded from `data`.
    ///
    /// `data` is exactly the byte range of the value's field.
    fn unmarshal_binary(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}

impl BinaryMarshal for [u8] {
    type Error = Infallible;

    #[inline]
    fn marshal_binary(&self) -> Result<Vec<u8>, Self::Error> {
        Ok(self.to_vec())
    }
}

impl BinaryMarshal for Vec<u8> {
    type Error = Infallible;

    #[inline]
    fn marshal_binary(&self) -> Result<Vec<u8>, Self::Error> {
        Ok(self.clone())
    }
}

impl BinaryUnmarshal for Vec<u8> {
    type Error = Infallible;

    #[inline]
    fn unmarshal_binary(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.clear();
        self.extend_from_slice(data);
        Ok(())
    }
}

impl<T: BinaryMarshal + ?Sized> BinaryMarshal for &T {
    type Error = T::Error;

    #[inline]
    fn marshal_binary(&self) -> Result<Vec<u8>, Self::Error> {
        (**self).marshal_binary()
    }
}
