use crate::{ok, AnyResult};
use anyhow::anyhow;
use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::{Read, Write};

/// Special trait for reading packed data, always assumed to be little endian.
///
/// Usually implemented through `#[derive(PackedData)]` from `holocron_proc`.
pub trait PackedData: Sized + Clone {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self>;
    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult;
}

impl<T: PackedData, const N: usize> PackedData for [T; N] {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self> {
        let values = (0..N)
            .map(|_| T::read_packed(r))
            .collect::<AnyResult<Vec<T>>>()?;

        values
            .try_into()
            .map_err(|_| anyhow!("array of {N} elements couldn't be assembled"))
    }

    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult {
        for value in self {
            value.write_packed(w)?;
        }
        ok()
    }
}

macro_rules! impl_data {
    ($type:ty, $read:ident, $write:ident) => {
        impl PackedData for $type {
            fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self> {
                Ok(r.$read::<LE>()?)
            }

            fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult {
                w.$write::<LE>(*self)?;
                ok()
            }
        }
    };
}

impl PackedData for u8 {
    fn read_packed<R: Read>(r: &mut R) -> AnyResult<Self> {
        Ok(r.read_u8()?)
    }

    fn write_packed<W: Write>(&self, w: &mut W) -> AnyResult {
        w.write_u8(*self)?;
        ok()
    }
}

impl_data!(u16, read_u16, write_u16);
impl_data!(i16, read_i16, write_i16);
impl_data!(u32, read_u32, write_u32);
impl_data!(i32, read_i32, write_i32);
impl_data!(f32, read_f32, write_f32);

/// Trait with a `write_packed` wrapper method for any [`Write`] type, purely for clarity.
pub trait PackedWriteExt {
    /// Writes the specified [`PackedData`] object into this stream.
    fn write_packed(&mut self, t: impl PackedData) -> AnyResult;
}

impl<T: Write> PackedWriteExt for T {
    fn write_packed(&mut self, t: impl PackedData) -> AnyResult {
        t.write_packed(self)
    }
}

/// Trait with a `read_packed` wrapper method for any [`Read`] type, purely for clarity.
pub trait PackedReadExt {
    /// Reads the specified [`PackedData`] type from this stream.
    fn read_packed<T: PackedData>(&mut self) -> AnyResult<T>;
}

impl<T: Read> PackedReadExt for T {
    fn read_packed<R: PackedData>(&mut self) -> AnyResult<R> {
        R::read_packed(self)
    }
}
