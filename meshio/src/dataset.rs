use bytes::Bytes;
use ndarray::{ArrayD, ArrayViewD, IxDyn};

use crate::{
    datatype::Datatype,
    errors::{Error, Result},
};

/// Per dimension size of a regular array.
pub type Extent = Vec<u64>;

/// Per dimension starting index of a region within a larger array.
pub type Offset = Vec<u64>;

/// Shape and element type of regular array data.
///
#[derive(Clone, Debug, PartialEq)]
pub struct DatasetDescriptor {
    pub dtype: Datatype,
    pub extent: Extent,
}

impl DatasetDescriptor {
    pub fn new(dtype: Datatype, extent: Extent) -> Self {
        Self { dtype, extent }
    }

    /// Number of dimensions
    pub fn rank(&self) -> usize {
        self.extent.len()
    }

    /// Total number of elements
    pub fn len(&self) -> u64 {
        self.extent.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A numeric type that can be stored as a dataset element.
///
/// Elements are encoded little endian.
///
pub trait Element: Copy + Default {
    const DATATYPE: Datatype;
    const SIZE: usize;

    fn write_to(&self, buffer: &mut Vec<u8>);

    fn read_from(bytes: &[u8]) -> Self;
}

macro_rules! Element {
    ($($variant:ident => $type:ty),*) => {
        $(
            impl Element for $type {
                const DATATYPE: Datatype = Datatype::$variant;
                const SIZE: usize = std::mem::size_of::<$type>();

                fn write_to(&self, buffer: &mut Vec<u8>) {
                    buffer.extend_from_slice(&self.to_le_bytes());
                }

                fn read_from(bytes: &[u8]) -> Self {
                    let mut raw = [0; std::mem::size_of::<$type>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$type>::from_le_bytes(raw)
                }
            }
        )*
    };
}

Element!(
    Int16 => i16,
    Int32 => i32,
    Int64 => i64,
    UInt16 => u16,
    UInt32 => u32,
    UInt64 => u64,
    Float => f32,
    Double => f64
);

/// Encode an array in row major order, regardless of its memory layout.
///
pub(crate) fn encode<T: Element>(data: &ArrayViewD<'_, T>) -> Bytes {
    let mut buffer = Vec::with_capacity(data.len() * T::SIZE);
    for value in data.iter() {
        value.write_to(&mut buffer);
    }

    Bytes::from(buffer)
}

/// Decode a row major buffer into an array with the given extent.
///
pub(crate) fn decode<T: Element>(bytes: &[u8], extent: &[u64]) -> Result<ArrayD<T>> {
    let shape: Vec<usize> = extent.iter().map(|&n| n as usize).collect();
    let values: Vec<T> = bytes.chunks_exact(T::SIZE).map(T::read_from).collect();

    Ok(ArrayD::from_shape_vec(IxDyn(&shape), values)?)
}

/// Check that a region has one offset and one extent entry per dataset dimension.
///
pub(crate) fn check_rank(rank: usize, offset: &[u64], extent: &[u64]) -> Result<()> {
    if offset.len() != rank {
        return Err(Error::DimensionMismatch {
            expected: rank,
            got: offset.len(),
        });
    }
    if extent.len() != rank {
        return Err(Error::DimensionMismatch {
            expected: rank,
            got: extent.len(),
        });
    }

    Ok(())
}
