//! Typed multi-dimensional data buffers.
//!
//! A [`Dataset`] is the unit that flows through compressors and metrics
//! collectors: a flat typed buffer plus its shape. Metrics code consumes
//! datasets through [`Dataset::values_f64`], which promotes every element to
//! `f64` so that narrow integer types never truncate or wrap.

use byteorder::{ByteOrder, NativeEndian};

use crate::dtype::DType;
use crate::error::DataError;

/// A scalar type that can be stored in a [`DataBuffer`].
pub trait Element: Copy + PartialOrd + std::fmt::Display + 'static {
    /// The element type tag.
    const DTYPE: DType;

    /// Promotes the element to `f64`.
    fn to_f64(self) -> f64;

    /// Wraps a vector of elements in the matching buffer variant.
    fn into_buffer(values: Vec<Self>) -> DataBuffer;
}

macro_rules! impl_element {
    ($ty:ty, $dtype:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$dtype;

            fn to_f64(self) -> f64 {
                self as f64
            }

            fn into_buffer(values: Vec<Self>) -> DataBuffer {
                DataBuffer::$dtype(values)
            }
        }
    };
}

impl_element!(f32, Float);
impl_element!(f64, Double);
impl_element!(i8, Int8);
impl_element!(i16, Int16);
impl_element!(i32, Int32);
impl_element!(i64, Int64);
impl_element!(u8, Uint8);
impl_element!(u16, Uint16);
impl_element!(u32, Uint32);
impl_element!(u64, Uint64);

/// Flat storage for dataset elements, one variant per [`DType`].
#[derive(Debug, Clone, PartialEq)]
pub enum DataBuffer {
    Float(Vec<f32>),
    Double(Vec<f64>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Uint8(Vec<u8>),
    Uint16(Vec<u16>),
    Uint32(Vec<u32>),
    Uint64(Vec<u64>),
    Byte(Vec<u8>),
}

macro_rules! dispatch {
    ($buffer:expr, $values:ident => $body:expr) => {
        match $buffer {
            DataBuffer::Float($values) => $body,
            DataBuffer::Double($values) => $body,
            DataBuffer::Int8($values) => $body,
            DataBuffer::Int16($values) => $body,
            DataBuffer::Int32($values) => $body,
            DataBuffer::Int64($values) => $body,
            DataBuffer::Uint8($values) => $body,
            DataBuffer::Uint16($values) => $body,
            DataBuffer::Uint32($values) => $body,
            DataBuffer::Uint64($values) => $body,
            DataBuffer::Byte($values) => $body,
        }
    };
}

impl DataBuffer {
    /// Creates a zero-filled buffer of `len` elements.
    pub fn zeroed(dtype: DType, len: usize) -> Self {
        match dtype {
            DType::Float => DataBuffer::Float(vec![0.0; len]),
            DType::Double => DataBuffer::Double(vec![0.0; len]),
            DType::Int8 => DataBuffer::Int8(vec![0; len]),
            DType::Int16 => DataBuffer::Int16(vec![0; len]),
            DType::Int32 => DataBuffer::Int32(vec![0; len]),
            DType::Int64 => DataBuffer::Int64(vec![0; len]),
            DType::Uint8 => DataBuffer::Uint8(vec![0; len]),
            DType::Uint16 => DataBuffer::Uint16(vec![0; len]),
            DType::Uint32 => DataBuffer::Uint32(vec![0; len]),
            DType::Uint64 => DataBuffer::Uint64(vec![0; len]),
            DType::Byte => DataBuffer::Byte(vec![0; len]),
        }
    }

    /// Returns the element type of this buffer.
    pub fn dtype(&self) -> DType {
        match self {
            DataBuffer::Float(_) => DType::Float,
            DataBuffer::Double(_) => DType::Double,
            DataBuffer::Int8(_) => DType::Int8,
            DataBuffer::Int16(_) => DType::Int16,
            DataBuffer::Int32(_) => DType::Int32,
            DataBuffer::Int64(_) => DType::Int64,
            DataBuffer::Uint8(_) => DType::Uint8,
            DataBuffer::Uint16(_) => DType::Uint16,
            DataBuffer::Uint32(_) => DType::Uint32,
            DataBuffer::Uint64(_) => DType::Uint64,
            DataBuffer::Byte(_) => DType::Byte,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        dispatch!(self, values => values.len())
    }

    /// Returns true if the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns element `index` promoted to `f64`.
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        dispatch!(self, values => values.get(index).map(|v| v.to_f64()))
    }

    /// Returns the default text representation of element `index`.
    pub fn format_element(&self, index: usize) -> Option<String> {
        dispatch!(self, values => values.get(index).map(|v| v.to_string()))
    }

    /// Encodes the elements as native-endian bytes.
    pub fn to_ne_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.len() * self.dtype().size()];
        match self {
            DataBuffer::Float(v) => NativeEndian::write_f32_into(v, &mut out),
            DataBuffer::Double(v) => NativeEndian::write_f64_into(v, &mut out),
            DataBuffer::Int8(v) => {
                for (dst, src) in out.iter_mut().zip(v) {
                    *dst = *src as u8;
                }
            }
            DataBuffer::Int16(v) => NativeEndian::write_i16_into(v, &mut out),
            DataBuffer::Int32(v) => NativeEndian::write_i32_into(v, &mut out),
            DataBuffer::Int64(v) => NativeEndian::write_i64_into(v, &mut out),
            DataBuffer::Uint8(v) | DataBuffer::Byte(v) => out.copy_from_slice(v),
            DataBuffer::Uint16(v) => NativeEndian::write_u16_into(v, &mut out),
            DataBuffer::Uint32(v) => NativeEndian::write_u32_into(v, &mut out),
            DataBuffer::Uint64(v) => NativeEndian::write_u64_into(v, &mut out),
        }
        out
    }

    /// Decodes native-endian bytes into a buffer of `dtype`.
    ///
    /// `bytes.len()` must be a multiple of the element width.
    pub fn from_ne_bytes(dtype: DType, bytes: &[u8]) -> Result<Self, DataError> {
        if bytes.len() % dtype.size() != 0 {
            return Err(DataError::ByteLength {
                dtype,
                len: bytes.len(),
            });
        }
        let mut buffer = DataBuffer::zeroed(dtype, bytes.len() / dtype.size());
        match &mut buffer {
            DataBuffer::Float(v) => NativeEndian::read_f32_into(bytes, v),
            DataBuffer::Double(v) => NativeEndian::read_f64_into(bytes, v),
            DataBuffer::Int8(v) => {
                for (dst, src) in v.iter_mut().zip(bytes) {
                    *dst = *src as i8;
                }
            }
            DataBuffer::Int16(v) => NativeEndian::read_i16_into(bytes, v),
            DataBuffer::Int32(v) => NativeEndian::read_i32_into(bytes, v),
            DataBuffer::Int64(v) => NativeEndian::read_i64_into(bytes, v),
            DataBuffer::Uint8(v) | DataBuffer::Byte(v) => v.copy_from_slice(bytes),
            DataBuffer::Uint16(v) => NativeEndian::read_u16_into(bytes, v),
            DataBuffer::Uint32(v) => NativeEndian::read_u32_into(bytes, v),
            DataBuffer::Uint64(v) => NativeEndian::read_u64_into(bytes, v),
        }
        Ok(buffer)
    }
}

/// A typed buffer together with its shape.
///
/// `Clone` performs a deep copy; two datasets never share storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    buffer: DataBuffer,
    dims: Vec<usize>,
}

impl Dataset {
    /// Creates a dataset, checking that the buffer length matches the shape.
    pub fn new(buffer: DataBuffer, dims: Vec<usize>) -> Result<Self, DataError> {
        let expected = element_count(&dims).ok_or_else(|| DataError::Overflow {
            dims: dims.clone(),
        })?;
        if buffer.len() != expected {
            return Err(DataError::ShapeMismatch {
                expected,
                actual: buffer.len(),
            });
        }
        Ok(Self { buffer, dims })
    }

    /// Creates a dataset from a vector of elements.
    pub fn from_vec<T: Element>(values: Vec<T>, dims: Vec<usize>) -> Result<Self, DataError> {
        Self::new(T::into_buffer(values), dims)
    }

    /// Creates a zero-filled dataset.
    ///
    /// Fails without allocating if the shape cannot be addressed.
    pub fn empty(dtype: DType, dims: Vec<usize>) -> Result<Self, DataError> {
        if Self::byte_size(dtype, &dims).is_none() {
            return Err(DataError::Overflow { dims });
        }
        let len = element_count(&dims).unwrap_or(0);
        Ok(Self {
            buffer: DataBuffer::zeroed(dtype, len),
            dims,
        })
    }

    /// Number of bytes a dataset of this type and shape occupies, or `None`
    /// if that exceeds what a single allocation can hold.
    pub fn byte_size(dtype: DType, dims: &[usize]) -> Option<usize> {
        element_count(dims)?
            .checked_mul(dtype.size())
            .filter(|&bytes| bytes <= isize::MAX as usize)
    }

    /// Decodes a dataset from native-endian bytes.
    pub fn from_ne_bytes(dtype: DType, dims: Vec<usize>, bytes: &[u8]) -> Result<Self, DataError> {
        Self::new(DataBuffer::from_ne_bytes(dtype, bytes)?, dims)
    }

    pub fn dtype(&self) -> DType {
        self.buffer.dtype()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn num_dimensions(&self) -> usize {
        self.dims.len()
    }

    /// Extent of dimension `index`, or 0 if the dataset has fewer dimensions.
    pub fn dimension(&self, index: usize) -> usize {
        self.dims.get(index).copied().unwrap_or(0)
    }

    pub fn num_elements(&self) -> usize {
        self.buffer.len()
    }

    pub fn size_in_bytes(&self) -> usize {
        self.num_elements() * self.dtype().size()
    }

    pub fn buffer(&self) -> &DataBuffer {
        &self.buffer
    }

    /// Iterates over the elements promoted to `f64`, in storage order.
    pub fn values_f64(&self) -> ValuesF64<'_> {
        ValuesF64 {
            buffer: &self.buffer,
            index: 0,
        }
    }

    /// Encodes the elements as native-endian bytes.
    pub fn to_ne_bytes(&self) -> Vec<u8> {
        self.buffer.to_ne_bytes()
    }
}

/// Product of the extents, or `None` on overflow; an empty shape holds no
/// elements.
fn element_count(dims: &[usize]) -> Option<usize> {
    if dims.is_empty() {
        return Some(0);
    }
    dims.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
}

impl Default for Dataset {
    /// An untyped dataset with no shape and no elements.
    fn default() -> Self {
        Self {
            buffer: DataBuffer::zeroed(DType::Byte, 0),
            dims: Vec::new(),
        }
    }
}

/// Iterator returned by [`Dataset::values_f64`].
#[derive(Debug, Clone)]
pub struct ValuesF64<'a> {
    buffer: &'a DataBuffer,
    index: usize,
}

impl Iterator for ValuesF64<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let value = self.buffer.get_f64(self.index)?;
        self.index += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ValuesF64<'_> {}
