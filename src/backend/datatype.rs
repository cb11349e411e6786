use crate::macros::{dyn_map, dyn_match};

use anyhow::{anyhow, bail, Result};
use core::fmt::{Display, Formatter};
use ndarray::ArrayD;
use num::{NumCast, ToPrimitive};

/// All data types that can be stored in a container.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataType {
    Array(ScalarType),
    Ragged(ScalarType),
    Mapping,
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DataType::Array(t) => write!(f, "Array({})", t),
            DataType::Ragged(t) => write!(f, "Ragged({})", t),
            DataType::Mapping => write!(f, "Mapping"),
        }
    }
}

/// All scalar types that datasets can hold. Elements are stored
/// little-endian with a fixed width, so every type here has a known
/// on-disk item size.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ScalarType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
}

impl ScalarType {
    pub fn item_size(&self) -> usize {
        macro_rules! size {
            ($ty:ty) => {
                <$ty as BackendData>::ITEM_SIZE
            };
        }
        dyn_match!(self, ScalarType, size)
    }
}

impl Display for ScalarType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarType::I8 => write!(f, "i8"),
            ScalarType::I16 => write!(f, "i16"),
            ScalarType::I32 => write!(f, "i32"),
            ScalarType::I64 => write!(f, "i64"),
            ScalarType::U8 => write!(f, "u8"),
            ScalarType::U16 => write!(f, "u16"),
            ScalarType::U32 => write!(f, "u32"),
            ScalarType::U64 => write!(f, "u64"),
            ScalarType::F32 => write!(f, "f32"),
            ScalarType::F64 => write!(f, "f64"),
            ScalarType::Bool => write!(f, "bool"),
        }
    }
}

impl std::str::FromStr for ScalarType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let ty = match s {
            "i8" => ScalarType::I8,
            "i16" => ScalarType::I16,
            "i32" => ScalarType::I32,
            "i64" => ScalarType::I64,
            "u8" => ScalarType::U8,
            "u16" => ScalarType::U16,
            "u32" => ScalarType::U32,
            "u64" => ScalarType::U64,
            "f32" => ScalarType::F32,
            "f64" => ScalarType::F64,
            "bool" => ScalarType::Bool,
            ty => bail!("unknown scalar type '{}'", ty),
        };
        Ok(ty)
    }
}

/// Element types that backends know how to persist.
pub trait BackendData: Send + Sync + Clone + 'static {
    const DTYPE: ScalarType;

    /// On-disk width of one element in bytes.
    const ITEM_SIZE: usize;

    /// Append the little-endian encoding of `self` to `buf`.
    fn encode(&self, buf: &mut Vec<u8>);

    /// Decode one element from exactly `ITEM_SIZE` bytes.
    fn decode(bytes: &[u8]) -> Self;

    fn into_dyn_arr(arr: ArrayD<Self>) -> DynArray;

    fn from_dyn_arr(arr: DynArray) -> Result<ArrayD<Self>>;
}

macro_rules! impl_backend_data {
    ($($ty:ty, $variant:ident),*) => {
        $(
            impl BackendData for $ty {
                const DTYPE: ScalarType = ScalarType::$variant;
                const ITEM_SIZE: usize = std::mem::size_of::<$ty>();

                fn encode(&self, buf: &mut Vec<u8>) {
                    buf.extend_from_slice(&self.to_le_bytes());
                }

                fn decode(bytes: &[u8]) -> Self {
                    <$ty>::from_le_bytes(bytes.try_into().unwrap())
                }

                fn into_dyn_arr(arr: ArrayD<Self>) -> DynArray {
                    DynArray::$variant(arr)
                }

                fn from_dyn_arr(arr: DynArray) -> Result<ArrayD<Self>> {
                    if let DynArray::$variant(x) = arr {
                        Ok(x)
                    } else {
                        bail!("expecting a {} array but found {}", stringify!($ty), arr.dtype())
                    }
                }
            }
        )*
    };
}

impl_backend_data!(
    i8, I8, i16, I16, i32, I32, i64, I64, u8, U8, u16, U16, u32, U32, u64, U64, f32, F32, f64, F64
);

impl BackendData for bool {
    const DTYPE: ScalarType = ScalarType::Bool;
    const ITEM_SIZE: usize = 1;

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(*self as u8);
    }

    fn decode(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn into_dyn_arr(arr: ArrayD<Self>) -> DynArray {
        DynArray::Bool(arr)
    }

    fn from_dyn_arr(arr: DynArray) -> Result<ArrayD<Self>> {
        if let DynArray::Bool(x) = arr {
            Ok(x)
        } else {
            bail!("expecting a bool array but found {}", arr.dtype())
        }
    }
}

/// A dynamic-typed array.
#[derive(Debug, Clone, PartialEq)]
pub enum DynArray {
    I8(ArrayD<i8>),
    I16(ArrayD<i16>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    U8(ArrayD<u8>),
    U16(ArrayD<u16>),
    U32(ArrayD<u32>),
    U64(ArrayD<u64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    Bool(ArrayD<bool>),
}

macro_rules! impl_dynarray_from {
    ($($ty:ty, $variant:ident),*) => {
        $(
            impl From<ArrayD<$ty>> for DynArray {
                fn from(arr: ArrayD<$ty>) -> Self {
                    DynArray::$variant(arr)
                }
            }
        )*
    };
}

impl_dynarray_from!(
    i8, I8, i16, I16, i32, I32, i64, I64, u8, U8, u16, U16, u32, U32, u64, U64, f32, F32, f64,
    F64, bool, Bool
);

impl DynArray {
    pub fn dtype(&self) -> ScalarType {
        macro_rules! dtype {
            ($variant:ident, $exp:expr) => {
                ScalarType::$variant
            };
        }
        dyn_map!(self, DynArray, dtype)
    }

    pub fn shape(&self) -> Vec<usize> {
        macro_rules! shape {
            ($variant:ident, $exp:expr) => {
                $exp.shape().to_vec()
            };
        }
        dyn_map!(self, DynArray, shape)
    }

    pub fn ndim(&self) -> usize {
        macro_rules! ndim {
            ($variant:ident, $exp:expr) => {
                $exp.ndim()
            };
        }
        dyn_map!(self, DynArray, ndim)
    }

    /// Element-wise numeric conversion, e.g. for reading an offsets
    /// dataset stored as `u64` back into `usize` values. Fails if any
    /// element does not fit the target type. Bool arrays do not convert.
    pub fn cast<T: NumCast>(self) -> Result<ArrayD<T>> {
        match self {
            DynArray::I8(x) => cast_array(x),
            DynArray::I16(x) => cast_array(x),
            DynArray::I32(x) => cast_array(x),
            DynArray::I64(x) => cast_array(x),
            DynArray::U8(x) => cast_array(x),
            DynArray::U16(x) => cast_array(x),
            DynArray::U32(x) => cast_array(x),
            DynArray::U64(x) => cast_array(x),
            DynArray::F32(x) => cast_array(x),
            DynArray::F64(x) => cast_array(x),
            DynArray::Bool(_) => bail!("cannot cast a bool array to a numeric type"),
        }
    }
}

fn cast_array<A, T>(arr: ArrayD<A>) -> Result<ArrayD<T>>
where
    A: ToPrimitive + Copy,
    T: NumCast,
{
    let dim = arr.raw_dim();
    let values = arr
        .iter()
        .map(|&x| T::from(x).ok_or_else(|| anyhow!("numeric cast out of range")))
        .collect::<Result<Vec<_>>>()?;
    Ok(ArrayD::from_shape_vec(dim, values)?)
}
