pub mod dense;
pub mod ragged;
pub mod slice;
pub mod traits;
pub(crate) mod utils;

pub use ragged::{RaggedArray, RaggedArrayBuilder, RaggedWriter};
pub use slice::{
    SelectInfo, SelectInfoBounds, SelectInfoElem, SelectInfoElemBounds, Shape, SliceBounds,
    SLICE_FULL,
};
pub use traits::{
    Element, HasShape, MetaData, Readable, ReadableArray, Selectable, Writable, WritableArray,
};
