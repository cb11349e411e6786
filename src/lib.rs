pub mod backend;
pub mod container;
pub mod data;
pub mod error;
mod macros;

pub use backend::{fs::Fs, Backend};
pub use container::{ArrayElem, Inner, RaggedElem, Slot};
pub use data::{
    HasShape, RaggedArray, RaggedArrayBuilder, RaggedWriter, Readable, ReadableArray, Selectable,
    Writable, WritableArray,
};
pub use error::StoreError;
