mod datatype;
pub mod fs;

pub use datatype::{BackendData, DataType, DynArray, ScalarType};

use crate::data::{SelectInfo, SelectInfoElem, Shape};

use anyhow::{bail, Result};
use core::fmt::{Debug, Formatter};
use ndarray::{Array, CowArray, Dimension, IxDyn};
use num::NumCast;
use serde_json::Value;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip(u32),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WriteConfig {
    pub compression: Option<Compression>,
}

pub trait Backend: 'static {
    /// The name of the backend.
    const NAME: &'static str;

    /// Data store
    type Store: StoreOp<Self> + GroupOp<Self> + Send + Sync;

    /// Groups work like directories and can contain groups or datasets.
    type Group: GroupOp<Self> + AttributeOp<Self> + Send + Sync;

    /// Datasets store multi-dimensional arrays.
    type Dataset: DatasetOp<Self> + AttributeOp<Self> + Send + Sync;

    /// Create a new store at the given path.
    fn new<P: AsRef<Path>>(path: P) -> Result<Self::Store>;

    /// Opens a store as read-only, it must exist.
    fn open<P: AsRef<Path>>(path: P) -> Result<Self::Store>;

    /// Opens a store as read/write, it must exist.
    fn open_rw<P: AsRef<Path>>(path: P) -> Result<Self::Store>;
}

pub trait StoreOp<B: Backend + ?Sized> {
    /// Returns the store path.
    fn filename(&self) -> PathBuf;

    /// Release the store. Must be called on all exit paths that are done
    /// with the store; dropping without closing is also a release.
    fn close(self) -> Result<()>;
}

pub trait GroupOp<B: Backend + ?Sized> {
    /// List all groups and datasets in this group.
    fn list(&self) -> Result<Vec<String>>;

    /// Create a new group.
    fn new_group(&self, name: &str) -> Result<B::Group>;

    /// Open an existing group.
    fn open_group(&self, name: &str) -> Result<B::Group>;

    /// Create an empty dataset holding an array value.
    fn new_empty_dataset<T: BackendData>(
        &self,
        name: &str,
        shape: &Shape,
        config: WriteConfig,
    ) -> Result<B::Dataset>;

    fn open_dataset(&self, name: &str) -> Result<B::Dataset>;

    /// Delete a group or dataset.
    fn delete(&self, name: &str) -> Result<()>;

    /// Check if a group or dataset exists.
    fn exists(&self, name: &str) -> Result<bool>;

    fn new_array_dataset<'a, D, Dim>(
        &self,
        name: &str,
        arr: CowArray<'a, D, Dim>,
        config: WriteConfig,
    ) -> Result<B::Dataset>
    where
        D: BackendData,
        Dim: Dimension,
    {
        // Compressing tiny arrays costs more than it saves.
        let compression = if arr.len() > 100 {
            config.compression
        } else {
            None
        };
        let config = WriteConfig { compression };
        let dataset = self.new_empty_dataset::<D>(name, &arr.shape().into(), config)?;
        dataset.write_array(arr)?;
        Ok(dataset)
    }
}

pub trait AttributeOp<B: Backend + ?Sized> {
    /// Returns the root store.
    fn store(&self) -> Result<B::Store>;

    /// Returns the path of the location relative to the store root.
    fn path(&self) -> PathBuf;

    /// Write a JSON-valued attribute at this location, overwriting any
    /// existing attribute with the same name.
    fn new_json_attr(&mut self, name: &str, value: &Value) -> Result<()>;

    fn get_json_attr(&self, name: &str) -> Result<Value>;

    fn new_str_attr(&mut self, name: &str, value: &str) -> Result<()> {
        self.new_json_attr(name, &Value::String(value.to_string()))
    }

    fn get_str_attr(&self, name: &str) -> Result<String> {
        match self.get_json_attr(name)? {
            Value::String(s) => Ok(s),
            v => bail!("attribute '{}' is not a string: {}", name, v),
        }
    }

    fn new_usize_attr(&mut self, name: &str, value: usize) -> Result<()> {
        self.new_json_attr(name, &Value::from(value as u64))
    }

    fn get_usize_attr(&self, name: &str) -> Result<usize> {
        let v = self.get_json_attr(name)?;
        v.as_u64()
            .map(|x| x as usize)
            .ok_or_else(|| anyhow::anyhow!("attribute '{}' is not an unsigned integer: {}", name, v))
    }
}

pub trait DatasetOp<B: Backend + ?Sized> {
    /// Required methods

    fn dtype(&self) -> Result<ScalarType>;
    fn shape(&self) -> Result<Shape>;

    /// Resize the dataset along its leading axis.
    fn reshape(&mut self, shape: &Shape) -> Result<()>;

    fn write_array_slice<S, T, D>(&self, arr: CowArray<'_, T, D>, selection: &[S]) -> Result<()>
    where
        T: BackendData,
        S: AsRef<SelectInfoElem>,
        D: Dimension;

    fn read_array_slice<T: BackendData, S, D>(&self, selection: &[S]) -> Result<Array<T, D>>
    where
        S: AsRef<SelectInfoElem>,
        D: Dimension;

    /// Optional methods

    fn read_dyn_array_slice<S>(&self, selection: &[S]) -> Result<DynArray>
    where
        S: AsRef<SelectInfoElem>,
    {
        let arr = match self.dtype()? {
            ScalarType::I8 => self.read_array_slice::<i8, _, IxDyn>(selection)?.into(),
            ScalarType::I16 => self.read_array_slice::<i16, _, IxDyn>(selection)?.into(),
            ScalarType::I32 => self.read_array_slice::<i32, _, IxDyn>(selection)?.into(),
            ScalarType::I64 => self.read_array_slice::<i64, _, IxDyn>(selection)?.into(),
            ScalarType::U8 => self.read_array_slice::<u8, _, IxDyn>(selection)?.into(),
            ScalarType::U16 => self.read_array_slice::<u16, _, IxDyn>(selection)?.into(),
            ScalarType::U32 => self.read_array_slice::<u32, _, IxDyn>(selection)?.into(),
            ScalarType::U64 => self.read_array_slice::<u64, _, IxDyn>(selection)?.into(),
            ScalarType::F32 => self.read_array_slice::<f32, _, IxDyn>(selection)?.into(),
            ScalarType::F64 => self.read_array_slice::<f64, _, IxDyn>(selection)?.into(),
            ScalarType::Bool => self.read_array_slice::<bool, _, IxDyn>(selection)?.into(),
        };
        Ok(arr)
    }

    /// Read a slice and convert the elements to `T`, whatever the stored
    /// scalar type is.
    fn read_array_slice_cast<T, D, S>(&self, selection: &[S]) -> Result<Array<T, D>>
    where
        T: NumCast,
        D: Dimension,
        S: AsRef<SelectInfoElem>,
    {
        Ok(self
            .read_dyn_array_slice(selection)?
            .cast()?
            .into_dimensionality::<D>()?)
    }

    fn read_array<T: BackendData, D>(&self) -> Result<Array<T, D>>
    where
        D: Dimension,
    {
        self.read_array_slice(SelectInfo::full_slice(self.shape()?.ndim()).as_ref())
    }

    fn read_dyn_array(&self) -> Result<DynArray> {
        self.read_dyn_array_slice(SelectInfo::full_slice(self.shape()?.ndim()).as_ref())
    }

    fn read_array_cast<T, D>(&self) -> Result<Array<T, D>>
    where
        T: NumCast,
        D: Dimension,
    {
        self.read_array_slice_cast(SelectInfo::full_slice(self.shape()?.ndim()).as_ref())
    }

    fn write_array<D, Dim>(&self, arr: CowArray<'_, D, Dim>) -> Result<()>
    where
        D: BackendData,
        Dim: Dimension,
    {
        let ndim = arr.ndim();
        self.write_array_slice(arr, SelectInfo::full_slice(ndim).as_ref())
    }
}

pub enum DataContainer<B: Backend> {
    Group(B::Group),
    Dataset(B::Dataset),
}

impl<B: Backend> Debug for DataContainer<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            DataContainer::Group(g) => write!(f, "Group({:?})", g.path()),
            DataContainer::Dataset(d) => write!(f, "Dataset({:?})", d.path()),
        }
    }
}

impl<B: Backend> AttributeOp<B> for DataContainer<B> {
    fn store(&self) -> Result<B::Store> {
        match self {
            DataContainer::Group(g) => g.store(),
            DataContainer::Dataset(d) => d.store(),
        }
    }

    fn path(&self) -> PathBuf {
        match self {
            DataContainer::Group(g) => g.path(),
            DataContainer::Dataset(d) => d.path(),
        }
    }

    fn new_json_attr(&mut self, name: &str, value: &Value) -> Result<()> {
        match self {
            DataContainer::Group(g) => g.new_json_attr(name, value),
            DataContainer::Dataset(d) => d.new_json_attr(name, value),
        }
    }

    fn get_json_attr(&self, name: &str) -> Result<Value> {
        match self {
            DataContainer::Group(g) => g.get_json_attr(name),
            DataContainer::Dataset(d) => d.get_json_attr(name),
        }
    }
}

impl<B: Backend> DataContainer<B> {
    pub fn open<G: GroupOp<B>>(group: &G, name: &str) -> Result<Self> {
        if group.exists(name)? {
            match group.open_dataset(name) {
                Ok(dataset) => Ok(DataContainer::Dataset(dataset)),
                Err(e1) => group.open_group(name).map(DataContainer::Group).map_err(|e2| {
                    e2.context(e1).context(format!(
                        "Error opening group or dataset named '{}' in group",
                        name
                    ))
                }),
            }
        } else {
            bail!("No group or dataset named '{}' in group", name);
        }
    }

    pub fn delete(container: DataContainer<B>) -> Result<()> {
        container
            .store()?
            .delete(&container.path().to_string_lossy())
    }

    pub fn encoding_type(&self) -> Result<DataType> {
        let ty = match self {
            DataContainer::Group(group) => {
                let enc = group
                    .get_str_attr("encoding-type")
                    .unwrap_or("mapping".to_string());
                match enc.as_str() {
                    "ragged-array" => {
                        let ty = self.as_group()?.open_dataset("data")?.dtype()?;
                        DataType::Ragged(ty)
                    }
                    "mapping" | "dict" => DataType::Mapping,
                    ty => bail!("Unsupported type '{}'", ty),
                }
            }
            DataContainer::Dataset(dataset) => {
                let enc = dataset
                    .get_str_attr("encoding-type")
                    .unwrap_or("array".to_string());
                match enc.as_str() {
                    "array" => DataType::Array(dataset.dtype()?),
                    ty => bail!("Unsupported type '{}'", ty),
                }
            }
        };
        Ok(ty)
    }

    pub fn as_group(&self) -> Result<&B::Group> {
        match self {
            Self::Group(x) => Ok(x),
            _ => bail!("Expecting Group"),
        }
    }

    pub fn as_dataset(&self) -> Result<&B::Dataset> {
        match self {
            Self::Dataset(x) => Ok(x),
            _ => bail!("Expecting Dataset"),
        }
    }
}

pub fn iter_containers<B: Backend>(
    group: &B::Group,
) -> impl Iterator<Item = (String, DataContainer<B>)> + '_ {
    group.list().unwrap().into_iter().map(|x| {
        let container = DataContainer::open(group, &x).unwrap();
        (x, container)
    })
}
