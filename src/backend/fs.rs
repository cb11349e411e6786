//! A directory-tree container backend.
//!
//! A store is a directory; every group and dataset is a child directory
//! carrying an `attributes.json`. A dataset additionally declares
//! `dataType`, `dimensions` and `compression` in its attributes and keeps
//! its elements row-major, little-endian, in a single `data` file, which
//! allows a sub-region to be served by seeking to the contiguous runs it
//! covers.

use crate::backend::{
    AttributeOp, Backend, BackendData, Compression, DatasetOp, GroupOp, ScalarType, StoreOp,
    WriteConfig,
};
use crate::data::{
    SelectInfoBounds, SelectInfoElem, SelectInfoElemBounds, Shape, SliceBounds,
};
use crate::data::utils::select_dyn;

use anyhow::{anyhow, bail, ensure, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use ndarray::{Array, ArrayD, CowArray, Dimension, IxDyn};
use serde_json::{Map, Value};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

const ATTRS_FILE: &str = "attributes.json";
const DATA_FILE: &str = "data";

/// Attribute keys the backend itself owns.
const RESERVED_ATTRS: [&str; 3] = ["dataType", "dimensions", "compression"];

pub struct Fs;

#[derive(Clone)]
struct Location {
    base: Arc<PathBuf>,
    rel: PathBuf,
    readonly: bool,
}

pub struct FsRoot(Location);

pub struct FsGroup(Location);

pub struct FsDataset(Location);

impl Backend for Fs {
    const NAME: &'static str = "fs";

    type Store = FsRoot;
    type Group = FsGroup;
    type Dataset = FsDataset;

    fn new<P: AsRef<Path>>(path: P) -> Result<Self::Store> {
        fs::create_dir_all(&path)?;
        let loc = Location {
            base: Arc::new(path.as_ref().to_path_buf()),
            rel: PathBuf::new(),
            readonly: false,
        };
        loc.write_attrs(&Map::new())?;
        Ok(FsRoot(loc))
    }

    fn open<P: AsRef<Path>>(path: P) -> Result<Self::Store> {
        let path = path.as_ref();
        ensure!(path.is_dir(), "store '{}' does not exist", path.display());
        Ok(FsRoot(Location {
            base: Arc::new(path.to_path_buf()),
            rel: PathBuf::new(),
            readonly: true,
        }))
    }

    fn open_rw<P: AsRef<Path>>(path: P) -> Result<Self::Store> {
        let path = path.as_ref();
        ensure!(path.is_dir(), "store '{}' does not exist", path.display());
        Ok(FsRoot(Location {
            base: Arc::new(path.to_path_buf()),
            rel: PathBuf::new(),
            readonly: false,
        }))
    }
}

impl StoreOp<Fs> for FsRoot {
    fn filename(&self) -> PathBuf {
        (*self.0.base).clone()
    }

    // No OS handle is held between operations, so releasing the store is
    // purely dropping the path.
    fn close(self) -> Result<()> {
        Ok(())
    }
}

impl Location {
    fn dir(&self) -> PathBuf {
        self.base.join(&self.rel)
    }

    fn child(&self, name: &str) -> Result<Location> {
        let mut rel = self.rel.clone();
        for part in name.split('/').filter(|x| !x.is_empty()) {
            ensure!(
                part != ".." && part != ".",
                "invalid component '{}' in name '{}'",
                part,
                name
            );
            rel.push(part);
        }
        Ok(Location {
            base: self.base.clone(),
            rel,
            readonly: self.readonly,
        })
    }

    fn ensure_writable(&self) -> Result<()> {
        ensure!(!self.readonly, "store is opened read-only");
        Ok(())
    }

    fn attrs_path(&self) -> PathBuf {
        self.dir().join(ATTRS_FILE)
    }

    fn read_attrs(&self) -> Result<Map<String, Value>> {
        let path = self.attrs_path();
        if !path.is_file() {
            return Ok(Map::new());
        }
        let bytes = fs::read(&path)?;
        match serde_json::from_slice(&bytes)? {
            Value::Object(map) => Ok(map),
            _ => bail!("'{}' does not contain a JSON object", path.display()),
        }
    }

    fn write_attrs(&self, attrs: &Map<String, Value>) -> Result<()> {
        self.ensure_writable()?;
        let path = self.attrs_path();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&Value::Object(attrs.clone()))?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn set_attr(&self, name: &str, value: Value) -> Result<()> {
        let mut attrs = self.read_attrs()?;
        attrs.insert(name.to_string(), value);
        self.write_attrs(&attrs)
    }

    fn get_attr(&self, name: &str) -> Result<Value> {
        self.read_attrs()?
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("no attribute named '{}' at '/{}'", name, self.rel.display()))
    }

    fn is_dataset(&self) -> bool {
        self.read_attrs()
            .map(|attrs| attrs.contains_key("dataType"))
            .unwrap_or(false)
    }
}

// Generic GroupOp implementations

fn list(loc: &Location) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(loc.dir())? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn create_group(loc: &Location, name: &str) -> Result<FsGroup> {
    loc.ensure_writable()?;
    let child = loc.child(name)?;
    ensure!(
        !child.dir().exists(),
        "a group or dataset named '{}' already exists",
        name
    );
    fs::create_dir_all(child.dir())?;
    child.write_attrs(&Map::new())?;
    Ok(FsGroup(child))
}

fn open_group(loc: &Location, name: &str) -> Result<FsGroup> {
    let child = loc.child(name)?;
    ensure!(child.dir().is_dir(), "group '{}' does not exist", name);
    ensure!(!child.is_dataset(), "'{}' is a dataset, not a group", name);
    Ok(FsGroup(child))
}

fn new_dataset<T: BackendData>(
    loc: &Location,
    name: &str,
    shape: &Shape,
    config: WriteConfig,
) -> Result<FsDataset> {
    loc.ensure_writable()?;
    ensure!(shape.ndim() > 0, "datasets must have at least one axis");
    let child = loc.child(name)?;
    ensure!(
        !child.dir().exists(),
        "a group or dataset named '{}' already exists",
        name
    );
    fs::create_dir_all(child.dir())?;

    let mut attrs = Map::new();
    attrs.insert("dataType".to_string(), T::DTYPE.to_string().into());
    attrs.insert(
        "dimensions".to_string(),
        shape.as_ref().iter().map(|&x| x as u64).collect::<Vec<_>>().into(),
    );
    let compression = match config.compression {
        None => Value::String("raw".to_string()),
        Some(Compression::Gzip(level)) => {
            serde_json::json!({ "type": "gzip", "level": level })
        }
    };
    attrs.insert("compression".to_string(), compression);
    child.write_attrs(&attrs)?;

    let file = File::create(child.dir().join(DATA_FILE))?;
    if config.compression.is_none() {
        file.set_len((shape.size() * T::ITEM_SIZE) as u64)?;
    }
    Ok(FsDataset(child))
}

fn open_dataset(loc: &Location, name: &str) -> Result<FsDataset> {
    let child = loc.child(name)?;
    ensure!(child.dir().is_dir(), "dataset '{}' does not exist", name);
    ensure!(child.is_dataset(), "'{}' is a group, not a dataset", name);
    Ok(FsDataset(child))
}

fn delete(loc: &Location, name: &str) -> Result<()> {
    loc.ensure_writable()?;
    let child = loc.child(name)?;
    fs::remove_dir_all(child.dir())?;
    Ok(())
}

fn exists(loc: &Location, name: &str) -> Result<bool> {
    Ok(loc.child(name)?.dir().is_dir())
}

macro_rules! impl_group_op {
    ($ty:ty) => {
        impl GroupOp<Fs> for $ty {
            fn list(&self) -> Result<Vec<String>> {
                list(&self.0)
            }

            fn new_group(&self, name: &str) -> Result<FsGroup> {
                create_group(&self.0, name)
            }

            fn open_group(&self, name: &str) -> Result<FsGroup> {
                open_group(&self.0, name)
            }

            fn new_empty_dataset<T: BackendData>(
                &self,
                name: &str,
                shape: &Shape,
                config: WriteConfig,
            ) -> Result<FsDataset> {
                new_dataset::<T>(&self.0, name, shape, config)
            }

            fn open_dataset(&self, name: &str) -> Result<FsDataset> {
                open_dataset(&self.0, name)
            }

            fn delete(&self, name: &str) -> Result<()> {
                delete(&self.0, name)
            }

            fn exists(&self, name: &str) -> Result<bool> {
                exists(&self.0, name)
            }
        }
    };
}

impl_group_op!(FsRoot);
impl_group_op!(FsGroup);

macro_rules! impl_attribute_op {
    ($ty:ty) => {
        impl AttributeOp<Fs> for $ty {
            fn store(&self) -> Result<FsRoot> {
                Ok(FsRoot(Location {
                    base: self.0.base.clone(),
                    rel: PathBuf::new(),
                    readonly: self.0.readonly,
                }))
            }

            fn path(&self) -> PathBuf {
                PathBuf::from("/").join(&self.0.rel)
            }

            fn new_json_attr(&mut self, name: &str, value: &Value) -> Result<()> {
                ensure!(
                    !RESERVED_ATTRS.contains(&name),
                    "attribute name '{}' is reserved",
                    name
                );
                self.0.set_attr(name, value.clone())
            }

            fn get_json_attr(&self, name: &str) -> Result<Value> {
                self.0.get_attr(name)
            }
        }
    };
}

impl_attribute_op!(FsGroup);
impl_attribute_op!(FsDataset);

struct DatasetMeta {
    dtype: ScalarType,
    shape: Shape,
    compression: Option<Compression>,
}

impl FsDataset {
    fn data_path(&self) -> PathBuf {
        self.0.dir().join(DATA_FILE)
    }

    fn meta(&self) -> Result<DatasetMeta> {
        let attrs = self.0.read_attrs()?;
        let dtype = attrs
            .get("dataType")
            .and_then(|x| x.as_str())
            .ok_or_else(|| anyhow!("dataset is missing its 'dataType' attribute"))
            .and_then(ScalarType::from_str)?;
        let shape: Shape = attrs
            .get("dimensions")
            .and_then(|x| x.as_array())
            .ok_or_else(|| anyhow!("dataset is missing its 'dimensions' attribute"))?
            .iter()
            .map(|x| {
                x.as_u64()
                    .map(|d| d as usize)
                    .ok_or_else(|| anyhow!("malformed 'dimensions' attribute"))
            })
            .collect::<Result<Vec<_>>>()?
            .into();
        let compression = match attrs.get("compression") {
            None => None,
            Some(Value::String(s)) if s == "raw" => None,
            Some(Value::Object(o)) if o.get("type").and_then(|x| x.as_str()) == Some("gzip") => {
                let level = o.get("level").and_then(|x| x.as_u64()).unwrap_or(6) as u32;
                Some(Compression::Gzip(level))
            }
            Some(v) => bail!("malformed 'compression' attribute: {}", v),
        };
        Ok(DatasetMeta {
            dtype,
            shape,
            compression,
        })
    }

    /// Read and decode the entire value buffer.
    fn read_all<T: BackendData>(&self, meta: &DatasetMeta) -> Result<ArrayD<T>> {
        let nbytes = meta.shape.size() * T::ITEM_SIZE;
        let bytes = match meta.compression {
            None => fs::read(self.data_path())?,
            Some(Compression::Gzip(_)) => {
                let raw = fs::read(self.data_path())?;
                if raw.is_empty() {
                    // Never written: an all-zero buffer.
                    vec![0; nbytes]
                } else {
                    let mut out = Vec::with_capacity(nbytes);
                    GzDecoder::new(&raw[..]).read_to_end(&mut out)?;
                    out
                }
            }
        };
        ensure!(
            bytes.len() == nbytes,
            "dataset '{}' holds {} bytes but its shape {} requires {}",
            self.0.rel.display(),
            bytes.len(),
            meta.shape,
            nbytes
        );
        let values = bytes.chunks_exact(T::ITEM_SIZE).map(T::decode).collect();
        Ok(ArrayD::from_shape_vec(IxDyn(meta.shape.as_ref()), values)?)
    }

    fn write_all_bytes(&self, meta: &DatasetMeta, bytes: &[u8]) -> Result<()> {
        match meta.compression {
            None => fs::write(self.data_path(), bytes)?,
            Some(Compression::Gzip(level)) => {
                let file = File::create(self.data_path())?;
                let mut encoder = GzEncoder::new(file, flate2::Compression::new(level));
                encoder.write_all(bytes)?;
                encoder.finish()?;
            }
        }
        Ok(())
    }
}

/// Row-major element strides for a shape.
fn strides(shape: &Shape) -> Vec<usize> {
    let ndim = shape.ndim();
    let mut strides = vec![1; ndim];
    for k in (0..ndim.saturating_sub(1)).rev() {
        strides[k] = strides[k + 1] * shape[k + 1];
    }
    strides
}

/// Visit every contiguous run covered by a forward-slice selection, in
/// row-major output order. `f` receives the run's element offset in the
/// dataset and its length.
fn for_each_run(
    bounds: &SelectInfoBounds<'_>,
    mut f: impl FnMut(usize, usize) -> Result<()>,
) -> Result<()> {
    let sel = bounds.as_ref();
    let ndim = sel.len();
    let strides = strides(bounds.in_shape());
    let (last_start, run_len) = match &sel[ndim - 1] {
        SelectInfoElemBounds::Slice(SliceBounds { start, end, .. }) => (*start, end - start),
        _ => unreachable!("selection was checked to be contiguous"),
    };
    if run_len == 0 {
        return Ok(());
    }

    let outer: Vec<&SelectInfoElemBounds> = sel[..ndim - 1].iter().collect();
    let n_outer: usize = outer.iter().map(|x| x.len()).product();
    if outer.iter().any(|x| x.is_empty()) {
        return Ok(());
    }

    let mut counters = vec![0usize; outer.len()];
    for _ in 0..n_outer {
        let base: usize = counters
            .iter()
            .zip(&outer)
            .zip(&strides)
            .map(|((&c, sel), stride)| sel.index(c) * stride)
            .sum();
        f(base + last_start, run_len)?;

        for k in (0..counters.len()).rev() {
            counters[k] += 1;
            if counters[k] < outer[k].len() {
                break;
            }
            counters[k] = 0;
        }
    }
    Ok(())
}

impl DatasetOp<Fs> for FsDataset {
    fn dtype(&self) -> Result<ScalarType> {
        Ok(self.meta()?.dtype)
    }

    fn shape(&self) -> Result<Shape> {
        Ok(self.meta()?.shape)
    }

    fn reshape(&mut self, shape: &Shape) -> Result<()> {
        self.0.ensure_writable()?;
        let meta = self.meta()?;
        ensure!(
            meta.compression.is_none(),
            "compressed datasets cannot be resized"
        );
        ensure!(
            shape.ndim() == meta.shape.ndim()
                && shape.as_ref()[1..] == meta.shape.as_ref()[1..],
            "only the leading axis can be resized: {} -> {}",
            meta.shape,
            shape
        );
        let mut attrs = self.0.read_attrs()?;
        attrs.insert(
            "dimensions".to_string(),
            shape.as_ref().iter().map(|&x| x as u64).collect::<Vec<_>>().into(),
        );
        self.0.write_attrs(&attrs)?;

        let file = OpenOptions::new().write(true).open(self.data_path())?;
        file.set_len((shape.size() * meta.dtype.item_size()) as u64)?;
        Ok(())
    }

    fn read_array_slice<T: BackendData, S, D>(&self, selection: &[S]) -> Result<Array<T, D>>
    where
        S: AsRef<SelectInfoElem>,
        D: Dimension,
    {
        let meta = self.meta()?;
        ensure!(
            T::DTYPE == meta.dtype,
            "dataset '{}' holds {} elements, not {}",
            self.0.rel.display(),
            meta.dtype,
            T::DTYPE
        );
        let bounds = SelectInfoBounds::new(selection, &meta.shape)?;

        let arr = if meta.compression.is_some() || !bounds.is_contiguous() {
            if meta.compression.is_none() {
                log::debug!(
                    "non-contiguous selection on '{}', falling back to a full read",
                    self.0.rel.display()
                );
            }
            select_dyn(&self.read_all::<T>(&meta)?.view(), &bounds)
        } else {
            let out_shape = bounds.out_shape();
            let mut values: Vec<T> = Vec::with_capacity(out_shape.size());
            let mut file = File::open(self.data_path())?;
            let mut buf = Vec::new();
            for_each_run(&bounds, |offset, len| {
                buf.resize(len * T::ITEM_SIZE, 0);
                file.seek(SeekFrom::Start((offset * T::ITEM_SIZE) as u64))?;
                file.read_exact(&mut buf)?;
                values.extend(buf.chunks_exact(T::ITEM_SIZE).map(T::decode));
                Ok(())
            })?;
            ArrayD::from_shape_vec(IxDyn(out_shape.as_ref()), values)?
        };
        Ok(arr.into_dimensionality::<D>()?)
    }

    fn write_array_slice<S, T, D>(&self, arr: CowArray<'_, T, D>, selection: &[S]) -> Result<()>
    where
        T: BackendData,
        S: AsRef<SelectInfoElem>,
        D: Dimension,
    {
        self.0.ensure_writable()?;
        let meta = self.meta()?;
        ensure!(
            T::DTYPE == meta.dtype,
            "dataset '{}' holds {} elements, not {}",
            self.0.rel.display(),
            meta.dtype,
            T::DTYPE
        );
        let bounds = SelectInfoBounds::new(selection, &meta.shape)?;
        let out_shape = bounds.out_shape();
        ensure!(
            arr.shape() == out_shape.as_ref(),
            "data of shape {:?} does not fit a selection of shape {}",
            arr.shape(),
            out_shape
        );

        let arr = arr.into_dyn();
        if meta.compression.is_some() {
            ensure!(
                selection.iter().all(|x| x.as_ref().is_full()),
                "compressed datasets support full-array writes only"
            );
            let std = arr.as_standard_layout();
            let mut bytes = Vec::with_capacity(std.len() * T::ITEM_SIZE);
            for v in std.iter() {
                v.encode(&mut bytes);
            }
            return self.write_all_bytes(&meta, &bytes);
        }

        if bounds.is_contiguous() {
            let std = arr.as_standard_layout();
            let mut elems = std.iter();
            let mut file = OpenOptions::new().write(true).open(self.data_path())?;
            let mut buf = Vec::new();
            for_each_run(&bounds, |offset, len| {
                buf.clear();
                for _ in 0..len {
                    elems
                        .next()
                        .ok_or_else(|| anyhow!("selection larger than the provided data"))?
                        .encode(&mut buf);
                }
                file.seek(SeekFrom::Start((offset * T::ITEM_SIZE) as u64))?;
                file.write_all(&buf)?;
                Ok(())
            })?;
        } else {
            // Scattered write: fetch, patch, rewrite.
            let mut full = self.read_all::<T>(&meta)?;
            let sel = bounds.as_ref();
            for (idx, v) in arr.indexed_iter() {
                let target: Vec<usize> = (0..idx.ndim()).map(|k| sel[k].index(idx[k])).collect();
                full[target.as_slice()] = v.clone();
            }
            let std = full.as_standard_layout();
            let mut bytes = Vec::with_capacity(std.len() * T::ITEM_SIZE);
            for v in std.iter() {
                v.encode(&mut bytes);
            }
            self.write_all_bytes(&meta, &bytes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s;
    use ndarray::{concatenate, Array, Array1, Array2, Axis, Ix1, Ix2};
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use std::path::PathBuf;
    use tempfile::tempdir;

    pub fn with_tmp_dir<T, F: FnMut(PathBuf) -> T>(mut func: F) -> T {
        let dir = tempdir().unwrap();
        let path = dir.path().to_path_buf();
        func(path)
    }

    fn with_tmp_path<T, F: Fn(PathBuf) -> T>(func: F) -> T {
        with_tmp_dir(|dir| func(dir.join("store")))
    }

    #[test]
    fn test_basic() -> Result<()> {
        with_tmp_path(|path| {
            let store = Fs::new(&path)?;
            let group = store.new_group("group")?;
            let subgroup = group.new_group("subgroup")?;

            assert_eq!(subgroup.path(), PathBuf::from("/group/subgroup"));
            assert_eq!(store.list()?, vec!["group"]);
            assert!(group.exists("subgroup")?);
            group.delete("subgroup")?;
            assert!(!group.exists("subgroup")?);
            store.close()
        })
    }

    #[test]
    fn test_attrs() -> Result<()> {
        with_tmp_path(|path| {
            let store = Fs::new(&path)?;
            let mut group = store.new_group("group")?;
            group.new_str_attr("encoding-type", "mapping")?;
            group.new_usize_attr("length", 42)?;
            assert_eq!(group.get_str_attr("encoding-type")?, "mapping");
            assert_eq!(group.get_usize_attr("length")?, 42);
            assert!(group.get_json_attr("missing").is_err());
            assert!(group.new_str_attr("dataType", "oops").is_err());
            Ok(())
        })
    }

    #[test]
    fn test_write_empty() -> Result<()> {
        with_tmp_path(|path| {
            let store = Fs::new(&path)?;
            let group = store.new_group("group")?;
            let empty = Array1::<u8>::from_vec(Vec::new());
            let dataset =
                group.new_array_dataset("test", empty.view().into(), WriteConfig::default())?;
            assert_eq!(empty, dataset.read_array::<u8, Ix1>()?);
            Ok(())
        })
    }

    #[test]
    fn test_write_slice() -> Result<()> {
        with_tmp_path(|path| -> Result<()> {
            let store = Fs::new(&path)?;
            let mut dataset = store.new_empty_dataset::<i32>(
                "test",
                &[20, 50].as_slice().into(),
                WriteConfig::default(),
            )?;
            let arr = Array::random((20, 50), Uniform::new(0, 100));

            // Repeatitive writes
            dataset.write_array_slice(arr.view().into(), s![.., ..].as_ref())?;
            dataset.write_array_slice(arr.view().into(), s![.., ..].as_ref())?;

            // Out-of-bounds writes should fail
            assert!(dataset
                .write_array_slice(arr.view().into(), s![20..40, ..].as_ref())
                .is_err());

            // Reshape and write
            dataset.reshape(&[40, 50].as_slice().into())?;
            dataset.write_array_slice(arr.view().into(), s![20..40, ..].as_ref())?;

            // Read back is OK
            let merged = concatenate(Axis(0), &[arr.view(), arr.view()])?;
            assert_eq!(merged, dataset.read_array::<i32, _>()?);

            // Shrinking is OK
            dataset.reshape(&[20, 50].as_slice().into())?;
            assert_eq!(arr, dataset.read_array::<i32, _>()?);

            Ok(())
        })
    }

    #[test]
    fn test_partial_read() -> Result<()> {
        with_tmp_path(|path| -> Result<()> {
            let store = Fs::new(&path)?;
            let arr = Array::random((30, 7), Uniform::new(-100i64, 100));
            let dataset =
                store.new_array_dataset("x", arr.view().into(), WriteConfig::default())?;

            let sub: Array2<i64> = dataset.read_array_slice(s![3..11, 2..5].as_ref())?;
            assert_eq!(sub, arr.slice(ndarray::s![3..11, 2..5]));

            let row: Array2<i64> = dataset.read_array_slice(s![4..5, ..].as_ref())?;
            assert_eq!(row, arr.slice(ndarray::s![4..5, ..]));

            // Index lists go through the full-read fallback.
            let picked: Array2<i64> =
                dataset.read_array_slice(s![vec![0, 29, 3], 1..3].as_ref())?;
            assert_eq!(picked.shape(), &[3, 2]);
            assert_eq!(picked.row(1), arr.slice(ndarray::s![29, 1..3]));

            Ok(())
        })
    }

    #[test]
    fn test_compression_roundtrip() -> Result<()> {
        with_tmp_path(|path| -> Result<()> {
            let store = Fs::new(&path)?;
            let arr = Array::random(4096, Uniform::new(0u16, 4));
            let config = WriteConfig {
                compression: Some(Compression::Gzip(4)),
            };
            let dataset = store.new_array_dataset("z", arr.view().into(), config)?;
            assert_eq!(arr, dataset.read_array::<u16, Ix1>()?);

            let sub: Array1<u16> = dataset.read_array_slice(s![100..200].as_ref())?;
            assert_eq!(sub, arr.slice(ndarray::s![100..200]));
            Ok(())
        })
    }

    #[test]
    fn test_readonly() -> Result<()> {
        with_tmp_path(|path| -> Result<()> {
            let store = Fs::new(&path)?;
            let arr = Array1::from_vec(vec![1.0f64, 2.0, 3.0]);
            store.new_array_dataset("x", arr.view().into(), WriteConfig::default())?;
            store.close()?;

            let store = Fs::open(&path)?;
            assert!(store.new_group("g").is_err());
            assert!(store.delete("x").is_err());
            let dataset = store.open_dataset("x")?;
            assert!(dataset
                .write_array_slice(arr.view().into(), s![..].as_ref())
                .is_err());
            assert_eq!(arr, dataset.read_array::<f64, Ix1>()?);
            store.close()
        })
    }
}
