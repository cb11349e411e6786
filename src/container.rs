//! Lazy handles over persisted elements.
//!
//! Binding a handle to a container transfers no element data; shapes and
//! dtypes are captured at bind time, and element data moves only when a
//! concrete region is requested.

use crate::backend::{
    AttributeOp, Backend, BackendData, DataContainer, DataType, DatasetOp, DynArray, GroupOp,
    ScalarType,
};
use crate::data::{
    ragged::read_row, RaggedArray, Readable, ReadableArray, Selectable, SelectInfoElem, Shape,
};

use anyhow::{bail, ensure, Result};
use parking_lot::{Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Slot stores an optional object wrapped by Arc and Mutex.
/// Encapsulating an object inside a slot allows us to drop the object from all references.
#[derive(Debug)]
pub struct Slot<T>(pub(crate) Arc<Mutex<Option<T>>>);

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Slot(self.0.clone())
    }
}

impl<T> std::fmt::Display for Slot<T>
where
    T: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "Empty or closed slot")
        } else {
            write!(f, "{}", self.inner().deref())
        }
    }
}

impl<T> Slot<T> {
    /// Create a slot from data.
    pub fn new(x: T) -> Self {
        Slot(Arc::new(Mutex::new(Some(x))))
    }

    /// Create an empty slot.
    pub fn none() -> Self {
        Slot(Arc::new(Mutex::new(None)))
    }

    pub fn is_none(&self) -> bool {
        self.0.lock().is_none()
    }

    pub fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.0.lock()
    }

    pub fn inner(&self) -> Inner<'_, T> {
        Inner(self.0.lock())
    }

    /// Insert data to the slot, and return the old data.
    pub fn insert(&self, data: T) -> Option<T> {
        std::mem::replace(self.0.lock().deref_mut(), Some(data))
    }

    /// Extract the data from the slot. The slot becomes empty after this operation.
    pub fn extract(&self) -> Option<T> {
        self.0.lock().take()
    }

    /// Remove the data from the slot.
    pub fn drop(&self) {
        let _ = self.extract();
    }
}

pub struct Inner<'a, T>(pub MutexGuard<'a, Option<T>>);

impl<T> Deref for Inner<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        match &self.0.deref() {
            None => panic!("accessing an empty slot"),
            Some(x) => x,
        }
    }
}

impl<T> DerefMut for Inner<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self.0.deref_mut() {
            None => panic!("accessing an empty slot"),
            Some(ref mut x) => x,
        }
    }
}

/// Lazy handle over a persisted dense array.
#[derive(Debug)]
pub struct InnerArrayElem<B: Backend> {
    dtype: ScalarType,
    shape: Shape,
    cache_enabled: bool,
    container: DataContainer<B>,
    element: Option<DynArray>,
}

impl<B: Backend> std::fmt::Display for InnerArrayElem<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} array element of shape {}, cached: {}",
            self.dtype,
            self.shape,
            if self.element.is_some() { "yes" } else { "no" },
        )
    }
}

impl<B: Backend> InnerArrayElem<B> {
    pub fn dtype(&self) -> ScalarType {
        self.dtype
    }

    /// Declared extents, available without any element I/O.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn enable_cache(&mut self) {
        self.cache_enabled = true;
    }

    pub fn disable_cache(&mut self) {
        if self.element.is_some() {
            self.element = None;
        }
        self.cache_enabled = false;
    }

    /// Materialize the whole array.
    pub fn data(&mut self) -> Result<DynArray> {
        match self.element.as_ref() {
            Some(data) => Ok(data.clone()),
            None => {
                let data = DynArray::read(&self.container)?;
                if self.cache_enabled {
                    self.element = Some(data.clone());
                }
                Ok(data)
            }
        }
    }

    /// Materialize only the selected region. When nothing is cached this
    /// reads just the bytes the region needs.
    pub fn select<S>(&mut self, selection: &[S]) -> Result<DynArray>
    where
        S: AsRef<SelectInfoElem>,
    {
        if selection.iter().all(|x| x.as_ref().is_full()) {
            self.data()
        } else {
            match self.element.as_ref() {
                Some(data) => data.select(selection),
                None => DynArray::read_select(&self.container, selection),
            }
        }
    }
}

pub type ArrayElem<B> = Slot<InnerArrayElem<B>>;

impl<B: Backend> TryFrom<DataContainer<B>> for ArrayElem<B> {
    type Error = anyhow::Error;

    fn try_from(container: DataContainer<B>) -> Result<Self> {
        match container.encoding_type()? {
            DataType::Array(dtype) => {
                let shape = container.as_dataset()?.shape()?;
                Ok(Slot::new(InnerArrayElem {
                    dtype,
                    shape,
                    cache_enabled: false,
                    container,
                    element: None,
                }))
            }
            ty => bail!("Expecting an array but found: '{}'", ty),
        }
    }
}

impl<B: Backend> ArrayElem<B> {
    /// Delete and remove the data from the element.
    pub fn clear(&self) -> Result<()> {
        if let Some(elem) = self.extract() {
            DataContainer::delete(elem.container)?;
        }
        Ok(())
    }

    pub fn dtype(&self) -> ScalarType {
        self.inner().dtype()
    }

    pub fn shape(&self) -> Shape {
        self.inner().shape().clone()
    }

    pub fn data(&self) -> Result<DynArray> {
        self.inner().data()
    }

    pub fn select<S>(&self, selection: &[S]) -> Result<DynArray>
    where
        S: AsRef<SelectInfoElem>,
    {
        self.inner().select(selection)
    }
}

/// Lazy handle over a persisted ragged array of `T` elements.
#[derive(Debug)]
pub struct InnerRaggedElem<B: Backend, T> {
    length: usize,
    cache_enabled: bool,
    container: DataContainer<B>,
    element: Option<RaggedArray<T>>,
}

impl<B: Backend, T: BackendData> std::fmt::Display for InnerRaggedElem<B, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ragged element with {} rows, cached: {}",
            T::DTYPE,
            self.length,
            if self.element.is_some() { "yes" } else { "no" },
        )
    }
}

impl<B: Backend, T: BackendData> InnerRaggedElem<B, T> {
    pub fn row_count(&self) -> usize {
        self.length
    }

    pub fn enable_cache(&mut self) {
        self.cache_enabled = true;
    }

    pub fn disable_cache(&mut self) {
        if self.element.is_some() {
            self.element = None;
        }
        self.cache_enabled = false;
    }

    /// Materialize the whole ragged array.
    pub fn data(&mut self) -> Result<RaggedArray<T>> {
        match self.element.as_ref() {
            Some(arr) => Ok(arr.clone()),
            None => {
                let arr = RaggedArray::read(&self.container)?;
                if self.cache_enabled {
                    self.element = Some(arr.clone());
                }
                Ok(arr)
            }
        }
    }

    /// Fetch one row. Backed access touches only the two offsets that
    /// delimit the row and the value range they cover.
    pub fn get_row(&mut self, index: usize) -> Result<Vec<T>> {
        if let Some(arr) = self.element.as_ref() {
            return arr.get_row(index).map(|row| row.to_vec());
        }
        read_row::<B, T>(self.container.as_group()?, index, self.length)
    }

    pub fn select_rows<S: AsRef<SelectInfoElem>>(&mut self, rows: S) -> Result<RaggedArray<T>> {
        if rows.as_ref().is_full() {
            return self.data();
        }
        match self.element.as_ref() {
            Some(arr) => arr.select_rows(rows),
            None => RaggedArray::read_select(&self.container, &[rows]),
        }
    }
}

pub type RaggedElem<B, T> = Slot<InnerRaggedElem<B, T>>;

impl<B: Backend, T: BackendData> TryFrom<DataContainer<B>> for RaggedElem<B, T> {
    type Error = anyhow::Error;

    fn try_from(container: DataContainer<B>) -> Result<Self> {
        match container.encoding_type()? {
            DataType::Ragged(ty) => {
                ensure!(
                    ty == T::DTYPE,
                    "ragged array holds {} elements, not {}",
                    ty,
                    T::DTYPE
                );
                let group = container.as_group()?;
                // The row count is stamped on the group; a hand-built
                // store may carry only the offsets dataset.
                let length = match group.get_usize_attr("length") {
                    Ok(n) => n,
                    Err(_) => group.open_dataset("row_ends")?.shape()?[0],
                };
                Ok(Slot::new(InnerRaggedElem {
                    length,
                    cache_enabled: false,
                    container,
                    element: None,
                }))
            }
            ty => bail!("Expecting a ragged array but found: '{}'", ty),
        }
    }
}

impl<B: Backend, T: BackendData> RaggedElem<B, T> {
    /// Delete and remove the data from the element.
    pub fn clear(&self) -> Result<()> {
        if let Some(elem) = self.extract() {
            DataContainer::delete(elem.container)?;
        }
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.inner().row_count()
    }

    pub fn data(&self) -> Result<RaggedArray<T>> {
        self.inner().data()
    }

    pub fn get_row(&self, index: usize) -> Result<Vec<T>> {
        self.inner().get_row(index)
    }

    pub fn select_rows<S: AsRef<SelectInfoElem>>(&self, rows: S) -> Result<RaggedArray<T>> {
        self.inner().select_rows(rows)
    }
}
