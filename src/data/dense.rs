use crate::backend::{
    Backend, BackendData, DataContainer, DataType, DatasetOp, DynArray, GroupOp,
};
use crate::data::{
    slice::{SelectInfoBounds, SelectInfoElem, Shape},
    traits::*,
    utils::select_dyn,
};
use crate::macros::dyn_map;

use anyhow::Result;
use ndarray::{Array, ArrayView, Dimension, RemoveAxis};

impl<'a, T: BackendData, D: Dimension> Element for ArrayView<'a, T, D> {
    fn data_type(&self) -> DataType {
        DataType::Array(T::DTYPE)
    }

    fn metadata(&self) -> MetaData {
        MetaData::new("array", "0.1.0", None)
    }
}

impl<'a, T: BackendData, D: Dimension> Writable for ArrayView<'a, T, D> {
    fn write<B: Backend, G: GroupOp<B>>(
        &self,
        location: &G,
        name: &str,
    ) -> Result<DataContainer<B>> {
        let dataset = location.new_array_dataset(name, self.view().into(), Default::default())?;
        let mut container = DataContainer::<B>::Dataset(dataset);
        self.metadata().save(&mut container)?;
        Ok(container)
    }
}

impl<T: BackendData, D: Dimension> Element for Array<T, D> {
    fn data_type(&self) -> DataType {
        DataType::Array(T::DTYPE)
    }

    fn metadata(&self) -> MetaData {
        MetaData::new("array", "0.1.0", None)
    }
}

impl<T: BackendData, D: Dimension> Writable for Array<T, D> {
    fn write<B: Backend, G: GroupOp<B>>(
        &self,
        location: &G,
        name: &str,
    ) -> Result<DataContainer<B>> {
        self.view().write(location, name)
    }
}

impl<T: BackendData, D: Dimension> HasShape for Array<T, D> {
    fn shape(&self) -> Shape {
        self.shape().to_vec().into()
    }
}

impl<'a, T: BackendData, D: Dimension> HasShape for ArrayView<'a, T, D> {
    fn shape(&self) -> Shape {
        self.shape().to_vec().into()
    }
}

impl<T: BackendData, D: RemoveAxis> Selectable for Array<T, D> {
    fn select<S>(&self, info: &[S]) -> Result<Self>
    where
        S: AsRef<SelectInfoElem>,
    {
        let bounds = SelectInfoBounds::new(info, &HasShape::shape(self))?;
        let selected = select_dyn(&self.view().into_dyn(), &bounds);
        Ok(selected.into_dimensionality::<D>()?)
    }
}

impl<T: BackendData, D: RemoveAxis> Readable for Array<T, D> {
    fn read<B: Backend>(container: &DataContainer<B>) -> Result<Self> {
        container.as_dataset()?.read_array::<T, D>()
    }
}

impl<T: BackendData, D: RemoveAxis> ReadableArray for Array<T, D> {
    fn get_shape<B: Backend>(container: &DataContainer<B>) -> Result<Shape> {
        container.as_dataset()?.shape()
    }

    fn read_select<B, S>(container: &DataContainer<B>, info: &[S]) -> Result<Self>
    where
        B: Backend,
        S: AsRef<SelectInfoElem>,
    {
        container.as_dataset()?.read_array_slice(info)
    }
}

impl<T: BackendData, D: Dimension> WritableArray for Array<T, D> {}
impl<T: BackendData, D: Dimension> WritableArray for &Array<T, D> {}
impl<'a, T: BackendData, D: Dimension> WritableArray for ArrayView<'a, T, D> {}

impl Element for DynArray {
    fn data_type(&self) -> DataType {
        DataType::Array(self.dtype())
    }

    fn metadata(&self) -> MetaData {
        MetaData::new("array", "0.1.0", None)
    }
}

impl Writable for DynArray {
    fn write<B: Backend, G: GroupOp<B>>(
        &self,
        location: &G,
        name: &str,
    ) -> Result<DataContainer<B>> {
        macro_rules! write_arr {
            ($variant:ident, $exp:expr) => {
                $exp.write(location, name)
            };
        }
        dyn_map!(self, DynArray, write_arr)
    }
}

impl Readable for DynArray {
    fn read<B: Backend>(container: &DataContainer<B>) -> Result<Self> {
        container.as_dataset()?.read_dyn_array()
    }
}

impl HasShape for DynArray {
    fn shape(&self) -> Shape {
        DynArray::shape(self).into()
    }
}

impl Selectable for DynArray {
    fn select<S>(&self, info: &[S]) -> Result<Self>
    where
        S: AsRef<SelectInfoElem>,
    {
        macro_rules! sel {
            ($variant:ident, $exp:expr) => {
                Selectable::select($exp, info)?.into()
            };
        }
        Ok(dyn_map!(self, DynArray, sel))
    }
}

impl ReadableArray for DynArray {
    fn get_shape<B: Backend>(container: &DataContainer<B>) -> Result<Shape> {
        container.as_dataset()?.shape()
    }

    fn read_select<B, S>(container: &DataContainer<B>, info: &[S]) -> Result<Self>
    where
        B: Backend,
        S: AsRef<SelectInfoElem>,
    {
        container.as_dataset()?.read_dyn_array_slice(info)
    }
}

impl WritableArray for DynArray {}
