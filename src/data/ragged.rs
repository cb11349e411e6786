//! Ragged (variable-length row) arrays.
//!
//! Rows are stored as two flat buffers: the concatenated values and one
//! exclusive end offset per row, so looking up row `i` touches
//! `row_ends[i-1..=i]` and the value range they delimit, nothing else.
//! That property carries over to persisted arrays: backed row access
//! reads exactly two offsets and one contiguous value range.

use crate::backend::{
    AttributeOp, Backend, BackendData, DataContainer, DataType, DatasetOp, GroupOp,
};
use crate::data::{
    slice::{SelectInfoElem, SelectInfoElemBounds, Shape, SliceBounds},
    traits::*,
    utils::{ragged_major_index, ragged_major_slice, row_bounds, ExtendableDataset},
};
use crate::error::StoreError;

use anyhow::{bail, ensure, Result};
use ndarray::{ArrayView1, Ix1};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct RaggedArray<T> {
    values: Vec<T>,
    row_ends: Vec<usize>,
}

impl<T> RaggedArray<T> {
    /// Reassemble from the two flat buffers, validating the offset
    /// invariant. This is the only way persisted buffers re-enter the
    /// type, so a corrupted store is caught here rather than surfacing
    /// as a mismatched row later.
    pub fn from_parts(values: Vec<T>, row_ends: Vec<usize>) -> Result<Self> {
        check_row_ends(&row_ends, values.len())?;
        Ok(Self { values, row_ends })
    }

    pub fn from_rows<I, R>(rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = T>,
    {
        let mut values = Vec::new();
        let mut row_ends = Vec::new();
        for row in rows {
            values.extend(row);
            row_ends.push(values.len());
        }
        Self { values, row_ends }
    }

    pub fn row_count(&self) -> usize {
        self.row_ends.len()
    }

    /// Total number of stored elements across all rows.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn row_ends(&self) -> &[usize] {
        &self.row_ends
    }

    pub fn get_row(&self, index: usize) -> Result<&[T]> {
        if index >= self.row_count() {
            return Err(StoreError::IndexOutOfRange {
                index,
                rows: self.row_count(),
            }
            .into());
        }
        let (start, end) = row_bounds(&self.row_ends, index);
        Ok(&self.values[start..end])
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.row_count()).map(move |i| {
            let (start, end) = row_bounds(&self.row_ends, i);
            &self.values[start..end]
        })
    }

    /// The two flat buffers, for persistence.
    pub fn into_parts(self) -> (Vec<T>, Vec<usize>) {
        (self.values, self.row_ends)
    }
}

impl<T: Clone> RaggedArray<T> {
    /// Select rows, in selection order.
    pub fn select_rows<S: AsRef<SelectInfoElem>>(&self, rows: S) -> Result<Self> {
        self.select(&[rows.as_ref()])
    }
}

fn check_row_ends(row_ends: &[usize], n_values: usize) -> Result<()> {
    if let Some(w) = row_ends.windows(2).find(|w| w[0] > w[1]) {
        return Err(StoreError::CorruptData(format!(
            "row_ends is not non-decreasing: {} followed by {}",
            w[0], w[1]
        ))
        .into());
    }
    match row_ends.last() {
        Some(&last) if last != n_values => Err(StoreError::CorruptData(format!(
            "row_ends closes at {} but the value buffer holds {} elements",
            last, n_values
        ))
        .into()),
        None if n_values != 0 => Err(StoreError::CorruptData(format!(
            "no rows, yet the value buffer holds {} elements",
            n_values
        ))
        .into()),
        _ => Ok(()),
    }
}

/// Incremental construction of a [`RaggedArray`]. `finish` freezes the
/// builder; appending afterwards fails with `InvalidState`.
#[derive(Debug)]
pub struct RaggedArrayBuilder<T> {
    values: Vec<T>,
    row_ends: Vec<usize>,
    finished: bool,
}

impl<T> Default for RaggedArrayBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RaggedArrayBuilder<T> {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            row_ends: Vec::new(),
            finished: false,
        }
    }

    /// Append one row (possibly empty) and return its index.
    pub fn append_row<I: IntoIterator<Item = T>>(&mut self, row: I) -> Result<usize> {
        if self.finished {
            return Err(StoreError::InvalidState("the builder is already finished").into());
        }
        self.values.extend(row);
        self.row_ends.push(self.values.len());
        Ok(self.row_ends.len() - 1)
    }

    pub fn row_count(&self) -> usize {
        self.row_ends.len()
    }

    pub fn finish(&mut self) -> Result<RaggedArray<T>> {
        if self.finished {
            return Err(StoreError::InvalidState("the builder is already finished").into());
        }
        self.finished = true;
        Ok(RaggedArray {
            values: std::mem::take(&mut self.values),
            row_ends: std::mem::take(&mut self.row_ends),
        })
    }
}

impl<T: BackendData> Element for RaggedArray<T> {
    fn data_type(&self) -> DataType {
        DataType::Ragged(T::DTYPE)
    }

    fn metadata(&self) -> MetaData {
        let mut metadata = HashMap::new();
        metadata.insert("length".to_string(), self.row_count().into());
        MetaData::new("ragged-array", "0.1.0", Some(metadata))
    }
}

impl<T> HasShape for RaggedArray<T> {
    fn shape(&self) -> Shape {
        self.row_count().into()
    }
}

impl<T: Clone> Selectable for RaggedArray<T> {
    fn select<S>(&self, info: &[S]) -> Result<Self>
    where
        S: AsRef<SelectInfoElem>,
    {
        ensure!(info.len() == 1, "ragged arrays are selected along rows only");
        let sel = SelectInfoElemBounds::new(info[0].as_ref(), 0, self.row_count())?;
        let (row_ends, values) = match sel {
            SelectInfoElemBounds::Slice(SliceBounds { start, end, step: 1 }) => {
                let (ends, values) = ragged_major_slice(start, end, &self.row_ends, &self.values);
                (ends, values.to_vec())
            }
            SelectInfoElemBounds::Slice(s) => ragged_major_index(
                (0..s.len()).map(|i| s.index(i)),
                &self.row_ends,
                &self.values,
            ),
            SelectInfoElemBounds::Index(idx) => {
                ragged_major_index(idx.iter().copied(), &self.row_ends, &self.values)
            }
        };
        Ok(Self { values, row_ends })
    }
}

impl<T: BackendData> Writable for RaggedArray<T> {
    fn write<B: Backend, G: GroupOp<B>>(
        &self,
        location: &G,
        name: &str,
    ) -> Result<DataContainer<B>> {
        let mut group = location.new_group(name)?;
        self.metadata().save(&mut group)?;

        group.new_array_dataset(
            "data",
            ArrayView1::from(self.values.as_slice()).into(),
            Default::default(),
        )?;
        let ends: Vec<u64> = self.row_ends.iter().map(|&x| x as u64).collect();
        let mut ends_dataset = group.new_array_dataset(
            "row_ends",
            ArrayView1::from(ends.as_slice()).into(),
            Default::default(),
        )?;
        // The offsets dataset names the value dataset it indexes.
        ends_dataset.new_str_attr("target", "data")?;

        Ok(DataContainer::Group(group))
    }
}

impl<T: BackendData> Readable for RaggedArray<T> {
    fn read<B: Backend>(container: &DataContainer<B>) -> Result<Self> {
        match container.encoding_type()? {
            DataType::Ragged(_) => {
                let group = container.as_group()?;
                let values = group
                    .open_dataset("data")?
                    .read_array::<T, Ix1>()?
                    .into_raw_vec();
                let row_ends = group
                    .open_dataset("row_ends")?
                    .read_array_cast::<usize, Ix1>()?
                    .into_raw_vec();
                RaggedArray::from_parts(values, row_ends)
            }
            ty => bail!("cannot read a ragged array from a container of type {:?}", ty),
        }
    }
}

impl<T: BackendData> ReadableArray for RaggedArray<T> {
    fn get_shape<B: Backend>(container: &DataContainer<B>) -> Result<Shape> {
        Ok(container.as_group()?.get_usize_attr("length")?.into())
    }

    fn read_select<B, S>(container: &DataContainer<B>, info: &[S]) -> Result<Self>
    where
        B: Backend,
        S: AsRef<SelectInfoElem>,
    {
        ensure!(info.len() == 1, "ragged arrays are selected along rows only");
        if info[0].as_ref().is_full() {
            return Self::read(container);
        }
        match container.encoding_type()? {
            DataType::Ragged(_) => {
                let group = container.as_group()?;
                let nrows = group.open_dataset("row_ends")?.shape()?[0];
                let sel = SelectInfoElemBounds::new(info[0].as_ref(), 0, nrows)?;
                match sel {
                    SelectInfoElemBounds::Slice(SliceBounds { start, end, step: 1 }) => {
                        read_row_range::<B, T>(group, start, end)
                    }
                    SelectInfoElemBounds::Slice(s) => {
                        read_rows::<B, T, _>(group, (0..s.len()).map(|i| s.index(i)), nrows)
                    }
                    SelectInfoElemBounds::Index(idx) => {
                        read_rows::<B, T, _>(group, idx.iter().copied(), nrows)
                    }
                }
            }
            ty => bail!("cannot read a ragged array from a container of type {:?}", ty),
        }
    }
}

impl<T: BackendData> WritableArray for RaggedArray<T> {}
impl<T: BackendData> WritableArray for &RaggedArray<T> {}

/// Read one row from a persisted ragged array, touching only the two
/// offsets that delimit it and the value range they cover.
pub(crate) fn read_row<B: Backend, T: BackendData>(
    group: &B::Group,
    index: usize,
    nrows: usize,
) -> Result<Vec<T>> {
    if index >= nrows {
        return Err(StoreError::IndexOutOfRange { index, rows: nrows }.into());
    }
    let selected = read_row_range::<B, T>(group, index, index + 1)?;
    Ok(selected.into_parts().0)
}

/// Read the contiguous row range `start..end` from a persisted ragged
/// array: one windowed read of the offsets, one contiguous read of the
/// values, offsets rebased to zero.
pub(crate) fn read_row_range<B: Backend, T: BackendData>(
    group: &B::Group,
    start: usize,
    end: usize,
) -> Result<RaggedArray<T>> {
    if start == end {
        return RaggedArray::from_parts(Vec::new(), Vec::new());
    }
    let ends_dataset = group.open_dataset("row_ends")?;
    let window_start = start.saturating_sub(1);
    let window = ends_dataset
        .read_array_slice_cast::<usize, Ix1, _>(&[SelectInfoElem::from(window_start..end)])?
        .into_raw_vec();

    let (lo, ends_abs) = if start == 0 {
        (0, &window[..])
    } else {
        (window[0], &window[1..])
    };
    if let Some(w) = window.windows(2).find(|w| w[0] > w[1]) {
        return Err(StoreError::CorruptData(format!(
            "row_ends is not non-decreasing: {} followed by {}",
            w[0], w[1]
        ))
        .into());
    }

    let data_dataset = group.open_dataset("data")?;
    let n_values = data_dataset.shape()?[0];
    let hi = *ends_abs.last().unwrap_or(&lo);
    if hi > n_values {
        return Err(StoreError::CorruptData(format!(
            "row_ends reaches {} but the value buffer holds {} elements",
            hi, n_values
        ))
        .into());
    }

    let values = if lo == hi {
        Vec::new()
    } else {
        data_dataset
            .read_array_slice::<T, _, Ix1>(&[SelectInfoElem::from(lo..hi)])?
            .into_raw_vec()
    };
    let row_ends = ends_abs.iter().map(|&x| x - lo).collect();
    RaggedArray::from_parts(values, row_ends)
}

fn read_rows<B, T, I>(group: &B::Group, rows: I, nrows: usize) -> Result<RaggedArray<T>>
where
    B: Backend,
    T: BackendData,
    I: Iterator<Item = usize>,
{
    let mut values = Vec::new();
    let mut row_ends = Vec::new();
    for i in rows {
        values.extend(read_row::<B, T>(group, i, nrows)?);
        row_ends.push(values.len());
    }
    RaggedArray::from_parts(values, row_ends)
}

/// Stream rows straight into the backing store without holding all
/// values in memory. The result is indistinguishable from writing a
/// finished [`RaggedArray`].
pub struct RaggedWriter<B: Backend, T> {
    group: B::Group,
    values: ExtendableDataset<B, T>,
    row_ends: ExtendableDataset<B, u64>,
    nrows: usize,
}

impl<B: Backend, T: BackendData> RaggedWriter<B, T> {
    pub fn new<G: GroupOp<B>>(location: &G, name: &str) -> Result<Self> {
        let group = location.new_group(name)?;
        let values = ExtendableDataset::with_capacity(&group, "data", 10000)?;
        let row_ends = ExtendableDataset::with_capacity(&group, "row_ends", 1000)?;
        Ok(Self {
            group,
            values,
            row_ends,
            nrows: 0,
        })
    }

    pub fn append_row(&mut self, row: &[T]) -> Result<usize> {
        self.values.extend(ArrayView1::from(row))?;
        let end = [self.values.size() as u64];
        self.row_ends.extend(ArrayView1::from(&end[..]))?;
        self.nrows += 1;
        Ok(self.nrows - 1)
    }

    pub fn row_count(&self) -> usize {
        self.nrows
    }

    pub fn finish(self) -> Result<DataContainer<B>> {
        let Self {
            mut group,
            values,
            row_ends,
            nrows,
        } = self;
        values.finish()?;
        let mut ends_dataset = row_ends.finish()?;
        ends_dataset.new_str_attr("target", "data")?;

        let mut metadata = HashMap::new();
        metadata.insert("length".to_string(), nrows.into());
        MetaData::new("ragged-array", "0.1.0", Some(metadata)).save(&mut group)?;
        Ok(DataContainer::Group(group))
    }
}

#[cfg(test)]
mod ragged_tests {
    use super::*;
    use crate::s;

    fn naive_rows<T: Clone>(arr: &RaggedArray<T>) -> Vec<Vec<T>> {
        arr.iter_rows().map(|r| r.to_vec()).collect()
    }

    #[test]
    fn test_builder_roundtrip() {
        let rows: Vec<Vec<f64>> = vec![vec![1.0, 2.0, 3.0], vec![], vec![4.0]];
        let mut builder = RaggedArrayBuilder::new();
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(builder.append_row(row.clone()).unwrap(), i);
        }
        let arr = builder.finish().unwrap();

        assert_eq!(arr.row_count(), 3);
        assert_eq!(arr.len(), 4);
        assert_eq!(arr.row_ends(), &[3, 3, 4]);
        assert_eq!(arr.values(), &[1.0, 2.0, 3.0, 4.0]);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(arr.get_row(i).unwrap(), row.as_slice());
        }
    }

    #[test]
    fn test_finish_is_final() {
        let mut builder = RaggedArrayBuilder::<i32>::new();
        builder.append_row(vec![1, 2]).unwrap();
        builder.finish().unwrap();

        let err = builder.append_row(vec![3]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::InvalidState(_))
        ));
        let err = builder.finish().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::InvalidState(_))
        ));
    }

    #[test]
    fn test_get_row_bounds() {
        let empty = RaggedArray::<i64>::from_rows(Vec::<Vec<i64>>::new());
        let err = empty.get_row(0).unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::IndexOutOfRange { index: 0, rows: 0 })
        );

        let arr = RaggedArray::from_rows(vec![vec![1i64], vec![2, 3]]);
        assert!(arr.get_row(1).is_ok());
        let err = arr.get_row(2).unwrap_err();
        assert_eq!(
            err.downcast_ref::<StoreError>(),
            Some(&StoreError::IndexOutOfRange { index: 2, rows: 2 })
        );
    }

    #[test]
    fn test_from_parts_validation() {
        // Non-monotonic offsets must be rejected.
        let err = RaggedArray::from_parts(vec![1, 2, 3, 4, 5], vec![3, 2, 5]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::CorruptData(_))
        ));

        // Offsets that do not close over the value buffer.
        let err = RaggedArray::from_parts(vec![1, 2, 3], vec![1, 2]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::CorruptData(_))
        ));

        // Zero rows is valid only with zero values.
        assert!(RaggedArray::<i32>::from_parts(vec![], vec![]).is_ok());
        assert!(RaggedArray::from_parts(vec![1], vec![]).is_err());

        // Empty rows everywhere are fine.
        let arr = RaggedArray::<i32>::from_parts(vec![], vec![0, 0, 0]).unwrap();
        assert_eq!(arr.row_count(), 3);
        assert_eq!(arr.get_row(1).unwrap(), &[] as &[i32]);
    }

    #[test]
    fn test_select_rows() {
        let rows = vec![vec![1i64, 2], vec![], vec![3], vec![4, 5, 6], vec![7]];
        let arr = RaggedArray::from_rows(rows.clone());

        // Contiguous slice.
        let sub = arr.select_rows(&s![1..4].0[0]).unwrap();
        assert_eq!(naive_rows(&sub), rows[1..4].to_vec());

        // Arbitrary order with repeats.
        let sub = arr.select_rows(&SelectInfoElem::from(vec![4, 0, 0, 2])).unwrap();
        assert_eq!(
            naive_rows(&sub),
            vec![vec![7i64], vec![1, 2], vec![1, 2], vec![3]]
        );

        // Out of range.
        let err = arr.select_rows(&SelectInfoElem::from(vec![5])).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::OutOfBounds { .. })
        ));
    }
}
