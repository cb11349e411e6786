use crate::backend::{Backend, BackendData, DatasetOp, GroupOp, WriteConfig};
use crate::data::slice::{SelectInfoBounds, SelectInfoElem};

use anyhow::Result;
use ndarray::{ArrayD, ArrayView1, ArrayViewD, Dimension, IxDyn};

/// Materialize a bounded selection from an in-memory array.
pub(crate) fn select_dyn<T: Clone>(arr: &ArrayViewD<'_, T>, bounds: &SelectInfoBounds<'_>) -> ArrayD<T> {
    let sel = bounds.as_ref();
    ArrayD::from_shape_fn(IxDyn(bounds.out_shape().as_ref()), |idx| {
        let src: Vec<usize> = (0..idx.ndim()).map(|k| sel[k].index(idx[k])).collect();
        arr[src.as_slice()].clone()
    })
}

/// Start and end offsets of row `i` given exclusive end offsets.
pub(crate) fn row_bounds(row_ends: &[usize], i: usize) -> (usize, usize) {
    let start = if i == 0 { 0 } else { row_ends[i - 1] };
    (start, row_ends[i])
}

/// Select the contiguous row range `start..end`: returns the end offsets
/// rebased to zero and the covered value range.
pub(crate) fn ragged_major_slice<'a, T>(
    start: usize,
    end: usize,
    row_ends: &[usize],
    values: &'a [T],
) -> (Vec<usize>, &'a [T]) {
    let lo = if start == 0 { 0 } else { row_ends[start - 1] };
    let hi = if end == start { lo } else { row_ends[end - 1] };
    let new_ends = row_ends[start..end].iter().map(|&x| x - lo).collect();
    (new_ends, &values[lo..hi])
}

/// Gather arbitrary rows in iteration order.
pub(crate) fn ragged_major_index<I, T>(
    rows: I,
    row_ends: &[usize],
    values: &[T],
) -> (Vec<usize>, Vec<T>)
where
    I: Iterator<Item = usize>,
    T: Clone,
{
    let mut new_ends = Vec::new();
    let mut new_values = Vec::new();
    let mut total = 0;
    rows.for_each(|i| {
        let (start, end) = row_bounds(row_ends, i);
        total += end - start;
        new_ends.push(total);
        new_values.extend_from_slice(&values[start..end]);
    });
    (new_ends, new_values)
}

/// A one-dimensional dataset that grows as data is appended, doubling
/// through `reshape` and shrinking to its true size on `finish`.
pub(crate) struct ExtendableDataset<B: Backend, T> {
    dataset: B::Dataset,
    capacity: usize,
    size: usize,
    elem_type: std::marker::PhantomData<T>,
}

impl<B: Backend, T: BackendData> ExtendableDataset<B, T> {
    pub fn with_capacity<G>(group: &G, name: &str, capacity: usize) -> Result<Self>
    where
        G: GroupOp<B>,
    {
        let dataset = group.new_empty_dataset::<T>(name, &capacity.into(), WriteConfig::default())?;
        Ok(Self {
            dataset,
            size: 0,
            capacity,
            elem_type: std::marker::PhantomData,
        })
    }

    fn check_or_grow(&mut self, size: usize, default: usize) -> Result<()> {
        if self.capacity < size {
            self.capacity += default.max(size - self.capacity);
            self.dataset.reshape(&self.capacity.into())
        } else {
            Ok(())
        }
    }

    pub fn extend(&mut self, data: ArrayView1<'_, T>) -> Result<()> {
        if !data.is_empty() {
            let new_size = self.size + data.len();
            self.check_or_grow(new_size, 10000)?;
            let slice = SelectInfoElem::from(self.size..new_size);
            self.dataset.write_array_slice(data.into(), &[slice])?;
            self.size = new_size;
        }
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn finish(mut self) -> Result<B::Dataset> {
        self.dataset.reshape(&self.size.into())?;
        Ok(self.dataset)
    }
}
