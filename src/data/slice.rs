use crate::error::StoreError;

use anyhow::{bail, ensure, Result};
use itertools::Itertools;
use ndarray::{Array1, SliceInfoElem};
use smallvec::{smallvec, SmallVec};
use std::ops::{Index, IndexMut, Range, RangeFull};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape(SmallVec<[usize; 3]>);

impl Shape {
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements.
    pub fn size(&self) -> usize {
        self.0.iter().product()
    }

    pub fn as_mut(&mut self) -> &mut [usize] {
        &mut self.0
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            self.0.as_slice().iter().map(|x| x.to_string()).join(" x ")
        )
    }
}

impl AsRef<[usize]> for Shape {
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}

impl Index<usize> for Shape {
    type Output = usize;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl IndexMut<usize> for Shape {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl From<Vec<usize>> for Shape {
    fn from(shape: Vec<usize>) -> Self {
        Self(SmallVec::from_vec(shape))
    }
}

impl From<&[usize]> for Shape {
    fn from(shape: &[usize]) -> Self {
        Self(SmallVec::from_slice(shape))
    }
}

impl From<usize> for Shape {
    fn from(shape: usize) -> Self {
        Self(smallvec![shape])
    }
}

impl FromIterator<usize> for Shape {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        Self(SmallVec::from_iter(iter))
    }
}

/// A multi-dimensional selection used for reading and writing to a Container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectInfo(pub Vec<SelectInfoElem>);

impl AsRef<[SelectInfoElem]> for SelectInfo {
    fn as_ref(&self) -> &[SelectInfoElem] {
        &self.0
    }
}

impl FromIterator<SelectInfoElem> for SelectInfo {
    fn from_iter<T: IntoIterator<Item = SelectInfoElem>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl SelectInfo {
    /// The full-array selection over `ndim` axes.
    pub fn full_slice(ndim: usize) -> Self {
        (0..ndim).map(|_| SelectInfoElem::Slice(SLICE_FULL)).collect()
    }
}

/// A single-axis selection: either an explicit list of indices or a slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectInfoElem {
    Index(Vec<usize>),
    Slice(SliceInfoElem),
}

impl From<&[usize]> for SelectInfoElem {
    fn from(x: &[usize]) -> Self {
        Self::Index(x.to_vec())
    }
}

impl From<Vec<usize>> for SelectInfoElem {
    fn from(x: Vec<usize>) -> Self {
        Self::Index(x)
    }
}

impl From<&Vec<usize>> for SelectInfoElem {
    fn from(x: &Vec<usize>) -> Self {
        x.as_slice().into()
    }
}

impl From<Array1<usize>> for SelectInfoElem {
    fn from(x: Array1<usize>) -> Self {
        Self::Index(x.to_vec())
    }
}

impl From<&Array1<usize>> for SelectInfoElem {
    fn from(x: &Array1<usize>) -> Self {
        Self::Index(x.to_vec())
    }
}

impl From<usize> for SelectInfoElem {
    fn from(x: usize) -> Self {
        Self::Slice(SliceInfoElem::Index(x as isize))
    }
}

impl From<Range<usize>> for SelectInfoElem {
    fn from(x: Range<usize>) -> Self {
        Self::Slice(x.into())
    }
}

impl From<Range<isize>> for SelectInfoElem {
    fn from(x: Range<isize>) -> Self {
        Self::Slice(x.into())
    }
}

impl From<Range<i32>> for SelectInfoElem {
    fn from(x: Range<i32>) -> Self {
        Self::Slice(x.into())
    }
}

impl From<RangeFull> for SelectInfoElem {
    fn from(x: RangeFull) -> Self {
        Self::Slice(x.into())
    }
}

impl AsRef<SelectInfoElem> for SelectInfoElem {
    fn as_ref(&self) -> &SelectInfoElem {
        self
    }
}

impl SelectInfoElem {
    pub fn full() -> Self {
        SelectInfoElem::Slice(SLICE_FULL)
    }

    pub fn is_index(&self) -> bool {
        matches!(self, SelectInfoElem::Index(_))
    }

    pub fn is_slice(&self) -> bool {
        matches!(self, SelectInfoElem::Slice(_))
    }

    pub fn is_full(&self) -> bool {
        matches!(
            self,
            SelectInfoElem::Slice(SliceInfoElem::Slice {
                start: 0,
                end: None,
                step: 1
            })
        )
    }

    /// Expand a single-axis selection to `ndim` axes, filling the other
    /// axes with `fill`.
    pub fn set_axis<'a>(
        &'a self,
        axis: usize,
        ndim: usize,
        fill: &'a SelectInfoElem,
    ) -> Vec<&'a SelectInfoElem> {
        let mut res = vec![fill; ndim];
        res[axis] = self;
        res
    }
}

/// A selection resolved against a concrete shape. Construction fails with
/// [`StoreError::OutOfBounds`] if any endpoint exceeds the extent of its
/// axis; nothing is ever clamped.
pub struct SelectInfoBounds<'a> {
    input_shape: Shape,
    select: Vec<SelectInfoElemBounds<'a>>,
}

impl<'a> SelectInfoBounds<'a> {
    pub fn new<S, E>(select: &'a S, shape: &Shape) -> Result<Self>
    where
        S: AsRef<[E]> + ?Sized,
        E: AsRef<SelectInfoElem> + 'a,
    {
        let select = select.as_ref();
        ensure!(
            select.len() == shape.ndim(),
            "selection has {} axes but the array has {}",
            select.len(),
            shape.ndim()
        );
        let res = select
            .iter()
            .zip(shape.as_ref())
            .enumerate()
            .map(|(axis, (sel, dim))| SelectInfoElemBounds::new(sel.as_ref(), axis, *dim))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            input_shape: shape.clone(),
            select: res,
        })
    }

    pub fn in_shape(&self) -> &Shape {
        &self.input_shape
    }

    pub fn out_shape(&self) -> Shape {
        self.select.iter().map(|x| x.len()).collect()
    }

    pub fn size(&self) -> usize {
        self.out_shape().size()
    }

    pub fn ndim(&self) -> usize {
        self.select.len()
    }

    /// Whether every axis is a contiguous forward slice, i.e. the
    /// selection maps to runs of consecutive elements in row-major order.
    pub fn is_contiguous(&self) -> bool {
        self.select.iter().all(|x| {
            matches!(
                x,
                SelectInfoElemBounds::Slice(SliceBounds { step: 1, .. })
            )
        })
    }
}

impl<'a> AsRef<[SelectInfoElemBounds<'a>]> for SelectInfoBounds<'a> {
    fn as_ref(&self) -> &[SelectInfoElemBounds<'a>] {
        &self.select
    }
}

pub enum SelectInfoElemBounds<'a> {
    Index(&'a [usize]),
    Slice(SliceBounds),
}

impl<'a> SelectInfoElemBounds<'a> {
    pub fn new(select: &'a SelectInfoElem, axis: usize, bound: usize) -> Result<Self> {
        match select {
            SelectInfoElem::Index(idx) => {
                if let Some(&bad) = idx.iter().find(|&&i| i >= bound) {
                    return Err(StoreError::out_of_bounds(axis, bad as isize, bound).into());
                }
                Ok(Self::Index(idx.as_slice()))
            }
            SelectInfoElem::Slice(slice) => Ok(Self::Slice(SliceBounds::new(slice, axis, bound)?)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Index(idx) => idx.len(),
            Self::Slice(slice) => slice.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn index(&self, i: usize) -> usize {
        match self {
            Self::Index(idx) => idx[i],
            Self::Slice(slice) => slice.index(i),
        }
    }
}

/// A slice with both endpoints resolved against the axis extent.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SliceBounds {
    pub start: usize,
    pub end: usize,
    pub step: isize,
}

impl SliceBounds {
    pub(crate) fn new(slice: &SliceInfoElem, axis: usize, bound: usize) -> Result<Self> {
        fn resolve(x: isize, axis: usize, bound: usize) -> Result<usize> {
            let r = if x < 0 { bound as isize + x } else { x };
            if r < 0 {
                Err(StoreError::out_of_bounds(axis, x, bound).into())
            } else {
                Ok(r as usize)
            }
        }

        match slice {
            SliceInfoElem::Index(x) => {
                let i = resolve(*x, axis, bound)?;
                if i >= bound {
                    return Err(StoreError::out_of_bounds(axis, *x, bound).into());
                }
                Ok(Self {
                    start: i,
                    end: i + 1,
                    step: 1,
                })
            }
            SliceInfoElem::Slice { start, end, step } => {
                ensure!(*step != 0, "slice step must be non-zero");
                let s = resolve(*start, axis, bound)?;
                let e = match end {
                    None => bound,
                    Some(x) => resolve(*x, axis, bound)?,
                };
                if e > bound {
                    return Err(StoreError::out_of_bounds(axis, e as isize, bound).into());
                }
                if s > e {
                    return Err(StoreError::out_of_bounds(axis, s as isize, bound).into());
                }
                Ok(Self {
                    start: s,
                    end: e,
                    step: *step,
                })
            }
            SliceInfoElem::NewAxis => bail!("NewAxis is not supported in selections"),
        }
    }

    pub(crate) fn len(&self) -> usize {
        let k = self.step.unsigned_abs();
        (self.end - self.start + k - 1) / k
    }

    pub(crate) fn index(&self, i: usize) -> usize {
        if self.step > 0 {
            self.start + i * self.step as usize
        } else {
            self.end - 1 - i * self.step.unsigned_abs()
        }
    }
}

pub const SLICE_FULL: SliceInfoElem = SliceInfoElem::Slice {
    start: 0,
    end: None,
    step: 1,
};

/// Selection constructor.
///
/// `s![]` takes a list of ranges/slices/indices, separated by comma.
/// Each element is anything convertible into a [`SelectInfoElem`]:
/// a range, `..`, a single index, or a vector of indices.
///
/// ```
/// # use ragstore::s;
/// #
/// # fn main() {
/// println!("{:?}", s![1..3, ..]);
/// println!("{:?}", s![vec![1, 10, 3], ..]);
/// # }
/// ```
#[macro_export]
macro_rules! s {
    ( $( $x:expr ),* ) => {
        {
            let mut temp_vec = Vec::new();
            $(
                temp_vec.push($crate::data::SelectInfoElem::from($x));
            )*
            $crate::data::SelectInfo(temp_vec)
        }
    };
}
