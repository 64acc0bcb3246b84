//! Fixed-capacity tensors
//!
//! Storage is reserved once for the worst case; every processing call only
//! changes the logical dimensions. Dimension 0 is contiguous in memory, so a
//! view obtained by fixing the outer indices is a plain slice.

use ndarray::ArrayView2;
use std::ops::Range;

/// N-dimensional tensor over a pre-allocated arena
#[derive(Debug, Clone)]
pub struct StaticTensor<T, const N: usize> {
    data: Vec<T>,
    dims: [usize; N],
}

impl<T: Copy + Default, const N: usize> StaticTensor<T, N> {
    /// Reserve storage for `capacity` elements; all dimensions start at zero
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![T::default(); capacity],
            dims: [0; N],
        }
    }

    /// Maximum number of elements
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Current logical dimensions
    pub fn dims(&self) -> [usize; N] {
        self.dims
    }

    /// Number of elements covered by the logical dimensions
    pub fn size(&self) -> usize {
        self.dims.iter().product()
    }

    /// Change the logical dimensions. Contents are not cleared.
    ///
    /// # Panics
    ///
    /// Panics if the new shape does not fit in the reserved storage.
    pub fn resize(&mut self, dims: [usize; N]) {
        let size: usize = dims.iter().product();
        assert!(
            size <= self.capacity(),
            "Tensor dimensions {:?} ({} elements) exceed the capacity of {} elements",
            dims,
            size,
            self.capacity()
        );
        self.dims = dims;
    }

    pub fn get_data(&self) -> &[T] {
        &self.data[..self.size()]
    }

    pub fn get_data_mut(&mut self) -> &mut [T] {
        let size = self.size();
        &mut self.data[..size]
    }

    /// Set every element inside the logical dimensions
    pub fn fill(&mut self, value: T) {
        self.get_data_mut().fill(value);
    }

    /// Contiguous view obtained by fixing the trailing `indices.len()` dimensions
    pub fn get_view(&self, indices: &[usize]) -> &[T] {
        let range = self.view_range(indices);
        &self.data[range]
    }

    /// Mutable counterpart of [`Self::get_view`]
    pub fn get_view_mut(&mut self, indices: &[usize]) -> &mut [T] {
        let range = self.view_range(indices);
        &mut self.data[range]
    }

    /// Matrix view `[dims[1], dims[0]]` obtained by fixing all dimensions above 1
    pub fn get_matrix_view(&self, indices: &[usize]) -> ArrayView2<'_, T> {
        assert_eq!(indices.len() + 2, N, "matrix view needs {} indices", N - 2);
        let range = self.view_range(indices);
        ArrayView2::from_shape((self.dims[1], self.dims[0]), &self.data[range])
            .expect("view length matches the two innermost dimensions")
    }

    fn view_range(&self, indices: &[usize]) -> Range<usize> {
        assert!(indices.len() <= N, "too many indices for a {}-dimensional tensor", N);
        let first = N - indices.len();
        let len: usize = self.dims[..first].iter().product();

        let mut offset = 0;
        let mut stride = len;
        for (dim, &index) in (first..N).zip(indices) {
            assert!(
                index < self.dims[dim],
                "index {} out of range for dimension {} of size {}",
                index,
                dim,
                self.dims[dim]
            );
            offset += index * stride;
            stride *= self.dims[dim];
        }

        offset..offset + len
    }
}
