/// A dense two-dimensional table stored in row-major order, used for the dynamic programming
/// tables of the aligners.  A table for sequences of length `m` and `n` has `m + 1` rows and
/// `n + 1` columns.
#[derive(Default, Clone, Eq, PartialEq, Debug)]
pub struct Matrix<T: Clone> {
    rows: usize,
    cols: usize,
    values: Vec<T>,
}

impl<T: Clone> Matrix<T> {
    /// Builds a table with `m + 1` rows and `n + 1` columns with every cell set to `value`.
    pub fn for_lengths(m: usize, n: usize, value: T) -> Self {
        Self::new(m + 1, n + 1, value)
    }

    pub fn new(rows: usize, cols: usize, value: T) -> Self {
        Self { rows, cols, values: vec![value; rows * cols] }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline(always)]
    pub fn set(&mut self, i: usize, j: usize, v: T) {
        debug_assert!(i < self.rows);
        debug_assert!(j < self.cols);
        self.values[i * self.cols + j] = v;
    }

    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> &T {
        debug_assert!(i < self.rows);
        debug_assert!(j < self.cols);
        &self.values[i * self.cols + j]
    }

    pub fn get_mut(&mut self, i: usize, j: usize) -> &mut T {
        debug_assert!(i < self.rows);
        debug_assert!(j < self.cols);
        &mut self.values[i * self.cols + j]
    }
}
