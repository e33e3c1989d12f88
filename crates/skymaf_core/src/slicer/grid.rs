/// Row-major index arithmetic for N-dimensional bin grids.
///
/// The last dimension varies fastest, so flat cell ids follow ascending left
/// edges on every axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinGrid {
    /// Number of bins along each dimension
    shape: Vec<usize>,
    /// Precomputed strides for index calculation
    strides: Vec<usize>,
}

impl BinGrid {
    #[must_use]
    pub fn new(shape: Vec<usize>) -> Self {
        let strides = compute_strides(&shape);
        Self { shape, strides }
    }

    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[must_use]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of cells
    #[must_use]
    pub fn len(&self) -> usize {
        if self.shape.is_empty() {
            0
        } else {
            self.shape.iter().product()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat cell id for per-dimension bin indices
    #[must_use]
    pub fn flat_index(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0;
        for ((&idx, &size), &stride) in indices.iter().zip(&self.shape).zip(&self.strides) {
            if idx >= size {
                return None;
            }
            flat += idx * stride;
        }
        Some(flat)
    }

    /// Per-dimension bin indices for a flat cell id
    #[must_use]
    pub fn multi_index(&self, flat: usize) -> Option<Vec<usize>> {
        if flat >= self.len() {
            return None;
        }
        let mut remaining = flat;
        Some(
            self.strides
                .iter()
                .map(|&stride| {
                    let idx = remaining / stride;
                    remaining %= stride;
                    idx
                })
                .collect(),
        )
    }
}

fn compute_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}
