use std::cmp::Ordering;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Norms below this are clamped before dividing.
pub const MIN_NORM: f32 = 1e-10;

pub fn l2_norm(vector: ArrayView1<'_, f32>) -> f32 {
    vector.dot(&vector).sqrt()
}

pub fn normalize(vector: &[f32]) -> Array1<f32> {
    let vector = ArrayView1::from(vector);
    let norm = l2_norm(vector).max(MIN_NORM);
    vector.mapv(|value| value / norm)
}

/// Divides every row by its own norm.
pub fn normalize_rows(mut matrix: Array2<f32>) -> Array2<f32> {
    for mut row in matrix.axis_iter_mut(Axis(0)) {
        let norm = l2_norm(row.view()).max(MIN_NORM);
        row.mapv_inplace(|value| value / norm);
    }
    matrix
}

/// Dot product of `query` against every row. With unit-norm inputs this is
/// the cosine similarity.
pub fn score_rows(matrix: ArrayView2<'_, f32>, query: ArrayView1<'_, f32>) -> Vec<f32> {
    matrix.dot(&query).to_vec()
}

/// Indices of the `k` highest scores, best first. Ties keep index order.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    ranked.truncate(k);
    ranked
}
