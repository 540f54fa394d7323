use std::cmp::Ordering;

use ndarray::{Array1, Array2, ArrayView1};

use super::store::RagError;

/// Row-normalized embedding matrix; a dot product against a normalized
/// query yields cosine similarity for every row at once.
#[derive(Debug, Clone)]
pub struct NormalizedMatrix {
    rows: Array2<f32>,
}

impl NormalizedMatrix {
    pub fn from_rows(embeddings: &[Vec<f32>], dimension: usize) -> Result<Self, RagError> {
        let mut data = Vec::with_capacity(embeddings.len() * dimension);
        for (idx, embedding) in embeddings.iter().enumerate() {
            if embedding.len() != dimension {
                return Err(RagError::DimensionMismatch {
                    expected: dimension,
                    actual: embedding.len(),
                    context: format!("document #{}", idx),
                });
            }
            let row = ArrayView1::from(embedding.as_slice());
            let norm = l2_norm(row);
            if norm <= f32::EPSILON {
                data.extend(std::iter::repeat(0.0).take(dimension));
            } else {
                data.extend(row.iter().map(|value| value / norm));
            }
        }

        let rows = Array2::from_shape_vec((embeddings.len(), dimension), data)
            .map_err(|e| RagError::InvalidIndex(e.to_string()))?;
        Ok(Self { rows })
    }

    fn len(&self) -> usize {
        self.rows.nrows()
    }

    pub fn dimension(&self) -> usize {
        self.rows.ncols()
    }

    /// Cosine similarity of `query` against every row, in row order.
    pub fn cosine_scores(&self, query: &[f32]) -> Result<Array1<f32>, RagError> {
        if query.len() != self.dimension() {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension(),
                actual: query.len(),
                context: "query".to_string(),
            });
        }

        let query = ArrayView1::from(query);
        let norm = l2_norm(query);
        if norm <= f32::EPSILON {
            return Ok(Array1::zeros(self.len()));
        }
        let unit = query.mapv(|value| value / norm);
        Ok(self.rows.dot(&unit))
    }
}

/// Indices of the `limit` highest scores, best first.
pub fn top_k(scores: &Array1<f32>, limit: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    ranked.truncate(limit);
    ranked
}

fn l2_norm(vector: ArrayView1<f32>) -> f32 {
    vector.dot(&vector).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn cosine_is_one_for_identical_vectors() {
        let matrix = NormalizedMatrix::from_rows(&[vec![1.0, 2.0, 3.0, 4.0]], 4).expect("matrix");
        let scores = matrix.cosine_scores(&[1.0, 2.0, 3.0, 4.0]).expect("scores");
        assert!(approx_eq(scores[0], 1.0));
    }

    #[test]
    fn cosine_is_zero_for_orthogonal_vectors() {
        let matrix = NormalizedMatrix::from_rows(&[vec![1.0, 0.0]], 2).expect("matrix");
        let scores = matrix.cosine_scores(&[0.0, 1.0]).expect("scores");
        assert!(approx_eq(scores[0], 0.0));
    }

    #[test]
    fn ranking_returns_highest_similarity_first() {
        let candidates = vec![vec![0.8, 0.2], vec![0.1, 0.9], vec![0.9, 0.0]];
        let matrix = NormalizedMatrix::from_rows(&candidates, 2).expect("matrix");
        let scores = matrix.cosine_scores(&[1.0, 0.0]).expect("scores");

        let ranked = top_k(&scores, 3);

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].0, 2);
        assert_eq!(ranked[2].0, 1);
    }

    #[test]
    fn zero_rows_score_zero() {
        let matrix = NormalizedMatrix::from_rows(&[vec![0.0, 0.0], vec![1.0, 1.0]], 2).expect("matrix");
        let scores = matrix.cosine_scores(&[1.0, 1.0]).expect("scores");

        assert!(approx_eq(scores[0], 0.0));
        assert!(approx_eq(scores[1], 1.0));
    }

    #[test]
    fn rejects_ragged_rows_and_wrong_query_length() {
        assert!(matches!(
            NormalizedMatrix::from_rows(&[vec![1.0, 0.0], vec![1.0]], 2),
            Err(RagError::DimensionMismatch { .. })
        ));

        let matrix = NormalizedMatrix::from_rows(&[vec![1.0, 0.0]], 2).expect("matrix");
        assert!(matches!(
            matrix.cosine_scores(&[1.0, 0.0, 0.0]),
            Err(RagError::DimensionMismatch { .. })
        ));
    }
}
