//! Vector math: cosine similarity and embedding averaging.

/// Cosine similarity between two embeddings. Returns `0.0` for a zero-norm
/// vector or mismatched dimensions rather than dividing by zero or panicking
/// — callers treat a missing/invalid embedding as "no match" (spec §9
/// embedding optionality).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Elementwise mean of a non-empty slice of equal-length embeddings.
/// Returns `None` if the input is empty or dimensions disagree.
pub fn average_embeddings(embeddings: &[Vec<f32>]) -> Option<Vec<f32>> {
    let dims = embeddings.first()?.len();
    if dims == 0 || embeddings.iter().any(|e| e.len() != dims) {
        return None;
    }
    let mut sum = vec![0.0f32; dims];
    for emb in embeddings {
        for (s, v) in sum.iter_mut().zip(emb.iter()) {
            *s += v;
        }
    }
    let n = embeddings.len() as f32;
    for s in sum.iter_mut() {
        *s /= n;
    }
    Some(sum)
}

/// Running-average centroid update used by greedy single-link clustering
/// (spec §4.11 Stage 4): folds one new member into an existing centroid
/// without recomputing the mean over the whole cluster.
pub fn update_centroid(centroid: &[f32], member: &[f32], member_count: usize) -> Vec<f32> {
    if centroid.len() != member.len() || member_count == 0 {
        return centroid.to_vec();
    }
    let n = member_count as f32;
    centroid
        .iter()
        .zip(member.iter())
        .map(|(c, m)| (c * n + m) / (n + 1.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn mismatched_dims_returns_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0, 2.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn average_of_two_opposite_pairs_is_midpoint() {
        let embeddings = vec![vec![0.0, 0.0], vec![2.0, 4.0]];
        let avg = average_embeddings(&embeddings).unwrap();
        assert_eq!(avg, vec![1.0, 2.0]);
    }

    #[test]
    fn centroid_update_matches_full_average() {
        let members = vec![vec![1.0, 1.0], vec![3.0, 3.0], vec![5.0, 5.0]];
        let mut centroid = members[0].clone();
        for (i, m) in members.iter().enumerate().skip(1) {
            centroid = update_centroid(&centroid, m, i);
        }
        let full_avg = average_embeddings(&members).unwrap();
        for (a, b) in centroid.iter().zip(full_avg.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }
}
