//! Ranking-quality metrics over binary relevance judgments.
//!
//! All metrics return `None` when the ground truth contains no relevant
//! snippets: a query with nothing to find is vacuously undefined, and the
//! aggregator excludes it rather than counting it as zero.

use std::collections::HashSet;

/// Recall@K: fraction of relevant snippets found in the top-k.
#[must_use]
pub fn recall_at_k(ranked: &[u32], relevant: &HashSet<u32>, k: usize) -> Option<f64> {
    if relevant.is_empty() {
        return None;
    }
    let hits = ranked
        .iter()
        .take(k)
        .filter(|id| relevant.contains(id))
        .count();
    Some(hits as f64 / relevant.len() as f64)
}

/// Reciprocal rank of the first relevant snippet in the list, 0.0 when none
/// of the ranked items is relevant.
#[must_use]
pub fn mrr(ranked: &[u32], relevant: &HashSet<u32>) -> Option<f64> {
    if relevant.is_empty() {
        return None;
    }
    for (idx, id) in ranked.iter().enumerate() {
        if relevant.contains(id) {
            return Some(1.0 / (idx as f64 + 1.0));
        }
    }
    Some(0.0)
}

/// NDCG@K with binary gains: DCG = sum of rel_i / log2(i + 1) over 1-based
/// positions, normalized by the ideal DCG with all relevant items on top.
#[must_use]
pub fn ndcg_at_k(ranked: &[u32], relevant: &HashSet<u32>, k: usize) -> Option<f64> {
    if relevant.is_empty() {
        return None;
    }

    let dcg: f64 = ranked
        .iter()
        .take(k)
        .enumerate()
        .filter(|(_, id)| relevant.contains(id))
        .map(|(idx, _)| 1.0 / (idx as f64 + 2.0).log2())
        .sum();

    let ideal_hits = relevant.len().min(k);
    let idcg: f64 = (0..ideal_hits).map(|idx| 1.0 / (idx as f64 + 2.0).log2()).sum();

    if idcg > 0.0 {
        Some(dcg / idcg)
    } else {
        Some(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relevant(ids: &[u32]) -> HashSet<u32> {
        ids.iter().copied().collect()
    }

    const EPS: f64 = 1e-9;

    #[test]
    fn test_single_relevant_at_rank_three() {
        // One relevant snippet sitting at rank 3 of 10 candidates
        let ranked: Vec<u32> = (1..=10).collect();
        let rel = relevant(&[3]);

        assert!((recall_at_k(&ranked, &rel, 4).unwrap() - 1.0).abs() < EPS);
        assert!((mrr(&ranked, &rel).unwrap() - 1.0 / 3.0).abs() < EPS);
        // (1/log2(4)) / (1/log2(2)) = 0.5
        assert!((ndcg_at_k(&ranked, &rel, 4).unwrap() - 0.5).abs() < EPS);
    }

    #[test]
    fn test_ndcg_is_one_when_relevant_set_tops_the_ranking() {
        let ranked = vec![10, 20, 30, 40];
        let rel = relevant(&[10, 20]);
        assert!((ndcg_at_k(&ranked, &rel, 4).unwrap() - 1.0).abs() < EPS);
        // Order within the relevant prefix does not matter with binary gains
        let swapped = vec![20, 10, 30, 40];
        assert!((ndcg_at_k(&swapped, &rel, 4).unwrap() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_ndcg_bounds() {
        let ranked = vec![5, 6, 7, 8];
        for rel_ids in [&[6][..], &[6, 8][..], &[5, 6, 7, 8][..], &[99][..]] {
            let rel = relevant(rel_ids);
            let value = ndcg_at_k(&ranked, &rel, 4).unwrap();
            assert!((0.0..=1.0 + EPS).contains(&value));
        }
    }

    #[test]
    fn test_recall_monotonically_non_decreasing_in_k() {
        let ranked = vec![9, 1, 4, 2, 7, 3];
        let rel = relevant(&[2, 3, 11]);
        let mut previous = 0.0;
        for k in 1..=ranked.len() {
            let value = recall_at_k(&ranked, &rel, k).unwrap();
            assert!(value + EPS >= previous);
            previous = value;
        }
    }

    #[test]
    fn test_mrr_edges() {
        let rel = relevant(&[42]);
        // First item relevant
        assert!((mrr(&[42, 1, 2], &rel).unwrap() - 1.0).abs() < EPS);
        // No relevant item anywhere in the list
        assert!((mrr(&[1, 2, 3], &rel).unwrap()).abs() < EPS);
    }

    #[test]
    fn test_empty_ground_truth_is_undefined_not_zero() {
        let ranked = vec![1, 2, 3];
        let rel = HashSet::new();
        assert!(recall_at_k(&ranked, &rel, 4).is_none());
        assert!(mrr(&ranked, &rel).is_none());
        assert!(ndcg_at_k(&ranked, &rel, 4).is_none());
    }

    #[test]
    fn test_recall_partial_hit() {
        let ranked = vec![1, 2, 3, 4];
        let rel = relevant(&[2, 50]);
        assert!((recall_at_k(&ranked, &rel, 4).unwrap() - 0.5).abs() < EPS);
    }
}
