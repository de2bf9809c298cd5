//! Helpers over a flat vector of per-class scores.

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    exps.into_iter().map(|v| v / sum).collect()
}

/// Index and value of the highest score. The first index wins on ties.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .reduce(|accum, row| if row.1 > accum.1 { row } else { accum })
}

/// The `k` highest scores, descending. Ties keep class-index order.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[2.0, 1.0, 0.1, -3.5]);
        let sum: f32 = probs.iter().sum();

        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_softmax_large_logits_do_not_overflow() {
        let probs = softmax(&[1000.0, 1000.0]);

        assert!((probs[0] - 0.5).abs() < 1e-6);
        assert!((probs[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some((1, 0.7)));
        assert_eq!(argmax(&[0.5, 0.5]), Some((0, 0.5)));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_top_k_descending() {
        let ranked = top_k(&[0.05, 0.4, 0.1, 0.3, 0.15], 3);

        assert_eq!(ranked, vec![(1, 0.4), (3, 0.3), (4, 0.15)]);
    }

    #[test]
    fn test_top_k_short_input() {
        assert_eq!(top_k(&[0.9, 0.1], 3).len(), 2);
    }
}
