//! Optimal grouping of segments into chunks.
//!
//! A chunk covering segments `i..=j` with token sum `S` that starts on a
//! heading of level `l` costs
//!
//! ```text
//! size(S) + level(l) + chunk_count * |splits after j|
//! ```
//!
//! where `size` is `within_window * d^2` for `d = |S - target| / tol <= 1`
//! and `d^2` beyond, and `level` is `0` for the title segment and
//! `level_weight * (l - 1)^2` otherwise. The recurrence is solved right to
//! left; ties keep the shortest first chunk.

/// Tuning constants of the split cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    /// Factor on the squared deviation while inside the window.
    pub within_window: f64,
    /// Factor on the squared heading depth below `h1`.
    pub level: f64,
    /// Cost per split point already chosen for the remainder.
    pub chunk_count: f64,
    /// Tokens subtracted before deciding how many pieces an oversize segment needs.
    pub cut_slack: usize,
}

impl Default for ScoreWeights {
    fn default() -> Self { Self { within_window: 0.5, level: 2.0, chunk_count: 0.1, cut_slack: 10 } }
}

impl ScoreWeights {
    fn size_score(&self, sum: usize, target: usize, tol: usize) -> f64 {
        let d = (sum as f64 - target as f64).abs() / tol as f64;
        if d <= 1.0 { self.within_window * d * d } else { d * d }
    }

    fn level_score(&self, level: u8) -> f64 {
        if level == 0 {
            return 0.0;
        }
        let depth = f64::from(level) - 1.0;
        self.level * depth * depth
    }
}

/// Split points for `tokens`/`levels`: each returned index starts a new
/// chunk. Empty means the whole sequence is one chunk.
pub fn find_best_split(tokens: &[usize], levels: &[u8], min: usize, max: usize, weights: &ScoreWeights) -> Vec<usize> {
    let n = tokens.len().min(levels.len());
    if n == 0 {
        return Vec::new();
    }

    let target = (min + max) / 2;
    let mut tol = (max - min.min(max)) / 2;
    if tol == 0 {
        tol = min / 2;
    }
    let tol = tol.max(1);

    // For each start i: cost of the best grouping of i.., the start of the
    // following chunk and the number of split points it uses.
    let mut best = vec![f64::MAX; n];
    let mut next: Vec<Option<usize>> = vec![None; n];
    let mut splits = vec![0usize; n];

    for i in (0..n).rev() {
        let level_score = weights.level_score(levels[i]);
        let mut sum = 0;
        for j in i..n {
            sum += tokens[j];
            let score = weights.size_score(sum, target, tol) + level_score;
            let (total, follow, count) = if j == n - 1 {
                (score, None, 0)
            } else {
                (score + best[j + 1] + weights.chunk_count * splits[j + 1] as f64, Some(j + 1), splits[j + 1] + 1)
            };
            if total < best[i] {
                best[i] = total;
                next[i] = follow;
                splits[i] = count;
            }
        }
    }

    let mut points = Vec::with_capacity(splits[0]);
    let mut at = next[0];
    while let Some(p) = at {
        points.push(p);
        at = next[p];
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_start_is_free_and_deeper_headings_cost_more() {
        let w = ScoreWeights::default();
        assert_eq!(w.level_score(0), 0.0);
        assert_eq!(w.level_score(1), 0.0);
        assert_eq!(w.level_score(3), 8.0);
    }

    #[test]
    fn deviation_is_steeper_outside_the_window() {
        let w = ScoreWeights::default();
        assert_eq!(w.size_score(110, 100, 10), 0.5);
        assert_eq!(w.size_score(120, 100, 10), 4.0);
    }

    #[test]
    fn single_segment_is_one_chunk() {
        assert!(find_best_split(&[5], &[0], 10, 20, &ScoreWeights::default()).is_empty());
        assert!(find_best_split(&[], &[], 10, 20, &ScoreWeights::default()).is_empty());
    }
}
