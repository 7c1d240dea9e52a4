use std::collections::BTreeMap;

use crate::column::Value;
use crate::counts::CategoryCounts;
use crate::frame::DataFrame;

/// Criterion for measuring the quality of a split.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    serde::Serialize, serde::Deserialize,
)]
pub enum SplitCriterion {
    /// Information entropy in bits: -Σ(p_i · log2(p_i))
    #[default]
    Entropy,
    /// Gini impurity: Σ p_i · (1 - p_i)
    Gini,
}

impl SplitCriterion {
    /// Compute the impurity of a target distribution.
    ///
    /// An empty distribution has impurity 0.
    #[must_use]
    pub fn impurity(self, counts: &CategoryCounts) -> f64 {
        match self {
            SplitCriterion::Entropy => counts.entropy(),
            SplitCriterion::Gini => counts.gini(),
        }
    }
}

/// How a split routes a row to the left region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitKey {
    /// Left iff the value is strictly less than the threshold.
    Threshold(f64),
    /// Left iff the value equals the category.
    Category(i32),
}

/// The winning split at a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestSplit {
    /// Impurity reduction achieved by the split, always positive.
    pub gain: f64,
    /// Column index of the split variable.
    pub variable: usize,
    /// Threshold or category that defines the left region.
    pub key: SplitKey,
}

impl BestSplit {
    /// Return `true` if a row whose split variable holds `value` goes left.
    #[must_use]
    pub fn goes_left(&self, value: Value) -> bool {
        match self.key {
            SplitKey::Threshold(t) => value.as_f64() < t,
            SplitKey::Category(c) => value.as_code() == Some(c),
        }
    }

    /// Materialize the two regions of `frame`: (left, right).
    #[must_use]
    pub fn partition(&self, frame: &DataFrame) -> (DataFrame, DataFrame) {
        let left = frame.filter(|row| self.goes_left(row.value(self.variable)));
        let right = frame.filter(|row| !self.goes_left(row.value(self.variable)));
        (left, right)
    }
}

/// Impurity reduction from splitting `parent` into `region1` and `region2`.
fn gain(
    criterion: SplitCriterion,
    parent_impurity: f64,
    region1: &CategoryCounts,
    region2: &CategoryCounts,
) -> f64 {
    let n1 = region1.total() as f64;
    let n2 = region2.total() as f64;
    let n = n1 + n2;
    let expected = (n1 / n) * criterion.impurity(region1) + (n2 / n) * criterion.impurity(region2);
    parent_impurity - expected
}

/// Best threshold split on numeric `variable`.
///
/// Sorts `frame` by `variable`, then walks the rows once, tallying target
/// counts. Wherever the value strictly increases, the tally so far is the
/// left region and the candidate threshold is the midpoint of the two
/// values. The first candidate with the highest positive gain wins.
pub fn best_numeric_split(
    frame: &mut DataFrame,
    variable: usize,
    total: &CategoryCounts,
    criterion: SplitCriterion,
) -> Option<BestSplit> {
    frame.sort_by(variable);
    let parent_impurity = criterion.impurity(total);
    let mut running = CategoryCounts::new();
    let mut best: Option<BestSplit> = None;
    let mut prev: Option<f64> = None;

    for i in 0..frame.len() {
        let current = frame.value(i, variable).as_f64();
        if let Some(prev) = prev
            && prev < current
        {
            let rest = total.minus(&running);
            let candidate_gain = gain(criterion, parent_impurity, &running, &rest);
            if candidate_gain > best.map_or(0.0, |b| b.gain)
                && !running.is_empty()
                && !rest.is_empty()
            {
                best = Some(BestSplit {
                    gain: candidate_gain,
                    variable,
                    key: SplitKey::Threshold((prev + current) / 2.0),
                });
            }
        }
        running.add(frame.target(i));
        prev = Some(current);
    }
    best
}

/// Best one-vs-rest split on categorical `variable`.
///
/// Builds target counts per distinct category in one scan, then scores
/// `== c` against `!= c` for each category in ascending order.
pub fn best_categorical_split(
    frame: &DataFrame,
    variable: usize,
    total: &CategoryCounts,
    criterion: SplitCriterion,
) -> Option<BestSplit> {
    let mut per_category: BTreeMap<i32, CategoryCounts> = BTreeMap::new();
    for i in 0..frame.len() {
        if let Some(code) = frame.value(i, variable).as_code() {
            per_category.entry(code).or_default().add(frame.target(i));
        }
    }

    let parent_impurity = criterion.impurity(total);
    let mut best: Option<BestSplit> = None;
    for (&category, region1) in &per_category {
        let region2 = total.minus(region1);
        let candidate_gain = gain(criterion, parent_impurity, region1, &region2);
        if candidate_gain > best.map_or(0.0, |b| b.gain)
            && !region1.is_empty()
            && !region2.is_empty()
        {
            best = Some(BestSplit {
                gain: candidate_gain,
                variable,
                key: SplitKey::Category(category),
            });
        }
    }
    best
}

/// Best split across `candidates`, or `None` if nothing has positive gain.
///
/// `total` must be the target distribution of `frame`. Ties between
/// variables go to the earlier candidate.
pub fn find_best_split(
    frame: &mut DataFrame,
    candidates: &[usize],
    total: &CategoryCounts,
    criterion: SplitCriterion,
) -> Option<BestSplit> {
    let mut best: Option<BestSplit> = None;
    for &variable in candidates {
        let found = if frame.schema().kind(variable).is_categorical() {
            best_categorical_split(frame, variable, total, criterion)
        } else {
            best_numeric_split(frame, variable, total, criterion)
        };
        if let Some(found) = found
            && found.gain > best.map_or(0.0, |b| b.gain)
        {
            best = Some(found);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnKind;
    use crate::frame::FrameBuilder;

    fn frame(rows: &[[i32; 3]]) -> DataFrame {
        DataFrame::from_ints(&rows.iter().map(|r| r.to_vec()).collect::<Vec<_>>()).unwrap()
    }

    #[test]
    fn criterion_impurity() {
        let coin: CategoryCounts = [0, 1].into_iter().collect();
        assert!((SplitCriterion::Entropy.impurity(&coin) - 1.0).abs() < 1e-12);
        assert!((SplitCriterion::Gini.impurity(&coin) - 0.5).abs() < 1e-12);
        assert_eq!(SplitCriterion::default(), SplitCriterion::Entropy);
    }

    #[test]
    fn numeric_split_at_midpoint() {
        let mut data = frame(&[[2, 0, 100], [1, 0, 99]]);
        let total = data.target_counts();
        let best = best_numeric_split(&mut data, 0, &total, SplitCriterion::Entropy).unwrap();
        assert_eq!(best.key, SplitKey::Threshold(1.5));
        assert!((best.gain - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_column_has_no_split() {
        let mut data = frame(&[[1, 0, 99], [1, 0, 100]]);
        let total = data.target_counts();
        assert!(best_numeric_split(&mut data, 0, &total, SplitCriterion::Entropy).is_none());
    }

    #[test]
    fn first_best_threshold_wins_ties() {
        // Thresholds 1.5 and 3.5 each peel off one class-1 row and score equally.
        let mut data = frame(&[[1, 0, 1], [2, 0, 2], [3, 0, 2], [4, 0, 1]]);
        let total = data.target_counts();
        let best = best_numeric_split(&mut data, 0, &total, SplitCriterion::Entropy).unwrap();
        assert_eq!(best.key, SplitKey::Threshold(1.5));
    }

    #[test]
    fn categorical_split_one_vs_rest() {
        let rows: Vec<Vec<i32>> = vec![
            vec![7, 2],
            vec![7, 2],
            vec![8, 1],
            vec![9, 1],
        ];
        let mut data = FrameBuilder::new()
            .with_kinds(vec![ColumnKind::CategoricalInt, ColumnKind::TargetCategoricalInt])
            .build_from_ints(&rows)
            .unwrap();
        let total = data.target_counts();
        let best = find_best_split(&mut data, &[0], &total, SplitCriterion::Entropy).unwrap();
        assert_eq!(best.key, SplitKey::Category(7));
        let (left, right) = best.partition(&data);
        assert_eq!(left.len(), 2);
        assert_eq!(right.len(), 2);
        assert_eq!(left.target_counts().n_categories(), 1);
    }

    #[test]
    fn partition_routes_by_threshold() {
        let data = frame(&[[1, 0, 1], [5, 0, 2], [3, 0, 1]]);
        let split = BestSplit {
            gain: 1.0,
            variable: 0,
            key: SplitKey::Threshold(3.0),
        };
        let (left, right) = split.partition(&data);
        assert_eq!(left.len(), 1);
        assert_eq!(right.len(), 2);
        assert!(split.goes_left(Value::Float(2.9)));
        assert!(!split.goes_left(Value::Int(3)));
    }

    #[test]
    fn best_variable_is_chosen() {
        // x0 is noise, x1 separates perfectly
        let mut data = frame(&[[1, 10, 1], [2, 10, 1], [1, 20, 2], [2, 20, 2]]);
        let total = data.target_counts();
        let best = find_best_split(&mut data, &[0, 1], &total, SplitCriterion::Gini).unwrap();
        assert_eq!(best.variable, 1);
        assert_eq!(best.key, SplitKey::Threshold(15.0));
        assert!((best.gain - 0.5).abs() < 1e-12);
    }

    #[test]
    fn no_gain_means_no_split() {
        let mut data = frame(&[[1, 0, 1], [1, 0, 2], [2, 0, 1], [2, 0, 2]]);
        let total = data.target_counts();
        assert!(find_best_split(&mut data, &[0, 1], &total, SplitCriterion::Entropy).is_none());
    }
}
