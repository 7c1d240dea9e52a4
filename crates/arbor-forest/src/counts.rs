//! Category-count distributions and the impurity measures computed over them.

use std::collections::BTreeMap;

/// Mapping from category value to occurrence count.
///
/// Categories iterate in ascending value order. Zero counts are never
/// stored, so [`CategoryCounts::n_categories`] is the number of distinct
/// categories actually present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryCounts {
    counts: BTreeMap<i32, usize>,
    total: usize,
}

impl CategoryCounts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the count for `category` by one.
    pub fn add(&mut self, category: i32) {
        *self.counts.entry(category).or_insert(0) += 1;
        self.total += 1;
    }

    /// Return the count for `category` (0 if absent).
    #[must_use]
    pub fn count(&self, category: i32) -> usize {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    /// Return the sum of all counts.
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Return the number of distinct categories with a nonzero count.
    #[must_use]
    pub fn n_categories(&self) -> usize {
        self.counts.len()
    }

    /// Iterate `(category, count)` pairs in ascending category order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, usize)> + '_ {
        self.counts.iter().map(|(&c, &n)| (c, n))
    }

    /// Return the most frequent category; ties go to the lowest category.
    ///
    /// Returns `None` for an empty distribution.
    #[must_use]
    pub fn argmax(&self) -> Option<i32> {
        let mut best: Option<(i32, usize)> = None;
        for (category, count) in self.iter() {
            if best.is_none_or(|(_, n)| count > n) {
                best = Some((category, count));
            }
        }
        best.map(|(category, _)| category)
    }

    /// Shannon entropy in bits: `-Σ p_i · log2(p_i)` over nonzero counts.
    #[must_use]
    pub fn entropy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let n = self.total as f64;
        -self
            .counts
            .values()
            .map(|&c| {
                let p = c as f64 / n;
                p * p.log2()
            })
            .sum::<f64>()
    }

    /// Gini impurity: `Σ p_i · (1 - p_i)`.
    #[must_use]
    pub fn gini(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let n = self.total as f64;
        self.counts
            .values()
            .map(|&c| {
                let p = c as f64 / n;
                p * (1.0 - p)
            })
            .sum()
    }

    /// Return `self - part`, dropping categories whose count reaches zero.
    ///
    /// `part` must be a sub-multiset of `self`; counts saturate at zero.
    #[must_use]
    pub fn minus(&self, part: &CategoryCounts) -> CategoryCounts {
        let mut counts = BTreeMap::new();
        let mut total = 0;
        for (&category, &count) in &self.counts {
            let rest = count.saturating_sub(part.count(category));
            if rest > 0 {
                counts.insert(category, rest);
                total += rest;
            }
        }
        CategoryCounts { counts, total }
    }

    /// Relative frequency of each category.
    #[must_use]
    pub fn probabilities(&self) -> BTreeMap<i32, f64> {
        let n = self.total as f64;
        self.counts
            .iter()
            .map(|(&c, &count)| (c, count as f64 / n))
            .collect()
    }
}

impl FromIterator<i32> for CategoryCounts {
    fn from_iter<I: IntoIterator<Item = i32>>(iter: I) -> Self {
        let mut counts = CategoryCounts::new();
        for category in iter {
            counts.add(category);
        }
        counts
    }
}

/// Vote counter that remembers the order categories were first seen.
///
/// Used for ensemble voting, where ties resolve to whichever tied
/// category was encountered first.
#[derive(Debug, Clone, Default)]
pub(crate) struct VoteTally {
    votes: Vec<(i32, usize)>,
}

impl VoteTally {
    pub(crate) fn add(&mut self, category: i32) {
        match self.votes.iter_mut().find(|(c, _)| *c == category) {
            Some((_, n)) => *n += 1,
            None => self.votes.push((category, 1)),
        }
    }

    /// Return the winning category, or `None` if nothing was cast.
    pub(crate) fn winner(&self) -> Option<i32> {
        let mut best: Option<(i32, usize)> = None;
        for &(category, count) in &self.votes {
            if best.is_none_or(|(_, n)| count > n) {
                best = Some((category, count));
            }
        }
        best.map(|(category, _)| category)
    }
}

/// Most common category in `votes`; ties go to the earliest.
pub fn majority_vote(votes: impl IntoIterator<Item = i32>) -> Option<i32> {
    let mut tally = VoteTally::default();
    for vote in votes {
        tally.add(vote);
    }
    tally.winner()
}
