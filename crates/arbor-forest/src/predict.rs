//! Prediction methods for the Random Forest ensemble.

use std::collections::BTreeMap;

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::column::{Label, Value};
use crate::counts::majority_vote;
use crate::error::RfError;
use crate::forest::RandomForest;
use crate::frame::DataFrame;

impl RandomForest {
    /// Predict the target category code for a single feature vector.
    ///
    /// Majority vote across trees; a tie goes to the tied category that the
    /// earliest tree voted for.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`RfError::EmptyModel`] | the forest has no trees |
    /// | [`RfError::FeatureVectorTooShort`] | `x` ends before a split variable |
    pub fn classify(&self, x: &[Value]) -> Result<i32, RfError> {
        if self.trees.is_empty() {
            return Err(RfError::EmptyModel);
        }
        let votes = self
            .trees
            .iter()
            .map(|tree| tree.classify(x))
            .collect::<Result<Vec<_>, _>>()?;
        majority_vote(votes).ok_or(RfError::EmptyModel)
    }

    /// Return the mean of the member trees' leaf probability maps.
    ///
    /// # Errors
    ///
    /// Same as [`RandomForest::classify`].
    pub fn class_probabilities(&self, x: &[Value]) -> Result<BTreeMap<i32, f64>, RfError> {
        if self.trees.is_empty() {
            return Err(RfError::EmptyModel);
        }
        let mut sum: BTreeMap<i32, f64> = BTreeMap::new();
        for tree in &self.trees {
            for (&category, &p) in tree.class_probabilities(x)? {
                *sum.entry(category).or_insert(0.0) += p;
            }
        }
        let n = self.trees.len() as f64;
        sum.values_mut().for_each(|v| *v /= n);
        Ok(sum)
    }

    /// Predict and decode the target for `x`.
    ///
    /// # Errors
    ///
    /// Same as [`RandomForest::classify`].
    pub fn predict_label(&self, x: &[Value]) -> Result<Label, RfError> {
        let code = self.classify(x)?;
        Ok(self.schema.decode(self.schema.target_index(), Value::Int(code)))
    }

    /// Classify a batch of feature vectors in parallel.
    ///
    /// # Errors
    ///
    /// The first failure from [`RandomForest::classify`].
    pub fn classify_batch(&self, rows: &[Vec<Value>]) -> Result<Vec<i32>, RfError> {
        rows.into_par_iter().map(|x| self.classify(x)).collect()
    }

    /// Classify every row of `data` in parallel.
    ///
    /// # Errors
    ///
    /// The first failure from [`RandomForest::classify`].
    pub fn classify_frame(&self, data: &DataFrame) -> Result<Vec<i32>, RfError> {
        (0..data.len())
            .into_par_iter()
            .map(|i| self.classify(&data.row(i)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::{MaxFeatures, RandomForestConfig};
    use crate::forest::RandomForest;
    use crate::frame::DataFrame;
    use crate::tree::DecisionTreeConfig;

    use super::*;

    /// A forest assembled from single-leaf trees, one per listed target.
    fn forest_of_leaves(targets: &[i32]) -> RandomForest {
        let trees: Vec<_> = targets
            .iter()
            .map(|&t| {
                let data = DataFrame::from_ints(&[vec![0, t]]).unwrap();
                DecisionTreeConfig::new().fit(&data).unwrap()
            })
            .collect();
        let schema = Arc::clone(&trees[0].schema);
        RandomForest {
            oob_indices: vec![Vec::new(); trees.len()],
            trees,
            schema,
            n_training_rows: 1,
            vars_per_split: 0,
        }
    }

    #[test]
    fn vote_is_the_mode() {
        let forest = forest_of_leaves(&[3, 1, 1, 2]);
        assert_eq!(forest.classify(&[Value::Int(0)]).unwrap(), 1);
    }

    #[test]
    fn vote_tie_goes_to_first_in_forest_order() {
        let forest = forest_of_leaves(&[5, 2, 2, 5]);
        assert_eq!(forest.classify(&[Value::Int(0)]).unwrap(), 5);
        let forest = forest_of_leaves(&[2, 5, 5, 2]);
        assert_eq!(forest.classify(&[Value::Int(0)]).unwrap(), 2);
    }

    #[test]
    fn probabilities_are_averaged() {
        let forest = forest_of_leaves(&[1, 1, 2, 1]);
        let probs = forest.class_probabilities(&[Value::Int(0)]).unwrap();
        assert!((probs[&1] - 0.75).abs() < 1e-12);
        assert!((probs[&2] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn batch_matches_individual() {
        let rows: Vec<Vec<i32>> = (0..40).map(|i| vec![i, i % 3, i32::from(i >= 20)]).collect();
        let data = DataFrame::from_ints(&rows).unwrap();
        let forest = RandomForestConfig::new(10)
            .with_max_features(MaxFeatures::All)
            .with_seed(42)
            .fit(&data)
            .unwrap();

        let features: Vec<Vec<Value>> = (0..data.len()).map(|i| data.row(i)).collect();
        let batch = forest.classify_batch(&features).unwrap();
        assert_eq!(batch, forest.classify_frame(&data).unwrap());
        for (x, &predicted) in features.iter().zip(&batch) {
            assert_eq!(forest.classify(x).unwrap(), predicted);
        }
    }

    #[test]
    fn labels_decode_through_string_tables() {
        let rows = vec![
            vec!["1", "spam"],
            vec!["2", "spam"],
            vec!["8", "ham"],
            vec!["9", "ham"],
        ];
        let data = DataFrame::from_strings(&rows).unwrap();
        let forest = RandomForestConfig::new(15).with_seed(1).fit(&data).unwrap();
        let x = data.schema().encode_row(0, &["1"]).unwrap();
        assert_eq!(forest.predict_label(&x).unwrap(), Label::Text("spam".into()));
    }
}
