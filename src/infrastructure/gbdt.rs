// Gradient-boosted regression trees (squared error, exact greedy splits)
use crate::application::forecast_model::ForecastModel;
use crate::domain::error::{ForecastError, Result};
use crate::domain::features::FeatureRow;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// L2 penalty on leaf weights
    pub lambda: f64,
    /// Minimum number of rows on each side of a split
    pub min_child_weight: f64,
    /// Fraction of rows sampled per tree
    pub subsample: f64,
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 500,
            learning_rate: 0.05,
            max_depth: 6,
            lambda: 1.0,
            min_child_weight: 1.0,
            subsample: 1.0,
            seed: 42,
        }
    }
}

/// Flat tree layout. A negative child `c` points at leaf `-c - 1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RegressionTree {
    split_features: Vec<usize>,
    thresholds: Vec<f64>,
    left_child: Vec<i32>,
    right_child: Vec<i32>,
    leaf_values: Vec<f64>,
}

impl RegressionTree {
    fn predict(&self, features: &[f64]) -> f64 {
        if self.split_features.is_empty() {
            return self.leaf_values.first().copied().unwrap_or_default();
        }

        let mut node_idx = 0usize;
        loop {
            let feature_value = features
                .get(self.split_features[node_idx])
                .copied()
                .unwrap_or_default();
            let child = if feature_value <= self.thresholds[node_idx] {
                self.left_child[node_idx]
            } else {
                self.right_child[node_idx]
            };

            if child < 0 {
                let leaf_idx = (-child - 1) as usize;
                return self.leaf_values.get(leaf_idx).copied().unwrap_or_default();
            }
            node_idx = child as usize;
        }
    }

    /// Structural check for deserialized trees. Children must point forward,
    /// which keeps every walk finite.
    fn validate(&self, feature_count: usize) -> std::result::Result<(), String> {
        let nodes = self.split_features.len();
        if self.thresholds.len() != nodes
            || self.left_child.len() != nodes
            || self.right_child.len() != nodes
        {
            return Err(format!(
                "node arrays differ in length ({} features, {} thresholds, {} left, {} right)",
                nodes,
                self.thresholds.len(),
                self.left_child.len(),
                self.right_child.len()
            ));
        }
        if self.leaf_values.is_empty() {
            return Err("tree has no leaves".to_string());
        }
        if let Some(value) = self.leaf_values.iter().find(|v| !v.is_finite()) {
            return Err(format!("non-finite leaf value {}", value));
        }

        for node in 0..nodes {
            if self.split_features[node] >= feature_count {
                return Err(format!(
                    "node {} splits on feature {} of {}",
                    node, self.split_features[node], feature_count
                ));
            }
            if self.thresholds[node].is_nan() {
                return Err(format!("node {} has a NaN threshold", node));
            }
            for child in [self.left_child[node], self.right_child[node]] {
                let valid = if child < 0 {
                    ((-i64::from(child) - 1) as usize) < self.leaf_values.len()
                } else {
                    let child = child as usize;
                    child > node && child < nodes
                };
                if !valid {
                    return Err(format!("node {} has invalid child {}", node, child));
                }
            }
        }
        Ok(())
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    features: &'a [Vec<f64>],
    residuals: &'a [f64],
    params: &'a BoostingParams,
    tree: RegressionTree,
}

impl<'a> TreeBuilder<'a> {
    fn new(features: &'a [Vec<f64>], residuals: &'a [f64], params: &'a BoostingParams) -> Self {
        Self {
            features,
            residuals,
            params,
            tree: RegressionTree {
                split_features: Vec::new(),
                thresholds: Vec::new(),
                left_child: Vec::new(),
                right_child: Vec::new(),
                leaf_values: Vec::new(),
            },
        }
    }

    fn score(&self, sum: f64, count: f64) -> f64 {
        sum * sum / (count + self.params.lambda)
    }

    fn leaf(&mut self, rows: &[usize]) -> i32 {
        let sum: f64 = rows.iter().map(|&r| self.residuals[r]).sum();
        self.tree
            .leaf_values
            .push(sum / (rows.len() as f64 + self.params.lambda));
        -(self.tree.leaf_values.len() as i32)
    }

    fn best_split(&self, rows: &[usize]) -> Option<Split> {
        let total: f64 = rows.iter().map(|&r| self.residuals[r]).sum();
        let n = rows.len() as f64;
        let parent = self.score(total, n);
        let min_side = self.params.min_child_weight.max(1.0);
        let feature_count = self.features.get(rows[0]).map_or(0, Vec::len);

        let mut best: Option<Split> = None;
        let mut sorted = rows.to_vec();
        for feature in 0..feature_count {
            sorted.sort_by(|&a, &b| self.features[a][feature].total_cmp(&self.features[b][feature]));

            let mut left_sum = 0.0;
            for i in 0..sorted.len() - 1 {
                left_sum += self.residuals[sorted[i]];
                let here = self.features[sorted[i]][feature];
                let next = self.features[sorted[i + 1]][feature];
                if here == next {
                    continue;
                }

                let left_n = (i + 1) as f64;
                let right_n = n - left_n;
                if left_n < min_side || right_n < min_side {
                    continue;
                }

                let gain = self.score(left_sum, left_n) + self.score(total - left_sum, right_n) - parent;
                if gain > 1e-12 && best.as_ref().is_none_or(|b| gain > b.gain) {
                    best = Some(Split {
                        feature,
                        threshold: (here + next) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }

    fn grow(&mut self, rows: &[usize], depth: usize) -> i32 {
        if depth >= self.params.max_depth || rows.len() < 2 {
            return self.leaf(rows);
        }
        let Some(split) = self.best_split(rows) else {
            return self.leaf(rows);
        };

        let node = self.tree.split_features.len();
        self.tree.split_features.push(split.feature);
        self.tree.thresholds.push(split.threshold);
        self.tree.left_child.push(0);
        self.tree.right_child.push(0);

        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&r| self.features[r][split.feature] <= split.threshold);

        let left_ref = self.grow(&left, depth + 1);
        let right_ref = self.grow(&right, depth + 1);
        self.tree.left_child[node] = left_ref;
        self.tree.right_child[node] = right_ref;
        node as i32
    }

    fn build(mut self, rows: &[usize]) -> RegressionTree {
        self.grow(rows, 0);
        self.tree
    }
}

/// Boosted tree ensemble trained on a fixed, named feature layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedRegressor {
    feature_names: Vec<String>,
    base_score: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedRegressor {
    pub fn fit(
        feature_names: Vec<String>,
        features: &[Vec<f64>],
        targets: &[f64],
        params: &BoostingParams,
    ) -> Result<Self> {
        if features.is_empty() {
            return Err(ForecastError::InsufficientHistory { needed: 1, got: 0 });
        }
        if features.len() != targets.len() {
            return Err(ForecastError::Computation(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }
        if let Some(row) = features.iter().find(|row| row.len() != feature_names.len()) {
            return Err(ForecastError::Computation(format!(
                "feature row has {} values, schema has {}",
                row.len(),
                feature_names.len()
            )));
        }

        let base_score = targets.iter().sum::<f64>() / targets.len() as f64;
        let mut predictions = vec![base_score; targets.len()];
        let mut residuals = vec![0.0; targets.len()];
        let mut rng = StdRng::seed_from_u64(params.seed);
        let all_rows: Vec<usize> = (0..targets.len()).collect();
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            for (i, residual) in residuals.iter_mut().enumerate() {
                *residual = targets[i] - predictions[i];
            }

            let rows = if params.subsample < 1.0 {
                let sampled: Vec<usize> = all_rows
                    .iter()
                    .copied()
                    .filter(|_| rng.random::<f64>() < params.subsample)
                    .collect();
                if sampled.is_empty() { all_rows.clone() } else { sampled }
            } else {
                all_rows.clone()
            };

            let tree = TreeBuilder::new(features, &residuals, params).build(&rows);
            for (prediction, row) in predictions.iter_mut().zip(features) {
                *prediction += params.learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        Ok(Self {
            feature_names,
            base_score,
            learning_rate: params.learning_rate,
            trees,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Raw prediction for an ordered feature vector, without schema checks.
    pub fn predict_values(&self, features: &[f64]) -> f64 {
        self.base_score
            + self.learning_rate * self.trees.iter().map(|t| t.predict(features)).sum::<f64>()
    }

    /// Check a deserialized model against the feature layout it will be served with.
    pub fn validate(&self, expected_names: &[String]) -> std::result::Result<(), String> {
        if self.feature_names != expected_names {
            return Err(format!(
                "model features {:?} do not match {:?}",
                self.feature_names, expected_names
            ));
        }
        if !self.base_score.is_finite() || !self.learning_rate.is_finite() {
            return Err("non-finite base score or learning rate".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_names.len())
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }

    fn check_schema(&self, row: &FeatureRow) -> Result<()> {
        let names_match = row.names.len() == self.feature_names.len()
            && row
                .names
                .iter()
                .zip(&self.feature_names)
                .all(|(got, expected)| *got == expected.as_str());

        if names_match && row.values.len() == row.names.len() {
            Ok(())
        } else {
            Err(ForecastError::SchemaMismatch {
                expected: self.feature_names.clone(),
                got: row.names.iter().map(|n| n.to_string()).collect(),
            })
        }
    }
}

impl ForecastModel for GradientBoostedRegressor {
    fn predict(&self, row: &FeatureRow) -> Result<f64> {
        self.check_schema(row)?;
        Ok(self.predict_values(&row.values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::{DAILY_SCHEMA, MONTHLY_SCHEMA};
    use crate::domain::series::{Granularity, RegularSeries};
    use chrono::NaiveDate;

    fn small_params() -> BoostingParams {
        BoostingParams {
            n_estimators: 200,
            ..BoostingParams::default()
        }
    }

    #[test]
    fn test_fits_step_function() {
        let features: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i)]).collect();
        let targets: Vec<f64> = (0..20).map(|i| if i < 10 { 2.0 } else { 12.0 }).collect();

        let model =
            GradientBoostedRegressor::fit(vec!["x".to_string()], &features, &targets, &small_params())
                .unwrap();

        assert_eq!(model.tree_count(), 200);
        assert!((model.predict_values(&[3.0]) - 2.0).abs() < 0.1);
        assert!((model.predict_values(&[15.0]) - 12.0).abs() < 0.1);
    }

    #[test]
    fn test_constant_target_predicts_constant() {
        let features: Vec<Vec<f64>> = (0..5).map(|i| vec![f64::from(i), 1.0]).collect();
        let targets = vec![4.0; 5];
        let model = GradientBoostedRegressor::fit(
            vec!["a".to_string(), "b".to_string()],
            &features,
            &targets,
            &small_params(),
        )
        .unwrap();
        assert!((model.predict_values(&[2.0, 1.0]) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_training_is_deterministic() {
        let features: Vec<Vec<f64>> = (0..30).map(|i| vec![f64::from(i % 7), f64::from(i)]).collect();
        let targets: Vec<f64> = (0..30).map(|i| f64::from((i * 13) % 11)).collect();
        let params = BoostingParams {
            n_estimators: 50,
            subsample: 0.8,
            ..BoostingParams::default()
        };
        let names = vec!["dow".to_string(), "t".to_string()];

        let a = GradientBoostedRegressor::fit(names.clone(), &features, &targets, &params).unwrap();
        let b = GradientBoostedRegressor::fit(names, &features, &targets, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_mismatched_schema() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let daily = RegularSeries::new(Granularity::Daily, start, (0..20).map(f64::from).collect());
        let table = DAILY_SCHEMA.training_table(&daily).unwrap();
        let model = GradientBoostedRegressor::fit(
            DAILY_SCHEMA.feature_names(),
            &table.matrix(),
            &table.targets,
            &small_params(),
        )
        .unwrap();

        assert!(model.predict(&DAILY_SCHEMA.next_row(&daily).unwrap()).is_ok());

        let monthly = RegularSeries::new(Granularity::Monthly, start, vec![5.0; 14]);
        let row = MONTHLY_SCHEMA.next_row(&monthly).unwrap();
        match model.predict(&row) {
            Err(ForecastError::SchemaMismatch { expected, got }) => {
                assert_eq!(expected, DAILY_SCHEMA.feature_names());
                assert_eq!(got, MONTHLY_SCHEMA.feature_names());
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_json_artifact_round_trip_predicts_identically() {
        let features: Vec<Vec<f64>> = (0..12).map(|i| vec![f64::from(i)]).collect();
        let targets: Vec<f64> = (0..12).map(|i| f64::from(i * i)).collect();
        let model =
            GradientBoostedRegressor::fit(vec!["x".to_string()], &features, &targets, &small_params())
                .unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: GradientBoostedRegressor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.predict_values(&[5.5]), model.predict_values(&[5.5]));
    }

    #[test]
    fn test_validate_accepts_trained_model() {
        let features: Vec<Vec<f64>> = (0..20).map(|i| vec![f64::from(i % 5), f64::from(i)]).collect();
        let targets: Vec<f64> = (0..20).map(|i| f64::from(i % 4)).collect();
        let names = vec!["a".to_string(), "b".to_string()];
        let model = GradientBoostedRegressor::fit(names.clone(), &features, &targets, &small_params())
            .unwrap();

        assert!(model.validate(&names).is_ok());
        assert!(model.validate(&["b".to_string(), "a".to_string()]).is_err());
    }

    #[test]
    fn test_validate_rejects_broken_trees() {
        let tree = |split_features: Vec<usize>, thresholds: Vec<f64>, left: Vec<i32>, right: Vec<i32>| {
            GradientBoostedRegressor {
                feature_names: vec!["x".to_string()],
                base_score: 0.0,
                learning_rate: 0.1,
                trees: vec![RegressionTree {
                    split_features,
                    thresholds,
                    left_child: left,
                    right_child: right,
                    leaf_values: vec![1.0, 2.0],
                }],
            }
        };
        let names = vec!["x".to_string()];

        assert!(tree(vec![0], vec![0.5], vec![-1], vec![-2]).validate(&names).is_ok());
        // missing threshold
        assert!(tree(vec![0], vec![], vec![-1], vec![-2]).validate(&names).is_err());
        // leaf out of range
        assert!(tree(vec![0], vec![0.5], vec![-1], vec![-3]).validate(&names).is_err());
        // feature out of range
        assert!(tree(vec![1], vec![0.5], vec![-1], vec![-2]).validate(&names).is_err());
        // cycle back to the root
        assert!(tree(vec![0, 0], vec![0.5, 0.5], vec![1, 0], vec![-1, -2]).validate(&names).is_err());
    }

    #[test]
    fn test_empty_training_set_is_rejected() {
        let result = GradientBoostedRegressor::fit(vec!["x".to_string()], &[], &[], &small_params());
        assert_eq!(
            result.unwrap_err(),
            ForecastError::InsufficientHistory { needed: 1, got: 0 }
        );
    }
}
