//! Tree-ensemble regression.
//!
//! Trees are stored as flat node arrays, the way most training libraries export
//! them. Evaluation walks from node 0: a split sends the sample left when
//! `x[feature] <= threshold`, right otherwise, until a leaf is reached.
//!
//! The ensemble either averages its trees (random forest) or sums them (boosted
//! trees). Either way the result is offset by `base_score`.

use serde::{Deserialize, Serialize};

use crate::domain::FeatureVector;
use crate::error::PipelineError;
use crate::models::model::{Regressor, check_dimension};

/// How per-tree outputs are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Mean,
    Sum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Children must point strictly forward, which rules out cycles and
    /// guarantees every walk ends at a leaf.
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= n_features {
                        return Err(format!(
                            "node {idx} splits on feature {feature}, model has {n_features}"
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {idx} has a non-finite threshold"));
                    }
                    for child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx} has invalid child index {child}"));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {idx} has a non-finite value"));
                    }
                }
            }
        }
        Ok(())
    }

    fn evaluate(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[feature] <= threshold { left } else { right };
                }
                Node::Leaf { value } => return value,
            }
        }
    }
}

/// A validated tree ensemble.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEnsemble {
    aggregation: Aggregation,
    base_score: f64,
    n_features: usize,
    trees: Vec<Tree>,
}

impl TreeEnsemble {
    pub fn new(
        aggregation: Aggregation,
        base_score: f64,
        n_features: usize,
        trees: Vec<Tree>,
    ) -> Result<Self, String> {
        if n_features == 0 {
            return Err("model declares zero features".to_string());
        }
        if trees.is_empty() {
            return Err("model contains no trees".to_string());
        }
        if !base_score.is_finite() {
            return Err("base_score is not finite".to_string());
        }
        for (idx, tree) in trees.iter().enumerate() {
            tree.validate(n_features)
                .map_err(|e| format!("tree {idx}: {e}"))?;
        }
        Ok(Self {
            aggregation,
            base_score,
            n_features,
            trees,
        })
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for TreeEnsemble {
    fn expected_feature_count(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, PipelineError> {
        check_dimension("model", self.n_features, features)?;
        let x = features.as_slice();
        let total: f64 = self.trees.iter().map(|tree| tree.evaluate(x)).sum();
        Ok(match self.aggregation {
            Aggregation::Mean => self.base_score + total / self.trees.len() as f64,
            Aggregation::Sum => self.base_score + total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, low: f64, high: f64) -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { value: low },
                Node::Leaf { value: high },
            ],
        }
    }

    fn vector(values: &[f64]) -> FeatureVector {
        let names = (0..values.len()).map(|i| format!("f{i}")).collect();
        FeatureVector::new(names, values.to_vec()).unwrap()
    }

    #[test]
    fn split_goes_left_on_equal_threshold() {
        let model = TreeEnsemble::new(Aggregation::Mean, 0.0, 1, vec![stump(0, 10.0, 1.0, 2.0)]).unwrap();
        assert_eq!(model.predict(&vector(&[10.0])).unwrap(), 1.0);
        assert_eq!(model.predict(&vector(&[10.5])).unwrap(), 2.0);
    }

    #[test]
    fn mean_aggregation_averages_trees() {
        let model = TreeEnsemble::new(
            Aggregation::Mean,
            0.0,
            2,
            vec![stump(0, 1.0, 1000.0, 3000.0), stump(1, 1.0, 2000.0, 6000.0)],
        )
        .unwrap();
        assert_eq!(model.predict(&vector(&[0.0, 5.0])).unwrap(), 3500.0);
    }

    #[test]
    fn sum_aggregation_adds_base_score() {
        let model = TreeEnsemble::new(
            Aggregation::Sum,
            100.0,
            1,
            vec![stump(0, 1.0, 10.0, 20.0), stump(0, 2.0, 1.0, 2.0)],
        )
        .unwrap();
        assert_eq!(model.predict(&vector(&[1.5])).unwrap(), 100.0 + 20.0 + 1.0);
    }

    #[test]
    fn mean_aggregation_offsets_by_base_score() {
        let model = TreeEnsemble::new(
            Aggregation::Mean,
            500.0,
            1,
            vec![stump(0, 1.0, 1000.0, 3000.0), stump(0, 1.0, 2000.0, 4000.0)],
        )
        .unwrap();
        assert_eq!(model.predict(&vector(&[0.0])).unwrap(), 500.0 + 1500.0);
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let model = TreeEnsemble::new(Aggregation::Mean, 0.0, 2, vec![stump(1, 1.0, 1.0, 2.0)]).unwrap();
        let err = model.predict(&vector(&[1.0, 2.0, 3.0])).unwrap_err();
        assert_eq!(
            err,
            PipelineError::DimensionMismatch {
                stage: "model",
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn backward_child_is_rejected() {
        let tree = Tree {
            nodes: vec![
                Node::Leaf { value: 1.0 },
                Node::Split {
                    feature: 0,
                    threshold: 0.0,
                    left: 0,
                    right: 0,
                },
            ],
        };
        let err = TreeEnsemble::new(Aggregation::Mean, 0.0, 1, vec![tree]).unwrap_err();
        assert!(err.contains("invalid child"), "{err}");
    }

    #[test]
    fn split_on_unknown_feature_is_rejected() {
        let err = TreeEnsemble::new(Aggregation::Mean, 0.0, 1, vec![stump(3, 0.0, 1.0, 2.0)]).unwrap_err();
        assert!(err.contains("feature 3"), "{err}");
    }

    #[test]
    fn empty_forest_is_rejected() {
        assert!(TreeEnsemble::new(Aggregation::Mean, 0.0, 1, vec![]).is_err());
    }
}
