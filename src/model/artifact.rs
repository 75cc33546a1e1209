//! JSON model artifacts: a linear model or a gradient boosted tree ensemble,
//! each stored next to its training feature order.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use super::{Predictor, RegressionModel};
use crate::error::{IpmError, Result};

/// On-disk artifact layout.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelArtifact {
    /// Feature names in training order.
    pub features: Vec<String>,
    /// Model parameters.
    pub model: ModelSpec,
}

/// Supported model families.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ModelSpec {
    /// `intercept + sum(coefficients[i] * x[i])`.
    Linear {
        intercept: f64,
        coefficients: Vec<f64>,
    },
    /// `init + learning_rate * sum(tree(x))`.
    GradientBoosting {
        init: f64,
        learning_rate: f64,
        trees: Vec<Tree>,
    },
}

/// A regression tree stored as a flat node list rooted at index 0.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

/// A split or a leaf. Rows with `x[feature] <= threshold` go left.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
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

#[derive(Debug)]
struct LinearModel {
    intercept: f64,
    coefficients: Vec<f64>,
}

impl RegressionModel for LinearModel {
    fn predict_one(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

#[derive(Debug)]
struct GradientBoostingModel {
    init: f64,
    learning_rate: f64,
    trees: Vec<Tree>,
}

impl Tree {
    fn evaluate(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    /// Checks indices so that `evaluate` always terminates in bounds.
    fn validate(&self, tree_idx: usize, n_features: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err(format!("tree {tree_idx} has no nodes"));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= n_features {
                    return Err(format!(
                        "tree {tree_idx} node {i} splits on feature {feature}, only {n_features} features"
                    ));
                }
                for child in [left, right] {
                    if *child <= i || *child >= self.nodes.len() {
                        return Err(format!(
                            "tree {tree_idx} node {i} has invalid child index {child}"
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

impl RegressionModel for GradientBoostingModel {
    fn predict_one(&self, features: &[f64]) -> f64 {
        let boost: f64 = self.trees.iter().map(|t| t.evaluate(features)).sum();
        self.init + self.learning_rate * boost
    }
}

impl ModelArtifact {
    /// Parses an artifact from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns `ModelUnavailable` if the JSON is malformed.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| unavailable(format!("invalid model artifact: {e}")))
    }

    /// Validates the parameters and builds a [`Predictor`].
    ///
    /// # Errors
    ///
    /// Returns `ModelUnavailable` if the parameters do not fit the feature list.
    pub fn into_predictor(self) -> Result<Predictor> {
        let n_features = self.features.len();
        let model: Box<dyn RegressionModel> = match self.model {
            ModelSpec::Linear {
                intercept,
                coefficients,
            } => {
                if coefficients.len() != n_features {
                    return Err(unavailable(format!(
                        "linear model has {} coefficients for {n_features} features",
                        coefficients.len()
                    )));
                }
                Box::new(LinearModel {
                    intercept,
                    coefficients,
                })
            }
            ModelSpec::GradientBoosting {
                init,
                learning_rate,
                trees,
            } => {
                for (i, tree) in trees.iter().enumerate() {
                    tree.validate(i, n_features).map_err(unavailable)?;
                }
                Box::new(GradientBoostingModel {
                    init,
                    learning_rate,
                    trees,
                })
            }
        };
        Predictor::new(model, self.features)
    }
}

fn unavailable(reason: String) -> IpmError {
    IpmError::ModelUnavailable { reason }
}

/// Loads a model artifact from disk.
///
/// # Errors
///
/// Returns `ModelUnavailable` if the file is absent, unreadable, or invalid.
pub fn load_predictor(path: &Path) -> Result<Predictor> {
    let content = fs::read_to_string(path)
        .map_err(|e| unavailable(format!("cannot read \"{}\": {e}", path.display())))?;
    let predictor = ModelArtifact::from_json_str(&content)?.into_predictor()?;
    info!(
        path = %path.display(),
        features = ?predictor.feature_names(),
        "loaded regression model"
    );
    Ok(predictor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{Components, Observation};

    const LINEAR: &str = r#"{
        "features": ["UHH", "HLS", "RLS", "Pengeluaran", "Tahun"],
        "model": {
            "type": "linear",
            "intercept": 1.0,
            "coefficients": [0.5, 1.0, 1.0, 0.0, 0.0]
        }
    }"#;

    const BOOSTED: &str = r#"{
        "features": ["UHH", "Tahun"],
        "model": {
            "type": "gradient_boosting",
            "init": 70.0,
            "learning_rate": 0.5,
            "trees": [
                { "nodes": [
                    { "feature": 0, "threshold": 72.0, "left": 1, "right": 2 },
                    { "value": -2.0 },
                    { "value": 4.0 }
                ] },
                { "nodes": [ { "value": 1.0 } ] }
            ]
        }
    }"#;

    fn sample(uhh: f64) -> Observation {
        Observation::new(2020, Components::new(uhh, 13.0, 9.0, 10_000.0))
    }

    #[test]
    fn linear_artifact_predicts() {
        let p = ModelArtifact::from_json_str(LINEAR)
            .and_then(ModelArtifact::into_predictor)
            .expect("artifact should load");
        // 1 + 0.5 * 70 + 13 + 9
        assert_eq!(p.predict_one(&sample(70.0)).unwrap(), 58.0);
    }

    #[test]
    fn boosted_trees_follow_threshold() {
        let p = ModelArtifact::from_json_str(BOOSTED)
            .and_then(ModelArtifact::into_predictor)
            .expect("artifact should load");
        // left leaf: 70 + 0.5 * (-2 + 1)
        assert_eq!(p.predict_one(&sample(72.0)).unwrap(), 69.5);
        // right leaf: 70 + 0.5 * (4 + 1)
        assert_eq!(p.predict_one(&sample(73.0)).unwrap(), 72.5);
    }

    #[test]
    fn coefficient_count_must_match_features() {
        let json = r#"{ "features": ["UHH"], "model": { "type": "linear", "intercept": 0.0, "coefficients": [1.0, 2.0] } }"#;
        let err = ModelArtifact::from_json_str(json)
            .and_then(ModelArtifact::into_predictor)
            .unwrap_err();
        assert_eq!(err.kind(), "ModelUnavailable");
    }

    #[test]
    fn backward_child_index_is_rejected() {
        let json = r#"{ "features": ["UHH"], "model": { "type": "gradient_boosting", "init": 0.0, "learning_rate": 1.0,
            "trees": [ { "nodes": [ { "feature": 0, "threshold": 1.0, "left": 0, "right": 1 }, { "value": 1.0 } ] } ] } }"#;
        let err = ModelArtifact::from_json_str(json)
            .and_then(ModelArtifact::into_predictor)
            .unwrap_err();
        assert!(err.to_string().contains("invalid child index"));
    }

    #[test]
    fn missing_file_is_model_unavailable() {
        let err = load_predictor(Path::new("does/not/exist.json")).unwrap_err();
        assert_eq!(err.kind(), "ModelUnavailable");
    }

    #[test]
    fn malformed_json_is_model_unavailable() {
        let err = ModelArtifact::from_json_str("{ not json").unwrap_err();
        assert_eq!(err.kind(), "ModelUnavailable");
    }
}
