//! Pre-trained pass/fail classifier.
//!
//! The training step exports one of three model families as JSON, selected by
//! the `"type"` field:
//!
//! - `logistic_regression`: `coef` rows and `intercept` per class (a single
//!   row for the binary case, scored with a sigmoid; one row per class
//!   otherwise, scored with a softmax)
//! - `decision_tree`: a flat node array rooted at index 0, where
//!   `x[feature] <= threshold` descends left and leaves carry per-class
//!   weights
//! - `random_forest`: several trees whose probabilities are averaged
//!
//! Every family predicts `classes[argmax(predict_proba(x))]`.

use serde::{Deserialize, Serialize};

/// Inference interface shared by every model family.
pub trait Classifier {
    /// Class labels, in the order of the probability vector.
    fn classes(&self) -> &[i64];

    /// Number of input features, when the model records it.
    fn n_features(&self) -> Option<usize>;

    /// Per-class probabilities for one feature vector.
    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError>;

    /// Most probable class label. The first class wins ties.
    fn predict(&self, x: &[f64]) -> Result<i64, ModelError> {
        let proba = self.predict_proba(x)?;
        let best = proba
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, &p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })
            .map(|(i, _)| i)
            .ok_or(ModelError::EmptyOutput)?;
        self.classes()
            .get(best)
            .copied()
            .ok_or(ModelError::EmptyOutput)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("model expects {expected} features, got {got}")]
    FeatureCountMismatch { expected: usize, got: usize },
    #[error("tree node {node} references feature {feature}, input has {n_features}")]
    FeatureOutOfRange {
        node: usize,
        feature: usize,
        n_features: usize,
    },
    #[error("tree walk reached missing node {0}")]
    MissingNode(usize),
    #[error("model produced no class probabilities")]
    EmptyOutput,
    #[error("invalid model: {0}")]
    Invalid(String),
}

/// A trained model as exported by the training step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Model {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
}

impl Model {
    pub fn kind(&self) -> &'static str {
        match self {
            Model::LogisticRegression(_) => "logistic_regression",
            Model::DecisionTree(_) => "decision_tree",
            Model::RandomForest(_) => "random_forest",
        }
    }

    /// Structural checks run once at load time.
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            Model::LogisticRegression(m) => m.validate(),
            Model::DecisionTree(m) => {
                check_classes(&m.classes)?;
                m.tree.validate(m.classes.len())
            }
            Model::RandomForest(m) => m.validate(),
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            Model::LogisticRegression(m) => m as &dyn Classifier,
            Model::DecisionTree(m) => m,
            Model::RandomForest(m) => m,
        }
    }
}

impl Classifier for Model {
    fn classes(&self) -> &[i64] {
        self.inner().classes()
    }

    fn n_features(&self) -> Option<usize> {
        self.inner().n_features()
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        self.inner().predict_proba(x)
    }
}

fn check_classes(classes: &[i64]) -> Result<(), ModelError> {
    if classes.is_empty() {
        return Err(ModelError::Invalid("no classes".into()));
    }
    Ok(())
}

fn check_feature_count(expected: Option<usize>, x: &[f64]) -> Result<(), ModelError> {
    match expected {
        Some(expected) if expected != x.len() => Err(ModelError::FeatureCountMismatch {
            expected,
            got: x.len(),
        }),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Logistic regression
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub classes: Vec<i64>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl LogisticRegression {
    fn validate(&self) -> Result<(), ModelError> {
        if self.classes.len() < 2 {
            return Err(ModelError::Invalid(format!(
                "logistic regression needs at least 2 classes, found {}",
                self.classes.len()
            )));
        }
        let rows = self.coef.len();
        let expected_rows = if self.classes.len() == 2 { 1 } else { self.classes.len() };
        if rows != expected_rows {
            return Err(ModelError::Invalid(format!(
                "{} classes need {} coefficient rows, found {}",
                self.classes.len(),
                expected_rows,
                rows
            )));
        }
        if self.intercept.len() != rows {
            return Err(ModelError::Invalid(format!(
                "{} coefficient rows but {} intercepts",
                rows,
                self.intercept.len()
            )));
        }
        let width = self.coef[0].len();
        if self.coef.iter().any(|row| row.len() != width) {
            return Err(ModelError::Invalid("ragged coefficient rows".into()));
        }
        Ok(())
    }

    fn decision(&self, x: &[f64]) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| row.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + b)
            .collect()
    }
}

impl Classifier for LogisticRegression {
    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn n_features(&self) -> Option<usize> {
        self.coef.first().map(Vec::len)
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_feature_count(self.n_features(), x)?;
        let scores = self.decision(x);
        match scores.as_slice() {
            [] => Err(ModelError::EmptyOutput),
            [z] => {
                let p = sigmoid(*z);
                Ok(vec![1.0 - p, p])
            }
            _ => Ok(softmax(&scores)),
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / total).collect()
}

// ---------------------------------------------------------------------------
// Trees
// ---------------------------------------------------------------------------

/// One node of a fitted tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    fn validate(&self, n_classes: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::Invalid("tree has no nodes".into()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split { left, right, .. } => {
                    // Children always follow their parent in the exported order,
                    // which also rules out cycles.
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(ModelError::Invalid(format!(
                                "node {i} has invalid child {child}"
                            )));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(ModelError::Invalid(format!(
                            "leaf {i} has {} values for {n_classes} classes",
                            value.len()
                        )));
                    }
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                        return Err(ModelError::Invalid(format!(
                            "leaf {i} has a negative or non-finite weight"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx).ok_or(ModelError::MissingNode(idx))? {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = x.get(*feature).ok_or(ModelError::FeatureOutOfRange {
                        node: idx,
                        feature: *feature,
                        n_features: x.len(),
                    })?;
                    idx = if *v <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => {
                    let total: f64 = value.iter().sum();
                    if total <= 0.0 {
                        return Ok(vec![1.0 / value.len() as f64; value.len()]);
                    }
                    return Ok(value.iter().map(|v| v / total).collect());
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub classes: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_features: Option<usize>,
    #[serde(flatten)]
    pub tree: Tree,
}

impl Classifier for DecisionTree {
    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_feature_count(self.n_features, x)?;
        self.tree.leaf_proba(x)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub classes: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_features: Option<usize>,
    pub trees: Vec<Tree>,
}

impl RandomForest {
    fn validate(&self) -> Result<(), ModelError> {
        check_classes(&self.classes)?;
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("forest has no trees".into()));
        }
        self.trees
            .iter()
            .try_for_each(|t| t.validate(self.classes.len()))
    }
}

impl Classifier for RandomForest {
    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_feature_count(self.n_features, x)?;
        let mut sum = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in sum.iter_mut().zip(tree.leaf_proba(x)?) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        Ok(sum.into_iter().map(|s| s / n).collect())
    }
}
