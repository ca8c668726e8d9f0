//! Form submission → encoded feature vector → pass/fail prediction.

use serde::{Deserialize, Serialize};

use crate::artifacts::Artifacts;
use crate::encoder::EncodeError;
use crate::model::{Classifier, ModelError};

/// Form field name and the encoder column it feeds, in model input order.
pub const FIELD_COLUMNS: [(&str, &str); 4] = [
    ("gender", "gender"),
    ("race_ethnicity", "race/ethnicity"),
    ("lunch", "lunch"),
    ("test_preparation_course", "test preparation course"),
];

/// Label of the positive class in the model's output.
const PASS_CLASS: i64 = 1;

/// Index of the positive class in `predict_proba` output.
const PASS_PROBA_INDEX: usize = 1;

pub const UNSEEN_LABEL_MESSAGE: &str =
    "An error occurred: one of the input values does not exist in the training data.";

pub const PREDICTION_ERROR_PREFIX: &str = "An error occurred during prediction";

/// One submitted form. Fields are optional so a missing one can be reported
/// as a prediction error instead of a rejected request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionForm {
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub race_ethnicity: Option<String>,
    #[serde(default)]
    pub lunch: Option<String>,
    #[serde(default)]
    pub test_preparation_course: Option<String>,
}

impl PredictionForm {
    /// Value submitted for a form field, by field name.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "gender" => self.gender.as_deref(),
            "race_ethnicity" => self.race_ethnicity.as_deref(),
            "lunch" => self.lunch.as_deref(),
            "test_preparation_course" => self.test_preparation_course.as_deref(),
            _ => None,
        }
    }

    /// Ordered (column, value) pairs, failing on the first missing field.
    pub fn columns(&self) -> Result<Vec<(&'static str, &str)>, PredictError> {
        FIELD_COLUMNS
            .iter()
            .map(|&(field, column)| {
                self.field(field)
                    .map(|v| (column, v))
                    .ok_or(PredictError::MissingField(field))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Pass,
    Fail,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Pass => "PASS",
            Outcome::Fail => "FAIL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub outcome: Outcome,
    /// Probability of the positive class, as a percentage.
    pub pass_probability: f64,
}

impl Prediction {
    /// Text shown to the user.
    pub fn display(&self) -> String {
        format!(
            "Result: {} (Pass probability: {:.2}%)",
            self.outcome.as_str(),
            self.pass_probability
        )
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictError {
    #[error("missing form field `{0}`")]
    MissingField(&'static str),
    #[error("no encoder for column `{0}`")]
    MissingEncoder(&'static str),
    #[error("column `{column}`: {source}")]
    UnseenLabel {
        column: &'static str,
        #[source]
        source: EncodeError,
    },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("model produced {0} class probabilities, expected at least 2")]
    NoPassProbability(usize),
    #[error("invalid form submission: {0}")]
    InvalidForm(String),
}

impl PredictError {
    /// Message rendered in place of a prediction.
    pub fn user_message(&self) -> String {
        match self {
            PredictError::UnseenLabel { .. } => UNSEEN_LABEL_MESSAGE.to_string(),
            other => format!("{PREDICTION_ERROR_PREFIX}: {other}"),
        }
    }

    pub fn is_unseen_label(&self) -> bool {
        matches!(self, PredictError::UnseenLabel { .. })
    }
}

/// Encode the submitted fields in [`FIELD_COLUMNS`] order.
pub fn encode(artifacts: &Artifacts, form: &PredictionForm) -> Result<Vec<f64>, PredictError> {
    form.columns()?
        .into_iter()
        .map(|(column, value)| {
            let encoder = artifacts
                .encoders
                .get(column)
                .ok_or(PredictError::MissingEncoder(column))?;
            encoder
                .transform(value)
                .map(|code| code as f64)
                .map_err(|source| PredictError::UnseenLabel { column, source })
        })
        .collect()
}

/// Run one prediction against the loaded artifacts.
pub fn predict(artifacts: &Artifacts, form: &PredictionForm) -> Result<Prediction, PredictError> {
    let features = encode(artifacts, form)?;

    let label = artifacts.model.predict(&features)?;
    let proba = artifacts.model.predict_proba(&features)?;
    let pass_proba = proba
        .get(PASS_PROBA_INDEX)
        .copied()
        .ok_or(PredictError::NoPassProbability(proba.len()))?;

    let outcome = if label == PASS_CLASS {
        Outcome::Pass
    } else {
        Outcome::Fail
    };

    tracing::debug!(
        ?features,
        label,
        pass_proba,
        outcome = outcome.as_str(),
        "prediction"
    );

    Ok(Prediction {
        outcome,
        pass_probability: pass_proba * 100.0,
    })
}
