//! Regression tests for the fixture artifacts under `tests/fixtures/`.
//!
//! These pin the exact text produced for known inputs so that changes to
//! encoding order, tree traversal or probability formatting are caught.

use std::path::PathBuf;

use exampass::artifacts::{self, Artifacts};
use exampass::predict::{predict, Outcome, PredictionForm};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn load(model: &str) -> Artifacts {
    artifacts::load(&fixture(model), &fixture("encoders.json")).unwrap()
}

fn form(gender: &str, race: &str, lunch: &str, prep: &str) -> PredictionForm {
    PredictionForm {
        gender: Some(gender.into()),
        race_ethnicity: Some(race.into()),
        lunch: Some(lunch.into()),
        test_preparation_course: Some(prep.into()),
    }
}

fn predicted_text(artifacts: &Artifacts, f: &PredictionForm) -> String {
    predict(artifacts, f).unwrap().display()
}

// ---------------------------------------------------------------------------
// Logistic regression fixture
// ---------------------------------------------------------------------------

#[test]
fn test_logistic_regression_known_outputs() {
    let a = load("model.json");
    assert_eq!(a.model.kind(), "logistic_regression");

    assert_eq!(
        predicted_text(&a, &form("male", "group C", "standard", "none")),
        "Result: PASS (Pass probability: 84.55%)"
    );
    assert_eq!(
        predicted_text(&a, &form("female", "group A", "free/reduced", "completed")),
        "Result: FAIL (Pass probability: 26.89%)"
    );
}

// ---------------------------------------------------------------------------
// Random forest fixture
// ---------------------------------------------------------------------------

#[test]
fn test_random_forest_known_outputs() {
    let a = load("forest_model.json");
    assert_eq!(a.model.kind(), "random_forest");

    let cases = [
        (
            form("female", "group A", "free/reduced", "completed"),
            "Result: PASS (Pass probability: 70.00%)",
        ),
        (
            form("male", "group E", "standard", "none"),
            "Result: PASS (Pass probability: 67.50%)",
        ),
        (
            form("female", "group B", "free/reduced", "none"),
            "Result: FAIL (Pass probability: 35.00%)",
        ),
        (
            form("male", "group C", "standard", "none"),
            "Result: PASS (Pass probability: 57.50%)",
        ),
    ];

    for (f, expected) in &cases {
        assert_eq!(&predicted_text(&a, f), expected, "input: {:?}", f);
    }
}

#[test]
fn test_every_vocabulary_combination_yields_bounded_probability() {
    let a = load("forest_model.json");
    let column = |name: &str| a.encoders.get(name).unwrap().classes().to_vec();

    for g in column("gender") {
        for r in column("race/ethnicity") {
            for l in column("lunch") {
                for p in column("test preparation course") {
                    let prediction = predict(&a, &form(&g, &r, &l, &p)).unwrap();
                    assert!(
                        (0.0..=100.0).contains(&prediction.pass_probability),
                        "probability out of range for {g}/{r}/{l}/{p}"
                    );
                    assert!(matches!(prediction.outcome, Outcome::Pass | Outcome::Fail));
                }
            }
        }
    }
}

#[test]
fn test_fixture_model_hash_is_stable() {
    let a = load("model.json");
    let b = load("model.json");
    assert_eq!(a.model_hash, b.model_hash);
    assert_ne!(a.model_hash, load("forest_model.json").model_hash);
}
