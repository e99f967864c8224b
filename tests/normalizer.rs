/// Normalizer tests: malformed bodies, failures, and the rendering rules.
///
/// Run with: cargo test --test normalizer -- --nocapture

use proptest::prelude::*;
use serde_json::{json, Value};

use severity_relay::gateway::{ErrorKind, GatewayError};
use severity_relay::normalizer::{
    normalize, percent, top_choice, Direction, ParsedResponse, SeverityViewModel,
    FACTORS_PLACEHOLDER, PROBABILITIES_PLACEHOLDER,
};
use severity_relay::severity::{AdvisoryTier, BadgeStyle, SeverityClass, SeverityLabel};

fn from_body(body: Value) -> SeverityViewModel {
    normalize(&Ok(body))
}

#[test]
fn test_minor_scenario() {
    println!("\n=== Test: Minor Scenario ===");
    let vm = from_body(json!({ "prediction": 0, "probabilities": [0.7, 0.2, 0.08, 0.02] }));

    assert_eq!(vm.label, SeverityLabel::Minor);
    assert_eq!(vm.badge, BadgeStyle::Low);
    assert_eq!(vm.confidence_percent, Some(70));
    assert_eq!(vm.top_choice, Some(0));
    assert!(vm.error.is_none());

    let advisory = vm.advisory.as_ref().expect("advisory present");
    assert_eq!(advisory.tier, AdvisoryTier::Low);
    assert_eq!(
        advisory.details,
        "Predicted: Minor (70%). Normal caution is recommended."
    );

    let bars = vm.ranked_probabilities.as_ref().unwrap();
    let percents: Vec<u8> = bars.iter().map(|b| b.percent).collect();
    assert_eq!(percents, vec![70, 20, 8, 2]);
    let labels: Vec<SeverityLabel> = bars.iter().map(|b| b.label).collect();
    assert_eq!(
        labels,
        vec![
            SeverityLabel::Minor,
            SeverityLabel::Moderate,
            SeverityLabel::Serious,
            SeverityLabel::Fatal
        ]
    );
    assert!(bars[0].is_top_choice);
    assert!(bars[1..].iter().all(|b| !b.is_top_choice));

    // No explanation in the body.
    assert!(vm.top_factors.is_none());
    assert_eq!(vm.factors_placeholder(), Some(FACTORS_PLACEHOLDER));
    println!("✓ Minor scenario projected");
}

#[test]
fn test_upstream_error_field() {
    let vm = from_body(json!({ "error": "model unavailable" }));
    let err = vm.error.as_ref().unwrap();
    assert_eq!(err.message, "model unavailable");
    assert_eq!(err.kind, ErrorKind::Upstream);
    assert_eq!(vm.label, SeverityLabel::Unknown);
    assert!(vm.ranked_probabilities.is_none());
    assert!(vm.advisory.is_none());
    assert!(vm.top_factors.is_none());
    assert_eq!(vm.probabilities_placeholder(), None);
}

#[test]
fn test_error_wins_over_valid_fields() {
    let vm = from_body(json!({
        "error": { "code": 42 },
        "prediction": 3,
        "probabilities": [0.0, 0.0, 0.0, 1.0]
    }));
    assert_eq!(vm.error.unwrap().message, r#"{"code":42}"#);
    assert_eq!(vm.label, SeverityLabel::Unknown);
    assert!(vm.confidence_percent.is_none());
}

#[test]
fn test_empty_error_is_not_an_error() {
    for empty in [json!(null), json!(""), json!(false), json!(0)] {
        let vm = from_body(json!({ "error": empty, "prediction": 1, "probabilities": [0.1, 0.6, 0.2, 0.1] }));
        assert!(vm.error.is_none(), "{:?} treated as error", empty);
        assert_eq!(vm.label, SeverityLabel::Moderate);
    }
}

#[test]
fn test_gateway_failure_keeps_upstream_body() {
    let outcome = Err(GatewayError::Upstream {
        status: 500,
        body: Some(json!("predict_proba failed")),
    });
    let vm = normalize(&outcome);
    let err = vm.error.unwrap();
    assert_eq!(err.kind, ErrorKind::UpstreamStatus);
    assert_eq!(err.message, "predict_proba failed");
}

#[test]
fn test_probabilities_not_a_sequence() {
    let vm = from_body(json!({ "prediction": 2, "probabilities": null }));

    assert!(vm.error.is_none());
    assert_eq!(vm.label, SeverityLabel::Serious);
    assert!(vm.ranked_probabilities.is_none());
    assert!(vm.advisory.is_none(), "advisory needs probabilities");
    assert!(vm.confidence_percent.is_none());
    assert_eq!(vm.probabilities_placeholder(), Some(PROBABILITIES_PLACEHOLDER));

    let vm = from_body(json!({ "prediction": 2, "probabilities": { "0": 0.5 } }));
    assert!(vm.error.is_none());
    assert!(vm.advisory.is_none());
}

#[test]
fn test_out_of_range_prediction_is_low_tier() {
    let vm = from_body(json!({ "prediction": 9, "probabilities": [0.1, 0.1, 0.1, 0.7] }));
    assert_eq!(vm.label, SeverityLabel::Unknown);
    assert_eq!(vm.badge, BadgeStyle::Neutral);
    assert_eq!(vm.model_class, Some(9.0));
    assert!(vm.confidence_percent.is_none());
    let advisory = vm.advisory.unwrap();
    assert_eq!(advisory.tier, AdvisoryTier::Low);
    assert_eq!(
        advisory.details,
        "Predicted: Unknown (0%). Normal caution is recommended."
    );
    // The bars still show the distribution.
    assert_eq!(vm.top_choice, Some(3));
}

#[test]
fn test_non_numeric_and_fractional_predictions() {
    let vm = from_body(json!({ "prediction": "2", "probabilities": [0.2, 0.2, 0.5, 0.1] }));
    assert_eq!(vm.label, SeverityLabel::Unknown);
    assert_eq!(vm.model_class, None);
    assert_eq!(vm.advisory.unwrap().tier, AdvisoryTier::Low);

    let vm = from_body(json!({ "prediction": 2.5, "probabilities": [0.2, 0.2, 0.5, 0.1] }));
    assert_eq!(vm.label, SeverityLabel::Unknown);
    assert_eq!(vm.advisory.unwrap().tier, AdvisoryTier::Low);

    let vm = from_body(json!({ "prediction": -1, "probabilities": [0.2, 0.2, 0.5, 0.1] }));
    assert_eq!(vm.label, SeverityLabel::Unknown);
}

#[test]
fn test_high_tier_for_serious_and_fatal() {
    let vm = from_body(json!({ "prediction": 3, "probabilities": [0.05, 0.05, 0.3, 0.6] }));
    assert_eq!(vm.label, SeverityLabel::Fatal);
    let advisory = vm.advisory.unwrap();
    assert_eq!(advisory.tier, AdvisoryTier::High);
    assert_eq!(advisory.tips.len(), 5);
    assert_eq!(vm.confidence_percent, Some(60));
}

#[test]
fn test_garbage_probability_entries_clamped() {
    let vm = from_body(json!({
        "prediction": 1,
        "probabilities": [-0.3, 1.7, "x", null]
    }));
    let bars = vm.ranked_probabilities.unwrap();
    let percents: Vec<u8> = bars.iter().map(|b| b.percent).collect();
    assert_eq!(percents, vec![0, 100, 0, 0]);
    assert_eq!(vm.confidence_percent, Some(100));
    assert_eq!(vm.top_choice, Some(1));
}

#[test]
fn test_short_and_long_probability_lists() {
    // Predicted index past the end of the list counts as 0%.
    let vm = from_body(json!({ "prediction": 3, "probabilities": [0.6, 0.4] }));
    assert_eq!(vm.confidence_percent, Some(0));
    assert_eq!(vm.ranked_probabilities.as_ref().unwrap().len(), 2);

    let vm = from_body(json!({ "prediction": 0, "probabilities": [0.1, 0.1, 0.1, 0.1, 0.6] }));
    let bars = vm.ranked_probabilities.unwrap();
    assert_eq!(bars.len(), 5);
    assert_eq!(bars[4].label, SeverityLabel::Unknown);
    assert_eq!(bars[4].style, BadgeStyle::High);
    assert!(bars[4].is_top_choice);
}

#[test]
fn test_top_choice_may_disagree_with_prediction() {
    let vm = from_body(json!({ "prediction": 1, "probabilities": [0.5, 0.3, 0.1, 0.1] }));
    assert_eq!(vm.label, SeverityLabel::Moderate);
    assert_eq!(vm.top_choice, Some(0));
    assert_eq!(vm.advisory.unwrap().tier, AdvisoryTier::Moderate);
}

#[test]
fn test_top_choice_first_tie_wins() {
    assert_eq!(top_choice(&[Some(0.4), Some(0.4), Some(0.2)]), Some(0));
    assert_eq!(top_choice(&[None, Some(0.1), Some(0.1)]), Some(1));
    assert_eq!(top_choice(&[None, None]), None);
    assert_eq!(top_choice(&[]), None);
}

#[test]
fn test_top_factors_ranked_by_magnitude() {
    println!("\n=== Test: Top Factors ===");
    let vm = from_body(json!({
        "prediction": 0,
        "probabilities": [0.7, 0.2, 0.08, 0.02],
        "explanation": { "feature_importances": [0.01, -0.9, 0.3, -0.05, 0.2, 0.02] }
    }));
    let factors = vm.top_factors.unwrap();

    let order: Vec<(usize, Direction)> = factors
        .iter()
        .map(|f| (f.feature_index, f.direction))
        .collect();
    assert_eq!(
        order,
        vec![
            (1, Direction::DecreasesRisk),
            (2, Direction::IncreasesRisk),
            (4, Direction::IncreasesRisk),
            (3, Direction::DecreasesRisk),
            (5, Direction::IncreasesRisk),
        ]
    );
    assert!((factors[0].absolute_importance - 0.9).abs() < 1e-12);
    assert_eq!(factors[0].name, "Feature #1");
    assert_eq!(factors[0].display, "90.00 importance");
    for f in &factors {
        println!("  {} {:.3} {}", f.name, f.absolute_importance, f.direction.as_str());
    }
    println!("✓ Factors ranked");
}

#[test]
fn test_top_factors_ties_keep_index_order() {
    let vm = from_body(json!({
        "explanation": { "feature_importances": [0.2, -0.2, 0.0, 0.2, 0.5, -0.0, 0.1] }
    }));
    let factors = vm.top_factors.unwrap();
    let idx: Vec<usize> = factors.iter().map(|f| f.feature_index).collect();
    assert_eq!(idx, vec![4, 0, 1, 3, 6]);
    assert_eq!(factors[2].direction, Direction::DecreasesRisk);
}

#[test]
fn test_zero_importance_decreases_risk() {
    let vm = from_body(json!({ "explanation": { "feature_importances": [0.0] } }));
    assert_eq!(vm.top_factors.unwrap()[0].direction, Direction::DecreasesRisk);
}

#[test]
fn test_malformed_importances_omitted() {
    for explanation in [
        json!(null),
        json!({}),
        json!({ "feature_importances": [] }),
        json!({ "feature_importances": "high" }),
        json!({ "feature_importances": [0.1, "x", 0.3] }),
    ] {
        let vm = from_body(json!({
            "prediction": 0,
            "probabilities": [1.0, 0.0, 0.0, 0.0],
            "explanation": explanation
        }));
        assert!(vm.top_factors.is_none(), "{:?} not omitted", explanation);
        assert!(vm.error.is_none());
    }
}

#[test]
fn test_singular_importance_key_accepted() {
    let vm = from_body(json!({ "explanation": { "feature_importance": [0.3, 0.6] } }));
    let idx: Vec<usize> = vm.top_factors.unwrap().iter().map(|f| f.feature_index).collect();
    assert_eq!(idx, vec![1, 0]);
}

#[test]
fn test_non_object_bodies_degrade() {
    for body in [json!(null), json!("ok"), json!([1, 2]), json!(3)] {
        let vm = from_body(body.clone());
        assert!(vm.error.is_none(), "{:?}", body);
        assert_eq!(vm.label, SeverityLabel::Unknown);
        assert!(vm.ranked_probabilities.is_none());
        assert!(vm.top_factors.is_none());
    }
}

#[test]
fn test_parse_classifies_success_and_partial() {
    let full = ParsedResponse::from_body(&json!({
        "prediction": 2,
        "probabilities": [0.1, 0.1, 0.7, 0.1]
    }));
    match full {
        ParsedResponse::Success(fields) => {
            assert_eq!(fields.class, SeverityClass::Serious);
            assert_eq!(fields.probabilities.len(), 4);
        }
        other => panic!("expected success, got {:?}", other),
    }

    let partial = ParsedResponse::from_body(&json!({ "prediction": 2 }));
    assert!(matches!(partial, ParsedResponse::PartialSuccess(_)));

    let failed = ParsedResponse::from_body(&json!({ "error": "nope" }));
    assert_eq!(
        failed,
        ParsedResponse::Failure(ErrorKind::Upstream, "nope".to_string())
    );
}

#[test]
fn test_view_model_serializes() {
    let vm = from_body(json!({ "prediction": 1, "probabilities": [0.2, 0.5, 0.2, 0.1] }));
    let v = serde_json::to_value(&vm).expect("Should serialize to JSON");
    assert_eq!(v["label"], json!("Moderate"));
    assert_eq!(v["confidence_percent"], json!(50));
    assert_eq!(v["advisory"]["tier"], json!("Moderate"));
    assert_eq!(v["ranked_probabilities"][1]["is_top_choice"], json!(true));
    assert_eq!(v["error"], Value::Null);
}

fn distribution() -> impl Strategy<Value = (Vec<f64>, usize)> {
    (prop::collection::vec(0.0f64..1.0, 4), 0usize..4).prop_map(|(w, idx)| {
        let weights: Vec<f64> = w.iter().map(|x| x + 0.01).collect();
        let sum: f64 = weights.iter().sum();
        (weights.iter().map(|x| x / sum).collect(), idx)
    })
}

proptest! {
    #[test]
    fn confidence_is_rounded_probability((ps, idx) in distribution()) {
        let vm = from_body(json!({ "prediction": idx, "probabilities": ps }));
        let expected = (ps[idx] * 100.0).round() as u8;
        prop_assert_eq!(vm.confidence_percent, Some(expected));
        prop_assert!(expected <= 100);
        prop_assert_eq!(vm.confidence_percent, Some(percent(Some(ps[idx]))));
        prop_assert!(vm.error.is_none());
    }
}
