//! Turns an untrusted prediction body (or a gateway failure) into a
//! renderable [`SeverityViewModel`].
//!
//! Every field is checked for presence and type before use. Nothing here
//! returns an error: malformed fields degrade to placeholders and failures
//! become the view model's `error`.

use serde::Serialize;
use serde_json::Value;

use crate::gateway::{ErrorKind, GatewayError};
use crate::severity::{AdvisoryTier, BadgeStyle, SeverityClass, SeverityLabel};

pub const MAX_TOP_FACTORS: usize = 5;

pub const PROBABILITIES_PLACEHOLDER: &str = "Probabilities not available";
pub const FACTORS_PLACEHOLDER: &str = "No factor importances available.";

/// The model's stated class, as far as it could be read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PredictedIndex {
    /// Missing, null, or not a finite number.
    Absent,
    /// A finite number. `class` is `None` when it is not one of the four classes.
    Stated {
        raw: f64,
        class: Option<SeverityClass>,
    },
}

impl PredictedIndex {
    fn read(v: Option<&Value>) -> Self {
        match v.and_then(Value::as_f64) {
            Some(raw) if raw.is_finite() => {
                let class = if raw.fract() == 0.0 {
                    SeverityClass::from_index(raw as i64)
                } else {
                    None
                };
                PredictedIndex::Stated { raw, class }
            }
            _ => PredictedIndex::Absent,
        }
    }

    pub fn class(&self) -> Option<SeverityClass> {
        match self {
            PredictedIndex::Stated { class, .. } => *class,
            PredictedIndex::Absent => None,
        }
    }
}

/// A fully valid prediction body.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedFields {
    pub class: SeverityClass,
    pub probabilities: Vec<f64>,
    pub importances: Option<Vec<f64>>,
}

/// A body with at least one field missing or of the wrong type.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialFields {
    pub prediction: PredictedIndex,
    /// `None` when the field is not a sequence; entries that are not
    /// numbers are kept as `None` so positions stay aligned with classes.
    pub probabilities: Option<Vec<Option<f64>>>,
    pub importances: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    Success(ValidatedFields),
    PartialSuccess(PartialFields),
    Failure(ErrorKind, String),
}

impl ParsedResponse {
    pub fn from_outcome(outcome: &Result<Value, GatewayError>) -> Self {
        match outcome {
            Ok(body) => Self::from_body(body),
            Err(e) => ParsedResponse::Failure(e.kind(), error_text(&e.detail())),
        }
    }

    pub fn from_body(body: &Value) -> Self {
        if let Some(err) = body.get("error").filter(|e| is_truthy(e)) {
            return ParsedResponse::Failure(ErrorKind::Upstream, error_text(err));
        }

        let prediction = PredictedIndex::read(body.get("prediction"));
        let probabilities = body.get("probabilities").and_then(Value::as_array).map(|ps| {
            ps.iter()
                .map(|p| p.as_f64().filter(|f| f.is_finite()))
                .collect::<Vec<_>>()
        });
        let importances = read_importances(body.get("explanation"));

        match (prediction.class(), &probabilities) {
            (Some(class), Some(ps)) if ps.iter().all(Option::is_some) => {
                ParsedResponse::Success(ValidatedFields {
                    class,
                    probabilities: ps.iter().flatten().copied().collect(),
                    importances,
                })
            }
            _ => ParsedResponse::PartialSuccess(PartialFields {
                prediction,
                probabilities,
                importances,
            }),
        }
    }
}

// Mirrors a falsy check on the upstream error field: null, false, 0 and ""
// mean "no error".
fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn error_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn read_importances(explanation: Option<&Value>) -> Option<Vec<f64>> {
    let exp = explanation?;
    let fi = exp
        .get("feature_importances")
        .or_else(|| exp.get("feature_importance"))?
        .as_array()?;
    if fi.is_empty() {
        return None;
    }
    fi.iter().map(Value::as_f64).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbabilityBar {
    pub label: SeverityLabel,
    pub percent: u8,
    pub is_top_choice: bool,
    pub style: BadgeStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    IncreasesRisk,
    DecreasesRisk,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::IncreasesRisk => "↑ increases risk",
            Direction::DecreasesRisk => "↓ decreases risk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopFactor {
    pub feature_index: usize,
    pub name: String,
    pub absolute_importance: f64,
    pub direction: Direction,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advisory {
    pub tier: AdvisoryTier,
    pub message: &'static str,
    pub icon: &'static str,
    pub details: String,
    pub tips: Vec<&'static str>,
}

impl Advisory {
    fn new(tier: AdvisoryTier, label: SeverityLabel, percent: u8) -> Self {
        Self {
            tier,
            message: tier.message(),
            icon: tier.icon(),
            details: tier.details(label, percent),
            tips: tier.tips().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewError {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityViewModel {
    pub label: SeverityLabel,
    pub badge: BadgeStyle,
    /// The stated class number for the "Model class #n" caption.
    pub model_class: Option<f64>,
    pub confidence_percent: Option<u8>,
    pub ranked_probabilities: Option<Vec<ProbabilityBar>>,
    /// Index of the largest probability. May disagree with `model_class`;
    /// both are shown.
    pub top_choice: Option<usize>,
    pub top_factors: Option<Vec<TopFactor>>,
    pub advisory: Option<Advisory>,
    pub error: Option<ViewError>,
}

impl SeverityViewModel {
    fn failed(kind: ErrorKind, message: String) -> Self {
        Self {
            label: SeverityLabel::Unknown,
            badge: BadgeStyle::Neutral,
            model_class: None,
            confidence_percent: None,
            ranked_probabilities: None,
            top_choice: None,
            top_factors: None,
            advisory: None,
            error: Some(ViewError { kind, message }),
        }
    }

    pub fn probabilities_placeholder(&self) -> Option<&'static str> {
        (self.error.is_none() && self.ranked_probabilities.is_none())
            .then_some(PROBABILITIES_PLACEHOLDER)
    }

    pub fn factors_placeholder(&self) -> Option<&'static str> {
        (self.error.is_none() && self.top_factors.is_none()).then_some(FACTORS_PLACEHOLDER)
    }
}

/// Projects a gateway outcome into a view model. Total.
pub fn normalize(outcome: &Result<Value, GatewayError>) -> SeverityViewModel {
    project(ParsedResponse::from_outcome(outcome))
}

pub fn project(parsed: ParsedResponse) -> SeverityViewModel {
    match parsed {
        ParsedResponse::Failure(kind, message) => SeverityViewModel::failed(kind, message),
        ParsedResponse::Success(fields) => {
            let raw = fields.class.index() as f64;
            let probabilities = fields.probabilities.into_iter().map(Some).collect();
            build(
                PredictedIndex::Stated {
                    raw,
                    class: Some(fields.class),
                },
                Some(probabilities),
                fields.importances,
            )
        }
        ParsedResponse::PartialSuccess(fields) => {
            build(fields.prediction, fields.probabilities, fields.importances)
        }
    }
}

fn build(
    prediction: PredictedIndex,
    probabilities: Option<Vec<Option<f64>>>,
    importances: Option<Vec<f64>>,
) -> SeverityViewModel {
    let class = prediction.class();
    let label = SeverityLabel::from_class(class);
    let model_class = match prediction {
        PredictedIndex::Stated { raw, .. } => Some(raw),
        PredictedIndex::Absent => None,
    };

    let mut vm = SeverityViewModel {
        label,
        badge: BadgeStyle::for_class(class),
        model_class,
        confidence_percent: None,
        ranked_probabilities: None,
        top_choice: None,
        top_factors: importances.map(|fi| top_factors(&fi)),
        advisory: None,
        error: None,
    };

    let Some(ps) = probabilities else {
        return vm;
    };

    let confidence = class.map(|c| percent(ps.get(c.index()).copied().flatten()));
    let top = top_choice(&ps);

    vm.confidence_percent = confidence;
    vm.top_choice = top;
    vm.ranked_probabilities = Some(
        ps.iter()
            .enumerate()
            .map(|(i, p)| ProbabilityBar {
                label: SeverityLabel::from_index(i as i64),
                percent: percent(*p),
                is_top_choice: top == Some(i),
                style: BadgeStyle::for_bar(i),
            })
            .collect(),
    );

    let tier = AdvisoryTier::for_class(class);
    vm.advisory = Some(Advisory::new(tier, label, confidence.unwrap_or(0)));
    vm
}

/// `round(100 × p)` with `p` clamped to [0, 1]; missing or garbage entries count as 0.
pub fn percent(p: Option<f64>) -> u8 {
    let p = p.filter(|f| f.is_finite()).unwrap_or(0.0).clamp(0.0, 1.0);
    (p * 100.0).round() as u8
}

/// First index holding the largest numeric probability.
pub fn top_choice(ps: &[Option<f64>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, p) in ps.iter().enumerate() {
        if let Some(p) = p {
            if best.map_or(true, |(_, max)| *p > max) {
                best = Some((i, *p));
            }
        }
    }
    best.map(|(i, _)| i)
}

/// Up to five factors by descending magnitude; ties keep the lower index first.
pub fn top_factors(importances: &[f64]) -> Vec<TopFactor> {
    let mut pairs: Vec<(usize, f64)> = importances.iter().copied().enumerate().collect();
    // sort_by is stable, so equal magnitudes stay in index order.
    pairs.sort_by(|a, b| {
        b.1.abs()
            .partial_cmp(&a.1.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    pairs
        .into_iter()
        .take(MAX_TOP_FACTORS)
        .map(|(idx, val)| {
            let abs = val.abs();
            TopFactor {
                feature_index: idx,
                name: format!("Feature #{}", idx),
                absolute_importance: abs,
                direction: if val > 0.0 {
                    Direction::IncreasesRisk
                } else {
                    Direction::DecreasesRisk
                },
                display: format!("{:.2} importance", abs * 100.0),
            }
        })
        .collect()
}
