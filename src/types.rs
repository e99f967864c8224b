use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const HOUR_RANGE: (u8, u8) = (0, 23);
pub const VISIBILITY_RANGE: (f64, f64) = (0.1, 20.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    Clear,
    Rain,
    Fog,
    Snow,
    Other,
}

impl Weather {
    pub const ALL: [Weather; 5] = [
        Weather::Clear,
        Weather::Rain,
        Weather::Fog,
        Weather::Snow,
        Weather::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weather::Clear => "clear",
            Weather::Rain => "rain",
            Weather::Fog => "fog",
            Weather::Snow => "snow",
            Weather::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.as_str() == s)
    }
}

// Conditions sent to the prediction service. Field names are the wire names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionRequest {
    pub hour: u8,
    pub visibility: f64,
    pub weather: Weather,
    #[serde(serialize_with = "flag_to_int", deserialize_with = "flag_from_wire")]
    pub rush_hour: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("hour {0} outside [0, 23]")]
    Hour(u8),
    #[error("visibility {0} outside [0.1, 20.0]")]
    Visibility(f64),
}

impl ConditionRequest {
    /// Checks every field against its domain. Weather and rush_hour are
    /// constrained by their types.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.hour > HOUR_RANGE.1 {
            return Err(ValidationError::Hour(self.hour));
        }
        if !self.visibility.is_finite()
            || self.visibility < VISIBILITY_RANGE.0
            || self.visibility > VISIBILITY_RANGE.1
        {
            return Err(ValidationError::Visibility(self.visibility));
        }
        Ok(())
    }
}

fn flag_to_int<S: Serializer>(flag: &bool, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u8(u8::from(*flag))
}

// Accepts 0/1 as sent by the form, and plain booleans from hand-written clients.
fn flag_from_wire<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Int(u64),
        Bool(bool),
    }

    match Wire::deserialize(d)? {
        Wire::Bool(b) => Ok(b),
        Wire::Int(0) => Ok(false),
        Wire::Int(1) => Ok(true),
        Wire::Int(n) => Err(serde::de::Error::custom(format!(
            "rush_hour must be 0 or 1, got {}",
            n
        ))),
    }
}
