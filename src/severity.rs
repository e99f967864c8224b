use serde::Serialize;

/// Severity classes in the order the model emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeverityClass {
    Minor,
    Moderate,
    Serious,
    Fatal,
}

impl SeverityClass {
    pub const ALL: [SeverityClass; 4] = [
        SeverityClass::Minor,
        SeverityClass::Moderate,
        SeverityClass::Serious,
        SeverityClass::Fatal,
    ];

    pub fn from_index(idx: i64) -> Option<Self> {
        usize::try_from(idx)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Display label. Total over every index the model might send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeverityLabel {
    Minor,
    Moderate,
    Serious,
    Fatal,
    Unknown,
}

impl SeverityLabel {
    pub fn from_class(class: Option<SeverityClass>) -> Self {
        match class {
            Some(SeverityClass::Minor) => SeverityLabel::Minor,
            Some(SeverityClass::Moderate) => SeverityLabel::Moderate,
            Some(SeverityClass::Serious) => SeverityLabel::Serious,
            Some(SeverityClass::Fatal) => SeverityLabel::Fatal,
            None => SeverityLabel::Unknown,
        }
    }

    pub fn from_index(idx: i64) -> Self {
        Self::from_class(SeverityClass::from_index(idx))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityLabel::Minor => "Minor",
            SeverityLabel::Moderate => "Moderate",
            SeverityLabel::Serious => "Serious",
            SeverityLabel::Fatal => "Fatal",
            SeverityLabel::Unknown => "Unknown",
        }
    }
}

/// Badge colour for the predicted class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeStyle {
    Low,
    Medium,
    High,
    Neutral,
}

impl BadgeStyle {
    pub fn for_class(class: Option<SeverityClass>) -> Self {
        match class {
            Some(SeverityClass::Minor) => BadgeStyle::Low,
            Some(SeverityClass::Moderate) => BadgeStyle::Medium,
            Some(SeverityClass::Serious | SeverityClass::Fatal) => BadgeStyle::High,
            None => BadgeStyle::Neutral,
        }
    }

    // Probability bars are styled by position, including positions past the
    // label set.
    pub fn for_bar(position: usize) -> Self {
        match position {
            0 => BadgeStyle::Low,
            1 => BadgeStyle::Medium,
            _ => BadgeStyle::High,
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            BadgeStyle::Low => "severity-badge severity-low",
            BadgeStyle::Medium => "severity-badge severity-medium",
            BadgeStyle::High => "severity-badge severity-high",
            BadgeStyle::Neutral => "severity-badge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AdvisoryTier {
    Low,
    Moderate,
    High,
}

impl AdvisoryTier {
    /// Unknown and out-of-range classes fall to `Low`, never to `High`.
    pub fn for_class(class: Option<SeverityClass>) -> Self {
        match class {
            Some(SeverityClass::Serious | SeverityClass::Fatal) => AdvisoryTier::High,
            Some(SeverityClass::Moderate) => AdvisoryTier::Moderate,
            Some(SeverityClass::Minor) | None => AdvisoryTier::Low,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AdvisoryTier::High => "⚠️ High Risk - Exercise Extreme Caution",
            AdvisoryTier::Moderate => "⚠️ Moderate Risk - Stay Alert",
            AdvisoryTier::Low => "✅ Low Risk - Conditions likely safe",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            AdvisoryTier::High => "🚨",
            AdvisoryTier::Moderate => "🚧",
            AdvisoryTier::Low => "✅",
        }
    }

    fn guidance(&self) -> &'static str {
        match self {
            AdvisoryTier::High => {
                "Avoid non-essential travel. If you must travel, drive very cautiously."
            }
            AdvisoryTier::Moderate => "Drive cautiously and keep safe distance.",
            AdvisoryTier::Low => "Normal caution is recommended.",
        }
    }

    pub fn tips(&self) -> &'static [&'static str] {
        match self {
            AdvisoryTier::High => &[
                "Avoid driving if possible",
                "Turn on headlights and reduce speed",
                "Increase following distance",
                "Allow extra time for your trip",
                "Call for assistance earlier for any problems",
            ],
            AdvisoryTier::Moderate => &[
                "Stay focused and avoid distractions",
                "Keep a safe distance",
                "Slow down around corners and intersections",
                "Watch for pedestrians and cyclists",
            ],
            AdvisoryTier::Low => &[
                "Maintain speed within limits",
                "Stay alert for hazards",
                "Keep regular vehicle maintenance",
            ],
        }
    }

    pub fn details(&self, label: SeverityLabel, percent: u8) -> String {
        format!(
            "Predicted: {} ({}%). {}",
            label.as_str(),
            percent,
            self.guidance()
        )
    }
}
