//! Form state for one user and the submit lifecycle around it.

use chrono::{Local, Timelike};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info};

use crate::gateway::PredictionBackend;
use crate::normalizer::{normalize, SeverityViewModel};
use crate::types::{ConditionRequest, Weather, HOUR_RANGE, VISIBILITY_RANGE};

pub const DEFAULT_VISIBILITY: f64 = 10.0;

/// A raw control event: the control's name plus what the widget reports.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlInput {
    /// Slider or number box; the value arrives as text.
    Numeric(String),
    Checkbox(bool),
    /// Radio or text value.
    Choice(String),
}

impl ConditionRequest {
    /// Defaults shown when the form opens, with `hour` taken from the local clock.
    pub fn defaults_at(hour: u8) -> Self {
        Self {
            hour: hour.min(HOUR_RANGE.1),
            visibility: DEFAULT_VISIBILITY,
            weather: Weather::Clear,
            rush_hour: false,
        }
    }
}

/// Builds a [`ConditionRequest`] from control changes. Never fails: input it
/// cannot use leaves the form unchanged, and numbers are held to their range.
#[derive(Debug, Clone)]
pub struct ConditionCollector {
    form: ConditionRequest,
    clock: fn() -> u8,
}

fn local_hour() -> u8 {
    Local::now().hour() as u8
}

impl Default for ConditionCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ConditionCollector {
    pub fn new() -> Self {
        Self::with_clock(local_hour)
    }

    pub fn with_clock(clock: fn() -> u8) -> Self {
        Self {
            form: ConditionRequest::defaults_at(clock()),
            clock,
        }
    }

    pub fn form(&self) -> ConditionRequest {
        self.form
    }

    /// Applies one control change. Only the named field is touched.
    pub fn handle_change(&mut self, name: &str, input: ControlInput) {
        match (name, input) {
            ("hour", ControlInput::Numeric(v)) => {
                if let Some(h) = parse_number(&v) {
                    self.form.hour = h.round().clamp(HOUR_RANGE.0 as f64, HOUR_RANGE.1 as f64) as u8;
                }
            }
            ("visibility", ControlInput::Numeric(v)) => {
                if let Some(vis) = parse_number(&v) {
                    self.form.visibility = vis.clamp(VISIBILITY_RANGE.0, VISIBILITY_RANGE.1);
                }
            }
            ("weather", ControlInput::Choice(v)) => {
                if let Some(w) = Weather::parse(&v) {
                    self.form.weather = w;
                }
            }
            ("rush_hour", ControlInput::Checkbox(checked)) => {
                self.form.rush_hour = checked;
            }
            (name, input) => debug!("ignoring control change {}={:?}", name, input),
        }
    }

    pub fn reset(&mut self) {
        self.form = ConditionRequest::defaults_at((self.clock)());
    }
}

fn parse_number(v: &str) -> Option<f64> {
    v.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Completed(SeverityViewModel),
    /// A previous submission is still outstanding.
    Rejected,
}

/// One form plus its latest result. At most one prediction is in flight.
pub struct PredictionSession {
    collector: Mutex<ConditionCollector>,
    result: Mutex<Option<SeverityViewModel>>,
    in_flight: AtomicBool,
    // Bumped by every reset; a submit only stores its result if no reset
    // happened while it was outstanding.
    generation: AtomicU64,
}

impl Default for PredictionSession {
    fn default() -> Self {
        Self::new(ConditionCollector::new())
    }
}

impl PredictionSession {
    pub fn new(collector: ConditionCollector) -> Self {
        Self {
            collector: Mutex::new(collector),
            result: Mutex::new(None),
            in_flight: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub fn handle_change(&self, name: &str, input: ControlInput) {
        self.collector.lock().handle_change(name, input);
    }

    pub fn form(&self) -> ConditionRequest {
        self.collector.lock().form()
    }

    pub fn result(&self) -> Option<SeverityViewModel> {
        self.result.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Restores the defaults and drops the last result, including one still
    /// in flight.
    pub fn reset(&self) {
        let mut result = self.result.lock();
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.collector.lock().reset();
        *result = None;
    }

    /// Sends the current form through `backend` and stores the projected
    /// result. Returns `Rejected` without contacting the backend when a
    /// submission is already outstanding.
    pub async fn submit(&self, backend: &dyn PredictionBackend) -> Submission {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("submit ignored: prediction already in flight");
            return Submission::Rejected;
        }
        let _guard = InFlight(&self.in_flight);

        let generation = self.generation.load(Ordering::Acquire);
        *self.result.lock() = None;
        let request = self.form();
        info!(
            "submitting hour={} visibility={:.1} weather={} rush_hour={}",
            request.hour,
            request.visibility,
            request.weather.as_str(),
            u8::from(request.rush_hour)
        );

        let outcome = backend.predict(&request).await;
        let vm = normalize(&outcome);
        let mut result = self.result.lock();
        if self.generation.load(Ordering::Acquire) == generation {
            *result = Some(vm.clone());
        } else {
            debug!("form reset while in flight; result discarded");
        }
        Submission::Completed(vm)
    }
}

// Clears the in-flight flag even if the submitting future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
