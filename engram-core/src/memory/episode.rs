use chrono::{DateTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Scope;

/// Monotone lifecycle of an episode through the consolidation pipeline
/// (spec §3: `raw -> processed -> abstracted -> archived`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationStatus {
    Raw,
    Processed,
    Abstracted,
    Archived,
}

impl ConsolidationStatus {
    /// Whether `self -> next` is a legal forward transition.
    pub fn can_transition_to(self, next: ConsolidationStatus) -> bool {
        use ConsolidationStatus::*;
        matches!(
            (self, next),
            (Raw, Processed) | (Processed, Abstracted) | (Abstracted, Archived)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Unknown,
    Success,
    Failure,
    Neutral,
}

impl Outcome {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unknown" => Some(Outcome::Unknown),
            "success" => Some(Outcome::Success),
            "failure" => Some(Outcome::Failure),
            "neutral" => Some(Outcome::Neutral),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// Bucket a timestamp's local hour into a time-of-day label, per
    /// spec §4.4: morning(5-11), afternoon(12-16), evening(17-20), night.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl From<Weekday> for DayOfWeek {
    fn from(w: Weekday) -> Self {
        match w {
            Weekday::Mon => DayOfWeek::Mon,
            Weekday::Tue => DayOfWeek::Tue,
            Weekday::Wed => DayOfWeek::Wed,
            Weekday::Thu => DayOfWeek::Thu,
            Weekday::Fri => DayOfWeek::Fri,
            Weekday::Sat => DayOfWeek::Sat,
            Weekday::Sun => DayOfWeek::Sun,
        }
    }
}

/// A timestamped raw event with optional extracted structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: Uuid,
    pub scope: Scope,
    pub raw_content: String,
    pub conversation_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub embedding: Option<Vec<f32>>,
    pub entities: Vec<String>,
    pub topics: Vec<String>,
    pub causal_links: Vec<Uuid>,
    pub emotional_valence: f32,
    pub emotional_intensity: f32,
    pub importance_score: f32,
    pub outcome: Outcome,
    pub consolidation_status: ConsolidationStatus,
    pub memory_strength: f32,
    pub access_count: u32,
    pub derived_semantic_ids: Vec<Uuid>,
    pub derived_procedural_ids: Vec<Uuid>,
    pub time_of_day: TimeOfDay,
    pub day_of_week: DayOfWeek,
    pub created_at: DateTime<Utc>,
}

impl Episode {
    pub fn new(scope: Scope, raw_content: String, occurred_at: Option<DateTime<Utc>>) -> Self {
        let occurred_at = occurred_at.unwrap_or_else(Utc::now);
        Self {
            id: Uuid::new_v4(),
            scope,
            raw_content,
            conversation_id: None,
            occurred_at,
            embedding: None,
            entities: Vec::new(),
            topics: Vec::new(),
            causal_links: Vec::new(),
            emotional_valence: 0.0,
            emotional_intensity: 0.0,
            importance_score: 0.5,
            outcome: Outcome::Unknown,
            consolidation_status: ConsolidationStatus::Raw,
            memory_strength: 1.0,
            access_count: 1,
            derived_semantic_ids: Vec::new(),
            derived_procedural_ids: Vec::new(),
            time_of_day: TimeOfDay::from_hour(occurred_at.hour()),
            day_of_week: occurred_at.weekday().into(),
            created_at: Utc::now(),
        }
    }

    /// Decay rate used by `apply_decay` for episodes (spec §4.4 default).
    pub const DEFAULT_DECAY_RATE: f32 = 0.1;
}
