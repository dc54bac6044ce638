use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Scope;

/// A learned `(trigger -> action)` skill derived from successful episodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Procedure {
    pub id: Uuid,
    pub scope: Scope,
    pub trigger_pattern: String,
    pub trigger_keywords: Vec<String>,
    pub trigger_embedding: Option<Vec<f32>>,
    pub action_template: String,
    pub action_type: String,
    pub use_count: u32,
    pub success_count: u32,
    pub failure_count: u32,
    pub confidence: f64,
    pub memory_strength: f32,
    pub last_used_at: Option<DateTime<Utc>>,
    pub last_verified_at: Option<DateTime<Utc>>,
    pub derived_from_episodes: Vec<Uuid>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Procedure {
    pub fn new(
        scope: Scope,
        trigger_pattern: String,
        trigger_keywords: Vec<String>,
        action_template: String,
        action_type: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            scope,
            trigger_pattern,
            trigger_keywords,
            trigger_embedding: None,
            action_template,
            action_type,
            use_count: 0,
            success_count: 0,
            failure_count: 0,
            confidence: 0.5,
            memory_strength: 1.0,
            last_used_at: None,
            last_verified_at: Some(now),
            derived_from_episodes: Vec::new(),
            archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// `success / use`, or `0.0` if never used — spec §3 invariant.
    pub fn success_rate(&self) -> f64 {
        if self.use_count == 0 {
            0.0
        } else {
            self.success_count as f64 / self.use_count as f64
        }
    }

    /// Archive condition from spec §3: `use_count > 5 AND success_rate < 0.2`.
    pub fn should_archive(&self) -> bool {
        self.use_count > 5 && self.success_rate() < 0.2
    }

    /// Record one use and keep `use_count = success_count + failure_count`.
    pub fn record_use(&mut self, succeeded: bool) {
        if succeeded {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        self.use_count = self.success_count + self.failure_count;
        self.last_used_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }
}
