//! Program value type.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::model::ProviderData;

/// A content-rating label, opaque to the engine.
///
/// The engine never interprets rating strings — it only asks the host's
/// rating policy whether one is blocked, and tracks which ones a session has
/// explicitly unblocked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentRating(String);

impl ContentRating {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One program slot on a channel's schedule.
///
/// Immutable; the interval is half-open `[start, end)` and always non-empty.
/// Equality is structural over every field — the reconciliation engine uses
/// it to detect "nothing changed".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    channel_id: Option<i64>,
    title: String,
    description: String,
    start_utc_ms: i64,
    end_utc_ms: i64,
    content_ratings: Vec<ContentRating>,
    provider_data: ProviderData,
}

impl Program {
    /// Create a program. Fails unless `start < end`.
    pub fn new(
        title: impl Into<String>,
        start_utc_ms: i64,
        end_utc_ms: i64,
    ) -> Result<Self, ModelError> {
        if start_utc_ms >= end_utc_ms {
            return Err(ModelError::EmptyProgramWindow {
                start: start_utc_ms,
                end: end_utc_ms,
            });
        }
        Ok(Self {
            channel_id: None,
            title: title.into(),
            description: String::new(),
            start_utc_ms,
            end_utc_ms,
            content_ratings: Vec::new(),
            provider_data: ProviderData::default(),
        })
    }

    pub fn channel_id(&self) -> Option<i64> {
        self.channel_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn start_utc_ms(&self) -> i64 {
        self.start_utc_ms
    }

    pub fn end_utc_ms(&self) -> i64 {
        self.end_utc_ms
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_utc_ms - self.start_utc_ms
    }

    pub fn content_ratings(&self) -> &[ContentRating] {
        &self.content_ratings
    }

    pub fn provider_data(&self) -> &ProviderData {
        &self.provider_data
    }

    pub fn with_channel(mut self, channel_id: i64) -> Self {
        self.channel_id = Some(channel_id);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_content_ratings(mut self, ratings: Vec<ContentRating>) -> Self {
        self.content_ratings = ratings;
        self
    }

    pub fn with_provider_data(mut self, provider_data: ProviderData) -> Self {
        self.provider_data = provider_data;
        self
    }

    /// Copy re-anchored so the window starts at `new_start_ms`.
    ///
    /// Duration is preserved and every embedded ad shifts by the same delta
    /// as the window, keeping ads aligned with their program instance.
    pub fn shifted_to(&self, new_start_ms: i64) -> Self {
        let delta = new_start_ms - self.start_utc_ms;
        Self {
            channel_id: self.channel_id,
            title: self.title.clone(),
            description: self.description.clone(),
            start_utc_ms: new_start_ms,
            end_utc_ms: self.end_utc_ms + delta,
            content_ratings: self.content_ratings.clone(),
            provider_data: self.provider_data.clone().with_ads_shifted_by(delta),
        }
    }

    /// Half-open overlap test against `[window_start, window_end)`.
    pub fn overlaps_window(&self, window_start: i64, window_end: i64) -> bool {
        self.start_utc_ms < window_end && self.end_utc_ms > window_start
    }
}

/// A program row as persisted: store-assigned id plus the value.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProgram {
    pub id: i64,
    pub program: Program,
}

impl StoredProgram {
    pub fn new(id: i64, program: Program) -> Self {
        Self { id, program }
    }
}
