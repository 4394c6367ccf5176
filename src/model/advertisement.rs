//! Advertisement value type.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// How an ad creative is sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdKind {
    /// Resolved through a VAST ad server at play time.
    Vast,
    /// A fixed creative fetched directly from `request_url`.
    Static,
}

/// A scheduled advertisement slot.
///
/// Owned by whichever channel's or program's provider data embeds it; the
/// timestamps are absolute UTC milliseconds on the same timeline as the
/// owning program. Ordering is by `(start, stop)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Advertisement {
    start_utc_ms: i64,
    stop_utc_ms: i64,
    kind: AdKind,
    request_url: String,
}

impl Advertisement {
    /// Create an advertisement. Fails if `stop` precedes `start`.
    pub fn new(
        start_utc_ms: i64,
        stop_utc_ms: i64,
        kind: AdKind,
        request_url: impl Into<String>,
    ) -> Result<Self, ModelError> {
        if stop_utc_ms < start_utc_ms {
            return Err(ModelError::AdStopBeforeStart {
                start: start_utc_ms,
                stop: stop_utc_ms,
            });
        }
        Ok(Self {
            start_utc_ms,
            stop_utc_ms,
            kind,
            request_url: request_url.into(),
        })
    }

    pub fn start_utc_ms(&self) -> i64 {
        self.start_utc_ms
    }

    pub fn stop_utc_ms(&self) -> i64 {
        self.stop_utc_ms
    }

    pub fn kind(&self) -> AdKind {
        self.kind
    }

    pub fn request_url(&self) -> &str {
        &self.request_url
    }

    pub fn duration_ms(&self) -> i64 {
        self.stop_utc_ms - self.start_utc_ms
    }

    /// Copy with both timestamps moved by `delta_ms`.
    ///
    /// Used when a repeated program instance is re-anchored: its ads must
    /// shift by exactly the same delta as the program window.
    pub fn shifted_by(&self, delta_ms: i64) -> Self {
        Self {
            start_utc_ms: self.start_utc_ms + delta_ms,
            stop_utc_ms: self.stop_utc_ms + delta_ms,
            kind: self.kind,
            request_url: self.request_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ad(start: i64, stop: i64) -> Advertisement {
        Advertisement::new(start, stop, AdKind::Static, "https://ads.example.com/a").unwrap()
    }

    #[test]
    fn rejects_inverted_interval() {
        let result = Advertisement::new(100, 50, AdKind::Vast, "https://ads.example.com/a");
        assert_eq!(
            result,
            Err(ModelError::AdStopBeforeStart {
                start: 100,
                stop: 50
            })
        );
    }

    #[test]
    fn zero_length_interval_allowed() {
        assert!(Advertisement::new(100, 100, AdKind::Vast, "u").is_ok());
    }

    #[test]
    fn ordered_by_start_then_stop() {
        let mut ads = vec![ad(50, 60), ad(10, 40), ad(10, 20)];
        ads.sort();
        assert_eq!(ads[0], ad(10, 20));
        assert_eq!(ads[1], ad(10, 40));
        assert_eq!(ads[2], ad(50, 60));
    }

    #[test]
    fn shifted_by_moves_both_endpoints() {
        let shifted = ad(1_000, 4_000).shifted_by(500_000);
        assert_eq!(shifted.start_utc_ms(), 501_000);
        assert_eq!(shifted.stop_utc_ms(), 504_000);
        assert_eq!(shifted.duration_ms(), 3_000);
    }
}
