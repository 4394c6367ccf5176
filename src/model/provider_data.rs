//! Provider-data payload.
//!
//! An extensible blob attached to channels, programs and recordings carrying
//! video-source info, the repeat flag, the ad schedule and free-form custom
//! keys. It round-trips through canonical JSON at the store boundary;
//! internal logic only ever touches the typed accessors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderDataError;
use crate::model::Advertisement;

/// Container format of a video source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoKind {
    Hls,
    Dash,
    Mp4,
    MpegTs,
}

/// An opaque pointer to playable media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoLocator {
    pub kind: VideoKind,
    pub url: String,
}

impl VideoLocator {
    pub fn new(kind: VideoKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
        }
    }
}

/// App-specific payload embedded in a channel, program or recording.
///
/// Equality is structural and independent of the key order of the custom
/// map (`BTreeMap` compares by content). The ad list is kept sorted so two
/// payloads built in different insertion orders still compare equal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderData {
    #[serde(skip_serializing_if = "Option::is_none")]
    video: Option<VideoLocator>,
    repeatable: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ads: Vec<Advertisement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recording_start_ms: Option<i64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    custom: BTreeMap<String, serde_json::Value>,
}

impl ProviderData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn video(&self) -> Option<&VideoLocator> {
        self.video.as_ref()
    }

    pub fn with_video(mut self, video: VideoLocator) -> Self {
        self.video = Some(video);
        self
    }

    /// Whether the owning channel's program list loops as one repeating cycle.
    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    pub fn with_repeatable(mut self, repeatable: bool) -> Self {
        self.repeatable = repeatable;
        self
    }

    /// Ad schedule, ordered by `(start, stop)`.
    pub fn ads(&self) -> &[Advertisement] {
        &self.ads
    }

    /// Insert an ad, keeping the list ordered.
    pub fn with_ad(mut self, ad: Advertisement) -> Self {
        let at = self.ads.partition_point(|existing| *existing <= ad);
        self.ads.insert(at, ad);
        self
    }

    /// Copy with every ad shifted by `delta_ms`. Relative order is preserved
    /// because all entries move by the same amount.
    pub fn with_ads_shifted_by(mut self, delta_ms: i64) -> Self {
        self.ads = self.ads.iter().map(|ad| ad.shifted_by(delta_ms)).collect();
        self
    }

    /// UTC start of the recording this payload belongs to, if any.
    pub fn recording_start_ms(&self) -> Option<i64> {
        self.recording_start_ms
    }

    pub fn with_recording_start_ms(mut self, start_ms: i64) -> Self {
        self.recording_start_ms = Some(start_ms);
        self
    }

    /// Store a free-form custom value under `key`.
    pub fn put_custom<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), ProviderDataError> {
        let value = serde_json::to_value(value)?;
        self.custom.insert(key.into(), value);
        Ok(())
    }

    /// Read back a custom value. `Ok(None)` when the key is absent; a typed
    /// error when the stored value does not decode as `T`.
    pub fn get_custom<T: for<'de> Deserialize<'de>>(
        &self,
        key: &str,
    ) -> Result<Option<T>, ProviderDataError> {
        match self.custom.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Serialize to the canonical textual form stored alongside the row.
    pub fn to_json(&self) -> Result<String, ProviderDataError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse the canonical textual form.
    pub fn from_json(payload: &str) -> Result<Self, ProviderDataError> {
        Ok(serde_json::from_str(payload)?)
    }

    /// Parse, degrading a malformed payload to the empty default.
    ///
    /// This is the store-boundary behavior: a corrupt blob must not take the
    /// whole row down with it.
    pub fn from_json_or_default(payload: &str) -> Self {
        match Self::from_json(payload) {
            Ok(data) => data,
            Err(e) => {
                debug!("Malformed provider data, using defaults: {}", e);
                Self::default()
            }
        }
    }
}
