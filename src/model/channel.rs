//! Channel and recording value types.

use serde::{Deserialize, Serialize};

use crate::model::ProviderData;

/// Coarse service classification. Absent on feed-supplied channels; the
/// sync orchestrator fills in the default before persisting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    AudioVideo,
    Audio,
    Other,
}

/// A channel as described by the feed or persisted in the store.
///
/// `original_network_id` is the stable identity used to match channels
/// across re-syncs; store row ids are assigned by the store and live on
/// [`StoredChannel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    original_network_id: i32,
    display_number: String,
    display_name: String,
    input_id: Option<String>,
    service_kind: Option<ServiceKind>,
    provider_data: ProviderData,
}

impl Channel {
    pub fn new(
        original_network_id: i32,
        display_number: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            original_network_id,
            display_number: display_number.into(),
            display_name: display_name.into(),
            input_id: None,
            service_kind: None,
            provider_data: ProviderData::default(),
        }
    }

    pub fn original_network_id(&self) -> i32 {
        self.original_network_id
    }

    pub fn display_number(&self) -> &str {
        &self.display_number
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn input_id(&self) -> Option<&str> {
        self.input_id.as_deref()
    }

    pub fn service_kind(&self) -> Option<ServiceKind> {
        self.service_kind
    }

    pub fn provider_data(&self) -> &ProviderData {
        &self.provider_data
    }

    pub fn with_input_id(mut self, input_id: impl Into<String>) -> Self {
        self.input_id = Some(input_id.into());
        self
    }

    pub fn with_service_kind(mut self, kind: ServiceKind) -> Self {
        self.service_kind = Some(kind);
        self
    }

    pub fn with_provider_data(mut self, provider_data: ProviderData) -> Self {
        self.provider_data = provider_data;
        self
    }

    /// Copy with defaults filled for required-but-absent fields, as applied
    /// by the sync orchestrator before persisting.
    pub fn with_sync_defaults(mut self, input_id: &str) -> Self {
        if self.input_id.is_none() {
            self.input_id = Some(input_id.to_string());
        }
        if self.service_kind.is_none() {
            self.service_kind = Some(ServiceKind::AudioVideo);
        }
        self
    }
}

/// A channel row as persisted: store-assigned id plus the value.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredChannel {
    pub id: i64,
    pub channel: Channel,
}

impl StoredChannel {
    pub fn new(id: i64, channel: Channel) -> Self {
        Self { id, channel }
    }
}

/// A completed recording, played back via the same session machinery as
/// live content. `recording_start_ms` anchors time-shift seeks: an absolute
/// seek target translates to `target - recording_start_ms` in player time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedProgram {
    pub channel_id: i64,
    pub title: String,
    pub recording_start_ms: i64,
    pub duration_ms: i64,
    pub provider_data: ProviderData,
}
