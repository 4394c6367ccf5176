//! Value types for the scheduling engine: advertisements, programs,
//! channels, recordings and the provider-data payload attached to each.
//!
//! All of these are immutable records — "modification" derives a new value
//! through the `with_*` helpers. Store row ids live on the `Stored*`
//! wrappers, never inside the values themselves, so structural equality
//! stays independent of where a row happens to be persisted.

pub mod advertisement;
pub mod channel;
pub mod program;
pub mod provider_data;

pub use advertisement::{AdKind, Advertisement};
pub use channel::{Channel, RecordedProgram, ServiceKind, StoredChannel};
pub use program::{ContentRating, Program, StoredProgram};
pub use provider_data::{ProviderData, VideoKind, VideoLocator};
