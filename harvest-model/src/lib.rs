//! Domain entities and payload normalization.
//!
//! Defines the typed side of the boundary between the remote service and the
//! UI:
//! - [`Reconcilable`]: an entity whose fields can be read, written and
//!   restored by the optimistic mutation controller
//! - [`FieldValue`] / [`FieldChange`]: the typed values those fields carry
//! - [`MutationIntent`]: a user action expressed as field changes plus the
//!   remote operation that confirms it
//! - [`Normalize`]: total conversion of an untyped [`RawRecord`] into an
//!   entity, never failing for malformed data
//! - [`FeedPost`], [`UserProfile`], [`NotificationPreferences`]: the entities
//!   behind the community feed, profile and notification settings screens
//!
//! [`RawRecord`]: harvest_types::RawRecord

mod entity;
mod error;
mod extract;
mod intent;
mod normalize;
mod post;
mod preferences;
mod profile;

pub use entity::{EntityField, FieldChange, FieldValue, Reconcilable};
pub use error::{ModelError, ModelResult};
pub use intent::MutationIntent;
pub use normalize::{
    normalize, normalize_batch, records_from_response, Normalize, NormalizeContext,
    UNKNOWN_AUTHOR_ID, UNKNOWN_USER,
};
pub use post::{FeedPost, PostField};
pub use preferences::{NotificationPreferences, PreferenceFlag};
pub use profile::{ProfileField, UserProfile};
