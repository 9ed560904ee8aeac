//! User profiles.

use crate::extract::{first_id, first_raw, first_text, first_timestamp, nested_text, text, Record};
use crate::normalize::UNKNOWN_USER;
use crate::{
    EntityField, FieldChange, FieldValue, ModelResult, MutationIntent, Normalize,
    NormalizeContext, Reconcilable,
};
use harvest_types::{EntityId, RawRecord, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const ID_KEYS: &[&str] = &["id", "_id", "uid", "userId", "user_id"];
const ENVELOPE_KEYS: &[&str] = &["profile", "user", "data"];
const NAME_KEYS: &[&str] = &["displayName", "display_name", "name", "username", "fullName"];
const BIO_KEYS: &[&str] = &["bio", "about", "description"];
const LOCATION_KEYS: &[&str] = &["location", "farmLocation", "farm_location", "address"];
const LOCATION_PART_KEYS: &[&str] = &["city", "region", "state", "country"];
const AVATAR_KEYS: &[&str] = &[
    "avatarUrl",
    "avatar_url",
    "photoURL",
    "photoUrl",
    "profilePicture",
    "profileImage",
    "avatar",
    "image",
];
const UPDATED_KEYS: &[&str] = &["updatedAt", "updated_at", "createdAt", "created_at"];

/// The signed-in user's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: EntityId,
    pub display_name: String,
    pub bio: String,
    pub location: String,
    /// Empty when the user has no avatar.
    pub avatar_url: String,
    pub updated_at: Timestamp,
}

/// Editable fields of a [`UserProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileField {
    DisplayName,
    Bio,
    Location,
    AvatarUrl,
}

impl EntityField for ProfileField {
    fn as_str(&self) -> &'static str {
        match self {
            Self::DisplayName => "displayName",
            Self::Bio => "bio",
            Self::Location => "location",
            Self::AvatarUrl => "avatarUrl",
        }
    }
}

impl UserProfile {
    /// Intent that saves a set of profile edits in one remote call.
    pub fn edit(
        &self,
        edits: impl IntoIterator<Item = (ProfileField, String)>,
    ) -> MutationIntent<Self> {
        let changes = edits
            .into_iter()
            .map(|(field, value)| FieldChange::new(field, FieldValue::Text(value)))
            .collect();
        MutationIntent::new(self.id.clone(), "update_profile", changes)
    }
}

impl Reconcilable for UserProfile {
    type Field = ProfileField;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn field(&self, field: ProfileField) -> FieldValue {
        let value = match field {
            ProfileField::DisplayName => &self.display_name,
            ProfileField::Bio => &self.bio,
            ProfileField::Location => &self.location,
            ProfileField::AvatarUrl => &self.avatar_url,
        };
        FieldValue::Text(value.clone())
    }

    fn set_field(&mut self, field: ProfileField, value: FieldValue) -> ModelResult<()> {
        let value = value.into_text(field.as_str())?;
        match field {
            ProfileField::DisplayName => self.display_name = value,
            ProfileField::Bio => self.bio = value,
            ProfileField::Location => self.location = value,
            ProfileField::AvatarUrl => self.avatar_url = value,
        }
        Ok(())
    }
}

impl Normalize for UserProfile {
    fn normalize_with(raw: &RawRecord, _ctx: &NormalizeContext) -> Option<Self> {
        let record = unwrap_envelope(raw.as_object()?);

        let display_name = display_name(record);
        let avatar_url = avatar_url(record);
        let id = first_id(record, ID_KEYS)
            .and_then(|id| EntityId::new(id).ok())
            .unwrap_or_else(|| {
                let key = format!(
                    "profile\u{1f}{display_name}\u{1f}{}",
                    first_raw(record, &["email", "phone", "username"])
                );
                EntityId::derived(&key)
            });

        Some(Self {
            id,
            display_name,
            bio: first_text(record, BIO_KEYS).unwrap_or_default(),
            location: location(record),
            avatar_url,
            updated_at: first_timestamp(record, UPDATED_KEYS),
        })
    }
}

/// Profile endpoints sometimes wrap the user under `profile`/`user`/`data`.
/// Only descend when the outer record has no id of its own.
fn unwrap_envelope(record: &Record) -> &Record {
    if first_id(record, ID_KEYS).is_some() {
        return record;
    }
    ENVELOPE_KEYS
        .iter()
        .find_map(|key| record.get(*key).and_then(Value::as_object))
        .unwrap_or(record)
}

fn display_name(record: &Record) -> String {
    if let Some(name) = first_text(record, NAME_KEYS) {
        return name;
    }
    let first = record.get("firstName").and_then(text);
    let last = record.get("lastName").and_then(text);
    match (first, last) {
        (Some(f), Some(l)) => format!("{f} {l}"),
        (Some(name), None) | (None, Some(name)) => name.to_string(),
        (None, None) => UNKNOWN_USER.to_string(),
    }
}

fn location(record: &Record) -> String {
    for key in LOCATION_KEYS {
        match record.get(*key) {
            Some(value @ Value::String(_)) => {
                if let Some(s) = text(value) {
                    return s.to_string();
                }
            }
            Some(Value::Object(parts)) => {
                let joined: Vec<&str> = LOCATION_PART_KEYS
                    .iter()
                    .filter_map(|part| parts.get(*part).and_then(text))
                    .collect();
                if !joined.is_empty() {
                    return joined.join(", ");
                }
            }
            _ => {}
        }
    }
    String::new()
}

fn avatar_url(record: &Record) -> String {
    AVATAR_KEYS
        .iter()
        .find_map(|key| match record.get(*key)? {
            value @ Value::String(_) => text(value).map(str::to_string),
            Value::Object(_) => nested_text(record, *key, &["url", "uri", "secure_url"]),
            _ => None,
        })
        .unwrap_or_default()
}
