//! Notification preferences.

use crate::extract::{first_flag, first_id, Record};
use crate::{
    EntityField, FieldChange, FieldValue, ModelResult, MutationIntent, Normalize,
    NormalizeContext, Reconcilable,
};
use harvest_types::{EntityId, RawRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const USER_ID_KEYS: &[&str] = &["userId", "user_id", "uid", "id", "_id"];
const NESTED_KEYS: &[&str] = &["preferences", "settings", "notifications"];

/// Key under which preferences without any owner id are stored.
const ANONYMOUS_PREFERENCES_KEY: &str = "notification-preferences";

/// One notification toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreferenceFlag {
    PostLikes,
    PostComments,
    WeatherAlerts,
    MarketUpdates,
    DeviceAlerts,
}

impl PreferenceFlag {
    pub const ALL: [Self; 5] = [
        Self::PostLikes,
        Self::PostComments,
        Self::WeatherAlerts,
        Self::MarketUpdates,
        Self::DeviceAlerts,
    ];

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::PostLikes => &["postLikes", "post_likes", "likes"],
            Self::PostComments => &["postComments", "post_comments", "comments"],
            Self::WeatherAlerts => &["weatherAlerts", "weather_alerts", "weather"],
            Self::MarketUpdates => &["marketUpdates", "market_updates", "market", "priceAlerts"],
            Self::DeviceAlerts => &["deviceAlerts", "device_alerts", "iotAlerts", "iot"],
        }
    }
}

impl EntityField for PreferenceFlag {
    fn as_str(&self) -> &'static str {
        self.aliases()[0]
    }
}

/// Per-user notification settings. Every toggle defaults to on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPreferences {
    pub user_id: EntityId,
    pub post_likes: bool,
    pub post_comments: bool,
    pub weather_alerts: bool,
    pub market_updates: bool,
    pub device_alerts: bool,
}

impl NotificationPreferences {
    /// All notifications enabled.
    pub fn enabled(user_id: EntityId) -> Self {
        Self {
            user_id,
            post_likes: true,
            post_comments: true,
            weather_alerts: true,
            market_updates: true,
            device_alerts: true,
        }
    }

    pub fn get(&self, flag: PreferenceFlag) -> bool {
        match flag {
            PreferenceFlag::PostLikes => self.post_likes,
            PreferenceFlag::PostComments => self.post_comments,
            PreferenceFlag::WeatherAlerts => self.weather_alerts,
            PreferenceFlag::MarketUpdates => self.market_updates,
            PreferenceFlag::DeviceAlerts => self.device_alerts,
        }
    }

    fn slot(&mut self, flag: PreferenceFlag) -> &mut bool {
        match flag {
            PreferenceFlag::PostLikes => &mut self.post_likes,
            PreferenceFlag::PostComments => &mut self.post_comments,
            PreferenceFlag::WeatherAlerts => &mut self.weather_alerts,
            PreferenceFlag::MarketUpdates => &mut self.market_updates,
            PreferenceFlag::DeviceAlerts => &mut self.device_alerts,
        }
    }

    /// Intent that flips one toggle.
    pub fn toggle(&self, flag: PreferenceFlag) -> MutationIntent<Self> {
        MutationIntent::new(
            self.user_id.clone(),
            "update_preferences",
            vec![FieldChange::new(flag, FieldValue::Bool(!self.get(flag)))],
        )
    }
}

impl Reconcilable for NotificationPreferences {
    type Field = PreferenceFlag;

    fn id(&self) -> &EntityId {
        &self.user_id
    }

    fn field(&self, field: PreferenceFlag) -> FieldValue {
        FieldValue::Bool(self.get(field))
    }

    fn set_field(&mut self, field: PreferenceFlag, value: FieldValue) -> ModelResult<()> {
        *self.slot(field) = value.into_bool(field.as_str())?;
        Ok(())
    }
}

impl Normalize for NotificationPreferences {
    fn normalize_with(raw: &RawRecord, ctx: &NormalizeContext) -> Option<Self> {
        let record = raw.as_object()?;

        let user_id = first_id(record, USER_ID_KEYS)
            .or_else(|| ctx.current_user_id.clone())
            .and_then(|id| EntityId::new(id).ok())
            .unwrap_or_else(|| EntityId::derived(ANONYMOUS_PREFERENCES_KEY));

        let mut prefs = Self::enabled(user_id);
        let flags = flag_source(record);
        for flag in PreferenceFlag::ALL {
            // Nested settings win; flat keys on the outer record are the fallback.
            let value = first_flag(flags, flag.aliases())
                .or_else(|| first_flag(record, flag.aliases()))
                .unwrap_or(true);
            *prefs.slot(flag) = value;
        }
        Some(prefs)
    }
}

fn flag_source(record: &Record) -> &Record {
    NESTED_KEYS
        .iter()
        .find_map(|key| record.get(*key).and_then(Value::as_object))
        .unwrap_or(record)
}
