// ── Domain model ─────────────────────────────────────────────────────
//
// Normalized records built from vendor payloads by `convert`. Device
// lists are rebuilt wholesale on every refresh, never merged
// incrementally, so a record never outlives the fetch that produced
// it. The list types serialize with these exact field names into the
// persistent store.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Vendor timestamp format on temporary keys, zoneless.
const KEY_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A door camera with a ready-to-use RTSP URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Camera {
    /// Trimmed device location, used as the display name.
    pub name: String,
    /// `rtsp://ak:{password}@{relay_ip}:554/{mac}`.
    pub video_url: String,
}

/// One controllable relay on an intercom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorRelay {
    /// Trimmed location of the intercom that owns the relay.
    pub name: String,
    /// Trimmed relay display name.
    pub door_name: String,
    pub relay_id: String,
    pub mac: String,
}

/// A guest access key (PIN and QR code) with usage limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporaryKey {
    pub key_id: String,
    pub description: String,
    /// The PIN itself.
    pub key_code: String,
    /// Validity window start, `YYYY-MM-DD HH:MM:SS`.
    pub begin_time: String,
    /// Validity window end, same format.
    pub end_time: String,
    pub access_times: i64,
    pub allowed_times: i64,
    pub each_allowed_times: i64,
    /// Fully-qualified QR image URL on the regional cloud host.
    pub qr_code_url: String,
    /// Negation of the vendor's truthy `Expired` flag, with no clock
    /// math applied. Can disagree with
    /// [`is_active_at`](Self::is_active_at), which checks the clock
    /// instead; both are kept on purpose.
    pub expired: bool,
    /// Doors this key opens.
    pub doors: Vec<KeyDoor>,
}

/// One door a temporary key can open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDoor {
    pub door_id: String,
    /// Back-reference to the owning key.
    pub key_id: String,
    pub relay: String,
    pub mac: String,
}

impl TemporaryKey {
    /// Whether `now` falls inside the key's validity window, bounds
    /// inclusive. An unparsable begin or end time counts as inactive.
    pub fn is_active_at(&self, now: NaiveDateTime) -> bool {
        let begin = NaiveDateTime::parse_from_str(&self.begin_time, KEY_TIME_FORMAT);
        let end = NaiveDateTime::parse_from_str(&self.end_time, KEY_TIME_FORMAT);
        matches!((begin, end), (Ok(begin), Ok(end)) if begin <= now && now <= end)
    }
}

/// Everything parsed from one device-config and temp-key refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceTopology {
    /// Trimmed project name from `app_conf`, empty when the cloud
    /// sends none. Used as the account display title.
    pub project_name: String,
    pub cameras: Vec<Camera>,
    pub door_relays: Vec<DoorRelay>,
    pub temporary_keys: Vec<TemporaryKey>,
}

/// Denormalized account state embedders read at startup, exactly as
/// persisted in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub host: String,
    pub token: String,
    pub auth_token: String,
    pub camera_data: Vec<Camera>,
    pub door_relay_data: Vec<DoorRelay>,
    pub door_keys_data: Vec<TemporaryKey>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(begin: &str, end: &str) -> TemporaryKey {
        TemporaryKey {
            key_id: "1".to_owned(),
            description: "Guest".to_owned(),
            key_code: "1234".to_owned(),
            begin_time: begin.to_owned(),
            end_time: end.to_owned(),
            access_times: 0,
            allowed_times: 1,
            each_allowed_times: 1,
            qr_code_url: String::new(),
            expired: false,
            doors: Vec::new(),
        }
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, KEY_TIME_FORMAT).expect("valid test timestamp")
    }

    #[test]
    fn key_active_inside_window() {
        let key = key("2024-05-01 00:00:00", "2024-05-02 00:00:00");
        assert!(key.is_active_at(at("2024-05-01 12:00:00")));
        assert!(key.is_active_at(at("2024-05-01 00:00:00")));
        assert!(key.is_active_at(at("2024-05-02 00:00:00")));
    }

    #[test]
    fn key_inactive_outside_window() {
        let key = key("2024-05-01 00:00:00", "2024-05-02 00:00:00");
        assert!(!key.is_active_at(at("2024-04-30 23:59:59")));
        assert!(!key.is_active_at(at("2024-05-02 00:00:01")));
    }

    #[test]
    fn unparsable_window_means_inactive() {
        let key = key("soon", "later");
        assert!(!key.is_active_at(at("2024-05-01 12:00:00")));
    }

    #[test]
    fn vendor_expired_flag_is_independent_of_the_clock() {
        let mut key = key("2024-05-01 00:00:00", "2024-05-02 00:00:00");
        key.expired = true;
        // The flag mirrors the payload; the clock check does not read it.
        assert!(key.is_active_at(at("2024-05-01 12:00:00")));
    }
}
