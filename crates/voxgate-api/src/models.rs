// SmartPlus cloud response types
//
// Models for the vendor's JSON payloads after envelope stripping. Fields use
// `#[serde(default)]` liberally because the cloud is inconsistent about
// field presence across app versions, and numeric fields sometimes arrive
// as strings. The lenient deserializers at the bottom absorb those
// differences.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Bootstrap / login ────────────────────────────────────────────────

/// Payload of the gateway `rest_server` bootstrap call.
#[derive(Debug, Clone, Deserialize)]
pub struct RestServerInfo {
    /// Tenant REST host in authority form (`host:port`).
    #[serde(default)]
    pub rest_server_https: Option<String>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload returned by both `sms_login` and `servers_list`.
///
/// Every field is optional: a response that omits one leaves the prior
/// session value untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInfo {
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// RTSP relay in `host:port` form; only the host part is used.
    #[serde(default)]
    pub rtmp_server: Option<String>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LoginInfo {
    /// The RTSP relay address with any `:port` suffix stripped.
    pub fn rtsp_relay_ip(&self) -> Option<&str> {
        self.rtmp_server
            .as_deref()
            .map(|s| s.split(':').next().unwrap_or(s))
    }
}

// ── Userconf (device topology) ───────────────────────────────────────

/// Payload of the tenant `userconf` call: household metadata plus the
/// device list.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConf {
    #[serde(default)]
    pub app_conf: Option<AppConf>,
    #[serde(default)]
    pub dev_list: Vec<DeviceRecord>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Household-level configuration block.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConf {
    #[serde(default)]
    pub project_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One intercom device from `dev_list`.
///
/// A device yields a camera only when `location`, `rtsp_pwd`, and `mac`
/// are all present; relays are listed regardless.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRecord {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub rtsp_pwd: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub relay: Vec<RelayRecord>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One relay entry inside a device record.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayRecord {
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub relay_id: String,
    #[serde(default)]
    pub door_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Temporary keys ───────────────────────────────────────────────────

/// One guest access key from `tempKey/getPersonalTempKeyList`.
#[derive(Debug, Clone, Deserialize)]
pub struct TempKeyRecord {
    #[serde(rename = "ID", default, deserialize_with = "de::lenient_string")]
    pub id: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "TmpKey", default)]
    pub tmp_key: String,
    #[serde(rename = "BeginTime", default)]
    pub begin_time: String,
    #[serde(rename = "EndTime", default)]
    pub end_time: String,
    #[serde(rename = "AccessTimes", default, deserialize_with = "de::lenient_i64")]
    pub access_times: i64,
    #[serde(rename = "AllowedTimes", default, deserialize_with = "de::lenient_i64")]
    pub allowed_times: i64,
    #[serde(rename = "EachAllowedTimes", default, deserialize_with = "de::lenient_i64")]
    pub each_allowed_times: i64,
    /// Path component only; the client prefixes the cluster host.
    #[serde(rename = "QrCodeUrl", default)]
    pub qr_code_url: String,
    /// Raw vendor flag, truthy in several shapes (bool/int/string).
    #[serde(rename = "Expired", default, deserialize_with = "de::truthy")]
    pub expired: bool,
    #[serde(rename = "Doors", default)]
    pub doors: Vec<TempKeyDoorRecord>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A door a temp key can open.
#[derive(Debug, Clone, Deserialize)]
pub struct TempKeyDoorRecord {
    #[serde(rename = "ID", default, deserialize_with = "de::lenient_string")]
    pub id: String,
    #[serde(rename = "KeyID", default, deserialize_with = "de::lenient_string")]
    pub key_id: String,
    #[serde(rename = "Relay", default, deserialize_with = "de::lenient_string")]
    pub relay: String,
    #[serde(rename = "MAC", default)]
    pub mac: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Door log ─────────────────────────────────────────────────────────

/// One personal door-log entry from `log/getDoorLog`.
///
/// This doubles as the event payload broadcast to embedders, so it
/// serializes back out with the vendor's field names and keeps unknown
/// fields verbatim in `extra`. `pic_url` distinguishes present-but-empty
/// (snapshot still uploading) from absent (event type without images);
/// the snapshot-deferral logic depends on that distinction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoorLogEntry {
    /// Identity/ordering key; compared as a string.
    #[serde(rename = "CaptureTime", default, deserialize_with = "de::lenient_string")]
    pub capture_time: String,
    #[serde(
        rename = "Initiator",
        default,
        deserialize_with = "de::lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub initiator: Option<String>,
    #[serde(
        rename = "CaptureType",
        default,
        deserialize_with = "de::lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub capture_type: Option<String>,
    #[serde(
        rename = "Location",
        default,
        deserialize_with = "de::lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub location: Option<String>,
    #[serde(
        rename = "MAC",
        default,
        deserialize_with = "de::lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub mac: Option<String>,
    #[serde(
        rename = "Relay",
        default,
        deserialize_with = "de::lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub relay: Option<String>,
    #[serde(rename = "PicUrl", default, skip_serializing_if = "Option::is_none")]
    pub pic_url: Option<String>,
    /// Catch-all for undocumented fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DoorLogEntry {
    /// Whether the entry carries a usable identity key.
    pub fn has_capture_time(&self) -> bool {
        !self.capture_time.is_empty()
    }

    /// Whether the picture URL field exists but is still empty, the
    /// "snapshot not uploaded yet" state.
    pub fn picture_pending(&self) -> bool {
        matches!(self.pic_url.as_deref(), Some(""))
    }
}

// ── Lenient deserializers ────────────────────────────────────────────

pub(crate) mod de {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn stringify(value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// String that may arrive as a number or bool; null/objects become "".
    pub fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(stringify(&value).unwrap_or_default())
    }

    /// Optional string that may arrive as a number or bool.
    pub fn lenient_opt_string<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<String>, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(stringify(&value))
    }

    /// Integer that may arrive as a string; anything unparseable is 0.
    pub fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(match value {
            Value::Number(n) => n.as_i64().unwrap_or(0),
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        })
    }

    /// Truthiness the way the vendor means it: false/0/""/null are false.
    pub fn truthy<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let value = Value::deserialize(d)?;
        Ok(match value {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f.abs() > f64::EPSILON),
            Value::String(s) => !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false"),
            Value::Null => false,
            _ => true,
        })
    }
}
