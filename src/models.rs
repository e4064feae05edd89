use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::parse_timestamp;

/// Raw `{ key: label }` object as sent by the backend inside a profile.
/// `serde_json` is built with `preserve_order`, so backend insertion order
/// survives deserialization and defines the default column order.
pub type LabelMap = Map<String, Value>;

/// Ordered mapping from an internal data key (`field1`, `config1`, ...) to
/// its human-readable label. Drives column derivation in the data table and
/// series derivation in the graphs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap(Vec<(String, String)>);

impl FieldMap {
    /// Entries with a null or non-string label are dropped.
    pub fn from_labels(labels: Option<&LabelMap>) -> Self {
        let pairs = labels
            .map(|map| {
                map.iter()
                    .filter_map(|(key, value)| {
                        value.as_str().map(|label| (key.clone(), label.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self(pairs)
    }

    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, l)| (k.as_str(), l.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One sensor/config/metadata row. The set of dynamic keys is defined by the
/// owning profile, not by this type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataEntry {
    #[serde(rename = "entryID", default)]
    pub entry_id: i64,
    #[serde(default)]
    pub created_at: String,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl DataEntry {
    /// Present, non-null value for a dynamic key.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|v| !v.is_null())
    }

    pub fn display(&self, key: &str) -> Option<String> {
        self.value(key).map(value_to_string)
    }

    pub fn numeric(&self, key: &str) -> Option<f64> {
        match self.value(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(rename = "deviceID")]
    pub device_id: i64,
    #[serde(rename = "networkID", default)]
    pub network_id: Option<String>,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub profile_name: Option<String>,
    #[serde(rename = "currentFirmwareVersion", default)]
    pub current_firmware_version: Option<String>,
    #[serde(rename = "previousFirmwareVersion", default)]
    pub previous_firmware_version: Option<String>,
    #[serde(rename = "targetFirmwareVersion", default)]
    pub target_firmware_version: Option<String>,
    #[serde(rename = "firmwareDownloadState", default)]
    pub firmware_download_state: Option<String>,
    #[serde(default)]
    pub readkey: Option<String>,
    #[serde(default)]
    pub writekey: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_posted_time: Option<String>,
}

impl Device {
    pub fn is_online(&self, now: DateTime<Utc>) -> bool {
        is_online(self.last_posted_time.as_deref(), now)
    }
}

/// A device is online iff it posted within the last three hours. Derived on
/// every render, never stored.
pub fn is_online(last_posted_time: Option<&str>, now: DateTime<Utc>) -> bool {
    match last_posted_time.and_then(parse_timestamp) {
        Some(ts) => now.signed_duration_since(ts) < Duration::hours(3),
        None => false,
    }
}

pub fn format_last_active(last_posted_time: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(ts) = last_posted_time.and_then(parse_timestamp) else {
        return "Never".to_string();
    };
    let diff = now.signed_duration_since(ts);
    if diff.num_minutes() < 60 {
        format!("{} min ago", diff.num_minutes().max(0))
    } else if diff.num_hours() < 24 {
        format!("{} hours ago", diff.num_hours())
    } else {
        format!("{} days ago", diff.num_days())
    }
}

/// Lifecycle classification of a firmware build. Used for sorting and
/// badging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareType {
    Stable,
    Beta,
    Legacy,
    Deprecated,
    Unknown,
}

impl FirmwareType {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.to_ascii_lowercase()).as_deref() {
            Some("stable") => Self::Stable,
            Some("beta") => Self::Beta,
            Some("legacy") => Self::Legacy,
            Some("deprecated") => Self::Deprecated,
            _ => Self::Unknown,
        }
    }

    /// Display ordering, stable releases first.
    pub fn priority(self) -> u8 {
        match self {
            Self::Stable => 1,
            Self::Beta => 2,
            Self::Legacy => 3,
            Self::Deprecated => 4,
            Self::Unknown => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Stable => "Stable",
            Self::Beta => "Beta",
            Self::Legacy => "Legacy",
            Self::Deprecated => "Deprecated",
            Self::Unknown => "Unknown",
        }
    }

    pub fn badge_class(self) -> &'static str {
        match self {
            Self::Stable => "badge badge-stable",
            Self::Beta => "badge badge-beta",
            Self::Legacy => "badge badge-legacy",
            Self::Deprecated => "badge badge-deprecated",
            Self::Unknown => "badge",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FirmwareVersion {
    pub id: String,
    #[serde(default)]
    pub organisation_id: Option<String>,
    pub firmware_version: String,
    #[serde(default)]
    pub firmware_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub change1: Option<String>,
    #[serde(default)]
    pub change2: Option<String>,
    #[serde(default)]
    pub change3: Option<String>,
    #[serde(default)]
    pub change4: Option<String>,
    #[serde(default)]
    pub change5: Option<String>,
    #[serde(default)]
    pub change6: Option<String>,
    #[serde(default)]
    pub change7: Option<String>,
    #[serde(default)]
    pub change8: Option<String>,
    #[serde(default)]
    pub change9: Option<String>,
    #[serde(default)]
    pub change10: Option<String>,
    #[serde(default)]
    pub firmware_string: Option<String>,
    #[serde(default)]
    pub firmware_string_hex: Option<String>,
    #[serde(default)]
    pub firmware_string_bootloader: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl FirmwareVersion {
    pub fn kind(&self) -> FirmwareType {
        FirmwareType::parse(self.firmware_type.as_deref())
    }

    /// Non-empty changelog lines in order.
    pub fn changelog(&self) -> Vec<&str> {
        [
            &self.change1,
            &self.change2,
            &self.change3,
            &self.change4,
            &self.change5,
            &self.change6,
            &self.change7,
            &self.change8,
            &self.change9,
            &self.change10,
        ]
        .into_iter()
        .filter_map(|c| c.as_deref())
        .filter(|c| !c.trim().is_empty())
        .collect()
    }

    fn created_millis(&self) -> i64 {
        self.created_at
            .as_deref()
            .and_then(parse_timestamp)
            .map(|ts| ts.timestamp_millis())
            .unwrap_or(0)
    }
}

/// Type priority first (stable, beta, legacy, deprecated, unknown), then
/// creation time descending within a type.
pub fn sort_firmware_for_display(versions: &mut [FirmwareVersion]) {
    versions.sort_by(|a, b| {
        a.kind()
            .priority()
            .cmp(&b.kind().priority())
            .then_with(|| b.created_millis().cmp(&a.created_millis()))
    });
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Option<LabelMap>,
    #[serde(default)]
    pub configs: Option<LabelMap>,
    #[serde(default)]
    pub metadata: Option<LabelMap>,
    #[serde(default)]
    pub organisation_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Computed server-side, read-only here.
    #[serde(default)]
    pub device_count: Option<i64>,
    /// Populated on the single-profile endpoint only.
    #[serde(default)]
    pub devices: Vec<ProfileDevice>,
}

impl Profile {
    pub fn field_map(&self) -> FieldMap {
        FieldMap::from_labels(self.fields.as_ref())
    }

    pub fn config_map(&self) -> FieldMap {
        FieldMap::from_labels(self.configs.as_ref())
    }

    pub fn metadata_map(&self) -> FieldMap {
        FieldMap::from_labels(self.metadata.as_ref())
    }
}

/// Device as embedded in the single-profile payload. The id is the string
/// form here, unlike the numeric `deviceID` on the device list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProfileDevice {
    pub name: String,
    #[serde(rename = "deviceID")]
    pub device_id: String,
    #[serde(default)]
    pub recent_config: Option<Map<String, Value>>,
}

impl ProfileDevice {
    /// Last reported value for a config key, if the device has one.
    pub fn config_value(&self, key: &str) -> Option<String> {
        self.recent_config
            .as_ref()
            .and_then(|map| map.get(key))
            .filter(|v| !v.is_null())
            .map(value_to_string)
    }
}

/// Profile as embedded in the device detail payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeviceProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Option<LabelMap>,
    #[serde(default)]
    pub configs: Option<LabelMap>,
    #[serde(default)]
    pub metadata: Option<LabelMap>,
}

impl DeviceProfile {
    pub fn field_map(&self) -> FieldMap {
        FieldMap::from_labels(self.fields.as_ref())
    }

    pub fn config_map(&self) -> FieldMap {
        FieldMap::from_labels(self.configs.as_ref())
    }

    pub fn metadata_map(&self) -> FieldMap {
        FieldMap::from_labels(self.metadata.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeviceDetail {
    pub name: String,
    #[serde(rename = "deviceID")]
    pub device_id: i64,
    #[serde(rename = "networkID", default)]
    pub network_id: Option<String>,
    #[serde(default)]
    pub readkey: String,
    #[serde(default)]
    pub writekey: String,
    #[serde(rename = "currentFirmwareVersion", default)]
    pub current_firmware_version: Option<String>,
    #[serde(rename = "targetFirmwareVersion", default)]
    pub target_firmware_version: Option<String>,
    #[serde(rename = "previousFirmwareVersion", default)]
    pub previous_firmware_version: Option<String>,
    #[serde(default)]
    pub device_data: Vec<DataEntry>,
    #[serde(default)]
    pub config_data: Vec<DataEntry>,
    #[serde(default)]
    pub meta_data: Vec<DataEntry>,
    #[serde(default)]
    pub profile: DeviceProfile,
}

impl DeviceDetail {
    /// A firmware update is pending while the target differs from what the
    /// device last reported.
    pub fn pending_firmware(&self) -> Option<&str> {
        match (&self.target_firmware_version, &self.current_firmware_version) {
            (Some(target), Some(current)) if target != current => Some(target),
            (Some(target), None) => Some(target),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Organisation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserAccount {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    pub email: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub organisations: Vec<Organisation>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    pub token: String,
}

/// Generic `{ "message": ... }` acknowledgement returned by mutations.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageResponse {
    #[serde(default, alias = "detail")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewDevice {
    pub name: String,
    #[serde(rename = "networkID")]
    pub network_id: Option<String>,
    pub profile: String,
    #[serde(rename = "currentFirmwareVersion")]
    pub current_firmware_version: Option<String>,
    #[serde(rename = "previousFirmwareVersion")]
    pub previous_firmware_version: Option<String>,
    #[serde(rename = "targetFirmwareVersion")]
    pub target_firmware_version: Option<String>,
    #[serde(rename = "fileDownloadState")]
    pub file_download_state: bool,
    #[serde(rename = "firmwareDownloadState")]
    pub firmware_download_state: String,
}

impl NewDevice {
    pub fn new(name: String, network_id: Option<String>, profile: String,
               current_firmware_version: Option<String>) -> Self {
        Self {
            name,
            network_id,
            profile,
            current_firmware_version,
            previous_firmware_version: None,
            target_firmware_version: None,
            file_download_state: false,
            firmware_download_state: "updated".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirmwareUpdateRequest {
    #[serde(rename = "firmwareID")]
    pub firmware_id: String,
    #[serde(rename = "firmwareVersion")]
    pub firmware_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigUpdate {
    #[serde(rename = "deviceID")]
    pub device_id: i64,
    pub configs: std::collections::HashMap<String, String>,
}

/// One configuration change applied to many devices at once. Blank values
/// mean "keep the current value" and are never sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MassConfigUpdate {
    pub device_ids: Vec<String>,
    pub config_values: std::collections::HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MassEditReport {
    #[serde(default)]
    pub results: MassEditResults,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MassEditResults {
    #[serde(default)]
    pub success: Vec<String>,
    #[serde(default)]
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewProfile {
    pub name: String,
    pub description: Option<String>,
    pub fields: LabelMap,
    pub configs: LabelMap,
    pub metadata: LabelMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organisation_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewOrganisation {
    pub name: String,
    pub description: String,
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn ts(hours_ago: i64, minutes_ago: i64) -> String {
        (now() - Duration::hours(hours_ago) - Duration::minutes(minutes_ago)).to_rfc3339()
    }

    #[test]
    fn device_online_within_three_hours() {
        assert!(is_online(Some(ts(2, 59).as_str()), now()));
        assert!(!is_online(Some(ts(3, 1).as_str()), now()));
    }

    #[test]
    fn device_offline_without_last_posted_time() {
        assert!(!is_online(None, now()));
        assert!(!is_online(Some("garbage"), now()));
    }

    #[test]
    fn last_active_granularity() {
        assert_eq!(format_last_active(None, now()), "Never");
        assert_eq!(format_last_active(Some(ts(0, 5).as_str()), now()), "5 min ago");
        assert_eq!(format_last_active(Some(ts(5, 0).as_str()), now()), "5 hours ago");
        assert_eq!(format_last_active(Some(ts(49, 0).as_str()), now()), "2 days ago");
    }

    fn fw(id: &str, ty: Option<&str>, created_hours_ago: i64) -> FirmwareVersion {
        FirmwareVersion {
            id: id.to_string(),
            organisation_id: None,
            firmware_version: format!("v-{id}"),
            firmware_type: ty.map(str::to_string),
            description: None,
            change1: None,
            change2: None,
            change3: None,
            change4: None,
            change5: None,
            change6: None,
            change7: None,
            change8: None,
            change9: None,
            change10: None,
            firmware_string: None,
            firmware_string_hex: None,
            firmware_string_bootloader: None,
            created_at: Some(ts(created_hours_ago, 0)),
            updated_at: None,
        }
    }

    #[test]
    fn firmware_sorted_by_type_priority() {
        let mut versions = vec![
            fw("a", Some("deprecated"), 1),
            fw("b", Some("stable"), 1),
            fw("c", Some("beta"), 1),
            fw("d", Some("legacy"), 1),
            fw("e", None, 1),
        ];
        sort_firmware_for_display(&mut versions);
        let order: Vec<_> = versions.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(order, ["b", "c", "d", "a", "e"]);
    }

    #[test]
    fn firmware_ties_break_by_recency() {
        let mut versions = vec![
            fw("old", Some("stable"), 48),
            fw("new", Some("stable"), 1),
        ];
        sort_firmware_for_display(&mut versions);
        assert_eq!(versions[0].id, "new");
    }

    #[test]
    fn unknown_firmware_type_sorts_last() {
        assert_eq!(FirmwareType::parse(Some("experimental")), FirmwareType::Unknown);
        assert_eq!(FirmwareType::parse(Some("STABLE")), FirmwareType::Stable);
        assert_eq!(FirmwareType::Unknown.priority(), 5);
    }

    #[test]
    fn changelog_skips_blank_lines() {
        let mut version = fw("a", Some("stable"), 1);
        version.change1 = Some("first".to_string());
        version.change2 = Some("  ".to_string());
        version.change4 = Some("fourth".to_string());
        assert_eq!(version.changelog(), vec!["first", "fourth"]);
    }

    #[test]
    fn field_map_preserves_order_and_drops_nulls() {
        let entry: DataEntry = serde_json::from_str(
            r#"{"entryID": 7, "created_at": "2024-05-01T10:00:00Z", "field1": "21.5", "field2": null}"#,
        )
        .unwrap();
        assert_eq!(entry.entry_id, 7);
        assert_eq!(entry.display("field1").as_deref(), Some("21.5"));
        assert_eq!(entry.display("field2"), None);
        assert_eq!(entry.numeric("field1"), Some(21.5));

        let labels: LabelMap = serde_json::from_str(
            r#"{"field2": "Humidity", "field1": "Temperature", "field3": null}"#,
        )
        .unwrap();
        let map = FieldMap::from_labels(Some(&labels));
        let keys: Vec<_> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["field2", "field1"]);
    }

    #[test]
    fn pending_firmware_only_when_target_differs() {
        let detail = |current: Option<&str>, target: Option<&str>| DeviceDetail {
            name: "dev".into(),
            device_id: 1,
            network_id: None,
            readkey: String::new(),
            writekey: String::new(),
            current_firmware_version: current.map(str::to_string),
            target_firmware_version: target.map(str::to_string),
            previous_firmware_version: None,
            device_data: vec![],
            config_data: vec![],
            meta_data: vec![],
            profile: DeviceProfile::default(),
        };
        assert_eq!(detail(Some("1.0"), Some("1.1")).pending_firmware(), Some("1.1"));
        assert_eq!(detail(Some("1.0"), Some("1.0")).pending_firmware(), None);
        assert_eq!(detail(None, Some("1.1")).pending_firmware(), Some("1.1"));
        assert_eq!(detail(Some("1.0"), None).pending_firmware(), None);
    }
}
