use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::DomainError;

/// Sentinel the catalog returns in place of rows when nothing matched.
pub const NO_DRIVERS_MARKER: &str = "NoDriversFound";

/// Dotted driver version, compared numerically component by component.
///
/// Missing trailing components count as zero, so `1.2` equals `1.2.0.0`.
/// A component that is not a number sorts after every numeric one and
/// compares lexically against other non-numeric components.
#[derive(Debug, Clone)]
pub struct DriverVersion {
    raw: String,
    parts: Vec<Component>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Component {
    Number(u64),
    Text(String),
}

impl DriverVersion {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let parts = raw
            .split('.')
            .filter(|p| !p.is_empty())
            .map(|p| match p.parse::<u64>() {
                Ok(n) => Component::Number(n),
                Err(_) => Component::Text(p.to_ascii_lowercase()),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            parts,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl Ord for DriverVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let zero = Component::Number(0);
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).unwrap_or(&zero);
            let b = other.parts.get(i).unwrap_or(&zero);
            match a.cmp(b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for DriverVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for DriverVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DriverVersion {}

impl std::fmt::Display for DriverVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for DriverVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for DriverVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(DriverVersion::parse(&raw))
    }
}

/// Driver date as published in the INF `DriverVer` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DriverDate(pub NaiveDate);

impl DriverDate {
    /// Accepts ISO dates, RFC 3339 timestamps, `YYYY-MM-DDTHH:MM:SS`,
    /// `MM/DD/YYYY` and WMI/DMTF `YYYYMMDDHHMMSS.ffffff+zzz`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(Self(date));
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self(ts.date_naive()));
        }
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(Self(ts.date()));
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%m/%d/%Y") {
            return Some(Self(date));
        }
        if raw.len() >= 8 && raw.as_bytes()[..8].iter().all(u8::is_ascii_digit) {
            if let Ok(date) = NaiveDate::parse_from_str(&raw[..8], "%Y%m%d") {
                return Some(Self(date));
            }
        }
        None
    }
}

impl std::fmt::Display for DriverDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl Serialize for DriverDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DriverDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DriverDate::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognized driver date '{}'", raw)))
    }
}

/// One row of the catalog's match response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchRow {
    Item { ci_id: i64, hardware_id: String },
    Marker(String),
}

/// A catalog item matched for a local hardware id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedItem {
    pub ci_id: i64,
    pub hardware_id: String,
}

/// Interpret the match response. Empty and sentinel-led responses both
/// mean "no drivers"; markers elsewhere are ignored.
pub fn interpret_match_rows(rows: Vec<MatchRow>) -> Vec<MatchedItem> {
    match rows.first() {
        None => return Vec::new(),
        Some(MatchRow::Marker(m)) if m.trim().eq_ignore_ascii_case(NO_DRIVERS_MARKER) => {
            return Vec::new()
        }
        _ => {}
    }
    rows.into_iter()
        .filter_map(|row| match row {
            MatchRow::Item { ci_id, hardware_id } => Some(MatchedItem { ci_id, hardware_id }),
            MatchRow::Marker(_) => None,
        })
        .collect()
}

/// Distinct catalog item ids, ascending.
pub fn distinct_ci_ids(items: &[MatchedItem]) -> Vec<i64> {
    items
        .iter()
        .map(|i| i.ci_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Driver record as delivered by the catalog, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawDriverRecord {
    #[serde(alias = "CI_ID")]
    pub ci_id: Option<i64>,
    #[serde(alias = "DriverType")]
    pub driver_type: Option<String>,
    #[serde(alias = "DriverINFFile")]
    pub inf_file: Option<String>,
    #[serde(alias = "DriverDate")]
    pub date: Option<String>,
    #[serde(alias = "DriverVersion")]
    pub version: Option<String>,
    #[serde(alias = "DriverClass")]
    pub class: Option<String>,
    #[serde(alias = "DriverProvider")]
    pub provider: Option<String>,
    #[serde(alias = "DriverSigned")]
    pub signed: Option<bool>,
    #[serde(alias = "DriverBootCritical")]
    pub boot_critical: Option<bool>,
}

/// One candidate driver version returned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDriver {
    pub ci_id: i64,
    pub driver_type: Option<String>,
    pub inf_file: String,
    pub date: Option<DriverDate>,
    pub version: DriverVersion,
    pub class: String,
    pub provider: String,
    pub signed: bool,
    pub boot_critical: bool,
    /// Local hardware ids the catalog matched this item for.
    #[serde(default)]
    pub hardware_ids: Vec<String>,
}

fn required(value: Option<String>, field: &str, ci_id: Option<i64>) -> Result<String, DomainError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(DomainError::DataShape(match ci_id {
            Some(id) => format!("driver record {} has no {}", id, field),
            None => format!("driver record has no {}", field),
        })),
    }
}

impl TryFrom<RawDriverRecord> for CandidateDriver {
    type Error = DomainError;

    fn try_from(raw: RawDriverRecord) -> Result<Self, Self::Error> {
        let ci_id = raw
            .ci_id
            .ok_or_else(|| DomainError::DataShape("driver record has no ci_id".to_string()))?;
        let inf_file = required(raw.inf_file, "inf_file", Some(ci_id))?;
        let version = required(raw.version, "version", Some(ci_id))?;
        let class = required(raw.class, "class", Some(ci_id))?;
        let provider = required(raw.provider, "provider", Some(ci_id))?;
        let date = match raw.date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) => Some(DriverDate::parse(text).ok_or_else(|| {
                DomainError::DataShape(format!("driver record {} has unparseable date '{}'", ci_id, text))
            })?),
        };

        Ok(Self {
            ci_id,
            driver_type: raw.driver_type.filter(|t| !t.trim().is_empty()),
            inf_file,
            date,
            version: DriverVersion::parse(&version),
            class,
            provider,
            signed: raw.signed.unwrap_or(false),
            boot_critical: raw.boot_critical.unwrap_or(false),
            hardware_ids: Vec::new(),
        })
    }
}

impl CandidateDriver {
    /// The logical driver this row is a version of.
    pub fn key(&self) -> DriverKey {
        DriverKey {
            inf_file: self.inf_file.to_ascii_lowercase(),
            class: self.class.to_ascii_lowercase(),
            provider: self.provider.to_ascii_lowercase(),
        }
    }
}

/// (INF file, class, provider) triple identifying a logical driver group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriverKey {
    pub inf_file: String,
    pub class: String,
    pub provider: String,
}

/// Validate raw records and attach the hardware ids each item matched.
pub fn into_candidates(
    records: Vec<RawDriverRecord>,
    matches: &[MatchedItem],
) -> Result<Vec<CandidateDriver>, DomainError> {
    records
        .into_iter()
        .map(|raw| {
            let mut candidate = CandidateDriver::try_from(raw)?;
            for item in matches.iter().filter(|m| m.ci_id == candidate.ci_id) {
                if !candidate
                    .hardware_ids
                    .iter()
                    .any(|h| h.eq_ignore_ascii_case(&item.hardware_id))
                {
                    candidate.hardware_ids.push(item.hardware_id.clone());
                }
            }
            Ok(candidate)
        })
        .collect()
}
