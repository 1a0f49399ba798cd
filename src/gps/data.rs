// src/gps/data.rs
//! Fix and snapshot data structures

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::net::SocketAddr;

/// Sentence kinds the relay understands, named by their NMEA type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FixKind {
    #[serde(rename = "GGA")]
    PositionFix,
    #[serde(rename = "RMC")]
    MinimalNav,
    #[serde(rename = "VTG")]
    CourseSpeedOverGround,
}

impl FixKind {
    /// Three-letter type code that follows the talker ID
    pub fn type_code(&self) -> &'static str {
        match self {
            FixKind::PositionFix => "GGA",
            FixKind::MinimalNav => "RMC",
            FixKind::CourseSpeedOverGround => "VTG",
        }
    }
}

impl fmt::Display for FixKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_code())
    }
}

/// A single sentence line as it came off the wire
#[derive(Debug, Clone)]
pub struct RawSentence {
    pub text: String,
    pub received_at: DateTime<Utc>,
    pub from: SocketAddr,
}

impl RawSentence {
    pub fn new(text: &str, from: SocketAddr) -> Self {
        Self {
            text: text.to_string(),
            received_at: Utc::now(),
            from,
        }
    }
}

/// GGA: Global Positioning System Fix Data
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFix {
    pub time: String,
    pub lat: f64,
    pub lon: f64,
    pub quality: Option<u8>,
    pub satellites: Option<u8>,
    pub altitude: f64,
}

/// RMC: Recommended Minimum Specific GNSS Data
#[derive(Debug, Clone, PartialEq)]
pub struct MinimalNav {
    pub time: String,
    pub status: String,
    pub lat: f64,
    pub lon: f64,
    /// Speed over ground in knots
    pub speed: f64,
    /// Course over ground in degrees
    pub course: f64,
    pub date: String,
}

/// VTG: Course Over Ground and Ground Speed. Values are not validated and
/// may be NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseSpeedOverGround {
    pub course_true: f64,
    pub speed_knots: f64,
    pub speed_kmh: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedFix {
    PositionFix(PositionFix),
    MinimalNav(MinimalNav),
    CourseSpeedOverGround(CourseSpeedOverGround),
}

impl ParsedFix {
    pub fn kind(&self) -> FixKind {
        match self {
            ParsedFix::PositionFix(_) => FixKind::PositionFix,
            ParsedFix::MinimalNav(_) => FixKind::MinimalNav,
            ParsedFix::CourseSpeedOverGround(_) => FixKind::CourseSpeedOverGround,
        }
    }

    /// Decoded position, for the kinds that carry one
    pub fn position(&self) -> Option<(f64, f64)> {
        match self {
            ParsedFix::PositionFix(fix) => Some((fix.lat, fix.lon)),
            ParsedFix::MinimalNav(fix) => Some((fix.lat, fix.lon)),
            ParsedFix::CourseSpeedOverGround(_) => None,
        }
    }
}

fn serialize_iso8601<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Cumulative best-known state of one vehicle source.
///
/// Kind-specific fields stay `None` until a fix carrying them is merged, and
/// are never cleared afterwards. Fields that are absent are omitted from the
/// JSON; non-finite floats and unparseable integers that were merged
/// serialize as `null`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSnapshot {
    /// Kind of the most recently merged sentence
    #[serde(rename = "type")]
    pub kind: FixKind,
    #[serde(serialize_with = "serialize_iso8601")]
    pub timestamp: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<Option<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satellites: Option<Option<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_true: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_knots: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_kmh: Option<f64>,

    pub raw: String,
    pub source: String,
    pub vehicle: String,
    #[serde(serialize_with = "serialize_iso8601")]
    pub received_at: DateTime<Utc>,
}

impl SourceSnapshot {
    /// Start an empty snapshot for a source; kind-specific fields are filled
    /// by [`SourceSnapshot::apply`].
    pub fn new(kind: FixKind, source: &str, vehicle: &str, raw: &str, at: DateTime<Utc>) -> Self {
        Self {
            kind,
            timestamp: at,
            time: None,
            date: None,
            lat: None,
            lon: None,
            quality: None,
            satellites: None,
            altitude: None,
            speed: None,
            course: None,
            status: None,
            course_true: None,
            speed_knots: None,
            speed_kmh: None,
            raw: raw.to_string(),
            source: source.to_string(),
            vehicle: vehicle.to_string(),
            received_at: at,
        }
    }

    /// Overwrite the fields `fix` carries, leaving every other field as is
    pub fn apply(&mut self, fix: &ParsedFix) {
        self.kind = fix.kind();
        match fix {
            ParsedFix::PositionFix(gga) => {
                self.time = Some(gga.time.clone());
                self.lat = Some(gga.lat);
                self.lon = Some(gga.lon);
                self.quality = Some(gga.quality);
                self.satellites = Some(gga.satellites);
                self.altitude = Some(gga.altitude);
            }
            ParsedFix::MinimalNav(rmc) => {
                self.time = Some(rmc.time.clone());
                self.date = Some(rmc.date.clone());
                self.status = Some(rmc.status.clone());
                self.lat = Some(rmc.lat);
                self.lon = Some(rmc.lon);
                self.speed = Some(rmc.speed);
                self.course = Some(rmc.course);
            }
            ParsedFix::CourseSpeedOverGround(vtg) => {
                self.course_true = Some(vtg.course_true);
                self.speed_knots = Some(vtg.speed_knots);
                self.speed_kmh = Some(vtg.speed_kmh);
            }
        }
    }

    pub fn has_position(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 23, 12, 35, 19).unwrap()
    }

    #[test]
    fn test_empty_snapshot_serialization() {
        let snapshot = SourceSnapshot::new(FixKind::CourseSpeedOverGround, "ship", "Falkor-too", "$GPVTG", at());
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["type"], "VTG");
        assert_eq!(json["timestamp"], "2024-03-23T12:35:19.000Z");
        assert_eq!(json["receivedAt"], "2024-03-23T12:35:19.000Z");
        assert_eq!(json["source"], "ship");
        assert_eq!(json["vehicle"], "Falkor-too");
        assert!(json.get("lat").is_none());
        assert!(json.get("courseTrue").is_none());
    }

    #[test]
    fn test_non_finite_values_serialize_as_null() {
        let mut snapshot = SourceSnapshot::new(FixKind::CourseSpeedOverGround, "rov", "ROV", "", at());
        snapshot.apply(&ParsedFix::CourseSpeedOverGround(CourseSpeedOverGround {
            course_true: f64::NAN,
            speed_knots: 5.5,
            speed_kmh: 10.2,
        }));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json["courseTrue"].is_null());
        assert!(json.as_object().unwrap().contains_key("courseTrue"));
        assert_eq!(json["speedKnots"], 5.5);
        assert_eq!(json["speedKmh"], 10.2);
    }

    #[test]
    fn test_unparseable_integer_fields_merge_as_null() {
        let mut snapshot = SourceSnapshot::new(FixKind::PositionFix, "ship", "Falkor-too", "", at());
        let mut fix = PositionFix {
            time: "123519".to_string(),
            lat: 48.1,
            lon: 11.5,
            quality: Some(1),
            satellites: Some(8),
            altitude: 545.4,
        };
        snapshot.apply(&ParsedFix::PositionFix(fix.clone()));

        fix.quality = None;
        fix.satellites = None;
        snapshot.apply(&ParsedFix::PositionFix(fix));

        assert_eq!(snapshot.quality, Some(None));
        assert_eq!(snapshot.satellites, Some(None));

        let json = serde_json::to_value(&snapshot).unwrap();
        let fields = json.as_object().unwrap();
        assert!(fields.contains_key("quality") && json["quality"].is_null());
        assert!(fields.contains_key("satellites") && json["satellites"].is_null());
        assert_eq!(json["altitude"], 545.4);
    }

    #[test]
    fn test_fix_kind_codes() {
        assert_eq!(FixKind::PositionFix.to_string(), "GGA");
        assert_eq!(FixKind::MinimalNav.type_code(), "RMC");
        assert_eq!(FixKind::CourseSpeedOverGround.type_code(), "VTG");
    }
}
