// src/gps/nmea.rs
//! NMEA sentence parsing

use super::coordinate;
use super::data::{CourseSpeedOverGround, MinimalNav, ParsedFix, PositionFix};
use std::fmt;

/// Marker every sentence line starts with
pub const START_MARKER: char = '$';

/// Why a sentence produced no fix. None of these are fatal: the line is
/// skipped and nothing is merged or broadcast.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Type code is not GGA, RMC or VTG
    UnsupportedType(String),
    /// RMC status flag other than `A`
    InvalidStatus(String),
    /// Latitude or longitude did not decode to a finite value
    InvalidPosition,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnsupportedType(head) => write!(f, "unsupported sentence type '{}'", head),
            SkipReason::InvalidStatus(status) => write!(f, "status '{}' is not valid", status),
            SkipReason::InvalidPosition => write!(f, "position did not decode"),
        }
    }
}

/// Parse a single NMEA sentence into a fix.
///
/// The sentence type is taken from the suffix of the first field, so any
/// talker ID is accepted (`$GPGGA`, `$GNGGA`, `$INGGA`, ...). A trailing
/// `*hh` checksum is stripped but not verified.
pub fn parse_sentence(line: &str) -> Result<ParsedFix, SkipReason> {
    let body = strip_checksum(line.trim());
    let parts: Vec<&str> = body.split(',').collect();
    let head = parts[0];

    if head.ends_with("GGA") {
        parse_gga(&parts)
    } else if head.ends_with("RMC") {
        parse_rmc(&parts)
    } else if head.ends_with("VTG") {
        Ok(parse_vtg(&parts))
    } else {
        Err(SkipReason::UnsupportedType(head.to_string()))
    }
}

/// Parse GGA (Global Positioning System Fix Data)
fn parse_gga(parts: &[&str]) -> Result<ParsedFix, SkipReason> {
    let lat = coordinate::decode(field(parts, 2), field(parts, 3));
    let lon = coordinate::decode(field(parts, 4), field(parts, 5));

    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(ParsedFix::PositionFix(PositionFix {
            time: field(parts, 1).to_string(),
            lat,
            lon,
            quality: field(parts, 6).parse().ok(),
            satellites: field(parts, 7).parse().ok(),
            altitude: float_field(parts, 9),
        })),
        _ => Err(SkipReason::InvalidPosition),
    }
}

/// Parse RMC (Recommended Minimum Specific GNSS Data)
fn parse_rmc(parts: &[&str]) -> Result<ParsedFix, SkipReason> {
    let status = field(parts, 2);
    if status != "A" {
        return Err(SkipReason::InvalidStatus(status.to_string()));
    }

    let lat = coordinate::decode(field(parts, 3), field(parts, 4));
    let lon = coordinate::decode(field(parts, 5), field(parts, 6));

    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(ParsedFix::MinimalNav(MinimalNav {
            time: field(parts, 1).to_string(),
            status: status.to_string(),
            lat,
            lon,
            speed: float_field(parts, 7),
            course: float_field(parts, 8),
            date: field(parts, 9).to_string(),
        })),
        _ => Err(SkipReason::InvalidPosition),
    }
}

/// Parse VTG (Course Over Ground and Ground Speed). No validity guard:
/// missing or garbled values come through as NaN.
fn parse_vtg(parts: &[&str]) -> ParsedFix {
    ParsedFix::CourseSpeedOverGround(CourseSpeedOverGround {
        course_true: float_field(parts, 1),
        speed_knots: float_field(parts, 5),
        speed_kmh: float_field(parts, 7),
    })
}

fn field<'a>(parts: &[&'a str], index: usize) -> &'a str {
    parts.get(index).copied().unwrap_or("").trim()
}

fn float_field(parts: &[&str], index: usize) -> f64 {
    field(parts, index).parse::<f64>().unwrap_or(f64::NAN)
}

fn strip_checksum(line: &str) -> &str {
    match line.rfind('*') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// XOR checksum over the characters between `$` and `*`
pub fn checksum(body: &str) -> u8 {
    body.trim_start_matches(START_MARKER)
        .bytes()
        .fold(0u8, |acc, b| acc ^ b)
}

/// Build a complete sentence line (`$<body>*HH`) from its body
pub fn build_sentence(body: &str) -> String {
    let body = body.trim_start_matches(START_MARKER);
    format!("{}{}*{:02X}", START_MARKER, body, checksum(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::coordinate::{encode, Axis};
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_gga_parsing() {
        let gga = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";

        match parse_sentence(gga).unwrap() {
            ParsedFix::PositionFix(fix) => {
                assert_eq!(fix.time, "123519");
                assert_approx_eq!(fix.lat, 48.1173, 1e-4);
                assert_approx_eq!(fix.lon, 11.5167, 1e-4);
                assert_eq!(fix.quality, Some(1));
                assert_eq!(fix.satellites, Some(8));
                assert_eq!(fix.altitude, 545.4);
            }
            other => panic!("expected GGA, got {:?}", other),
        }
    }

    #[test]
    fn test_gga_with_checksum_and_other_talker() {
        let gga = "$GNGGA,000001,5345.300,S,06154.300,W,2,12,0.8,-3.5,M,,M,,*5C";

        let fix = parse_sentence(gga).unwrap();
        let (lat, lon) = fix.position().unwrap();
        assert_approx_eq!(lat, -53.755, 1e-6);
        assert_approx_eq!(lon, -61.905, 1e-6);
        match fix {
            ParsedFix::PositionFix(gga) => {
                assert_eq!(gga.quality, Some(2));
                assert_eq!(gga.altitude, -3.5);
            }
            other => panic!("expected GGA, got {:?}", other),
        }
    }

    #[test]
    fn test_gga_without_position_is_skipped() {
        let gga = "$GPGGA,123519,,,,,0,00,,,M,,M,,*66";
        assert_eq!(parse_sentence(gga), Err(SkipReason::InvalidPosition));
    }

    #[test]
    fn test_rmc_parsing() {
        let rmc = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

        match parse_sentence(rmc).unwrap() {
            ParsedFix::MinimalNav(fix) => {
                assert_eq!(fix.time, "123519");
                assert_eq!(fix.status, "A");
                assert_eq!(fix.date, "230394");
                assert_eq!(fix.speed, 22.4);
                assert_eq!(fix.course, 84.4);
                assert_approx_eq!(fix.lat, 48.1173, 1e-4);
            }
            other => panic!("expected RMC, got {:?}", other),
        }
    }

    #[test]
    fn test_rmc_void_status_is_skipped() {
        for status in ["V", "", "a"] {
            let rmc = format!(
                "$GPRMC,123519,{},4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W",
                status
            );
            assert_eq!(
                parse_sentence(&rmc),
                Err(SkipReason::InvalidStatus(status.to_string()))
            );
        }
    }

    #[test]
    fn test_vtg_parsing() {
        let vtg = "$GPVTG,054.7,T,034.4,M,005.5,N,010.2,K*48";

        match parse_sentence(vtg).unwrap() {
            ParsedFix::CourseSpeedOverGround(fix) => {
                assert_eq!(fix.course_true, 54.7);
                assert_eq!(fix.speed_knots, 5.5);
                assert_eq!(fix.speed_kmh, 10.2);
            }
            other => panic!("expected VTG, got {:?}", other),
        }
    }

    #[test]
    fn test_vtg_garbage_still_emitted() {
        match parse_sentence("$GPVTG,,T,,M").unwrap() {
            ParsedFix::CourseSpeedOverGround(fix) => {
                assert!(fix.course_true.is_nan());
                assert!(fix.speed_knots.is_nan());
                assert!(fix.speed_kmh.is_nan());
            }
            other => panic!("expected VTG, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_sentence() {
        assert_eq!(
            parse_sentence("$GPXXX,garbage"),
            Err(SkipReason::UnsupportedType("$GPXXX".to_string()))
        );
        assert!(parse_sentence("$GPGSV,3,1,12,01,40,083,46").is_err());
    }

    #[test]
    fn test_checksum_matches_reference() {
        let body = "GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,";
        assert_eq!(checksum(body), 0x47);
        assert_eq!(
            build_sentence(body),
            format!("${}*47", body)
        );
    }

    #[test]
    fn test_encoded_rmc_round_trip() {
        let (lat, lat_hem) = encode(-53.755, Axis::Latitude);
        let (lon, lon_hem) = encode(-61.905, Axis::Longitude);
        let sentence = build_sentence(&format!(
            "GPRMC,120000,A,{},{},{},{},2.0,135.0,171026,003.1,W",
            lat, lat_hem, lon, lon_hem
        ));

        let fix = parse_sentence(&sentence).unwrap();
        let (decoded_lat, decoded_lon) = fix.position().unwrap();
        assert_approx_eq!(decoded_lat, -53.755, 1e-4);
        assert_approx_eq!(decoded_lon, -61.905, 1e-4);
    }
}
