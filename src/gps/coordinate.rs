// src/gps/coordinate.rs
//! Conversion between NMEA `DDMM.MMMM` / `DDDMM.MMMM` coordinates and
//! signed decimal degrees.

/// Which axis a coordinate belongs to. Only affects the width of the degree
/// field when encoding and the hemisphere letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn degree_width(self) -> usize {
        match self {
            Axis::Latitude => 2,
            Axis::Longitude => 3,
        }
    }

    fn hemispheres(self) -> (char, char) {
        match self {
            Axis::Latitude => ('N', 'S'),
            Axis::Longitude => ('E', 'W'),
        }
    }
}

/// Decode an NMEA coordinate field and its hemisphere letter into decimal
/// degrees. South and West are negative.
///
/// Returns `None` when either field is empty, the number does not parse, or
/// the result is not finite. Any hemisphere letter other than `S`/`W` is
/// treated as positive.
pub fn decode(coord: &str, hemisphere: &str) -> Option<f64> {
    let coord = coord.trim();
    let hemisphere = hemisphere.trim();
    if coord.is_empty() || hemisphere.is_empty() {
        return None;
    }

    let value = coord.parse::<f64>().ok()?;
    let degrees = (value / 100.0).floor();
    let minutes = value - degrees * 100.0;
    let mut decimal = degrees + minutes / 60.0;

    if hemisphere == "S" || hemisphere == "W" {
        decimal = -decimal;
    }

    decimal.is_finite().then_some(decimal)
}

/// Encode decimal degrees into the NMEA field pair `(coordinate, hemisphere)`,
/// e.g. `-53.755` latitude becomes `("5345.3000", 'S')`.
pub fn encode(decimal: f64, axis: Axis) -> (String, char) {
    let (positive, negative) = axis.hemispheres();
    let hemisphere = if decimal < 0.0 { negative } else { positive };

    // Round on total minutes so 59.99999' carries into the degree field.
    let total_minutes = (decimal.abs() * 60.0 * 10_000.0).round() / 10_000.0;
    let degrees = (total_minutes / 60.0).floor();
    let minutes = total_minutes - degrees * 60.0;

    let formatted = format!(
        "{:0width$}{:07.4}",
        degrees as u32,
        minutes,
        width = axis.degree_width()
    );
    (formatted, hemisphere)
}
