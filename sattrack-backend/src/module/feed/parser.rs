//! Position feed JSON parser
//!
//! Decodes the body returned by the position endpoint
//! (e.g. https://api.wheretheiss.at/v1/satellites/25544) into a [`Position`].

use chrono::{DateTime, Utc};
use sattrack_common::{Position, Visibility};

use super::types::{FetchError, NumberOrString, RawPosition};

fn numeric_field(field: &str, value: Option<NumberOrString>) -> Result<f64, FetchError> {
    let value = value.ok_or_else(|| FetchError::Malformed(format!("missing field `{}`", field)))?;

    let number = match value {
        NumberOrString::Number(n) => n,
        NumberOrString::Text(text) => text.trim().parse::<f64>().map_err(|_| {
            FetchError::Malformed(format!("field `{}` is not numeric: {:?}", field, text))
        })?,
    };

    if !number.is_finite() {
        return Err(FetchError::Malformed(format!(
            "field `{}` is not finite",
            field
        )));
    }

    Ok(number)
}

fn bounded_field(field: &str, value: Option<NumberOrString>, limit: f64) -> Result<f64, FetchError> {
    let number = numeric_field(field, value)?;
    if number.abs() > limit {
        return Err(FetchError::Malformed(format!(
            "field `{}` out of range: {}",
            field, number
        )));
    }
    Ok(number)
}

fn timestamp_field(
    value: Option<NumberOrString>,
    received_at: DateTime<Utc>,
) -> Result<DateTime<Utc>, FetchError> {
    if value.is_none() {
        return Ok(received_at);
    }

    let seconds = numeric_field("timestamp", value)?;
    let nanos = (seconds.fract() * 1e9).round() as u32;

    DateTime::<Utc>::from_timestamp(seconds.trunc() as i64, nanos.min(999_999_999)).ok_or_else(
        || FetchError::Malformed(format!("field `timestamp` out of range: {}", seconds)),
    )
}

/// Parse a feed body into a [`Position`].
///
/// `received_at` stamps positions whose body carries no `timestamp`.
pub fn parse_position_json(body: &str, received_at: DateTime<Utc>) -> Result<Position, FetchError> {
    let raw: RawPosition = serde_json::from_str(body)
        .map_err(|e| FetchError::Malformed(format!("invalid JSON: {}", e)))?;

    Ok(Position {
        latitude: bounded_field("latitude", raw.latitude, 90.0)?,
        longitude: bounded_field("longitude", raw.longitude, 180.0)?,
        altitude_km: numeric_field("altitude", raw.altitude)?,
        velocity_kmh: numeric_field("velocity", raw.velocity)?,
        visibility: raw
            .visibility
            .as_ref()
            .and_then(|v| v.as_str())
            .map(Visibility::from_feed)
            .unwrap_or_default(),
        timestamp: timestamp_field(raw.timestamp, received_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn received_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_reference_body() {
        let body = r#"{"name":"iss","id":25544,"latitude":51.5,"longitude":-0.1,
            "altitude":408.0,"velocity":27600.0,"visibility":"daylight",
            "footprint":4400.2,"timestamp":1760875200,"units":"kilometers"}"#;

        let position = parse_position_json(body, received_at()).unwrap();
        assert_eq!(position.latitude, 51.5);
        assert_eq!(position.longitude, -0.1);
        assert_eq!(position.altitude_km, 408.0);
        assert_eq!(position.velocity_kmh, 27600.0);
        assert_eq!(position.visibility, Visibility::Daylight);
        assert_eq!(position.timestamp.timestamp(), 1_760_875_200);
    }

    #[test]
    fn test_parse_string_numbers() {
        let body = r#"{"latitude":"-12.25","longitude":"100.5","altitude":"420.1",
            "velocity":"27580.9","visibility":"eclipsed"}"#;

        let position = parse_position_json(body, received_at()).unwrap();
        assert_eq!(position.latitude, -12.25);
        assert_eq!(position.velocity_kmh, 27580.9);
        assert_eq!(position.visibility, Visibility::Eclipsed);
        assert_eq!(position.timestamp, received_at());
    }

    #[test]
    fn test_unknown_or_missing_visibility() {
        let body = r#"{"latitude":1,"longitude":2,"altitude":3,"velocity":4}"#;
        let position = parse_position_json(body, received_at()).unwrap();
        assert_eq!(position.visibility, Visibility::Unknown);

        let body = r#"{"latitude":1,"longitude":2,"altitude":3,"velocity":4,"visibility":"twilight"}"#;
        let position = parse_position_json(body, received_at()).unwrap();
        assert_eq!(position.visibility, Visibility::Unknown);
    }

    #[test]
    fn test_non_string_visibility_is_unknown() {
        for visibility in ["1", "true", "{}", "null", r#"["daylight"]"#] {
            let body = format!(
                r#"{{"latitude":1,"longitude":2,"altitude":3,"velocity":4,"visibility":{}}}"#,
                visibility
            );
            let position = parse_position_json(&body, received_at()).unwrap();
            assert_eq!(position.visibility, Visibility::Unknown, "visibility {}", visibility);
        }
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let body = r#"{"latitude":51.5,"altitude":408.0,"velocity":27600.0}"#;
        let err = parse_position_json(body, received_at()).unwrap_err();
        assert_eq!(err, FetchError::Malformed("missing field `longitude`".to_string()));
    }

    #[test]
    fn test_non_numeric_field_is_malformed() {
        let body = r#"{"latitude":"north","longitude":0,"altitude":408.0,"velocity":27600.0}"#;
        let err = parse_position_json(body, received_at()).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(msg) if msg.contains("latitude")));
    }

    #[test]
    fn test_out_of_range_coordinates() {
        let body = r#"{"latitude":91.0,"longitude":0,"altitude":408.0,"velocity":27600.0}"#;
        assert!(parse_position_json(body, received_at()).is_err());

        let body = r#"{"latitude":0,"longitude":-180.5,"altitude":408.0,"velocity":27600.0}"#;
        assert!(parse_position_json(body, received_at()).is_err());
    }

    #[test]
    fn test_invalid_json() {
        let err = parse_position_json("<html>rate limited</html>", received_at()).unwrap_err();
        assert!(!err.is_unreachable());
    }
}
