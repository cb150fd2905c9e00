//! Timestamp parsing for raw observation cells.
//!
//! Readings are stored as naive UTC. Instantaneous values come with a
//! per-row zone abbreviation (`tz_cd`), which is applied before the zone is
//! dropped so sites in different zones sort consistently.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// UTC offset in hours for the zone codes the service emits.
pub fn zone_offset_hours(code: &str) -> Option<i32> {
    let hours = match code.trim().to_uppercase().as_str() {
        "UTC" | "GMT" | "Z" => 0,
        "EST" => -5,
        "EDT" => -4,
        "CST" => -6,
        "CDT" => -5,
        "MST" => -7,
        "MDT" => -6,
        "PST" => -8,
        "PDT" => -7,
        "AKST" => -9,
        "AKDT" => -8,
        "HST" => -10,
        _ => return None,
    };

    Some(hours)
}

/// Parses a timestamp cell into naive UTC.
///
/// Returns `None` for blank or unparseable cells and for unknown zone codes.
pub fn parse_timestamp(raw: &str, zone: Option<&str>) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.naive_utc());
    }

    let local = parse_naive(raw)?;

    match zone.map(str::trim).filter(|z| !z.is_empty()) {
        None => Some(local),
        Some(code) => {
            let offset = FixedOffset::east_opt(zone_offset_hours(code)? * 3600)?;
            offset
                .from_local_datetime(&local)
                .single()
                .map(|dt| dt.naive_utc())
        }
    }
}

fn parse_naive(raw: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

// -- Tests -------------------------------------------------------------------
