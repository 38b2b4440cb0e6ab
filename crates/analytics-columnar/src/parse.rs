//! Lenient scalar parsing shared by the importers and type conversion.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DateOrder {
    /// Month / day / year (e.g. `12/31/2024`).
    #[default]
    Mdy,
    /// Day / month / year (e.g. `31/12/2024`).
    Dmy,
}

/// Parse a plain decimal number (`12`, `-3.5`, `1e3`, `+.5`).
///
/// Grouping separators are not accepted: `1,234` is text, as in dataframe readers.
pub fn parse_number(v: &str) -> Option<f64> {
    let s = v.trim();
    if s.is_empty() {
        return None;
    }
    let lowered = s.to_ascii_lowercase();
    // `f64::from_str` accepts these; tabular readers treat them as text or missing.
    if matches!(
        lowered.trim_start_matches(['+', '-']),
        "inf" | "infinity" | "nan"
    ) {
        return None;
    }
    let parsed: f64 = s.parse().ok()?;
    Some(parsed)
}

/// Parse a date or date-time into milliseconds since the Unix epoch (UTC).
///
/// Accepted shapes: `YYYY-MM-DD`, `YYYY/MM/DD`, `MM/DD/YYYY` (or `DD/MM/YYYY`, by
/// `date_order` when ambiguous), each optionally followed by `T` or a space and
/// `HH:MM[:SS[.fff]]`, and an optional trailing `Z`.
pub fn parse_timestamp_millis(v: &str, date_order: DateOrder) -> Option<i64> {
    let s = v.trim();
    let s = s.strip_suffix('Z').unwrap_or(s);
    let (date_part, time_part) = match s.find(['T', ' ']) {
        Some(idx) => (&s[..idx], s[idx + 1..].trim()),
        None => (s, ""),
    };

    let date = parse_date(date_part, date_order)?;
    let time = if time_part.is_empty() {
        NaiveTime::from_hms_opt(0, 0, 0)?
    } else {
        parse_time(time_part)?
    };

    Some(NaiveDateTime::new(date, time).and_utc().timestamp_millis())
}

fn parse_date(s: &str, date_order: DateOrder) -> Option<NaiveDate> {
    let parts: Vec<&str> = s.split(['-', '/']).collect();
    let [a, b, c] = parts.as_slice() else {
        return None;
    };
    if !parts.iter().all(|p| !p.is_empty() && p.bytes().all(|ch| ch.is_ascii_digit())) {
        return None;
    }

    if a.len() == 4 {
        return NaiveDate::from_ymd_opt(a.parse().ok()?, b.parse().ok()?, c.parse().ok()?);
    }

    if c.len() == 4 {
        let year: i32 = c.parse().ok()?;
        let a: u32 = a.parse().ok()?;
        let b: u32 = b.parse().ok()?;
        let (month, day) = if a > 12 && b <= 12 {
            (b, a)
        } else if b > 12 && a <= 12 {
            (a, b)
        } else {
            match date_order {
                DateOrder::Dmy => (b, a),
                DateOrder::Mdy => (a, b),
            }
        };
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}
