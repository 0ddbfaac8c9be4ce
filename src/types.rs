//! Shared types used across the request handlers

use chrono::{DateTime, NaiveDate, Utc};

/// Parse an entry date given either as `YYYY-MM-DD` (midnight UTC) or as RFC 3339
pub fn parse_entry_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Serde adapter for optional entry dates in request bodies
pub mod entry_date {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => super::parse_entry_date(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid date '{}', expected YYYY-MM-DD", raw))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Body {
        #[serde(default, with = "entry_date")]
        date: Option<DateTime<Utc>>,
    }

    #[test]
    fn accepts_plain_dates_and_timestamps() {
        let plain = parse_entry_date("2024-03-09").unwrap();
        assert_eq!(plain.to_rfc3339(), "2024-03-09T00:00:00+00:00");

        let stamped = parse_entry_date("2024-03-09T10:15:00+05:30").unwrap();
        assert_eq!(stamped.to_rfc3339(), "2024-03-09T04:45:00+00:00");

        assert!(parse_entry_date("09/03/2024").is_none());
    }

    #[test]
    fn missing_or_blank_dates_are_none() {
        let body: Body = serde_json::from_str("{}").unwrap();
        assert!(body.date.is_none());
        let body: Body = serde_json::from_str(r#"{"date": ""}"#).unwrap();
        assert!(body.date.is_none());
        assert!(serde_json::from_str::<Body>(r#"{"date": "soon"}"#).is_err());
    }
}
