//! Instance timestamps
//!
//! Dataset instances are keyed by a naive timestamp truncated to a
//! precision. Source-side names (subfolders, state fields) carry the
//! timestamp in an arbitrary strftime format, which may omit the time part.

use std::fmt;
use std::str::FromStr;

use chrono::format::{Parsed, StrftimeItems};
use chrono::{NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ProtocolError;
use crate::INSTANCE_TS_FORMAT;

/// Truncation granularity of an instance timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Precision {
    /// Seconds
    Second,
    /// Minutes
    Minute,
    /// Hours
    Hour,
    /// Days (default)
    #[default]
    Day,
}

impl Precision {
    /// Single-letter code used in configuration and load descriptors
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Second => "S",
            Self::Minute => "M",
            Self::Hour => "H",
            Self::Day => "D",
        }
    }

    /// Truncate a timestamp to this precision
    pub fn truncate(self, ts: NaiveDateTime) -> NaiveDateTime {
        let secs = i64::from(ts.num_seconds_from_midnight());
        let kept = match self {
            Self::Second => secs,
            Self::Minute => secs - secs % 60,
            Self::Hour => secs - secs % 3600,
            Self::Day => 0,
        };
        ts.date().and_time(NaiveTime::MIN) + TimeDelta::seconds(kept)
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S" => Ok(Self::Second),
            "M" => Ok(Self::Minute),
            "H" => Ok(Self::Hour),
            "D" => Ok(Self::Day),
            other => Err(ProtocolError::InvalidPrecision(other.to_string())),
        }
    }
}

impl Serialize for Precision {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Precision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Render a timestamp in the wire format (`YYYY-MM-DD HH:MM:SS`)
pub fn format_instance_ts(ts: NaiveDateTime) -> String {
    ts.format(INSTANCE_TS_FORMAT).to_string()
}

/// Parse a timestamp with a strftime format
///
/// Formats without a time part (`%Y%m%d`) resolve to midnight; formats with
/// an hour but no minute (`%Y%m%d%H`) resolve to the top of the hour. The
/// whole input must be consumed.
pub fn parse_instance_ts(value: &str, format: &str) -> Result<NaiveDateTime, ProtocolError> {
    let mut parsed = Parsed::new();
    chrono::format::parse(&mut parsed, value, StrftimeItems::new(format))
        .map_err(|e| ProtocolError::timestamp_parse(value, format, e))?;

    let date = parsed
        .to_naive_date()
        .map_err(|e| ProtocolError::timestamp_parse(value, format, e))?;

    let time = match parsed.to_naive_time() {
        Ok(time) => time,
        Err(_) if parsed.set_minute(0).is_ok() => {
            parsed.to_naive_time().unwrap_or(NaiveTime::MIN)
        }
        Err(_) => NaiveTime::MIN,
    };

    Ok(date.and_time(time))
}

/// Serde adapter for wire-format timestamps
pub mod ts_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::INSTANCE_TS_FORMAT;

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_instance_ts(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, INSTANCE_TS_FORMAT).map_err(serde::de::Error::custom)
    }

    /// Optional variant, for use with `skip_serializing_if = "Option::is_none"`
    pub mod option {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        use crate::INSTANCE_TS_FORMAT;

        pub fn serialize<S: Serializer>(
            ts: &Option<NaiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => serializer.serialize_str(&crate::format_instance_ts(*ts)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|s| {
                    NaiveDateTime::parse_from_str(&s, INSTANCE_TS_FORMAT)
                        .map_err(serde::de::Error::custom)
                })
                .transpose()
        }
    }
}
