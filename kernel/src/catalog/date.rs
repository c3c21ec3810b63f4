// Calendar Dates
//
// All dates cross the engine boundary as `DD/MM/YYYY` text at day
// granularity. "Today" resolves with override precedence:
// explicit caller date > STACKS_TODAY env > system clock.

use chrono::NaiveDate;

/// Textual date format used on every boundary record.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Environment override for the current date, `DD/MM/YYYY`.
pub const TODAY_ENV: &str = "STACKS_TODAY";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid date `{0}`, expected DD/MM/YYYY")]
pub struct DateParseError(pub String);

pub fn parse_date(raw: &str) -> Result<NaiveDate, DateParseError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| DateParseError(raw.to_owned()))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Resolve the current date.
///
/// An unparseable env override falls through to the system clock.
pub fn current_date(explicit: Option<NaiveDate>) -> NaiveDate {
    resolve_override(explicit, std::env::var(TODAY_ENV).ok().as_deref())
        .unwrap_or_else(|| chrono::Local::now().date_naive())
}

/// Apply the override precedence: explicit date, then env text.
fn resolve_override(explicit: Option<NaiveDate>, env: Option<&str>) -> Option<NaiveDate> {
    if explicit.is_some() {
        return explicit;
    }
    env.and_then(|raw| parse_date(raw).ok())
}

/// serde adapter for `NaiveDate` fields.
pub mod ddmmyyyy {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_date(&raw).map_err(serde::de::Error::custom)
    }
}

/// serde adapter for `Option<NaiveDate>` fields.
pub mod ddmmyyyy_opt {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_some(&super::format_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| super::parse_date(&s))
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}
