use chrono::{LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// Input format accepted from agents, e.g. `29-11-2025 4:30PM`.
pub const AGENT_DATE_FORMAT: &str = "DD-MM-YYYY H:MMAM/PM";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date '{input}': {reason} (expected {AGENT_DATE_FORMAT}, e.g. 29-11-2025 4:30PM)")]
pub struct DateFormatError {
    pub input: String,
    pub reason: String,
}

impl DateFormatError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

pub fn parse_timezone(raw: &str) -> Result<Tz, String> {
    raw.trim()
        .parse::<Tz>()
        .map_err(|_| format!("unknown timezone '{raw}'"))
}

pub fn parse_agent_datetime(input: &str) -> Result<NaiveDateTime, DateFormatError> {
    let mut parts = input.split_whitespace();
    let (Some(date_part), Some(time_part), None) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(DateFormatError::new(
            input,
            "expected a date and a time separated by one space",
        ));
    };

    let date = NaiveDate::parse_from_str(date_part, "%d-%m-%Y")
        .map_err(|e| DateFormatError::new(input, format!("bad date part '{date_part}': {e}")))?;
    let time = NaiveTime::parse_from_str(time_part, "%I:%M%p")
        .map_err(|e| DateFormatError::new(input, format!("bad time part '{time_part}': {e}")))?;
    Ok(date.and_time(time))
}

/// Milliseconds since the Unix epoch as a decimal string.
pub fn convert_date_to_millis(input: &str, tz: Tz) -> Result<String, DateFormatError> {
    convert_date_to_millis_i64(input, tz).map(|ms| ms.to_string())
}

pub fn convert_date_to_millis_i64(input: &str, tz: Tz) -> Result<i64, DateFormatError> {
    let naive = parse_agent_datetime(input)?;
    let local = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        // Repeated wall-clock hour at a DST fall-back: take the first.
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            return Err(DateFormatError::new(
                input,
                format!("time does not exist in {tz}"),
            ));
        }
    };
    Ok(local.timestamp_millis())
}
