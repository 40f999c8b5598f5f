//! Time-index selection
//!
//! Turns the time axis of the gridded dataset (seconds since 1970-01-01 UTC)
//! into the list of layers to extract. For every timestamp whose month is in
//! the [`MonthFilter`] it produces, in axis order:
//!
//! - a layer name unique within the run (`sst_12`),
//! - a date literal understood by the layer extraction step
//!   (`time '02/05/2019 12:00:00'`),
//! - a human-readable label used to rename value columns (`May 2019`).
//!
//! Matching is done against the formatted `DD/MM/YYYY` string. In
//! [`MatchMode::Substring`] a day-of-month equal to a month code also matches;
//! every such match is logged as a warning.

use chrono::{DateTime, Datelike, NaiveDateTime};
use log::{debug, warn};

pub mod error;
pub use error::TimeAxisError;

pub mod month_filter;
pub use month_filter::{MatchMode, MonthCode, MonthFilter};

const DATE_FORMAT: &str = "%d/%m/%Y";
const LABEL_FORMAT: &str = "%B %Y";
const LAYER_TIME_OF_DAY: &str = "12:00:00";

#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    seconds: Vec<f64>,
}

impl TimeAxis {
    pub fn from_seconds(seconds: Vec<f64>) -> Self {
        Self { seconds }
    }

    /// Parses raw textual time values, e.g. from dataset metadata.
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, TimeAxisError> {
        let seconds = values
            .iter()
            .enumerate()
            .map(|(position, value)| {
                let value = value.as_ref().trim();
                value
                    .parse::<f64>()
                    .map_err(|_| TimeAxisError::NotNumeric {
                        position,
                        value: value.to_string(),
                    })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        Ok(Self { seconds })
    }

    #[allow(dead_code)]
    pub fn seconds(&self) -> &[f64] {
        &self.seconds
    }

    pub fn len(&self) -> usize {
        self.seconds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seconds.is_empty()
    }

    /// Converts every entry to a UTC calendar date-time.
    pub fn datetimes(&self) -> Result<Vec<NaiveDateTime>, TimeAxisError> {
        self.seconds
            .iter()
            .enumerate()
            .map(|(position, &value)| to_datetime(position, value))
            .collect()
    }
}

fn to_datetime(position: usize, value: f64) -> Result<NaiveDateTime, TimeAxisError> {
    if !value.is_finite() {
        return Err(TimeAxisError::NotFinite { position, value });
    }

    let whole = value.floor();
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return Err(TimeAxisError::OutOfRange { position, value });
    }

    let nanos = (((value - whole) * 1e9) as u32).min(999_999_999);

    DateTime::from_timestamp(whole as i64, nanos)
        .map(|dt| dt.naive_utc())
        .ok_or(TimeAxisError::OutOfRange { position, value })
}

/// One matched time-axis entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedIndex {
    pub index: usize,
    pub layer_name: String,
    pub date_literal: String,
    pub label: String,
}

impl SelectedIndex {
    fn new(variable: &str, index: usize, datetime: &NaiveDateTime, formatted: &str) -> Self {
        Self {
            index,
            layer_name: format!("{}_{}", variable, index),
            date_literal: format!("time '{} {}'", formatted, LAYER_TIME_OF_DAY),
            label: datetime.format(LABEL_FORMAT).to_string(),
        }
    }
}

/// Selected entries in axis order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    entries: Vec<SelectedIndex>,
}

impl Selection {
    pub fn iter(&self) -> impl Iterator<Item = &SelectedIndex> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn indices(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.index).collect()
    }

    pub fn layer_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.layer_name.clone()).collect()
    }

    pub fn date_literals(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.date_literal.clone()).collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.label.clone()).collect()
    }
}

fn code_matches(mode: MatchMode, formatted: &str, month: u32, code: &MonthCode) -> bool {
    match mode {
        MatchMode::Substring => formatted.contains(&code.pattern()),
        MatchMode::MonthField => month == code.month(),
    }
}

/// Matched codes that differ from the calendar month, i.e. matched the day.
fn day_collisions<'a>(month: u32, matching: &[&'a MonthCode]) -> Vec<&'a MonthCode> {
    matching
        .iter()
        .copied()
        .filter(|code| code.month() != month)
        .collect()
}

/// Selects the time-axis entries falling in the months of `filter`.
///
/// Each timestamp is visited once, so it is selected at most once even when
/// several codes match it.
pub fn select(
    axis: &TimeAxis,
    filter: &MonthFilter,
    mode: MatchMode,
    variable: &str,
) -> Result<Selection, TimeAxisError> {
    let mut entries = Vec::new();

    for (index, datetime) in axis.datetimes()?.iter().enumerate() {
        let formatted = datetime.format(DATE_FORMAT).to_string();
        let month = datetime.month();

        let matching: Vec<&MonthCode> = filter
            .codes()
            .iter()
            .filter(|code| code_matches(mode, &formatted, month, code))
            .collect();

        if matching.is_empty() {
            continue;
        }

        for code in day_collisions(month, &matching) {
            warn!(
                "{} (index {}) matches month code {} through its day of month",
                formatted,
                index,
                code.as_str()
            );
        }

        let entry = SelectedIndex::new(variable, index, datetime, &formatted);
        debug!("Selected {} -> {} ({})", entry.layer_name, entry.label, entry.date_literal);
        entries.push(entry);
    }

    Ok(Selection { entries })
}
