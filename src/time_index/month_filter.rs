use serde::Deserialize;
use std::fmt;

use super::TimeAxisError;

/// How a formatted `DD/MM/YYYY` date is compared against a month code.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// The formatted date contains `<code>/` anywhere. A day-of-month equal to
    /// the code also matches.
    #[default]
    #[serde(rename(deserialize = "substring"))]
    Substring,
    /// The calendar month of the date equals the code.
    #[serde(rename(deserialize = "month_field"))]
    MonthField,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MatchMode::Substring => write!(f, "substring"),
            MatchMode::MonthField => write!(f, "month_field"),
        }
    }
}

/// A two-digit month code such as `"05"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthCode {
    code: String,
    month: u32,
}

impl MonthCode {
    pub fn parse(code: &str) -> Result<Self, TimeAxisError> {
        let invalid = || TimeAxisError::InvalidMonthCode(code.to_string());

        if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let month: u32 = code.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }

        Ok(Self {
            code: code.to_string(),
            month,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.code
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Fixed-width pattern searched for in substring mode.
    pub fn pattern(&self) -> String {
        format!("{}/", self.code)
    }
}

impl fmt::Display for MonthCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

/// The set of months of interest, in configuration order, without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthFilter {
    codes: Vec<MonthCode>,
}

impl MonthFilter {
    pub fn parse<S: AsRef<str>>(codes: &[S]) -> Result<Self, TimeAxisError> {
        if codes.is_empty() {
            return Err(TimeAxisError::EmptyFilter);
        }

        let mut parsed: Vec<MonthCode> = Vec::with_capacity(codes.len());
        for code in codes {
            let code = MonthCode::parse(code.as_ref())?;
            if !parsed.contains(&code) {
                parsed.push(code);
            }
        }

        Ok(Self { codes: parsed })
    }

    pub fn codes(&self) -> &[MonthCode] {
        &self.codes
    }
}

impl fmt::Display for MonthFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let codes: Vec<&str> = self.codes.iter().map(MonthCode::as_str).collect();
        write!(f, "[{}]", codes.join(", "))
    }
}
