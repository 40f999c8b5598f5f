use thiserror::Error;

#[derive(Error, Debug)]
pub enum TimeAxisError {
    #[error("time value {value:?} at position {position} is not a number")]
    NotNumeric { position: usize, value: String },

    #[error("time value {value} at position {position} is not a finite number of seconds")]
    NotFinite { position: usize, value: f64 },

    #[error("time value {value} at position {position} is outside the supported date range")]
    OutOfRange { position: usize, value: f64 },

    #[error("invalid month code {0:?}: expected a two-digit month between \"01\" and \"12\"")]
    InvalidMonthCode(String),

    #[error("month filter is empty")]
    EmptyFilter,
}
