use chrono::{Datelike, NaiveDateTime};

/// Approval code for readings that will not be revised upstream.
pub const APPROVED: char = 'A';

/// One observation in the lake's long format.
///
/// The partition year is always derived from `read_ts`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalReading {
    pub site_code: String,
    pub read_ts: NaiveDateTime,
    pub parameter_code: String,
    pub value: f64,
    pub approval_status: Option<char>,
}

impl CanonicalReading {
    pub fn new(
        site_code: impl Into<String>,
        read_ts: NaiveDateTime,
        parameter_code: impl Into<String>,
        value: f64,
        approval_status: Option<char>,
    ) -> Self {
        CanonicalReading {
            site_code: site_code.into(),
            read_ts,
            parameter_code: parameter_code.into(),
            value,
            approval_status,
        }
    }

    pub fn year(&self) -> i32 {
        self.read_ts.year()
    }

    /// Whether the reading may be persisted.
    pub fn is_valid(&self) -> bool {
        self.value.is_finite() && !self.site_code.is_empty() && !self.parameter_code.is_empty()
    }
}

// -- Tests -------------------------------------------------------------------
