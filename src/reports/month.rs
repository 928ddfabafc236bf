use crate::error::AppError;

/// Calendar month number, 1 through 12. Matches expenses of that month in any year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Month(u8);

impl Month {
    pub fn number(self) -> u8 {
        self.0
    }

    /// Zero-padded form compared against `strftime('%m', created_at)`.
    pub fn as_sql(self) -> String {
        format!("{:02}", self.0)
    }
}

impl TryFrom<i64> for Month {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match u8::try_from(value) {
            Ok(m @ 1..=12) => Ok(Month(m)),
            _ => Err(AppError::InvalidMonth(value)),
        }
    }
}
