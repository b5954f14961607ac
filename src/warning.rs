#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningCode {
    UnparseableDate,
    InvalidCalendarDate,
    UndecomposableDigits,
    RowTruncated,
    EmptyMonth,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveWarning {
    pub code: WarningCode,
    pub message: String,
    pub row: Option<usize>,
    pub column: Option<usize>,
}

impl ResolveWarning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            row: None,
            column: None,
        }
    }

    #[must_use]
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    #[must_use]
    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }
}
