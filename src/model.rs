use chrono::NaiveDate;
use serde::Serialize;

use crate::waste::WasteType;

#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub row: usize,
}

pub type TableRow = Vec<String>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScheduleTable {
    pub header: TableRow,
    pub rows: Vec<TableRow>,
}

impl ScheduleTable {
    #[must_use]
    pub fn width(&self) -> usize {
        self.header.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DayToken {
    pub days: Vec<u32>,
    pub annotations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionEvent {
    pub waste_type: WasteType,
    pub date: NaiveDate,
    pub note: Option<String>,
}

impl CollectionEvent {
    pub const NO_NOTE: &'static str = "no note";

    #[must_use]
    pub fn note_text(&self) -> &str {
        self.note.as_deref().unwrap_or(Self::NO_NOTE)
    }
}
