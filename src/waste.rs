use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WasteType {
    Bio,
    Plastic,
    Mixed,
    Paper,
    Glass,
}

impl WasteType {
    pub const ALL: [Self; 5] = [
        Self::Bio,
        Self::Plastic,
        Self::Mixed,
        Self::Paper,
        Self::Glass,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bio => "Bio",
            Self::Plastic => "Metale i tworzywa sztuczne",
            Self::Mixed => "Zmieszane odpady komunalne",
            Self::Paper => "Papier",
            Self::Glass => "Szkło",
        }
    }

    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Bio => "#bio",
            Self::Plastic => "#plastik",
            Self::Mixed => "#zmieszane",
            Self::Paper => "#papier",
            Self::Glass => "#szkło",
        }
    }

    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Bio => "#814734",
            Self::Plastic => "#ffcd01",
            Self::Mixed => "#323232",
            Self::Paper => "#1f7dcb",
            Self::Glass => "#20962a",
        }
    }

    #[must_use]
    pub const fn match_patterns(self) -> &'static [&'static str] {
        match self {
            Self::Bio => &["Bio"],
            Self::Plastic => &[
                "Metale tworzywa sztuczne",
                "Metale i tworzywa sztuczne",
                "Metale",
                "Plastik",
            ],
            Self::Mixed => &["Zmieszane odpady komunalne", "Zmieszane"],
            Self::Paper => &["papier"],
            Self::Glass => &["Szkło"],
        }
    }

    pub fn from_header(header: &str) -> Result<Self, ScheduleError> {
        let normalized = header.trim().to_lowercase();

        Self::ALL
            .into_iter()
            .find(|candidate| {
                candidate
                    .match_patterns()
                    .iter()
                    .any(|pattern| normalized.contains(&pattern.to_lowercase()))
            })
            .ok_or_else(|| ScheduleError::UnknownWasteType(header.trim().to_string()))
    }
}

impl fmt::Display for WasteType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}
