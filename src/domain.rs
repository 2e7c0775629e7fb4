use serde::{Deserialize, Serialize};

/// Target age band for a coloring page. Controls how many elements the
/// generated art should contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "0-3")]
    Toddler,
    #[serde(rename = "4-8")]
    Child,
    #[serde(rename = "9-12")]
    Older,
}

impl AgeGroup {
    pub const ALL: [Self; 3] = [Self::Toddler, Self::Child, Self::Older];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Toddler => "0-3",
            Self::Child => "4-8",
            Self::Older => "9-12",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|group| group.as_str() == value)
    }
}

/// Artistic rendering style. Names are the Polish UI values and double as the
/// stored column values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColoringStyle {
    Prosty,
    Klasyczny,
    Szczegolowy,
    Mandala,
}

impl ColoringStyle {
    pub const ALL: [Self; 4] = [
        Self::Prosty,
        Self::Klasyczny,
        Self::Szczegolowy,
        Self::Mandala,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prosty => "prosty",
            Self::Klasyczny => "klasyczny",
            Self::Szczegolowy => "szczegolowy",
            Self::Mandala => "mandala",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|style| style.as_str() == value)
    }
}
