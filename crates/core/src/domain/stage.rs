use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Sales,
    Design,
    TechnicalDesign,
    Procurement,
    Production,
    Execution,
    PostInstallation,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Sales,
        Stage::Design,
        Stage::TechnicalDesign,
        Stage::Procurement,
        Stage::Production,
        Stage::Execution,
        Stage::PostInstallation,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Design => "design",
            Self::TechnicalDesign => "technical_design",
            Self::Procurement => "procurement",
            Self::Production => "production",
            Self::Execution => "execution",
            Self::PostInstallation => "post_installation",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Sales => "Sales",
            Self::Design => "Design",
            Self::TechnicalDesign => "Technical Design",
            Self::Procurement => "Procurement",
            Self::Production => "Production",
            Self::Execution => "Execution",
            Self::PostInstallation => "Post Installation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown stage `{0}`")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    /// Accepts either the snake_case key or the display name, ignoring case.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Stage::ALL
            .into_iter()
            .find(|stage| stage.key() == normalized)
            .ok_or_else(|| UnknownStage(value.to_string()))
    }
}
