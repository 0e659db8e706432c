use serde::{Deserialize, Serialize};

use crate::domain::stage::Stage;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Task,
    Document,
    Stage,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Document => "document",
            Self::Stage => "stage",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Blocked,
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Requested,
    Received,
    Rejected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    InReview,
    Approved,
    Rejected,
}

/// The thing an approval chain is attached to. Callers say which kind of
/// entity they hold instead of the engine inferring it from field presence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApprovalEntity {
    Task { id: String, title: String, stage: Stage, priority: TaskPriority },
    Document { id: String, name: String, stage: Stage, category: String },
    Stage { stage: Stage },
}

impl ApprovalEntity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Task { .. } => EntityType::Task,
            Self::Document { .. } => EntityType::Document,
            Self::Stage { .. } => EntityType::Stage,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Task { id, .. } | Self::Document { id, .. } => id,
            Self::Stage { stage } => stage.key(),
        }
    }

    /// Display title; regex title patterns are matched against this.
    pub fn title(&self) -> &str {
        match self {
            Self::Task { title, .. } => title,
            Self::Document { name, .. } => name,
            Self::Stage { stage } => stage.display_name(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::Task { stage, .. } | Self::Document { stage, .. } | Self::Stage { stage } => {
                *stage
            }
        }
    }

    pub fn priority(&self) -> Option<TaskPriority> {
        match self {
            Self::Task { priority, .. } => Some(*priority),
            _ => None,
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            Self::Document { category, .. } => Some(category),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: String,
    pub title: String,
    pub stage: Stage,
    pub status: TaskStatus,
    pub priority: TaskPriority,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub required_for_stage: Option<Stage>,
    pub status: FileStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub id: String,
    pub name: String,
    pub stage: Stage,
    pub category: String,
    pub status: DocumentStatus,
    #[serde(default)]
    pub required_for_progression: bool,
}
