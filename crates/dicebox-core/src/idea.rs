use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Generation strategy tag passed to the generation collaborator. Affects
/// only collaborator-internal behavior (latency/cost); opaque here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Player is waiting for the result.
    Realtime,
    /// Background pool top-up.
    Pregenerate,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Realtime => "realtime",
            Strategy::Pregenerate => "pregenerate",
        }
    }
}

// ---------------------------------------------------------------------------
// PregeneratedIdea / IdeaRecord
// ---------------------------------------------------------------------------

/// A pool row: a generated idea waiting to be picked. `id` and `created_at`
/// are assigned by the store on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PregeneratedIdea {
    pub id: Uuid,
    pub idea: String,
    pub focus_group: String,
    pub topic: String,
    pub medium: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub illustration_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcard_url: Option<String>,
}

impl PregeneratedIdea {
    /// The row content without the store-assigned `id`/`created_at`:
    /// the shape inserted into the history collection on pick.
    pub fn record(&self) -> IdeaRecord {
        IdeaRecord {
            idea: self.idea.clone(),
            focus_group: self.focus_group.clone(),
            topic: self.topic.clone(),
            medium: self.medium.clone(),
            illustration_url: self.illustration_url.clone(),
            postcard_url: self.postcard_url.clone(),
        }
    }
}

/// Idea content: what the generator produces, what gets inserted into the
/// pool, and what lands in the history collection after a pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaRecord {
    pub idea: String,
    pub focus_group: String,
    pub topic: String,
    pub medium: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub illustration_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcard_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
