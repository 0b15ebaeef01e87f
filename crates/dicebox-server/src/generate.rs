use std::time::Duration;

use serde::Deserialize;

use dicebox_core::{GenerateError, IdeaGenerator, IdeaRecord, ParameterChoice, Strategy};

// ---------------------------------------------------------------------------
// HttpGenerator
// ---------------------------------------------------------------------------

/// Client for the idea generation collaborator: one JSON POST per idea,
/// carrying the parameter choice and the strategy tag. The strategy only
/// steers collaborator-internal latency/cost tradeoffs and is opaque here.
#[derive(Clone)]
pub struct HttpGenerator {
    client: reqwest::Client,
    url: String,
}

impl HttpGenerator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

/// What the collaborator answers with; the parameter labels are echoed
/// from the request, so only the generated content is read back.
#[derive(Debug, Deserialize)]
struct GeneratedBody {
    idea: String,
    #[serde(default)]
    illustration_url: Option<String>,
    #[serde(default)]
    postcard_url: Option<String>,
}

impl IdeaGenerator for HttpGenerator {
    async fn generate(
        &self,
        choice: &ParameterChoice,
        strategy: Strategy,
    ) -> Result<IdeaRecord, GenerateError> {
        let body = serde_json::json!({
            "focus_group": choice.focus_group,
            "topic": choice.topic,
            "medium": choice.medium,
            "strategy": strategy.as_str(),
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerateError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerateError::Status(status.as_u16()));
        }

        let generated: GeneratedBody = response
            .json()
            .await
            .map_err(|e| GenerateError::Decode(e.to_string()))?;

        Ok(IdeaRecord {
            idea: generated.idea,
            focus_group: choice.focus_group.clone(),
            topic: choice.topic.clone(),
            medium: choice.medium.clone(),
            illustration_url: generated.illustration_url,
            postcard_url: generated.postcard_url,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
