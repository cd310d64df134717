use anyhow::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Reply used when the endpoint can't be reached, answers with a
/// non-success status, or sends something that isn't JSON.
pub const UNAVAILABLE_REPLY: &str = "An error occurred while connecting to the AI. Please check your connection or try again later.";

/// Reply used when the endpoint answers but without any candidate text.
pub const INCOMPLETE_REPLY: &str =
    "I couldn't generate a complete response. Please try rephrasing your question.";

/// A web citation backing a generated answer.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Source {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// The normalized result of a single `ask`. Never an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub sources: Vec<Source>,
}

impl Reply {
    fn fallback(text: &str) -> Self {
        Self {
            text: text.to_string(),
            sources: Vec::new(),
        }
    }
}

// Request and response bodies. Every response field is optional since
// the endpoint omits whatever it has nothing to say about.

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(text: &str) -> Self {
        Self {
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Serialize, Debug)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub tools: Vec<serde_json::Value>,
    #[serde(rename = "systemInstruction")]
    pub system_instruction: Content,
}

impl GenerateContentRequest {
    /// A single-turn request. Only the latest user text is sent, never
    /// the rest of the transcript.
    pub fn single_turn(prompt: &str, system_instruction: &str) -> Self {
        Self {
            contents: vec![Content::text(prompt)],
            tools: vec![json!({"google_search": {}})],
            system_instruction: Content::text(system_instruction),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct WebSource {
    pub uri: Option<String>,
    pub title: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GroundingAttribution {
    pub web: Option<WebSource>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GroundingMetadata {
    #[serde(default, rename = "groundingAttributions")]
    pub grounding_attributions: Vec<GroundingAttribution>,
    // Newer model versions report citations as chunks instead
    #[serde(default, rename = "groundingChunks")]
    pub grounding_chunks: Vec<GroundingAttribution>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(rename = "groundingMetadata")]
    pub grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, if non-empty.
    pub fn text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
            .filter(|t| !t.is_empty())
    }

    /// Citations of the first candidate that carry both a URI and a
    /// title, in the order given.
    pub fn sources(&self) -> Vec<Source> {
        let Some(metadata) = self
            .candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
        else {
            return Vec::new();
        };

        let attributions = if metadata.grounding_attributions.is_empty() {
            &metadata.grounding_chunks
        } else {
            &metadata.grounding_attributions
        };

        attributions
            .iter()
            .filter_map(|a| a.web.as_ref())
            .filter_map(|web| match (&web.uri, &web.title) {
                (Some(uri), Some(title)) if !uri.is_empty() && !title.is_empty() => Some(Source {
                    uri: uri.clone(),
                    title: Some(title.clone()),
                }),
                _ => None,
            })
            .collect()
    }
}

/// Send a `generateContent` request. Errors on transport failure, a
/// non-success status, or a body that doesn't parse.
pub async fn generate_content(
    client: &reqwest::Client,
    request: &GenerateContentRequest,
    api_hostname: &str,
    api_key: &str,
    model: &str,
) -> Result<GenerateContentResponse, Error> {
    let url = format!(
        "{}/v1beta/models/{}:generateContent",
        api_hostname.trim_end_matches("/"),
        model
    );
    let response = client
        .post(url)
        .query(&[("key", api_key)])
        .header("Content-Type", "application/json")
        .json(request)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(response)
}

/// The seam between the conversation and the model. Implementations
/// must not fail: every error becomes an in-band reply.
#[async_trait]
pub trait AiGateway: Send + Sync {
    async fn ask(&self, prompt: &str, system_instruction: &str) -> Reply;
}

#[derive(Clone, Debug)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_hostname: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_hostname: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_hostname: api_hostname.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl AiGateway for GeminiClient {
    async fn ask(&self, prompt: &str, system_instruction: &str) -> Reply {
        let request = GenerateContentRequest::single_turn(prompt, system_instruction);
        let result = generate_content(
            &self.client,
            &request,
            &self.api_hostname,
            &self.api_key,
            &self.model,
        )
        .await;

        match result {
            Ok(response) => match response.text() {
                Some(text) => Reply {
                    text: text.to_string(),
                    sources: response.sources(),
                },
                None => {
                    tracing::warn!("Gemini response had no candidate text");
                    Reply::fallback(INCOMPLETE_REPLY)
                }
            },
            Err(e) => {
                // Strip the URL so the API key in the query never hits the logs
                let e = match e.downcast::<reqwest::Error>() {
                    Ok(e) => Error::from(e.without_url()),
                    Err(e) => e,
                };
                tracing::error!("Gemini API error: {}", e);
                Reply::fallback(UNAVAILABLE_REPLY)
            }
        }
    }
}
