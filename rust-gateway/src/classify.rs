//! Media classification collaborator.
//!
//! The gateway treats classification as a black box: canonical URI plus a
//! fixed prompt (plus any caption text) in, a verdict token out. The
//! concrete implementation calls Gemini's `generateContent` endpoint with
//! the media URI attached as a file part.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fixed prompt asking whether the probability-item disclosure phrase
/// appears in the referenced media. The model must answer with the bare
/// verdict token.
pub const CLASSIFICATION_PROMPT: &str = "다음 영상 URI에서 영상의 제목과 설명에 '확률형 아이템 포함' 이라는 문구가 정확히 포함되어 있는지 여부를 판단하여 포함인 경우 'True' 또는 미포함 인 경우 'False' 으로만 답변해주세요.";

/// Verdict token meaning "the phrase is included". Anything else is
/// treated as not included.
pub const INCLUDED_VERDICT: &str = "True";

/// External analysis service inspecting media at a URI.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the media at `uri`, with `context_text` as supplementary
    /// caption/message context. Returns the raw verdict string.
    async fn classify(&self, uri: &str, prompt: &str, context_text: &str) -> Result<String>;
}

/// Gemini-backed classifier.
pub struct GeminiClassifier {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClassifier {
    pub fn new(api_key: String, model: String, timeout_ms: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .context("Failed to create classifier HTTP client")?;

        Ok(Self {
            http,
            api_key,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        )
    }
}

#[async_trait]
impl Classifier for GeminiClassifier {
    async fn classify(&self, uri: &str, prompt: &str, context_text: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(anyhow!("GEMINI_API_KEY is not configured"));
        }

        #[derive(Serialize)]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            role: &'a str,
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        #[serde(rename_all = "snake_case")]
        enum Part<'a> {
            Text(&'a str),
            FileData { file_uri: &'a str, mime_type: &'a str },
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: CandidateContent,
        }
        #[derive(Deserialize)]
        struct CandidateContent {
            #[serde(default)]
            parts: Vec<CandidatePart>,
        }
        #[derive(Deserialize)]
        struct CandidatePart {
            #[serde(default)]
            text: String,
        }

        let instruction = if context_text.is_empty() {
            prompt.to_string()
        } else {
            format!("{}\n\n게시물 텍스트: {}", prompt, context_text)
        };

        let req = Req {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text(&instruction),
                    Part::FileData {
                        file_uri: uri,
                        mime_type: "video/*",
                    },
                ],
            }],
        };

        let resp = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&req)
            .send()
            .await
            .context("classification request")?
            .error_for_status()
            .context("classification non-2xx")?;

        let body: Resp = resp.json().await.context("classification response body")?;
        let verdict = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.trim().to_string())
            .ok_or_else(|| anyhow!("classification response has no candidates"))?;

        info!(uri = %uri, verdict = %verdict, "classification_complete");
        Ok(verdict)
    }
}
