use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::{config::GeminiConfig, error::ServiceError, models::VehicleType};

const SERVICE: &str = "text generation";
pub const EMPTY_ADVICE: &str = "Could not generate trip advice at this time.";
pub const FAILED_ADVICE: &str = "Sorry, I couldn't generate advice for this trip right now.";
const MAX_FEATURES: usize = 8;

/// A language model answering free-text prompts.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError>;
}

/// Gemini `generateContent` over REST.
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

impl GeminiClient {
    pub fn new(
        http: Client,
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
        }
    }

    /// `None` when no API key is configured.
    pub fn from_config(http: Client, config: &GeminiConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        Some(Self::new(
            http,
            api_key,
            config.model.clone(),
            config.base_url.clone(),
        ))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ServiceError::transport(SERVICE))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status {
                service: SERVICE,
                status,
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|err| ServiceError::Payload {
            service: SERVICE,
            reason: err.to_string(),
        })?;
        Ok(parsed.text())
    }
}

/// Trip insights built on an explicitly injected [`TextGenerator`].
#[derive(Clone)]
pub struct TripAdvisor {
    generator: Arc<dyn TextGenerator>,
}

impl TripAdvisor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Never fails: generator errors become a placeholder sentence.
    pub async fn trip_advice(
        &self,
        start: &str,
        end: &str,
        vehicle: VehicleType,
        distance_km: u64,
    ) -> String {
        let prompt = advice_prompt(start, end, vehicle, distance_km);
        match self.generator.generate(&prompt).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => EMPTY_ADVICE.to_string(),
            Err(err) => {
                tracing::error!("trip advice generation failed: {err}");
                FAILED_ADVICE.to_string()
            }
        }
    }

    /// Notable landscape features between the two places; empty on any failure.
    pub async fn geographic_features(&self, start: &str, end: &str) -> Vec<String> {
        let prompt = features_prompt(start, end);
        match self.generator.generate(&prompt).await {
            Ok(text) => parse_feature_list(&text).unwrap_or_else(|| {
                tracing::warn!("feature list reply was not a JSON array of strings");
                Vec::new()
            }),
            Err(err) => {
                tracing::error!("feature list generation failed: {err}");
                Vec::new()
            }
        }
    }
}

pub fn advice_prompt(start: &str, end: &str, vehicle: VehicleType, distance_km: u64) -> String {
    let stop_advice = match vehicle {
        VehicleType::Ev => "Advice on charging stops (e.g. suggest stopping every 200-300km).",
        VehicleType::Ice => "Advice on fuel efficiency or rest stops.",
    };
    format!(
        "I am planning a trip from {start} to {end} in a {}.\n\
         The distance is approximately {distance_km} km.\n\n\
         Please provide a brief, helpful summary for this trip including:\n\
         1. Estimated travel time (assuming average highway speeds).\n\
         2. Key cities or landmarks to look out for on the way.\n\
         3. {stop_advice}\n\
         4. One interesting fun fact about the region I'm driving through.\n\n\
         Keep the tone friendly and the response concise (under 200 words).",
        vehicle.description()
    )
}

pub fn features_prompt(start: &str, end: &str) -> String {
    format!(
        "List up to {MAX_FEATURES} notable geographic features (mountain ranges, rivers, lakes, \
         national parks, coastlines) a driver passes on the road from {start} to {end}.\n\
         Reply with only a JSON array of short strings, no commentary."
    )
}

/// Accepts a bare JSON array or one wrapped in prose or a fenced code block.
pub fn parse_feature_list(text: &str) -> Option<Vec<String>> {
    let open = text.find('[')?;
    let close = text.rfind(']')?;
    if close < open {
        return None;
    }
    let items: Vec<String> = serde_json::from_str(&text[open..=close]).ok()?;
    Some(
        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .take(MAX_FEATURES)
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Canned {
        reply: Result<String, ()>,
        prompts: Mutex<Vec<String>>,
    }

    impl Canned {
        fn advisor(reply: Result<&str, ()>) -> (TripAdvisor, Arc<Canned>) {
            let canned = Arc::new(Canned {
                reply: reply.map(str::to_string),
                prompts: Mutex::new(Vec::new()),
            });
            (TripAdvisor::new(canned.clone()), canned)
        }
    }

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, prompt: &str) -> Result<String, ServiceError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply
                .clone()
                .map_err(|_| ServiceError::NoEndpoint("text generation"))
        }
    }

    #[tokio::test]
    async fn advice_is_trimmed_reply() {
        let (advisor, canned) = Canned::advisor(Ok("  Enjoy the drive!\n"));
        let advice = advisor.trip_advice("Paris", "Lyon", VehicleType::Ev, 465).await;
        assert_eq!(advice, "Enjoy the drive!");

        let prompts = canned.prompts.lock().unwrap();
        assert!(prompts[0].contains("from Paris to Lyon in a Electric Vehicle"));
        assert!(prompts[0].contains("approximately 465 km"));
        assert!(prompts[0].contains("charging stops"));
    }

    #[tokio::test]
    async fn empty_reply_becomes_placeholder() {
        let (advisor, _) = Canned::advisor(Ok("   "));
        let advice = advisor.trip_advice("A", "B", VehicleType::Ice, 10).await;
        assert_eq!(advice, EMPTY_ADVICE);
    }

    #[tokio::test]
    async fn failure_becomes_apology() {
        let (advisor, _) = Canned::advisor(Err(()));
        assert_eq!(
            advisor.trip_advice("A", "B", VehicleType::Ice, 10).await,
            FAILED_ADVICE
        );
        assert!(advisor.geographic_features("A", "B").await.is_empty());
    }

    #[tokio::test]
    async fn features_parse_fenced_json() {
        let (advisor, _) =
            Canned::advisor(Ok("```json\n[\"Massif Central\", \" Rhone \", \"\"]\n```"));
        assert_eq!(
            advisor.geographic_features("Paris", "Lyon").await,
            vec!["Massif Central".to_string(), "Rhone".to_string()]
        );
    }

    #[test]
    fn non_array_reply_is_rejected() {
        assert_eq!(parse_feature_list("no features here"), None);
        assert_eq!(parse_feature_list("] ["), None);
        assert_eq!(parse_feature_list("[1, 2]"), None);
    }

    #[test]
    fn gemini_reply_text_joins_parts() {
        let reply: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"road"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(reply.text(), "Hello road");

        let blocked: GenerateResponse = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert_eq!(blocked.text(), "");
    }

    #[test]
    fn gemini_endpoint_includes_model() {
        let client = GeminiClient::new(Client::new(), "key", "gemini-test", "http://ai.local/v1beta/");
        assert_eq!(
            client.endpoint(),
            "http://ai.local/v1beta/models/gemini-test:generateContent"
        );
    }
}
