use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use lab_core::model::RecordDraft;

use crate::error::FeedbackError;

/// Text shown when procedure evaluation cannot reach the model.
const EVALUATION_FALLBACK: &str = "There was an error contacting the lab assistant. \
Check that the API key is configured correctly; your procedure has been recorded and \
you can continue with the next step.";

/// Text shown when the closing report summary cannot be generated.
const SUMMARY_FALLBACK: &str =
    "The lab report summary could not be generated because of an error with the \
writing assistant.";

/// Free-text evaluation capability consumed by the activity workflow.
///
/// Both calls resolve to a string no matter what happens underneath —
/// a missing credential or a network failure substitutes explanatory
/// fallback text. Callers cannot (and must not try to) distinguish real
/// model output from the fallback.
#[async_trait]
pub trait FeedbackProvider: Send + Sync {
    /// Guiding feedback on a proposed measurement procedure.
    async fn evaluate_procedure(&self, procedure: &str) -> String;

    /// Narrative summary of a finished run, suitable for a lab report.
    async fn generate_summary(&self, draft: &RecordDraft) -> String;
}

#[derive(Clone, Debug)]
pub struct FeedbackConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl FeedbackConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("LAB_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("LAB_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("LAB_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Chat-completions client behind the provider trait.
#[derive(Clone)]
pub struct AiFeedbackService {
    client: Client,
    config: Option<FeedbackConfig>,
}

impl AiFeedbackService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(FeedbackConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<FeedbackConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Generate text from a prompt.
    ///
    /// # Errors
    ///
    /// Returns `FeedbackError` when the service is disabled, the request
    /// fails, or the response is empty.
    async fn generate(&self, prompt: &str) -> Result<String, FeedbackError> {
        let config = self.config.as_ref().ok_or(FeedbackError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            temperature: 0.4,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedbackError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(FeedbackError::EmptyResponse)?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl FeedbackProvider for AiFeedbackService {
    async fn evaluate_procedure(&self, procedure: &str) -> String {
        match self.generate(&evaluation_prompt(procedure)).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "procedure evaluation fell back to canned text");
                EVALUATION_FALLBACK.to_owned()
            }
        }
    }

    async fn generate_summary(&self, draft: &RecordDraft) -> String {
        match self.generate(&summary_prompt(draft)).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "report summary fell back to canned text");
                SUMMARY_FALLBACK.to_owned()
            }
        }
    }
}

fn evaluation_prompt(procedure: &str) -> String {
    format!(
        "You are an experienced, helpful chemistry lab instructor. A metallurgy \
student has proposed the following procedure for measuring the apparent density of \
an oxidized copper ore sample.\n\n\
Student's procedure:\n\"{procedure}\"\n\n\
Evaluate the procedure for correctness, safety and clarity, and give constructive \
feedback. Instead of handing over the answer, ask questions that guide the student \
toward the correct procedure. For example, if they skipped the balance, you could \
ask what instrument measures the sample's mass. If a step is unsafe, point out the \
risk and ask for a safer alternative. Keep an encouraging, educational tone and \
structure the reply as clear bullet points."
    )
}

fn summary_prompt(draft: &RecordDraft) -> String {
    let lab = &draft.measurements;
    format!(
        "You are a scientific writer. Based on the lab data below, write a concise, \
clear summary paragraph for the results section of a lab report. It should \
communicate the objective, the method, the results and a short conclusion.\n\n\
Objective: determine the apparent density of an oxidized copper ore sample.\n\n\
Collected data:\n\
- Sample id: {id}\n\
- Date: {date}\n\
- Material: {material}\n\
- Sample mass: {mass} g\n\
- Initial water volume: {v0} mL\n\
- Final volume (water + sample): {v1} mL\n\
- Calculated apparent density: {density:.2} g/cm³\n\n\
Procedure followed: the sample's mass was measured on a balance, its volume was \
found by water displacement in a graduated cylinder, and the density was computed \
as mass over displaced volume.",
        id = draft.label.sample_id(),
        date = draft.label.date(),
        material = draft.label.material(),
        mass = lab.mass(),
        v0 = lab.initial_volume(),
        v1 = lab.final_volume(),
        density = lab.apparent_density(),
    )
}

/// Canned provider for tests and offline runs.
#[derive(Clone, Debug)]
pub struct ScriptedFeedback {
    pub evaluation: String,
    pub summary: String,
}

impl Default for ScriptedFeedback {
    fn default() -> Self {
        Self {
            evaluation: "Good start. Which instrument will you use to measure the \
sample's mass, and how will you read the displaced volume?"
                .to_owned(),
            summary: "The apparent density of the ore sample was determined by \
weighing it and measuring the volume of water it displaced; the result matched \
the expected range for a copper ore."
                .to_owned(),
        }
    }
}

#[async_trait]
impl FeedbackProvider for ScriptedFeedback {
    async fn evaluate_procedure(&self, _procedure: &str) -> String {
        self.evaluation.clone()
    }

    async fn generate_summary(&self, _draft: &RecordDraft) -> String {
        self.summary.clone()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
