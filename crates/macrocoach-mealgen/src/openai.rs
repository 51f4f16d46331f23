//! [`OpenAiGenerator`]: meal candidates from any OpenAI-compatible
//! `/chat/completions` endpoint (OpenAI, Ollama, vLLM, ...).
//!
//! The model is asked for a JSON object with a `meals` array. Whatever it
//! returns is parsed leniently; checking nutrition against the envelope is
//! left to [`MealSuggestionService`](crate::MealSuggestionService).

use std::time::Duration;

use macrocoach_core::{
  generate::{GenerationRequest, MealCandidate, MealGenerator},
  meal::{Ingredient, MealType},
  target::Macros,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{GenerationError, Result};

const CONNECT_TIMEOUT_SECS: u64 = 10;

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
  /// e.g. `https://api.openai.com/v1` or `http://localhost:11434/v1`.
  pub base_url:    String,
  pub model:       String,
  pub api_key:     Option<String>,
  pub temperature: f32,
  /// Upper bound for a single HTTP request.
  pub timeout:     Duration,
}

impl Default for OpenAiConfig {
  fn default() -> Self {
    Self {
      base_url:    "https://api.openai.com/v1".into(),
      model:       "gpt-4o-mini".into(),
      api_key:     None,
      temperature: 0.7,
      timeout:     Duration::from_secs(30),
    }
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
  model:           &'a str,
  messages:        Vec<ChatMessage>,
  temperature:     f32,
  response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
  #[serde(rename = "type")]
  kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
  role:    &'static str,
  content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
  message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
  content: Option<String>,
}

/// The JSON object the model is asked to produce.
#[derive(Debug, Deserialize)]
struct MealList {
  meals: Vec<ModelMeal>,
}

#[derive(Debug, Deserialize)]
struct ModelMeal {
  name:         String,
  meal_type:    MealType,
  kcal:         f64,
  #[serde(default)]
  protein_g:    f64,
  #[serde(default)]
  carbs_g:      f64,
  #[serde(default)]
  fat_g:        f64,
  #[serde(default)]
  cuisine:      Option<String>,
  #[serde(default)]
  ingredients:  Vec<Ingredient>,
  #[serde(default)]
  instructions: Vec<String>,
}

impl From<ModelMeal> for MealCandidate {
  fn from(m: ModelMeal) -> Self {
    Self {
      name:         m.name,
      meal_type:    m.meal_type,
      macros:       Macros {
        kcal:      m.kcal,
        protein_g: m.protein_g,
        carbs_g:   m.carbs_g,
        fat_g:     m.fat_g,
      },
      cuisine:      m.cuisine,
      ingredients:  m.ingredients,
      instructions: m.instructions,
    }
  }
}

// ─── Generator ───────────────────────────────────────────────────────────────

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct OpenAiGenerator {
  client: Client,
  config: OpenAiConfig,
  name:   String,
}

impl OpenAiGenerator {
  pub fn new(config: OpenAiConfig) -> Result<Self> {
    let client = Client::builder()
      .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
      .timeout(config.timeout)
      .build()?;
    let name = format!("openai:{}", config.model);
    Ok(Self { client, config, name })
  }

  fn url(&self, endpoint: &str) -> String {
    format!("{}/{endpoint}", self.config.base_url.trim_end_matches('/'))
  }

  async fn complete(&self, request: &GenerationRequest) -> Result<Vec<MealCandidate>> {
    let body = ChatRequest {
      model:           &self.config.model,
      messages:        vec![
        ChatMessage { role: "system", content: system_prompt() },
        ChatMessage { role: "user", content: user_prompt(request) },
      ],
      temperature:     self.config.temperature,
      response_format: ResponseFormat { kind: "json_object" },
    };

    let mut http = self.client.post(self.url("chat/completions")).json(&body);
    if let Some(key) = &self.config.api_key {
      http = http.bearer_auth(key);
    }

    let resp = http.send().await?;
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
      return Err(GenerationError::Status { status: status.as_u16(), body: text });
    }

    let parsed: ChatResponse = serde_json::from_str(&text)
      .map_err(|e| GenerationError::Malformed(format!("completion envelope: {e}")))?;
    let content = parsed
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .ok_or_else(|| GenerationError::Malformed("completion has no content".into()))?;

    parse_meals(&content)
  }
}

impl MealGenerator for OpenAiGenerator {
  type Error = GenerationError;

  fn name(&self) -> &str { &self.name }

  async fn generate(&self, request: &GenerationRequest) -> Result<Vec<MealCandidate>> {
    tracing::debug!(model = %self.config.model, count = request.count(), "requesting meals");
    self.complete(request).await
  }
}

// ─── Prompt ──────────────────────────────────────────────────────────────────

fn system_prompt() -> String {
  "You are a nutrition coach who writes practical home-cooked meals. \
   Reply with a single JSON object of the form \
   {\"meals\": [{\"name\": str, \"meal_type\": \"breakfast\"|\"lunch\"|\"dinner\"|\"snack\", \
   \"cuisine\": str, \"kcal\": number, \"protein_g\": number, \"carbs_g\": number, \
   \"fat_g\": number, \"ingredients\": [{\"name\": str, \"amount\": number, \"unit\": str}], \
   \"instructions\": [str]}]}. \
   Nutrition values are for the whole portion. No prose outside the JSON."
    .to_owned()
}

fn user_prompt(request: &GenerationRequest) -> String {
  let e = &request.envelope;
  let types = request
    .meal_types
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join(", ");

  let mut prompt = format!(
    "Suggest {} meal(s), one for each of these meal types in order: {types}.\n\
     Each meal should provide about {:.0} kcal, {:.0} g protein, {:.0} g carbs and {:.0} g fat.",
    request.count(),
    e.kcal,
    e.protein_g,
    e.carbs_g,
    e.fat_g,
  );
  if !request.cuisine_tags.is_empty() {
    prompt.push_str(&format!("\nPreferred cuisine: {}.", request.cuisine_tags.join(", ")));
  }
  if !request.dietary_tags.is_empty() {
    prompt.push_str(&format!("\nDietary requirements: {}.", request.dietary_tags.join(", ")));
  }
  if !request.avoid.is_empty() {
    prompt.push_str(&format!("\nDo not suggest: {}.", request.avoid.join(", ")));
  }
  prompt
}

/// Parse the model's content, tolerating a Markdown code fence around it.
fn parse_meals(content: &str) -> Result<Vec<MealCandidate>> {
  let trimmed = content.trim();
  let json = trimmed
    .strip_prefix("```json")
    .or_else(|| trimmed.strip_prefix("```"))
    .and_then(|s| s.strip_suffix("```"))
    .unwrap_or(trimmed);

  let list: MealList = serde_json::from_str(json.trim())
    .map_err(|e| GenerationError::Malformed(format!("meal list: {e}")))?;
  Ok(list.meals.into_iter().map(MealCandidate::from).collect())
}
