// ABOUTME: Typed HTTP client for the assistant endpoint
// ABOUTME: Mirrors the action catalog and incrementally decodes the chat stream
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

//! # Assistant Client
//!
//! The client-side counterpart of the action router: one call per catalog
//! action, each POSTing the `{action, payload}` envelope and unwrapping the
//! `result` field, plus a streaming variant for chat that reads the
//! newline-delimited JSON body incrementally. A line that fails to decode is
//! logged and discarded; it is not fatal to the stream.

use std::collections::BTreeMap;
use std::pin::Pin;

use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::warn;

use crate::errors::{AppError, AppResult};
use crate::models::{
    ChatTurn, DailyPlan, FoodItem, MacroEstimate, MacroTarget, Meal, Recipe, UserData,
};

/// Stream of decoded chat text fragments
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, AppError>> + Send>>;

/// Service label used in client-side error messages
const SERVICE: &str = "nutriplan-server";

// ============================================================================
// Stream Decoding
// ============================================================================

/// Line buffer decoding newline-delimited `{"text": fragment}` JSON
///
/// Maintains pending bytes across reads, splits on newline boundaries, and
/// retains an incomplete trailing fragment until more bytes arrive.
#[derive(Debug, Default)]
pub struct NdjsonLineBuffer {
    /// Accumulated text not yet terminated by a newline
    buffer: String,
}

impl NdjsonLineBuffer {
    /// Create a new empty line buffer
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Feed raw bytes, returning the text fragments of all complete lines
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        let text = String::from_utf8_lossy(bytes);
        self.buffer.push_str(&text);

        let mut fragments = Vec::new();

        while let Some(newline_pos) = self.buffer.find('\n') {
            let line = self.buffer[..newline_pos].to_owned();
            self.buffer = self.buffer[newline_pos + 1..].to_owned();

            if let Some(fragment) = Self::decode_line(&line) {
                fragments.push(fragment);
            }
        }

        fragments
    }

    /// Decode any remaining buffered content once the stream has ended
    pub fn flush(&mut self) -> Vec<String> {
        let remaining = std::mem::take(&mut self.buffer);
        Self::decode_line(&remaining).into_iter().collect()
    }

    /// Decode one line as `{"text": fragment}` JSON
    ///
    /// Undecodable lines are logged and skipped.
    fn decode_line(line: &str) -> Option<String> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(value) => value
                .get("text")
                .and_then(Value::as_str)
                .map(str::to_owned),
            Err(e) => {
                warn!(error = %e, "Failed to decode stream line; discarding");
                None
            }
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Typed client for the assistant HTTP surface
#[derive(Debug, Clone)]
pub struct AssistantClient {
    http: reqwest::Client,
    base_url: String,
}

impl AssistantClient {
    /// Create a client targeting the given server base URL
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/assistant", self.base_url)
    }

    /// POST one `{action, payload}` envelope and unwrap the `result` field
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status (relaying
    /// the server's `error` message), or a response without a `result`.
    pub async fn invoke(&self, action: &str, payload: Value) -> AppResult<Value> {
        let response = self
            .http
            .post(self.endpoint())
            .json(&json!({ "action": action, "payload": payload }))
            .send()
            .await
            .map_err(|e| AppError::external_service(SERVICE, format!("Request failed: {e}")))?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            AppError::external_service(SERVICE, format!("Failed to decode response: {e}"))
        })?;

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Unknown server error");
            return Err(AppError::external_service(SERVICE, message));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| AppError::external_service(SERVICE, "Response carried no result field"))
    }

    /// Open the streaming chat relay and decode its fragments incrementally
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server rejects it before
    /// streaming begins. Once the stream is open, an unexpectedly closed
    /// connection simply ends the stream; the caller decides whether a
    /// truncated reply is acceptable.
    pub async fn send_message(
        &self,
        message: &str,
        history: &[ChatTurn],
    ) -> AppResult<TextStream> {
        let response = self
            .http
            .post(self.endpoint())
            .json(&json!({
                "action": "sendMessageToAI",
                "payload": { "message": message, "history": history }
            }))
            .send()
            .await
            .map_err(|e| AppError::external_service(SERVICE, format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or_else(|_| json!({}));
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Failed to parse error response")
                .to_owned();
            return Err(AppError::external_service(SERVICE, message));
        }

        let mut bytes_stream = response.bytes_stream();
        let stream = async_stream::stream! {
            let mut buffer = NdjsonLineBuffer::new();
            while let Some(chunk) = bytes_stream.next().await {
                match chunk {
                    Ok(bytes) => {
                        for fragment in buffer.feed(&bytes) {
                            yield Ok(fragment);
                        }
                    }
                    Err(e) => {
                        yield Err(AppError::external_service(
                            SERVICE,
                            format!("Stream read error: {e}"),
                        ));
                        return;
                    }
                }
            }
            for fragment in buffer.flush() {
                yield Ok(fragment);
            }
        };

        Ok(Box::pin(stream))
    }

    // ========================================================================
    // Typed action wrappers
    // ========================================================================

    /// Convert free-text meal-plan text into a structured plan
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a plan.
    pub async fn parse_meal_plan_text(&self, text: &str) -> AppResult<DailyPlan> {
        decode(self.invoke("parseMealPlanText", json!({ "text": text })).await?)
    }

    /// Generate a full daily plan for a date
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a plan.
    pub async fn generate_daily_plan(
        &self,
        user_data: &UserData,
        date_string: &str,
    ) -> AppResult<DailyPlan> {
        decode(
            self.invoke(
                "generateDailyPlan",
                json!({ "userData": user_data, "dateString": date_string }),
            )
            .await?,
        )
    }

    /// Generate an alternative plan for the same date and goals
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a plan.
    pub async fn regenerate_daily_plan(
        &self,
        user_data: &UserData,
        current_plan: &DailyPlan,
        number_of_meals: Option<u32>,
    ) -> AppResult<DailyPlan> {
        decode(
            self.invoke(
                "regenerateDailyPlan",
                json!({
                    "userData": user_data,
                    "currentPlan": current_plan,
                    "numberOfMeals": number_of_meals
                }),
            )
            .await?,
        )
    }

    /// Adjust an existing plan towards one macro goal
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a plan.
    pub async fn adjust_daily_plan_for_macro(
        &self,
        user_data: &UserData,
        current_plan: &DailyPlan,
        macro_to_fix: MacroTarget,
    ) -> AppResult<DailyPlan> {
        decode(
            self.invoke(
                "adjustDailyPlanForMacro",
                json!({
                    "userData": user_data,
                    "currentPlan": current_plan,
                    "macroToFix": macro_to_fix
                }),
            )
            .await?,
        )
    }

    /// Generate a week of plans keyed by date (`YYYY-MM-DD`)
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a plan map.
    pub async fn generate_weekly_plan(
        &self,
        user_data: &UserData,
        week_start_date: &str,
        observation: Option<&str>,
    ) -> AppResult<BTreeMap<String, DailyPlan>> {
        decode(
            self.invoke(
                "generateWeeklyPlan",
                json!({
                    "userData": user_data,
                    "weekStartDate": week_start_date,
                    "observation": observation
                }),
            )
            .await?,
        )
    }

    /// Regenerate a single meal from a free-text instruction
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a meal.
    pub async fn regenerate_meal_from_prompt(
        &self,
        prompt: &str,
        meal: &Meal,
        user_data: &UserData,
    ) -> AppResult<Meal> {
        decode(
            self.invoke(
                "regenerateMealFromPrompt",
                json!({ "prompt": prompt, "meal": meal, "userData": user_data }),
            )
            .await?,
        )
    }

    /// Estimate macros from a meal description
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not an estimate.
    pub async fn analyze_meal_from_text(&self, description: &str) -> AppResult<MacroEstimate> {
        decode(
            self.invoke("analyzeMealFromText", json!({ "description": description }))
                .await?,
        )
    }

    /// Estimate macros from a photographed meal submitted as a data URL
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not an estimate.
    pub async fn analyze_meal_from_image(&self, image_data_url: &str) -> AppResult<MacroEstimate> {
        decode(
            self.invoke(
                "analyzeMealFromImage",
                json!({ "imageDataUrl": image_data_url }),
            )
            .await?,
        )
    }

    /// Produce a motivational progress summary as Markdown text
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not text.
    pub async fn analyze_progress(&self, user_data: &UserData) -> AppResult<String> {
        decode(
            self.invoke("analyzeProgress", json!({ "userData": user_data }))
                .await?,
        )
    }

    /// Build a categorized shopping list from a weekly plan
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not text.
    pub async fn generate_shopping_list(&self, week_plan: &[DailyPlan]) -> AppResult<String> {
        decode(
            self.invoke("generateShoppingList", json!({ "weekPlan": week_plan }))
                .await?,
        )
    }

    /// Answer a free-form food question as Markdown text
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not text.
    pub async fn get_food_info(
        &self,
        question: &str,
        meal_context: Option<&Meal>,
    ) -> AppResult<String> {
        decode(
            self.invoke(
                "getFoodInfo",
                json!({ "question": question, "mealContext": meal_context }),
            )
            .await?,
        )
    }

    /// Suggest a macro-equivalent substitute for one food item
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a food item.
    pub async fn get_food_substitution(
        &self,
        item_to_swap: &FoodItem,
        meal_context: &Meal,
        user_data: &UserData,
    ) -> AppResult<FoodItem> {
        decode(
            self.invoke(
                "getFoodSubstitution",
                json!({
                    "itemToSwap": item_to_swap,
                    "mealContext": meal_context,
                    "userData": user_data
                }),
            )
            .await?,
        )
    }

    /// Generate one image and return it as a displayable data URL
    ///
    /// The server relays raw base64 JPEG bytes; the client prefixes the
    /// `data:image/jpeg;base64,` scheme.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a string.
    pub async fn generate_image_from_prompt(&self, prompt: &str) -> AppResult<String> {
        let bytes: String = decode(
            self.invoke("generateImageFromPrompt", json!({ "prompt": prompt }))
                .await?,
        )?;
        Ok(format!("data:image/jpeg;base64,{bytes}"))
    }

    /// Search for recipes, each carrying an image-generation prompt
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the result is not a recipe list.
    pub async fn find_recipes(
        &self,
        query: &str,
        user_data: &UserData,
        num_recipes: u32,
    ) -> AppResult<Vec<Recipe>> {
        decode(
            self.invoke(
                "findRecipes",
                json!({
                    "query": query,
                    "userData": user_data,
                    "numRecipes": num_recipes
                }),
            )
            .await?,
        )
    }
}

/// Decode an unwrapped `result` value into its expected shape
fn decode<T: DeserializeOwned>(value: Value) -> AppResult<T> {
    serde_json::from_value(value)
        .map_err(|e| AppError::internal(format!("Unexpected response shape: {e}")))
}
