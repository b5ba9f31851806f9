// ABOUTME: Action catalog mapping request envelopes to prompts and response modes
// ABOUTME: One typed payload per action with exhaustiveness-checked dispatch
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

//! # Action Catalog
//!
//! Every assistant capability is one entry in this catalog: a typed payload
//! ([`ActionRequest`] variant), a response-shape expectation
//! ([`ResponseMode`]), and a prompt-construction strategy
//! ([`ActionRequest::into_plan`]). The catalog is data: tests enumerate it
//! without touching the network.
//!
//! Envelope decoding is two-stage. The raw `action` string is extracted
//! first so a missing or unrecognized action produces its exact error
//! message - and never reaches the completion service.

/// Prompt text builders for each action
pub mod prompts;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::{AppError, AppResult};
use crate::image::decode_data_url;
use crate::llm::{ChatMessage, MessagePart, MessageRole};
use crate::models::{ChatTurn, DailyPlan, FoodItem, MacroTarget, Meal, UserData};

/// Every action name the router recognizes, in catalog order
pub const KNOWN_ACTIONS: &[&str] = &[
    "generateDailyPlan",
    "regenerateDailyPlan",
    "adjustDailyPlanForMacro",
    "generateWeeklyPlan",
    "regenerateMealFromPrompt",
    "parseMealPlanText",
    "analyzeMealFromText",
    "analyzeMealFromImage",
    "getFoodSubstitution",
    "findRecipes",
    "analyzeProgress",
    "generateShoppingList",
    "getFoodInfo",
    "generateImageFromPrompt",
    "sendMessageToAI",
];

/// Default recipe count for the recipe-search action
const fn default_num_recipes() -> u32 {
    3
}

/// A decoded `{action, payload}` envelope with one typed payload per action
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "camelCase")]
pub enum ActionRequest {
    /// Generate a full daily plan for a date from the user profile
    #[serde(rename_all = "camelCase")]
    GenerateDailyPlan {
        /// User profile to embed in the prompt
        user_data: UserData,
        /// Target date (`YYYY-MM-DD`)
        date_string: String,
    },

    /// Generate an alternative plan for the same date and goals
    #[serde(rename_all = "camelCase")]
    RegenerateDailyPlan {
        /// User profile to embed in the prompt
        user_data: UserData,
        /// The plan being replaced; supplies the date
        current_plan: DailyPlan,
        /// Exact meal count constraint, when requested
        #[serde(default)]
        number_of_meals: Option<u32>,
    },

    /// Adjust an existing plan towards one macro goal
    #[serde(rename_all = "camelCase")]
    AdjustDailyPlanForMacro {
        /// User profile to embed in the prompt
        user_data: UserData,
        /// The plan to adjust, embedded verbatim
        current_plan: DailyPlan,
        /// Which macro to correct
        macro_to_fix: MacroTarget,
    },

    /// Generate seven daily plans, folded into a date-keyed map
    #[serde(rename_all = "camelCase")]
    GenerateWeeklyPlan {
        /// User profile to embed in the prompt
        user_data: UserData,
        /// First day of the week (`YYYY-MM-DD`)
        week_start_date: String,
        /// Free-text observation appended to the prompt
        #[serde(default)]
        observation: Option<String>,
    },

    /// Regenerate a single meal from a free-text instruction
    #[serde(rename_all = "camelCase")]
    RegenerateMealFromPrompt {
        /// Free-text instruction
        prompt: String,
        /// The meal being regenerated
        meal: Meal,
        /// User profile to embed in the prompt
        user_data: UserData,
    },

    /// Convert free-text meal-plan text into a structured plan
    #[serde(rename_all = "camelCase")]
    ParseMealPlanText {
        /// The free-text plan
        text: String,
    },

    /// Estimate macros from a meal description
    #[serde(rename_all = "camelCase")]
    AnalyzeMealFromText {
        /// Free-text meal description
        description: String,
    },

    /// Estimate macros from a photographed meal
    #[serde(rename_all = "camelCase")]
    AnalyzeMealFromImage {
        /// The photo as a `data:<mime>;base64,<payload>` URL
        image_data_url: String,
    },

    /// Suggest a macro-equivalent substitute for one food item
    #[serde(rename_all = "camelCase")]
    GetFoodSubstitution {
        /// The item to replace
        item_to_swap: FoodItem,
        /// The meal the item belongs to
        meal_context: Meal,
        /// User profile to embed in the prompt
        user_data: UserData,
    },

    /// Search for recipes, each carrying an image-generation prompt
    #[serde(rename_all = "camelCase")]
    FindRecipes {
        /// Search query
        query: String,
        /// User profile to embed in the prompt
        user_data: UserData,
        /// Number of recipes to return
        #[serde(default = "default_num_recipes")]
        num_recipes: u32,
    },

    /// Produce a motivational progress summary as Markdown text
    #[serde(rename_all = "camelCase")]
    AnalyzeProgress {
        /// User profile to embed in the prompt
        user_data: UserData,
    },

    /// Build a categorized shopping list from a weekly plan
    #[serde(rename_all = "camelCase")]
    GenerateShoppingList {
        /// The plans to shop for, embedded verbatim
        week_plan: Vec<DailyPlan>,
    },

    /// Answer a free-form food question as Markdown text
    #[serde(rename_all = "camelCase")]
    GetFoodInfo {
        /// The question
        question: String,
        /// Optional meal the question refers to
        #[serde(default)]
        meal_context: Option<Meal>,
    },

    /// Generate one image from a text prompt, returned as base64 bytes
    #[serde(rename_all = "camelCase")]
    GenerateImageFromPrompt {
        /// Image-generation prompt
        prompt: String,
    },

    /// Stream a chat reply as newline-delimited JSON fragments
    #[serde(rename = "sendMessageToAI", rename_all = "camelCase")]
    SendMessageToAi {
        /// The new user message
        message: String,
        /// Prior conversation turns, in order
        #[serde(default)]
        history: Vec<ChatTurn>,
    },
}

/// Expected shape of an action's response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// JSON parsed from the completion text after fence stripping
    StructuredJson,
    /// Plain text relayed as a JSON string
    PlainText,
    /// Base64 image bytes relayed as a JSON string
    BinaryImage,
    /// Newline-delimited JSON fragments relayed as they arrive
    StreamedText,
}

/// Instruction prompt plus its structured-output flag
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Message parts sent as a single user turn
    pub parts: Vec<MessagePart>,
    /// Whether to request JSON-formatted output
    pub json_mode: bool,
}

impl Prompt {
    /// A text-only prompt expecting JSON output
    fn structured(text: String) -> Self {
        Self {
            parts: vec![MessagePart::Text(text)],
            json_mode: true,
        }
    }

    /// A text-only prompt expecting free text
    fn plain(text: String) -> Self {
        Self {
            parts: vec![MessagePart::Text(text)],
            json_mode: false,
        }
    }
}

/// Post-processing applied to a completed (non-streaming) response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Postprocess {
    /// Strip fences, reject empty, parse JSON, sanitize arrays
    Structured,
    /// As `Structured`, then fold the array into a date-keyed map
    WeeklyFold,
    /// Reject empty, relay the text unchanged
    PlainText,
}

/// Everything the router needs to execute one action
#[derive(Debug)]
pub enum ActionPlan {
    /// Single-shot completion with post-processing
    Complete {
        /// The prompt to send
        prompt: Prompt,
        /// How to normalize the response
        post: Postprocess,
    },
    /// Image generation returning base64 bytes
    GenerateImage {
        /// Image-generation prompt
        prompt: String,
    },
    /// Streaming chat relay
    StreamChat {
        /// Ordered conversation turns ending with the new user message
        messages: Vec<ChatMessage>,
    },
}

impl ActionRequest {
    /// The wire name of this action
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GenerateDailyPlan { .. } => "generateDailyPlan",
            Self::RegenerateDailyPlan { .. } => "regenerateDailyPlan",
            Self::AdjustDailyPlanForMacro { .. } => "adjustDailyPlanForMacro",
            Self::GenerateWeeklyPlan { .. } => "generateWeeklyPlan",
            Self::RegenerateMealFromPrompt { .. } => "regenerateMealFromPrompt",
            Self::ParseMealPlanText { .. } => "parseMealPlanText",
            Self::AnalyzeMealFromText { .. } => "analyzeMealFromText",
            Self::AnalyzeMealFromImage { .. } => "analyzeMealFromImage",
            Self::GetFoodSubstitution { .. } => "getFoodSubstitution",
            Self::FindRecipes { .. } => "findRecipes",
            Self::AnalyzeProgress { .. } => "analyzeProgress",
            Self::GenerateShoppingList { .. } => "generateShoppingList",
            Self::GetFoodInfo { .. } => "getFoodInfo",
            Self::GenerateImageFromPrompt { .. } => "generateImageFromPrompt",
            Self::SendMessageToAi { .. } => "sendMessageToAI",
        }
    }

    /// The response-shape expectation for this action
    #[must_use]
    pub const fn response_mode(&self) -> ResponseMode {
        match self {
            Self::GenerateDailyPlan { .. }
            | Self::RegenerateDailyPlan { .. }
            | Self::AdjustDailyPlanForMacro { .. }
            | Self::GenerateWeeklyPlan { .. }
            | Self::RegenerateMealFromPrompt { .. }
            | Self::ParseMealPlanText { .. }
            | Self::AnalyzeMealFromText { .. }
            | Self::AnalyzeMealFromImage { .. }
            | Self::GetFoodSubstitution { .. }
            | Self::FindRecipes { .. } => ResponseMode::StructuredJson,
            Self::AnalyzeProgress { .. }
            | Self::GenerateShoppingList { .. }
            | Self::GetFoodInfo { .. } => ResponseMode::PlainText,
            Self::GenerateImageFromPrompt { .. } => ResponseMode::BinaryImage,
            Self::SendMessageToAi { .. } => ResponseMode::StreamedText,
        }
    }

    /// Build the execution plan: prompt, response handling, or chat turns
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed image data URL, or if a payload
    /// value cannot be serialized for embedding in prompt text.
    pub fn into_plan(self) -> AppResult<ActionPlan> {
        let plan = match self {
            Self::GenerateDailyPlan {
                user_data,
                date_string,
            } => ActionPlan::Complete {
                prompt: Prompt::structured(prompts::daily_plan(&user_data, &date_string)),
                post: Postprocess::Structured,
            },

            Self::RegenerateDailyPlan {
                user_data,
                current_plan,
                number_of_meals,
            } => ActionPlan::Complete {
                prompt: Prompt::structured(prompts::regenerate_daily_plan(
                    &user_data,
                    &current_plan.date,
                    number_of_meals,
                )),
                post: Postprocess::Structured,
            },

            Self::AdjustDailyPlanForMacro {
                user_data,
                current_plan,
                macro_to_fix,
            } => ActionPlan::Complete {
                prompt: Prompt::structured(prompts::adjust_plan_for_macro(
                    &user_data,
                    &embed_json(&current_plan)?,
                    macro_to_fix,
                )),
                post: Postprocess::Structured,
            },

            Self::GenerateWeeklyPlan {
                user_data,
                week_start_date,
                observation,
            } => ActionPlan::Complete {
                prompt: Prompt::structured(prompts::weekly_plan(
                    &user_data,
                    &week_start_date,
                    observation.as_deref(),
                )),
                post: Postprocess::WeeklyFold,
            },

            Self::RegenerateMealFromPrompt {
                prompt,
                meal,
                user_data,
            } => ActionPlan::Complete {
                prompt: Prompt::structured(prompts::regenerate_meal(
                    &user_data, &meal.name, &prompt,
                )),
                post: Postprocess::Structured,
            },

            Self::ParseMealPlanText { text } => ActionPlan::Complete {
                prompt: Prompt::structured(prompts::parse_meal_plan(&text)),
                post: Postprocess::Structured,
            },

            Self::AnalyzeMealFromText { description } => ActionPlan::Complete {
                prompt: Prompt::structured(prompts::analyze_meal_text(&description)),
                post: Postprocess::Structured,
            },

            Self::AnalyzeMealFromImage { image_data_url } => {
                let image = decode_data_url(&image_data_url)?;
                ActionPlan::Complete {
                    prompt: Prompt {
                        parts: vec![
                            MessagePart::Text(prompts::analyze_meal_image().to_owned()),
                            MessagePart::InlineImage(image),
                        ],
                        json_mode: true,
                    },
                    post: Postprocess::Structured,
                }
            }

            Self::GetFoodSubstitution {
                item_to_swap,
                meal_context,
                user_data,
            } => ActionPlan::Complete {
                prompt: Prompt::structured(prompts::food_substitution(
                    &user_data,
                    &item_to_swap.name,
                    &meal_context.name,
                )),
                post: Postprocess::Structured,
            },

            Self::FindRecipes {
                query,
                user_data,
                num_recipes,
            } => ActionPlan::Complete {
                prompt: Prompt::structured(prompts::find_recipes(&user_data, &query, num_recipes)),
                post: Postprocess::Structured,
            },

            Self::AnalyzeProgress { user_data } => ActionPlan::Complete {
                prompt: Prompt::plain(prompts::analyze_progress(&user_data)),
                post: Postprocess::PlainText,
            },

            Self::GenerateShoppingList { week_plan } => ActionPlan::Complete {
                prompt: Prompt::plain(prompts::shopping_list(&embed_json(&week_plan)?)),
                post: Postprocess::PlainText,
            },

            Self::GetFoodInfo {
                question,
                meal_context,
            } => {
                let context_json = match meal_context.as_ref() {
                    Some(meal) => Some(embed_json(meal)?),
                    None => None,
                };
                ActionPlan::Complete {
                    prompt: Prompt::plain(prompts::food_info(&question, context_json.as_deref())),
                    post: Postprocess::PlainText,
                }
            }

            Self::GenerateImageFromPrompt { prompt } => ActionPlan::GenerateImage { prompt },

            Self::SendMessageToAi { message, history } => ActionPlan::StreamChat {
                messages: chat_messages(&history, &message),
            },
        };

        Ok(plan)
    }
}

/// Decode a raw request envelope into a typed action
///
/// # Errors
///
/// Returns an error naming the problem precisely: a missing `action` field,
/// an action outside [`KNOWN_ACTIONS`], or a payload that does not match the
/// action's shape. None of these reach the completion service.
pub fn decode_envelope(envelope: Value) -> AppResult<ActionRequest> {
    let action = envelope
        .get("action")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| AppError::invalid_input("Action is required"))?;

    if !KNOWN_ACTIONS.contains(&action.as_str()) {
        return Err(AppError::invalid_input(format!("Unknown action: {action}")));
    }

    serde_json::from_value(envelope).map_err(|e| {
        AppError::invalid_input(format!("Invalid payload for action '{action}': {e}"))
    })
}

/// Map client-submitted history into ordered conversation turns
///
/// Each prior user message becomes a user turn, each prior AI message a
/// model turn, preserving original order; the new message is appended as the
/// final user turn.
#[must_use]
pub fn chat_messages(history: &[ChatTurn], message: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);

    for turn in history {
        let role = if turn.is_user() {
            MessageRole::User
        } else {
            MessageRole::Assistant
        };
        messages.push(ChatMessage::new(role, &turn.text));
    }

    messages.push(ChatMessage::user(message));
    messages
}

/// Serialize a payload value for embedding verbatim in prompt text
fn embed_json<T: serde::Serialize>(value: &T) -> AppResult<String> {
    serde_json::to_string(value)
        .map_err(|e| AppError::internal(format!("Failed to serialize prompt payload: {e}")))
}
