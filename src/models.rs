// ABOUTME: Common data models for user profiles, meal plans, and recipes
// ABOUTME: Plain immutable value structures passed whole between layers, never persisted
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

//! # Data Models
//!
//! Value structures shared by the action catalog, the HTTP surface, and the
//! typed client. Everything here is constructed per-request from
//! client-submitted JSON (or reconstructed from the completion service's
//! JSON) and discarded after the response is sent. Field names follow the
//! wire format's camelCase convention.

use serde::{Deserialize, Serialize};

// ============================================================================
// User Profile
// ============================================================================

/// A user's demographic data, dietary preferences, and macro goals
///
/// Treated as an opaque input value: the router never mutates it, only
/// interpolates it into prompt text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    /// Display name, when the client supplies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Age in years
    pub age: u32,
    /// Free-form gender description
    pub gender: String,
    /// Height in centimeters
    pub height: f64,
    /// Current weight in kilograms
    pub weight: f64,
    /// Free-form activity level description
    pub activity_level: String,
    /// Target weight in kilograms
    pub weight_goal: f64,
    /// Diet and restriction tags
    #[serde(default)]
    pub dietary_preferences: DietaryPreferences,
    /// Per-macro daily goals
    pub macros: MacroGoals,
    /// Optional nutritionist-managed settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_settings: Option<AdminSettings>,
}

/// Diet and restriction tag lists
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietaryPreferences {
    /// Diet tags (e.g., "vegetarian", "low-carb")
    #[serde(default)]
    pub diets: Vec<String>,
    /// Restriction tags (e.g., "lactose", "gluten")
    #[serde(default)]
    pub restrictions: Vec<String>,
}

/// Nutritionist-managed profile settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSettings {
    /// Standing instruction appended to every profile-bearing prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent_prompt: Option<String>,
}

/// Daily goals for each tracked macro
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroGoals {
    /// Calorie goal in kcal
    pub calories: MacroGoal,
    /// Protein goal in grams
    pub protein: MacroGoal,
    /// Carbohydrate goal in grams
    pub carbs: MacroGoal,
    /// Fat goal in grams
    pub fat: MacroGoal,
}

/// A single goal-bearing macro entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroGoal {
    /// Daily target value
    pub goal: f64,
}

/// The macro a plan adjustment should correct towards its goal
///
/// Calories are excluded: adjustments hold total calories steady while
/// correcting one of the remaining macros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacroTarget {
    /// Protein grams
    Protein,
    /// Carbohydrate grams
    Carbs,
    /// Fat grams
    Fat,
}

impl MacroTarget {
    /// String form used in prompt text
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Protein => "protein",
            Self::Carbs => "carbs",
            Self::Fat => "fat",
        }
    }
}

impl std::fmt::Display for MacroTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Plans and Meals
// ============================================================================

/// Goal-free macro totals or estimates
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroEstimate {
    /// Calories in kcal
    pub calories: f64,
    /// Protein in grams
    pub protein: f64,
    /// Carbohydrates in grams
    pub carbs: f64,
    /// Fat in grams
    pub fat: f64,
}

/// A single food item within a meal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItem {
    /// Item name
    pub name: String,
    /// Portion description (e.g., "150 g", "1 cup")
    pub portion: String,
    /// Calories in kcal
    pub calories: f64,
    /// Protein in grams
    pub protein: f64,
    /// Carbohydrates in grams
    pub carbs: f64,
    /// Fat in grams
    pub fat: f64,
}

/// A meal within a daily plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    /// Meal identifier
    pub id: String,
    /// Meal name (e.g., "Breakfast")
    pub name: String,
    /// Time of day (e.g., "08:00")
    pub time: String,
    /// Food items making up the meal
    #[serde(default)]
    pub items: Vec<FoodItem>,
    /// Aggregate calorie and macro totals
    pub totals: MacroEstimate,
}

/// One day of planned meals with aggregate totals
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPlan {
    /// Plan date (`YYYY-MM-DD`)
    pub date: String,
    /// Meals for the day
    #[serde(default)]
    pub meals: Vec<Meal>,
    /// Aggregate calorie and macro totals for the day
    pub totals: MacroEstimate,
    /// Water intake goal in milliliters
    pub water_goal: f64,
}

// ============================================================================
// Recipes
// ============================================================================

/// Recipe difficulty rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecipeDifficulty {
    /// Suitable for beginners
    Easy,
    /// Some cooking experience expected
    Medium,
    /// Advanced technique or timing required
    Hard,
}

/// A recipe returned by the recipe-search action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    /// Recipe identifier
    pub id: String,
    /// Recipe title
    pub title: String,
    /// Short description
    pub description: String,
    /// Preparation time description (e.g., "30 min")
    pub prep_time: String,
    /// Difficulty rating
    pub difficulty: RecipeDifficulty,
    /// Number of servings
    pub servings: u32,
    /// Ingredient list
    #[serde(default)]
    pub ingredients: Vec<String>,
    /// Step-by-step instructions
    #[serde(default)]
    pub instructions: Vec<String>,
    /// Nutritional summary as display text, not numeric values
    pub nutritional_info: String,
    /// Prompt for generating an illustrative image of the dish
    pub image_prompt: String,
}

// ============================================================================
// Chat
// ============================================================================

/// One prior turn of a chat conversation, as submitted by the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    /// Who produced the turn: `"user"` for the user, anything else for the AI
    pub sender: String,
    /// Turn text
    pub text: String,
}

impl ChatTurn {
    /// Whether this turn came from the user (as opposed to the model)
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.sender == "user"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_user_data_wire_format() {
        let json = serde_json::json!({
            "age": 31,
            "gender": "female",
            "height": 168.0,
            "weight": 64.5,
            "activityLevel": "moderate",
            "weightGoal": 60.0,
            "dietaryPreferences": {"diets": ["vegetarian"], "restrictions": []},
            "macros": {
                "calories": {"goal": 1800.0},
                "protein": {"goal": 120.0},
                "carbs": {"goal": 180.0},
                "fat": {"goal": 60.0}
            }
        });

        let user: UserData = serde_json::from_value(json).unwrap();
        assert_eq!(user.activity_level, "moderate");
        assert_eq!(user.dietary_preferences.diets, vec!["vegetarian"]);
        assert!(user.name.is_none());
        assert!(user.admin_settings.is_none());
        assert!((user.macros.protein.goal - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_daily_plan_defaults_meals() {
        let json = serde_json::json!({
            "date": "2024-01-01",
            "totals": {"calories": 0.0, "protein": 0.0, "carbs": 0.0, "fat": 0.0},
            "waterGoal": 2000.0
        });

        let plan: DailyPlan = serde_json::from_value(json).unwrap();
        assert!(plan.meals.is_empty());
        assert_eq!(plan.date, "2024-01-01");
    }

    #[test]
    fn test_macro_target_wire_names() {
        assert_eq!(
            serde_json::to_value(MacroTarget::Protein).unwrap(),
            serde_json::json!("protein")
        );
        let target: MacroTarget = serde_json::from_value(serde_json::json!("fat")).unwrap();
        assert_eq!(target, MacroTarget::Fat);
    }

    #[test]
    fn test_chat_turn_sender() {
        let user = ChatTurn {
            sender: "user".to_owned(),
            text: "hi".to_owned(),
        };
        let model = ChatTurn {
            sender: "ai".to_owned(),
            text: "hello".to_owned(),
        };
        assert!(user.is_user());
        assert!(!model.is_user());
    }
}
