// ABOUTME: Prompt construction for every assistant action
// ABOUTME: Interpolates user profiles and payload data into natural-language instructions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

//! # Prompt Builders
//!
//! Natural-language prompt text for each assistant action. Exact wording is
//! a presentation detail, not a contract; what matters is which payload
//! fields each prompt embeds. Structured actions always close with an
//! instruction to respond with JSON only, reinforcing the structured-output
//! hint sent alongside the request.

use crate::models::{MacroTarget, UserData};

/// Render the user-profile block embedded in profile-bearing prompts
///
/// Includes the standing nutritionist instruction when one is configured.
#[must_use]
pub fn user_profile(user: &UserData) -> String {
    let name_line = user
        .name
        .as_deref()
        .map(|name| format!("- **Name:** {name}\n"))
        .unwrap_or_default();

    let diets = join_or_none(&user.dietary_preferences.diets);
    let restrictions = join_or_none(&user.dietary_preferences.restrictions);

    let standing_instruction = user
        .admin_settings
        .as_ref()
        .and_then(|settings| settings.permanent_prompt.as_deref())
        .map(|instruction| format!("\n### Standing Nutritionist Instruction:\n{instruction}"))
        .unwrap_or_default();

    format!(
        "### User Profile\n\
         {name_line}\
         - **Age:** {}, **Gender:** {}, **Height:** {} cm, **Current Weight:** {} kg\n\
         - **Activity Level:** {}, **Weight Goal:** {} kg\n\
         - **Preferences:** {diets}, **Restrictions:** {restrictions}\n\
         - **Macro Goals:** Calories: {} kcal, Protein: {} g, Carbs: {} g, Fat: {} g\
         {standing_instruction}",
        user.age,
        user.gender,
        user.height,
        user.weight,
        user.activity_level,
        user.weight_goal,
        user.macros.calories.goal,
        user.macros.protein.goal,
        user.macros.carbs.goal,
        user.macros.fat.goal,
    )
}

fn join_or_none(tags: &[String]) -> String {
    if tags.is_empty() {
        "None".to_owned()
    } else {
        tags.join(", ")
    }
}

/// Prompt for generating a full daily plan
#[must_use]
pub fn daily_plan(user: &UserData, date: &str) -> String {
    format!(
        "Based on the user's profile, generate a complete meal plan for {date}. \
         The plan must be detailed and aligned with the user's goals. Calculate calorie \
         and macro totals for each meal and for the whole day. \
         Respond ONLY with the DailyPlan JSON.\n{}",
        user_profile(user)
    )
}

/// Prompt for regenerating a daily plan as an alternative to an existing one
#[must_use]
pub fn regenerate_daily_plan(user: &UserData, date: &str, number_of_meals: Option<u32>) -> String {
    let meal_constraint = number_of_meals
        .map(|count| format!("The plan must have exactly {count} meals. "))
        .unwrap_or_default();

    format!(
        "Based on the user's profile, generate a new meal plan for {date}. \
         {meal_constraint}The plan must be an alternative to the original plan while \
         keeping the same goals. Respond ONLY with the DailyPlan JSON.\n{}",
        user_profile(user)
    )
}

/// Prompt for adjusting a plan towards one macro goal
///
/// The prior plan is embedded verbatim as JSON.
#[must_use]
pub fn adjust_plan_for_macro(user: &UserData, plan_json: &str, macro_to_fix: MacroTarget) -> String {
    format!(
        "Adjust this meal plan to get closer to the {macro_to_fix} goal. \
         Keep total calories as close to the goal as possible. Original plan:\n{plan_json}\n{}\n\
         Respond ONLY with the adjusted DailyPlan JSON.",
        user_profile(user)
    )
}

/// Prompt for generating a seven-day plan starting at the given date
///
/// Asks for an array so the router can own the date-keyed fold.
#[must_use]
pub fn weekly_plan(user: &UserData, week_start_date: &str, observation: Option<&str>) -> String {
    let observation_note = observation
        .map(|text| format!("Note from the user: {text} "))
        .unwrap_or_default();

    format!(
        "Create a meal plan for 7 days, starting on {week_start_date}. {observation_note}\
         Return a JSON array of 7 DailyPlan objects, one per day, each carrying its date \
         (YYYY-MM-DD). Respond ONLY with the JSON.\n{}",
        user_profile(user)
    )
}

/// Prompt for regenerating a single meal from a free-text instruction
#[must_use]
pub fn regenerate_meal(user: &UserData, meal_name: &str, instruction: &str) -> String {
    format!(
        "Regenerate the meal \"{meal_name}\" based on the following instruction: \
         \"{instruction}\". Calculate the new calorie and macro totals. \
         Respond ONLY with the Meal JSON.\n{}",
        user_profile(user)
    )
}

/// Prompt for converting free-text meal plans into structured plans
#[must_use]
pub fn parse_meal_plan(text: &str) -> String {
    format!(
        "Convert the following meal plan text into a structured JSON object in the \
         DailyPlan format. Respond ONLY with the JSON.\n\nText:\n{text}"
    )
}

/// Prompt for estimating macros from a meal description
#[must_use]
pub fn analyze_meal_text(description: &str) -> String {
    format!(
        "Analyze this meal description and return a macronutrient estimate with \
         calories, protein, carbs, and fat as numbers. Respond ONLY with the JSON.\n\n\
         Description: {description}"
    )
}

/// Instruction text sent alongside an inline meal photo
#[must_use]
pub const fn analyze_meal_image() -> &'static str {
    "Analyze this photo of a meal and return a macronutrient estimate with calories, \
     protein, carbs, and fat as numbers. Respond only with the JSON."
}

/// Prompt for suggesting a food substitution within a meal
#[must_use]
pub fn food_substitution(user: &UserData, item_name: &str, meal_name: &str) -> String {
    format!(
        "Suggest a substitute for the item \"{item_name}\" in the context of the meal \
         \"{meal_name}\". The substitute must have similar macros. \
         Respond ONLY with the new FoodItem JSON.\n{}",
        user_profile(user)
    )
}

/// Prompt for finding recipes matching a search query
///
/// Each recipe must carry an image prompt for the image generator.
#[must_use]
pub fn find_recipes(user: &UserData, query: &str, num_recipes: u32) -> String {
    format!(
        "Find {num_recipes} recipes based on the search: \"{query}\". For each recipe, \
         provide an image prompt optimized for an image generator. \
         Respond ONLY with a JSON array of recipe objects.\n{}",
        user_profile(user)
    )
}

/// Prompt for the motivational progress summary
#[must_use]
pub fn analyze_progress(user: &UserData) -> String {
    format!(
        "Analyze the user's progress data and provide a motivational summary with tips. \
         Speak directly to the user. Format the response in Markdown.\n{}",
        user_profile(user)
    )
}

/// Prompt for building a categorized shopping list from a weekly plan
///
/// The weekly plan is embedded verbatim as JSON.
#[must_use]
pub fn shopping_list(week_plan_json: &str) -> String {
    format!(
        "Create a detailed shopping list organized by categories (e.g., Fruits, \
         Vegetables, Meats) based on the following weekly meal plan. Format the \
         response in Markdown.\n{week_plan_json}"
    )
}

/// Prompt for answering a free-form food question
#[must_use]
pub fn food_info(question: &str, meal_context_json: Option<&str>) -> String {
    let context = meal_context_json
        .map(|json| format!(" Meal context: {json}."))
        .unwrap_or_default();

    format!(
        "Answer the following food question clearly and concisely. \
         Question: \"{question}\".{context} Format the response in Markdown."
    )
}
