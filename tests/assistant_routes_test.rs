// ABOUTME: Integration tests for the assistant action endpoint
// ABOUTME: Drives the router with a scripted provider; no network involved
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod helpers;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::Router;
use serde_json::{json, Value};

use helpers::axum_test::AxumTestRequest;
use helpers::mock_provider::MockProvider;
use nutriplan_server::config::ServerConfig;
use nutriplan_server::llm::{CompletionProvider, MessagePart};
use nutriplan_server::server::{build_router, AppState};

// ============================================================================
// Test Helpers
// ============================================================================

fn setup(provider: MockProvider) -> (Router, Arc<MockProvider>) {
    let provider = Arc::new(provider);
    let dyn_provider: Arc<dyn CompletionProvider> = provider.clone();
    let state = Arc::new(AppState::new(dyn_provider, ServerConfig::default()));
    (build_router(state), provider)
}

fn user_json() -> Value {
    json!({
        "name": "Ana",
        "age": 31,
        "gender": "female",
        "height": 168.0,
        "weight": 64.5,
        "activityLevel": "moderate",
        "weightGoal": 60.0,
        "dietaryPreferences": {"diets": ["vegetarian"], "restrictions": ["lactose"]},
        "macros": {
            "calories": {"goal": 1800.0},
            "protein": {"goal": 120.0},
            "carbs": {"goal": 180.0},
            "fat": {"goal": 60.0}
        }
    })
}

fn envelope(action: &str, payload: Value) -> Value {
    json!({ "action": action, "payload": payload })
}

// ============================================================================
// Envelope Validation
// ============================================================================

#[tokio::test]
async fn test_unknown_action_never_reaches_the_provider() {
    let (router, provider) = setup(MockProvider::default());

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope("doesNotExist", json!({})))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("doesNotExist"));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_missing_action_is_rejected() {
    let (router, provider) = setup(MockProvider::default());

    let response = AxumTestRequest::post("/api/assistant")
        .json(&json!({ "payload": {} }))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"], "Action is required");
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_payload_names_the_action() {
    let (router, provider) = setup(MockProvider::default());

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope("parseMealPlanText", json!({})))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("parseMealPlanText"));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_non_post_method_is_rejected() {
    let (router, _provider) = setup(MockProvider::default());

    let response = AxumTestRequest::get("/api/assistant").send(router).await;

    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json();
    assert_eq!(body["error"], "Method not allowed");
}

// ============================================================================
// Structured JSON Actions
// ============================================================================

#[tokio::test]
async fn test_generate_daily_plan_strips_fences_and_sanitizes() {
    let plan = "```json\n{\"date\":\"2024-03-01\",\"meals\":null,\
                \"totals\":{\"calories\":1800,\"protein\":120,\"carbs\":180,\"fat\":60},\
                \"waterGoal\":2000}\n```";
    let (router, provider) = setup(MockProvider::text(plan));

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope(
            "generateDailyPlan",
            json!({ "userData": user_json(), "dateString": "2024-03-01" }),
        ))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["result"]["date"], "2024-03-01");
    // Null array fields are sanitized to empty arrays.
    assert_eq!(body["result"]["meals"], json!([]));

    // The prompt embeds the target date and the profile, and the request
    // carries the structured-output hint.
    let requests = provider.recorded_requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].json_mode);
    let prompt = requests[0].messages[0].text().unwrap().to_owned();
    assert!(prompt.contains("2024-03-01"));
    assert!(prompt.contains("Protein: 120 g"));
    assert!(prompt.contains("vegetarian"));
    assert!(prompt.contains("lactose"));
}

#[tokio::test]
async fn test_empty_completion_is_reported_before_parsing() {
    let (router, _provider) = setup(MockProvider::text(""));

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope(
            "analyzeMealFromText",
            json!({ "description": "rice and beans" }),
        ))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "AI returned an empty response");
}

#[tokio::test]
async fn test_malformed_completion_is_distinguished_from_empty() {
    let (router, _provider) = setup(MockProvider::text("{\"calories\": "));

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope(
            "analyzeMealFromText",
            json!({ "description": "rice and beans" }),
        ))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "AI returned malformed JSON");
}

#[tokio::test]
async fn test_food_substitution_relays_structured_result() {
    let substitute = "{\"name\":\"quinoa\",\"portion\":\"100 g\",\
                      \"calories\":120,\"protein\":4.4,\"carbs\":21.3,\"fat\":1.9}";
    let (router, provider) = setup(MockProvider::text(substitute));

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope(
            "getFoodSubstitution",
            json!({
                "itemToSwap": {"name": "rice", "portion": "100 g",
                               "calories": 130.0, "protein": 2.7, "carbs": 28.0, "fat": 0.3},
                "mealContext": {"id": "m1", "name": "Lunch", "time": "12:00", "items": [],
                                "totals": {"calories": 600.0, "protein": 40.0,
                                           "carbs": 60.0, "fat": 20.0}},
                "userData": user_json()
            }),
        ))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["result"]["name"], "quinoa");

    let requests = provider.recorded_requests();
    let prompt = requests[0].messages[0].text().unwrap().to_owned();
    assert!(prompt.contains("rice"));
    assert!(prompt.contains("Lunch"));
}

// ============================================================================
// Weekly Plan Folding
// ============================================================================

#[tokio::test]
async fn test_weekly_plan_folds_array_last_write_wins() {
    let week = "[{\"date\":\"2024-01-01\",\"waterGoal\":1000},\
                 {\"date\":\"2024-01-02\",\"waterGoal\":2000},\
                 {\"waterGoal\":9000},\
                 {\"date\":\"2024-01-01\",\"waterGoal\":3000}]";
    let (router, _provider) = setup(MockProvider::text(week));

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope(
            "generateWeeklyPlan",
            json!({ "userData": user_json(), "weekStartDate": "2024-01-01" }),
        ))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let week = body["result"].as_object().unwrap();
    assert_eq!(week.len(), 2);
    assert_eq!(week["2024-01-01"]["waterGoal"], json!(3000));
    assert_eq!(week["2024-01-02"]["waterGoal"], json!(2000));
}

#[tokio::test]
async fn test_weekly_plan_rejects_non_array_response() {
    let (router, _provider) = setup(MockProvider::text("{\"2024-01-01\": {}}"));

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope(
            "generateWeeklyPlan",
            json!({ "userData": user_json(), "weekStartDate": "2024-01-01" }),
        ))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("array"));
}

// ============================================================================
// Plain Text Actions
// ============================================================================

#[tokio::test]
async fn test_progress_analysis_relays_plain_text() {
    let summary = "## Great progress!\nKeep your protein intake up.";
    let (router, provider) = setup(MockProvider::text(summary));

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope("analyzeProgress", json!({ "userData": user_json() })))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["result"], summary);

    // Plain-text actions do not request JSON output.
    let requests = provider.recorded_requests();
    assert!(!requests[0].json_mode);
}

#[tokio::test]
async fn test_plain_text_empty_completion_fails() {
    let (router, _provider) = setup(MockProvider::text("  \n"));

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope(
            "getFoodInfo",
            json!({ "question": "Is rice gluten-free?" }),
        ))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["error"], "AI returned an empty response");
}

// ============================================================================
// Image Analysis (vision input)
// ============================================================================

#[tokio::test]
async fn test_meal_photo_is_sent_as_inline_image() {
    let estimate = "{\"calories\":420,\"protein\":22,\"carbs\":48,\"fat\":14}";
    let (router, provider) = setup(MockProvider::text(estimate));

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope(
            "analyzeMealFromImage",
            json!({ "imageDataUrl": "data:image/png;base64,AAAA" }),
        ))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["result"]["calories"], json!(420));

    let requests = provider.recorded_requests();
    let parts = &requests[0].messages[0].parts;
    assert_eq!(parts.len(), 2);
    assert!(matches!(&parts[1], MessagePart::InlineImage(image)
        if image.mime_type == "image/png" && image.data == "AAAA"));
}

#[tokio::test]
async fn test_meal_photo_with_malformed_data_url_is_rejected() {
    let (router, provider) = setup(MockProvider::default());

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope(
            "analyzeMealFromImage",
            json!({ "imageDataUrl": "not-a-data-url" }),
        ))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Invalid image data"));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_meal_photo_without_mime_type_is_rejected() {
    let (router, provider) = setup(MockProvider::default());

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope(
            "analyzeMealFromImage",
            json!({ "imageDataUrl": "data:;base64,AAAA" }),
        ))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("MIME type"));
    assert_eq!(provider.call_count(), 0);
}

// ============================================================================
// Image Generation
// ============================================================================

#[tokio::test]
async fn test_generate_image_relays_base64_bytes() {
    let (router, _provider) = setup(MockProvider::image("QUJDREVG"));

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope(
            "generateImageFromPrompt",
            json!({ "prompt": "a bowl of salad, overhead shot" }),
        ))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["result"], "QUJDREVG");
}

#[tokio::test]
async fn test_generate_image_failure_propagates_message() {
    use nutriplan_server::errors::AppError;

    let (router, _provider) = setup(MockProvider::image_failing(AppError::external_service(
        "Gemini",
        "The AI could not generate an image",
    )));

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope("generateImageFromPrompt", json!({ "prompt": "salad" })))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("could not generate an image"));
}

// ============================================================================
// Upstream Failure Propagation
// ============================================================================

#[tokio::test]
async fn test_provider_error_propagates_with_its_message() {
    use nutriplan_server::errors::AppError;

    let (router, _provider) = setup(MockProvider::failing(AppError::external_service(
        "Gemini",
        "API error (401): invalid credential",
    )));

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope(
            "parseMealPlanText",
            json!({ "text": "breakfast: eggs" }),
        ))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("invalid credential"));
}

#[tokio::test]
async fn test_recipes_relay_image_prompts() {
    let recipes = "[{\"id\":\"r1\",\"title\":\"Grilled salmon\",\
                    \"description\":\"Quick dinner\",\"prepTime\":\"25 min\",\
                    \"difficulty\":\"Easy\",\"servings\":2,\
                    \"ingredients\":[\"salmon\"],\"instructions\":[\"grill it\"],\
                    \"nutritionalInfo\":\"420 kcal per serving\",\
                    \"imagePrompt\":\"grilled salmon fillet on a plate\"}]";
    let (router, _provider) = setup(MockProvider::text(recipes));

    let response = AxumTestRequest::post("/api/assistant")
        .json(&envelope(
            "findRecipes",
            json!({ "query": "salmon dinner", "userData": user_json(), "numRecipes": 1 }),
        ))
        .send(router)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(
        body["result"][0]["imagePrompt"],
        "grilled salmon fillet on a plate"
    );
}
