// ABOUTME: Shared helpers for integration tests
// ABOUTME: Axum request builder and the scripted mock completion provider
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 NutriPlan Contributors

// Not every test binary uses every helper.
#[allow(dead_code)]
pub mod axum_test;
#[allow(dead_code)]
pub mod mock_provider;
