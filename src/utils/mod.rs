// ABOUTME: Utility modules for common functionality across the client
// ABOUTME: Contains shared HTTP client construction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 The tredict developers

/// HTTP client configuration and helpers
pub mod http_client;
