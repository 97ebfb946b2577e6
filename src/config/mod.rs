// ABOUTME: Configuration management module for the Tredict client
// ABOUTME: Loads credentials, endpoints and local paths from JSON files or the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 The tredict developers

//! Configuration module
//!
//! Configuration is immutable once loaded. It can come from:
//!
//! - **Explicit credentials**: [`TredictConfig::new`] with defaults for everything else
//! - **JSON file**: [`TredictConfig::from_file`], keys named after the struct fields
//! - **Environment**: [`TredictConfig::from_env`], `TREDICT_*` variables
//!
//! File based loading still honours environment overrides so secrets can be kept
//! out of the file.

/// Tredict client configuration and credentials
pub mod tredict_config;

pub use tredict_config::{Credentials, TredictConfig};
