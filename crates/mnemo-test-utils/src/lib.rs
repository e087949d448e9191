// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Mnemo integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockEmbedder`] - Deterministic bag-of-words embedder with failure injection
//! - [`FlakyIndex`] - Index wrapper that fails selected operations on demand
//! - [`TestHarness`] - Temp directory plus a ready-to-use configuration

pub mod flaky_index;
pub mod harness;
pub mod mock_embedder;

pub use flaky_index::FlakyIndex;
pub use harness::TestHarness;
pub use mock_embedder::MockEmbedder;
