// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory id generation.
//!
//! Format: `mem_<unix-nanos>_<counter>_<8 hex>`. The process-wide counter
//! makes ids distinct within one process even when the clock does not
//! advance between calls; the random suffix separates processes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh memory id.
pub fn generate_id() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let suffix: u32 = rand::thread_rng().r#gen();
    format!("mem_{nanos}_{seq}_{suffix:08x}")
}
