// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory record fixtures.

use chrono::{DateTime, Duration, Utc};
use recollect_core::{MemoryId, MemoryRecord, UserId};

/// An active record created now, with a unique placeholder semantic hash.
pub fn record(user: &str, content: &str) -> MemoryRecord {
    record_at(user, content, Utc::now())
}

/// An active record created `hours` ago.
pub fn record_aged(user: &str, content: &str, hours: i64) -> MemoryRecord {
    record_at(user, content, Utc::now() - Duration::hours(hours))
}

pub fn record_at(user: &str, content: &str, created_at: DateTime<Utc>) -> MemoryRecord {
    let id = MemoryId::generate();
    MemoryRecord {
        semantic_hash: format!("fixture-{id}"),
        id,
        user_id: UserId::new(user),
        content: content.to_string(),
        is_active: true,
        created_at,
        updated_at: created_at,
    }
}
