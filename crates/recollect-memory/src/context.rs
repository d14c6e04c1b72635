// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded prompt context built from a user's most relevant memories.
//!
//! Ranking is delegated to the store's contextual retrieval. Both the
//! retrieval result and the rendered prompt are cached per (user, message)
//! in the general cache class.

use std::sync::Arc;

use recollect_config::model::ContextConfig;
use recollect_core::{MemoryRecord, MemoryStoreAdapter, RecollectError, UserId};
use tracing::{debug, warn};

use crate::cache::{CacheManager, UserContentKey};
use crate::hashing::{normalize, ContentFingerprint};
use crate::recording;

/// Returned when no stored memory is relevant to the message.
pub const DEFAULT_PROMPT: &str = "You have no stored memories about this user that relate to \
their message. Answer from the conversation itself, and ask about their preferences when \
personal context would help.";

const CONTEXT_HEADER: &str = "Here is what you remember about this user from earlier conversations:";

const CONTEXT_FOOTER: &str = "Use these details only where they are relevant to the reply, \
and do not repeat them back unless asked.";

pub struct PromptContextBuilder {
    store: Arc<dyn MemoryStoreAdapter>,
    caches: Arc<CacheManager>,
    max_memories: usize,
    max_chars: usize,
}

impl PromptContextBuilder {
    pub fn new(
        store: Arc<dyn MemoryStoreAdapter>,
        caches: Arc<CacheManager>,
        config: &ContextConfig,
    ) -> Self {
        Self {
            store,
            caches,
            max_memories: config.max_memories.max(1),
            max_chars: config.max_chars,
        }
    }

    /// Build the context block for `message`.
    ///
    /// A store failure degrades to [`DEFAULT_PROMPT`]; it is not cached.
    pub async fn build(&self, user: &UserId, message: &str) -> String {
        let key = UserContentKey::new(user, ContentFingerprint::of(&normalize(message)));
        if let Some(prompt) = self.caches.prompts.get(&key) {
            recording::record_prompt_cache_hit();
            debug!(user = %user, "prompt context served from cache");
            return prompt;
        }

        let memories = match self.relevant_memories(&key, message).await {
            Ok(memories) => memories,
            Err(e) => {
                warn!(user = %user, error = %e, "contextual retrieval failed, using default prompt");
                recording::record_fallback("context");
                return DEFAULT_PROMPT.to_string();
            }
        };

        let prompt = self.render(&memories);
        self.caches.prompts.insert(key, prompt.clone());
        prompt
    }

    async fn relevant_memories(
        &self,
        key: &UserContentKey,
        message: &str,
    ) -> Result<Vec<MemoryRecord>, RecollectError> {
        if let Some(records) = self.caches.retrievals.get(key) {
            return Ok(records);
        }
        let records = self
            .store
            .contextual_retrieve(&key.user, message, self.max_memories)
            .await?;
        self.caches.retrievals.insert(key.clone(), records.clone());
        Ok(records)
    }

    /// Join memory contents into one paragraph of at most `max_chars`
    /// characters and wrap it in the instruction template.
    pub fn render(&self, memories: &[MemoryRecord]) -> String {
        let mut paragraph = String::new();
        let mut used = 0;

        for memory in memories.iter().take(self.max_memories) {
            let text = memory.content.trim().trim_end_matches('.');
            if text.is_empty() {
                continue;
            }
            let sentence = format!("{text}.");
            let separator = usize::from(!paragraph.is_empty());
            let len = sentence.chars().count();

            if used + separator + len > self.max_chars {
                if paragraph.is_empty() {
                    // A single oversized memory is cut rather than dropped.
                    paragraph = sentence.chars().take(self.max_chars).collect();
                }
                break;
            }
            if separator == 1 {
                paragraph.push(' ');
            }
            paragraph.push_str(&sentence);
            used += separator + len;
        }

        if paragraph.is_empty() {
            return DEFAULT_PROMPT.to_string();
        }
        format!("{CONTEXT_HEADER}\n{paragraph}\n\n{CONTEXT_FOOTER}")
    }
}
