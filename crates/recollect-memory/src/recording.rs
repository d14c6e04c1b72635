// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any installed recorder can collect these
//! metrics. Without a recorder every call is a no-op.

use metrics::describe_counter;

use crate::types::{DedupAction, HashSource};

/// Register all recollect metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "recollect_decisions_total",
        "Deduplication decisions by action"
    );
    describe_counter!(
        "recollect_hash_source_total",
        "Semantic hashes by source (cached, embedding, content, fallback)"
    );
    describe_counter!(
        "recollect_fallbacks_total",
        "Degraded-mode fallbacks by component"
    );
    describe_counter!(
        "recollect_inflight_joins_total",
        "Callers that joined an in-flight deduplication instead of starting one"
    );
    describe_counter!(
        "recollect_cache_evictions_total",
        "Expired cache entries removed by sweeps"
    );
    describe_counter!(
        "recollect_prompt_cache_hits_total",
        "Prompt context requests served from cache"
    );
}

pub fn record_decision(action: DedupAction) {
    metrics::counter!("recollect_decisions_total", "action" => action.to_string()).increment(1);
}

pub fn record_hash_source(source: &HashSource) {
    metrics::counter!("recollect_hash_source_total", "source" => source.label()).increment(1);
}

/// Record a degraded-mode fallback in `component` (hasher, decision, store, context).
pub fn record_fallback(component: &'static str) {
    metrics::counter!("recollect_fallbacks_total", "component" => component).increment(1);
}

pub fn record_inflight_join() {
    metrics::counter!("recollect_inflight_joins_total").increment(1);
}

pub fn record_evictions(count: usize) {
    metrics::counter!("recollect_cache_evictions_total").increment(count as u64);
}

pub fn record_prompt_cache_hit() {
    metrics::counter!("recollect_prompt_cache_hits_total").increment(1);
}
