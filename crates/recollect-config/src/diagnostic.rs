// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics rendered with miette.
//!
//! Figment errors are turned into [`ConfigError`]s that point at the
//! offending line of the TOML file they came from and, for misspelled keys,
//! suggest the closest valid key (Jaro-Winkler).

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, GraphicalReportHandler, NamedSource, SourceSpan};
use thiserror::Error;

/// Keys scoring below this Jaro-Winkler similarity are never suggested.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Name used for configuration passed in as a string.
pub const INLINE_SOURCE: &str = "<inline>";

/// A TOML document that took part in loading, kept for span lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// A configuration problem, either from deserialization or from validation.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown key `{key}` in {}", section_label(.section))]
    #[diagnostic(
        code(recollect::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        /// Dotted section path, `None` at the top level.
        section: Option<String>,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a recollect setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("`{key}` has the wrong type: {detail}")]
    #[diagnostic(code(recollect::config::invalid_type), help("use a {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(recollect::config::missing_key),
        help("set `{key}` in recollect.toml or through RECOLLECT_* variables")
    )]
    MissingKey { key: String },

    /// Parsed fine but violates a semantic constraint.
    #[error("invalid configuration: {message}")]
    #[diagnostic(code(recollect::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(recollect::config::other))]
    Other(String),
}

fn section_label(section: &Option<String>) -> String {
    match section {
        Some(section) => format!("[{section}]"),
        None => "the top level".to_string(),
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(key) => format!("did you mean `{key}`? Known keys here: {valid_keys}"),
        None => format!("known keys here: {valid_keys}"),
    }
}

impl ConfigError {
    /// Convert one figment error, resolving its span against `sources`.
    fn from_figment(error: figment::error::Error, sources: &[SourceFile]) -> Self {
        use figment::error::Kind;

        let section: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();
        match &error.kind {
            Kind::UnknownField(field, expected) => {
                let (span, src) = locate(&error, &section, field, sources).unzip();
                ConfigError::UnknownKey {
                    key: field.clone(),
                    section: (!section.is_empty()).then(|| section.join(".")),
                    suggestion: suggest_key(field, expected),
                    valid_keys: expected.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: field.to_string(),
            },
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: section.join("."),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.clone(),
            },
            _ => ConfigError::Other(error.to_string()),
        }
    }
}

/// Split a figment error into one diagnostic per underlying problem.
pub fn figment_to_config_errors(err: figment::Error, sources: &[SourceFile]) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| ConfigError::from_figment(error, sources))
        .collect()
}

/// Span of `field` in the source file the error was read from.
fn locate(
    error: &figment::error::Error,
    section: &[String],
    field: &str,
    sources: &[SourceFile],
) -> Option<(SourceSpan, NamedSource<String>)> {
    let name = match error.metadata.as_ref()?.source.as_ref()? {
        figment::Source::File(path) => path.display().to_string(),
        _ => INLINE_SOURCE.to_string(),
    };
    let file = sources.iter().find(|file| file.name == name)?;
    let offset = find_key_offset(&file.content, section, field)?;
    Some((
        SourceSpan::new(offset.into(), field.len()),
        NamedSource::new(&file.name, file.content.clone()),
    ))
}

/// Byte offset of `field` inside the table named by `section`
/// (`["dedup", "weights"]` is the `[dedup.weights]` table, `[]` the top level).
pub fn find_key_offset(content: &str, section: &[String], field: &str) -> Option<usize> {
    let wanted = section.join(".");
    let mut current = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim();
        if let Some(header) = trimmed.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            current = header.trim().to_string();
        } else if current == wanted {
            let indent = line.len() - line.trim_start().len();
            let is_key = trimmed
                .strip_prefix(field)
                .is_some_and(|rest| rest.trim_start().starts_with('='));
            if is_key {
                return Some(offset + indent);
            }
        }
        offset += line.len();
    }

    None
}

/// The valid key closest to `unknown`, if any is close enough.
pub fn suggest_key<S: AsRef<str>>(unknown: &str, valid_keys: &[S]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (key.as_ref(), strsim::jaro_winkler(unknown, key.as_ref())))
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_string())
}

/// Render every error as a miette report.
pub fn render_report(errors: &[ConfigError]) -> String {
    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => out.push_str(&buf),
            Err(_) => out.push_str(&format!("Error: {error}\n")),
        }
    }
    out
}

/// Print [`render_report`] to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    eprint!("{}", render_report(errors));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn suggests_closest_threshold_key() {
        let valid = ["merge_threshold", "update_threshold", "similarity_floor"];
        assert_eq!(
            suggest_key("merge_treshold", &valid),
            Some("merge_threshold".to_string())
        );
        assert_eq!(
            suggest_key("update_treshold", &valid),
            Some("update_threshold".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_unrelated_key() {
        assert_eq!(suggest_key("zzzzzz", &["general_ttl_secs", "hash_ttl_secs"]), None);
    }

    #[test]
    fn finds_key_in_section() {
        let content = "[dedup]\nmerge_treshold = 0.7\n";
        let o = find_key_offset(content, &path(&["dedup"]), "merge_treshold").unwrap();
        assert_eq!(&content[o..o + 14], "merge_treshold");
    }

    #[test]
    fn finds_key_in_nested_table_not_parent() {
        let content = "[dedup]\njacard = 1\n\n[dedup.weights]\n  jacard = 0.3\n";
        let o = find_key_offset(content, &path(&["dedup", "weights"]), "jacard").unwrap();
        assert_eq!(o, content.rfind("jacard").unwrap());
    }

    #[test]
    fn ignores_key_in_other_sections() {
        let content = "[cache]\nhash_ttl_secs = 5\n[context]\nbogus = 1\n";
        assert_eq!(find_key_offset(content, &path(&["cache"]), "bogus"), None);
    }

    #[test]
    fn top_level_keys_stop_at_first_table() {
        let content = "bogus = 1\n[service]\nname = \"x\"\n";
        assert_eq!(find_key_offset(content, &[], "bogus"), Some(0));
        assert_eq!(find_key_offset(content, &[], "name"), None);
    }

    #[test]
    fn key_prefix_is_not_a_match() {
        let content = "[cache]\nhash_ttl_secs_extra = 5\n";
        assert_eq!(find_key_offset(content, &path(&["cache"]), "hash_ttl_secs"), None);
    }

    #[test]
    fn report_mentions_section_and_suggestion() {
        let errors = vec![ConfigError::UnknownKey {
            key: "merge_treshold".into(),
            section: Some("dedup".into()),
            suggestion: Some("merge_threshold".into()),
            valid_keys: "merge_threshold, update_threshold".into(),
            span: None,
            src: None,
        }];
        let report = render_report(&errors);
        assert!(report.contains("in [dedup]"), "{report}");
        assert!(report.contains("did you mean"), "{report}");
        assert!(report.contains("merge_threshold"), "{report}");
    }
}
