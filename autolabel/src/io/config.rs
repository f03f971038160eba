//! Labeler rules stored in `.github/auto-label.json`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::glob::{CompiledRules, compile_pattern};
use crate::core::policy::ruled_labels;
use crate::core::types::{LabelSet, RuleTable};

/// Repository-relative location of the rules file.
pub const CONFIG_PATH: &str = ".github/auto-label.json";

const CONFIG_SCHEMA: &str = include_str!("../../schemas/auto_label.schema.json");

/// Labeler configuration (JSON).
///
/// `rules` maps a label name to a glob or a list of globs. Unknown top-level
/// keys are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelerConfig {
    pub rules: RuleTable,
}

impl LabelerConfig {
    /// Check label names and patterns beyond what the schema can express.
    pub fn validate(&self) -> Result<()> {
        let errors = self.violations();
        if errors.is_empty() {
            return Ok(());
        }
        Err(anyhow!("invalid rules:\n- {}", errors.join("\n- ")))
    }

    fn violations(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (label, spec) in &self.rules {
            if label.trim().is_empty() {
                errors.push("label name must not be blank".to_string());
            } else if label.trim() != label {
                errors.push(format!(
                    "label '{label}' has leading or trailing whitespace"
                ));
            }
            if spec.patterns().is_empty() {
                errors.push(format!("label '{label}' has an empty pattern list"));
            }
            for pattern in spec.patterns() {
                if pattern.trim().is_empty() {
                    errors.push(format!("label '{label}' has a blank pattern"));
                } else if let Err(err) = compile_pattern(pattern) {
                    errors.push(format!("label '{label}': {err}"));
                }
            }
        }
        errors
    }

    /// Compile all rule patterns for classification.
    pub fn compile(&self) -> Result<CompiledRules> {
        CompiledRules::compile(&self.rules).map_err(|err| anyhow!(err))
    }

    /// Labels governed by a rule.
    pub fn ruled_labels(&self) -> LabelSet {
        ruled_labels(&self.rules)
    }
}

/// Parse and validate config contents: schema conformance + rule checks.
pub fn parse_config(contents: &str) -> Result<LabelerConfig> {
    let value: Value = serde_json::from_str(contents).context("parse config json")?;
    validate_schema(&value)?;
    let config: LabelerConfig =
        serde_json::from_value(value).context("deserialize config")?;
    config.validate()?;
    Ok(config)
}

/// Load config from disk.
///
/// Returns `Ok(None)` when the file does not exist: the labeler is simply not
/// enabled for this repository.
pub fn load_config(path: &Path) -> Result<Option<LabelerConfig>> {
    if !path.exists() {
        debug!(path = %path.display(), "config file absent");
        return Ok(None);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let config = parse_config(&contents).with_context(|| format!("load {}", path.display()))?;
    debug!(rules = config.rules.len(), "config loaded");
    Ok(Some(config))
}

fn validate_schema(instance: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(CONFIG_SCHEMA).context("parse config schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(anyhow!(
            "config schema validation failed:\n- {}",
            messages.join("\n- ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PatternSpec;

    #[test]
    fn load_missing_returns_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        let loaded = load_config(&temp.path().join(CONFIG_PATH)).expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn load_reads_string_and_list_rules() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("auto-label.json");
        fs::write(
            &path,
            r#"{"rules": {"docs": "docs/**", "ci": [".github/**", "*.yml"]}}"#,
        )
        .expect("write");

        let cfg = load_config(&path).expect("load").expect("present");
        assert_eq!(cfg.rules["docs"], PatternSpec::from("docs/**"));
        assert_eq!(cfg.rules["ci"], PatternSpec::from(vec![".github/**", "*.yml"]));
        let ruled_set = cfg.ruled_labels();
        let ruled: Vec<&str> = ruled_set.iter().map(String::as_str).collect();
        assert_eq!(ruled, vec!["ci", "docs"]);
    }

    #[test]
    fn empty_rules_are_valid() {
        let cfg = parse_config(r#"{"rules": {}}"#).expect("parse");
        assert!(cfg.rules.is_empty());
        assert!(cfg.compile().expect("compile").is_empty());
    }

    #[test]
    fn missing_rules_key_fails_schema() {
        let err = parse_config(r#"{"labels": {}}"#).expect_err("schema error");
        assert!(format!("{err:#}").contains("schema validation failed"));
    }

    #[test]
    fn empty_pattern_list_fails_schema() {
        let err = parse_config(r#"{"rules": {"docs": []}}"#).expect_err("schema error");
        assert!(format!("{err:#}").contains("schema validation failed"));
    }

    #[test]
    fn non_string_pattern_fails_schema() {
        let err = parse_config(r#"{"rules": {"docs": 3}}"#).expect_err("schema error");
        assert!(format!("{err:#}").contains("schema validation failed"));
    }

    #[test]
    fn invalid_glob_is_rejected_at_load() {
        let err = parse_config(r#"{"rules": {"docs": ["docs/**", "src/[" ]}}"#)
            .expect_err("glob error");
        let message = format!("{err:#}");
        assert!(message.contains("label 'docs'"), "{message}");
        assert!(message.contains("src/["), "{message}");
    }

    #[test]
    fn blank_label_and_padded_label_are_rejected() {
        let err = parse_config(r#"{"rules": {" ": "a", " docs": "docs/**"}}"#)
            .expect_err("label errors");
        let message = format!("{err:#}");
        assert!(message.contains("must not be blank"), "{message}");
        assert!(message.contains("leading or trailing whitespace"), "{message}");
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = parse_config("{ rules: ").expect_err("json error");
        assert!(format!("{err:#}").contains("parse config json"));
    }
}
