//! CFG export: grammar text prepared for grammar-constrained LLM tools.
//!
//! Pure string and JSON shaping. Nothing here talks to a provider.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

/// Grammar syntax advertised in a CFG tool payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CfgSyntax {
    #[default]
    Lark,
    Regex,
}

impl CfgSyntax {
    pub fn as_str(self) -> &'static str {
        match self {
            CfgSyntax::Lark => "lark",
            CfgSyntax::Regex => "regex",
        }
    }
}

/// Drop `%` directive lines and blank lines. Kept lines are unchanged.
pub fn clean_grammar_for_cfg(grammar: &str) -> String {
    grammar
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('%')
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text format to pair with a CFG tool: the model's output is DSL source,
/// not JSON.
pub fn text_format() -> JsonValue {
    json!({ "format": { "type": "text" } })
}

/// A custom tool whose output is constrained by a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfgTool {
    pub name: String,
    pub description: String,
    pub grammar: String,
    #[serde(default)]
    pub syntax: CfgSyntax,
}

impl CfgTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        grammar: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            grammar: grammar.into(),
            syntax: CfgSyntax::default(),
        }
    }

    pub fn with_syntax(mut self, syntax: CfgSyntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Tool payload with the grammar cleaned for CFG use.
    pub fn build_tool(&self) -> JsonValue {
        json!({
            "type": "custom",
            "name": self.name,
            "description": self.description,
            "format": {
                "type": "grammar",
                "syntax": self.syntax.as_str(),
                "definition": clean_grammar_for_cfg(&self.grammar),
            },
        })
    }

    /// `{"tool": ..., "text": ...}`, ready to merge into a request body.
    pub fn request_config(&self) -> JsonValue {
        json!({
            "tool": self.build_tool(),
            "text": text_format(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::DEFAULT_GRAMMAR;

    #[test]
    fn strips_directives_and_blank_lines() {
        let grammar = "start: call\n\n%import common.WS\n  %ignore WS\ncall: NAME\n";
        assert_eq!(clean_grammar_for_cfg(grammar), "start: call\ncall: NAME");
    }

    #[test]
    fn keeps_indentation_of_kept_lines() {
        assert_eq!(
            clean_grammar_for_cfg("rule: a\n    | b"),
            "rule: a\n    | b"
        );
    }

    #[test]
    fn default_grammar_has_no_directives_after_cleaning() {
        let cleaned = clean_grammar_for_cfg(DEFAULT_GRAMMAR);
        assert!(!cleaned.is_empty());
        assert!(cleaned.lines().all(|l| !l.trim_start().starts_with('%')));
    }

    #[test]
    fn tool_payload_shape() {
        let tool = CfgTool::new("music_dsl", "Builds tracks", "%import x\nstart: call");
        assert_eq!(
            tool.build_tool(),
            json!({
                "type": "custom",
                "name": "music_dsl",
                "description": "Builds tracks",
                "format": {"type": "grammar", "syntax": "lark", "definition": "start: call"}
            })
        );
    }

    #[test]
    fn regex_syntax() {
        let tool = CfgTool::new("ids", "digits", r"\d+").with_syntax(CfgSyntax::Regex);
        assert_eq!(tool.build_tool()["format"]["syntax"], "regex");
    }

    #[test]
    fn request_config_pairs_tool_and_text() {
        let config = CfgTool::new("t", "d", "start: call").request_config();
        assert_eq!(config["text"], text_format());
        assert_eq!(config["tool"]["type"], "custom");
    }
}
