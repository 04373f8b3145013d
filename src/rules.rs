//! Naming rule sets: category-tagged patterns with file-scoped context rules.
//!
//! A rule set is configured as data (`PatternSpec`) and compiled once into
//! `NamingPattern`s. Compilation is where regex and glob errors surface; the
//! matcher only ever sees compiled rules.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use globset::{Glob, GlobMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::{Category, Severity};

/// Characters that make a glob segment match more than one literal path.
const GLOB_META: &[char] = &['*', '?', '[', ']', '{', '}', '!'];

/// Serialized form of a validator predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ValidatorSpec {
    /// Accept every hit.
    #[default]
    Always,
    /// Accept when the surrounding line contains `text`.
    ContextContains {
        /// Required substring.
        text: String,
    },
    /// Accept when the surrounding line does not contain `text`.
    ContextLacks {
        /// Forbidden substring.
        text: String,
    },
    /// Accept when the matched text matches `regex`.
    Matches {
        /// Regular expression applied to the matched text.
        regex: String,
    },
}

/// Serialized form of a context rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRuleSpec {
    /// File glob the rule applies to, matched against the relative path.
    pub glob: String,
    /// Replacement template; `$1`, `${name}` expand capture groups.
    pub replacement: String,
    /// Severity reported when this rule applies.
    #[serde(default = "default_rule_severity")]
    pub severity: Severity,
    /// Predicate deciding whether this rule applies to a given hit.
    #[serde(default)]
    pub validator: ValidatorSpec,
}

/// Serialized form of a naming pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    /// Vocabulary this pattern polices.
    pub category: Category,
    /// Canonical correct format, for humans.
    #[serde(default)]
    pub correct: String,
    /// Stable identifier reported on every match.
    pub id: String,
    /// Regular expressions describing incorrect names.
    pub incorrect: Vec<String>,
    /// Context rules, in declaration order.
    #[serde(default)]
    pub rules: Vec<ContextRuleSpec>,
}

const fn default_rule_severity() -> Severity {
    return Severity::Medium;
}

/// Predicate over `(matched_text, surrounding_context)`.
#[derive(Clone)]
pub enum Validator {
    /// Accept every hit.
    Always,
    /// Accept when the context contains the substring.
    ContextContains(String),
    /// Accept when the context lacks the substring.
    ContextLacks(String),
    /// Caller-supplied predicate, for rule sets built in code.
    Custom(Arc<dyn Fn(&str, &str) -> bool + Send + Sync>),
    /// Accept when the matched text matches.
    Matches(Regex),
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return match self {
            Self::Always => f.write_str("Always"),
            Self::ContextContains(text) => f.debug_tuple("ContextContains").field(text).finish(),
            Self::ContextLacks(text) => f.debug_tuple("ContextLacks").field(text).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
            Self::Matches(re) => f.debug_tuple("Matches").field(&re.as_str()).finish(),
        };
    }
}

impl Validator {
    /// Evaluate the predicate.
    pub fn accepts(&self, matched: &str, context: &str) -> bool {
        return match self {
            Self::Always => true,
            Self::ContextContains(text) => context.contains(text.as_str()),
            Self::ContextLacks(text) => !context.contains(text.as_str()),
            Self::Custom(predicate) => predicate(matched, context),
            Self::Matches(re) => re.is_match(matched),
        };
    }

    /// Compile a serialized validator.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if a `matches` regex does not compile.
    fn compile(spec: &ValidatorSpec, pattern: &str) -> Result<Self, Error> {
        return Ok(match spec {
            ValidatorSpec::Always => Self::Always,
            ValidatorSpec::ContextContains { text } => Self::ContextContains(text.clone()),
            ValidatorSpec::ContextLacks { text } => Self::ContextLacks(text.clone()),
            ValidatorSpec::Matches { regex } => Self::Matches(compile_regex(regex, pattern)?),
        });
    }
}

/// Decides whether and how to suggest a fix for hits in matching files.
#[derive(Debug, Clone)]
pub struct ContextRule {
    /// The glob as written.
    pub glob: String,
    /// Compiled glob.
    matcher: GlobMatcher,
    /// Replacement template.
    pub replacement: String,
    /// Severity reported when this rule applies.
    pub severity: Severity,
    /// Literal character count of the glob; higher is more specific.
    pub specificity: usize,
    /// Applicability predicate.
    pub validator: Validator,
}

impl ContextRule {
    /// Build a rule directly in code.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidGlob` if `glob` does not compile.
    pub fn new(
        glob: &str,
        replacement: &str,
        severity: Severity,
        validator: Validator,
    ) -> Result<Self, Error> {
        let matcher = compile_glob(glob, "<inline>")?;
        return Ok(Self {
            glob: glob.to_string(),
            matcher,
            replacement: replacement.to_string(),
            severity,
            specificity: glob_specificity(glob),
            validator,
        });
    }

    /// Whether this rule covers the given relative path.
    pub fn applies_to(&self, path: &Path) -> bool {
        let normalized = path.to_string_lossy().replace('\\', "/");
        return self.matcher.is_match(normalized.as_str());
    }
}

/// A compiled naming pattern.
#[derive(Debug, Clone)]
pub struct NamingPattern {
    /// Vocabulary this pattern polices.
    pub category: Category,
    /// Canonical correct format.
    pub correct: String,
    /// Stable identifier.
    pub id: String,
    /// Compiled incorrect-name expressions.
    pub incorrect: Vec<Regex>,
    /// Context rules, in declaration order.
    pub rules: Vec<ContextRule>,
}

impl NamingPattern {
    /// Compile a serialized pattern.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` for a bad regex or an empty
    /// `incorrect` list, `Error::InvalidGlob` for a bad rule glob.
    pub fn compile(spec: &PatternSpec) -> Result<Self, Error> {
        if spec.incorrect.is_empty() {
            return Err(Error::InvalidPattern {
                pattern: spec.id.clone(),
                reason: "no incorrect expressions".to_string(),
            });
        }

        let incorrect = spec
            .incorrect
            .iter()
            .map(|re| compile_regex(re, &spec.id))
            .collect::<Result<Vec<_>, _>>()?;

        let mut rules = Vec::with_capacity(spec.rules.len());
        for rule in &spec.rules {
            rules.push(ContextRule {
                glob: rule.glob.clone(),
                matcher: compile_glob(&rule.glob, &spec.id)?,
                replacement: rule.replacement.clone(),
                severity: rule.severity,
                specificity: glob_specificity(&rule.glob),
                validator: Validator::compile(&rule.validator, &spec.id)?,
            });
        }

        return Ok(Self {
            category: spec.category,
            correct: spec.correct.clone(),
            id: spec.id.clone(),
            incorrect,
            rules,
        });
    }

    /// The most specific rule whose glob covers `path` and whose validator
    /// accepts the hit. Ties go to the rule declared first.
    pub fn resolve_rule(&self, path: &Path, matched: &str, context: &str) -> Option<&ContextRule> {
        let mut best: Option<&ContextRule> = None;
        for rule in &self.rules {
            if !rule.applies_to(path) || !rule.validator.accepts(matched, context) {
                continue;
            }
            if best.is_none_or(|b| rule.specificity > b.specificity) {
                best = Some(rule);
            }
        }
        return best;
    }
}

/// An ordered set of compiled patterns.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    /// Patterns in declaration order.
    pub patterns: Vec<NamingPattern>,
}

impl RuleSet {
    /// Compile every pattern, failing on the first bad one.
    ///
    /// # Errors
    ///
    /// Returns the first compilation error encountered.
    pub fn compile(specs: &[PatternSpec]) -> Result<Self, Error> {
        let patterns = specs.iter().map(NamingPattern::compile).collect::<Result<Vec<_>, _>>()?;
        return Ok(Self { patterns });
    }

    /// Whether no patterns are configured.
    pub const fn is_empty(&self) -> bool {
        return self.patterns.is_empty();
    }

    /// Number of configured patterns.
    pub const fn len(&self) -> usize {
        return self.patterns.len();
    }
}

/// Count of characters in a glob that match only themselves.
fn glob_specificity(glob: &str) -> usize {
    return glob.chars().filter(|c| !GLOB_META.contains(c)).count();
}

/// # Errors
///
/// Returns `Error::InvalidGlob` with the owning pattern id.
fn compile_glob(glob: &str, pattern: &str) -> Result<GlobMatcher, Error> {
    return Glob::new(glob)
        .map(|g| g.compile_matcher())
        .map_err(|e| Error::InvalidGlob {
            glob: glob.to_string(),
            pattern: pattern.to_string(),
            reason: e.to_string(),
        });
}

/// # Errors
///
/// Returns `Error::InvalidPattern` with the owning pattern id.
fn compile_regex(re: &str, pattern: &str) -> Result<Regex, Error> {
    return Regex::new(re).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with_rules(rules: Vec<ContextRuleSpec>) -> PatternSpec {
        PatternSpec {
            category: Category::Environment,
            correct: "APP_<NAME>".to_string(),
            id: "env-prefix".to_string(),
            incorrect: vec![r"\bWRONG_([A-Z]+)\b".to_string()],
            rules,
        }
    }

    fn rule(glob: &str, replacement: &str) -> ContextRuleSpec {
        ContextRuleSpec {
            glob: glob.to_string(),
            replacement: replacement.to_string(),
            severity: Severity::High,
            validator: ValidatorSpec::Always,
        }
    }

    #[test]
    fn most_specific_glob_wins() {
        let pattern = NamingPattern::compile(&spec_with_rules(vec![
            rule("*", "GENERIC_$1"),
            rule("src/*.ts", "APP_$1"),
            rule("*.ts", "TS_$1"),
        ]))
        .unwrap();

        let chosen = pattern.resolve_rule(Path::new("src/app.ts"), "WRONG_KEY", "").unwrap();
        assert_eq!(chosen.replacement, "APP_$1");
    }

    #[test]
    fn ties_go_to_first_declared() {
        let pattern = NamingPattern::compile(&spec_with_rules(vec![
            rule("*.ts", "FIRST_$1"),
            rule("*.ts", "SECOND_$1"),
        ]))
        .unwrap();

        let chosen = pattern.resolve_rule(Path::new("a.ts"), "WRONG_KEY", "").unwrap();
        assert_eq!(chosen.replacement, "FIRST_$1");
    }

    #[test]
    fn validator_can_veto_a_rule() {
        let mut lacks = rule("*.ts", "APP_$1");
        lacks.validator = ValidatorSpec::ContextLacks { text: "legacy".to_string() };
        let pattern = NamingPattern::compile(&spec_with_rules(vec![lacks])).unwrap();

        assert!(pattern.resolve_rule(Path::new("a.ts"), "WRONG_KEY", "const WRONG_KEY = 1").is_some());
        assert!(pattern.resolve_rule(Path::new("a.ts"), "WRONG_KEY", "// legacy WRONG_KEY").is_none());
    }

    #[test]
    fn custom_validator_sees_match_and_context() {
        let mut pattern = NamingPattern::compile(&spec_with_rules(Vec::new())).unwrap();
        let only_keys_in_code = Validator::Custom(Arc::new(|matched: &str, context: &str| {
            !context.starts_with("//") && matched.ends_with("KEY")
        }));
        pattern.rules.push(ContextRule::new("*.ts", "APP_$1", Severity::High, only_keys_in_code).unwrap());

        let path = Path::new("src/app.ts");
        assert!(pattern.resolve_rule(path, "WRONG_KEY", "const WRONG_KEY = 1").is_some());
        assert!(pattern.resolve_rule(path, "WRONG_KEY", "// WRONG_KEY").is_none());
        assert!(pattern.resolve_rule(path, "WRONG_NAME", "const WRONG_NAME = 1").is_none());
        assert_eq!(format!("{:?}", pattern.rules[0].validator), "Custom(..)");
    }

    #[test]
    fn bad_regex_names_the_pattern() {
        let mut spec = spec_with_rules(Vec::new());
        spec.incorrect = vec!["(unclosed".to_string()];
        let err = NamingPattern::compile(&spec).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { ref pattern, .. } if pattern == "env-prefix"));
    }

    #[test]
    fn validator_spec_deserializes_from_toml() {
        let spec: ContextRuleSpec = toml::from_str(
            "glob = \"*.ts\"\nreplacement = \"APP_$1\"\nvalidator = { kind = \"context-contains\", text = \"process.env\" }\n",
        )
        .unwrap();
        assert_eq!(spec.severity, Severity::Medium);
        assert_eq!(
            spec.validator,
            ValidatorSpec::ContextContains { text: "process.env".to_string() }
        );
    }
}
