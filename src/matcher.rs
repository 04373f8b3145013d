//! Pattern matching: run a rule set over one file's content.

use std::collections::HashSet;
use std::path::Path;

use crate::rules::NamingPattern;
use crate::types::{Match, Severity};

/// Byte offsets of every line start, built in one left-to-right pass.
/// Lookups are a binary search, so locating k matches costs O(n + k log n).
pub struct LineIndex<'a> {
    content: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    /// Index the newline positions of `content`.
    pub fn new(content: &'a str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            content
                .bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i.saturating_add(1)),
        );
        return Self { content, starts };
    }

    /// One-based `(line, column)` for a byte offset. Column counts characters.
    pub fn locate(&self, offset: usize) -> (u32, u32) {
        let line_idx = self.starts.partition_point(|&s| s <= offset).saturating_sub(1);
        let line_start = self.starts.get(line_idx).copied().unwrap_or(0);
        let column = self
            .content
            .get(line_start..offset)
            .map_or(0, |prefix| prefix.chars().count());
        return (to_u32(line_idx.saturating_add(1)), to_u32(column.saturating_add(1)));
    }

    /// Byte offset where the line containing `offset` begins.
    pub fn line_start(&self, offset: usize) -> usize {
        let line_idx = self.starts.partition_point(|&s| s <= offset).saturating_sub(1);
        return self.starts.get(line_idx).copied().unwrap_or(0);
    }

    /// Text of the line containing `offset`, without its line terminator.
    pub fn line_text(&self, offset: usize) -> &'a str {
        let line_idx = self.starts.partition_point(|&s| s <= offset).saturating_sub(1);
        let start = self.starts.get(line_idx).copied().unwrap_or(0);
        let end = self
            .starts
            .get(line_idx.saturating_add(1))
            .map_or(self.content.len(), |next| next.saturating_sub(1));
        return self.content.get(start..end).unwrap_or("").trim_end_matches('\r');
    }
}

/// Run every pattern over `content` and return matches in offset order.
///
/// Each regex hit is resolved against the pattern's context rules for `path`.
/// A hit no rule covers is still reported, at low severity with no fix.
pub fn match_content(path: &Path, content: &str, patterns: &[NamingPattern]) -> Vec<Match> {
    let index = LineIndex::new(content);
    let mut seen: HashSet<(usize, usize, usize)> = HashSet::new();
    let mut found: Vec<(usize, Match)> = Vec::new();

    for (pattern_idx, pattern) in patterns.iter().enumerate() {
        for re in &pattern.incorrect {
            for caps in re.captures_iter(content) {
                let Some(whole) = caps.get(0) else { continue };
                if whole.is_empty() || !seen.insert((whole.start(), whole.end(), pattern_idx)) {
                    continue;
                }

                let raw_line = index.line_text(whole.start());
                let context = raw_line.trim();
                let leading = raw_line.len().saturating_sub(raw_line.trim_start().len());
                let context_offset =
                    whole.start().saturating_sub(index.line_start(whole.start())).saturating_sub(leading);
                let (line, column) = index.locate(whole.start());
                let rule = pattern.resolve_rule(path, whole.as_str(), context);

                let suggested = rule.and_then(|r| {
                    let mut expanded = String::new();
                    caps.expand(&r.replacement, &mut expanded);
                    (expanded != whole.as_str()).then_some(expanded)
                });
                let severity = match (rule, &suggested) {
                    (Some(r), Some(_)) => r.severity,
                    _ => Severity::Low,
                };

                found.push((pattern_idx, Match {
                    category: pattern.category,
                    column,
                    context: context.to_string(),
                    context_offset,
                    line,
                    offset: whole.start(),
                    original: whole.as_str().to_string(),
                    pattern_id: pattern.id.clone(),
                    severity,
                    suggested,
                }));
            }
        }
    }

    found.sort_by(|(pa, a), (pb, b)| {
        a.offset.cmp(&b.offset).then(pa.cmp(pb)).then(a.original.len().cmp(&b.original.len()))
    });
    found.into_iter().map(|(_, m)| m).collect()
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ContextRuleSpec, PatternSpec, ValidatorSpec};
    use crate::types::Category;

    fn env_pattern(rules: Vec<ContextRuleSpec>) -> NamingPattern {
        NamingPattern::compile(&PatternSpec {
            category: Category::Environment,
            correct: "APP_<NAME>".to_string(),
            id: "env-prefix".to_string(),
            incorrect: vec![r"\bWRONG_PREFIX_([A-Z0-9_]+)\b".to_string()],
            rules,
        })
        .unwrap()
    }

    fn ts_rule() -> ContextRuleSpec {
        ContextRuleSpec {
            glob: "*.ts".to_string(),
            replacement: "APP_$1".to_string(),
            severity: Severity::High,
            validator: ValidatorSpec::Always,
        }
    }

    #[test]
    fn locates_lines_and_columns() {
        let index = LineIndex::new("ab\ncdé\nfg");
        assert_eq!(index.locate(0), (1, 1));
        assert_eq!(index.locate(4), (2, 2));
        assert_eq!(index.locate(8), (3, 1));
        assert_eq!(index.line_text(4), "cdé");
    }

    #[test]
    fn suggests_fix_from_applicable_rule() {
        let content = "const a = 1;\nconst key = process.env.WRONG_PREFIX_API_KEY;\n";
        let matches = match_content(Path::new("src/app.ts"), content, &[env_pattern(vec![ts_rule()])]);

        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!((m.line, m.column), (2, 25));
        assert_eq!(m.original, "WRONG_PREFIX_API_KEY");
        assert_eq!(m.suggested.as_deref(), Some("APP_API_KEY"));
        assert_eq!(m.severity, Severity::High);
        assert_eq!(m.context, "const key = process.env.WRONG_PREFIX_API_KEY;");
    }

    #[test]
    fn reports_hit_without_rule_at_low_severity() {
        let content = "WRONG_PREFIX_TOKEN=abc\n";
        let matches = match_content(Path::new(".env"), content, &[env_pattern(vec![ts_rule()])]);

        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].severity, Severity::Low);
        assert_eq!(matches[0].suggested, None);
    }

    #[test]
    fn matches_are_in_offset_order_across_patterns() {
        let second = NamingPattern::compile(&PatternSpec {
            category: Category::Variable,
            correct: "camelCase".to_string(),
            id: "snake-var".to_string(),
            incorrect: vec![r"\bold_var\b".to_string()],
            rules: Vec::new(),
        })
        .unwrap();
        let content = "old_var WRONG_PREFIX_X old_var";
        let matches = match_content(Path::new("a.ts"), content, &[env_pattern(Vec::new()), second]);

        let offsets: Vec<usize> = matches.iter().map(|m| m.offset).collect();
        assert_eq!(offsets, vec![0, 8, 23]);
    }

    #[test]
    fn context_offset_points_at_the_hit_on_an_indented_line() {
        let content = "fn main() {\n    let a = WRONG_PREFIX_A; // WRONG_PREFIX_A\n}\n";
        let matches = match_content(Path::new("src/app.ts"), content, &[env_pattern(Vec::new())]);

        assert_eq!(matches.len(), 2);
        for m in &matches {
            let end = m.context_offset + m.original.len();
            assert_eq!(&m.context[m.context_offset..end], m.original);
        }
        assert_eq!(matches[0].context_offset, 8);
        assert_eq!(matches[1].context_offset, 27);
    }
}
