//! Glob classification of changed paths against rule patterns.
//!
//! Patterns use shell-glob semantics: `*` and `?` stay within one path
//! segment, `**` spans segments, `{a,b}` and `[...]` are supported. A path
//! segment starting with `.` is only matched by a pattern segment that starts
//! with a literal `.`; no wildcard, `**` included, covers a dotfile.

use globset::{GlobBuilder, GlobMatcher};

use crate::core::types::{LabelName, PatternSpec, RuleTable};

/// One `/`-separated piece of a brace-free pattern.
#[derive(Debug, Clone)]
enum Segment {
    /// `**`: zero or more whole path segments.
    AnyDepth,
    /// Matches exactly one path segment.
    Glob {
        matcher: GlobMatcher,
        literal_dot: bool,
    },
}

/// A single rule pattern, brace-expanded and split into segments.
#[derive(Debug, Clone)]
pub struct Pattern {
    alternatives: Vec<Vec<Segment>>,
}

impl Pattern {
    pub fn is_match(&self, file_path: &str) -> bool {
        let path: Vec<&str> = file_path.split('/').collect();
        self.alternatives
            .iter()
            .any(|segments| match_segments(segments, &path))
    }
}

/// Compile one glob pattern.
pub fn compile_pattern(pattern: &str) -> Result<Pattern, String> {
    let invalid = |reason: String| format!("invalid glob '{pattern}': {reason}");
    let mut alternatives = Vec::new();
    for expanded in expand_braces(pattern).map_err(invalid)? {
        let segments = expanded
            .split('/')
            .map(build_segment)
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;
        alternatives.push(segments);
    }
    Ok(Pattern { alternatives })
}

fn build_segment(segment: &str) -> Result<Segment, String> {
    if segment == "**" {
        return Ok(Segment::AnyDepth);
    }
    let glob = GlobBuilder::new(segment)
        .literal_separator(true)
        .build()
        .map_err(|err| err.kind().to_string())?;
    Ok(Segment::Glob {
        matcher: glob.compile_matcher(),
        literal_dot: segment.starts_with('.'),
    })
}

fn match_segments(pattern: &[Segment], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((Segment::AnyDepth, rest)) => {
            for skip in 0..=path.len() {
                if match_segments(rest, &path[skip..]) {
                    return true;
                }
                if path.get(skip).is_some_and(|part| part.starts_with('.')) {
                    return false;
                }
            }
            false
        }
        Some((
            Segment::Glob {
                matcher,
                literal_dot,
            },
            rest,
        )) => match path.split_first() {
            Some((head, tail)) => {
                (*literal_dot || !head.starts_with('.'))
                    && matcher.is_match(head)
                    && match_segments(rest, tail)
            }
            None => false,
        },
    }
}

/// Expand `{a,b}` groups into brace-free patterns, outermost first.
fn expand_braces(pattern: &str) -> Result<Vec<String>, String> {
    let Some((open, close, alternatives)) = first_brace_group(pattern)? else {
        return Ok(vec![pattern.to_string()]);
    };
    let (prefix, suffix) = (&pattern[..open], &pattern[close + 1..]);
    let mut expanded = Vec::new();
    for alternative in alternatives {
        expanded.extend(expand_braces(&format!("{prefix}{alternative}{suffix}"))?);
    }
    Ok(expanded)
}

/// Locate the first top-level brace group: `(open, close, alternatives)`.
fn first_brace_group(pattern: &str) -> Result<Option<(usize, usize, Vec<&str>)>, String> {
    let bytes = pattern.as_bytes();
    let mut open = 0;
    let mut depth = 0usize;
    let mut in_class = false;
    let mut commas = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'[' if !in_class => in_class = true,
            b']' if in_class => in_class = false,
            b'{' if !in_class => {
                if depth == 0 {
                    open = i;
                }
                depth += 1;
            }
            b',' if !in_class && depth == 1 => commas.push(i),
            b'}' if !in_class && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let mut alternatives = Vec::with_capacity(commas.len() + 1);
                    let mut start = open + 1;
                    for comma in commas {
                        alternatives.push(&pattern[start..comma]);
                        start = comma + 1;
                    }
                    alternatives.push(&pattern[start..i]);
                    return Ok(Some((open, i, alternatives)));
                }
            }
            _ => {}
        }
        i += 1;
    }
    if depth > 0 {
        return Err("unclosed alternate group".to_string());
    }
    Ok(None)
}

/// Compile every pattern of a spec.
pub fn compile_pattern_spec(spec: &PatternSpec) -> Result<Vec<Pattern>, String> {
    spec.patterns()
        .iter()
        .map(|pattern| compile_pattern(pattern))
        .collect()
}

/// True iff `file_path` matches at least one pattern of `spec`.
pub fn matches(file_path: &str, spec: &PatternSpec) -> Result<bool, String> {
    let patterns = compile_pattern_spec(spec)?;
    Ok(patterns.iter().any(|pattern| pattern.is_match(file_path)))
}

/// Rule table compiled once, reused for every changed file.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    rules: Vec<(LabelName, Vec<Pattern>)>,
}

impl CompiledRules {
    pub fn compile(rules: &RuleTable) -> Result<Self, String> {
        let mut compiled = Vec::with_capacity(rules.len());
        for (label, spec) in rules {
            let patterns =
                compile_pattern_spec(spec).map_err(|err| format!("rule '{label}': {err}"))?;
            compiled.push((label.clone(), patterns));
        }
        Ok(Self { rules: compiled })
    }

    /// Labels whose patterns match `file_path`, in rule-table order.
    pub fn labels_for<'a>(&'a self, file_path: &'a str) -> impl Iterator<Item = &'a LabelName> {
        self.rules
            .iter()
            .filter(move |(_, patterns)| patterns.iter().any(|p| p.is_match(file_path)))
            .map(|(label, _)| label)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
