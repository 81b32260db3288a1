//! Header-level Java source summaries and file categorization.
//!
//! This is a lexical heuristic, not a parser. Comments and literals are
//! blanked, then declarations are read from brace depth zero. Member bodies
//! are never inspected.

use std::collections::BTreeSet;
use std::mem;
use std::sync::LazyLock;

use regex::Regex;
use transmute_types::{FileCategory, SourceSummary, TypeInfo};

pub const MODEL_ANNOTATIONS: &[&str] = &["Entity", "Embeddable", "MappedSuperclass", "Document"];

pub const SERVICE_ANNOTATIONS: &[&str] = &[
    "Stateless",
    "Stateful",
    "Service",
    "Component",
    "RequestScoped",
    "ApplicationScoped",
    "Controller",
    "RestController",
    "Model",
];

pub const REST_ANNOTATIONS: &[&str] = &["Path"];

static PACKAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*package\s+([\w$.]+)\s*$").expect("valid package regex")
});

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*import\s+(?:static\s+)?([\w$.]+?)(\.\s*\*)?\s*$").expect("valid import regex")
});

static ANNOTATION_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@\s*interface\s+([A-Za-z_$][\w$]*)").expect("valid annotation type regex")
});

static TYPE_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(class|interface|enum|record)\s+([A-Za-z_$][\w$]*)").expect("valid type regex")
});

static ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@\s*([A-Za-z_$][\w$]*(?:\s*\.\s*[A-Za-z_$][\w$]*)*)").expect("valid annotation regex")
});

static CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(extends|implements|permits)\b").expect("valid clause regex")
});

/// Summarize the package, imports, and top-level type declarations of `text`.
#[must_use]
pub fn summarize_source(text: &str) -> SourceSummary {
    let code = blank_comments_and_literals(text);
    let mut summary = SourceSummary::default();

    for statement in top_level_statements(&code) {
        match statement {
            Statement::Terminated(body) => {
                if let Some(caps) = PACKAGE_RE.captures(&body) {
                    summary.package = Some(caps[1].to_string());
                } else if let Some(caps) = IMPORT_RE.captures(&body) {
                    summary.imports.push(strip_whitespace(&caps[1]));
                }
            }
            Statement::Block(header) => {
                if let Some(info) = parse_type_header(&header) {
                    summary.types.push(info);
                }
            }
        }
    }

    summary
}

/// Every name imported by `text`, with wildcard suffixes removed.
#[must_use]
pub fn extract_imports(text: &str) -> BTreeSet<String> {
    summarize_source(text).imports.into_iter().collect()
}

/// Batch a file by the annotations on its declared types.
///
/// Model outranks service, which outranks rest. Qualified annotation names
/// are matched on their last segment.
#[must_use]
pub fn categorize(summary: &SourceSummary) -> FileCategory {
    if summary.types.is_empty() {
        return FileCategory::Unknown;
    }
    let annotations: BTreeSet<&str> = summary
        .annotations()
        .map(|a| a.rsplit('.').next().unwrap_or(a))
        .collect();
    let any_of = |set: &[&str]| set.iter().any(|a| annotations.contains(a));

    if any_of(MODEL_ANNOTATIONS) {
        FileCategory::Model
    } else if any_of(SERVICE_ANNOTATIONS) {
        FileCategory::Service
    } else if any_of(REST_ANNOTATIONS) {
        FileCategory::Rest
    } else {
        FileCategory::Other
    }
}

enum Statement {
    /// Text before a `;` at depth zero.
    Terminated(String),
    /// Text before a `{` at depth zero, i.e. a declaration header.
    Block(String),
}

/// Split depth-zero text into statements. Braces nested inside parentheses
/// (annotation array arguments) do not open a block.
fn top_level_statements(code: &str) -> Vec<Statement> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut braces = 0usize;
    let mut parens = 0usize;

    for ch in code.chars() {
        if braces > 0 {
            match ch {
                '{' => braces += 1,
                '}' => braces -= 1,
                _ => {}
            }
            continue;
        }
        match ch {
            '(' => {
                parens += 1;
                current.push(ch);
            }
            ')' => {
                parens = parens.saturating_sub(1);
                current.push(ch);
            }
            '{' if parens == 0 => {
                statements.push(Statement::Block(mem::take(&mut current)));
                braces = 1;
            }
            ';' if parens == 0 => {
                statements.push(Statement::Terminated(mem::take(&mut current)));
            }
            '}' if parens == 0 => current.clear(),
            _ => current.push(ch),
        }
    }
    statements
}

fn parse_type_header(header: &str) -> Option<TypeInfo> {
    let header = strip_nested(&strip_nested(header, '(', ')'), '<', '>');

    let (kind, name, decl_start, decl_end) = if let Some(caps) = ANNOTATION_TYPE_RE.captures(&header)
    {
        let whole = caps.get(0)?;
        ("@interface", caps[1].to_string(), whole.start(), whole.end())
    } else {
        let caps = TYPE_DECL_RE.captures(&header)?;
        let whole = caps.get(0)?;
        let kind = match &caps[1] {
            "class" => "class",
            "interface" => "interface",
            "enum" => "enum",
            _ => "record",
        };
        (kind, caps[2].to_string(), whole.start(), whole.end())
    };

    let annotations = ANNOTATION_RE
        .captures_iter(&header[..decl_start])
        .map(|caps| strip_whitespace(&caps[1]))
        .filter(|a| a != "interface")
        .collect();

    let mut info = TypeInfo {
        kind: kind.to_string(),
        name,
        annotations,
        extends: Vec::new(),
        implements: Vec::new(),
    };

    let tail = &header[decl_end..];
    let clauses: Vec<_> = CLAUSE_RE.find_iter(tail).collect();
    for (i, clause) in clauses.iter().enumerate() {
        let end = clauses.get(i + 1).map_or(tail.len(), |next| next.start());
        let names = split_type_list(&tail[clause.end()..end]);
        match clause.as_str() {
            "extends" => info.extends.extend(names),
            "implements" => info.implements.extend(names),
            _ => {}
        }
    }

    Some(info)
}

fn split_type_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(strip_whitespace)
        .filter(|s| !s.is_empty())
        .collect()
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Remove everything between balanced `open`/`close` pairs, delimiters
/// included. Unbalanced closers are dropped.
fn strip_nested(s: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(s.len());
    let mut depth = 0usize;
    for ch in s.chars() {
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth = depth.saturating_sub(1);
        } else if depth == 0 {
            out.push(ch);
        }
    }
    out
}

/// Replace comments, string/char literals and text blocks with spaces so
/// braces and semicolons inside them are not seen by the statement splitter.
/// Newlines are kept.
fn blank_comments_and_literals(text: &str) -> String {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum State {
        Code,
        LineComment,
        BlockComment,
        Str,
        TextBlock,
        Char,
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut state = State::Code;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();
        match state {
            State::Code => match (ch, next) {
                ('/', Some('/')) => {
                    state = State::LineComment;
                    out.push_str("  ");
                    i += 1;
                }
                ('/', Some('*')) => {
                    state = State::BlockComment;
                    out.push_str("  ");
                    i += 1;
                }
                ('"', _) if next == Some('"') && chars.get(i + 2) == Some(&'"') => {
                    state = State::TextBlock;
                    out.push_str("   ");
                    i += 2;
                }
                ('"', _) => {
                    state = State::Str;
                    out.push(' ');
                }
                ('\'', _) => {
                    state = State::Char;
                    out.push(' ');
                }
                _ => out.push(ch),
            },
            State::LineComment => {
                if ch == '\n' {
                    state = State::Code;
                    out.push('\n');
                } else {
                    out.push(' ');
                }
            }
            State::BlockComment => {
                if ch == '*' && next == Some('/') {
                    state = State::Code;
                    out.push_str("  ");
                    i += 1;
                } else {
                    out.push(if ch == '\n' { '\n' } else { ' ' });
                }
            }
            State::Str | State::Char => {
                let terminator = if state == State::Str { '"' } else { '\'' };
                if ch == '\\' {
                    out.push(' ');
                    if next.is_some() {
                        out.push(' ');
                        i += 1;
                    }
                } else if ch == terminator || ch == '\n' {
                    state = State::Code;
                    out.push(if ch == '\n' { '\n' } else { ' ' });
                } else {
                    out.push(' ');
                }
            }
            State::TextBlock => {
                if ch == '\\' && next.is_some() {
                    out.push_str("  ");
                    i += 1;
                } else if ch == '"' && next == Some('"') && chars.get(i + 2) == Some(&'"') {
                    state = State::Code;
                    out.push_str("   ");
                    i += 2;
                } else {
                    out.push(if ch == '\n' { '\n' } else { ' ' });
                }
            }
        }
        i += 1;
    }
    out
}
