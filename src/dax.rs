//! Lexical classification of formula-language definitions for styled output.
//!
//! The classifier is a single stateful pass over the token stream: the same
//! input and vocabulary always yield the same spans.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum TokenClass {
    Plain,
    Comment,
    Quote,
    /// Parenthesis or measure bracket, colored by nesting slot.
    Paren { slot: usize },
    Var,
    VarName,
    Measure,
    Reference,
    Function,
    Return,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub text: String,
    #[serde(flatten)]
    pub class: TokenClass,
}

impl Span {
    fn new(text: impl Into<String>, class: TokenClass) -> Self {
        Self {
            text: text.into(),
            class,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassifiedDefinition {
    pub spans: Vec<Span>,
    pub variables: Vec<String>,
    pub functions: Vec<String>,
    pub measures: Vec<String>,
    pub references: Vec<(String, String)>,
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\r\n|\n|\t|&&|\|\||\(|\)|\[.*?\]|,|//|\d+\.\d+|\w+|\.|\S")
            .expect("static regex")
    })
}

fn measure_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[.*?\]").expect("static regex"))
}

fn reference_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:'([^']+)'|(\w+))\[(.*?)\]").expect("static regex"))
}

pub fn tokenize(source: &str) -> Vec<&str> {
    token_re().find_iter(source).map(|m| m.as_str()).collect()
}

fn push_unique(list: &mut Vec<String>, item: &str) {
    if !list.iter().any(|x| x == item) {
        list.push(item.to_string());
    }
}

/// Names declared with `VAR`, in declaration order.
pub fn find_variables(tokens: &[&str]) -> Vec<String> {
    let mut vars = Vec::new();
    for pair in tokens.windows(2) {
        if pair[0] == "VAR" {
            push_unique(&mut vars, pair[1]);
        }
    }
    vars
}

/// Vocabulary entries used as tokens, in vocabulary order.
pub fn find_functions(tokens: &[&str], vocabulary: &[String]) -> Vec<String> {
    vocabulary
        .iter()
        .filter(|f| tokens.contains(&f.as_str()))
        .cloned()
        .collect()
}

/// Bracketed references (`[Total Sales]`), first-seen order.
pub fn find_measures(source: &str) -> Vec<String> {
    let mut out = Vec::new();
    for m in measure_re().find_iter(source) {
        push_unique(&mut out, m.as_str());
    }
    out
}

/// `Table[Column]` and `'Table'[Column]` pairs, first-seen order.
pub fn find_references(source: &str) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for caps in reference_re().captures_iter(source) {
        let table = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
        let (Some(table), Some(column)) = (table, caps.get(3)) else {
            continue;
        };
        let pair = (table.to_string(), column.as_str().to_string());
        if !out.contains(&pair) {
            out.push(pair);
        }
    }
    out
}

pub fn classify(source: &str, vocabulary: &[String], palette_len: usize) -> ClassifiedDefinition {
    let tokens = tokenize(source);
    let variables = find_variables(&tokens);
    let functions = find_functions(&tokens, vocabulary);
    let measures = find_measures(source);
    let references = find_references(source);

    let palette_len = palette_len.max(1) as i64;
    let slot = |depth: i64| depth.rem_euclid(palette_len) as usize;

    let mut spans = Vec::with_capacity(tokens.len());
    let mut depth: i64 = -1;
    let mut in_comment = false;
    let mut quotes = 0u8;

    for token in tokens {
        let newline = token == "\n" || token == "\r\n";
        if token == "//" {
            in_comment = true;
        } else if newline {
            in_comment = false;
        }
        if token == "\"" && !in_comment {
            quotes += 1;
        }

        if in_comment {
            spans.push(Span::new(format!("{token} "), TokenClass::Comment));
        } else if quotes > 0 {
            if quotes == 2 {
                spans.push(Span::new(format!("{token} "), TokenClass::Quote));
                quotes = 0;
            } else {
                spans.push(Span::new(token, TokenClass::Quote));
            }
        } else if token == "\t" || newline {
            spans.push(Span::new(token, TokenClass::Plain));
        } else if token == "&&" || token == "||" {
            spans.push(Span::new(format!("{token} "), TokenClass::Plain));
        } else if token == "(" {
            depth += 1;
            spans.push(Span::new("( ", TokenClass::Paren { slot: slot(depth) }));
        } else if token == ")" {
            spans.push(Span::new(") ", TokenClass::Paren { slot: slot(depth) }));
            depth -= 1;
        } else if token == "VAR" {
            spans.push(Span::new("VAR ", TokenClass::Var));
        } else if variables.iter().any(|v| v == token) {
            spans.push(Span::new(format!("{token} "), TokenClass::VarName));
        } else if measures.iter().any(|m| m == token) {
            let bracket = TokenClass::Paren {
                slot: slot(depth + 1),
            };
            spans.push(Span::new("[", bracket));
            spans.push(Span::new(&token[1..token.len() - 1], TokenClass::Measure));
            spans.push(Span::new("] ", bracket));
        } else if references.iter().any(|(table, _)| table == token) {
            spans.push(Span::new(token, TokenClass::Reference));
        } else if functions.iter().any(|f| f == token) {
            spans.push(Span::new(format!("{token} "), TokenClass::Function));
        } else if token == "RETURN" {
            spans.push(Span::new("RETURN ", TokenClass::Return));
        } else {
            spans.push(Span::new(format!("{token} "), TokenClass::Plain));
        }
    }

    ClassifiedDefinition {
        spans,
        variables,
        functions,
        measures,
        references,
    }
}
