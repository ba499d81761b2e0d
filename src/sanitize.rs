//! Post-processing of raw model output.
//!
//! Models tend to open with chit-chat ("Sure, here are the objectives:") and
//! to decorate text with markdown emphasis.  [`sanitize`] strips both so the
//! result can be rendered as plain text.

use std::sync::LazyLock;

use regex::Regex;

/// Leading conversational phrases, tried in order.  Each removes everything
/// up to and including the first `:` or `.` plus trailing whitespace, but
/// never the last sentence of the text.
static PREAMBLE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^\s*(?:okay|ok|sure|alright|certainly|of course|absolutely|great)[,!.]?\s+(?:here(?:['’]s|\s+is|\s+are)|i(?:['’]ve|\s+have)\s+(?:created|generated|prepared|written|put together|compiled)|let\s+me)[^:.]*[:.]\s*",
        r"(?i)^\s*here(?:['’]s|\s+is|\s+are)\s+[^:.]*[:.]\s*",
        r"(?i)^\s*based\s+on\s+[^:.]*[:.]\s*",
        r"(?i)^\s*as\s+requested[^:.]*[:.]\s*",
        r"(?i)^\s*(?:i\s+hope\s+this\s+helps|i'd\s+be\s+happy\s+to\s+help)[^:.]*[:.]\s*",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("preamble pattern is valid"))
    .collect()
});

/// "Here are 5 questions:" anywhere in the text.
static LIST_INTRO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bhere\s+are\s+\d+\s+[^:\n]*:[ \t]*").expect("list intro pattern is valid")
});

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern is valid"));
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("italic pattern is valid"));
static UNDERLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__(.*?)__").expect("underline pattern is valid"));
static STRIKETHROUGH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~~(.*?)~~").expect("strikethrough pattern is valid"));

/// Clean raw model output into presentation-ready text.
///
/// Runs [`sanitize_once`] until the output stops changing, so the result is
/// always a fixed point: `sanitize(sanitize(s)) == sanitize(s)`.  Every pass
/// that changes the text makes it shorter, which bounds the loop.  A reply
/// that is nothing but preamble-shaped sentences keeps its last one.
pub fn sanitize(raw: &str) -> String {
    let mut current = sanitize_once(raw);
    loop {
        let next = sanitize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// One ordered pass: preamble, list intros, emphasis markers, trim.
pub fn sanitize_once(raw: &str) -> String {
    let mut text = strip_preamble(raw);
    text = LIST_INTRO.replace_all(&text, "").into_owned();
    text = strip_emphasis(&text);
    text.trim().to_string()
}

/// Single pass over the preamble list; each pattern sees the output of the
/// previous one.  A match is only dropped when something is left after it.
fn strip_preamble(text: &str) -> String {
    let mut out = text.to_string();
    for pattern in PREAMBLE_PATTERNS.iter() {
        if let Some(m) = pattern.find(&out) {
            let rest = &out[m.end()..];
            if !rest.trim().is_empty() {
                out = rest.to_string();
            }
        }
    }
    out
}

fn strip_emphasis(text: &str) -> String {
    let text = BOLD.replace_all(text, "$1");
    let text = ITALIC.replace_all(&text, "$1");
    let text = UNDERLINE.replace_all(&text, "$1");
    STRIKETHROUGH.replace_all(&text, "$1").into_owned()
}
