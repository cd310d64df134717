//! Formatting of message bodies for display.
//!
//! Only a tiny markdown subset is understood: `**bold**` spans and
//! line breaks. Everything else, including unmatched `**`, is kept as
//! literal text.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

// Non-greedy and single line. A bold span never crosses `\n` or `\r`.
static BOLD_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*[^\n\r]*?\*\*").expect("Invalid bold span regex"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Strong(String),
    LineBreak,
}

/// Convert `text` into a flat sequence of display nodes.
///
/// Empty lines produce no text node but the line break before them
/// is still emitted. No line break follows the final line of a
/// literal segment.
pub fn format_text(text: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut cursor = 0;

    for span in BOLD_SPAN.find_iter(text) {
        push_literal(&mut nodes, &text[cursor..span.start()]);
        let inner = &span.as_str()[2..span.as_str().len() - 2];
        nodes.push(Node::Strong(inner.to_string()));
        cursor = span.end();
    }
    push_literal(&mut nodes, &text[cursor..]);

    nodes
}

fn push_literal(nodes: &mut Vec<Node>, literal: &str) {
    if literal.is_empty() {
        return;
    }
    let lines: Vec<&str> = literal.split('\n').collect();
    let last = lines.len() - 1;
    for (idx, line) in lines.into_iter().enumerate() {
        if !line.is_empty() {
            nodes.push(Node::Text(line.to_string()));
        }
        if idx < last {
            nodes.push(Node::LineBreak);
        }
    }
}

/// Render nodes for a terminal using ANSI bold.
pub fn to_ansi(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Strong(text) => {
                out.push_str("\x1b[1m");
                out.push_str(text);
                out.push_str("\x1b[0m");
            }
            Node::LineBreak => out.push('\n'),
        }
    }
    out
}

/// Flattened node shape for templates, which can only branch on
/// truthiness.
#[derive(Clone, Debug, Serialize)]
pub struct NodeView {
    pub text: String,
    pub strong: bool,
    pub line_break: bool,
}

impl From<&Node> for NodeView {
    fn from(node: &Node) -> Self {
        match node {
            Node::Text(text) => Self {
                text: text.clone(),
                strong: false,
                line_break: false,
            },
            Node::Strong(text) => Self {
                text: text.clone(),
                strong: true,
                line_break: false,
            },
            Node::LineBreak => Self {
                text: String::new(),
                strong: false,
                line_break: true,
            },
        }
    }
}
