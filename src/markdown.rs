//! Turns raw message text into typed segments for display.
//!
//! Fenced code blocks are split out first; the remaining prose is scanned
//! for `**bold**`, `*italic*` and `` `inline code` `` markers. Unbalanced
//! markers never match, so malformed input falls through as plain text.

use once_cell::sync::Lazy;
use regex::Regex;

static FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```.*?```").expect("fence pattern"));

static INLINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*|\*(.*?)\*|`(.*?)`").expect("inline pattern"));

static LANG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\w+)\n").expect("language pattern"));

/// A renderable unit of message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Plain(String),
    Bold(String),
    Italic(String),
    InlineCode(String),
    CodeBlock { lang: Option<String>, body: String },
}

/// Parse message text into an ordered list of segments.
pub fn parse(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for fence in FENCE_RE.find_iter(text) {
        parse_prose(&text[last..fence.start()], &mut segments);
        segments.push(parse_code_block(fence.as_str()));
        last = fence.end();
    }
    parse_prose(&text[last..], &mut segments);

    segments
}

/// Strip the fences, pull off a single-word language tag if present.
fn parse_code_block(raw: &str) -> Segment {
    let inner = raw[3..raw.len() - 3].trim();

    if let Some(caps) = LANG_RE.captures(inner) {
        if let (Some(whole), Some(lang)) = (caps.get(0), caps.get(1)) {
            return Segment::CodeBlock {
                lang: Some(lang.as_str().to_string()),
                body: inner[whole.end()..].trim_start().to_string(),
            };
        }
    }

    Segment::CodeBlock {
        lang: None,
        body: inner.to_string(),
    }
}

/// Split prose on inline markers, bold before italic before inline code.
fn parse_prose(text: &str, out: &mut Vec<Segment>) {
    let mut last = 0;

    for caps in INLINE_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            out.push(Segment::Plain(text[last..whole.start()].to_string()));
        }

        if let Some(m) = caps.get(1) {
            out.push(Segment::Bold(m.as_str().to_string()));
        } else if let Some(m) = caps.get(2) {
            out.push(Segment::Italic(m.as_str().to_string()));
        } else if let Some(m) = caps.get(3) {
            out.push(Segment::InlineCode(m.as_str().to_string()));
        }

        last = whole.end();
    }

    if last < text.len() {
        out.push(Segment::Plain(text[last..].to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through_unchanged() {
        assert_eq!(
            parse("plain text"),
            vec![Segment::Plain("plain text".to_string())]
        );
    }

    #[test]
    fn inline_markers_split_in_order() {
        assert_eq!(
            parse("**bold** and *italic* and `code`"),
            vec![
                Segment::Bold("bold".to_string()),
                Segment::Plain(" and ".to_string()),
                Segment::Italic("italic".to_string()),
                Segment::Plain(" and ".to_string()),
                Segment::InlineCode("code".to_string()),
            ]
        );
    }

    #[test]
    fn fenced_block_with_language_tag() {
        assert_eq!(
            parse("```js\nconsole.log(1)\n```"),
            vec![Segment::CodeBlock {
                lang: Some("js".to_string()),
                body: "console.log(1)".to_string(),
            }]
        );
    }

    #[test]
    fn fenced_block_without_language_tag() {
        assert_eq!(
            parse("```\nlet x = 1;\n```"),
            vec![Segment::CodeBlock {
                lang: None,
                body: "let x = 1;".to_string(),
            }]
        );
    }

    #[test]
    fn prose_around_fenced_block() {
        assert_eq!(
            parse("before\n```\ncode\n```\nafter"),
            vec![
                Segment::Plain("before\n".to_string()),
                Segment::CodeBlock {
                    lang: None,
                    body: "code".to_string(),
                },
                Segment::Plain("\nafter".to_string()),
            ]
        );
    }

    #[test]
    fn unterminated_markers_stay_literal() {
        assert_eq!(
            parse("a *dangling marker"),
            vec![Segment::Plain("a *dangling marker".to_string())]
        );
        assert_eq!(
            parse("tick ` only once"),
            vec![Segment::Plain("tick ` only once".to_string())]
        );
    }

    #[test]
    fn markers_inside_code_blocks_are_not_reinterpreted() {
        assert_eq!(
            parse("```\n**not bold** and `not code`\n```"),
            vec![Segment::CodeBlock {
                lang: None,
                body: "**not bold** and `not code`".to_string(),
            }]
        );
    }

    #[test]
    fn empty_input_yields_no_segments() {
        assert!(parse("").is_empty());
    }
}
