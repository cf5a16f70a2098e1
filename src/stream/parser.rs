//! Best-effort block parser for a growing model response.
//!
//! The parser is always handed the whole accumulated response, never a
//! delta. Parsing a longer prefix of the same text reproduces every block of
//! the shorter parse except the last one, which may still be growing.

use serde::Serialize;

/// Literal fence delimiter.
pub const FENCE: &str = "```";

/// Kind tag shared by blocks and rendered nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Code,
}

/// One parsed region of the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Block {
    /// Prose outside any fence
    Text { content: String },
    /// Fenced region; `lang` is the trimmed label (may be empty, a language
    /// hint, or a filename)
    Code { lang: String, content: String },
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::Text { .. } => BlockKind::Text,
            Block::Code { .. } => BlockKind::Code,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Block::Text { content } | Block::Code { content, .. } => content,
        }
    }
}

/// Parse `text` into alternating prose and code blocks.
///
/// A fence whose label line has not finished arriving yields a code block
/// with the partial label and empty content.
pub fn parse_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();

    for (i, segment) in text.split(FENCE).enumerate() {
        if i % 2 == 0 {
            if !segment.is_empty() {
                blocks.push(Block::Text {
                    content: segment.to_string(),
                });
            }
            continue;
        }

        let block = match segment.split_once('\n') {
            Some((label, code)) => Block::Code {
                lang: label.trim().to_string(),
                content: code.to_string(),
            },
            None => Block::Code {
                lang: segment.trim().to_string(),
                content: String::new(),
            },
        };
        blocks.push(block);
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Block {
        Block::Text {
            content: s.to_string(),
        }
    }

    fn code(lang: &str, content: &str) -> Block {
        Block::Code {
            lang: lang.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_unterminated_trailing_fence() {
        let blocks = parse_blocks("intro ```app.js\nconsole.log(1)");
        assert_eq!(
            blocks,
            vec![text("intro "), code("app.js", "console.log(1)")]
        );
    }

    #[test]
    fn test_label_without_newline_yet() {
        let blocks = parse_blocks("Here:\n```index.ht");
        assert_eq!(blocks, vec![text("Here:\n"), code("index.ht", "")]);
    }

    #[test]
    fn test_closed_fences_and_prose() {
        let input = "```index.html\n<h1>Hi</h1>\n```\n\n```style.css\nbody{}\n```\ndone";
        let blocks = parse_blocks(input);
        assert_eq!(
            blocks,
            vec![
                code("index.html", "<h1>Hi</h1>\n"),
                text("\n\n"),
                code("style.css", "body{}\n"),
                text("\ndone"),
            ]
        );
    }

    #[test]
    fn test_empty_input_and_empty_label() {
        assert!(parse_blocks("").is_empty());
        assert_eq!(parse_blocks("```\nx"), vec![code("", "x")]);
    }

    #[test]
    fn test_label_is_trimmed() {
        assert_eq!(
            parse_blocks("```  src/app.js  \nlet a;"),
            vec![code("src/app.js", "let a;")]
        );
    }

    #[test]
    fn test_prefix_parses_are_stable_except_last() {
        let full = "Sure!\n```index.html\n<p>a</p>\n```\nthen\n```app.js\nlet x = 1;\n```\n<task_summary>s</task_summary>";
        let full_blocks = parse_blocks(full);

        for cut in 0..=full.len() {
            if !full.is_char_boundary(cut) {
                continue;
            }
            let prefix_blocks = parse_blocks(&full[..cut]);
            if prefix_blocks.len() < 2 {
                continue;
            }
            let settled = &prefix_blocks[..prefix_blocks.len() - 1];
            assert_eq!(
                settled,
                &full_blocks[..settled.len()],
                "prefix of length {} diverged",
                cut
            );
        }
    }

    #[test]
    fn test_block_kind_and_content() {
        let b = code("a.js", "x");
        assert_eq!(b.kind(), BlockKind::Code);
        assert_eq!(b.content(), "x");
        assert_eq!(text("y").kind(), BlockKind::Text);
    }
}
