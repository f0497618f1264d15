//! Markdown card bodies to styled terminal lines.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

const COMMENT_OPEN: &str = "<comment>";
const COMMENT_CLOSE: &str = "</comment>";

#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub lines: Vec<Line<'static>>,
    /// Body of the `<comment>` block, shown while the pointer hovers the card.
    pub comment: Option<String>,
}

pub fn render_markdown(text: &str) -> Rendered {
    let (body, comment) = split_comment(text);
    Rendered {
        lines: markdown_lines(&body),
        comment,
    }
}

/// Removes the first `<comment>` block from `text` and returns it separately.
pub fn split_comment(text: &str) -> (String, Option<String>) {
    let Some(open) = text.find(COMMENT_OPEN) else {
        return (text.to_string(), None);
    };
    let inner_start = open + COMMENT_OPEN.len();
    let (inner_end, close_end) = match text[inner_start..].find(COMMENT_CLOSE) {
        Some(rel) => (inner_start + rel, inner_start + rel + COMMENT_CLOSE.len()),
        None => (text.len(), text.len()),
    };
    let comment = text[inner_start..inner_end].trim().to_string();
    let mut body = String::with_capacity(text.len());
    body.push_str(text[..open].trim_end());
    let rest = &text[close_end..];
    if !rest.trim().is_empty() {
        body.push_str("\n\n");
        body.push_str(rest.trim_start());
    }
    let comment = if comment.is_empty() { None } else { Some(comment) };
    (body, comment)
}

struct StyleStack {
    styles: Vec<Style>,
}

impl StyleStack {
    fn new() -> Self {
        StyleStack {
            styles: vec![Style::default()],
        }
    }

    fn current(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn push(&mut self, f: impl Fn(Style) -> Style) {
        let next = f(self.current());
        self.styles.push(next);
    }

    fn pop(&mut self) {
        if self.styles.len() > 1 {
            self.styles.pop();
        }
    }
}

fn markdown_lines(text: &str) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut styles = StyleStack::new();
    let mut list_depth = 0usize;
    let mut in_code_block = false;

    let flush = |current: &mut Vec<Span<'static>>, lines: &mut Vec<Line<'static>>| {
        if !current.is_empty() {
            lines.push(Line::from(std::mem::take(current)));
        }
    };

    for event in Parser::new(text) {
        match event {
            Event::Start(tag) => match tag {
                Tag::Heading { .. } => styles.push(|s| s.add_modifier(Modifier::BOLD)),
                Tag::Emphasis => styles.push(|s| s.add_modifier(Modifier::ITALIC)),
                Tag::Strong => styles.push(|s| s.add_modifier(Modifier::BOLD)),
                Tag::Strikethrough => styles.push(|s| s.add_modifier(Modifier::CROSSED_OUT)),
                Tag::Link { .. } => styles.push(|s| s.add_modifier(Modifier::UNDERLINED)),
                Tag::BlockQuote(_) => styles.push(|s| s.add_modifier(Modifier::DIM)),
                Tag::CodeBlock(_) => in_code_block = true,
                Tag::List(_) => {
                    flush(&mut current, &mut lines);
                    list_depth += 1;
                }
                Tag::Item => {
                    let indent = "  ".repeat(list_depth.saturating_sub(1));
                    current.push(Span::raw(format!("{}• ", indent)));
                }
                _ => {}
            },
            Event::End(tag) => match tag {
                TagEnd::Paragraph => flush(&mut current, &mut lines),
                TagEnd::Heading(_) => {
                    flush(&mut current, &mut lines);
                    styles.pop();
                }
                TagEnd::BlockQuote(_) => {
                    flush(&mut current, &mut lines);
                    styles.pop();
                }
                TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                    styles.pop()
                }
                TagEnd::CodeBlock => in_code_block = false,
                TagEnd::List(_) => list_depth = list_depth.saturating_sub(1),
                TagEnd::Item => flush(&mut current, &mut lines),
                _ => {}
            },
            Event::Text(text) if in_code_block => {
                for code_line in text.lines() {
                    lines.push(Line::from(Span::styled(
                        code_line.to_string(),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
            }
            Event::Text(text) => current.push(Span::styled(text.to_string(), styles.current())),
            Event::Code(code) => current.push(Span::styled(
                code.to_string(),
                Style::default().add_modifier(Modifier::REVERSED),
            )),
            Event::SoftBreak if current.is_empty() => {}
            Event::SoftBreak => current.push(Span::raw(" ")),
            Event::HardBreak => flush(&mut current, &mut lines),
            Event::InlineHtml(html) | Event::Html(html) => {
                if is_line_break(&html) {
                    flush(&mut current, &mut lines);
                }
            }
            Event::Rule => {
                flush(&mut current, &mut lines);
                lines.push(Line::from("─".repeat(8)));
            }
            Event::TaskListMarker(done) => {
                current.push(Span::raw(if done { "[x] " } else { "[ ] " }));
            }
            _ => {}
        }
    }
    flush(&mut current, &mut lines);
    lines
}

fn is_line_break(html: &str) -> bool {
    let tag = html.trim().to_ascii_lowercase();
    matches!(tag.as_str(), "<br>" | "<br/>" | "<br />")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn paragraphs_and_hard_breaks_become_lines() {
        let rendered = render_markdown("first  \nsecond\n\nthird");
        let text: Vec<String> = rendered.lines.iter().map(plain).collect();
        assert_eq!(text, vec!["first", "second", "third"]);
        assert!(rendered.comment.is_none());
    }

    #[test]
    fn html_break_splits_line() {
        let rendered = render_markdown("one<br>\ntwo");
        let text: Vec<String> = rendered.lines.iter().map(plain).collect();
        assert_eq!(text, vec!["one", "two"]);
    }

    #[test]
    fn comment_block_is_extracted() {
        let rendered = render_markdown("body\n\n<comment>\npeek\n</comment>");
        assert_eq!(rendered.comment.as_deref(), Some("peek"));
        let text: Vec<String> = rendered.lines.iter().map(plain).collect();
        assert_eq!(text, vec!["body"]);
    }

    #[test]
    fn empty_comment_is_none() {
        let (body, comment) = split_comment("x\n\n<comment>\n\n</comment>");
        assert_eq!(body, "x");
        assert!(comment.is_none());
    }

    #[test]
    fn list_items_get_bullets_and_emphasis_is_styled() {
        let rendered = render_markdown("- **bold** item\n- other");
        assert_eq!(plain(&rendered.lines[0]), "• bold item");
        assert!(rendered.lines[0].spans[1]
            .style
            .add_modifier
            .contains(Modifier::BOLD));
        assert_eq!(plain(&rendered.lines[1]), "• other");
    }
}
