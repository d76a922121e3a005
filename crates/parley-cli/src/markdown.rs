use console::Style;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};

use crate::theme::Theme;

/// Render markdown to styled terminal text.
///
/// Covers what chat replies actually use: headings, emphasis, inline code,
/// fenced code, lists, links and rules. Anything else falls through as text.
pub fn render_markdown(source: &str, theme: &Theme) -> String {
    let mut out = String::new();
    let mut bold = 0usize;
    let mut italic = 0usize;
    let mut heading = false;
    let mut code_block = false;
    // One entry per open list: the next number for ordered lists.
    let mut lists: Vec<Option<u64>> = Vec::new();
    let mut link_targets: Vec<String> = Vec::new();

    for event in Parser::new(source) {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                ensure_blank_line(&mut out);
                heading = true;
            }
            Event::End(TagEnd::Heading(_)) => {
                heading = false;
                out.push_str("\n\n");
            }
            Event::Start(Tag::Paragraph) => {
                if lists.is_empty() {
                    ensure_blank_line(&mut out);
                }
            }
            Event::End(TagEnd::Paragraph) => {
                out.push('\n');
                if lists.is_empty() {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Strong) => bold += 1,
            Event::End(TagEnd::Strong) => bold = bold.saturating_sub(1),
            Event::Start(Tag::Emphasis) => italic += 1,
            Event::End(TagEnd::Emphasis) => italic = italic.saturating_sub(1),
            Event::Start(Tag::CodeBlock(_)) => {
                ensure_blank_line(&mut out);
                code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                code_block = false;
                out.push('\n');
            }
            Event::Start(Tag::List(start)) => {
                if lists.is_empty() {
                    ensure_blank_line(&mut out);
                } else if !out.ends_with('\n') {
                    out.push('\n');
                }
                lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                lists.pop();
                if lists.is_empty() {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Item) => {
                let indent = "  ".repeat(lists.len().saturating_sub(1));
                let marker = match lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{n}.");
                        *n += 1;
                        marker
                    }
                    _ => "•".to_string(),
                };
                out.push_str(&format!("{indent}{marker} "));
            }
            Event::End(TagEnd::Item) => {
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            Event::Start(Tag::Link { dest_url, .. }) => link_targets.push(dest_url.to_string()),
            Event::End(TagEnd::Link) => {
                if let Some(url) = link_targets.pop() {
                    out.push_str(&format!(" {}", theme.muted.apply_to(format!("({url})"))));
                }
            }
            Event::Text(text) => {
                if code_block {
                    for line in text.lines() {
                        out.push_str(&format!("    {}\n", theme.code.apply_to(line)));
                    }
                } else {
                    let style = inline_style(theme, heading, bold > 0, italic > 0);
                    out.push_str(&style.apply_to(&*text).to_string());
                }
            }
            Event::Code(code) => {
                out.push_str(&theme.code.apply_to(&*code).to_string());
            }
            Event::SoftBreak => out.push(' '),
            Event::HardBreak => out.push('\n'),
            Event::Rule => {
                ensure_blank_line(&mut out);
                out.push_str(&theme.muted.apply_to("─".repeat(40)).to_string());
                out.push_str("\n\n");
            }
            _ => {}
        }
    }

    out.trim_end().to_string()
}

fn inline_style(theme: &Theme, heading: bool, bold: bool, italic: bool) -> Style {
    let mut style = if heading {
        theme.heading.clone()
    } else {
        Style::new()
    };
    if bold {
        style = style.bold();
    }
    if italic {
        style = style.italic();
    }
    style
}

fn ensure_blank_line(out: &mut String) {
    if out.is_empty() || out.ends_with("\n\n") {
        return;
    }
    if out.ends_with('\n') {
        out.push('\n');
    } else {
        out.push_str("\n\n");
    }
}
