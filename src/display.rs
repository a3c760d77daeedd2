//! Presentation helpers for the item tree.
//!
//! The store tracks true nesting depth; everything here is about how that
//! depth and the hidden-reply counts are shown: the "N more replies"
//! control, clamped indentation, and width-aware truncation of titles.

use crate::item::{Item, ItemKind, ItemTree};
use std::borrow::Cow;
use std::fmt::Write as _;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Default deepest indentation step; deeper comments render at this step.
pub const DEFAULT_MAX_INDENT_LEVEL: u32 = 5;

/// Label of the "load more" control for a frontier item, or `None` when the
/// item has no hidden replies (the control is not shown).
pub fn load_more_label(item: &Item) -> Option<String> {
    match item.unfetched() {
        0 => None,
        1 => Some("1 more reply".to_string()),
        n => Some(format!("{n} more replies")),
    }
}

/// Visual nesting step for `level`, saturating at `max_level`.
pub fn indent_level(level: u32, max_level: u32) -> u32 {
    level.min(max_level)
}

/// Ellipsis string used for truncation
const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Calculates the display width of a string in terminal columns.
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncates `s` to at most `max_width` terminal columns, appending "..."
/// when something was cut. Widths of 3 or less cut without an ellipsis.
///
/// ```
/// use threadline::display::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// assert_eq!(truncate_to_width("Test", 2), "Te");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if max_width == 0 {
        return Cow::Borrowed("");
    }
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }

    let budget = if max_width <= ELLIPSIS_WIDTH {
        max_width
    } else {
        max_width - ELLIPSIS_WIDTH
    };
    let mut width = 0;
    let mut cut = 0;
    for (idx, c) in s.char_indices() {
        let char_width = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + char_width > budget {
            break;
        }
        width += char_width;
        cut = idx + c.len_utf8();
    }

    if max_width <= ELLIPSIS_WIDTH {
        Cow::Owned(s[..cut].to_string())
    } else {
        Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS))
    }
}

/// Collapses newlines, tabs and other control characters into single
/// spaces so server text renders on one line.
pub fn single_line(s: &str) -> Cow<'_, str> {
    if !s.chars().any(char::is_control) && !s.contains("  ") {
        return Cow::Borrowed(s.trim());
    }
    let mut out = String::with_capacity(s.len());
    for word in s
        .split(|c: char| c.is_control() || c.is_whitespace())
        .filter(|w| !w.is_empty())
    {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    Cow::Owned(out)
}

/// Layout knobs for [`render_forest`].
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub max_indent_level: u32,
    /// Columns per indentation step
    pub indent_width: usize,
    /// Total line width, indentation included
    pub line_width: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            max_indent_level: DEFAULT_MAX_INDENT_LEVEL,
            indent_width: 2,
            line_width: 100,
        }
    }
}

fn headline(item: &Item) -> String {
    let content = item.content();
    match item.kind() {
        ItemKind::Story => {
            let title = content.title.as_deref().unwrap_or("(untitled)");
            let mut line = single_line(title).into_owned();
            if let Some(score) = content.score {
                let _ = write!(line, " ({score} points");
                if let Some(by) = &content.by {
                    let _ = write!(line, " by {by}");
                }
                line.push(')');
            }
            line
        }
        ItemKind::Comment => {
            let by = content.by.as_deref().unwrap_or("[deleted]");
            let text = content.text.as_deref().unwrap_or("");
            format!("{by}: {}", single_line(text))
        }
    }
}

/// Renders every materialized item in display order, one per line. A
/// frontier item's "more replies" line follows its materialized children,
/// where the hidden replies will be spliced in.
pub fn render_forest(tree: &ItemTree, options: &RenderOptions) -> String {
    let mut out = String::new();
    // Explicit stack: expansion can deepen a thread without bound
    let mut stack: Vec<Line<'_>> = tree.root_items().map(Line::Item).collect();
    stack.reverse();
    while let Some(line) = stack.pop() {
        match line {
            Line::Item(item) => {
                render_headline(item, options, &mut out);
                stack.push(Line::LoadMore(item));
                stack.extend(
                    item.children()
                        .iter()
                        .rev()
                        .filter_map(|id| tree.get(id))
                        .map(Line::Item),
                );
            }
            Line::LoadMore(item) => {
                if let Some(label) = load_more_label(item) {
                    let depth =
                        indent_level(item.level() + 1, options.max_indent_level) as usize;
                    let _ = writeln!(out, "{}+ {label}", " ".repeat(depth * options.indent_width));
                }
            }
        }
    }
    out
}

/// Pending output of [`render_forest`]
enum Line<'a> {
    Item(&'a Item),
    /// Emitted after the item's materialized children
    LoadMore(&'a Item),
}

fn render_headline(item: &Item, options: &RenderOptions, out: &mut String) {
    let depth = indent_level(item.level(), options.max_indent_level) as usize;
    let indent = " ".repeat(depth * options.indent_width);
    let suffix = format!(" [{}]", item.id());
    let room = options
        .line_width
        .saturating_sub(indent.len() + display_width(&suffix));
    let _ = writeln!(
        out,
        "{indent}{}{suffix}",
        truncate_to_width(&headline(item), room)
    );
}
