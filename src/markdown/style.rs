//! Inline text styling.

use crate::docs::{TextRun, TextStyle};

/// Render one styled text run as Markdown.
///
/// Composition order is fixed: bold/italic innermost, then strikethrough,
/// then the link wrap, so strikethrough crosses through the emphasis and a
/// link anchors the fully styled label.
pub(super) fn render_text_run(run: &TextRun) -> String {
    let content = run.content.as_str();

    // Bare newline runs are structural markers, not styled text.
    if content == "\n" {
        return content.to_string();
    }

    let Some(style) = &run.text_style else {
        return content.to_string();
    };

    // Monospace fonts become inline code and suppress all other styling.
    if is_monospace(style) && !content.trim().is_empty() {
        return format!("`{}`", content.trim());
    }

    // Detach a trailing newline so markers don't swallow it; re-append last.
    let trailing_newline = content.ends_with('\n');
    let stripped = content.trim_end_matches('\n');
    if stripped.is_empty() {
        return if trailing_newline {
            "\n".to_string()
        } else {
            String::new()
        };
    }

    let mut text = stripped.to_string();
    if style.bold && style.italic {
        text = format!("***{text}***");
    } else if style.bold {
        text = format!("**{text}**");
    } else if style.italic {
        text = format!("*{text}*");
    }
    if style.strikethrough {
        text = format!("~~{text}~~");
    }
    if let Some(url) = style.link.as_ref().and_then(|l| l.url.as_deref()) {
        if !url.is_empty() {
            text = format!("[{text}]({url})");
        }
    }

    if trailing_newline {
        text.push('\n');
    }
    text
}

fn is_monospace(style: &TextStyle) -> bool {
    let Some(weighted) = &style.weighted_font_family else {
        return false;
    };
    let family = weighted.font_family.to_lowercase();
    match family.as_str() {
        "courier new" | "consolas" | "roboto mono" | "source code pro" | "fira code"
        | "jetbrains mono" | "ubuntu mono" | "ibm plex mono" | "dejavu sans mono" | "menlo"
        | "monaco" | "andale mono" => true,
        _ => family.contains("mono") || family.contains("courier"),
    }
}
