//! Structural walker: turns one tab's body into Markdown.

use std::fmt::Write as _;

use crate::docs::{
    Bullet, ElementKind, InlineObjectElement, Paragraph, ParagraphElement, ParagraphElementKind,
    Tab,
};

use super::list::{is_ordered_glyph, ListTracker};
use super::style::render_text_run;

/// Markdown output of one tab plus the images discovered inside it.
#[derive(Debug)]
pub struct ConvertResult {
    pub markdown: String,
    pub images: Vec<ImageRequest>,
}

/// An inline image to download. Created once during conversion, consumed
/// once by the download phase.
#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub object_id: String,
    pub content_uri: String,
    pub filename: String,
}

/// Convert a single tab to Markdown.
///
/// Pure function of its inputs: each call owns a fresh list tracker and
/// image counter, so tabs can be converted in parallel without shared state.
/// `tab_index` is the tab's position in the flattened document and makes
/// image filenames globally unique across tabs.
pub fn convert_tab(tab: &Tab, title: &str, tab_index: usize) -> ConvertResult {
    let mut converter = TabConverter::new(tab, tab_index);
    converter.write_heading(title, 1);
    if let Some(body) = tab.document_tab.as_ref().and_then(|dt| dt.body.as_ref()) {
        for element in &body.content {
            converter.convert_element(element);
        }
    }
    ConvertResult {
        markdown: converter.out,
        images: converter.images,
    }
}

pub(super) struct TabConverter<'a> {
    tab: &'a Tab,
    tab_index: usize,
    pub(super) out: String,
    images: Vec<ImageRequest>,
    image_count: usize,
    list: ListTracker,
}

impl<'a> TabConverter<'a> {
    fn new(tab: &'a Tab, tab_index: usize) -> Self {
        Self {
            tab,
            tab_index,
            out: String::new(),
            images: Vec::new(),
            image_count: 0,
            list: ListTracker::default(),
        }
    }

    fn convert_element(&mut self, element: &crate::docs::StructuralElement) {
        match element.kind() {
            ElementKind::Paragraph(p) => self.convert_paragraph(p),
            ElementKind::Table(t) => self.render_table(t),
            // Section breaks carry no content; the document's own table of
            // contents is skipped because the export writes its own index.
            ElementKind::SectionBreak | ElementKind::TableOfContents | ElementKind::Unknown => {}
        }
    }

    fn convert_paragraph(&mut self, paragraph: &Paragraph) {
        if let Some(bullet) = &paragraph.bullet {
            self.write_list_item(paragraph, bullet);
            return;
        }

        // A non-list paragraph ends any active list.
        self.list.reset();

        let text = self.render_elements(&paragraph.elements);

        // Keep intentional spacing: an empty paragraph is one blank line.
        if text.trim().is_empty() {
            self.out.push('\n');
            return;
        }

        let level = heading_level(paragraph.named_style());
        if level > 0 {
            self.write_heading(&text, level);
            return;
        }

        self.out.push_str(text.trim_end_matches('\n'));
        self.out.push_str("\n\n");
    }

    fn write_list_item(&mut self, paragraph: &Paragraph, bullet: &Bullet) {
        let list_id = bullet.list_id.as_deref().unwrap_or("");
        let nesting_level = bullet.nesting_level.max(0);

        let ordered = self
            .tab
            .document_tab
            .as_ref()
            .and_then(|dt| dt.glyph_type(list_id, nesting_level))
            .is_some_and(is_ordered_glyph);

        let number = self.list.enter_item(list_id, nesting_level);

        let text = self.render_elements(&paragraph.elements);
        let text = text.trim();
        let indent = "  ".repeat(nesting_level as usize);

        // Consecutive list items are not separated by blank lines.
        if ordered {
            writeln!(self.out, "{indent}{number}. {text}").ok();
        } else {
            writeln!(self.out, "{indent}- {text}").ok();
        }
    }

    /// Render paragraph elements in order, concatenated.
    pub(super) fn render_elements(&mut self, elements: &[ParagraphElement]) -> String {
        let mut text = String::new();
        for element in elements {
            match element.kind() {
                ParagraphElementKind::TextRun(run) => text.push_str(&render_text_run(run)),
                ParagraphElementKind::InlineObject(obj) => {
                    text.push_str(&self.render_inline_object(obj));
                }
                ParagraphElementKind::HorizontalRule => text.push_str("\n---\n"),
                ParagraphElementKind::Unknown => {}
            }
        }
        text
    }

    /// Resolve an inline image and register it for download.
    ///
    /// Unresolvable references and embeds without a content URI render as
    /// nothing; a broken image must not abort the conversion.
    fn render_inline_object(&mut self, element: &InlineObjectElement) -> String {
        let Some(embedded) = self
            .tab
            .document_tab
            .as_ref()
            .and_then(|dt| dt.embedded_object(&element.inline_object_id))
        else {
            return String::new();
        };
        let Some(uri) = embedded
            .image_properties
            .as_ref()
            .and_then(|p| p.content_uri.as_deref())
            .filter(|u| !u.is_empty())
        else {
            return String::new();
        };

        self.image_count += 1;
        let ext = image_extension(uri);
        let filename = format!("tab{}_image_{:03}{}", self.tab_index, self.image_count, ext);

        let alt = embedded
            .title
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| embedded.description.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(&filename);
        let markup = format!("![{alt}](images/{filename})");

        self.images.push(ImageRequest {
            object_id: element.inline_object_id.clone(),
            content_uri: uri.to_string(),
            filename,
        });

        markup
    }

    fn write_heading(&mut self, text: &str, level: usize) {
        writeln!(self.out, "{} {}", "#".repeat(level), text.trim()).ok();
        self.out.push('\n');
    }
}

fn heading_level(named_style: Option<&str>) -> usize {
    match named_style.unwrap_or("") {
        "HEADING_1" | "TITLE" => 1,
        "HEADING_2" | "SUBTITLE" => 2,
        "HEADING_3" => 3,
        "HEADING_4" => 4,
        "HEADING_5" => 5,
        "HEADING_6" => 6,
        _ => 0,
    }
}

/// Guess a file extension from the content URI. A heuristic, not a
/// content-type sniff; unrecognized URIs default to `.jpg`.
fn image_extension(uri: &str) -> &'static str {
    let lower = uri.to_lowercase();
    if lower.contains(".png") {
        ".png"
    } else if lower.contains(".gif") {
        ".gif"
    } else if lower.contains(".svg") {
        ".svg"
    } else if lower.contains(".webp") {
        ".webp"
    } else {
        ".jpg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tab_from_json(value: serde_json::Value) -> Tab {
        serde_json::from_value(value).unwrap()
    }

    fn text_paragraph(content: &str) -> serde_json::Value {
        json!({ "paragraph": { "elements": [ { "textRun": { "content": content } } ] } })
    }

    #[test]
    fn test_title_heading_and_paragraph() {
        let tab = tab_from_json(json!({
            "documentTab": { "body": { "content": [ text_paragraph("Hello world\n") ] } }
        }));
        let result = convert_tab(&tab, "My Tab", 0);
        assert_eq!(result.markdown, "# My Tab\n\nHello world\n\n");
        assert!(result.images.is_empty());
    }

    #[test]
    fn test_heading_styles() {
        let tab = tab_from_json(json!({
            "documentTab": { "body": { "content": [
                { "paragraph": {
                    "paragraphStyle": { "namedStyleType": "HEADING_2" },
                    "elements": [ { "textRun": { "content": "Section\n" } } ]
                } },
                { "paragraph": {
                    "paragraphStyle": { "namedStyleType": "SUBTITLE" },
                    "elements": [ { "textRun": { "content": "Sub\n" } } ]
                } }
            ] } }
        }));
        let result = convert_tab(&tab, "T", 0);
        assert!(result.markdown.contains("## Section\n\n"));
        assert!(result.markdown.contains("## Sub\n\n"));
    }

    #[test]
    fn test_blank_paragraph_preserves_spacing() {
        let tab = tab_from_json(json!({
            "documentTab": { "body": { "content": [
                text_paragraph("a\n"),
                text_paragraph("\n"),
                text_paragraph("b\n")
            ] } }
        }));
        let result = convert_tab(&tab, "T", 0);
        assert_eq!(result.markdown, "# T\n\na\n\n\nb\n\n");
    }

    #[test]
    fn test_section_break_and_toc_skipped() {
        let tab = tab_from_json(json!({
            "documentTab": { "body": { "content": [
                { "sectionBreak": {} },
                { "tableOfContents": { "content": [] } },
                text_paragraph("kept\n")
            ] } }
        }));
        let result = convert_tab(&tab, "T", 0);
        assert_eq!(result.markdown, "# T\n\nkept\n\n");
    }

    #[test]
    fn test_horizontal_rule() {
        let tab = tab_from_json(json!({
            "documentTab": { "body": { "content": [
                { "paragraph": { "elements": [ { "horizontalRule": {} } ] } }
            ] } }
        }));
        let result = convert_tab(&tab, "T", 0);
        assert!(result.markdown.contains("---"));
    }

    #[test]
    fn test_ordered_and_unordered_lists() {
        let tab = tab_from_json(json!({
            "documentTab": {
                "lists": {
                    "num": { "listProperties": { "nestingLevels": [
                        { "glyphType": "DECIMAL" }, { "glyphType": "DECIMAL" }
                    ] } },
                    "bul": { "listProperties": { "nestingLevels": [
                        { "glyphType": "GLYPH_TYPE_UNSPECIFIED" }
                    ] } }
                },
                "body": { "content": [
                    { "paragraph": { "bullet": { "listId": "num", "nestingLevel": 0 },
                        "elements": [ { "textRun": { "content": "one\n" } } ] } },
                    { "paragraph": { "bullet": { "listId": "num", "nestingLevel": 1 },
                        "elements": [ { "textRun": { "content": "nested\n" } } ] } },
                    { "paragraph": { "bullet": { "listId": "num", "nestingLevel": 0 },
                        "elements": [ { "textRun": { "content": "two\n" } } ] } },
                    { "paragraph": { "bullet": { "listId": "bul" },
                        "elements": [ { "textRun": { "content": "dash\n" } } ] } }
                ] }
            }
        }));
        let result = convert_tab(&tab, "T", 0);
        assert!(result.markdown.contains("1. one\n  1. nested\n2. two\n"));
        assert!(result.markdown.contains("- dash\n"));
    }

    #[test]
    fn test_list_without_definition_is_unordered() {
        let tab = tab_from_json(json!({
            "documentTab": { "body": { "content": [
                { "paragraph": { "bullet": { "listId": "ghost", "nestingLevel": 0 },
                    "elements": [ { "textRun": { "content": "item\n" } } ] } }
            ] } }
        }));
        let result = convert_tab(&tab, "T", 0);
        assert!(result.markdown.contains("- item\n"));
    }

    #[test]
    fn test_non_list_paragraph_resets_numbering() {
        let tab = tab_from_json(json!({
            "documentTab": {
                "lists": { "num": { "listProperties": { "nestingLevels": [
                    { "glyphType": "DECIMAL" }
                ] } } },
                "body": { "content": [
                    { "paragraph": { "bullet": { "listId": "num", "nestingLevel": 0 },
                        "elements": [ { "textRun": { "content": "first\n" } } ] } },
                    text_paragraph("interruption\n"),
                    { "paragraph": { "bullet": { "listId": "num", "nestingLevel": 0 },
                        "elements": [ { "textRun": { "content": "restarted\n" } } ] } }
                ] }
            }
        }));
        let result = convert_tab(&tab, "T", 0);
        assert!(result.markdown.contains("1. first\n"));
        assert!(result.markdown.contains("1. restarted\n"));
        assert!(!result.markdown.contains("2. restarted"));
    }

    #[test]
    fn test_inline_image_naming_and_alt_priority() {
        let tab = tab_from_json(json!({
            "documentTab": {
                "inlineObjects": {
                    "obj1": { "inlineObjectProperties": { "embeddedObject": {
                        "title": "Diagram",
                        "description": "ignored",
                        "imageProperties": { "contentUri": "https://img.example/a.png" }
                    } } },
                    "obj2": { "inlineObjectProperties": { "embeddedObject": {
                        "description": "From description",
                        "imageProperties": { "contentUri": "https://img.example/b?id=2" }
                    } } }
                },
                "body": { "content": [
                    { "paragraph": { "elements": [
                        { "inlineObjectElement": { "inlineObjectId": "obj1" } },
                        { "inlineObjectElement": { "inlineObjectId": "obj2" } }
                    ] } }
                ] }
            }
        }));
        let result = convert_tab(&tab, "T", 3);
        assert_eq!(result.images.len(), 2);
        assert_eq!(result.images[0].filename, "tab3_image_001.png");
        assert_eq!(result.images[1].filename, "tab3_image_002.jpg");
        assert!(result.markdown.contains("![Diagram](images/tab3_image_001.png)"));
        assert!(result
            .markdown
            .contains("![From description](images/tab3_image_002.jpg)"));
    }

    #[test]
    fn test_alt_falls_back_to_filename() {
        let tab = tab_from_json(json!({
            "documentTab": {
                "inlineObjects": {
                    "obj1": { "inlineObjectProperties": { "embeddedObject": {
                        "imageProperties": { "contentUri": "https://img.example/x.webp" }
                    } } }
                },
                "body": { "content": [
                    { "paragraph": { "elements": [
                        { "inlineObjectElement": { "inlineObjectId": "obj1" } }
                    ] } }
                ] }
            }
        }));
        let result = convert_tab(&tab, "T", 0);
        assert!(result
            .markdown
            .contains("![tab0_image_001.webp](images/tab0_image_001.webp)"));
    }

    #[test]
    fn test_unresolved_inline_object_skipped_silently() {
        let tab = tab_from_json(json!({
            "documentTab": { "body": { "content": [
                { "paragraph": { "elements": [
                    { "textRun": { "content": "before " } },
                    { "inlineObjectElement": { "inlineObjectId": "missing" } },
                    { "textRun": { "content": "after\n" } }
                ] } }
            ] } }
        }));
        let result = convert_tab(&tab, "T", 0);
        assert!(result.markdown.contains("before after\n"));
        assert!(result.images.is_empty());
    }

    #[test]
    fn test_image_extension_guess() {
        assert_eq!(image_extension("https://x/a.PNG?tok=1"), ".png");
        assert_eq!(image_extension("https://x/a.gif"), ".gif");
        assert_eq!(image_extension("https://x/a.svg"), ".svg");
        assert_eq!(image_extension("https://x/a.webp"), ".webp");
        assert_eq!(image_extension("https://x/opaque-blob"), ".jpg");
    }

    #[test]
    fn test_empty_tab_emits_only_title() {
        let tab = Tab::default();
        let result = convert_tab(&tab, "Empty", 0);
        assert_eq!(result.markdown, "# Empty\n\n");
    }
}
