//! Data model for the Docs API document tree.
//!
//! Structural and paragraph elements arrive as objects carrying exactly one
//! of several optional variant fields (plus index metadata we ignore). The
//! structs here mirror that wire shape; `kind()` accessors project them onto
//! enums so conversion code can match exhaustively.

use std::collections::HashMap;

use serde::Deserialize;

/// A fetched document: ordered root-level tabs, each possibly nested.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    pub title: Option<String>,
    pub tabs: Vec<Tab>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tab {
    pub tab_properties: Option<TabProperties>,
    pub document_tab: Option<DocumentTab>,
    pub child_tabs: Vec<Tab>,
}

impl Tab {
    /// Display title of the tab, falling back to "Untitled".
    pub fn title(&self) -> &str {
        self.tab_properties
            .as_ref()
            .and_then(|p| p.title.as_deref())
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TabProperties {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentTab {
    pub body: Option<Body>,
    pub lists: HashMap<String, List>,
    pub inline_objects: HashMap<String, InlineObject>,
}

impl DocumentTab {
    /// Glyph type configured for a list at the given nesting level, if any.
    pub fn glyph_type(&self, list_id: &str, nesting_level: i64) -> Option<&str> {
        let props = self.lists.get(list_id)?.list_properties.as_ref()?;
        let idx = usize::try_from(nesting_level).ok()?;
        props.nesting_levels.get(idx)?.glyph_type.as_deref()
    }

    /// Resolve an inline object reference down to its embedded object.
    pub fn embedded_object(&self, object_id: &str) -> Option<&EmbeddedObject> {
        self.inline_objects
            .get(object_id)?
            .inline_object_properties
            .as_ref()?
            .embedded_object
            .as_ref()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Body {
    pub content: Vec<StructuralElement>,
}

/// One body-level element. Exactly one variant field is set on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StructuralElement {
    pub paragraph: Option<Paragraph>,
    pub table: Option<Table>,
    pub section_break: Option<serde_json::Value>,
    pub table_of_contents: Option<serde_json::Value>,
}

/// Borrowed view of a structural element for exhaustive dispatch.
#[derive(Debug)]
pub enum ElementKind<'a> {
    Paragraph(&'a Paragraph),
    Table(&'a Table),
    SectionBreak,
    TableOfContents,
    Unknown,
}

impl StructuralElement {
    pub fn kind(&self) -> ElementKind<'_> {
        if let Some(p) = &self.paragraph {
            ElementKind::Paragraph(p)
        } else if let Some(t) = &self.table {
            ElementKind::Table(t)
        } else if self.section_break.is_some() {
            ElementKind::SectionBreak
        } else if self.table_of_contents.is_some() {
            ElementKind::TableOfContents
        } else {
            ElementKind::Unknown
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Paragraph {
    pub paragraph_style: Option<ParagraphStyle>,
    pub bullet: Option<Bullet>,
    pub elements: Vec<ParagraphElement>,
}

impl Paragraph {
    pub fn named_style(&self) -> Option<&str> {
        self.paragraph_style
            .as_ref()
            .and_then(|s| s.named_style_type.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParagraphStyle {
    pub named_style_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Bullet {
    pub list_id: Option<String>,
    pub nesting_level: i64,
}

/// One inline element of a paragraph. Exactly one variant field is set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParagraphElement {
    pub text_run: Option<TextRun>,
    pub inline_object_element: Option<InlineObjectElement>,
    pub horizontal_rule: Option<serde_json::Value>,
}

#[derive(Debug)]
pub enum ParagraphElementKind<'a> {
    TextRun(&'a TextRun),
    InlineObject(&'a InlineObjectElement),
    HorizontalRule,
    Unknown,
}

impl ParagraphElement {
    pub fn kind(&self) -> ParagraphElementKind<'_> {
        if let Some(tr) = &self.text_run {
            ParagraphElementKind::TextRun(tr)
        } else if let Some(obj) = &self.inline_object_element {
            ParagraphElementKind::InlineObject(obj)
        } else if self.horizontal_rule.is_some() {
            ParagraphElementKind::HorizontalRule
        } else {
            ParagraphElementKind::Unknown
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextRun {
    pub content: String,
    pub text_style: Option<TextStyle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub weighted_font_family: Option<WeightedFontFamily>,
    pub link: Option<Link>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeightedFontFamily {
    pub font_family: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Link {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InlineObjectElement {
    pub inline_object_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Table {
    pub table_rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableRow {
    pub table_cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableCell {
    pub content: Vec<StructuralElement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct List {
    pub list_properties: Option<ListProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListProperties {
    pub nesting_levels: Vec<NestingLevel>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NestingLevel {
    pub glyph_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InlineObject {
    pub inline_object_properties: Option<InlineObjectProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InlineObjectProperties {
    pub embedded_object: Option<EmbeddedObject>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddedObject {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_properties: Option<ImageProperties>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageProperties {
    pub content_uri: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_document() {
        let json = serde_json::json!({
            "title": "My Doc",
            "tabs": [{
                "tabProperties": { "title": "First", "tabId": "t.0" },
                "documentTab": {
                    "body": {
                        "content": [
                            {
                                "startIndex": 1,
                                "endIndex": 7,
                                "paragraph": {
                                    "paragraphStyle": { "namedStyleType": "HEADING_1" },
                                    "elements": [
                                        { "textRun": { "content": "Hello\n", "textStyle": { "bold": true } } }
                                    ]
                                }
                            },
                            { "sectionBreak": { "sectionStyle": {} } }
                        ]
                    },
                    "lists": {
                        "kix.abc": {
                            "listProperties": {
                                "nestingLevels": [ { "glyphType": "DECIMAL" }, {} ]
                            }
                        }
                    },
                    "inlineObjects": {}
                },
                "childTabs": [ { "tabProperties": { "title": "Nested" } } ]
            }]
        });

        let doc: Document = serde_json::from_value(json).unwrap();
        assert_eq!(doc.title.as_deref(), Some("My Doc"));
        assert_eq!(doc.tabs.len(), 1);

        let tab = &doc.tabs[0];
        assert_eq!(tab.title(), "First");
        assert_eq!(tab.child_tabs[0].title(), "Nested");

        let doc_tab = tab.document_tab.as_ref().unwrap();
        assert_eq!(doc_tab.glyph_type("kix.abc", 0), Some("DECIMAL"));
        assert_eq!(doc_tab.glyph_type("kix.abc", 1), None);
        assert_eq!(doc_tab.glyph_type("kix.missing", 0), None);

        let body = doc_tab.body.as_ref().unwrap();
        match body.content[0].kind() {
            ElementKind::Paragraph(p) => {
                assert_eq!(p.named_style(), Some("HEADING_1"));
                let run = match p.elements[0].kind() {
                    ParagraphElementKind::TextRun(tr) => tr,
                    other => panic!("expected text run, got {other:?}"),
                };
                assert_eq!(run.content, "Hello\n");
                assert!(run.text_style.as_ref().unwrap().bold);
            }
            other => panic!("expected paragraph, got {other:?}"),
        }
        assert!(matches!(body.content[1].kind(), ElementKind::SectionBreak));
    }

    #[test]
    fn test_tab_title_fallback() {
        let tab = Tab::default();
        assert_eq!(tab.title(), "Untitled");

        let tab = Tab {
            tab_properties: Some(TabProperties {
                title: Some(String::new()),
            }),
            ..Tab::default()
        };
        assert_eq!(tab.title(), "Untitled");
    }

    #[test]
    fn test_element_kind_unknown() {
        let elem = StructuralElement::default();
        assert!(matches!(elem.kind(), ElementKind::Unknown));
        let elem = ParagraphElement::default();
        assert!(matches!(elem.kind(), ParagraphElementKind::Unknown));
    }
}
