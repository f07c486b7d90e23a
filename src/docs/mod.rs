//! Google Docs API collaborators
//!
//! Wire-faithful data model for the subset of the Docs API v1 document tree
//! the converter consumes, plus the single-call fetch client.

mod client;
mod model;

pub use client::{DocsClient, FetchError};
pub use model::{
    Body, Bullet, Document, DocumentTab, ElementKind, EmbeddedObject, ImageProperties,
    InlineObject, InlineObjectElement, InlineObjectProperties, Link, List, ListProperties,
    NestingLevel, Paragraph, ParagraphElement, ParagraphElementKind, ParagraphStyle,
    StructuralElement, Tab, TabProperties, Table, TableCell, TableRow, TextRun, TextStyle,
    WeightedFontFamily,
};
