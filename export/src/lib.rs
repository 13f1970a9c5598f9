//! Report export as a small, deterministic PDF.
//!
//! Text is set in the standard Helvetica font with `WinAnsiEncoding`, so only
//! Latin-1 survives; see [`sanitize_latin1`] for what happens to the rest.
//! Identical input always produces identical bytes.

use std::borrow::Cow;

use bytes::Bytes;
use lopdf::Document;
use lopdf::Object;
use lopdf::ObjectId;
use lopdf::Stream;
use lopdf::StringFormat;
use lopdf::content::Content;
use lopdf::content::Operation;
use lopdf::dictionary;
use thiserror::Error;
use tracing::warn;

mod latin1;

pub use latin1::Latin1Text;
pub use latin1::PLACEHOLDER;
pub use latin1::sanitize_latin1;

use latin1::encode_line;

const PDF_VERSION: &str = "1.4";
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const FONT_NAME: &str = "F1";
const FONT_SIZE: i64 = 11;
const LEADING: i64 = 14;
const WRAP_COLUMNS: usize = 90;
/// Baselines that fit between the top and bottom margins.
const LINES_PER_PAGE: usize = 53;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to build PDF: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("failed to serialize PDF: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Audit,
    Rewrite,
}

impl ReportKind {
    pub fn filename(self) -> &'static str {
        match self {
            ReportKind::Audit => "Security_Audit.pdf",
            ReportKind::Rewrite => "Refined.pdf",
        }
    }

    fn title(self) -> &'static str {
        match self {
            ReportKind::Audit => "Kritikos Security Audit",
            ReportKind::Rewrite => "Kritikos Refined Text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedReport {
    pub filename: &'static str,
    pub bytes: Bytes,
    /// Characters that were replaced by [`PLACEHOLDER`].
    pub replaced: usize,
}

/// Sanitize and wrap `text` into the lines that will be drawn, one entry per
/// output line. Blank source lines are kept.
pub fn layout_lines(text: &str) -> (Vec<String>, usize) {
    let Latin1Text { text, replaced } = sanitize_latin1(text);
    let lines = text
        .split('\n')
        .flat_map(|line| {
            textwrap::wrap(line, WRAP_COLUMNS)
                .into_iter()
                .map(Cow::into_owned)
                .collect::<Vec<_>>()
        })
        .collect();
    (lines, replaced)
}

pub fn export_report(kind: ReportKind, text: &str) -> Result<ExportedReport, ExportError> {
    let (lines, replaced) = layout_lines(text);
    if replaced > 0 {
        warn!(
            replaced,
            filename = kind.filename(),
            "replaced characters outside Latin-1 in export"
        );
    }
    let bytes = render_pdf(kind.title(), &lines)?;
    Ok(ExportedReport {
        filename: kind.filename(),
        bytes: Bytes::from(bytes),
        replaced,
    })
}

fn render_pdf(title: &str, lines: &[String]) -> Result<Vec<u8>, ExportError> {
    let mut doc = Document::with_version(PDF_VERSION);
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_NAME => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    let chunks: Vec<&[String]> = if lines.is_empty() {
        vec![lines]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };
    for chunk in chunks {
        let page_id = add_page(&mut doc, pages_id, resources_id, chunk)?;
        kids.push(page_id.into());
    }

    let page_count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(title),
        "Producer" => Object::string_literal("Kritikos"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    lines: &[String],
) -> Result<ObjectId, ExportError> {
    let first_baseline = PAGE_HEIGHT - MARGIN - FONT_SIZE;
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![FONT_NAME.into(), FONT_SIZE.into()]),
        Operation::new("TL", vec![LEADING.into()]),
        Operation::new("Td", vec![MARGIN.into(), first_baseline.into()]),
    ];
    for (idx, line) in lines.iter().enumerate() {
        if idx > 0 {
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encode_line(line), StringFormat::Literal)],
        ));
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations }.encode()?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));
    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Resources" => resources_id,
        "Contents" => content_id,
    }))
}
