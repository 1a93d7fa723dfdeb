// src/services/document_renderer.rs
//! Printable certificate documents.
//!
//! Renders a single-page A4 PDF with `lopdf` using the standard Helvetica
//! fonts, so the output needs no embedded font data. Text outside printable
//! ASCII is replaced with `?`.

use crate::models::certificate::Certificate;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 72;

/// One line of text placed on the page.
struct Line {
    bold: bool,
    size: i64,
    text: String,
}

impl Line {
    fn regular(size: i64, text: impl Into<String>) -> Self {
        Self { bold: false, size, text: text.into() }
    }

    fn bold(size: i64, text: impl Into<String>) -> Self {
        Self { bold: true, size, text: text.into() }
    }
}

/// Renders the printable document of `certificate`.
///
/// # Arguments
/// * `certificate` - Record to render
/// * `issuer` - Issuing authority printed as the heading
/// * `verify_url_base` - Public verification page; the uuid is appended
///
/// # Returns
/// The complete PDF file.
///
/// # Errors
/// Fails only if the content stream or document cannot be serialized.
pub fn render_certificate(
    certificate: &Certificate,
    issuer: &str,
    verify_url_base: &str,
) -> Result<Vec<u8>, lopdf::Error> {
    let lines = vec![
        Line::bold(22, issuer.to_uppercase()),
        Line::bold(16, "CERTIFICATE OF COMPLETION"),
        Line::regular(12, "This is to certify that"),
        Line::bold(20, certificate.student.name.clone()),
        Line::regular(12, "has successfully completed all requirements for the degree of"),
        Line::bold(16, certificate.degree.clone()),
        Line::regular(12, format!("in {}", certificate.program)),
        Line::regular(12, format!("Issued on: {}", certificate.issue_date.format("%B %d, %Y"))),
        Line::regular(10, format!("Student ID: {}", certificate.student.student_id)),
        Line::regular(10, format!("Certificate ID: {}", certificate.uuid)),
        Line::regular(
            10,
            format!("Verify at: {}/{}", verify_url_base.trim_end_matches('/'), certificate.uuid),
        ),
    ];
    build_document(content(&lines))
}

fn content(lines: &[Line]) -> Content {
    let mut operations = Vec::with_capacity(lines.len() * 4);
    let mut y = PAGE_HEIGHT - MARGIN;
    for line in lines {
        y = (y - line.size * 2).max(0);
        let font = if line.bold { "F2" } else { "F1" };
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec![font.into(), Object::Integer(line.size)]));
        operations.push(Operation::new("Td", vec![Object::Integer(MARGIN), Object::Integer(y)]));
        operations.push(Operation::new("Tj", vec![Object::string_literal(printable(&line.text))]));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }
}

/// Replaces characters the standard fonts cannot show.
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { '?' })
        .collect()
}

fn build_document(content: Content) -> Result<Vec<u8>, lopdf::Error> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => Object::Integer(1),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}
