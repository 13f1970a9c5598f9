//! Turns what the user supplied for an audit into a gateway payload source.

use std::ffi::OsStr;
use std::path::Path;

use kritikos_utils_image::ValidatedImage;
use tracing::debug;

use crate::error::InputError;

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];
const PDF_EXTENSION: &str = "pdf";

#[derive(Debug, Clone, PartialEq)]
pub enum AuditInput {
    Text(String),
    Image(ValidatedImage),
}

impl AuditInput {
    /// Short summary for logs; never includes the content itself.
    pub fn describe(&self) -> String {
        match self {
            AuditInput::Text(text) => format!("{} characters of text", text.chars().count()),
            AuditInput::Image(image) => format!(
                "{} image, {}x{}",
                image.mime_type(),
                image.width,
                image.height
            ),
        }
    }
}

/// Load an uploaded file. Raster images are validated and passed through,
/// PDFs contribute their page text in page order, and everything else must be
/// UTF-8 source text.
pub fn load_audit_input(path: &Path) -> Result<AuditInput, InputError> {
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        let image = kritikos_utils_image::load_and_validate(path)?;
        return Ok(AuditInput::Image(image));
    }

    let bytes = std::fs::read(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if extension == PDF_EXTENSION {
        return extract_pdf_text(path, &bytes).map(AuditInput::Text);
    }

    String::from_utf8(bytes)
        .map(AuditInput::Text)
        .map_err(|_| InputError::NotUtf8 {
            path: path.to_path_buf(),
        })
}

fn extract_pdf_text(path: &Path, bytes: &[u8]) -> Result<String, InputError> {
    let pdf_error = |source| InputError::Pdf {
        path: path.to_path_buf(),
        source,
    };
    let document = lopdf::Document::load_mem(bytes).map_err(pdf_error)?;
    let pages = document.get_pages();
    debug!(pages = pages.len(), path = %path.display(), "extracting pdf text");

    let mut text = String::new();
    for page_number in pages.keys() {
        let page_text = document.extract_text(&[*page_number]).map_err(pdf_error)?;
        text.push_str(&page_text);
        if !text.ends_with('\n') {
            text.push('\n');
        }
    }
    Ok(text)
}

/// Pick the audit payload. An uploaded file wins over pasted text; blank
/// pasted text counts as nothing.
pub fn select_audit_input(
    upload: Option<&Path>,
    pasted: Option<&str>,
) -> Result<Option<AuditInput>, InputError> {
    if let Some(path) = upload {
        return load_audit_input(path).map(Some);
    }
    Ok(pasted
        .filter(|text| !text.trim().is_empty())
        .map(|text| AuditInput::Text(text.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use image::ImageBuffer;
    use image::Rgba;
    use kritikos_export::ReportKind;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn source_files_are_read_as_text() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("app.py");
        std::fs::write(&path, "import os\nos.system(cmd)\n").expect("write");

        let input = load_audit_input(&path).expect("loads");
        assert_eq!(input, AuditInput::Text("import os\nos.system(cmd)\n".to_string()));
        assert_eq!(input.describe(), "25 characters of text");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x80]).expect("write");

        assert_matches!(load_audit_input(&path), Err(InputError::NotUtf8 { .. }));
    }

    #[test]
    fn images_are_validated_and_passed_through() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("Screenshot.PNG");
        ImageBuffer::from_pixel(3, 2, Rgba([10u8, 20, 30, 255]))
            .save_with_format(&path, image::ImageFormat::Png)
            .expect("write png");

        let input = load_audit_input(&path).expect("loads");
        assert_eq!(input.describe(), "image/png image, 3x2");
        let AuditInput::Image(image) = input else {
            panic!("expected image input");
        };
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!((image.width, image.height), (3, 2));
        assert_eq!(image.bytes, std::fs::read(&path).expect("read back"));
    }

    #[test]
    fn fake_image_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("notes.jpg");
        std::fs::write(&path, "definitely not a jpeg").expect("write");

        assert_matches!(load_audit_input(&path), Err(InputError::Image(_)));
    }

    #[test]
    fn pdf_text_is_extracted_in_page_order() {
        let long_report = (1..=140)
            .map(|n| format!("line {n}"))
            .collect::<Vec<_>>()
            .join("\n");
        let exported =
            kritikos_export::export_report(ReportKind::Audit, &format!("FIRST PAGE\n{long_report}"))
                .expect("export");
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("report.pdf");
        std::fs::write(&path, &exported.bytes).expect("write");

        let AuditInput::Text(text) = load_audit_input(&path).expect("loads") else {
            panic!("expected text input");
        };
        let first = text.find("FIRST PAGE").expect("first page text");
        let last = text.find("line 140").expect("last page text");
        assert!(first < last);
    }

    #[test]
    fn corrupt_pdf_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, "%PDF-1.4\nnot really").expect("write");

        assert_matches!(load_audit_input(&path), Err(InputError::Pdf { .. }));
    }

    #[test]
    fn upload_wins_over_pasted_text() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("main.rs");
        std::fs::write(&path, "fn main() {}").expect("write");

        let input = select_audit_input(Some(&path), Some("pasted")).expect("selects");
        assert_eq!(input, Some(AuditInput::Text("fn main() {}".to_string())));
    }

    #[test]
    fn blank_paste_without_upload_is_nothing() {
        assert_eq!(select_audit_input(None, Some("  \n")).expect("selects"), None);
        assert_eq!(select_audit_input(None, None).expect("selects"), None);
        assert_eq!(
            select_audit_input(None, Some("x = 1")).expect("selects"),
            Some(AuditInput::Text("x = 1".to_string()))
        );
    }
}
