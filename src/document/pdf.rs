use std::path::Path;

use log::{info, warn};

use super::{Document, DocumentError};

/// A PDF loaded from disk with its page text extracted up front.
///
/// Pages are addressed 0-based here even though `lopdf` numbers them from 1.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    source: String,
    pages: Vec<Option<String>>,
}

impl PdfDocument {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DocumentError::NotFound(path.to_path_buf()));
        }

        let document = lopdf::Document::load(path).map_err(|err| DocumentError::Unreadable {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;

        let pages: Vec<Option<String>> = document
            .get_pages()
            .into_keys()
            .map(|page_number| match document.extract_text(&[page_number]) {
                Ok(text) => Some(text),
                Err(err) => {
                    warn!("No text extracted from page {page_number} of {}: {err}", path.display());
                    None
                }
            })
            .collect();

        info!("PDF {} opened with {} pages", path.display(), pages.len());
        Ok(Self {
            source: path.to_string_lossy().into_owned(),
            pages,
        })
    }
}

impl Document for PdfDocument {
    fn source(&self) -> &str {
        &self.source
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, index: usize) -> Option<String> {
        self.pages.get(index).cloned().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_pdf(path: &Path, pages: &[&str]) {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn missing_file_is_reported() {
        let err = PdfDocument::open("/no/existe.pdf").unwrap_err();
        assert!(matches!(err, DocumentError::NotFound(_)));
    }

    #[test]
    fn garbage_file_is_unreadable() {
        let mut tmp = NamedTempFile::new().unwrap();
        writeln!(tmp, "not a pdf").unwrap();
        let err = PdfDocument::open(tmp.path()).unwrap_err();
        assert!(matches!(err, DocumentError::Unreadable { .. }));
    }

    #[test]
    fn extracts_text_per_page() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fox.pdf");
        write_pdf(&path, &["The quick fox", "jumps over"]);

        let document = PdfDocument::open(&path).unwrap();
        assert_eq!(document.page_count(), 2);
        assert!(document.page_text(0).unwrap().contains("quick fox"));
        assert!(document.page_text(1).unwrap().contains("jumps"));
        assert_eq!(document.source(), path.to_string_lossy());
    }
}
