//! Filesystem content extractor.
//!
//! [`FsExtractor`] dispatches on the file name suffix (case-sensitive):
//!
//! | Suffix | Extraction |
//! |--------|------------|
//! | `.pdf` | per-page text joined with `\n`, then trimmed |
//! | `.docx` | per-paragraph text of `word/document.xml` joined with `\n`, then trimmed |
//! | anything else | whole file decoded as UTF-8 |
//!
//! Every failure (directory, I/O, invalid UTF-8, corrupt archive) is an
//! [`IndexError::Extraction`]. No partial text is ever returned.

use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;

use contextify_core::extract::ContentExtractor;
use contextify_core::IndexError;

/// Maximum decompressed bytes read from `word/document.xml` (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Default, Clone, Copy)]
pub struct FsExtractor;

impl FsExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl ContentExtractor for FsExtractor {
    fn extract(&self, path: &Path) -> Result<String, IndexError> {
        if path.is_dir() {
            return Err(IndexError::extraction(path, "path is a directory"));
        }

        let name = path.to_string_lossy();
        if name.ends_with(".pdf") {
            let bytes = read_bytes(path)?;
            extract_pdf(&bytes).map_err(|reason| IndexError::extraction(path, reason))
        } else if name.ends_with(".docx") {
            let bytes = read_bytes(path)?;
            extract_docx(&bytes).map_err(|reason| IndexError::extraction(path, reason))
        } else {
            let bytes = read_bytes(path)?;
            String::from_utf8(bytes)
                .map_err(|e| IndexError::extraction(path, format!("not valid UTF-8: {}", e)))
        }
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, IndexError> {
    std::fs::read(path).map_err(|e| IndexError::extraction(path, e))
}

fn extract_pdf(bytes: &[u8]) -> Result<String, String> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| format!("PDF extraction failed: {}", e))?;
    Ok(pages.join("\n").trim().to_string())
}

fn extract_docx(bytes: &[u8]) -> Result<String, String> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| format!("not a Word document: {}", e))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| format!("word/document.xml: {}", e))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| format!("word/document.xml: {}", e))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err("word/document.xml exceeds size limit".to_string());
    }

    let paragraphs = docx_paragraphs(&xml)?;
    Ok(paragraphs.join("\n").trim().to_string())
}

/// Text of every `<w:p>` in document order. Runs inside a paragraph are
/// concatenated; `<w:tab/>` becomes a tab and `<w:br/>` a newline.
fn docx_paragraphs(xml: &[u8]) -> Result<Vec<String>, String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => current = Some(String::new()),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match (e.local_name().as_ref(), current.as_mut()) {
                (b"p", _) => paragraphs.push(String::new()),
                (b"tab", Some(p)) => p.push('\t'),
                (b"br", Some(p)) => p.push('\n'),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().map_err(|e| e.to_string())?;
                if let Some(p) = current.as_mut() {
                    p.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if let Some(p) = current.take() {
                        paragraphs.push(p);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("malformed document.xml: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}
