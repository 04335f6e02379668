//! Content parsers: HTML and PDF.

mod html_text;
mod pdf_text;

pub use html_text::{extract_anchors, extract_text, extract_title, same_host, Anchor};
pub use pdf_text::{ExtractError, PdfExtraction, PdfTextPipeline};
