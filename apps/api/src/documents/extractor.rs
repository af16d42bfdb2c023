//! Page-level text extraction. Extraction never fails the batch: an unreadable
//! document degrades to a single empty page 1.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

/// 1-indexed page number → extracted text.
pub type PageTexts = BTreeMap<u32, String>;

pub trait TextExtractor: Send + Sync {
    fn extract_pages(&self, bytes: &[u8]) -> PageTexts;
}

/// PDF extraction via `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract_pages(&self, bytes: &[u8]) -> PageTexts {
        // pdf-extract panics on some malformed inputs; treat that like any other failure.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(bytes)
        }));

        match outcome {
            Ok(Ok(pages)) if !pages.is_empty() => {
                debug!("Extracted {} pages", pages.len());
                pages
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| (i as u32 + 1, text))
                    .collect()
            }
            Ok(Ok(_)) => empty_document(),
            Ok(Err(e)) => {
                warn!("PDF extraction failed: {e}");
                empty_document()
            }
            Err(_) => {
                warn!("PDF extraction panicked; treating document as empty");
                empty_document()
            }
        }
    }
}

pub fn empty_document() -> PageTexts {
    BTreeMap::from([(1, String::new())])
}
