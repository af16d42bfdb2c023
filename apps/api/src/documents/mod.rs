// Document processing: cleaning, page extraction, keywords and evidence snippets.
// Produces the immutable VacancyProfile / CandidateProfile consumed by every engine.

pub mod cleaning;
pub mod extractor;
pub mod profile;

pub use cleaning::clean_text;
pub use extractor::{PageTexts, PdfTextExtractor, TextExtractor};
pub use profile::{CandidateProfile, DocumentProcessor, EvidenceSnippet, Keyword, VacancyProfile};
