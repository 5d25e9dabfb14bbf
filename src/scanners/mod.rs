// =============================================================================
// scanners/mod.rs - Getting cause lists in, turning them into records
// =============================================================================
//
// The court publishes each day's list twice: as a PDF meant for humans and as
// a JSON feed meant for its own website. The fetcher talks to the server,
// the pdf and json scanners turn whichever representation we pulled into the
// same flat CaseRecord stream. Both scanners are best-effort: a bad page or a
// bad item becomes a ParseFault next to the good records, never a failed run.
// =============================================================================

pub mod fetcher;
pub mod json_scanner;
pub mod pdf_scanner;
