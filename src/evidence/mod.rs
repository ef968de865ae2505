//! Evidence locating for claims and findings.
//!
//! Every claim records where it came from as a locator string. After
//! validation, findings are resolved back to a span and a human-readable
//! snippet of the analyzed text.
//!
//! # Design Principles
//!
//! - **Honest unresolved**: a malformed or out-of-range locator yields no
//!   span, never an error and never a guessed span.
//! - **UTF-8 byte offsets**: spans index the analyzed text's bytes.

pub mod enrich;
pub mod locator;

pub use enrich::{enrich_findings, resolve_span, SNIPPET_RADIUS};
pub use locator::{extract_snippet, format_locator, try_parse, LOCATOR_SOURCE};
