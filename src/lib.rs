//! Conversion tools between the acoustic-model toolkit's CART training
//! artifacts and the context builder's text formats.
//!
//! [`sample`] turns an XML example list into a samples file plus word
//! boundary phone lists and questions. [`lookup`] maps allophone states to
//! HMM state model indices using a context builder state log.

pub mod lookup;
pub mod sample;

/// Marker appended to a phone symbol at the start of a word.
pub const INITIAL_MARK: &str = "@i";
/// Marker appended to a phone symbol at the end of a word.
pub const FINAL_MARK: &str = "@f";
