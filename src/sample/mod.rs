//! Pipeline A: example list XML to context builder samples.

pub mod converter;
pub mod example_list;
pub mod questions;
pub mod samples;
pub mod symbols;

pub use converter::SymbolConverter;
pub use example_list::{Example, ExampleList, PropertiesDefinition, PropertyName};
pub use questions::Questions;
pub use samples::{Boundary, Sample, Samples};
pub use symbols::SymbolTable;
pub use crate::{FINAL_MARK, INITIAL_MARK};
