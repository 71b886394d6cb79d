//! Pipeline B: allophone state to HMM state model lookup table.

pub mod allophone;
pub mod models;
pub mod symbols;
pub mod table;

pub use allophone::AllophoneState;
pub use models::{ContextSet, HmmStateModels};
pub use symbols::StateSymbolTable;
pub use table::{LookupTable, Resolution, Summary};
