//! # skillgrid-formula
//!
//! Formula text analysis for skillgrid.
//!
//! This crate inspects formula text without evaluating it:
//! - [`analyze`] - functions called, cells referenced, parenthesis balance, complexity
//! - [`catalog`] - per-function complexity weights and categories
//! - [`lexer`] - the tolerant tokenizer underneath
//!
//! ## Example
//!
//! ```rust
//! use skillgrid_formula::{analyze, catalog};
//!
//! let analysis = analyze("=VLOOKUP(A2,Prices!A:B,2,FALSE)");
//! assert_eq!(analysis.functions, vec!["VLOOKUP"]);
//! assert_eq!(analysis.complexity, catalog::weight("VLOOKUP"));
//! ```

pub mod analysis;
pub mod catalog;
pub mod lexer;

pub use analysis::{analyze, FormulaAnalysis};
pub use catalog::{FunctionCategory, FunctionInfo, UNKNOWN_FUNCTION_WEIGHT};
