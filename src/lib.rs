//! guarantee-xlsx - Excel normalization pipeline for bank-guarantee records
//!
//! This crate reads bank-guarantee spreadsheets (XLSX / XLS) whose headers vary in
//! wording and language (English / Arabic), maps them onto a fixed set of canonical
//! fields, cleans the values (Arabic-Indic currency, ISO dates, canonical bank names),
//! validates the whole sheet, and emits a JSON payload with per-column type metadata.
//!
//! A conversion is all-or-nothing: one bad row rejects the whole sheet, and one
//! rejected sheet rejects the whole conversion.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use guarantee_xlsx::ConverterBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create a converter with default settings (first sheet, cleaning enabled)
//!     let converter = ConverterBuilder::new().build()?;
//!
//!     let output = converter.convert_file("guarantees.xlsx")?;
//!     println!("{}", output.to_json_pretty()?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # All Sheets
//!
//! ```rust,no_run
//! use guarantee_xlsx::{ConversionOutput, ConverterBuilder, SheetSelector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = ConverterBuilder::new()
//!     .with_sheet_selector(SheetSelector::All)
//!     .build()?;
//!
//! let bytes = std::fs::read("guarantees.xlsx")?;
//! if let ConversionOutput::Multi(output) = converter.convert_bytes("guarantees.xlsx", &bytes)? {
//!     for sheet in output.sheets.keys() {
//!         println!("{}", sheet);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Reference Data and Pipeline Log
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use guarantee_xlsx::reference::{JsonReferenceLoader, ReferenceCache};
//! use guarantee_xlsx::ConverterBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Aliases, rules and the bank list are read from a directory of JSON files
//! let cache = Arc::new(ReferenceCache::new(JsonReferenceLoader::new("reference/")));
//!
//! let converter = ConverterBuilder::new()
//!     .with_reference_cache(Arc::clone(&cache))
//!     .with_log_path("logs/pipeline.log")
//!     .build()?;
//!
//! let output = converter.convert_file("guarantees.xlsx")?;
//!
//! // Promote a reviewed unknown column into a new alias
//! if output.unknown_columns().contains(&"Guarantee Value") {
//!     converter.add_alias("amount", "Guarantee Value")?;
//! }
//! # Ok(())
//! # }
//! ```

mod api;
mod builder;
mod error;
mod formatter;
mod output;
mod parser;
pub mod pipeline;
pub mod reference;
mod security;
mod types;

// 公開API
pub use api::{InferredType, SheetSelector};
pub use builder::{Converter, ConverterBuilder};
pub use error::{ValidationFailure, XlsxToJsonError};
pub use formatter::{parse_amount, to_arabic_digits, to_ascii_digits, CurrencyFormatter, DateFormatter};
pub use output::{
    ConversionOutput, MultiSheetOutput, SheetFileInfo, SheetMetadata, SheetOutput,
    SingleSheetOutput, WorkbookFileInfo,
};
pub use types::{CellValue, NormalizedRecord, NormalizedTable, ProcessingMetadata, SheetTable};
