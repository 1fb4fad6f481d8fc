//! # xmindcase
//!
//! Convert test cases designed as XMind mind maps into files that test
//! management tools can import.
//!
//! A workbook's central topic names the product, first-level topics are test
//! suites, second-level topics are test cases, and the topics below a case
//! are its steps and expected results. Priority comes from `priority-N`
//! markers or labels, execution type from `Manual`/`Automated` labels, and the
//! precondition from the case's note.
//!
//! ## Features
//!
//! - Reads both the current `content.json` and the legacy `content.xml`
//!   workbook encodings
//! - Tolerates partially written or oddly shaped outlines, reporting
//!   [`Warning`]s instead of failing
//! - Caches conversions by content fingerprint
//! - Emits Zentao CSV, TestLink XML and JSON
//!
//! ## Example
//!
//! ```no_run
//! use xmindcase::{Converter, ConverterConfig, OutputFormat};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let converter = Converter::new(ConverterConfig::default());
//!     let conversion = converter.convert_path("cases.xmind").await?;
//!
//!     for warning in &conversion.extraction.warnings {
//!         eprintln!("warning: {warning}");
//!     }
//!     let xml = OutputFormat::Testlink.emit(&conversion.extraction.cases)?;
//!     println!("{xml}");
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod content;
pub mod convert;
pub mod emit;
pub mod error;
pub mod extract;
pub mod io;
pub mod model;

pub use archive::{Archive, ZipMember};
pub use cache::{ConversionCache, Fingerprint};
pub use cli::Cli;
pub use config::ConverterConfig;
pub use convert::{Conversion, Converter, load_bytes, load_path};
pub use emit::{EmitError, OutputFormat};
pub use error::{Error, Result};
pub use extract::{
    ExecutionType, Extraction, Extractor, Priority, Step, TestCase, Warning, WarningKind, extract,
};
pub use io::{LocalFileReader, MemoryReader, ReadAt};
pub use model::{Sheet, Topic, Workbook};
