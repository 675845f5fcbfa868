//! File discovery, tabulation, renaming and transfer.
//!
//! The pipeline runs leaf-first:
//!
//! 1. [`scan`] walks one or more source directories and collects matching
//!    files into a [`RecordTable`].
//! 2. [`extract`] pulls named fields out of each filepath with regular
//!    expressions, adding one nullable column per field.
//! 3. [`render_destinations`] fills in each record's destination from a
//!    [`PathTemplate`] such as `{dst}/sub-{subject}/sub-{subject}{file_extension}`.
//! 4. [`transfer`] copies or moves every file to its destination.
//!
//! ```no_run
//! use nisupply_library::extract::{ExtractionSpec, FieldPattern};
//! use nisupply_library::scan::{FilterSpec, scan};
//! use nisupply_library::transfer::{TransferOptions, transfer};
//! use nisupply_library::{PathTemplate, RenderPolicy, render_destinations};
//! use std::collections::BTreeMap;
//!
//! # fn main() -> nisupply_library::error::Result<()> {
//! let filter = FilterSpec::default().with_suffix(".nii.gz").with_prefix("fmri_nback");
//! let mut table = scan("./src", &filter)?;
//!
//! let spec = ExtractionSpec::default().with_field(FieldPattern::new("subject", r"subject_(\d+)")?.with_group(1)?);
//! nisupply_library::extract::extract_fields(&mut table, &spec)?;
//! table.drop_nulls(["subject"])?;
//!
//! let template: PathTemplate = "{dst}/sub-{subject}/sub-{subject}_task-nback{file_extension}".parse()?;
//! let constants = BTreeMap::from([("dst".to_string(), "./bids".to_string())]);
//! render_destinations(&mut table, &template, &constants, RenderPolicy::FailFast)?;
//!
//! let report = transfer(&table, &TransferOptions::default())?;
//! report.into_result()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod extract;
pub mod scan;
pub mod table;
mod template;
pub mod transfer;

pub use crate::table::{FileRecord, RecordTable};
pub use crate::template::{PathTemplate, RenderPolicy, mirror_destinations, render_destinations};
