//! Output generation for aggregation reports.
//!
//! # Submodules
//!
//! - [`json`]: Writes a [`Report`](crate::models::Report) to a dated JSON file
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! ├── 2025-05-06/
//! │   ├── morning.json
//! │   ├── afternoon.json
//! │   └── evening.json
//! ```

pub mod json;
