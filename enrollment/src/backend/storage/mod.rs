//! # Storage Module
//!
//! File-based persistence for the records API.
//!
//! ```text
//! data/
//! ├── students/
//! │   └── student_<uuid>.yaml     one file per record
//! ├── transport/
//! │   ├── vehicles.csv
//! │   └── stops.csv
//! └── uploads/
//!     └── <uuid>.<ext>
//! ```
//!
//! Domain services only see the traits in [`traits`]; the CSV/YAML backend
//! lives in [`csv`].

pub mod csv;
pub mod traits;

pub use traits::*;
