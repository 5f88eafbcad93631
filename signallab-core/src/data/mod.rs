//! Bar sources and series validation.

pub mod csv_source;
pub mod provider;
pub mod synthetic;
pub mod validate;

pub use csv_source::CsvBarSource;
pub use provider::{BarSource, DataError};
pub use synthetic::SyntheticBarSource;
pub use validate::{slice_by_date, validate_bars};
