//! CSV bar files on disk.
//!
//! Layout: `{root}/{data_source}/{SYMBOL}.csv` with header
//! `day,open,high,low,close,volume`, days as `YYYY-MM-DD`.

use std::fs;
use std::path::PathBuf;

use crate::data::provider::{BarSource, DataError};
use crate::data::validate::validate_bars;
use crate::domain::{Bar, DataSource};

#[derive(Debug, Clone)]
pub struct CsvBarSource {
    root: PathBuf,
}

impl CsvBarSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File that holds the bars of one symbol.
    pub fn path_for(&self, data_source: DataSource, symbol: &str) -> PathBuf {
        self.root
            .join(data_source.as_str())
            .join(format!("{}.csv", symbol.to_ascii_uppercase()))
    }

    /// Write a full series, replacing any existing file.
    pub fn write(
        &self,
        data_source: DataSource,
        symbol: &str,
        bars: &[Bar],
    ) -> Result<PathBuf, DataError> {
        validate_bars(bars)?;
        let path = self.path_for(data_source, symbol);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| DataError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let csv_err = |source: csv::Error| DataError::Csv {
            path: path.clone(),
            source,
        };
        let mut wtr = csv::Writer::from_path(&path).map_err(csv_err)?;
        for bar in bars {
            wtr.serialize(bar).map_err(csv_err)?;
        }
        wtr.flush().map_err(|source| DataError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

impl BarSource for CsvBarSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn load(&self, data_source: DataSource, symbol: &str) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(data_source, symbol);
        if !path.exists() {
            return Err(DataError::SymbolNotFound {
                data_source,
                symbol: symbol.to_string(),
            });
        }

        let mut rdr = csv::Reader::from_path(&path).map_err(|source| DataError::Csv {
            path: path.clone(),
            source,
        })?;
        let bars = rdr
            .deserialize::<Bar>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| DataError::Csv {
                path: path.clone(),
                source,
            })?;

        validate_bars(&bars)?;
        Ok(bars)
    }
}
