//! Logical log fields and per-file column resolution.
//!
//! Firmware revisions and logging tools order their CSV columns differently,
//! so every analyzer refers to fields by a logical [`Field`] and the
//! [`ColumnResolver`] maps those to positional indices against each file's
//! header row.

use serde::Serialize;
use std::collections::BTreeMap;
use strum::{EnumIter, IntoStaticStr};

use crate::error::ConfigError;

/// A logical log field, keyed in the configuration by its `COL_*` option
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, IntoStaticStr, Serialize,
)]
pub enum Field {
    #[strum(serialize = "COL_TIMESTAMP")]
    Timestamp,
    #[strum(serialize = "COL_RPM")]
    Speed,
    #[strum(serialize = "COL_TEMP")]
    Temperature,
    #[strum(serialize = "COL_LBLM")]
    TrimLeft,
    #[strum(serialize = "COL_RBLM")]
    TrimRight,
    #[strum(serialize = "COL_CELL")]
    CellIndex,
    #[strum(serialize = "COL_MAP")]
    Load,
    #[strum(serialize = "COL_MAF")]
    Airflow,
    #[strum(serialize = "COL_CL")]
    ClosedLoop,
    #[strum(serialize = "COL_BLM")]
    TrimActive,
    #[strum(serialize = "COL_WOT")]
    FullThrottle,
    #[strum(serialize = "COL_KNOCK")]
    KnockCounter,
    #[strum(serialize = "COL_WB")]
    Wideband,
}

impl Field {
    /// Configuration key holding this field's column name
    pub fn config_key(self) -> &'static str {
        self.into()
    }
}

/// Configured header names for each logical field
#[derive(Clone, Debug, Default, Serialize)]
pub struct ColumnNames(BTreeMap<Field, String>);

impl ColumnNames {
    pub fn insert(&mut self, field: Field, name: impl Into<String>) {
        self.0.insert(field, name.into());
    }

    /// Configured header name for a field, or a missing-option error
    pub fn name(&self, field: Field) -> Result<&str, ConfigError> {
        self.0
            .get(&field)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::Missing(field.config_key().to_string()))
    }
}

/// Header label with any parenthesized unit suffix removed, e.g. `RPM(rpm)` -> `RPM`
pub fn header_label(cell: &str) -> &str {
    let end = cell.find('(').unwrap_or(cell.len());
    cell[..end].trim()
}

/// Resolves logical fields against one file's header row
pub struct ColumnResolver<'a> {
    file: &'a str,
    header: &'a [String],
    names: &'a ColumnNames,
}

impl<'a> ColumnResolver<'a> {
    pub fn new(file: &'a str, header: &'a [String], names: &'a ColumnNames) -> Self {
        Self {
            file,
            header,
            names,
        }
    }

    /// Number of columns every data row of this file must have
    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Index of the first header cell matching the field's configured name
    pub fn resolve(&self, field: Field) -> Result<usize, ConfigError> {
        let name = self.names.name(field)?;
        let index = self
            .header
            .iter()
            .position(|cell| header_label(cell).eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| ConfigError::UnresolvedColumn {
                key: field.config_key().to_string(),
                name: name.to_string(),
                file: self.file.to_string(),
            })?;

        tracing::debug!("{}: {} -> column {}", self.file, field.config_key(), index);
        Ok(index)
    }
}
