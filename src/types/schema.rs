//! Column descriptors and the result schema shared by every batch of one result.

use arrow::datatypes::{DataType as ArrowDataType, Schema};

use crate::error::{Result, RowsetError};
use crate::types::LogicalType;

/// Immutable description of one result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
    /// The physical layout the column was encoded with.
    pub physical_type: ArrowDataType,
}

impl ColumnDescriptor {
    /// Two descriptors describe the same column when kind, scale and nullability match.
    pub fn is_compatible_with(&self, other: &ColumnDescriptor) -> bool {
        self.logical_type.is_compatible_with(&other.logical_type) && self.nullable == other.nullable
    }
}

/// An ordered sequence of column descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct RowsetSchema {
    columns: Vec<ColumnDescriptor>,
}

impl RowsetSchema {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    /// Builds a schema from an IPC stream header.
    ///
    /// Every field must declare a supported logical type whose decoder accepts the
    /// field's physical layout.
    pub fn try_from_arrow(schema: &Schema) -> Result<Self> {
        let columns = schema
            .fields()
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                let logical_type = LogicalType::from_metadata(field.metadata()).map_err(|e| {
                    match e {
                        RowsetError::UnsupportedType(msg) => RowsetError::UnsupportedType(
                            format!("column {} ('{}'): {}", idx + 1, field.name(), msg),
                        ),
                        other => other,
                    }
                })?;

                if !logical_type.accepts_physical(field.data_type()) {
                    return Err(RowsetError::UnsupportedType(format!(
                        "column {} ('{}'): logical type {} cannot be decoded from {:?}",
                        idx + 1,
                        field.name(),
                        logical_type,
                        field.data_type()
                    )));
                }

                Ok(ColumnDescriptor {
                    name: field.name().clone(),
                    logical_type,
                    nullable: field.is_nullable(),
                    physical_type: field.data_type().clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { columns })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Zero-based column lookup.
    pub fn column(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(index)
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// One-based position of the first column called `name` (case-insensitive).
    pub fn find(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .map(|idx| idx + 1)
    }

    /// Column count and per-column compatibility; names are not compared.
    pub fn is_compatible_with(&self, other: &RowsetSchema) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(other.columns.iter())
                .all(|(a, b)| a.is_compatible_with(b))
    }
}
