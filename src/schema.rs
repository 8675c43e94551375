//! Schema catalog model: tables, columns, and the per-run metadata map.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ReforgeError, Result};

/// Column-level metadata from the catalog reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Column name
    pub name: String,
    /// Declared data type, as reported by the catalog
    pub data_type: String,
    /// Whether the column accepts NULL
    pub nullable: bool,
    /// Average stored size in bytes
    pub avg_size_bytes: f64,
}

impl ColumnMetadata {
    pub fn new(
        name: impl Into<String>,
        data_type: impl Into<String>,
        nullable: bool,
        avg_size_bytes: f64,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
            avg_size_bytes,
        }
    }

    /// Whether the type denotes a large-object or semi-structured payload.
    pub fn is_lob(&self) -> bool {
        let ty = self.data_type.to_uppercase();
        ["CLOB", "BLOB", "JSON", "TEXT", "XMLTYPE"]
            .iter()
            .any(|marker| ty.contains(marker))
    }

    /// Whether the on-disk representation is text-encoded rather than the
    /// denser binary encoding (BLOB, JSONB, OSON).
    pub fn is_text_encoded(&self) -> bool {
        let ty = self.data_type.to_uppercase();
        if ["BLOB", "JSONB", "OSON"].iter().any(|m| ty.contains(m)) {
            return false;
        }
        ["CLOB", "TEXT", "JSON", "XMLTYPE"]
            .iter()
            .any(|marker| ty.contains(marker))
    }
}

/// Table-level metadata. Column order reflects physical position and is
/// preserved as reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    /// Owning schema
    pub schema_name: String,
    /// Table name
    pub table_name: String,
    /// Row count from catalog statistics
    pub row_count: u64,
    /// Average row length in bytes
    pub avg_row_bytes: f64,
    /// Whether table compression is enabled
    pub compressed: bool,
    /// Columns in physical order
    pub columns: Vec<ColumnMetadata>,
}

impl TableMetadata {
    pub fn new(
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        row_count: u64,
        avg_row_bytes: f64,
    ) -> Self {
        Self {
            schema_name: schema_name.into(),
            table_name: table_name.into(),
            row_count,
            avg_row_bytes,
            compressed: false,
            columns: Vec::new(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<ColumnMetadata>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_compression(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Columns with large-object or semi-structured types.
    pub fn lob_columns(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns.iter().filter(|c| c.is_lob())
    }

    /// Fraction of columns that accept NULL, in [0,1].
    pub fn nullable_fraction(&self) -> f64 {
        if self.columns.is_empty() {
            return 0.0;
        }
        let nullable = self.columns.iter().filter(|c| c.nullable).count();
        nullable as f64 / self.columns.len() as f64
    }

    /// Estimated table size in gigabytes.
    pub fn size_gb(&self) -> f64 {
        self.row_count as f64 * self.avg_row_bytes / (1024.0 * 1024.0 * 1024.0)
    }
}

/// Mapping from table name to metadata, keys unique.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaMetadata {
    tables: HashMap<String, TableMetadata>,
}

impl SchemaMetadata {
    /// Build the map from a table list. Duplicate table names are a
    /// construction error.
    pub fn new(tables: Vec<TableMetadata>) -> Result<Self> {
        let mut map = HashMap::with_capacity(tables.len());
        for table in tables {
            let key = table.table_name.to_lowercase();
            let name = table.table_name.clone();
            if map.insert(key, table).is_some() {
                return Err(ReforgeError::invalid_argument(format!(
                    "duplicate table metadata: {}",
                    name
                )));
            }
        }
        Ok(Self { tables: map })
    }

    /// An empty catalog.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a table by name (case-insensitive).
    pub fn table(&self, name: &str) -> Option<&TableMetadata> {
        self.tables.get(&name.to_lowercase())
    }

    /// Iterate over all tables.
    pub fn tables(&self) -> impl Iterator<Item = &TableMetadata> {
        self.tables.values()
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_table() -> TableMetadata {
        TableMetadata::new("app", "orders", 100_000, 512.0).with_columns(vec![
            ColumnMetadata::new("id", "NUMBER", false, 8.0),
            ColumnMetadata::new("payload", "CLOB", true, 12_288.0),
            ColumnMetadata::new("status", "VARCHAR2", true, 12.0),
        ])
    }

    #[test]
    fn test_lob_column_detection() {
        let table = doc_table();
        let lobs: Vec<_> = table.lob_columns().collect();
        assert_eq!(lobs.len(), 1);
        assert_eq!(lobs[0].name, "payload");
    }

    #[test]
    fn test_text_vs_binary_encoding() {
        assert!(ColumnMetadata::new("p", "CLOB", true, 1.0).is_text_encoded());
        assert!(ColumnMetadata::new("p", "JSON", true, 1.0).is_text_encoded());
        assert!(!ColumnMetadata::new("p", "BLOB", true, 1.0).is_text_encoded());
        assert!(!ColumnMetadata::new("p", "JSONB", true, 1.0).is_text_encoded());
    }

    #[test]
    fn test_nullable_fraction() {
        let table = doc_table();
        assert!((table.nullable_fraction() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_schema_lookup_case_insensitive() {
        let schema = SchemaMetadata::new(vec![doc_table()]).unwrap();
        assert!(schema.table("ORDERS").is_some());
        assert!(schema.table("orders").is_some());
        assert!(schema.table("missing").is_none());
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let result = SchemaMetadata::new(vec![doc_table(), doc_table()]);
        assert!(result.is_err());
    }
}
