//! Schema view over one delimited flat file
//!
//! A [`FileSchema`] describes everything the scan engine needs to know about a
//! file: column names in physical order, the declared sort order, how records
//! and fields are delimited, and which columns compare numerically. It is
//! immutable once constructed; all configuration problems surface here, before
//! any scan is built.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};

/// Ring capacity used when a schema does not configure `cache_size`.
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Supported column types.
///
/// Only numericness matters to the scan engine: `int` and `float` columns
/// compare numerically, everything else compares byte-lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string, byte-lexicographic comparison
    String,
    /// Signed integer
    Int,
    /// Floating point
    Float,
    /// Boolean-ish flag column
    Bool,
}

impl FieldType {
    /// Returns true when values of this type compare numerically
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Float)
    }

    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
        }
    }
}

/// A synthetic constant-valued property, appended after the file's columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstantValue {
    /// Property name (not a file column)
    pub property: String,
    /// The constant value every row carries for this property
    pub value: String,
}

fn default_delimiter() -> String {
    r"\s*,\s*".to_string()
}

fn default_record_separator() -> String {
    "\n".to_string()
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_CAPACITY
}

/// Raw per-file configuration, deserialized before validation.
///
/// Unset fields take their documented defaults; `FileSchema::new` rejects
/// inconsistent combinations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSchemaConfig {
    /// Field delimiter, a regular expression (default: `\s*,\s*`)
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Record separator string (default: one newline)
    #[serde(default = "default_record_separator")]
    pub record_separator: String,

    /// Column names in physical file order
    pub column_order: Vec<String>,

    /// Row cache capacity (default: 100)
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,

    /// Discard the first record of the file
    #[serde(default)]
    pub skip_first_line: bool,

    /// Single file path
    #[serde(default)]
    pub server: Option<PathBuf>,

    /// Equivalent file paths, one selected per process
    #[serde(default)]
    pub file_list: Vec<PathBuf>,

    /// Leading columns the file is sorted ascending by
    #[serde(default)]
    pub sort_order: Vec<String>,

    /// Constant-valued properties appended after the file columns
    #[serde(default)]
    pub constant_values: Vec<ConstantValue>,

    /// Per-column types; unlisted columns are strings
    #[serde(default)]
    pub field_types: HashMap<String, FieldType>,
}

impl Default for FileSchemaConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            record_separator: default_record_separator(),
            column_order: Vec::new(),
            cache_size: default_cache_size(),
            skip_first_line: false,
            server: None,
            file_list: Vec::new(),
            sort_order: Vec::new(),
            constant_values: Vec::new(),
            field_types: HashMap::new(),
        }
    }
}

/// Validated, immutable schema view over one flat file.
pub struct FileSchema {
    config: FileSchemaConfig,
    /// Compiled delimiter, built on first use
    pattern: OnceCell<Regex>,
}

impl std::fmt::Debug for FileSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSchema")
            .field("config", &self.config)
            .finish()
    }
}

impl FileSchema {
    /// Validates a configuration into a usable schema.
    ///
    /// # Errors
    ///
    /// Returns `FLAT_MISCONFIGURED` if:
    /// - the column list is empty or contains duplicates
    /// - a sort column is not a known column
    /// - the cache capacity is zero
    /// - neither `server` nor `file_list` is set
    /// - a constant property shadows a file column
    /// - `field_types` names a column the file does not have
    pub fn new(config: FileSchemaConfig) -> SchemaResult<Self> {
        if config.column_order.is_empty() {
            return Err(SchemaError::misconfigured("column_order must not be empty"));
        }

        for (i, name) in config.column_order.iter().enumerate() {
            if config.column_order[..i].contains(name) {
                return Err(SchemaError::misconfigured_value(
                    "duplicate column name",
                    name.clone(),
                ));
            }
        }

        for name in &config.sort_order {
            if !config.column_order.contains(name) {
                return Err(SchemaError::misconfigured_value(
                    "sort_order names an unknown column",
                    name.clone(),
                ));
            }
        }

        if config.cache_size == 0 {
            return Err(SchemaError::misconfigured("cache_size must be positive"));
        }

        if config.record_separator.is_empty() {
            return Err(SchemaError::misconfigured(
                "record_separator must not be empty",
            ));
        }

        if config.server.is_none() && config.file_list.is_empty() {
            return Err(SchemaError::misconfigured(
                "no file path configured: set server or file_list",
            ));
        }

        for constant in &config.constant_values {
            if config.column_order.contains(&constant.property) {
                return Err(SchemaError::misconfigured_value(
                    "constant property shadows a file column",
                    constant.property.clone(),
                ));
            }
        }

        for name in config.field_types.keys() {
            if !config.column_order.contains(name) {
                return Err(SchemaError::misconfigured_value(
                    "field_types names an unknown column",
                    name.clone(),
                ));
            }
        }

        Ok(Self {
            config,
            pattern: OnceCell::new(),
        })
    }

    /// Builds a schema from a JSON configuration document.
    pub fn from_json_str(json: &str) -> SchemaResult<Self> {
        let config: FileSchemaConfig = serde_json::from_str(json)
            .map_err(|e| SchemaError::misconfigured_value("malformed schema JSON", e.to_string()))?;
        Self::new(config)
    }

    /// Resolves the effective file path.
    ///
    /// A single `server` path wins. A `file_list` is load-balanced across
    /// processes: the process id modulo the list length picks one entry, so
    /// repeated calls within one process always return the same path.
    pub fn path(&self) -> SchemaResult<&Path> {
        if let Some(path) = &self.config.server {
            return Ok(path);
        }
        if !self.config.file_list.is_empty() {
            let slot = std::process::id() as usize % self.config.file_list.len();
            return Ok(&self.config.file_list[slot]);
        }
        // Unreachable after construction-time validation, kept for direct use
        Err(SchemaError::misconfigured(
            "no file path configured: set server or file_list",
        ))
    }

    /// Returns the compiled delimiter pattern, compiling it on first use.
    pub fn delimiter_pattern(&self) -> SchemaResult<&Regex> {
        self.pattern.get_or_try_init(|| {
            Regex::new(&self.config.delimiter).map_err(|e| {
                SchemaError::misconfigured_value("invalid delimiter expression", e.to_string())
            })
        })
    }

    /// Column names in physical file order
    pub fn columns(&self) -> &[String] {
        &self.config.column_order
    }

    /// Number of columns in the file
    pub fn column_count(&self) -> usize {
        self.config.column_order.len()
    }

    /// Physical position of a column, if it exists in the file
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.config.column_order.iter().position(|c| c == name)
    }

    /// Leading columns the file is sorted ascending by
    pub fn sort_order(&self) -> &[String] {
        &self.config.sort_order
    }

    /// Record separator string
    pub fn record_separator(&self) -> &str {
        &self.config.record_separator
    }

    /// Whether the first record of the file is discarded
    pub fn skip_first_line(&self) -> bool {
        self.config.skip_first_line
    }

    /// Row cache capacity for this file
    pub fn cache_size(&self) -> usize {
        self.config.cache_size
    }

    /// Constant-valued properties appended after the file columns
    pub fn constant_values(&self) -> &[ConstantValue] {
        &self.config.constant_values
    }

    /// Declared type of a column; unlisted columns are strings
    pub fn field_type(&self, name: &str) -> FieldType {
        self.config
            .field_types
            .get(name)
            .copied()
            .unwrap_or(FieldType::String)
    }

    /// Whether a column compares numerically
    pub fn is_numeric(&self, name: &str) -> bool {
        self.field_type(name).is_numeric()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> FileSchemaConfig {
        FileSchemaConfig {
            column_order: vec!["id".into(), "name".into(), "age".into()],
            server: Some(PathBuf::from("/tmp/people.csv")),
            sort_order: vec!["id".into()],
            ..FileSchemaConfig::default()
        }
    }

    #[test]
    fn test_valid_config_accepted() {
        let schema = FileSchema::new(base_config()).unwrap();
        assert_eq!(schema.column_count(), 3);
        assert_eq!(schema.column_index("age"), Some(2));
        assert_eq!(schema.cache_size(), DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn test_empty_columns_rejected() {
        let mut config = base_config();
        config.column_order.clear();
        assert!(FileSchema::new(config).is_err());
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut config = base_config();
        config.column_order.push("id".into());
        assert!(FileSchema::new(config).is_err());
    }

    #[test]
    fn test_unknown_sort_column_rejected() {
        let mut config = base_config();
        config.sort_order = vec!["salary".into()];
        assert!(FileSchema::new(config).is_err());
    }

    #[test]
    fn test_empty_record_separator_rejected() {
        let mut config = base_config();
        config.record_separator.clear();
        assert!(FileSchema::new(config).is_err());
    }

    #[test]
    fn test_zero_cache_size_rejected() {
        let mut config = base_config();
        config.cache_size = 0;
        assert!(FileSchema::new(config).is_err());
    }

    #[test]
    fn test_missing_path_rejected() {
        let mut config = base_config();
        config.server = None;
        let err = FileSchema::new(config).unwrap_err();
        assert_eq!(err.code().code(), "FLAT_MISCONFIGURED");
    }

    #[test]
    fn test_single_path_resolution() {
        let schema = FileSchema::new(base_config()).unwrap();
        assert_eq!(schema.path().unwrap(), Path::new("/tmp/people.csv"));
    }

    #[test]
    fn test_file_list_resolution_is_stable() {
        let mut config = base_config();
        config.server = None;
        config.file_list = vec![
            PathBuf::from("/tmp/a.csv"),
            PathBuf::from("/tmp/b.csv"),
            PathBuf::from("/tmp/c.csv"),
        ];
        let schema = FileSchema::new(config).unwrap();
        let first = schema.path().unwrap().to_path_buf();
        for _ in 0..10 {
            assert_eq!(schema.path().unwrap(), first);
        }
    }

    #[test]
    fn test_delimiter_compiles_once() {
        let schema = FileSchema::new(base_config()).unwrap();
        let a = schema.delimiter_pattern().unwrap() as *const Regex;
        let b = schema.delimiter_pattern().unwrap() as *const Regex;
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_delimiter_rejected() {
        let mut config = base_config();
        config.delimiter = "[unclosed".into();
        let schema = FileSchema::new(config).unwrap();
        assert!(schema.delimiter_pattern().is_err());
    }

    #[test]
    fn test_default_delimiter_eats_surrounding_whitespace() {
        let schema = FileSchema::new(base_config()).unwrap();
        let pattern = schema.delimiter_pattern().unwrap();
        let fields: Vec<&str> = pattern.split("1 , Alice ,30").collect();
        assert_eq!(fields, vec!["1", "Alice", "30"]);
    }

    #[test]
    fn test_field_types_default_to_string() {
        let mut config = base_config();
        config.field_types.insert("id".into(), FieldType::Int);
        config.field_types.insert("age".into(), FieldType::Float);
        let schema = FileSchema::new(config).unwrap();
        assert!(schema.is_numeric("id"));
        assert!(schema.is_numeric("age"));
        assert!(!schema.is_numeric("name"));
        assert_eq!(schema.field_type("name"), FieldType::String);
    }

    #[test]
    fn test_constant_shadowing_column_rejected() {
        let mut config = base_config();
        config.constant_values.push(ConstantValue {
            property: "id".into(),
            value: "X".into(),
        });
        assert!(FileSchema::new(config).is_err());
    }

    #[test]
    fn test_from_json_defaults() {
        let schema = FileSchema::from_json_str(
            r#"{
                "column_order": ["id", "name"],
                "server": "/tmp/data.csv",
                "field_types": {"id": "int"}
            }"#,
        )
        .unwrap();
        assert_eq!(schema.record_separator(), "\n");
        assert!(!schema.skip_first_line());
        assert!(schema.is_numeric("id"));
        assert_eq!(schema.cache_size(), DEFAULT_CACHE_CAPACITY);
    }

    #[test]
    fn test_from_json_malformed_rejected() {
        assert!(FileSchema::from_json_str("{not json").is_err());
    }
}
