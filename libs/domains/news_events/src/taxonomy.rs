//! CAMEO event code taxonomy
//!
//! A read-only `code -> name` table loaded once at startup and shared behind
//! an `Arc` for the lifetime of the process.

use crate::error::{NewsEventError, Result};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, instrument};

/// Reference table bundled with the crate (`CODE<TAB>NAME`, one header row)
const EMBEDDED_CAMEO_CODES: &str = include_str!("../data/cameo_event_codes.tsv");

/// Number of characters of a code that make up its base type
pub const BASE_TYPE_LEN: usize = 2;

/// Immutable lookup from categorical code to readable name
#[derive(Debug, Clone, Default)]
pub struct TaxonomyTable {
    names: HashMap<String, String>,
}

impl TaxonomyTable {
    /// Build a table from in-memory entries
    pub fn from_entries<I, C, N>(entries: I) -> Self
    where
        I: IntoIterator<Item = (C, N)>,
        C: Into<String>,
        N: Into<String>,
    {
        Self {
            names: entries
                .into_iter()
                .map(|(code, name)| (code.into(), name.into()))
                .collect(),
        }
    }

    /// The CAMEO table bundled with the crate
    pub fn embedded() -> Result<Self> {
        Self::from_reader(EMBEDDED_CAMEO_CODES.as_bytes())
    }

    /// Load a tab-separated table from disk
    #[instrument]
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| NewsEventError::Taxonomy {
            message: format!("cannot open {}: {}", path.display(), e),
        })?;
        let table = Self::from_reader(file)?;
        info!(codes = table.len(), path = %path.display(), "Loaded taxonomy from file");
        Ok(table)
    }

    /// Load the file at `path` if given, otherwise the embedded table
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => {
                let table = Self::embedded()?;
                info!(codes = table.len(), "Loaded embedded CAMEO taxonomy");
                Ok(table)
            }
        }
    }

    /// Parse `CODE<TAB>NAME` records; the first row is a header
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut names = HashMap::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let (Some(code), Some(name)) = (record.get(0), record.get(1)) else {
                return Err(NewsEventError::Taxonomy {
                    // +2: one for the header, one for 1-based numbering
                    message: format!("line {}: expected CODE<TAB>NAME", line + 2),
                });
            };
            if code.is_empty() {
                return Err(NewsEventError::Taxonomy {
                    message: format!("line {}: empty code", line + 2),
                });
            }
            names.insert(code.to_string(), name.to_string());
        }

        if names.is_empty() {
            return Err(NewsEventError::Taxonomy {
                message: "taxonomy table has no entries".to_string(),
            });
        }
        Ok(Self { names })
    }

    pub fn lookup(&self, code: &str) -> Option<&str> {
        self.names.get(code).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Base type of a code: its first two characters, or `None` if it is shorter
pub fn base_type(code: &str) -> Option<&str> {
    code.get(..BASE_TYPE_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_table_covers_root_codes() {
        let table = TaxonomyTable::embedded().unwrap();
        for root in 1..=20 {
            let code = format!("{:02}", root);
            assert!(table.lookup(&code).is_some(), "missing root code {}", code);
        }
        assert_eq!(table.lookup("19"), Some("FIGHT"));
        assert_eq!(table.lookup("192"), Some("Occupy territory"));
        assert_eq!(table.lookup("999"), None);
    }

    #[test]
    fn test_from_reader_keeps_leading_zeros() {
        let data = "CODE\tNAME\n01\tMAKE PUBLIC STATEMENT\n010\tMake statement\n";
        let table = TaxonomyTable::from_reader(data.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup("01"), Some("MAKE PUBLIC STATEMENT"));
        assert_eq!(table.lookup("1"), None);
    }

    #[test]
    fn test_malformed_table_is_rejected() {
        let data = "CODE\tNAME\n01\n";
        let err = TaxonomyTable::from_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, NewsEventError::Taxonomy { .. }));

        let err = TaxonomyTable::from_reader("CODE\tNAME\n".as_bytes()).unwrap_err();
        assert!(matches!(err, NewsEventError::Taxonomy { .. }));
    }

    #[test]
    fn test_missing_file_is_a_taxonomy_error() {
        let err = TaxonomyTable::from_path(Path::new("/nonexistent/cameo.tsv")).unwrap_err();
        assert!(matches!(err, NewsEventError::Taxonomy { .. }));
    }

    #[test]
    fn test_base_type() {
        assert_eq!(base_type("1921"), Some("19"));
        assert_eq!(base_type("20"), Some("20"));
        assert_eq!(base_type("1"), None);
    }
}
