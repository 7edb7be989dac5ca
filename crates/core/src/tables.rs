use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
};

use serde::Deserialize;
use thiserror::Error;

const BUILTIN_TYPOS: &[(&str, &str)] = &[
    ("gmial.com", "gmail.com"),
    ("gamil.com", "gmail.com"),
    ("gmeil.com", "gmail.com"),
    ("hotmal.com", "hotmail.com"),
    ("hotmai.com", "hotmail.com"),
    ("yahooo.com", "yahoo.com"),
    ("yaho.com", "yahoo.com"),
    ("outlok.com", "outlook.com"),
    ("outllok.com", "outlook.com"),
    ("gmai.com", "gmail.com"),
    ("gmal.com", "gmail.com"),
    ("hotmil.com", "hotmail.com"),
    ("yhoo.com", "yahoo.com"),
];

const BUILTIN_DISPOSABLE: &[&str] = &[
    "tempmail.com",
    "10minutemail.com",
    "guerrillamail.com",
    "mailinator.com",
    "throwawaymail.com",
    "temp-mail.org",
    "sharklasers.com",
    "getairmail.com",
    "mailnesia.com",
    "trashmail.com",
    "spam4.me",
    "bccto.me",
];

const BUILTIN_KEYWORDS: &[&str] = &["test", "123", "demo", "temp", "fake", "example"];

/// Read-only lookup data consulted by the advisor.
///
/// Every key and entry is stored lowercase. Lookups are exact, so a domain
/// typed in mixed case never matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTables {
    typos: HashMap<String, String>,
    disposable_domains: HashSet<String>,
    keywords: Vec<String>,
}

impl ReferenceTables {
    /// Builds tables from arbitrary entries, lowercasing everything.
    pub fn new<T, D, K, S>(typos: T, disposable_domains: D, keywords: K) -> Self
    where
        T: IntoIterator<Item = (S, S)>,
        D: IntoIterator<Item = S>,
        K: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            typos: typos
                .into_iter()
                .map(|(from, to)| (from.as_ref().to_lowercase(), to.as_ref().to_lowercase()))
                .collect(),
            disposable_domains: disposable_domains
                .into_iter()
                .map(|domain| domain.as_ref().to_lowercase())
                .collect(),
            keywords: keywords
                .into_iter()
                .map(|keyword| keyword.as_ref().to_lowercase())
                .filter(|keyword| !keyword.is_empty())
                .collect(),
        }
    }

    /// Tables shipped with the binary.
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_TYPOS.iter().copied(),
            BUILTIN_DISPOSABLE.iter().copied(),
            BUILTIN_KEYWORDS.iter().copied(),
        )
    }

    /// Parses a JSON document. Sections that are absent keep the built-in contents.
    pub fn from_json_str(raw: &str) -> Result<Self, TablesError> {
        let file: TablesFile = serde_json::from_str(raw)?;
        let mut tables = Self::builtin();

        if let Some(typos) = file.typos {
            tables.typos = Self::new(typos, [], []).typos;
        }
        if let Some(domains) = file.disposable_domains {
            tables.disposable_domains = Self::new([], domains, []).disposable_domains;
        }
        if let Some(keywords) = file.keywords {
            tables.keywords = Self::new([], [], keywords).keywords;
        }

        Ok(tables)
    }

    /// Reads and parses a tables file from disk.
    pub fn load(path: &Path) -> Result<Self, TablesError> {
        let raw = fs::read_to_string(path).map_err(|source| TablesError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Returns the canonical domain for a known misspelling.
    pub fn correction_for(&self, domain: &str) -> Option<&str> {
        self.typos.get(domain).map(String::as_str)
    }

    pub fn is_disposable(&self, domain: &str) -> bool {
        self.disposable_domains.contains(domain)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    pub fn typo_count(&self) -> usize {
        self.typos.len()
    }

    pub fn disposable_count(&self) -> usize {
        self.disposable_domains.len()
    }
}

impl Default for ReferenceTables {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Debug, Deserialize)]
struct TablesFile {
    #[serde(default)]
    typos: Option<HashMap<String, String>>,
    #[serde(default)]
    disposable_domains: Option<Vec<String>>,
    #[serde(default)]
    keywords: Option<Vec<String>>,
}

/// Errors raised while loading replacement tables.
#[derive(Debug, Error)]
pub enum TablesError {
    #[error("failed to read advisor tables from {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to decode advisor tables: {0}")]
    Decode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_tables_cover_known_entries() {
        let tables = ReferenceTables::builtin();
        assert_eq!(tables.correction_for("gmial.com"), Some("gmail.com"));
        assert_eq!(tables.correction_for("outllok.com"), Some("outlook.com"));
        assert_eq!(tables.correction_for("gmail.com"), None);
        assert!(tables.is_disposable("mailinator.com"));
        assert!(!tables.is_disposable("example.org"));
        assert_eq!(tables.keywords().count(), 6);
        assert_eq!(tables.typo_count(), 13);
        assert_eq!(tables.disposable_count(), 12);
    }

    #[test]
    fn new_lowercases_entries() {
        let tables = ReferenceTables::new(
            [("GMIAL.COM", "Gmail.com")],
            ["Temp.Example"],
            ["DEMO"],
        );
        assert_eq!(tables.correction_for("gmial.com"), Some("gmail.com"));
        assert!(tables.is_disposable("temp.example"));
        assert_eq!(tables.keywords().collect::<Vec<_>>(), vec!["demo"]);
    }

    #[test]
    fn json_sections_replace_builtin_ones() {
        let tables = ReferenceTables::from_json_str(
            r#"{"disposable_domains": ["burner.test"], "keywords": []}"#,
        )
        .expect("tables should parse");

        assert!(tables.is_disposable("burner.test"));
        assert!(!tables.is_disposable("tempmail.com"));
        assert_eq!(tables.keywords().count(), 0);
        assert_eq!(tables.correction_for("gamil.com"), Some("gmail.com"));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"typos": {{"exmaple.com": "example.com"}}}}"#).expect("write tables");

        let tables = ReferenceTables::load(file.path()).expect("tables should load");
        assert_eq!(tables.correction_for("exmaple.com"), Some("example.com"));
        assert_eq!(tables.correction_for("gmial.com"), None);
        assert!(tables.is_disposable("bccto.me"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ReferenceTables::load(Path::new("/nonexistent/tables.json"))
            .expect_err("missing file should fail");
        assert!(matches!(err, TablesError::Read { .. }));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = ReferenceTables::from_json_str("{not json").expect_err("invalid json");
        assert!(matches!(err, TablesError::Decode(_)));
    }
}
