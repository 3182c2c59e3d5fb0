use std::fmt;
use std::path::{Path, PathBuf};

/// Column holding the numeric row index in a Shazam library export.
const INDEX_COLUMN: usize = 0;
const TITLE_COLUMN: usize = 2;
const ARTIST_COLUMN: usize = 3;

/// A discovered track as recorded in the scan history.
///
/// Equality is exact on both fields, case included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRecord {
    title: String,
    artist: String,
}

impl SourceRecord {
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist(&self) -> &str {
        &self.artist
    }

    /// Free-text query used to find this record in the catalog.
    pub fn search_term(&self) -> String {
        format!("{} {}", self.artist, self.title)
    }

    /// Build a record from a fixed-column row, or `None` if it isn't a data row.
    fn from_row<S: AsRef<str>>(row: &[S]) -> Option<Self> {
        let index = row.get(INDEX_COLUMN)?.as_ref();
        if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let title = row.get(TITLE_COLUMN)?.as_ref();
        let artist = row.get(ARTIST_COLUMN)?.as_ref();
        Some(Self::new(title, artist))
    }
}

impl fmt::Display for SourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.search_term())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceLoadError {
    #[error("Failed to open library file {}: {source}", path.display())]
    Open { path: PathBuf, source: csv::Error },
    #[error("Failed to read library file {}: {source}", path.display())]
    Read { path: PathBuf, source: csv::Error },
}

/// Insertion-ordered, duplicate-free collection of source records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLibrary {
    records: Vec<SourceRecord>,
}

impl SourceLibrary {
    /// Load records from raw rows, skipping anything that isn't a data row.
    pub fn from_rows<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<S>>,
        S: AsRef<str>,
    {
        let mut library = Self::default();
        for row in rows {
            if let Some(record) = SourceRecord::from_row(&row) {
                library.push(record);
            }
        }
        library
    }

    /// Load a Shazam library CSV export.
    ///
    /// The export starts with a banner line and a header row; both fail the
    /// data-row check and are dropped like any other malformed row.
    pub fn from_csv_path(path: &Path) -> Result<Self, SourceLoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|source| SourceLoadError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|source| SourceLoadError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        let library = Self::from_rows(rows);
        tracing::info!(
            "Loaded {} unique tracks from {}",
            library.len(),
            path.display()
        );
        Ok(library)
    }

    /// Append a record unless an equal one is already present.
    pub fn push(&mut self, record: SourceRecord) -> bool {
        if self.records.contains(&record) {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn records(&self) -> &[SourceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
