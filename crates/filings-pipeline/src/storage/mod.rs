//! Versioned local artifact storage
//!
//! Layout: `root/{cik}/{stage}/{category}/{chart kind?}/`, file names
//! `{cik}_{category}_{chart kind?}_{YYYYMMDDHHMMSS}.{ext}`. The latest artifact
//! of a folder is the file with the greatest modification time.
//!
//! Writes are not transactional: a data file is written before the version
//! index is touched, and an index failure is logged without undoing the write.

pub mod version_index;

pub use version_index::{IndexEntry, VersionIndex};

use crate::category::Category;
use crate::cik::Cik;
use crate::dataset::CategoryDataset;
use crate::error::{PipelineError, Result};
use crate::processing::{PeriodFact, read_period_facts, write_period_facts};
use crate::transform::{ChartKind, ChartPayload};
use filings_utils::Clock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
const TIMESTAMP_DIGITS: usize = 14;

/// Pipeline stage an artifact belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Long-format period facts
    Preprocessed,
    /// Wide datasets with derived ratios
    Processed,
    /// Chart payloads
    ProcessedPayloads,
}

impl Stage {
    pub fn directory(&self) -> &'static str {
        match self {
            Self::Preprocessed => "preprocessed_data",
            Self::Processed => "processed_data",
            Self::ProcessedPayloads => "processed_payloads",
        }
    }
}

/// Something that can be written as a CSV artifact
pub trait CsvArtifact {
    fn to_csv_bytes(&self) -> Result<Vec<u8>>;
}

impl CsvArtifact for CategoryDataset {
    fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        self.to_csv()
    }
}

impl CsvArtifact for [PeriodFact] {
    fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        write_period_facts(self)
    }
}

/// Stores and locates one entity's artifacts
pub struct StorageManager {
    root: PathBuf,
    cik: Cik,
    clock: Arc<dyn Clock>,
    index: VersionIndex,
}

impl StorageManager {
    pub fn new(root: impl Into<PathBuf>, cik: Cik, clock: Arc<dyn Clock>) -> Self {
        let root = root.into();
        Self {
            index: VersionIndex::new(root.clone()),
            root,
            cik,
            clock,
        }
    }

    pub fn cik(&self) -> &Cik {
        &self.cik
    }

    pub fn version_index(&self) -> &VersionIndex {
        &self.index
    }

    /// Directory of a category's artifacts, with an optional chart-kind level
    pub fn directory(&self, stage: Stage, category: Category, kind: Option<ChartKind>) -> PathBuf {
        let mut dir = self
            .root
            .join(self.cik.padded())
            .join(stage.directory())
            .join(category.folder_name());
        if let Some(kind) = kind {
            dir.push(kind.as_str());
        }
        dir
    }

    /// Store a table as CSV; returns the file name, or `None` after logging a failure
    pub fn store_table<T: CsvArtifact + ?Sized>(
        &self,
        table: &T,
        stage: Stage,
        category: Category,
    ) -> Option<String> {
        let stored = table
            .to_csv_bytes()
            .and_then(|bytes| self.write_artifact(stage, category, None, "csv", &bytes));
        self.finish_store(stored, stage, category.display_name().to_string())
    }

    /// Store a chart payload as JSON; returns the file name, or `None` after logging a failure
    pub fn store_payload(
        &self,
        payload: &ChartPayload,
        stage: Stage,
        category: Category,
        kind: ChartKind,
    ) -> Option<String> {
        let stored = serde_json::to_vec_pretty(payload)
            .map_err(PipelineError::from)
            .and_then(|bytes| self.write_artifact(stage, category, Some(kind), "json", &bytes));
        self.finish_store(stored, stage, format!("{} {kind}", category.display_name()))
    }

    /// Newest table of a category at a stage
    pub fn latest_path(&self, category: Category, stage: Stage) -> Option<PathBuf> {
        latest_in(&self.directory(stage, category, None))
    }

    /// Newest payload of a category and chart kind
    pub fn latest_payload_path(&self, category: Category, kind: ChartKind) -> Option<PathBuf> {
        latest_in(&self.directory(Stage::ProcessedPayloads, category, Some(kind)))
    }

    /// Decode the newest payload, `None` when there is no data
    pub fn load_latest_payload(&self, category: Category, kind: ChartKind) -> Option<ChartPayload> {
        let path = self.latest_payload_path(category, kind)?;
        let decoded = fs::read(&path)
            .map_err(PipelineError::from)
            .and_then(|bytes| serde_json::from_slice(&bytes).map_err(PipelineError::from));
        decoded
            .inspect_err(|e| tracing::error!("Failed to load payload {}: {e}", path.display()))
            .ok()
    }

    /// Decode the newest processed dataset, `None` when there is no data
    pub fn load_latest_dataset(&self, category: Category) -> Option<CategoryDataset> {
        self.read_latest_dataset(category)
            .inspect_err(|e| tracing::error!("Failed to load {category} dataset: {e}"))
            .ok()
            .flatten()
    }

    /// Newest processed dataset; validation failures propagate
    pub fn read_latest_dataset(&self, category: Category) -> Result<Option<CategoryDataset>> {
        let Some(path) = self.latest_path(category, Stage::Processed) else {
            return Ok(None);
        };
        let file = fs::File::open(&path).map_err(|e| storage_error("open", &path, &e))?;
        CategoryDataset::from_csv(file).map(Some)
    }

    /// Newest preprocessed facts; validation failures propagate
    pub fn read_latest_facts(&self, category: Category) -> Result<Option<Vec<PeriodFact>>> {
        let Some(path) = self.latest_path(category, Stage::Preprocessed) else {
            return Ok(None);
        };
        let file = fs::File::open(&path).map_err(|e| storage_error("open", &path, &e))?;
        read_period_facts(file).map(Some)
    }

    fn write_artifact(
        &self,
        stage: Stage,
        category: Category,
        kind: Option<ChartKind>,
        extension: &str,
        bytes: &[u8],
    ) -> Result<StoredArtifact> {
        let dir = self.directory(stage, category, kind);
        fs::create_dir_all(&dir).map_err(|e| storage_error("create", &dir, &e))?;

        let timestamp = self.clock.now().format(TIMESTAMP_FORMAT).to_string();
        let mut stem = vec![self.cik.padded(), category.folder_name().to_string()];
        if let Some(kind) = kind {
            stem.push(kind.as_str().to_string());
        }
        stem.push(timestamp.clone());
        let stem = stem.join("_");

        let mut file_name = format!("{stem}.{extension}");
        let mut attempt = 1;
        while dir.join(&file_name).exists() {
            file_name = format!("{stem}_{attempt}.{extension}");
            attempt += 1;
        }

        let path = dir.join(&file_name);
        fs::write(&path, bytes).map_err(|e| storage_error("write", &path, &e))?;
        tracing::info!("Data stored locally at {}", path.display());
        Ok(StoredArtifact {
            file_name,
            timestamp,
            path,
        })
    }

    fn finish_store(
        &self,
        stored: Result<StoredArtifact>,
        stage: Stage,
        heading: String,
    ) -> Option<String> {
        let artifact = stored
            .inspect_err(|e| tracing::error!("Failed to store {heading} artifact: {e}"))
            .ok()?;

        let relative = artifact
            .path
            .strip_prefix(&self.root)
            .map(|p| {
                p.components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_else(|_| artifact.file_name.clone());

        if let Err(e) = self
            .index
            .update(&self.cik, stage, &heading, &artifact.timestamp, &relative)
        {
            tracing::warn!("Index update for {heading} failed: {e}");
        }
        Some(artifact.file_name)
    }
}

struct StoredArtifact {
    file_name: String,
    timestamp: String,
    path: PathBuf,
}

fn storage_error(action: &str, path: &Path, error: &std::io::Error) -> PipelineError {
    PipelineError::Storage(format!("Failed to {action} {}: {error}", path.display()))
}

/// Sort key of a stored file name: the stem without its collision suffix,
/// then the suffix as a number (`0` when absent)
fn version_key(file_name: &str) -> (&str, u64) {
    let stem = file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem);
    match stem.rsplit_once('_') {
        Some((base, suffix))
            if suffix.len() < TIMESTAMP_DIGITS && suffix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            (base, suffix.parse().unwrap_or(0))
        }
        _ => (stem, 0),
    }
}

/// File with the greatest modification time directly inside `dir`
///
/// Ties are broken by file name, which embeds the storage timestamp, with
/// the collision suffix compared numerically.
fn latest_in(dir: &Path) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => {
            tracing::debug!("No artifacts under {}", dir.display());
            return None;
        }
    };

    entries
        .flatten()
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            let name = entry.file_name().to_string_lossy().into_owned();
            Some((modified, name, entry.path()))
        })
        .max_by(|a, b| (a.0, version_key(&a.1)).cmp(&(b.0, version_key(&b.1))))
        .map(|(_, _, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::quarterly;
    use crate::engines::engine_for;
    use crate::transform::TransformerManager;
    use filings_utils::ManualClock;
    use std::time::Duration;
    use tempfile::TempDir;

    fn storage(dir: &TempDir) -> (StorageManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_timestamp(1_700_000_000));
        let manager = StorageManager::new(dir.path(), Cik::parse("12927").unwrap(), clock.clone());
        (manager, clock)
    }

    fn liquidity() -> CategoryDataset {
        let facts = quarterly(&[
            ("AssetsCurrent", [100.0, 120.0, 90.0]),
            ("LiabilitiesCurrent", [50.0, 60.0, 100.0]),
        ]);
        engine_for(Category::Liquidity).run_query(&facts, 1.0).unwrap()
    }

    #[test]
    fn test_store_table_naming_and_index() {
        let dir = TempDir::new().unwrap();
        let (storage, _clock) = storage(&dir);

        let name = storage
            .store_table(&liquidity(), Stage::Processed, Category::Liquidity)
            .unwrap();

        // 1_700_000_000 is 2023-11-14T22:13:20Z
        assert_eq!(name, "0000012927_Liquidity_20231114221320.csv");
        let path = dir
            .path()
            .join("0000012927/processed_data/Liquidity")
            .join(&name);
        assert!(path.exists());

        let entry = storage
            .version_index()
            .entry(storage.cik(), Stage::Processed, "Liquidity")
            .unwrap()
            .unwrap();
        assert_eq!(
            entry.link,
            format!("- [Liquidity 20231114221320](0000012927/processed_data/Liquidity/{name})")
        );
    }

    #[test]
    fn test_successive_versions_and_latest() {
        let dir = TempDir::new().unwrap();
        let (storage, clock) = storage(&dir);
        let dataset = liquidity();

        let mut names = Vec::new();
        for _ in 0..3 {
            names.push(
                storage
                    .store_table(&dataset, Stage::Processed, Category::Liquidity)
                    .unwrap(),
            );
            clock.advance(Duration::from_secs(1));
        }

        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, names);
        assert_eq!(names.iter().collect::<std::collections::HashSet<_>>().len(), 3);

        let latest = storage.latest_path(Category::Liquidity, Stage::Processed).unwrap();
        assert_eq!(latest.file_name().unwrap().to_str().unwrap(), names[2]);
        assert_eq!(storage.load_latest_dataset(Category::Liquidity), Some(dataset));
    }

    #[test]
    fn test_same_second_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let (storage, _clock) = storage(&dir);

        let first = storage
            .store_table(&liquidity(), Stage::Processed, Category::Liquidity)
            .unwrap();
        let second = storage
            .store_table(&liquidity(), Stage::Processed, Category::Liquidity)
            .unwrap();
        assert_ne!(first, second);
        assert!(second.ends_with("_1.csv"));
    }

    #[test]
    fn test_tied_mtimes_compare_suffix_numerically() {
        let dir = TempDir::new().unwrap();
        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        for name in [
            "0000012927_Liquidity_20231114221320.csv",
            "0000012927_Liquidity_20231114221320_9.csv",
            "0000012927_Liquidity_20231114221320_10.csv",
        ] {
            let path = dir.path().join(name);
            fs::write(&path, b"x").unwrap();
            fs::File::options()
                .write(true)
                .open(&path)
                .unwrap()
                .set_modified(stamp)
                .unwrap();
        }

        let latest = latest_in(dir.path()).unwrap();
        assert_eq!(
            latest.file_name().unwrap().to_str().unwrap(),
            "0000012927_Liquidity_20231114221320_10.csv"
        );
        assert_eq!(version_key("a_20231114221320.csv"), ("a_20231114221320", 0));
        assert_eq!(version_key("a_20231114221320_2.json"), ("a_20231114221320", 2));
    }

    #[test]
    fn test_payload_roundtrip() {
        let dir = TempDir::new().unwrap();
        let (storage, _clock) = storage(&dir);
        let payload = TransformerManager::default()
            .transform(&liquidity(), Category::Liquidity, ChartKind::Line)
            .unwrap();

        let name = storage
            .store_payload(&payload, Stage::ProcessedPayloads, Category::Liquidity, ChartKind::Line)
            .unwrap();
        assert_eq!(name, "0000012927_Liquidity_line_chart_20231114221320.json");

        assert_eq!(
            storage.load_latest_payload(Category::Liquidity, ChartKind::Line),
            Some(payload)
        );
        assert_eq!(storage.load_latest_payload(Category::Liquidity, ChartKind::Bar), None);
    }

    #[test]
    fn test_missing_artifacts_are_none() {
        let dir = TempDir::new().unwrap();
        let (storage, _clock) = storage(&dir);
        assert!(storage.latest_path(Category::CashFlow, Stage::Preprocessed).is_none());
        assert!(storage.read_latest_facts(Category::CashFlow).unwrap().is_none());
        assert!(storage.load_latest_dataset(Category::CashFlow).is_none());
    }

    #[test]
    fn test_write_failure_returns_none() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"file").unwrap();
        let clock = Arc::new(ManualClock::at_timestamp(0));
        let storage = StorageManager::new(&blocker, Cik::parse("1").unwrap(), clock);

        assert!(storage
            .store_table(&liquidity(), Stage::Processed, Category::Liquidity)
            .is_none());
    }

    #[test]
    fn test_index_failure_does_not_block_write() {
        let dir = TempDir::new().unwrap();
        let (storage, _clock) = storage(&dir);
        // A directory where the index file should be makes the index write fail
        fs::create_dir_all(storage.version_index().index_path(storage.cik(), Stage::Processed))
            .unwrap();

        let name = storage.store_table(&liquidity(), Stage::Processed, Category::Liquidity);
        assert!(name.is_some());
        assert!(storage.latest_path(Category::Liquidity, Stage::Processed).is_some());
    }
}
