//! Per-entity markdown pointer index
//!
//! One `index.md` per entity and stage. Each `### heading` section holds
//! exactly one link to the newest artifact stored under that heading; an
//! update replaces the link instead of appending to it.

use super::Stage;
use crate::cik::Cik;
use crate::error::{PipelineError, Result};
use std::fs;
use std::path::{Path, PathBuf};

const INDEX_FILE: &str = "index.md";
const HEADING_PREFIX: &str = "### ";

/// One pointer of the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub heading: String,
    pub link: String,
}

/// Reader and writer of the pointer documents under a storage root
#[derive(Debug, Clone)]
pub struct VersionIndex {
    root: PathBuf,
}

impl VersionIndex {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn index_path(&self, cik: &Cik, stage: Stage) -> PathBuf {
        self.root
            .join(cik.padded())
            .join(stage.directory())
            .join(INDEX_FILE)
    }

    /// Point `heading` at the artifact `relative_path`, stored at `timestamp`
    pub fn update(
        &self,
        cik: &Cik,
        stage: Stage,
        heading: &str,
        timestamp: &str,
        relative_path: &str,
    ) -> Result<()> {
        let path = self.index_path(cik, stage);
        let mut entries = read_entries(&path)?;
        let link = format!("- [{heading} {timestamp}]({relative_path})");

        match entries.iter_mut().find(|e| e.heading == heading) {
            Some(entry) => entry.link = link,
            None => entries.push(IndexEntry {
                heading: heading.to_string(),
                link,
            }),
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, render(cik, stage, &entries))?;
        tracing::debug!("Updated index {} for {heading}", path.display());
        Ok(())
    }

    /// Every pointer of an entity's stage index, in document order
    pub fn entries(&self, cik: &Cik, stage: Stage) -> Result<Vec<IndexEntry>> {
        read_entries(&self.index_path(cik, stage))
    }

    /// Pointer for one heading
    pub fn entry(&self, cik: &Cik, stage: Stage, heading: &str) -> Result<Option<IndexEntry>> {
        Ok(self
            .entries(cik, stage)?
            .into_iter()
            .find(|e| e.heading == heading))
    }
}

fn read_entries(path: &Path) -> Result<Vec<IndexEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        PipelineError::Storage(format!("Failed to read index {}: {e}", path.display()))
    })?;

    let mut entries: Vec<IndexEntry> = Vec::new();
    for line in content.lines() {
        if let Some(heading) = line.strip_prefix(HEADING_PREFIX) {
            entries.push(IndexEntry {
                heading: heading.trim().to_string(),
                link: String::new(),
            });
        } else if let Some(current) = entries.last_mut() {
            // Only the last link line of a section survives
            if !line.trim().is_empty() {
                current.link = line.trim().to_string();
            }
        }
    }
    Ok(entries)
}

fn render(cik: &Cik, stage: Stage, entries: &[IndexEntry]) -> String {
    let mut out = format!(
        "---\ntitle: CIK {cik} Data\nslug: /data/{cik}/{}/\n---\n\n",
        stage.directory()
    );
    for entry in entries {
        out.push_str(HEADING_PREFIX);
        out.push_str(&entry.heading);
        out.push('\n');
        out.push_str(&entry.link);
        out.push_str("\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_update_overwrites_pointer() {
        let dir = TempDir::new().unwrap();
        let index = VersionIndex::new(dir.path());
        let cik = Cik::parse("12927").unwrap();

        index
            .update(&cik, Stage::Processed, "Liquidity", "20240101000000", "a.csv")
            .unwrap();
        index
            .update(&cik, Stage::Processed, "Cash Flow", "20240101000001", "b.csv")
            .unwrap();
        index
            .update(&cik, Stage::Processed, "Liquidity", "20240102000000", "c.csv")
            .unwrap();

        let content = fs::read_to_string(index.index_path(&cik, Stage::Processed)).unwrap();
        assert!(content.starts_with(
            "---\ntitle: CIK 0000012927 Data\nslug: /data/0000012927/processed_data/\n---\n\n"
        ));
        assert_eq!(content.matches("### Liquidity").count(), 1);
        assert!(!content.contains("a.csv"));

        let entries = index.entries(&cik, Stage::Processed).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].heading, "Liquidity");
        assert_eq!(entries[0].link, "- [Liquidity 20240102000000](c.csv)");
        assert_eq!(
            index.entry(&cik, Stage::Processed, "Cash Flow").unwrap().unwrap().link,
            "- [Cash Flow 20240101000001](b.csv)"
        );
    }

    #[test]
    fn test_missing_index_is_empty() {
        let dir = TempDir::new().unwrap();
        let index = VersionIndex::new(dir.path());
        let cik = Cik::parse("1").unwrap();
        assert!(index.entries(&cik, Stage::Preprocessed).unwrap().is_empty());
        assert!(index.entry(&cik, Stage::Preprocessed, "Liquidity").unwrap().is_none());
    }
}
