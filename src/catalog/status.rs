/*!
 * Translation progress per catalog.
 */

use anyhow::Result;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use super::model::Catalog;
use crate::document::{load_segments, normalize_text};
use crate::file_utils::FileManager;

/// Counts for one catalog
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogStats {
    /// Live entries, header and obsolete entries excluded
    pub total: usize,
    /// Translated and not fuzzy
    pub translated: usize,
    pub fuzzy: usize,
    /// Empty msgstr
    pub untranslated: usize,
}

impl CatalogStats {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut stats = Self::default();
        for entry in catalog.messages() {
            stats.total += 1;
            if entry.is_fuzzy() {
                stats.fuzzy += 1;
            } else if entry.is_translated() {
                stats.translated += 1;
            } else {
                stats.untranslated += 1;
            }
        }
        stats
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.translated as f64 * 100.0 / self.total as f64
        }
    }
}

/// Status of one source document
#[derive(Debug, Clone, PartialEq)]
pub struct FileStatus {
    pub name: String,
    /// None when the document has no catalog yet
    pub stats: Option<CatalogStats>,
    /// Segments currently extracted from the source
    pub source_segments: usize,
    /// Source segments that have no catalog entry
    pub missing: Vec<String>,
}

/// Status of every requested document for one language
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub language: String,
    pub files: Vec<FileStatus>,
}

impl StatusReport {
    /// Build the report for `sources`, reading catalogs from `po_dir`
    pub fn analyze(sources: &[PathBuf], po_dir: &PathBuf, language: &str) -> Result<Self> {
        let mut files = Vec::with_capacity(sources.len());
        for source in sources {
            let name = FileManager::document_stem(source);
            let segments = load_segments(source)?;
            let catalog_path = FileManager::catalog_path(po_dir, language, &name);

            if !FileManager::file_exists(&catalog_path) {
                files.push(FileStatus {
                    name,
                    stats: None,
                    source_segments: segments.len(),
                    missing: segments.into_iter().map(|s| s.source_text).collect(),
                });
                continue;
            }

            let catalog = Catalog::load(&catalog_path)?;
            let known: HashSet<String> = catalog.messages().map(|e| normalize_text(e.msgid())).collect();
            let mut seen = HashSet::new();
            let missing = segments
                .iter()
                .filter(|s| !known.contains(&s.source_text) && seen.insert(s.source_text.clone()))
                .map(|s| s.source_text.clone())
                .collect();

            files.push(FileStatus {
                name,
                stats: Some(CatalogStats::from_catalog(&catalog)),
                source_segments: segments.len(),
                missing,
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            language: language.to_string(),
            files,
        })
    }

    /// Completion over all documents; documents without a catalog count as untranslated
    pub fn overall_percentage(&self) -> f64 {
        let (translated, total) = self.files.iter().fold((0, 0), |(t, n), file| match &file.stats {
            Some(stats) => (t + stats.translated, n + stats.total),
            None => (t, n + file.source_segments),
        });
        if total == 0 {
            0.0
        } else {
            translated as f64 * 100.0 / total as f64
        }
    }
}

fn progress_bar(percentage: f64) -> String {
    let blocks = ((percentage / 10.0) as usize).min(10);
    format!("{}{}", "#".repeat(blocks), "-".repeat(10 - blocks))
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Translation status for {}:", self.language)?;
        writeln!(f, "{}", "-".repeat(80))?;
        writeln!(
            f,
            "{:<30} {:<10} {:<12} {:<8} {:<8} {:<8}",
            "File", "Progress", "Translated", "Fuzzy", "Total", "Missing"
        )?;
        writeln!(f, "{}", "-".repeat(80))?;
        for file in &self.files {
            match &file.stats {
                Some(stats) => {
                    let missing = if file.missing.is_empty() {
                        String::new()
                    } else {
                        format!("({})", file.missing.len())
                    };
                    writeln!(
                        f,
                        "{:<30} {:<10} {:<12} {:<8} {:<8} {:<8}",
                        file.name,
                        progress_bar(stats.percentage()),
                        stats.translated,
                        stats.fuzzy,
                        stats.total,
                        missing
                    )?;
                }
                None => writeln!(
                    f,
                    "{:<30} {:<10} {:<12} {:<8} {:<8} {:<8}",
                    file.name,
                    progress_bar(0.0),
                    0,
                    0,
                    file.source_segments,
                    "(all)"
                )?,
            }
        }
        writeln!(f, "{}", "-".repeat(80))?;
        write!(f, "Overall completion: {:.1}%", self.overall_percentage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;

    #[test]
    fn test_catalogStats_shouldSplitTranslatedFuzzyAndEmpty() {
        let mut catalog = Catalog::new("sv", "x");
        catalog.insert(CatalogEntry::new("a", "A"));
        catalog.insert(CatalogEntry::new("b", ""));
        let fuzzy = catalog.insert(CatalogEntry::new("c", "C"));
        if let Some(entry) = catalog.get_mut(fuzzy) {
            entry.set_fuzzy(true);
        }

        let stats = CatalogStats::from_catalog(&catalog);
        assert_eq!(stats, CatalogStats { total: 3, translated: 1, fuzzy: 1, untranslated: 1 });
        assert!((stats.percentage() - 33.333).abs() < 0.01);
    }

    #[test]
    fn test_progressBar_shouldScaleToTenBlocks() {
        assert_eq!(progress_bar(0.0), "----------");
        assert_eq!(progress_bar(55.0), "#####-----");
        assert_eq!(progress_bar(100.0), "##########");
    }

    #[test]
    fn test_analyze_shouldCountMissingCatalogsAsUntranslated() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let source_dir = dir.path().join("source");
        let po_dir = dir.path().join("locales");
        FileManager::write_to_file(source_dir.join("a.rst"), "First paragraph.\n\nSecond paragraph.\n")?;
        FileManager::write_to_file(source_dir.join("b.rst"), "Only paragraph.\n")?;

        let mut catalog = Catalog::new("sv", "x");
        catalog.insert(CatalogEntry::new("First paragraph.", "Första stycket."));
        catalog.save(&FileManager::catalog_path(&po_dir, "sv", "a"))?;

        let sources = FileManager::source_files(&source_dir)?;
        let report = StatusReport::analyze(&sources, &po_dir, "sv")?;
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.files[0].missing, vec!["Second paragraph.".to_string()]);
        assert_eq!(report.files[1].stats, None);
        // 1 translated out of 1 catalog entry + 1 segment without catalog
        assert!((report.overall_percentage() - 50.0).abs() < 0.01);
        assert!(report.to_string().contains("Overall completion: 50.0%"));
        Ok(())
    }
}
