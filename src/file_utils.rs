use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Find files with a specific extension in a directory, sorted by path
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        let extension = extension.trim_start_matches('.');

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    if ext.to_string_lossy().eq_ignore_ascii_case(extension) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        result.sort();
        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    // @returns: File name without directory or extension
    pub fn document_stem<P: AsRef<Path>>(path: P) -> String {
        path.as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    // @generates: Catalog path for a source document
    // @params: po_dir, language, document stem
    pub fn catalog_path<P: AsRef<Path>>(po_dir: P, language: &str, stem: &str) -> PathBuf {
        po_dir
            .as_ref()
            .join(language)
            .join("LC_MESSAGES")
            .join(format!("{}.po", stem))
    }

    /// All catalogs for one language
    pub fn catalog_files<P: AsRef<Path>>(po_dir: P, language: &str) -> Result<Vec<PathBuf>> {
        let dir = po_dir.as_ref().join(language).join("LC_MESSAGES");
        if !Self::dir_exists(&dir) {
            return Ok(Vec::new());
        }
        Self::find_files(dir, "po")
    }

    /// All RST sources under the source directory
    pub fn source_files<P: AsRef<Path>>(source_dir: P) -> Result<Vec<PathBuf>> {
        let source_dir = source_dir.as_ref();
        if !Self::dir_exists(source_dir) {
            return Err(anyhow::anyhow!("Source directory does not exist: {:?}", source_dir));
        }
        Self::find_files(source_dir, "rst")
    }

    /// Resolve `name` (with or without `.rst`, relative to the source directory) to a file
    pub fn resolve_source_file<P: AsRef<Path>>(source_dir: P, name: &str) -> Result<PathBuf> {
        let source_dir = source_dir.as_ref();
        let name = name.strip_suffix(".rst").unwrap_or(name);

        let direct = source_dir.join(format!("{}.rst", name));
        if Self::file_exists(&direct) {
            return Ok(direct);
        }

        // Fall back to the first source whose stem matches
        Self::source_files(source_dir)?
            .into_iter()
            .find(|path| Self::document_stem(path) == name)
            .ok_or_else(|| anyhow::anyhow!("No source file found for {}", name))
    }

    /// All `.pot` templates under the template directory
    pub fn find_all_pot_files<P: AsRef<Path>>(pot_dir: P) -> Result<Vec<PathBuf>> {
        if !Self::dir_exists(pot_dir.as_ref()) {
            return Ok(Vec::new());
        }
        Self::find_files(pot_dir, "pot")
    }

    /// Template for a document: exact stem match first, then the first partial match
    pub fn find_pot_file<P: AsRef<Path>>(pot_dir: P, stem: &str) -> Result<Option<PathBuf>> {
        let templates = Self::find_all_pot_files(pot_dir)?;

        if let Some(exact) = templates.iter().find(|p| Self::document_stem(p) == stem) {
            return Ok(Some(exact.clone()));
        }
        Ok(templates
            .into_iter()
            .find(|p| Self::document_stem(p).contains(stem)))
    }
}
