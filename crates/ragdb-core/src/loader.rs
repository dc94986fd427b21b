use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::DocumentsConfig;
use crate::error::{Error, Result};
use crate::traits::DocumentSource;
use crate::types::Document;

/// Loads every file under a directory as one document.
///
/// Metadata per document: `source` (file path), `file_name`, and
/// `category` (parent directory relative to the root, `misc` at top level).
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
    extensions: Vec<String>,
    recursive: bool,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), extensions: Vec::new(), recursive: true }
    }

    pub fn from_config(config: &DocumentsConfig) -> Self {
        Self {
            root: PathBuf::from(&config.dir),
            extensions: config.extensions.iter().map(|e| e.trim_start_matches('.').to_lowercase()).collect(),
            recursive: config.recursive,
        }
    }

    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions.into_iter().map(|e| e.as_ref().trim_start_matches('.').to_lowercase()).collect();
        self
    }

    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn list_files(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(Error::DocumentSource(format!("directory not found: {}", self.root.display())));
        }
        let mut walker = walkdir::WalkDir::new(&self.root);
        if !self.recursive {
            walker = walker.max_depth(1);
        }
        let mut files = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| Error::DocumentSource(e.to_string()))?;
            if entry.file_type().is_file() && self.accepts(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    fn category(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        match relative.parent().and_then(Path::to_str) {
            Some(parent) if !parent.is_empty() => parent.to_string(),
            _ => "misc".to_string(),
        }
    }
}

impl DocumentSource for DirectoryLoader {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn load(&self) -> Result<Vec<Document>> {
        info!(dir = %self.root.display(), "loading documents");
        let files = self.list_files()?;
        let mut documents = Vec::with_capacity(files.len());
        for path in files {
            let content = read_file_content(&path)?;
            let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            debug!(path = %path.display(), chars = content.chars().count(), "loaded document");
            documents.push(
                Document::new(content, path.to_string_lossy())
                    .with_attribute("file_name", file_name)
                    .with_attribute("category", self.category(&path)),
            );
        }
        info!(count = documents.len(), "loaded documents");
        Ok(documents)
    }
}

fn read_file_content(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| Error::DocumentSource(format!("{}: {e}", path.display())))?;
    Ok(match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}
