//! Project-content providers consumed by the adapters and the checker.
//!
//! Everything is trait-based so tests run against in-memory fixtures and
//! tools can plug real asset pipelines in. All paths are project-relative
//! with forward slashes; matching against schema path filters is
//! case-insensitive.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Source files of the project under validation.
pub trait FileProvider {
    /// `(path, content)` pairs sorted by path, so every consumer sees the
    /// same deterministic order.
    fn files(&self) -> Vec<(String, String)>;
}

/// In-memory file set for tests and embedded use.
#[derive(Debug, Clone, Default)]
pub struct MemoryFiles {
    entries: BTreeMap<String, String>,
}

impl MemoryFiles {
    pub fn new<P: Into<String>, C: Into<String>>(
        entries: impl IntoIterator<Item = (P, C)>,
    ) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(p, c)| (normalize(&p.into()), c.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.entries.insert(normalize(&path.into()), content.into());
    }
}

impl FileProvider for MemoryFiles {
    fn files(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(p, c)| (p.clone(), c.clone()))
            .collect()
    }
}

/// Walks a project directory, keeping `.txt` files (the Clausewitz script
/// extension) unless told to keep everything.
pub struct DirFiles {
    entries: BTreeMap<String, String>,
}

impl DirFiles {
    pub fn new(root: &Path) -> Result<Self, crate::Error> {
        Self::with_extension(root, Some("txt"))
    }

    pub fn with_extension(root: &Path, extension: Option<&str>) -> Result<Self, crate::Error> {
        let mut entries = BTreeMap::new();
        for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| crate::Error::Walk(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(wanted) = extension {
                let matches = entry
                    .path()
                    .extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case(wanted));
                if !matches {
                    continue;
                }
            }
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .into_owned();
            let content = std::fs::read_to_string(entry.path())?;
            entries.insert(normalize(&rel), content);
        }
        Ok(Self { entries })
    }
}

impl FileProvider for DirFiles {
    fn files(&self) -> Vec<(String, String)> {
        self.entries
            .iter()
            .map(|(p, c)| (p.clone(), c.clone()))
            .collect()
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

/// Localisation keys per locale, for existence/coverage checks.
pub trait LocalisationKeys {
    fn locales(&self) -> Vec<String>;
    fn has_key(&self, locale: &str, key: &str) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryLocalisation {
    locales: BTreeMap<String, BTreeSet<String>>,
}

impl MemoryLocalisation {
    pub fn new<L: Into<String>, K: Into<String>>(
        entries: impl IntoIterator<Item = (L, Vec<K>)>,
    ) -> Self {
        Self {
            locales: entries
                .into_iter()
                .map(|(l, keys)| (l.into(), keys.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }
}

impl LocalisationKeys for MemoryLocalisation {
    fn locales(&self) -> Vec<String> {
        self.locales.keys().cloned().collect()
    }

    fn has_key(&self, locale: &str, key: &str) -> bool {
        self.locales
            .get(locale)
            .is_some_and(|keys| keys.contains(key))
    }
}

/// Game assets: files referenced by `filepath[...]`/`icon[...]` fields and
/// registered sprite names for the `<spriteType>` idiom.
pub trait AssetRegistry {
    fn file_exists(&self, path: &str) -> bool;
    fn sprite_names(&self) -> BTreeSet<String>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    files: BTreeSet<String>,
    sprites: BTreeSet<String>,
}

impl MemoryAssets {
    pub fn new<F: Into<String>, S: Into<String>>(
        files: impl IntoIterator<Item = F>,
        sprites: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            files: files.into_iter().map(|f| normalize(&f.into())).collect(),
            sprites: sprites.into_iter().map(Into::into).collect(),
        }
    }
}

impl AssetRegistry for MemoryAssets {
    fn file_exists(&self, path: &str) -> bool {
        let wanted = normalize(path).to_ascii_lowercase();
        self.files.iter().any(|f| f.to_ascii_lowercase() == wanted)
    }

    fn sprite_names(&self) -> BTreeSet<String> {
        self.sprites.clone()
    }
}
