//! The template registry.
//!
//! Maps component names to their compiled form. Readers take a cheap
//! [`RegistrySnapshot`] at request entry and render against it; the
//! watcher task replaces a document's entries under the write lock when
//! its file changes. A failed reparse leaves the previous entries in
//! place, so the last-known-good version stays servable.

use chrono::{DateTime, Utc};
use hudl_template::{compile_document, CompileError, CompiledComponent, ComponentSource};
use hudl_syntax::LineCol;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// One registered component.
#[derive(Debug)]
pub struct RegistryEntry {
    pub compiled: Arc<CompiledComponent>,
    /// Source file that defines the component.
    pub file: PathBuf,
    /// Full source text, kept for mapping spans to line/column in error
    /// responses.
    pub source: Arc<str>,
}

/// Listing record for `GET /api/components`.
#[derive(Debug, Clone, serde::Serialize, PartialEq)]
pub struct ComponentRecord {
    pub name: String,
    pub file: String,
    pub data_type: Option<String>,
}

#[derive(Default)]
struct State {
    components: HashMap<String, Arc<RegistryEntry>>,
    last_reload: Option<DateTime<Utc>>,
}

/// Shared, snapshot-replaceable component store.
#[derive(Default)]
pub struct TemplateRegistry {
    state: RwLock<State>,
}

/// A consistent view of the registry for the duration of one render.
#[derive(Clone)]
pub struct RegistrySnapshot {
    components: Arc<HashMap<String, Arc<RegistryEntry>>>,
}

impl RegistrySnapshot {
    pub fn entry(&self, name: &str) -> Option<&Arc<RegistryEntry>> {
        self.components.get(name)
    }
}

impl ComponentSource for RegistrySnapshot {
    fn component(&self, name: &str) -> Option<Arc<CompiledComponent>> {
        self.components.get(name).map(|e| e.compiled.clone())
    }
}

/// A compile failure annotated with its file and 1-based position, ready
/// for the JSON error body.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl LoadFailure {
    fn from_compile(file: &Path, source: &str, error: &CompileError) -> Self {
        let pos = LineCol::of(source, error.span().start);
        Self {
            file: file.to_path_buf(),
            line: pos.line,
            column: pos.column,
            message: error.message().to_string(),
        }
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Crawl `dir` recursively and load every `.hudl` document. Parse
    /// failures are logged and skipped; the rest of the tree still loads.
    pub fn load_tree(&self, dir: &Path) -> usize {
        let mut loaded = 0;
        self.walk(dir, &mut loaded);
        self.state.write().last_reload = Some(Utc::now());
        loaded
    }

    fn walk(&self, dir: &Path, loaded: &mut usize) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                self.walk(&path, loaded);
            } else if path.extension().and_then(|e| e.to_str()) == Some("hudl") {
                match self.load_file(&path) {
                    Ok(names) => *loaded += names.len(),
                    Err(failure) => {
                        warn!(
                            file = %failure.file.display(),
                            line = failure.line,
                            "skipping template: {}",
                            failure.message
                        );
                    }
                }
            }
        }
    }

    /// (Re)load one document. On success the document's entries replace
    /// atomically: components it no longer defines are dropped, entries
    /// from other documents are untouched. On failure nothing changes.
    pub fn load_file(&self, path: &Path) -> Result<Vec<String>, LoadFailure> {
        let source = std::fs::read_to_string(path).map_err(|e| LoadFailure {
            file: path.to_path_buf(),
            line: 0,
            column: 0,
            message: format!("cannot read file: {e}"),
        })?;

        let doc_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("template")
            .to_string();

        let known = self.known_names();
        let compiled = compile_document(&source, &doc_name, path.parent(), &known)
            .map_err(|e| LoadFailure::from_compile(path, &source, &e))?;

        for (span, message) in &compiled.warnings {
            let pos = LineCol::of(&source, span.start);
            warn!(file = %path.display(), line = pos.line, "{message}");
        }

        let source: Arc<str> = source.into();
        let mut names = Vec::new();
        let mut state = self.state.write();

        // Drop components this file defined before but no longer does.
        let fresh: HashSet<&str> = compiled
            .components
            .iter()
            .map(|c| c.component.name.as_str())
            .collect();
        state.components.retain(|name, entry| {
            entry.file != path || fresh.contains(name.as_str())
        });

        for component in &compiled.components {
            let name = component.component.name.clone();
            info!(component = %name, file = %path.display(), "loaded");
            state.components.insert(
                name.clone(),
                Arc::new(RegistryEntry {
                    compiled: component.clone(),
                    file: path.to_path_buf(),
                    source: source.clone(),
                }),
            );
            names.push(name);
        }
        state.last_reload = Some(Utc::now());

        Ok(names)
    }

    /// Drop every component a removed file defined.
    pub fn remove_file(&self, path: &Path) {
        let mut state = self.state.write();
        state.components.retain(|_, entry| entry.file != path);
        state.last_reload = Some(Utc::now());
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.read();
        RegistrySnapshot {
            components: Arc::new(state.components.clone()),
        }
    }

    pub fn entry(&self, name: &str) -> Option<Arc<RegistryEntry>> {
        self.state.read().components.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_reload(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_reload
    }

    pub fn known_names(&self) -> HashSet<String> {
        self.state.read().components.keys().cloned().collect()
    }

    /// Component listing, sorted by name for stable output.
    pub fn records(&self) -> Vec<ComponentRecord> {
        let state = self.state.read();
        let mut records: Vec<ComponentRecord> = state
            .components
            .values()
            .map(|entry| ComponentRecord {
                name: entry.compiled.component.name.clone(),
                file: entry.file.display().to_string(),
                data_type: entry.compiled.component.data_type.clone(),
            })
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_hudl(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn template(name: &str) -> String {
        format!("// name: {name}\nel {{\n    div \"hello\"\n}}\n")
    }

    #[test]
    fn load_tree_finds_nested_templates() {
        let dir = tempfile::tempdir().unwrap();
        write_hudl(dir.path(), "a.hudl", &template("Alpha"));
        fs::create_dir(dir.path().join("sub")).unwrap();
        write_hudl(&dir.path().join("sub"), "b.hudl", &template("Beta"));
        fs::write(dir.path().join("notes.txt"), "not a template").unwrap();

        let registry = TemplateRegistry::new();
        assert_eq!(registry.load_tree(dir.path()), 2);
        assert!(registry.entry("Alpha").is_some());
        assert!(registry.entry("Beta").is_some());
        assert!(registry.last_reload().is_some());
    }

    #[test]
    fn reload_replaces_only_that_files_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path_a = write_hudl(dir.path(), "a.hudl", &template("Alpha"));
        write_hudl(dir.path(), "b.hudl", &template("Beta"));

        let registry = TemplateRegistry::new();
        registry.load_tree(dir.path());

        let beta_before = registry.entry("Beta").unwrap();

        fs::write(&path_a, template("AlphaV2")).unwrap();
        registry.load_file(&path_a).unwrap();

        // Old name gone, new name present, other file untouched.
        assert!(registry.entry("Alpha").is_none());
        assert!(registry.entry("AlphaV2").is_some());
        let beta_after = registry.entry("Beta").unwrap();
        assert!(Arc::ptr_eq(&beta_before, &beta_after));
    }

    #[test]
    fn failed_reparse_keeps_stale_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_hudl(dir.path(), "card.hudl", &template("Card"));

        let registry = TemplateRegistry::new();
        registry.load_tree(dir.path());
        let before = registry.entry("Card").unwrap();

        fs::write(&path, "// name: Card\nel { broken {").unwrap();
        let failure = registry.load_file(&path).unwrap_err();
        assert!(failure.line >= 1);

        let after = registry.entry("Card").unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn failure_carries_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_hudl(dir.path(), "bad.hudl", "el {\n    p \"unclosed\n}\n");

        let registry = TemplateRegistry::new();
        let failure = registry.load_file(&path).unwrap_err();
        assert_eq!(failure.file, path);
        assert!(failure.line >= 2, "line was {}", failure.line);
        assert!(!failure.message.is_empty());
    }

    #[test]
    fn remove_file_drops_its_components() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_hudl(dir.path(), "a.hudl", &template("Alpha"));
        let registry = TemplateRegistry::new();
        registry.load_tree(dir.path());

        registry.remove_file(&path);
        assert!(registry.entry("Alpha").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_stable_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_hudl(dir.path(), "a.hudl", &template("Alpha"));
        let registry = TemplateRegistry::new();
        registry.load_tree(dir.path());

        let snapshot = registry.snapshot();
        fs::write(&path, template("Renamed")).unwrap();
        registry.load_file(&path).unwrap();

        // The captured snapshot still sees the old world.
        use hudl_template::ComponentSource;
        assert!(snapshot.component("Alpha").is_some());
        assert!(registry.entry("Alpha").is_none());
    }

    #[test]
    fn records_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_hudl(dir.path(), "z.hudl", &template("Zeta"));
        write_hudl(dir.path(), "a.hudl", &template("Alpha"));
        let registry = TemplateRegistry::new();
        registry.load_tree(dir.path());

        let names: Vec<_> = registry.records().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn two_components_in_one_file_both_register() {
        let dir = tempfile::tempdir().unwrap();
        let content = "// name: Layout\nel {\n    main { #content }\n}\n\n// name: Home\nel {\n    Layout {\n        p \"hi\"\n    }\n}\n";
        write_hudl(dir.path(), "site.hudl", content);
        let registry = TemplateRegistry::new();
        registry.load_tree(dir.path());
        assert!(registry.entry("Layout").is_some());
        assert!(registry.entry("Home").is_some());
    }
}
