//! Preview data persistence.
//!
//! Mock inputs live beside the source document as
//! `<component>[_<label>].preview.txtpb`, in the IDL's text format. A
//! missing default file is created from the schema skeleton on first
//! access.

use crate::registry::RegistryEntry;
use hudl_schema::textpb;
use std::io;
use std::path::PathBuf;

const EXTENSION: &str = ".preview.txtpb";

/// Path of the preview file for a component, next to its source document.
pub fn preview_path(entry: &RegistryEntry, label: Option<&str>) -> PathBuf {
    let dir = entry.file.parent().unwrap_or_else(|| std::path::Path::new("."));
    let name = &entry.compiled.component.name;
    let file = match label {
        Some(label) => format!("{name}_{label}{EXTENSION}"),
        None => format!("{name}{EXTENSION}"),
    };
    dir.join(file)
}

/// Labels of every preview file present for a component. The unlabeled
/// default reports as `"default"`.
pub fn list_labels(entry: &RegistryEntry) -> Vec<String> {
    let dir = match entry.file.parent() {
        Some(dir) => dir,
        None => return Vec::new(),
    };
    let name = &entry.compiled.component.name;
    let mut labels = Vec::new();

    let Ok(entries) = std::fs::read_dir(dir) else {
        return labels;
    };
    for file in entries.flatten() {
        let file_name = file.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        let Some(stem) = file_name.strip_suffix(EXTENSION) else {
            continue;
        };
        if stem == name {
            labels.push("default".to_string());
        } else if let Some(label) = stem.strip_prefix(&format!("{name}_")) {
            labels.push(label.to_string());
        }
    }
    labels.sort();
    labels
}

/// Read a component's preview data, creating the default skeleton when the
/// default file is missing and the component declares a data type.
pub fn load_or_create(entry: &RegistryEntry, label: Option<&str>) -> io::Result<String> {
    let path = preview_path(entry, label);
    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound && label.is_none() => {
            let skeleton = match &entry.compiled.component.data_type {
                Some(data_type) => textpb::skeleton(data_type, &entry.compiled.schema)
                    .unwrap_or_default(),
                None => String::new(),
            };
            std::fs::write(&path, &skeleton)?;
            Ok(skeleton)
        }
        Err(e) => Err(e),
    }
}

/// Persist preview data for a component.
pub fn save(entry: &RegistryEntry, label: Option<&str>, content: &str) -> io::Result<()> {
    std::fs::write(preview_path(entry, label), content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TemplateRegistry;
    use std::fs;
    use std::sync::Arc;

    fn entry_in(dir: &std::path::Path) -> Arc<RegistryEntry> {
        let source = r#"/**
message CardData {
    string title = 1;
    int32 count = 2;
}
*/
// name: Card
// data: CardData
el {
    h1 `title`
}
"#;
        fs::write(dir.join("card.hudl"), source).unwrap();
        let registry = TemplateRegistry::new();
        registry.load_tree(dir);
        registry.entry("Card").unwrap()
    }

    #[test]
    fn default_path_sits_beside_source() {
        let dir = tempfile::tempdir().unwrap();
        let entry = entry_in(dir.path());
        assert_eq!(
            preview_path(&entry, None),
            dir.path().join("Card.preview.txtpb")
        );
        assert_eq!(
            preview_path(&entry, Some("empty")),
            dir.path().join("Card_empty.preview.txtpb")
        );
    }

    #[test]
    fn missing_default_is_created_from_skeleton() {
        let dir = tempfile::tempdir().unwrap();
        let entry = entry_in(dir.path());

        let content = load_or_create(&entry, None).unwrap();
        assert!(content.contains("title: \"\""), "{content}");
        assert!(content.contains("count: 0"), "{content}");
        assert!(dir.path().join("Card.preview.txtpb").exists());
    }

    #[test]
    fn missing_labeled_preview_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let entry = entry_in(dir.path());
        assert!(load_or_create(&entry, Some("nope")).is_err());
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let entry = entry_in(dir.path());

        save(&entry, Some("full"), "title: \"Hello\"\ncount: 3\n").unwrap();
        let content = load_or_create(&entry, Some("full")).unwrap();
        assert!(content.contains("Hello"));
    }

    #[test]
    fn labels_listed_sorted_with_default() {
        let dir = tempfile::tempdir().unwrap();
        let entry = entry_in(dir.path());

        load_or_create(&entry, None).unwrap();
        save(&entry, Some("b"), "").unwrap();
        save(&entry, Some("a"), "").unwrap();

        assert_eq!(list_labels(&entry), vec!["a", "b", "default"]);
    }
}
