use std::{
    collections::HashMap,
    path::{Component, Path, PathBuf},
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use {
    serde_json::{Map, Value},
    tracing::{debug, warn},
};

use crate::{Error, Result};

/// Shared, mutable contents of one configuration document.
///
/// Every handle resolved for the same path sees the same document, so a
/// write through one account's config is visible through another handle
/// that layers the same path.
pub type Document = Arc<RwLock<Map<String, Value>>>;

/// Backing store for path-addressed configuration documents.
pub trait ConfigSource: Send + Sync {
    /// Return the document for `path`, loading it on first use.
    ///
    /// A missing or unreadable document yields an empty one.
    fn document(&self, path: &str) -> Document;

    /// Persist the current contents of `document` under `path`.
    fn sync(&self, path: &str, document: &Document) -> Result<()>;
}

// ── In-memory source ────────────────────────────────────────────────────────

/// In-process documents. `sync` is a no-op.
#[derive(Default)]
pub struct MemorySource {
    documents: Mutex<HashMap<String, Document>>,
    requested: Mutex<Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `path` with initial contents, replacing any existing document.
    pub fn with_document(self, path: impl Into<String>, contents: Map<String, Value>) -> Self {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), Arc::new(RwLock::new(contents)));
        self
    }

    /// Every path passed to [`ConfigSource::document`], in request order.
    pub fn requested_paths(&self) -> Vec<String> {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of a document's contents, if it was ever created.
    pub fn snapshot(&self, path: &str) -> Option<Map<String, Value>> {
        let documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        documents
            .get(path)
            .map(|doc| doc.read().unwrap_or_else(PoisonError::into_inner).clone())
    }
}

impl ConfigSource for MemorySource {
    fn document(&self, path: &str) -> Document {
        self.requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
        let mut documents = self.documents.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(documents.entry(path.to_string()).or_default())
    }

    fn sync(&self, _path: &str, _document: &Document) -> Result<()> {
        Ok(())
    }
}

// ── TOML file source ────────────────────────────────────────────────────────

/// TOML documents stored as `<root>/<path>.toml`.
///
/// `jabber.alice@example.com/account` maps to
/// `<root>/jabber.alice@example.com/account.toml`.
pub struct FileSource {
    root: PathBuf,
    cache: Mutex<HashMap<String, Document>>,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// File source rooted at the user-global config directory
    /// (`~/.config/parley/` on Linux).
    pub fn user_default() -> Option<Self> {
        config_dir().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// On-disk location of the document for `path`, or `None` when `path`
    /// would leave the root (absolute, `..`, `.`, empty segments).
    pub fn file_path(&self, path: &str) -> Option<PathBuf> {
        let contained = !path.is_empty()
            && !path.contains('\\')
            && path.split('/').all(|segment| !segment.is_empty())
            && Path::new(path)
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        contained.then(|| self.root.join(format!("{path}.toml")))
    }

    fn load(&self, path: &str) -> Map<String, Value> {
        let Some(file) = self.file_path(path) else {
            warn!(%path, "config document path escapes the config root, using empty");
            return Map::new();
        };
        let raw = match std::fs::read_to_string(&file) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %file.display(), "config document not found, starting empty");
                return Map::new();
            },
            Err(e) => {
                warn!(path = %file.display(), error = %e, "failed to read config document");
                return Map::new();
            },
        };
        match parse_document(&raw) {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %file.display(), error = %e, "failed to parse config document, using empty");
                Map::new()
            },
        }
    }
}

impl ConfigSource for FileSource {
    fn document(&self, path: &str) -> Document {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(doc) = cache.get(path) {
            return Arc::clone(doc);
        }
        let doc: Document = Arc::new(RwLock::new(self.load(path)));
        cache.insert(path.to_string(), Arc::clone(&doc));
        doc
    }

    fn sync(&self, path: &str, document: &Document) -> Result<()> {
        let file = self.file_path(path).ok_or_else(|| Error::invalid_path(path))?;
        let toml_str = {
            let contents = document.read().unwrap_or_else(PoisonError::into_inner);
            toml::to_string_pretty(&*contents)?
        };
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::write(&file, toml_str).map_err(|e| Error::io(&file, e))?;
        debug!(path = %file.display(), "synced config document");
        Ok(())
    }
}

/// Returns the user-global config directory (`~/.config/parley/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "parley").map(|d| d.config_dir().to_path_buf())
}

fn parse_document(raw: &str) -> Result<Map<String, Value>> {
    let table: toml::Table = toml::from_str(raw)?;
    match serde_json::to_value(table)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, serde_json::json};

    #[test]
    fn memory_source_shares_documents() {
        let source = MemorySource::new();
        let a = source.document("jabber");
        a.write().unwrap().insert("port".into(), json!(5222));
        let b = source.document("jabber");
        assert_eq!(b.read().unwrap().get("port"), Some(&json!(5222)));
        assert_eq!(source.requested_paths(), vec!["jabber", "jabber"]);
    }

    #[test]
    fn memory_source_seeded_document() {
        let mut seed = Map::new();
        seed.insert("resource".into(), json!("home"));
        let source = MemorySource::new().with_document("jabber", seed);
        let doc = source.document("jabber");
        assert_eq!(doc.read().unwrap().get("resource"), Some(&json!("home")));
    }

    #[test]
    fn file_source_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path());
        let doc = source.document("jabber.alice@example.com/account");
        assert!(doc.read().unwrap().is_empty());
    }

    #[test]
    fn file_source_sync_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = "jabber.alice@example.com/account";
        {
            let source = FileSource::new(dir.path());
            let doc = source.document(path);
            {
                let mut contents = doc.write().unwrap();
                contents.insert("priority".into(), json!(10));
                contents.insert("general".into(), json!({ "resource": "laptop" }));
            }
            source.sync(path, &doc).unwrap();
        }
        assert!(dir.path().join("jabber.alice@example.com/account.toml").exists());

        let source = FileSource::new(dir.path());
        let doc = source.document(path);
        let contents = doc.read().unwrap();
        assert_eq!(contents.get("priority"), Some(&json!(10)));
        assert_eq!(contents["general"]["resource"], json!("laptop"));
    }

    #[rstest]
    #[case("x/../../escaped")]
    #[case("../escaped")]
    #[case("/tmp/escaped")]
    #[case("jabber/./account")]
    #[case("jabber//account")]
    #[case("")]
    fn file_source_rejects_paths_outside_root(#[case] path: &str) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        let source = FileSource::new(&root);
        assert!(source.file_path(path).is_none());

        let doc = source.document(path);
        assert!(doc.read().unwrap().is_empty());
        doc.write().unwrap().insert("k".into(), json!(1));
        assert!(matches!(
            source.sync(path, &doc),
            Err(Error::InvalidPath { .. })
        ));
        assert!(!dir.path().join("escaped.toml").exists());
        assert!(!dir.path().join("escaped").exists());
        assert!(!root.exists());
    }

    #[test]
    fn file_source_malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("jabber.toml"), "not = [valid").unwrap();
        let source = FileSource::new(dir.path());
        assert!(source.document("jabber").read().unwrap().is_empty());
    }
}
