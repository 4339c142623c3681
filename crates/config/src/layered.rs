use std::sync::{Arc, PoisonError};

use {
    serde::{Serialize, de::DeserializeOwned},
    serde_json::{Map, Value},
    tracing::debug,
};

use crate::{ConfigSource, Document, Error, Result};

/// Resolves an ordered list of document paths into a layered [`Config`].
pub trait ConfigResolver: Send + Sync {
    /// `paths` are ordered most specific first; later paths are fallbacks.
    fn resolve(&self, paths: &[String]) -> Config;
}

/// Default resolver: one layer per path, documents taken from a source.
#[derive(Clone)]
pub struct LayeredResolver {
    source: Arc<dyn ConfigSource>,
}

impl LayeredResolver {
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &Arc<dyn ConfigSource> {
        &self.source
    }
}

impl ConfigResolver for LayeredResolver {
    fn resolve(&self, paths: &[String]) -> Config {
        debug!(?paths, "resolving layered config");
        let layers = paths.iter().map(|p| self.source.document(p)).collect();
        Config {
            paths: paths.to_vec(),
            layers,
            source: Arc::clone(&self.source),
        }
    }
}

// ── Config ──────────────────────────────────────────────────────────────────

/// Layered configuration handle.
///
/// Keys may address nested groups with `/` (`"general/resource"`).
#[derive(Clone)]
pub struct Config {
    paths: Vec<String>,
    layers: Vec<Document>,
    source: Arc<dyn ConfigSource>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Document paths backing this handle, most specific first.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn group(&self, name: &str) -> ConfigGroup {
        ConfigGroup {
            config: self.clone(),
            prefix: split_key(name),
        }
    }

    /// Raw value for `key` from the first layer that has it.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.read_at(&[], key)
    }

    /// Typed value for `key`, or `default` when absent or of another type.
    pub fn value<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        typed(key, self.get(key), default)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Write `value` into the most specific layer.
    pub fn set_value<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        self.write_at(&[], key, serde_json::to_value(value)?)
    }

    /// Remove `key` from the most specific layer. Fallback layers are left
    /// untouched, so a lower layer's value becomes visible again.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.remove_at(&[], key)
    }

    /// Names of child groups visible through any layer, sorted.
    pub fn groups(&self) -> Vec<String> {
        self.groups_at(&[])
    }

    /// Persist the most specific layer.
    pub fn sync(&self) -> Result<()> {
        match (self.paths.first(), self.layers.first()) {
            (Some(path), Some(doc)) => self.source.sync(path, doc),
            _ => Ok(()),
        }
    }

    fn read_at(&self, prefix: &[String], key: &str) -> Option<Value> {
        let segments = full_path(prefix, key)?;
        self.layers.iter().find_map(|layer| {
            let contents = layer.read().unwrap_or_else(PoisonError::into_inner);
            lookup(&contents, &segments).cloned()
        })
    }

    fn write_at(&self, prefix: &[String], key: &str, value: Value) -> Result<()> {
        let segments = full_path(prefix, key).ok_or_else(|| Error::invalid_key(key))?;
        let Some(layer) = self.layers.first() else {
            return Err(Error::invalid_key(key));
        };
        let mut contents = layer.write().unwrap_or_else(PoisonError::into_inner);
        insert(&mut contents, &segments, value)
    }

    fn remove_at(&self, prefix: &[String], key: &str) -> Option<Value> {
        let segments = full_path(prefix, key)?;
        let layer = self.layers.first()?;
        let mut contents = layer.write().unwrap_or_else(PoisonError::into_inner);
        remove(&mut contents, &segments)
    }

    fn groups_at(&self, prefix: &[String]) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for layer in &self.layers {
            let contents = layer.read().unwrap_or_else(PoisonError::into_inner);
            let node = if prefix.is_empty() {
                Some(&*contents)
            } else {
                lookup(&contents, prefix).and_then(Value::as_object)
            };
            for (name, value) in node.into_iter().flatten() {
                if value.is_object() {
                    names.push(name.clone());
                }
            }
        }
        names.sort();
        names.dedup();
        names
    }
}

// ── ConfigGroup ─────────────────────────────────────────────────────────────

/// A [`Config`] scoped to a (possibly nested) group.
#[derive(Clone, Debug)]
pub struct ConfigGroup {
    config: Config,
    prefix: Vec<String>,
}

impl ConfigGroup {
    /// Full group path, segments joined with `/`.
    pub fn name(&self) -> String {
        self.prefix.join("/")
    }

    pub fn group(&self, name: &str) -> ConfigGroup {
        let mut prefix = self.prefix.clone();
        prefix.extend(split_key(name));
        ConfigGroup {
            config: self.config.clone(),
            prefix,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.config.read_at(&self.prefix, key)
    }

    pub fn value<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        typed(key, self.get(key), default)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn set_value<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        self.config
            .write_at(&self.prefix, key, serde_json::to_value(value)?)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.config.remove_at(&self.prefix, key)
    }

    pub fn groups(&self) -> Vec<String> {
        self.config.groups_at(&self.prefix)
    }

    pub fn sync(&self) -> Result<()> {
        self.config.sync()
    }
}

// ── Key helpers ─────────────────────────────────────────────────────────────

fn split_key(key: &str) -> Vec<String> {
    key.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Prefix plus key segments; `None` if the key has no usable segment or an
/// empty one in the middle.
fn full_path(prefix: &[String], key: &str) -> Option<Vec<String>> {
    let trimmed = key.trim_matches('/');
    if trimmed.is_empty() || trimmed.split('/').any(str::is_empty) {
        return None;
    }
    let mut segments = prefix.to_vec();
    segments.extend(trimmed.split('/').map(str::to_string));
    Some(segments)
}

fn lookup<'a>(contents: &'a Map<String, Value>, segments: &[String]) -> Option<&'a Value> {
    let (last, parents) = segments.split_last()?;
    let mut node = contents;
    for segment in parents {
        node = node.get(segment)?.as_object()?;
    }
    node.get(last)
}

fn insert(contents: &mut Map<String, Value>, segments: &[String], value: Value) -> Result<()> {
    let Some((last, parents)) = segments.split_last() else {
        return Err(Error::invalid_key(""));
    };
    let mut node = contents;
    for (depth, segment) in parents.iter().enumerate() {
        let entry = node
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        node = match entry {
            Value::Object(map) => map,
            _ => {
                return Err(Error::NotAGroup {
                    key: segments[..=depth].join("/"),
                });
            },
        };
    }
    node.insert(last.clone(), value);
    Ok(())
}

fn remove(contents: &mut Map<String, Value>, segments: &[String]) -> Option<Value> {
    let (last, parents) = segments.split_last()?;
    let mut node = contents;
    for segment in parents {
        node = node.get_mut(segment)?.as_object_mut()?;
    }
    node.remove(last)
}

fn typed<T: DeserializeOwned>(key: &str, value: Option<Value>, default: T) -> T {
    match value {
        Some(v) => match serde_json::from_value(v) {
            Ok(t) => t,
            Err(e) => {
                debug!(key, error = %e, "config value has unexpected type, using default");
                default
            },
        },
        None => default,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::MemorySource, rstest::rstest, serde_json::json};

    fn seeded() -> (Arc<MemorySource>, LayeredResolver) {
        let mut account = Map::new();
        account.insert("priority".into(), json!(5));
        account.insert("general".into(), json!({ "resource": "laptop" }));
        let mut protocol = Map::new();
        protocol.insert("priority".into(), json!(30));
        protocol.insert("port".into(), json!(5222));
        protocol.insert("general".into(), json!({ "resource": "parley", "tls": true }));
        let source = Arc::new(
            MemorySource::new()
                .with_document("jabber.alice@example.com/account", account)
                .with_document("jabber", protocol),
        );
        let resolver = LayeredResolver::new(Arc::clone(&source) as Arc<dyn ConfigSource>);
        (source, resolver)
    }

    fn paths() -> Vec<String> {
        vec!["jabber.alice@example.com/account".into(), "jabber".into()]
    }

    #[test]
    fn resolve_keeps_path_order() {
        let (source, resolver) = seeded();
        let config = resolver.resolve(&paths());
        assert_eq!(config.paths(), paths().as_slice());
        assert_eq!(source.requested_paths(), paths());
    }

    #[rstest]
    #[case("priority", json!(5))]
    #[case("port", json!(5222))]
    #[case("general/resource", json!("laptop"))]
    #[case("general/tls", json!(true))]
    fn most_specific_layer_wins(#[case] key: &str, #[case] expected: Value) {
        let (_, resolver) = seeded();
        let config = resolver.resolve(&paths());
        assert_eq!(config.get(key), Some(expected));
    }

    #[test]
    fn group_reads_fall_through_layers() {
        let (_, resolver) = seeded();
        let general = resolver.resolve(&paths()).group("general");
        assert_eq!(general.name(), "general");
        assert_eq!(general.value("resource", String::new()), "laptop");
        assert!(general.value("tls", false));
        assert_eq!(general.value("missing", 7_u16), 7);
    }

    #[test]
    fn typed_value_mismatch_returns_default() {
        let (_, resolver) = seeded();
        let config = resolver.resolve(&paths());
        assert_eq!(config.value("general", 1_i32), 1);
    }

    #[test]
    fn writes_land_in_first_layer_only() {
        let (source, resolver) = seeded();
        let config = resolver.resolve(&paths());
        config.group("general").set_value("resource", "phone").unwrap();
        config.set_value("port", 5223).unwrap();

        let account = source.snapshot("jabber.alice@example.com/account").unwrap();
        assert_eq!(account["general"]["resource"], json!("phone"));
        assert_eq!(account["port"], json!(5223));
        let protocol = source.snapshot("jabber").unwrap();
        assert_eq!(protocol["port"], json!(5222));
        assert_eq!(protocol["general"]["resource"], json!("parley"));
    }

    #[test]
    fn remove_uncovers_fallback() {
        let (_, resolver) = seeded();
        let config = resolver.resolve(&paths());
        assert_eq!(config.remove("priority"), Some(json!(5)));
        assert_eq!(config.value("priority", 0), 30);
    }

    #[test]
    fn nested_groups() {
        let (_, resolver) = seeded();
        let config = resolver.resolve(&paths());
        let proxy = config.group("connection").group("proxy");
        assert_eq!(proxy.name(), "connection/proxy");
        proxy.set_value("host", "proxy.local").unwrap();
        assert_eq!(
            config.get("connection/proxy/host"),
            Some(json!("proxy.local"))
        );
        assert_eq!(config.groups(), vec!["connection", "general"]);
        assert_eq!(config.group("connection").groups(), vec!["proxy"]);
    }

    #[rstest]
    #[case("")]
    #[case("/")]
    #[case("a//b")]
    fn invalid_keys_are_rejected(#[case] key: &str) {
        let (_, resolver) = seeded();
        let config = resolver.resolve(&paths());
        assert!(matches!(
            config.set_value(key, 1),
            Err(Error::InvalidKey { .. })
        ));
        assert_eq!(config.get(key), None);
    }

    #[test]
    fn writing_below_plain_value_fails() {
        let (_, resolver) = seeded();
        let config = resolver.resolve(&paths());
        let err = config.set_value("priority/inner", 1).unwrap_err();
        assert!(matches!(err, Error::NotAGroup { ref key } if key == "priority"));
    }

    #[test]
    fn empty_path_list_has_no_layers() {
        let (_, resolver) = seeded();
        let config = resolver.resolve(&[]);
        assert_eq!(config.get("priority"), None);
        assert!(config.set_value("priority", 1).is_err());
        assert!(config.sync().is_ok());
    }
}
