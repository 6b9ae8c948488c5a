//! Seed loading
//!
//! A seed file is a JSON object mapping collection paths to documents:
//!
//! ```json
//! {
//!   "users": { "u1": { "name": "Ann" } },
//!   "users/u1/cvs": { "cv1": { "title": "Main" } }
//! }
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::debug;

use docstash_core::{CollectionReference, Store};

/// Load a seed file into the store, returning the number of documents written
pub async fn load_seed(store: &Store, path: &Path) -> Result<usize> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed file: {:?}", path))?;
    let seed: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse seed file: {:?}", path))?;
    seed_store(store, seed).await
}

/// Write every document of a parsed seed into the store
pub async fn seed_store(store: &Store, seed: Value) -> Result<usize> {
    let Value::Object(collections) = seed else {
        bail!("Seed must be a JSON object keyed by collection path");
    };

    let mut written = 0;
    for (path, docs) in collections {
        let collection = collection_at(store, &path)?;
        let Value::Object(docs) = docs else {
            bail!("Seed collection '{}' must map document ids to objects", path);
        };

        for (id, data) in docs {
            collection
                .doc(id.as_str())
                .set(&data)
                .await
                .with_context(|| format!("Failed to seed document {}/{}", path, id))?;
            written += 1;
        }
        debug!("Seeded collection {}", path);
    }

    Ok(written)
}

/// Resolve a slash-separated collection path through the reference API
///
/// `users/u1/cvs` becomes `collection("users").doc("u1").collection("cvs")`.
pub fn collection_at(store: &Store, path: &str) -> Result<CollectionReference> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() % 2 == 0 || segments.iter().any(|s| s.is_empty()) {
        bail!(
            "Invalid collection path '{}': expected collection[/doc/collection]...",
            path
        );
    }

    let mut collection = store.collection(segments[0]);
    for pair in segments[1..].chunks(2) {
        collection = collection.doc(pair[0]).collection(pair[1]);
    }
    Ok(collection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_collection_at() {
        let store = Store::new();

        assert_eq!(collection_at(&store, "users").unwrap().path(), "users");
        assert_eq!(
            collection_at(&store, "users/u1/cvs").unwrap().path(),
            "users/u1/cvs"
        );
        assert!(collection_at(&store, "users/u1").is_err());
        assert!(collection_at(&store, "users//cvs").is_err());
        assert!(collection_at(&store, "").is_err());
    }

    #[tokio::test]
    async fn test_seed_store() {
        let store = Store::new();
        let seed = json!({
            "users": {"u1": {"name": "Ann"}, "u2": {"name": "Bob"}},
            "users/u1/cvs": {"cv1": {"title": "Main"}}
        });

        let written = seed_store(&store, seed).await.unwrap();
        assert_eq!(written, 3);

        let cv = store
            .collection("users")
            .doc("u1")
            .collection("cvs")
            .doc("cv1")
            .get()
            .await;
        assert_eq!(cv.get("title"), Some(&json!("Main")));
        assert_eq!(store.collection("users").get().await.size(), 2);
    }

    #[tokio::test]
    async fn test_seed_rejects_bad_shapes() {
        let store = Store::new();

        assert!(seed_store(&store, json!([1, 2])).await.is_err());
        assert!(seed_store(&store, json!({"users": [1]})).await.is_err());
        assert!(seed_store(&store, json!({"users": {"u1": "x"}})).await.is_err());
    }

    #[tokio::test]
    async fn test_load_seed_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("seed.json");
        std::fs::write(&path, r#"{"templates": {"t1": {"name": "Classic"}}}"#).unwrap();

        let store = Store::new();
        assert_eq!(load_seed(&store, &path).await.unwrap(), 1);
        assert!(store.collection("templates").doc("t1").get().await.exists());

        let missing = temp_dir.path().join("missing.json");
        assert!(load_seed(&store, &missing).await.is_err());
    }
}
