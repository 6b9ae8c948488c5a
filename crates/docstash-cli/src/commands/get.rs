//! Get command handler

use anyhow::{bail, Result};

use docstash_core::Store;

use crate::output::Output;
use crate::seed::collection_at;

/// Show a single document
pub async fn show(store: &Store, collection: &str, id: &str, output: &Output) -> Result<()> {
    let snapshot = collection_at(store, collection)?.doc(id).get().await;

    if !snapshot.exists() {
        bail!("Document not found: {}/{}", collection, id);
    }

    output.print_document(&snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use serde_json::json;

    #[tokio::test]
    async fn test_show_existing_document() {
        let store = Store::new();
        store
            .collection("users")
            .doc("u1")
            .set(&json!({"name": "Ann"}))
            .await
            .unwrap();

        let output = Output::new(OutputFormat::Quiet);
        show(&store, "users", "u1", &output).await.unwrap();
    }

    #[tokio::test]
    async fn test_show_missing_document_fails() {
        let store = Store::new();
        let output = Output::new(OutputFormat::Quiet);

        let err = show(&store, "users", "ghost", &output).await.unwrap_err();
        assert!(err.to_string().contains("users/ghost"));

        assert!(show(&store, "users/u1", "x", &output).await.is_err());
    }
}
