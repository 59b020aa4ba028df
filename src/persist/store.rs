//! HTTP document-collection client
//!
//! Speaks a Firestore-style "add documents to a named collection" REST
//! shape: one POST per batch, the batch committing atomically on the
//! server side.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{DocumentStore, StoreError};

pub struct HttpDocumentStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDocumentStore {
    pub fn new(base_url: String, timeout: std::time::Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/collections/{}/documents:batchAdd",
            self.base_url.trim_end_matches('/'),
            collection
        )
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn add_documents(
        &self,
        collection: &str,
        documents: &[serde_json::Value],
    ) -> Result<(), StoreError> {
        let url = self.collection_url(collection);
        debug!(%url, count = documents.len(), "writing document batch");

        let response = self
            .client
            .post(&url)
            .json(&json!({ "documents": documents }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, body });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_posts_documents_to_collection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/sensor_data/documents:batchAdd"))
            .and(body_partial_json(json!({
                "documents": [{"temperature": 20.0}]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store =
            HttpDocumentStore::new(server.uri(), std::time::Duration::from_secs(5)).unwrap();
        store
            .add_documents("sensor_data", &[json!({"temperature": 20.0})])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_error_status_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let store =
            HttpDocumentStore::new(server.uri(), std::time::Duration::from_secs(5)).unwrap();
        let err = store
            .add_documents("sensor_data", &[json!({})])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Api { status, .. } if status.as_u16() == 503));
    }
}
