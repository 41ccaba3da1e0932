use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

use crate::client::ClientError;
use crate::models::{Document, DocumentPatch, ErrorResponse, NewDocument};

/// HTTP client for the relay's document endpoints
#[derive(Debug, Clone)]
pub struct DocsApiClient {
    client: Client,
    base_url: String,
}

impl DocsApiClient {
    /// `base_url` is the server root, e.g. `http://localhost:3000`
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/documents{}", self.base_url, path)
    }

    pub async fn list(&self) -> Result<Vec<Document>, ClientError> {
        let response = self.client.get(self.url("")).send().await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn find_by_filename(&self, filename: &str) -> Result<Vec<Document>, ClientError> {
        let response = self
            .client
            .get(self.url(""))
            .query(&[("filename", filename)])
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Document>, ClientError> {
        let response = self.client.get(self.url(&format!("/{}", id))).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(response).await?.json().await?))
    }

    pub async fn create(&self, new_document: &NewDocument) -> Result<Document, ClientError> {
        let response = self.client.post(self.url("")).json(new_document).send().await?;
        Ok(check(response).await?.json().await?)
    }

    pub async fn update(&self, id: i64, patch: &DocumentPatch) -> Result<Option<Document>, ClientError> {
        let response = self
            .client
            .put(self.url(&format!("/{}", id)))
            .json(patch)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(response).await?.json().await?))
    }

    pub async fn delete(&self, id: i64) -> Result<bool, ClientError> {
        let response = self.client.delete(self.url(&format!("/{}", id))).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(response).await?;
        Ok(true)
    }
}

/// Turn a non-2xx reply into `ClientError::Api`, using the server's error
/// body when it has one
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}
