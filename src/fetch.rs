//! Stateful page fetcher.
//!
//! One fetcher is created per login attempt and lives for the whole session:
//! the portal threads authentication through cookies, so every step of the
//! exchange must go through the same client. No retries happen here; a
//! transport failure surfaces immediately as `Connection`.

use reqwest::{Client, Url};

use crate::error::ConnectorError;
use crate::portal;

/// A fetched page: the final URL after redirects plus the raw body.
///
/// The final URL matters because the portal signals session expiry by
/// silently redirecting authorized pages to its login page instead of
/// returning an HTTP error.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub body: String,
}

/// HTTP client with a persistent cookie jar and the spoofed browser identity.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new() -> Result<Self, ConnectorError> {
        let client = Client::builder()
            .user_agent(portal::USER_AGENT)
            .cookie_store(true)
            .build()
            .map_err(|err| ConnectorError::connection(format!("failed to build client: {err}")))?;
        Ok(Self { client })
    }

    /// GET a page, advancing the cookie jar.
    pub async fn get(&self, url: &Url) -> Result<Page, ConnectorError> {
        let response = self.client.get(url.clone()).send().await?;
        Self::into_page(response).await
    }

    /// Submit a form-encoded POST, advancing the cookie jar.
    pub async fn post_form(
        &self,
        url: &Url,
        fields: &[(String, String)],
    ) -> Result<Page, ConnectorError> {
        let response = self.client.post(url.clone()).form(fields).send().await?;
        Self::into_page(response).await
    }

    async fn into_page(response: reqwest::Response) -> Result<Page, ConnectorError> {
        let response = response.error_for_status()?;
        let url = response.url().clone();
        let body = response.text().await?;
        Ok(Page { url, body })
    }
}
