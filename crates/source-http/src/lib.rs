//! An implementation of the transaction source which queries the wallet demo
//! backend over HTTP.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
pub use error::Error;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use txsync_source::{TransactionPage, TransactionQuery, TransactionSource};
use url::Url;

/// Transport timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Options for [`HttpTransactionSource`].
#[derive(Clone)]
pub struct HttpTransactionSourceOptions {
    /// Bearer token sent with every request.
    pub access_token: String,

    /// Backend origin, e.g. `https://demo.example.com/`. A trailing slash is
    /// ignored; any other path is kept as a prefix.
    pub base_url: Url,

    /// Device whose transactions are listed.
    pub device_id: String,

    /// Per-request transport timeout.
    pub timeout: Duration,
}

/// A transaction source backed by the demo backend's REST API.
#[derive(Clone)]
pub struct HttpTransactionSource {
    access_token: String,
    client: Client,
    endpoint: Url,
}

impl fmt::Debug for HttpTransactionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransactionSource")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpTransactionSource {
    /// Creates a new `HttpTransactionSource`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry a path, or if the
    /// underlying HTTP client cannot be built.
    pub fn new(
        HttpTransactionSourceOptions {
            access_token,
            base_url,
            device_id,
            timeout,
        }: HttpTransactionSourceOptions,
    ) -> Result<Self, Error> {
        let mut endpoint = base_url.clone();
        endpoint
            .path_segments_mut()
            .map_err(|()| Error::InvalidBaseUrl(base_url))?
            .pop_if_empty()
            .extend(["api", "devices", device_id.as_str(), "transactions"]);

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Client)?;

        Ok(Self {
            access_token,
            client,
            endpoint,
        })
    }
}

#[async_trait]
impl TransactionSource for HttpTransactionSource {
    type Error = Error;

    async fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> Result<TransactionPage, Self::Error> {
        let mut params = vec![
            (query.direction.query_flag(), "true".to_string()),
            ("after", query.after.to_string()),
        ];
        if let Some(cursor) = &query.page_cursor {
            params.push(("pageCursor", cursor.clone()));
        }

        debug!(
            direction = %query.direction,
            after = query.after,
            cursor = ?query.page_cursor,
            "requesting transaction page"
        );

        let response = self
            .client
            .get(self.endpoint.clone())
            .bearer_auth(&self.access_token)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                path: self.endpoint.path().to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.json::<TransactionPage>().await?)
    }
}
