//! [Transport] backed by [reqwest].

use crate::{Error, Response, Transport};
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

/// Sends gateway requests over HTTP.
#[derive(Clone)]
pub struct Http {
    client: reqwest::Client,
}

impl Http {
    /// Create a new transport that abandons any request not completed within `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| Error::Transport(err.to_string()))?;
        Ok(Self { client })
    }

    async fn complete(request: reqwest::RequestBuilder) -> Result<Response, Error> {
        let response = request
            .send()
            .await
            .map_err(|err| Error::Transport(err.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| Error::Transport(err.to_string()))?;
        Ok(Response { status, body })
    }
}

impl Transport for Http {
    async fn post(&self, url: String, body: Bytes) -> Result<Response, Error> {
        Self::complete(
            self.client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(body),
        )
        .await
    }

    async fn get(&self, url: String) -> Result<Response, Error> {
        Self::complete(self.client.get(url)).await
    }
}
