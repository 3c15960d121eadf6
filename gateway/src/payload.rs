use crate::Error;
use bytes::Bytes;
use serde::de::DeserializeOwned;

/// The raw content attached to a transaction.
///
/// The body is retained as fetched; the text and JSON views are only produced when asked for.
#[derive(Clone, Debug)]
pub struct Payload {
    status: u16,
    body: Bytes,
}

impl Payload {
    pub(crate) fn new(status: u16, body: Bytes) -> Self {
        Self { status, body }
    }

    /// Returns true if the gateway served the content successfully.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The status code the gateway responded with.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// The content as bytes.
    pub fn bytes(&self) -> Bytes {
        self.body.clone()
    }

    /// The content as UTF-8 text.
    pub fn text(&self) -> Result<&str, Error> {
        std::str::from_utf8(&self.body).map_err(|err| Error::Decode(err.to_string()))
    }

    /// The content parsed as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body).map_err(|err| Error::Decode(err.to_string()))
    }
}
