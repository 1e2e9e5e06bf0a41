//! Request target construction
//!
//! Builds `GET` URLs against the service endpoint. Parameters are
//! form-urlencoded, so newlines and FASTA markup in query text survive intact.

use std::fmt;
use url::Url;

/// Name of the credential parameter
pub const PARAM_API_KEY: &str = "api_key";

/// Builds fully qualified request URLs, optionally carrying an API key
#[derive(Clone)]
pub struct RequestBuilder {
    endpoint: Url,
    api_key: Option<String>,
}

impl RequestBuilder {
    /// Create a builder for `endpoint` with an optional API key
    pub fn new(endpoint: Url, api_key: Option<String>) -> Self {
        Self { endpoint, api_key }
    }

    /// The endpoint every URL is built against
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Whether an API key will be injected
    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    /// Build the request URL for `params`, with the API key first if one is set
    ///
    /// Parameters keep the order given. Any query already present on the endpoint
    /// is replaced.
    pub fn build(&self, params: &[(&str, &str)]) -> Url {
        self.build_with(params, self.api_key.as_deref())
    }

    /// Build the same URL as [`build`](Self::build) but without the API key
    ///
    /// Use this for anything that ends up in logs or error messages.
    pub fn display_url(&self, params: &[(&str, &str)]) -> Url {
        self.build_with(params, None)
    }

    fn build_with(&self, params: &[(&str, &str)], api_key: Option<&str>) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.clear();
            if let Some(key) = api_key {
                query.append_pair(PARAM_API_KEY, key);
            }
            query.extend_pairs(params);
        }
        url
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
