use url::Url;

use crate::PasskeyConfig;

/// The client behind the HTTP collaborators: one `reqwest` client, the API
/// base URL and an optional bearer key.
#[derive(Clone, Debug)]
pub(crate) struct ApiClient {
    config: PasskeyConfig,
    client: reqwest::Client,
}

impl ApiClient {
    pub(crate) fn new(config: &PasskeyConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.config.endpoint(path)
    }

    pub(crate) fn get(&self, url: Url) -> reqwest::RequestBuilder {
        self.prepare_request(self.client.get(url))
    }

    pub(crate) fn post(&self, url: Url) -> reqwest::RequestBuilder {
        self.prepare_request(self.client.post(url))
    }

    /// Add authentication and the JSON accept header to a request
    fn prepare_request(&self, request_builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let mut builder = request_builder.header(reqwest::header::ACCEPT, "application/json");

        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        builder
    }
}
