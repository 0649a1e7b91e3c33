/// Concrete data providers for the screening pipeline.
pub mod stock;

pub(crate) mod fs;

/// Shortcut for required API elements.
pub(crate) mod http {
    pub(crate) use dotenv::var;
    pub(crate) use reqwest::Client as HttpClient;
    pub(crate) use sift_screen::error::ProviderError;
    pub(crate) use sift_screen::provider::ProviderResult;
}

use http::*;

/// Browser-like client; Yahoo Finance rejects the default reqwest user agent and requires the
/// session cookie to be replayed.
pub fn std_client_build() -> ProviderResult<HttpClient> {
    reqwest::ClientBuilder::new()
        .user_agent(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        )
        .cookie_store(true)
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(|err| ProviderError::Unavailable(format!("failed to build http client, {err}")))
}

/// Client identified by the `USER_AGENT` environment variable, as SEC EDGAR requires.
pub fn sec_client_build() -> ProviderResult<HttpClient> {
    let user_agent = var("USER_AGENT").map_err(|_| {
        ProviderError::Unavailable("environment variable USER_AGENT is not set".to_string())
    })?;
    reqwest::ClientBuilder::new()
        .user_agent(user_agent)
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(|err| ProviderError::Unavailable(format!("failed to build http client, {err}")))
}

/// GET `url` and deserialize its JSON body, mapping failures to [`ProviderError`].
pub(crate) async fn get_json<T: serde::de::DeserializeOwned>(
    client: &HttpClient,
    url: &str,
) -> ProviderResult<T> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| ProviderError::Request(err.to_string()))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ProviderError::NotFound(url.to_string()));
    }
    if !status.is_success() {
        return Err(ProviderError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    response
        .json()
        .await
        .map_err(|err| ProviderError::Parse(err.to_string()))
}

/// Time since `time`, formatted for logs.
pub(crate) fn time_elapsed(time: std::time::Instant) -> String {
    format!("Time elapsed: {:.2?}", time.elapsed())
}
