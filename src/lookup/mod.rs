pub mod google_books;
mod service;

use crate::core::LookupError;

pub use google_books::GoogleBooksService;
pub use service::SearchService;

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        // The request URL carries the API key; it must not reach the error text.
        let err = err.without_url();
        if err.is_timeout() {
            LookupError::TimedOut(err.to_string())
        } else if err.is_connect() {
            LookupError::Connectivity(err.to_string())
        } else if err.is_decode() || err.is_body() {
            LookupError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            LookupError::Status {
                status: status.as_u16(),
            }
        } else {
            LookupError::Other(err.to_string())
        }
    }
}

/// GET a JSON document and return its body, mapping non-2xx to `LookupError::Status`.
pub(crate) async fn fetch_json_body(
    client: &reqwest::Client,
    url: url::Url,
) -> Result<String, LookupError> {
    let resp = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(LookupError::Status {
            status: status.as_u16(),
        });
    }

    Ok(resp.text().await?)
}
