use crate::controller::normalize::isbn_candidate;
use crate::core::config::{ConfigError, FolioConfig};
use crate::core::types::{Book, SortOption};
use crate::core::LookupError;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{fetch_json_body, SearchService};

/// [`SearchService`] backed by the Google Books `volumes` endpoint.
pub struct GoogleBooksService {
    client: reqwest::Client,
    base_url: url::Url,
    api_key: Option<String>,
    language: String,
    max_results: usize,
    // key: query|sort|translations
    cache: moka::future::Cache<String, Vec<Book>>,
}

impl std::fmt::Debug for GoogleBooksService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleBooksService")
            .field("base_url", &self.base_url.as_str())
            .field("api_key_set", &self.api_key.is_some())
            .field("language", &self.language)
            .field("max_results", &self.max_results)
            .finish()
    }
}

impl GoogleBooksService {
    pub fn from_config(client: reqwest::Client, config: &FolioConfig) -> Result<Self, ConfigError> {
        let mut raw = config.resolve_api_base_url();
        // `Url::join` drops the last path segment unless the base ends with '/'.
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base_url = url::Url::parse(&raw).map_err(|_| ConfigError::InvalidBaseUrl(raw.clone()))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.resolve_api_key(),
            language: config.resolve_language(),
            max_results: config.resolve_max_results(),
            cache: moka::future::Cache::builder()
                .max_capacity(1_000)
                .time_to_live(config.resolve_cache_ttl())
                .build(),
        })
    }

    pub(crate) fn volumes_url(
        &self,
        query: &str,
        sort_by: SortOption,
        include_translations: bool,
    ) -> Result<url::Url, LookupError> {
        let mut url = self
            .base_url
            .join("volumes")
            .map_err(|e| LookupError::Other(e.to_string()))?;

        let q = isbn_candidate(query)
            .map(|digits| format!("isbn:{}", digits))
            .unwrap_or_else(|| query.to_string());

        // The API has no popularity ordering; fetch by relevance and reorder locally.
        let order_by = match sort_by {
            SortOption::Newest => "newest",
            SortOption::Relevance | SortOption::Popularity => "relevance",
        };

        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("q", &q);
            qp.append_pair("orderBy", order_by);
            qp.append_pair("maxResults", &self.max_results.to_string());
            qp.append_pair("printType", "books");
            if !include_translations {
                qp.append_pair("langRestrict", &self.language);
            }
            if let Some(key) = &self.api_key {
                qp.append_pair("key", key);
            }
        }

        Ok(url)
    }
}

fn cache_key(query: &str, sort_by: SortOption, include_translations: bool) -> String {
    format!(
        "q={}|sort={}|tr={}",
        query.to_lowercase(),
        sort_by,
        if include_translations { 1 } else { 0 }
    )
}

#[async_trait]
impl SearchService for GoogleBooksService {
    async fn search(
        &self,
        query: &str,
        sort_by: SortOption,
        include_translations: bool,
    ) -> Result<Vec<Book>, LookupError> {
        let key = cache_key(query, sort_by, include_translations);
        if let Some(cached) = self.cache.get(&key).await {
            debug!("lookup cache hit for query");
            return Ok(cached);
        }

        let url = self.volumes_url(query, sort_by, include_translations)?;
        info!(query = %query, sort = %sort_by, include_translations, "querying google books");

        let body = fetch_json_body(&self.client, url).await?;
        let mut books = parse_volumes(&body)?;
        if sort_by == SortOption::Popularity {
            sort_by_popularity(&mut books);
        }

        debug!("google books returned {} volumes", books.len());
        self.cache.insert(key, books.clone()).await;
        Ok(books)
    }
}

// ---------------------------------------------------------------------------
// Response mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct VolumesResponse {
    // Absent when the query matched nothing.
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    id: String,
    #[serde(default)]
    volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeInfo {
    #[serde(default)]
    title: String,
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<String>,
    publisher: Option<String>,
    published_date: Option<String>,
    description: Option<String>,
    #[serde(default)]
    industry_identifiers: Vec<IndustryIdentifier>,
    page_count: Option<u32>,
    #[serde(default)]
    categories: Vec<String>,
    language: Option<String>,
    image_links: Option<ImageLinks>,
    average_rating: Option<f64>,
    ratings_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct IndustryIdentifier {
    #[serde(rename = "type")]
    kind: String,
    identifier: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageLinks {
    thumbnail: Option<String>,
    small_thumbnail: Option<String>,
}

fn secure_image_url(raw: String) -> String {
    match raw.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => raw,
    }
}

impl From<Volume> for Book {
    fn from(volume: Volume) -> Self {
        let info = volume.volume_info;

        let mut isbn_10 = None;
        let mut isbn_13 = None;
        for ident in info.industry_identifiers {
            match ident.kind.as_str() {
                "ISBN_10" => isbn_10 = Some(ident.identifier),
                "ISBN_13" => isbn_13 = Some(ident.identifier),
                _ => {}
            }
        }

        let thumbnail_url = info
            .image_links
            .and_then(|links| links.thumbnail.or(links.small_thumbnail))
            .map(secure_image_url);

        Book {
            id: volume.id,
            title: info.title,
            subtitle: info.subtitle,
            authors: info.authors,
            publisher: info.publisher,
            published_date: info.published_date,
            description: info.description,
            isbn_10,
            isbn_13,
            page_count: info.page_count,
            categories: info.categories,
            language: info.language,
            thumbnail_url,
            average_rating: info.average_rating,
            ratings_count: info.ratings_count,
        }
    }
}

pub(crate) fn parse_volumes(body: &str) -> Result<Vec<Book>, LookupError> {
    let resp: VolumesResponse =
        serde_json::from_str(body).map_err(|e| LookupError::Decode(e.to_string()))?;
    Ok(resp.items.into_iter().map(Book::from).collect())
}

/// Most-rated first, then best-rated. Stable, so relevance order breaks ties.
pub(crate) fn sort_by_popularity(books: &mut [Book]) {
    books.sort_by(|a, b| {
        b.ratings_count
            .unwrap_or(0)
            .cmp(&a.ratings_count.unwrap_or(0))
            .then_with(|| {
                b.average_rating
                    .unwrap_or(0.0)
                    .partial_cmp(&a.average_rating.unwrap_or(0.0))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });
}
