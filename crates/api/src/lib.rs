//! HTTP client for the book recommendation server.

use bookfinder_core::Book;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

mod cover;
mod error;

pub use cover::{Cover, MIN_COVER_EDGE, PLACEHOLDER_HEIGHT, PLACEHOLDER_WIDTH, decode_cover};
pub use error::{ApiError, Result};

/// Response of `GET /api/books`.
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    pub books: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn total(&self) -> u64 {
        self.total.unwrap_or(self.books.len() as u64)
    }
}

/// The catalog lists bare titles; richer servers send full records.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CatalogEntry {
    Title(String),
    Book(Book),
}

/// Response of `GET /api/recommend`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Recommendation {
    pub input_book: Book,
    #[serde(default)]
    pub recommendations: Vec<Book>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BookList {
    #[serde(default)]
    books: Vec<Book>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::BaseUrl(base_url.to_string()));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    /// Builds `<base>/api/<name>?<query>`, keeping any path prefix of the base url.
    pub fn endpoint(&self, name: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::BaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", name]);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    pub async fn catalog(&self) -> Result<Catalog> {
        self.get_json(self.endpoint("books", &[])?).await
    }

    pub async fn popular(&self) -> Result<Vec<Book>> {
        let list: BookList = self.get_json(self.endpoint("popular", &[])?).await?;
        Ok(list.books)
    }

    pub async fn search(&self, query: &str) -> Result<Vec<Book>> {
        let list: BookList = self
            .get_json(self.endpoint("search", &[("q", query)])?)
            .await?;
        Ok(list.books)
    }

    pub async fn recommend(&self, title: &str) -> Result<Recommendation> {
        self.get_json(self.endpoint("recommend", &[("book", title)])?)
            .await
    }

    pub async fn book_details(&self, title: &str) -> Result<Book> {
        self.get_json(self.endpoint("book-details", &[("book", title)])?)
            .await
    }

    /// Downloads and decodes a cover. Never fails: problems yield the placeholder.
    pub async fn cover(&self, image_url: &str) -> Cover {
        let url = match Url::parse(image_url.trim()) {
            Ok(url) => url,
            Err(err) => {
                log::debug!("cover url {image_url:?} rejected: {err}");
                return Cover::placeholder();
            }
        };
        Cover::from_result(self.get_bytes(url).await)
    }

    async fn get_bytes(&self, url: Url) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: None,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        log::debug!("GET {url}");
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|body| body.error);
            log::warn!("GET {url} -> {status}: {message:?}");
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dune() -> serde_json::Value {
        json!({
            "title": "Dune",
            "author": "Frank Herbert",
            "publisher": "Ace",
            "year": 1965,
            "image_url": "http://images.example/dune.jpg"
        })
    }

    #[test]
    fn endpoint_encodes_query() -> anyhow::Result<()> {
        let client = ApiClient::new("http://localhost:5000")?;
        let url = client.endpoint("recommend", &[("book", "Harry Potter & Co")])?;
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/recommend?book=Harry+Potter+%26+Co"
        );
        Ok(())
    }

    #[test]
    fn endpoint_keeps_path_prefix() -> anyhow::Result<()> {
        let client = ApiClient::new("http://books.example/finder/")?;
        let url = client.endpoint("popular", &[])?;
        assert_eq!(url.as_str(), "http://books.example/finder/api/popular");
        Ok(())
    }

    #[test]
    fn rejects_non_base_url() {
        let err = ApiClient::new("mailto:books@example.com").unwrap_err();
        assert!(matches!(err, ApiError::BaseUrl(_)));
        assert_eq!(
            err.to_string(),
            "API url cannot be used as a base: mailto:books@example.com"
        );
        assert!(matches!(ApiClient::new("not a url"), Err(ApiError::Url(_))));
    }

    #[test]
    fn catalog_accepts_titles_or_records() -> anyhow::Result<()> {
        let catalog: Catalog = serde_json::from_value(json!({
            "total": 2,
            "books": ["Dune", dune()]
        }))?;
        assert_eq!(catalog.total(), 2);
        assert_eq!(catalog.books[0], CatalogEntry::Title("Dune".to_string()));
        assert!(matches!(&catalog.books[1], CatalogEntry::Book(book) if book.title == "Dune"));

        let catalog: Catalog = serde_json::from_value(json!({ "books": ["A", "B", "C"] }))?;
        assert_eq!(catalog.total(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn search_sends_query() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .and(query_param("q", "dune"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "books": [dune()] })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri())?;
        let books = client.search("dune").await?;
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Dune");
        assert_eq!(books[0].year, "1965");
        Ok(())
    }

    #[tokio::test]
    async fn recommend_parses_success() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/recommend"))
            .and(query_param("book", "Dune"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "input_book": dune(),
                "recommendations": [{ "title": "Children of Dune", "author": "Frank Herbert" }],
                "timestamp": "2024-03-01T10:00:00"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri())?;
        let rec = client.recommend("Dune").await?;
        assert_eq!(rec.input_book.title, "Dune");
        assert_eq!(rec.recommendations.len(), 1);
        assert_eq!(rec.recommendations[0].publisher, "Unknown");
        Ok(())
    }

    #[tokio::test]
    async fn recommend_surfaces_server_error() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/recommend"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "not found" })))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri())?;
        let err = client.recommend("Nope").await.unwrap_err();
        assert!(matches!(err, ApiError::Server { status: 404, .. }));
        assert_eq!(err.user_message("Failed to get recommendations"), "not found");
        Ok(())
    }

    #[tokio::test]
    async fn error_without_json_body_has_no_message() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/popular"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>boom</html>"))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri())?;
        let err = client.popular().await.unwrap_err();
        assert_eq!(err.server_message(), None);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_success_body_is_decode_error() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/books"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{"))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri())?;
        assert!(matches!(client.catalog().await, Err(ApiError::Decode(_))));
        Ok(())
    }

    #[tokio::test]
    async fn missing_cover_yields_placeholder() -> anyhow::Result<()> {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/covers/missing.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ApiClient::new(&server.uri())?;
        let cover = client
            .cover(&format!("{}/covers/missing.jpg", server.uri()))
            .await;
        assert!(cover.placeholder);
        assert!(client.cover("").await.placeholder);
        Ok(())
    }
}
