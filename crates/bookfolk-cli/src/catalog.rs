//! Book catalog lookup
//!
//! Searches the Google Books volumes API for titles, authors, page counts
//! and cover images. Any failure yields an empty result list.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use bookfolk_core::NewBook;

const VOLUMES_URL: &str = "https://www.googleapis.com/books/v1/volumes";

/// Author used when the catalog lists none
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// A catalog search hit
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogBook {
    pub title: String,
    pub authors: Vec<String>,
    pub page_count: Option<u32>,
    pub published_year: Option<i32>,
    pub isbn: Option<String>,
    pub thumbnail: Option<String>,
}

impl CatalogBook {
    pub fn author_line(&self) -> String {
        if self.authors.is_empty() {
            UNKNOWN_AUTHOR.to_string()
        } else {
            self.authors.join(", ")
        }
    }

    /// Creation input prefilled from this hit
    pub fn to_new_book(&self) -> NewBook {
        NewBook {
            isbn: self.isbn.clone(),
            published_year: self.published_year,
            cover_url: self.thumbnail.clone(),
            ..NewBook::new(self.title.clone(), self.author_line(), self.page_count.unwrap_or(0))
        }
    }
}

pub struct Catalog {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl Catalog {
    pub fn new(api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("bookfolk/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: VOLUMES_URL.to_string(),
        })
    }

    /// Point at another volumes endpoint (tests, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Search the catalog (graceful: empty on failure)
    pub async fn search(&self, query: &str, limit: usize) -> Vec<CatalogBook> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        match self.search_inner(query, limit).await {
            Ok(books) => books,
            Err(e) => {
                warn!(error = %e, query, "catalog search failed");
                Vec::new()
            }
        }
    }

    /// Cover image for a title/author pair, if the catalog has one
    pub async fn find_cover(&self, title: &str, author: &str) -> Option<String> {
        self.search(&format!("{} {}", title, author), 1)
            .await
            .into_iter()
            .next()
            .and_then(|b| b.thumbnail)
    }

    async fn search_inner(&self, query: &str, limit: usize) -> Result<Vec<CatalogBook>> {
        let mut params = vec![
            ("q", query.to_string()),
            ("maxResults", limit.clamp(1, 40).to_string()),
        ];
        if let Some(ref key) = self.api_key {
            params.push(("key", key.clone()));
        }

        let response = self.client.get(&self.base_url).query(&params).send().await?;
        if !response.status().is_success() {
            warn!(status = %response.status(), "catalog returned an error status");
            return Ok(Vec::new());
        }

        let body: Value = response.json().await?;
        Ok(parse_volumes(&body, limit))
    }
}

/// Parse a volumes response body
pub fn parse_volumes(body: &Value, limit: usize) -> Vec<CatalogBook> {
    let items = match body.get("items").and_then(Value::as_array) {
        Some(items) => items,
        None => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| item.get("volumeInfo"))
        .filter_map(parse_volume_info)
        .take(limit)
        .collect()
}

fn parse_volume_info(info: &Value) -> Option<CatalogBook> {
    let title = info
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())?
        .to_string();

    let authors = info
        .get("authors")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let page_count = info
        .get("pageCount")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok());

    let published_year = info
        .get("publishedDate")
        .and_then(Value::as_str)
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse().ok());

    let isbn = info
        .get("industryIdentifiers")
        .and_then(Value::as_array)
        .and_then(|ids| {
            let find = |kind: &str| {
                ids.iter()
                    .find(|id| id.get("type").and_then(Value::as_str) == Some(kind))
                    .and_then(|id| id.get("identifier").and_then(Value::as_str))
            };
            find("ISBN_13").or_else(|| find("ISBN_10"))
        })
        .map(str::to_string);

    let thumbnail = info
        .get("imageLinks")
        .and_then(|links| links.get("thumbnail").or_else(|| links.get("smallThumbnail")))
        .and_then(Value::as_str)
        .map(|url| url.replacen("http://", "https://", 1));

    Some(CatalogBook {
        title,
        authors,
        page_count,
        published_year,
        isbn,
        thumbnail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_volumes() {
        let body = json!({
            "items": [
                {
                    "volumeInfo": {
                        "title": "Dune",
                        "authors": ["Frank Herbert"],
                        "pageCount": 412,
                        "publishedDate": "1965-08-01",
                        "industryIdentifiers": [
                            {"type": "ISBN_10", "identifier": "0441013597"},
                            {"type": "ISBN_13", "identifier": "9780441013593"}
                        ],
                        "imageLinks": {"thumbnail": "http://books.google.com/dune.jpg"}
                    }
                },
                {
                    "volumeInfo": {
                        "title": "Dune Messiah",
                        "imageLinks": {"smallThumbnail": "https://books.google.com/m.jpg"}
                    }
                }
            ]
        });

        let books = parse_volumes(&body, 4);
        assert_eq!(books.len(), 2);

        assert_eq!(books[0].title, "Dune");
        assert_eq!(books[0].page_count, Some(412));
        assert_eq!(books[0].published_year, Some(1965));
        assert_eq!(books[0].isbn.as_deref(), Some("9780441013593"));
        assert_eq!(
            books[0].thumbnail.as_deref(),
            Some("https://books.google.com/dune.jpg")
        );

        assert_eq!(books[1].author_line(), UNKNOWN_AUTHOR);
        assert_eq!(books[1].page_count, None);
        assert_eq!(
            books[1].thumbnail.as_deref(),
            Some("https://books.google.com/m.jpg")
        );
    }

    #[test]
    fn test_parse_volumes_without_items() {
        assert!(parse_volumes(&json!({"totalItems": 0}), 4).is_empty());
        assert!(parse_volumes(&json!({"error": {"code": 403}}), 4).is_empty());
    }

    #[test]
    fn test_parse_volumes_skips_untitled_and_limits() {
        let body = json!({
            "items": [
                {"volumeInfo": {"title": "  "}},
                {"volumeInfo": {"title": "A"}},
                {"volumeInfo": {"title": "B"}},
                {"id": "no-info"}
            ]
        });
        let books = parse_volumes(&body, 1);
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "A");
    }

    #[test]
    fn test_to_new_book() {
        let hit = CatalogBook {
            title: "Good Omens".into(),
            authors: vec!["Terry Pratchett".into(), "Neil Gaiman".into()],
            page_count: Some(288),
            thumbnail: Some("https://example.com/c.jpg".into()),
            ..CatalogBook::default()
        };
        let new = hit.to_new_book();
        assert_eq!(new.author, "Terry Pratchett, Neil Gaiman");
        assert_eq!(new.pages, 288);
        assert_eq!(new.cover_url.as_deref(), Some("https://example.com/c.jpg"));
        assert!(new.validate().is_ok());
    }

    #[tokio::test]
    async fn test_blank_query_is_empty() {
        let catalog = Catalog::new(None, 1).unwrap();
        assert!(catalog.search("   ", 4).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_empty() {
        let catalog = Catalog::new(None, 2)
            .unwrap()
            .with_base_url("http://127.0.0.1:9/books/v1/volumes");
        assert!(catalog.search("Dune", 4).await.is_empty());
        assert!(catalog.find_cover("Dune", "Frank Herbert").await.is_none());
    }
}
