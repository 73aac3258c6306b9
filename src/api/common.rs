//! Common API utilities and shared types
//!
//! Pagination query/response shapes and JSON body handling shared by the
//! endpoints.

use axum::{extract::rejection::JsonRejection, http::Uri, Json};
use serde::{Deserialize, Serialize};

use crate::api::middleware::ApiError;
use crate::models::{ListParams, PagedResult, DEFAULT_PAGE_SIZE};

// ============================================================================
// Pagination
// ============================================================================

/// Default page number (1-indexed)
pub fn default_page() -> u32 {
    1
}

/// Default page size
pub fn default_limit() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Raw `page` + `limit` query parameters, parsed by [`PaginationQuery::params`]
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PaginationQuery {
    pub fn params(&self) -> Result<ListParams, ApiError> {
        let page = match self.page.as_deref() {
            Some(raw) => parse_page(raw)?,
            None => default_page(),
        };
        let limit = self
            .limit
            .as_deref()
            .map_or_else(default_limit, parse_limit);
        Ok(ListParams::new(page, limit))
    }
}

/// A `page` that is not a number is a 404, like a page past the end
pub fn parse_page(raw: &str) -> Result<u32, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found("Invalid page."))
}

/// An unparsable `limit` falls back to the default page size
pub fn parse_limit(raw: &str) -> u32 {
    raw.parse().unwrap_or_else(|_| default_limit())
}

/// Paginated list response
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Build the response for `uri`. Links keep the other query parameters
    /// and are absolute against `site_url`. A page past the end is a 404.
    pub fn from_paged<U>(
        paged: PagedResult<U>,
        site_url: &str,
        uri: &Uri,
        f: impl FnMut(U) -> T,
    ) -> Result<Self, ApiError> {
        if paged.is_out_of_range() {
            return Err(ApiError::not_found("Invalid page."));
        }

        let next = paged
            .has_next()
            .then(|| page_link(site_url, uri, Some(paged.page + 1)));
        let previous = paged.has_prev().then(|| {
            let target = paged.page - 1;
            page_link(site_url, uri, (target > 1).then_some(target))
        });

        Ok(Self {
            count: paged.total,
            next,
            previous,
            results: paged.items.into_iter().map(f).collect(),
        })
    }
}

/// `uri` with its `page` parameter replaced (or removed when `page` is None)
fn page_link(site_url: &str, uri: &Uri, page: Option<u32>) -> String {
    let mut pairs: Vec<String> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| pair.split('=').next() != Some("page"))
        .map(str::to_string)
        .collect();
    if let Some(page) = page {
        pairs.push(format!("page={}", urlencoding::encode(&page.to_string())));
    }

    let mut link = format!("{}{}", site_url, uri.path());
    if !pairs.is_empty() {
        link.push('?');
        link.push_str(&pairs.join("&"));
    }
    link
}

// ============================================================================
// Request bodies
// ============================================================================

/// Unwrap a JSON body, turning malformed input into a 400
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ApiError::with_details(
            "VALIDATION_ERROR",
            "Malformed request body",
            serde_json::json!({ "non_field_errors": [rejection.body_text()] }),
        )),
    }
}

/// Parse a `recipes_limit` value; anything but plain digits is ignored and
/// values too large for `usize` saturate
pub fn parse_recipes_limit(raw: Option<&str>) -> Option<usize> {
    let raw = raw?;
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(raw.parse().unwrap_or(usize::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paged(page: u32, limit: u32, total: i64) -> PagedResult<i64> {
        let params = ListParams::new(page, limit);
        let count = (total - params.offset()).clamp(0, params.limit());
        PagedResult::new((0..count).collect(), total, &params)
    }

    #[test]
    fn test_first_page_links() {
        let uri: Uri = "/api/recipes/?tags=lunch&limit=2".parse().unwrap();
        let page = Page::from_paged(paged(1, 2, 5), "http://host", &uri, |x| x).unwrap();

        assert_eq!(page.count, 5);
        assert_eq!(
            page.next.as_deref(),
            Some("http://host/api/recipes/?tags=lunch&limit=2&page=2")
        );
        assert!(page.previous.is_none());
    }

    #[test]
    fn test_previous_of_second_page_drops_page_param() {
        let uri: Uri = "/api/users/?page=2&limit=2".parse().unwrap();
        let page = Page::from_paged(paged(2, 2, 5), "http://host", &uri, |x| x).unwrap();

        assert_eq!(page.previous.as_deref(), Some("http://host/api/users/?limit=2"));
        assert_eq!(
            page.next.as_deref(),
            Some("http://host/api/users/?limit=2&page=3")
        );
    }

    #[test]
    fn test_page_past_end_is_not_found() {
        let uri: Uri = "/api/users/?page=9".parse().unwrap();
        let err = Page::from_paged(paged(9, 6, 3), "http://host", &uri, |x| x).unwrap_err();
        assert_eq!(err.error.code, "NOT_FOUND");
    }

    #[test]
    fn test_empty_first_page_is_fine() {
        let uri: Uri = "/api/users/".parse().unwrap();
        let page = Page::from_paged(paged(1, 6, 0), "http://host", &uri, |x| x).unwrap();
        assert_eq!(page.count, 0);
        assert!(page.next.is_none());
        assert!(page.results.is_empty());
    }

    #[test]
    fn test_parse_recipes_limit() {
        assert_eq!(parse_recipes_limit(Some("5")), Some(5));
        assert_eq!(parse_recipes_limit(Some("0")), Some(0));
        assert_eq!(parse_recipes_limit(Some("-1")), None);
        assert_eq!(parse_recipes_limit(Some("abc")), None);
        assert_eq!(parse_recipes_limit(Some("")), None);
        assert_eq!(parse_recipes_limit(None), None);
        assert_eq!(
            parse_recipes_limit(Some("9223372036854775808999")),
            Some(usize::MAX)
        );
    }

    #[test]
    fn test_pagination_query_params() {
        let query = PaginationQuery {
            page: Some("2".to_string()),
            limit: Some("3".to_string()),
        };
        assert_eq!(query.params().unwrap(), ListParams::new(2, 3));

        assert_eq!(
            PaginationQuery::default().params().unwrap(),
            ListParams::new(1, DEFAULT_PAGE_SIZE)
        );

        let bad_limit = PaginationQuery {
            page: None,
            limit: Some("abc".to_string()),
        };
        assert_eq!(bad_limit.params().unwrap().limit, DEFAULT_PAGE_SIZE);

        let bad_page = PaginationQuery {
            page: Some("abc".to_string()),
            limit: None,
        };
        assert_eq!(bad_page.params().unwrap_err().error.code, "NOT_FOUND");
    }
}
