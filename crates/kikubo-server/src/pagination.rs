//! Page-number pagination.

use axum::http::Uri;
use serde::Serialize;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Cut `items` down to the requested page. Links keep every query
/// parameter of `uri` except `page`.
pub fn paginate<T>(items: Vec<T>, page: Option<&str>, size: usize, uri: &Uri) -> ServerResult<Page<T>> {
    let size = size.max(1);
    let count = items.len();
    let pages = count.div_ceil(size).max(1);
    let page = match page.map(str::trim).filter(|p| !p.is_empty()) {
        None => 1,
        Some("last") => pages,
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|p| (1..=pages).contains(p))
            .ok_or_else(|| ServerError::NotFound("Invalid page.".into()))?,
    };

    let link = |n: usize| {
        let mut params: Vec<&str> = uri
            .query()
            .unwrap_or_default()
            .split('&')
            .filter(|p| !p.is_empty() && !p.starts_with("page="))
            .collect();
        let page_param = format!("page={n}");
        params.push(&page_param);
        format!("{}?{}", uri.path(), params.join("&"))
    };

    let results = items.into_iter().skip((page - 1) * size).take(size).collect();
    Ok(Page {
        count,
        next: (page < pages).then(|| link(page + 1)),
        previous: (page > 1).then(|| link(page - 1)),
        results,
    })
}
