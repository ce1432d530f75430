use reqwest::header::HeaderMap;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::request::{PageRequest, PageSource};
use super::RepoError;

/// Running merged collection plus the page cursor, threaded through one
/// top-level fetch and dropped once the final collection is returned.
#[derive(Debug, Clone)]
pub struct Accumulation<T> {
    /// Items merged so far. Empty means nothing has been fetched yet.
    pub collected: Vec<T>,
    /// Page to request next, starting at 1
    pub page: u32,
}

impl<T> Default for Accumulation<T> {
    fn default() -> Self {
        Self {
            collected: Vec::new(),
            page: 1,
        }
    }
}

impl<T> Accumulation<T> {
    /// Merge a freshly fetched page: new items first, then what was already
    /// collected. Across pages this yields the last page first.
    pub fn merge(&mut self, mut items: Vec<T>) {
        if !self.collected.is_empty() {
            items.append(&mut self.collected);
        }
        self.collected = items;
    }

    pub fn into_items(self) -> Vec<T> {
        self.collected
    }
}

/// Fetch pages from `source` until one arrives without a next-page signal.
///
/// `endpoint` builds the URL for a given page number; `headers` are sent
/// with every request. Each page body must be a JSON array of `T`.
pub async fn accumulate<T, S, F>(
    source: &S,
    endpoint: F,
    headers: &HeaderMap,
    mut state: Accumulation<T>,
) -> Result<Vec<T>, RepoError>
where
    T: DeserializeOwned,
    S: PageSource + ?Sized,
    F: Fn(u32) -> Result<Url, RepoError>,
{
    loop {
        let request = PageRequest {
            url: endpoint(state.page)?,
            headers: headers.clone(),
            page: state.page,
        };
        let page = source.fetch(&request).await?;
        let next = page.next_page();
        let items = page.items::<T>()?;
        debug!(
            page = state.page,
            items = items.len(),
            has_next = next.is_some(),
            "merged page"
        );
        state.merge(items);

        match next {
            Some(next) => state.page = next,
            None => return Ok(state.into_items()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::repo::request::Page;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Page source that replays canned bodies and records every request.
    pub struct ScriptedSource {
        pages: Mutex<VecDeque<(Value, bool)>>,
        pub requests: Mutex<Vec<PageRequest>>,
    }

    impl ScriptedSource {
        /// Each entry is a body and whether that page advertises a next page.
        pub fn new(pages: Vec<(Value, bool)>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn urls(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.url.to_string())
                .collect()
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch(&self, request: &PageRequest) -> Result<Page, RepoError> {
            self.requests.lock().unwrap().push(request.clone());
            let (body, has_next) = self
                .pages
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted page left");
            Ok(Page {
                body,
                page: request.page,
                has_next,
            })
        }
    }

    fn endpoint(page: u32) -> Result<Url, RepoError> {
        Ok(Url::parse(&format!("https://api.test/items?page={page}")).unwrap())
    }

    async fn collect<T: DeserializeOwned>(source: &ScriptedSource) -> Result<Vec<T>, RepoError> {
        accumulate(source, endpoint, &HeaderMap::new(), Accumulation::default()).await
    }

    #[test]
    fn test_merge_into_empty_uses_page_as_is() {
        let mut state = Accumulation::default();
        state.merge(vec![1, 2]);
        assert_eq!(state.collected, vec![1, 2]);
    }

    #[test]
    fn test_merge_prepends_new_page() {
        let mut state = Accumulation::default();
        state.merge(vec!["a", "b"]);
        state.merge(vec!["c", "d"]);
        assert_eq!(state.into_items(), vec!["c", "d", "a", "b"]);
    }

    #[tokio::test]
    async fn test_two_pages_merge_new_page_first() {
        let source = ScriptedSource::new(vec![
            (json!(["a", "b"]), true),
            (json!(["c", "d"]), false),
        ]);
        let items: Vec<String> = collect(&source).await.unwrap();
        assert_eq!(items, vec!["c", "d", "a", "b"]);
    }

    #[tokio::test]
    async fn test_n_pages_fetch_exactly_n_times() {
        let source = ScriptedSource::new(vec![
            (json!([1, 2, 3]), true),
            (json!([4]), true),
            (json!([5, 6]), true),
            (json!([7, 8, 9, 10]), false),
        ]);
        let items: Vec<u32> = collect(&source).await.unwrap();
        assert_eq!(items.len(), 10);
        assert_eq!(source.request_count(), 4);
        assert_eq!(
            source.urls(),
            vec![
                "https://api.test/items?page=1",
                "https://api.test/items?page=2",
                "https://api.test/items?page=3",
                "https://api.test/items?page=4",
            ]
        );
    }

    #[tokio::test]
    async fn test_single_page_makes_one_call() {
        let source = ScriptedSource::new(vec![(json!([1, 2]), false)]);
        let items: Vec<u32> = collect(&source).await.unwrap();
        assert_eq!(items, vec![1, 2]);
        assert_eq!(source.request_count(), 1);
    }

    #[tokio::test]
    async fn test_resumes_from_given_cursor() {
        let source = ScriptedSource::new(vec![(json!([3]), false)]);
        let state = Accumulation {
            collected: vec![1, 2],
            page: 2,
        };
        let items: Vec<u32> = accumulate(&source, endpoint, &HeaderMap::new(), state)
            .await
            .unwrap();
        assert_eq!(items, vec![3, 1, 2]);
        assert_eq!(source.urls(), vec!["https://api.test/items?page=2"]);
    }

    #[tokio::test]
    async fn test_non_array_page_is_schema_error() {
        let source = ScriptedSource::new(vec![(json!({"message": "Bad credentials"}), false)]);
        let err = collect::<u32>(&source).await.unwrap_err();
        assert!(matches!(err, RepoError::Schema(_)));
    }
}
