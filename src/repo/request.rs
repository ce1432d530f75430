use async_trait::async_trait;
use reqwest::header::{HeaderMap, LINK, USER_AGENT};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use super::RepoError;

pub const DEFAULT_USER_AGENT: &str = "repo-stats";

/// A single GET to issue: endpoint, extra headers, and the page it asks for.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub url: Url,
    pub headers: HeaderMap,
    pub page: u32,
}

/// One fetched page: the parsed JSON body and the pagination signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub body: Value,
    /// Page number that was requested
    pub page: u32,
    /// Whether the response advertised a `rel="next"` link
    pub has_next: bool,
}

impl Page {
    pub fn next_page(&self) -> Option<u32> {
        if self.has_next {
            self.page.checked_add(1)
        } else {
            None
        }
    }

    /// Decode the body as an array of `T`.
    pub fn items<T: DeserializeOwned>(self) -> Result<Vec<T>, RepoError> {
        if !self.body.is_array() {
            return Err(RepoError::Schema(format!(
                "expected an array on page {}, got {}",
                self.page,
                json_kind(&self.body)
            )));
        }
        serde_json::from_value(self.body).map_err(|e| RepoError::Schema(e.to_string()))
    }

    /// Decode the body as a single `T`.
    pub fn record<T: DeserializeOwned>(self) -> Result<T, RepoError> {
        serde_json::from_value(self.body).map_err(|e| RepoError::Schema(e.to_string()))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Anything that can answer a `PageRequest` with one `Page`.
/// The accumulator only talks to this trait.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, request: &PageRequest) -> Result<Page, RepoError>;
}

/// True when the `link` header carries a `rel="next"` relation.
pub fn has_next_page(headers: &HeaderMap) -> bool {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|link| link.contains("rel=\"next\""))
}

/// Request executor backed by reqwest. One network call per `fetch`.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    token: String,
    user_agent: String,
}

impl HttpExecutor {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

#[async_trait]
impl PageSource for HttpExecutor {
    #[instrument(skip(self, request), fields(url = %request.url, page = request.page))]
    async fn fetch(&self, request: &PageRequest) -> Result<Page, RepoError> {
        let response = self
            .client
            .get(request.url.clone())
            .header(USER_AGENT, &self.user_agent)
            .bearer_auth(&self.token)
            .headers(request.headers.clone())
            .send()
            .await?;

        let status = response.status();
        let has_next = has_next_page(response.headers());
        let text = response.text().await?;
        debug!(
            status = status.as_u16(),
            bytes = text.len(),
            has_next,
            "received response"
        );

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| {
                    status.canonical_reason().unwrap_or("unknown").to_string()
                });
            return Err(RepoError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body = serde_json::from_str(&text).map_err(RepoError::Parse)?;
        Ok(Page {
            body,
            page: request.page,
            has_next,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, ACCEPT};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request_for(server: &MockServer, route: &str, page: u32) -> PageRequest {
        let url = Url::parse(&format!("{}{}?page={}", server.uri(), route, page)).unwrap();
        PageRequest {
            url,
            headers: HeaderMap::new(),
            page,
        }
    }

    #[test]
    fn test_has_next_page_detects_next_relation() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://api.github.com/repositories/1/pulls?page=2>; rel=\"next\", <https://api.github.com/repositories/1/pulls?page=5>; rel=\"last\"",
            ),
        );
        assert!(has_next_page(&headers));
    }

    #[test]
    fn test_has_next_page_ignores_other_relations() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://api.github.com/x?page=1>; rel=\"prev\", <https://api.github.com/x?page=1>; rel=\"first\"",
            ),
        );
        assert!(!has_next_page(&headers));
        assert!(!has_next_page(&HeaderMap::new()));
    }

    #[test]
    fn test_next_page_increments_only_with_signal() {
        let page = Page {
            body: Value::Array(vec![]),
            page: 3,
            has_next: true,
        };
        assert_eq!(page.next_page(), Some(4));
        let last = Page { has_next: false, ..page };
        assert_eq!(last.next_page(), None);
    }

    #[test]
    fn test_next_page_stops_at_last_representable_page() {
        let page = Page {
            body: Value::Array(vec![]),
            page: u32::MAX,
            has_next: true,
        };
        assert_eq!(page.next_page(), None);
    }

    #[test]
    fn test_items_rejects_object_body() {
        let page = Page {
            body: serde_json::json!({"message": "Not Found"}),
            page: 1,
            has_next: false,
        };
        let err = page.items::<crate::repo::User>().unwrap_err();
        assert!(matches!(err, RepoError::Schema(_)));
    }

    #[tokio::test]
    async fn test_fetch_sends_credentials_and_reads_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/GSA/proj/stargazers"))
            .and(query_param("page", "1"))
            .and(header("authorization", "Bearer secret"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .and(header("accept", "application/vnd.github.v3.star+json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("link", "<https://api.github.com/x?page=2>; rel=\"next\"")
                    .set_body_json(serde_json::json!([{"login": "a", "id": 1}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut request = request_for(&server, "/repos/GSA/proj/stargazers", 1);
        request.headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3.star+json"),
        );

        let page = HttpExecutor::new("secret").fetch(&request).await.unwrap();
        assert_eq!(page.page, 1);
        assert!(page.has_next);
        assert_eq!(page.next_page(), Some(2));
        assert_eq!(page.body, serde_json::json!([{"login": "a", "id": 1}]));
    }

    #[tokio::test]
    async fn test_fetch_invalid_json_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/GSA/proj"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let request = request_for(&server, "/repos/GSA/proj", 1);
        let err = HttpExecutor::new("t").fetch(&request).await.unwrap_err();
        assert!(matches!(err, RepoError::Parse(_)));
    }

    #[tokio::test]
    async fn test_fetch_error_status_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/GSA/missing"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"message": "Not Found"})),
            )
            .mount(&server)
            .await;

        let request = request_for(&server, "/repos/GSA/missing", 1);
        let err = HttpExecutor::new("t").fetch(&request).await.unwrap_err();
        match err {
            RepoError::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Not Found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_transport_error() {
        let request = PageRequest {
            url: Url::parse("http://127.0.0.1:1/repos/GSA/proj").unwrap(),
            headers: HeaderMap::new(),
            page: 1,
        };
        let err = HttpExecutor::new("t").fetch(&request).await.unwrap_err();
        assert!(matches!(err, RepoError::Transport(_)));
    }
}
