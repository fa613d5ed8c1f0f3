//! Seam to the remote suggestion service and its HTTP implementation.

use std::future::Future;

use better_prompt_protocol::FetchError;
use better_prompt_protocol::SuggestRequest;
use better_prompt_protocol::SuggestResponse;
use better_prompt_protocol::WordSuggestion;
use thiserror::Error;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://better-prompt.nebula-ai-company.workers.dev/";

/// Fetches word suggestions for a prompt.
///
/// Cancellation is cooperative: the session drops the returned future once the request is
/// superseded, so implementations must not rely on running to completion.
pub trait SuggestionFetcher: Send + Sync + 'static {
    fn fetch(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<Vec<WordSuggestion>, FetchError>> + Send;
}

#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error("invalid suggestion endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: String,
        source: url::ParseError,
    },
    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// `POST {endpoint}?api-key={key}` with a JSON `{"prompt": ...}` body.
#[derive(Debug, Clone)]
pub struct HttpSuggestionClient {
    client: reqwest::Client,
    url: Url,
}

impl HttpSuggestionClient {
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self, ClientBuildError> {
        let url = request_url(endpoint, api_key)?;
        let client = reqwest::Client::builder()
            .user_agent(format!("better-prompt/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, url })
    }
}

impl SuggestionFetcher for HttpSuggestionClient {
    async fn fetch(&self, prompt: &str) -> Result<Vec<WordSuggestion>, FetchError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&SuggestRequest {
                prompt: prompt.to_string(),
            })
            .send()
            .await
            .map_err(|err| FetchError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or_default().to_string()
            } else {
                body
            };
            return Err(FetchError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::Network(err.to_string()))?;
        let parsed = parse_response(&body)?;
        tracing::debug!(
            suggestions = parsed.suggestions.len(),
            total = ?parsed.total_suggestions,
            "suggestion response received"
        );
        Ok(parsed.suggestions)
    }
}

fn request_url(endpoint: &str, api_key: &str) -> Result<Url, ClientBuildError> {
    let mut url = Url::parse(endpoint).map_err(|source| ClientBuildError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        source,
    })?;
    if !api_key.is_empty() {
        url.query_pairs_mut().append_pair("api-key", api_key);
    }
    Ok(url)
}

fn parse_response(body: &[u8]) -> Result<SuggestResponse, FetchError> {
    serde_json::from_slice(body).map_err(|err| FetchError::Parse(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::body_json;
    use wiremock::matchers::method;
    use wiremock::matchers::path;
    use wiremock::matchers::query_param;

    #[test]
    fn api_key_is_sent_as_encoded_query_parameter() {
        let url = request_url("https://example.com/suggest", "k&y=1").expect("valid url");
        assert_eq!(url.as_str(), "https://example.com/suggest?api-key=k%26y%3D1");
    }

    #[test]
    fn empty_api_key_is_omitted() {
        let url = request_url(DEFAULT_ENDPOINT, "").expect("valid url");
        assert_eq!(url.as_str(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let err = request_url("not a url", "key").expect_err("invalid url");
        assert!(err.to_string().starts_with("invalid suggestion endpoint 'not a url'"));
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        let err = parse_response(b"<html>oops</html>").expect_err("not json");
        assert!(matches!(err, FetchError::Parse(_)));
    }

    #[test]
    fn body_is_decoded_into_suggestions() {
        let parsed = parse_response(br#"{"suggestions":[{"word":"cat","suggestions":["feline"]}]}"#)
            .expect("valid body");
        assert_eq!(
            parsed.suggestions,
            vec![WordSuggestion::new("cat", ["feline"])]
        );
    }

    fn client_for(server: &MockServer) -> HttpSuggestionClient {
        HttpSuggestionClient::new(&server.uri(), "test-key").expect("client")
    }

    #[tokio::test]
    async fn sends_prompt_and_key_and_decodes_suggestions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(query_param("api-key", "test-key"))
            .and(body_json(json!({ "prompt": "a cat is playing" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "suggestions": [{ "word": "cat", "suggestions": ["feline", "kitten"] }],
                "total_suggestions": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let suggestions = client_for(&server)
            .fetch("a cat is playing")
            .await
            .expect("fetch");
        assert_eq!(
            suggestions,
            vec![WordSuggestion::new("cat", ["feline", "kitten"])]
        );
    }

    #[tokio::test]
    async fn error_status_keeps_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch("a cat is playing")
            .await
            .expect_err("server error");
        assert_eq!(
            err,
            FetchError::Http {
                status: 500,
                body: "boom".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn empty_error_body_falls_back_to_reason_phrase() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch("a cat is playing")
            .await
            .expect_err("not found");
        assert_eq!(
            err,
            FetchError::Http {
                status: 404,
                body: "Not Found".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn undecodable_success_body_is_a_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch("a cat is playing")
            .await
            .expect_err("html body");
        assert!(matches!(err, FetchError::Parse(_)), "{err:?}");
    }

    #[tokio::test]
    async fn unreachable_service_is_a_network_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("local addr").port()
        };
        let client =
            HttpSuggestionClient::new(&format!("http://127.0.0.1:{port}/"), "").expect("client");

        let err = client
            .fetch("a cat is playing")
            .await
            .expect_err("nothing listening");
        assert!(matches!(err, FetchError::Network(_)), "{err:?}");
    }
}
