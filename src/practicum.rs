use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("endpoint {endpoint} is unavailable, API response code: {status}")]
    Status { endpoint: String, status: u16 },
    #[error("request to review API failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// The response body does not have the documented shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("response has type {0}, expected an object")]
    NotAnObject(&'static str),
    #[error("homeworks has type {0}, expected a list")]
    NotAList(&'static str),
}

/// Source of review statuses, queried with a lower-bound timestamp.
#[async_trait]
pub trait HomeworkSource: Send + Sync {
    async fn fetch(&self, from_date: i64) -> Result<Value, FetchError>;
}

#[derive(Clone)]
pub struct PracticumClient {
    http: Client,
    endpoint: Url,
    token: String,
}

impl fmt::Debug for PracticumClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PracticumClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl PracticumClient {
    pub fn new(token: String, endpoint: Url) -> Result<Self, FetchError> {
        let http = Client::builder()
            .user_agent("homework-watchbot/0.1")
            .build()?;
        Ok(Self {
            http,
            endpoint,
            token,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, FetchError> {
        Self::new(cfg.practicum_token.clone(), cfg.endpoint.clone())
    }

    pub fn build_request(&self, from_date: i64) -> Result<reqwest::Request, FetchError> {
        let request = self
            .http
            .get(self.endpoint.clone())
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
            .query(&[("from_date", from_date)])
            .build()?;
        Ok(request)
    }
}

/// Map a non-200 status to a transport error naming the endpoint.
pub fn check_status(endpoint: &Url, status: StatusCode) -> Result<(), FetchError> {
    if status == StatusCode::OK {
        return Ok(());
    }
    let err = FetchError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
    };
    debug!("{}", err);
    Err(err)
}

#[async_trait]
impl HomeworkSource for PracticumClient {
    async fn fetch(&self, from_date: i64) -> Result<Value, FetchError> {
        let request = self.build_request(from_date)?;
        debug!(url = %request.url(), "querying review API");
        let res = self.http.execute(request).await?;
        check_status(&self.endpoint, res.status())?;
        info!(status = res.status().as_u16(), "review API responded");
        Ok(res.json::<Value>().await?)
    }
}

/// Current time as whole seconds since the epoch.
pub fn now_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Query `source`, substituting the current time when no cursor is given.
pub async fn get_api_answer(
    source: &dyn HomeworkSource,
    from_date: Option<i64>,
) -> Result<Value, FetchError> {
    let from_date = from_date.unwrap_or_else(now_timestamp);
    source.fetch(from_date).await
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Extract the submissions list from a response body.
pub fn check_response(response: &Value) -> Result<&[Value], ContractError> {
    let Some(body) = response.as_object() else {
        let err = ContractError::NotAnObject(json_type_name(response));
        debug!("{}", err);
        return Err(err);
    };
    match body.get("homeworks") {
        Some(Value::Array(items)) => Ok(items.as_slice()),
        other => {
            let err = ContractError::NotAList(other.map_or("null", json_type_name));
            debug!("{}", err);
            Err(err)
        }
    }
}

/// Server-reported `current_date`. Absent, zero or non-integer values mean
/// the next query starts from the current time.
pub fn current_date(response: &Value) -> Option<i64> {
    response
        .get("current_date")
        .and_then(Value::as_i64)
        .filter(|ts| *ts != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> PracticumClient {
        PracticumClient::new(
            "secret".into(),
            Url::parse("https://example.test/api/homework_statuses/").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn request_carries_auth_and_cursor() {
        let req = client().build_request(1_700_000_000).unwrap();
        assert_eq!(req.method(), reqwest::Method::GET);
        assert_eq!(
            req.url().as_str(),
            "https://example.test/api/homework_statuses/?from_date=1700000000"
        );
        assert_eq!(req.headers()[AUTHORIZATION], "OAuth secret");
    }

    #[test]
    fn debug_hides_token() {
        assert!(!format!("{:?}", client()).contains("secret"));
    }

    #[test]
    fn non_ok_status_is_transport_error() {
        let url = Url::parse("https://example.test/api/homework_statuses/").unwrap();
        assert!(check_status(&url, StatusCode::OK).is_ok());
        let err = check_status(&url, StatusCode::SERVICE_UNAVAILABLE).unwrap_err();
        match &err {
            FetchError::Status { endpoint, status } => {
                assert_eq!(*status, 503);
                assert!(endpoint.contains("example.test"));
            }
            other => panic!("wrong error: {other:?}"),
        }
        assert!(err.to_string().contains("503"));
        assert!(check_status(&url, StatusCode::NO_CONTENT).is_err());
    }

    #[test]
    fn non_object_response_names_type() {
        let err = check_response(&json!([1, 2])).unwrap_err();
        assert_eq!(err, ContractError::NotAnObject("array"));
        assert!(err.to_string().contains("array"));
        assert_eq!(
            check_response(&json!("oops")).unwrap_err(),
            ContractError::NotAnObject("string")
        );
    }

    #[test]
    fn homeworks_must_be_a_list() {
        let err = check_response(&json!({"homeworks": {"a": 1}})).unwrap_err();
        assert_eq!(err, ContractError::NotAList("object"));
        assert!(err.to_string().contains("object"));
        assert_eq!(
            check_response(&json!({"current_date": 1})).unwrap_err(),
            ContractError::NotAList("null")
        );
    }

    #[test]
    fn returns_list_possibly_empty() {
        let body = json!({"homeworks": [], "current_date": 10});
        assert!(check_response(&body).unwrap().is_empty());
        let body = json!({"homeworks": [{"homework_name": "hw1", "status": "approved"}]});
        assert_eq!(check_response(&body).unwrap().len(), 1);
    }

    #[test]
    fn current_date_requires_integer() {
        assert_eq!(current_date(&json!({"current_date": 42})), Some(42));
        assert_eq!(current_date(&json!({"current_date": "42"})), None);
        assert_eq!(current_date(&json!({})), None);
        assert_eq!(current_date(&json!({"current_date": 0})), None);
    }

    #[derive(Default)]
    struct FixedSource {
        seen: std::sync::Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl HomeworkSource for FixedSource {
        async fn fetch(&self, from_date: i64) -> Result<Value, FetchError> {
            self.seen.lock().unwrap().push(from_date);
            Ok(json!({"homeworks": []}))
        }
    }

    #[tokio::test]
    async fn absent_cursor_uses_current_time() {
        let source = FixedSource::default();
        let before = now_timestamp();
        get_api_answer(&source, None).await.unwrap();
        get_api_answer(&source, Some(77)).await.unwrap();
        let seen = source.seen.lock().unwrap().clone();
        assert!(seen[0] >= before && seen[0] <= now_timestamp());
        assert_eq!(seen[1], 77);
    }
}
