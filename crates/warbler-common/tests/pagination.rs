use std::collections::VecDeque;
use std::sync::Arc;

use http::{Response as HttpResponse, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use warbler_common::error::EncodeError;
use warbler_common::http_client::HttpClient;
use warbler_common::{
    ApiClient, ApiErrorKind, ApiRequest, ClientError, PageReply, Paged, PagedQuery, Params, Query,
};

#[derive(Clone, Default)]
struct MockClient {
    queue: Arc<Mutex<VecDeque<HttpResponse<Vec<u8>>>>>,
    log: Arc<Mutex<Vec<http::Request<Vec<u8>>>>>,
}

impl MockClient {
    async fn push_json(&self, status: StatusCode, body: serde_json::Value) {
        let resp = HttpResponse::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(&body).unwrap())
            .unwrap();
        self.queue.lock().await.push_back(resp);
    }

    async fn take_log(&self) -> Vec<http::Request<Vec<u8>>> {
        let mut log = self.log.lock().await;
        let out = log.clone();
        log.clear();
        out
    }
}

impl HttpClient for MockClient {
    type Error = std::convert::Infallible;

    fn send_http(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> impl core::future::Future<
        Output = core::result::Result<http::Response<Vec<u8>>, Self::Error>,
    > + Send {
        let log = self.log.clone();
        let queue = self.queue.clone();
        async move {
            log.lock().await.push(request);
            Ok(queue.lock().await.pop_front().expect("no queued response"))
        }
    }
}

#[derive(Debug, Deserialize)]
struct Page {
    data: Vec<Item>,
    #[serde(default)]
    meta: Meta,
}

#[derive(Debug, Deserialize)]
struct Item {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct Meta {
    next_token: Option<String>,
}

impl PageReply for Page {
    fn next_token(&self) -> Option<&str> {
        self.meta.next_token.as_deref()
    }
}

struct Followers {
    user_id: String,
}

impl Query for Followers {
    type Reply = Page;

    fn request(&self) -> Result<ApiRequest, EncodeError> {
        let mut params = Params::new();
        params.set("max_results", "2");
        Ok(ApiRequest::get(
            format!("2/users/{}/followers", self.user_id),
            params,
        ))
    }
}

impl PagedQuery for Followers {}

fn page(ids: &[&str], next: Option<&str>) -> serde_json::Value {
    let data: Vec<_> = ids.iter().map(|id| serde_json::json!({"id": id})).collect();
    match next {
        Some(token) => serde_json::json!({"data": data, "meta": {"result_count": ids.len(), "next_token": token}}),
        None => serde_json::json!({"data": data, "meta": {"result_count": ids.len()}}),
    }
}

fn ids(page: &Page) -> Vec<&str> {
    page.data.iter().map(|i| i.id.as_str()).collect()
}

fn token_sent(req: &http::Request<Vec<u8>>) -> Option<String> {
    let url = url::Url::parse(&req.uri().to_string()).unwrap();
    url.query_pairs()
        .find(|(k, _)| k == "pagination_token")
        .map(|(_, v)| v.into_owned())
}

#[tokio::test]
async fn pages_are_fetched_in_order_until_tokenless_reply() {
    let mock = MockClient::default();
    mock.push_json(StatusCode::OK, page(&["1", "2"], Some("t1"))).await;
    mock.push_json(StatusCode::OK, page(&["3", "4"], Some("t2"))).await;
    mock.push_json(StatusCode::OK, page(&["5"], None)).await;

    let client = ApiClient::new(mock.clone());
    let mut query = Paged::new(Followers {
        user_id: "2244994945".into(),
    });
    assert!(query.has_more_pages());

    let first = client.invoke(&mut query).await.unwrap();
    assert_eq!(ids(&first), ["1", "2"]);
    assert!(query.has_more_pages());

    let second = client.invoke(&mut query).await.unwrap();
    assert_eq!(ids(&second), ["3", "4"]);
    assert!(query.has_more_pages());

    let third = client.invoke(&mut query).await.unwrap();
    assert_eq!(ids(&third), ["5"]);
    assert!(!query.has_more_pages());

    let log = mock.take_log().await;
    assert_eq!(log.len(), 3);
    assert!(log[0].uri().path().ends_with("/2/users/2244994945/followers"));
    assert_eq!(token_sent(&log[0]), None);
    assert_eq!(token_sent(&log[1]).as_deref(), Some("t1"));
    assert_eq!(token_sent(&log[2]).as_deref(), Some("t2"));
}

#[tokio::test]
async fn next_page_stops_without_calling_once_exhausted() {
    let mock = MockClient::default();
    mock.push_json(StatusCode::OK, page(&["1"], None)).await;

    let client = ApiClient::new(mock.clone());
    let mut query = Paged::new(Followers {
        user_id: "12".into(),
    });

    assert!(query.next_page(&client).await.unwrap().is_some());
    assert!(query.next_page(&client).await.unwrap().is_none());
    assert_eq!(mock.take_log().await.len(), 1);
}

#[tokio::test]
async fn reset_restarts_from_the_first_page() {
    let mock = MockClient::default();
    mock.push_json(StatusCode::OK, page(&["1"], Some("t1"))).await;
    mock.push_json(StatusCode::OK, page(&["1"], Some("t1"))).await;

    let client = ApiClient::new(mock.clone());
    let mut query = Paged::new(Followers {
        user_id: "12".into(),
    });
    client.invoke(&mut query).await.unwrap();
    query.reset_page_token();
    query.reset_page_token();
    assert!(query.has_more_pages());
    assert_eq!(query.cursor().token(), None);
    client.invoke(&mut query).await.unwrap();

    let log = mock.take_log().await;
    assert_eq!(token_sent(&log[1]), None);
}

#[tokio::test]
async fn all_pages_honours_max_pages() {
    let mock = MockClient::default();
    for n in 0..3 {
        mock.push_json(StatusCode::OK, page(&["x"], Some(&format!("t{n}"))))
            .await;
    }

    let client = ApiClient::new(mock.clone());
    let mut query = Paged::new(Followers {
        user_id: "12".into(),
    });
    let pages = query.all_pages(&client, Some(2)).await.unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(query.cursor().token(), Some("t1"));
    assert!(query.has_more_pages());
}

#[tokio::test]
async fn failed_call_leaves_cursor_untouched() {
    let mock = MockClient::default();
    mock.push_json(StatusCode::OK, page(&["1"], Some("t1"))).await;
    mock.push_json(
        StatusCode::TOO_MANY_REQUESTS,
        serde_json::json!({"title": "Too Many Requests", "detail": "Too Many Requests", "type": "about:blank", "status": 429}),
    )
    .await;

    let client = ApiClient::new(mock.clone());
    let mut query = Paged::new(Followers {
        user_id: "12".into(),
    });
    client.invoke(&mut query).await.unwrap();
    let err = client.invoke(&mut query).await.unwrap_err();

    assert_eq!(err.api_error().unwrap().kind(), ApiErrorKind::RateLimited);
    assert_eq!(query.cursor().token(), Some("t1"));
}

#[tokio::test]
async fn malformed_reply_is_a_decode_error() {
    let mock = MockClient::default();
    mock.push_json(StatusCode::OK, serde_json::json!({"data": "not a list"}))
        .await;

    let client = ApiClient::new(mock);
    let mut query = Paged::new(Followers {
        user_id: "12".into(),
    });
    let err = client.invoke(&mut query).await.unwrap_err();

    assert!(matches!(err, ClientError::Decode(_)));
    assert!(query.has_more_pages());
}
