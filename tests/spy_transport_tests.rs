//! Client tests against a recording transport, without a network.

use async_trait::async_trait;
use flowline::{
    Client, ComposedRequest, Endpoint, ErrorMapping, HttpMethod, Json, Outcome, RawResponse,
    TaskState, Task, Transport, TransportFailure,
};
use http::Method;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Default)]
struct TransportSpy {
    reply: Mutex<RawResponse>,
    requests: Mutex<Vec<ComposedRequest>>,
    hold: Option<Arc<Notify>>,
}

impl TransportSpy {
    fn replying(reply: RawResponse) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(reply),
            ..Self::default()
        })
    }

    fn execute_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> Option<ComposedRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Transport for TransportSpy {
    async fn execute(&self, request: ComposedRequest) -> RawResponse {
        self.requests.lock().unwrap().push(request);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        self.reply.lock().unwrap().clone()
    }
}

struct MockTarget;

impl Endpoint for MockTarget {
    fn base_url(&self) -> &str {
        "https://example.com/api"
    }

    fn path(&self) -> String {
        "/test".to_string()
    }

    fn method(&self) -> HttpMethod {
        HttpMethod::Get
    }

    fn task(&self) -> Task {
        Task::Plain
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct MockModel {
    id: u32,
    test: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct MockErrorModel {
    id: u32,
    error: String,
}

fn mapped_error(kind: TransportFailure) -> MockErrorModel {
    MockErrorModel {
        id: 321,
        error: format!("mapped {:?}", kind),
    }
}

fn client(spy: &Arc<TransportSpy>, mapping: Option<ErrorMapping>) -> Client {
    let mut builder = Client::builder().transport(Arc::clone(spy));
    if let Some(mapping) = mapping {
        builder = builder.error_mapping(mapping);
    }
    builder.build().unwrap()
}

#[tokio::test]
async fn test_fetch_success_returns_decoded_model() {
    let model = MockModel {
        id: 123,
        test: "success".to_string(),
    };
    let spy = TransportSpy::replying(RawResponse::new(200, serde_json::to_vec(&model).unwrap()));

    let response = client(&spy, None)
        .fetch::<Json<MockModel>, Json<MockErrorModel>>(&MockTarget)
        .await
        .unwrap();

    assert_eq!(response.data.success(), Some(&model));
    assert_eq!(spy.execute_count(), 1);

    let request = spy.last_request().unwrap();
    assert_eq!(request.url.as_str(), "https://example.com/api/test");
    assert_eq!(request.method, Method::GET);
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert!(request.body.is_none());
}

#[tokio::test]
async fn test_fetch_error_returns_decoded_error_model() {
    let error = MockErrorModel {
        id: 321,
        error: "custom".to_string(),
    };
    let spy = TransportSpy::replying(RawResponse::new(400, serde_json::to_vec(&error).unwrap()));

    let response = client(&spy, None)
        .fetch::<Json<MockModel>, Json<MockErrorModel>>(&MockTarget)
        .await
        .unwrap();

    assert_eq!(response.status, Some(400));
    assert_eq!(response.data.domain_error(), Some(&error));
    assert_eq!(spy.execute_count(), 1);
}

#[tokio::test]
async fn test_transport_failures_without_mapping() {
    for kind in TransportFailure::ALL {
        let spy = TransportSpy::replying(RawResponse::failed(kind));

        let response = client(&spy, None)
            .fetch::<Json<MockModel>, Json<MockErrorModel>>(&MockTarget)
            .await
            .unwrap();

        match response.data {
            Outcome::TransportFailure(actual) => assert_eq!(actual, kind),
            other => panic!("Expected transport failure for {:?}, got {:?}", kind, other),
        }
    }
}

#[tokio::test]
async fn test_transport_failures_with_mapping() {
    let mapping = ErrorMapping::new().on_transport_failure(|kind| Some(mapped_error(kind)));

    for kind in TransportFailure::ALL {
        let spy = TransportSpy::replying(RawResponse::failed(kind));

        let response = client(&spy, Some(mapping.clone()))
            .fetch::<Json<MockModel>, Json<MockErrorModel>>(&MockTarget)
            .await
            .unwrap();

        assert_eq!(response.data.domain_error(), Some(&mapped_error(kind)));
    }
}

#[tokio::test]
async fn test_mapping_for_other_type_is_ignored() {
    let mapping = ErrorMapping::new().on_transport_failure(|kind| Some(kind.to_string()));
    let spy = TransportSpy::replying(RawResponse::failed(TransportFailure::TimedOut));

    let response = client(&spy, Some(mapping))
        .fetch::<Json<MockModel>, Json<MockErrorModel>>(&MockTarget)
        .await
        .unwrap();

    assert!(matches!(
        response.data,
        Outcome::TransportFailure(TransportFailure::TimedOut)
    ));
}

#[tokio::test]
async fn test_spawned_call_can_be_cancelled() {
    let hold = Arc::new(Notify::new());
    let spy = Arc::new(TransportSpy {
        reply: Mutex::new(RawResponse::new(200, "{}")),
        requests: Mutex::new(Vec::new()),
        hold: Some(Arc::clone(&hold)),
    });
    let mapping = ErrorMapping::new().on_transport_failure(|kind| Some(mapped_error(kind)));

    let task = client(&spy, Some(mapping))
        .spawn::<Json<MockModel>, Json<MockErrorModel>>(&MockTarget)
        .unwrap();

    tokio::task::yield_now().await;
    assert_eq!(task.state(), TaskState::Running);

    task.cancel();
    let response = task.wait().await.unwrap();

    assert_eq!(
        response.data.domain_error(),
        Some(&mapped_error(TransportFailure::Cancelled))
    );
}

#[tokio::test]
async fn test_spawned_call_resumes_after_suspend() {
    let hold = Arc::new(Notify::new());
    let spy = Arc::new(TransportSpy {
        reply: Mutex::new(RawResponse::new(
            200,
            r#"{"id": 1, "test": "resumed"}"#,
        )),
        requests: Mutex::new(Vec::new()),
        hold: Some(Arc::clone(&hold)),
    });

    let task = client(&spy, None)
        .spawn::<Json<MockModel>, Json<MockErrorModel>>(&MockTarget)
        .unwrap();
    task.suspend();
    tokio::task::yield_now().await;
    assert_eq!(spy.execute_count(), 0);

    task.resume();
    while spy.execute_count() == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(task.state(), TaskState::Running);

    hold.notify_one();
    let response = task.wait().await.unwrap();
    assert_eq!(
        response.data.success().map(|m| m.test.as_str()),
        Some("resumed")
    );
}
