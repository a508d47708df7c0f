use std::time::Duration;

use reqwest::StatusCode;
use riptide::{
    ContentTypeValidator,
    NetworkError,
    NetworkingBuilder,
    Request,
    StatusCodeValidator,
    StorePolicy,
    init_db,
};
use serde::Deserialize;
use tempfile::tempdir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    id: u32,
    name: String,
}

#[tokio::test]
async fn test_conditional_get_against_real_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("page", "1"))
        .and(header("If-None-Match", "\"abc\""))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"abc\"")
                .set_body_json(serde_json::json!([{"id": 1, "name": "anchor"}])),
        )
        .with_priority(2)
        .mount(&mock_server)
        .await;

    let temp_dir = tempdir().unwrap();
    let networking = NetworkingBuilder::new()
        .base_url(&mock_server.uri())
        .unwrap()
        .max_retries(0)
        .build(init_db(temp_dir.path().join("riptide.db")).unwrap())
        .unwrap();

    let request = Request::get("/items").parameter("page", 1);
    let items: Vec<Item> = networking
        .execute(request.clone())
        .validate(&ContentTypeValidator::new(["application/json"]))
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(
        items,
        vec![Item {
            id: 1,
            name: "anchor".to_string()
        }]
    );

    let wave = networking.execute(request).await.unwrap();
    assert_eq!(wave.status(), StatusCode::NOT_MODIFIED);

    // Not modified is outside the default acceptable range
    let result = networking
        .execute(Request::get("/items").parameter("page", 1))
        .validate(&StatusCodeValidator::default())
        .await;
    assert_eq!(result, Err(NetworkError::UnacceptableStatusCode(304)));
}

#[tokio::test]
async fn test_unreachable_server_then_replay() {
    // Reserve a port, then free it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("riptide.db");
    let request = Request::post("/events")
        .parameter("kind", "login")
        .store_policy(StorePolicy::Offline);

    {
        let offline = NetworkingBuilder::new()
            .base_url(&format!("http://127.0.0.1:{}", port))
            .unwrap()
            .max_retries(0)
            .timeout(Duration::from_secs(5))
            .build(init_db(&db_path).unwrap())
            .unwrap();

        let result = offline.execute(request.clone()).await;
        assert!(matches!(result, Err(NetworkError::Offline(_))), "got {:?}", result);
        assert!(offline.offline_requests().contains(&request.key()).await.unwrap());
    }

    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/events"))
        .and(body_json(serde_json::json!({"kind": "login"})))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let online = NetworkingBuilder::new()
        .base_url(&mock_server.uri())
        .unwrap()
        .max_retries(0)
        .build(init_db(&db_path).unwrap())
        .unwrap();

    let wave = online.replay().await.unwrap().unwrap();
    assert_eq!(wave.status(), StatusCode::CREATED);
    assert_eq!(wave.text().unwrap(), "created");
    assert!(online.offline_requests().is_empty().await.unwrap());
}
