//! Full CRUD lifecycle through `ApiClient` against the live demo server.
//!
//! # Design
//! Starts the server on a random port, then exercises every route over real
//! HTTP using `UreqTransport`. Validates that the client's request building
//! and envelope normalization agree with what the endpoints emit.

use std::sync::{Arc, Mutex};

use envelope_core::{ApiClient, ApiClientConfig, MessageCode, RequestOptions, UreqTransport};
use envelope_server::Todo;
use serde_json::json;

fn spawn_server() -> std::net::SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            envelope_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

#[test]
fn crud_lifecycle() {
    // Step 1: start the server and a client that records failures.
    let addr = spawn_server();
    let failures = Arc::new(Mutex::new(Vec::new()));
    let client = {
        let failures = failures.clone();
        ApiClient::new(ApiClientConfig::new("todos", format!("http://{addr}"))).with_failure_response_callback(
            move |messages| {
                failures.lock().unwrap().extend(messages.iter().map(|m| m.code.to_string()));
                Ok(())
            },
        )
    };
    let transport = UreqTransport::new();

    // Step 2: list — should be empty.
    let listed = client.request(&transport, &RequestOptions::get("/todos"));
    assert!(listed.success());
    assert_eq!(listed.data()["todos"], json!([]));

    // Step 3: create a todo.
    let created = client.request(
        &transport,
        &RequestOptions::post("/todos").json(json!({"title": "Integration test"})),
    );
    assert!(created.success(), "{created:?}");
    let todo: Todo = serde_json::from_value(created.data()["todo"].clone()).unwrap();
    assert_eq!(todo.title, "Integration test");
    let id = todo.id;

    // Step 4: update.
    let updated = client.request(
        &transport,
        &RequestOptions::put(format!("/todos/{id}")).json(json!({"completed": true})),
    );
    assert!(updated.success());
    assert_eq!(updated.data()["todo"]["completed"], true);

    // Step 5: list with a query string the server ignores.
    let listed = client.request(
        &transport,
        &RequestOptions::get("/todos").parameters([("page", "1")]),
    );
    assert_eq!(listed.info()["count"], 1);

    // Step 6: delete.
    let deleted = client.request(&transport, &RequestOptions::delete(format!("/todos/{id}")));
    assert!(deleted.success());
    assert!(failures.lock().unwrap().is_empty());

    // Step 7: get after delete — remote failure reaches the observer.
    let missing = client.request(&transport, &RequestOptions::get(format!("/todos/{id}")));
    assert!(!missing.success());
    assert_eq!(missing.messages()[0].code, MessageCode::from("NOT_FOUND"));
    assert_eq!(*failures.lock().unwrap(), vec!["NOT_FOUND".to_string()]);

    // Step 8: unimplemented route.
    let unimplemented = client.request(&transport, &RequestOptions::post("/unimplemented"));
    assert_eq!(unimplemented.messages()[0].code.to_string(), "NOT_IMPLEMENTED");
}

#[test]
fn unreachable_server_yields_failure_envelope() {
    // Bind and drop to get a port nothing listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let client = ApiClient::new(ApiClientConfig::new("offline", format!("http://{addr}")));

    let response = client.request(&UreqTransport::new(), &RequestOptions::get("/todos"));

    assert!(!response.success());
    assert_eq!(response.messages().len(), 1);
    assert_eq!(response.messages()[0].code.to_string(), "API_ERROR");
}

#[test]
fn non_envelope_route_yields_failure_envelope() {
    // Unknown routes get axum's empty 404, which is not JSON.
    let addr = spawn_server();
    let client = ApiClient::new(ApiClientConfig::new("todos", format!("http://{addr}")));

    let response = client.request(&UreqTransport::new(), &RequestOptions::get("/nope"));

    assert!(!response.success());
    assert_eq!(response.messages()[0].code.to_string(), "API_ERROR");
}
