//! Verify request building and response normalization against the JSON test
//! vectors stored in `test-vectors/`.
//!
//! Comparing parsed JSON (not raw strings) avoids false negatives from
//! field-ordering differences.

use std::sync::{Arc, Mutex};

use envelope_core::{
    ApiClient, ApiClientConfig, CredentialsMode, HttpBody, HttpMethod, HttpRequest, HttpResponse, Message,
    Parameters, RequestOptions, TransportError,
};

fn string_pairs(value: &serde_json::Value) -> Vec<(String, String)> {
    value
        .as_array()
        .map(|pairs| {
            pairs
                .iter()
                .map(|pair| {
                    let arr = pair.as_array().unwrap();
                    (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Build `RequestOptions` from a vector's `options` object.
fn options_from(case: &serde_json::Value) -> RequestOptions {
    let method: HttpMethod = case["method"].as_str().unwrap().parse().unwrap();
    let mut options = RequestOptions::new(case["endpoint"].as_str().unwrap()).method(method);
    if let Some(raw) = case.get("raw_parameters") {
        options = options.parameters(raw.as_str().unwrap());
    } else if case.get("parameters").is_some() {
        options = options.parameters(Parameters::Pairs(string_pairs(&case["parameters"])));
    }
    if let Some(mode) = case.get("credentials") {
        let mode: CredentialsMode = serde_json::from_value(mode.clone()).unwrap();
        options = options.credentials(mode);
    }
    for (name, value) in string_pairs(&case["headers"]) {
        options = options.header(name, value);
    }
    if let Some(body) = case.get("body") {
        options = options.json(body.clone());
    }
    options
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/request.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let client = ApiClient::new(ApiClientConfig::new("vectors", vectors["base_url"].as_str().unwrap()));
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let expected = &case["expected_request"];

        let req = client.build_request(&options_from(&case["options"])).unwrap();
        assert_eq!(req.method.as_str(), expected["method"].as_str().unwrap(), "{name}: method");
        assert_eq!(req.url, expected["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(req.credentials.as_str(), expected["credentials"].as_str().unwrap(), "{name}: credentials");
        assert_eq!(req.headers, string_pairs(&expected["headers"]), "{name}: headers");

        match (&req.body, &expected["body"]) {
            (None, serde_json::Value::Null) => {}
            (Some(HttpBody::Json(text)), expected_body) => {
                let body: serde_json::Value = serde_json::from_str(text).unwrap();
                assert_eq!(&body, expected_body, "{name}: body");
            }
            (other, expected_body) => panic!("{name}: body {other:?} does not match {expected_body}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/response.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();
    let failure_message: Message = serde_json::from_value(vectors["failure_message"].clone()).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["simulated_response"];
        let status = sim["status"].as_u64().unwrap() as u16;
        let body = sim["body"].as_str().unwrap().to_string();

        let notified = Arc::new(Mutex::new(false));
        let client = {
            let notified = notified.clone();
            ApiClient::new(ApiClientConfig::new("vectors", "http://localhost:3000").with_failure_message(failure_message.clone()))
                .with_failure_response_callback(move |_| {
                    *notified.lock().unwrap() = true;
                    Ok(())
                })
        };
        let transport = move |_: HttpRequest| -> Result<HttpResponse, TransportError> {
            Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.clone(),
            })
        };

        let envelope = client.request(&transport, &RequestOptions::get("/anything"));
        assert_eq!(envelope.to_value(), case["expected_envelope"], "{name}: envelope");
        assert_eq!(
            *notified.lock().unwrap(),
            case["expect_observers"].as_bool().unwrap(),
            "{name}: observers"
        );
    }
}
