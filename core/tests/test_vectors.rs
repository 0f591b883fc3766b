//! Verify build/parse methods against JSON test vectors stored in
//! `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results. Comparing parsed values (not raw strings)
//! avoids false negatives from field-ordering differences; update vectors
//! drive the dirty-diff codec through real setter calls.

use dashku_core::{
    Dashboard, DashkuApi, DashkuError, DomainObject, HttpMethod, HttpResponse, ScreenWidth,
};

const BASE_URL: &str = "http://dashku:3000";
const API_KEY: &str = "k1";

fn api() -> DashkuApi {
    DashkuApi::new(BASE_URL, API_KEY)
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn simulated(case: &serde_json::Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        headers: Vec::new(),
        body: sim["body"].as_str().unwrap_or("").to_string(),
    }
}

fn assert_request(case_name: &str, req: &dashku_core::HttpRequest, expected: &serde_json::Value) {
    assert_eq!(
        req.method,
        parse_method(expected["method"].as_str().unwrap()),
        "{case_name}: method"
    );
    assert_eq!(
        req.path,
        format!("{BASE_URL}{}", expected["path"].as_str().unwrap()),
        "{case_name}: path"
    );
    if let Some(expected_body) = expected.get("body") {
        let req_body: serde_json::Value =
            serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(&req_body, expected_body, "{case_name}: body");
    } else {
        assert!(req.body.is_none(), "{case_name}: body should be None");
    }
}

/// Apply the vector's `set` map through real setters so the dirty set drives
/// the diff exactly like production code.
fn apply_setters(dashboard: &mut Dashboard, set: &serde_json::Value) {
    for (field, value) in set.as_object().unwrap() {
        match field.as_str() {
            "name" => dashboard.set_name(value.as_str().unwrap()),
            "css" => dashboard.set_css(value.as_str().unwrap()),
            "screenWidth" => {
                let screen_width: ScreenWidth = serde_json::from_value(value.clone()).unwrap();
                dashboard.set_screen_width(screen_width);
            }
            other => panic!("unknown settable field: {other}"),
        }
    }
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

#[test]
fn list_test_vectors() {
    let raw = include_str!("../../test-vectors/list.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let api = api();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();

        let req = api.build_get_dashboards();
        assert_request(name, &req, &case["expected_request"]);

        let dashboards = api.parse_dashboards(simulated(case)).unwrap();
        let expected: Vec<Dashboard> =
            serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(dashboards, expected, "{name}: parsed result");
    }
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

#[test]
fn get_test_vectors() {
    let raw = include_str!("../../test-vectors/get.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let api = api();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let id = case["input_id"].as_str().unwrap();

        let req = api.build_get_dashboard(id);
        assert_request(name, &req, &case["expected_request"]);

        let result = api.parse_dashboard(simulated(case));
        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            match expected_error.as_str().unwrap() {
                "NotFound" => {
                    assert!(matches!(err, DashkuError::NotFound), "{name}: expected NotFound")
                }
                other => panic!("{name}: unknown expected_error: {other}"),
            }
        } else {
            let dashboard = result.unwrap();
            let expected: Dashboard =
                serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(dashboard, expected, "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[test]
fn create_test_vectors() {
    let raw = include_str!("../../test-vectors/create.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let api = api();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let mut dashboard = Dashboard::new();
        apply_setters(&mut dashboard, &case["input"]);

        let req = api.build_create_dashboard(&dashboard).unwrap();
        assert_request(name, &req, &case["expected_request"]);
        let expected_headers: Vec<(String, String)> = case["expected_request"]["headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let pair = h.as_array().unwrap();
                (
                    pair[0].as_str().unwrap().to_string(),
                    pair[1].as_str().unwrap().to_string(),
                )
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");

        let created = api.parse_created_dashboard(simulated(case)).unwrap();
        let expected: Dashboard = serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(created, expected, "{name}: parsed result");
        assert!(created.dirty().is_empty(), "{name}: created object is clean");
    }
}

// ---------------------------------------------------------------------------
// Update (dirty diff)
// ---------------------------------------------------------------------------

#[test]
fn update_test_vectors() {
    let raw = include_str!("../../test-vectors/update.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let api = api();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let mut dashboard: Dashboard =
            serde_json::from_value(case["existing"].clone()).unwrap();
        assert!(dashboard.dirty().is_empty(), "{name}: loaded object is clean");
        apply_setters(&mut dashboard, &case["set"]);

        let req = api.build_update_dashboard(&dashboard).unwrap();
        assert_request(name, &req, &case["expected_request"]);

        let updated = api.parse_updated_dashboard(simulated(case)).unwrap();
        let expected: Dashboard = serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(updated, expected, "{name}: parsed result");
    }
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[test]
fn delete_test_vectors() {
    let raw = include_str!("../../test-vectors/delete.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let api = api();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let id = case["input_id"].as_str().unwrap();

        let req = api.build_delete_dashboard(id);
        assert_request(name, &req, &case["expected_request"]);

        let result = api.parse_deleted(simulated(case));
        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            match expected_error.as_str().unwrap() {
                "NotFound" => {
                    assert!(matches!(err, DashkuError::NotFound), "{name}: expected NotFound")
                }
                other => panic!("{name}: unknown expected_error: {other}"),
            }
        } else {
            assert!(result.is_ok(), "{name}: expected success");
        }
    }
}

// ---------------------------------------------------------------------------
// Transmit
// ---------------------------------------------------------------------------

#[test]
fn transmit_test_vectors() {
    let raw = include_str!("../../test-vectors/transmit.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let api = api();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let id = case["input_id"].as_str().unwrap();
        let payload = case["payload"].clone();

        let built = api.build_transmit(id, &payload);
        if let Some(expected_error) = case.get("expected_build_error") {
            let err = built.unwrap_err();
            match expected_error.as_str().unwrap() {
                "Encoding" => {
                    assert!(matches!(err, DashkuError::Encoding(_)), "{name}: expected Encoding")
                }
                other => panic!("{name}: unknown expected_build_error: {other}"),
            }
            continue;
        }

        let req = built.unwrap();
        assert_request(name, &req, &case["expected_request"]);
        assert!(api.parse_transmitted(simulated(case)).is_ok(), "{name}: expected success");
    }
}
