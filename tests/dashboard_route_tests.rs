use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
    response::Response,
};
use serde_json::{Value, json};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

async fn test_app(tag: &str) -> Router {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "platelab-routes-{tag}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    let database_url = format!("sqlite:{}", temp_path.display());
    let db = platelab::db::spawn(&database_url, true).await.unwrap();
    platelab::server::lab_router(platelab::server::LabState::new(db))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("failed to build request");
    app.clone().oneshot(req).await.expect("request failed")
}

async fn json_body(resp: Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn health_and_pages_are_served() {
    let app = test_app("pages").await;

    let resp = send(&app, "GET", "/api/health", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await, json!({ "status": "healthy" }));

    for (uri, marker) in [
        ("/", "Platelab"),
        ("/cost", "Cost Dashboard"),
        ("/growth?plate_id=1", "Growth curves"),
    ] {
        let resp = send(&app, "GET", uri, None).await;
        assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/html"), "{uri}: {content_type}");
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains(marker), "{uri}");
    }
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let app = test_app("reqid").await;

    let resp = send(&app, "GET", "/api/health", None).await;
    let generated = resp.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(generated.len(), 16);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/nope")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["x-request-id"], "abc-123");
}

#[tokio::test]
async fn plate_cost_flows_from_api_writes() {
    let app = test_app("cost").await;

    let resp = send(
        &app,
        "POST",
        "/api/reagents",
        Some(json!({ "name": "A", "concentration": 1.0, "unit": "mL", "unit_cost": 2.0 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let a = json_body(resp).await["id"].as_i64().unwrap();

    let resp = send(
        &app,
        "POST",
        "/api/reagents",
        Some(json!({ "name": "B", "concentration": 1.0, "unit": "mL", "unit_cost": 5.0 })),
    )
    .await;
    let b = json_body(resp).await["id"].as_i64().unwrap();

    let resp = send(&app, "POST", "/api/plates", Some(json!({ "label": "plate_1" }))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let plate = json_body(resp).await;
    let plate_id = plate["id"].as_i64().unwrap();
    assert_eq!(plate["well_count"], 96);

    for (well, reagent_id, quantity) in [("A1", a, 3.0), ("A2", b, 1.0)] {
        let resp = send(
            &app,
            "POST",
            &format!("/api/plates/{plate_id}/reagents"),
            Some(json!({ "well": well, "reagent_id": reagent_id, "quantity": quantity })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = send(&app, "GET", &format!("/api/plates/{plate_id}/cost"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cost = json_body(resp).await;
    assert_eq!(cost["total_cost"], 11.0);
    assert_eq!(cost["lines"].as_array().unwrap().len(), 2);

    let resp = send(&app, "GET", "/api/dashboard/cost", None).await;
    let dash = json_body(resp).await;
    assert_eq!(dash["grand_total"], 11.0);
    assert_eq!(dash["cumulative"][0]["cumulative_cost"], 11.0);
    assert_eq!(dash["reagents"][0]["reagent_name"], "A");

    let resp = send(&app, "GET", &format!("/api/plates/{plate_id}/reagents"), None).await;
    assert_eq!(json_body(resp).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn growth_posts_come_back_as_sorted_series() {
    let app = test_app("growth").await;
    let resp = send(&app, "POST", "/api/plates", Some(json!({ "label": "plate_9" }))).await;
    let plate_id = json_body(resp).await["id"].as_i64().unwrap();

    for (t, density) in [(60, 0.2), (0, 0.1), (120, 0.4)] {
        let resp = send(
            &app,
            "POST",
            &format!("/api/plates/{plate_id}/growth"),
            Some(json!({ "well": "C4", "time_index": t, "cell_density": density })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = send(&app, "GET", &format!("/api/plates/{plate_id}/growth"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let chart = json_body(resp).await;
    assert_eq!(chart["plate_label"], "plate_9");
    assert_eq!(chart["series"][0]["well"], "C4");
    let times: Vec<i64> = chart["series"][0]["points"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["time_index"].as_i64().unwrap())
        .collect();
    assert_eq!(times, vec![0, 60, 120]);
}

#[tokio::test]
async fn errors_use_the_standard_envelope() {
    let app = test_app("errors").await;

    let resp = send(&app, "GET", "/api/plates/42", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(resp).await["error"]["code"], "NOT_FOUND");

    let resp = send(&app, "GET", "/api/plates/42/cost", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // mapping onto a plate that does not exist
    let resp = send(
        &app,
        "POST",
        "/api/plates/42/reagents",
        Some(json!({ "well": "A1", "reagent_id": 1, "quantity": 1.0 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body = json_body(resp).await;
    assert_eq!(body["error"]["code"], "CONSTRAINT_VIOLATION");
    assert_eq!(body["error"]["details"]["kind"], "foreign_key");

    let resp = send(&app, "POST", "/api/plates", Some(json!({ "label": "dup" }))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let resp = send(&app, "POST", "/api/plates", Some(json!({ "label": "dup" }))).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(
        &app,
        "POST",
        "/api/plates/1/growth",
        Some(json!({ "well": "not-a-well", "time_index": 0, "cell_density": 0.1 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(&app, "POST", "/api/reagents", Some(json!({ "name": "x" }))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(resp).await["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn referenced_reagent_delete_is_a_conflict() {
    let app = test_app("delete").await;
    let resp = send(
        &app,
        "POST",
        "/api/reagents",
        Some(json!({ "name": "Tryptone", "concentration": 100.0, "unit": "g/L", "unit_cost": 0.55 })),
    )
    .await;
    let reagent_id = json_body(resp).await["id"].as_i64().unwrap();
    let resp = send(&app, "POST", "/api/plates", Some(json!({ "label": "p" }))).await;
    let plate_id = json_body(resp).await["id"].as_i64().unwrap();
    send(
        &app,
        "POST",
        &format!("/api/plates/{plate_id}/reagents"),
        Some(json!({ "well": "B2", "reagent_id": reagent_id, "quantity": 2.0 })),
    )
    .await;

    let resp = send(&app, "DELETE", &format!("/api/reagents/{reagent_id}"), None).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(&app, "DELETE", &format!("/api/plates/{plate_id}"), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = send(&app, "DELETE", &format!("/api/reagents/{reagent_id}"), None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn experiment_sheets_are_served_with_costs() {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "platelab-routes-exp-{}-{}",
        std::process::id(),
        nanos
    ));
    std::fs::create_dir_all(&dir).unwrap();
    let db = platelab::db::spawn(&format!("sqlite:{}", dir.join("lab.sqlite").display()), true)
        .await
        .unwrap();
    let app = platelab::server::lab_router(platelab::server::LabState::new(db.clone()));

    let resp = send(&app, "GET", "/api/experiments", None).await;
    assert_eq!(json_body(resp).await, json!([]));
    let resp = send(&app, "GET", "/api/experiments/1", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    send(
        &app,
        "POST",
        "/api/reagents",
        Some(json!({ "name": "Glucose", "concentration": 1.0, "unit": "g", "unit_cost": 2.0 })),
    )
    .await;
    let sheet = dir.join("exp 7.csv");
    std::fs::write(
        &sheet,
        "type,value,Units\ncell concentration,100,\ndilution,4,\nGlucose,3,g\n",
    )
    .unwrap();
    platelab::ingest::ingest_experiment_path(&db, &sheet)
        .await
        .unwrap();

    let resp = send(&app, "GET", "/api/experiments", None).await;
    let list = json_body(resp).await;
    assert_eq!(list[0]["number"], 7);
    let experiment_id = list[0]["id"].as_i64().unwrap();

    let resp = send(&app, "GET", &format!("/api/experiments/{experiment_id}"), None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cost = json_body(resp).await;
    assert_eq!(cost["dilution"], 4.0);
    assert_eq!(cost["total_cost"], 6.0);
    assert_eq!(cost["lines"][0]["reagent_name"], "Glucose");

    let resp = send(&app, "POST", "/api/plates", Some(json!({ "label": "plate_1" }))).await;
    let plate_id = json_body(resp).await["id"].as_i64().unwrap();
    let uri = format!("/api/plates/{plate_id}/experiments");

    let resp = send(
        &app,
        "POST",
        &uri,
        Some(json!({ "column_id": 2, "experiment_id": experiment_id })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = send(
        &app,
        "POST",
        &uri,
        Some(json!({ "column_id": 0, "experiment_id": experiment_id })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(
        &app,
        "POST",
        &uri,
        Some(json!({ "column_id": 5, "experiment_id": experiment_id + 1 })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = send(&app, "GET", &uri, None).await;
    let mapped = json_body(resp).await;
    assert_eq!(mapped.as_array().unwrap().len(), 1);
    assert_eq!(mapped[0]["column_id"], 2);
}
