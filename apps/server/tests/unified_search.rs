mod support;

use axum::http::StatusCode;
use serde_json::json;
use support::{hit, search_response, TestApp};

#[tokio::test]
async fn unified_search_normalizes_hits_across_types() -> anyhow::Result<()> {
    let app = TestApp::new();
    app.backend.set_response(search_response(
        vec![
            hit("dataset", "d1", json!({"title": "Rain", "description": "mm"})),
            hit("usecase", "u1", json!({"title": "Flood watch", "summary": "alerts"})),
            hit(
                "aimodel",
                "m1",
                json!({"display_name": "Crop LLM", "created_at": "2024-01-01"}),
            ),
        ],
        3,
        json!({
            "types": { "buckets": [
                { "key": "dataset", "doc_count": 1 },
                { "key": "aimodel", "doc_count": 1 }
            ] }
        }),
    ));

    let (status, body) = app.get_json("/api/search/unified?query=rain").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["types_searched"], json!(["dataset", "usecase", "aimodel"]));

    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["type"], "dataset");
    assert_eq!(results[1]["type"], "usecase");
    assert_eq!(results[1]["description"], "alerts");
    assert_eq!(results[2]["type"], "aimodel");
    assert_eq!(results[2]["title"], "Crop LLM");
    assert_eq!(results[2]["created"], "2024-01-01");

    assert_eq!(body["aggregations"]["types"]["dataset"], 1);
    assert_eq!(body["aggregations"]["types"]["aimodel"], 1);

    assert_eq!(
        app.backend.calls()[0].0,
        vec![
            "dataset".to_string(),
            "usecase".to_string(),
            "aimodel".to_string()
        ]
    );
    Ok(())
}

#[tokio::test]
async fn types_restrict_the_searched_indices() -> anyhow::Result<()> {
    let app = TestApp::new();

    let (status, body) = app
        .get_json("/api/search/unified?types=usecase,publisher")
        .await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["types_searched"], json!(["usecase"]));
    assert_eq!(app.backend.calls()[0].0, vec!["usecase".to_string()]);
    Ok(())
}

#[tokio::test]
async fn no_valid_types_skips_the_backend() -> anyhow::Result<()> {
    let app = TestApp::new();

    let (status, body) = app.get_json("/api/search/unified?types=spaceship").await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 0);
    assert_eq!(body["results"], json!([]));
    assert_eq!(body["types_searched"], json!([]));
    assert_eq!(app.backend.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn entity_search_omits_types_searched() -> anyhow::Result<()> {
    let app = TestApp::new();

    let (_, body) = app.get_json("/api/search/dataset").await?;

    assert!(body.get("types_searched").is_none());
    Ok(())
}
