mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use todo_shared::{Task, TaskBoard};

use common::*;

#[tokio::test]
async fn buy_milk_lifecycle() {
    let h = Harness::new();
    let app = h.authed();

    let created = create(&app, "buy milk").await;
    assert_eq!(created["text"], "buy milk");
    assert_eq!(created["completed"], false);
    let id = created["id"].as_str().unwrap().to_string();

    let tasks = list(&app).await;
    assert_eq!(tasks, vec![created.clone()]);

    let resp = send(
        &app,
        json_request(Method::PUT, &format!("/api/tasks/{id}"), json!({"completed": true})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_eq!(updated["completed"], true);
    assert_eq!(updated["text"], "buy milk");
    assert_eq!(updated["id"], id.as_str());

    let resp = send(&app, request(Method::DELETE, &format!("/api/tasks/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(list(&app).await.is_empty());
}

#[tokio::test]
async fn create_honours_explicit_completed() {
    let h = Harness::new();
    let app = h.authed();

    let resp = send(
        &app,
        json_request(Method::POST, "/api/tasks", json!({"text": "done already", "completed": true})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let task: Task = serde_json::from_value(body_json(resp).await).unwrap();
    assert!(task.completed);

    let tasks = list(&app).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], task.id.to_string());
}

#[tokio::test]
async fn list_keeps_insertion_order() {
    let h = Harness::new();
    let app = h.authed();

    for text in ["one", "two", "three"] {
        create(&app, text).await;
    }
    let texts: Vec<_> = list(&app)
        .await
        .into_iter()
        .map(|t| t["text"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(texts, ["one", "two", "three"]);
}

#[tokio::test]
async fn toggle_twice_round_trips() {
    let h = Harness::new();
    let app = h.authed();
    let id = create(&app, "flip").await["id"].as_str().unwrap().to_string();
    let uri = format!("/api/tasks/{id}");

    for expected in [true, false] {
        let resp = send(&app, json_request(Method::PUT, &uri, json!({"completed": expected}))).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&app, request(Method::GET, &uri)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["completed"], expected);
    }
}

#[tokio::test]
async fn update_text_only() {
    let h = Harness::new();
    let app = h.authed();
    let id = create(&app, "typo").await["id"].as_str().unwrap().to_string();

    let resp = send(
        &app,
        json_request(Method::PUT, &format!("/api/tasks/{id}"), json!({"text": "fixed"})),
    )
    .await;
    let task = body_json(resp).await;
    assert_eq!(task["text"], "fixed");
    assert_eq!(task["completed"], false);
}

#[tokio::test]
async fn update_unknown_id_is_not_found() {
    let h = Harness::new();
    let app = h.authed();
    let missing = uuid::Uuid::new_v4();

    let resp = send(
        &app,
        json_request(Method::PUT, &format!("/api/tasks/{missing}"), json!({"completed": true})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains(&missing.to_string()));

    let resp = send(&app, request(Method::GET, &format!("/api/tasks/{missing}"))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let h = Harness::new();
    let app = h.authed();
    let id = create(&app, "gone").await["id"].as_str().unwrap().to_string();
    let uri = format!("/api/tasks/{id}");

    for _ in 0..2 {
        let resp = send(&app, request(Method::DELETE, &uri)).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
    assert!(list(&app).await.is_empty());
}

#[tokio::test]
async fn delete_all_empties_list() {
    let h = Harness::new();
    let app = h.authed();
    for i in 0..4 {
        create(&app, &format!("task {i}")).await;
    }

    let resp = send(&app, request(Method::DELETE, "/api/tasks")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(list(&app).await.is_empty());

    let resp = send(&app, request(Method::DELETE, "/api/tasks")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn malformed_input_is_rejected_without_side_effects() {
    let h = Harness::new();
    let app = h.authed();

    let resp = send(&app, json_request(Method::POST, "/api/tasks", json!({"completed": true}))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(resp).await["error"].is_string());

    let resp = send(&app, request(Method::POST, "/api/tasks")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = send(
        &app,
        json_request(Method::PUT, "/api/tasks/not-a-uuid", json!({"completed": true})),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert!(h.store.is_empty());
}

#[tokio::test]
async fn unauthenticated_requests_never_touch_the_store() {
    let h = Harness::new();
    let authed = h.authed();
    let anonymous = h.anonymous();

    let existing = create(&authed, "keep me").await["id"].as_str().unwrap().to_string();
    let one = format!("/api/tasks/{existing}");

    let attempts = [
        json_request(Method::POST, "/api/tasks", json!({"text": "sneaky"})),
        json_request(Method::PUT, &one, json!({"completed": true})),
        request(Method::DELETE, &one),
        request(Method::DELETE, "/api/tasks"),
        request(Method::GET, "/api/tasks"),
        request(Method::GET, &one),
    ];
    for req in attempts {
        let resp = send(&anonymous, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["error"], "not authenticated");
    }

    let tasks = list(&authed).await;
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["text"], "keep me");
    assert_eq!(tasks[0]["completed"], false);
}

#[tokio::test]
async fn clear_completed_leaves_only_pending() {
    let h = Harness::new();
    let app = h.authed();

    let a: Task = serde_json::from_value(create(&app, "A").await).unwrap();
    let b: Task = serde_json::from_value(create(&app, "B").await).unwrap();
    let resp = send(
        &app,
        json_request(Method::PUT, &format!("/api/tasks/{}", a.id), json!({"completed": true})),
    )
    .await;
    let a: Task = serde_json::from_value(body_json(resp).await).unwrap();

    let mut board = TaskBoard::new(vec![a, b.clone()]);
    for id in board.take_completed() {
        let resp = send(&app, request(Method::DELETE, &format!("/api/tasks/{id}"))).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    assert_eq!(board.tasks(), &[b.clone()]);
    let server: Vec<Task> = list(&app)
        .await
        .into_iter()
        .map(|v| serde_json::from_value(v).unwrap())
        .collect();
    assert_eq!(server, vec![b]);
}
