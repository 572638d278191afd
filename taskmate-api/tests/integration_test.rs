/// Integration tests for the TaskMate API
///
/// These run the full router against a real PostgreSQL database
/// (`DATABASE_URL`) and cover:
/// - Registration seeding the default workspace
/// - Task creation, update and deletion scoped to the owner
/// - Moves: WIP limits and completion stamps
/// - Cleanup of done tasks past the retention window

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::TestContext;
use serde_json::json;
use uuid::Uuid;

async fn set_completed_hours_ago(ctx: &TestContext, task_id: &str, hours: i64) {
    let id: Uuid = task_id.parse().unwrap();
    sqlx::query("UPDATE tasks SET completed_at = $2 WHERE id = $1")
        .bind(id)
        .bind(Utc::now() - Duration::hours(hours))
        .execute(&ctx.db)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_registration_seeds_workspace() {
    let ctx = TestContext::new().await.unwrap();

    let (status, boards) = ctx.send("GET", "/api/boards", None).await;
    assert_eq!(status, StatusCode::OK);

    let slugs: Vec<&str> = boards
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, vec!["backlog", "todo", "in_progress", "done"]);
    assert_eq!(boards[2]["wip_limit"], 1);
    assert_eq!(boards[0]["taskCount"], 0);

    let (_, tags) = ctx.send("GET", "/api/tags", None).await;
    let names: Vec<&str> = tags.as_array().unwrap().iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["backend", "bug", "feature", "frontend", "urgent"]);

    let (_, users) = ctx.send("GET", "/api/users", None).await;
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["id"], ctx.user_id().to_string());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_duplicate_registration_rejected() {
    let ctx = TestContext::new().await.unwrap();

    let body = json!({
        "email": ctx.user.user.email.to_uppercase(),
        "password": "secret1",
        "name": "Someone Else",
    });
    let (status, json) = ctx.send_with_cookie("POST", "/api/auth/register", Some(body), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "User with this email already exists");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_login_and_me() {
    let ctx = TestContext::new().await.unwrap();

    let (status, json) = ctx
        .send_with_cookie(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": ctx.user.user.email, "password": "wrong-password" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Invalid email or password");

    let (status, json) = ctx.send("GET", "/api/auth/me", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user"]["email"], ctx.user.user.email);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_create_task_appends_to_board() {
    let ctx = TestContext::new().await.unwrap();

    let first = ctx.create_task("First", "todo").await;
    let second = ctx.create_task("Second", "todo").await;

    assert_eq!(first["position"], 1);
    assert_eq!(second["position"], 2);
    assert_eq!(first["priority"], "medium");
    assert!(first["completed_at"].is_null());
    assert_eq!(first["board"]["slug"], "todo");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_create_task_with_tags() {
    let ctx = TestContext::new().await.unwrap();

    let (_, tags) = ctx.send("GET", "/api/tags", None).await;
    let bug = tags.as_array().unwrap().iter().find(|t| t["name"] == "bug").unwrap()["id"].clone();
    let board_id = ctx.board_id("backlog").await;

    let (status, task) = ctx
        .send(
            "POST",
            "/api/tasks",
            Some(json!({ "title": "Fix crash", "board_id": board_id, "tag_ids": [bug] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["tags"][0]["name"], "bug");

    let (status, json) = ctx
        .send(
            "POST",
            "/api/tasks",
            Some(json!({ "title": "Bad tag", "board_id": board_id, "tag_ids": [Uuid::new_v4()] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "One or more tags do not exist");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_update_task_fields() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx.create_task("Draft", "todo").await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    let (status, updated) = ctx
        .send(
            "PUT",
            &uri,
            Some(json!({ "title": "Final", "priority": "urgent", "estimated_hours": 2.5 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Final");
    assert_eq!(updated["priority"], "urgent");
    assert_eq!(updated["estimated_hours"], 2.5);

    let (status, json) = ctx.send("PUT", &uri, Some(json!({ "unknown": true }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No valid fields to update");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_tasks_are_private_to_their_creator() {
    let owner = TestContext::new().await.unwrap();
    let intruder = TestContext::new().await.unwrap();

    let task = owner.create_task("Secret", "todo").await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    let (status, json) = intruder.send("PUT", &uri, Some(json!({ "title": "Mine now" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Task not found or access denied");

    let (status, _) = intruder.send("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, tasks) = intruder.send("GET", "/api/tasks", None).await;
    assert!(tasks.as_array().unwrap().is_empty());

    let (status, json) = owner.send("DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    owner.cleanup().await.unwrap();
    intruder.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_wip_limit_blocks_second_task() {
    let ctx = TestContext::new().await.unwrap();
    let in_progress = ctx.board_id("in_progress").await;

    let a = ctx.create_task("A", "todo").await;
    let b = ctx.create_task("B", "todo").await;

    let (status, _) = ctx
        .send(
            "POST",
            &format!("/api/tasks/{}/move", a["id"].as_str().unwrap()),
            Some(json!({ "board_id": in_progress })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = ctx
        .send(
            "POST",
            &format!("/api/tasks/{}/move", b["id"].as_str().unwrap()),
            Some(json!({ "board_id": in_progress })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "WIP limit reached for board In Progress (1/1)");

    // Reordering within the full board is not a new arrival
    let (status, _) = ctx
        .send(
            "POST",
            &format!("/api/tasks/{}/move", a["id"].as_str().unwrap()),
            Some(json!({ "board_id": in_progress, "position": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_done_board_stamps_and_clears_completion() {
    let ctx = TestContext::new().await.unwrap();
    let done = ctx.board_id("done").await;
    let todo = ctx.board_id("todo").await;
    let task = ctx.create_task("Ship", "todo").await;
    let move_uri = format!("/api/tasks/{}/move", task["id"].as_str().unwrap());

    let (_, moved) = ctx.send("POST", &move_uri, Some(json!({ "board_id": done }))).await;
    assert!(moved["completed_at"].is_string());
    assert_eq!(moved["board"]["slug"], "done");

    // Update with a board change follows the same rules
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());
    let (status, reopened) = ctx.send("PUT", &uri, Some(json!({ "board_id": todo }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(reopened["completed_at"].is_null());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_cleanup_deletes_only_stale_done_tasks() {
    let ctx = TestContext::new().await.unwrap();
    let done = ctx.board_id("done").await;

    let stale = ctx.create_task("Stale", "todo").await;
    let recent = ctx.create_task("Recent", "todo").await;
    ctx.create_task("Open", "todo").await;

    for task in [&stale, &recent] {
        ctx.send(
            "POST",
            &format!("/api/tasks/{}/move", task["id"].as_str().unwrap()),
            Some(json!({ "board_id": done })),
        )
        .await;
    }
    set_completed_hours_ago(&ctx, stale["id"].as_str().unwrap(), 50).await;
    set_completed_hours_ago(&ctx, recent["id"].as_str().unwrap(), 10).await;

    let (status, json) = ctx.send("GET", "/api/cleanup", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stats"]["tasksToDelete"], 1);
    assert_eq!(json["stats"]["oldestTask"]["title"], "Stale");

    let (status, json) = ctx.send("POST", "/api/cleanup", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["deletedCount"], 1);
    assert_eq!(json["deletedTasks"][0]["title"], "Stale");
    assert_eq!(json["message"], "Successfully deleted 1 old tasks");

    let (_, tasks) = ctx.send("GET", "/api/tasks", None).await;
    let titles: Vec<&str> = tasks.as_array().unwrap().iter().map(|t| t["title"].as_str().unwrap()).collect();
    assert!(titles.contains(&"Recent"));
    assert!(titles.contains(&"Open"));
    assert!(!titles.contains(&"Stale"));

    // Nothing left to delete
    let (_, json) = ctx.send("POST", "/api/cleanup", None).await;
    assert_eq!(json["deletedCount"], 0);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_cron_cleanup_with_session() {
    let ctx = TestContext::new().await.unwrap();

    let (status, json) = ctx.send("POST", "/api/cron/cleanup", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "Cleanup completed successfully");
    assert_eq!(json["deletedCount"], 0);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires running PostgreSQL instance
async fn test_logout_revokes_session() {
    let ctx = TestContext::new().await.unwrap();

    let (status, _) = ctx.send("POST", "/api/auth/logout", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = ctx.send("GET", "/api/tasks", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Invalid session");

    ctx.cleanup().await.unwrap();
}
