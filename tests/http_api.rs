//! HTTP round trips against an in-process server.

mod common;
use common::{TestClient, TestServer, admin, member, moderator};
use reqwest::StatusCode;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn report_to_overturned_appeal_over_http() {
    let server = TestServer::spawn().await.unwrap();
    let community = Uuid::new_v4();
    let author = Uuid::new_v4();
    let post = Uuid::new_v4();

    let root = TestClient::new(&server, admin());
    let (status, _) = root
        .put(
            &format!("/content/post/{post}"),
            json!({ "author_id": author, "community_id": community }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    let reporter = TestClient::new(&server, member(Uuid::new_v4()));
    let (status, report) = reporter
        .post(
            "/reports",
            json!({ "post_id": post, "violation_category": "spam" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(report["severity_level"], "medium");
    assert_eq!(report["status"], "pending");

    let (status, body) = reporter
        .post(
            "/reports",
            json!({ "post_id": post, "violation_category": "spam" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict_error");

    let m = TestClient::new(&server, moderator(community));
    let (status, action) = m
        .post(
            "/actions",
            json!({
                "post_id": post,
                "scope": "community",
                "reason_category": "spam",
                "reason_text": "Advertising",
                "report_id": report["id"],
            }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(action["status"], "completed");

    let (status, state) = m
        .get(&format!("/content/post/{post}/state"))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["removed"], true);

    let appellant = TestClient::new(&server, member(author));
    let (status, appeal) = appellant
        .post(
            "/appeals",
            json!({
                "moderation_action_id": action["id"],
                "appeal_type": "content_removal",
                "appeal_text": "Not an advert",
            }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(appeal["status"], "pending");
    assert_eq!(appeal["is_escalated"], false);

    let appeal_id = appeal["id"].as_str().unwrap().to_string();
    let (status, resolved) = root
        .post(
            &format!("/appeals/{appeal_id}/resolve"),
            json!({ "decision": "overturn", "decision_explanation": "Legitimate post" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["id"], appeal["id"]);
    assert_eq!(resolved["status"], "overturned");
    assert_eq!(resolved["decision_explanation"], "Legitimate post");
    assert!(resolved["reviewed_at"].is_string());

    let action_id = action["id"].as_str().unwrap().to_string();
    let (status, sanction) = root
        .get(&format!("/sanctions/moderation_action/{action_id}"))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sanction["is_active"], false);

    let (status, body) = root
        .post(
            &format!("/appeals/{appeal_id}/resolve"),
            json!({ "decision": "uphold", "decision_explanation": "Again" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict_error");

    let (status, trail) = root
        .get(&format!("/audit/appeal/{appeal_id}"))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<_> = trail
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(actions, ["appeal.submitted", "appeal.resolved"]);
    assert_eq!(trail[1]["detail"], "overturn");

    let (status, _) = m.get(&format!("/audit/appeal/{appeal_id}")).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn error_statuses_follow_taxonomy() {
    let server = TestServer::spawn().await.unwrap();
    let someone = TestClient::new(&server, member(Uuid::new_v4()));

    // Both and neither target fields.
    let (status, body) = someone
        .post(
            "/reports",
            json!({
                "post_id": Uuid::new_v4(),
                "comment_id": Uuid::new_v4(),
                "violation_category": "spam",
            }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");

    let (status, _) = someone
        .post("/reports", json!({ "violation_category": "spam" }))
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown content.
    let (status, body) = someone
        .post(
            "/reports",
            json!({ "topic_id": Uuid::new_v4(), "violation_category": "threats" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found_error");

    // Members cannot suspend.
    let (status, body) = someone
        .post(
            "/suspensions",
            json!({
                "user_id": Uuid::new_v4(),
                "reason_category": "spam",
                "reason_text": "nope",
                "is_permanent": true,
            }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "authorization_error");

    // Permanent with an expiration.
    let root = TestClient::new(&server, admin());
    let (status, _) = root
        .post(
            "/suspensions",
            json!({
                "user_id": Uuid::new_v4(),
                "reason_category": "spam",
                "reason_text": "bot",
                "is_permanent": true,
                "expiration_date": "2099-01-01T00:00:00Z",
            }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rate_limit_over_http() {
    let server = TestServer::spawn().await.unwrap();
    let community = Uuid::new_v4();
    let reporter = TestClient::new(&server, member(Uuid::new_v4()));

    for i in 0..11 {
        let target = server
            .harness
            .post(Uuid::new_v4(), community)
            .await;
        let (status, body) = reporter
            .post(
                "/reports",
                json!({ "post_id": target.id(), "violation_category": "off_topic" }),
            )
            .await
            .unwrap();
        if i < 10 {
            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(body["severity_level"], "low");
        } else {
            assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
            assert_eq!(body["kind"], "rate_limit_error");
        }
    }
}

#[tokio::test]
async fn missing_identity_is_forbidden() {
    let server = TestServer::spawn().await.unwrap();
    let response = reqwest::Client::new()
        .get(server.url(&format!("/appeals/{}", Uuid::new_v4())))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn metrics_are_exposed() {
    sanctiond::metrics::init();
    let server = TestServer::spawn().await.unwrap();
    let someone = TestClient::new(&server, member(Uuid::new_v4()));
    let (status, _) = someone
        .post(
            "/reports",
            json!({ "reply_id": Uuid::new_v4(), "violation_category": "doxxing" }),
        )
        .await
        .unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);

    let response = reqwest::get(server.url("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = response.text().await.unwrap();
    assert!(text.contains("moderation_rejections_total"));
    assert!(text.contains("moderation_operation_duration_seconds"));
}
