//! End-to-end flows against the in-memory backend.
//!
//! Run with: cargo test -p thrive-server --test api_flow

mod common;

use common::TestServer;
use serde_json::{Value, json};

#[tokio::test]
async fn health_and_unknown_routes() {
    let server = TestServer::start().await;

    let (status, body) = server.get(None, "/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["backend"], "memory");

    let (status, body) = server.get(None, "/nope").await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);

    let (status, body) = server.post(None, "/init-db", json!({})).await;
    assert_eq!(status, 200);
    assert!(body["data"]["migrations"].is_array());

    server.stop().await;
}

#[tokio::test]
async fn register_login_and_profile() {
    let server = TestServer::start().await;
    let (token, _) = server.register("ana@example.com", "Ana").await;

    let dup = server
        .post(
            None,
            "/api/auth/register",
            json!({"email": "ANA@example.com", "password": "correct-horse-9"}),
        )
        .await;
    assert_eq!(dup.0, 409);

    let (status, _) = server
        .post(
            None,
            "/api/auth/login",
            json!({"email": "ana@example.com", "password": "wrong-password"}),
        )
        .await;
    assert_eq!(status, 401);

    let (status, body) = server.get(Some(&token), "/api/auth/me").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["email"], "ana@example.com");
    assert!(body["data"].get("passwordHash").is_none());

    let (status, body) = server
        .patch(
            &token,
            "/api/auth/me",
            json!({"displayName": "Ana M", "utcOffsetMinutes": 120,
                   "preferences": {"dailyFocusGoalMinutes": 90}}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["displayName"], "Ana M");
    assert_eq!(body["data"]["preferences"]["dailyFocusGoalMinutes"], 90);

    let (status, _) = server.get(None, "/api/auth/me").await;
    assert_eq!(status, 401);
    let (status, _) = server.get(Some("garbage"), "/api/tasks").await;
    assert_eq!(status, 401);

    server.stop().await;
}

#[tokio::test]
async fn otp_login_creates_account_once() {
    let server = TestServer::start().await;
    let email = "otp@example.com";

    let (status, body) = server
        .post(None, "/api/auth/otp/request", json!({"email": email}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["sent"], true);

    let (status, _) = server
        .post(None, "/api/auth/otp/request", json!({"email": email}))
        .await;
    assert_eq!(status, 429, "resend inside the cooldown");

    let (status, _) = server
        .post(None, "/api/auth/otp/verify", json!({"email": email, "code": "000000x"}))
        .await;
    assert_eq!(status, 401);

    let code = server.otp.code_for(email).expect("code was sent");
    let (status, body) = server
        .post(None, "/api/auth/otp/verify", json!({"email": email, "code": code}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["created"], true);
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = server
        .post(None, "/api/auth/otp/verify", json!({"email": email, "code": code}))
        .await;
    assert_eq!(status, 401, "codes are single use");

    let (status, body) = server.get(Some(&token), "/api/auth/me").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["email"], email);

    server.stop().await;
}

#[tokio::test]
async fn tasks_are_isolated_per_user_and_unlock_badges() {
    let server = TestServer::start().await;
    let (ana, _) = server.register("ana@example.com", "Ana").await;
    let (ben, _) = server.register("ben@example.com", "Ben").await;

    let (status, body) = server
        .post(
            Some(&ana),
            "/api/tasks",
            json!({"title": "Write report", "priority": "high", "tags": ["Work", "work"]}),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(body["data"]["tags"], json!(["work"]));
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = server.get(Some(&ben), &format!("/api/tasks/{id}")).await;
    assert_eq!(status, 404);
    let (_, body) = server.get(Some(&ben), "/api/tasks").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (status, body) = server
        .post(Some(&ana), &format!("/api/tasks/{id}/complete"), json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["task"]["status"], "done");
    let unlocked: Vec<&str> = body["data"]["unlockedBadges"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|b| b["id"].as_str())
        .collect();
    assert!(unlocked.contains(&"first-task"));

    let (_, body) = server.get(Some(&ana), "/api/badges").await;
    let first = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["id"] == "first-task")
        .cloned()
        .unwrap();
    assert_eq!(first["unlocked"], true);

    let (_, body) = server.get(Some(&ana), "/api/notifications/unread-count").await;
    assert!(body["data"]["unread"].as_u64().unwrap() >= 1);

    let (status, _) = server.delete(&ben, &format!("/api/tasks/{id}")).await;
    assert_eq!(status, 404);
    let (status, body) = server.delete(&ana, &format!("/api/tasks/{id}")).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["deleted"], true);
    let (status, _) = server.get(Some(&ana), &format!("/api/tasks/{id}")).await;
    assert_eq!(status, 404);

    server.stop().await;
}

#[tokio::test]
async fn task_validation_errors() {
    let server = TestServer::start().await;
    let (token, _) = server.register("ana@example.com", "Ana").await;

    let (status, body) = server.post(Some(&token), "/api/tasks", json!({"title": "   "})).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);

    let (status, _) = server
        .post(Some(&token), "/api/tasks", json!({"title": "x", "priority": "someday"}))
        .await;
    assert_eq!(status, 400);

    let (status, _) = server.get(Some(&token), "/api/tasks?status=sideways").await;
    assert_eq!(status, 400);

    let (status, _) = server.get(Some(&token), "/api/tasks/not-a-uuid").await;
    assert_eq!(status, 400);

    server.stop().await;
}

#[tokio::test]
async fn focus_session_lifecycle() {
    let server = TestServer::start().await;
    let (token, _) = server.register("ana@example.com", "Ana").await;

    let (status, body) = server.get(None, "/api/focus/templates").await;
    assert_eq!(status, 200);
    assert!(body["data"].as_array().unwrap().iter().any(|t| t["id"] == "pomodoro"));

    let (status, body) = server
        .post(Some(&token), "/api/focus/sessions", json!({"templateId": "pomodoro"}))
        .await;
    assert_eq!(status, 201);
    assert_eq!(body["data"]["plannedMinutes"], 25);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = server
        .post(Some(&token), "/api/focus/sessions", json!({"plannedMinutes": 10}))
        .await;
    assert_eq!(status, 409, "one active session at a time");

    let (status, body) = server
        .post(
            Some(&token),
            &format!("/api/focus/sessions/{id}/complete"),
            json!({"actualMinutes": 25}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["session"]["status"], "completed");

    let (status, _) = server
        .post(Some(&token), &format!("/api/focus/sessions/{id}/abandon"), json!({}))
        .await;
    assert_eq!(status, 409);

    let (_, body) = server.get(Some(&token), "/api/focus/stats?days=7").await;
    assert_eq!(body["data"]["completed"], 1);
    assert_eq!(body["data"]["totalMinutes"], 25);

    server.stop().await;
}

#[tokio::test]
async fn health_logs_and_summary() {
    let server = TestServer::start().await;
    let (token, _) = server.register("ana@example.com", "Ana").await;

    for value in [250.0, 500.0] {
        let (status, body) = server
            .post(Some(&token), "/api/health/logs", json!({"metric": "water", "value": value}))
            .await;
        assert_eq!(status, 201);
        assert_eq!(body["data"]["unit"], "ml");
    }
    let (status, _) = server
        .post(Some(&token), "/api/health/logs", json!({"metric": "water", "value": -1}))
        .await;
    assert_eq!(status, 400);

    let (_, body) = server.get(Some(&token), "/api/health/summary?days=1").await;
    let water = body["data"]["metrics"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["metric"] == "water")
        .cloned()
        .unwrap();
    assert_eq!(water["count"], 2);

    server.stop().await;
}

#[tokio::test]
async fn friendship_and_leaderboard() {
    let server = TestServer::start().await;
    let (ana, _) = server.register("ana@example.com", "Ana").await;
    let (ben, _) = server.register("ben@example.com", "Ben").await;

    let (status, _) = server
        .post(Some(&ana), "/api/social/friends", json!({"email": "ana@example.com"}))
        .await;
    assert_eq!(status, 400);
    let (status, _) = server
        .post(Some(&ana), "/api/social/friends", json!({"email": "nobody@example.com"}))
        .await;
    assert_eq!(status, 404);

    let (status, body) = server
        .post(Some(&ana), "/api/social/friends", json!({"email": "ben@example.com"}))
        .await;
    assert_eq!(status, 201);
    let friendship = body["data"]["friendshipId"].as_str().unwrap().to_string();

    let (status, _) = server
        .post(Some(&ben), "/api/social/friends", json!({"email": "ana@example.com"}))
        .await;
    assert_eq!(status, 409);

    let (status, _) = server
        .post(Some(&ana), &format!("/api/social/friends/{friendship}/accept"), json!({}))
        .await;
    assert_eq!(status, 403, "only the addressee accepts");

    let (_, body) = server.get(Some(&ben), "/api/social/friends").await;
    assert_eq!(body["data"]["incoming"].as_array().unwrap().len(), 1);

    let (status, _) = server
        .post(Some(&ben), &format!("/api/social/friends/{friendship}/accept"), json!({}))
        .await;
    assert_eq!(status, 200);

    let (_, body) = server.post(Some(&ben), "/api/tasks", json!({"title": "Run"})).await;
    let task = body["data"]["id"].as_str().unwrap().to_string();
    server
        .post(Some(&ben), &format!("/api/tasks/{task}/complete"), json!({}))
        .await;

    let (status, body) = server.get(Some(&ana), "/api/social/leaderboard").await;
    assert_eq!(status, 200);
    let entries = body["data"]["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["name"], "Ben");
    assert_eq!(entries[0]["tasksCompleted"], 1);
    assert_eq!(entries[1]["isYou"], true);

    server.stop().await;
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let server = TestServer::start().await;
    let (user, _) = server.register("ana@example.com", "Ana").await;
    let admin = server.register_admin("root@example.com").await;

    let (status, _) = server.get(Some(&user), "/api/admin/users").await;
    assert_eq!(status, 403);
    let (status, _) = server.get(Some(&user), "/api/metrics/analytics").await;
    assert_eq!(status, 403);

    let (status, body) = server.get(Some(&admin), "/api/admin/users").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = server.get(Some(&admin), "/api/metrics/analytics").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["users"], 2);

    let (status, body) = server.get(Some(&admin), "/api/migrations/status").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["upToDate"], true);

    server.stop().await;
}

#[tokio::test]
async fn student_verification_review_grants_student_tier() {
    let server = TestServer::start().await;
    let (student, _) = server.register("sam@example.com", "Sam").await;
    let admin = server.register_admin("root@example.com").await;

    let (status, _) = server
        .post(
            Some(&student),
            "/api/student/verify",
            json!({"schoolEmail": "sam@gmail.com", "institution": "State U"}),
        )
        .await;
    assert_eq!(status, 400);

    let (status, body) = server
        .post(
            Some(&student),
            "/api/student/verify",
            json!({"schoolEmail": "sam@state.edu", "institution": "State University"}),
        )
        .await;
    assert_eq!(status, 201);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = server
        .get(Some(&admin), "/api/admin/student-verifications?status=pending")
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = server
        .post(
            Some(&admin),
            &format!("/api/admin/student-verifications/{id}/review"),
            json!({"approve": true}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "verified");

    let (status, _) = server
        .post(
            Some(&admin),
            &format!("/api/admin/student-verifications/{id}/review"),
            json!({"approve": false}),
        )
        .await;
    assert_eq!(status, 409);

    let (_, body) = server.get(Some(&student), "/api/student/status").await;
    assert_eq!(body["data"]["isStudent"], true);
    let (_, body) = server.get(Some(&student), "/api/auth/me").await;
    assert_eq!(body["data"]["tier"], "student");

    let (status, _) = server
        .post(Some(&student), "/api/payments/subscription/cancel", json!({}))
        .await;
    assert_eq!(status, 200);
    let (_, body) = server.get(Some(&student), "/api/auth/me").await;
    assert_eq!(body["data"]["tier"], "free");

    let (status, body) = server
        .post(Some(&student), "/api/payments/subscription", json!({"tier": "student"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["tier"], "student");
    assert_eq!(body["data"]["status"], "active");
    let (_, body) = server.get(Some(&student), "/api/auth/me").await;
    assert_eq!(body["data"]["tier"], "student");

    server.stop().await;
}

#[tokio::test]
async fn subscriptions_and_plans() {
    let server = TestServer::start().await;
    let (token, _) = server.register("ana@example.com", "Ana").await;

    let (_, body) = server.get(Some(&token), "/api/payments/plans").await;
    let plans = body["data"].as_array().unwrap();
    assert!(plans.iter().any(|p| p["tier"] == "free" && p["current"] == true));

    let (status, _) = server
        .post(Some(&token), "/api/payments/subscription", json!({"tier": "student"}))
        .await;
    assert_eq!(status, 403);

    let (status, body) = server
        .post(Some(&token), "/api/payments/subscription", json!({"tier": "premium"}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "active");

    let (_, body) = server.get(Some(&token), "/api/mobile/features").await;
    assert_eq!(body["data"]["tier"], "premium");
    assert_eq!(body["data"]["features"]["smartPlans"], true);

    let (status, _) = server
        .post(Some(&token), "/api/payments/subscription/cancel", json!({}))
        .await;
    assert_eq!(status, 200);
    let (_, body) = server.get(Some(&token), "/api/auth/me").await;
    assert_eq!(body["data"]["tier"], "free");

    server.stop().await;
}

#[tokio::test]
async fn localization_endpoints() {
    let server = TestServer::start().await;
    let (token, _) = server.register("ana@example.com", "Ana").await;

    let (status, body) = server.get(None, "/api/localization/languages").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["defaultLanguage"], "en");

    let resp = server
        .client
        .get(server.url("/api/localization/detect?country=mx"))
        .bearer_auth(&token)
        .header("accept-language", "fr-CA,fr;q=0.9")
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["language"], "fr");
    assert_eq!(body["data"]["country"], "MX");

    let (status, body) = server
        .post(
            Some(&token),
            "/api/localization/format",
            json!({"kind": "currency", "value": 1234.5, "country": "DE"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["formatted"], "1.234,50 €");

    let resp = server
        .client
        .put(server.url("/api/localization/preferences"))
        .bearer_auth(&token)
        .json(&json!({"language": "es", "country": "es"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["language"], "es");
    assert_eq!(body["data"]["country"], "ES");

    server.stop().await;
}

#[tokio::test]
async fn smart_plan_execute_once() {
    let server = TestServer::start().await;
    let (ana, _) = server.register("ana@example.com", "Ana").await;
    let (ben, _) = server.register("ben@example.com", "Ben").await;

    server
        .post(
            Some(&ana),
            "/api/tasks",
            json!({"title": "Finish essay", "priority": "urgent", "estimatedMinutes": 50}),
        )
        .await;

    let (status, _) = server
        .post(Some(&ana), "/api/ai/smart-plan", json!({"availableMinutes": 5}))
        .await;
    assert_eq!(status, 400);

    let (status, body) = server
        .post(
            Some(&ana),
            "/api/ai/smart-plan",
            json!({"availableMinutes": 120, "includeBreaks": true, "focusAreas": ["reading"]}),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(body["data"]["suggestions"][0]["title"], "Finish essay");
    assert!(body["data"]["totalMinutes"].as_u64().unwrap() <= 120);
    let plan = body["data"]["planId"].as_str().unwrap().to_string();

    let (status, _) = server
        .post(Some(&ben), &format!("/api/ai/smart-plan/{plan}/execute"), json!({}))
        .await;
    assert_eq!(status, 403);

    let (status, body) = server
        .post(Some(&ana), &format!("/api/ai/smart-plan/{plan}/execute"), json!({}))
        .await;
    assert_eq!(status, 201);
    let created = body["data"]["created"].as_array().unwrap();
    assert!(created.iter().any(|t| t["tags"] == json!(["reading"])));

    let (status, _) = server
        .post(Some(&ana), &format!("/api/ai/smart-plan/{plan}/execute"), json!({}))
        .await;
    assert_eq!(status, 404);

    server.stop().await;
}

#[tokio::test]
async fn heuristic_analysis_without_gateway() {
    let server = TestServer::start().await;
    let (token, _) = server.register("ana@example.com", "Ana").await;

    let (status, body) = server
        .post(
            Some(&token),
            "/api/ai/analyze-task",
            json!({"title": "URGENT pay electricity bill"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["priority"], "urgent");
    assert_eq!(body["data"]["category"], "finance");
    assert_eq!(body["data"]["source"], "heuristic");

    let resp = server
        .client
        .post(server.url("/api/voice/transcribe"))
        .bearer_auth(&token)
        .body(vec![1u8, 2, 3])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "voice transcription is not configured");

    server.stop().await;
}

#[tokio::test]
async fn mobile_dashboard_summarizes_today() {
    let server = TestServer::start().await;
    let (token, _) = server.register("ana@example.com", "Ana").await;

    for (title, priority) in [("low one", "low"), ("urgent one", "urgent"), ("mid one", "medium")] {
        server
            .post(Some(&token), "/api/tasks", json!({"title": title, "priority": priority}))
            .await;
    }

    let (status, body) = server.get(Some(&token), "/api/mobile/dashboard").await;
    assert_eq!(status, 200);
    let data = &body["data"];
    assert_eq!(data["topTasks"][0]["title"], "urgent one");
    assert_eq!(data["topTasks"].as_array().unwrap().len(), 3);
    assert_eq!(data["focus"]["minutes"], 0);
    assert_eq!(data["tasksCompletedToday"], 0);
    assert!(data["date"].as_str().is_some());

    server.stop().await;
}

#[tokio::test]
async fn protected_routes_reject_missing_tokens() {
    let server = TestServer::start().await;
    let some_id = "00000000-0000-0000-0000-000000000001";

    let protected_gets = [
        "/api/auth/me".to_string(),
        "/api/tasks".to_string(),
        format!("/api/tasks/{some_id}"),
        "/api/health/logs".to_string(),
        "/api/health/summary".to_string(),
        "/api/focus/sessions".to_string(),
        "/api/focus/stats".to_string(),
        "/api/calendar/events".to_string(),
        "/api/notifications".to_string(),
        "/api/social/friends".to_string(),
        "/api/social/leaderboard".to_string(),
        "/api/badges".to_string(),
        "/api/payments/plans".to_string(),
        "/api/payments/subscription".to_string(),
        "/api/student/status".to_string(),
        "/api/localization/detect".to_string(),
        "/api/localization/content".to_string(),
        "/api/metrics/analytics".to_string(),
        "/api/migrations/status".to_string(),
        "/api/mobile/dashboard".to_string(),
        "/api/mobile/features".to_string(),
        "/api/admin/users".to_string(),
        "/api/admin/stats".to_string(),
    ];
    for path in &protected_gets {
        let (status, body) = server.get(None, path).await;
        assert_eq!(status, 401, "GET {path}");
        assert_eq!(body["success"], false, "GET {path}");
    }

    let protected_posts = [
        "/api/tasks",
        "/api/ai/analyze-task",
        "/api/ai/smart-plan",
        "/api/voice/transcribe",
        "/api/notifications/read-all",
        "/api/badges/check",
        "/api/student/verify",
    ];
    for path in protected_posts {
        let (status, _) = server.post(None, path, json!({})).await;
        assert_eq!(status, 401, "POST {path}");
    }

    for path in ["/health", "/api/localization/languages", "/api/focus/templates"] {
        let (status, body) = server.get(None, path).await;
        assert_eq!(status, 200, "GET {path}");
        assert_eq!(body["success"], true, "GET {path}");
    }
    for path in ["/api/auth/register", "/api/auth/login", "/api/auth/otp/request"] {
        let (status, _) = server.post(None, path, json!({})).await;
        assert_ne!(status, 401, "POST {path} is public");
    }

    server.stop().await;
}

#[tokio::test]
async fn calendar_events_crud_and_range_query() {
    let server = TestServer::start().await;
    let (ana, _) = server.register("ana@example.com", "Ana").await;
    let (ben, _) = server.register("ben@example.com", "Ben").await;

    let (status, body) = server
        .post(
            Some(&ana),
            "/api/calendar/events",
            json!({"title": "Standup", "startsAt": "2025-03-10T09:00:00Z",
                   "endsAt": "2025-03-10T09:15:00Z"}),
        )
        .await;
    assert_eq!(status, 201);
    assert_eq!(body["data"]["source"], "local");
    let standup = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = server
        .post(
            Some(&ana),
            "/api/calendar/events",
            json!({"title": "Offsite", "startsAt": "2025-03-12T08:00:00Z",
                   "endsAt": "2025-03-12T17:00:00Z", "location": "Lisbon"}),
        )
        .await;
    assert_eq!(status, 201);

    let (status, _) = server
        .post(
            Some(&ana),
            "/api/calendar/events",
            json!({"title": "Backwards", "startsAt": "2025-03-10T10:00:00Z",
                   "endsAt": "2025-03-10T09:00:00Z"}),
        )
        .await;
    assert_eq!(status, 400);

    // 09:10..10:00 overlaps the standup only
    let (status, body) = server
        .get(
            Some(&ana),
            "/api/calendar/events?from=2025-03-10T09:10:00Z&to=2025-03-10T10:00:00Z",
        )
        .await;
    assert_eq!(status, 200);
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["Standup"]);

    let (_, body) = server.get(Some(&ana), "/api/calendar/events").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    let (_, body) = server.get(Some(&ben), "/api/calendar/events").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    let (status, _) = server
        .get(Some(&ben), &format!("/api/calendar/events/{standup}"))
        .await;
    assert_eq!(status, 404);

    let (status, body) = server
        .patch(
            &ana,
            &format!("/api/calendar/events/{standup}"),
            json!({"title": "Daily standup", "endsAt": "2025-03-10T09:30:00Z"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["title"], "Daily standup");

    let (status, _) = server
        .patch(
            &ana,
            &format!("/api/calendar/events/{standup}"),
            json!({"endsAt": "2025-03-10T08:00:00Z"}),
        )
        .await;
    assert_eq!(status, 400);

    let (status, _) = server
        .delete(&ana, &format!("/api/calendar/events/{standup}"))
        .await;
    assert_eq!(status, 200);
    let (status, _) = server
        .get(Some(&ana), &format!("/api/calendar/events/{standup}"))
        .await;
    assert_eq!(status, 404);
    let (status, _) = server
        .delete(&ana, &format!("/api/calendar/events/{standup}"))
        .await;
    assert_eq!(status, 404);

    server.stop().await;
}

#[tokio::test]
async fn notification_inbox_read_and_delete() {
    let server = TestServer::start().await;
    let (ana, _) = server.register("ana@example.com", "Ana").await;
    let (ben, _) = server.register("ben@example.com", "Ben").await;

    // the first completed task unlocks a badge, which notifies
    let (_, body) = server
        .post(Some(&ana), "/api/tasks", json!({"title": "Stretch"}))
        .await;
    let task = body["data"]["id"].as_str().unwrap().to_string();
    server
        .post(Some(&ana), &format!("/api/tasks/{task}/complete"), json!({}))
        .await;

    let (status, body) = server.get(Some(&ana), "/api/notifications").await;
    assert_eq!(status, 200);
    let inbox = body["data"].as_array().unwrap().clone();
    assert!(!inbox.is_empty());
    let total = inbox.len() as u64;
    let first = inbox[0]["id"].as_str().unwrap().to_string();

    let (status, _) = server
        .post(Some(&ben), &format!("/api/notifications/{first}/read"), json!({}))
        .await;
    assert_eq!(status, 404);

    let (status, body) = server
        .post(Some(&ana), &format!("/api/notifications/{first}/read"), json!({}))
        .await;
    assert_eq!(status, 200);
    assert!(body["data"]["readAt"].is_string());
    let (_, body) = server.get(Some(&ana), "/api/notifications/unread-count").await;
    assert_eq!(body["data"]["unread"], total - 1);

    let (status, body) = server
        .post(Some(&ana), "/api/notifications/read-all", json!({}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["updated"], total - 1);
    let (_, body) = server.get(Some(&ana), "/api/notifications?unread=true").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let (status, _) = server
        .delete(&ben, &format!("/api/notifications/{first}"))
        .await;
    assert_eq!(status, 404);
    let (status, body) = server
        .delete(&ana, &format!("/api/notifications/{first}"))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["deleted"], true);
    let (_, body) = server.get(Some(&ana), "/api/notifications").await;
    assert_eq!(body["data"].as_array().unwrap().len() as u64, total - 1);

    server.stop().await;
}

#[tokio::test]
async fn realtime_stream_checks_the_token() {
    let server = TestServer::start().await;
    let (token, user_id) = server.register("ana@example.com", "Ana").await;

    let (status, body) = server.get(None, "/api/realtime/events").await;
    assert_eq!(status, 401);
    assert_eq!(body["success"], false);
    let (status, _) = server.get(None, "/api/realtime/events?token=garbage").await;
    assert_eq!(status, 401);

    let mut resp = server
        .client
        .get(server.url(&format!("/api/realtime/events?token={token}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/event-stream"), "{content_type}");

    let mut received = String::new();
    let read = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !received.contains("\n\n") {
            match resp.chunk().await.unwrap() {
                Some(chunk) => received.push_str(&String::from_utf8_lossy(&chunk)),
                None => break,
            }
        }
    })
    .await;
    assert!(read.is_ok(), "no event within 5s");
    assert!(received.starts_with("event: connected"), "{received}");
    assert!(received.contains(&user_id), "{received}");

    // an open stream would hold graceful shutdown until the next keep-alive
    // write fails, so the server is simply dropped with the runtime
    drop(resp);
    drop(server);
}
