#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use chrono::{DateTime, Duration, Utc};
use common::TestContext;
use serde_json::json;

fn parse_time(value: &serde_json::Value) -> DateTime<Utc> {
    value
        .as_str()
        .expect("timestamp string")
        .parse()
        .expect("RFC 3339 timestamp")
}

#[actix_web::test]
async fn health_reports_memory_backend() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let (status, body) = common::read(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backend"], "memory");
}

#[actix_web::test]
async fn gated_routes_require_a_session() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    for uri in [
        "/api/user",
        "/api/projects",
        "/api/tasks/1",
        "/api/time-entries/current",
        "/api/files",
        "/api/events",
        "/api/tracks",
        "/api/settings",
        "/api/analytics/summary",
        "/api/spotify/status",
    ] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let (status, body) = common::read(test::call_service(&app, req).await).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} should be gated", uri);
        assert_eq!(body["status"], "error");
        assert_eq!(body["statusCode"], 401);
    }
}

#[actix_web::test]
async fn register_login_logout_cycle() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;

    let cookie = register!(app, "alice");
    let (status, me) = call!(app, cookie, get "/api/user/me");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");
    assert!(me.get("password").is_none());

    let duplicate = test::TestRequest::post()
        .uri("/api/register")
        .set_json(json!({"username": "alice", "password": "another-pass"}))
        .to_request();
    let (status, _) = common::read(test::call_service(&app, duplicate).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let wrong = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({"username": "alice", "password": "wrong-pass"}))
        .to_request();
    let (status, _) = common::read(test::call_service(&app, wrong).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let login = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({"username": "alice", "password": "correct-horse"}))
        .to_request();
    let resp = test::call_service(&app, login).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let second_session = common::session_cookie_of(&resp);

    let (status, _) = call!(app, second_session, post "/api/logout");
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call!(app, second_session, get "/api/user");
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The first session is independent of the one that logged out.
    let (status, _) = call!(app, cookie, get "/api/user");
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn starting_a_timer_closes_the_running_one_and_project_delete_cascades() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;
    let cookie = register!(app, "tracker");

    let (status, project) = call!(app, cookie, post "/api/projects", json!({"name": "P"}));
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(project["id"], 1);

    let (status, task) = call!(
        app,
        cookie,
        post "/api/tasks",
        json!({"title": "T", "projectId": 1})
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["id"], 1);
    assert_eq!(task["status"], "pending");

    let t0 = Utc::now() - Duration::minutes(30);
    let t1 = t0 + Duration::seconds(1234);

    let (status, first) = call!(
        app,
        cookie,
        post "/api/time-entries",
        json!({"taskId": 1, "projectId": 1, "startTime": t0})
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["id"], 1);
    assert!(first["endTime"].is_null());

    let (status, second) = call!(
        app,
        cookie,
        post "/api/time-entries",
        json!({"taskId": 1, "startTime": t1})
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(second["id"], 2);
    assert!(second["endTime"].is_null());

    let (_, first) = call!(app, cookie, get "/api/time-entries/1");
    let closed_at = parse_time(&first["endTime"]);
    assert!(closed_at >= t1);
    let expected = (closed_at - t0).num_seconds();
    assert_eq!(first["duration"].as_i64(), Some(expected));

    let (status, current) = call!(app, cookie, get "/api/time-entries/current");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["id"], 2);

    let (status, _) = call!(app, cookie, delete "/api/projects/1");
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call!(app, cookie, get "/api/tasks/1");
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call!(app, cookie, get "/api/time-entries/1");
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call!(app, cookie, get "/api/projects/1");
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Entry 2 referenced the deleted task but carried no project id.
    let (status, _) = call!(app, cookie, get "/api/time-entries/2");
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn deleting_a_task_removes_its_time_entries() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;
    let cookie = register!(app, "tasker");

    let (_, task) = call!(app, cookie, post "/api/tasks", json!({"title": "Write report"}));
    let task_id = task["id"].as_i64().unwrap();
    let (_, entry) = call!(
        app,
        cookie,
        post "/api/time-entries",
        json!({"taskId": task_id, "startTime": Utc::now()})
    );

    let (status, entries) = call!(app, cookie, get format!("/api/tasks/{}/time-entries", task_id));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entries.as_array().unwrap().len(), 1);

    let (status, _) = call!(app, cookie, delete format!("/api/tasks/{}", task_id));
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call!(app, cookie, get format!("/api/time-entries/{}", entry["id"]));
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = call!(app, cookie, get "/api/time-entries/current");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("No active time entry"));
}

#[actix_web::test]
async fn invalid_bodies_are_rejected_with_400() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;
    let cookie = register!(app, "validator");

    let (status, body) = call!(app, cookie, post "/api/projects", json!({"name": ""}));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("name cannot be empty"));

    let (status, _) = call!(app, cookie, post "/api/projects", json!({"color": "#fff"}));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call!(
        app,
        cookie,
        post "/api/tasks",
        json!({"title": "T", "status": "archived"})
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, task) = call!(app, cookie, post "/api/tasks", json!({"title": "T"}));
    let (status, _) = call!(
        app,
        cookie,
        patch format!("/api/tasks/{}", task["id"]),
        json!({"progress": 150})
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call!(
        app,
        cookie,
        post "/api/events",
        json!({
            "title": "Review",
            "startDate": "2025-03-01T10:00:00Z",
            "endDate": "2025-03-01T09:00:00Z"
        })
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call!(app, cookie, get "/api/projects/not-a-number");
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let malformed = test::TestRequest::post()
        .uri("/api/projects")
        .cookie(cookie.clone())
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"name\": ")
        .to_request();
    let (status, body) = common::read(test::call_service(&app, malformed).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);
}

#[actix_web::test]
async fn missing_and_foreign_records_are_not_found() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;
    let owner = register!(app, "owner");
    let intruder = register!(app, "intruder");

    let (_, project) = call!(app, owner, post "/api/projects", json!({"name": "Private"}));
    let uri = format!("/api/projects/{}", project["id"]);

    for (status, _) in [
        call!(app, intruder, get uri),
        call!(app, intruder, patch uri, json!({"name": "Mine now"})),
        call!(app, intruder, delete uri),
    ] {
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let (status, _) = call!(
        app,
        intruder,
        post "/api/tasks",
        json!({"title": "Sneaky", "projectId": project["id"]})
    );
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, listed) = call!(app, intruder, get "/api/projects");
    assert_eq!(status, StatusCode::OK);
    assert!(listed.as_array().unwrap().is_empty());

    // Patching a record that does not exist leaves the store untouched.
    for uri in [
        "/api/projects/999",
        "/api/tasks/999",
        "/api/time-entries/999",
        "/api/events/999",
    ] {
        let (status, _) = call!(app, owner, patch uri, json!({"description": "x"}));
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }
    for uri in ["/api/files/999", "/api/tracks/999"] {
        let (status, _) = call!(app, owner, delete uri);
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }

    let (_, still_there) = call!(app, owner, get uri);
    assert_eq!(still_there["name"], "Private");
}

#[actix_web::test]
async fn patch_updates_only_present_fields() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;
    let cookie = register!(app, "patcher");

    let (_, task) = call!(
        app,
        cookie,
        post "/api/tasks",
        json!({"title": "Draft", "description": "first pass", "estimatedTime": 30})
    );
    let uri = format!("/api/tasks/{}", task["id"]);

    let (status, patched) = call!(
        app,
        cookie,
        patch uri,
        json!({"status": "completed", "progress": 100, "description": null})
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["title"], "Draft");
    assert_eq!(patched["status"], "completed");
    assert_eq!(patched["progress"], 100);
    assert!(patched["description"].is_null());
    assert_eq!(patched["estimatedTime"], 30);
}

#[actix_web::test]
async fn simulated_upload_fills_defaults() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;
    let cookie = register!(app, "uploader");

    let (status, file) = call!(app, cookie, post "/api/files/upload", json!({}));
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(file["filename"], "uploaded_file.txt");
    assert_eq!(file["size"], 1024);
    assert_eq!(file["type"], "text/plain");
    let path = file["path"].as_str().unwrap();
    assert!(path.starts_with("/uploads/"));
    assert!(path.ends_with("_uploaded_file.txt"));

    let (_, project) = call!(app, cookie, post "/api/projects", json!({"name": "Docs"}));
    let (status, named) = call!(
        app,
        cookie,
        post "/api/files/upload",
        json!({"filename": "brief.pdf", "type": "application/pdf", "size": 2048, "projectId": project["id"]})
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(named["type"], "application/pdf");

    let (_, by_project) = call!(app, cookie, get format!("/api/projects/{}/files", project["id"]));
    assert_eq!(by_project.as_array().unwrap().len(), 1);
    let (_, all) = call!(app, cookie, get "/api/files");
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, _) = call!(app, cookie, delete format!("/api/files/{}", file["id"]));
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, all) = call!(app, cookie, get "/api/files");
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn upload_rejects_malformed_bodies() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;
    let cookie = register!(app, "careless-uploader");

    let (status, file) = call!(app, cookie, post "/api/files/upload");
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(file["filename"], "uploaded_file.txt");

    let (status, body) = call!(app, cookie, post "/api/files/upload", json!({"size": "huge"}));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["statusCode"], 400);

    let req = test::TestRequest::post()
        .uri("/api/files/upload")
        .cookie(cookie.clone())
        .insert_header(("content-type", "application/json"))
        .set_payload(r#"{"filename": "cut"#)
        .to_request();
    let (status, _) = common::read(test::call_service(&app, req).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, all) = call!(app, cookie, get "/api/files");
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn time_entry_patches_store_times_as_sent() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;
    let cookie = register!(app, "retro-logger");

    let t0 = Utc::now() - Duration::hours(3);
    let (status, entry) = call!(
        app,
        cookie,
        post "/api/time-entries",
        json!({"startTime": t0, "endTime": t0 + Duration::minutes(10)})
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["duration"], 600);
    let uri = format!("/api/time-entries/{}", entry["id"]);

    let (status, moved) = call!(app, cookie, patch uri, json!({"startTime": t0 + Duration::hours(1)}));
    assert_eq!(status, StatusCode::OK);
    assert!(parse_time(&moved["endTime"]) < parse_time(&moved["startTime"]));
    assert_eq!(moved["duration"], 600);

    let (status, body) = call!(app, cookie, patch uri, json!({"duration": -5}));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("duration cannot be negative"));

    let (_, stored) = call!(app, cookie, get uri);
    assert_eq!(stored["duration"], 600);
}

#[actix_web::test]
async fn events_filter_by_window_and_validate_patches() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;
    let cookie = register!(app, "planner");

    for (title, start) in [
        ("Kickoff", "2025-03-01T09:00:00Z"),
        ("Review", "2025-03-10T09:00:00Z"),
        ("Retro", "2025-04-01T09:00:00Z"),
    ] {
        let (status, _) = call!(
            app,
            cookie,
            post "/api/events",
            json!({"title": title, "startDate": start, "allDay": true})
        );
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, march) = call!(
        app,
        cookie,
        get "/api/events?from=2025-03-01T00:00:00Z&to=2025-03-31T23:59:59Z"
    );
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = march
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Kickoff", "Review"]);

    let (status, _) = call!(
        app,
        cookie,
        patch "/api/events/1",
        json!({"endDate": "2025-02-28T09:00:00Z"})
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, moved) = call!(
        app,
        cookie,
        patch "/api/events/1",
        json!({"endDate": "2025-03-01T17:00:00Z", "allDay": false})
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["allDay"], false);
}

#[actix_web::test]
async fn tracks_can_be_saved_and_removed() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;
    let cookie = register!(app, "listener");

    let (status, track) = call!(
        app,
        cookie,
        post "/api/tracks",
        json!({"trackId": "spotify:track:123", "title": "Midnight City", "artist": "M83", "duration": 260})
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(track["source"], "spotify");

    let (_, tracks) = call!(app, cookie, get "/api/tracks");
    assert_eq!(tracks.as_array().unwrap().len(), 1);

    let (status, _) = call!(app, cookie, delete format!("/api/tracks/{}", track["id"]));
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call!(app, cookie, get format!("/api/tracks/{}", track["id"]));
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn settings_are_created_on_first_read_and_patchable() {
    let ctx = TestContext::new();
    let app = test::init_service(ctx.app()).await;
    let cookie = register!(app, "settler");

    let (status, settings) = call!(app, cookie, get "/api/settings");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["theme"], "dark");
    assert_eq!(settings["notificationsEnabled"], true);

    let (status, _) = call!(app, cookie, patch "/api/settings", json!({"theme": "sepia"}));
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = call!(
        app,
        cookie,
        patch "/api/settings",
        json!({"theme": "light", "preferences": {"pomodoroMinutes": 25}})
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["theme"], "light");
    assert_eq!(updated["preferences"]["pomodoroMinutes"], 25);
    assert_eq!(updated["id"], settings["id"]);
}

#[actix_web::test]
async fn mocked_music_account_flow() {
    let ctx = TestContext::with_env(&[(
        "SPOTIFY_REDIRECT_URI",
        "http://localhost:5000/api/spotify/callback",
    )]);
    let app = test::init_service(ctx.app()).await;
    let cookie = register!(app, "dj");

    let (status, _) = call!(app, cookie, post "/api/spotify/play");
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, start) = call!(app, cookie, get "/api/spotify/connect");
    assert_eq!(status, StatusCode::OK);
    let state = start["state"].as_str().unwrap().to_string();
    let auth_url = start["authUrl"].as_str().unwrap();
    assert!(auth_url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A5000"));

    let (_, pending) = call!(app, cookie, get "/api/spotify/status");
    assert_eq!(pending, json!({"connected": false, "pending": true}));

    let bogus = test::TestRequest::get()
        .uri("/api/spotify/callback?state=unknown&code=abc")
        .to_request();
    let (status, _) = common::read(test::call_service(&app, bogus).await).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The provider redirect arrives without the session cookie.
    let callback = test::TestRequest::get()
        .uri(&format!("/api/spotify/callback?state={}&code=abc", state))
        .to_request();
    let (status, body) = common::read(test::call_service(&app, callback).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], true);

    let (_, connected) = call!(app, cookie, get "/api/spotify/status");
    assert_eq!(connected, json!({"connected": true, "pending": false}));

    let (status, playing) = call!(app, cookie, post "/api/spotify/play");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(playing["track"]["is_playing"], true);

    let (_, current) = call!(app, cookie, get "/api/spotify/current-track");
    assert_eq!(current["item"]["name"], "Midnight City");
    assert_eq!(current["item"]["artists"][0]["name"], "M83");
    assert_eq!(current["item"]["duration_ms"], 260000);

    let (_, next) = call!(app, cookie, post "/api/spotify/next");
    assert_eq!(next["track"]["item"]["name"], "Starboy");

    let (status, _) = call!(app, cookie, post "/api/spotify/volume", json!({"volume": 120}));
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, volume) = call!(app, cookie, post "/api/spotify/volume", json!({"volume": 35}));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(volume["volume"], 35);

    let (status, _) = call!(app, cookie, post "/api/spotify/disconnect");
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call!(app, cookie, get "/api/spotify/current-track");
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn demo_user_sees_seeded_dashboard() {
    let ctx = TestContext::with_demo_data().await;
    let app = test::init_service(ctx.app()).await;

    let login = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({"username": "demouser", "password": "password"}))
        .to_request();
    let resp = test::call_service(&app, login).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = common::session_cookie_of(&resp);

    let (_, projects) = call!(app, cookie, get "/api/projects");
    assert_eq!(projects.as_array().unwrap().len(), 3);

    let (status, summary) = call!(app, cookie, get "/api/analytics/summary");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["totalTasks"], 4);
    assert_eq!(summary["completedTasks"], 1);
    assert_eq!(summary["activeEntryId"], 1);
    assert_eq!(summary["totalTrackedSeconds"], 5400 + 4500);

    let (status, by_project) = call!(
        app,
        cookie,
        get "/api/analytics/time-by-project?period=last_7_days"
    );
    assert_eq!(status, StatusCode::OK);
    assert!(!by_project.as_array().unwrap().is_empty());

    let (status, _) = call!(app, cookie, get "/api/analytics/productivity-trend?period=fortnight");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = call!(
        app,
        cookie,
        get "/api/analytics/productivity-trend?startDate=2025-02-01&endDate=2025-01-01"
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
