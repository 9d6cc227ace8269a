use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use careerforge_api::config::ApiConfig;
use careerforge_auth::JwtClaims;
use careerforge_core::{JobId, UserId};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(jwt_secret: &str) -> Self {
        Self::spawn_with(jwt_secret, |_| {}).await
    }

    /// Boot the real router (same wiring as prod) on an ephemeral port.
    async fn spawn_with(jwt_secret: &str, configure: impl FnOnce(&mut ApiConfig)) -> Self {
        let mut config = ApiConfig::dev(jwt_secret);
        configure(&mut config);

        let app = careerforge_api::app::build_app(&config);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, user: UserId) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: user,
        email: Some("tester@example.com".to_string()),
        issued_at: now - ChronoDuration::minutes(1),
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn optimization_payload() -> Value {
    json!({
        "type": "resume-optimization",
        "resume_text": "Backend engineer.\nDesign and testing of APIs.\nRust, delivery, collaboration.\nMore lines.\nAnd more.\nAnd more.",
        "target_role": "Backend Engineer",
        "industry": "Technology",
    })
}

async fn create_job(client: &reqwest::Client, base_url: &str, token: &str, payload: Value) -> Value {
    let res = client
        .post(format!("{base_url}/jobs"))
        .bearer_auth(token)
        .json(&payload)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::ACCEPTED);
    res.json().await.unwrap()
}

/// Poll the status endpoint until the job settles. The API is intentionally
/// asynchronous: creation returns before any worker has run.
async fn poll_until_terminal(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    job_id: &str,
) -> Value {
    for _ in 0..200 {
        let res = client
            .get(format!("{base_url}/jobs/{job_id}/status"))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body: Value = res.json().await.unwrap();
        match body["status"].as_str().unwrap() {
            "completed" | "failed" | "cancelled" => return body,
            _ => tokio::time::sleep(std::time::Duration::from_millis(25)).await,
        }
    }

    panic!("job {job_id} did not settle within timeout");
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn("test-secret").await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/whoami", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(format!("{}/jobs", srv.base_url))
        .json(&optimization_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(format!("{}/jobs/stream", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn("test-secret").await;

    let res = reqwest::get(format!("{}/health", srv.base_url)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn identity_is_derived_from_the_token() {
    let srv = TestServer::spawn("test-secret").await;
    let user = UserId::new();
    let token = mint_jwt("test-secret", user);

    let res = reqwest::Client::new()
        .get(format!("{}/whoami", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user_id"].as_str().unwrap(), user.to_string());
}

#[tokio::test]
async fn resume_optimization_runs_to_completion() {
    let srv = TestServer::spawn("test-secret").await;
    let user = UserId::new();
    let token = mint_jwt("test-secret", user);
    let client = reqwest::Client::new();

    let receipt = create_job(&client, &srv.base_url, &token, optimization_payload()).await;
    assert_eq!(receipt["success"], true);
    assert_eq!(receipt["status"], "queued");
    let job_id = receipt["jobId"].as_str().unwrap().to_string();
    assert!(job_id.starts_with(&format!("{user}:")));

    // An immediate query already has an answer (never an error while the
    // worker races us).
    let res = client
        .get(format!("{}/jobs/{job_id}/status", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert!(matches!(
        body["status"].as_str().unwrap(),
        "queued" | "processing" | "completed"
    ));

    let done = poll_until_terminal(&client, &srv.base_url, &token, &job_id).await;
    assert_eq!(done["status"], "completed");
    assert_eq!(done["success"], true);
    assert!(done["createdAt"].is_number());
    assert!(done["startedAt"].is_number());
    assert!(done["completedAt"].is_number());

    let result = &done["result"];
    assert_eq!(result["success"], true);
    assert!(result["data"]["atsScore"].is_number());
    assert!(done.get("failedReason").is_none());
}

#[tokio::test]
async fn foreign_jobs_are_forbidden_without_leaking_data() {
    let srv = TestServer::spawn("test-secret").await;
    let owner = UserId::new();
    let intruder = UserId::new();
    let owner_token = mint_jwt("test-secret", owner);
    let intruder_token = mint_jwt("test-secret", intruder);
    let client = reqwest::Client::new();

    let receipt = create_job(&client, &srv.base_url, &owner_token, optimization_payload()).await;
    let job_id = receipt["jobId"].as_str().unwrap();

    let res = client
        .get(format!("{}/jobs/{job_id}/status", srv.base_url))
        .bearer_auth(&intruder_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "unauthorized");
    // No job data leaks, not even whether the job exists.
    assert!(body.get("status").is_none());
    assert!(body.get("result").is_none());

    let res = client
        .post(format!("{}/jobs/{job_id}/cancel", srv.base_url))
        .bearer_auth(&intruder_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_own_job_is_not_found() {
    let srv = TestServer::spawn("test-secret").await;
    let user = UserId::new();
    let token = mint_jwt("test-secret", user);

    let ghost = JobId::new(user, "career-insights");
    let res = reqwest::Client::new()
        .get(format!("{}/jobs/{ghost}/status", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn queued_job_can_be_cancelled_exactly_once() {
    // Workers disabled: the job deterministically stays queued.
    let srv = TestServer::spawn_with("test-secret", |c| c.worker_enabled = false).await;
    let user = UserId::new();
    let token = mint_jwt("test-secret", user);
    let client = reqwest::Client::new();

    let receipt = create_job(&client, &srv.base_url, &token, optimization_payload()).await;
    let job_id = receipt["jobId"].as_str().unwrap();

    let res = client
        .post(format!("{}/jobs/{job_id}/cancel", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);

    let res = client
        .get(format!("{}/jobs/{job_id}/status", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "cancelled");

    // Second cancel: the job is already terminal.
    let res = client
        .post(format!("{}/jobs/{job_id}/cancel", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn completed_job_cannot_be_cancelled() {
    let srv = TestServer::spawn("test-secret").await;
    let user = UserId::new();
    let token = mint_jwt("test-secret", user);
    let client = reqwest::Client::new();

    let receipt = create_job(&client, &srv.base_url, &token, optimization_payload()).await;
    let job_id = receipt["jobId"].as_str().unwrap().to_string();

    let done = poll_until_terminal(&client, &srv.base_url, &token, &job_id).await;
    assert_eq!(done["status"], "completed");

    let res = client
        .post(format!("{}/jobs/{job_id}/cancel", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Status is untouched by the failed cancel.
    let res = client
        .get(format!("{}/jobs/{job_id}/status", srv.base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "completed");
}

#[tokio::test]
async fn active_jobs_are_scoped_to_the_caller() {
    let srv = TestServer::spawn_with("test-secret", |c| c.worker_enabled = false).await;
    let alice = UserId::new();
    let bob = UserId::new();
    let alice_token = mint_jwt("test-secret", alice);
    let bob_token = mint_jwt("test-secret", bob);
    let client = reqwest::Client::new();

    let first = create_job(&client, &srv.base_url, &alice_token, optimization_payload()).await;
    let second = create_job(
        &client,
        &srv.base_url,
        &alice_token,
        json!({
            "type": "skill-gap-analysis",
            "target_role": "DevOps Engineer",
            "industry": "Technology",
            "current_skills": ["Docker", "Kubernetes"],
        }),
    )
    .await;
    create_job(&client, &srv.base_url, &bob_token, optimization_payload()).await;

    let res = client
        .get(format!("{}/jobs/active", srv.base_url))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    let jobs = body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 2);

    let ids: Vec<&str> = jobs.iter().map(|j| j["jobId"].as_str().unwrap()).collect();
    assert!(ids.contains(&first["jobId"].as_str().unwrap()));
    assert!(ids.contains(&second["jobId"].as_str().unwrap()));
}

#[tokio::test]
async fn invalid_payloads_are_rejected() {
    let srv = TestServer::spawn("test-secret").await;
    let token = mint_jwt("test-secret", UserId::new());
    let client = reqwest::Client::new();

    // Well-formed but unservable: no skills to analyze.
    let res = client
        .post(format!("{}/jobs", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({
            "type": "skill-gap-analysis",
            "target_role": "ML Engineer",
            "industry": "AI",
            "current_skills": [],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    // Unknown job type never reaches the queue.
    let res = client
        .post(format!("{}/jobs", srv.base_url))
        .bearer_auth(&token)
        .json(&json!({ "type": "interview-prep" }))
        .send()
        .await
        .unwrap();
    assert!(res.status().is_client_error());
}

#[tokio::test]
async fn notification_stream_delivers_only_the_owners_events() {
    let srv = TestServer::spawn("test-secret").await;
    let owner = UserId::new();
    let other = UserId::new();
    let owner_token = mint_jwt("test-secret", owner);
    let other_token = mint_jwt("test-secret", other);
    let client = reqwest::Client::new();

    // Connect the gateway first (the bus does not replay missed events).
    // EventSource-style auth: token in the query string.
    let mut stream = client
        .get(format!("{}/jobs/stream?token={owner_token}", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(stream.status(), StatusCode::OK);

    // A concurrent foreign job, then the owner's job.
    let foreign = create_job(&client, &srv.base_url, &other_token, optimization_payload()).await;
    let foreign_id = foreign["jobId"].as_str().unwrap().to_string();
    let receipt = create_job(&client, &srv.base_url, &owner_token, optimization_payload()).await;
    let job_id = receipt["jobId"].as_str().unwrap().to_string();

    let mut buffer = String::new();
    let deadline = std::time::Duration::from_secs(10);

    // Read frames until the owner's completion shows up.
    loop {
        let chunk = tokio::time::timeout(deadline, stream.chunk())
            .await
            .expect("no job:completed event within timeout")
            .unwrap()
            .expect("stream closed before job:completed");
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        if buffer.contains("job:completed") {
            break;
        }
    }

    // Short grace window: catch anything else already in flight.
    while let Ok(Ok(Some(chunk))) =
        tokio::time::timeout(std::time::Duration::from_millis(300), stream.chunk()).await
    {
        buffer.push_str(&String::from_utf8_lossy(&chunk));
    }

    // SSE frames are newline-delimited; inspect the data lines.
    let events: Vec<Value> = buffer
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .filter_map(|data| serde_json::from_str(data).ok())
        .collect();
    assert!(!events.is_empty());

    for event in &events {
        // Nothing of anyone else's ever shows up.
        assert_eq!(event["userId"], owner.to_string());
        assert_ne!(event["jobId"], foreign_id);
    }

    let completed: Vec<_> = events
        .iter()
        .filter(|e| e["event"] == "job:completed")
        .collect();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0]["jobId"], job_id);

    // The other user's job still ran; it just never crossed this stream.
    let done = poll_until_terminal(&client, &srv.base_url, &other_token, &foreign_id).await;
    assert_eq!(done["status"], "completed");
}
