use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use rolegate_api::app::{self, AppServices, DemoAccounts};
use rolegate_auth::{JwtClaims, User};
use rolegate_core::UserId;
use serde_json::json;

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    services: AppServices,
    demo: DemoAccounts,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over seeded in-memory stores, on an ephemeral port.
        let (services, demo) = AppServices::in_memory_seeded()
            .await
            .expect("failed to seed stores");
        let app = app::build_app(JWT_SECRET, services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            demo,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, email: &str, role_is_admin: bool) -> User {
        let role = if role_is_admin {
            self.demo.roles.admin.id
        } else {
            self.demo.roles.user.id
        };
        self.services
            .users
            .insert(User::new(email, "Test", Some(role)).unwrap())
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, sub: UserId) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub,
        iat: now.timestamp(),
        exp: (now + ChronoDuration::minutes(10)).timestamp(),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn error_code(res: reqwest::Response) -> String {
    let body: serde_json::Value = res.json().await.unwrap();
    body["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_requests_get_401() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/whoami", "/users", "/products", "/admin/rules"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
    }

    let res = client.get(srv.url("/products")).send().await.unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");
    assert_eq!(body["message"], "authentication required");
}

#[tokio::test]
async fn bad_or_foreign_tokens_are_anonymous() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let forged = mint_jwt("other-secret", srv.demo.admin.id);
    let res = client
        .get(srv.url("/products"))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let stranger = mint_jwt(JWT_SECRET, UserId::new());
    let res = client
        .get(srv.url("/products"))
        .bearer_auth(stranger)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_reports_resolved_identity() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, srv.demo.user.id);

    let res = reqwest::Client::new()
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["user_id"], srv.demo.user.id.to_string());
    assert_eq!(body["role_id"], srv.demo.roles.user.id.to_string());
}

#[tokio::test]
async fn products_catalogue_for_read_all_role() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, srv.demo.user.id);

    let res = reqwest::Client::new()
        .get(srv.url("/products"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!([{ "id": 1, "name": "Product A" }, { "id": 2, "name": "Product B" }])
    );
}

#[tokio::test]
async fn own_scope_sees_only_itself() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt(JWT_SECRET, srv.demo.user.id);

    let res = client
        .get(srv.url("/users"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], srv.demo.user.id.to_string());

    let res = client
        .get(srv.url(&format!("/users/{}", srv.demo.user.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url(&format!("/users/{}", srv.demo.admin.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(res).await, "forbidden");
}

#[tokio::test]
async fn admin_lists_every_user() {
    let srv = TestServer::spawn().await;
    srv.register("carol@example.com", false).await;
    let token = mint_jwt(JWT_SECRET, srv.demo.admin.id);

    let res = reqwest::Client::new()
        .get(srv.url("/users"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn patch_edits_own_profile_put_requires_full_body() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt(JWT_SECRET, srv.demo.user.id);
    let path = format!("/users/{}", srv.demo.user.id);

    let res = client
        .patch(srv.url(&path))
        .bearer_auth(&token)
        .json(&json!({ "last_name": "Doe" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["last_name"], "Doe");
    assert_eq!(body["email"], "user@example.com");

    let res = client
        .put(srv.url(&path))
        .bearer_auth(&token)
        .json(&json!({ "last_name": "Roe" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(res).await, "validation_error");
}

#[tokio::test]
async fn email_taken_by_another_user_conflicts() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, srv.demo.user.id);

    let res = reqwest::Client::new()
        .patch(srv.url(&format!("/users/{}", srv.demo.user.id)))
        .bearer_auth(token)
        .json(&json!({ "email": "admin@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn own_scope_cannot_delete_without_delete_flag() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, srv.demo.user.id);

    let res = reqwest::Client::new()
        .delete(srv.url(&format!("/users/{}", srv.demo.user.id)))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deactivated_user_is_locked_out() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let victim = srv.register("dave@example.com", false).await;
    let victim_token = mint_jwt(JWT_SECRET, victim.id);
    let admin_token = mint_jwt(JWT_SECRET, srv.demo.admin.id);

    let res = client
        .delete(srv.url(&format!("/users/{}", victim.id)))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url("/products"))
        .bearer_auth(&victim_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_id_is_checked_after_access() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/users/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/users/not-a-uuid"))
        .bearer_auth(mint_jwt(JWT_SECRET, srv.demo.admin.id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_endpoints_are_forbidden_to_plain_users() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, srv.demo.user.id);

    let res = reqwest::Client::new()
        .post(srv.url("/admin/roles"))
        .bearer_auth(token)
        .json(&json!({ "name": "auditor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn granted_rule_takes_effect_on_next_request() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = mint_jwt(JWT_SECRET, srv.demo.admin.id);

    // New role with no rules: every element is forbidden.
    let res = client
        .post(srv.url("/admin/roles"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "auditor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let role: serde_json::Value = res.json().await.unwrap();
    let role_id = role["id"].as_str().unwrap().to_string();

    let auditor = srv.register("erin@example.com", false).await;
    let res = client
        .put(srv.url(&format!("/admin/users/{}/role", auditor.id)))
        .bearer_auth(&admin)
        .json(&json!({ "role_id": role_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let auditor_token = mint_jwt(JWT_SECRET, auditor.id);
    let res = client
        .get(srv.url("/products"))
        .bearer_auth(&auditor_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(srv.url("/admin/elements"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let elements: serde_json::Value = res.json().await.unwrap();
    let products_id = elements["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["name"] == "products")
        .map(|e| e["id"].as_str().unwrap().to_string())
        .unwrap();

    let res = client
        .post(srv.url("/admin/rules"))
        .bearer_auth(&admin)
        .json(&json!({ "role_id": role_id, "element_id": products_id, "read_all": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let rule: serde_json::Value = res.json().await.unwrap();

    let res = client
        .get(srv.url("/products"))
        .bearer_auth(&auditor_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Duplicate pair is rejected.
    let res = client
        .post(srv.url("/admin/rules"))
        .bearer_auth(&admin)
        .json(&json!({ "role_id": role_id, "element_id": products_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    // Revoking closes the door again.
    let res = client
        .delete(srv.url(&format!("/admin/rules/{}", rule["id"].as_str().unwrap())))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url("/products"))
        .bearer_auth(&auditor_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deleting_a_role_leaves_its_users_roleless() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = mint_jwt(JWT_SECRET, srv.demo.admin.id);
    let user = mint_jwt(JWT_SECRET, srv.demo.user.id);

    let res = client
        .delete(srv.url(&format!("/admin/roles/{}", srv.demo.roles.user.id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url("/products"))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(&user)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["role_id"].is_null());
}

#[tokio::test]
async fn unknown_rule_is_not_found() {
    let srv = TestServer::spawn().await;
    let admin = mint_jwt(JWT_SECRET, srv.demo.admin.id);

    let res = reqwest::Client::new()
        .put(srv.url(&format!("/admin/rules/{}", UserId::new())))
        .bearer_auth(admin)
        .json(&json!({ "read_all": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_body_routes_answer_401_before_parsing() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .put(srv.url(&format!("/users/{}", srv.demo.user.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(res).await, "unauthenticated");

    let res = client
        .post(srv.url("/admin/roles"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .put(srv.url(&format!("/admin/rules/{}", UserId::new())))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn plain_user_gets_403_not_a_schema_error() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt(JWT_SECRET, srv.demo.user.id);

    let res = client
        .post(srv.url("/admin/roles"))
        .bearer_auth(&token)
        .json(&json!({ "title": "auditor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(res).await, "forbidden");

    let res = client
        .post(srv.url("/admin/rules"))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Someone else's record: ownership is refused before the body is read.
    let res = client
        .patch(srv.url(&format!("/users/{}", srv.demo.admin.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn bad_body_is_rejected_once_access_is_granted() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = mint_jwt(JWT_SECRET, srv.demo.admin.id);

    let res = client
        .post(srv.url("/admin/roles"))
        .bearer_auth(&admin)
        .json(&json!({ "title": "auditor" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_code(res).await, "invalid_body");

    let res = client
        .patch(srv.url(&format!("/users/{}", srv.demo.user.id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn profile_edit_after_deactivation_keeps_account_locked() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = mint_jwt(JWT_SECRET, srv.demo.admin.id);
    let target = srv.register("frank@example.com", false).await;

    srv.services.users.deactivate(target.id).await.unwrap();

    let res = client
        .patch(srv.url(&format!("/users/{}", target.id)))
        .bearer_auth(&admin)
        .json(&json!({ "last_name": "Lee" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["is_active"], false);
    assert_eq!(body["last_name"], "Lee");
}
