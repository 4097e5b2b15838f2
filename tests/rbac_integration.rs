mod common;

use serde_json::{json, Value};

use common::{spawn_app, TestApp};

async fn permission_id(app: &TestApp, admin: &str, code: &str) -> String {
    let response = app.get_authed("/api/permissions", admin).await;
    assert_eq!(200, response.status().as_u16());
    let permissions: Value = response.json().await.unwrap();
    permissions
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["code"] == code)
        .unwrap_or_else(|| panic!("permission {} not seeded", code))["id"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn bootstrapped_admin_holds_the_default_catalogue() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let response = app.get_authed("/api/users/me/permissions", &admin).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let permissions = body["permissions"].as_array().unwrap();
    assert_eq!(permissions.len(), 15);
    assert!(permissions.contains(&json!("roles:create")));
}

#[tokio::test]
async fn missing_permission_returns_403() {
    let app = spawn_app().await;
    let user = app.register_ok("Alice", "alice@example.com", "pw123456").await;
    let token = user["access_token"].as_str().unwrap();

    let response = app.get_authed("/api/permissions", token).await;

    assert_eq!(403, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn permission_takes_effect_right_after_role_assignment() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let user = app.register_ok("Alice", "alice@example.com", "pw123456").await;
    let user_id = user["user_id"].as_str().unwrap();
    let user_token = user["access_token"].as_str().unwrap();

    let list_id = permission_id(&app, &admin, "permissions:list").await;
    let created = app
        .post_authed(
            "/api/roles",
            &admin,
            &json!({ "name": "catalogue_reader", "permission_ids": [list_id] }),
        )
        .await;
    assert_eq!(201, created.status().as_u16());
    let role: Value = created.json().await.unwrap();
    let role_id = role["role"]["id"].as_str().unwrap().to_string();
    assert_eq!(role["permissions"][0]["code"], "permissions:list");

    assert_eq!(
        403,
        app.get_authed("/api/permissions", user_token).await.status().as_u16()
    );

    let assigned = app
        .post_authed(
            &format!("/api/users/{}/roles", user_id),
            &admin,
            &json!({ "role_id": role_id }),
        )
        .await;
    assert_eq!(200, assigned.status().as_u16());

    // the same access token now passes; permissions are resolved per request
    assert_eq!(
        200,
        app.get_authed("/api/permissions", user_token).await.status().as_u16()
    );
}

#[tokio::test]
async fn assigning_unknown_role_or_user_returns_404() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let user = app.register_ok("Alice", "alice@example.com", "pw123456").await;
    let user_id = user["user_id"].as_str().unwrap();

    let unknown_role = app
        .post_authed(
            &format!("/api/users/{}/roles", user_id),
            &admin,
            &json!({ "role_id": uuid::Uuid::new_v4() }),
        )
        .await;
    assert_eq!(404, unknown_role.status().as_u16());

    let created = app
        .post_authed("/api/roles", &admin, &json!({ "name": "empty_role" }))
        .await;
    let role: Value = created.json().await.unwrap();

    let unknown_user = app
        .post_authed(
            &format!("/api/users/{}/roles", uuid::Uuid::new_v4()),
            &admin,
            &json!({ "role_id": role["role"]["id"] }),
        )
        .await;
    assert_eq!(404, unknown_user.status().as_u16());
}

#[tokio::test]
async fn create_role_validates_name() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let response = app
        .post_authed("/api/roles", &admin, &json!({ "name": "" }))
        .await;

    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn get_role_returns_its_permissions() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let code_id = permission_id(&app, &admin, "users:list").await;
    let created = app
        .post_authed(
            "/api/roles",
            &admin,
            &json!({ "name": "lister", "description": "Lists users", "permission_ids": [code_id] }),
        )
        .await;
    let role: Value = created.json().await.unwrap();
    let role_id = role["role"]["id"].as_str().unwrap();

    let response = app
        .get_authed(&format!("/api/roles/{}", role_id), &admin)
        .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["role"]["name"], "lister");
    assert_eq!(body["role"]["description"], "Lists users");
    assert_eq!(body["permissions"].as_array().unwrap().len(), 1);

    let missing = app
        .get_authed(&format!("/api/roles/{}", uuid::Uuid::new_v4()), &admin)
        .await;
    assert_eq!(404, missing.status().as_u16());
}

#[tokio::test]
async fn permission_catalogue_can_be_extended() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let created = app
        .post_authed(
            "/api/permissions",
            &admin,
            &json!({ "code": "reports:export", "description": "Export reports" }),
        )
        .await;
    assert_eq!(201, created.status().as_u16());

    let duplicate = app
        .post_authed("/api/permissions", &admin, &json!({ "code": "reports:export" }))
        .await;
    assert_eq!(409, duplicate.status().as_u16());

    let malformed = app
        .post_authed("/api/permissions", &admin, &json!({ "code": "Reports Export" }))
        .await;
    assert_eq!(400, malformed.status().as_u16());

    let listed: Value = app
        .get_authed("/api/permissions", &admin)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 16);
}

#[tokio::test]
async fn admin_can_create_users() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let response = app
        .post_authed(
            "/api/users",
            &admin,
            &json!({ "display_name": "Carol", "email": "carol@example.com", "password": "pw123456" }),
        )
        .await;

    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], "carol@example.com");
    assert_eq!(body["is_active"], true);
    assert!(body.get("password").is_none());

    assert_eq!(200, app.login("carol@example.com", "pw123456").await.status().as_u16());
}

#[tokio::test]
async fn deactivated_user_cannot_log_in_or_refresh() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let user = app.register_ok("Alice", "alice@example.com", "pw123456").await;
    let user_id = user["user_id"].as_str().unwrap();

    let response = app
        .put_authed(
            &format!("/api/users/{}/status", user_id),
            &admin,
            &json!({ "is_active": false }),
        )
        .await;
    assert_eq!(200, response.status().as_u16());

    let login = app.login("alice@example.com", "pw123456").await;
    assert_eq!(403, login.status().as_u16());
    let body: Value = login.json().await.unwrap();
    assert_eq!(body["code"], "ACCOUNT_INACTIVE");

    let refresh = app
        .post_json(
            "/auth/refresh",
            &json!({ "refresh_token": user["refresh_token"] }),
        )
        .await;
    assert_eq!(401, refresh.status().as_u16());
}

#[tokio::test]
async fn password_reset_replaces_credential_and_revokes_sessions() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let user = app.register_ok("Alice", "alice@example.com", "pw123456").await;
    let user_id = user["user_id"].as_str().unwrap();

    let response = app
        .post_authed(
            &format!("/api/users/{}/password", user_id),
            &admin,
            &json!({ "new_password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(200, response.status().as_u16());

    assert_eq!(401, app.login("alice@example.com", "pw123456").await.status().as_u16());
    assert_eq!(200, app.login("alice@example.com", "brand-new-pass").await.status().as_u16());

    let refresh = app
        .post_json(
            "/auth/refresh",
            &json!({ "refresh_token": user["refresh_token"] }),
        )
        .await;
    assert_eq!(401, refresh.status().as_u16());

    let unknown = app
        .post_authed(
            &format!("/api/users/{}/password", uuid::Uuid::new_v4()),
            &admin,
            &json!({ "new_password": "brand-new-pass" }),
        )
        .await;
    assert_eq!(404, unknown.status().as_u16());
}
