mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn register_login_me_logout() {
    let app = TestApp::new();

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({ "name": "user1", "email": "user1@webtech.id", "password": "password1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["user"]["email"], "user1@webtech.id");

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": "user1@webtech.id", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "message": "Email or password incorrect" }));

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": "user1@webtech.id", "password": "password1" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let token = body["user"]["accessToken"].as_str().unwrap().to_string();

    let (status, body) = app.call(Method::GET, "/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["name"], "user1");

    let (status, _) = app.call(Method::POST, "/v1/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    // The old token no longer works
    let (status, _) = app.call(Method::GET, "/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_validates_fields() {
    let app = TestApp::new();
    app.user("taken", "taken@webtech.id");

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({ "name": "", "email": "not-an-email", "password": "abc" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Invalid fields");
    assert!(body["errors"]["name"].is_array());
    assert!(body["errors"]["email"].is_array());
    assert!(body["errors"]["password"].is_array());

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/auth/register",
            None,
            Some(json!({ "name": "dup", "email": "taken@webtech.id", "password": "password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["email"], json!(["The email has already been taken."]));
}

#[tokio::test]
async fn login_validates_fields_before_checking_credentials() {
    let app = TestApp::new();

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/auth/login",
            None,
            Some(json!({ "email": "not-an-email", "password": "abc" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Invalid fields");
    assert_eq!(
        body["errors"]["email"],
        json!(["The email field must be a valid email address."])
    );
    assert_eq!(
        body["errors"]["password"],
        json!(["The password field must be at least 5 characters."])
    );
}

#[tokio::test]
async fn create_form_validates_and_rejects_taken_slug() {
    let app = TestApp::new();
    let owner = app.user("owner", "owner@corp.com");

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/forms",
            Some(&owner),
            Some(json!({ "name": "Bad", "slug": "has space", "description": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["message"], "Invalid field");
    assert!(body["errors"]["slug"].is_array());
    assert!(body["errors"]["description"].is_array());

    let form = app
        .create_form(
            &owner,
            json!({
                "name": "Biodata",
                "slug": "biodata",
                "description": "Student biodata",
                "allowed_domains": ["webtech.id"],
                "limit_one_response": true
            }),
        )
        .await;
    assert_eq!(form["allowed_domains"], json!(["webtech.id"]));
    assert_eq!(form["limit_one_response"], true);

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/forms",
            Some(&owner),
            Some(json!({ "name": "Again", "slug": "biodata", "description": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["errors"]["slug"], json!(["The slug has already been taken."]));
}

#[tokio::test]
async fn list_and_detail() {
    let app = TestApp::new();
    let owner = app.user("owner", "owner@corp.com");
    let other = app.user("other", "other@corp.com");
    app.create_form(&owner, json!({ "name": "A", "slug": "a", "description": "a" }))
        .await;
    let q = app
        .add_question(
            &owner,
            "a",
            json!({ "name": "Color", "choice_type": "dropdown", "choices": ["red", "blue"] }),
        )
        .await;

    let (_, body) = app.call(Method::GET, "/v1/forms", Some(&owner), None).await;
    assert_eq!(body["forms"].as_array().unwrap().len(), 1);
    let (_, body) = app.call(Method::GET, "/v1/forms", Some(&other), None).await;
    assert!(body["forms"].as_array().unwrap().is_empty());

    // Respondents can read the form definition
    let (status, body) = app.call(Method::GET, "/v1/forms/a", Some(&other), None).await;
    assert_eq!(status, StatusCode::OK);
    let form_id = body["form"]["id"].as_i64().unwrap();
    assert_eq!(
        body["form"]["questions"],
        json!([{
            "id": q,
            "form_id": form_id,
            "name": "Color",
            "choice_type": "dropdown",
            "choices": ["red", "blue"],
            "is_required": false
        }])
    );

    let (status, body) = app.call(Method::GET, "/v1/forms/zzz", Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "message": "Form not found" }));
}

#[tokio::test]
async fn questions_are_owner_only() {
    let app = TestApp::new();
    let owner = app.user("owner", "owner@corp.com");
    let other = app.user("other", "other@corp.com");
    app.create_form(&owner, json!({ "name": "A", "slug": "a", "description": "a" }))
        .await;
    app.create_form(&owner, json!({ "name": "B", "slug": "b", "description": "b" }))
        .await;
    let q = app
        .add_question(&owner, "a", json!({ "name": "Name", "choice_type": "short_answer" }))
        .await;

    let (status, _) = app
        .call(
            Method::POST,
            "/v1/forms/a/questions",
            Some(&other),
            Some(json!({ "name": "Sneaky", "choice_type": "date" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::POST,
            "/v1/forms/a/questions",
            Some(&owner),
            Some(json!({ "name": "Pick", "choice_type": "multiple choice" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["errors"]["choices"],
        json!(["The choices field is required when choice type is multiple choice."])
    );

    let uri = format!("/v1/forms/a/questions/{q}");
    let (status, _) = app.call(Method::DELETE, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A question is only reachable through its own form
    let wrong = format!("/v1/forms/b/questions/{q}");
    let (status, body) = app.call(Method::DELETE, &wrong, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "message": "Question not found" }));

    let (status, body) = app.call(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Remove question success" }));
}

#[tokio::test]
async fn deleting_a_form_removes_its_responses() {
    let app = TestApp::new();
    let owner = app.user("owner", "owner@corp.com");
    let user = app.user("u", "u@corp.com");
    app.create_form(&owner, json!({ "name": "A", "slug": "a", "description": "a" }))
        .await;
    let q = app
        .add_question(&owner, "a", json!({ "name": "Name", "choice_type": "time", "is_required": true }))
        .await;
    let (status, _) = app
        .submit(&user, "a", json!([{ "question_id": q, "value": "10:30" }]))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.call(Method::DELETE, "/v1/forms/a", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::DELETE, "/v1/forms/a", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call(Method::GET, "/v1/forms/a", Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let answers: i64 = app
        .state
        .db
        .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM answers", [], |r| r.get(0))?))
        .unwrap();
    assert_eq!(answers, 0);
}
