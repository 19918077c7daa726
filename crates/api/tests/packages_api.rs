//! Integration tests for `/installPackages`.

mod common;

use axum::http::StatusCode;
use std::time::Duration;

use common::{body_bytes, body_json, build_test_app, build_test_app_with, post_json};
use serde_json::json;

#[tokio::test]
async fn unversioned_package_installs_latest() {
    let app = build_test_app();
    app.npm.publish("is-number", "7.0.0");

    let response = post_json(
        &app.router,
        "/installPackages",
        json!([{"package": "is-number"}]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response).await.is_empty());
    assert_eq!(app.npm.install_calls(), vec!["is-number@latest"]);
    assert_eq!(app.npm.installed_version("is-number").as_deref(), Some("7.0.0"));
}

#[tokio::test]
async fn identical_second_request_installs_nothing() {
    let app = build_test_app();
    app.npm.publish("is-number", "7.0.0");
    app.npm.publish("lodash", "4.17.21");
    let body = json!([
        {"package": "is-number", "version": "2.0.0"},
        {"package": "lodash"}
    ]);

    post_json(&app.router, "/installPackages", body.clone()).await;
    assert_eq!(app.npm.install_calls().len(), 2);

    let response = post_json(&app.router, "/installPackages", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.npm.install_calls().len(), 2);
}

#[tokio::test]
async fn exact_version_already_installed_is_skipped() {
    let app = build_test_app();
    app.npm.publish("is-number", "7.0.0");
    app.npm.preinstall("is-number", "2.0.0");

    let response = post_json(
        &app.router,
        "/installPackages",
        json!([{"package": "is-number", "version": "2.0.0"}]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.npm.install_calls().is_empty());
    assert!(app.npm.view_calls().is_empty());
}

#[tokio::test]
async fn outdated_package_is_upgraded_to_latest() {
    let app = build_test_app();
    app.npm.publish("is-number", "7.0.0");
    app.npm.preinstall("is-number", "6.0.0");

    post_json(
        &app.router,
        "/installPackages",
        json!([{"package": "is-number"}]),
    )
    .await;

    assert_eq!(app.npm.install_calls(), vec!["is-number@latest"]);
    assert_eq!(app.npm.installed_version("is-number").as_deref(), Some("7.0.0"));
}

#[tokio::test]
async fn name_is_accepted_as_alias() {
    let app = build_test_app();
    app.npm.publish("is-number", "7.0.0");

    let response = post_json(
        &app.router,
        "/installPackages",
        json!([{"name": "is-number", "version": "7.0.0"}]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.npm.install_calls(), vec!["is-number@7.0.0"]);
}

#[tokio::test]
async fn install_failure_aborts_with_500() {
    let app = build_test_app();
    app.npm.publish("good", "1.0.0");
    app.npm.publish("broken", "1.0.0");
    app.npm.publish("never", "1.0.0");
    app.npm.fail_installs_of("broken");

    let response = post_json(
        &app.router,
        "/installPackages",
        json!([{"package": "good"}, {"package": "broken"}, {"package": "never"}]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["code"], "INSTALL_ERROR");
    assert!(json["error"].as_str().unwrap().contains("broken"));
    assert_eq!(app.npm.install_calls(), vec!["good@latest", "broken@latest"]);
    // Earlier installs are not rolled back.
    assert!(app.npm.installed_version("good").is_some());
}

#[tokio::test]
async fn invalid_package_name_is_400_without_npm_calls() {
    let app = build_test_app();

    let response = post_json(
        &app.router,
        "/installPackages",
        json!([{"package": "--global"}]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert!(app.npm.install_calls().is_empty());
    assert!(app.npm.view_calls().is_empty());
}

#[tokio::test]
async fn empty_request_is_a_no_op() {
    let app = build_test_app();

    let response = post_json(&app.router, "/installPackages", json!([])).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.npm.install_calls().is_empty());
}

#[tokio::test]
async fn inspect_reports_installed_and_latest_versions() {
    let app = build_test_app();
    app.npm.publish("is-number", "7.0.0");
    app.npm.publish("lodash", "4.17.21");
    app.npm.preinstall("is-number", "6.0.0");

    let response = post_json(
        &app.router,
        "/inspectPackages",
        json!([{"package": "is-number"}, {"package": "lodash"}]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!([{"name": "is-number", "installed": "6.0.0", "latest": "7.0.0"}])
    );
    assert!(app.npm.install_calls().is_empty());
}

#[tokio::test]
async fn slow_install_outlasts_request_timeout() {
    let app = build_test_app_with(|config| config.request_timeout_secs = 1);
    app.npm.publish("is-number", "7.0.0");
    app.npm.delay_installs(Duration::from_millis(1500));

    let response = post_json(
        &app.router,
        "/installPackages",
        json!([{"package": "is-number"}]),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.npm.installed_version("is-number").as_deref(), Some("7.0.0"));
}
