use std::net::SocketAddr;
use axum::{Json, Router, routing::get};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use crate::state::AppState;
use crate::{auth, products};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(products::router())
        .route("/", get(root))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

async fn root() -> Json<Value> {
    Json(json!({ "Hello": "World!" }))
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
        .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod http_tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.expect("router is infallible")
    }

    async fn body_json(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn bare_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn register(app: &Router, name: &str, email: &str, password: &str) -> Response {
        let body = json!({ "name": name, "email": email, "password": password });
        send(app, json_request(Method::POST, "/users/registration", None, body)).await
    }

    async fn login(app: &Router, username: &str, password: &str) -> Response {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("username={username}&password={password}")))
            .unwrap();
        send(app, req).await
    }

    async fn token_for(app: &Router, name: &str, password: &str) -> String {
        let res = login(app, name, password).await;
        assert_eq!(res.status(), StatusCode::OK);
        body_json(res).await["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn end_to_end_ownership_scenario() {
        let app = build_app(AppState::fake());

        let res = register(&app, "alice", "a@x.com", "secret").await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let alice = body_json(res).await;
        assert_eq!(alice["name"], "alice");
        assert!(alice.get("password").is_none());

        let res = login(&app, "alice", "secret").await;
        assert_eq!(res.status(), StatusCode::OK);
        let token = body_json(res).await;
        assert_eq!(token["token_type"], "bearer");
        let alice_token = token["access_token"].as_str().unwrap().to_string();

        let res = send(
            &app,
            json_request(
                Method::POST,
                "/product/",
                Some(&alice_token),
                json!({ "title": "T", "description": "D" }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let product = body_json(res).await;
        assert_eq!(product["author_name"], "alice");
        assert_eq!(product["author_id"], alice["_id"]);
        let uri = format!("/product/{}", product["_id"].as_str().unwrap());

        assert_eq!(register(&app, "bob", "b@x.com", "hunter2").await.status(), StatusCode::CREATED);
        let bob_token = token_for(&app, "bob", "hunter2").await;

        let res = send(
            &app,
            json_request(Method::PUT, &uri, Some(&bob_token), json!({ "title": "mine now" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = send(&app, bare_request(Method::DELETE, &uri, Some(&alice_token))).await;
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let res = send(&app, bare_request(Method::GET, &uri, None)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn owner_update_is_partial() {
        let app = build_app(AppState::fake());
        register(&app, "alice", "a@x.com", "secret").await;
        let token = token_for(&app, "alice", "secret").await;

        let res = send(
            &app,
            json_request(
                Method::POST,
                "/product",
                Some(&token),
                json!({ "title": "T", "description": "D" }),
            ),
        )
        .await;
        let created = body_json(res).await;
        let uri = format!("/product/{}", created["_id"].as_str().unwrap());

        let res = send(
            &app,
            json_request(Method::PUT, &uri, Some(&token), json!({ "description": "D2" })),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        let updated = body_json(res).await;
        assert_eq!(updated["title"], "T");
        assert_eq!(updated["description"], "D2");
        assert_eq!(updated["created_at"], created["created_at"]);
    }

    #[tokio::test]
    async fn protected_routes_challenge_before_ownership_or_existence() {
        let app = build_app(AppState::fake());
        let missing = format!("/product/{}", uuid::Uuid::new_v4());

        for req in [
            bare_request(Method::GET, "/users/me", None),
            json_request(Method::POST, "/product/", None, json!({ "title": "T", "description": "D" })),
            json_request(Method::PUT, &missing, None, json!({ "title": "T" })),
            bare_request(Method::DELETE, &missing, Some("garbage")),
        ] {
            let res = send(&app, req).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
            assert_eq!(body_json(res).await["detail"], crate::error::UNAUTHORIZED_DETAIL);
        }
    }

    #[tokio::test]
    async fn anonymous_mutation_of_existing_product_is_unauthorized() {
        let app = build_app(AppState::fake());
        register(&app, "alice", "a@x.com", "secret").await;
        let token = token_for(&app, "alice", "secret").await;
        let body = json!({ "title": "T", "description": "D" });
        let res = send(&app, json_request(Method::POST, "/product/", Some(&token), body)).await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let id = body_json(res).await["_id"].as_str().unwrap().to_string();
        let uri = format!("/product/{id}");

        for req in [
            json_request(Method::PUT, &uri, None, json!({ "title": "hijacked" })),
            bare_request(Method::DELETE, &uri, None),
            json_request(Method::PUT, &uri, Some("garbage"), json!({ "title": "hijacked" })),
            bare_request(Method::DELETE, &uri, Some("garbage")),
        ] {
            let res = send(&app, req).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
        }

        let res = send(&app, bare_request(Method::GET, &uri, None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["title"], "T");
    }

    #[tokio::test]
    async fn missing_product_is_not_found_for_authenticated_caller() {
        let app = build_app(AppState::fake());
        register(&app, "alice", "a@x.com", "secret").await;
        let token = token_for(&app, "alice", "secret").await;
        let missing = format!("/product/{}", uuid::Uuid::new_v4());

        let res = send(&app, json_request(Method::PUT, &missing, Some(&token), json!({}))).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let res = send(&app, bare_request(Method::DELETE, &missing, Some(&token))).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let res = send(&app, bare_request(Method::GET, "/product/not-an-id", None)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn me_returns_the_token_owner() {
        let app = build_app(AppState::fake());
        register(&app, "alice", "a@x.com", "secret").await;
        let token = token_for(&app, "alice", "secret").await;

        let res = send(&app, bare_request(Method::GET, "/users/me", Some(&token))).await;
        assert_eq!(res.status(), StatusCode::OK);
        let me = body_json(res).await;
        assert_eq!(me["name"], "alice");
        assert_eq!(me["email"], "a@x.com");
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = build_app(AppState::fake());
        assert_eq!(register(&app, "alice", "a@x.com", "secret").await.status(), StatusCode::CREATED);

        let res = register(&app, "alice", "new@x.com", "secret").await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(res).await["detail"], "Username is Already Exist");

        let res = register(&app, "alice2", "a@x.com", "secret").await;
        assert_eq!(res.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(res).await["detail"], "Email is Already Exist");
    }

    #[tokio::test]
    async fn bad_login_is_not_found() {
        let app = build_app(AppState::fake());
        register(&app, "alice", "a@x.com", "secret").await;

        let res = login(&app, "alice", "wrong").await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let res = login(&app, "nobody", "secret").await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listing_defaults_and_zero_limit() {
        let app = build_app(AppState::fake());
        register(&app, "alice", "a@x.com", "secret").await;
        let token = token_for(&app, "alice", "secret").await;
        for i in 0..12 {
            let body = json!({ "title": format!("t{i}"), "description": "d" });
            let res = send(&app, json_request(Method::POST, "/product/", Some(&token), body)).await;
            assert_eq!(res.status(), StatusCode::CREATED);
        }

        let res = send(&app, bare_request(Method::GET, "/product/", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let page = body_json(res).await;
        let page = page.as_array().unwrap();
        assert_eq!(page.len(), 10);
        assert_eq!(page[0]["title"], "t11");

        let res = send(&app, bare_request(Method::GET, "/product/?limit=0", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await, json!([]));

        let res = send(&app, bare_request(Method::GET, "/product/?limit=3&orderby=title", None)).await;
        let titles: Vec<_> = body_json(res)
            .await
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, ["t9", "t8", "t7"]);
    }

    #[tokio::test]
    async fn root_and_health() {
        let app = build_app(AppState::fake());
        let res = send(&app, bare_request(Method::GET, "/", None)).await;
        assert_eq!(body_json(res).await, json!({ "Hello": "World!" }));
        let res = send(&app, bare_request(Method::GET, "/health", None)).await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}
