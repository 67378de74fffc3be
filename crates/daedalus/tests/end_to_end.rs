//! End-to-end pipeline tests: raw HTTP request in, rendered response
//! out.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, StatusCode};
use serde_json::Value;

use daedalus::decorate::{authorize, route, val};
use daedalus::prelude::*;
use daedalus::{number, string};

fn get(path: &str) -> Request<Bytes> {
    Request::get(path).body(Bytes::new()).expect("request")
}

fn post_json(path: &str, body: Value) -> Request<Bytes> {
    Request::post(path)
        .header("content-type", "application/json")
        .body(Bytes::from(serde_json::to_vec(&body).expect("encode")))
        .expect("request")
}

fn body_json(response: &http::Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).expect("json body")
}

fn animal_space() -> (TypeSpace, ClassId) {
    let space = TypeSpace::new();
    let animals = space
        .define("AnimalController")
        .factory(|| ())
        .method("get", |m| {
            m.param("id", number())
                .decorate(route::get(Some("/animals/:id")))
                .decorate_param(0, val::required())
                .handler(action(|ctx: ActionContext| async move {
                    Ok(ActionResult::from_body(serde_json::json!({
                        "parameters": ctx.args,
                    })))
                }))
        })
        .register()
        .expect("controller");
    (space, animals)
}

#[tokio::test]
async fn test_path_param_is_coerced_to_number() {
    let (space, animals) = animal_space();
    let app = Application::builder(space)
        .controller(animals)
        .build()
        .expect("app");

    let response = app.handle(get("/animals/42")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(&response)["parameters"], serde_json::json!([42]));
}

#[tokio::test]
async fn test_unconvertible_path_param_is_422_with_path() {
    let (space, animals) = animal_space();
    let app = Application::builder(space)
        .controller(animals)
        .build()
        .expect("app");

    let response = app.handle(get("/animals/abc")).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(&response);
    let issue = &body["error"]["issues"][0];
    assert_eq!(issue["path"], serde_json::json!(["id"]));
    assert!(issue["messages"][0]
        .as_str()
        .expect("message")
        .starts_with("Unable to convert"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (space, animals) = animal_space();
    let app = Application::builder(space)
        .controller(animals)
        .build()
        .expect("app");

    let response = app.handle(get("/nowhere")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

struct ShortCircuit;

#[async_trait]
impl Middleware for ShortCircuit {
    async fn execute(&self, _invocation: Invocation) -> DaedalusResult<ActionResult> {
        Ok(ActionResult::from_body(serde_json::json!("intercepted")))
    }
}

#[tokio::test]
async fn test_middleware_short_circuit_skips_action() {
    let (space, animals) = animal_space();
    let app = Application::builder(space)
        .controller(animals)
        .middleware(Arc::new(ShortCircuit))
        .build()
        .expect("app");

    let response = app.handle(get("/animals/42")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(&response), serde_json::json!("intercepted"));
}

fn protected_space() -> (TypeSpace, ClassId) {
    let space = TypeSpace::new();
    let admin = space
        .define("AdminController")
        .factory(|| ())
        .decorate(authorize::role(["admin"]))
        .method("panel", |m| {
            m.decorate(route::get(Some("/admin")))
                .handler(action(|_ctx: ActionContext| async move {
                    Ok(ActionResult::from_body(serde_json::json!("welcome")))
                }))
        })
        .register()
        .expect("controller");
    (space, admin)
}

fn role_header_provider(ctx: &RequestContext) -> Option<Identity> {
    ctx.header("x-role")
        .map(|role| Identity::with_roles([role]))
}

#[tokio::test]
async fn test_role_protected_route() {
    let (space, admin) = protected_space();
    let app = Application::builder(space)
        .controller(admin)
        .identity_provider(role_header_provider)
        .build()
        .expect("app");

    // Anonymous: 401.
    let response = app.handle(get("/admin")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Wrong role: 403.
    let request = Request::get("/admin")
        .header("x-role", "viewer")
        .body(Bytes::new())
        .expect("request");
    let response = app.handle(request).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Admin: 200.
    let request = Request::get("/admin")
        .header("x-role", "admin")
        .body(Bytes::new())
        .expect("request");
    let response = app.handle(request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_body_model_validation_aggregates_paths() {
    let space = TypeSpace::new();
    let dto = space
        .define("AnimalDto")
        .property("name", string())
        .property("age", number())
        .decorate_member("name", val::required())
        .register()
        .expect("dto");
    let animals = space
        .define("AnimalController")
        .factory(|| ())
        .method("save", |m| {
            m.param("animal", daedalus::class(dto))
                .decorate(route::post(Some("/animals")))
                .decorate_param(0, val::required())
                .handler(action(|ctx: ActionContext| async move {
                    Ok(ActionResult::from_body(ctx.arg(0).clone())
                        .status(StatusCode::CREATED))
                }))
        })
        .register()
        .expect("controller");
    let app = Application::builder(space)
        .controller(animals)
        .build()
        .expect("app");

    // Missing name plus unconvertible age: two issues, two paths.
    let response = app
        .handle(post_json("/animals", serde_json::json!({"age": "old"})))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let issues = body_json(&response)["error"]["issues"].clone();
    assert_eq!(issues.as_array().expect("issues").len(), 2);

    // A valid body reaches the action and its explicit status.
    let response = app
        .handle(post_json(
            "/animals",
            serde_json::json!({"name": "Rex", "age": "3"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(&response)["age"], serde_json::json!(3));
}

#[tokio::test]
async fn test_redirect_and_cookie_rendering() {
    let space = TypeSpace::new();
    let auth = space
        .define("SessionController")
        .factory(|| ())
        .method("login", |m| {
            m.decorate(route::post(Some("/login")))
                .handler(action(|_ctx: ActionContext| async move {
                    Ok(ActionResult::redirect("/home").cookie("session", "abc"))
                }))
        })
        .register()
        .expect("controller");
    let app = Application::builder(space)
        .controller(auth)
        .build()
        .expect("app");

    let response = app
        .handle(
            Request::post("/login")
                .body(Bytes::new())
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get("location").map(http::HeaderValue::as_bytes),
        Some(b"/home".as_ref())
    );
    assert_eq!(
        response.headers().get("set-cookie").map(http::HeaderValue::as_bytes),
        Some(b"session=abc".as_ref())
    );
}

#[tokio::test]
async fn test_crud_controller_bound_to_entity() {
    let space = TypeSpace::new();
    let template = define_template(&space).expect("template");
    let animal = space
        .define("Animal")
        .property("id", number())
        .property("name", string())
        .register()
        .expect("animal");
    let bound = bind_entity(&space, template, "AnimalController", animal, number())
        .expect("bind");

    let repo = Arc::new(daedalus::core::InMemoryRepository::new());
    let container = Container::new();
    container.register(bound, CrudController::new(repo));

    let app = Application::builder(space)
        .controller(bound)
        .resolver(Arc::new(container))
        .build()
        .expect("app");

    // Create.
    let response = app
        .handle(post_json("/animal", serde_json::json!({"name": "Rex"})))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(&response);
    assert_eq!(created["id"], serde_json::json!(1));

    // Read back through the path parameter (string id coerced).
    let response = app.handle(get("/animal/1")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(&response)["name"], serde_json::json!("Rex"));

    // List.
    let response = app.handle(get("/animal")).await;
    assert_eq!(
        body_json(&response).as_array().expect("array").len(),
        1
    );

    // Delete, then 404.
    let response = app
        .handle(
            Request::delete("/animal/1")
                .body(Bytes::new())
                .expect("request"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = app.handle(get("/animal/1")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_routes_surface_as_analyzer_issues() {
    let space = TypeSpace::new();
    let id = space
        .define("DupController")
        .factory(|| ())
        .method("a", |m| {
            m.decorate(route::get(Some("/dup")))
                .handler(action(|_ctx: ActionContext| async move {
                    Ok(ActionResult::from_body(serde_json::json!("a")))
                }))
        })
        .method("b", |m| {
            m.decorate(route::get(Some("/dup")))
                .handler(action(|_ctx: ActionContext| async move {
                    Ok(ActionResult::from_body(serde_json::json!("b")))
                }))
        })
        .register()
        .expect("controller");
    let app = Application::builder(space)
        .controller(id)
        .build()
        .expect("app");

    assert_eq!(app.route_issues().len(), 1);

    // First registered wins at request time.
    let response = app.handle(get("/dup")).await;
    assert_eq!(body_json(&response), serde_json::json!("a"));
}

#[tokio::test]
async fn test_query_string_binds_by_name() {
    let space = TypeSpace::new();
    let id = space
        .define("SearchController")
        .factory(|| ())
        .method("find", |m| {
            m.param("term", string())
                .decorate(route::get(Some("/search")))
                .handler(action(|ctx: ActionContext| async move {
                    Ok(ActionResult::from_body(ctx.arg(0).clone()))
                }))
        })
        .register()
        .expect("controller");
    let app = Application::builder(space)
        .controller(id)
        .build()
        .expect("app");

    let response = app.handle(get("/search?term=rex")).await;
    assert_eq!(body_json(&response), serde_json::json!("rex"));
}
