use super::Router;
use crate::error::{BoxError, RouterError};
use crate::middleware::{Middleware, Next, SharedMiddleware, handler_fn, middleware_fn, shared};
use crate::param::param_fn;
use crate::request::RequestContext;
use crate::url::UrlParams;
use futures::FutureExt;
use http::header::LOCATION;
use http::{Method, StatusCode};
use http_body_util::BodyExt;
use std::sync::{Arc, Mutex};

type Trace = Arc<Mutex<Vec<String>>>;

fn record(trace: &Trace, label: &'static str) -> impl Middleware + 'static {
    let trace = Arc::clone(trace);
    middleware_fn(move |ctx, next| {
        let trace = Arc::clone(&trace);
        async move {
            trace.lock().unwrap().push(label.to_string());
            next.run(ctx).await
        }
        .boxed()
    })
}

fn text(body: &'static str) -> impl Middleware + 'static {
    handler_fn(move |ctx: &mut RequestContext| ctx.set_text(body))
}

fn body(ctx: &RequestContext) -> &str {
    std::str::from_utf8(ctx.body().expect("no body")).unwrap()
}

async fn dispatch(router: &Router, method: Method, path: &str) -> RequestContext {
    let dispatcher = router.routes().unwrap();
    let mut ctx = RequestContext::new(method, path.parse().unwrap());
    dispatcher.call(&mut ctx, Next::empty()).await.unwrap();
    ctx
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_dispatch_sets_params_and_context() {
    let mut router = Router::builder().name("api").build().unwrap();
    router
        .get(
            ("post", "/:category/:title"),
            handler_fn(|ctx: &mut RequestContext| {
                let title = ctx.params().get("title").unwrap_or_default().to_string();
                ctx.set_text(title);
            }),
        )
        .unwrap();

    let ctx = dispatch(&router, Method::GET, "/programming/ben%20%26%20jerry's").await;
    assert_eq!(body(&ctx), "ben & jerry's");
    assert_eq!(ctx.params().get("category"), Some("programming"));
    assert_eq!(ctx.router_name(), Some("api"));
    assert_eq!(ctx.matched().len(), 1);
    assert_eq!(ctx.matched_route().unwrap().name(), Some("post"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_malformed_param_is_kept_raw() {
    let mut router = Router::new();
    router
        .get(
            "/:category",
            handler_fn(|ctx: &mut RequestContext| {
                let category = ctx.params().get("category").unwrap_or_default().to_string();
                ctx.set_text(category);
            }),
        )
        .unwrap();

    let ctx = dispatch(&router, Method::GET, "/%92%5e%1b").await;
    assert_eq!(body(&ctx), "%92%5e%1b");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_no_route_runs_outer_continuation() {
    let mut router = Router::new();
    router.get("/users", text("users")).unwrap();
    let dispatcher = router.routes().unwrap();

    let trace = Trace::default();
    let after = [shared(record(&trace, "after"))];
    let mut ctx = RequestContext::new(Method::GET, "/posts".parse().unwrap());
    dispatcher.call(&mut ctx, Next::new(&after, None)).await.unwrap();

    assert_eq!(*trace.lock().unwrap(), vec!["after"]);
    assert_eq!(ctx.status(), StatusCode::NOT_FOUND);
    assert!(ctx.matched_route().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_first_declared_route_wins() {
    let mut router = Router::new();
    router.get("/users/:id", text("first")).unwrap();
    router.get("/users/:id", text("second")).unwrap();

    let ctx = dispatch(&router, Method::GET, "/users/1").await;
    assert_eq!(body(&ctx), "first");
    assert_eq!(ctx.matched().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_get_answers_head_unless_head_registered() {
    let mut router = Router::new();
    router.get("/x", text("get")).unwrap();
    assert_eq!(body(&dispatch(&router, Method::HEAD, "/x").await), "get");

    router.head("/x", text("head")).unwrap();
    assert_eq!(body(&dispatch(&router, Method::HEAD, "/x").await), "head");
    assert_eq!(body(&dispatch(&router, Method::GET, "/x").await), "get");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_same_child_nested_several_times() {
    let mut child = Router::new();
    child.get("/hello", text("hello")).unwrap();
    let child = Arc::new(child);

    let mut router = Router::new();
    router.nest_at("/foo", Arc::clone(&child)).unwrap();
    router.nest_at("/bar", Arc::clone(&child)).unwrap();
    router.nest(Arc::clone(&child));

    for path in ["/foo/hello", "/bar/hello", "/hello"] {
        let ctx = dispatch(&router, Method::GET, path).await;
        assert_eq!(body(&ctx), "hello", "path {path}");
    }
    assert_eq!(child.prefix(), "");
    assert_eq!(child.compile().unwrap().routes()[0].path(), "/hello");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_nested_wildcard_precedence() {
    let mut admin = Router::builder().prefix("/admin").build().unwrap();
    admin.get("*", text("admin")).unwrap();

    let mut router = Router::new();
    router.nest(admin);
    router.get("*", text("fallback")).unwrap();

    assert_eq!(body(&dispatch(&router, Method::GET, "/admin").await), "admin");
    assert_eq!(body(&dispatch(&router, Method::GET, "/admin/users/1").await), "admin");
    assert_eq!(body(&dispatch(&router, Method::GET, "/administration").await), "fallback");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_outer_wildcard_declared_first_wins() {
    let mut admin = Router::new();
    admin.get("/users", text("admin users")).unwrap();

    let mut router = Router::new();
    router.get("*", text("fallback")).unwrap();
    router.nest_at("/admin", admin).unwrap();

    assert_eq!(body(&dispatch(&router, Method::GET, "/admin/users").await), "fallback");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_routes_and_nests_keep_declaration_order() {
    let mut nested = Router::new();
    nested.get("/item", text("nested")).unwrap();

    let mut router = Router::new();
    router.get("/first", text("first")).unwrap();
    router.nest(nested);
    router.get("/item", text("own")).unwrap();

    let paths: Vec<_> = router.compile().unwrap().routes().iter().map(|route| route.path().to_string()).collect();
    assert_eq!(paths, vec!["/first", "/item", "/item"]);
    assert_eq!(body(&dispatch(&router, Method::GET, "/item").await), "nested");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_middleware_order() {
    let trace = Trace::default();

    let mut child = Router::new();
    child.use_middleware(record(&trace, "child"));
    child.get("/:id", vec![shared(record(&trace, "handler 1")), shared(record(&trace, "handler 2"))]).unwrap();

    let mut router = Router::new();
    router.use_middleware(record(&trace, "root"));
    router.param("id", {
        let trace = Arc::clone(&trace);
        param_fn(move |value, ctx, next| {
            let trace = Arc::clone(&trace);
            async move {
                trace.lock().unwrap().push(format!("param {value}"));
                next.run(ctx).await
            }
            .boxed()
        })
    });
    router.nest_at("/users", child).unwrap();

    dispatch(&router, Method::GET, "/users/7").await;
    assert_eq!(*trace.lock().unwrap(), vec!["root", "child", "param 7", "handler 1", "handler 2"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_param_handlers_follow_url_order() {
    let trace = Trace::default();
    let mut router = Router::new();

    for name in ["d", "c", "b", "a"] {
        let trace = Arc::clone(&trace);
        router.param(
            name,
            param_fn(move |value, ctx, next| {
                let trace = Arc::clone(&trace);
                async move {
                    trace.lock().unwrap().push(value);
                    next.run(ctx).await
                }
                .boxed()
            }),
        );
    }
    router.get("/:a/:b/:c/:d", text("done")).unwrap();

    let ctx = dispatch(&router, Method::GET, "/1/2/3/4").await;
    assert_eq!(body(&ctx), "done");
    assert_eq!(*trace.lock().unwrap(), vec!["1", "2", "3", "4"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_param_handler_short_circuits_route() {
    let mut router = Router::new();
    router.param(
        "id",
        param_fn(|value, ctx, next| {
            async move {
                if value.parse::<u32>().is_err() {
                    ctx.set_status(StatusCode::BAD_REQUEST);
                    return Ok(());
                }
                next.run(ctx).await
            }
            .boxed()
        }),
    );
    router.get("/users/:id", text("user")).unwrap();

    let ctx = dispatch(&router, Method::GET, "/users/abc").await;
    assert_eq!(ctx.status(), StatusCode::BAD_REQUEST);
    assert!(ctx.body().is_none());

    let ctx = dispatch(&router, Method::GET, "/users/12").await;
    assert_eq!(body(&ctx), "user");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_nested_param_handler_overrides_inherited() {
    let tagging = |tag: &'static str| {
        param_fn(move |_value, ctx, next| {
            async move {
                ctx.extensions_mut().insert(tag);
                next.run(ctx).await
            }
            .boxed()
        })
    };
    let tag = handler_fn(|ctx: &mut RequestContext| {
        let tag = ctx.extensions().get::<&'static str>().copied().unwrap_or("none");
        ctx.set_text(tag);
    });

    let mut child = Router::new();
    child.param("id", tagging("child"));
    child.get("/child/:id", tag).unwrap();

    let mut router = Router::new();
    router.param("id", tagging("root"));
    router.get("/root/:id", handler_fn(|ctx: &mut RequestContext| {
        let tag = ctx.extensions().get::<&'static str>().copied().unwrap_or("none");
        ctx.set_text(tag);
    }))
    .unwrap();
    router.nest(child);

    assert_eq!(body(&dispatch(&router, Method::GET, "/root/1").await), "root");
    assert_eq!(body(&dispatch(&router, Method::GET, "/child/1").await), "child");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_prefix_params_are_captured() {
    let mut posts = Router::builder().prefix("/users/:user").build().unwrap();
    posts
        .get(
            "/posts/:post",
            handler_fn(|ctx: &mut RequestContext| {
                let user = ctx.params().get("user").unwrap_or_default().to_string();
                let post = ctx.params().get("post").unwrap_or_default().to_string();
                ctx.set_text(format!("{user}:{post}"));
            }),
        )
        .unwrap();

    let mut router = Router::new();
    router.nest_at("/api", posts).unwrap();

    assert_eq!(body(&dispatch(&router, Method::GET, "/api/users/ann/posts/9").await), "ann:9");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_short_circuit_and_error_propagation() {
    let trace = Trace::default();
    let mut router = Router::new();
    router.use_middleware(middleware_fn(|ctx, next| {
        async move {
            if ctx.headers().contains_key("x-deny") {
                ctx.set_status(StatusCode::FORBIDDEN);
                return Ok(());
            }
            next.run(ctx).await
        }
        .boxed()
    }));
    router.get("/ok", record(&trace, "ok")).unwrap();
    router.get("/fail", handler_fn(|_ctx: &mut RequestContext| -> Result<(), BoxError> { Err("handler failed".into()) })).unwrap();

    let dispatcher = router.routes().unwrap();

    let mut denied = RequestContext::with_headers(Method::GET, "/ok".parse().unwrap(), {
        let mut headers = http::HeaderMap::new();
        headers.insert("x-deny", http::HeaderValue::from_static("1"));
        headers
    });
    dispatcher.call(&mut denied, Next::empty()).await.unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    assert!(trace.lock().unwrap().is_empty());

    let mut failing = RequestContext::new(Method::GET, "/fail".parse().unwrap());
    let error = dispatcher.call(&mut failing, Next::empty()).await.unwrap_err();
    assert_eq!(error.to_string(), "handler failed");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_all_and_register() {
    let mut router = Router::new();
    router.all("/any", text("any")).unwrap();
    router.register(["get", "Post"], "/two", text("two")).unwrap();

    for method in [Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS, Method::HEAD] {
        assert_eq!(body(&dispatch(&router, method, "/any").await), "any");
    }
    assert_eq!(body(&dispatch(&router, Method::POST, "/two").await), "two");
    assert!(dispatch(&router, Method::PUT, "/two").await.body().is_none());

    assert!(matches!(router.register(["not a method"], "/x", text("x")), Err(RouterError::InvalidMethod { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_target_shapes_register_every_path() {
    let mut router = Router::new();
    router.get(("pages", ["/a", "/b"]), text("page")).unwrap();
    router.get(regex::Regex::new(r"^/blog/(\d+)$").unwrap(), text("blog")).unwrap();

    assert_eq!(body(&dispatch(&router, Method::GET, "/a").await), "page");
    assert_eq!(body(&dispatch(&router, Method::GET, "/b").await), "page");
    assert_eq!(body(&dispatch(&router, Method::GET, "/blog/3").await), "blog");
    assert_eq!(router.route("pages").unwrap().path(), "/a");

    let empty: Vec<SharedMiddleware> = vec![];
    assert!(matches!(router.get("/c", empty), Err(RouterError::InvalidArguments { .. })));
    assert!(matches!(router.get("/users/:id/:id", text("dup")), Err(RouterError::DuplicateParameter { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_sensitive_and_strict_options() {
    let mut loose = Router::new();
    loose.get("/users", text("users")).unwrap();
    assert_eq!(body(&dispatch(&loose, Method::GET, "/USERS/").await), "users");

    let mut strict = Router::builder().sensitive(true).strict(true).build().unwrap();
    strict.get("/users", text("users")).unwrap();
    assert!(dispatch(&strict, Method::GET, "/USERS").await.body().is_none());
    assert!(dispatch(&strict, Method::GET, "/users/").await.body().is_none());
    assert_eq!(body(&dispatch(&strict, Method::GET, "/users").await), "users");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_set_prefix_applies_on_next_compile() {
    let mut router = Router::new();
    router.get("/users", text("users")).unwrap();
    let before = router.routes().unwrap();

    router.set_prefix("/v1").unwrap();
    assert_eq!(router.prefix(), "/v1");
    assert_eq!(body(&dispatch(&router, Method::GET, "/v1/users").await), "users");

    let mut ctx = RequestContext::new(Method::GET, "/users".parse().unwrap());
    before.call(&mut ctx, Next::empty()).await.unwrap();
    assert_eq!(body(&ctx), "users");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_router_path_override() {
    let mut router = Router::new();
    router.get("/internal", text("internal")).unwrap();

    let dispatcher = router.routes().unwrap();
    let mut ctx = RequestContext::new(Method::GET, "/public".parse().unwrap());
    ctx.set_router_path("/internal");
    dispatcher.call(&mut ctx, Next::empty()).await.unwrap();
    assert_eq!(body(&ctx), "internal");
}

#[test]
fn test_url_generation() {
    let mut users = Router::new();
    users.get(("user", "/:id/:category"), text("user")).unwrap();
    users.get(("list", "/"), text("list")).unwrap();

    let mut router = Router::builder().prefix("/api").build().unwrap();
    router.nest_at("/users", users).unwrap();

    let params = UrlParams::new().param("id", 2).param("category", "koa router");
    assert_eq!(router.url("user", params).unwrap(), "/api/users/2/koa%20router");
    assert_eq!(router.url("user", UrlParams::positional([1, 2]).query("page=3")).unwrap(), "/api/users/1/2?page=3");
    assert_eq!(router.url("list", [("page", 2)]).unwrap(), "/api/users?page=2");

    assert!(matches!(router.url("user", [("id", 1)]), Err(RouterError::MissingParameter { name }) if name == "category"));
    assert!(matches!(router.url("missing", ()), Err(RouterError::UnknownRoute { .. })));

    let raw = router.route("user").unwrap();
    assert_eq!(raw.path(), "/:id/:category");
    assert_eq!(raw.url([("id", 1), ("category", 2)]).unwrap(), "/1/2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_redirects() {
    let mut router = Router::new();
    router.get(("home", "/home"), text("home")).unwrap();
    router.redirect("/", "home").unwrap();
    router.redirect_with_status("/old", "https://example.com/new", StatusCode::TEMPORARY_REDIRECT).unwrap();

    let ctx = dispatch(&router, Method::GET, "/").await;
    assert_eq!(ctx.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(ctx.response_headers().get(LOCATION).unwrap(), "/home");

    let ctx = dispatch(&router, Method::POST, "/old").await;
    assert_eq!(ctx.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(ctx.response_headers().get(LOCATION).unwrap(), "https://example.com/new");

    assert!(matches!(router.redirect("/x", "nowhere"), Err(RouterError::UnknownRoute { .. })));
    assert!(matches!(router.redirect("/x", ""), Err(RouterError::InvalidArguments { .. })));
    assert!(matches!(
        router.redirect_with_status("/x", "/home", StatusCode::OK),
        Err(RouterError::InvalidArguments { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_into_response() {
    let mut router = Router::new();
    router.get("/hello", text("hello world")).unwrap();

    let response = dispatch(&router, Method::GET, "/hello").await.into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(bytes.as_ref(), b"hello world");

    let missing = dispatch(&router, Method::GET, "/nothing").await.into_response();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_regex_route_prefix_follows_router_options() {
    let mut router = Router::builder().sensitive(true).prefix("/API").build().unwrap();
    router.get(regex::Regex::new("^/x$").unwrap(), text("regex")).unwrap();
    router.get("/y", text("template")).unwrap();

    assert_eq!(body(&dispatch(&router, Method::GET, "/API/x").await), "regex");
    assert_eq!(body(&dispatch(&router, Method::GET, "/API/y").await), "template");
    assert!(dispatch(&router, Method::GET, "/api/x").await.body().is_none());
    assert!(dispatch(&router, Method::GET, "/api/y").await.body().is_none());
}

#[test]
fn test_parameter_names_are_unique_across_prefixes() {
    let mut child = Router::new();
    child.get("/:id", text("child")).unwrap();
    let mut router = Router::builder().prefix("/users/:id").build().unwrap();
    router.nest(child);

    let error = router.compile().unwrap_err();
    assert!(matches!(error, RouterError::DuplicateParameter { ref name, .. } if name == "id"), "{error}");

    let mut router = Router::builder().prefix("/blog/:year").build().unwrap();
    router.get(regex::Regex::new(r"^/(?P<year>\d{4})$").unwrap(), text("regex")).unwrap();
    assert!(matches!(router.compile(), Err(RouterError::DuplicateParameter { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn test_suspending_stages_keep_their_order() {
    let trace = Trace::default();
    let mut router = Router::new();
    {
        let trace = Arc::clone(&trace);
        router.use_middleware(middleware_fn(move |ctx, next| {
            let trace = Arc::clone(&trace);
            async move {
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                trace.lock().unwrap().push("slow".to_string());
                let result = next.run(ctx).await;
                trace.lock().unwrap().push("slow done".to_string());
                result
            }
            .boxed()
        }));
    }
    {
        let trace = Arc::clone(&trace);
        router.use_middleware(middleware_fn(move |ctx, next| {
            let trace = Arc::clone(&trace);
            async move {
                tokio::task::yield_now().await;
                trace.lock().unwrap().push("fast".to_string());
                next.run(ctx).await
            }
            .boxed()
        }));
    }
    {
        let trace = Arc::clone(&trace);
        router
            .get(
                "/",
                handler_fn(move |ctx: &mut RequestContext| {
                    trace.lock().unwrap().push("handler".to_string());
                    ctx.set_text("done");
                }),
            )
            .unwrap();
    }

    let ctx = dispatch(&router, Method::GET, "/").await;
    assert_eq!(body(&ctx), "done");
    assert_eq!(*trace.lock().unwrap(), vec!["slow", "fast", "handler", "slow done"]);
}
