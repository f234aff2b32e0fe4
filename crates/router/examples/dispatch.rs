use futures::FutureExt;
use http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use micro_router::{AllowedMethodsOptions, Chain, RequestContext, Router, handler_fn, middleware_fn, param_fn};
use std::time::Instant;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

fn users() -> Router {
    let mut users = Router::builder().name("users").build().unwrap();
    users
        .param(
            "id",
            param_fn(|id, ctx, next| {
                async move {
                    if id.parse::<u64>().is_err() {
                        ctx.set_status(StatusCode::BAD_REQUEST);
                        return Ok(());
                    }
                    next.run(ctx).await
                }
                .boxed()
            }),
        )
        .get(("users", "/"), handler_fn(|ctx: &mut RequestContext| ctx.set_text("all users")))
        .unwrap()
        .get(
            ("user", "/:id"),
            handler_fn(|ctx: &mut RequestContext| {
                let id = ctx.params().get("id").unwrap_or_default().to_string();
                ctx.set_text(format!("user {id}"));
            }),
        )
        .unwrap()
        .put("/:id", handler_fn(|ctx: &mut RequestContext| ctx.set_status(StatusCode::NO_CONTENT)))
        .unwrap();
    users
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let mut router = Router::builder().name("api").prefix("/api").build().unwrap();
    router.use_middleware(middleware_fn(|ctx, next| {
        async move {
            let start = Instant::now();
            let result = next.run(ctx).await;
            info!(method = %ctx.method(), path = ctx.path(), status = %ctx.status(), elapsed = ?start.elapsed(), "handled");
            result
        }
        .boxed()
    }));
    router.nest_at("/users", users()).unwrap();
    router.redirect("/people", "users").unwrap();

    info!(url = %router.url("user", [("id", 7)]).unwrap(), "reverse routing");

    let app = Chain::new().with(router.allowed_methods(AllowedMethodsOptions::default())).with(router.routes().unwrap());

    let requests = [
        (Method::GET, "/api/users/7"),
        (Method::GET, "/api/users/seven"),
        (Method::DELETE, "/api/users/7"),
        (Method::OPTIONS, "/api/users/7"),
        (Method::GET, "/api/people"),
        (Method::GET, "/missing"),
    ];

    for (method, uri) in requests {
        let request = Request::builder().method(method).uri(uri).body(()).unwrap();
        let mut ctx = RequestContext::from_request(&request);
        app.run(&mut ctx).await.unwrap();

        let response = ctx.into_response();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        info!(%status, ?headers, body = %String::from_utf8_lossy(&body), "{uri}");
    }
}
