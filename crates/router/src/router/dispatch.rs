use super::table::RouteTable;
use crate::error::BoxError;
use crate::middleware::{Middleware, Next};
use crate::request::RequestContext;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, trace};

/// The middleware dispatching requests over a compiled [`RouteTable`].
///
/// A matched route runs its stack and then continues with the outer continuation if the last
/// stage runs its own. Without a matched route the outer continuation runs directly, leaving the
/// status at `404 Not Found` unless something downstream sets it.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    table: Arc<RouteTable>,
}

impl Dispatcher {
    pub fn new(table: impl Into<Arc<RouteTable>>) -> Self {
        Self { table: table.into() }
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }
}

#[async_trait]
impl Middleware for Dispatcher {
    async fn call(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), BoxError> {
        let (matched, route) = self.table.lookup(ctx.method(), ctx.path(), ctx.host()).into_parts();
        trace!(method = %ctx.method(), path = ctx.path(), matched = matched.len(), "dispatching request");

        ctx.set_router_name(self.table.name());
        ctx.record_matched(matched);

        let Some(route) = route else {
            debug!(method = %ctx.method(), path = ctx.path(), "no route matched");
            return next.run(ctx).await;
        };

        if let Some(params) = route.params(ctx.path()) {
            ctx.params_mut().merge(params);
        }
        ctx.set_matched_route(Arc::clone(&route));

        Next::new(route.stack(), Some(next)).run(ctx).await
    }
}

impl From<RouteTable> for Dispatcher {
    fn from(table: RouteTable) -> Self {
        Self::new(table)
    }
}
