#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    table: RouteFixture,
    method: &'static str,
    path: &'static str,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, table: RouteFixture, method: &'static str, path: &'static str) -> Self {
        Self { name, group, table, method, path }
    }

    pub fn small(name: &'static str, table: RouteFixture, method: &'static str, path: &'static str) -> Self {
        Self::new(name, TestGroup::Small, table, method, path)
    }

    pub fn large(name: &'static str, table: RouteFixture, method: &'static str, path: &'static str) -> Self {
        Self::new(name, TestGroup::Large, table, method, path)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn table(&self) -> &RouteFixture {
        &self.table
    }

    /// the request method
    pub fn method(&self) -> &'static str {
        self.method
    }

    /// the request path
    pub fn path(&self) -> &'static str {
        self.path
    }
}

/// A route table, every path is registered for `GET`
#[derive(Debug, Copy, Clone)]
pub struct RouteFixture {
    name: &'static str,
    paths: &'static [&'static str],
}

impl RouteFixture {
    pub const fn new(name: &'static str, paths: &'static [&'static str]) -> Self {
        Self { name, paths }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn paths(&self) -> &'static [&'static str] {
        self.paths
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Large,
}

pub static SMALL_TABLE: RouteFixture = RouteFixture::new(
    "small",
    &["/", "/users", "/users/:id", "/users/:id/posts", "/users/:id/posts/:post"],
);

pub static LARGE_TABLE: RouteFixture = RouteFixture::new(
    "large",
    &[
        "/authorizations",
        "/authorizations/:id",
        "/applications/:client_id/tokens/:access_token",
        "/events",
        "/repos/:owner/:repo/events",
        "/networks/:owner/:repo/events",
        "/orgs/:org/events",
        "/users/:user/received_events",
        "/users/:user/received_events/public",
        "/users/:user/events",
        "/users/:user/events/public",
        "/users/:user/events/orgs/:org",
        "/feeds",
        "/notifications",
        "/repos/:owner/:repo/notifications",
        "/notifications/threads/:id",
        "/notifications/threads/:id/subscription",
        "/repos/:owner/:repo/stargazers",
        "/users/:user/starred",
        "/user/starred",
        "/user/starred/:owner/:repo",
        "/repos/:owner/:repo/subscribers",
        "/users/:user/subscriptions",
        "/user/subscriptions",
        "/repos/:owner/:repo/subscription",
        "/gists",
        "/gists/:id",
        "/gists/:id/star",
        "/repos/:owner/:repo/git/blobs/:sha",
        "/repos/:owner/:repo/git/commits/:sha",
        "/repos/:owner/:repo/git/refs/*",
        "/repos/:owner/:repo/git/tags/:sha",
        "/repos/:owner/:repo/git/trees/:sha",
        "/issues",
        "/user/issues",
        "/orgs/:org/issues",
        "/repos/:owner/:repo/issues",
        "/repos/:owner/:repo/issues/:number",
        "/repos/:owner/:repo/assignees",
        "/repos/:owner/:repo/assignees/:assignee",
        "/repos/:owner/:repo/issues/:number/comments",
        "/repos/:owner/:repo/issues/:number/events",
        "/repos/:owner/:repo/labels",
        "/repos/:owner/:repo/labels/:name",
        "/repos/:owner/:repo/milestones",
        "/repos/:owner/:repo/milestones/:number",
        "/repos/:owner/:repo/pulls",
        "/repos/:owner/:repo/pulls/:number",
        "/repos/:owner/:repo/pulls/:number/commits",
        "/repos/:owner/:repo/pulls/:number/files",
        "/user/repos",
        "/users/:user/repos",
        "/orgs/:org/repos",
        "/repositories",
        "/repos/:owner/:repo",
        "/repos/:owner/:repo/contributors",
        "/repos/:owner/:repo/languages",
        "/repos/:owner/:repo/tags",
        "/repos/:owner/:repo/branches",
        "/repos/:owner/:repo/branches/:branch",
        "/search/repositories",
        "/search/code",
        "/search/issues",
        "/search/users",
        "/users/:user",
        "/user",
        "/users",
    ],
);
