use regex::Regex;

/// Restricts the routes of a router to requests for a given host
#[derive(Debug, Clone)]
pub enum HostMatcher {
    /// compared with the whole `Host` value, port included
    Exact(String),
    Regex(Regex),
}

impl HostMatcher {
    pub fn matches(&self, host: Option<&str>) -> bool {
        match (self, host) {
            (_, None) => false,
            (HostMatcher::Exact(expected), Some(host)) => expected == host,
            (HostMatcher::Regex(regex), Some(host)) => regex.is_match(host),
        }
    }
}

impl From<&str> for HostMatcher {
    fn from(host: &str) -> Self {
        Self::Exact(host.to_string())
    }
}

impl From<String> for HostMatcher {
    fn from(host: String) -> Self {
        Self::Exact(host)
    }
}

impl From<Regex> for HostMatcher {
    fn from(regex: Regex) -> Self {
        Self::Regex(regex)
    }
}
