//! Route lookup.

use std::collections::HashMap;

/// Every path the proxy serves, relative to the base path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Search,
    Anime,
    Schedule,
    Trending,
    Popular,
    Editorial,
    Download,
}

impl Endpoint {
    pub const ALL: [Endpoint; 7] = [
        Endpoint::Search,
        Endpoint::Anime,
        Endpoint::Schedule,
        Endpoint::Trending,
        Endpoint::Popular,
        Endpoint::Editorial,
        Endpoint::Download,
    ];

    /// Path segment under the base path.
    pub fn segment(&self) -> &'static str {
        match self {
            Endpoint::Search => "search",
            Endpoint::Anime => "anime",
            Endpoint::Schedule => "schedule",
            Endpoint::Trending => "trending",
            Endpoint::Popular => "popular",
            Endpoint::Editorial => "editorial",
            Endpoint::Download => "download",
        }
    }
}

/// Immutable path → endpoint table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: HashMap<String, Endpoint>,
}

impl RouteTable {
    /// Compile the table for routes mounted under `base_path` (e.g. "/api").
    pub fn new(base_path: &str) -> Self {
        let base = base_path.trim_end_matches('/');
        let routes = Endpoint::ALL
            .iter()
            .map(|e| (format!("{}/{}", base, e.segment()), *e))
            .collect();
        Self { routes }
    }

    pub fn match_path(&self, path: &str) -> Option<Endpoint> {
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        self.routes.get(path).copied()
    }

    /// All mounted paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}
