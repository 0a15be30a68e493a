//! Routing: named states, the shared route registry and the navigation seam
//!
//! Feature modules each contribute their states to one [`RouterHelper`].
//! Only the first fallback ("otherwise") path offered is kept.

use anyhow::Result;

/// Route name of the login screen.
pub const LOGIN_STATE: &str = "login";

/// Navigation capability used by the auth flow.
pub trait Navigator: Send + Sync {
    /// Go to a named state.
    fn go(&self, state: &str) -> Result<()>;
    /// The URL currently shown.
    fn current_url(&self) -> String;
    /// Replace the in-app URL (path, query and fragment).
    fn set_url(&self, url: &str) -> Result<()>;
    /// Leave the app for an external page.
    fn redirect(&self, href: &str) -> Result<()>;
    /// Drop cached views and back-stack.
    fn clear_history(&self) -> Result<()>;
}

/// Configuration of a single state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateConfig {
    /// URL pattern; abstract parents have none.
    pub url: Option<String>,
    pub is_abstract: bool,
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub name: String,
    pub config: StateConfig,
}

impl State {
    pub fn new(name: &str, url: &str, title: &str) -> Self {
        Self {
            name: name.to_string(),
            config: StateConfig {
                url: Some(url.to_string()),
                is_abstract: false,
                title: Some(title.to_string()),
            },
        }
    }

    pub fn abstract_parent(name: &str) -> Self {
        Self {
            name: name.to_string(),
            config: StateConfig {
                url: None,
                is_abstract: true,
                title: None,
            },
        }
    }
}

/// Shared registry of states contributed by independent modules.
#[derive(Debug, Default)]
pub struct RouterHelper {
    states: Vec<State>,
    otherwise: Option<String>,
    has_otherwise: bool,
}

impl RouterHelper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `states` in order, plus a fallback path if none was set yet.
    ///
    /// Duplicate names are not rejected; the later registration shadows the
    /// earlier one on lookup.
    pub fn configure_states(&mut self, states: Vec<State>, otherwise_path: Option<&str>) {
        for state in states {
            tracing::debug!("Registering state {}", state.name);
            self.states.push(state);
        }

        if let Some(path) = otherwise_path.filter(|p| !p.is_empty()) {
            if !self.has_otherwise {
                self.has_otherwise = true;
                self.otherwise = Some(path.to_string());
            } else {
                tracing::debug!("Ignoring fallback {}, already set", path);
            }
        }
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn otherwise(&self) -> Option<&str> {
        self.otherwise.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&State> {
        self.states.iter().rev().find(|s| s.name == name)
    }

    /// Map a URL to the state it shows, falling back to the otherwise path.
    pub fn resolve(&self, url: &str) -> Option<&State> {
        let path = route_path(url);
        self.find_by_url(&path)
            .or_else(|| self.otherwise().and_then(|p| self.find_by_url(p)))
    }

    fn find_by_url(&self, path: &str) -> Option<&State> {
        self.states
            .iter()
            .rev()
            .find(|s| !s.config.is_abstract && s.config.url.as_deref() == Some(path))
    }
}

/// In-app route path of a URL. Hash routing (`/#/dashboard`) is honoured;
/// query and trailing fragment are dropped.
fn route_path(url: &str) -> String {
    let route = match url.find("#/") {
        Some(idx) => &url[idx + 1..],
        None => match url::Url::parse(url) {
            Ok(parsed) => return parsed.path().to_string(),
            Err(_) => url,
        },
    };
    let end = route.find(|c: char| c == '?' || c == '#').unwrap_or(route.len());
    let path = &route[..end];
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

/// Register the states of the authentication and main modules.
pub fn register_app_routes(helper: &mut RouterHelper) {
    helper.configure_states(vec![State::new(LOGIN_STATE, "/login", "Login")], None);
    helper.configure_states(
        vec![
            State::abstract_parent("main"),
            State::new("main.dashboard", "/dashboard", "Dashboard"),
        ],
        Some("/dashboard"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fallback_wins() {
        let mut helper = RouterHelper::new();
        helper.configure_states(vec![State::new("a", "/a", "A")], None);
        helper.configure_states(vec![State::new("b", "/b", "B")], Some("/b"));
        helper.configure_states(vec![State::new("c", "/c", "C")], Some("/c"));

        assert_eq!(helper.otherwise(), Some("/b"));
        assert_eq!(helper.states().len(), 3);
    }

    #[test]
    fn test_empty_fallback_does_not_claim_slot() {
        let mut helper = RouterHelper::new();
        helper.configure_states(vec![], Some(""));
        helper.configure_states(vec![], Some("/x"));
        assert_eq!(helper.otherwise(), Some("/x"));
    }

    #[test]
    fn test_states_registered_in_order_without_dedup() {
        let mut helper = RouterHelper::new();
        helper.configure_states(
            vec![State::new("a", "/a", "first"), State::new("a", "/a2", "second")],
            None,
        );
        let names: Vec<_> = helper.states().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["a", "a"]);
        assert_eq!(helper.get("a").unwrap().config.title.as_deref(), Some("second"));
    }

    #[test]
    fn test_resolve_hash_routes_and_fallback() {
        let mut helper = RouterHelper::new();
        register_app_routes(&mut helper);

        assert_eq!(helper.resolve("/login").unwrap().name, LOGIN_STATE);
        assert_eq!(
            helper.resolve("http://localhost:3000/#/dashboard?x=1").unwrap().name,
            "main.dashboard"
        );
        assert_eq!(
            helper.resolve("http://localhost:3000/#/?fix=1").unwrap().name,
            "main.dashboard"
        );
        assert_eq!(helper.resolve("/").unwrap().name, "main.dashboard");
    }

    #[test]
    fn test_abstract_states_do_not_resolve() {
        let mut helper = RouterHelper::new();
        helper.configure_states(vec![State::abstract_parent("main")], None);
        assert!(helper.resolve("/").is_none());
        assert!(helper.get("main").unwrap().config.is_abstract);
    }
}
