use super::handler::{Handler, RouteMethod};
use super::registry::RouteRegistry;

/// Declares several routes that share a base path.
///
/// ```ignore
/// registry
///     .route("/users")
///     .get(vec![Handler::endpoint(list_users)])
///     .post(vec![Handler::endpoint(create_user)])
///     .get_at("/:id", vec![Handler::endpoint(show_user)]);
/// ```
pub struct RouteBuilder<'a> {
    base: String,
    registry: &'a RouteRegistry,
}

impl<'a> RouteBuilder<'a> {
    pub(crate) fn new(base: &str, registry: &'a RouteRegistry) -> Self {
        Self {
            base: base.to_string(),
            registry,
        }
    }

    /// Register `handlers` at the base path, or at base + `sub_path`.
    pub fn on(self, method: RouteMethod, sub_path: Option<&str>, handlers: Vec<Handler>) -> Self {
        let path = match sub_path {
            Some(sub) => format!("{}{sub}", self.base),
            None => self.base.clone(),
        };
        self.registry.add_route(method, &path, handlers);
        self
    }

    pub fn get(self, handlers: Vec<Handler>) -> Self {
        self.on(RouteMethod::Get, None, handlers)
    }

    pub fn post(self, handlers: Vec<Handler>) -> Self {
        self.on(RouteMethod::Post, None, handlers)
    }

    pub fn put(self, handlers: Vec<Handler>) -> Self {
        self.on(RouteMethod::Put, None, handlers)
    }

    pub fn patch(self, handlers: Vec<Handler>) -> Self {
        self.on(RouteMethod::Patch, None, handlers)
    }

    pub fn delete(self, handlers: Vec<Handler>) -> Self {
        self.on(RouteMethod::Delete, None, handlers)
    }

    pub fn get_at(self, sub_path: &str, handlers: Vec<Handler>) -> Self {
        self.on(RouteMethod::Get, Some(sub_path), handlers)
    }

    pub fn post_at(self, sub_path: &str, handlers: Vec<Handler>) -> Self {
        self.on(RouteMethod::Post, Some(sub_path), handlers)
    }

    pub fn put_at(self, sub_path: &str, handlers: Vec<Handler>) -> Self {
        self.on(RouteMethod::Put, Some(sub_path), handlers)
    }

    pub fn patch_at(self, sub_path: &str, handlers: Vec<Handler>) -> Self {
        self.on(RouteMethod::Patch, Some(sub_path), handlers)
    }

    pub fn delete_at(self, sub_path: &str, handlers: Vec<Handler>) -> Self {
        self.on(RouteMethod::Delete, Some(sub_path), handlers)
    }
}
