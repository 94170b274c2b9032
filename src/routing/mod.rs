//! Route declaration, discovery and binding.
//!
//! Feature modules declare routes on the [`RouteRegistry`]; the registry binds
//! them to an [`Application`] (normally the [`DynamicRouter`]) once one is
//! attached, and immediately for routes declared afterwards.

mod app;
mod builder;
mod context;
mod discovery;
mod handler;
mod registry;

pub use app::DynamicRouter;
pub use builder::RouteBuilder;
pub use context::{Http, FORM_BODY_LIMIT};
pub use discovery::{RegisterFn, RouteDiscovery, RouteModule};
pub use handler::{Handler, Next, RouteMethod};
pub use registry::{log_route_completion, Application, RouteError, RouteInfo, RouteRegistry};
