use super::controllers;
use crate::routing::{Handler, RouteError, RouteRegistry};

pub fn register(registry: &RouteRegistry) -> Result<(), RouteError> {
    registry
        .get("/", vec![Handler::endpoint(controllers::index)])
        .get("/health", vec![Handler::endpoint(controllers::health)]);
    Ok(())
}
