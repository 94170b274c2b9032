use super::controllers;
use crate::routing::{Handler, RouteError, RouteRegistry};

pub fn register(registry: &RouteRegistry) -> Result<(), RouteError> {
    registry
        .route("/users")
        .get(vec![Handler::endpoint(controllers::get_users)])
        .post(vec![Handler::endpoint(controllers::create_user)]);
    Ok(())
}
