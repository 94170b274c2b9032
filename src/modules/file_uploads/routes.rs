use super::controllers;
use super::validators::RemoveFilesRequest;
use crate::api::validate::validate_body;
use crate::routing::{Handler, RouteError, RouteRegistry};
use crate::uploads::upload_any;

pub fn register(registry: &RouteRegistry) -> Result<(), RouteError> {
    registry
        .route("/uploads")
        .post(vec![upload_any(), Handler::endpoint(controllers::upload_files)])
        .delete(vec![
            validate_body::<RemoveFilesRequest>(),
            Handler::endpoint(controllers::remove_files),
        ]);
    Ok(())
}
