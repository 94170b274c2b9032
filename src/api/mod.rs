pub mod handlers;
pub mod response;
pub mod routes;
pub mod validate;
