pub mod controllers;
pub mod model;
pub mod routes;
