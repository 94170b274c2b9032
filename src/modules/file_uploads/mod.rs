pub mod controllers;
pub mod routes;
pub mod validators;
