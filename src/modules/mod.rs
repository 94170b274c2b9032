//! Feature modules. Every `routes.rs` below this directory is listed in the
//! route manifest generated by `build.rs`.

pub mod file_uploads;
pub mod general;
pub mod user;

include!(concat!(env!("OUT_DIR"), "/route_manifest.rs"));
