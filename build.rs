//! Generates the route manifest: one entry per `routes.rs` found under the
//! modules directory, each pointing at that module's `register` function.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Directories searched for route modules, with the crate path each maps to.
const MODULE_ROOTS: &[(&str, &str)] = &[("src/modules", "crate::modules"), ("src/features", "crate::features")];

const ROUTES_FILE: &str = "routes.rs";

fn main() -> io::Result<()> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").map_err(io::Error::other)?);
    let out_dir = PathBuf::from(env::var("OUT_DIR").map_err(io::Error::other)?);

    let Some((root, crate_path)) = MODULE_ROOTS
        .iter()
        .map(|(dir, crate_path)| (manifest_dir.join(dir), *crate_path))
        .find(|(dir, _)| dir.is_dir())
    else {
        let searched: Vec<&str> = MODULE_ROOTS.iter().map(|(dir, _)| *dir).collect();
        panic!("Modules directory not found. Searched: {}", searched.join(", "));
    };
    println!("cargo:rerun-if-changed={}", root.display());

    let mut route_files = Vec::new();
    collect_route_files(&root, &mut route_files)?;
    route_files.sort();

    if route_files.is_empty() {
        println!("cargo:warning=No route files found in {}", root.display());
    }

    let mut entries = String::new();
    for file in &route_files {
        let relative = file.strip_prefix(&root).map_err(io::Error::other)?;
        let segments: Vec<String> = relative
            .parent()
            .map(|dir| {
                dir.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();

        let name = if segments.is_empty() {
            crate_path.rsplit("::").next().unwrap_or("modules").to_string()
        } else {
            segments.join("/")
        };
        let module_path = segments
            .iter()
            .fold(crate_path.to_string(), |path, segment| format!("{path}::{segment}"));
        let source = file
            .strip_prefix(&manifest_dir)
            .unwrap_or(file)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");

        entries.push_str(&format!(
            "    crate::routing::RouteModule {{ name: {name:?}, source: {source:?}, register: {module_path}::routes::register }},\n"
        ));
    }

    let manifest = format!(
        "/// Route modules found under `{}` at build time.\npub static ROUTE_MODULES: &[crate::routing::RouteModule] = &[\n{entries}];\n",
        root.strip_prefix(&manifest_dir).unwrap_or(&root).display()
    );
    fs::write(out_dir.join("route_manifest.rs"), manifest)
}

fn collect_route_files(dir: &Path, found: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_route_files(&path, found)?;
        } else if path.file_name().is_some_and(|name| name == ROUTES_FILE) {
            found.push(path);
        }
    }
    Ok(())
}
