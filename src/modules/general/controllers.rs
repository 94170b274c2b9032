use axum::Json;
use serde::Serialize;

use crate::routing::Http;

#[derive(Debug, Serialize)]
pub struct BannerResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: String,
}

pub async fn index(http: Http) -> Json<BannerResponse> {
    Json(BannerResponse {
        message: format!("{} backend API", http.state().config.app.name),
    })
}

pub async fn health(http: Http) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: format!("{} backend API is running", http.state().config.app.name),
    })
}
