//! Responses synthesized when neither network nor cache can answer.

use serde_json::json;

use crate::network::Response;

/// Message shown by the guide when API data is missing offline
pub const OFFLINE_API_MESSAGE: &str = "Dados não disponíveis offline";

/// Caption drawn inside the image placeholder
pub const IMAGE_PLACEHOLDER_CAPTION: &str = "Imagem indisponível";

/// Status of synthesized offline responses
const SERVICE_UNAVAILABLE: u16 = 503;

/// JSON error body for an API request that failed offline with nothing cached.
pub fn offline_api() -> Response {
    let body = json!({
        "error": "Offline",
        "message": OFFLINE_API_MESSAGE,
        "offline": true,
    });
    Response::new(SERVICE_UNAVAILABLE, body.to_string()).with_header("Content-Type", "application/json")
}

/// 300x200 grey SVG placeholder for images that cannot be loaded.
pub fn image_placeholder() -> Response {
    let svg = format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="300" height="200">"#,
            r##"<rect width="300" height="200" fill="#e5e5e5"/>"##,
            r##"<text x="50%" y="50%" text-anchor="middle" fill="#999">{}</text>"##,
            "</svg>"
        ),
        IMAGE_PLACEHOLDER_CAPTION
    );
    Response::new(200, svg).with_header("Content-Type", "image/svg+xml")
}

/// Minimal page served for a navigation when even the app shell is not cached.
pub fn offline_page() -> Response {
    let html = concat!(
        "<!DOCTYPE html>",
        r#"<html lang="pt-BR"><head><meta charset="utf-8"><title>Bonito Guide</title></head>"#,
        "<body><h1>Sem conexão</h1>",
        "<p>Conecte-se à internet para carregar o guia pela primeira vez.</p>",
        "</body></html>"
    );
    Response::new(SERVICE_UNAVAILABLE, html).with_header("Content-Type", "text/html; charset=utf-8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_api_body() {
        let response = offline_api();
        assert_eq!(response.status, 503);
        assert_eq!(response.content_type(), Some("application/json"));

        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["error"], "Offline");
        assert_eq!(body["offline"], true);
        assert_eq!(body["message"], OFFLINE_API_MESSAGE);
    }

    #[test]
    fn test_image_placeholder() {
        let response = image_placeholder();
        assert!(response.is_ok());
        assert_eq!(response.content_type(), Some("image/svg+xml"));

        let svg = response.text();
        assert!(svg.contains("Imagem indisponível"));
        assert!(svg.contains(r#"width="300" height="200""#));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn test_offline_page_is_html() {
        let response = offline_page();
        assert_eq!(response.status, 503);
        assert!(response.content_type().unwrap().starts_with("text/html"));
        assert!(response.text().contains("Sem conexão"));
    }
}
