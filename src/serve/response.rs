//! HTTP response handlers.

use anyhow::{Context, Result};
use std::{fs, path::Path};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::utils::mime::{self, types};

/// Respond with a static file.
pub fn respond_file(request: Request, path: &Path) -> Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        let length = fs::metadata(path).map(|m| m.len()).ok();
        let mut response = Response::empty(StatusCode(200))
            .with_header(make_header("Content-Type", content_type));
        if let Some(length) = length {
            response.add_header(make_header("Content-Length", &length.to_string()));
        }
        request.respond(response)?;
        return Ok(());
    }

    let body = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    send_body(request, 200, content_type, body)
}

/// Respond with a plain 404.
pub fn respond_not_found(request: Request) -> Result<()> {
    if is_head_request(&request) {
        let response =
            Response::empty(StatusCode(404)).with_header(make_header("Content-Type", types::PLAIN));
        request.respond(response)?;
        return Ok(());
    }
    send_body(request, 404, types::PLAIN, b"404 Not Found".to_vec())
}

/// Respond with 405 for anything but GET and HEAD.
pub fn respond_method_not_allowed(request: Request) -> Result<()> {
    let response = Response::from_data(b"405 Method Not Allowed".to_vec())
        .with_status_code(StatusCode(405))
        .with_header(make_header("Content-Type", types::PLAIN))
        .with_header(make_header("Allow", "GET, HEAD"));
    request.respond(response)?;
    Ok(())
}

pub fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

pub fn is_read_request(request: &Request) -> bool {
    matches!(request.method(), Method::Get | Method::Head)
}

fn send_body(request: Request, status: u16, content_type: &str, body: Vec<u8>) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type));
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &str, value: &str) -> Header {
    // Keys and values are ASCII constants or decimal lengths
    Header::from_bytes(key.as_bytes(), value.as_bytes()).unwrap()
}
