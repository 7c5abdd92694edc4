//! Damage detection REST API.
//!
//! A small loopback HTTP server with no framework dependency. The detector
//! registry and severity assessor are injected at construction; request
//! handling owns no global state.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::annotate;
use crate::detect::{BackendRegistry, BackendUnavailable, KNOWN_CLASSES};
use crate::report::{DamageReport, SeverityAssessor};

const MAX_HEADER_BYTES: usize = 8192;
const SUPPORTED_FORMATS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
    /// Default detection confidence threshold; overridable per request.
    pub confidence_threshold: f32,
    /// Upper bound on uploaded image size.
    pub max_upload_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8088".to_string(),
            confidence_threshold: 0.5,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

pub struct ApiServer {
    cfg: ApiConfig,
    registry: BackendRegistry,
    assessor: SeverityAssessor,
}

/// Body of a successful detection response: the damage report plus request
/// metadata the mobile client renders alongside it.
#[derive(Debug, Serialize)]
struct DetectResponse {
    success: bool,
    confidence_threshold: f32,
    image_width: u32,
    image_height: u32,
    #[serde(flatten)]
    report: DamageReport,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, registry: BackendRegistry, assessor: SeverityAssessor) -> Self {
        Self {
            cfg,
            registry,
            assessor,
        }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        if configured_addr.ip().is_loopback() && !addr.ip().is_loopback() {
            return Err(anyhow!(
                "api configured for loopback address '{}', but bound to non-loopback address '{}'",
                configured_addr,
                addr
            ));
        }
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let join = std::thread::spawn(move || {
            if let Err(err) = run_api(listener, self, shutdown_thread) {
                log::error!("damage api stopped: {}", err);
            }
        });

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_api(listener: TcpListener, server: ApiServer, shutdown: Arc<AtomicBool>) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = handle_connection(stream, &server) {
                    log::warn!("damage api request rejected: {}", err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(50));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, server: &ApiServer) -> Result<()> {
    let peer = stream.peer_addr()?;
    let local = stream.local_addr()?;
    if local.ip().is_loopback() && !peer.ip().is_loopback() {
        write_json_response(&mut stream, 403, r#"{"error":"forbidden"}"#)?;
        return Ok(());
    }

    let request = match read_request(&mut stream, server.cfg.max_upload_bytes) {
        Ok(request) => request,
        Err(RequestError::TooLarge) => {
            write_json_response(&mut stream, 413, r#"{"error":"payload_too_large"}"#)?;
            return Ok(());
        }
        Err(RequestError::Other(err)) => return Err(err),
    };

    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => {
            let backend = server
                .registry
                .default_backend_name()
                .unwrap_or("none")
                .to_string();
            let body = serde_json::json!({ "status": "ok", "backend": backend });
            write_json_response(&mut stream, 200, &body.to_string())
        }
        ("GET", "/damage-types") => {
            let mut types = serde_json::Map::new();
            for class in KNOWN_CLASSES {
                if let Some(id) = class.class_id() {
                    types.insert(id.to_string(), serde_json::json!(class.to_string()));
                }
            }
            let body = serde_json::json!({
                "damage_types": types,
                "total_classes": KNOWN_CLASSES.len(),
            });
            write_json_response(&mut stream, 200, &body.to_string())
        }
        ("GET", "/model-info") => {
            let backend = match server.registry.default_backend_name() {
                Some(name) => name.to_string(),
                None => {
                    write_json_response(&mut stream, 503, r#"{"error":"detector_unavailable"}"#)?;
                    return Ok(());
                }
            };
            let body = serde_json::json!({
                "backend": backend,
                "supported_formats": SUPPORTED_FORMATS,
                "max_upload_bytes": server.cfg.max_upload_bytes,
            });
            write_json_response(&mut stream, 200, &body.to_string())
        }
        ("POST", "/detect-damage") => handle_detect(&mut stream, server, &request, false),
        ("POST", "/detect-damage/annotated") => handle_detect(&mut stream, server, &request, true),
        ("POST", _) | ("GET", _) => {
            write_json_response(&mut stream, 404, r#"{"error":"not_found"}"#)?;
            Ok(())
        }
        _ => {
            write_json_response(&mut stream, 405, r#"{"error":"method_not_allowed"}"#)?;
            Ok(())
        }
    }
}

fn handle_detect(
    stream: &mut TcpStream,
    server: &ApiServer,
    request: &HttpRequest,
    annotated: bool,
) -> Result<()> {
    let is_image = request
        .headers
        .get("content-type")
        .is_some_and(|ct| ct.starts_with("image/"));
    if !is_image {
        write_json_response(stream, 400, r#"{"error":"file_must_be_an_image"}"#)?;
        return Ok(());
    }
    if request.body.is_empty() {
        write_json_response(stream, 400, r#"{"error":"empty_body"}"#)?;
        return Ok(());
    }

    let confidence = match request.query_param("confidence") {
        None => server.cfg.confidence_threshold,
        Some(raw) => match raw.parse::<f32>() {
            Ok(value) if (0.0..=1.0).contains(&value) => value,
            _ => {
                write_json_response(stream, 400, r#"{"error":"invalid_confidence"}"#)?;
                return Ok(());
            }
        },
    };

    let frame = match image::load_from_memory(&request.body) {
        Ok(decoded) => decoded.to_rgb8(),
        Err(err) => {
            log::debug!("undecodable upload: {}", err);
            write_json_response(stream, 400, r#"{"error":"undecodable_image"}"#)?;
            return Ok(());
        }
    };
    let (width, height) = frame.dimensions();

    let detections = match server
        .registry
        .detect(frame.as_raw(), width, height, confidence)
    {
        Ok(detections) => detections,
        Err(err) if err.downcast_ref::<BackendUnavailable>().is_some() => {
            log::warn!("detector unavailable: {}", err);
            write_json_response(stream, 503, r#"{"error":"detector_unavailable"}"#)?;
            return Ok(());
        }
        Err(err) => {
            log::error!("detection failed: {}", err);
            write_json_response(stream, 500, r#"{"error":"detection_failed"}"#)?;
            return Ok(());
        }
    };

    if annotated {
        let jpeg = annotate::render_jpeg(&frame, &detections)?;
        return write_response(stream, 200, "image/jpeg", &jpeg);
    }

    let report = server.assessor.assess(&detections);
    let response = DetectResponse {
        success: true,
        confidence_threshold: confidence,
        image_width: width,
        image_height: height,
        report,
    };
    let payload = serde_json::to_vec(&response)?;
    write_response(stream, 200, "application/json", &payload)
}

enum RequestError {
    TooLarge,
    Other(anyhow::Error),
}

impl From<anyhow::Error> for RequestError {
    fn from(err: anyhow::Error) -> Self {
        RequestError::Other(err)
    }
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        RequestError::Other(err.into())
    }
}

fn read_request(stream: &mut TcpStream, max_body_bytes: usize) -> Result<HttpRequest, RequestError> {
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;
    let mut buf = [0u8; 4096];
    let mut data = Vec::new();
    let header_end = loop {
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        if data.len() > MAX_HEADER_BYTES {
            return Err(RequestError::Other(anyhow!("request header too large")));
        }
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(RequestError::Other(anyhow!("connection closed mid-request")));
        }
        data.extend_from_slice(&buf[..n]);
    };

    let header_text = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = header_text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| anyhow!("missing method"))?
        .to_string();
    let raw_path = parts
        .next()
        .ok_or_else(|| anyhow!("missing path"))?
        .to_string();

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            break;
        }
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    let content_length: usize = headers
        .get("content-length")
        .and_then(|len| len.parse().ok())
        .unwrap_or(0);
    if content_length > max_body_bytes {
        return Err(RequestError::TooLarge);
    }

    let mut body = data[header_end..].to_vec();
    if body.len() > content_length {
        body.truncate(content_length);
    }
    while body.len() < content_length {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(RequestError::Other(anyhow!("connection closed mid-body")));
        }
        body.extend_from_slice(&buf[..n]);
        if body.len() > content_length {
            body.truncate(content_length);
        }
    }

    let path = raw_path
        .split('?')
        .next()
        .unwrap_or(&raw_path)
        .to_string();
    Ok(HttpRequest {
        method,
        path,
        raw_path,
        headers,
        body,
    })
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    write_response(stream, status, "application/json", body.as_bytes())
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        400 => "HTTP/1.1 400 Bad Request",
        403 => "HTTP/1.1 403 Forbidden",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        413 => "HTTP/1.1 413 Payload Too Large",
        503 => "HTTP/1.1 503 Service Unavailable",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    raw_path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl HttpRequest {
    fn query_param(&self, name: &str) -> Option<&str> {
        let query = self.raw_path.split('?').nth(1)?;
        for pair in query.split('&') {
            if let Some((k, v)) = pair.split_once('=') {
                if k == name {
                    return Some(v);
                }
            }
        }
        None
    }
}
