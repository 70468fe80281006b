//! HTTP request handling: the control API, the generated index page and static files.
//!
//! Requests are handled one at a time on the serving thread. The loop wakes up every
//! [`POLL_INTERVAL`] to check the stop flag, so a shutdown raised from any thread
//! (including by the shutdown endpoint itself) is observed promptly. Every response
//! carries `Connection: close`, so no socket outlives the request it was opened for.

use crate::engine;
use crate::error::ServeError;
use crate::mime::guess_mime;
use crate::options::CatalogOptions;
use crate::output::{self, files_json, meta_json};
use crate::page::{PageSource, escape_html, render_page};
use crate::runlog::RunLog;
use crate::types::{Snapshot, timestamp};
use serde_json::json;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tiny_http::{Method, Request, Server, StatusCode};

pub const API_PREFIX: &str = "/__api__/";
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(200);
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET,POST,OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

/// What a request resolves to, before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Index,
    Ping,
    Meta,
    Files,
    Refresh,
    Shutdown,
    Preflight,
    ApiNotFound,
    /// Percent-encoded path below the served root.
    Static(String),
    Unsupported,
}

/// Maps a method and request target to a [`Route`]. Query strings are ignored.
pub fn route(method: &Method, url: &str) -> Route {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    if let Some(endpoint) = path.strip_prefix(API_PREFIX) {
        return match (method, endpoint) {
            (Method::Options, _) => Route::Preflight,
            (Method::Get | Method::Head, "ping") => Route::Ping,
            (Method::Get | Method::Head, "meta") => Route::Meta,
            (Method::Get | Method::Head, "files") => Route::Files,
            (Method::Post, "refresh") => Route::Refresh,
            (Method::Post, "shutdown") => Route::Shutdown,
            _ => Route::ApiNotFound,
        };
    }
    match method {
        Method::Options => Route::Preflight,
        Method::Get | Method::Head if path == "/" || path == "/index.html" => Route::Index,
        Method::Get | Method::Head => Route::Static(path.to_string()),
        _ => Route::Unsupported,
    }
}

/// Everything a request needs, fixed for the lifetime of a session.
#[derive(Debug)]
pub(crate) struct ServeContext {
    /// `catalog.root` is already canonical.
    pub(crate) catalog: CatalogOptions,
    pub(crate) page: PageSource,
    pub(crate) report_path: Option<PathBuf>,
    pub(crate) index_file: Option<PathBuf>,
    pub(crate) log: RunLog,
}

impl ServeContext {
    pub(crate) fn root(&self) -> &Path {
        &self.catalog.root
    }
    pub(crate) fn snapshot(&self) -> Result<Snapshot, ServeError> {
        engine::snapshot(&self.catalog)
    }
    /// Rewrites the report and the generated index file, whichever are enabled.
    pub(crate) fn write_artifacts(&self) -> Result<(), ServeError> {
        if self.report_path.is_none() && self.index_file.is_none() {
            return Ok(());
        }
        let snapshot = self.snapshot()?;
        if let Some(path) = &self.report_path {
            output::write_report(&snapshot, path)?;
        }
        if let Some(path) = &self.index_file {
            fs::write(path, render_page(&self.page, &snapshot))
                .map_err(|e| ServeError::io(path, e))?;
        }
        Ok(())
    }
}

pub(crate) struct RequestHandler {
    ctx: Arc<ServeContext>,
    url: String,
    stop: Arc<AtomicBool>,
}

impl RequestHandler {
    pub(crate) fn new(ctx: Arc<ServeContext>, url: String, stop: Arc<AtomicBool>) -> Self {
        Self { ctx, url, stop }
    }

    pub(crate) fn handle(&self, request: Request) {
        let route = route(request.method(), request.url());
        tracing::debug!("{} {} -> {:?}", request.method(), request.url(), route);
        match route {
            Route::Index => match self.ctx.snapshot() {
                Ok(snapshot) => {
                    let page = render_page(&self.ctx.page, &snapshot);
                    respond(request, Reply::text(200, page, HTML_CONTENT_TYPE).cors());
                }
                Err(e) => respond_error(request, 500, &e.to_string()),
            },
            Route::Ping => respond_value(request, 200, &json!({"ok": true, "time": timestamp()})),
            Route::Meta => match self.ctx.snapshot().and_then(|s| meta_json(&s)) {
                Ok(body) => respond_json(request, 200, body),
                Err(e) => respond_error(request, 500, &e.to_string()),
            },
            Route::Files => match self.ctx.snapshot().and_then(|s| files_json(&s)) {
                Ok(body) => respond_json(request, 200, body),
                Err(e) => respond_error(request, 500, &e.to_string()),
            },
            Route::Refresh => self.refresh(request),
            Route::Shutdown => {
                respond_value(request, 200, &json!({"ok": true}));
                // The response is already flushed; the loop exits on its next check.
                self.stop.store(true, Ordering::SeqCst);
                self.ctx.log.write("Shutdown requested over HTTP");
            }
            Route::Preflight => respond(request, Reply::new(204).cors()),
            Route::ApiNotFound => respond_error(request, 404, "not found"),
            Route::Static(path) => self.serve_static(request, &path),
            Route::Unsupported => respond(
                request,
                Reply::text(501, "Unsupported method".to_string(), TEXT_CONTENT_TYPE),
            ),
        }
    }

    fn refresh(&self, request: Request) {
        match self.ctx.write_artifacts() {
            Ok(()) => {
                self.ctx.log.write("Refreshed report");
                respond_value(
                    request,
                    200,
                    &json!({
                        "ok": true,
                        "url": self.url,
                        "root": self.ctx.root().display().to_string(),
                    }),
                );
            }
            Err(e) => {
                self.ctx.log.write(&format!("Refresh failed: {}", e));
                respond_error(request, 500, &e.to_string());
            }
        }
    }

    fn serve_static(&self, request: Request, raw: &str) {
        let Some(decoded) = percent_decode(raw) else {
            return respond(
                request,
                Reply::text(400, "Bad request path".to_string(), TEXT_CONTENT_TYPE),
            );
        };
        let Some(mut target) = resolve_static(self.ctx.root(), &decoded) else {
            return not_found(request);
        };
        if target.is_dir() {
            if !raw.ends_with('/') {
                return respond(request, Reply::new(301).header("Location", format!("{}/", raw)));
            }
            let index = target.join("index.html");
            if !index.is_file() {
                return match directory_listing(&target, &decoded) {
                    Some(page) => respond(request, Reply::text(200, page, HTML_CONTENT_TYPE)),
                    None => not_found(request),
                };
            }
            target = index;
        }
        let opened = File::open(&target).and_then(|file| {
            let len = file.metadata()?.len();
            Ok((file, len))
        });
        match opened {
            Ok((file, len)) => {
                let name = target
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let reply = Reply {
                    status: 200,
                    headers: vec![("Content-Type", guess_mime(&name).to_string())],
                    body: Body::File(file, len),
                };
                respond(request, reply);
            }
            Err(_) => not_found(request),
        }
    }
}

/// Runs until the stop flag is raised. Dropping the server closes the listener.
pub(crate) fn serve(server: Server, handler: RequestHandler) {
    while !handler.stop.load(Ordering::SeqCst) {
        match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => handler.handle(request),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Listener failed: {}", e);
                break;
            }
        }
    }
    drop(server);
    tracing::debug!("Serving loop finished");
}

/// Joins decoded path segments under `root`. Any `..` segment is refused.
fn resolve_static(root: &Path, decoded: &str) -> Option<PathBuf> {
    let mut target = root.to_path_buf();
    for part in decoded.split('/') {
        match part {
            "" | "." => continue,
            ".." => return None,
            p if p.contains('\\') || p.contains('\0') => return None,
            p => target.push(p),
        }
    }
    Some(target)
}

fn directory_listing(dir: &Path, display: &str) -> Option<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| {
            let mut name = e.file_name().to_string_lossy().into_owned();
            if e.file_type().is_ok_and(|t| t.is_dir()) {
                name.push('/');
            }
            name
        })
        .collect();
    names.sort();
    let title = escape_html(display);
    let mut page = format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>Directory listing for {0}</title></head>\
         <body><h1>Directory listing for {0}</h1><hr><ul>\n",
        title
    );
    for name in names {
        let name = escape_html(&name);
        page.push_str(&format!("<li><a href=\"{0}\">{0}</a></li>\n", name));
    }
    page.push_str("</ul><hr></body></html>");
    Some(page)
}

/// Decodes `%XX` escapes in a request path. Returns `None` for a truncated or
/// non-hex escape, or when the decoded bytes are not UTF-8.
pub fn percent_decode(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = raw.get(i + 1..i + 3)?;
            if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

enum Body {
    Data(Vec<u8>),
    File(File, u64),
}

/// A response written straight onto the connection.
///
/// `tiny_http::Response` refuses to carry a `Connection` header, and without
/// `Connection: close` pooled clients keep sending on sockets that outlive the
/// listener and never get an answer once the session has stopped.
struct Reply {
    status: u16,
    headers: Vec<(&'static str, String)>,
    body: Body,
}

impl Reply {
    fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Body::Data(Vec::new()),
        }
    }

    fn text(status: u16, body: String, content_type: &str) -> Self {
        Self {
            status,
            headers: vec![("Content-Type", content_type.to_string())],
            body: Body::Data(body.into_bytes()),
        }
    }

    fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    fn cors(mut self) -> Self {
        for (name, value) in CORS_HEADERS {
            self.headers.push((name, value.to_string()));
        }
        self
    }

    fn write_to<W: Write>(self, mut writer: W, head_only: bool) -> io::Result<()> {
        let length = match &self.body {
            Body::Data(data) => data.len() as u64,
            Body::File(_, len) => *len,
        };
        let mut head = format!(
            "HTTP/1.1 {} {}\r\n",
            self.status,
            StatusCode(self.status).default_reason_phrase()
        );
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str(&format!("Content-Length: {}\r\nConnection: close\r\n\r\n", length));
        writer.write_all(head.as_bytes())?;
        if !head_only {
            match self.body {
                Body::Data(data) => writer.write_all(&data)?,
                Body::File(file, len) => {
                    io::copy(&mut file.take(len), &mut writer)?;
                }
            }
        }
        writer.flush()
    }
}

fn respond(request: Request, reply: Reply) {
    let head_only = *request.method() == Method::Head;
    let writer = request.into_writer();
    if let Err(e) = reply.write_to(writer, head_only) {
        tracing::debug!("Client went away before the response was sent: {}", e);
    }
}

fn respond_json(request: Request, status: u16, body: String) {
    respond(request, Reply::text(status, body, JSON_CONTENT_TYPE).cors());
}

fn respond_value(request: Request, status: u16, value: &serde_json::Value) {
    respond_json(request, status, value.to_string());
}

fn respond_error(request: Request, status: u16, message: &str) {
    respond_value(request, status, &json!({"error": message}));
}

fn not_found(request: Request) {
    respond(
        request,
        Reply::text(404, "File not found".to_string(), TEXT_CONTENT_TYPE),
    );
}
