//! Server lifecycle: one listener, one serving thread and one log file per session.
//!
//! A session moves `Stopped -> Starting -> Running -> Stopping -> Stopped`.
//! [`Session::start`] refuses to run twice; [`Session::shutdown`] is idempotent and is
//! also what `Drop` falls back to, so an unwinding panic still releases the port and
//! removes the generated index file.

use crate::engine::resolve_root;
use crate::error::ServeError;
use crate::options::{LOG_DIR, ServeOptions};
use crate::page::PageSource;
use crate::runlog::RunLog;
use crate::server::{RequestHandler, ServeContext, serve};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tiny_http::Server;

pub const REPORT_FILE: &str = "ai_report.txt";
pub const INDEX_FILE: &str = "index.html";
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);
const HEADLESS_TICK: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

struct Running {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
    url: String,
    index_file: Option<PathBuf>,
}

pub struct Session {
    options: ServeOptions,
    root: PathBuf,
    log_dir: PathBuf,
    log: RunLog,
    state: SessionState,
    running: Option<Running>,
}

impl Session {
    /// Validates the root and prepares the log directory. Nothing is bound yet.
    pub fn new(options: ServeOptions) -> Result<Self, ServeError> {
        let root = resolve_root(&options.catalog.root)?;
        let log_dir = root.join(LOG_DIR);
        fs::create_dir_all(&log_dir).map_err(|e| ServeError::io(&log_dir, e))?;
        let log = RunLog::in_dir(&log_dir, chrono::Local::now());
        Ok(Self {
            options,
            root,
            log_dir,
            log,
            state: SessionState::Stopped,
            running: None,
        })
    }
    pub fn root(&self) -> &Path {
        &self.root
    }
    /// `Stopping` once the serving thread has exited on its own (a shutdown request
    /// over HTTP or a listener failure) until [`Session::shutdown`] finishes cleanup.
    pub fn state(&self) -> SessionState {
        match self.state {
            SessionState::Running if !self.is_serving() => SessionState::Stopping,
            state => state,
        }
    }
    /// Base URL with a trailing slash, while running.
    pub fn url(&self) -> Option<&str> {
        self.running.as_ref().map(|r| r.url.as_str())
    }
    pub fn log_path(&self) -> &Path {
        self.log.path()
    }
    pub fn report_path(&self) -> PathBuf {
        self.log_dir.join(REPORT_FILE)
    }
    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }
    /// False once the serving thread has exited, e.g. after `POST /__api__/shutdown`.
    pub fn is_serving(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    pub fn start(&mut self) -> Result<&str, ServeError> {
        if self.running.is_some() {
            return Err(ServeError::AlreadyRunning);
        }
        self.state = SessionState::Starting;
        match self.launch() {
            Ok(running) => {
                self.log
                    .write(&format!("Serving {} at {}", self.root.display(), running.url));
                self.state = SessionState::Running;
                Ok(self.running.insert(running).url.as_str())
            }
            Err(e) => {
                self.state = SessionState::Stopped;
                Err(e)
            }
        }
    }

    fn launch(&self) -> Result<Running, ServeError> {
        let index_file = self.index_target();
        let ctx = Arc::new(self.context(index_file.clone()));
        if let Err(e) = ctx.write_artifacts() {
            self.log
                .write(&format!("Could not write initial artifacts: {}", e));
        }
        let server = match Server::http((self.options.host.as_str(), self.options.port)) {
            Ok(server) => server,
            Err(e) => {
                if let Some(path) = &index_file {
                    let _ = fs::remove_file(path);
                }
                return Err(ServeError::Bind {
                    addr: format!("{}:{}", self.options.host, self.options.port),
                    message: e.to_string(),
                });
            }
        };
        let port = server
            .server_addr()
            .to_ip()
            .map_or(self.options.port, |addr| addr.port());
        let url = format_url(&self.options.host, port);
        let stop = Arc::new(AtomicBool::new(false));
        let handler = RequestHandler::new(ctx, url.clone(), Arc::clone(&stop));
        let handle = thread::Builder::new()
            .name("tempserve-http".into())
            .spawn(move || serve(server, handler))
            .map_err(|e| ServeError::io(&self.root, e))?;
        Ok(Running {
            handle,
            stop,
            url,
            index_file,
        })
    }

    /// Generated index target, or `None` when disabled or when it would clobber a file
    /// this session does not own.
    fn index_target(&self) -> Option<PathBuf> {
        if !self.options.write_index || self.options.template.is_some() {
            return None;
        }
        let path = self.index_path();
        if path.exists() {
            self.log.write(&format!(
                "{} already exists, not generating an index file",
                path.display()
            ));
            return None;
        }
        Some(path)
    }

    fn context(&self, index_file: Option<PathBuf>) -> ServeContext {
        let mut catalog = self.options.catalog.clone();
        catalog.root = self.root.clone();
        if let Some(path) = &index_file {
            catalog.excluded.push(path.clone());
        }
        ServeContext {
            catalog,
            page: PageSource::from_template(self.options.template.clone()),
            report_path: self.options.write_report.then(|| self.report_path()),
            index_file,
            log: self.log.clone(),
        }
    }

    /// Stops the listener and cleans up. Safe to call any number of times.
    pub fn shutdown(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        self.state = SessionState::Stopping;
        running.stop.store(true, Ordering::SeqCst);
        join_with_timeout(running.handle, JOIN_TIMEOUT);
        if let Some(path) = running.index_file {
            if self.options.keep_index {
                self.log
                    .write(&format!("Kept generated file at {}", path.display()));
            } else if let Err(e) = fs::remove_file(&path) {
                self.log
                    .write(&format!("Could not remove {}: {}", path.display(), e));
            }
        }
        self.log.write("Server stopped");
        self.state = SessionState::Stopped;
    }

    /// Starts the server and blocks until Ctrl+C or until the server is stopped over
    /// HTTP, then shuts down.
    pub fn run_headless(&mut self) -> Result<(), ServeError> {
        let interrupted = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&interrupted);
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
            .map_err(|e| ServeError::Signal(e.to_string()))?;
        let url = self.start()?.to_string();
        if self.options.open_browser {
            open_in_browser(&url);
        }
        while self.is_serving() && !interrupted.load(Ordering::SeqCst) {
            thread::sleep(HEADLESS_TICK);
        }
        if interrupted.load(Ordering::SeqCst) {
            self.log.write("Interrupt received, shutting down");
        }
        self.shutdown();
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn format_url(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("http://[{}]:{}/", host, port)
    } else {
        format!("http://{}:{}/", host, port)
    }
}

fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    if !handle.is_finished() {
        tracing::warn!("Serving thread did not stop within {:?}, detaching it", timeout);
        return;
    }
    if handle.join().is_err() {
        tracing::warn!("Serving thread panicked");
    }
}

/// Hands `url` to the platform's default opener. Failures are only logged.
pub fn open_in_browser(url: &str) {
    #[cfg(target_os = "windows")]
    let mut command = {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    };
    #[cfg(target_os = "macos")]
    let mut command = Command::new("open");
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    let mut command = Command::new("xdg-open");
    let spawned = command
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    match spawned {
        Ok(mut child) => {
            thread::spawn(move || child.wait());
        }
        Err(e) => tracing::warn!("Could not open a browser: {}", e),
    }
}
