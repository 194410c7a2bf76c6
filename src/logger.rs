use std::{
    borrow::Cow,
    fmt,
    future::Future,
    marker::PhantomData,
    panic::Location,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::{Duration, Instant},
};

use futures_core::ready;
use log::{Level, LevelFilter, ParseLevelError};
use pin_project_lite::pin_project;

use actix_service::{Service, Transform};
use actix_utils::future::{Ready, ready};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{Error, HttpMessage, Result};

use crate::entry::{Fields, LogEntry, keys};
use crate::level::{level_for_status, parse_level};

const UNIQUE_ID_HEADER: &str = "x-unique-id";

/// Middleware writing one access log entry per request, with a level derived
/// from the response status.
///
/// The levels are:
/// - 2XX => INFO
/// - 3XX / 4XX => WARN
/// - anything else => ERROR
///
/// Handlers can add an error to the entry with [`log_error`](crate::log_error).
///
/// # Examples
/// ```rust
/// use actix_web::App;
/// use actix_web_middleware_statuslog::StatusLogger;
///
/// let app = App::new()
///     .wrap(StatusLogger::new("info"));
/// ```
#[derive(Clone, Debug)]
pub struct StatusLogger(Arc<Engine>);

/// Logging engine configuration shared by every request of a [`StatusLogger`].
#[derive(Clone)]
pub struct Engine {
    level: LevelFilter,
    sink: Option<Arc<dyn log::Log>>,
    target: Cow<'static, str>,
}

impl Engine {
    /// Send entries to `logger` instead of the global logger.
    pub fn set_formatter(&mut self, logger: impl log::Log + 'static) {
        self.sink = Some(Arc::new(logger));
    }

    /// Target of the emitted records.
    pub fn set_target(&mut self, target: impl Into<Cow<'static, str>>) {
        self.target = target.into();
    }

    /// Minimum level of the emitted records.
    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Target of the emitted records.
    pub fn target(&self) -> &str {
        &self.target
    }

    fn logger(&self) -> &dyn log::Log {
        match &self.sink {
            Some(logger) => logger.as_ref(),
            None => log::logger(),
        }
    }

    fn emit(&self, level: Level, fields: &Fields) {
        if level > self.level {
            return;
        }

        crate::wrapper::rust_log::log(
            self.logger(),
            level,
            &self.target,
            module_path!(),
            Location::caller(),
            fields,
        );
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("level", &self.level)
            .field("custom_sink", &self.sink.is_some())
            .field("target", &self.target)
            .finish()
    }
}

/// Modifies the logging engine of a [`StatusLogger`].
pub type LogOption = Box<dyn FnOnce(&mut Engine) + Send>;

/// Render and write entries with `logger` instead of the global logger.
///
/// `logger` is any [`log::Log`] implementation, e.g. a JSON writer from
/// `structured_logger`.
pub fn with_formatter(logger: impl log::Log + 'static) -> LogOption {
    Box::new(move |engine| engine.set_formatter(logger))
}

/// Set the target of the emitted records.
///
/// By default, the target is `actix_web_middleware_statuslog::logger`.
pub fn with_target(target: impl Into<Cow<'static, str>>) -> LogOption {
    let target = target.into();
    Box::new(move |engine| engine.set_target(target))
}

impl StatusLogger {
    /// Create `StatusLogger` middleware logging at `level` and above.
    ///
    /// # Panics
    /// Panics if `level` is not a known level name; see [`StatusLogger::try_new`].
    pub fn new(level: &str) -> StatusLogger {
        match StatusLogger::try_new(level) {
            Ok(logger) => logger,
            Err(_) => panic!("failed to parse the log level {level:?}"),
        }
    }

    /// Create `StatusLogger` middleware logging at `level` and above.
    ///
    /// Level names are case-insensitive: `trace`, `debug`, `info`, `warn`,
    /// `warning`, `error`, `fatal` and `panic`. `fatal` and `panic` rank above
    /// ERROR, so no access log entry is written at those levels.
    pub fn try_new(level: &str) -> Result<StatusLogger, ParseLevelError> {
        Ok(StatusLogger(Arc::new(Engine {
            level: parse_level(level)?,
            sink: None,
            target: Cow::Borrowed(module_path!()),
        })))
    }

    /// Apply `options` in order.
    pub fn with_options(mut self, options: impl IntoIterator<Item = LogOption>) -> Self {
        let engine = Arc::make_mut(&mut self.0);
        for option in options {
            option(&mut *engine);
        }
        self
    }

    /// Shortcut for [`with_formatter`].
    pub fn formatter(self, logger: impl log::Log + 'static) -> Self {
        self.with_options([with_formatter(logger)])
    }

    /// Sets the logging target to `target`.
    ///
    /// # Examples
    /// Using `.log_target("http_access")` would have this effect on request logs:
    /// ```diff
    /// - [2015-10-21T07:28:00Z INFO  actix_web_middleware_statuslog::logger] request-url=/ status=200
    /// + [2015-10-21T07:28:00Z INFO  http_access] request-url=/ status=200
    ///                               ^^^^^^^^^^^
    /// ```
    pub fn log_target(self, target: impl Into<Cow<'static, str>>) -> Self {
        self.with_options([with_target(target)])
    }

    /// Logging engine configuration shared by the requests of this middleware.
    pub fn engine(&self) -> &Engine {
        &self.0
    }
}

impl Default for StatusLogger {
    /// Create `StatusLogger` middleware at `info` level writing to the global logger.
    fn default() -> Self {
        StatusLogger::new("info")
    }
}

impl<S, B> Transform<S, ServiceRequest> for StatusLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = StatusLoggerMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(StatusLoggerMiddlewareService {
            service,
            engine: Arc::clone(&self.0),
        }))
    }
}

/// Logger middleware service.
pub struct StatusLoggerMiddlewareService<S> {
    engine: Arc<Engine>,
    service: S,
}

impl<S, B> Service<ServiceRequest> for StatusLoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = StatusLoggerResponse<S, B>;

    actix_service::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let entry = LogEntry::new();

        render_request(&entry, &req);
        req.extensions_mut().insert(entry.clone());

        StatusLoggerResponse {
            fut: self.service.call(req),
            start,
            entry,
            engine: Arc::clone(&self.engine),
            _phantom: PhantomData,
        }
    }
}

fn render_request(entry: &LogEntry, req: &ServiceRequest) {
    entry.insert(keys::REQUEST_URL, req.uri().to_string());
    entry.insert(keys::REQUEST_METHOD, req.method().as_str());
    entry.insert(keys::USER_AGENT, header_str(req, "user-agent"));
    entry.insert(keys::UNIQUE_ID, header_str(req, UNIQUE_ID_HEADER));

    #[cfg(feature = "tracing-request-id")]
    render_tracing_request_id(entry, req);
}

#[cfg(feature = "tracing-request-id")]
fn render_tracing_request_id(entry: &LogEntry, req: &ServiceRequest) {
    if let Some(id) = req.extensions().get::<tracing_actix_web::RequestId>() {
        entry.insert(keys::TRACING_REQUEST_ID, id.to_string());
    }
}

/// Header value as text, empty when missing. Invalid UTF-8 is replaced, not dropped.
fn header_str(req: &ServiceRequest, name: &str) -> String {
    req.headers()
        .get(name)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .unwrap_or_default()
}

fn render_response(entry: &LogEntry, status: StatusCode, latency: Duration) {
    entry.insert(keys::STATUS, status.as_u16());
    entry.insert(keys::LATENCY_MS, latency);
}

/// Round to the nearest millisecond, halves rounding up.
fn round_millis(d: Duration) -> Duration {
    Duration::from_millis(((d.as_nanos() + 500_000) / 1_000_000) as u64)
}

pin_project! {
    pub struct StatusLoggerResponse<S, B>
    where
        S: Service<ServiceRequest>,
    {
        #[pin]
        fut: S::Future,
        start: Instant,
        entry: LogEntry,
        engine: Arc<Engine>,
        _phantom: PhantomData<B>,
    }
}

impl<S, B> Future for StatusLoggerResponse<S, B>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
{
    type Output = Result<ServiceResponse<B>, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        let res = ready!(this.fut.poll(cx));
        let latency = round_millis(this.start.elapsed());

        let status = match &res {
            Ok(res) => {
                if let Some(error) = res.response().error() {
                    log::debug!("Error in response: {:?}", error);
                }
                res.status()
            }
            Err(err) => err.as_response_error().status_code(),
        };

        render_response(this.entry, status, latency);
        this.engine
            .emit(level_for_status(status.as_u16()), &this.entry.take());

        Poll::Ready(res)
    }
}
