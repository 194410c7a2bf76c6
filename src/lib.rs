//! Actix-web middleware writing one structured access log entry per request,
//! with a log level derived from the response status.
//!
//! - 2XX => INFO
//! - 3XX / 4XX => WARN
//! - anything else => ERROR
//!
//! Handlers can attach an error to the entry of the request they are serving
//! with [`log_error`]; it is written in the `error` field.
//!
//! # Examples:
//! ## By default middleware writes to the global logger of the standard `log` crate.
//! ```bash
//! cargo add actix-web-middleware-statuslog
//! ```
//! Example usage with `structured_logger` crate:
//! ```rust,no_run
//! use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
//! use actix_web_middleware_statuslog::{StatusLogger, log_error};
//! use tokio;
//! use structured_logger::{Builder, async_json::new_writer};
//!
//! async fn orders(req: HttpRequest) -> HttpResponse {
//!     log_error(&req, "db timeout");
//!     HttpResponse::ServiceUnavailable().finish()
//! }
//!
//! #[actix_web::main] // or #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     Builder::new()
//!         .with_target_writer("*", new_writer(tokio::io::stdout()))
//!         .init();
//!
//!     let logger = StatusLogger::new("info");
//!
//!     HttpServer::new(move || {
//!         App::new()
//!             .wrap(logger.clone())
//!             .route("/orders", web::get().to(orders))
//!     })
//!     .bind("127.0.0.1:8080")?;
//!     Ok(())
//! }
//! ```
//! The request above is logged at ERROR level, with the fields:
//! `error="db timeout"`, `latency_ms`, `request-method="GET"`,
//! `request-url="/orders"`, `status=503`, `user-agent`, `x-unique-id`.
//!
//! # Configuration
//!
//! ## Minimum level
//!
//! Entries below the level given to [`StatusLogger::new`] are dropped. Level
//! names are case-insensitive: `trace`, `debug`, `info`, `warn`, `warning`,
//! `error`, `fatal`, `panic`; `fatal` and `panic` rank above ERROR and
//! silence the middleware. An unknown name panics, use
//! [`StatusLogger::try_new`] to get the error instead.
//!
//! ## Options
//!
//! Entries can be sent to a dedicated [`log::Log`] implementation instead of
//! the global logger, and the record target can be changed:
//!
//! ```rust
//! use actix_web_middleware_statuslog::{StatusLogger, with_formatter, with_target};
//!
//! struct Stdout;
//!
//! impl log::Log for Stdout {
//!     fn enabled(&self, _: &log::Metadata) -> bool {
//!         true
//!     }
//!
//!     fn log(&self, record: &log::Record) {
//!         println!("{} {}", record.level(), record.target());
//!     }
//!
//!     fn flush(&self) {}
//! }
//!
//! let logger = StatusLogger::new("warning")
//!     .with_options([with_formatter(Stdout), with_target("http_access")]);
//! ```
//!
//! Options are applied in order, a later option overrides an earlier one.
//!
//! # Fields
//!
//! - `request-url` - Request URI with query string
//! - `request-method` - HTTP method (GET, POST, etc.)
//! - `user-agent` - Client user agent, empty when missing
//! - `x-unique-id` - `X-Unique-Id` request header, empty when missing
//! - `status` - Response status code
//! - `latency_ms` - Request duration, rounded to milliseconds
//! - `error` - Set by [`log_error`]
//! - `tracing_request_id` - Request ID set by `TracingLogger` (`tracing-request-id` feature)
//!
//! Handlers can add their own fields through the [`LogEntry`] extractor.
//!
//! # Feature Flags
//!
//! - `tracing-request-id` - Enable integration with `tracing-actix-web`'s request ID

mod entry;
mod level;
mod logger;
mod wrapper;

pub use crate::entry::{FieldValue, LogEntry, keys, log_error};
pub use crate::level::{level_for_status, parse_level};
pub use crate::logger::{Engine, LogOption, StatusLogger, with_formatter, with_target};
pub use crate::logger::{StatusLoggerMiddlewareService, StatusLoggerResponse};
