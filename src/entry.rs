use std::{borrow::Cow, cell::RefCell, collections::BTreeMap, fmt, rc::Rc, time::Duration};

use actix_utils::future::{Ready, ready};
use actix_web::dev::Payload;
use actix_web::error::ErrorInternalServerError;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};

/// Names of the fields written by the middleware.
pub mod keys {
    pub const REQUEST_URL: &str = "request-url";
    pub const REQUEST_METHOD: &str = "request-method";
    pub const USER_AGENT: &str = "user-agent";
    pub const UNIQUE_ID: &str = "x-unique-id";
    pub const STATUS: &str = "status";
    pub const LATENCY_MS: &str = "latency_ms";
    pub const ERROR: &str = "error";
    #[cfg(feature = "tracing-request-id")]
    pub const TRACING_REQUEST_ID: &str = "tracing_request_id";
}

pub(crate) type Fields = BTreeMap<Cow<'static, str>, FieldValue>;

/// Value of a single access log field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    /// Written as whole milliseconds.
    Duration(Duration),
}

impl FieldValue {
    pub(crate) fn to_kv(&self) -> log::kv::Value<'_> {
        match self {
            FieldValue::Str(s) => log::kv::Value::from(s.as_str()),
            FieldValue::Int(n) => log::kv::Value::from(*n),
            FieldValue::Duration(d) => log::kv::Value::from(d.as_millis() as u64),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => f.write_str(s),
            FieldValue::Int(n) => write!(f, "{n}"),
            FieldValue::Duration(d) => write!(f, "{}", d.as_millis()),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<u16> for FieldValue {
    fn from(value: u16) -> Self {
        FieldValue::Int(value.into())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<Duration> for FieldValue {
    fn from(value: Duration) -> Self {
        FieldValue::Duration(value)
    }
}

/// Access log entry of the request currently being handled.
///
/// [`StatusLogger`](crate::StatusLogger) binds one entry to every request it
/// wraps and emits it once the inner service has produced a response. Code
/// running inside that request can add fields to it, either through
/// [`log_error`] or by taking the entry as a handler argument:
///
/// ```rust
/// use actix_web::{HttpResponse, get};
/// use actix_web_middleware_statuslog::LogEntry;
///
/// #[get("/orders")]
/// async fn orders(entry: LogEntry) -> HttpResponse {
///     entry.insert("orders", 3_i64);
///     HttpResponse::Ok().finish()
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogEntry(Rc<RefCell<Fields>>);

impl LogEntry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value under the same key.
    pub fn insert(&self, key: impl Into<Cow<'static, str>>, value: impl Into<FieldValue>) {
        self.0.borrow_mut().insert(key.into(), value.into());
    }

    /// Set the `error` field to the text of `err`.
    pub fn error<E: fmt::Display + ?Sized>(&self, err: &E) {
        self.insert(keys::ERROR, err.to_string());
    }

    pub fn get(&self, key: &str) -> Option<FieldValue> {
        self.0.borrow().get(key).cloned()
    }

    /// Drain the fields for emission.
    pub(crate) fn take(&self) -> Fields {
        std::mem::take(&mut *self.0.borrow_mut())
    }
}

impl FromRequest for LogEntry {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<LogEntry>()
                .cloned()
                .ok_or_else(|| ErrorInternalServerError("no access log entry bound to request")),
        )
    }
}

/// Add an error to the access log entry of the request.
///
/// The error text is written in the `error` field when the middleware emits
/// the entry.
///
/// # Panics
/// Panics if the request is not wrapped by [`StatusLogger`](crate::StatusLogger).
#[track_caller]
pub fn log_error<M, E>(req: &M, err: &E)
where
    M: HttpMessage,
    E: fmt::Display + ?Sized,
{
    let ext = req.extensions();
    let Some(entry) = ext.get::<LogEntry>() else {
        panic!("no access log entry bound to request; is StatusLogger wrapping this service?");
    };
    entry.error(err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_entry_insert_replaces() {
        let entry = LogEntry::new();
        entry.insert(keys::STATUS, 200_u16);
        entry.insert(keys::STATUS, 404_u16);
        entry.insert("custom", "value");

        assert_eq!(entry.get(keys::STATUS), Some(FieldValue::Int(404)));
        assert_eq!(entry.get("custom"), Some(FieldValue::Str("value".to_string())));
        assert_eq!(entry.get("missing"), None);
    }

    #[test]
    fn test_entry_shared_between_clones() {
        let entry = LogEntry::new();
        let handle = entry.clone();
        handle.error("db timeout");

        assert_eq!(
            entry.get(keys::ERROR),
            Some(FieldValue::Str("db timeout".to_string()))
        );
    }

    #[test]
    fn test_entry_take_drains() {
        let entry = LogEntry::new();
        entry.insert(keys::REQUEST_METHOD, "GET");

        let fields = entry.take();
        assert_eq!(fields.len(), 1);
        assert_eq!(entry.get(keys::REQUEST_METHOD), None);
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::from("abc").to_string(), "abc");
        assert_eq!(FieldValue::from(503_u16).to_string(), "503");
        assert_eq!(
            FieldValue::from(Duration::from_millis(42)).to_string(),
            "42"
        );
        assert_eq!(FieldValue::from(Duration::from_millis(42)).to_kv().to_string(), "42");
    }

    #[test]
    fn test_log_error() {
        let req = TestRequest::default().to_http_request();
        let entry = LogEntry::new();
        req.extensions_mut().insert(entry.clone());

        let err = std::io::Error::other("db timeout");
        log_error(&req, &err);

        assert_eq!(
            entry.get(keys::ERROR),
            Some(FieldValue::Str("db timeout".to_string()))
        );
    }

    #[test]
    #[should_panic(expected = "no access log entry bound to request")]
    fn test_log_error_without_entry_panics() {
        let req = TestRequest::default().to_http_request();
        log_error(&req, "boom");
    }

    #[actix_web::test]
    async fn test_extract_entry() {
        let req = TestRequest::default().to_http_request();
        assert!(LogEntry::extract(&req).await.is_err());

        let entry = LogEntry::new();
        req.extensions_mut().insert(entry.clone());
        let extracted = LogEntry::extract(&req).await.unwrap();
        extracted.insert("from-handler", 1_i64);

        assert_eq!(entry.get("from-handler"), Some(FieldValue::Int(1)));
    }
}
