use log::{Level, LevelFilter, ParseLevelError};

/// Parse a minimum log level name.
///
/// Matching is case-insensitive. Accepted names are `trace`, `debug`, `info`,
/// `warn`, `warning`, `error`, `fatal` and `panic`. `fatal` and `panic` rank
/// above every level an access log entry is written at, so they map to
/// [`LevelFilter::Off`]. `off` itself is not a severity and is rejected.
pub fn parse_level(level: &str) -> Result<LevelFilter, ParseLevelError> {
    match level.to_ascii_lowercase().as_str() {
        "panic" | "fatal" => Ok(LevelFilter::Off),
        "warning" => Ok(LevelFilter::Warn),
        "off" => "".parse(),
        other => other.parse(),
    }
}

/// Severity of an access log entry for the given response status.
///
/// - 2XX => INFO
/// - 3XX / 4XX => WARN
/// - everything else => ERROR
///
/// 1XX falls into the last bucket as well.
pub fn level_for_status(status: u16) -> Level {
    match status {
        200..=299 => Level::Info,
        300..=499 => Level::Warn,
        _ => Level::Error,
    }
}
