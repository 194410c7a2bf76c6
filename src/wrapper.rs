pub mod rust_log {
    use crate::entry::Fields;
    use std::panic::Location;

    /// Write `fields` as one record to `logger`.
    ///
    /// The record carries no message, every field goes into its key/values.
    pub fn log(
        logger: &dyn log::Log,
        level: log::Level,
        target: &str,
        module_path: &'static str,
        loc: &'static Location,
        fields: &Fields,
    ) {
        let kvs: Vec<(&str, log::kv::Value)> = fields
            .iter()
            .map(|(k, v)| (k.as_ref(), v.to_kv()))
            .collect();
        let kvs = kvs.as_slice();

        logger.log(
            &log::Record::builder()
                .args(format_args!(""))
                .level(level)
                .target(target)
                .module_path_static(Some(module_path))
                .file_static(Some(loc.file()))
                .line(Some(loc.line()))
                .key_values(&kvs)
                .build(),
        );
    }
}
