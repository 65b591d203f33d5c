pub const CACHE_LOOKUPS_COUNTER: &str = "device_sources_cache_lookups_total";
pub const CACHE_WRITE_ERRORS_COUNTER: &str = "device_sources_cache_write_errors_total";
pub const FETCH_ERRORS_COUNTER: &str = "device_sources_fetch_errors_total";
pub const RECORDS_NORMALIZED_COUNTER: &str = "device_sources_records_normalized_total";
pub const UPSTREAM_REQUESTS_COUNTER: &str = "device_sources_upstream_requests_total";
