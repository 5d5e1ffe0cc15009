use std::time::Duration;

// Upper bound on the single blocking wait for submission resolution
// Never infinite: a caller that outlives this polls by descriptor id
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);
