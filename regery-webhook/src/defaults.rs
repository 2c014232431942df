use std::time::Duration;

/// Base URL of the Regery REST API. Not configurable per challenge.
pub const REGERY_API_BASE: &str = "https://api.regery.com/v1";

/// Name the solver is registered under (`solverName` in the Issuer).
pub const SOLVER_NAME: &str = "regery";

/// TTL sent with challenge records. Regery expects a string.
pub const CHALLENGE_RECORD_TTL: &str = "60";

pub const DEFAULT_SECURE_PORT: u16 = 443;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// How long a stopping server waits for in-flight requests.
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Pause after a failed `accept` (e.g. file descriptor exhaustion).
pub const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);
