// Protocol-wide constants for mcpkit

pub const JSONRPC_VERSION: &str = "2.0";

/// Largest request id magnitude representable without loss in an IEEE double.
pub const MAX_SAFE_REQUEST_ID: i64 = (1 << 53) - 1;

/// Method names with special lifecycle or routing treatment.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const SHUTDOWN: &str = "shutdown";
    pub const PING: &str = "ping";
    pub const CANCELLED: &str = "notifications/cancelled";
    pub const PROGRESS: &str = "notifications/progress";

    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
    pub const RESOURCES_LIST: &str = "resources/list";
    pub const RESOURCES_READ: &str = "resources/read";
    pub const RESOURCES_SUBSCRIBE: &str = "resources/subscribe";
    pub const PROMPTS_LIST: &str = "prompts/list";
    pub const PROMPTS_GET: &str = "prompts/get";
}

/// Prefix reserved for methods that must never carry a request id.
pub const NOTIFICATION_PREFIX: &str = "notifications/";
