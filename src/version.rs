// Agent identity reported over HTTP and to alert webhooks

pub const NAME: &str = env!("CARGO_PKG_NAME");

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `hostguard/<version>`, sent as the User-Agent on outbound webhook calls.
pub fn user_agent() -> String {
    format!("{NAME}/{VERSION}")
}
