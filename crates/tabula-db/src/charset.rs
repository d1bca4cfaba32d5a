//! Client character set enforcement
//!
//! MySQL-family clients may come up with a `binary` client character set,
//! under which `REGEXP_LIKE()` and friends fail. Every handle the resolver
//! returns goes through [`enforce_client_charset`] first.

use tracing::debug;

use crate::connection::Connection;
use crate::error::Result;

/// Client character set required on every returned connection
pub const CLIENT_CHARSET: &str = "utf8mb4";

/// Force the client character set of `conn` to [`CLIENT_CHARSET`].
///
/// Connections without a [`ClientCharsetOverride`](crate::connection::ClientCharsetOverride)
/// capability are left untouched. Otherwise the connection is opened first,
/// since the native handle may not exist until then.
pub async fn enforce_client_charset(conn: &dyn Connection) -> Result<()> {
    let Some(charset) = conn.charset_override() else {
        return Ok(());
    };

    conn.ping().await?;

    let current = charset.client_charset().await?;
    if current != CLIENT_CHARSET {
        debug!(
            server = %conn.server(),
            from = %current,
            to = CLIENT_CHARSET,
            "Switching client character set"
        );
        charset.set_client_charset(CLIENT_CHARSET).await?;
    }

    Ok(())
}
