use crate::Result;
use crate::fixtures::json_xml_template;
use crate::server::{MockServer, ServerConfig};
use std::time::Duration;

/// Starts a JSON/XML fixture server on an ephemeral loopback port
///
/// The returned server is already started; `port()` gives the bound port.
pub fn start_fixture_server() -> Result<MockServer> {
    let mut server = MockServer::new(json_xml_template()?, ServerConfig::default());
    server.start()?;
    Ok(server)
}

/// Client-side timeout used against test servers
pub fn request_timeout() -> Duration {
    Duration::from_secs(5)
}
