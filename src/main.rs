use color_eyre::eyre::{Result, WrapErr, bail};
use mocksrv::fixtures::{error_template, json_xml_template};
use mocksrv::{MockServer, ServerConfig};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mocksrv=info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("mocksrv");

    // Default to the success template if no mode specified
    let mode = args.get(1).map(|s| s.to_lowercase()).unwrap_or_else(|| "success".to_string());
    let port = match args.get(2) {
        Some(p) => p
            .parse::<u16>()
            .wrap_err_with(|| format!("Invalid port {p:?}"))?,
        None => 8080,
    };

    let template = match mode.as_str() {
        "success" => json_xml_template().wrap_err("Failed to build success template")?,
        "error" => error_template().wrap_err("Failed to build error template")?,
        _ => {
            eprintln!("Usage: {program} [success|error] [port]");
            eprintln!("  success: 200 with a JSON body, XML for application/xml requests (default)");
            eprintln!("  error:   500 with a JSON error body");
            eprintln!("  port:    Port to bind to on 127.0.0.1, 0 for any (default: 8080)");
            eprintln!();
            eprintln!("Examples:");
            eprintln!("  {program} success 8080   # Serve the success payloads on port 8080");
            eprintln!("  {program} error 0        # Serve the error payload on an OS-assigned port");
            bail!("unknown mode {mode:?}");
        }
    };

    let mut server = MockServer::new(template, ServerConfig::with_port(port));
    let addr = server.start().wrap_err("Failed to start mock server")?;
    info!(address = %addr, mode = %mode, "Serving canned responses");

    // Runs until interrupted or the acceptor dies
    while server.is_running() {
        std::thread::sleep(Duration::from_millis(250));
    }

    warn!("Acceptor loop exited");
    server.stop().wrap_err("Mock server failed")?;
    Ok(())
}
