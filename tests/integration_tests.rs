use color_eyre::eyre::{Result, eyre};
use mocksrv::common::{request_timeout, start_fixture_server};
use mocksrv::fixtures::{ALL_TYPES_PATH, ERROR_JSON_BODY, JSON_BODY, XML_BODY, error_template, json_xml_template};
use mocksrv::{MockServer, RawResponse, Request, ServerConfig, ServerStatus, send_request};
use std::net::{SocketAddr, TcpListener, TcpStream};

/// Finds a loopback port nobody is listening on right now
fn free_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

fn server_addr(server: &MockServer) -> Result<SocketAddr> {
    server.local_addr().ok_or_else(|| eyre!("server has no bound address"))
}

fn post(addr: SocketAddr, content_type: Option<&str>) -> Result<RawResponse> {
    let mut request = Request::post(ALL_TYPES_PATH).body(br#"{"StringMember":"foo"}"#);
    if let Some(content_type) = content_type {
        request = request.content_type(content_type);
    }
    Ok(send_request(addr, &request, request_timeout())?)
}

#[test]
fn test_json_request_gets_default_body() -> Result<()> {
    let mut server = start_fixture_server()?;
    let addr = server_addr(&server)?;

    let response = post(addr, Some("application/json"))?;
    assert_eq!(response.status, 200);
    assert_eq!(response.reason, "OK");
    assert_eq!(response.header("Connection"), Some("close"));
    assert_eq!(response.header("Content-Type"), Some("application/json"));
    assert_eq!(response.content_length(), Some(JSON_BODY.len()));
    assert_eq!(response.body_str()?, JSON_BODY);

    server.stop()?;
    Ok(())
}

#[test]
fn test_xml_request_gets_alternate_body() -> Result<()> {
    let mut server = start_fixture_server()?;
    let addr = server_addr(&server)?;

    let response = post(addr, Some("application/xml"))?;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("Content-Type"), Some("application/xml"));
    assert_eq!(response.content_length(), Some(XML_BODY.len()));
    assert_eq!(response.body_str()?, XML_BODY);

    // Same server keeps serving the other variant
    let response = post(addr, Some("application/json"))?;
    assert_eq!(response.body_str()?, JSON_BODY);

    server.stop()?;
    Ok(())
}

#[test]
fn test_missing_or_unknown_content_type_gets_default() -> Result<()> {
    let mut server = start_fixture_server()?;
    let addr = server_addr(&server)?;

    for content_type in [None, Some("text/plain"), Some("application/x-amz-json-1.1")] {
        let response = post(addr, content_type)?;
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.body_str()?, JSON_BODY);
    }

    let response = send_request(addr, &Request::get("/anything"), request_timeout())?;
    assert_eq!(response.body_str()?, JSON_BODY);

    server.stop()?;
    Ok(())
}

#[test]
fn test_wire_bytes_match_rendered_template() -> Result<()> {
    let mut server = start_fixture_server()?;
    let addr = server_addr(&server)?;

    for content_type in [Some("application/xml"), Some("application/json"), None] {
        let mut request = Request::post("/").body(b"payload");
        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }
        let raw = mocksrv::client::exchange(addr, &request.to_bytes(addr), request_timeout())?;
        assert_eq!(raw, server.template().render(content_type).to_vec());
    }

    server.stop()?;
    Ok(())
}

#[test]
fn test_error_template_status_line() -> Result<()> {
    let mut server = MockServer::new(error_template()?, ServerConfig::default());
    let addr = server.start()?;

    let response = post(addr, Some("application/xml"))?;
    assert_eq!(response.status, 500);
    assert_eq!(response.reason, "Internal Server Error");
    assert_eq!(response.header("x-amzn-ErrorType"), Some("EmptyModeledException"));
    assert_eq!(response.body_str()?, ERROR_JSON_BODY);

    server.stop()?;
    Ok(())
}

#[test]
fn test_sequential_closed_loop_requests() -> Result<()> {
    let mut server = start_fixture_server()?;
    let addr = server_addr(&server)?;

    for i in 0..200 {
        let content_type = if i % 2 == 0 { "application/json" } else { "application/xml" };
        let response = post(addr, Some(content_type))?;
        let expected = if i % 2 == 0 { JSON_BODY } else { XML_BODY };
        assert_eq!(response.body_str()?, expected);
    }

    assert!(server.is_running());
    server.stop()?;
    Ok(())
}

#[test]
fn test_fixed_port_is_reported() -> Result<()> {
    let port = free_port()?;
    let mut server = MockServer::new(json_xml_template()?, ServerConfig::with_port(port));

    let addr = server.start()?;
    assert_eq!(addr.port(), port);
    assert_eq!(server.port(), Some(port));

    server.stop()?;
    Ok(())
}

#[test]
fn test_ephemeral_port_is_assigned() -> Result<()> {
    let mut server = MockServer::new(json_xml_template()?, ServerConfig::default());
    assert_eq!(server.port(), None);

    server.start()?;
    let port = server.port().ok_or_else(|| eyre!("no port after start"))?;
    assert!(port > 0);

    server.stop()?;
    Ok(())
}

#[test]
fn test_port_in_use_fails_start() -> Result<()> {
    let holder = TcpListener::bind("127.0.0.1:0")?;
    let port = holder.local_addr()?.port();

    let mut server = MockServer::new(json_xml_template()?, ServerConfig::with_port(port));
    let result = server.start();
    assert!(matches!(result, Err(mocksrv::MockError::Bind { .. })), "got {result:?}");
    assert_eq!(server.status(), ServerStatus::New);
    assert_eq!(server.port(), None);
    Ok(())
}

#[test]
fn test_connections_refused_right_after_stop() -> Result<()> {
    let mut server = start_fixture_server()?;
    let addr = server_addr(&server)?;
    post(addr, None)?;

    server.stop()?;
    assert!(TcpStream::connect(addr).is_err());
    assert!(post(addr, None).is_err());
    Ok(())
}

#[test]
fn test_start_then_immediate_stop_releases_fixed_port() -> Result<()> {
    let port = free_port()?;

    let mut server = MockServer::new(json_xml_template()?, ServerConfig::with_port(port));
    server.start()?;
    server.stop()?;

    // Port can be bound again, both by a plain listener and a new server
    drop(TcpListener::bind(("127.0.0.1", port))?);
    let mut again = MockServer::new(json_xml_template()?, ServerConfig::with_port(port));
    again.start()?;
    again.stop()?;
    Ok(())
}

#[test]
fn test_repeated_runs_do_not_leak() -> Result<()> {
    for _ in 0..50 {
        let mut server = start_fixture_server()?;
        let addr = server_addr(&server)?;
        let response = post(addr, Some("application/xml"))?;
        assert_eq!(response.body_str()?, XML_BODY);
        server.stop()?;
        assert_eq!(server.status(), ServerStatus::Stopped);
    }
    Ok(())
}
