//! Per-transport DNS query functions
//!
//! One function per wire transport. Each takes an already-built query
//! message, performs a single exchange against the server named by the
//! spec, and returns the parsed response. There is no retry logic, no
//! connection pooling, and no cross-transport fallback: a resolution is a
//! one-shot query bounded by the caller's timeout.
//!
//! TCP, TLS, and QUIC all use the 2-byte big-endian length prefix of
//! RFC 1035; HTTPS posts the wire-format message to the spec's full URL
//! per RFC 8484; QUIC additionally zeroes the message ID on the wire per
//! RFC 9250.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use hickory_proto::op::Message;
use http::{header, Method, Request, Uri};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnectorBuilder;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use rustls::pki_types::ServerName;
use rustls::ClientConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio_rustls::TlsConnector;

use super::error::{ResolveError, ResolveResult};
use super::spec::DnsServerSpec;

/// Receive buffer for UDP responses (large enough for EDNS0 payloads)
const UDP_RECV_BUFFER_SIZE: usize = 4096;

/// Maximum DNS message size for stream transports
const MAX_STREAM_MESSAGE_SIZE: usize = 65535;

/// `DoH` media type for DNS wire format (RFC 8484)
const DOH_CONTENT_TYPE: &str = "application/dns-message";

/// ALPN protocol identifier for DNS over QUIC (RFC 9250)
const DOQ_ALPN: &[u8] = b"doq";

/// Serialize a query message to wire format
fn encode_query(query: &Message, domain: &str, server: &str) -> ResolveResult<Vec<u8>> {
    query
        .to_vec()
        .map_err(|e| ResolveError::query(domain, server, format!("failed to serialize query: {e}")))
}

/// Parse a wire-format response
fn decode_response(buf: &[u8], domain: &str, server: &str) -> ResolveResult<Message> {
    Message::from_vec(buf)
        .map_err(|e| ResolveError::query(domain, server, format!("failed to parse response: {e}")))
}

/// Validate that a response answers the given query
///
/// Checks the message ID and the first question's name and type. Responses
/// that answer a different question are rejected rather than trusted.
fn validate_response(query: &Message, response: &Message) -> bool {
    if query.id() != response.id() {
        return false;
    }
    match (query.queries().first(), response.queries().first()) {
        (Some(q), Some(r)) => q.name() == r.name() && q.query_type() == r.query_type(),
        _ => false,
    }
}

/// Resolve the server's host:port to a socket address
///
/// The host may itself be a hostname (e.g. `tls://dns.google`); that lookup
/// goes through the OS resolver, not through this crate's resolution path.
async fn server_addr(spec: &DnsServerSpec, domain: &str) -> ResolveResult<SocketAddr> {
    tokio::net::lookup_host((spec.host.as_str(), spec.port))
        .await
        .map_err(|e| {
            ResolveError::query(
                domain,
                &spec.raw,
                format!("failed to resolve server address {}:{}: {e}", spec.host, spec.port),
            )
        })?
        .next()
        .ok_or_else(|| {
            ResolveError::query(
                domain,
                &spec.raw,
                format!("no addresses found for server {}", spec.host),
            )
        })
}

/// TLS client configuration with Mozilla's root certificates
fn tls_client_config() -> ClientConfig {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}

/// Query over plain UDP
///
/// Binds an ephemeral socket per query and verifies the response source
/// address against the server address.
pub async fn query_udp(
    spec: &DnsServerSpec,
    query: &Message,
    domain: &str,
) -> ResolveResult<Message> {
    let addr = server_addr(spec, domain).await?;
    let query_bytes = encode_query(query, domain, &spec.raw)?;

    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("failed to bind UDP socket: {e}")))?;

    socket
        .send_to(&query_bytes, addr)
        .await
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("failed to send query: {e}")))?;

    let mut buf = vec![0u8; UDP_RECV_BUFFER_SIZE];
    let (len, src) = socket
        .recv_from(&mut buf)
        .await
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("failed to receive response: {e}")))?;

    if src != addr {
        return Err(ResolveError::query(
            domain,
            &spec.raw,
            format!("response from unexpected source {src} (expected {addr})"),
        ));
    }

    let response = decode_response(&buf[..len], domain, &spec.raw)?;
    if !validate_response(query, &response) {
        return Err(ResolveError::query(
            domain,
            &spec.raw,
            "response validation failed (ID or question mismatch)",
        ));
    }

    Ok(response)
}

/// Exchange a length-prefixed message over an established stream
///
/// Shared by the TCP and TLS transports, which differ only in connection
/// setup.
async fn exchange_framed<S>(
    stream: &mut S,
    query: &Message,
    domain: &str,
    server: &str,
) -> ResolveResult<Message>
where
    S: AsyncReadExt + AsyncWriteExt + Unpin,
{
    let query_bytes = encode_query(query, domain, server)?;
    if query_bytes.len() > MAX_STREAM_MESSAGE_SIZE {
        return Err(ResolveError::query(
            domain,
            server,
            format!("query too large: {} bytes", query_bytes.len()),
        ));
    }

    let mut send_buf = Vec::with_capacity(2 + query_bytes.len());
    send_buf.extend_from_slice(&(query_bytes.len() as u16).to_be_bytes());
    send_buf.extend_from_slice(&query_bytes);

    stream
        .write_all(&send_buf)
        .await
        .map_err(|e| ResolveError::query(domain, server, format!("failed to send query: {e}")))?;
    stream
        .flush()
        .await
        .map_err(|e| ResolveError::query(domain, server, format!("failed to flush query: {e}")))?;

    let mut len_buf = [0u8; 2];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| ResolveError::query(domain, server, format!("failed to read response length: {e}")))?;

    let response_len = u16::from_be_bytes(len_buf) as usize;
    if response_len == 0 {
        return Err(ResolveError::query(domain, server, "received empty response"));
    }

    let mut response_buf = vec![0u8; response_len];
    stream
        .read_exact(&mut response_buf)
        .await
        .map_err(|e| ResolveError::query(domain, server, format!("failed to read response body: {e}")))?;

    decode_response(&response_buf, domain, server)
}

/// Query over plain TCP
pub async fn query_tcp(
    spec: &DnsServerSpec,
    query: &Message,
    domain: &str,
) -> ResolveResult<Message> {
    let addr = server_addr(spec, domain).await?;

    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("failed to connect to {addr}: {e}")))?;
    stream.set_nodelay(true).ok();

    let response = exchange_framed(&mut stream, query, domain, &spec.raw).await?;
    if !validate_response(query, &response) {
        return Err(ResolveError::query(
            domain,
            &spec.raw,
            "response validation failed (ID or question mismatch)",
        ));
    }

    Ok(response)
}

/// Query over DNS-over-TLS (RFC 7858)
///
/// The spec's host doubles as the SNI name; certificate validation uses
/// webpki roots.
pub async fn query_tls(
    spec: &DnsServerSpec,
    query: &Message,
    domain: &str,
) -> ResolveResult<Message> {
    let addr = server_addr(spec, domain).await?;

    let server_name: ServerName<'static> = spec.host.clone().try_into().map_err(|_| {
        ResolveError::query(
            domain,
            &spec.raw,
            format!("invalid server name for SNI: {}", spec.host),
        )
    })?;

    let connector = TlsConnector::from(Arc::new(tls_client_config()));

    let tcp_stream = TcpStream::connect(addr)
        .await
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("failed to connect to {addr}: {e}")))?;
    tcp_stream.set_nodelay(true).ok();

    let mut tls_stream = connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("TLS handshake failed: {e}")))?;

    let response = exchange_framed(&mut tls_stream, query, domain, &spec.raw).await?;
    if !validate_response(query, &response) {
        return Err(ResolveError::query(
            domain,
            &spec.raw,
            "response validation failed (ID or question mismatch)",
        ));
    }

    Ok(response)
}

/// Query over DNS-over-HTTPS (RFC 8484)
///
/// Posts the wire-format query to the spec's full original URL; the path
/// component matters, so the endpoint is `spec.raw`, never reassembled from
/// host and port.
pub async fn query_https(
    spec: &DnsServerSpec,
    query: &Message,
    domain: &str,
) -> ResolveResult<Message> {
    let uri: Uri = spec
        .raw
        .parse()
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("invalid DoH URL: {e}")))?;

    let https = HttpsConnectorBuilder::new()
        .with_tls_config(tls_client_config())
        .https_only()
        .enable_all_versions()
        .build();
    let client = Client::builder(TokioExecutor::new()).build(https);

    let query_bytes = encode_query(query, domain, &spec.raw)?;
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, DOH_CONTENT_TYPE)
        .header(header::ACCEPT, DOH_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, query_bytes.len())
        .body(Full::new(Bytes::from(query_bytes)))
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("failed to build request: {e}")))?;

    let response = client
        .request(request)
        .await
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("DoH request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ResolveError::query(
            domain,
            &spec.raw,
            format!("DoH request returned HTTP {status}"),
        ));
    }

    let body = response
        .into_body()
        .collect()
        .await
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("failed to read DoH body: {e}")))?
        .to_bytes();

    let message = decode_response(&body, domain, &spec.raw)?;
    if !validate_response(query, &message) {
        return Err(ResolveError::query(
            domain,
            &spec.raw,
            "response validation failed (ID or question mismatch)",
        ));
    }

    Ok(message)
}

/// Query over DNS-over-QUIC (RFC 9250)
///
/// Opens a fresh client endpoint, negotiates ALPN `doq`, and exchanges one
/// length-prefixed message on a bidirectional stream. The message ID is
/// zeroed on the wire as the RFC requires.
pub async fn query_quic(
    spec: &DnsServerSpec,
    query: &Message,
    domain: &str,
) -> ResolveResult<Message> {
    let addr = server_addr(spec, domain).await?;

    let mut tls_config = tls_client_config();
    tls_config.alpn_protocols = vec![DOQ_ALPN.to_vec()];

    let quic_crypto = quinn::crypto::rustls::QuicClientConfig::try_from(tls_config)
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("QUIC TLS config failed: {e}")))?;
    let client_config = quinn::ClientConfig::new(Arc::new(quic_crypto));

    let bind_addr: SocketAddr = "0.0.0.0:0".parse().expect("valid bind address");
    let mut endpoint = quinn::Endpoint::client(bind_addr)
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("failed to create QUIC endpoint: {e}")))?;
    endpoint.set_default_client_config(client_config);

    let connection = endpoint
        .connect(addr, &spec.host)
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("QUIC connect failed: {e}")))?
        .await
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("QUIC handshake failed: {e}")))?;

    let (mut send, mut recv) = connection
        .open_bi()
        .await
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("failed to open QUIC stream: {e}")))?;

    // RFC 9250 §4.2: the wire message ID must be zero.
    let mut wire_query = query.clone();
    wire_query.set_id(0);
    let query_bytes = encode_query(&wire_query, domain, &spec.raw)?;

    let mut send_buf = Vec::with_capacity(2 + query_bytes.len());
    send_buf.extend_from_slice(&(query_bytes.len() as u16).to_be_bytes());
    send_buf.extend_from_slice(&query_bytes);

    send.write_all(&send_buf)
        .await
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("failed to send query: {e}")))?;
    send.finish()
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("failed to finish QUIC stream: {e}")))?;

    let mut len_buf = [0u8; 2];
    recv.read_exact(&mut len_buf)
        .await
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("failed to read response length: {e}")))?;

    let response_len = u16::from_be_bytes(len_buf) as usize;
    if response_len == 0 {
        return Err(ResolveError::query(domain, &spec.raw, "received empty response"));
    }

    let mut response_buf = vec![0u8; response_len];
    recv.read_exact(&mut response_buf)
        .await
        .map_err(|e| ResolveError::query(domain, &spec.raw, format!("failed to read response body: {e}")))?;

    let response = decode_response(&response_buf, domain, &spec.raw)?;
    if !validate_response(&wire_query, &response) {
        return Err(ResolveError::query(
            domain,
            &spec.raw,
            "response validation failed (question mismatch)",
        ));
    }

    connection.close(0u32.into(), b"done");
    endpoint.wait_idle().await;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::{MessageType, Query, ResponseCode};
    use hickory_proto::rr::{Name, RecordType};
    use std::str::FromStr;

    // ========================================================================
    // Helper Functions
    // ========================================================================

    fn create_query(domain: &str, id: u16) -> Message {
        let mut message = Message::new();
        message.set_id(id);
        message.set_recursion_desired(true);

        let name = Name::from_str(domain).unwrap();
        message.add_query(Query::query(name, RecordType::A));
        message
    }

    fn create_response(domain: &str, id: u16) -> Message {
        let mut message = Message::new();
        message.set_id(id);
        message.set_message_type(MessageType::Response);
        message.set_response_code(ResponseCode::NoError);

        let name = Name::from_str(domain).unwrap();
        message.add_query(Query::query(name, RecordType::A));
        message
    }

    // ========================================================================
    // Response Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_response_matching() {
        let query = create_query("example.com.", 0x1234);
        let response = create_response("example.com.", 0x1234);
        assert!(validate_response(&query, &response));
    }

    #[test]
    fn test_validate_response_id_mismatch() {
        let query = create_query("example.com.", 0x1234);
        let response = create_response("example.com.", 0x5678);
        assert!(!validate_response(&query, &response));
    }

    #[test]
    fn test_validate_response_name_mismatch() {
        let query = create_query("example.com.", 0x1234);
        let response = create_response("other.com.", 0x1234);
        assert!(!validate_response(&query, &response));
    }

    #[test]
    fn test_validate_response_empty_questions() {
        let query = create_query("example.com.", 0x1234);
        let mut response = Message::new();
        response.set_id(0x1234);
        assert!(!validate_response(&query, &response));
    }

    // ========================================================================
    // Wire Encoding Tests
    // ========================================================================

    #[test]
    fn test_encode_decode_roundtrip() {
        let query = create_query("example.com.", 0x4242);
        let bytes = encode_query(&query, "example.com", "udp://8.8.8.8:53").unwrap();
        let decoded = decode_response(&bytes, "example.com", "udp://8.8.8.8:53").unwrap();
        assert_eq!(decoded.id(), 0x4242);
        assert_eq!(decoded.queries().len(), 1);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode_response(&[0xff, 0x00, 0x01], "example.com", "udp://8.8.8.8:53")
            .unwrap_err();
        assert!(err.to_string().contains("failed to parse response"));
    }

    // ========================================================================
    // Transport Failure Tests (no network required)
    // ========================================================================

    #[tokio::test]
    async fn test_tcp_connection_refused() {
        let spec = DnsServerSpec::parse("tcp://127.0.0.1:59999").unwrap();
        let query = create_query("example.com.", 0x1234);

        let err = query_tcp(&spec, &query, "example.com").await.unwrap_err();
        assert!(!err.is_invalid_spec());
        assert_eq!(err.domain(), Some("example.com"));
    }

    #[tokio::test]
    async fn test_tls_connection_refused() {
        let spec = DnsServerSpec::parse("tls://127.0.0.1:59998").unwrap();
        let query = create_query("example.com.", 0x1234);

        let err = query_tls(&spec, &query, "example.com").await.unwrap_err();
        assert!(err.to_string().contains("tls://127.0.0.1:59998"));
    }

    #[tokio::test]
    async fn test_udp_stub_exchange() {
        // Stub server that echoes a response for whatever query arrives
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server_port = server.local_addr().unwrap().port();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];
            let (len, src) = server.recv_from(&mut buf).await.unwrap();
            let query = Message::from_vec(&buf[..len]).unwrap();

            let mut response = query.clone();
            response.set_message_type(MessageType::Response);
            server
                .send_to(&response.to_vec().unwrap(), src)
                .await
                .unwrap();
        });

        let spec = DnsServerSpec::parse(&format!("udp://127.0.0.1:{server_port}")).unwrap();
        let query = create_query("example.com.", 0x7777);

        let response = query_udp(&spec, &query, "example.com").await.unwrap();
        assert_eq!(response.id(), 0x7777);
    }

    // ========================================================================
    // Network Tests (ignored by default)
    // ========================================================================

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_udp_query_real() {
        let spec = DnsServerSpec::parse("udp://8.8.8.8:53").unwrap();
        let query = create_query("example.com.", 0x1234);

        let response = query_udp(&spec, &query, "example.com").await.unwrap();
        assert!(!response.answers().is_empty());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_tls_query_real() {
        let spec = DnsServerSpec::parse("tls://1.1.1.1").unwrap();
        let query = create_query("example.com.", 0x2345);

        let response = query_tls(&spec, &query, "example.com").await.unwrap();
        assert!(!response.answers().is_empty());
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_https_query_real() {
        let spec = DnsServerSpec::parse("https://cloudflare-dns.com/dns-query").unwrap();
        let query = create_query("example.com.", 0x3456);

        let response = query_https(&spec, &query, "example.com").await.unwrap();
        assert!(!response.answers().is_empty());
    }
}
