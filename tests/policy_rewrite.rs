//! End-to-end policy substitution against a stub DNS server
//!
//! Exercises the full path a Clash subscription takes through the relay's
//! core: YAML document in, nameserver-policy matching, a real UDP exchange
//! with a local stub resolver, and the rewritten document out.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hickory_proto::op::{Message, MessageType, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{DNSClass, RData, Record, RecordType};
use tokio::net::UdpSocket;

use subrelay::dns::{ResolveCache, Resolver};
use subrelay::policy::{apply_policy, PolicyError};

const TIMEOUT: Duration = Duration::from_secs(3);

/// Spawn a stub DNS server answering every A query with the given addresses
///
/// Returns the bound port and a counter of queries served.
async fn spawn_stub_dns(answers: Vec<Ipv4Addr>) -> (u16, Arc<AtomicUsize>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();
    let served = Arc::new(AtomicUsize::new(0));
    let served_clone = Arc::clone(&served);

    tokio::spawn(async move {
        let mut buf = vec![0u8; 512];
        loop {
            let Ok((len, src)) = socket.recv_from(&mut buf).await else {
                break;
            };
            let query = Message::from_vec(&buf[..len]).unwrap();
            let name = query.queries()[0].name().clone();

            let mut response = query.clone();
            response.set_message_type(MessageType::Response);
            response.set_response_code(ResponseCode::NoError);
            for ip in &answers {
                let mut record = Record::new();
                record.set_name(name.clone());
                record.set_record_type(RecordType::A);
                record.set_dns_class(DNSClass::IN);
                record.set_ttl(300);
                record.set_data(Some(RData::A(A(*ip))));
                response.add_answer(record);
            }

            served_clone.fetch_add(1, Ordering::SeqCst);
            socket
                .send_to(&response.to_vec().unwrap(), src)
                .await
                .unwrap();
        }
    });

    (port, served)
}

fn fresh_resolver() -> Resolver {
    Resolver::new(Arc::new(ResolveCache::new()))
}

fn doc(yaml: &str) -> serde_yaml::Value {
    serde_yaml::from_str(yaml).unwrap()
}

#[tokio::test]
async fn end_to_end_substitution() {
    let (port, served) = spawn_stub_dns(vec![Ipv4Addr::new(10, 0, 0, 5)]).await;

    let mut document = doc(&format!(
        "dns:\n  nameserver-policy:\n    '.example.com': udp://127.0.0.1:{port}\nproxies:\n  - name: node-a\n    type: trojan\n    server: node.example.com\n    port: 443\n    password: secret\n"
    ));

    let resolver = fresh_resolver();
    let substituted = apply_policy(&mut document, &resolver, TIMEOUT).await.unwrap();

    assert_eq!(substituted, 1);
    assert_eq!(served.load(Ordering::SeqCst), 1);

    let proxy = &document["proxies"][0];
    assert_eq!(proxy["server"].as_str().unwrap(), "10.0.0.5");

    // Every other field survives untouched
    assert_eq!(proxy["name"].as_str().unwrap(), "node-a");
    assert_eq!(proxy["type"].as_str().unwrap(), "trojan");
    assert_eq!(proxy["port"].as_u64().unwrap(), 443);
    assert_eq!(proxy["password"].as_str().unwrap(), "secret");
}

#[tokio::test]
async fn unmatched_hostname_is_skipped_without_resolution() {
    let (port, served) = spawn_stub_dns(vec![Ipv4Addr::new(10, 0, 0, 5)]).await;

    let mut document = doc(&format!(
        "dns:\n  nameserver-policy:\n    '.example.com': udp://127.0.0.1:{port}\nproxies:\n  - name: other\n    server: other.net\n"
    ));

    let resolver = fresh_resolver();
    let substituted = apply_policy(&mut document, &resolver, TIMEOUT).await.unwrap();

    assert_eq!(substituted, 0);
    assert_eq!(document["proxies"][0]["server"].as_str().unwrap(), "other.net");
    // No resolution was attempted for the unmatched hostname
    assert_eq!(served.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_policy_fails_before_any_proxy() {
    let mut document = doc(
        "dns:\n  enable: true\nproxies:\n  - name: node-a\n    server: node.example.com\n",
    );

    let resolver = fresh_resolver();
    let err = apply_policy(&mut document, &resolver, TIMEOUT).await.unwrap_err();

    assert!(matches!(err, PolicyError::MissingPolicy));
    assert_eq!(
        document["proxies"][0]["server"].as_str().unwrap(),
        "node.example.com"
    );
}

#[tokio::test]
async fn first_match_wins_over_later_entries() {
    let (port_a, served_a) = spawn_stub_dns(vec![Ipv4Addr::new(10, 1, 0, 1)]).await;
    let (port_b, served_b) = spawn_stub_dns(vec![Ipv4Addr::new(10, 2, 0, 2)]).await;

    // The broad wildcard comes first and shadows the exact entry
    let mut document = doc(&format!(
        "dns:\n  nameserver-policy:\n    '*.a.com': udp://127.0.0.1:{port_a}\n    'sub.a.com': udp://127.0.0.1:{port_b}\nproxies:\n  - name: node\n    server: sub.a.com\n"
    ));

    let resolver = fresh_resolver();
    apply_policy(&mut document, &resolver, TIMEOUT).await.unwrap();

    assert_eq!(document["proxies"][0]["server"].as_str().unwrap(), "10.1.0.1");
    assert_eq!(served_a.load(Ordering::SeqCst), 1);
    assert_eq!(served_b.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cache_spans_documents_within_a_process() {
    let (port, served) = spawn_stub_dns(vec![Ipv4Addr::new(10, 0, 0, 8)]).await;
    let yaml = format!(
        "dns:\n  nameserver-policy:\n    '+.example.com': udp://127.0.0.1:{port}\nproxies:\n  - name: node-a\n    server: node.example.com\n"
    );

    let resolver = fresh_resolver();

    let mut first = doc(&yaml);
    apply_policy(&mut first, &resolver, TIMEOUT).await.unwrap();

    // A second document with the same (server, domain) pair hits the cache
    let mut second = doc(&yaml);
    apply_policy(&mut second, &resolver, TIMEOUT).await.unwrap();

    assert_eq!(second["proxies"][0]["server"].as_str().unwrap(), "10.0.0.8");
    assert_eq!(served.load(Ordering::SeqCst), 1);
    assert_eq!(resolver.cache().stats().hits(), 1);
}

#[tokio::test]
async fn multiple_proxies_resolve_sequentially_with_shared_cache() {
    let (port, served) = spawn_stub_dns(vec![Ipv4Addr::new(10, 0, 0, 9)]).await;

    // Two proxies on the same hostname: the second is served from cache
    let mut document = doc(&format!(
        "dns:\n  nameserver-policy:\n    '.example.com': udp://127.0.0.1:{port}\nproxies:\n  - name: a\n    server: node.example.com\n  - name: b\n    server: node.example.com\n"
    ));

    let resolver = fresh_resolver();
    let substituted = apply_policy(&mut document, &resolver, TIMEOUT).await.unwrap();

    assert_eq!(substituted, 2);
    assert_eq!(served.load(Ordering::SeqCst), 1);
    assert_eq!(document["proxies"][0]["server"].as_str().unwrap(), "10.0.0.9");
    assert_eq!(document["proxies"][1]["server"].as_str().unwrap(), "10.0.0.9");
}

#[tokio::test]
async fn resolution_failure_aborts_remaining_proxies() {
    let (port, served) = spawn_stub_dns(vec![Ipv4Addr::new(10, 0, 0, 1)]).await;

    // First proxy points at a dead server; second would resolve fine
    let mut document = doc(&format!(
        "dns:\n  nameserver-policy:\n    'dead.example.com': udp://127.0.0.1:1\n    '.example.com': udp://127.0.0.1:{port}\nproxies:\n  - name: a\n    server: dead.example.com\n  - name: b\n    server: live.example.com\n"
    ));

    let resolver = fresh_resolver();
    let err = apply_policy(&mut document, &resolver, Duration::from_millis(300))
        .await
        .unwrap_err();

    assert!(matches!(err, PolicyError::Substitution { .. }));
    assert!(err.is_resolution());
    // The live server was never consulted: the batch aborted
    assert_eq!(served.load(Ordering::SeqCst), 0);
    assert_eq!(
        document["proxies"][1]["server"].as_str().unwrap(),
        "live.example.com"
    );
}
