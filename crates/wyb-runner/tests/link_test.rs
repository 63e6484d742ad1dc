//! Watch and phone over a real TCP socket.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wyb_protocol::{DeviceMessage, ProtocolSession, Request};
use wyb_runner::link::{run_watch, serve_phone};
use wyb_runner::{BarcodeEntry, CatalogConfig, Push, WatchConfig};

fn catalog() -> CatalogConfig {
    CatalogConfig {
        barcodes: vec![
            BarcodeEntry {
                name: "Library".to_string(),
                format: "CODE_39".to_string(),
                pattern: "10110".to_string(),
            },
            BarcodeEntry {
                name: "Gym".to_string(),
                format: "QR_CODE".to_string(),
                pattern: "1##1".to_string(),
            },
        ],
        ..Default::default()
    }
}

async fn start_phone(catalog: CatalogConfig) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    tokio::spawn(serve_phone(listener, catalog));
    address
}

#[tokio::test]
async fn test_watch_reads_catalog_over_tcp() {
    let address = start_phone(catalog()).await;
    let config = WatchConfig {
        connect: address,
        render: false,
        once: true,
        ..WatchConfig::default()
    };

    let report = run_watch(config).await.unwrap();

    assert_eq!(report.session.catalog.total_count, 2);
    assert_eq!(report.session.names[1].name, "Gym");
    assert_eq!(report.session.names[1].format, "QR_CODE");
}

#[tokio::test]
async fn test_watch_fetches_image_over_tcp() {
    let address = start_phone(catalog()).await;
    let config = WatchConfig {
        connect: address,
        render: false,
        select: Some(0),
        once: true,
        ..WatchConfig::default()
    };

    let report = run_watch(config).await.unwrap();

    assert_eq!(report.images_completed, 1);
    // List length, 2 names, image announcement, 168 rows, done
    assert_eq!(report.messages, 1 + 2 + 1 + 168 + 1);
}

/// Read until the next phone message arrives.
async fn next_message(stream: &mut TcpStream, framing: &mut ProtocolSession) -> DeviceMessage {
    let mut buf = [0u8; 256];
    loop {
        if let Some(message) = framing.try_decode().unwrap() {
            return message;
        }
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "phone closed the link");
        framing.feed(&buf[..n]);
    }
}

#[tokio::test]
async fn test_phone_pushes_once_watch_is_quiet() {
    let mut catalog = catalog();
    catalog.pushes = vec![Push::Reread, Push::Display { index: 1 }];
    let address = start_phone(catalog).await;

    let mut stream = TcpStream::connect(&address).await.unwrap();
    let mut framing = ProtocolSession::new();

    let request = framing.encode_request(&Request::ListLength { version: 30 }).unwrap();
    stream.write_all(&request).await.unwrap();
    assert_eq!(next_message(&mut stream, &mut framing).await, DeviceMessage::ListLength(2));

    // Nothing more is asked; the queued pushes follow in order
    let pushes = tokio::time::timeout(Duration::from_secs(5), async {
        let first = next_message(&mut stream, &mut framing).await;
        let second = next_message(&mut stream, &mut framing).await;
        (first, second)
    })
    .await
    .expect("pushes should arrive");

    assert_eq!(pushes.0, DeviceMessage::Command(0x21));
    assert_eq!(pushes.1, DeviceMessage::DisplayBarcode { index: 1 });
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let config = WatchConfig {
        connect: address,
        ..WatchConfig::default()
    };
    assert!(run_watch(config).await.is_err());
}
