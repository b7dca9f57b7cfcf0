//! Transfer engine paths that need no external tool.

mod common;

use common::{MediaReply, ScriptedTransport};
use lensloader::downloader::{ProgressEvent, TransferConfig, TransferEngine};
use lensloader::extractor::{Quality, RenditionDescriptor};
use lensloader::LensError;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

const MEDIA_URL: &str = "https://cdn.example/video.mp4";

fn flat_rendition(url: &str) -> RenditionDescriptor {
    RenditionDescriptor {
        quality: Quality::Hd,
        width: 1280,
        height: 720,
        format: "mp4".to_string(),
        play_url: url.to_string(),
        size: None,
    }
}

fn drain(mut rx: mpsc::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn direct_transfer_writes_file_and_reports_percent() {
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("clip.mp4");
    let chunks = vec![vec![1u8; 250], vec![2u8; 250], vec![3u8; 500]];
    let transport = ScriptedTransport::new()
        .media(MEDIA_URL, MediaReply::complete(chunks))
        .shared();
    let engine = TransferEngine::new(transport, TransferConfig::default());
    let (tx, rx) = mpsc::channel(64);

    let path = engine
        .transfer(&flat_rendition(MEDIA_URL), &destination, Some(tx))
        .await
        .unwrap();

    assert_eq!(path, destination);
    let written = std::fs::read(&destination).unwrap();
    assert_eq!(written.len(), 1000);
    assert_eq!(&written[..250], &[1u8; 250][..]);
    assert!(!temp_dir.path().join("clip.mp4.part").exists());

    let events = drain(rx);
    assert_eq!(
        events,
        vec![
            ProgressEvent::Percent(25.0),
            ProgressEvent::Percent(50.0),
            ProgressEvent::Percent(100.0),
        ]
    );
}

#[tokio::test]
async fn unknown_length_transfers_without_progress() {
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("clip.mp4");
    let mut reply = MediaReply::complete(vec![b"abc".to_vec(), b"def".to_vec()]);
    reply.content_length = None;
    let transport = ScriptedTransport::new().media(MEDIA_URL, reply).shared();
    let engine = TransferEngine::new(transport, TransferConfig::default());
    let (tx, rx) = mpsc::channel(8);

    engine
        .transfer(&flat_rendition(MEDIA_URL), &destination, Some(tx))
        .await
        .unwrap();

    assert_eq!(std::fs::read(&destination).unwrap(), b"abcdef");
    assert!(drain(rx).is_empty());
}

#[tokio::test]
async fn interrupted_transfer_keeps_partial_file() {
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("clip.mp4");
    let mut reply = MediaReply::complete(vec![vec![7u8; 100], vec![8u8; 100], vec![9u8; 100]]);
    reply.fail_after = Some(1);
    let transport = ScriptedTransport::new().media(MEDIA_URL, reply).shared();
    let engine = TransferEngine::new(transport, TransferConfig::default());

    let err = engine
        .transfer(&flat_rendition(MEDIA_URL), &destination, None)
        .await
        .unwrap_err();

    assert!(matches!(err, LensError::NetworkFailure(_)));
    assert!(!destination.exists());
    let part = temp_dir.path().join("clip.mp4.part");
    assert_eq!(std::fs::read(part).unwrap().len(), 100);
}

#[tokio::test]
async fn refused_stream_creates_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("clip.mp4");
    let transport = ScriptedTransport::new().shared();
    let engine = TransferEngine::new(transport.clone(), TransferConfig::default());

    let err = engine
        .transfer(&flat_rendition(MEDIA_URL), &destination, None)
        .await
        .unwrap_err();

    assert!(matches!(err, LensError::NetworkFailure(_)));
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    assert_eq!(transport.calls(), vec![MEDIA_URL.to_string()]);
}

#[tokio::test]
async fn missing_muxer_fails_before_spawning() {
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("clip.mp4");
    let missing = temp_dir.path().join("no-such-remuxer");
    let transport = ScriptedTransport::new().shared();
    let config = TransferConfig {
        muxer_program: missing.display().to_string(),
        muxer_deadline: Some(Duration::from_secs(5)),
        ..TransferConfig::default()
    };
    let engine = TransferEngine::new(transport.clone(), config);
    let rendition = RenditionDescriptor {
        format: "m3u8".to_string(),
        play_url: "https://cdn.example/x.m3u8".to_string(),
        ..flat_rendition(MEDIA_URL)
    };

    let err = engine.transfer(&rendition, &destination, None).await.unwrap_err();

    assert!(matches!(err, LensError::ExternalToolMissing(ref program) if program.contains("no-such-remuxer")));
    assert!(!destination.exists());
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn idle_progress_receiver_does_not_stall_transfer() {
    let temp_dir = TempDir::new().unwrap();
    let destination = temp_dir.path().join("clip.mp4");
    let chunks = (0..100u8).map(|i| vec![i; 10]).collect();
    let transport = ScriptedTransport::new()
        .media(MEDIA_URL, MediaReply::complete(chunks))
        .shared();
    let engine = TransferEngine::new(transport, TransferConfig::default());
    let (tx, rx) = mpsc::channel(8);

    let rendition = flat_rendition(MEDIA_URL);
    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        engine.transfer(&rendition, &destination, Some(tx)),
    )
    .await
    .expect("transfer finished while the receiver sat idle");

    assert_eq!(outcome.unwrap(), destination);
    assert_eq!(std::fs::read(&destination).unwrap().len(), 1000);

    let events = drain(rx);
    assert_eq!(events.len(), 8);
    let values: Vec<f64> = events.iter().map(|e| e.value()).collect();
    assert!(values.windows(2).all(|w| w[0] < w[1]));
}
