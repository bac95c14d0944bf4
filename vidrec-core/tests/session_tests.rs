//! Integration tests for the recording session

mod mocks;

use mocks::{MockBackend, MockDevices, drain_events, fragment, mock_runtime};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use vidrec_core::config::{ReacquireMode, SessionConfig};
use vidrec_core::encoding::MimeType;
use vidrec_core::error::{ErrorKind, RecorderError};
use vidrec_core::event::SessionEvent;
use vidrec_core::runtime::SyntheticRuntime;
use vidrec_core::session::RecordingSession;
use vidrec_core::types::RecordingStatus;

fn session_with(devices: &std::sync::Arc<MockDevices>, backend: &std::sync::Arc<MockBackend>) -> RecordingSession {
    RecordingSession::new(mock_runtime(devices, backend), SessionConfig::default()).unwrap()
}

#[tokio::test]
async fn test_empty_fragments_never_reach_the_artifact() {
    let devices = MockDevices::new();
    let backend = MockBackend::with_script(&[0, 10, 20]);
    let mut session = session_with(&devices, &backend);

    assert_ok!(session.mount().await);
    assert_ok!(session.start().await);
    assert_eq!(session.status(), RecordingStatus::Started);

    let artifact = assert_ok!(session.stop().await).unwrap();
    assert_eq!(artifact.size, 30);
    assert_eq!(artifact.chunk_count, 2);

    let blob = session.artifact_blob().unwrap();
    let mut expected = fragment(2, 10).to_vec();
    expected.extend_from_slice(&fragment(3, 20));
    assert_eq!(blob.data().as_ref(), expected.as_slice());
}

#[tokio::test]
async fn test_all_empty_fragments_yield_empty_artifact() {
    let devices = MockDevices::new();
    let backend = MockBackend::with_script(&[0, 0, 0]);
    let mut session = session_with(&devices, &backend);

    session.mount().await.unwrap();
    session.start().await.unwrap();
    let artifact = session.stop().await.unwrap().unwrap();

    assert_eq!(artifact.size, 0);
    assert_eq!(artifact.chunk_count, 0);
    assert!(session.artifact_blob().unwrap().is_empty());
}

#[tokio::test]
async fn test_flush_fragment_is_included() {
    let devices = MockDevices::new();
    let backend = MockBackend::with_script(&[4]);
    backend.set_flush(2);
    let mut session = session_with(&devices, &backend);

    session.mount().await.unwrap();
    session.start().await.unwrap();
    let artifact = session.stop().await.unwrap().unwrap();

    assert_eq!(artifact.size, 6);
    assert_eq!(artifact.chunk_count, 2);
}

#[tokio::test]
async fn test_start_without_stream_never_creates_engine() {
    let devices = MockDevices::denying();
    let backend = MockBackend::new();
    let mut session = session_with(&devices, &backend);

    let err = assert_err!(session.start().await);
    assert!(matches!(err, RecorderError::NoLiveStream));
    assert_eq!(backend.engines_created(), 0);
    assert_eq!(session.status(), RecordingStatus::Inactive);
    assert!(!session.is_recording());
}

#[tokio::test]
async fn test_stop_then_start_uses_fresh_buffer() {
    let devices = MockDevices::new();
    let backend = MockBackend::with_script(&[5, 5]);
    let mut session = session_with(&devices, &backend);
    session.mount().await.unwrap();

    session.start().await.unwrap();
    let first = session.stop().await.unwrap().unwrap();
    assert_eq!(first.size, 10);

    session.start().await.unwrap();
    // Starting clears the shown artifact and releases its reference
    assert!(session.artifact().is_none());
    assert!(session.registry().resolve(&first.url).is_none());

    let second = session.stop().await.unwrap().unwrap();
    assert_eq!(second.size, 10);
    assert_ne!(first.url, second.url);
    assert_eq!(session.registry().len(), 1);
    assert_eq!(session.stats().recordings_completed, 2);
}

#[tokio::test]
async fn test_idle_stop_keeps_artifact() {
    let devices = MockDevices::new();
    let backend = MockBackend::with_script(&[3]);
    let mut session = session_with(&devices, &backend);
    session.mount().await.unwrap();

    session.start().await.unwrap();
    let artifact = session.stop().await.unwrap().unwrap();
    let mut events = session.subscribe();

    // Stop with nothing running keeps the artifact
    assert!(session.stop().await.unwrap().is_none());
    assert_eq!(session.artifact(), Some(&artifact));
    assert!(session.registry().resolve(&artifact.url).is_some());
    assert!(drain_events(&mut events).is_empty());
}

#[tokio::test]
async fn test_reset_without_artifact_reacquires() {
    let devices = MockDevices::new();
    let backend = MockBackend::new();
    let mut session = session_with(&devices, &backend);

    session.mount().await.unwrap();
    let first_stream = session.stats().live_stream.unwrap();
    let mut events = session.subscribe();

    session.reset().await.unwrap();
    assert!(session.artifact().is_none());
    assert_eq!(session.stats().acquisitions, 2);
    assert_ne!(session.stats().live_stream.unwrap(), first_stream);

    let events = drain_events(&mut events);
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::ArtifactCleared)));
    assert!(events.iter().any(|e| matches!(e, SessionEvent::StreamAcquired { .. })));
}

#[tokio::test]
async fn test_reset_clears_artifact() {
    let devices = MockDevices::new();
    let backend = MockBackend::new();
    let mut session = session_with(&devices, &backend);

    session.mount().await.unwrap();
    session.start().await.unwrap();
    let artifact = session.stop().await.unwrap().unwrap();
    let mut events = session.subscribe();

    session.reset().await.unwrap();
    assert!(session.artifact().is_none());
    assert!(session.registry().is_empty());
    assert!(session.registry().resolve(&artifact.url).is_none());
    assert!(session.has_live_stream());

    let events = drain_events(&mut events);
    assert!(matches!(events[0], SessionEvent::ArtifactCleared));
}

#[tokio::test]
async fn test_permission_rejected() {
    let devices = MockDevices::denying();
    let backend = MockBackend::new();
    let mut session = session_with(&devices, &backend);
    let mut events = session.subscribe();

    let err = assert_err!(session.mount().await);
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    assert!(!session.permission_granted());
    assert!(!session.has_live_stream());
    assert!(session.preview().is_none());
    assert_eq!(session.status(), RecordingStatus::Inactive);

    // The probe and the acquisition are both reported
    let errors: Vec<_> = drain_events(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            SessionEvent::Error { kind, message } => Some((kind, message)),
            _ => None,
        })
        .collect();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|(kind, message)| {
        *kind == ErrorKind::PermissionDenied && message == "Permission denied"
    }));
}

#[tokio::test]
async fn test_grant_after_denial() {
    let devices = MockDevices::denying();
    let backend = MockBackend::new();
    let mut session = session_with(&devices, &backend);

    assert!(session.mount().await.is_err());
    assert!(!session.permission_granted());

    devices.set_denied(false);
    let mut events = session.subscribe();
    session.request_permissions().await.unwrap();
    assert!(session.permission_granted());

    let events = drain_events(&mut events);
    assert!(matches!(events[0], SessionEvent::PermissionChanged { granted: true }));

    // The probe stream is discarded, not held
    assert!(!session.has_live_stream());
}

#[tokio::test]
async fn test_permission_never_revoked_by_later_failure() {
    let devices = MockDevices::new();
    let backend = MockBackend::new();
    let mut session = session_with(&devices, &backend);

    session.mount().await.unwrap();
    assert!(session.permission_granted());

    devices.set_denied(true);
    assert!(session.request_permissions().await.is_err());
    assert!(session.permission_granted());
}

#[tokio::test]
async fn test_failed_reacquisition_keeps_previous_stream() {
    let devices = MockDevices::new();
    let backend = MockBackend::new();
    let mut session = session_with(&devices, &backend);

    session.mount().await.unwrap();
    let preview = session.preview().unwrap();

    devices.set_camera_busy(true);
    let err = session.reset().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeviceUnavailable);
    assert_eq!(err.user_message(), "Could not start video source");
    assert_eq!(session.preview(), Some(preview));

    // Recording proceeds on the stream already held
    session.start().await.unwrap();
    assert_eq!(backend.engines_created(), 1);
    session.stop().await.unwrap();
}

#[tokio::test]
async fn test_sequenced_start_records_fresh_stream() {
    let devices = MockDevices::new();
    let backend = MockBackend::new();
    let mut session = session_with(&devices, &backend);

    session.mount().await.unwrap();
    let mounted = session.stats().live_stream.unwrap();

    session.start().await.unwrap();
    let current = session.stats().live_stream.unwrap();
    assert_ne!(mounted, current);
    assert_eq!(backend.last_stream(), Some(current));
    session.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_start_records_held_stream() {
    let devices = MockDevices::new();
    let backend = MockBackend::new();
    let config = SessionConfig::default().with_reacquire(ReacquireMode::Concurrent);
    let mut session = RecordingSession::new(mock_runtime(&devices, &backend), config).unwrap();

    session.mount().await.unwrap();
    let mounted = session.stats().live_stream.unwrap();

    devices.set_latency(Duration::from_millis(50));
    session.start().await.unwrap();
    assert_eq!(backend.last_stream(), Some(mounted.clone()));

    session.wait_for_acquisitions().await;
    let current = session.stats().live_stream.unwrap();
    assert_ne!(mounted, current);

    let artifact = session.stop().await.unwrap().unwrap();
    assert_eq!(artifact.size, 30);
}

#[tokio::test]
async fn test_start_while_recording_rejected() {
    let devices = MockDevices::new();
    let backend = MockBackend::new();
    let mut session = session_with(&devices, &backend);

    session.mount().await.unwrap();
    session.start().await.unwrap();
    let err = session.start().await.unwrap_err();
    assert!(matches!(err, RecorderError::SessionAlreadyRunning));
    assert_eq!(backend.engines_created(), 1);
    assert_eq!(session.status(), RecordingStatus::Started);
}

#[tokio::test]
async fn test_stop_when_idle_is_noop() {
    let devices = MockDevices::new();
    let backend = MockBackend::new();
    let mut session = session_with(&devices, &backend);

    assert!(session.stop().await.unwrap().is_none());
    assert_eq!(session.status(), RecordingStatus::Inactive);
    assert!(session.artifact().is_none());
}

#[tokio::test]
async fn test_status_events_in_order() {
    let devices = MockDevices::new();
    let backend = MockBackend::new();
    let mut session = session_with(&devices, &backend);
    session.mount().await.unwrap();

    let mut events = session.subscribe();
    session.start().await.unwrap();
    session.stop().await.unwrap();

    let events = drain_events(&mut events);
    let statuses: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::StatusChanged { status } => Some(*status),
            _ => None,
        })
        .collect();
    assert_eq!(statuses, vec![RecordingStatus::Started, RecordingStatus::Inactive]);
    assert!(matches!(events.last(), Some(SessionEvent::ArtifactReady { .. })));
}

#[tokio::test]
async fn test_negotiated_encoding_tags_artifact() {
    let devices = MockDevices::new();
    let backend = MockBackend::new();
    backend.set_supported(&["video/webm;codecs=vp9", "video/mp4"]);
    let mut session = session_with(&devices, &backend);

    session.mount().await.unwrap();
    session.start().await.unwrap();
    let artifact = session.stop().await.unwrap().unwrap();

    let expected = MimeType::new("video/webm;codecs=vp9");
    assert_eq!(backend.last_mime(), Some(expected.clone()));
    assert_eq!(artifact.mime_type, expected);
    assert_eq!(artifact.file_name(), "recording.webm");
}

#[tokio::test]
async fn test_no_type_query_without_fallback_uses_engine_default() {
    let devices = MockDevices::new();
    let backend = MockBackend::new();
    backend.set_type_query(false);
    let config = SessionConfig::default().with_fallback(None);
    let mut session = RecordingSession::new(mock_runtime(&devices, &backend), config).unwrap();

    session.mount().await.unwrap();
    session.start().await.unwrap();
    assert_eq!(backend.last_mime(), Some(MimeType::empty()));
    session.stop().await.unwrap();
}

#[tokio::test]
async fn test_unsupported_runtime_reported() {
    let devices = MockDevices::new();
    let backend = MockBackend::new();
    backend.set_available(false);
    let mut session = session_with(&devices, &backend);
    let mut events = session.subscribe();

    // The failed probe does not stop the acquisition
    session.mount().await.unwrap();
    assert!(!session.permission_granted());
    assert_eq!(devices.request_count(), 2);

    let events = drain_events(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Error { kind: ErrorKind::UnsupportedRuntime, message }
            if message == "Capture is not supported by this runtime."
    )));

    let err = session.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedRuntime);
    assert_eq!(session.status(), RecordingStatus::Inactive);
}

#[tokio::test]
async fn test_engine_creation_failure_returns_to_inactive() {
    let devices = MockDevices::new();
    let backend = MockBackend::new();
    backend.set_fail_create(true);
    let mut session = session_with(&devices, &backend);

    session.mount().await.unwrap();
    let err = session.start().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Engine);
    assert_eq!(session.status(), RecordingStatus::Inactive);
    assert!(!session.is_recording());
}

#[tokio::test]
async fn test_save_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let devices = MockDevices::new();
    let backend = MockBackend::with_script(&[8]);
    let config = SessionConfig::default().with_download_dir(dir.path());
    let mut session = RecordingSession::new(mock_runtime(&devices, &backend), config).unwrap();

    let err = session.save_artifact(None).unwrap_err();
    assert!(matches!(err, RecorderError::NoArtifact));

    session.mount().await.unwrap();
    session.start().await.unwrap();
    session.stop().await.unwrap();

    let path = session.save_artifact(None).unwrap();
    assert_eq!(path, dir.path().join("recording.webm"));
    assert_eq!(std::fs::read(&path).unwrap(), fragment(1, 8).to_vec());

    let custom = dir.path().join("takes").join("one.webm");
    assert_eq!(session.save_artifact(Some(custom.clone())).unwrap(), custom);
    assert!(custom.exists());
}

#[tokio::test(start_paused = true)]
async fn test_synthetic_runtime_end_to_end() {
    let config = SessionConfig::default();
    let mut session = RecordingSession::new(SyntheticRuntime::default().into_runtime(), config).unwrap();

    session.mount().await.unwrap();
    assert!(session.permission_granted());
    assert_eq!(session.preview().unwrap().tracks.len(), 1);

    session.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(1000)).await;
    let artifact = session.stop().await.unwrap().unwrap();

    assert_eq!(
        artifact.mime_type,
        MimeType::new("video/webm;codecs=\"vp8,opus\"")
    );
    assert!(artifact.chunk_count >= 4);
    let blob = session.artifact_blob().unwrap();
    assert_eq!(&blob.data()[..4], &[0x1A, 0x45, 0xDF, 0xA3]);
}
