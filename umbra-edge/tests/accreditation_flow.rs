//! End-to-end report flows against in-memory malls

mod common;

use std::time::Duration;

use common::{Harness, date, next_terminal_report, snapshot, text_lines};
use shared::error::ErrorCode;
use shared::models::{ArtifactKind, DeliveryRecord, HourRange};
use umbra_edge::artifact::WriteOutcome;
use umbra_edge::transport::MemoryTransports;

const DAILY_REMOTE: &str = "AYALA/2024/existing/EOD001/C1230501.txt";
const SHEET_REMOTE: &str = "AYALA/2024/new requirements/EODCMPC123050124.csv";

#[tokio::test]
async fn test_generation_without_snapshot_is_data_not_ready() {
    let h = Harness::new(1);

    let err = h.state.service.generate_ayala(date()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::DataNotReady);

    let err = h.state.service.generate_robinson(date()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::DataNotReady);

    // Nothing written, nothing queued, no batch consumed
    assert!(!h.reports_root().join("AYALA").exists());
    assert!(h.state.storage.unsent_deliveries().unwrap().is_empty());
    assert!(h.state.sequence.batch_log("STORE01", date()).unwrap().is_none());
}

#[tokio::test]
async fn test_hour_ranges_follow_on_from_previous_hour() {
    let h = Harness::new(1);
    let seq = &h.state.sequence;

    let nine = seq.allocate_hour_range("STORE01", date(), 9, 5).unwrap();
    let ten = seq.allocate_hour_range("STORE01", date(), 10, 3).unwrap();
    assert_eq!((nine.start, nine.end), (1, 5));
    assert_eq!((ten.start, ten.end), (6, 8));

    // Re-asking returns the stored range unchanged
    let again = seq.allocate_hour_range("STORE01", date(), 9, 40).unwrap();
    assert_eq!(again, nine);
}

#[tokio::test]
async fn test_ayala_generation_numbers_hours_and_syncs_all_files() {
    let h = Harness::new(1);
    h.state.service.ingest_snapshot(&snapshot(1)).unwrap();

    let report = h.state.service.generate_ayala(date()).await.unwrap();
    assert!(report.remote_synced);
    assert_eq!(report.queued, 0);
    assert_eq!(report.files.len(), 4);
    assert!(report.files.iter().all(|f| f.local == WriteOutcome::Created));

    // Hour ranges allocated from the snapshot buckets
    let ranges = h.state.sequence.hour_ranges("STORE01", date()).unwrap();
    assert_eq!(
        ranges,
        vec![
            HourRange { date: date(), hour: 9, start: 1, end: 2 },
            HourRange { date: date(), hour: 10, start: 3, end: 3 },
        ]
    );

    let daily = h.transports.ayala.file(DAILY_REMOTE).unwrap();
    let lines = text_lines(&daily);
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("C123,05/01/2024,"));
    assert!(lines[1].ends_with(",001"));

    let sent = h.state.storage.list_deliveries(Some(true), 0, 100).unwrap();
    assert_eq!(sent.len(), 4);
    assert!(h.state.storage.unsent_deliveries().unwrap().is_empty());
}

#[tokio::test]
async fn test_repeated_generation_writes_each_line_once() {
    let h = Harness::new(1);
    h.state.service.ingest_snapshot(&snapshot(1)).unwrap();

    h.state.service.generate_ayala(date()).await.unwrap();
    let second = h.state.service.generate_ayala(date()).await.unwrap();

    let daily = second
        .files
        .iter()
        .find(|f| f.kind == ArtifactKind::AyalaDaily)
        .unwrap();
    assert_eq!(daily.local, WriteOutcome::Skipped);
    assert_eq!(daily.remote, Some(WriteOutcome::Skipped));

    let local = std::fs::read(h.reports_root().join(DAILY_REMOTE)).unwrap();
    assert_eq!(text_lines(&local).len(), 2);
    let remote = h.transports.ayala.file(DAILY_REMOTE).unwrap();
    assert_eq!(text_lines(&remote).len(), 2);

    // 24 hourly rows plus header, still once
    let hourly = h
        .transports
        .ayala
        .file("AYALA/2024/existing/EOD001/C1230501H.txt")
        .unwrap();
    assert_eq!(text_lines(&hourly).len(), 25);
}

#[tokio::test]
async fn test_robinson_batch_advances_even_when_remote_is_down() {
    let h = Harness::new(1);
    h.state.service.ingest_snapshot(&snapshot(1)).unwrap();
    h.transports.robinson.set_unreachable(true);

    let report = h.state.service.generate_robinson(date()).await.unwrap();
    assert_eq!(report.batch_number, Some(1));
    assert!(!report.remote_synced);
    assert_eq!(report.queued, 1);

    let log = h.state.sequence.batch_log("STORE01", date()).unwrap().unwrap();
    assert_eq!(log.batch_number, 2);
    assert!(h.reports_root().join("ROBINSON/2024/23450501.011.txt").exists());

    let unsent = h.state.storage.unsent_deliveries().unwrap();
    assert_eq!(unsent.len(), 1);
    assert_eq!(unsent[0].file_name, "ROBINSON/2024/23450501.011.txt");
    assert!(unsent[0].error.as_deref().unwrap_or_default().contains("ECANCELED"));

    // Server comes back: the queued batch lands without regenerating
    let mut rx = h.state.coordinator.subscribe();
    h.transports.robinson.set_unreachable(false);
    h.state.coordinator.trigger();
    let report = next_terminal_report(&mut rx).await;
    assert!(report.full_sent || report.empty);

    tokio::time::timeout(Duration::from_secs(5), async {
        while !h.state.storage.unsent_deliveries().unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    let remote = h.transports.robinson.file("23450501.011").unwrap();
    assert_eq!(String::from_utf8(remote).unwrap().lines().count(), 30);

    h.state.coordinator.shutdown().await;
}

#[tokio::test]
async fn test_robinson_resend_rules() {
    let h = Harness::new(1);
    h.state.service.ingest_snapshot(&snapshot(1)).unwrap();

    h.state.service.generate_robinson(date()).await.unwrap();
    h.state.service.generate_robinson(date()).await.unwrap();
    assert_eq!(
        h.state.sequence.batch_log("STORE01", date()).unwrap().unwrap().batch_number,
        3
    );

    // Older batch: file regenerated, counter untouched
    let resent = h.state.service.resend_robinson(date(), Some(1)).await.unwrap();
    assert_eq!(resent.batch_number, Some(1));
    assert!(resent.remote_synced);
    assert_eq!(
        h.state.sequence.batch_log("STORE01", date()).unwrap().unwrap().batch_number,
        3
    );

    let err = h
        .state
        .service
        .resend_robinson(date(), Some(9))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BatchNotFound);

    let err = h
        .state
        .service
        .resend_robinson(date(), Some(0))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BatchNotFound);
}

#[tokio::test]
async fn test_failed_delivery_is_resent_with_full_sent() {
    let h = Harness::new(1);
    h.state.service.ingest_snapshot(&snapshot(1)).unwrap();
    h.transports.ayala.fail_next_connects(1);
    let mut rx = h.state.coordinator.subscribe();

    let report = h.state.service.generate_ayala(date()).await.unwrap();
    assert!(!report.remote_synced);
    assert_eq!(report.queued, 4);
    assert!(report.files.iter().all(|f| f.remote.is_none() && f.error.is_some()));

    // Generation queued the files and kicked the coordinator
    let drained = next_terminal_report(&mut rx).await;
    assert!(drained.resent);
    assert!(drained.full_sent);

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.state.coordinator.is_active() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    assert!(h.state.storage.unsent_deliveries().unwrap().is_empty());
    let all = h.state.storage.list_deliveries(None, 0, 100).unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.iter().all(|r| r.sent));
    assert!(h.transports.ayala.file(DAILY_REMOTE).is_some());
    assert!(h.transports.ayala.file(SHEET_REMOTE).is_some());
}

#[tokio::test]
async fn test_two_terminals_share_the_new_requirements_sheet() {
    let transports = MemoryTransports::default();
    let first = Harness::with_transports(1, transports.clone());
    let second = Harness::with_transports(2, transports.clone());

    first.state.service.ingest_snapshot(&snapshot(1)).unwrap();
    second.state.service.ingest_snapshot(&snapshot(2)).unwrap();

    first.state.service.generate_ayala(date()).await.unwrap();
    second.state.service.generate_ayala(date()).await.unwrap();
    // Terminal 1 again: its column is already there
    first.state.service.generate_ayala(date()).await.unwrap();

    let sheet = transports.ayala.file(SHEET_REMOTE).unwrap();
    let lines = text_lines(&sheet);
    assert_eq!(lines[0], "TER_NO,001,002");
    assert!(lines.iter().all(|l| l.split(',').count() == 3));

    // Per-terminal folders stay separate
    assert!(transports.ayala.file(DAILY_REMOTE).is_some());
    assert!(
        transports
            .ayala
            .file("AYALA/2024/existing/EOD002/C1230501.txt")
            .is_some()
    );
}

#[tokio::test]
async fn test_successful_generation_drains_older_unsent_records() {
    let h = Harness::new(1);
    h.state.service.ingest_snapshot(&snapshot(1)).unwrap();
    h.state.service.generate_ayala(date()).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), async {
        while h.state.coordinator.is_active() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    // Left behind by a drain that gave up earlier
    h.state
        .storage
        .append_delivery(DeliveryRecord {
            id: 0,
            file_name: DAILY_REMOTE.into(),
            kind: ArtifactKind::AyalaDaily,
            sent: false,
            transaction_date: date(),
            store_code: "STORE01".into(),
            terminal: 1,
            attempted_at: shared::util::now_millis(),
            error: Some("ECANCELED".into()),
        })
        .unwrap();
    assert_eq!(h.state.storage.unsent_deliveries().unwrap().len(), 1);

    let mut rx = h.state.coordinator.subscribe();
    let report = h.state.service.generate_robinson(date()).await.unwrap();
    assert!(report.remote_synced);
    assert_eq!(report.queued, 0);

    let drained = next_terminal_report(&mut rx).await;
    assert!(drained.full_sent);
    tokio::time::timeout(Duration::from_secs(5), async {
        while !h.state.storage.unsent_deliveries().unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    // The remote row is still written once
    let daily = h.transports.ayala.file(DAILY_REMOTE).unwrap();
    assert_eq!(text_lines(&daily).len(), 2);
}
