//! Case recording through the selection controller.

mod common;

use std::sync::Arc;
use std::time::Duration;

use clickhist::{
    BinSampler, BoundingBox, CaseRecorder, ClickHistError, DataSource, InMemorySource,
    JointHistogram, SelectionController, WindowConfig,
};
use test_utils::fixtures::grid::{CENTRAL_PACIFIC, TINY};
use test_utils::fixtures::{edges, regions, time};

use common::{index_pair, metadata, precip_pair, MockCaseLog, MockEmitter};

/// Controller with flat 17 selected: 1998-01-01T15:00Z, lat 0, lon 110.
fn selected() -> SelectionController {
    let pair = index_pair(&TINY);
    let hist = JointHistogram::build(&pair.x, &pair.y, &edges::SMALL, &edges::SMALL).unwrap();
    let mut ctl = SelectionController::new(Arc::new(pair), Arc::new(hist), BinSampler::new(1000));
    ctl.click_cell(2, 0).unwrap();
    ctl.click_point(17).unwrap();
    ctl
}

fn recorder(emitter: Arc<MockEmitter>, log: Arc<MockCaseLog>) -> CaseRecorder {
    CaseRecorder::new(emitter, log, metadata("Precip_MERRA"), metadata("Precip_TRMM"))
}

#[tokio::test]
async fn test_confirm_records_case() {
    let ctl = selected();
    let emitter = MockEmitter::new();
    let log = MockCaseLog::new();
    let mut rec = recorder(emitter.clone(), log.clone());

    let record = ctl.confirm(&mut rec).await.unwrap();

    assert_eq!(record.case_number, 1);
    assert_eq!(record.center.location.flat, 17);
    assert_eq!(record.window.bbox, BoundingBox::new(100.0, -10.0, 120.0, 10.0));
    let center = time::epoch() + chrono::Duration::hours(3);
    assert_eq!(record.window.time.start, center - chrono::Duration::hours(73));
    assert_eq!(record.window.time.end, center + chrono::Duration::hours(73));
    assert_eq!(record.artifacts.len(), 1);
    assert_eq!(record.session_id, rec.session_log().session_id());

    let requests = emitter.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].x.id, "Precip_MERRA");
    assert_eq!(requests[0].window, record.window);
    assert_eq!(log.entries(), vec![1]);
    assert_eq!(rec.session_log().len(), 1);
    assert_eq!(ctl.state().name(), "point_selected");
}

#[tokio::test]
async fn test_double_confirm_appends_twice() {
    let ctl = selected();
    let log = MockCaseLog::new();
    let mut rec = recorder(MockEmitter::new(), log.clone());

    let first = ctl.confirm(&mut rec).await.unwrap();
    let second = ctl.confirm(&mut rec).await.unwrap();

    assert_eq!(first.case_number, 1);
    assert_eq!(second.case_number, 2);
    assert_eq!(first.center, second.center);
    assert_eq!(first.window, second.window);
    assert_eq!(log.entries(), vec![1, 2]);

    let numbers: Vec<usize> = rec
        .session_log()
        .records()
        .iter()
        .map(|r| r.case_number)
        .collect();
    assert_eq!(numbers, vec![1, 2]);
}

#[tokio::test]
async fn test_numbering_continues_from_first_case() {
    let ctl = selected();
    let emitter = MockEmitter::new();
    let log = MockCaseLog::new();
    let mut rec = recorder(emitter.clone(), log.clone()).with_first_case(8);
    assert_eq!(rec.next_case_number(), 8);

    emitter.set_failing(true);
    assert!(ctl.confirm(&mut rec).await.is_err());
    assert_eq!(rec.next_case_number(), 8);

    emitter.set_failing(false);
    assert_eq!(ctl.confirm(&mut rec).await.unwrap().case_number, 8);
    assert_eq!(ctl.confirm(&mut rec).await.unwrap().case_number, 9);
    assert_eq!(log.entries(), vec![8, 9]);
    let requested: Vec<usize> = emitter.requests().iter().map(|r| r.case_number).collect();
    assert_eq!(requested, vec![8, 9]);
}

#[test]
fn test_first_case_is_at_least_one() {
    let rec = recorder(MockEmitter::new(), MockCaseLog::new()).with_first_case(0);
    assert_eq!(rec.next_case_number(), 1);
}

#[tokio::test]
async fn test_custom_window_config() {
    let ctl = selected();
    let mut rec = recorder(MockEmitter::new(), MockCaseLog::new()).with_window_config(
        WindowConfig {
            lon_offset: 2.5,
            lat_offset: 0.0,
            dt_from_center_secs: 0,
        },
    );

    let record = ctl.confirm(&mut rec).await.unwrap();
    assert_eq!(record.window.bbox, BoundingBox::new(107.5, 0.0, 112.5, 0.0));
    assert_eq!(record.window.time.start, record.window.time.end);
}

#[tokio::test]
async fn test_artifact_failure_leaves_log_unchanged() {
    let ctl = selected();
    let emitter = MockEmitter::new();
    let log = MockCaseLog::new();
    let mut rec = recorder(emitter.clone(), log.clone());

    emitter.set_failing(true);
    let err = ctl.confirm(&mut rec).await.unwrap_err();
    assert!(matches!(err, ClickHistError::ArtifactGenerationFailed(_)));
    assert!(err.is_recoverable());
    assert!(rec.session_log().is_empty());
    assert!(log.entries().is_empty());
    assert_eq!(ctl.state().name(), "point_selected");

    // retry once the emitter recovers
    emitter.set_failing(false);
    let record = ctl.confirm(&mut rec).await.unwrap();
    assert_eq!(record.case_number, 1);
    assert_eq!(rec.session_log().len(), 1);
}

#[tokio::test]
async fn test_log_failure_leaves_log_unchanged() {
    let ctl = selected();
    let log = MockCaseLog::new();
    let mut rec = recorder(MockEmitter::new(), log.clone());

    log.set_failing(true);
    let err = ctl.confirm(&mut rec).await.unwrap_err();
    assert!(matches!(err, ClickHistError::LogAppendFailed(_)));
    assert_eq!(err.error_code(), "LogAppendFailed");
    assert!(rec.session_log().is_empty());
}

#[tokio::test]
async fn test_slow_emitter_times_out() {
    let ctl = selected();
    let mut rec = recorder(MockEmitter::slow(Duration::from_millis(500)), MockCaseLog::new())
        .with_timeout(Duration::from_millis(20));

    let err = ctl.confirm(&mut rec).await.unwrap_err();
    assert!(matches!(err, ClickHistError::ArtifactGenerationFailed(ref msg) if msg.contains("timed out")));
    assert_eq!(err.error_code(), "ArtifactGenerationFailed");
    assert!(err.is_recoverable());
    assert!(rec.session_log().is_empty());
}

#[tokio::test]
async fn test_confirm_requires_selected_point() {
    let pair = index_pair(&TINY);
    let hist = JointHistogram::build(&pair.x, &pair.y, &edges::SMALL, &edges::SMALL).unwrap();
    let mut ctl = SelectionController::new(Arc::new(pair), Arc::new(hist), BinSampler::new(1000));
    let emitter = MockEmitter::new();
    let mut rec = recorder(emitter.clone(), MockCaseLog::new());

    assert!(matches!(
        ctl.confirm(&mut rec).await,
        Err(ClickHistError::InvalidSelection(_))
    ));

    ctl.click_cell(1, 0).unwrap();
    assert!(matches!(
        ctl.confirm(&mut rec).await,
        Err(ClickHistError::InvalidSelection(_))
    ));
    assert!(emitter.requests().is_empty());
}

#[test]
fn test_in_memory_source_subsets_region() {
    let source = InMemorySource::new(precip_pair(&CENTRAL_PACIFIC, 2));
    let bounds = BoundingBox::new(-150.0, -10.0, -140.0, 0.0);

    let pair = tokio_test::block_on(source.fetch_window(&bounds)).unwrap();
    assert_eq!(pair.shape().as_array(), [8, 3, 3]);
    assert_eq!(pair.grid.lon, vec![-150.0, -145.0, -140.0]);
    assert_eq!(pair.grid.lat, vec![-10.0, -5.0, 0.0]);

    let full = tokio_test::block_on(source.fetch_window(&regions::bbox(regions::CENTRAL_PACIFIC)))
        .unwrap();
    assert_eq!(full.shape(), CENTRAL_PACIFIC.shape());

    let inverted = tokio_test::block_on(source.fetch_window(&regions::bbox(regions::INVERTED)));
    assert!(matches!(inverted, Err(ClickHistError::InvalidBbox(_))));
}
