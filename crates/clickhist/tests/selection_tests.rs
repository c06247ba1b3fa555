//! Selection state machine: cell clicks, point resolution and clearing.

mod common;

use std::sync::Arc;

use chrono::Duration;

use clickhist::{
    BinSampler, CellClick, ClickHistError, GridIndex, JointHistogram, SelectionController,
    SelectionState,
};
use test_utils::fixtures::grid::TINY;
use test_utils::fixtures::{edges, time};

use common::index_pair;

/// TINY grid, x = flat index, y = 0.5.
///
/// Cells on the y = 0 row: (0,0) = {0}, (1,0) = {1..=10}, (2,0) = {11..=21}.
fn controller() -> SelectionController {
    let pair = index_pair(&TINY);
    let hist = JointHistogram::build(&pair.x, &pair.y, &edges::SMALL, &edges::SMALL).unwrap();
    SelectionController::new(Arc::new(pair), Arc::new(hist), BinSampler::new(1000))
}

#[test]
fn test_open_cell() {
    let mut ctl = controller();
    assert_eq!(ctl.state(), &SelectionState::Idle);

    let outcome = ctl.click_cell(2, 0).unwrap();
    assert_eq!(outcome, CellClick::Opened { count: 11, shown: 11 });
    assert_eq!(ctl.state().name(), "cell_open");
    assert_eq!(ctl.sample().len(), 11);
    assert_eq!(ctl.open_cell().map(|c| (c.ix, c.iy)), Some((2, 0)));
}

#[test]
fn test_empty_cell_is_noop_from_every_state() {
    let mut ctl = controller();
    assert_eq!(ctl.click_cell(0, 2).unwrap(), CellClick::Ignored);
    assert_eq!(ctl.state(), &SelectionState::Idle);

    ctl.click_cell(1, 0).unwrap();
    let before = ctl.state().clone();
    assert_eq!(ctl.click_cell(1, 1).unwrap(), CellClick::Ignored);
    assert_eq!(ctl.state(), &before);

    ctl.click_point(4).unwrap();
    let before = ctl.state().clone();
    assert_eq!(ctl.click_cell(2, 2).unwrap(), CellClick::Ignored);
    assert_eq!(ctl.state(), &before);
}

#[test]
fn test_out_of_range_cell_rejected() {
    let mut ctl = controller();
    let err = ctl.click_cell(3, 0).unwrap_err();
    assert!(matches!(err, ClickHistError::InvalidSelection(_)));
    assert_eq!(ctl.state(), &SelectionState::Idle);
}

#[test]
fn test_point_resolves_to_exact_coordinates() {
    let mut ctl = controller();
    ctl.click_cell(2, 0).unwrap();

    // flat 17 on a [2, 3, 4] grid: time 1, lat 1, lon 1
    let resolved = ctl.click_point(17).unwrap();
    assert_eq!(resolved.cell, (2, 0));
    assert_eq!(resolved.point.index, 17);
    assert_eq!(resolved.point.x, 17.0);
    assert_eq!(resolved.location.index, GridIndex::new(1, 1, 1));
    assert_eq!(resolved.location.lat, 0.0);
    assert_eq!(resolved.location.lon, 110.0);
    assert_eq!(resolved.location.datetime, time::epoch() + Duration::hours(3));

    assert_eq!(ctl.state().name(), "point_selected");
    assert_eq!(ctl.selected_point().map(|p| p.index), Some(17));
    assert_eq!(ctl.resolved_selection(), Some(resolved));
}

#[test]
fn test_point_outside_sample_rejected() {
    let mut ctl = controller();
    ctl.click_cell(1, 0).unwrap();

    // 17 belongs to (2, 0), not the open cell
    let err = ctl.click_point(17).unwrap_err();
    assert!(matches!(err, ClickHistError::InvalidSelection(_)));
    assert_eq!(ctl.state().name(), "cell_open");
}

#[test]
fn test_point_without_open_cell_rejected() {
    let mut ctl = controller();
    assert!(matches!(
        ctl.click_point(0),
        Err(ClickHistError::InvalidSelection(_))
    ));
}

#[test]
fn test_reselect_point_in_same_cell() {
    let mut ctl = controller();
    ctl.click_cell(1, 0).unwrap();
    ctl.click_point(2).unwrap();
    let resolved = ctl.click_point(9).unwrap();
    assert_eq!(resolved.location.index, GridIndex::new(0, 2, 1));
    assert_eq!(ctl.selected_point().map(|p| p.index), Some(9));
    assert_eq!(ctl.sample().len(), 10);
}

#[test]
fn test_switching_cells_drops_selection() {
    let mut ctl = controller();
    ctl.click_cell(1, 0).unwrap();
    ctl.click_point(5).unwrap();

    ctl.click_cell(0, 0).unwrap();
    assert_eq!(ctl.state().name(), "cell_open");
    assert!(ctl.selected_point().is_none());
    assert_eq!(ctl.sample().len(), 1);
}

#[test]
fn test_clear_returns_to_idle() {
    let mut ctl = controller();
    ctl.click_cell(1, 0).unwrap();
    ctl.click_point(5).unwrap();
    ctl.clear();
    assert_eq!(ctl.state(), &SelectionState::Idle);
    assert!(ctl.sample().is_empty());
    assert!(ctl.open_cell().is_none());
    assert!(ctl.resolved_selection().is_none());
}
