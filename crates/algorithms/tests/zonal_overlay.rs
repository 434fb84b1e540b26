//! End-to-end zonal overlay: GeoTIFF habitat maps against a zone raster,
//! published into a master table.

use gapstat_algorithms::overlay::ZoneSpec;
use gapstat_algorithms::run::{GeoTiffDirectory, RunLog, SubjectId, Workspace};
use gapstat_algorithms::summary::SummaryParams;
use gapstat_algorithms::table::{ResultTable, TableKey, Value};
use gapstat_algorithms::zonal::{OverlayExtent, ZonalAccumulator, ZonalParams};
use gapstat_core::io::write_geotiff;
use gapstat_core::{GeoTransform, Raster};
use std::path::Path;

const ROWS: usize = 20;
const COLS: usize = 20;

fn transform() -> GeoTransform {
    GeoTransform::new(-2_361_585.0, 3_177_435.0, 30.0, -30.0)
}

/// Top half zone 1, bottom half zone 2
fn zone_raster() -> Raster<u8> {
    let data = (0..ROWS * COLS)
        .map(|i| if i / COLS < ROWS / 2 { 1 } else { 2 })
        .collect();
    Raster::from_vec(data, ROWS, COLS)
        .unwrap()
        .with_transform(transform())
        .with_nodata(Some(255))
}

/// Habitat map from `(row, n, value)` runs: `n` cells of `value` starting
/// at the first column of `row`. Three no-data cells sit at the end of the
/// last row; everything else is 0.
fn habitat(cells: &[(usize, usize, u8)]) -> Raster<u8> {
    let mut r = Raster::new(ROWS, COLS)
        .with_transform(transform())
        .with_nodata(Some(255));
    for c in COLS - 3..COLS {
        r.set(ROWS - 1, c, 255).unwrap();
    }
    for &(row, n, value) in cells {
        for i in 0..n {
            r.set(row + i / COLS, i % COLS, value).unwrap();
        }
    }
    r
}

fn write(dir: &Path, name: &str, raster: &Raster<u8>) {
    write_geotiff(raster, dir.join(name)).unwrap();
}

fn perc_summer(table: &ResultTable, subject: &str, zone: i64) -> f64 {
    table
        .get(&TableKey::zoned(subject, zone), "PercSummer")
        .and_then(Value::as_f64)
        .unwrap()
}

fn int_cell(table: &ResultTable, subject: &str, zone: i64, column: &str) -> i64 {
    table
        .get(&TableKey::zoned(subject, zone), column)
        .and_then(Value::as_i64)
        .unwrap()
}

#[test]
fn test_two_species_two_zones() {
    let dir = tempfile::tempdir().unwrap();
    let habitat_dir = dir.path().join("habitat");
    std::fs::create_dir_all(&habitat_dir).unwrap();

    // sp1: 100 summer pixels, 60 in zone 1 and 40 in zone 2
    write(&habitat_dir, "sp1", &habitat(&[(0, 60, 1), (10, 40, 1)]));
    // sp2: 50 summer pixels, all in zone 2
    write(&habitat_dir, "sp2", &habitat(&[(12, 50, 1)]));

    let zones = ZoneSpec::from_raster("PADUS", &zone_raster(), None).unwrap();
    let params = ZonalParams {
        summary: SummaryParams {
            tile_size: 7,
            parallel: true,
        },
        ..ZonalParams::default()
    };
    let acc = ZonalAccumulator::new(&zones, params).unwrap();
    let subjects = vec![SubjectId::new("sp1"), SubjectId::new("sp2")];
    let source = GeoTiffDirectory::new(&habitat_dir);

    let run = acc
        .accumulate(&subjects, &source, &mut RunLog::discard())
        .unwrap();
    assert!(run.failures.is_empty());
    assert_eq!(run.records.len(), 4);

    let table = run.to_table().unwrap();
    assert_eq!(perc_summer(&table, "sp1", 1), 60.0);
    assert_eq!(perc_summer(&table, "sp1", 2), 40.0);
    assert_eq!(perc_summer(&table, "sp2", 1), 0.0);
    assert_eq!(perc_summer(&table, "sp2", 2), 100.0);

    // no winter habitat anywhere: 0, not NaN
    let winter = table
        .get(&TableKey::zoned("sp2", 1), "PercWinter")
        .and_then(Value::as_f64)
        .unwrap();
    assert_eq!(winter, 0.0);

    // every cell of the zone is accounted for, no-data as non-habitat
    let zone_total = table
        .get(&TableKey::zoned("sp1", 1), "ZoneTotal")
        .and_then(Value::as_i64)
        .unwrap();
    assert_eq!(zone_total, (ROWS * COLS / 2) as i64);
}

#[test]
fn test_rerun_updates_master() {
    let dir = tempfile::tempdir().unwrap();
    let habitat_dir = dir.path().join("habitat");
    std::fs::create_dir_all(&habitat_dir).unwrap();
    write(&habitat_dir, "sp1", &habitat(&[(0, 60, 1), (10, 40, 1)]));
    write(&habitat_dir, "sp2", &habitat(&[(12, 50, 1)]));

    let ws = Workspace::create(dir.path().join("work")).unwrap();
    let zones = ZoneSpec::from_raster("PADUS", &zone_raster(), None).unwrap();
    let acc = ZonalAccumulator::new(&zones, ZonalParams::default()).unwrap();
    let source = GeoTiffDirectory::new(&habitat_dir);
    let ts = |m: u32| {
        chrono::NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(8, m, 0)
            .unwrap()
    };

    let first = acc
        .accumulate(
            &[SubjectId::new("sp1"), SubjectId::new("sp2")],
            &source,
            &mut RunLog::discard(),
        )
        .unwrap();
    let published = first.publish(&ws, ts(0)).unwrap();
    assert!(published.master.archived.is_none());
    assert!(published.run_table.exists());

    // sp2 changes and a new species arrives; sp1 is not re-run
    write(&habitat_dir, "sp2", &habitat(&[(0, 10, 3), (12, 30, 3)]));
    write(&habitat_dir, "sp3", &habitat(&[(15, 5, 2)]));
    let second = acc
        .accumulate(
            &[SubjectId::new("sp2"), SubjectId::new("sp3")],
            &source,
            &mut RunLog::discard(),
        )
        .unwrap();
    let published = second.publish(&ws, ts(1)).unwrap();

    let snapshot = ResultTable::read_csv(published.master.archived.as_ref().unwrap()).unwrap();
    assert_eq!(snapshot, first.to_table().unwrap());

    let master = ResultTable::read_csv(ws.file("Percent_in_PADUS_Master.csv")).unwrap();
    assert_eq!(master.len(), 6);
    assert_eq!(perc_summer(&master, "sp1", 1), 60.0);
    assert_eq!(perc_summer(&master, "sp2", 1), 25.0);
    assert_eq!(perc_summer(&master, "sp2", 2), 75.0);
    assert_eq!(master.keys().last(), Some(&TableKey::zoned("sp3", 2)));
}

#[test]
fn test_missing_subject_keeps_history() {
    let dir = tempfile::tempdir().unwrap();
    let habitat_dir = dir.path().join("habitat");
    std::fs::create_dir_all(&habitat_dir).unwrap();
    write(&habitat_dir, "sp1", &habitat(&[(0, 60, 1), (10, 40, 1)]));

    let ws = Workspace::create(dir.path().join("work")).unwrap();
    let zones = ZoneSpec::from_raster("PADUS", &zone_raster(), None).unwrap();
    let acc = ZonalAccumulator::new(&zones, ZonalParams::default()).unwrap();
    let source = GeoTiffDirectory::new(&habitat_dir);
    let now = chrono::Local::now().naive_local();

    let run = acc
        .accumulate(&[SubjectId::new("sp1")], &source, &mut RunLog::discard())
        .unwrap();
    run.publish(&ws, now).unwrap();

    std::fs::remove_file(habitat_dir.join("sp1")).unwrap();
    let log_path = ws.file("log-test.txt");
    let mut log = RunLog::open(&log_path).unwrap();
    let rerun = acc
        .accumulate(&[SubjectId::new("sp1")], &source, &mut log)
        .unwrap();
    assert_eq!(rerun.failures.len(), 1);
    rerun.publish(&ws, now).unwrap();

    let master = ResultTable::read_csv(ws.file("Percent_in_PADUS_Master.csv")).unwrap();
    assert_eq!(perc_summer(&master, "sp1", 1), 60.0);
    let status = master.get(&TableKey::zoned("sp1", 1), "Status").unwrap();
    assert!(status.as_str().unwrap().starts_with("error"));

    let text = std::fs::read_to_string(&log_path).unwrap();
    assert!(text.contains("ERROR -- sp1"));
}

#[test]
fn test_habitat_outside_zones_counts_in_totals() {
    let dir = tempfile::tempdir().unwrap();
    let habitat_dir = dir.path().join("habitat");
    std::fs::create_dir_all(&habitat_dir).unwrap();

    // zone 1 covers the left half, the right half is no-data
    let aoi = (0..ROWS * COLS)
        .map(|i| if i % COLS < COLS / 2 { 1 } else { 255 })
        .collect();
    let aoi = Raster::from_vec(aoi, ROWS, COLS)
        .unwrap()
        .with_transform(transform())
        .with_nodata(Some(255));
    let zones = ZoneSpec::from_raster("AOI", &aoi, None).unwrap();

    let summer = Raster::filled(ROWS, COLS, 1u8).with_transform(transform());
    write(&habitat_dir, "sp", &summer);
    let source = GeoTiffDirectory::new(&habitat_dir);
    let subjects = [SubjectId::new("sp")];

    let acc = ZonalAccumulator::new(&zones, ZonalParams::default()).unwrap();
    let table = acc
        .accumulate(&subjects, &source, &mut RunLog::discard())
        .unwrap()
        .to_table()
        .unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(perc_summer(&table, "sp", 1), 50.0);
    assert_eq!(int_cell(&table, "sp", 1, "SummerPixels"), (ROWS * COLS / 2) as i64);
    assert_eq!(int_cell(&table, "sp", 1, "SummerPixelTotal"), (ROWS * COLS) as i64);

    // reporting zone 0 adds its row but leaves the zone 1 numbers alone
    let params = ZonalParams {
        include_outside: true,
        ..ZonalParams::default()
    };
    let acc = ZonalAccumulator::new(&zones, params).unwrap();
    let table = acc
        .accumulate(&subjects, &source, &mut RunLog::discard())
        .unwrap()
        .to_table()
        .unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(perc_summer(&table, "sp", 0), 50.0);
    assert_eq!(perc_summer(&table, "sp", 1), 50.0);
}

#[test]
fn test_subject_extent_agrees_with_zone_extent() {
    let dir = tempfile::tempdir().unwrap();
    let habitat_dir = dir.path().join("ranges");
    std::fs::create_dir_all(&habitat_dir).unwrap();

    // 6x8 range map, 8 rows down and 4 columns in: rows 8..10 fall in
    // zone 1, rows 10..14 in zone 2
    let (rows, cols) = (6, 8);
    let data = (0..rows * cols)
        .map(|i| if i % 11 == 0 { 255 } else { (i % 4) as u8 })
        .collect();
    let base = transform();
    let range = Raster::from_vec(data, rows, cols)
        .unwrap()
        .with_transform(GeoTransform::new(
            base.origin_x + 4.0 * 30.0,
            base.origin_y - 8.0 * 30.0,
            30.0,
            -30.0,
        ))
        .with_nodata(Some(255));
    write(&habitat_dir, "sp", &range);

    let zones = ZoneSpec::from_raster("PADUS", &zone_raster(), None).unwrap();
    let source = GeoTiffDirectory::new(&habitat_dir);
    let run_with = |extent| {
        let params = ZonalParams {
            extent,
            ..ZonalParams::default()
        };
        let acc = ZonalAccumulator::new(&zones, params).unwrap();
        let run = acc
            .accumulate(&[SubjectId::new("sp")], &source, &mut RunLog::discard())
            .unwrap();
        assert!(run.failures.is_empty());
        run.to_table().unwrap()
    };
    let clipped = run_with(OverlayExtent::Subject);
    let expanded = run_with(OverlayExtent::Zones);

    for zone in [1, 2] {
        for column in ["PercSummer", "PercWinter", "PercYearRound"] {
            let key = TableKey::zoned("sp", zone);
            assert_eq!(clipped.get(&key, column), expanded.get(&key, column), "{}", column);
        }
        for column in [
            "SummerPixels",
            "WinterPixels",
            "AllYearPixels",
            "SummerPixelTotal",
            "WinterPixelTotal",
            "AllYearPixelTotal",
        ] {
            assert_eq!(
                int_cell(&clipped, "sp", zone, column),
                int_cell(&expanded, "sp", zone, column),
                "{}",
                column
            );
        }
    }
    assert!(perc_summer(&clipped, "sp", 2) > 0.0);

    // zone totals only cover the part of each zone the subject spans
    assert_eq!(int_cell(&clipped, "sp", 1, "ZoneTotal"), 2 * 8);
    assert_eq!(int_cell(&clipped, "sp", 2, "ZoneTotal"), 4 * 8);
    assert_eq!(int_cell(&expanded, "sp", 1, "ZoneTotal"), (ROWS * COLS / 2) as i64);
}
