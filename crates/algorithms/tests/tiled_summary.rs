//! Tiled summaries must agree with a single pass over the whole raster,
//! whatever the tile size and processing mode.

use gapstat_algorithms::overlay::{combine, OverlayEncoding, ZoneSpec};
use gapstat_algorithms::summary::{summarize, summarize_single_pass, SummaryParams};
use gapstat_core::Raster;

/// Habitat categories 0..=3 in a deterministic pattern with scattered no-data
fn habitat(rows: usize, cols: usize) -> Raster<u8> {
    let data = (0..rows * cols)
        .map(|i| if i % 97 == 0 { 255 } else { ((i * 7 + i / cols) % 4) as u8 })
        .collect();
    Raster::from_vec(data, rows, cols)
        .unwrap()
        .with_nodata(Some(255))
}

fn zones(rows: usize, cols: usize) -> ZoneSpec {
    let data = (0..rows * cols)
        .map(|i| ((i / cols) / 20 + (i % cols) / 30) as i32 % 6 + 1)
        .collect();
    let raster = Raster::from_vec(data, rows, cols).unwrap();
    ZoneSpec::from_raster("blocks", &raster, Some(&[1, 2, 3, 4])).unwrap()
}

#[test]
fn test_habitat_counts_independent_of_tiling() {
    let raster = habitat(211, 157);
    let expected = summarize_single_pass(&raster).unwrap();
    assert_eq!(expected.total() as usize, raster.valid_count());

    for tile_size in [1, 13, 64, 100, 1024] {
        for parallel in [false, true] {
            let params = SummaryParams {
                tile_size,
                parallel,
            };
            assert_eq!(
                summarize(&raster, &params).unwrap(),
                expected,
                "tile_size={} parallel={}",
                tile_size,
                parallel
            );
        }
    }
}

#[test]
fn test_combined_counts_cover_every_cell() {
    let (rows, cols) = (180, 130);
    let combined = combine(
        &habitat(rows, cols),
        &zones(rows, cols),
        &OverlayEncoding::default(),
    )
    .unwrap();

    let expected = summarize_single_pass(&combined).unwrap();
    let tiled = summarize(
        &combined,
        &SummaryParams {
            tile_size: 37,
            parallel: true,
        },
    )
    .unwrap();
    assert_eq!(tiled, expected);
    assert_eq!(tiled.total() as usize, rows * cols);

    // zones 5 and 6 are not of interest and fold into zone 0
    let enc = OverlayEncoding::default();
    assert!(tiled.codes().all(|code| enc.decode(code).1 <= 4));
}
