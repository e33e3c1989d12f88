use crate::slicer::{NDSlicer, NDimConfig, OneDConfig, OneDSlicer, SlicePoint, Slicer};

use super::observations;

fn two_d() -> NDimConfig {
    NDimConfig {
        dimensions: vec![
            OneDConfig::new("airmass").with_bins(4),
            OneDConfig::new("fiveSigmaDepth").with_edges(vec![22.0, 23.0, 24.0, 25.0]),
        ],
    }
}

#[test]
fn test_cells_match_per_dimension_bins() {
    let table = observations(1500, 17);
    let rows = table.all_rows();
    let mut grid = NDSlicer::new(two_d()).unwrap();
    grid.setup(&table, &rows).unwrap();
    assert_eq!(grid.slice_count().unwrap(), 4 * 3);

    // Bin each dimension on its own, then combine row-major
    let mut per_dim = Vec::new();
    for dim in two_d().dimensions {
        let mut slicer = OneDSlicer::new(dim).unwrap();
        slicer.setup(&table, &rows).unwrap();
        let mut bin_of_row = vec![usize::MAX; table.len()];
        for (bin, slice) in slicer.slices().unwrap().enumerate() {
            for &row in slice.rows {
                bin_of_row[row] = bin;
            }
        }
        per_dim.push(bin_of_row);
    }

    for (cell, slice) in grid.slices().unwrap().enumerate() {
        for &row in slice.rows {
            assert_eq!(per_dim[0][row] * 3 + per_dim[1][row], cell, "row {row}");
        }
    }
    assert_eq!(grid.partition().unwrap().assigned_rows(), table.len());
}

#[test]
fn test_cell_points_carry_left_edges() {
    let table = observations(100, 2);
    let mut grid = NDSlicer::new(two_d()).unwrap();
    grid.setup(&table, &table.all_rows()).unwrap();
    let SlicePoint::Cell { sid, lefts } = grid.slice(5).unwrap().point.clone() else {
        panic!("grid slices carry cell points");
    };
    assert_eq!(sid, 5);
    // Cell 5 is airmass bin 1, depth bin 2
    assert_eq!(lefts[1], 24.0);
}

#[test]
fn test_rows_outside_any_dimension_are_dropped() {
    let table = observations(800, 4);
    let config = NDimConfig {
        dimensions: vec![
            OneDConfig::new("airmass").with_bins(2),
            OneDConfig::new("fiveSigmaDepth").with_edges(vec![23.0, 24.0]),
        ],
    };
    let mut grid = NDSlicer::new(config).unwrap();
    grid.setup(&table, &table.all_rows()).unwrap();
    let depth = table.f64_column("fiveSigmaDepth").unwrap();
    let inside = depth.iter().filter(|d| (23.0..=24.0).contains(*d)).count();
    assert_eq!(grid.partition().unwrap().assigned_rows(), inside);
}

#[test]
fn test_equivalence_and_validation() {
    let table = observations(300, 9);
    let mut a = NDSlicer::new(two_d()).unwrap();
    let mut b = NDSlicer::new(two_d()).unwrap();
    a.setup(&table, &table.all_rows()).unwrap();
    b.setup(&table, &table.all_rows()).unwrap();
    assert!(a.same_partition(&b));

    let mut one = OneDSlicer::new(OneDConfig::new("airmass").with_bins(4)).unwrap();
    one.setup(&table, &table.all_rows()).unwrap();
    assert!(!a.same_partition(&one));

    assert!(NDSlicer::new(NDimConfig { dimensions: vec![] }).is_err());
}
