mod common;

use std::path::PathBuf;

use ndarray::{arr2, Array2};

use unmix_core::error::UnmixError;
use unmix_core::pipeline::shot_stem;
use unmix_core::reference::{
    is_single_shot, list_reference_files, load_reference, parse_reference, select_reference_file,
    AllChannels, ChannelSelection, ChannelSelector, LaserChannelMap,
};
use unmix_core::spectral::ReferenceMatrix;

use common::{make_reference, write_reference_csv};

// ---------------------------------------------------------------------------
// ReferenceMatrix
// ---------------------------------------------------------------------------

#[test]
fn test_reference_rejects_empty() {
    let err = ReferenceMatrix::unlabeled(Array2::zeros((0, 3))).unwrap_err();
    assert!(matches!(err, UnmixError::InvalidReference(_)));
}

#[test]
fn test_reference_rejects_label_count() {
    let err = ReferenceMatrix::new(Array2::eye(2), vec!["a".into()]).unwrap_err();
    assert!(matches!(err, UnmixError::InvalidReference(_)));
}

#[test]
fn test_reference_rejects_non_finite() {
    let err = ReferenceMatrix::unlabeled(arr2(&[[1.0, f64::INFINITY]])).unwrap_err();
    assert!(matches!(err, UnmixError::InvalidReference(_)));
}

#[test]
fn test_unlabeled_generates_labels() {
    let reference = ReferenceMatrix::unlabeled(Array2::eye(3)).unwrap();
    assert_eq!(reference.labels(), &["ch0", "ch1", "ch2"]);
}

// ---------------------------------------------------------------------------
// CSV parsing
// ---------------------------------------------------------------------------

#[test]
fn test_parse_with_band_column() {
    let text = "band, AF405, Dy490\n0, 1.0, 0.1\n1, 0.5, 0.9\n2, 0.0, 0.3\n";
    let reference = parse_reference(text).unwrap();
    assert_eq!(reference.bands(), 3);
    assert_eq!(reference.channels(), 2);
    assert_eq!(reference.labels(), &["AF405", "Dy490"]);
    assert_eq!(reference.data()[[1, 1]], 0.9);
}

#[test]
fn test_parse_without_band_column() {
    let text = "AF405,Dy490,RRX\n1,2,3\n4,5,6\n";
    let reference = parse_reference(text).unwrap();
    assert_eq!(reference.bands(), 2);
    assert_eq!(reference.channels(), 3);
    assert_eq!(reference.column(2).to_vec(), vec![3.0, 6.0]);
}

#[test]
fn test_parse_wavelength_header_case_insensitive() {
    let text = "Wavelength,A\n500,1\n510,2\n";
    let reference = parse_reference(text).unwrap();
    assert_eq!(reference.labels(), &["A"]);
    assert_eq!(reference.column(0).to_vec(), vec![1.0, 2.0]);
}

#[test]
fn test_parse_skips_blank_rows() {
    let text = "A,B\n1,2\n,\n3,4\n";
    let reference = parse_reference(text).unwrap();
    assert_eq!(reference.bands(), 2);
}

#[test]
fn test_parse_bad_cell_names_location() {
    let text = "band,A,B\n0,1.0,0.5\n1,oops,0.2\n";
    let err = parse_reference(text).unwrap_err();
    match err {
        UnmixError::InvalidReference(msg) => {
            assert!(msg.contains("row 2"), "{msg}");
            assert!(msg.contains("'A'"), "{msg}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_parse_nan_cell_rejected() {
    let err = parse_reference("A,B\n1,NaN\n").unwrap_err();
    assert!(matches!(err, UnmixError::InvalidReference(_)));
}

#[test]
fn test_parse_ragged_row_rejected() {
    assert!(parse_reference("A,B\n1,2\n3\n").is_err());
}

#[test]
fn test_parse_header_only_rejected() {
    assert!(parse_reference("A,B\n").is_err());
}

#[test]
fn test_load_reference_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ref.csv");
    let reference = make_reference(6, 3);
    write_reference_csv(&path, &reference);

    let loaded = load_reference(&path).unwrap();
    assert_eq!(loaded.labels(), reference.labels());
    assert_eq!(loaded.data(), reference.data());
}

// ---------------------------------------------------------------------------
// Reference file selection
// ---------------------------------------------------------------------------

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

#[test]
fn test_single_reference_serves_any_laser() {
    let candidates = paths(&["ref.csv"]);
    assert!(!is_single_shot(&candidates));
    assert_eq!(
        select_reference_file(&candidates, &[488, 561]).unwrap(),
        PathBuf::from("ref.csv")
    );
    assert_eq!(
        select_reference_file(&candidates, &[]).unwrap(),
        PathBuf::from("ref.csv")
    );
}

#[test]
fn test_select_by_laser() {
    let candidates = paths(&["ref_488.csv", "ref_561.csv"]);
    assert!(is_single_shot(&candidates));
    assert_eq!(
        select_reference_file(&candidates, &[561]).unwrap(),
        PathBuf::from("ref_561.csv")
    );
}

#[test]
fn test_select_missing_laser() {
    let candidates = paths(&["ref_488.csv", "ref_561.csv"]);
    let err = select_reference_file(&candidates, &[633]).unwrap_err();
    assert!(matches!(err, UnmixError::NoReferenceForLaser(633)));
}

#[test]
fn test_select_without_lasers_is_ambiguous() {
    let candidates = paths(&["ref_488.csv", "ref_561.csv"]);
    let err = select_reference_file(&candidates, &[]).unwrap_err();
    assert!(matches!(err, UnmixError::InvalidReference(_)));
}

#[test]
fn test_select_from_nothing() {
    let err = select_reference_file(&[], &[488]).unwrap_err();
    assert!(matches!(err, UnmixError::InvalidReference(_)));
}

#[test]
fn test_list_reference_files_sorted_csv_only() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["b_561.csv", "a_488.CSV", "notes.txt"] {
        std::fs::write(dir.path().join(name), "A\n1\n").unwrap();
    }
    let files = list_reference_files(dir.path()).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["a_488.CSV", "b_561.csv"]);
}

// ---------------------------------------------------------------------------
// Channel selection
// ---------------------------------------------------------------------------

fn dye_labels() -> Vec<String> {
    ["AF405", "Dy490", "At532", "RRX", "At647"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[test]
fn test_all_channels_keeps_everything() {
    assert_eq!(
        AllChannels.select(&dye_labels(), &[488]).unwrap(),
        vec![0, 1, 2, 3, 4]
    );
}

#[test]
fn test_laser_map_single_laser() {
    let map = LaserChannelMap::default();
    assert_eq!(map.select(&dye_labels(), &[488]).unwrap(), vec![1]);
}

#[test]
fn test_laser_map_union_in_reference_order() {
    let map = LaserChannelMap::default();
    assert_eq!(map.select(&dye_labels(), &[633, 561]).unwrap(), vec![3, 4]);
}

#[test]
fn test_laser_map_unknown_laser() {
    let map = LaserChannelMap::default();
    let err = map.select(&dye_labels(), &[999]).unwrap_err();
    assert!(matches!(err, UnmixError::UnknownLaser(999)));
}

#[test]
fn test_laser_map_no_match_is_error() {
    let map = LaserChannelMap::default();
    let labels = vec!["At550".to_string(), "RRX".to_string()];
    let err = map.select(&labels, &[488, 405]).unwrap_err();
    assert!(
        matches!(&err, UnmixError::NoChannelsSelected { lasers } if lasers == &[488, 405]),
        "{err}"
    );
    assert_eq!(err.to_string(), "No reference channel matches lasers [488, 405]");
}

#[test]
fn test_laser_map_empty_reference_selects_nothing() {
    let map = LaserChannelMap::default();
    assert!(map.select(&[], &[488]).unwrap().is_empty());
}

#[test]
fn test_laser_map_fragments() {
    let map = LaserChannelMap::default();
    assert_eq!(map.fragments(514).unwrap(), &["At532".to_string()]);
    assert!(map.fragments(532).is_none());
}

#[test]
fn test_channel_selection_dispatch() {
    let by_laser = ChannelSelection::ByLaser(LaserChannelMap::default());
    assert_eq!(by_laser.select(&dye_labels(), &[405]).unwrap(), vec![0]);
    assert_eq!(
        ChannelSelection::All.select(&dye_labels(), &[]).unwrap().len(),
        5
    );
}

// ---------------------------------------------------------------------------
// Output stems
// ---------------------------------------------------------------------------

#[test]
fn test_shot_stem_drops_laser_part() {
    assert_eq!(shot_stem("sample_561nm_z", 561), "sample_z");
    assert_eq!(shot_stem("liver_488", 488), "liver");
    assert_eq!(shot_stem("liver", 488), "liver");
}
