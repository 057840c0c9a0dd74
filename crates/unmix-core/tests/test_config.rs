use std::path::PathBuf;

use unmix_core::error::UnmixError;
use unmix_core::filters::median::MedianBorder;
use unmix_core::pipeline::config::PipelineConfig;
use unmix_core::pipeline::PipelineStage;
use unmix_core::reference::{ChannelSelection, LaserChannelMap};
use unmix_core::spectral::PixelScale;
use unmix_core::unmix::{FailureMode, Smoothing, SolveFailure, UnmixConfig};

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

#[test]
fn test_failure_mode_display() {
    assert_eq!(format!("{}", FailureMode::Strict), "Strict");
    assert_eq!(format!("{}", FailureMode::Lenient), "Lenient");
}

#[test]
fn test_smoothing_display() {
    assert_eq!(format!("{}", Smoothing::default()), "Median 3x3 (Zero border)");
    assert_eq!(
        format!(
            "{}",
            Smoothing {
                enabled: true,
                border: MedianBorder::Replicate
            }
        ),
        "Median 3x3 (Replicate border)"
    );
    assert_eq!(format!("{}", Smoothing::disabled()), "Off");
}

#[test]
fn test_channel_selection_display() {
    assert_eq!(format!("{}", ChannelSelection::All), "All");
    let by_laser = ChannelSelection::ByLaser(LaserChannelMap::default());
    assert_eq!(format!("{}", by_laser), "By laser (6 lines)");
}

#[test]
fn test_pipeline_stage_display() {
    assert_eq!(format!("{}", PipelineStage::Reading), "Reading bands");
    assert_eq!(format!("{}", PipelineStage::Unmixing), "Unmixing");
    assert_eq!(format!("{}", PipelineStage::Writing), "Writing output");
}

#[test]
fn test_solve_failure_display() {
    let s = format!("{}", SolveFailure::IterationLimit { iterations: 9 });
    assert!(s.contains('9'));
}

#[test]
fn test_plane_error_display() {
    let err = UnmixError::PlaneOutOfRange { index: 3, total: 2 }.in_plane("liver", 1);
    assert_eq!(
        err.to_string(),
        "liver, plane 1: Plane index 3 out of range (total: 2)"
    );
}

#[test]
fn test_invariant_violation_seen_through_plane_context() {
    let err = UnmixError::InvariantViolation("bad".into()).in_plane("liver", 0);
    assert!(err.is_invariant_violation());
    assert!(!UnmixError::UnknownLaser(488).is_invariant_violation());
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[test]
fn test_unmix_config_defaults() {
    let c = UnmixConfig::default();
    assert!(c.smoothing.enabled);
    assert_eq!(c.smoothing.border, MedianBorder::Zero);
    assert_eq!(c.workers, 0);
    assert_eq!(c.chunk_size, 4096);
    assert_eq!(c.failure_mode, FailureMode::Strict);
    assert_eq!(c.max_iterations, None);
}

#[test]
fn test_resolved_workers() {
    assert_eq!(UnmixConfig::serial().resolved_workers(), 1);
    let c = UnmixConfig {
        workers: 3,
        ..Default::default()
    };
    assert_eq!(c.resolved_workers(), 3);
    assert!(UnmixConfig::default().resolved_workers() >= 1);
}

#[test]
fn test_pixel_scale_per_cm() {
    let scale = PixelScale {
        x_um: 0.5,
        y_um: 0.25,
    };
    assert_eq!(scale.pixels_per_cm(), (20_000.0, 40_000.0));
}

// ---------------------------------------------------------------------------
// TOML
// ---------------------------------------------------------------------------

#[test]
fn test_pipeline_config_toml_round_trip() {
    let config = PipelineConfig {
        input: PathBuf::from("/data/raw"),
        output: PathBuf::from("/data/unmixed"),
        reference: PathBuf::from("/data/refs"),
        channels: ChannelSelection::ByLaser(LaserChannelMap::default()),
        unmix: UnmixConfig {
            smoothing: Smoothing {
                enabled: true,
                border: MedianBorder::Replicate,
            },
            workers: 4,
            chunk_size: 1024,
            failure_mode: FailureMode::Lenient,
            max_iterations: Some(30),
        },
    };
    let text = config.to_toml().unwrap();
    assert_eq!(PipelineConfig::from_toml(&text).unwrap(), config);
}

#[test]
fn test_default_config_toml_round_trip() {
    let config = PipelineConfig::default();
    let text = config.to_toml().unwrap();
    assert_eq!(PipelineConfig::from_toml(&text).unwrap(), config);
}

#[test]
fn test_partial_toml_fills_defaults() {
    let text = r#"
input = "in"
output = "out"
reference = "ref.csv"

[unmix]
workers = 2
failure_mode = "Lenient"
"#;
    let config = PipelineConfig::from_toml(text).unwrap();
    assert_eq!(config.channels, ChannelSelection::All);
    assert_eq!(config.unmix.workers, 2);
    assert_eq!(config.unmix.failure_mode, FailureMode::Lenient);
    assert_eq!(config.unmix.chunk_size, 4096);
    assert!(config.unmix.smoothing.enabled);
}

#[test]
fn test_invalid_toml_is_config_error() {
    let err = PipelineConfig::from_toml("input = [").unwrap_err();
    assert!(matches!(err, UnmixError::Config(_)));
}

#[test]
fn test_load_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unmix.toml");
    let config = PipelineConfig::default();
    std::fs::write(&path, config.to_toml().unwrap()).unwrap();
    assert_eq!(PipelineConfig::load(&path).unwrap(), config);
}
