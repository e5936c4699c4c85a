//! Error handling and edge case testing
//!
//! Boundary values for parameters, buffers and service configuration, and
//! the mapping of every failure onto the validation / processing / transport
//! taxonomy.

use matte_refine::{
    config::{MAX_EDGE_CHOKE, MAX_FEATHER_RADIUS, MAX_MORPH_ITERATIONS},
    error::{ErrorKind, RefineError, Result},
    pipeline::refine_blocking,
    ssaa, ChokeDirection, ColorParser, NumericValidator, PixelBuffer, RefinementParameters,
    ServiceConfig,
};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_parameter_boundaries() -> Result<()> {
    // Clamped knobs saturate instead of failing
    let params = RefinementParameters::builder()
        .edge_choke(-40)
        .feather_radius(500)
        .morph_iter(99)
        .build()?;
    assert_eq!(params.choke(), (ChokeDirection::Shrink, MAX_EDGE_CHOKE));
    assert_eq!(params.feather_radius(), MAX_FEATHER_RADIUS);
    assert_eq!(params.morph_iterations(), MAX_MORPH_ITERATIONS);

    // Raw values that bypass the builder are clamped at use
    let raw = RefinementParameters {
        edge_choke: 12,
        feather_radius: 31,
        morph_iter: 11,
        ..RefinementParameters::default()
    };
    assert!(raw.validate().is_ok());
    assert_eq!(raw.choke(), (ChokeDirection::Expand, MAX_EDGE_CHOKE));
    assert_eq!(raw.feather_radius(), MAX_FEATHER_RADIUS);

    // Exact edges of the validated ranges
    assert!(RefinementParameters::builder()
        .decontamination_strength(0.0)
        .build()
        .is_ok());
    assert!(RefinementParameters::builder()
        .decontamination_strength(100.0)
        .build()
        .is_ok());
    Ok(())
}

#[test]
fn test_invalid_parameters_are_validation_errors() {
    for params in [
        RefinementParameters {
            chroma_tolerance: -0.5,
            ..RefinementParameters::default()
        },
        RefinementParameters {
            chroma_tolerance: f32::INFINITY,
            ..RefinementParameters::default()
        },
        RefinementParameters {
            decontamination_strength: 100.5,
            ..RefinementParameters::default()
        },
        RefinementParameters {
            decontamination_strength: f32::NAN,
            ..RefinementParameters::default()
        },
    ] {
        let err = params.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{:?}", params);
    }
}

#[test]
fn test_buffer_validation() {
    let err = PixelBuffer::new(3, 3, vec![0; 35]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("3x3x4 = 36"));

    assert!(PixelBuffer::new(0, 4, Vec::new()).is_err());
    assert!(PixelBuffer::new(4, 0, Vec::new()).is_err());
    assert_eq!(NumericValidator::rgba_len(7, 3).unwrap(), 84);
}

#[test]
fn test_single_pixel_and_thin_buffers() -> Result<()> {
    let params = RefinementParameters::builder()
        .chroma_tolerance(5.0)
        .edge_choke(3)
        .feather_radius(20)
        .morph_iter(4)
        .decontamination_strength(100.0)
        .build()?;

    for (w, h) in [(1, 1), (1, 9), (9, 1), (2, 2)] {
        let buffer = PixelBuffer::filled(w, h, [180, 40, 40, 120])?;
        let out = refine_blocking(buffer, &params)?;
        assert_eq!(out.dimensions(), (w, h));
    }
    Ok(())
}

#[test]
fn test_params_file_errors() {
    let dir = TempDir::new().unwrap();

    let missing = RefinementParameters::from_json_file(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(missing, RefineError::Io(_)));

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "{ not json").unwrap();
    let err = RefinementParameters::from_json_file(&bad).unwrap_err();
    assert!(matches!(err, RefineError::Serialization(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);

    let out_of_range = dir.path().join("range.json");
    std::fs::write(&out_of_range, r#"{"decontaminationStrength": 140}"#).unwrap();
    assert!(RefinementParameters::from_json_file(&out_of_range).is_err());
}

#[test]
fn test_service_config_boundaries() {
    assert!(ServiceConfig::builder().ssaa_factor(1).build().is_ok());
    assert!(ServiceConfig::builder().ssaa_factor(4).build().is_ok());
    assert!(ServiceConfig::builder().ssaa_factor(0).build().is_err());
    assert!(ServiceConfig::builder().ssaa_factor(5).build().is_err());
    assert!(ServiceConfig::builder().worker_name("  ").build().is_err());
    assert!(ServiceConfig::builder()
        .job_timeout(Duration::ZERO)
        .build()
        .is_err());
}

#[test]
fn test_ssaa_edge_cases() -> Result<()> {
    let err = ssaa::downsample(PixelBuffer::filled(6, 7, [0; 4])?, 2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let out = ssaa::downsample(PixelBuffer::filled(4, 4, [9, 8, 7, 6])?, 4)?;
    assert_eq!(out.dimensions(), (1, 1));
    assert_eq!(out.pixel(0, 0), [9, 8, 7, 6]);
    Ok(())
}

#[test]
fn test_error_taxonomy() {
    assert_eq!(RefineError::Busy.kind(), ErrorKind::Transport);
    assert_eq!(RefineError::transport("x").kind(), ErrorKind::Transport);
    assert_eq!(RefineError::Cancelled.kind(), ErrorKind::Processing);
    assert_eq!(
        RefineError::Timeout(Duration::from_secs(1)).kind(),
        ErrorKind::Processing
    );
    assert_eq!(
        RefineError::processing_stage_error("feather", "bad kernel").kind(),
        ErrorKind::Processing
    );
    assert_eq!(RefineError::invalid_config("x").kind(), ErrorKind::Validation);
}

#[test]
fn test_color_parser_edge_cases() {
    assert!(ColorParser::parse_hex("#00FF00").is_ok());
    assert!(ColorParser::parse_hex("f0f").is_ok());
    assert!(ColorParser::parse_hex("#12345").is_err());
    assert!(ColorParser::parse_hex("#gg0000").is_err());
    assert!(ColorParser::parse_hex("#ÿÿÿ").is_err());
}
