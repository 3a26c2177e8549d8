//! Integration tests: scan controller behavior.

use cav_mech::MechanicalModeSet;
use cav_sim::{
    ControlParameters, EngineParams, ScanError, ScanParameter, ScanRequest, run_scan,
};

#[test]
fn scan_produces_inclusive_evenly_spaced_points() {
    let modes = MechanicalModeSet::default_table();
    let base = ControlParameters::default();
    let request = ScanRequest::new(ScanParameter::Amplitude, 0.5, 1.5);

    let result = run_scan(EngineParams::default(), &modes, &base, &request).unwrap();

    assert_eq!(result.points.len(), 20);
    assert_eq!(result.points[0].value, 0.5);
    assert_eq!(result.points[19].value, 1.5);
    for pair in result.points.windows(2) {
        assert!(pair[1].value > pair[0].value);
    }
    // the live parameter snapshot is untouched by the sweep
    assert_eq!(base.amplitude, 1.0);
}

#[test]
fn larger_amplitude_gives_larger_settled_response() {
    let modes = MechanicalModeSet::default_table();
    // Zero beam so the response is drive-dominated and monotone in amplitude.
    let base = ControlParameters {
        beam_current_a: 0.0,
        ..Default::default()
    };
    let request = ScanRequest {
        settle_steps: 2000,
        ..ScanRequest::new(ScanParameter::Amplitude, 0.5, 1.5)
    };

    let result = run_scan(EngineParams::default(), &modes, &base, &request).unwrap();
    assert!(result.points[19].response_mv > result.points[0].response_mv);
}

#[test]
fn inverted_range_is_rejected_before_stepping() {
    let modes = MechanicalModeSet::default_table();
    let base = ControlParameters::default();
    let request = ScanRequest::new(ScanParameter::Amplitude, 1.5, 0.5);

    let err = run_scan(EngineParams::default(), &modes, &base, &request).unwrap_err();
    assert!(matches!(err, ScanError::InvalidRange { .. }));
}

#[test]
fn equal_range_is_rejected() {
    let modes = MechanicalModeSet::default_table();
    let base = ControlParameters::default();
    let request = ScanRequest::new(ScanParameter::FreqOffsetHz, -100.0, -100.0);

    let err = run_scan(EngineParams::default(), &modes, &base, &request).unwrap_err();
    assert!(matches!(err, ScanError::InvalidRange { .. }));
}

#[test]
fn degenerate_point_counts_are_rejected() {
    let modes = MechanicalModeSet::default_table();
    let base = ControlParameters::default();
    let request = ScanRequest {
        num_points: 1,
        ..ScanRequest::new(ScanParameter::Amplitude, 0.5, 1.5)
    };
    let err = run_scan(EngineParams::default(), &modes, &base, &request).unwrap_err();
    assert!(matches!(err, ScanError::InvalidArg { .. }));
}
