//! Service-level smoke tests: worker lifecycle, recording, playback, scan
//! and session flow through the control surface.

use cav_app::{AppError, SessionFormat, SimulatorService};
use cav_config::SimConfig;
use cav_sim::{ControlParameters, DriverState, ScanParameter, ScanRequest};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

fn test_config() -> SimConfig {
    SimConfig {
        // flat-out stepping keeps the tests fast
        slowdown: 0.0,
        history_capacity: 2000,
        microphonics_sigma: 0.0,
        ..Default::default()
    }
}

fn wait_until(mut cond: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

#[test]
fn start_stop_reset_lifecycle() {
    let service = SimulatorService::spawn(&test_config()).expect("spawn failed");
    assert_eq!(service.status().driver_state, DriverState::Stopped);
    assert_eq!(service.status().samples, 0);

    service.start();
    assert!(
        wait_until(|| service.status().samples > 100, Duration::from_secs(10)),
        "no samples produced"
    );

    service.stop();
    std::thread::sleep(Duration::from_millis(50));
    let frozen = service.status().samples;
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(service.status().samples, frozen, "samples grew after stop");

    // reset clears history and time but preserves parameters
    let custom = ControlParameters {
        amplitude: 0.5,
        ..Default::default()
    };
    service.set_params(custom.clone()).unwrap();
    service.reset();
    assert!(
        wait_until(|| service.status().samples == 0, Duration::from_secs(5)),
        "reset did not clear history"
    );
    assert_eq!(service.status().sim_time, 0.0);
    assert_eq!(service.params(), custom);

    service.shutdown();
}

#[test]
fn invalid_params_rejected_synchronously() {
    let service = SimulatorService::spawn(&test_config()).expect("spawn failed");
    let bad = ControlParameters {
        amplitude: -1.0,
        ..Default::default()
    };
    assert!(service.set_params(bad).is_err());
    service.shutdown();
}

#[test]
fn recording_gates_the_parameter_channel() {
    let service = SimulatorService::spawn(&test_config()).expect("spawn failed");
    service.start();
    assert!(wait_until(
        || service.status().samples > 50,
        Duration::from_secs(10)
    ));
    assert_eq!(service.history_snapshot().params.len(), 0);

    service.set_recording(true);
    assert!(
        wait_until(
            || !service.history_snapshot().params.is_empty(),
            Duration::from_secs(5)
        ),
        "recording produced no parameter snapshots"
    );
    service.set_recording(false);
    service.shutdown();
}

#[test]
fn playback_suspends_stepping() {
    let service = SimulatorService::spawn(&test_config()).expect("spawn failed");

    // playback with no data is rejected
    assert!(matches!(
        service.start_playback(),
        Err(AppError::InvalidInput(_))
    ));

    service.start();
    assert!(wait_until(
        || service.status().samples > 200,
        Duration::from_secs(10)
    ));

    service.start_playback().unwrap();
    std::thread::sleep(Duration::from_millis(50));
    let during = service.status().samples;
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(service.status().samples, during, "stepping ran during playback");
    assert!(service.playback_sample().is_some());

    service.seek(10_000);
    let status = service.status();
    assert!(status.playback_index < status.samples);

    service.stop_playback();
    assert!(
        wait_until(|| service.status().samples > during, Duration::from_secs(5)),
        "stepping did not resume after playback"
    );
    service.shutdown();
}

#[test]
fn scan_runs_concurrently_and_leaves_live_state_alone() {
    let service = SimulatorService::spawn(&test_config()).expect("spawn failed");
    let before = service.params();

    let request = ScanRequest::new(ScanParameter::Amplitude, 0.5, 1.5);
    service.start_scan(request).unwrap();
    assert!(
        wait_until(
            || !service.status().scan_running,
            Duration::from_secs(30)
        ),
        "scan did not finish"
    );

    let result = service.scan_result().expect("no scan result");
    assert_eq!(result.points.len(), 20);
    assert_eq!(result.points[0].value, 0.5);
    assert_eq!(result.points[19].value, 1.5);
    assert_eq!(service.params(), before, "scan perturbed the live parameters");
    assert!(service.status().scan_error.is_none());

    // inverted range rejected synchronously, nothing recorded
    let samples_before = service.status().samples;
    let err = service
        .start_scan(ScanRequest::new(ScanParameter::Amplitude, 2.0, 1.0))
        .unwrap_err();
    assert!(matches!(err, AppError::Scan(_)));
    assert_eq!(service.status().samples, samples_before);

    service.shutdown();
}

#[test]
fn session_save_load_roundtrip_through_service() {
    let dir = unique_temp_dir("cav_app_session");
    let path = dir.join("capture.json");

    let service = SimulatorService::spawn(&test_config()).expect("spawn failed");
    service.set_recording(true);
    service.start();
    assert!(wait_until(
        || service.status().samples > 300,
        Duration::from_secs(10)
    ));
    service.stop();
    std::thread::sleep(Duration::from_millis(50));

    service.save_session(&path, SessionFormat::Json).unwrap();
    let saved_rows = service.status().samples;

    service.reset();
    assert!(wait_until(
        || service.status().samples == 0,
        Duration::from_secs(5)
    ));

    let loaded_rows = service.load_session(&path, SessionFormat::Json).unwrap();
    assert_eq!(loaded_rows, saved_rows);
    assert_eq!(service.status().samples, saved_rows);
    service.start_playback().unwrap();
    assert!(service.playback_sample().is_some());

    // a failed load leaves the freshly loaded history untouched
    let bogus = dir.join("missing.json");
    assert!(service.load_session(&bogus, SessionFormat::Json).is_err());
    assert_eq!(service.status().samples, saved_rows);

    service.shutdown();
}
