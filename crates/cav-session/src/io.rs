//! Session file encodings.

use crate::types::SessionData;
use crate::{SessionError, SessionResult};
use cav_core::{deg_to_rad, hz_to_rad_s, rad_s_to_hz, rad_to_deg};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Save the structured (lossless) encoding.
pub fn save_json(path: &Path, session: &SessionData) -> SessionResult<()> {
    session.check_channels()?;
    let content = serde_json::to_string_pretty(session)?;
    fs::write(path, content)?;
    Ok(())
}

/// Load the structured encoding. Returns a fresh `SessionData`; the caller
/// swaps its live store only on success.
pub fn load_json(path: &Path) -> SessionResult<SessionData> {
    let content = fs::read_to_string(path)?;
    let session: SessionData = serde_json::from_str(&content)?;
    session.check_channels()?;
    Ok(session)
}

/// Save the tabular encoding: one row per sample with derived columns
/// `time_s, vc_mag, vc_phase_deg, vr_mag, detuning_hz, mode_1..mode_N`.
pub fn save_csv(path: &Path, session: &SessionData) -> SessionResult<()> {
    session.check_channels()?;

    let mut content = String::new();
    content.push_str("time_s,vc_mag,vc_phase_deg,vr_mag,detuning_hz");
    for i in 0..session.mode_count() {
        let _ = write!(content, ",mode_{}", i + 1);
    }
    content.push('\n');

    for row in 0..session.len() {
        let vc_re = session.vc_re[row];
        let vc_im = session.vc_im[row];
        let vr_re = session.vr_re[row];
        let vr_im = session.vr_im[row];
        let _ = write!(
            content,
            "{},{},{},{},{}",
            session.time_s[row],
            vc_re.hypot(vc_im),
            rad_to_deg(vc_im.atan2(vc_re)),
            vr_re.hypot(vr_im),
            rad_s_to_hz(session.detuning[row]),
        );
        for channel in &session.mode_channels {
            let _ = write!(content, ",{}", channel[row]);
        }
        content.push('\n');
    }

    fs::write(path, content)?;
    Ok(())
}

/// Load the tabular encoding.
///
/// The complex cavity voltage is reconstructed from magnitude and phase; the
/// reflected voltage keeps magnitude only (its phase is not stored in the
/// tabular form). No metadata block exists in CSV, so `meta` is `None`.
pub fn load_csv(path: &Path) -> SessionResult<SessionData> {
    let content = fs::read_to_string(path)?;
    let mut lines = content.lines();

    let header = lines.next().ok_or_else(|| SessionError::Malformed {
        what: "empty file".to_string(),
    })?;
    let columns: Vec<&str> = header.split(',').collect();
    const FIXED: [&str; 5] = ["time_s", "vc_mag", "vc_phase_deg", "vr_mag", "detuning_hz"];
    if columns.len() < FIXED.len() || columns[..FIXED.len()] != FIXED {
        return Err(SessionError::Malformed {
            what: format!("unexpected header: {header}"),
        });
    }
    let mode_count = columns.len() - FIXED.len();

    let mut session = SessionData {
        meta: None,
        time_s: Vec::new(),
        vc_re: Vec::new(),
        vc_im: Vec::new(),
        vr_re: Vec::new(),
        vr_im: Vec::new(),
        detuning: Vec::new(),
        mode_channels: vec![Vec::new(); mode_count],
        recorded_params: Vec::new(),
    };

    for (lineno, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != columns.len() {
            return Err(SessionError::Malformed {
                what: format!(
                    "row {} has {} fields, expected {}",
                    lineno + 2,
                    fields.len(),
                    columns.len()
                ),
            });
        }
        let mut values = Vec::with_capacity(fields.len());
        for field in &fields {
            let v: f64 = field.parse().map_err(|_| SessionError::Malformed {
                what: format!("row {}: not a number: {field}", lineno + 2),
            })?;
            values.push(v);
        }

        let (vc_mag, vc_phase) = (values[1], deg_to_rad(values[2]));
        session.time_s.push(values[0]);
        session.vc_re.push(vc_mag * vc_phase.cos());
        session.vc_im.push(vc_mag * vc_phase.sin());
        session.vr_re.push(values[3]);
        session.vr_im.push(0.0);
        session.detuning.push(hz_to_rad_s(values[4]));
        for (channel, &v) in session.mode_channels.iter_mut().zip(&values[FIXED.len()..]) {
            channel.push(v);
        }
    }

    session.check_channels()?;
    Ok(session)
}
