//! Dashboard configuration.
//!
//! Everything the dashboard shows (stat tiles, attestation cards, detail rows)
//! and every tunable of the 3D chart lives in a single `DashboardConfig` that
//! is serialized to/from TOML. Missing fields fall back to the defaults below,
//! which reproduce the stock attestation-review dashboard.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DashboardConfig
// ---------------------------------------------------------------------------

/// Root configuration container.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub chart: ChartTokens,
    pub sidebar: SidebarConfig,
    pub stats: Vec<StatTile>,
    pub attestations: Vec<AttestationCard>,
}

// --- Chart ---

/// Geometry, camera, and interaction constants for the 3D pie chart.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChartTokens {
    pub radius: f32,
    pub depth: f32,
    /// Arc samples per slice.
    pub segments: usize,
    /// Distance past the rim where the leader line bends.
    pub leader_out: f32,
    /// Length of the horizontal leg of the leader line.
    pub leader_horizontal: f32,
    pub fov_deg: f32,
    pub camera_distance: f32,
    pub drag_sensitivity: f32,
    pub idle_threshold_secs: f64,
    pub auto_rotate_step: f32,
    pub pop_distance: f32,
    pub pop_smoothing: f32,
    pub marker_length: f32,
    pub pulse_amplitude: f32,
    /// Marker pulse angular rate, radians per second.
    pub pulse_rate: f64,
    /// Pixel gap between the leader terminus and its label.
    pub label_gap: f64,
    pub label_font_size: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SidebarConfig {
    pub open: bool,
    pub items: Vec<String>,
}

// --- Dashboard data ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StatTile {
    pub label: String,
    pub value: String,
    pub change: String,
    pub trend: Trend,
    /// Highlighted tiles get a tinted panel and an amber change line.
    pub highlight: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AttestationCard {
    pub id: u32,
    pub title: String,
    pub completed: f64,
    pub pending: f64,
    pub auto_closed: f64,
    pub rows: Vec<DetailRow>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DetailRow {
    pub name: String,
    pub status: String,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            chart: ChartTokens::default(),
            sidebar: SidebarConfig::default(),
            stats: default_stats(),
            attestations: default_attestations(),
        }
    }
}

impl Default for ChartTokens {
    fn default() -> Self {
        Self {
            radius: 1.2,
            depth: 0.3,
            segments: 256,
            leader_out: 0.2,
            leader_horizontal: 0.6,
            fov_deg: 45.0,
            camera_distance: 5.0,
            drag_sensitivity: 0.01,
            idle_threshold_secs: 3.0,
            auto_rotate_step: 0.002,
            pop_distance: 0.15,
            pop_smoothing: 0.12,
            marker_length: 0.36,
            pulse_amplitude: 0.02,
            pulse_rate: 120.0,
            label_gap: 8.0,
            label_font_size: 20.0,
        }
    }
}

impl Default for SidebarConfig {
    fn default() -> Self {
        Self {
            open: true,
            items: [
                "Dashboard",
                "Applications",
                "Entitlements",
                "Privileged",
                "Decentralized",
                "Birthright",
                "Logout",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

fn stat(label: &str, value: &str, change: &str, trend: Trend, highlight: bool) -> StatTile {
    StatTile {
        label: label.into(),
        value: value.into(),
        change: change.into(),
        trend,
        highlight,
    }
}

fn default_stats() -> Vec<StatTile> {
    vec![
        stat("Attestations", "24", "Increased from last month", Trend::Up, false),
        stat("Pending Review", "8", "On Discuss", Trend::Neutral, true),
        stat("Completed", "14", "Increased from last month", Trend::Up, false),
        stat("Auto-Closed", "2", "Reduced from last month", Trend::Down, false),
    ]
}

fn rows(items: &[(&str, &str)]) -> Vec<DetailRow> {
    items
        .iter()
        .map(|(name, status)| DetailRow {
            name: (*name).into(),
            status: (*status).into(),
        })
        .collect()
}

fn default_attestations() -> Vec<AttestationCard> {
    vec![
        AttestationCard {
            id: 1,
            title: "Privileged Attestations Overview".into(),
            completed: 100.0,
            pending: 0.0,
            auto_closed: 0.0,
            rows: rows(&[
                ("PRIVILEGED ACCOUNT ATTESTATION FOR VOID/SUSANMARTIN_R2025-06-23", "Autoclosed"),
                ("PRIVILEGED ACCOUNT ATTESTATION FOR CORP/SUSANMARTIN_RI06-23-2025 20:25", "Autoclosed"),
                ("PRIVILEGED ACCOUNT ATTESTATION FOR CORP/SUSANMARTIN_RI06-23-2025 20:26:004", "Autoclosed"),
            ]),
        },
        AttestationCard {
            id: 2,
            title: "Decentralized Attestations Overview".into(),
            completed: 40.0,
            pending: 40.0,
            auto_closed: 20.0,
            rows: rows(&[
                ("DECENTRALIZED ACCOUNT ATTESTATION FOR CORP/SUSANMARTIN_RI06-23-2025 20:26:004", "Completed"),
                ("PRIVILEGED ACCOUNT ATTESTATION FOR CORP/SUSANMARTIN_RI06-23-2025 20:25", "Pending"),
                ("DECENTRALIZED ACCOUNT ATTESTATION FOR CORP/JOHNDOE_RI07-15-2025 10:10:101", "Pending"),
                ("DECENTRALIZED ACCOUNT ATTESTATION FOR CORP/JOHNDOE_RI07-15-2025 10:10:102", "Approved"),
                ("DECENTRALIZED ACCOUNT ATTESTATION FOR CORP/JOHNDOE_RI07-15-2025 10:10:103", "Rejected"),
            ]),
        },
        AttestationCard {
            id: 3,
            title: "Birthright Attestations Overview".into(),
            completed: 60.0,
            pending: 30.0,
            auto_closed: 10.0,
            rows: rows(&[
                ("BIRTHRIGHT ATTESTATION FOR PZEZ8 - ALL_PORTMOUTH_STAFF_DLL_BR", "Pending"),
                ("BIRTHRIGHT ATTESTATION FOR PZEZ8 11/13/2025", "Pending"),
                ("BIRTHRIGHT ATTESTATION FOR PZEZ8 11/13/2025 - 1", "Pending"),
            ]),
        },
        AttestationCard {
            id: 4,
            title: "Application Attestations Overview".into(),
            completed: 45.0,
            pending: 50.0,
            auto_closed: 5.0,
            rows: rows(&[
                ("APPLICATION ATTESTATION FOR IAM (2024-06-21)", "Pending"),
                ("APPLICATION ATTESTATION FOR IAM (2024-06-21)-1", "Pending"),
                ("APPLICATION ATTESTATION FOR IAM (2024-06-21)-2", "Pending"),
            ]),
        },
    ]
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Upper bound on arc samples per slice.
pub const MAX_SEGMENTS: usize = 4096;
/// Camera distance range kept well inside the camera's clip planes.
const CAMERA_DISTANCE: (f32, f32) = (0.5, 500.0);

/// Replace `value` with `fallback` when `valid` rejects it, logging the swap.
fn check<T>(token: &str, value: &mut T, fallback: T, valid: impl Fn(&T) -> bool)
where
    T: std::fmt::Debug,
{
    if !valid(value) {
        tracing::warn!(target: "config", token, rejected = ?value, using = ?fallback, "chart token out of range");
        *value = fallback;
    }
}

fn positive_f32(v: &f32) -> bool {
    v.is_finite() && *v > 0.0
}

fn non_negative_f32(v: &f32) -> bool {
    v.is_finite() && *v >= 0.0
}

fn non_negative_f64(v: &f64) -> bool {
    v.is_finite() && *v >= 0.0
}

impl ChartTokens {
    /// Tokens with every out-of-range value replaced. `segments` is clamped
    /// to `1..=MAX_SEGMENTS`; other bad values fall back to their defaults.
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();

        let segments = self.segments.clamp(1, MAX_SEGMENTS);
        if segments != self.segments {
            tracing::warn!(target: "config", token = "segments", rejected = self.segments, using = segments, "chart token out of range");
            self.segments = segments;
        }

        check("radius", &mut self.radius, d.radius, positive_f32);
        check("depth", &mut self.depth, d.depth, positive_f32);
        check("leader_out", &mut self.leader_out, d.leader_out, non_negative_f32);
        check("leader_horizontal", &mut self.leader_horizontal, d.leader_horizontal, non_negative_f32);
        check("fov_deg", &mut self.fov_deg, d.fov_deg, |v| v.is_finite() && *v >= 1.0 && *v <= 170.0);
        check("camera_distance", &mut self.camera_distance, d.camera_distance, |v| {
            v.is_finite() && *v >= CAMERA_DISTANCE.0 && *v <= CAMERA_DISTANCE.1
        });
        check("drag_sensitivity", &mut self.drag_sensitivity, d.drag_sensitivity, |v| v.is_finite());
        check("idle_threshold_secs", &mut self.idle_threshold_secs, d.idle_threshold_secs, non_negative_f64);
        check("auto_rotate_step", &mut self.auto_rotate_step, d.auto_rotate_step, |v| v.is_finite());
        check("pop_distance", &mut self.pop_distance, d.pop_distance, non_negative_f32);
        check("pop_smoothing", &mut self.pop_smoothing, d.pop_smoothing, |v| *v > 0.0 && *v <= 1.0);
        check("marker_length", &mut self.marker_length, d.marker_length, positive_f32);
        check("pulse_amplitude", &mut self.pulse_amplitude, d.pulse_amplitude, non_negative_f32);
        check("pulse_rate", &mut self.pulse_rate, d.pulse_rate, non_negative_f64);
        check("label_gap", &mut self.label_gap, d.label_gap, non_negative_f64);
        check("label_font_size", &mut self.label_font_size, d.label_font_size, positive_f32);
        self
    }
}

// ---------------------------------------------------------------------------
// Serialization helpers
// ---------------------------------------------------------------------------

impl DashboardConfig {
    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialize from a TOML string. Chart tokens come back sanitized.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(s)?;
        config.chart = config.chart.sanitized();
        Ok(config)
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Load `path`, falling back to defaults when it is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!(target: "config", path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(target: "config", "{e:#}; using defaults");
                Self::default()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reproduce_stock_dashboard() {
        let c = DashboardConfig::default();
        assert_eq!(c.stats.len(), 4);
        assert_eq!(c.stats[1].label, "Pending Review");
        assert!(c.stats[1].highlight);
        assert_eq!(c.attestations.len(), 4);

        let decentralized = &c.attestations[1];
        assert!((decentralized.completed - 40.0).abs() < f64::EPSILON);
        assert!((decentralized.auto_closed - 20.0).abs() < f64::EPSILON);
        assert_eq!(decentralized.rows.len(), 5);

        assert_eq!(c.chart.segments, 256);
        assert!((c.chart.idle_threshold_secs - 3.0).abs() < f64::EPSILON);
        assert!(c.sidebar.open);
        assert_eq!(c.sidebar.items.len(), 7);
    }

    #[test]
    fn toml_roundtrip() {
        let original = DashboardConfig::default();
        let parsed = DashboardConfig::from_toml(&original.to_toml()).expect("roundtrip parse failed");
        assert_eq!(parsed, original);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let partial = r#"
[chart]
segments = 64
drag_sensitivity = 0.02
"#;
        let c = DashboardConfig::from_toml(partial).expect("partial parse failed");
        assert_eq!(c.chart.segments, 64);
        assert!((c.chart.drag_sensitivity - 0.02).abs() < f32::EPSILON);
        assert!((c.chart.radius - 1.2).abs() < f32::EPSILON);
        assert_eq!(c.attestations.len(), 4);
    }

    #[test]
    fn attestation_override_replaces_list() {
        let text = r#"
[[attestations]]
id = 9
title = "Custom"
completed = 1.0
pending = 2.0

[[attestations.rows]]
name = "ROW"
status = "Rejected"
"#;
        let c = DashboardConfig::from_toml(text).expect("parse failed");
        assert_eq!(c.attestations.len(), 1);
        assert_eq!(c.attestations[0].rows[0].status, "Rejected");
        assert!((c.attestations[0].auto_closed).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_chart_tokens_are_replaced() {
        let text = r#"
[chart]
segments = 4294967296
camera_distance = 0.0
pop_smoothing = 1.5
radius = -1.0
depth = nan
drag_sensitivity = 0.02
"#;
        let c = DashboardConfig::from_toml(text).expect("parse failed");
        let d = ChartTokens::default();
        assert_eq!(c.chart.segments, MAX_SEGMENTS);
        assert_eq!(c.chart.camera_distance, d.camera_distance);
        assert_eq!(c.chart.pop_smoothing, d.pop_smoothing);
        assert_eq!(c.chart.radius, d.radius);
        assert_eq!(c.chart.depth, d.depth);
        // In-range values pass through untouched.
        assert!((c.chart.drag_sensitivity - 0.02).abs() < f32::EPSILON);

        let zero = ChartTokens {
            segments: 0,
            ..ChartTokens::default()
        };
        assert_eq!(zero.sanitized().segments, 1);
        assert_eq!(ChartTokens::default().sanitized(), ChartTokens::default());
    }

    #[test]
    fn invalid_toml_errors() {
        assert!(DashboardConfig::from_toml("this is not [[ valid toml").is_err());
    }

    #[test]
    fn load_or_default_handles_missing_and_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert_eq!(DashboardConfig::load_or_default(&missing), DashboardConfig::default());

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[chart\nradius = ").unwrap();
        assert!(DashboardConfig::load(&broken).is_err());
        assert_eq!(DashboardConfig::load_or_default(&broken), DashboardConfig::default());

        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[sidebar]\nopen = false\n").unwrap();
        assert!(!DashboardConfig::load_or_default(&good).sidebar.open);
    }
}
