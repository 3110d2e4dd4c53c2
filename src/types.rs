//! Core data types for gridlines-rs
//!
//! This module contains the fundamental data structures shared by the
//! ingestion path, the graph core and the subscription controller.
//!
//! # Main Types
//!
//! - [`SignalId`] - Globally unique 128-bit signal identity
//! - [`Measurement`] - A single timestamped value for one signal
//! - [`SignalKind`] / [`PhasorType`] - Coarse metadata classification inputs
//! - [`SignalType`] - Classification acronym used as the scale-group key
//! - [`LineColor`] - RGBA color assigned to a trace
//!
//! # Absent Samples
//!
//! Window slots that have not received data yet hold [`ABSENT`] (NaN). It is
//! never produced by a real measurement that made it through ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Sentinel for a window slot that has no data
pub const ABSENT: f64 = f64::NAN;

/// Scale-group key used for signals without resolvable metadata
pub const UNKNOWN_SIGNAL_TYPE_KEY: &str = "UNKNOWN";

/// Globally unique, immutable signal identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalId(Uuid);

impl SignalId {
    /// Wrap an existing UUID
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a fresh random identity
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic identity from a 128-bit value (handy for fixtures)
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SignalId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A single decoded measurement, immutable once created
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Signal this value belongs to
    pub signal_id: SignalId,
    /// Measured value
    pub value: f64,
    /// Source timestamp
    pub timestamp: DateTime<Utc>,
}

impl Measurement {
    /// Create a new measurement
    pub fn new(signal_id: SignalId, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            signal_id,
            value,
            timestamp,
        }
    }

    /// Create a measurement stamped with the current time
    pub fn now(signal_id: SignalId, value: f64) -> Self {
        Self::new(signal_id, value, Utc::now())
    }
}

/// Ordered sequence of measurements as delivered by the provider
pub type MeasurementBatch = Vec<Measurement>;

/// Process-unique identity of one rolling buffer instance
///
/// Buffers are never reused across epochs, so two epochs never share a
/// `BufferId` even when they track the same signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

impl BufferId {
    pub(crate) fn next() -> Self {
        Self(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Sequence number of a subscription epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct EpochId(pub u64);

impl EpochId {
    /// The epoch that follows this one
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for EpochId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a measurement as published in metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SignalKind {
    Angle,
    Magnitude,
    Frequency,
    DfDt,
    Status,
    Digital,
    Analog,
    Calculation,
    Statistic,
    Alarm,
    Quality,
    #[default]
    Unknown,
}

/// Phasor type for angle/magnitude measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhasorType {
    Voltage,
    Current,
}

/// Signal type classification
///
/// The acronym doubles as the scale-group key: all signals of one type share
/// a single auto-scaled display range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalType {
    /// Current phasor magnitude
    Iphm,
    /// Current phasor angle
    Ipha,
    /// Voltage phasor magnitude
    Vphm,
    /// Voltage phasor angle
    Vpha,
    /// Frequency
    Freq,
    /// Frequency delta (dF/dt)
    Dfdt,
    /// Analog value
    Alog,
    /// Status flags
    Flag,
    /// Digital value
    Digi,
    /// Calculated value
    Calc,
    /// Statistic
    Stat,
    /// Alarm
    Alrm,
    /// Quality flags
    Qual,
    /// Unknown type
    Unkn,
}

impl SignalType {
    /// Every known classification
    pub fn all() -> &'static [SignalType] {
        &[
            SignalType::Iphm,
            SignalType::Ipha,
            SignalType::Vphm,
            SignalType::Vpha,
            SignalType::Freq,
            SignalType::Dfdt,
            SignalType::Alog,
            SignalType::Flag,
            SignalType::Digi,
            SignalType::Calc,
            SignalType::Stat,
            SignalType::Alrm,
            SignalType::Qual,
            SignalType::Unkn,
        ]
    }

    /// Four-letter acronym
    pub fn acronym(&self) -> &'static str {
        match self {
            SignalType::Iphm => "IPHM",
            SignalType::Ipha => "IPHA",
            SignalType::Vphm => "VPHM",
            SignalType::Vpha => "VPHA",
            SignalType::Freq => "FREQ",
            SignalType::Dfdt => "DFDT",
            SignalType::Alog => "ALOG",
            SignalType::Flag => "FLAG",
            SignalType::Digi => "DIGI",
            SignalType::Calc => "CALC",
            SignalType::Stat => "STAT",
            SignalType::Alrm => "ALRM",
            SignalType::Qual => "QUAL",
            SignalType::Unkn => "UNKN",
        }
    }

    /// Parse an acronym (case-insensitive)
    pub fn from_acronym(acronym: &str) -> Option<SignalType> {
        let acronym = acronym.trim();
        SignalType::all()
            .iter()
            .copied()
            .find(|t| t.acronym().eq_ignore_ascii_case(acronym))
    }

    /// Classify a measurement from its kind and, for phasor quantities, the
    /// type of the phasor it belongs to.
    pub fn classify(kind: SignalKind, phasor: Option<PhasorType>) -> SignalType {
        match (kind, phasor) {
            (SignalKind::Angle, Some(PhasorType::Current)) => SignalType::Ipha,
            (SignalKind::Angle, _) => SignalType::Vpha,
            (SignalKind::Magnitude, Some(PhasorType::Current)) => SignalType::Iphm,
            (SignalKind::Magnitude, _) => SignalType::Vphm,
            (SignalKind::Frequency, _) => SignalType::Freq,
            (SignalKind::DfDt, _) => SignalType::Dfdt,
            (SignalKind::Status, _) => SignalType::Flag,
            (SignalKind::Digital, _) => SignalType::Digi,
            (SignalKind::Analog, _) => SignalType::Alog,
            (SignalKind::Calculation, _) => SignalType::Calc,
            (SignalKind::Statistic, _) => SignalType::Stat,
            (SignalKind::Alarm, _) => SignalType::Alrm,
            (SignalKind::Quality, _) => SignalType::Qual,
            (SignalKind::Unknown, _) => SignalType::Unkn,
        }
    }

    /// Whether scale groups of this type narrow back toward recent data
    /// after a quiet period. Angles, flags and digitals jump by design and
    /// keep their widest observed range instead.
    pub fn auto_shrinks(&self) -> bool {
        matches!(
            self,
            SignalType::Iphm
                | SignalType::Vphm
                | SignalType::Freq
                | SignalType::Alog
                | SignalType::Calc
        )
    }
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.acronym())
    }
}

/// RGBA color of a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineColor(pub [u8; 4]);

impl LineColor {
    pub const BLUE: LineColor = LineColor([0, 0, 255, 255]);
    pub const YELLOW: LineColor = LineColor([255, 235, 4, 255]);
    pub const RED: LineColor = LineColor([255, 0, 0, 255]);
    pub const WHITE: LineColor = LineColor([255, 255, 255, 255]);
    pub const CYAN: LineColor = LineColor([0, 255, 255, 255]);
    pub const MAGENTA: LineColor = LineColor([255, 0, 255, 255]);
    pub const BLACK: LineColor = LineColor([0, 0, 0, 255]);
    pub const GRAY: LineColor = LineColor([128, 128, 128, 255]);

    /// Default trace palette, assigned round-robin by line index
    pub fn default_palette() -> Vec<LineColor> {
        vec![
            LineColor::BLUE,
            LineColor::YELLOW,
            LineColor::RED,
            LineColor::WHITE,
            LineColor::CYAN,
            LineColor::MAGENTA,
            LineColor::BLACK,
            LineColor::GRAY,
        ]
    }

    /// Pick the palette entry for a line index; an empty palette falls back
    /// to generated hues.
    pub fn for_index(palette: &[LineColor], index: usize) -> LineColor {
        if palette.is_empty() {
            return LineColor::generate(index as u32);
        }
        palette[index % palette.len()]
    }

    /// Generate a distinct color for an index using golden-ratio hue spacing
    pub fn generate(index: u32) -> LineColor {
        let hue = (index as f32 * 137.508) % 360.0;
        let (r, g, b) = hsv_to_rgb(hue, 0.75, 0.9);
        LineColor([r, g, b, 255])
    }
}

/// Convert HSV (hue 0-360, saturation 0-1, value 0-1) to RGB (u8, u8, u8)
fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> (u8, u8, u8) {
    let c = value * saturation;
    let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
    let m = value - c;

    let (r, g, b) = match (hue / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (
        ((r + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((b + m) * 255.0) as u8,
    )
}
