//! Publisher metadata and signal classification
//!
//! The publisher describes every measurement it can stream, and the devices
//! (with their phasors) those measurements come from. The catalog resolves a
//! [`SignalId`] to the [`SignalType`] used as its scale-group key.
//!
//! # Main Types
//!
//! - [`MetadataCatalog`] - Lookup tables for measurements and devices
//! - [`MeasurementMetadata`] - One measurement record
//! - [`DeviceMetadata`] / [`PhasorReference`] - Device and phasor records
//! - [`LegendFormatter`] - Template-driven legend text

pub mod legend;

pub use legend::{LegendField, LegendFormatter};

use crate::types::{PhasorType, SignalId, SignalKind, SignalType};
use std::collections::HashMap;

/// One measurement record
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementMetadata {
    pub signal_id: SignalId,
    /// Source-qualified point key, e.g. `PPA:12`
    pub measurement_key: String,
    pub device_acronym: String,
    pub point_tag: String,
    pub signal_reference: String,
    pub description: String,
    /// 1-based index of the phasor this angle/magnitude belongs to
    pub phasor_source_index: Option<u16>,
    pub kind: SignalKind,
    pub adder: f64,
    pub multiplier: f64,
}

impl MeasurementMetadata {
    /// A bare record with only an identity and a kind
    pub fn new(signal_id: SignalId, kind: SignalKind) -> Self {
        Self {
            signal_id,
            measurement_key: String::new(),
            device_acronym: String::new(),
            point_tag: String::new(),
            signal_reference: String::new(),
            description: String::new(),
            phasor_source_index: None,
            kind,
            adder: 0.0,
            multiplier: 1.0,
        }
    }
}

/// A phasor published by a device
#[derive(Debug, Clone, PartialEq)]
pub struct PhasorReference {
    pub source_index: u16,
    pub label: String,
    pub phasor_type: PhasorType,
    /// Phase designation such as `A`, `B`, `C` or `+`
    pub phase: char,
}

/// One device record
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceMetadata {
    pub acronym: String,
    pub name: String,
    pub phasors: Vec<PhasorReference>,
}

impl DeviceMetadata {
    pub fn phasor(&self, source_index: u16) -> Option<&PhasorReference> {
        self.phasors.iter().find(|p| p.source_index == source_index)
    }
}

/// Measurement and device lookup tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataCatalog {
    measurements: HashMap<SignalId, MeasurementMetadata>,
    devices: HashMap<String, DeviceMetadata>,
}

impl MetadataCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_measurement(&mut self, record: MeasurementMetadata) {
        self.measurements.insert(record.signal_id, record);
    }

    pub fn insert_device(&mut self, device: DeviceMetadata) {
        self.devices.insert(device.acronym.to_ascii_uppercase(), device);
    }

    pub fn measurement(&self, signal_id: SignalId) -> Option<&MeasurementMetadata> {
        self.measurements.get(&signal_id)
    }

    /// Device by acronym (case-insensitive)
    pub fn device(&self, acronym: &str) -> Option<&DeviceMetadata> {
        self.devices.get(&acronym.to_ascii_uppercase())
    }

    /// Phasor type of an angle/magnitude measurement, when it can be resolved
    pub fn phasor_type(&self, record: &MeasurementMetadata) -> Option<PhasorType> {
        let index = record.phasor_source_index?;
        self.device(&record.device_acronym)?
            .phasor(index)
            .map(|p| p.phasor_type)
    }

    /// Classification of a signal; `None` without a measurement record
    pub fn signal_type(&self, signal_id: SignalId) -> Option<SignalType> {
        let record = self.measurement(signal_id)?;
        Some(SignalType::classify(record.kind, self.phasor_type(record)))
    }

    /// Every measurement record, in no particular order
    pub fn measurements(&self) -> impl Iterator<Item = &MeasurementMetadata> {
        self.measurements.values()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> MetadataCatalog {
        let mut catalog = MetadataCatalog::new();
        catalog.insert_device(DeviceMetadata {
            acronym: "SHELBY".to_string(),
            name: "Shelby PMU".to_string(),
            phasors: vec![
                PhasorReference {
                    source_index: 1,
                    label: "Bus 1".to_string(),
                    phasor_type: PhasorType::Voltage,
                    phase: '+',
                },
                PhasorReference {
                    source_index: 2,
                    label: "Line 1".to_string(),
                    phasor_type: PhasorType::Current,
                    phase: '+',
                },
            ],
        });

        for (n, kind, phasor) in [
            (1, SignalKind::Frequency, None),
            (2, SignalKind::Magnitude, Some(1)),
            (3, SignalKind::Magnitude, Some(2)),
            (4, SignalKind::Angle, Some(2)),
        ] {
            catalog.insert_measurement(MeasurementMetadata {
                device_acronym: "shelby".to_string(),
                point_tag: format!("SHELBY:{}", n),
                phasor_source_index: phasor,
                ..MeasurementMetadata::new(SignalId::from_u128(n), kind)
            });
        }
        catalog
    }

    #[test]
    fn test_signal_type_resolution() {
        let catalog = catalog();
        assert_eq!(catalog.signal_type(SignalId::from_u128(1)), Some(SignalType::Freq));
        assert_eq!(catalog.signal_type(SignalId::from_u128(2)), Some(SignalType::Vphm));
        assert_eq!(catalog.signal_type(SignalId::from_u128(3)), Some(SignalType::Iphm));
        assert_eq!(catalog.signal_type(SignalId::from_u128(4)), Some(SignalType::Ipha));
        assert_eq!(catalog.signal_type(SignalId::from_u128(99)), None);
    }

    #[test]
    fn test_device_lookup_ignores_case() {
        let catalog = catalog();
        assert!(catalog.device("Shelby").is_some());
        assert_eq!(catalog.device_count(), 1);
        assert_eq!(catalog.len(), 4);
    }
}
