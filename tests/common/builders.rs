//! Test data builders for creating test objects

use gridlines_rs::config::AppConfig;
use gridlines_rs::metadata::{DeviceMetadata, MeasurementMetadata, MetadataCatalog, PhasorReference};
use gridlines_rs::types::{Measurement, MeasurementBatch, PhasorType, SignalId, SignalKind};
use chrono::{DateTime, Duration, TimeZone, Utc};

/// Deterministic signal id for test number `n`
pub fn signal(n: u128) -> SignalId {
    SignalId::from_u128(n)
}

/// Signal ids `1..=count`
pub fn signals(count: u128) -> Vec<SignalId> {
    (1..=count).map(signal).collect()
}

/// Builder for a metadata catalog with one device
pub struct CatalogBuilder {
    device: String,
    catalog: MetadataCatalog,
}

impl CatalogBuilder {
    pub fn new(device: &str) -> Self {
        let mut catalog = MetadataCatalog::new();
        catalog.insert_device(DeviceMetadata {
            acronym: device.to_string(),
            name: format!("{} PMU", device),
            phasors: vec![
                PhasorReference {
                    source_index: 1,
                    label: "BUS1".to_string(),
                    phasor_type: PhasorType::Voltage,
                    phase: '+',
                },
                PhasorReference {
                    source_index: 2,
                    label: "LINE1".to_string(),
                    phasor_type: PhasorType::Current,
                    phase: '+',
                },
            ],
        });

        Self {
            device: device.to_string(),
            catalog,
        }
    }

    /// Add a measurement; `phasor` is the source index for angles and magnitudes
    pub fn measurement(
        mut self,
        signal_id: SignalId,
        kind: SignalKind,
        phasor: Option<u16>,
        tag: &str,
    ) -> Self {
        let mut record = MeasurementMetadata::new(signal_id, kind);
        record.device_acronym = self.device.clone();
        record.point_tag = tag.to_string();
        record.signal_reference = tag.to_string();
        record.description = format!("{} {}", self.device, tag);
        record.phasor_source_index = phasor;
        self.catalog.insert_measurement(record);
        self
    }

    pub fn build(self) -> MetadataCatalog {
        self.catalog
    }
}

/// Builder for measurement batches with evenly spaced timestamps
pub struct BatchBuilder {
    start: DateTime<Utc>,
    step: Duration,
    measurements: MeasurementBatch,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self {
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            step: Duration::milliseconds(33),
            measurements: Vec::new(),
        }
    }

    pub fn value(mut self, signal_id: SignalId, value: f64) -> Self {
        let timestamp = self.start + self.step * self.measurements.len() as i32;
        self.measurements
            .push(Measurement::new(signal_id, value, timestamp));
        self
    }

    pub fn build(self) -> MeasurementBatch {
        self.measurements
    }
}

/// Default config that waits for an explicit subscribe after connecting
pub fn manual_subscribe_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.subscription.subscribe_on_connect = false;
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_builder() {
        let batch = BatchBuilder::new()
            .value(signal(1), 1.0)
            .value(signal(2), 2.0)
            .build();

        assert_eq!(batch.len(), 2);
        assert!(batch[0].timestamp < batch[1].timestamp);
    }
}
