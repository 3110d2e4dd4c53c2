//! The synthetic device fleet published by [`SimulatedPublisher`](super::SimulatedPublisher)

use super::patterns::{SignalGenerator, Waveform};
use crate::metadata::{DeviceMetadata, MeasurementMetadata, MetadataCatalog, PhasorReference};
use crate::types::{PhasorType, SignalId, SignalKind, SignalType};

const DEVICE_ACRONYMS: &[&str] = &[
    "SHELBY",
    "CORDOVA",
    "MILLINGTON",
    "COLLIERVILLE",
    "GERMANTOWN",
    "ARLINGTON",
    "BARTLETT",
    "LAKELAND",
];

/// Voltage phasor source index on every simulated device
const VOLTAGE_PHASOR: u16 = 1;
/// Current phasor source index on every simulated device
const CURRENT_PHASOR: u16 = 2;

/// One published measurement
#[derive(Debug, Clone)]
pub struct SimulatedSignal {
    pub signal_id: SignalId,
    pub signal_type: SignalType,
    pub generator: SignalGenerator,
}

/// Devices, their measurements and the matching metadata
#[derive(Debug, Clone)]
pub struct SimulatedFleet {
    signals: Vec<SimulatedSignal>,
    catalog: MetadataCatalog,
}

impl SimulatedFleet {
    /// A fleet of `devices` PMUs, each publishing FREQ, DFDT, VPHM, VPHA,
    /// IPHM, IPHA and ALOG. Device acronyms repeat with a numeric suffix
    /// past the built-in names.
    pub fn new(devices: usize) -> Self {
        let mut fleet = Self {
            signals: Vec::new(),
            catalog: MetadataCatalog::new(),
        };

        for index in 0..devices {
            let base = DEVICE_ACRONYMS[index % DEVICE_ACRONYMS.len()];
            let acronym = match index / DEVICE_ACRONYMS.len() {
                0 => base.to_string(),
                n => format!("{}{}", base, n + 1),
            };
            fleet.add_device(index, &acronym);
        }

        fleet
    }

    fn add_device(&mut self, index: usize, acronym: &str) {
        self.catalog.insert_device(DeviceMetadata {
            acronym: acronym.to_string(),
            name: format!("{} Substation PMU", acronym),
            phasors: vec![
                PhasorReference {
                    source_index: VOLTAGE_PHASOR,
                    label: "BUS1".to_string(),
                    phasor_type: PhasorType::Voltage,
                    phase: '+',
                },
                PhasorReference {
                    source_index: CURRENT_PHASOR,
                    label: "LINE1".to_string(),
                    phasor_type: PhasorType::Current,
                    phase: '+',
                },
            ],
        });

        // Devices drift apart slightly so traces don't overlap exactly
        let skew = index as f64;
        let seed = (index as u64 + 1) * 7919;

        let frequency = SignalGenerator::new(Waveform::Sine {
            frequency: 0.05 + 0.01 * skew,
            amplitude: 0.02,
        })
        .with_offset(60.0)
        .with_noise(0.002);

        let dfdt = SignalGenerator::new(Waveform::Random {
            min: -0.01,
            max: 0.01,
        });

        let voltage_magnitude = SignalGenerator::new(Waveform::Sine {
            frequency: 0.02,
            amplitude: 1500.0,
        })
        .with_offset(500_000.0 - 2_000.0 * skew)
        .with_noise(150.0);

        let voltage_angle = SignalGenerator::new(Waveform::Counter {
            step: 0.6 + 0.1 * skew,
            min: -180.0,
            max: 180.0,
        });

        let current_magnitude = SignalGenerator::new(Waveform::Square {
            period: 20.0 + 5.0 * skew,
            amplitude: 40.0,
        })
        .with_offset(800.0 + 25.0 * skew)
        .with_noise(5.0);

        let current_angle = SignalGenerator::new(Waveform::Triangle {
            period: 30.0,
            amplitude: 170.0,
        });

        let analog = SignalGenerator::new(Waveform::Sawtooth {
            period: 12.0,
            amplitude: 10.0,
        })
        .with_offset(20.0 + skew)
        .with_noise(0.2);

        let signals = [
            (SignalKind::Frequency, None, "FQ", "Frequency", frequency),
            (SignalKind::DfDt, None, "DF", "Frequency Delta (dF/dt)", dfdt),
            (
                SignalKind::Magnitude,
                Some(VOLTAGE_PHASOR),
                "PM1",
                "BUS1 Voltage Magnitude",
                voltage_magnitude,
            ),
            (
                SignalKind::Angle,
                Some(VOLTAGE_PHASOR),
                "PA1",
                "BUS1 Voltage Phase Angle",
                voltage_angle,
            ),
            (
                SignalKind::Magnitude,
                Some(CURRENT_PHASOR),
                "PM2",
                "LINE1 Current Magnitude",
                current_magnitude,
            ),
            (
                SignalKind::Angle,
                Some(CURRENT_PHASOR),
                "PA2",
                "LINE1 Current Phase Angle",
                current_angle,
            ),
            (SignalKind::Analog, None, "AV1", "Transformer Temperature", analog),
        ];

        for (offset, (kind, phasor, suffix, description, generator)) in
            signals.into_iter().enumerate()
        {
            let signal_id = SignalId::new_random();
            let point_id = self.signals.len() + 1;
            let reference = format!("{}-{}", acronym, suffix);

            let mut record = MeasurementMetadata::new(signal_id, kind);
            record.measurement_key = format!("PPA:{}", point_id);
            record.device_acronym = acronym.to_string();
            record.point_tag = format!("GPA_{}:{}", acronym, suffix);
            record.signal_reference = reference;
            record.description = format!("{} {}", acronym, description);
            record.phasor_source_index = phasor;
            self.catalog.insert_measurement(record);

            let signal_type = self
                .catalog
                .signal_type(signal_id)
                .unwrap_or(SignalType::Unkn);

            self.signals.push(SimulatedSignal {
                signal_id,
                signal_type,
                generator: generator.with_seed(seed + offset as u64),
            });
        }
    }

    /// Signals in publication order
    pub fn signals(&self) -> &[SimulatedSignal] {
        &self.signals
    }

    pub fn signals_mut(&mut self) -> &mut [SimulatedSignal] {
        &mut self.signals
    }

    pub fn catalog(&self) -> &MetadataCatalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}
