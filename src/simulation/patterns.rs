//! Synthetic waveforms for simulated measurements

/// Shape of a simulated signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    /// Constant value
    Constant(f64),
    /// Sine wave with frequency (Hz) and amplitude
    Sine { frequency: f64, amplitude: f64 },
    /// Counter that steps once per sample and wraps inside `[min, max]`
    Counter { step: f64, min: f64, max: f64 },
    /// Uniform values within range
    Random { min: f64, max: f64 },
    /// Ramp from 0 to `amplitude` every `period` seconds
    Sawtooth { period: f64, amplitude: f64 },
    /// Alternates between `amplitude` and `-amplitude`
    Square { period: f64, amplitude: f64 },
    /// Linear ramp between `-amplitude` and `amplitude`
    Triangle { period: f64, amplitude: f64 },
}

impl Default for Waveform {
    fn default() -> Self {
        Waveform::Sine {
            frequency: 0.1,
            amplitude: 1.0,
        }
    }
}

/// Small xorshift generator; each signal owns one so output is reproducible
#[derive(Debug, Clone)]
pub struct Xorshift(u64);

impl Xorshift {
    pub fn new(seed: u64) -> Self {
        // Zero is a fixed point of xorshift
        Self(seed.max(1))
    }

    /// Next value in `[0, 1]`
    pub fn next_f64(&mut self) -> f64 {
        let mut s = self.0;
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        self.0 = s;
        (s as f64) / (u64::MAX as f64)
    }
}

/// Produces samples of one simulated signal
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    pub waveform: Waveform,
    /// Added to every sample
    pub offset: f64,
    /// Peak of the uniform noise added to every sample (0.0 = no noise)
    pub noise_amplitude: f64,
    counter_value: f64,
    rng: Xorshift,
}

impl SignalGenerator {
    pub fn new(waveform: Waveform) -> Self {
        let counter_value = match waveform {
            Waveform::Counter { min, .. } => min,
            _ => 0.0,
        };

        Self {
            waveform,
            offset: 0.0,
            noise_amplitude: 0.0,
            counter_value,
            rng: Xorshift::new(12345),
        }
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_noise(mut self, amplitude: f64) -> Self {
        self.noise_amplitude = amplitude;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Xorshift::new(seed);
        self
    }

    /// Sample at `elapsed_secs` since the start of the stream
    pub fn sample(&mut self, elapsed_secs: f64) -> f64 {
        let base = match self.waveform {
            Waveform::Constant(v) => v,
            Waveform::Sine {
                frequency,
                amplitude,
            } => amplitude * (2.0 * std::f64::consts::PI * frequency * elapsed_secs).sin(),
            Waveform::Counter { step, min, max } => {
                let value = self.counter_value;
                self.counter_value += step;
                if self.counter_value > max {
                    self.counter_value = min;
                } else if self.counter_value < min {
                    self.counter_value = max;
                }
                value
            }
            Waveform::Random { min, max } => min + self.rng.next_f64() * (max - min),
            Waveform::Sawtooth { period, amplitude } => {
                let t = elapsed_secs.rem_euclid(period);
                amplitude * (t / period)
            }
            Waveform::Square { period, amplitude } => {
                let t = elapsed_secs.rem_euclid(period);
                if t < period / 2.0 {
                    amplitude
                } else {
                    -amplitude
                }
            }
            Waveform::Triangle { period, amplitude } => {
                let t = elapsed_secs.rem_euclid(period);
                let half = period / 2.0;
                if t < half {
                    amplitude * (2.0 * t / half - 1.0)
                } else {
                    amplitude * (1.0 - 2.0 * (t - half) / half)
                }
            }
        };

        let noise = if self.noise_amplitude > 0.0 {
            (self.rng.next_f64() - 0.5) * 2.0 * self.noise_amplitude
        } else {
            0.0
        };

        self.offset + base + noise
    }
}
