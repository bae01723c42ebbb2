//! Frequency snapshots and the analyser-style sampler that produces them.
//!
//! The sampler turns raw mono PCM into the byte spectrum the rest of the
//! engine works on: a Blackman-windowed FFT, temporal smoothing of the
//! magnitudes, and a decibel range mapped onto 0-255.

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::error::{Result, StormError};

/// Bin count the band layout was tuned for (fft size 256)
pub const REFERENCE_BINS: usize = 128;

const MIN_FFT_SIZE: usize = 32;
const MAX_FFT_SIZE: usize = 32768;

/// One frame of frequency magnitudes (0-255), lowest frequency first
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrequencySnapshot(Vec<u8>);

impl FrequencySnapshot {
    pub fn new(bins: Vec<u8>) -> Self {
        Self(bins)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for FrequencySnapshot {
    fn from(bins: Vec<u8>) -> Self {
        Self(bins)
    }
}

/// Anything that can hand the engine a spectrum once per frame.
///
/// `None` means the source has nothing this frame (not ready yet, device
/// gone, track over). The engine treats that as a quiet frame.
pub trait SpectrumSource {
    fn frequency_snapshot(&mut self) -> Option<FrequencySnapshot>;
}

/// Analyser parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnalyserSettings {
    /// FFT window length in samples (power of two)
    pub fft_size: usize,
    /// Weight of the previous frame's magnitude (0 = no smoothing)
    pub smoothing_time_constant: f32,
    /// Level mapped to byte 0
    pub min_decibels: f32,
    /// Level mapped to byte 255
    pub max_decibels: f32,
}

impl Default for AnalyserSettings {
    fn default() -> Self {
        Self {
            fft_size: 2 * REFERENCE_BINS,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyserSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two()
            || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&self.fft_size)
        {
            return Err(StormError::InvalidAnalyser(format!(
                "fft size {} is not a power of two in {}..={}",
                self.fft_size, MIN_FFT_SIZE, MAX_FFT_SIZE
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(StormError::InvalidAnalyser(format!(
                "smoothing time constant {} is outside 0..=1",
                self.smoothing_time_constant
            )));
        }
        if !(self.min_decibels < self.max_decibels) {
            return Err(StormError::InvalidAnalyser(format!(
                "min decibels {} must be below max decibels {}",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }

    /// Number of bins in each snapshot
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

/// Spectrum analyser with pre-allocated FFT resources
pub struct SpectrumSampler {
    settings: AnalyserSettings,
    fft: Arc<dyn Fft<f32>>,
    fft_buffer: Vec<Complex<f32>>,
    window: Vec<f32>,
    /// Smoothed linear magnitudes carried between frames
    smoothed: Vec<f32>,
}

impl SpectrumSampler {
    pub fn new(settings: AnalyserSettings) -> Result<Self> {
        settings.validate()?;
        let n = settings.fft_size;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n);

        // Blackman window (alpha = 0.16)
        let window = (0..n)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / n as f32;
                0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
            })
            .collect();

        tracing::debug!(
            fft_size = n,
            bins = settings.bin_count(),
            "spectrum sampler ready"
        );

        Ok(Self {
            settings,
            fft,
            fft_buffer: vec![Complex::new(0.0, 0.0); n],
            window,
            smoothed: vec![0.0; settings.bin_count()],
        })
    }

    pub fn settings(&self) -> &AnalyserSettings {
        &self.settings
    }

    /// Analyze the most recent `fft_size` samples (zero-padded in front when
    /// fewer are available) and return the byte spectrum.
    pub fn analyze(&mut self, samples: &[f32]) -> FrequencySnapshot {
        let n = self.settings.fft_size;
        let tail = &samples[samples.len().saturating_sub(n)..];
        let pad = n - tail.len();

        for (i, slot) in self.fft_buffer.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { tail[i - pad] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.fft_buffer);

        let tau = self.settings.smoothing_time_constant;
        let min_db = self.settings.min_decibels;
        let scale = 255.0 / (self.settings.max_decibels - min_db);

        let mut bins = Vec::with_capacity(self.smoothed.len());
        for (k, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.fft_buffer[k].norm() / n as f32;
            let mut value = tau * *smoothed + (1.0 - tau) * magnitude;
            if !value.is_finite() {
                value = 0.0;
            }
            *smoothed = value;

            let db = 20.0 * value.log10();
            let byte = if db.is_finite() {
                ((db - min_db) * scale).floor().clamp(0.0, 255.0) as u8
            } else {
                0
            };
            bins.push(byte);
        }

        FrequencySnapshot(bins)
    }

    /// Forget smoothing memory (new track, device switch)
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|v| *v = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 44100.0;

    fn sine_at_bin(bin: usize, amplitude: f32, fft_size: usize) -> Vec<f32> {
        let freq = bin as f32 * SAMPLE_RATE / fft_size as f32;
        (0..fft_size)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE).sin())
            .collect()
    }

    #[test]
    fn test_default_settings_match_reference_bins() {
        let sampler = SpectrumSampler::new(AnalyserSettings::default()).unwrap();
        assert_eq!(sampler.settings().bin_count(), REFERENCE_BINS);
    }

    #[test]
    fn test_rejects_bad_settings() {
        for fft_size in [16, 100, 65536] {
            let settings = AnalyserSettings {
                fft_size,
                ..Default::default()
            };
            assert!(SpectrumSampler::new(settings).is_err(), "fft size {fft_size}");
        }

        let inverted = AnalyserSettings {
            min_decibels: -30.0,
            max_decibels: -100.0,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let over_smoothed = AnalyserSettings {
            smoothing_time_constant: 1.5,
            ..Default::default()
        };
        assert!(over_smoothed.validate().is_err());
    }

    #[test]
    fn test_silence_is_all_zero() {
        let mut sampler = SpectrumSampler::new(AnalyserSettings::default()).unwrap();
        let snapshot = sampler.analyze(&[0.0; 256]);
        assert_eq!(snapshot.len(), 128);
        assert!(snapshot.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_short_input_is_zero_padded() {
        let mut sampler = SpectrumSampler::new(AnalyserSettings::default()).unwrap();
        let snapshot = sampler.analyze(&[]);
        assert_eq!(snapshot.len(), 128);
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        let mut sampler = SpectrumSampler::new(AnalyserSettings::default()).unwrap();
        let snapshot = sampler.analyze(&sine_at_bin(10, 0.01, 256));
        let bins = snapshot.as_slice();

        assert!(bins[10] > 0);
        assert!(bins[10] > bins[9]);
        assert!(bins[10] > bins[11]);
        assert!(bins[60] < 20);
    }

    #[test]
    fn test_smoothing_decays_gradually() {
        let mut sampler = SpectrumSampler::new(AnalyserSettings::default()).unwrap();
        let loud = sampler.analyze(&sine_at_bin(10, 0.01, 256)).as_slice()[10];
        let after = sampler.analyze(&[0.0; 256]).as_slice()[10];

        assert!(after > 0, "smoothing should keep some energy");
        assert!(after < loud);

        sampler.reset();
        let cleared = sampler.analyze(&[0.0; 256]).as_slice()[10];
        assert_eq!(cleared, 0);
    }
}
