//! Offline spectrum source reading a WAV track.
//!
//! The whole track is loaded and downmixed to mono up front; each frame
//! advances the play head by `sample_rate / frame_rate` samples and runs the
//! analyser over the samples just before it.

use std::path::Path;

use super::spectrum::{AnalyserSettings, FrequencySnapshot, SpectrumSampler, SpectrumSource};
use crate::error::{Result, StormError};

pub struct WavSource {
    samples: Vec<f32>,
    sample_rate: u32,
    samples_per_frame: usize,
    position: usize,
    sampler: SpectrumSampler,
}

impl WavSource {
    pub fn open(path: impl AsRef<Path>, frame_rate: f32, settings: AnalyserSettings) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<_, _>>()?
            }
        };

        let mono: Vec<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();

        tracing::debug!(
            path = %path.display(),
            sample_rate = spec.sample_rate,
            channels,
            seconds = mono.len() as f32 / spec.sample_rate.max(1) as f32,
            "loaded track"
        );

        Self::from_samples(mono, spec.sample_rate, frame_rate, settings)
    }

    /// Build from mono samples already in memory
    pub fn from_samples(
        samples: Vec<f32>,
        sample_rate: u32,
        frame_rate: f32,
        settings: AnalyserSettings,
    ) -> Result<Self> {
        if sample_rate == 0 {
            return Err(StormError::InvalidSource("sample rate is zero".to_string()));
        }
        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            return Err(StormError::InvalidSource(format!(
                "frame rate {} must be positive",
                frame_rate
            )));
        }

        let samples_per_frame = ((sample_rate as f32 / frame_rate).round() as usize).max(1);

        Ok(Self {
            samples,
            sample_rate,
            samples_per_frame,
            position: 0,
            sampler: SpectrumSampler::new(settings)?,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames the track lasts at the configured frame rate
    pub fn total_frames(&self) -> usize {
        self.samples.len().div_ceil(self.samples_per_frame)
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.samples.len()
    }

    /// Back to the start of the track with a clean analyser
    pub fn rewind(&mut self) {
        self.position = 0;
        self.sampler.reset();
    }
}

impl SpectrumSource for WavSource {
    fn frequency_snapshot(&mut self) -> Option<FrequencySnapshot> {
        if self.is_finished() {
            return None;
        }
        self.position = (self.position + self.samples_per_frame).min(self.samples.len());
        Some(self.sampler.analyze(&self.samples[..self.position]))
    }
}
