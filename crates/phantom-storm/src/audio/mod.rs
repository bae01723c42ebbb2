mod bands;
mod device_query;
mod onset;
#[cfg(feature = "capture")]
mod source_pipe;
mod spectrum;
mod threshold;
mod trigger;
mod wav_source;

pub use bands::{BandAggregator, BandEnergies, BandLayout, DEFAULT_NOISE_FLOOR, NUM_REGIONS};
pub use device_query::DeviceQuery;
pub use onset::{
    Band, BandHistory, OnsetDetector, OnsetIncreases, DEFAULT_RECENT_AVERAGE, HISTORY_CAPACITY,
};
#[cfg(feature = "capture")]
pub use source_pipe::CaptureSource;
pub use spectrum::{
    AnalyserSettings, FrequencySnapshot, SpectrumSampler, SpectrumSource, REFERENCE_BINS,
};
pub use threshold::{ThresholdEngine, DEFAULT_MIN_THRESHOLD, DEFAULT_SENSITIVITY};
pub use trigger::is_musical_peak;
pub use wav_source::WavSource;
