//! Live audio capture.
//!
//! Captures from a system device with cpal into a ring buffer holding one
//! analyser window, and analyses that window whenever the engine asks for a
//! snapshot.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::device_query::DeviceQuery;
use super::spectrum::{AnalyserSettings, FrequencySnapshot, SpectrumSampler, SpectrumSource};
use crate::error::{Result, StormError};

/// How long to wait for a device to report its config (some hang forever)
const DEVICE_TIMEOUT: Duration = Duration::from_secs(3);

pub struct DeviceInfo {
    pub device: cpal::Device,
    pub name: String,
    pub is_input: bool,
}

pub struct CaptureSource {
    buffer: Arc<Mutex<VecDeque<f32>>>,
    devices: Vec<DeviceInfo>,
    current_device: usize,
    _stream: Option<Stream>,
    sampler: SpectrumSampler,
    window: Vec<f32>,
}

impl CaptureSource {
    /// Open the device `query` selects (an error when nothing matches), or
    /// without a query the first pipewire/pulse input, else the first input.
    pub fn new(settings: AnalyserSettings, query: Option<&DeviceQuery>) -> Result<Self> {
        let sampler = SpectrumSampler::new(settings)?;
        let capacity = settings.fft_size;
        let buffer = Arc::new(Mutex::new(VecDeque::from(vec![0.0; capacity])));
        let devices = Self::collect_devices();

        if devices.is_empty() {
            return Err(StormError::Device("no audio devices found".to_string()));
        }

        let start_index = match query {
            Some(query) => {
                let names: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
                query.resolve(&names).ok_or_else(|| {
                    StormError::Device(format!("no capture device matches {}", query))
                })?
            }
            None => devices
                .iter()
                .position(|d| d.is_input && d.name == "pipewire")
                .or_else(|| devices.iter().position(|d| d.is_input && d.name == "pulse"))
                .or_else(|| devices.iter().position(|d| d.is_input))
                .unwrap_or(0),
        };

        let stream = Self::build_stream(&devices[start_index], Arc::clone(&buffer), capacity)
            .ok_or_else(|| {
                StormError::Device(format!("could not open {}", devices[start_index].name))
            })?;

        let info = &devices[start_index];
        tracing::info!(
            index = start_index,
            device = %info.name,
            input = info.is_input,
            "capturing audio"
        );

        Ok(Self {
            buffer,
            devices,
            current_device: start_index,
            _stream: Some(stream),
            sampler,
            window: Vec::with_capacity(capacity),
        })
    }

    /// Name of the device being captured
    pub fn device_name(&self) -> &str {
        &self.devices[self.current_device].name
    }

    /// Names of every capture candidate, in selection-index order
    pub fn list_devices() -> Vec<String> {
        Self::collect_devices()
            .into_iter()
            .map(|d| {
                let kind = if d.is_input { "input" } else { "output" };
                format!("{} ({})", d.name, kind)
            })
            .collect()
    }

    fn collect_devices() -> Vec<DeviceInfo> {
        let host = cpal::default_host();
        let mut devices = Vec::new();

        if let Ok(input_devices) = host.input_devices() {
            for device in input_devices {
                if let Ok(name) = device.name() {
                    devices.push(DeviceInfo {
                        device,
                        name,
                        is_input: true,
                    });
                }
            }
        }

        if let Ok(output_devices) = host.output_devices() {
            for device in output_devices {
                if let Ok(name) = device.name() {
                    devices.push(DeviceInfo {
                        device,
                        name,
                        is_input: false,
                    });
                }
            }
        }

        devices
    }

    /// Get device config with timeout (the config call often hangs on bad devices)
    fn get_config_with_timeout(device: &Device, is_input: bool) -> Option<StreamConfig> {
        let device_clone = device.clone();
        let (tx, rx) = std::sync::mpsc::channel();

        std::thread::spawn(move || {
            let config = if is_input {
                device_clone.default_input_config()
            } else {
                device_clone.default_output_config()
            };
            let _ = tx.send(config);
        });

        match rx.recv_timeout(DEVICE_TIMEOUT) {
            Ok(Ok(config)) => Some(config.into()),
            Ok(Err(e)) => {
                tracing::warn!("failed to get device config: {}", e);
                None
            }
            Err(_) => {
                tracing::warn!("device config timed out after {:?}", DEVICE_TIMEOUT);
                None
            }
        }
    }

    fn build_stream(
        device_info: &DeviceInfo,
        audio_buffer: Arc<Mutex<VecDeque<f32>>>,
        capacity: usize,
    ) -> Option<Stream> {
        let stream_config =
            Self::get_config_with_timeout(&device_info.device, device_info.is_input)?;
        let channels = (stream_config.channels as usize).max(1);

        let err_fn = |err| tracing::error!("audio stream error: {}", err);

        let stream = device_info.device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buffer) = audio_buffer.lock() {
                    for chunk in data.chunks(channels) {
                        let sample: f32 = chunk.iter().sum::<f32>() / chunk.len() as f32;
                        buffer.push_back(sample);
                        if buffer.len() > capacity {
                            buffer.pop_front();
                        }
                    }
                }
            },
            err_fn,
            None,
        );

        match stream {
            Ok(s) => {
                if let Err(e) = s.play() {
                    tracing::warn!("failed to play stream: {}", e);
                    return None;
                }
                Some(s)
            }
            Err(e) => {
                tracing::warn!("failed to build stream: {}", e);
                None
            }
        }
    }
}

impl SpectrumSource for CaptureSource {
    fn frequency_snapshot(&mut self) -> Option<FrequencySnapshot> {
        self._stream.as_ref()?;
        {
            let buffer = self.buffer.lock().ok()?;
            self.window.clear();
            self.window.extend(buffer.iter());
        }
        Some(self.sampler.analyze(&self.window))
    }
}
