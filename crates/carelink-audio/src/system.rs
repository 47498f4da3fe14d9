//! Real microphone capture via cpal.
//!
//! On Windows, captures from the configured input device using the WASAPI
//! backend, downmixing to mono and resampling to the target rate in the
//! callback. On other platforms, `open` reports the microphone unavailable.

#[cfg(not(target_os = "windows"))]
use tracing::warn;

use std::sync::atomic::AtomicBool;
#[cfg(target_os = "windows")]
use std::sync::atomic::Ordering;
use std::sync::Arc;
#[cfg(target_os = "windows")]
use std::sync::Mutex;

use carelink_core::error::Result;
#[cfg(not(target_os = "windows"))]
use carelink_core::error::CareError;

use crate::{MicrophoneService, SampleBuffer};

/// Configuration for the system microphone.
#[derive(Debug, Clone)]
pub struct MicConfig {
    /// Name or substring of the input device. "default" selects the system default.
    pub device_name: String,
    /// Sample rate in Hz for the drained samples.
    pub sample_rate: u32,
    /// Maximum seconds of audio to buffer before dropping the oldest.
    pub max_buffer_secs: u32,
}

impl Default for MicConfig {
    fn default() -> Self {
        Self {
            device_name: "default".to_string(),
            sample_rate: 16000,
            max_buffer_secs: 60,
        }
    }
}

/// Wrapper to make `cpal::Stream` usable inside `Mutex` on Windows.
///
/// `cpal::Stream` on Windows contains a `*mut ()` marker that prevents auto
/// `Send`/`Sync`. The stream itself is safe to share via a `Mutex` because
/// we only ever drop it (to stop capture) or store it (to keep it alive).
#[cfg(target_os = "windows")]
struct SendStream(#[allow(dead_code)] cpal::Stream);

// SAFETY: SendStream wraps a cpal::Stream which manages its own audio thread.
// 1. The Stream handle is only used to start/stop playback, not to share data
// 2. Audio callbacks run on a separate OS thread managed by cpal
// 3. No mutable shared state between the Stream handle and callbacks
// 4. This is Windows-only; cpal's WASAPI backend is documented as thread-safe
#[cfg(target_os = "windows")]
unsafe impl Send for SendStream {}
#[cfg(target_os = "windows")]
unsafe impl Sync for SendStream {}

/// System microphone backed by cpal.
///
/// Samples land in a shared buffer drained by the voice engine when the
/// recording stops.
pub struct SystemMicrophone {
    config: MicConfig,
    #[allow(dead_code)] // Used in the Windows impl; the stub ignores it.
    active: Arc<AtomicBool>,
    buffer: SampleBuffer,
    /// The cpal stream is stored here while open. Dropping it stops capture.
    #[cfg(target_os = "windows")]
    stream: Mutex<Option<SendStream>>,
}

impl SystemMicrophone {
    /// Create a system microphone with the given configuration.
    pub fn new(config: MicConfig) -> Self {
        let max_samples = config.sample_rate as usize * config.max_buffer_secs as usize;
        Self {
            config,
            active: Arc::new(AtomicBool::new(false)),
            buffer: SampleBuffer::new(max_samples),
            #[cfg(target_os = "windows")]
            stream: Mutex::new(None),
        }
    }

    /// Get a reference to the microphone configuration.
    pub fn config(&self) -> &MicConfig {
        &self.config
    }
}

// =============================================================================
// Windows implementation
// =============================================================================

#[cfg(target_os = "windows")]
impl MicrophoneService for SystemMicrophone {
    async fn open(&self) -> Result<()> {
        use carelink_core::error::CareError;
        use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
        use tracing::{debug, info};

        if self.active.load(Ordering::Relaxed) {
            return Err(CareError::Recording("microphone is already open".into()));
        }

        let host = cpal::default_host();

        let device = if self.config.device_name == "default" {
            host.default_input_device().ok_or_else(|| {
                CareError::MicrophoneUnavailable("no default input device found".into())
            })?
        } else {
            let name_lower = self.config.device_name.to_lowercase();
            host.input_devices()
                .map_err(|e| {
                    CareError::MicrophoneUnavailable(format!("failed to enumerate devices: {}", e))
                })?
                .find(|d| {
                    d.name()
                        .map(|n| n.to_lowercase().contains(&name_lower))
                        .unwrap_or(false)
                })
                .ok_or_else(|| {
                    CareError::MicrophoneUnavailable(format!(
                        "input device '{}' not found",
                        self.config.device_name
                    ))
                })?
        };

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        debug!(device = %device_name, "Selected input device");

        // Use the device's preferred config; many devices reject arbitrary
        // sample rates and channel counts.
        let stream_config = match device.default_input_config() {
            Ok(supported) => cpal::StreamConfig {
                channels: supported.channels(),
                sample_rate: supported.sample_rate(),
                buffer_size: cpal::BufferSize::Default,
            },
            Err(e) => {
                debug!(error = %e, "Could not query default config, using requested config");
                cpal::StreamConfig {
                    channels: 1,
                    sample_rate: cpal::SampleRate(self.config.sample_rate),
                    buffer_size: cpal::BufferSize::Default,
                }
            }
        };

        let buffer = self.buffer.clone();
        let active_flag = Arc::clone(&self.active);

        let device_rate = stream_config.sample_rate.0;
        let device_channels = stream_config.channels;
        let target_rate = self.config.sample_rate;
        let needs_conversion = device_rate != target_rate || device_channels != 1;

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !needs_conversion {
                        buffer.push(data);
                        return;
                    }

                    // Downmix to mono (average all channels).
                    let mono: Vec<f32> = if device_channels > 1 {
                        let ch = device_channels as usize;
                        data.chunks_exact(ch)
                            .map(|frame| frame.iter().sum::<f32>() / ch as f32)
                            .collect()
                    } else {
                        data.to_vec()
                    };

                    // Resample to the target rate via linear interpolation.
                    let resampled = if device_rate != target_rate {
                        let ratio = device_rate as f64 / target_rate as f64;
                        let out_len = (mono.len() as f64 / ratio).ceil() as usize;
                        let mut out = Vec::with_capacity(out_len);
                        for i in 0..out_len {
                            let src = i as f64 * ratio;
                            let idx0 = src.floor() as usize;
                            let idx1 = (idx0 + 1).min(mono.len().saturating_sub(1));
                            let frac = (src - idx0 as f64) as f32;
                            out.push(mono[idx0] * (1.0 - frac) + mono[idx1] * frac);
                        }
                        out
                    } else {
                        mono
                    };

                    buffer.push(&resampled);
                },
                move |err| {
                    tracing::error!("Microphone stream error: {}", err);
                    active_flag.store(false, Ordering::Relaxed);
                },
                None,
            )
            .map_err(|e| {
                CareError::MicrophoneUnavailable(format!("failed to build input stream: {}", e))
            })?;

        stream.play().map_err(|e| {
            CareError::MicrophoneUnavailable(format!("failed to start input stream: {}", e))
        })?;

        if let Ok(mut guard) = self.stream.lock() {
            *guard = Some(SendStream(stream));
        }

        self.active.store(true, Ordering::Relaxed);
        info!(device = %device_name, target_rate, "Microphone opened");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        use carelink_core::error::CareError;

        if !self.active.load(Ordering::Relaxed) {
            return Err(CareError::Recording("microphone is not open".into()));
        }

        // Drop the stream to stop capture.
        if let Ok(mut guard) = self.stream.lock() {
            *guard = None;
        }

        self.active.store(false, Ordering::Relaxed);
        tracing::info!("Microphone closed");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    fn take_samples(&self) -> Vec<f32> {
        self.buffer.take()
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }
}

// =============================================================================
// Non-Windows stub
// =============================================================================

#[cfg(not(target_os = "windows"))]
impl MicrophoneService for SystemMicrophone {
    async fn open(&self) -> Result<()> {
        warn!("SystemMicrophone called on a platform without capture support");
        Err(CareError::MicrophoneUnavailable(
            "system microphone capture is only available on Windows".into(),
        ))
    }

    async fn close(&self) -> Result<()> {
        Err(CareError::MicrophoneUnavailable(
            "system microphone capture is only available on Windows".into(),
        ))
    }

    fn is_open(&self) -> bool {
        false
    }

    fn take_samples(&self) -> Vec<f32> {
        self.buffer.take()
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mic_config_default() {
        let config = MicConfig::default();
        assert_eq!(config.device_name, "default");
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.max_buffer_secs, 60);
    }

    #[test]
    fn test_system_microphone_creation() {
        let mic = SystemMicrophone::new(MicConfig {
            device_name: "Headset".to_string(),
            sample_rate: 44100,
            max_buffer_secs: 30,
        });
        assert_eq!(mic.config().device_name, "Headset");
        assert_eq!(mic.sample_rate(), 44100);
        assert!(!mic.is_open());
    }

    #[cfg(not(target_os = "windows"))]
    #[tokio::test]
    async fn test_open_unavailable_on_non_windows() {
        let mic = SystemMicrophone::new(MicConfig::default());
        let err = mic.open().await.unwrap_err();
        assert!(matches!(
            err,
            carelink_core::CareError::MicrophoneUnavailable(_)
        ));
        assert!(!mic.is_open());
    }
}
