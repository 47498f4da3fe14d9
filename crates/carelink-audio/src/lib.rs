//! Microphone capture for voice messages.
//!
//! Provides the trait-based abstraction for exclusive microphone access and
//! PCM sample buffering, a mock implementation for testing without hardware,
//! and a system implementation (cpal) for real capture.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use carelink_core::error::{CareError, Result};

pub mod system;

pub use system::{MicConfig, SystemMicrophone};

// =============================================================================
// Trait
// =============================================================================

/// Exclusive access to a microphone input stream.
///
/// At most one acquisition may be live at a time. `open` requests the
/// hardware; denial surfaces as `CareError::MicrophoneUnavailable` and
/// leaves nothing acquired. `close` releases the hardware and must succeed
/// at most once per acquisition. Samples accumulate between `open` and
/// `close` and are drained with `take_samples`.
pub trait MicrophoneService: Send + Sync {
    /// Acquire the microphone and begin buffering samples.
    fn open(&self) -> impl Future<Output = Result<()>> + Send;

    /// Release the microphone and stop the capture stream.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;

    /// Whether an acquisition is currently live.
    fn is_open(&self) -> bool;

    /// Drain all samples buffered since the last drain, in capture order.
    fn take_samples(&self) -> Vec<f32>;

    /// Sample rate of the drained samples in Hz.
    fn sample_rate(&self) -> u32;
}

// =============================================================================
// Sample buffer
// =============================================================================

/// Thread-safe buffer for PCM f32 samples.
///
/// The capture callback thread pushes; the voice engine drains with `take`.
/// Bounded: once over capacity, the oldest samples are dropped.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    samples: Arc<Mutex<Vec<f32>>>,
    max_samples: usize,
}

impl SampleBuffer {
    /// Create a buffer holding at most `max_samples` samples.
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: Arc::new(Mutex::new(Vec::with_capacity(max_samples))),
            max_samples,
        }
    }

    /// Push samples, dropping the oldest if the buffer is full.
    pub fn push(&self, data: &[f32]) {
        if let Ok(mut buf) = self.samples.lock() {
            buf.extend_from_slice(data);
            if buf.len() > self.max_samples {
                let excess = buf.len() - self.max_samples;
                buf.drain(..excess);
            }
        }
    }

    /// Take all buffered samples, leaving the buffer empty.
    pub fn take(&self) -> Vec<f32> {
        if let Ok(mut buf) = self.samples.lock() {
            std::mem::take(&mut *buf)
        } else {
            Vec::new()
        }
    }

    /// Number of samples currently buffered.
    pub fn len(&self) -> usize {
        self.samples.lock().map(|b| b.len()).unwrap_or(0)
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Mock microphone for testing without real hardware.
///
/// Can be configured to deny access (simulating missing permission), can be
/// preloaded with samples, and counts `close` calls so tests can assert the
/// stream is released exactly once.
#[derive(Debug)]
pub struct MockMicrophone {
    active: AtomicBool,
    deny: bool,
    buffer: SampleBuffer,
    sample_rate: u32,
    close_count: AtomicUsize,
}

impl Default for MockMicrophone {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMicrophone {
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            deny: false,
            buffer: SampleBuffer::new(16000 * 60),
            sample_rate: 16000,
            close_count: AtomicUsize::new(0),
        }
    }

    /// Make every `open` call fail as if permission were denied.
    pub fn denied() -> Self {
        Self {
            deny: true,
            ..Self::new()
        }
    }

    /// Feed samples into the buffer as if captured from hardware.
    pub fn feed(&self, samples: &[f32]) {
        self.buffer.push(samples);
    }

    /// Number of times `close` has been called successfully.
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::Relaxed)
    }
}

impl MicrophoneService for MockMicrophone {
    async fn open(&self) -> Result<()> {
        if self.deny {
            return Err(CareError::MicrophoneUnavailable(
                "microphone access denied".to_string(),
            ));
        }
        if self.active.load(Ordering::Relaxed) {
            return Err(CareError::Recording(
                "microphone is already open".to_string(),
            ));
        }
        self.active.store(true, Ordering::Relaxed);
        tracing::info!("Mock microphone opened");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.active.load(Ordering::Relaxed) {
            return Err(CareError::Recording("microphone is not open".to_string()));
        }
        self.active.store(false, Ordering::Relaxed);
        self.close_count.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Mock microphone closed");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    fn take_samples(&self) -> Vec<f32> {
        self.buffer.take()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_buffer_push_take() {
        let buf = SampleBuffer::new(1000);
        assert!(buf.is_empty());

        buf.push(&[0.1, 0.2, 0.3]);
        assert_eq!(buf.len(), 3);

        let samples = buf.take();
        assert_eq!(samples, vec![0.1, 0.2, 0.3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_sample_buffer_overflow_keeps_most_recent() {
        let buf = SampleBuffer::new(5);
        buf.push(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        buf.push(&[6.0, 7.0]);

        let samples = buf.take();
        assert_eq!(samples, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_sample_buffer_empty_push() {
        let buf = SampleBuffer::new(100);
        buf.push(&[]);
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_mock_open_close() {
        let mic = MockMicrophone::new();
        assert!(!mic.is_open());

        mic.open().await.unwrap();
        assert!(mic.is_open());

        mic.close().await.unwrap();
        assert!(!mic.is_open());
        assert_eq!(mic.close_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_double_open_rejected() {
        let mic = MockMicrophone::new();
        mic.open().await.unwrap();
        let result = mic.open().await;
        assert!(result.is_err());
        assert!(mic.is_open());
    }

    #[tokio::test]
    async fn test_mock_close_without_open_rejected() {
        let mic = MockMicrophone::new();
        let result = mic.close().await;
        assert!(result.is_err());
        assert_eq!(mic.close_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_denied() {
        let mic = MockMicrophone::denied();
        let err = mic.open().await.unwrap_err();
        assert!(matches!(err, CareError::MicrophoneUnavailable(_)));
        assert!(!mic.is_open());
    }

    #[tokio::test]
    async fn test_mock_feed_and_take() {
        let mic = MockMicrophone::new();
        mic.open().await.unwrap();
        mic.feed(&[0.1, 0.2]);
        mic.feed(&[0.3]);

        assert_eq!(mic.take_samples(), vec![0.1, 0.2, 0.3]);
        assert!(mic.take_samples().is_empty());
    }

    #[tokio::test]
    async fn test_mock_reopen_after_close() {
        let mic = MockMicrophone::new();
        mic.open().await.unwrap();
        mic.close().await.unwrap();
        mic.open().await.unwrap();
        assert!(mic.is_open());
        mic.close().await.unwrap();
        assert_eq!(mic.close_count(), 2);
    }
}
