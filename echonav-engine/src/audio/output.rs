//! Audio output using cpal
//!
//! Opens the output device and drives a `WaveformSynthesizer` from the device
//! callback. The synthesizer is moved into the callback; nothing in the
//! callback locks, allocates or logs.
//!
//! `cpal::Stream` is not `Send`, so the stream lives on a dedicated thread
//! owned by `OutputHandle`. Dropping or stopping the handle closes the stream
//! and joins that thread.

use super::synth::WaveformSynthesizer;
use crate::config::AudioConfig;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

/// Preferred device rate
const PREFERRED_SAMPLE_RATE: u32 = 44_100;

/// Mono frames rendered per synthesizer call inside the callback
const SCRATCH_FRAMES: usize = 2048;

/// How long `OutputHandle::spawn` waits for the device to come up
const OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens and starts a device stream on the calling thread.
///
/// Called on the output thread, so the returned stream never crosses threads.
pub type DeviceOpener =
    Arc<dyn Fn(&AudioConfig, WaveformSynthesizer) -> Result<AudioOutput> + Send + Sync>;

/// Opener for the configured cpal device
pub fn cpal_opener() -> DeviceOpener {
    Arc::new(|config: &AudioConfig, synth: WaveformSynthesizer| {
        let mut output = AudioOutput::open(config.device.as_deref(), config.buffer_size)?;
        output.start(synth)?;
        Ok(output)
    })
}

/// Audio output manager using cpal
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<Stream>,
    /// Set by the stream error callback
    error_flag: Arc<AtomicBool>,
    error_count: Arc<AtomicU32>,
}

impl AudioOutput {
    /// Open an output device.
    ///
    /// A named device that cannot be found falls back to the system default.
    pub fn open(device_name: Option<&str>, buffer_size: Option<u32>) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let mut devices = host.output_devices().map_err(|e| {
                    Error::AudioOutput(format!("Failed to enumerate devices: {}", e))
                })?;

                match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                    Some(dev) => {
                        info!("Found requested audio device: {}", name);
                        dev
                    }
                    None => {
                        warn!(
                            "Requested device '{}' not found, falling back to default device",
                            name
                        );
                        host.default_output_device().ok_or_else(|| {
                            Error::AudioOutput(format!(
                                "Device '{}' not found and no default device available",
                                name
                            ))
                        })?
                    }
                }
            }
            None => host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?,
        };

        let (mut config, sample_format) = Self::get_best_config(&device)?;

        if let Some(size) = buffer_size {
            config.buffer_size = cpal::BufferSize::Fixed(size);
            debug!("Using requested buffer size: {} frames", size);
        }

        info!(
            "Audio device '{}': sample_rate={}, channels={}, format={:?}",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            config.sample_rate.0,
            config.channels,
            sample_format
        );

        Ok(Self {
            device,
            config,
            sample_format,
            stream: None,
            error_flag: Arc::new(AtomicBool::new(false)),
            error_count: Arc::new(AtomicU32::new(0)),
        })
    }

    /// Prefer 44.1 kHz f32 at any channel count, else the device default.
    fn get_best_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
        let mut supported_configs = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

        let preferred = supported_configs.find(|config| {
            config.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
                && config.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE
                && config.sample_format() == SampleFormat::F32
        });

        if let Some(supported_config) = preferred {
            let sample_format = supported_config.sample_format();
            let config = supported_config
                .with_sample_rate(cpal::SampleRate(PREFERRED_SAMPLE_RATE))
                .config();
            return Ok((config, sample_format));
        }

        let supported_config = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

        Ok((supported_config.config(), supported_config.sample_format()))
    }

    /// Start the stream, rendering from `synth`.
    ///
    /// The synthesizer is switched to the device rate before it is moved into
    /// the callback.
    pub fn start(&mut self, mut synth: WaveformSynthesizer) -> Result<()> {
        synth.set_sample_rate(self.sample_rate());

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(synth)?,
            SampleFormat::I16 => self.build_stream::<i16>(synth)?,
            SampleFormat::U16 => self.build_stream::<u16>(synth)?,
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        self.stream = Some(stream);
        info!("Audio stream started");
        Ok(())
    }

    fn build_stream<T>(&self, mut synth: WaveformSynthesizer) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = usize::from(self.config.channels.max(1));
        let error_flag = Arc::clone(&self.error_flag);
        let error_count = Arc::clone(&self.error_count);
        let mut scratch = vec![0.0f32; SCRATCH_FRAMES];

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // Mono render, fanned out to every channel
                    for block in data.chunks_mut(SCRATCH_FRAMES * channels) {
                        let frames = block.len() / channels;
                        let mono = &mut scratch[..frames];
                        synth.render(mono);

                        for (frame, sample) in block.chunks_mut(channels).zip(mono.iter().copied()) {
                            let value = T::from_sample(sample.clamp(-1.0, 1.0));
                            frame.fill(value);
                        }
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    error_flag.store(true, Ordering::SeqCst);
                    error_count.fetch_add(1, Ordering::SeqCst);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    /// Pause and release the stream
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            info!("Stopping audio stream");
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
        }
        Ok(())
    }

    pub fn device_name(&self) -> String {
        self.device
            .name()
            .unwrap_or_else(|_| "Unknown".to_string())
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// True once the stream error callback has fired
    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::SeqCst)
    }

    fn error_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.error_flag)
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!("Error stopping audio stream on drop: {}", e);
        }
    }
}

/// Description of an opened output stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
    pub device_name: String,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Owner of the output thread
pub struct OutputHandle {
    info: OutputInfo,
    error_flag: Arc<AtomicBool>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl OutputHandle {
    /// Open a device with `opener` on a dedicated thread and start rendering.
    ///
    /// Resolves once the stream is playing or has failed to open.
    pub async fn spawn(
        config: &AudioConfig,
        synth: WaveformSynthesizer,
        opener: DeviceOpener,
    ) -> Result<Self> {
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(OutputInfo, Arc<AtomicBool>)>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let config = config.clone();

        let thread = thread::Builder::new()
            .name("echonav-audio-out".to_string())
            .spawn(move || {
                let mut output = match opener(&config, synth) {
                    Ok(output) => output,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                let info = OutputInfo {
                    device_name: output.device_name(),
                    sample_rate: output.sample_rate(),
                    channels: output.channels(),
                };
                if ready_tx.send(Ok((info, output.error_flag()))).is_err() {
                    return;
                }

                // Stream runs until the handle asks us to stop or goes away
                let _ = shutdown_rx.recv();

                if output.has_error() {
                    warn!(
                        "Audio output closing after {} stream errors",
                        output.error_count()
                    );
                }
                if let Err(e) = output.stop() {
                    warn!("Failed to stop audio output: {}", e);
                }
                debug!("Audio output thread exiting");
            })
            .map_err(|e| Error::AudioOutput(format!("Failed to spawn output thread: {}", e)))?;

        let ready = tokio::time::timeout(OPEN_TIMEOUT, ready_rx)
            .await
            .map_err(|_| Error::AudioOutput("Timed out opening audio device".to_string()))?
            .map_err(|_| Error::AudioOutput("Audio output thread exited".to_string()))?;

        match ready {
            Ok((info, error_flag)) => Ok(Self {
                info,
                error_flag,
                shutdown_tx: Some(shutdown_tx),
                thread: Some(thread),
            }),
            Err(e) => {
                let _ = thread.join();
                Err(e)
            }
        }
    }

    pub fn info(&self) -> &OutputInfo {
        &self.info
    }

    pub fn has_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    /// Close the stream and join the output thread. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Audio output thread panicked");
            }
        }
    }
}

impl Drop for OutputHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
