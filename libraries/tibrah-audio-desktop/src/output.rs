/// CPAL output backend for the oscillator engine
use crate::error::{DesktopAudioError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tibrah_audio::{AudioBackend, AudioContext, ContextState};

/// How often the stream thread checks whether its context was closed
const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A stream thread and the way to stop it
struct StreamThread {
    shutdown_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl StreamThread {
    fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    fn stop(&mut self) {
        self.shutdown_tx.try_send(()).ok();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Audio thread panicked");
            }
        }
    }
}

/// CPAL audio backend
///
/// Every [`open`](AudioBackend::open) spawns a dedicated thread that owns a
/// CPAL output stream whose callback renders the returned [`AudioContext`].
/// CPAL streams are not `Send` on every platform, so the stream never leaves
/// that thread. The thread exits when the context is closed or the backend
/// is dropped.
pub struct CpalBackend {
    /// Output device name; `None` is the host default
    device: Option<String>,
    streams: Mutex<Vec<StreamThread>>,
}

impl CpalBackend {
    /// Backend on the host's default output device
    pub fn new() -> Self {
        Self {
            device: None,
            streams: Mutex::new(Vec::new()),
        }
    }

    /// Backend on the output device called `name`
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device: Some(name.into()),
            streams: Mutex::new(Vec::new()),
        }
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Number of stream threads still running
    pub fn active_streams(&self) -> usize {
        let mut streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        streams.retain(|s| !s.is_finished());
        streams.len()
    }

    fn spawn_stream(&self) -> Result<AudioContext> {
        let (ready_tx, ready_rx) = bounded::<Result<AudioContext>>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let device = self.device.clone();

        let handle = thread::Builder::new()
            .name("tibrah-audio-output".into())
            .spawn(move || run_stream(device.as_deref(), &ready_tx, &shutdown_rx))
            .map_err(|e| DesktopAudioError::ThreadError(e.to_string()))?;

        let context = match ready_rx.recv() {
            Ok(Ok(context)) => context,
            Ok(Err(e)) => {
                handle.join().ok();
                return Err(e);
            }
            Err(_) => {
                handle.join().ok();
                return Err(DesktopAudioError::ThreadError(
                    "audio thread exited during setup".into(),
                ));
            }
        };

        let mut streams = self.streams.lock().unwrap_or_else(PoisonError::into_inner);
        streams.retain(|s| !s.is_finished());
        streams.push(StreamThread {
            shutdown_tx,
            handle: Some(handle),
        });

        Ok(context)
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    fn open(&self) -> tibrah_audio::Result<AudioContext> {
        Ok(self.spawn_stream()?)
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        let streams = self.streams.get_mut().unwrap_or_else(PoisonError::into_inner);
        for stream in streams.iter_mut() {
            stream.stop();
        }
    }
}

/// Names of the host's output devices
#[allow(deprecated)]
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    Ok(host
        .output_devices()?
        .filter_map(|device| device.name().ok())
        .collect())
}

#[allow(deprecated)]
fn find_device(host: &cpal::Host, name: Option<&str>) -> Result<Device> {
    match name {
        None => host
            .default_output_device()
            .ok_or(DesktopAudioError::DeviceNotFound(None)),
        Some(wanted) => host
            .output_devices()?
            .find(|device| device.name().is_ok_and(|n| n == wanted))
            .ok_or_else(|| DesktopAudioError::DeviceNotFound(Some(wanted.to_string()))),
    }
}

/// Stream thread body: build, report, then park until told to stop
fn run_stream(
    device: Option<&str>,
    ready_tx: &Sender<Result<AudioContext>>,
    shutdown_rx: &Receiver<()>,
) {
    let (stream, context) = match open_stream(device) {
        Ok(opened) => opened,
        Err(e) => {
            ready_tx.send(Err(e)).ok();
            return;
        }
    };
    if ready_tx.send(Ok(context.clone())).is_err() {
        return;
    }

    loop {
        match shutdown_rx.recv_timeout(CLOSE_POLL_INTERVAL) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                if context.state() == ContextState::Closed {
                    break;
                }
            }
        }
    }

    drop(stream);
    tracing::debug!("Audio output stream released");
}

fn open_stream(device: Option<&str>) -> Result<(Stream, AudioContext)> {
    let host = cpal::default_host();
    let device = find_device(&host, device)?;

    let supported = device.default_output_config()?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.config();

    let context = AudioContext::new(config.sample_rate, config.channels);

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, context.clone()),
        SampleFormat::I16 => build_stream::<i16>(&device, &config, context.clone()),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, context.clone()),
        SampleFormat::I32 => build_stream::<i32>(&device, &config, context.clone()),
        other => return Err(DesktopAudioError::UnsupportedFormat(format!("{other:?}"))),
    }?;
    stream.play()?;

    tracing::info!(
        sample_rate = config.sample_rate,
        channels = config.channels,
        format = ?sample_format,
        "Audio output stream started"
    );

    Ok((stream, context))
}

/// Output stream rendering `context`, converting from f32 to the device format
fn build_stream<T>(device: &Device, config: &StreamConfig, context: AudioContext) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            // Grows once to the device's block size
            scratch.resize(data.len(), 0.0);
            context.render(&mut scratch);
            for (out, sample) in data.iter_mut().zip(&scratch) {
                *out = T::from_sample(*sample);
            }
        },
        |err| tracing::error!(error = %err, "Audio stream error"),
        None,
    )?;

    Ok(stream)
}
