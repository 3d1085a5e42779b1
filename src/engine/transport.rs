//! Drives the console from real audio devices, or from a simulated clock.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample as _;
use cpal::{
    FromSample, SampleFormat, SampleRate, SizedSample, StreamConfig, SupportedStreamConfig,
    SupportedStreamConfigRange,
};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{error, info, warn};

use super::config::{ConfigError, MixerConfig};
use super::ports::{self, MemoryPorts, PortDirection, PortError, PortKey};
use super::{mixer, MixBusEngine, Mixer, Sample, SUBGROUPS};

const STARTUP_TIMEOUT: Duration = Duration::from_secs(30);
/// Frequency of the tone fed into every channel by [`Transport::dummy`].
const TEST_TONE_FREQUENCY: f32 = 440.0;
/// Level of the test tone, about -12 dB.
const TEST_TONE_AMPLITUDE: f32 = 0.25;

/// Names of the console's input ports, in the order they are mapped to the capture device's channels:
/// every channel input, then every aux return.
pub fn input_port_names(channel_count: u32) -> Vec<String> {
    (1..=channel_count)
        .map(ports::channel_in)
        .chain((1..=channel_count).map(ports::channel_aux_return))
        .collect()
}

/// Names of the console's output ports, in the order they are mapped to the playback device's channels:
/// the main bus, the subgroups, every channel direct out, then every aux send.
pub fn output_port_names(channel_count: u32) -> Vec<String> {
    (1..=2)
        .map(ports::main_out)
        .chain((1..=SUBGROUPS).map(ports::subgroup_out))
        .chain((1..=channel_count).map(ports::channel_out))
        .chain((1..=channel_count).map(ports::channel_aux_send))
        .collect()
}

/// A running console.
///
/// Processing happens on a dedicated audio thread, controlled through [`Self::mixer`].
/// Stops when dropped.
pub struct Transport {
    /// Signal whether the stream should stop.
    stopped: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,

    mixer: Mixer,
    sample_rate: u32,
}
impl Transport {
    /// Opens the configured devices (or the host's default ones) and starts processing.
    ///
    /// Device channels are mapped one to one onto [`input_port_names`] and [`output_port_names`];
    /// ports beyond the device's channel count are left unconnected.
    /// If no capture device is available the console runs on silence.
    pub fn start(config: &MixerConfig) -> Result<Self, TransportError> {
        config.validate()?;
        let config = config.clone();
        let (tx, rx) = sync_channel(1);

        let stopped1 = Arc::new(AtomicBool::new(false));
        let stopped2 = Arc::clone(&stopped1);
        let join_handle = thread::spawn(move || {
            // cpal::Stream isn't Send, so the streams have to live on this thread.
            let streams = match open_streams(&config) {
                Ok((mixer, sample_rate, streams)) => {
                    if tx.send(Ok((mixer, sample_rate))).is_err() {
                        return;
                    }
                    streams
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    return;
                }
            };

            while !stopped2.load(Ordering::Acquire) {
                // Parking can wake up spuriously, hence the flag.
                thread::park();
            }

            drop(streams);
            info!("Streams terminated");
        });

        let (mixer, sample_rate) = match rx.recv_timeout(STARTUP_TIMEOUT) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => {
                stopped1.store(true, Ordering::Release);
                return Err(TransportError::StartupTimeout(STARTUP_TIMEOUT));
            }
            Err(RecvTimeoutError::Disconnected) => return Err(TransportError::ThreadExited),
        };

        Ok(Self {
            stopped: stopped1,
            join_handle: Some(join_handle),
            mixer,
            sample_rate,
        })
    }

    /// Creates a console that isn't connected to any audio device.
    ///
    /// Spins the engine as fast as possible with varying block sizes,
    /// feeding a 440 Hz test tone into every channel input. Useful for testing.
    pub fn dummy(config: &MixerConfig) -> Result<Self, TransportError> {
        config.validate()?;
        let sample_rate = config.sample_rate;
        let max_block_size = config.max_block_size;
        let (mixer, mut bridge) =
            DeviceBridge::new(config, sample_rate, InputSource::test_tone(sample_rate), 2)?;

        let mut data = vec![0.0f32; max_block_size * 2 * 2];
        // One block and one frame, in whole stereo frames.
        let partial_len = (max_block_size / 2 + 1) * 2;

        let stopped1 = Arc::new(AtomicBool::new(false));
        let stopped2 = Arc::clone(&stopped1);
        let join_handle = thread::spawn(move || {
            while !stopped2.load(Ordering::Acquire) {
                // Two full blocks, then a partial one.
                let full = &mut data[..];
                no_heap! {{
                    bridge.render(full);
                }}
                let partial = &mut data[..partial_len];
                no_heap! {{
                    bridge.render(partial);
                }}
            }
        });

        Ok(Self {
            stopped: stopped1,
            join_handle: Some(join_handle),
            mixer,
            sample_rate,
        })
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Stops processing. Control handles stay usable, but no more audio is produced.
    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::Release);
        if let Some(handle) = self.join_handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                error!("Audio thread panicked");
            }
        }
    }
}
impl Drop for Transport {
    fn drop(&mut self) {
        self.stop();
    }
}
impl Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("sample_rate", &self.sample_rate)
            .field("running", &self.join_handle.is_some())
            .finish_non_exhaustive()
    }
}

/// Streams kept alive for as long as the transport runs.
struct Streams {
    _output: cpal::Stream,
    _input: Option<cpal::Stream>,
}

fn open_streams(config: &MixerConfig) -> Result<(Mixer, u32, Streams), TransportError> {
    let host = cpal::default_host();

    let output_device = match &config.output_device {
        Some(name) => host
            .output_devices()?
            .find(|device| device.name().is_ok_and(|n| &n == name))
            .ok_or_else(|| TransportError::DeviceNotFound(name.clone()))?,
        None => host
            .default_output_device()
            .ok_or(TransportError::NoDefaultDevice("output"))?,
    };
    let output_config = preferred_config(
        output_device.default_output_config()?,
        output_device.supported_output_configs()?,
        config.sample_rate,
    );
    let sample_rate = output_config.sample_rate().0;

    let input_device = match &config.input_device {
        Some(name) => Some(
            host.input_devices()?
                .find(|device| device.name().is_ok_and(|n| &n == name))
                .ok_or_else(|| TransportError::DeviceNotFound(name.clone()))?,
        ),
        None => host.default_input_device(),
    };
    let input = match input_device {
        Some(device) => {
            let input_config = preferred_config(
                device.default_input_config()?,
                device.supported_input_configs()?,
                sample_rate,
            );
            if input_config.sample_rate().0 == sample_rate {
                Some((device, input_config))
            } else {
                warn!(
                    input_rate = input_config.sample_rate().0,
                    output_rate = sample_rate,
                    "Capture device can't match the playback sample rate, running without input"
                );
                None
            }
        }
        None => {
            warn!("No capture device available, running without input");
            None
        }
    };

    let output_channels = output_config.channels() as usize;
    let (input_stream, source) = match input {
        Some((device, input_config)) => {
            let channels = input_config.channels() as usize;
            let ring = HeapRb::<Sample>::new(config.max_block_size * channels * 4);
            let (producer, consumer) = ring.split();

            let build = match input_config.sample_format() {
                SampleFormat::I8 => build_input_stream::<i8>,
                SampleFormat::I16 => build_input_stream::<i16>,
                SampleFormat::I32 => build_input_stream::<i32>,
                SampleFormat::I64 => build_input_stream::<i64>,
                SampleFormat::U8 => build_input_stream::<u8>,
                SampleFormat::U16 => build_input_stream::<u16>,
                SampleFormat::U32 => build_input_stream::<u32>,
                SampleFormat::U64 => build_input_stream::<u64>,
                SampleFormat::F32 => build_input_stream::<f32>,
                SampleFormat::F64 => build_input_stream::<f64>,
                format => return Err(TransportError::UnsupportedSampleFormat(format)),
            };
            let stream = build(&device, &input_config.config(), producer)?;
            info!(
                device = device.name().unwrap_or_default(),
                channels,
                sample_format = %input_config.sample_format(),
                "Opened capture device"
            );

            (Some(stream), InputSource::Device { consumer, channels })
        }
        None => (None, InputSource::Silence),
    };

    let (mixer, bridge) = DeviceBridge::new(config, sample_rate, source, output_channels)?;

    let build = match output_config.sample_format() {
        SampleFormat::I8 => build_output_stream::<i8>,
        SampleFormat::I16 => build_output_stream::<i16>,
        SampleFormat::I32 => build_output_stream::<i32>,
        SampleFormat::I64 => build_output_stream::<i64>,
        SampleFormat::U8 => build_output_stream::<u8>,
        SampleFormat::U16 => build_output_stream::<u16>,
        SampleFormat::U32 => build_output_stream::<u32>,
        SampleFormat::U64 => build_output_stream::<u64>,
        SampleFormat::F32 => build_output_stream::<f32>,
        SampleFormat::F64 => build_output_stream::<f64>,
        format => return Err(TransportError::UnsupportedSampleFormat(format)),
    };
    let output_stream = build(&output_device, &output_config.config(), bridge)?;

    if let Some(stream) = &input_stream {
        stream.play()?;
    }
    output_stream.play()?;

    info!(
        host = host.id().name(),
        device = output_device.name().unwrap_or_default(),
        channels = output_channels,
        sample_format = %output_config.sample_format(),
        sample_rate,
        "Opened playback device"
    );

    Ok((
        mixer,
        sample_rate,
        Streams {
            _output: output_stream,
            _input: input_stream,
        },
    ))
}

/// The device's default configuration, moved to `preferred_rate` if the device supports it.
fn preferred_config(
    default: SupportedStreamConfig,
    mut supported: impl Iterator<Item = SupportedStreamConfigRange>,
    preferred_rate: u32,
) -> SupportedStreamConfig {
    let rate = SampleRate(preferred_rate);
    supported
        .find(|range| {
            range.channels() == default.channels()
                && range.sample_format() == default.sample_format()
                && range.min_sample_rate() <= rate
                && rate <= range.max_sample_rate()
        })
        .map(|range| range.with_sample_rate(rate))
        .unwrap_or(default)
}

fn build_input_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: HeapProd<Sample>,
) -> Result<cpal::Stream, TransportError>
where
    T: SizedSample,
    Sample: FromSample<T>,
{
    let channels = config.channels as usize;
    Ok(device.build_input_stream(
        config,
        move |data: &[T], _info| {
            for frame in data.chunks_exact(channels) {
                // Whole frames are dropped when the playback side falls behind.
                if producer.vacant_len() < channels {
                    break;
                }
                for &sample in frame {
                    let _ = producer.try_push(Sample::from_sample(sample));
                }
            }
        },
        |e| error!("Capture stream error: {e}"),
        None,
    )?)
}

fn build_output_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut bridge: DeviceBridge,
) -> Result<cpal::Stream, TransportError>
where
    T: SizedSample + FromSample<Sample>,
{
    Ok(device.build_output_stream(
        config,
        move |data: &mut [T], _info| {
            no_heap! {{
                bridge.render(data);
            }}
        },
        |e| error!("Playback stream error: {e}"),
        None,
    )?)
}

enum InputSource {
    /// Interleaved samples from the capture stream.
    Device {
        consumer: HeapCons<Sample>,
        channels: usize,
    },
    TestTone {
        phase: f32,
        step: f32,
    },
    Silence,
}
impl InputSource {
    fn test_tone(sample_rate: u32) -> Self {
        Self::TestTone {
            phase: 0.0,
            step: TEST_TONE_FREQUENCY / sample_rate as f32,
        }
    }
}

/// Moves audio between interleaved device buffers and the console's ports, one block at a time.
struct DeviceBridge {
    engine: MixBusEngine,
    ports: MemoryPorts,
    /// Input ports, by capture channel.
    inputs: Vec<PortKey>,
    /// Output ports, by playback channel. Playback channels beyond this carry silence.
    outputs: Vec<PortKey>,
    /// Channel inputs only, for the test tone.
    channel_inputs: Vec<PortKey>,
    output_channels: usize,
    source: InputSource,
}
impl DeviceBridge {
    fn new(
        config: &MixerConfig,
        sample_rate: u32,
        source: InputSource,
        output_channels: usize,
    ) -> Result<(Mixer, Self), PortError> {
        let mut ports = MemoryPorts::new(sample_rate, config.max_block_size);
        let (mixer, engine) = mixer(
            config.channels,
            config.max_block_size,
            sample_rate,
            &mut ports,
        )?;

        let inputs = input_port_names(config.channels)
            .iter()
            .map(|name| ports.expect_key(name, PortDirection::Input))
            .collect::<Result<Vec<_>, _>>()?;
        let outputs = output_port_names(config.channels)
            .iter()
            .take(output_channels)
            .map(|name| ports.expect_key(name, PortDirection::Output))
            .collect::<Result<Vec<_>, _>>()?;
        let channel_inputs = inputs[..config.channels as usize].to_vec();

        Ok((
            mixer,
            Self {
                engine,
                ports,
                inputs,
                outputs,
                channel_inputs,
                output_channels: output_channels.max(1),
                source,
            },
        ))
    }

    /// Fills an interleaved playback buffer, in blocks no bigger than the engine's maximum.
    /// A trailing partial frame is left untouched.
    fn render<T: SizedSample + FromSample<Sample>>(&mut self, data: &mut [T]) {
        let max_block_size = self.engine.max_block_size();
        let whole_frames = data.len() / self.output_channels * self.output_channels;
        for chunk in data[..whole_frames].chunks_mut(max_block_size * self.output_channels) {
            let block_size = chunk.len() / self.output_channels;
            self.ports.set_block_size(block_size);

            self.read_inputs(block_size);
            self.engine.process(&mut self.ports);

            for (i, frame) in chunk.chunks_mut(self.output_channels).enumerate() {
                for (channel, sample) in frame.iter_mut().enumerate() {
                    let value = match self.outputs.get(channel) {
                        Some(&key) => self.ports.output_ref(key)[i],
                        None => 0.0,
                    };
                    *sample = T::from_sample(value);
                }
            }
        }
    }

    fn read_inputs(&mut self, block_size: usize) {
        match &mut self.source {
            InputSource::Device { consumer, channels } => {
                let channels = *channels;

                // Keep latency bounded if capture runs ahead of playback.
                let target = block_size * channels * 2;
                // Skipping whole frames keeps the front of the queue on channel 1.
                let excess = consumer.occupied_len().saturating_sub(target);
                consumer.skip(excess / channels * channels);

                let available = (consumer.occupied_len() / channels).min(block_size);
                self.ports.silence_inputs();
                for i in 0..available {
                    for channel in 0..channels {
                        let sample = consumer.try_pop().unwrap_or(0.0);
                        if let Some(&key) = self.inputs.get(channel) {
                            self.ports.input_mut(key)[i] = sample;
                        }
                    }
                }
            }
            InputSource::TestTone { phase, step } => {
                let start = *phase;
                for &key in &self.channel_inputs {
                    let mut p = start;
                    for sample in self.ports.input_mut(key) {
                        *sample = (p * std::f32::consts::TAU).sin() * TEST_TONE_AMPLITUDE;
                        p = (p + *step).fract();
                    }
                }
                *phase = (start + *step * block_size as f32).fract();
            }
            InputSource::Silence => self.ports.silence_inputs(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("No audio device named '{0}'")]
    DeviceNotFound(String),
    #[error("No default {0} device available")]
    NoDefaultDevice(&'static str),
    #[error("Unsupported sample format: {0}")]
    UnsupportedSampleFormat(SampleFormat),
    #[error("Could not list audio devices: {0}")]
    Devices(#[from] cpal::DevicesError),
    #[error("Could not query the default stream config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),
    #[error("Could not query the supported stream configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),
    #[error("Stream could not be created: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("Stream could not be started: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
    #[error(transparent)]
    Port(#[from] PortError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Attempt to start stream timed out after {0:?}")]
    StartupTimeout(Duration),
    #[error("The audio thread exited during startup")]
    ThreadExited,
}
