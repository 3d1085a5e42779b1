use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use super::channel_strip::{
    channel_strip, ChannelStrip, ChannelStripProcessor, ChannelStripState, SubgroupPair,
};
use super::controls::FADER_GAIN;
use super::gain::GainStage;
use super::parameter::{Flag, IntParameter, PeakLevel};
use crate::engine::ports::{self, PortBuffers, PortError, PortKey, PortRegistry};
use crate::engine::{Info, Sample, SampleBuffer, MAIN_CHANNELS, SILENCE_DB, SUBGROUPS};

#[cfg(feature = "record_output")]
use crate::wav_recorder::WavRecorder;

/// Creates a corresponding pair of [`Mixer`] and [`MixBusEngine`], with `channel_count` channel strips
/// numbered from 1, eight subgroups and a stereo main bus.
///
/// Every port the console uses is registered on `registry` here, channels first, then the subgroup and main outputs.
///
/// [`MixBusEngine`] should live on the audio thread, while [`Mixer`] can live wherever else.
pub fn mixer<R: PortRegistry + ?Sized>(
    channel_count: u32,
    max_block_size: usize,
    sample_rate: u32,
    registry: &mut R,
) -> Result<(Mixer, MixBusEngine), PortError> {
    let mut channels = Vec::with_capacity(channel_count as usize);
    let mut channel_processors = Vec::with_capacity(channel_count as usize);
    for number in 1..=channel_count {
        let (channel, processor) = channel_strip(number, sample_rate, registry)?;
        channels.push(channel);
        channel_processors.push(processor);
    }

    let mut subgroups = Vec::with_capacity(SUBGROUPS);
    let mut subgroup_buses = Vec::with_capacity(SUBGROUPS);
    for number in 1..=SUBGROUPS {
        let parameters = Arc::new(SubgroupParameters::new());
        let port = registry.register_output(&ports::subgroup_out(number))?;

        subgroup_buses.push(SubgroupBus {
            parameters: Arc::clone(&parameters),
            port,
            fader: GainStage::new(parameters.fader_gain.get() as f32),
            buffer: vec![0.0; max_block_size],
            routing: SubgroupRouting::default(),
        });
        subgroups.push(Subgroup { number, parameters });
    }

    let mut main = Vec::with_capacity(MAIN_CHANNELS);
    let mut main_buses = Vec::with_capacity(MAIN_CHANNELS);
    for side in MainSide::ALL {
        let parameters = Arc::new(MainParameters::new());
        let port = registry.register_output(&ports::main_out(side.number()))?;

        main_buses.push(MainBus {
            parameters: Arc::clone(&parameters),
            port,
            fader: GainStage::new(parameters.fader_gain.get() as f32),
            buffer: vec![0.0; max_block_size],
        });
        main.push(MainChannel { side, parameters });
    }

    #[cfg(feature = "record_output")]
    let recorder = match WavRecorder::new(sample_rate) {
        Ok(recorder) => Some(recorder),
        Err(e) => {
            tracing::warn!("Main bus will not be recorded: {e}");
            None
        }
    };

    Ok((
        Mixer {
            channels,
            subgroups,
            main,
        },
        MixBusEngine {
            max_block_size,
            channels: channel_processors,
            subgroups: subgroup_buses,
            main: main_buses,
            scratch: vec![0.0; max_block_size],

            #[cfg(feature = "record_output")]
            recorder,
        },
    ))
}

/// A channel contributes to its buses only if it is not muted, and, while any channel is soloed, only if it is soloed too.
fn contributes(muted: bool, soloed: bool, solo_active: bool) -> bool {
    !muted && (!solo_active || soloed)
}

/// The same solo and mute precedence as [`contributes`], one level up, gated by the subgroup's on-main switch.
fn routed_to_main(muted: bool, on_main: bool, soloed: bool, solo_active: bool) -> bool {
    on_main && contributes(muted, soloed, solo_active)
}

/// Linear pan law: `(left, right)` scale factors for a pan position in `0.0..=1.0`.
///
/// The two always sum to one, so a centered channel sits 6 dB down on each side.
fn pan_gains(panorama: f32) -> (f32, f32) {
    (1.0 - panorama, panorama)
}

/// Side of the stereo main bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MainSide {
    Left,
    Right,
}
impl MainSide {
    pub const ALL: [MainSide; MAIN_CHANNELS] = [Self::Left, Self::Right];

    /// 1 for left, 2 for right, as used in port names and state documents.
    pub fn number(self) -> usize {
        self.index() + 1
    }

    fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

#[derive(Debug)]
struct SubgroupParameters {
    fader_gain: IntParameter,
    muted: Flag,
    soloed: Flag,
    on_main: Flag,
    peak: PeakLevel,
}
impl SubgroupParameters {
    fn new() -> Self {
        Self {
            fader_gain: IntParameter::new(FADER_GAIN),
            muted: Flag::new(false),
            soloed: Flag::new(false),
            on_main: Flag::new(true),
            peak: PeakLevel::new(),
        }
    }
}

#[derive(Debug)]
struct MainParameters {
    fader_gain: IntParameter,
    muted: Flag,
    peak: PeakLevel,
}
impl MainParameters {
    fn new() -> Self {
        Self {
            fader_gain: IntParameter::new(FADER_GAIN),
            muted: Flag::new(false),
            peak: PeakLevel::new(),
        }
    }
}

/// Control handle of one of the eight subgroup buses.
#[derive(Debug)]
pub struct Subgroup {
    number: usize,
    parameters: Arc<SubgroupParameters>,
}
impl Subgroup {
    /// Subgroup number, 1 to 8. Odd subgroups feed the left main channel, even ones the right.
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn fader_gain(&self) -> i32 {
        self.parameters.fader_gain.get()
    }
    pub fn set_fader_gain(&self, db: i32) {
        self.parameters.fader_gain.set(db)
    }

    pub fn is_muted(&self) -> bool {
        self.parameters.muted.get()
    }
    pub fn set_muted(&self, muted: bool) {
        self.parameters.muted.set(muted)
    }

    pub fn is_soloed(&self) -> bool {
        self.parameters.soloed.get()
    }
    pub fn set_soloed(&self, soloed: bool) {
        self.parameters.soloed.set(soloed)
    }

    pub fn is_on_main(&self) -> bool {
        self.parameters.on_main.get()
    }
    pub fn set_on_main(&self, on_main: bool) {
        self.parameters.on_main.set(on_main)
    }

    /// Post-fader peak of the last block, in dB. Reported whether or not the subgroup reaches the main bus.
    pub fn peak_db(&self) -> f32 {
        self.parameters.peak.read()
    }

    pub fn state(&self) -> SubgroupState {
        SubgroupState {
            fader_gain: self.fader_gain(),
            muted: self.is_muted(),
            soloed: self.is_soloed(),
            on_main: self.is_on_main(),
        }
    }

    pub fn apply_state(&self, state: &SubgroupState) {
        self.set_fader_gain(state.fader_gain);
        self.set_muted(state.muted);
        self.set_soloed(state.soloed);
        self.set_on_main(state.on_main);
    }
}

/// Control handle of one side of the main bus.
#[derive(Debug)]
pub struct MainChannel {
    side: MainSide,
    parameters: Arc<MainParameters>,
}
impl MainChannel {
    pub fn side(&self) -> MainSide {
        self.side
    }

    pub fn fader_gain(&self) -> i32 {
        self.parameters.fader_gain.get()
    }
    pub fn set_fader_gain(&self, db: i32) {
        self.parameters.fader_gain.set(db)
    }

    pub fn is_muted(&self) -> bool {
        self.parameters.muted.get()
    }
    pub fn set_muted(&self, muted: bool) {
        self.parameters.muted.set(muted)
    }

    /// Post-fader peak of the last block, in dB. Silence while muted.
    pub fn peak_db(&self) -> f32 {
        self.parameters.peak.read()
    }

    pub fn state(&self) -> MainState {
        MainState {
            fader_gain: self.fader_gain(),
            muted: self.is_muted(),
        }
    }

    pub fn apply_state(&self, state: &MainState) {
        self.set_fader_gain(state.fader_gain);
        self.set_muted(state.muted);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubgroupState {
    pub fader_gain: i32,
    pub muted: bool,
    pub soloed: bool,
    pub on_main: bool,
}
impl Default for SubgroupState {
    fn default() -> Self {
        Self {
            fader_gain: FADER_GAIN.rest,
            muted: false,
            soloed: false,
            on_main: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainState {
    pub fader_gain: i32,
    pub muted: bool,
}
impl Default for MainState {
    fn default() -> Self {
        Self {
            fader_gain: FADER_GAIN.rest,
            muted: false,
        }
    }
}

/// Every stored value of the console.
///
/// Converted to and from the flat state document in the snapshot module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixerState {
    /// Keyed by channel number.
    pub channels: BTreeMap<u32, ChannelStripState>,
    pub subgroups: [SubgroupState; SUBGROUPS],
    pub main: [MainState; MAIN_CHANNELS],
}
impl MixerState {
    /// State of a console with `channel_count` channels, with every control at rest.
    pub fn with_channels(channel_count: u32) -> Self {
        Self {
            channels: (1..=channel_count)
                .map(|number| (number, ChannelStripState::default()))
                .collect(),
            subgroups: [SubgroupState::default(); SUBGROUPS],
            main: [MainState::default(); MAIN_CHANNELS],
        }
    }
}

/// Control side of the console. Holds a handle for every channel strip and bus.
#[derive(Debug)]
pub struct Mixer {
    channels: Vec<ChannelStrip>,
    subgroups: Vec<Subgroup>,
    main: Vec<MainChannel>,
}
impl Mixer {
    pub fn channel_count(&self) -> u32 {
        self.channels.len() as u32
    }

    /// Channel strips in registration order, which is also the order of their numbers.
    pub fn channels(&self) -> &[ChannelStrip] {
        &self.channels
    }

    /// Channel by number, starting at 1.
    pub fn channel(&self, number: u32) -> Option<&ChannelStrip> {
        let index = (number as usize).checked_sub(1)?;
        self.channels.get(index)
    }

    pub fn subgroups(&self) -> &[Subgroup] {
        &self.subgroups
    }

    /// Subgroup by number, 1 to 8.
    pub fn subgroup(&self, number: usize) -> Option<&Subgroup> {
        self.subgroups.get(number.checked_sub(1)?)
    }

    pub fn main(&self, side: MainSide) -> &MainChannel {
        &self.main[side.index()]
    }

    /// Takes a snapshot of every control of the console.
    pub fn state(&self) -> MixerState {
        MixerState {
            channels: self
                .channels
                .iter()
                .map(|channel| (channel.number(), channel.state()))
                .collect(),
            subgroups: [0, 1, 2, 3, 4, 5, 6, 7].map(|i| self.subgroups[i].state()),
            main: [0, 1].map(|i| self.main[i].state()),
        }
    }

    /// Sets every control to the given state.
    ///
    /// Channels of `state` that don't exist on this console are ignored,
    /// and channels missing from `state` are left as they are.
    pub fn apply_state(&self, state: &MixerState) {
        for channel in &self.channels {
            if let Some(channel_state) = state.channels.get(&channel.number()) {
                channel.apply_state(channel_state);
            }
        }
        for (subgroup, subgroup_state) in self.subgroups.iter().zip(&state.subgroups) {
            subgroup.apply_state(subgroup_state);
        }
        for (main, main_state) in self.main.iter().zip(&state.main) {
            main.apply_state(main_state);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SubgroupRouting {
    muted: bool,
    soloed: bool,
    on_main: bool,
}

#[derive(Debug)]
struct SubgroupBus {
    parameters: Arc<SubgroupParameters>,
    port: PortKey,
    fader: GainStage,
    buffer: Vec<Sample>,
    routing: SubgroupRouting,
}

#[derive(Debug)]
struct MainBus {
    parameters: Arc<MainParameters>,
    port: PortKey,
    fader: GainStage,
    buffer: Vec<Sample>,
}

/// Audio thread side of the console.
///
/// Owns every channel processor, the subgroup and main accumulators and one scratch buffer,
/// all allocated at construction.
pub struct MixBusEngine {
    max_block_size: usize,

    channels: Vec<ChannelStripProcessor>,
    subgroups: Vec<SubgroupBus>,
    main: Vec<MainBus>,
    scratch: Vec<Sample>,

    #[cfg(feature = "record_output")]
    recorder: Option<WavRecorder>,
}
impl MixBusEngine {
    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Runs one block.
    ///
    /// Reads every channel input and aux return from `ports`, and writes every channel direct out,
    /// aux send, subgroup output and main output. Never blocks or allocates.
    ///
    /// Panics if the block is larger than the maximum block size given at construction.
    pub fn process<P: PortBuffers + ?Sized>(&mut self, ports: &mut P) {
        let block_size = ports.block_size();
        assert!(
            block_size <= self.max_block_size,
            "A block of size {} was requested, which exceeds the biggest processable size of {}.",
            block_size,
            self.max_block_size
        );
        let info = Info::new(ports.sample_rate(), block_size);

        for bus in &mut self.subgroups {
            bus.buffer[..block_size].clear();
            bus.routing = SubgroupRouting {
                muted: bus.parameters.muted.get(),
                soloed: bus.parameters.soloed.get(),
                on_main: bus.parameters.on_main.get(),
            };
        }
        for bus in &mut self.main {
            bus.buffer[..block_size].clear();
        }

        for channel in &mut self.channels {
            channel.latch();
        }
        let channel_solo_active = self.channels.iter().any(|channel| channel.is_soloed());
        let subgroup_solo_active = self.subgroups.iter().any(|bus| bus.routing.soloed);

        let scratch = &mut self.scratch[..block_size];
        for channel in &mut self.channels {
            channel.process(&info, &mut *ports, scratch);

            if !contributes(channel.is_muted(), channel.is_soloed(), channel_solo_active) {
                continue;
            }

            let (left, right) = pan_gains(channel.panorama());
            for pair in SubgroupPair::ALL {
                if channel.is_in_subgroup_pair(pair) {
                    let odd = pair.left_index();
                    scratch.add_to(&mut self.subgroups[odd].buffer[..block_size], left);
                    scratch.add_to(&mut self.subgroups[odd + 1].buffer[..block_size], right);
                }
            }
            if channel.is_on_main() {
                scratch.add_to(&mut self.main[0].buffer[..block_size], left);
                scratch.add_to(&mut self.main[1].buffer[..block_size], right);
            }
        }

        for bus in &mut self.subgroups {
            bus.fader.set_gain(bus.parameters.fader_gain.get() as f32);
            bus.fader.process(&mut bus.buffer[..block_size]);
        }

        for (index, bus) in self.subgroups.iter().enumerate() {
            let SubgroupRouting {
                muted,
                soloed,
                on_main,
            } = bus.routing;
            if routed_to_main(muted, on_main, soloed, subgroup_solo_active) {
                // Subgroup 1 sits at index 0, so even indices are the odd subgroups.
                let side = &mut self.main[index % 2].buffer[..block_size];
                bus.buffer[..block_size].add_to(side, 1.0);
            }
            bus.parameters.peak.report(bus.buffer[..block_size].peak_db());
        }

        for bus in &mut self.main {
            let buffer = &mut bus.buffer[..block_size];
            if bus.parameters.muted.get() {
                buffer.clear();
                bus.parameters.peak.report(SILENCE_DB);
            } else {
                bus.fader.set_gain(bus.parameters.fader_gain.get() as f32);
                bus.fader.process(buffer);
                bus.parameters.peak.report(buffer.peak_db());
            }
        }

        for bus in &self.subgroups {
            bus.buffer[..block_size].copy_to(ports.output(bus.port));
        }
        for bus in &self.main {
            bus.buffer[..block_size].copy_to(ports.output(bus.port));
        }

        #[cfg(feature = "record_output")]
        if let Some(recorder) = &mut self.recorder {
            recorder.record(&self.main[0].buffer[..block_size], &self.main[1].buffer[..block_size]);
        }
    }
}
impl Debug for MixBusEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixBusEngine")
            .field("max_block_size", &self.max_block_size)
            .field("channels", &self.channels)
            .field("subgroups", &self.subgroups)
            .field("main", &self.main)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ports::MemoryPorts;

    const BLOCK: usize = 4;

    fn setup(channel_count: u32) -> (MemoryPorts, Mixer, MixBusEngine) {
        let mut ports = MemoryPorts::new(48_000, BLOCK);
        let (m, engine) = mixer(channel_count, BLOCK, 48_000, &mut ports).unwrap();
        (ports, m, engine)
    }

    fn feed(ports: &mut MemoryPorts, name: &str, value: Sample) {
        let key = ports.key(name).unwrap();
        ports.input_mut(key).fill(value);
    }

    fn read(ports: &MemoryPorts, name: &str) -> Vec<Sample> {
        ports.output_ref(ports.key(name).unwrap()).to_vec()
    }

    fn run(ports: &mut MemoryPorts, engine: &mut MixBusEngine) {
        no_heap! {{
            engine.process(ports);
        }}
    }

    #[test]
    fn contribution_without_solo() {
        assert!(contributes(false, false, false));
        assert!(contributes(false, true, false));
        assert!(!contributes(true, false, false));
        assert!(!contributes(true, true, false));
    }

    #[test]
    fn contribution_with_solo() {
        assert!(!contributes(false, false, true));
        assert!(contributes(false, true, true));
        assert!(!contributes(true, true, true));
        assert!(!contributes(true, false, true));
    }

    #[test]
    fn subgroup_routing_to_main() {
        assert!(routed_to_main(false, true, false, false));
        assert!(!routed_to_main(false, false, false, false));
        assert!(!routed_to_main(true, true, false, false));
        assert!(!routed_to_main(false, true, false, true));
        assert!(routed_to_main(false, true, true, true));
        assert!(!routed_to_main(false, false, true, true));
    }

    #[test]
    fn linear_pan_law() {
        assert_eq!(pan_gains(0.0), (1.0, 0.0));
        assert_eq!(pan_gains(0.5), (0.5, 0.5));
        assert_eq!(pan_gains(1.0), (0.0, 1.0));
        for pan in [0.1, 0.25, 0.8] {
            let (left, right) = pan_gains(pan);
            assert!((left + right - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn registers_all_ports() {
        let (ports, _m, engine) = setup(2);

        assert_eq!(engine.channel_count(), 2);
        assert_eq!(engine.max_block_size(), BLOCK);
        for name in [
            "ch1_in",
            "ch2_aux_ret",
            "ch2_out",
            "subgroup1_out",
            "subgroup8_out",
            "main_out_1",
            "main_out_2",
        ] {
            assert!(ports.key(name).is_some(), "{name} missing");
        }
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut ports = MemoryPorts::new(48_000, BLOCK);
        let _first = mixer(1, BLOCK, 48_000, &mut ports).unwrap();

        let second = mixer(1, BLOCK, 48_000, &mut ports);

        assert_eq!(
            second.map(|_| ()),
            Err(PortError::DuplicateName("ch1_in".into()))
        );
    }

    #[test]
    fn two_channel_scenario() {
        let (mut ports, m, mut engine) = setup(2);
        let ch1 = m.channel(1).unwrap();
        let ch2 = m.channel(2).unwrap();
        ch1.set_in_subgroup_pair(SubgroupPair::Pair12, true);
        ch1.set_panorama_raw(-100);
        ch2.set_in_subgroup_pair(SubgroupPair::Pair12, true);
        ch2.set_muted(true);
        feed(&mut ports, "ch1_in", 0.5);
        feed(&mut ports, "ch2_in", 0.25);

        run(&mut ports, &mut engine);

        assert_eq!(read(&ports, "subgroup1_out"), read(&ports, "ch1_out"));
        assert_eq!(read(&ports, "subgroup1_out"), vec![0.5; BLOCK]);
        assert_eq!(read(&ports, "subgroup2_out"), vec![0.0; BLOCK]);
        // Subgroup 1 is on main by default
        assert_eq!(read(&ports, "main_out_1"), vec![0.5; BLOCK]);
        assert_eq!(read(&ports, "main_out_2"), vec![0.0; BLOCK]);
    }

    #[test]
    fn center_pan_splits_evenly() {
        let (mut ports, m, mut engine) = setup(1);
        m.channel(1).unwrap().set_on_main(true);
        feed(&mut ports, "ch1_in", 1.0);

        run(&mut ports, &mut engine);

        assert_eq!(read(&ports, "main_out_1"), vec![0.5; BLOCK]);
        assert_eq!(read(&ports, "main_out_2"), vec![0.5; BLOCK]);
    }

    #[test]
    fn channel_solo_silences_others() {
        let (mut ports, m, mut engine) = setup(2);
        for channel in m.channels() {
            channel.set_on_main(true);
            channel.set_panorama_raw(-100);
        }
        m.channel(2).unwrap().set_soloed(true);
        feed(&mut ports, "ch1_in", 0.5);
        feed(&mut ports, "ch2_in", 0.25);

        run(&mut ports, &mut engine);

        assert_eq!(read(&ports, "main_out_1"), vec![0.25; BLOCK]);
        // Direct outs are not affected by solo
        assert_eq!(read(&ports, "ch1_out"), vec![0.5; BLOCK]);
    }

    #[test]
    fn subgroups_feed_main_by_parity() {
        let (mut ports, m, mut engine) = setup(1);
        let channel = m.channel(1).unwrap();
        channel.set_in_subgroup_pair(SubgroupPair::Pair34, true);
        // Full right: everything lands in subgroup 4
        channel.set_panorama_raw(100);
        feed(&mut ports, "ch1_in", 1.0);

        run(&mut ports, &mut engine);

        assert_eq!(read(&ports, "subgroup3_out"), vec![0.0; BLOCK]);
        assert_eq!(read(&ports, "subgroup4_out"), vec![1.0; BLOCK]);
        assert_eq!(read(&ports, "main_out_1"), vec![0.0; BLOCK]);
        assert_eq!(read(&ports, "main_out_2"), vec![1.0; BLOCK]);
    }

    #[test]
    fn subgroup_solo_and_mute() {
        let (mut ports, m, mut engine) = setup(1);
        let channel = m.channel(1).unwrap();
        channel.set_in_subgroup_pair(SubgroupPair::Pair12, true);
        channel.set_in_subgroup_pair(SubgroupPair::Pair34, true);
        channel.set_panorama_raw(-100);
        m.subgroup(3).unwrap().set_soloed(true);
        feed(&mut ports, "ch1_in", 0.5);

        run(&mut ports, &mut engine);
        // Only subgroup 3 reaches main, but subgroup 1 still meters.
        assert_eq!(read(&ports, "main_out_1"), vec![0.5; BLOCK]);
        assert!(m.subgroup(1).unwrap().peak_db() > SILENCE_DB);

        m.subgroup(3).unwrap().set_soloed(false);
        m.subgroup(3).unwrap().set_muted(true);
        run(&mut ports, &mut engine);
        assert_eq!(read(&ports, "main_out_1"), vec![0.5; BLOCK]);
        assert_eq!(read(&ports, "subgroup3_out"), vec![0.5; BLOCK]);

        m.subgroup(1).unwrap().set_on_main(false);
        run(&mut ports, &mut engine);
        assert_eq!(read(&ports, "main_out_1"), vec![0.0; BLOCK]);
    }

    #[test]
    fn muted_main_is_silent() {
        let (mut ports, m, mut engine) = setup(1);
        m.channel(1).unwrap().set_on_main(true);
        m.main(MainSide::Left).set_muted(true);
        feed(&mut ports, "ch1_in", 1.0);

        run(&mut ports, &mut engine);

        assert_eq!(read(&ports, "main_out_1"), vec![0.0; BLOCK]);
        assert_eq!(m.main(MainSide::Left).peak_db(), SILENCE_DB);
        assert_eq!(read(&ports, "main_out_2"), vec![0.5; BLOCK]);
        assert!(m.main(MainSide::Right).peak_db() > SILENCE_DB);
    }

    #[test]
    fn buses_are_cleared_every_block() {
        let (mut ports, m, mut engine) = setup(1);
        m.channel(1).unwrap().set_on_main(true);
        feed(&mut ports, "ch1_in", 1.0);

        run(&mut ports, &mut engine);
        run(&mut ports, &mut engine);

        assert_eq!(read(&ports, "main_out_1"), vec![0.5; BLOCK]);
    }

    #[test]
    fn smaller_blocks() {
        let (mut ports, m, mut engine) = setup(1);
        m.channel(1).unwrap().set_on_main(true);
        ports.set_block_size(2);
        feed(&mut ports, "ch1_in", 1.0);

        run(&mut ports, &mut engine);

        assert_eq!(read(&ports, "main_out_2"), vec![0.5; 2]);
    }

    #[test]
    fn state_round_trip() {
        let (_ports, m, _engine) = setup(3);
        let mut state = MixerState::with_channels(3);
        state.subgroups[2] = SubgroupState {
            fader_gain: -12,
            muted: true,
            soloed: true,
            on_main: false,
        };
        state.main[1] = MainState {
            fader_gain: 6,
            muted: true,
        };
        if let Some(channel) = state.channels.get_mut(&2) {
            channel.fader_gain = -30;
            channel.in_subgroup78 = true;
        }

        m.apply_state(&state);

        assert_eq!(m.state(), state);
    }

    #[test]
    fn channel_lookup() {
        let (_ports, m, _engine) = setup(3);

        assert_eq!(m.channel_count(), 3);
        assert_eq!(m.channel(3).unwrap().number(), 3);
        assert!(m.channel(0).is_none());
        assert!(m.channel(4).is_none());
        assert_eq!(m.subgroup(8).unwrap().number(), 8);
        assert!(m.subgroup(9).is_none());
        assert_eq!(m.main(MainSide::Right).side().number(), 2);
    }
}
