use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::controls::{
    normalize_panorama, AUX_GAIN, EQ_AMOUNT, FADER_GAIN, INPUT_GAIN, LOW_FREQUENCY,
    MID_FREQUENCY, PANORAMA,
};
use super::equalizer::{EqualizerSettings, ThreeBandEqualizer};
use super::gain::GainStage;
use super::parameter::{Flag, IntParameter, PeakLevel};
use crate::engine::ports::{self, PortBuffers, PortError, PortKey, PortRegistry};
use crate::engine::traits::Stage;
use crate::engine::{Info, Sample, SampleBuffer};

/// A stereo pair of subgroups a channel can be assigned to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubgroupPair {
    Pair12,
    Pair34,
    Pair56,
    Pair78,
}
impl SubgroupPair {
    pub const ALL: [SubgroupPair; 4] = [Self::Pair12, Self::Pair34, Self::Pair56, Self::Pair78];

    /// Zero-based index of the odd (left) subgroup of the pair. The even (right) one follows it.
    pub fn left_index(self) -> usize {
        self.index() * 2
    }

    fn index(self) -> usize {
        match self {
            Self::Pair12 => 0,
            Self::Pair34 => 1,
            Self::Pair56 => 2,
            Self::Pair78 => 3,
        }
    }
}

/// Parameters of one channel, shared between [`ChannelStrip`] and [`ChannelStripProcessor`].
#[derive(Debug)]
struct ChannelParameters {
    input_gain: IntParameter,
    fader_gain: IntParameter,
    aux_send_gain: IntParameter,
    aux_return_gain: IntParameter,

    low_amount: IntParameter,
    low_frequency: IntParameter,
    mid_amount: IntParameter,
    mid_frequency: IntParameter,
    high_amount: IntParameter,

    panorama: IntParameter,

    equalizer_enabled: Flag,
    aux_loop_enabled: Flag,
    muted: Flag,
    soloed: Flag,
    on_main: Flag,
    subgroup_pairs: [Flag; 4],

    peak: PeakLevel,
}
impl ChannelParameters {
    fn new() -> Self {
        Self {
            input_gain: IntParameter::new(INPUT_GAIN),
            fader_gain: IntParameter::new(FADER_GAIN),
            aux_send_gain: IntParameter::new(AUX_GAIN),
            aux_return_gain: IntParameter::new(AUX_GAIN),

            low_amount: IntParameter::new(EQ_AMOUNT),
            low_frequency: IntParameter::new(LOW_FREQUENCY),
            mid_amount: IntParameter::new(EQ_AMOUNT),
            mid_frequency: IntParameter::new(MID_FREQUENCY),
            high_amount: IntParameter::new(EQ_AMOUNT),

            panorama: IntParameter::new(PANORAMA),

            equalizer_enabled: Flag::new(false),
            aux_loop_enabled: Flag::new(false),
            muted: Flag::new(false),
            soloed: Flag::new(false),
            on_main: Flag::new(false),
            subgroup_pairs: crate::non_copy_array![Flag::new(false); 4],

            peak: PeakLevel::new(),
        }
    }

    fn equalizer_settings(&self) -> EqualizerSettings {
        EqualizerSettings {
            low_amount: self.low_amount.get() as f32,
            low_frequency: self.low_frequency.get() as f32,
            mid_amount: self.mid_amount.get() as f32,
            mid_frequency: self.mid_frequency.get() as f32,
            high_amount: self.high_amount.get() as f32,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ChannelPorts {
    input: PortKey,
    aux_send: PortKey,
    aux_return: PortKey,
    direct_out: PortKey,
}

/// Creates a corresponding pair of [`ChannelStrip`] and [`ChannelStripProcessor`],
/// registering the channel's four ports (`ch{n}_in`, `ch{n}_aux_send`, `ch{n}_aux_ret`, `ch{n}_out`).
///
/// [`ChannelStripProcessor`] should live on the audio thread, while [`ChannelStrip`] can live wherever else.
pub fn channel_strip<R: PortRegistry + ?Sized>(
    number: u32,
    sample_rate: u32,
    registry: &mut R,
) -> Result<(ChannelStrip, ChannelStripProcessor), PortError> {
    let ports = ChannelPorts {
        input: registry.register_input(&ports::channel_in(number))?,
        aux_send: registry.register_output(&ports::channel_aux_send(number))?,
        aux_return: registry.register_input(&ports::channel_aux_return(number))?,
        direct_out: registry.register_output(&ports::channel_out(number))?,
    };

    let parameters = Arc::new(ChannelParameters::new());
    let gain = |parameter: &IntParameter| GainStage::new(parameter.get() as f32);

    let processor = ChannelStripProcessor {
        ports,

        input_stage: gain(&parameters.input_gain),
        equalizer: ThreeBandEqualizer::new(parameters.equalizer_settings(), sample_rate),
        aux_send_stage: gain(&parameters.aux_send_gain),
        aux_return_stage: gain(&parameters.aux_return_gain),
        fader_stage: gain(&parameters.fader_gain),

        routing: Routing::default(),
        parameters: Arc::clone(&parameters),
    };

    Ok((ChannelStrip { number, parameters }, processor))
}

/// Control handle of a channel strip.
///
/// Setters take `&self` and clamp to the control's range; the audio thread picks changes up on its next block.
#[derive(Debug)]
pub struct ChannelStrip {
    number: u32,
    parameters: Arc<ChannelParameters>,
}
impl ChannelStrip {
    /// Channel number, starting at 1.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Input gain, in dB.
    pub fn input_gain(&self) -> i32 {
        self.parameters.input_gain.get()
    }
    pub fn set_input_gain(&self, db: i32) {
        self.parameters.input_gain.set(db)
    }

    /// Fader gain, in dB.
    pub fn fader_gain(&self) -> i32 {
        self.parameters.fader_gain.get()
    }
    pub fn set_fader_gain(&self, db: i32) {
        self.parameters.fader_gain.set(db)
    }

    pub fn aux_send_gain(&self) -> i32 {
        self.parameters.aux_send_gain.get()
    }
    pub fn set_aux_send_gain(&self, db: i32) {
        self.parameters.aux_send_gain.set(db)
    }

    pub fn aux_return_gain(&self) -> i32 {
        self.parameters.aux_return_gain.get()
    }
    pub fn set_aux_return_gain(&self, db: i32) {
        self.parameters.aux_return_gain.set(db)
    }

    pub fn low_amount(&self) -> i32 {
        self.parameters.low_amount.get()
    }
    pub fn set_low_amount(&self, db: i32) {
        self.parameters.low_amount.set(db)
    }

    pub fn low_frequency(&self) -> i32 {
        self.parameters.low_frequency.get()
    }
    pub fn set_low_frequency(&self, hz: i32) {
        self.parameters.low_frequency.set(hz)
    }

    pub fn mid_amount(&self) -> i32 {
        self.parameters.mid_amount.get()
    }
    pub fn set_mid_amount(&self, db: i32) {
        self.parameters.mid_amount.set(db)
    }

    pub fn mid_frequency(&self) -> i32 {
        self.parameters.mid_frequency.get()
    }
    pub fn set_mid_frequency(&self, hz: i32) {
        self.parameters.mid_frequency.set(hz)
    }

    pub fn high_amount(&self) -> i32 {
        self.parameters.high_amount.get()
    }
    pub fn set_high_amount(&self, db: i32) {
        self.parameters.high_amount.set(db)
    }

    /// Raw pan position, -100 (full left) ..= 100 (full right).
    pub fn panorama_raw(&self) -> i32 {
        self.parameters.panorama.get()
    }
    pub fn set_panorama_raw(&self, raw: i32) {
        self.parameters.panorama.set(raw)
    }
    /// Pan position normalized to `0.0` (full left) ..= `1.0` (full right).
    pub fn panorama(&self) -> f32 {
        normalize_panorama(self.panorama_raw())
    }

    pub fn is_equalizer_enabled(&self) -> bool {
        self.parameters.equalizer_enabled.get()
    }
    pub fn set_equalizer_enabled(&self, enabled: bool) {
        self.parameters.equalizer_enabled.set(enabled)
    }

    pub fn is_aux_loop_enabled(&self) -> bool {
        self.parameters.aux_loop_enabled.get()
    }
    pub fn set_aux_loop_enabled(&self, enabled: bool) {
        self.parameters.aux_loop_enabled.set(enabled)
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

    pub fn is_in_subgroup_pair(&self, pair: SubgroupPair) -> bool {
        self.parameters.subgroup_pairs[pair.index()].get()
    }
    pub fn set_in_subgroup_pair(&self, pair: SubgroupPair, assigned: bool) {
        self.parameters.subgroup_pairs[pair.index()].set(assigned)
    }

    /// Peak of the last processed block, post-fader, in dB.
    pub fn peak_db(&self) -> f32 {
        self.parameters.peak.read()
    }

    /// Takes a snapshot of the current state of the channel.
    pub fn state(&self) -> ChannelStripState {
        let p = &*self.parameters;
        ChannelStripState {
            input_gain: p.input_gain.get(),
            eq_active: p.equalizer_enabled.get(),
            high_amount: p.high_amount.get(),
            mid_frequency: p.mid_frequency.get(),
            mid_amount: p.mid_amount.get(),
            low_frequency: p.low_frequency.get(),
            low_amount: p.low_amount.get(),
            aux_active: p.aux_loop_enabled.get(),
            aux_send_gain: p.aux_send_gain.get(),
            aux_return_gain: p.aux_return_gain.get(),
            muted: p.muted.get(),
            soloed: p.soloed.get(),
            in_subgroup12: p.subgroup_pairs[0].get(),
            in_subgroup34: p.subgroup_pairs[1].get(),
            in_subgroup56: p.subgroup_pairs[2].get(),
            in_subgroup78: p.subgroup_pairs[3].get(),
            fader_gain: p.fader_gain.get(),
            on_main: p.on_main.get(),
            panorama: p.panorama.get(),
        }
    }

    /// Sets every parameter to the given state.
    pub fn apply_state(&self, state: &ChannelStripState) {
        let p = &*self.parameters;
        p.input_gain.set(state.input_gain);
        p.equalizer_enabled.set(state.eq_active);
        p.high_amount.set(state.high_amount);
        p.mid_frequency.set(state.mid_frequency);
        p.mid_amount.set(state.mid_amount);
        p.low_frequency.set(state.low_frequency);
        p.low_amount.set(state.low_amount);
        p.aux_loop_enabled.set(state.aux_active);
        p.aux_send_gain.set(state.aux_send_gain);
        p.aux_return_gain.set(state.aux_return_gain);
        p.muted.set(state.muted);
        p.soloed.set(state.soloed);
        p.subgroup_pairs[0].set(state.in_subgroup12);
        p.subgroup_pairs[1].set(state.in_subgroup34);
        p.subgroup_pairs[2].set(state.in_subgroup56);
        p.subgroup_pairs[3].set(state.in_subgroup78);
        p.fader_gain.set(state.fader_gain);
        p.on_main.set(state.on_main);
        p.panorama.set(state.panorama);
    }

    /// Every gain to 0 dB, every button off, equalizer frequencies to their rest position and pan to center.
    pub fn reset_controls(&self) {
        self.apply_state(&ChannelStripState::default());
    }
}

/// Contains everything about a channel that is stored in a state document.
///
/// Field names, serialized in camel case, are the document format.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStripState {
    pub input_gain: i32,

    pub eq_active: bool,
    pub high_amount: i32,
    pub mid_frequency: i32,
    pub mid_amount: i32,
    pub low_frequency: i32,
    pub low_amount: i32,

    pub aux_active: bool,
    pub aux_send_gain: i32,
    pub aux_return_gain: i32,

    pub muted: bool,
    pub soloed: bool,

    pub in_subgroup12: bool,
    pub in_subgroup34: bool,
    pub in_subgroup56: bool,
    pub in_subgroup78: bool,

    pub fader_gain: i32,
    pub on_main: bool,

    pub panorama: i32,
}
impl Default for ChannelStripState {
    fn default() -> Self {
        Self {
            input_gain: INPUT_GAIN.rest,

            eq_active: false,
            high_amount: EQ_AMOUNT.rest,
            mid_frequency: MID_FREQUENCY.rest,
            mid_amount: EQ_AMOUNT.rest,
            low_frequency: LOW_FREQUENCY.rest,
            low_amount: EQ_AMOUNT.rest,

            aux_active: false,
            aux_send_gain: AUX_GAIN.rest,
            aux_return_gain: AUX_GAIN.rest,

            muted: false,
            soloed: false,

            in_subgroup12: false,
            in_subgroup34: false,
            in_subgroup56: false,
            in_subgroup78: false,

            fader_gain: FADER_GAIN.rest,
            on_main: false,

            panorama: PANORAMA.rest,
        }
    }
}

/// Routing flags latched at the start of a block, so one block sees one consistent set of decisions.
#[derive(Debug, Clone, Copy, Default)]
struct Routing {
    muted: bool,
    soloed: bool,
    on_main: bool,
    subgroup_pairs: [bool; 4],
    panorama: f32,
}

/// Audio thread half of a channel strip.
#[derive(Debug)]
pub struct ChannelStripProcessor {
    ports: ChannelPorts,
    parameters: Arc<ChannelParameters>,

    input_stage: GainStage,
    equalizer: ThreeBandEqualizer,
    aux_send_stage: GainStage,
    aux_return_stage: GainStage,
    fader_stage: GainStage,

    routing: Routing,
}
impl ChannelStripProcessor {
    /// Reads the routing flags and pan position for the coming block.
    pub fn latch(&mut self) {
        let p = &*self.parameters;
        self.routing = Routing {
            muted: p.muted.get(),
            soloed: p.soloed.get(),
            on_main: p.on_main.get(),
            subgroup_pairs: [0, 1, 2, 3].map(|i| p.subgroup_pairs[i].get()),
            panorama: normalize_panorama(p.panorama.get()),
        };
    }

    pub fn is_muted(&self) -> bool {
        self.routing.muted
    }
    pub fn is_soloed(&self) -> bool {
        self.routing.soloed
    }
    pub fn is_on_main(&self) -> bool {
        self.routing.on_main
    }
    pub fn is_in_subgroup_pair(&self, pair: SubgroupPair) -> bool {
        self.routing.subgroup_pairs[pair.index()]
    }
    /// Pan position, `0.0` (full left, odd bus) ..= `1.0` (full right, even bus).
    pub fn panorama(&self) -> f32 {
        self.routing.panorama
    }

    /// Runs the channel's signal chain for the current block, writing the result to `output`.
    ///
    /// In order: input gain, equalizer (if enabled), aux loop (if enabled), fader, peak metering.
    /// The aux loop is an insert: the signal is sent out, and whatever comes back on the aux return replaces it.
    /// The result is also copied to the channel's direct out.
    ///
    /// Must be called at most once per block, since gain stages carry state from one block to the next.
    pub fn process<P: PortBuffers + ?Sized>(
        &mut self,
        info: &Info,
        ports: &mut P,
        output: &mut [Sample],
    ) {
        let p = &*self.parameters;

        ports.input(self.ports.input).copy_to(output);

        self.input_stage.set_gain(p.input_gain.get() as f32);
        self.input_stage.process(output);

        if p.equalizer_enabled.get() {
            self.equalizer.set(p.equalizer_settings());
            Stage::process(&mut self.equalizer, info, output);
        }

        let aux_send = ports.output(self.ports.aux_send);
        if p.aux_loop_enabled.get() {
            output.copy_to(aux_send);
            self.aux_send_stage.set_gain(p.aux_send_gain.get() as f32);
            self.aux_send_stage.process(aux_send);

            ports.input(self.ports.aux_return).copy_to(output);
            self.aux_return_stage.set_gain(p.aux_return_gain.get() as f32);
            self.aux_return_stage.process(output);
        } else {
            aux_send.clear();
        }

        self.fader_stage.set_gain(p.fader_gain.get() as f32);
        self.fader_stage.process(output);

        p.peak.report(output.peak_db());

        output.copy_to(ports.output(self.ports.direct_out));
    }
}
