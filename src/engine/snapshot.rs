use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::components::controls::{
    ControlRange, AUX_GAIN, EQ_AMOUNT, FADER_GAIN, INPUT_GAIN, LOW_FREQUENCY, MID_FREQUENCY,
    PANORAMA,
};
use super::{ChannelStripState, MainState, Mixer, MixerState, SubgroupState};

/// Extension of state documents on disk, without the leading dot.
pub const STATE_FILE_EXTENSION: &str = "mx2482";

impl MixerState {
    /// Converts the state to its flat document form.
    ///
    /// Every field is always written, with subgroups and main channels numbered from 1:
    /// `subgroup{n}Gain`, `subgroup{n}Muted`, `subgroup{n}Soloed`, `subgroup{n}OnMain`,
    /// `main{n}Gain`, `main{n}Muted` and one `channel{n}` object per channel.
    pub fn to_document(&self) -> Value {
        let mut document = Map::new();

        for (i, subgroup) in self.subgroups.iter().enumerate() {
            let n = i + 1;
            document.insert(format!("subgroup{n}Gain"), json!(subgroup.fader_gain));
            document.insert(format!("subgroup{n}Muted"), json!(subgroup.muted));
            document.insert(format!("subgroup{n}Soloed"), json!(subgroup.soloed));
            document.insert(format!("subgroup{n}OnMain"), json!(subgroup.on_main));
        }
        for (i, main) in self.main.iter().enumerate() {
            let n = i + 1;
            document.insert(format!("main{n}Gain"), json!(main.fader_gain));
            document.insert(format!("main{n}Muted"), json!(main.muted));
        }
        for (number, channel) in &self.channels {
            document.insert(format!("channel{number}"), json!(channel));
        }

        Value::Object(document)
    }

    /// Overwrites every field found in `document`.
    ///
    /// Fields that are absent, of the wrong type or out of range are skipped, keeping their current value.
    /// Channels are only read for numbers already present in `self.channels`.
    /// A document that isn't an object changes nothing.
    pub fn update_from_document(&mut self, document: &Value) {
        let Some(document) = document.as_object() else {
            debug!("State document is not an object, nothing loaded");
            return;
        };

        for (i, subgroup) in self.subgroups.iter_mut().enumerate() {
            let n = i + 1;
            read_subgroup(document, n, subgroup);
        }
        for (i, main) in self.main.iter_mut().enumerate() {
            let n = i + 1;
            read_main(document, n, main);
        }
        for (number, channel) in self.channels.iter_mut() {
            let key = format!("channel{number}");
            match document.get(&key) {
                Some(Value::Object(fields)) => read_channel(fields, &key, channel),
                Some(_) => debug!(field = key, "Skipped channel, not an object"),
                None => debug!(field = key, "Channel missing from document"),
            }
        }
    }
}

fn read_subgroup(document: &Map<String, Value>, n: usize, state: &mut SubgroupState) {
    let reader = FieldReader::new(document, "");
    reader.int(&format!("subgroup{n}Gain"), FADER_GAIN, &mut state.fader_gain);
    reader.flag(&format!("subgroup{n}Muted"), &mut state.muted);
    reader.flag(&format!("subgroup{n}Soloed"), &mut state.soloed);
    reader.flag(&format!("subgroup{n}OnMain"), &mut state.on_main);
}

fn read_main(document: &Map<String, Value>, n: usize, state: &mut MainState) {
    let reader = FieldReader::new(document, "");
    reader.int(&format!("main{n}Gain"), FADER_GAIN, &mut state.fader_gain);
    reader.flag(&format!("main{n}Muted"), &mut state.muted);
}

fn read_channel(fields: &Map<String, Value>, channel: &str, state: &mut ChannelStripState) {
    let r = FieldReader::new(fields, channel);

    r.int("inputGain", INPUT_GAIN, &mut state.input_gain);

    r.flag("eqActive", &mut state.eq_active);
    r.int("highAmount", EQ_AMOUNT, &mut state.high_amount);
    r.int("midFrequency", MID_FREQUENCY, &mut state.mid_frequency);
    r.int("midAmount", EQ_AMOUNT, &mut state.mid_amount);
    r.int("lowFrequency", LOW_FREQUENCY, &mut state.low_frequency);
    r.int("lowAmount", EQ_AMOUNT, &mut state.low_amount);

    r.flag("auxActive", &mut state.aux_active);
    r.int("auxSendGain", AUX_GAIN, &mut state.aux_send_gain);
    r.int("auxReturnGain", AUX_GAIN, &mut state.aux_return_gain);

    r.flag("muted", &mut state.muted);
    r.flag("soloed", &mut state.soloed);

    r.flag("inSubgroup12", &mut state.in_subgroup12);
    r.flag("inSubgroup34", &mut state.in_subgroup34);
    r.flag("inSubgroup56", &mut state.in_subgroup56);
    r.flag("inSubgroup78", &mut state.in_subgroup78);

    r.int("faderGain", FADER_GAIN, &mut state.fader_gain);
    r.flag("onMain", &mut state.on_main);

    r.int("panorama", PANORAMA, &mut state.panorama);
}

/// Reads single fields out of a document object, logging every field it has to skip.
struct FieldReader<'a> {
    fields: &'a Map<String, Value>,
    /// Name of the enclosing object, for logging. Empty at the top level.
    parent: &'a str,
}
impl<'a> FieldReader<'a> {
    fn new(fields: &'a Map<String, Value>, parent: &'a str) -> Self {
        Self { fields, parent }
    }

    fn int(&self, key: &str, range: ControlRange, target: &mut i32) {
        let Some(value) = self.fields.get(key) else {
            debug!(parent = self.parent, field = key, "Field missing, skipped");
            return;
        };
        let Some(number) = value.as_f64() else {
            debug!(parent = self.parent, field = key, %value, "Field is not a number, skipped");
            return;
        };
        match range.from_document(number) {
            Some(units) => *target = units,
            None => debug!(
                parent = self.parent,
                field = key,
                number,
                min = range.min,
                max = range.max,
                "Field out of range, skipped"
            ),
        }
    }

    fn flag(&self, key: &str, target: &mut bool) {
        match self.fields.get(key) {
            Some(Value::Bool(value)) => *target = *value,
            Some(value) => {
                debug!(parent = self.parent, field = key, %value, "Field is not a boolean, skipped")
            }
            None => debug!(parent = self.parent, field = key, "Field missing, skipped"),
        }
    }
}

/// Appends the `.mx2482` extension to `path`, unless it already ends with it.
pub fn with_state_extension(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|extension| extension == STATE_FILE_EXTENSION) {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(STATE_FILE_EXTENSION);
    PathBuf::from(name)
}

impl Mixer {
    /// Document of every control on the console.
    pub fn store(&self) -> Value {
        self.state().to_document()
    }

    /// Sets every control found in `document`, leaving the rest untouched.
    pub fn load(&self, document: &Value) {
        let mut state = self.state();
        state.update_from_document(document);
        self.apply_state(&state);
    }

    /// Returns the console to its rest position.
    ///
    /// Every gain at 0 dB, every mute, solo, aux loop and equalizer switch off,
    /// equalizer frequencies at rest, channels assigned nowhere and centered,
    /// and every subgroup on the main bus.
    pub fn reset_controls(&self) {
        self.apply_state(&MixerState::with_channels(self.channel_count()));
        info!("Reset all controls");
    }

    /// Writes the current state as pretty-printed JSON.
    ///
    /// The `.mx2482` extension is appended to `path` if missing. Returns the path actually written.
    pub fn save_state(&self, path: impl AsRef<Path>) -> Result<PathBuf, SnapshotError> {
        let path = with_state_extension(path.as_ref());
        serde_json::to_string_pretty(&self.store())
            .map_err(io::Error::from)
            .and_then(|contents| fs::write(&path, contents))
            .map_err(|source| SnapshotError::Io {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), "Saved state");
        Ok(path)
    }

    /// Reads a state file and loads it like [`Self::load`].
    pub fn load_state(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: Value =
            serde_json::from_str(&contents).map_err(|source| SnapshotError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if !document.is_object() {
            return Err(SnapshotError::NotAnObject {
                path: path.to_path_buf(),
            });
        }

        self.load(&document);
        info!(path = %path.display(), "Loaded state");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("Could not access state file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("State file {} is not valid JSON: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("State file {} does not hold a JSON object", path.display())]
    NotAnObject { path: PathBuf },
}
