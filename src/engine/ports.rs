use tracing::debug;

use super::{Sample, SampleBuffer};

/// Handle to a registered port, valid for the [`PortRegistry`] that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortKey {
    direction: PortDirection,
    index: usize,
}
impl PortKey {
    pub fn direction(&self) -> PortDirection {
        self.direction
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
}

/// Registration side of the audio transport.
///
/// Ports are registered once, at construction of the mixer components, with names unique per registry.
pub trait PortRegistry {
    fn register_input(&mut self, name: &str) -> Result<PortKey, PortError>;
    fn register_output(&mut self, name: &str) -> Result<PortKey, PortError>;
}

/// Per-block side of the audio transport.
///
/// All buffers handed out during one block have exactly [`Self::block_size`] samples.
pub trait PortBuffers {
    fn block_size(&self) -> usize;
    fn sample_rate(&self) -> u32;

    /// Buffer of an input port. Panics if `key` is not an input port of this transport.
    fn input(&self, key: PortKey) -> &[Sample];
    /// Buffer of an output port. Panics if `key` is not an output port of this transport.
    fn output(&mut self, key: PortKey) -> &mut [Sample];
}

pub fn channel_in(channel: u32) -> String {
    format!("ch{channel}_in")
}
pub fn channel_aux_send(channel: u32) -> String {
    format!("ch{channel}_aux_send")
}
pub fn channel_aux_return(channel: u32) -> String {
    format!("ch{channel}_aux_ret")
}
pub fn channel_out(channel: u32) -> String {
    format!("ch{channel}_out")
}
pub fn subgroup_out(subgroup: usize) -> String {
    format!("subgroup{subgroup}_out")
}
pub fn main_out(side: usize) -> String {
    format!("main_out_{side}")
}

#[derive(Debug)]
struct Port {
    name: String,
    buffer: Vec<Sample>,
}

/// Ports backed by plain memory.
///
/// Used for headless operation, by the transports, and for testing:
/// fill the input ports, run a block, read the output ports.
#[derive(Debug)]
pub struct MemoryPorts {
    sample_rate: u32,
    max_block_size: usize,
    block_size: usize,

    inputs: Vec<Port>,
    outputs: Vec<Port>,
}
impl MemoryPorts {
    pub fn new(sample_rate: u32, max_block_size: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            block_size: max_block_size,

            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    /// Sets the size of the following blocks.
    ///
    /// Panics if `block_size` exceeds the maximum given at construction.
    pub fn set_block_size(&mut self, block_size: usize) {
        assert!(
            block_size <= self.max_block_size,
            "A block of size {} was requested, which exceeds the biggest producible size of {}.",
            block_size,
            self.max_block_size
        );
        self.block_size = block_size;
    }

    /// Looks up a port of either direction by name.
    pub fn key(&self, name: &str) -> Option<PortKey> {
        let find = |ports: &[Port], direction| {
            ports
                .iter()
                .position(|port| port.name == name)
                .map(|index| PortKey { direction, index })
        };
        find(&self.inputs, PortDirection::Input)
            .or_else(|| find(&self.outputs, PortDirection::Output))
    }

    /// Like [`Self::key`], but errors if the port is missing or points the wrong way.
    pub fn expect_key(&self, name: &str, direction: PortDirection) -> Result<PortKey, PortError> {
        match self.key(name) {
            Some(key) if key.direction == direction => Ok(key),
            _ => Err(PortError::UnknownPort(name.to_owned())),
        }
    }

    pub fn name(&self, key: PortKey) -> &str {
        match key.direction {
            PortDirection::Input => &self.inputs[key.index].name,
            PortDirection::Output => &self.outputs[key.index].name,
        }
    }

    /// Writable view of an input port, for feeding signal into the mixer.
    pub fn input_mut(&mut self, key: PortKey) -> &mut [Sample] {
        debug_assert_eq!(key.direction, PortDirection::Input, "{key:?} is not an input");
        &mut self.inputs[key.index].buffer[..self.block_size]
    }

    /// Read-only view of an output port, for collecting signal from the mixer.
    pub fn output_ref(&self, key: PortKey) -> &[Sample] {
        debug_assert_eq!(key.direction, PortDirection::Output, "{key:?} is not an output");
        &self.outputs[key.index].buffer[..self.block_size]
    }

    /// Zero-fill every input port.
    pub fn silence_inputs(&mut self) {
        let block_size = self.block_size;
        for port in &mut self.inputs {
            port.buffer[..block_size].clear();
        }
    }

    fn register(&mut self, name: &str, direction: PortDirection) -> Result<PortKey, PortError> {
        if self.key(name).is_some() {
            return Err(PortError::DuplicateName(name.to_owned()));
        }

        let port = Port {
            name: name.to_owned(),
            buffer: vec![0.0; self.max_block_size],
        };
        let ports = match direction {
            PortDirection::Input => &mut self.inputs,
            PortDirection::Output => &mut self.outputs,
        };
        ports.push(port);
        debug!(port = name, ?direction, "Registered port");

        Ok(PortKey {
            direction,
            index: ports.len() - 1,
        })
    }
}
impl PortRegistry for MemoryPorts {
    fn register_input(&mut self, name: &str) -> Result<PortKey, PortError> {
        self.register(name, PortDirection::Input)
    }
    fn register_output(&mut self, name: &str) -> Result<PortKey, PortError> {
        self.register(name, PortDirection::Output)
    }
}
impl PortBuffers for MemoryPorts {
    fn block_size(&self) -> usize {
        self.block_size
    }
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn input(&self, key: PortKey) -> &[Sample] {
        debug_assert_eq!(key.direction, PortDirection::Input, "{key:?} is not an input");
        &self.inputs[key.index].buffer[..self.block_size]
    }
    fn output(&mut self, key: PortKey) -> &mut [Sample] {
        debug_assert_eq!(key.direction, PortDirection::Output, "{key:?} is not an output");
        &mut self.outputs[key.index].buffer[..self.block_size]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("A port named '{0}' is already registered")]
    DuplicateName(String),
    #[error("No port named '{0}' with the expected direction")]
    UnknownPort(String),
}
