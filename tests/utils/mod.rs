#![allow(dead_code)]

use mx2482::{mixer, MemoryPorts, MixBusEngine, Mixer, Sample};

pub const SAMPLE_RATE: u32 = 48_000;

pub fn console(channels: u32, block_size: usize) -> (MemoryPorts, Mixer, MixBusEngine) {
    let mut ports = MemoryPorts::new(SAMPLE_RATE, block_size);
    let (m, engine) = mixer(channels, block_size, SAMPLE_RATE, &mut ports).unwrap();
    (ports, m, engine)
}

pub fn feed(ports: &mut MemoryPorts, name: &str, signal: &[Sample]) {
    let key = ports.key(name).unwrap();
    ports.input_mut(key).copy_from_slice(signal);
}

pub fn read(ports: &MemoryPorts, name: &str) -> Vec<Sample> {
    ports.output_ref(ports.key(name).unwrap()).to_vec()
}

pub fn sine(frequency: f32, length: usize) -> Vec<Sample> {
    (0..length)
        .map(|i| (std::f32::consts::TAU * frequency * i as f32 / SAMPLE_RATE as f32).sin() * 0.5)
        .collect()
}
