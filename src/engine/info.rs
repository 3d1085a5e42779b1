/// Properties of the block currently being processed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Info {
    pub sample_rate: u32,
    pub block_size: usize,
}
impl Info {
    pub fn new(sample_rate: u32, block_size: usize) -> Self {
        Info {
            sample_rate,
            block_size,
        }
    }
}
