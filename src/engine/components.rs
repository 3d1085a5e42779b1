pub mod channel_strip;
pub mod controls;
pub mod equalizer;
pub mod gain;
pub mod mixer;
pub mod parameter;
