pub use super::{
    config::ConfigError, ports::PortError, snapshot::SnapshotError, transport::TransportError,
};
