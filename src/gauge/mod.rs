pub mod frame;
pub mod mnemonic;
pub mod protocol;
pub mod report;
pub mod setup;
pub mod stats;
pub mod transport;
