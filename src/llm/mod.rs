pub mod stream_decoder;
pub mod transport;
