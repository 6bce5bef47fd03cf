//! Error vocabulary for the Image Processor (C8). Every function here is
//! pure byte-in/byte-out (spec.md §4.8) — there is no backend to report a
//! transient failure from, so every error is a permanent, caller-visible
//! rejection of malformed input.

#[derive(Debug, thiserror::Error)]
pub enum ImageProcessorError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
