//! Strato Transfer Library
//!
//! The transfer channel: one invocation uploads one file's bytes to the
//! object-storage backend, emitting progress percentages along the way and
//! exactly one terminal outcome at the end.

pub mod http;
pub mod traits;

pub use http::HttpTransferChannel;
pub use traits::{
    ProgressSender, TransferChannel, TransferError, TransferReceipt, TransferRequest,
    TransferResult,
};
