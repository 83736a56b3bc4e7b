//! Digest formatting and delivery
//!
//! Classification results are rendered as fixed-layout text blocks, packed
//! into messages that respect the webhook's size limit, and posted one by
//! one. A failed post is recorded in the [`DeliveryReport`] and the
//! remaining messages are still sent.

mod format;
mod sender;

pub use sender::{DeliveryReport, DigestSender};
