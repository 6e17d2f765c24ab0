//! The NFC transport capability.
//!
//! A transport gives the session exclusive access to one tag at a time:
//! claim a technology, inspect the tag, exchange raw command bytes, release.
//! Methods use native `async fn` in traits (Edition 2024).

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::{TagHandle, TagInfo};
use farecard_core::Technology;

/// Raw command channel to a contactless tag.
///
/// Native `async fn` makes this trait non object-safe. For dynamic dispatch
/// use [`AnyNfcTransport`](crate::devices::AnyNfcTransport).
///
/// # Examples
///
/// ```no_run
/// use farecard_core::Technology;
/// use farecard_hardware::traits::NfcTransport;
/// use farecard_hardware::error::Result;
///
/// async fn uid<T: NfcTransport>(transport: &mut T) -> Result<String> {
///     let handle = transport.request_technology(&[Technology::IsoDep]).await?;
///     let info = transport.get_tag(&handle).await;
///     transport.release_technology().await?;
///     Ok(info?.uid_hex())
/// }
/// ```
pub trait NfcTransport: Send + Sync {
    /// Wait for a tag and claim the first technology in `priority` it supports.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::TechnologyRejected`](crate::HardwareError::TechnologyRejected)
    /// if the tag supports none of them, or a fatal error if the adapter is
    /// unavailable.
    async fn request_technology(&mut self, priority: &[Technology]) -> Result<TagHandle>;

    /// Identify the tag behind `handle`.
    async fn get_tag(&mut self, handle: &TagHandle) -> Result<TagInfo>;

    /// Send one command and wait for the tag's response.
    ///
    /// The response is returned verbatim, status words included.
    async fn transceive(&mut self, handle: &TagHandle, command: &[u8]) -> Result<Vec<u8>>;

    /// Release the claimed technology, cancelling any pending request.
    ///
    /// Safe to call when nothing is claimed.
    async fn release_technology(&mut self) -> Result<()>;
}
