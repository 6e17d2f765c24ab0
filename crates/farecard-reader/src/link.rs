//! Command channel a driver uses to talk to the claimed tag.
//!
//! [`SessionLink`] borrows the transport and the session's handle for the
//! duration of one driver run. Every command first checks the session's
//! cancellation token, so a cancelled session stops between two round trips
//! without interrupting one that is already on the air.
//!
//! Errors are sorted here once for all drivers: fatal transport failures
//! come back as `Err`, and a command the tag refused comes back as `Ok(None)`
//! so the driver can skip the unit it was reading.

use crate::error::Result;
use farecard_core::bytes::bytes_to_hex;
use farecard_hardware::{HardwareError, NfcTransport, TagHandle};
use farecard_protocol::ApduResponse;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

pub struct SessionLink<'a, T: NfcTransport> {
    transport: &'a mut T,
    handle: &'a TagHandle,
    cancel: &'a CancellationToken,
    commands: usize,
}

impl<'a, T: NfcTransport> SessionLink<'a, T> {
    pub fn new(transport: &'a mut T, handle: &'a TagHandle, cancel: &'a CancellationToken) -> Self {
        Self {
            transport,
            handle,
            cancel,
            commands: 0,
        }
    }

    /// Number of commands sent through this link.
    pub fn commands_sent(&self) -> usize {
        self.commands
    }

    pub fn handle(&self) -> &TagHandle {
        self.handle
    }

    /// Send one raw command and return the tag's response verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::Cancelled`] without touching the transport
    /// if the session has been cancelled, otherwise whatever the transport
    /// reports.
    pub async fn transceive(&mut self, command: &[u8]) -> std::result::Result<Vec<u8>, HardwareError> {
        if self.cancel.is_cancelled() {
            return Err(HardwareError::Cancelled);
        }

        self.commands += 1;
        trace!(command = %bytes_to_hex(command), "-> tag");
        let response = self.transport.transceive(self.handle, command).await?;
        trace!(response = %bytes_to_hex(&response), "<- tag");
        Ok(response)
    }

    /// Send one command, treating a non-fatal failure as "no answer".
    ///
    /// # Errors
    ///
    /// Only fatal errors (tag lost, cancelled, adapter gone) are returned.
    pub async fn exchange(&mut self, command: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.transceive(command).await {
            Ok(response) => Ok(Some(response)),
            Err(error) if error.is_fatal() => Err(error.into()),
            Err(error) => {
                debug!(%error, command = %bytes_to_hex(command), "Command failed");
                Ok(None)
            }
        }
    }

    /// Send an ISO 7816 APDU and return its data if the status is `90 00`.
    pub async fn iso(&mut self, command: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.apdu(command).await?.and_then(|response| {
            let status = response.status_word();
            response
                .into_iso_data()
                .inspect_err(|_| debug!(status = %format!("{status:04X}"), "APDU refused"))
                .ok()
        }))
    }

    /// Send a wrapped DESFire command and return its data if the status is
    /// `91 00` or `91 AF`.
    pub async fn desfire(&mut self, command: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.apdu(command).await?.and_then(|response| {
            let status = response.status_word();
            response
                .into_desfire_data()
                .inspect_err(|_| debug!(status = %format!("{status:04X}"), "DESFire command refused"))
                .ok()
        }))
    }

    async fn apdu(&mut self, command: &[u8]) -> Result<Option<ApduResponse>> {
        let Some(raw) = self.exchange(command).await? else {
            return Ok(None);
        };
        match ApduResponse::from_bytes(&raw) {
            Ok(response) => Ok(Some(response)),
            Err(error) => {
                debug!(%error, "Malformed APDU response");
                Ok(None)
            }
        }
    }
}
