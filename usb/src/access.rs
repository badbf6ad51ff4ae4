use crate::device::base::{DeviceOpener, DeviceSession};
use crate::error::RelayError;
use log::{debug, warn};
use parking_lot::Mutex;
use relay_types::DeviceIdentity;
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

// Both supported board types only expose the one interface we care about.
pub const RELAY_INTERFACE: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClaimPolicy {
    /// Hard upper bound on how long a claim may keep retrying while the device is busy.
    pub timeout: Duration,
    pub retry_interval: Duration,
}

impl Default for ClaimPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
            retry_interval: Duration::from_millis(10),
        }
    }
}

/// Exclusive access to one device's relay interface.
///
/// Every operation opens the device, claims the interface, runs, then releases and closes
/// again. Other processes (or other agents) driving the same board get their turn in between,
/// and a busy device is retried until the policy's deadline. Within this process, operations
/// on one device are serialised so only one claimed session exists at a time.
pub struct ExclusiveAccess {
    identity: DeviceIdentity,
    opener: Arc<dyn DeviceOpener>,
    policy: ClaimPolicy,
    session_lock: Mutex<()>,
}

impl ExclusiveAccess {
    pub fn new(identity: DeviceIdentity, opener: Arc<dyn DeviceOpener>, policy: ClaimPolicy) -> Self {
        Self {
            identity,
            opener,
            policy,
            session_lock: Mutex::new(()),
        }
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    pub fn with_claimed_device<T, F>(&self, body: F) -> Result<T, RelayError>
    where
        F: FnOnce(&mut dyn DeviceSession) -> Result<T, RelayError>,
    {
        // Waiting behind another caller in this process counts against the same deadline as
        // retrying a busy claim.
        let deadline = Instant::now() + self.policy.timeout;
        let Some(_session) = self.session_lock.try_lock_until(deadline) else {
            warn!("Timed out waiting for another claim on {}", self.identity);
            return Err(self.unavailable());
        };

        // The guard releases and closes on the way out, including when body panics.
        let mut claimed = self.claim(deadline)?;
        body(claimed.session())
    }

    fn unavailable(&self) -> RelayError {
        RelayError::DeviceUnavailable {
            identity: self.identity,
            timeout: self.policy.timeout,
        }
    }

    fn claim(&self, deadline: Instant) -> Result<ClaimedDevice, RelayError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            // The handle is reopened on every attempt rather than only re-claiming, a handle
            // which lost the race may need to be reconfigured before it can claim.
            let mut session = self
                .opener
                .open(self.identity)
                .map_err(RelayError::access(self.identity))?;

            match session.claim_interface(RELAY_INTERFACE) {
                Ok(()) => {
                    if attempt > 1 {
                        debug!("Claimed {} after {} attempts", self.identity, attempt);
                    }
                    return Ok(ClaimedDevice {
                        identity: self.identity,
                        session,
                    });
                }
                Err(rusb::Error::Busy) => {
                    drop(session);

                    if Instant::now() >= deadline {
                        warn!(
                            "Device {} still busy after {} attempts, giving up",
                            self.identity, attempt
                        );
                        return Err(self.unavailable());
                    }

                    debug!("Device {} is busy, retrying claim", self.identity);
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    sleep(self.policy.retry_interval.min(remaining));
                }
                Err(error) => {
                    drop(session);
                    return Err(RelayError::DeviceAccess {
                        identity: self.identity,
                        source: error,
                    });
                }
            }
        }
    }
}

struct ClaimedDevice {
    identity: DeviceIdentity,
    session: Box<dyn DeviceSession>,
}

impl ClaimedDevice {
    fn session(&mut self) -> &mut dyn DeviceSession {
        self.session.as_mut()
    }
}

impl Drop for ClaimedDevice {
    fn drop(&mut self) {
        // Release first, the handle itself is closed when the session drops right after this.
        // A failed release must not hide the outcome of the operation which already ran.
        if let Err(error) = self.session.release_interface(RELAY_INTERFACE) {
            warn!("Unable to release interface on {}: {}", self.identity, error);
        }
    }
}
