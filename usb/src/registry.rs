use crate::access::{ClaimPolicy, ExclusiveAccess};
use crate::controller::RelayController;
use crate::device::base::DeviceOpener;
use log::debug;
use parking_lot::Mutex;
use relay_types::DeviceIdentity;
use std::collections::HashMap;
use std::sync::Arc;

/// Keeps exactly one controller per device for as long as the registry lives. Entries are
/// never evicted, a board stays plugged in for the life of the process.
pub struct RelayRegistry<C: RelayController> {
    opener: Arc<dyn DeviceOpener>,
    policy: ClaimPolicy,
    instances: Mutex<HashMap<DeviceIdentity, Arc<C>>>,
}

impl<C: RelayController> RelayRegistry<C> {
    pub fn new(opener: Arc<dyn DeviceOpener>, policy: ClaimPolicy) -> Self {
        Self {
            opener,
            policy,
            instances: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_or_create(&self, identity: DeviceIdentity) -> Arc<C> {
        // The map lock is only held for the lookup, attaching doesn't touch the hardware.
        let mut instances = self.instances.lock();
        instances
            .entry(identity)
            .or_insert_with(|| {
                debug!("Creating relay controller for {}", identity);
                let access = ExclusiveAccess::new(identity, self.opener.clone(), self.policy);
                Arc::new(C::attach(access))
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }
}
