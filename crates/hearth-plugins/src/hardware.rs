//! Shared hardware resources.
//!
//! The host owns one hub per resource kind. Inbound frames fan out to every
//! plugin that declared the resource; outbound frames funnel into one
//! serialized queue the driver drains. A resource counts as active only
//! while at least one registered plugin demands it — drivers can skip
//! powering radios nobody listens to.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use hearth_types::PluginId;

const LOG: &str = "plugin_host";

/// Frame fan-out capacity per resource.
const INBOUND_CAPACITY: usize = 256;

/// A hardware resource kind a plugin can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HardwareResource {
    /// Periodic tick source.
    Timer,
    /// 433 MHz transceiver.
    Radio433,
    /// 868 MHz transceiver.
    Radio868,
    /// Bluetooth Low Energy adapter.
    BluetoothLe,
    /// UPnP listener.
    Upnp,
    /// Zigbee coordinator.
    Zigbee,
    /// Plain network access.
    Network,
}

impl HardwareResource {
    /// Every resource kind.
    pub const ALL: [Self; 7] = [
        Self::Timer,
        Self::Radio433,
        Self::Radio868,
        Self::BluetoothLe,
        Self::Upnp,
        Self::Zigbee,
        Self::Network,
    ];
}

/// One unit of data crossing a resource boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFrame {
    /// The resource the frame belongs to.
    pub resource: HardwareResource,
    /// Raw payload; the plugin's codec interprets it.
    pub payload: Vec<u8>,
}

#[derive(Debug)]
struct ResourceHub {
    inbound: broadcast::Sender<ResourceFrame>,
    outbound_tx: mpsc::UnboundedSender<ResourceFrame>,
    outbound_rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<ResourceFrame>>>,
    demand: AtomicUsize,
}

impl ResourceHub {
    fn new() -> Self {
        let (inbound, _) = broadcast::channel(INBOUND_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        Self {
            inbound,
            outbound_tx,
            outbound_rx: std::sync::Mutex::new(Some(outbound_rx)),
            demand: AtomicUsize::new(0),
        }
    }
}

/// Owner of all resource hubs.
#[derive(Debug)]
pub struct HardwareManager {
    hubs: DashMap<HardwareResource, ResourceHub>,
    declarations: DashMap<PluginId, Vec<HardwareResource>>,
}

impl HardwareManager {
    /// Create a manager with one hub per resource kind.
    #[must_use]
    pub fn new() -> Self {
        let hubs = DashMap::new();
        for resource in HardwareResource::ALL {
            hubs.insert(resource, ResourceHub::new());
        }
        Self {
            hubs,
            declarations: DashMap::new(),
        }
    }

    /// Record a plugin's demand for a set of resources.
    pub fn declare(&self, plugin_id: PluginId, resources: &[HardwareResource]) {
        for resource in resources {
            if let Some(hub) = self.hubs.get(resource) {
                let before = hub.demand.fetch_add(1, Ordering::SeqCst);
                if before == 0 {
                    info!(target: LOG, resource = ?resource, "hardware resource activated");
                }
            }
        }
        self.declarations.insert(plugin_id, resources.to_vec());
    }

    /// Drop a plugin's declarations, deactivating resources nobody demands.
    pub fn release(&self, plugin_id: PluginId) {
        let Some((_, resources)) = self.declarations.remove(&plugin_id) else {
            return;
        };
        for resource in resources {
            if let Some(hub) = self.hubs.get(&resource) {
                let before = hub.demand.fetch_sub(1, Ordering::SeqCst);
                if before == 1 {
                    info!(target: LOG, resource = ?resource, "hardware resource deactivated");
                }
            }
        }
    }

    /// Whether at least one plugin demands the resource.
    #[must_use]
    pub fn is_active(&self, resource: HardwareResource) -> bool {
        self.hubs
            .get(&resource)
            .is_some_and(|hub| hub.demand.load(Ordering::SeqCst) > 0)
    }

    /// Subscribe to the resource's inbound fan-out.
    ///
    /// Every subscriber sees every frame; a slow subscriber lags and skips.
    #[must_use]
    pub fn subscribe(&self, resource: HardwareResource) -> broadcast::Receiver<ResourceFrame> {
        // Hubs exist for every variant; the map is never mutated after new().
        self.hubs
            .get(&resource)
            .map_or_else(|| broadcast::channel(1).0.subscribe(), |hub| hub.inbound.subscribe())
    }

    /// Queue an outbound frame; writes are serialized per resource.
    pub fn transmit(&self, frame: ResourceFrame) {
        if let Some(hub) = self.hubs.get(&frame.resource) {
            debug!(target: LOG, resource = ?frame.resource, len = frame.payload.len(), "queueing outbound frame");
            let _ = hub.outbound_tx.send(frame);
        }
    }

    /// Fan an inbound frame out to all subscribers (called by drivers and
    /// tests). Returns the number of receivers.
    pub fn inject_inbound(&self, frame: ResourceFrame) -> usize {
        self.hubs
            .get(&frame.resource)
            .and_then(|hub| hub.inbound.send(frame).ok())
            .unwrap_or(0)
    }

    /// Take the serialized outbound queue for a resource.
    ///
    /// Returns `Some` exactly once per resource; the driver owning the
    /// transceiver drains it.
    #[must_use]
    pub fn take_outbound(
        &self,
        resource: HardwareResource,
    ) -> Option<mpsc::UnboundedReceiver<ResourceFrame>> {
        self.hubs
            .get(&resource)
            .and_then(|hub| hub.outbound_rx.lock().ok()?.take())
    }
}

impl Default for HardwareManager {
    fn default() -> Self {
        Self::new()
    }
}
