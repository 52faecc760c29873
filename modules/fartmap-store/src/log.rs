use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use fartmap_common::{Event, StoredEvent};

use crate::error::Result;
use crate::store::EventStore;

/// Append-only event list on top of a whole-collection store.
///
/// Every mutation reads the full collection, changes it in memory and
/// writes it back. Mutations through one `EventLog` are serialised; two
/// processes sharing a store can still lose each other's updates.
pub struct EventLog<S> {
    store: S,
    write_lock: Mutex<()>,
}

impl<S: EventStore> EventLog<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Decoded, privacy-rounded events in insertion order. Records that
    /// fail to parse or decode are left out.
    pub async fn list(&self) -> Result<Vec<Event>> {
        let records = self.store.read_all().await?;
        Ok(decode_records(records))
    }

    /// Persist an already-validated event and return it as readers will
    /// see it.
    pub async fn append(&self, event: &Event) -> Result<Event> {
        let stored = StoredEvent::encode(event)?;
        let visible = stored.decode()?;
        let record = serde_json::to_value(&stored)?;

        let _guard = self.write_lock.lock().await;
        let mut records = self.store.read_all().await?;
        records.push(record);
        self.store.write_all(&records).await?;

        info!(
            total = records.len(),
            source = %event.source,
            has_device = event.device_id.is_some(),
            "Event recorded"
        );
        Ok(visible)
    }

    /// Drop every record. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let removed = self.store.read_all().await?.len();
        self.store.write_all(&[]).await?;
        warn!(removed, "Event store cleared");
        Ok(removed)
    }
}

fn decode_records(records: Vec<Value>) -> Vec<Event> {
    let total = records.len();
    let events: Vec<Event> = records
        .into_iter()
        .filter_map(|record| {
            serde_json::from_value::<StoredEvent>(record)
                .ok()?
                .decode()
                .ok()
        })
        .collect();

    let dropped = total - events.len();
    if dropped > 0 {
        warn!(dropped, total, "Skipped unreadable stored events");
    }
    events
}
