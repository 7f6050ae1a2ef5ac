//! The address-value cache.
//!
//! A concurrent map of the last decoded value per group address, fed by a
//! client subscription, by optional bus hydration at startup and by
//! write-through on successful sends. Entries are replaced wholesale, so
//! readers always observe a consistent record; two racing writers resolve
//! last-writer-wins, which is fine for observational data with advancing
//! timestamps.

use crate::{ClientError, GroupClient, Subscription};
use dashmap::DashMap;
use rustknx_core::address::GroupAddress;
use rustknx_core::dpt::{DptId, DptValue};
use rustknx_core::telegram::TelegramKind;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const HYDRATION_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// One cached group address: its type, optional name, and the last sample.
///
/// `value == None` means the type is known but no sample has been seen yet.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupEntry {
    pub dpt: DptId,
    pub name: Option<String>,
    pub value: Option<DptValue>,
    pub last_update: Option<SystemTime>,
}

/// A persistable `(address, value, unix-seconds)` sample.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HydrationRecord {
    pub address: GroupAddress,
    pub value: DptValue,
    pub unix_seconds: u64,
}

/// Which group addresses to read from the bus at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HydrationMode {
    #[default]
    None,
    All,
    Selected(Vec<GroupAddress>),
}

/// Builder for [`GroupValueCache`].
pub struct GroupValueCacheBuilder<C> {
    client: Arc<C>,
    entries: Vec<(GroupAddress, DptId, Option<String>)>,
    hydration_state: Vec<HydrationRecord>,
    hydrate_on_start: HydrationMode,
}

impl<C: GroupClient + 'static> GroupValueCacheBuilder<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self {
            client,
            entries: Vec::new(),
            hydration_state: Vec::new(),
            hydrate_on_start: HydrationMode::None,
        }
    }

    pub fn entry(mut self, address: GroupAddress, dpt: DptId, name: Option<String>) -> Self {
        self.entries.push((address, dpt, name));
        self
    }

    /// Seeds entries from an ETS project snapshot (addresses with a known
    /// datapoint type only).
    pub fn from_project(mut self, project: &crate::EtsProject) -> Self {
        for info in project.group_addresses.values() {
            if let Some(dpt) = info.dpt {
                self.entries
                    .push((info.address, dpt, Some(info.name.clone())));
            }
        }
        self
    }

    /// Pre-loads persisted samples without touching the bus.
    pub fn hydration_state(mut self, records: Vec<HydrationRecord>) -> Self {
        self.hydration_state = records;
        self
    }

    /// Reads the selected addresses from the bus once the cache starts.
    pub fn hydrate_on_start(mut self, mode: HydrationMode) -> Self {
        self.hydrate_on_start = mode;
        self
    }

    /// Creates the cache and starts its updater task. [`GroupValueCache::wait_for_startup`]
    /// resolves once bus hydration has finished.
    pub async fn start(self) -> Result<GroupValueCache<C>, ClientError> {
        let entries: Arc<DashMap<GroupAddress, GroupEntry>> = Arc::new(DashMap::new());
        for (address, dpt, name) in self.entries {
            entries.insert(
                address,
                GroupEntry {
                    dpt,
                    name,
                    value: None,
                    last_update: None,
                },
            );
        }

        for record in self.hydration_state {
            if let Some(mut entry) = entries.get_mut(&record.address) {
                entry.value = Some(record.value);
                entry.last_update = Some(UNIX_EPOCH + Duration::from_secs(record.unix_seconds));
            } else {
                log::debug!(
                    "ignoring hydration record for unconfigured address {}",
                    record.address
                );
            }
        }

        // Subscribe before hydrating so no write between the two is lost.
        let subscription = self.client.subscribe().await?;
        let (startup_tx, startup_rx) = watch::channel(false);

        let hydrate: Vec<GroupAddress> = match self.hydrate_on_start {
            HydrationMode::None => Vec::new(),
            HydrationMode::All => entries.iter().map(|e| *e.key()).collect(),
            HydrationMode::Selected(addresses) => addresses,
        };

        let task = tokio::spawn(run_updater(
            Arc::clone(&entries),
            Arc::clone(&self.client),
            subscription,
            hydrate,
            startup_tx,
        ));

        Ok(GroupValueCache {
            entries,
            client: self.client,
            startup: startup_rx,
            task,
        })
    }
}

/// Shared last-value store over a routing or tunnel client.
pub struct GroupValueCache<C> {
    entries: Arc<DashMap<GroupAddress, GroupEntry>>,
    client: Arc<C>,
    startup: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl<C: GroupClient> GroupValueCache<C> {
    /// Resolves once startup hydration has completed.
    pub async fn wait_for_startup(&self) {
        let mut startup = self.startup.clone();
        while !*startup.borrow() {
            if startup.changed().await.is_err() {
                return;
            }
        }
    }

    /// A snapshot of one entry.
    pub fn get(&self, address: GroupAddress) -> Option<GroupEntry> {
        self.entries.get(&address).map(|entry| entry.clone())
    }

    /// A snapshot of all entries, ordered by address.
    pub fn entries(&self) -> Vec<(GroupAddress, GroupEntry)> {
        let mut all: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        all.sort_by_key(|(address, _)| *address);
        all
    }

    /// Adds an entry with no sample yet.
    pub fn insert(&self, address: GroupAddress, dpt: DptId, name: Option<String>) {
        self.entries.insert(
            address,
            GroupEntry {
                dpt,
                name,
                value: None,
                last_update: None,
            },
        );
    }

    /// Removes an entry, returning whether it existed.
    pub fn remove(&self, address: GroupAddress) -> bool {
        self.entries.remove(&address).is_some()
    }

    /// Write-through: sends the value on the bus and records it in the
    /// cache only after the send succeeded.
    pub async fn write(&self, address: GroupAddress, value: DptValue) -> Result<(), ClientError> {
        self.client.write_group_address(address, value.clone()).await?;
        store(&self.entries, address, value);
        Ok(())
    }

    /// All entries currently holding a value, as persistable records.
    pub fn to_hydration_state(&self) -> Vec<HydrationRecord> {
        let mut records: Vec<_> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let value = entry.value.clone()?;
                let unix_seconds = entry
                    .last_update?
                    .duration_since(UNIX_EPOCH)
                    .ok()?
                    .as_secs();
                Some(HydrationRecord {
                    address: *entry.key(),
                    value,
                    unix_seconds,
                })
            })
            .collect();
        records.sort_by_key(|record| record.address);
        records
    }
}

impl<C> Drop for GroupValueCache<C> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn store(entries: &DashMap<GroupAddress, GroupEntry>, address: GroupAddress, value: DptValue) {
    if let Some(mut entry) = entries.get_mut(&address) {
        entry.value = Some(value);
        entry.last_update = Some(SystemTime::now());
    }
}

async fn run_updater<C: GroupClient>(
    entries: Arc<DashMap<GroupAddress, GroupEntry>>,
    client: Arc<C>,
    mut subscription: Subscription,
    hydrate: Vec<GroupAddress>,
    startup: watch::Sender<bool>,
) {
    for address in hydrate {
        match client
            .read_group_address_timeout(address, HYDRATION_READ_TIMEOUT)
            .await
        {
            Ok(telegram) => {
                if let Some(value) = telegram.value {
                    store(&entries, address, value);
                }
            }
            Err(e) => log::info!("hydration read for {address} failed: {e}"),
        }
    }
    let _ = startup.send(true);

    while let Some((kind, telegram)) = subscription.recv().await {
        if !matches!(kind, TelegramKind::GroupWrite | TelegramKind::GroupResponse) {
            continue;
        }
        if let Some(value) = telegram.value {
            store(&entries, telegram.destination, value);
        }
    }
}
