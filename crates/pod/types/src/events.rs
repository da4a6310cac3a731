//! Event journal: the record of every committed authority change
//!
//! Events are appended inside the same atomic unit as the state change
//! they describe, so a reverted operation leaves no events behind.

use crate::{Address, PodId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single journal entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PodEvent {
    /// Unique event identifier
    pub event_id: String,
    /// Pod the event concerns, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_id: Option<PodId>,
    /// Who triggered the event
    pub actor: Address,
    pub kind: PodEventKind,
    pub timestamp: DateTime<Utc>,
}

impl PodEvent {
    pub fn new(pod_id: Option<PodId>, actor: Address, kind: PodEventKind) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            pod_id,
            actor,
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// What happened
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PodEventKind {
    ControllerRegistered {
        controller: Address,
    },
    ControllerRemoved {
        controller: Address,
    },
    UriUpdated {
        uri: String,
    },
    PodCreated {
        controller: Address,
        wallet: Address,
        #[serde(skip_serializing_if = "Option::is_none")]
        admin: Option<Address>,
    },
    MemberMinted {
        member: Address,
    },
    MemberBurned {
        member: Address,
    },
    MemberTransferred {
        from: Address,
        to: Address,
    },
    OwnersSynced {
        added: Vec<Address>,
        removed: Vec<Address>,
    },
    AdminUpdated {
        admin: Option<Address>,
    },
    ModuleLockSet {
        locked: bool,
    },
    TransferLockSet {
        locked: bool,
    },
    WalletTransaction {
        call: String,
    },
    PodMigrated {
        from: Address,
        to: Address,
    },
    PodEjected {
        wallet: Address,
    },
    NameRegistered {
        label: String,
    },
    NameDeregistered {
        label: String,
    },
    NameDeregistrationFailed {
        label: String,
        reason: String,
    },
}

/// Append-only journal
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventJournal {
    events: Vec<PodEvent>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: PodEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[PodEvent] {
        &self.events
    }

    /// All events concerning a pod, oldest first
    pub fn for_pod(&self, pod_id: PodId) -> Vec<&PodEvent> {
        self.events
            .iter()
            .filter(|e| e.pod_id == Some(pod_id))
            .collect()
    }

    pub fn last(&self) -> Option<&PodEvent> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
