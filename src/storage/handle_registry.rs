//! Typed handle tables for values lent out across the host boundary
//!
//! A handle is an index plus a generation. Destroying a handle bumps the
//! slot's generation, so a stale handle (destroyed once, or reused after the
//! slot was recycled) resolves to `NotFound` instead of someone else's value.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::data_structures::{
    Balance, CompletedTransaction, Contact, FeePerGramStat, PendingInboundTransaction,
    PendingOutboundTransaction, PublicKey, SeedWords,
};
use crate::errors::{WalletError, WalletResult};

/// Typed index into a [`HandleTable`]
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Pack into the single 64-bit integer a host stores in place of a pointer
    pub fn to_raw(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    pub fn from_raw(raw: u64) -> Self {
        Self::new(raw as u32, (raw >> 32) as u32)
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Arena of values of one type, addressed by generational handles
pub struct HandleTable<T> {
    name: &'static str,
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> HandleTable<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn insert(&mut self, value: T) -> Handle<T> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Handle::new(index, 0)
    }

    pub fn get(&self, handle: Handle<T>) -> WalletResult<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
            .ok_or_else(|| self.not_found(handle))
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> WalletResult<&mut T> {
        let name = self.name;
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_mut())
            .ok_or_else(|| WalletError::NotFound(format!("{name} handle {handle:?}")))
    }

    /// Release the value; a second destroy of the same handle fails
    pub fn destroy(&mut self, handle: Handle<T>) -> WalletResult<T> {
        let not_found = self.not_found(handle);
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .ok_or(not_found.clone())?;
        let value = slot.value.take().ok_or(not_found)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Ok(value)
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.value.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn not_found(&self, handle: Handle<T>) -> WalletError {
        WalletError::NotFound(format!("{} handle {handle:?}", self.name))
    }
}

/// One table per value type the boundary hands out
pub struct HandleRegistry {
    pub public_keys: HandleTable<PublicKey>,
    pub contacts: HandleTable<Contact>,
    pub contact_lists: HandleTable<Vec<Contact>>,
    pub pending_inbound: HandleTable<PendingInboundTransaction>,
    pub pending_inbound_lists: HandleTable<Vec<PendingInboundTransaction>>,
    pub pending_outbound: HandleTable<PendingOutboundTransaction>,
    pub pending_outbound_lists: HandleTable<Vec<PendingOutboundTransaction>>,
    pub completed: HandleTable<CompletedTransaction>,
    pub completed_lists: HandleTable<Vec<CompletedTransaction>>,
    pub seed_words: HandleTable<SeedWords>,
    pub fee_stats: HandleTable<Vec<FeePerGramStat>>,
    pub balances: HandleTable<Balance>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self {
            public_keys: HandleTable::new("public key"),
            contacts: HandleTable::new("contact"),
            contact_lists: HandleTable::new("contacts"),
            pending_inbound: HandleTable::new("pending inbound transaction"),
            pending_inbound_lists: HandleTable::new("pending inbound transactions"),
            pending_outbound: HandleTable::new("pending outbound transaction"),
            pending_outbound_lists: HandleTable::new("pending outbound transactions"),
            completed: HandleTable::new("completed transaction"),
            completed_lists: HandleTable::new("completed transactions"),
            seed_words: HandleTable::new("seed words"),
            fee_stats: HandleTable::new("fee per gram stats"),
            balances: HandleTable::new("balance"),
        }
    }

    /// Total live handles across all tables, used to spot leaks in hosts
    pub fn live_handles(&self) -> usize {
        self.public_keys.len()
            + self.contacts.len()
            + self.contact_lists.len()
            + self.pending_inbound.len()
            + self.pending_inbound_lists.len()
            + self.pending_outbound.len()
            + self.pending_outbound_lists.len()
            + self.completed.len()
            + self.completed_lists.len()
            + self.seed_words.len()
            + self.fee_stats.len()
            + self.balances.len()
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
