//! Outstanding validation request tracking

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data_structures::RequestId;
use crate::errors::{WalletError, WalletResult};

/// How many resolved requests are remembered to recognise duplicate answers
const RESOLVED_HISTORY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationKind {
    TxoValidation,
    TransactionValidation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub request_id: RequestId,
    pub kind: ValidationKind,
    pub outstanding: bool,
}

#[derive(Debug)]
struct Requests {
    by_id: HashMap<RequestId, ValidationRequest>,
    resolved: VecDeque<RequestId>,
    next_id: u64,
}

impl Requests {
    /// Next id that is neither zero nor currently outstanding
    fn allocate(&mut self) -> RequestId {
        loop {
            let candidate = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);
            if candidate == 0 {
                continue;
            }
            let id = RequestId::new(candidate);
            if !self.by_id.get(&id).is_some_and(|r| r.outstanding) {
                return id;
            }
        }
    }

    fn remember_resolved(&mut self, request_id: RequestId) {
        self.resolved.push_back(request_id);
        while self.resolved.len() > RESOLVED_HISTORY {
            if let Some(old) = self.resolved.pop_front() {
                if self.by_id.get(&old).is_some_and(|r| !r.outstanding) {
                    self.by_id.remove(&old);
                }
            }
        }
    }
}

/// Tracks validation requests until each is resolved exactly once
#[derive(Debug)]
pub struct ValidationCoordinator {
    inner: Mutex<Requests>,
}

impl ValidationCoordinator {
    /// Ids start at a random offset so they do not collide across wallet restarts
    pub fn new() -> Self {
        Self::starting_at(rand::random::<u32>() as u64 + 1)
    }

    pub fn starting_at(first_id: u64) -> Self {
        Self {
            inner: Mutex::new(Requests {
                by_id: HashMap::new(),
                resolved: VecDeque::new(),
                next_id: first_id,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Requests> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new outstanding request and return its id
    pub fn start(&self, kind: ValidationKind) -> RequestId {
        let mut requests = self.lock();
        let request_id = requests.allocate();
        requests.by_id.insert(
            request_id,
            ValidationRequest {
                request_id,
                kind,
                outstanding: true,
            },
        );
        debug!(%request_id, ?kind, "Started validation request");
        request_id
    }

    /// Id for a one-shot request that is not tracked (e.g. rebroadcast)
    pub fn allocate_untracked(&self) -> RequestId {
        self.lock().allocate()
    }

    /// Forget a request whose submission failed
    pub fn abandon(&self, request_id: RequestId) {
        if self.lock().by_id.remove(&request_id).is_some() {
            debug!(%request_id, "Abandoned validation request");
        }
    }

    /// Resolve an outstanding request
    ///
    /// Fails with `UnknownRequest` if the id was never registered, was already
    /// resolved, or belongs to the other validation kind. The caller drops the
    /// result in that case; nothing is delivered twice.
    pub fn resolve(
        &self,
        request_id: RequestId,
        kind: ValidationKind,
        success: bool,
    ) -> WalletResult<ValidationRequest> {
        let mut requests = self.lock();
        let resolved = match requests.by_id.get_mut(&request_id) {
            Some(request) if request.outstanding && request.kind == kind => {
                request.outstanding = false;
                *request
            }
            Some(request) => {
                warn!(
                    %request_id,
                    ?kind,
                    registered_kind = ?request.kind,
                    outstanding = request.outstanding,
                    "Dropping validation result for a request that is not outstanding"
                );
                return Err(WalletError::UnknownRequest(request_id));
            }
            None => {
                warn!(%request_id, ?kind, "Dropping validation result for an unknown request");
                return Err(WalletError::UnknownRequest(request_id));
            }
        };
        requests.remember_resolved(request_id);
        debug!(%request_id, ?kind, success, "Validation request resolved");
        Ok(resolved)
    }

    pub fn is_outstanding(&self, request_id: RequestId) -> bool {
        self.lock()
            .by_id
            .get(&request_id)
            .is_some_and(|r| r.outstanding)
    }

    pub fn outstanding(&self) -> Vec<ValidationRequest> {
        self.lock()
            .by_id
            .values()
            .filter(|r| r.outstanding)
            .copied()
            .collect()
    }
}

impl Default for ValidationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
