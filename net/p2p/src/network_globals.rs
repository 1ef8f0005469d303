//! A small `Arc`-shared bundle of read-mostly network state (SPEC_FULL.md
//! §C), grounded on the teacher's `lighthouse_network::NetworkGlobals`
//! (named in `987d9760…behaviour-mod.rs`).
//!
//! This exists purely as a convenience so collaborators that only ever
//! need to *read* peer/ENR state don't need a handle to the full service;
//! it adds no operations beyond what spec.md §4.1/§4.2 already define on
//! `PeerDb`/`Listener`.

use crate::discovery::enr::EnrolmentRecord;
use crate::peer_manager::peerdb::PeerDb;
use net_types::PeerId;
use parking_lot::RwLock;
use std::sync::Arc;

pub struct NetworkGlobals {
    pub peer_db: Arc<PeerDb>,
    pub local_peer_id: PeerId,
    local_enr: RwLock<Option<EnrolmentRecord>>,
}

impl NetworkGlobals {
    pub fn new(peer_db: Arc<PeerDb>, local_peer_id: PeerId) -> Arc<Self> {
        Arc::new(Self {
            peer_db,
            local_peer_id,
            local_enr: RwLock::new(None),
        })
    }

    pub fn set_local_enr(&self, enr: EnrolmentRecord) {
        *self.local_enr.write() = Some(enr);
    }

    pub fn local_enr(&self) -> Option<EnrolmentRecord> {
        self.local_enr.read().clone()
    }

    pub fn connected_peer_count(&self) -> usize {
        self.peer_db.connected_count()
    }
}
