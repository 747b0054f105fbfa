use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use parley_types::events::RoomEvent;

/// One live socket in a room. The sender feeds the connection's send task;
/// a failed send means that task is gone and the peer is dead.
struct RoomPeer {
    conn_id: Uuid,
    username: String,
    tx: mpsc::UnboundedSender<RoomEvent>,
}

/// Maps a conversation id to the ordered list of live peers in its room.
/// Peers are appended on join and removed on leave; a peer whose send
/// fails during a broadcast is removed from the room on the spot rather
/// than left behind to leak.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RwLock<HashMap<u64, Vec<RoomPeer>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Append a peer to a room. Returns the connection id and the receiver
    /// the connection's send task drains.
    pub async fn join(
        &self,
        room: u64,
        username: &str,
    ) -> (Uuid, mpsc::UnboundedReceiver<RoomEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        self.inner.write().await.entry(room).or_default().push(RoomPeer {
            conn_id,
            username: username.to_string(),
            tx,
        });

        debug!("{} joined room {} ({})", username, room, conn_id);
        (conn_id, rx)
    }

    /// Remove a peer by connection id. The room entry itself is dropped
    /// once its last peer leaves.
    pub async fn leave(&self, room: u64, conn_id: Uuid) {
        let mut rooms = self.inner.write().await;
        if let Some(peers) = rooms.get_mut(&room) {
            peers.retain(|p| p.conn_id != conn_id);
            if peers.is_empty() {
                rooms.remove(&room);
            }
        }
    }

    /// Attempt one send per peer currently in the room and return the
    /// number of attempts. A peer whose send fails is logged and removed
    /// immediately; there are no retries and no ordering guarantee between
    /// concurrent broadcasts beyond list order at broadcast time.
    pub async fn broadcast(&self, room: u64, event: RoomEvent) -> usize {
        let mut rooms = self.inner.write().await;
        let Some(peers) = rooms.get_mut(&room) else {
            return 0;
        };

        let attempts = peers.len();
        let mut dead: Vec<Uuid> = Vec::new();
        for peer in peers.iter() {
            if peer.tx.send(event.clone()).is_err() {
                warn!(
                    "dropping {} from room {}: send failed ({})",
                    peer.username, room, peer.conn_id
                );
                dead.push(peer.conn_id);
            }
        }

        if !dead.is_empty() {
            peers.retain(|p| !dead.contains(&p.conn_id));
            if peers.is_empty() {
                rooms.remove(&room);
            }
        }

        attempts
    }

    /// Number of live peers in a room.
    pub async fn room_size(&self, room: u64) -> usize {
        self.inner.read().await.get(&room).map_or(0, Vec::len)
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
