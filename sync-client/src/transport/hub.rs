//! In-process room transport.
//!
//! [`LocalHub`] maps document ids to rooms; each [`HubTransport`] handed out
//! by [`LocalHub::connect`] is one client. A batch sent into a room is
//! encoded once as a wire [`Message`] frame and fanned out to the other
//! N-1 members. Members of other rooms, and the sender itself, never see it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use docsync_types::{ClientId, DocumentId, Message, OperationBatch, RoomPeer};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, trace};

use super::{Transport, TransportError};

type Frame = Arc<Vec<u8>>;
type Rooms = HashMap<DocumentId, HashMap<ClientId, mpsc::UnboundedSender<Frame>>>;

/// In-process rooms shared by every transport connected to it.
///
/// Cloning is cheap; clones share the same rooms.
#[derive(Debug, Clone, Default)]
pub struct LocalHub {
    rooms: Arc<RwLock<Rooms>>,
}

impl LocalHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a new client to the hub.
    pub fn connect(&self) -> HubTransport {
        let (sender, receiver) = mpsc::unbounded_channel();
        HubTransport {
            client_id: ClientId::new(),
            hub: self.clone(),
            sender: Mutex::new(Some(sender)),
            inbox: tokio::sync::Mutex::new(receiver),
        }
    }

    /// Number of members in a room.
    pub async fn member_count(&self, document_id: &DocumentId) -> usize {
        self.rooms
            .read()
            .await
            .get(document_id)
            .map_or(0, HashMap::len)
    }

    /// Number of rooms with at least one member.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Send a frame to every member of the room except `from`.
    ///
    /// Returns the number of members the frame was handed to.
    fn fan_out(rooms: &Rooms, document_id: &DocumentId, from: ClientId, frame: &Frame) -> usize {
        let Some(members) = rooms.get(document_id) else {
            return 0;
        };
        members
            .iter()
            .filter(|(id, _)| **id != from)
            .filter(|(_, inbox)| inbox.send(Arc::clone(frame)).is_ok())
            .count()
    }
}

/// One client's connection to a [`LocalHub`].
#[derive(Debug)]
pub struct HubTransport {
    client_id: ClientId,
    hub: LocalHub,
    /// Our own inbox sender; `None` once disconnected.
    sender: Mutex<Option<mpsc::UnboundedSender<Frame>>>,
    inbox: tokio::sync::Mutex<mpsc::UnboundedReceiver<Frame>>,
}

impl HubTransport {
    /// The hub-assigned identity of this connection.
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    fn sender(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<Frame>>> {
        self.sender.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Leave every room and close the inbox.
    ///
    /// Pending frames are still delivered; after them `recv_batch` returns
    /// [`TransportError::ConnectionClosed`].
    pub async fn disconnect(&self) {
        self.sender().take();
        let mut rooms = self.hub.rooms.write().await;
        let mut left = Vec::new();
        rooms.retain(|document_id, members| {
            if members.remove(&self.client_id).is_some() {
                left.push(document_id.clone());
            }
            !members.is_empty()
        });
        for document_id in left {
            self.announce(&rooms, Message::PeerLeft(self.peer(&document_id)));
        }
        debug!(client = ?self.client_id, "disconnected from hub");
    }

    fn peer(&self, document_id: &DocumentId) -> RoomPeer {
        RoomPeer {
            document_id: document_id.clone(),
            client_id: self.client_id,
        }
    }

    /// Best-effort membership notice; peers only log these.
    fn announce(&self, rooms: &Rooms, message: Message) {
        match message.to_bytes() {
            Ok(bytes) => {
                LocalHub::fan_out(rooms, message.document_id(), self.client_id, &Arc::new(bytes));
            }
            Err(e) => debug!(error = %e, "failed to encode membership frame"),
        }
    }
}

#[async_trait]
impl Transport for HubTransport {
    async fn join_room(&self, document_id: &DocumentId) -> Result<(), TransportError> {
        let sender = self.sender().clone().ok_or(TransportError::NotConnected)?;

        let mut rooms = self.hub.rooms.write().await;
        rooms
            .entry(document_id.clone())
            .or_default()
            .insert(self.client_id, sender);
        self.announce(&rooms, Message::PeerJoined(self.peer(document_id)));

        debug!(client = ?self.client_id, document = %document_id, "joined room");
        Ok(())
    }

    async fn leave_room(&self, document_id: &DocumentId) -> Result<(), TransportError> {
        let mut rooms = self.hub.rooms.write().await;
        let removed = match rooms.get_mut(document_id) {
            Some(members) => {
                let removed = members.remove(&self.client_id).is_some();
                if members.is_empty() {
                    rooms.remove(document_id);
                }
                removed
            }
            None => false,
        };
        if removed {
            self.announce(&rooms, Message::PeerLeft(self.peer(document_id)));
            debug!(client = ?self.client_id, document = %document_id, "left room");
        }
        Ok(())
    }

    async fn send_batch(&self, batch: &OperationBatch) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let rooms = self.hub.rooms.read().await;
        let is_member = rooms
            .get(&batch.document_id)
            .is_some_and(|members| members.contains_key(&self.client_id));
        if !is_member {
            return Err(TransportError::NotInRoom(batch.document_id.clone()));
        }

        let frame = Arc::new(Message::Batch(batch.clone()).to_bytes()?);
        let delivered = LocalHub::fan_out(&rooms, &batch.document_id, self.client_id, &frame);
        trace!(
            document = %batch.document_id,
            operations = batch.len(),
            delivered,
            "batch fanned out"
        );
        Ok(())
    }

    async fn recv_batch(&self) -> Result<OperationBatch, TransportError> {
        let mut inbox = self.inbox.lock().await;
        loop {
            let frame = inbox.recv().await.ok_or(TransportError::ConnectionClosed)?;
            match Message::from_bytes(&frame)? {
                Message::Batch(batch) => return Ok(batch),
                Message::PeerJoined(peer) => {
                    debug!(document = %peer.document_id, peer = ?peer.client_id, "peer joined");
                }
                Message::PeerLeft(peer) => {
                    debug!(document = %peer.document_id, peer = ?peer.client_id, "peer left");
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.sender().is_some()
    }
}

impl Drop for HubTransport {
    fn drop(&mut self) {
        // Without a runtime we cannot await the lock; skip if contended.
        if let Ok(mut rooms) = self.hub.rooms.try_write() {
            let client_id = self.client_id;
            rooms.retain(|_, members| {
                members.remove(&client_id);
                !members.is_empty()
            });
        }
    }
}
