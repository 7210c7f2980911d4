//! Normalizes events from the document store into channel messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use docpatch_path::Path;

use super::{ChannelMessage, DeliveryReport, PatchChannel};
use crate::patch::{Origin, Patch};
use crate::patch_event::PatchEvent;

/// Where a [`DocumentConnection`] is in its lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No event received yet.
    #[default]
    Uninitialized,
    /// Events are arriving but no snapshot has been seen.
    AwaitingSnapshot,
    Live,
}

/// Which side made a mutation, as reported by the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationOrigin {
    /// Echo of an edit this process sent.
    Local,
    #[default]
    Remote,
}

impl From<MutationOrigin> for Origin {
    fn from(origin: MutationOrigin) -> Self {
        match origin {
            MutationOrigin::Local => Origin::Local,
            MutationOrigin::Remote => Origin::Remote,
        }
    }
}

/// An event as delivered by the document store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DocumentEvent {
    /// Initial state. Publishes nothing.
    Snapshot {
        #[serde(default)]
        document: Option<Value>,
    },
    Mutation {
        #[serde(default)]
        document: Option<Value>,
        patches: Vec<Patch>,
        #[serde(default)]
        origin: MutationOrigin,
    },
    /// The local view was rebuilt on top of a new server state.
    Rebase {
        #[serde(default)]
        document: Option<Value>,
    },
    Create { document: Value },
}

impl DocumentEvent {
    fn name(&self) -> &'static str {
        match self {
            DocumentEvent::Snapshot { .. } => "snapshot",
            DocumentEvent::Mutation { .. } => "mutation",
            DocumentEvent::Rebase { .. } => "rebase",
            DocumentEvent::Create { .. } => "create",
        }
    }
}

/// Turns a stream of [`DocumentEvent`]s into channel publishes.
///
/// Mutations keep the origin the transport reports. Rebase and create
/// events become one whole-document replacement tagged
/// [`Origin::Internal`].
#[derive(Debug)]
pub struct DocumentConnection {
    channel: PatchChannel,
    state: ConnectionState,
    document: Option<Value>,
}

impl DocumentConnection {
    pub fn new(channel: PatchChannel) -> Self {
        Self {
            channel,
            state: ConnectionState::Uninitialized,
            document: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn channel(&self) -> &PatchChannel {
        &self.channel
    }

    /// The document as of the last event that carried one.
    pub fn document(&self) -> Option<&Value> {
        self.document.as_ref()
    }

    /// Handle one event. Returns the delivery report when something was
    /// published.
    pub fn receive(&mut self, event: DocumentEvent) -> Option<DeliveryReport> {
        if self.state == ConnectionState::Uninitialized {
            self.state = ConnectionState::AwaitingSnapshot;
        }
        if self.state == ConnectionState::AwaitingSnapshot
            && !matches!(event, DocumentEvent::Snapshot { .. })
        {
            debug!(event = event.name(), "event received before snapshot");
        }

        let message = match event {
            DocumentEvent::Snapshot { document } => {
                debug!("snapshot received, connection live");
                self.state = ConnectionState::Live;
                self.document = document;
                return None;
            }
            DocumentEvent::Mutation {
                document,
                patches,
                origin,
            } => {
                self.document.clone_from(&document);
                if patches.is_empty() {
                    return None;
                }
                ChannelMessage::from_event(PatchEvent::from(patches), origin.into(), document)
            }
            DocumentEvent::Rebase { document } => {
                let patch = match &document {
                    Some(doc) => Patch::set(Path::root(), doc.clone()),
                    None => Patch::unset(Path::root()),
                };
                self.document.clone_from(&document);
                ChannelMessage::from_event(PatchEvent::from(patch), Origin::Internal, document)
            }
            DocumentEvent::Create { document } => {
                self.document = Some(document.clone());
                ChannelMessage::from_event(
                    PatchEvent::from(Patch::set(Path::root(), document.clone())),
                    Origin::Internal,
                    Some(document),
                )
            }
        };
        Some(self.channel.publish(&message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpatch_path::path;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn recorder(channel: &PatchChannel) -> Arc<Mutex<Vec<ChannelMessage>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        channel.subscribe(move |msg| {
            sink.lock().unwrap().push(msg.clone());
            Ok(())
        });
        seen
    }

    #[test]
    fn lifecycle() {
        let mut conn = DocumentConnection::new(PatchChannel::new());
        assert_eq!(conn.state(), ConnectionState::Uninitialized);

        conn.receive(DocumentEvent::Mutation {
            document: None,
            patches: vec![],
            origin: MutationOrigin::Remote,
        });
        assert_eq!(conn.state(), ConnectionState::AwaitingSnapshot);

        conn.receive(DocumentEvent::Snapshot {
            document: Some(json!({"title": "A"})),
        });
        assert_eq!(conn.state(), ConnectionState::Live);
        assert_eq!(conn.document(), Some(&json!({"title": "A"})));
    }

    #[test]
    fn snapshot_publishes_nothing() {
        let mut conn = DocumentConnection::new(PatchChannel::new());
        let seen = recorder(conn.channel());
        assert_eq!(conn.receive(DocumentEvent::Snapshot { document: None }), None);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn mutation_keeps_transport_origin() {
        let mut conn = DocumentConnection::new(PatchChannel::new());
        let seen = recorder(conn.channel());
        conn.receive(DocumentEvent::Snapshot { document: Some(json!({})) });
        let report = conn
            .receive(DocumentEvent::Mutation {
                document: Some(json!({"title": "B"})),
                patches: vec![Patch::set(path!["title"], "B")],
                origin: MutationOrigin::Local,
            })
            .unwrap();
        assert_eq!(report.delivered, 1);

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].patches[0].origin, Origin::Local);
        assert_eq!(seen[0].snapshot, Some(json!({"title": "B"})));
    }

    #[test]
    fn rebase_becomes_internal_root_set() {
        let mut conn = DocumentConnection::new(PatchChannel::new());
        let seen = recorder(conn.channel());
        conn.receive(DocumentEvent::Rebase {
            document: Some(json!({"title": "C"})),
        });
        conn.receive(DocumentEvent::Rebase { document: None });

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].patches.len(), 1);
        assert_eq!(seen[0].patches[0].origin, Origin::Internal);
        assert_eq!(seen[0].patches[0].patch, Patch::set(path![], json!({"title": "C"})));
        assert_eq!(seen[1].patches[0].patch, Patch::unset(path![]));
    }

    #[test]
    fn event_wire_format() {
        let ev: DocumentEvent = serde_json::from_value(json!({
            "type": "mutation",
            "document": {"n": 1},
            "patches": [{"type": "inc", "path": ["n"], "value": 1}]
        }))
        .unwrap();
        assert_eq!(
            ev,
            DocumentEvent::Mutation {
                document: Some(json!({"n": 1})),
                patches: vec![Patch::inc(path!["n"], 1.0)],
                origin: MutationOrigin::Remote,
            }
        );
    }
}
