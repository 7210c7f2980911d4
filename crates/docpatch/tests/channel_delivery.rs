use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use docpatch::channel::{ChannelMessage, DeliveryReport, PatchChannel, SubtreeMirror};
use docpatch::{path, DocumentConnection, DocumentEvent, Origin, Patch, PatchEvent};
use serde_json::json;

fn message(patch: Patch) -> ChannelMessage {
    ChannelMessage::from_event(PatchEvent::from(patch), Origin::Remote, None)
}

fn counting(channel: &PatchChannel) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    channel.subscribe(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    count
}

#[test]
fn failing_handlers_do_not_stop_delivery() {
    let channel = PatchChannel::new();
    let first = counting(&channel);
    channel.subscribe(|_| Err("boom".into()));
    channel.subscribe(|_| panic!("handler blew up"));
    let last = counting(&channel);

    let report = channel.publish(&message(Patch::unset(path!["a"])));
    assert_eq!(
        report,
        DeliveryReport {
            delivered: 2,
            failed: 2,
            skipped: 0
        }
    );
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(last.load(Ordering::SeqCst), 1);

    // a handler that panicked stays subscribed and keeps the channel usable
    let report = channel.publish(&message(Patch::unset(path!["b"])));
    assert_eq!(report.delivered, 2);
    assert_eq!(last.load(Ordering::SeqCst), 2);
}

#[test]
fn subscriber_added_mid_publish_waits_for_next_message() {
    let channel = PatchChannel::new();
    let late = Arc::new(AtomicUsize::new(0));
    let added = Arc::new(AtomicUsize::new(0));
    {
        let handle = channel.clone();
        let late = Arc::clone(&late);
        let added = Arc::clone(&added);
        channel.subscribe(move |_| {
            if added.fetch_add(1, Ordering::SeqCst) == 0 {
                let late = Arc::clone(&late);
                handle.subscribe(move |_| {
                    late.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                });
            }
            Ok(())
        });
    }

    channel.publish(&message(Patch::unset(path!["a"])));
    assert_eq!(late.load(Ordering::SeqCst), 0);
    channel.publish(&message(Patch::unset(path!["a"])));
    assert_eq!(late.load(Ordering::SeqCst), 1);
}

#[test]
fn subscriber_removed_mid_publish_is_skipped() {
    let channel = PatchChannel::new();
    let victim_slot: Arc<Mutex<Option<docpatch::Subscription>>> = Arc::new(Mutex::new(None));
    {
        let slot = Arc::clone(&victim_slot);
        channel.subscribe(move |_| {
            if let Some(sub) = slot.lock().unwrap().as_ref() {
                sub.unsubscribe();
            }
            Ok(())
        });
    }
    let victim_calls = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&victim_calls);
    let victim = channel.subscribe(move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    *victim_slot.lock().unwrap() = Some(victim);

    let report = channel.publish(&message(Patch::unset(path!["a"])));
    assert_eq!(report.delivered, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(victim_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn handler_can_unsubscribe_itself() {
    let channel = PatchChannel::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let slot: Arc<Mutex<Option<docpatch::Subscription>>> = Arc::new(Mutex::new(None));
    let sub = {
        let calls = Arc::clone(&calls);
        let slot = Arc::clone(&slot);
        channel.subscribe(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            if let Some(me) = slot.lock().unwrap().as_ref() {
                me.unsubscribe();
            }
            Ok(())
        })
    };
    *slot.lock().unwrap() = Some(sub);

    channel.publish(&message(Patch::unset(path!["a"])));
    channel.publish(&message(Patch::unset(path!["a"])));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn nested_publish_skips_the_busy_handler() {
    let channel = PatchChannel::new();
    let depth = Arc::new(AtomicUsize::new(0));
    let inner_reports = Arc::new(Mutex::new(Vec::new()));
    {
        let handle = channel.clone();
        let depth = Arc::clone(&depth);
        let reports = Arc::clone(&inner_reports);
        channel.subscribe(move |_| {
            if depth.fetch_add(1, Ordering::SeqCst) == 0 {
                let report = handle.publish(&message(Patch::unset(path!["nested"])));
                reports.lock().unwrap().push(report);
            }
            Ok(())
        });
    }
    let other = counting(&channel);

    let outer = channel.publish(&message(Patch::unset(path!["a"])));
    assert_eq!(outer.delivered, 2);
    let inner = inner_reports.lock().unwrap();
    assert_eq!(inner[0].skipped, 1);
    assert_eq!(inner[0].delivered, 1);
    assert_eq!(other.load(Ordering::SeqCst), 2);
}

#[test]
fn connection_feeds_a_subtree_mirror() {
    let channel = PatchChannel::new();
    let mut conn = DocumentConnection::new(channel.clone());
    let doc = json!({"post": {"title": "A"}});
    let mirror = Arc::new(Mutex::new(SubtreeMirror::from_snapshot(path!["post"], Some(&doc))));
    {
        let mirror = Arc::clone(&mirror);
        channel.subscribe(move |msg| {
            mirror.lock().unwrap().receive(msg)?;
            Ok(())
        });
    }

    conn.receive(DocumentEvent::Snapshot { document: Some(doc) });
    conn.receive(DocumentEvent::Mutation {
        document: Some(json!({"post": {"title": "B"}})),
        patches: vec![Patch::set(path!["post", "title"], "B")],
        origin: docpatch::channel::MutationOrigin::Remote,
    });
    assert_eq!(mirror.lock().unwrap().value(), Some(&json!({"title": "B"})));

    conn.receive(DocumentEvent::Rebase {
        document: Some(json!({"post": {"title": "C"}})),
    });
    assert_eq!(mirror.lock().unwrap().value(), Some(&json!({"title": "C"})));
}

#[test]
fn keyed_mirror_survives_collaborator_edits_without_snapshots() {
    let channel = PatchChannel::new();
    let mut conn = DocumentConnection::new(channel.clone());
    let doc = json!({"items": [{"_key": "a", "title": "A"}]});
    let base = path!["items", docpatch::Segment::key("a")];
    let mirror = Arc::new(Mutex::new(SubtreeMirror::from_snapshot(base.clone(), Some(&doc))));
    {
        let mirror = Arc::clone(&mirror);
        channel.subscribe(move |msg| {
            mirror.lock().unwrap().receive(msg)?;
            Ok(())
        });
    }
    conn.receive(DocumentEvent::Snapshot { document: Some(doc) });

    let report = conn
        .receive(DocumentEvent::Mutation {
            document: None,
            patches: vec![Patch::insert(
                base.clone(),
                docpatch::InsertPosition::After,
                vec![json!({"_key": "c"})],
            )],
            origin: docpatch::channel::MutationOrigin::Remote,
        })
        .unwrap();
    assert_eq!(report, DeliveryReport { delivered: 1, failed: 0, skipped: 0 });
    assert_eq!(mirror.lock().unwrap().value(), Some(&json!({"_key": "a", "title": "A"})));

    let report = conn
        .receive(DocumentEvent::Mutation {
            document: None,
            patches: vec![Patch::set(
                path!["items"],
                json!([{"_key": "c"}, {"_key": "a", "title": "B"}]),
            )],
            origin: docpatch::channel::MutationOrigin::Remote,
        })
        .unwrap();
    assert_eq!(report.failed, 0);
    assert_eq!(mirror.lock().unwrap().value(), Some(&json!({"_key": "a", "title": "B"})));
}
