use docpatch::{path, Patch, PatchEvent, Segment};
use proptest::prelude::*;

fn segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        "[a-z]{1,6}".prop_map(Segment::Field),
        (0usize..8).prop_map(Segment::Index),
        "[a-z0-9]{1,4}".prop_map(Segment::key),
    ]
}

fn patch() -> impl Strategy<Value = Patch> {
    (prop::collection::vec(segment(), 0..4), 0i64..100, any::<bool>()).prop_map(
        |(segments, n, unset)| {
            let path = docpatch::Path::from(segments);
            if unset {
                Patch::unset(path)
            } else {
                Patch::set(path, n)
            }
        },
    )
}

proptest! {
    #[test]
    fn prefixing_in_bubble_order_equals_manual_concatenation(
        patches in prop::collection::vec(patch(), 0..8),
        inner in segment(),
        outer in segment(),
    ) {
        let bubbled = PatchEvent::from(patches.clone())
            .prefix_all(inner.clone())
            .prefix_all(outer.clone());
        let manual: Vec<Patch> = patches
            .iter()
            .map(|p| {
                let mut path = docpatch::Path::from(vec![outer.clone(), inner.clone()]);
                for s in p.path().iter() {
                    path.push(s.clone());
                }
                p.clone().with_path(path)
            })
            .collect();
        prop_assert_eq!(bubbled.into_patches(), manual);
    }

    #[test]
    fn prefix_all_distributes_over_append(
        a in prop::collection::vec(patch(), 0..5),
        b in prop::collection::vec(patch(), 0..5),
        seg in segment(),
    ) {
        let joined = PatchEvent::from(a.clone()).append(b.clone()).prefix_all(seg.clone());
        let separate = PatchEvent::from(a)
            .prefix_all(seg.clone())
            .append(PatchEvent::from(b).prefix_all(seg));
        prop_assert_eq!(joined, separate);
    }

    #[test]
    fn composition_never_reorders(
        a in prop::collection::vec(patch(), 0..5),
        b in prop::collection::vec(patch(), 0..5),
    ) {
        let ev = PatchEvent::from(b.clone()).prepend(a.clone());
        let mut expected = a.clone();
        expected.extend(b.clone());
        prop_assert_eq!(ev.patches(), &expected[..]);

        let parts = PatchEvent::from_parts([PatchEvent::from(a), PatchEvent::from(b)]);
        prop_assert_eq!(parts.into_patches(), expected);
    }
}

#[test]
fn from_parts_accepts_single_patches() {
    let ev = PatchEvent::from_parts([Patch::unset(path!["a"]), Patch::unset(path!["b"])]);
    assert_eq!(ev.len(), 2);
}
