use super::*;
use intentions_controller_core::{
    Action, CheckQuery, ExactQuery, Intention, LogIndex, MatchEntry, MatchQuery, MatchType,
    SourceType, Violation,
};
use maplit::hashmap;
use pretty_assertions::assert_eq;

fn mk(id: &str, src: (&str, &str), dst: (&str, &str), action: Action) -> Intention {
    Intention {
        id: id.to_string(),
        source_ns: src.0.to_string(),
        source_name: src.1.to_string(),
        destination_ns: dst.0.to_string(),
        destination_name: dst.1.to_string(),
        source_type: Some(SourceType::Registry),
        action: Some(action),
        ..Default::default()
    }
}

fn index() -> SharedIndex {
    tracing_subscriber::fmt().with_test_writer().try_init().ok();
    Index::shared(IndexMetrics::default())
}

fn ids(intentions: &[Intention]) -> Vec<&str> {
    intentions.iter().map(|ixn| ixn.id.as_str()).collect()
}

#[test]
fn create_derives_bookkeeping() {
    let index = index();
    let applied = index
        .write()
        .apply(
            IntentionOp::Create,
            mk("a", ("default", "web"), ("default", "db"), Action::Allow),
        )
        .expect("create must succeed");
    assert_eq!(applied, 1);

    let ixn = index.read().get("a").expect("intention must exist");
    assert_eq!(ixn.precedence, 9);
    assert_eq!(ixn.hash, Some(ixn.compute_hash()));
    assert!(ixn.created_at.is_some());
    assert_eq!(ixn.created_at, ixn.updated_at);
    assert_eq!(
        ixn.log_index,
        LogIndex {
            create_index: 1,
            modify_index: 1
        }
    );
}

#[test]
fn create_overwrites_caller_derived_fields() {
    let index = index();
    let mut ixn = mk("a", ("default", "*"), ("default", "db"), Action::Allow);
    ixn.precedence = 1;
    ixn.hash = Some([7; 32].into());
    index
        .write()
        .apply(IntentionOp::Create, ixn)
        .expect("create must succeed");

    let ixn = index.read().get("a").expect("intention must exist");
    assert_eq!(ixn.precedence, 8);
    assert!(!ixn.is_dirty());
}

#[test]
fn create_rejections() {
    let index = index();
    index
        .write()
        .apply(
            IntentionOp::Create,
            mk("a", ("default", "web"), ("default", "db"), Action::Allow),
        )
        .expect("create must succeed");

    let err = index
        .write()
        .apply(
            IntentionOp::Create,
            mk("", ("default", "api"), ("default", "db"), Action::Allow),
        )
        .unwrap_err();
    assert!(matches!(err, Error::MissingId), "{err}");

    let err = index
        .write()
        .apply(
            IntentionOp::Create,
            mk("a", ("default", "api"), ("default", "db"), Action::Allow),
        )
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(ref id) if id == "a"), "{err}");

    let err = index
        .write()
        .apply(
            IntentionOp::Create,
            mk("b", ("default", "web"), ("default", "db"), Action::Deny),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Duplicate(_)), "{err}");
    assert_eq!(
        err.to_string(),
        "duplicate intention found: ALLOW default/web => default/db (ID: a, Precedence: 9)"
    );

    let err = index
        .write()
        .apply(
            IntentionOp::Create,
            mk("c", ("default", "w*"), ("", "db"), Action::Deny),
        )
        .unwrap_err();
    match err {
        Error::Invalid(errors) => assert_eq!(errors.len(), 2, "{errors}"),
        err => panic!("unexpected error: {err}"),
    }

    // Rejected writes neither bump the index nor change the contents.
    assert_eq!(index.read().index(), 1);
    assert_eq!(index.read().len(), 1);
}

#[test]
fn update_keeps_creation_bookkeeping() {
    let index = index();
    index
        .write()
        .apply(
            IntentionOp::Create,
            mk("a", ("default", "web"), ("default", "db"), Action::Allow),
        )
        .expect("create must succeed");
    let created = index.read().get("a").expect("intention must exist");

    let mut changed = mk("a", ("default", "web"), ("default", "db"), Action::Deny);
    changed.meta = hashmap! { "owner".to_string() => "team-a".to_string() }
        .into_iter()
        .collect();
    let applied = index
        .write()
        .apply(IntentionOp::Update, changed)
        .expect("update must succeed");
    assert_eq!(applied, 2);

    let updated = index.read().get("a").expect("intention must exist");
    assert_eq!(updated.action, Some(Action::Deny));
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);
    assert_eq!(
        updated.log_index,
        LogIndex {
            create_index: 1,
            modify_index: 2
        }
    );
    assert_ne!(updated.hash, created.hash);
}

#[test]
fn update_rejections() {
    let index = index();
    for (id, src) in [("a", "web"), ("b", "api")] {
        index
            .write()
            .apply(
                IntentionOp::Create,
                mk(id, ("default", src), ("default", "db"), Action::Allow),
            )
            .expect("create must succeed");
    }

    let err = index
        .write()
        .apply(
            IntentionOp::Update,
            mk("z", ("default", "web"), ("default", "db"), Action::Deny),
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "{err}");

    let err = index
        .write()
        .apply(
            IntentionOp::Update,
            mk("b", ("default", "web"), ("default", "db"), Action::Deny),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Duplicate(_)), "{err}");

    let mut invalid = mk("a", ("default", "web"), ("default", "db"), Action::Deny);
    invalid.action = None;
    let err = index
        .write()
        .apply(IntentionOp::Update, invalid)
        .unwrap_err();
    match err {
        Error::Invalid(errors) => assert!(errors.contains(&Violation::InvalidAction)),
        err => panic!("unexpected error: {err}"),
    }

    // Rewriting an intention with its own tuples is not a duplicate.
    index
        .write()
        .apply(
            IntentionOp::Update,
            mk("a", ("default", "web"), ("default", "db"), Action::Deny),
        )
        .expect("update must succeed");
}

#[test]
fn delete() {
    let index = index();
    index
        .write()
        .apply(
            IntentionOp::Create,
            mk("a", ("default", "web"), ("default", "db"), Action::Allow),
        )
        .expect("create must succeed");

    let err = index
        .write()
        .apply(IntentionOp::Delete, Intention::default())
        .unwrap_err();
    assert!(matches!(err, Error::MissingId), "{err}");

    let err = index
        .write()
        .apply(
            IntentionOp::Delete,
            Intention {
                id: "b".to_string(),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "{err}");

    let applied = index
        .write()
        .apply(
            IntentionOp::Delete,
            Intention {
                id: "a".to_string(),
                ..Default::default()
            },
        )
        .expect("delete must succeed");
    assert_eq!(applied, 2);
    assert!(index.read().is_empty());
    assert_eq!(index.read().get("a"), None);
    assert!(index.read().list().intentions.is_empty());
}

#[test]
fn list_is_canonically_ordered() {
    let index = index();
    for ixn in [
        mk("1", ("*", "*"), ("*", "*"), Action::Deny),
        mk("2", ("b", "web"), ("b", "db"), Action::Allow),
        mk("3", ("a", "*"), ("a", "db"), Action::Allow),
        mk("4", ("a", "web"), ("a", "db"), Action::Allow),
        mk("5", ("a", "web"), ("a", "*"), Action::Allow),
    ] {
        index
            .write()
            .apply(IntentionOp::Create, ixn)
            .expect("create must succeed");
    }

    let list = index.read().list();
    assert_eq!(list.index, 5);
    assert_eq!(ids(&list.intentions), vec!["4", "2", "3", "5", "1"]);
}

#[test]
fn queries_read_the_snapshot() {
    let index = index();
    for ixn in [
        mk("deny-all", ("*", "*"), ("*", "*"), Action::Deny),
        mk("web-db", ("default", "web"), ("default", "db"), Action::Allow),
        mk("any-cache", ("default", "*"), ("default", "cache"), Action::Allow),
    ] {
        index
            .write()
            .apply(IntentionOp::Create, ixn)
            .expect("create must succeed");
    }

    let snapshot = index.read().snapshot();
    assert_eq!(snapshot.index, 3);

    // Writes after the snapshot is taken are not visible through it.
    index
        .write()
        .apply(
            IntentionOp::Create,
            mk("api-db", ("default", "api"), ("default", "db"), Action::Deny),
        )
        .expect("create must succeed");
    assert_eq!(snapshot.intentions.len(), 3);

    let matches = snapshot
        .matches(&MatchQuery::new(
            MatchType::Destination,
            [MatchEntry::new("default", "db")],
        ))
        .expect("query must be valid");
    assert_eq!(matches.index, 3);
    assert_eq!(matches.matches.len(), 1);
    assert_eq!(ids(&matches.matches[0]), vec!["web-db", "deny-all"]);

    let check = |src: &str, dst: &str| CheckQuery {
        source_ns: "default".to_string(),
        source_name: src.to_string(),
        destination_ns: "default".to_string(),
        destination_name: dst.to_string(),
        source_type: Some(SourceType::Registry),
    };
    assert_eq!(
        index.read().check(&check("api", "db")).expect("valid"),
        Some(Action::Deny)
    );
    assert_eq!(
        index.read().check(&check("web", "cache")).expect("valid"),
        Some(Action::Allow)
    );
    assert_eq!(
        index.read().check(&check("web", "db")).expect("valid"),
        Some(Action::Allow)
    );

    let exact = ExactQuery {
        source_ns: "default".to_string(),
        source_name: "*".to_string(),
        destination_ns: "default".to_string(),
        destination_name: "cache".to_string(),
    };
    assert_eq!(
        index
            .read()
            .exact(&exact)
            .expect("valid")
            .map(|ixn| ixn.id),
        Some("any-cache".to_string())
    );

    let err = index.read().exact(&ExactQuery::default()).unwrap_err();
    assert!(matches!(err, Error::Query(_)), "{err}");
}

#[test]
fn empty_index_checks_nothing() {
    let index = index();
    let query = CheckQuery {
        source_ns: "default".to_string(),
        source_name: "web".to_string(),
        destination_ns: "default".to_string(),
        destination_name: "db".to_string(),
        source_type: Some(SourceType::Registry),
    };
    assert_eq!(index.read().check(&query).expect("valid"), None);
}

#[tokio::test(flavor = "current_thread")]
async fn writes_publish_the_index() {
    let index = index();
    let mut rx = index.read().watch();
    assert_eq!(*rx.borrow_and_update(), 0);

    index
        .write()
        .apply(
            IntentionOp::Create,
            mk("a", ("default", "web"), ("default", "db"), Action::Allow),
        )
        .expect("create must succeed");
    rx.changed().await.expect("index must be published");
    assert_eq!(*rx.borrow_and_update(), 1);

    index
        .write()
        .apply(IntentionOp::Create, Intention::default())
        .expect_err("create must fail");
    assert!(!rx.has_changed().expect("sender must be live"));

    let wait = tokio::spawn(blocking::wait_for_index(
        index.read().watch(),
        1,
        std::time::Duration::from_secs(60),
    ));
    index
        .write()
        .apply(
            IntentionOp::Delete,
            Intention {
                id: "a".to_string(),
                ..Default::default()
            },
        )
        .expect("delete must succeed");
    assert_eq!(wait.await.expect("wait must not panic"), 2);
}

#[test]
fn apply_diff_converges_on_remote() {
    let primary = index();
    let secondary = index();

    for ixn in [
        mk("a", ("default", "web"), ("default", "db"), Action::Allow),
        mk("b", ("default", "api"), ("default", "db"), Action::Deny),
    ] {
        primary
            .write()
            .apply(IntentionOp::Create, ixn.clone())
            .expect("create must succeed");
        secondary
            .write()
            .apply(IntentionOp::Create, ixn)
            .expect("create must succeed");
    }

    // The primary moves on: one deleted, one changed, one added.
    for (op, ixn) in [
        (
            IntentionOp::Delete,
            Intention {
                id: "a".to_string(),
                ..Default::default()
            },
        ),
        (
            IntentionOp::Update,
            mk("b", ("default", "api"), ("default", "db"), Action::Allow),
        ),
        (
            IntentionOp::Create,
            mk("c", ("default", "web"), ("default", "db"), Action::Deny),
        ),
    ] {
        primary.write().apply(op, ixn).expect("write must succeed");
    }
    // The secondary also holds a record the primary never had.
    secondary
        .write()
        .apply(
            IntentionOp::Create,
            mk("d", ("default", "x"), ("default", "y"), Action::Deny),
        )
        .expect("create must succeed");

    let remote = primary.read().list().intentions;
    let diff = replication::diff(&secondary.read().list().intentions, &remote);
    let mut deletes = ids(&diff.deletes);
    deletes.sort_unstable();
    assert_eq!(deletes, vec!["a", "d"]);
    let mut updates = ids(&diff.updates);
    updates.sort_unstable();
    assert_eq!(updates, vec!["b", "c"]);

    secondary
        .write()
        .apply_diff(diff)
        .expect("diff must apply");

    let local = secondary.read().list().intentions;
    assert_eq!(ids(&local), ids(&remote));
    assert_eq!(
        local.iter().map(|ixn| ixn.hash).collect::<Vec<_>>(),
        remote.iter().map(|ixn| ixn.hash).collect::<Vec<_>>()
    );
    assert!(replication::diff(&local, &remote).is_empty());
}

#[test]
fn apply_diff_swaps_tuples_between_ids() {
    let primary = index();
    let secondary = index();

    for ixn in [
        mk("id1", ("ns", "web"), ("ns", "db"), Action::Allow),
        mk("id2", ("ns", "api"), ("ns", "db"), Action::Deny),
    ] {
        primary
            .write()
            .apply(IntentionOp::Create, ixn.clone())
            .expect("create must succeed");
        secondary
            .write()
            .apply(IntentionOp::Create, ixn)
            .expect("create must succeed");
    }

    // Each ID takes the other's source. Applied one at a time, either write collides with the
    // other's current tuples.
    primary
        .write()
        .apply_diff(Diff {
            deletes: vec![],
            updates: vec![
                mk("id1", ("ns", "api"), ("ns", "db"), Action::Allow),
                mk("id2", ("ns", "web"), ("ns", "db"), Action::Deny),
            ],
        })
        .expect("swap must apply");
    let remote = primary.read().list().intentions;

    let diff = replication::diff(&secondary.read().list().intentions, &remote);
    assert_eq!(diff.updates.len(), 2);
    assert_eq!(secondary.read().index(), 2);
    let applied = secondary
        .write()
        .apply_diff(diff)
        .expect("diff must apply");
    assert_eq!(applied, 3);
    assert_eq!(secondary.read().index(), 3);

    let local = secondary.read().list().intentions;
    assert_eq!(
        local
            .iter()
            .map(|ixn| (
                ixn.id.as_str(),
                ixn.source_name.as_str(),
                ixn.log_index.create_index,
                ixn.log_index.modify_index,
            ))
            .collect::<Vec<_>>(),
        vec![("id1", "api", 1, 3), ("id2", "web", 2, 3)]
    );
    assert!(replication::diff(&local, &remote).is_empty());
}

#[test]
fn failed_diff_changes_nothing() {
    let index = index();
    for ixn in [
        mk("a", ("default", "web"), ("default", "db"), Action::Allow),
        mk("b", ("default", "api"), ("default", "db"), Action::Deny),
    ] {
        index
            .write()
            .apply(IntentionOp::Create, ixn)
            .expect("create must succeed");
    }
    let rx = index.read().watch();
    let before = index.read().list();

    // A valid delete followed by an invalid update.
    let err = index
        .write()
        .apply_diff(Diff {
            deletes: vec![mk("a", ("default", "web"), ("default", "db"), Action::Allow)],
            updates: vec![mk("b", ("default", "a*"), ("default", "db"), Action::Deny)],
        })
        .unwrap_err();
    assert!(matches!(err, Error::Invalid(_)), "{err}");

    // A diff whose final set would hold the same tuples twice.
    let err = index
        .write()
        .apply_diff(Diff {
            deletes: vec![],
            updates: vec![mk("c", ("default", "web"), ("default", "db"), Action::Deny)],
        })
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "duplicate intention found: ALLOW default/web => default/db (ID: a, Precedence: 9)"
    );

    assert_eq!(index.read().list(), before);
    assert!(!rx.has_changed().expect("sender must be live"));
}
