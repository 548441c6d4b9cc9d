use super::common::*;
use crate::applications::domain::{ApplicationId, ApplicationStatus};
use crate::applications::lifecycle::{ApplicationLifecycle, LifecycleError};
use crate::applications::persistence::PersistenceError;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

#[test]
fn apply_cancel_reapply_scenario() {
    let (lifecycle, gateway) = build_lifecycle();

    let first = lifecycle
        .create(request(1, "alice"), room(1))
        .expect("first application succeeds");
    assert_eq!(first, ApplicationId(1));
    assert_eq!(
        lifecycle.get(first).map(|record| record.status),
        Some(ApplicationStatus::Pending)
    );

    match lifecycle.create(request(1, "alice"), room(1)) {
        Err(LifecycleError::DuplicateActiveApplication { room_id, user_id }) => {
            assert_eq!(room_id, 1);
            assert_eq!(user_id, "alice");
        }
        other => panic!("expected duplicate rejection, got {other:?}"),
    }

    assert_eq!(lifecycle.cancel(first, "alice").expect("cancel succeeds"), first);
    let cancelled = lifecycle.get(first).expect("record kept");
    assert_eq!(cancelled.status, ApplicationStatus::Cancelled);
    assert!(cancelled.cancelled_date.is_some());

    assert!(matches!(
        lifecycle.cancel(first, "alice"),
        Err(LifecycleError::AlreadyCancelled(id)) if id == first
    ));

    let second = lifecycle
        .create(request(1, "alice"), room(1))
        .expect("reapplying after cancellation succeeds");
    assert_eq!(second, ApplicationId(2));
    assert_eq!(lifecycle.count(), 2);
    assert_eq!(gateway.stored().len(), 2);
}

#[test]
fn duplicate_leaves_collection_untouched() {
    let (lifecycle, gateway) = build_lifecycle();
    lifecycle
        .create(request(5, "bob"), room(5))
        .expect("first application succeeds");
    let saves = gateway.save_count();

    assert!(lifecycle.create(request(5, "bob"), room(5)).is_err());

    assert_eq!(lifecycle.count(), 1);
    assert_eq!(gateway.save_count(), saves, "rejections must not write");
}

#[test]
fn same_user_may_apply_to_different_rooms_and_users_may_share_rooms() {
    let (lifecycle, _) = build_lifecycle();
    lifecycle.create(request(1, "alice"), room(1)).expect("room 1");
    lifecycle.create(request(2, "alice"), room(2)).expect("room 2");
    lifecycle.create(request(1, "bob"), room(1)).expect("bob room 1");
    assert_eq!(lifecycle.count(), 3);
}

#[test]
fn accepted_applications_block_duplicates_and_cancellation() {
    let (seed, _) = build_lifecycle();
    let id = seed.create(request(3, "carol"), room(3)).expect("seed");
    let mut accepted = seed.get(id).expect("seeded record");
    accepted.status = ApplicationStatus::Accepted;

    let (lifecycle, gateway) = build_lifecycle_with(MemoryGateway::seeded(vec![accepted]));

    assert!(matches!(
        lifecycle.create(request(3, "carol"), room(3)),
        Err(LifecycleError::DuplicateActiveApplication { .. })
    ));
    assert!(matches!(
        lifecycle.cancel(id, "carol"),
        Err(LifecycleError::CannotCancelAccepted(found)) if found == id
    ));
    assert_eq!(gateway.save_count(), 0);
    assert_eq!(
        lifecycle.get(id).map(|record| record.status),
        Some(ApplicationStatus::Accepted)
    );
}

#[test]
fn rejected_applications_are_terminal_but_allow_reapplying() {
    let (seed, _) = build_lifecycle();
    let id = seed.create(request(3, "dave"), room(3)).expect("seed");
    let mut rejected = seed.get(id).expect("seeded record");
    rejected.status = ApplicationStatus::Rejected;

    let (lifecycle, _) = build_lifecycle_with(MemoryGateway::seeded(vec![rejected]));

    assert!(matches!(
        lifecycle.cancel(id, "dave"),
        Err(LifecycleError::CannotCancelRejected(_))
    ));
    let next = lifecycle
        .create(request(3, "dave"), room(3))
        .expect("rejected application is not active");
    assert_eq!(next, ApplicationId(2));
}

#[test]
fn cancel_by_non_owner_reports_not_found() {
    let (lifecycle, gateway) = build_lifecycle();
    let id = lifecycle.create(request(1, "alice"), room(1)).expect("create");
    let saves = gateway.save_count();

    assert!(matches!(
        lifecycle.cancel(id, "mallory"),
        Err(LifecycleError::NotFound(found)) if found == id
    ));
    assert!(matches!(
        lifecycle.cancel(ApplicationId(99), "alice"),
        Err(LifecycleError::NotFound(_))
    ));

    assert_eq!(gateway.save_count(), saves);
    assert_eq!(
        lifecycle.get(id).map(|record| record.status),
        Some(ApplicationStatus::Pending)
    );
}

#[test]
fn list_by_user_filters_and_orders_newest_first() {
    let (lifecycle, _) = build_lifecycle();
    let oldest = lifecycle.create(request(1, "alice"), room(1)).expect("1");
    lifecycle.create(request(1, "bob"), room(1)).expect("bob");
    let middle = lifecycle.create(request(2, "alice"), room(2)).expect("2");
    let newest = lifecycle.create(request(3, "alice"), room(3)).expect("3");

    let history = lifecycle.list_by_user("alice");
    let ids: Vec<ApplicationId> = history.iter().map(|record| record.id).collect();
    assert_eq!(ids, vec![newest, middle, oldest]);
    assert!(history.iter().all(|record| record.user_id == "alice"));
    assert!(history
        .windows(2)
        .all(|pair| pair[0].application_date > pair[1].application_date));

    assert!(lifecycle.list_by_user("nobody").is_empty());
}

#[test]
fn ordering_is_chronological_not_lexicographic() {
    let (seed, _) = build_lifecycle();
    let a = seed.create(request(1, "erin"), room(1)).expect("a");
    let b = seed.create(request(2, "erin"), room(2)).expect("b");
    let mut earlier = seed.get(a).expect("a");
    let mut later = seed.get(b).expect("b");
    // 09:05 at +01:00 is before 08:30 UTC written without an offset.
    earlier.application_date = crate::applications::domain::timestamp::parse("2025-04-01T09:05:00+01:00")
        .expect("offset timestamp");
    later.application_date =
        crate::applications::domain::timestamp::parse("2025-04-01T08:30:00").expect("legacy");

    let (lifecycle, _) = build_lifecycle_with(MemoryGateway::seeded(vec![earlier, later]));
    let ids: Vec<ApplicationId> = lifecycle
        .list_by_user("erin")
        .iter()
        .map(|record| record.id)
        .collect();
    assert_eq!(ids, vec![b, a]);
}

#[test]
fn failed_create_rolls_back_and_keeps_the_id_free() {
    let (lifecycle, gateway) = build_lifecycle();
    gateway.fail_next_saves(true);

    assert!(matches!(
        lifecycle.create(request(1, "alice"), room(1)),
        Err(LifecycleError::Persistence(PersistenceError::Unavailable(_)))
    ));
    assert_eq!(lifecycle.count(), 0);
    assert!(lifecycle.list_by_user("alice").is_empty());

    gateway.fail_next_saves(false);
    let id = lifecycle
        .create(request(1, "alice"), room(1))
        .expect("retry succeeds and is not treated as a duplicate");
    assert_eq!(id, ApplicationId(1));
    assert_eq!(gateway.stored().len(), 1);
}

#[test]
fn failed_cancel_restores_the_pending_record() {
    let (lifecycle, gateway) = build_lifecycle();
    let id = lifecycle.create(request(1, "alice"), room(1)).expect("create");
    gateway.fail_next_saves(true);

    assert!(matches!(
        lifecycle.cancel(id, "alice"),
        Err(LifecycleError::Persistence(_))
    ));

    let record = lifecycle.get(id).expect("record kept");
    assert_eq!(record.status, ApplicationStatus::Pending);
    assert!(record.cancelled_date.is_none());
    assert_eq!(gateway.stored()[0].status, ApplicationStatus::Pending);
}

#[test]
fn panicking_save_reverts_staged_create() {
    let (lifecycle, gateway) = build_lifecycle();
    gateway.panic_next_saves(true);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        lifecycle.create(request(1, "alice"), room(1))
    }));
    assert!(outcome.is_err());
    assert_eq!(lifecycle.count(), 0);

    gateway.panic_next_saves(false);
    let id = lifecycle
        .create(request(1, "alice"), room(1))
        .expect("poisoned lock recovers with a clean store");
    assert_eq!(id, ApplicationId(1));
    assert_eq!(gateway.stored().len(), 1);
}

#[test]
fn panicking_save_reverts_staged_cancel() {
    let (lifecycle, gateway) = build_lifecycle();
    let id = lifecycle.create(request(1, "alice"), room(1)).expect("create");
    gateway.panic_next_saves(true);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| lifecycle.cancel(id, "alice")));
    assert!(outcome.is_err());

    let record = lifecycle.get(id).expect("record kept");
    assert_eq!(record.status, ApplicationStatus::Pending);
    assert!(record.cancelled_date.is_none());
}

#[test]
fn reopening_resumes_state_and_sequence() {
    let (lifecycle, gateway) = build_lifecycle();
    lifecycle.create(request(1, "alice"), room(1)).expect("1");
    let second = lifecycle.create(request(2, "alice"), room(2)).expect("2");
    lifecycle.cancel(second, "alice").expect("cancel");

    let reopened = ApplicationLifecycle::open(Arc::new(MemoryGateway::seeded(gateway.stored())))
        .expect("reopen");
    assert_eq!(reopened.count(), 2);
    assert_eq!(
        reopened.get(second).map(|record| record.status),
        Some(ApplicationStatus::Cancelled)
    );
    let third = reopened.create(request(2, "alice"), room(2)).expect("3");
    assert_eq!(third, ApplicationId(3));
}

#[test]
fn open_surfaces_load_failures() {
    assert!(matches!(
        ApplicationLifecycle::open(Arc::new(UnreadableGateway)),
        Err(PersistenceError::Unavailable(_))
    ));
}

#[test]
fn concurrent_creates_receive_distinct_ids() {
    let (lifecycle, gateway) = build_lifecycle();
    let workers = 32;

    let handles: Vec<_> = (0..workers)
        .map(|worker| {
            let lifecycle = Arc::clone(&lifecycle);
            thread::spawn(move || {
                lifecycle
                    .create(request(7, &format!("student-{worker}")), room(7))
                    .expect("distinct users never collide")
            })
        })
        .collect();

    let ids: HashSet<ApplicationId> = handles
        .into_iter()
        .map(|handle| handle.join().expect("worker finished"))
        .collect();

    assert_eq!(ids.len(), workers);
    assert_eq!(lifecycle.count(), workers);
    assert_eq!(gateway.stored().len(), workers);
    assert_eq!(
        ids.iter().map(|id| id.0).max(),
        Some(workers as u64),
        "ids are dense"
    );
}

#[test]
fn concurrent_duplicates_admit_exactly_one() {
    let (lifecycle, _) = build_lifecycle();

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let lifecycle = Arc::clone(&lifecycle);
            thread::spawn(move || lifecycle.create(request(9, "frank"), room(9)).is_ok())
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|handle| handle.join().expect("worker finished"))
        .filter(|created| *created)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(lifecycle.count(), 1);
}
