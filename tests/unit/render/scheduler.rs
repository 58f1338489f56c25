use super::*;

fn held(ticket: SlotTicket) -> SlotPermit {
    match ticket {
        SlotTicket::Granted(p) => p,
        SlotTicket::Waiting(_) => panic!("expected a free slot"),
    }
}

fn take_granted(
    tickets: &mut Vec<(&'static str, SlotTicket)>,
) -> Option<(&'static str, SlotPermit)> {
    for i in 0..tickets.len() {
        if let SlotTicket::Waiting(rx) = &mut tickets[i].1
            && let Ok(p) = rx.try_recv()
        {
            let (name, _) = tickets.remove(i);
            return Some((name, p));
        }
    }
    None
}

#[test]
fn slots_go_to_the_highest_priority_then_oldest_waiter() {
    let s = SlotScheduler::new(1);
    let first = held(s.enqueue(Priority::Low));
    let mut tickets = vec![
        ("low", s.enqueue(Priority::Low)),
        ("normal-a", s.enqueue(Priority::Normal)),
        ("urgent", s.enqueue(Priority::Urgent)),
        ("normal-b", s.enqueue(Priority::Normal)),
    ];
    assert_eq!(s.waiting(), 4);
    assert!(take_granted(&mut tickets).is_none());

    drop(first);
    let mut order = Vec::new();
    while let Some((name, permit)) = take_granted(&mut tickets) {
        order.push(name);
        assert!(take_granted(&mut tickets).is_none(), "one slot at a time");
        drop(permit);
    }
    assert_eq!(order, vec!["urgent", "normal-a", "normal-b", "low"]);
    assert_eq!(s.waiting(), 0);
    assert!(matches!(s.enqueue(Priority::Low), SlotTicket::Granted(_)));
}

#[test]
fn free_slots_are_granted_immediately() {
    let s = SlotScheduler::new(2);
    let _a = held(s.enqueue(Priority::Normal));
    let _b = held(s.enqueue(Priority::Low));
    assert!(matches!(s.enqueue(Priority::Urgent), SlotTicket::Waiting(_)));
}

#[test]
fn abandoned_waiters_do_not_leak_slots() {
    let s = SlotScheduler::new(1);
    let first = held(s.enqueue(Priority::Normal));
    let gone = s.enqueue(Priority::Urgent);
    let mut tickets = vec![("next", s.enqueue(Priority::Low))];

    drop(gone);
    drop(first);
    let (name, permit) = take_granted(&mut tickets).unwrap();
    assert_eq!(name, "next");

    // Granted but never picked up: the slot comes back when the ticket is dropped.
    let unclaimed = s.enqueue(Priority::Normal);
    drop(permit);
    drop(unclaimed);
    let _again = held(s.enqueue(Priority::Normal));
}

#[tokio::test]
async fn waiting_ticket_resolves_on_release() {
    let s = SlotScheduler::new(1);
    let first = held(s.enqueue(Priority::Normal));
    let ticket = s.enqueue(Priority::High);
    drop(first);
    assert!(ticket.acquire().await.is_some());
}
