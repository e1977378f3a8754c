//! Tests for the bus: ordering, handle lifecycle, filtering, dispatch
//! policy, and concurrent mutation.

#[cfg(test)]
mod tests {
    use crate::bus::{EventBus, ListenerHandle, PRIORITY_DEFAULT, PRIORITY_HIGH, PRIORITY_LOW};
    use crate::error::EventError;
    use crate::events::{Cancelable, CancelToken, Event};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    /// Event that records the invocation order of its listeners.
    #[derive(Debug, Default)]
    struct TestEvent {
        order: String,
    }

    /// Listener that appends `name` to the event's order log.
    fn appender(
        name: char,
    ) -> impl Fn(&mut TestEvent) -> Result<(), EventError> + Send + Sync + 'static {
        move |event: &mut TestEvent| {
            event.order.push(name);
            Ok(())
        }
    }

    #[test_log::test]
    fn publish_to_empty_bus_invokes_nothing() {
        let bus: EventBus<TestEvent> = EventBus::new();
        let mut event = TestEvent::default();

        assert!(bus.is_empty());
        bus.publish(&mut event).unwrap();
        assert_eq!(event.order, "");
    }

    #[test_log::test]
    fn listeners_run_in_bind_order() {
        let bus: EventBus<TestEvent> = EventBus::new();
        bus.on().bind(appender('A'));
        bus.on().bind(appender('B'));

        let mut event = TestEvent::default();
        bus.publish(&mut event).unwrap();
        assert_eq!(event.order, "AB");
    }

    #[test_log::test]
    fn higher_priority_dispatches_first() {
        let bus: EventBus<TestEvent> = EventBus::new();
        bus.on().with(1).bind(appender('A'));
        bus.on().with(1).bind(appender('B'));
        bus.on().with(2).bind(appender('C'));

        let mut event = TestEvent::default();
        bus.publish(&mut event).unwrap();
        assert_eq!(event.order, "CAB");
    }

    #[test_log::test]
    fn priority_tiers_keep_fifo_order() {
        let bus: EventBus<TestEvent> = EventBus::new();
        bus.on().bind(appender('C'));
        bus.on().with(PRIORITY_HIGH).bind(appender('A'));
        bus.on().with(PRIORITY_LOW).bind(appender('E'));
        bus.on().with(PRIORITY_DEFAULT).bind(appender('D'));
        bus.on().with(PRIORITY_HIGH).bind(appender('B'));

        let mut event = TestEvent::default();
        bus.publish(&mut event).unwrap();
        assert_eq!(event.order, "ABCDE");
        assert_eq!(bus.len(), 5);
    }

    #[test_log::test]
    fn close_unbinds_listener() {
        let bus: EventBus<TestEvent> = EventBus::new();
        bus.on().bind(appender('A'));
        let handle = bus.on().bind(appender('B'));
        assert!(handle.is_live());
        handle.close();
        assert!(!handle.is_live());

        let mut event = TestEvent::default();
        bus.publish(&mut event).unwrap();
        assert_eq!(event.order, "A");
    }

    #[test_log::test]
    fn close_is_idempotent() {
        let bus: EventBus<TestEvent> = EventBus::new();
        let handle = bus.on().bind(appender('A'));
        handle.close();
        handle.close();
        assert!(bus.is_empty());
    }

    #[test_log::test]
    fn close_after_bus_drop_is_a_noop() {
        let handle = {
            let bus: EventBus<TestEvent> = EventBus::new();
            bus.on().bind(appender('A'))
        };
        handle.close();
        assert!(!handle.is_live());
    }

    #[test_log::test]
    fn remove_matches_by_identity_exactly_once() {
        let bus: EventBus<TestEvent> = EventBus::new();
        bus.on().bind(appender('A'));
        let handle = bus.on().bind(appender('B'));

        assert!(bus.remove(handle.listener()));
        assert!(!bus.remove(handle.listener()));

        let mut event = TestEvent::default();
        bus.publish(&mut event).unwrap();
        assert_eq!(event.order, "A");
    }

    #[test_log::test]
    fn clear_drops_all_registrations() {
        let bus: EventBus<TestEvent> = EventBus::new();
        bus.on().bind(appender('A'));
        bus.on().bind(appender('B'));
        let handle = bus.on().bind(appender('C'));

        bus.clear();
        assert!(bus.is_empty());

        // Handles into the cleared bus are already-removed.
        handle.close();

        let mut event = TestEvent::default();
        bus.publish(&mut event).unwrap();
        assert_eq!(event.order, "");
    }

    #[test_log::test]
    fn stale_handle_cannot_remove_slot_reuser() {
        let bus: EventBus<TestEvent> = EventBus::new();
        let stale = bus.on().bind(appender('A'));
        stale.close();

        // The new registration reuses the freed slot.
        bus.on().bind(appender('B'));
        stale.close();

        let mut event = TestEvent::default();
        bus.publish(&mut event).unwrap();
        assert_eq!(event.order, "B");
    }

    // Kind filtering over a heterogeneous bus.

    #[derive(Debug)]
    struct BlockPlaced {
        column: u32,
    }

    #[derive(Debug)]
    struct ChunkLoaded;

    #[test_log::test]
    fn kind_filtered_listener_ignores_other_kinds() {
        let bus: EventBus<dyn Event> = EventBus::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&calls);
        bus.on().bind(move |_event: &mut dyn Event| {
            log.lock().unwrap().push("any");
            Ok(())
        });
        let log = Arc::clone(&calls);
        bus.on_kind::<BlockPlaced>().bind(move |event: &mut BlockPlaced| {
            log.lock().unwrap().push("placed");
            event.column += 1;
            Ok(())
        });

        let mut other = ChunkLoaded;
        bus.publish(&mut other).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["any"]);

        let mut placed = BlockPlaced { column: 7 };
        bus.publish(&mut placed).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["any", "any", "placed"]);
        // The filtered listener mutated the event through its concrete type.
        assert_eq!(placed.column, 8);
    }

    #[test_log::test]
    fn kind_filter_on_concrete_bus_matches_own_type() {
        let bus: EventBus<TestEvent> = EventBus::new();
        bus.on_kind::<TestEvent>().bind(|event: &mut TestEvent| {
            event.order.push('K');
            Ok(())
        });

        let mut event = TestEvent::default();
        bus.publish(&mut event).unwrap();
        assert_eq!(event.order, "K");
    }

    // In-flight mutation.

    type SharedHandle = Arc<Mutex<Option<ListenerHandle<TestEvent>>>>;

    #[test_log::test]
    fn removing_unvisited_listener_during_publish_skips_it() {
        let bus: EventBus<TestEvent> = EventBus::new();
        let victim: SharedHandle = Arc::new(Mutex::new(None));

        let to_close = Arc::clone(&victim);
        bus.on().with(PRIORITY_HIGH).bind(move |event: &mut TestEvent| {
            event.order.push('A');
            if let Some(handle) = to_close.lock().unwrap().as_ref() {
                handle.close();
            }
            Ok(())
        });
        let handle = bus.on().bind(appender('B'));
        *victim.lock().unwrap() = Some(handle);

        let mut event = TestEvent::default();
        bus.publish(&mut event).unwrap();
        assert_eq!(event.order, "A");

        // And it stays unbound for later publishes.
        let mut event = TestEvent::default();
        bus.publish(&mut event).unwrap();
        assert_eq!(event.order, "A");
    }

    #[test_log::test]
    fn bind_during_publish_is_not_visible() {
        let bus: Arc<EventBus<TestEvent>> = Arc::new(EventBus::new());

        let inner = Arc::clone(&bus);
        bus.on().bind(move |event: &mut TestEvent| {
            event.order.push('A');
            inner.on().with(PRIORITY_HIGH).bind(appender('X'));
            Ok(())
        });

        let mut event = TestEvent::default();
        bus.publish(&mut event).unwrap();
        assert_eq!(event.order, "A");

        // The next publish sees the listener bound mid-flight, at its
        // priority slot.
        let mut event = TestEvent::default();
        bus.publish(&mut event).unwrap();
        assert_eq!(event.order, "XA");
    }

    #[test_log::test]
    fn listener_can_publish_reentrantly() {
        let bus: Arc<EventBus<u32>> = Arc::new(EventBus::new());
        let inner = Arc::clone(&bus);
        bus.on().bind(move |event: &mut u32| {
            if *event < 3 {
                let mut nested = *event + 1;
                inner.publish(&mut nested).map_err(|err| EventError::Other(err.to_string()))?;
                *event = nested;
            }
            Ok(())
        });

        let mut event = 0u32;
        bus.publish(&mut event).unwrap();
        assert_eq!(event, 3);
    }

    // Dispatch failure policy.

    #[test_log::test]
    fn failing_listener_does_not_stop_dispatch() {
        let bus: EventBus<TestEvent> = EventBus::new();
        bus.on().with(PRIORITY_HIGH).bind(|_: &mut TestEvent| {
            Err(EventError::ListenerFailed("first".into()))
        });
        bus.on().bind(appender('B'));

        let mut event = TestEvent::default();
        let err = bus.publish(&mut event).unwrap_err();

        // The pass completed despite the failure.
        assert_eq!(event.order, "B");
        assert_eq!(err.failed, 1);
        assert_eq!(err.invoked, 2);
        assert!(err.first.to_string().contains("first"));
    }

    #[test_log::test]
    fn publish_reports_first_failure_after_completing_pass() {
        let bus: EventBus<TestEvent> = EventBus::new();
        bus.on().with(2).bind(|_: &mut TestEvent| {
            Err(EventError::ListenerFailed("first".into()))
        });
        bus.on().with(1).bind(|_: &mut TestEvent| {
            Err(EventError::ListenerFailed("second".into()))
        });
        bus.on().bind(appender('C'));

        let mut event = TestEvent::default();
        let err = bus.publish(&mut event).unwrap_err();
        assert_eq!(event.order, "C");
        assert_eq!(err.failed, 2);
        assert_eq!(err.invoked, 3);
        assert!(err.first.to_string().contains("first"));
    }

    #[test_log::test]
    fn stats_track_binds_publishes_and_failures() {
        let bus: EventBus<TestEvent> = EventBus::new();
        bus.on().bind(appender('A'));
        bus.on().bind(|_: &mut TestEvent| Err(EventError::Other("boom".into())));

        let mut event = TestEvent::default();
        let _ = bus.publish(&mut event);
        let mut event = TestEvent::default();
        let _ = bus.publish(&mut event);

        let stats = bus.stats();
        assert_eq!(stats.listeners_bound, 2);
        assert_eq!(stats.events_published, 2);
        assert_eq!(stats.listeners_invoked, 4);
        assert_eq!(stats.dispatch_failures, 2);
    }

    #[test_log::test]
    fn stats_serialize_roundtrip() {
        let bus: EventBus<TestEvent> = EventBus::new();
        bus.on().bind(appender('A'));
        let json = serde_json::to_value(bus.stats()).unwrap();
        assert_eq!(json.get("listeners_bound").unwrap(), 1);
    }

    // Cancellation protocol.

    #[derive(Debug, Default)]
    struct PlacementRequest {
        cancel: CancelToken,
        applied: bool,
    }

    #[test_log::test]
    fn cancellation_is_visible_to_later_listeners_and_publisher() {
        let bus: EventBus<PlacementRequest> = EventBus::new();
        bus.on().with(PRIORITY_HIGH).bind(|event: &mut PlacementRequest| {
            event.cancel.cancel();
            Ok(())
        });
        bus.on().bind(|event: &mut PlacementRequest| {
            if !event.cancel.is_canceled() {
                event.applied = true;
            }
            Ok(())
        });

        let mut request = PlacementRequest::default();
        bus.publish(&mut request).unwrap();
        assert!(request.cancel.is_canceled());
        assert!(!request.applied);
    }

    // Concurrent mutation.

    #[test_log::test]
    fn concurrent_bind_and_publish_stay_consistent() {
        let bus: Arc<EventBus<u64>> = Arc::new(EventBus::new());
        let invocations = Arc::new(AtomicU64::new(0));

        let binders: Vec<_> = (0..4)
            .map(|priority| {
                let bus = Arc::clone(&bus);
                let invocations = Arc::clone(&invocations);
                thread::spawn(move || {
                    for _ in 0..25 {
                        let counter = Arc::clone(&invocations);
                        bus.on().with(priority).bind(move |_: &mut u64| {
                            counter.fetch_add(1, Ordering::SeqCst);
                            Ok(())
                        });
                    }
                })
            })
            .collect();

        let publishers: Vec<_> = (0..4)
            .map(|_| {
                let bus = Arc::clone(&bus);
                thread::spawn(move || {
                    for tick in 0..25u64 {
                        let mut event = tick;
                        bus.publish(&mut event).unwrap();
                    }
                })
            })
            .collect();

        for handle in binders.into_iter().chain(publishers) {
            handle.join().unwrap();
        }

        assert_eq!(bus.len(), 100);

        // With all binds settled, one publish invokes every listener once.
        let before = invocations.load(Ordering::SeqCst);
        let mut event = 0u64;
        bus.publish(&mut event).unwrap();
        assert_eq!(invocations.load(Ordering::SeqCst) - before, 100);
    }

    #[test_log::test]
    fn concurrent_close_while_publishing_does_not_panic() {
        let bus: Arc<EventBus<u64>> = Arc::new(EventBus::new());
        let handles: Vec<_> = (0..50).map(|_| bus.on().bind(|_: &mut u64| Ok(()))).collect();

        let closer = thread::spawn(move || {
            for handle in handles {
                handle.close();
            }
        });
        let publisher = {
            let bus = Arc::clone(&bus);
            thread::spawn(move || {
                for tick in 0..50u64 {
                    let mut event = tick;
                    bus.publish(&mut event).unwrap();
                }
            })
        };

        closer.join().unwrap();
        publisher.join().unwrap();
        assert!(bus.is_empty());
    }
}
