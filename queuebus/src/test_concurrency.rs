//! Tests for concurrent producers and re-entrant handlers.

#[cfg(test)]
mod tests {
    use crate::testing::{EventSpy, RecordingSink};
    use crate::{Event, EventBus, HandlerId};

    use parking_lot::Mutex;
    use std::sync::{Arc, Barrier, Weak};
    use std::thread;
    use std::time::Duration;

    const WAIT: Option<Duration> = Some(Duration::from_secs(10));

    #[derive(Clone, Debug, PartialEq)]
    struct Sequenced {
        producer: u32,
        seq: u32,
    }

    impl Event for Sequenced {}

    #[derive(Clone, Debug, PartialEq)]
    struct Request(u32);

    impl Event for Request {}

    #[derive(Clone, Debug, PartialEq)]
    struct Response(u32);

    impl Event for Response {}

    #[derive(Clone, Debug, PartialEq)]
    struct Notice {
        text: &'static str,
    }

    impl Event for Notice {}

    #[derive(Clone, Debug, PartialEq)]
    struct Alert {
        notice: Notice,
        level: u8,
    }

    impl Event for Alert {}

    impl AsRef<Notice> for Alert {
        fn as_ref(&self) -> &Notice {
            &self.notice
        }
    }

    fn enabled_bus() -> Arc<EventBus> {
        let bus = EventBus::builder()
            .with_error_sink(RecordingSink::new())
            .build();
        bus.enable().unwrap();
        Arc::new(bus)
    }

    #[test]
    fn test_concurrent_producers_keep_per_producer_order() {
        let bus = enabled_bus();
        let spy = Arc::new(EventSpy::<Sequenced>::new());
        bus.register_listener(&spy).unwrap();

        let producers = 4u32;
        let per_producer = 500u32;
        let start = Arc::new(Barrier::new(producers as usize));

        let handles: Vec<_> = (0..producers)
            .map(|producer| {
                let bus = Arc::clone(&bus);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    for seq in 0..per_producer {
                        bus.fire_event(Sequenced { producer, seq }).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(bus.wait_idle(WAIT));
        let events = spy.events();
        assert_eq!(events.len(), (producers * per_producer) as usize);

        for producer in 0..producers {
            let seqs: Vec<u32> = events
                .iter()
                .filter(|event| event.producer == producer)
                .map(|event| event.seq)
                .collect();
            assert_eq!(seqs, (0..per_producer).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_handler_can_fire_events() {
        let bus = enabled_bus();
        let weak: Weak<EventBus> = Arc::downgrade(&bus);
        bus.subscribe(move |request: &Request| {
            if let Some(bus) = weak.upgrade() {
                bus.fire_event(Response(request.0 * 2)).unwrap();
            }
        })
        .unwrap();

        let spy = Arc::new(EventSpy::<Response>::new());
        bus.register_listener(&spy).unwrap();

        for i in 0..10 {
            bus.fire_event(Request(i)).unwrap();
        }

        assert!(spy.wait_for(10, Duration::from_secs(5)));
        assert_eq!(
            spy.events(),
            (0..10).map(|i| Response(i * 2)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_registration_during_dispatch_uses_snapshot() {
        let bus = enabled_bus();
        let log = Arc::new(Mutex::new(Vec::new()));

        let weak = Arc::downgrade(&bus);
        let registering_log = Arc::clone(&log);
        bus.subscribe(move |request: &Request| {
            registering_log.lock().push(format!("first {}", request.0));
            if request.0 == 0 {
                if let Some(bus) = weak.upgrade() {
                    let late_log = Arc::clone(&registering_log);
                    bus.subscribe(move |request: &Request| {
                        late_log.lock().push(format!("late {}", request.0));
                    })
                    .unwrap();
                }
            }
        })
        .unwrap();

        bus.fire_event(Request(0)).unwrap();
        bus.fire_event(Request(1)).unwrap();
        assert!(bus.wait_idle(WAIT));

        assert_eq!(*log.lock(), vec!["first 0", "first 1", "late 1"]);
    }

    #[test]
    fn test_handler_can_unsubscribe_itself() {
        let bus = enabled_bus();
        let own_id: Arc<Mutex<Option<HandlerId>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(Mutex::new(0u32));

        let weak = Arc::downgrade(&bus);
        let id_slot = Arc::clone(&own_id);
        let counter = Arc::clone(&calls);
        let id = bus
            .subscribe(move |_: &Request| {
                *counter.lock() += 1;
                let id = *id_slot.lock();
                if let (Some(bus), Some(id)) = (weak.upgrade(), id) {
                    bus.unsubscribe(id);
                }
            })
            .unwrap();
        *own_id.lock() = Some(id);

        for i in 0..5 {
            bus.fire_event(Request(i)).unwrap();
        }
        assert!(bus.wait_idle(WAIT));

        assert_eq!(*calls.lock(), 1);
        assert_eq!(bus.handler_count::<Request>(), 0);
    }

    #[test]
    fn test_register_and_fire_from_many_threads() {
        let bus = enabled_bus();
        let spies: Vec<_> = (0..4)
            .map(|_| Arc::new(EventSpy::<Request>::new()))
            .collect();

        let handles: Vec<_> = spies
            .iter()
            .cloned()
            .map(|spy| {
                let bus = Arc::clone(&bus);
                thread::spawn(move || {
                    bus.register_listener(&spy).unwrap();
                    for i in 0..50 {
                        bus.fire_event(Request(i)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(bus.wait_idle(WAIT));
        assert_eq!(bus.handler_count::<Request>(), 4);
        // Every spy was registered before its own producer fired.
        for spy in &spies {
            assert!(spy.count() >= 50);
            assert!(spy.count() <= 200);
        }
    }

    #[test]
    fn test_supertype_delivery() {
        let bus = enabled_bus();
        assert!(bus.map_supertype::<Alert, Notice>().unwrap());
        assert!(!bus.map_supertype::<Alert, Notice>().unwrap());

        let notices = Arc::new(EventSpy::<Notice>::new());
        let alerts = Arc::new(EventSpy::<Alert>::new());
        bus.register_listener(&notices).unwrap();
        bus.register_listener(&alerts).unwrap();

        bus.fire_event(Alert {
            notice: Notice { text: "disk full" },
            level: 3,
        })
        .unwrap();
        bus.fire_event(Notice { text: "saved" }).unwrap();
        assert!(bus.wait_idle(WAIT));

        assert_eq!(alerts.count(), 1);
        assert_eq!(alerts.events()[0].level, 3);
        assert_eq!(
            notices.events(),
            vec![Notice { text: "disk full" }, Notice { text: "saved" }]
        );
    }

    #[cfg(feature = "async")]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_wait_idle_async() {
        let bus = enabled_bus();
        let spy = Arc::new(EventSpy::<Request>::new());
        bus.register_listener(&spy).unwrap();
        bus.subscribe(|_: &Request| thread::sleep(Duration::from_millis(1)))
            .unwrap();

        for i in 0..20 {
            bus.fire_event(Request(i)).unwrap();
        }

        tokio::time::timeout(Duration::from_secs(5), bus.wait_idle_async())
            .await
            .expect("bus did not become idle");
        assert_eq!(spy.count(), 20);
    }
}
