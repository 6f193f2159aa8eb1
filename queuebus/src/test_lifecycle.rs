//! Tests for enable, disable, reload and drop.

#[cfg(test)]
mod tests {
    use crate::report::Severity;
    use crate::testing::{EventSpy, MockHandler, RecordingSink};
    use crate::{ErrorKind, Event, EventBus, EventBusError, Lifecycle};
    use crate::{HandlerDeclarations, Listener};

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Weak};
    use std::thread;
    use std::time::{Duration, Instant};

    const WAIT: Option<Duration> = Some(Duration::from_secs(5));

    #[derive(Clone, Debug, PartialEq)]
    struct Tick(u32);

    impl Event for Tick {
        fn event_type_name() -> &'static str {
            "Tick"
        }
    }

    fn bus_with(sink: &RecordingSink) -> EventBus {
        EventBus::builder().with_error_sink(sink.clone()).build()
    }

    fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        condition()
    }

    #[test]
    fn test_enable_twice_fails_without_side_effects() {
        let bus = EventBus::new();
        bus.enable().unwrap();
        bus.subscribe(|_: &Tick| {}).unwrap();

        assert!(matches!(bus.enable(), Err(EventBusError::AlreadyEnabled)));
        assert_eq!(bus.lifecycle(), Lifecycle::Enabled);
        assert_eq!(bus.handler_count::<Tick>(), 1);
    }

    #[test]
    fn test_disable_twice_fails() {
        let bus = EventBus::new();
        assert!(matches!(bus.disable(), Err(EventBusError::AlreadyDisabled)));

        bus.enable().unwrap();
        bus.disable().unwrap();
        assert!(matches!(bus.disable(), Err(EventBusError::AlreadyDisabled)));
        assert_eq!(bus.lifecycle(), Lifecycle::Disabled);
    }

    #[test]
    fn test_disable_drains_queued_events() {
        let bus = EventBus::new();
        bus.enable().unwrap();

        let spy = Arc::new(EventSpy::<Tick>::new());
        bus.register_listener(&spy).unwrap();
        bus.subscribe(|_: &Tick| thread::sleep(Duration::from_micros(200)))
            .unwrap();

        for i in 0..100 {
            bus.fire_event(Tick(i)).unwrap();
        }
        bus.disable().unwrap();

        assert_eq!(spy.events(), (0..100).map(Tick).collect::<Vec<_>>());
    }

    #[test]
    fn test_disable_clears_registrations() {
        let bus = EventBus::new();
        bus.enable().unwrap();
        let mock = MockHandler::new();
        bus.subscribe(mock.handler::<Tick>()).unwrap();

        bus.disable().unwrap();
        assert_eq!(bus.handler_count::<Tick>(), 0);
        assert_eq!(bus.queued_events(), 0);

        bus.enable().unwrap();
        assert_eq!(bus.total_handler_count(), 0);
        bus.fire_event(Tick(1)).unwrap();
        assert!(bus.wait_idle(WAIT));
        assert_eq!(mock.calls(), 0);
    }

    #[test]
    fn test_reload_leaves_bus_enabled_and_empty() {
        let bus = EventBus::new();
        bus.enable().unwrap();
        bus.subscribe(|_: &Tick| {}).unwrap();

        bus.reload().unwrap();
        assert!(bus.is_enabled());
        assert_eq!(bus.total_handler_count(), 0);

        let spy = Arc::new(EventSpy::<Tick>::new());
        bus.register_listener(&spy).unwrap();
        bus.fire_event(Tick(7)).unwrap();
        assert!(spy.wait_for(1, Duration::from_secs(5)));
    }

    #[test]
    fn test_reload_on_disabled_bus_enables() {
        let bus = EventBus::new();
        bus.reload().unwrap();
        assert_eq!(bus.lifecycle(), Lifecycle::Enabled);
    }

    #[test]
    fn test_enable_after_disable_accepts_events_again() {
        let bus = EventBus::new();
        for round in 0..3 {
            bus.enable().unwrap();
            let spy = Arc::new(EventSpy::<Tick>::new());
            bus.register_listener(&spy).unwrap();
            bus.fire_event(Tick(round)).unwrap();
            bus.disable().unwrap();
            assert_eq!(spy.events(), vec![Tick(round)]);
        }
    }

    #[test]
    fn test_drop_disables_and_drains() {
        let spy = Arc::new(EventSpy::<Tick>::new());
        {
            let bus = EventBus::new();
            bus.enable().unwrap();
            bus.register_listener(&spy).unwrap();
            for i in 0..20 {
                bus.fire_event(Tick(i)).unwrap();
            }
        }
        assert_eq!(spy.count(), 20);
    }

    #[test]
    fn test_dispatcher_runs_on_named_thread() {
        let bus = EventBus::builder().with_thread_name("lifecycle-test").build();
        bus.enable().unwrap();

        let names = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen = Arc::clone(&names);
        bus.subscribe(move |_: &Tick| {
            seen.lock()
                .push(thread::current().name().map(str::to_string));
        })
        .unwrap();

        bus.fire_event(Tick(0)).unwrap();
        assert!(bus.wait_idle(WAIT));
        assert_eq!(*names.lock(), vec![Some("lifecycle-test".to_string())]);
    }

    #[test]
    fn test_disable_from_handler_does_not_deadlock() {
        let sink = RecordingSink::new();
        let bus = Arc::new(bus_with(&sink));
        bus.enable().unwrap();

        let weak: Weak<EventBus> = Arc::downgrade(&bus);
        bus.subscribe(move |_: &Tick| {
            if let Some(bus) = weak.upgrade() {
                bus.disable().unwrap();
            }
        })
        .unwrap();

        bus.fire_event(Tick(0)).unwrap();

        assert!(wait_until(Duration::from_secs(5), || {
            bus.lifecycle() == Lifecycle::Disabled
        }));
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, ErrorKind::ShutdownInterrupted);
        assert_eq!(reports[0].severity, Severity::Info);

        bus.enable().unwrap();
        assert!(bus.is_enabled());
    }

    #[test]
    fn test_shutdown_timeout_detaches_stuck_dispatcher() {
        let sink = RecordingSink::new();
        let bus = EventBus::builder()
            .with_error_sink(sink.clone())
            .with_shutdown_timeout(Duration::from_millis(50))
            .build();
        bus.enable().unwrap();

        let release = Arc::new(AtomicBool::new(false));
        let entered = Arc::new(AtomicBool::new(false));
        let (release_flag, entered_flag) = (Arc::clone(&release), Arc::clone(&entered));
        bus.subscribe(move |_: &Tick| {
            entered_flag.store(true, Ordering::SeqCst);
            while !release_flag.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
        })
        .unwrap();

        bus.fire_event(Tick(0)).unwrap();
        bus.fire_event(Tick(1)).unwrap();
        assert!(wait_until(Duration::from_secs(5), || entered.load(Ordering::SeqCst)));

        let started = Instant::now();
        bus.disable().unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(bus.lifecycle(), Lifecycle::Disabled);
        assert_eq!(sink.count(ErrorKind::ShutdownInterrupted), 1);
        assert_eq!(sink.reports()[0].severity, Severity::Warning);

        release.store(true, Ordering::SeqCst);
    }

    #[test]
    fn test_handler_panic_is_caught_and_reported() {
        let sink = RecordingSink::new();
        let bus = bus_with(&sink);
        bus.enable().unwrap();

        bus.subscribe(|event: &Tick| {
            if event.0 == 1 {
                panic!("tick {} is unlucky", event.0);
            }
        })
        .unwrap();
        let spy = Arc::new(EventSpy::<Tick>::new());
        bus.register_listener(&spy).unwrap();

        for i in 0..3 {
            bus.fire_event(Tick(i)).unwrap();
        }
        assert!(bus.wait_idle(WAIT));

        assert_eq!(spy.count(), 3);
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, ErrorKind::DispatchFailure);
        assert!(reports[0]
            .detail
            .as_deref()
            .is_some_and(|detail| detail.contains("tick 1 is unlucky")));
    }

    #[test]
    fn test_uncaught_handler_panic_closes_the_queue() {
        let sink = RecordingSink::new();
        let bus = EventBus::builder()
            .with_error_sink(sink.clone())
            .with_catch_panics(false)
            .build();
        bus.enable().unwrap();

        let spy = Arc::new(EventSpy::<Tick>::new());
        bus.register_listener(&spy).unwrap();
        bus.subscribe(|event: &Tick| {
            if event.0 == 1 {
                panic!("tick {} is fatal", event.0);
            }
        })
        .unwrap();

        for i in 0..3 {
            bus.fire_event(Tick(i)).unwrap();
        }
        assert!(wait_until(Duration::from_secs(5), || {
            sink.count(ErrorKind::ShutdownInterrupted) == 1
        }));
        assert!(bus.wait_idle(WAIT));
        assert_eq!(sink.reports()[0].severity, Severity::Severe);

        assert!(bus.fire_event(Tick(9)).is_ok());
        assert!(!bus.try_fire_event(Tick(10)));
        assert_eq!(bus.queued_events(), 0);
        assert_eq!(spy.events(), vec![Tick(0), Tick(1)]);

        bus.disable().unwrap();
        assert_eq!(sink.count(ErrorKind::ShutdownInterrupted), 2);
        bus.enable().unwrap();
        assert!(bus.is_enabled());
    }

    #[test]
    fn test_dropped_listener_is_skipped_silently() {
        struct Counter(parking_lot::Mutex<u32>);

        impl Counter {
            fn on_tick(&self, _: &Tick) {
                *self.0.lock() += 1;
            }
        }

        impl Listener for Counter {
            fn declare_handlers(handlers: &mut HandlerDeclarations<Self>) {
                handlers.on(Counter::on_tick);
            }
        }

        let sink = RecordingSink::new();
        let bus = bus_with(&sink);
        bus.enable().unwrap();

        let counter = Arc::new(Counter(parking_lot::Mutex::new(0)));
        bus.register_listener(&counter).unwrap();
        drop(counter);

        bus.fire_event(Tick(0)).unwrap();
        assert!(bus.wait_idle(WAIT));
        assert!(sink.is_empty());
    }
}
