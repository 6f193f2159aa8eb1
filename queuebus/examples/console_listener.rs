//! A listener object with declared handlers, a custom error sink and a
//! reload in the middle of the run.
//!
//! Run with `RUST_LOG=debug` to see the bus's own tracing output.

use queuebus::prelude::*;
use queuebus::{DynamicHandler, ParamKind, TracingSink};
use std::sync::Arc;
use std::time::Duration;

#[derive(Event, Clone, Debug)]
struct ConsoleMessage {
    text: String,
}

#[derive(Event, Clone, Debug)]
#[event(name = "package.loaded")]
struct PackageLoaded {
    name: String,
}

#[derive(Debug, thiserror::Error)]
#[error("refusing to load package `{0}`")]
struct Refused(String);

struct Console {
    prefix: &'static str,
}

impl Console {
    fn on_message(&self, event: &ConsoleMessage) {
        println!("{} {}", self.prefix, event.text);
    }

    fn on_package(&self, event: &PackageLoaded) -> Result<(), Refused> {
        if event.name.starts_with('_') {
            return Err(Refused(event.name.clone()));
        }
        println!("{} loaded package {}", self.prefix, event.name);
        Ok(())
    }
}

impl Listener for Console {
    fn declare_handlers(handlers: &mut HandlerDeclarations<Self>) {
        handlers
            .on_named("Console::on_message", Console::on_message)
            .on_named("Console::on_package", Console::on_package)
            // Declared with a non-event parameter: skipped and reported.
            .on_dynamic(DynamicHandler::new(
                "Console::on_tick",
                vec![ParamKind::value::<u64>()],
                |_: &Console, _| Ok(()),
            ));
    }
}

fn main() -> Result<(), EventBusError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let bus = EventBus::builder()
        .with_thread_name("console-dispatcher")
        .with_max_capacity(256)
        .with_error_sink(|report: ErrorReport| {
            eprintln!("⚠️  {}", report);
            TracingSink.report(report);
        })
        .build_enabled()?;

    let console = Arc::new(Console { prefix: ">" });
    let summary = bus.register_listener(&console)?;
    println!(
        "registered {} handlers, skipped {}",
        summary.handlers.len(),
        summary.skipped.len()
    );
    for skipped in &summary.skipped {
        println!("  skipped {}", skipped);
    }

    bus.fire_event(ConsoleMessage {
        text: "hello".to_string(),
    })?;
    bus.fire_event(PackageLoaded {
        name: "core".to_string(),
    })?;
    bus.fire_event(PackageLoaded {
        name: "_private".to_string(),
    })?;
    bus.wait_idle(Some(Duration::from_secs(1)));

    // Reload drops every handler; the console has to register again.
    bus.reload()?;
    println!("after reload: {} handlers", bus.total_handler_count());
    bus.register_listener(&console)?;

    bus.fire_event(ConsoleMessage {
        text: "back again".to_string(),
    })?;

    bus.disable()?;
    Ok(())
}
