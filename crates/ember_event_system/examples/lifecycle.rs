//! Simple host embedding: a world-wide event manager owning one bus for
//! general lifecycle events, with kind-filtered and priority-ordered
//! listeners.

use ember_event_system::{Cancelable, CancelToken, Event, EventBus, PRIORITY_HIGH, PRIORITY_LOW};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Fired once when the host starts serving.
#[derive(Debug)]
pub struct ServerStartingEvent {
    pub region: String,
}

/// Fired once when the host begins shutting down.
#[derive(Debug)]
pub struct ServerStoppingEvent;

/// Fired for every simulation tick; listeners may cancel follow-on work.
#[derive(Debug, Default)]
pub struct TickEvent {
    pub tick: u64,
    pub cancel: CancelToken,
}

/// General event manager for events that are not object specific.
///
/// The manager exclusively owns its bus; collaborators receive a reference
/// rather than looking it up through any ambient registry.
pub struct GlobalEvents {
    pub events: EventBus<dyn Event>,
}

impl GlobalEvents {
    pub fn new() -> Self {
        Self {
            events: EventBus::new(),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let global = GlobalEvents::new();

    // Observability listener: sees every event, before everything else.
    global.events.on().with(PRIORITY_HIGH).bind(|_event: &mut dyn Event| {
        info!("event observed");
        Ok(())
    });

    // Startup listener, filtered to its kind.
    global
        .events
        .on_kind::<ServerStartingEvent>()
        .bind(|event: &mut ServerStartingEvent| {
            info!(region = %event.region, "server starting");
            Ok(())
        });

    // Tick throttle: cancels every odd tick before low-priority consumers.
    global.events.on_kind::<TickEvent>().bind(|event: &mut TickEvent| {
        if event.tick % 2 == 1 {
            event.cancel.cancel();
        }
        Ok(())
    });
    let ticks_handle = global
        .events
        .on_kind::<TickEvent>()
        .with(PRIORITY_LOW)
        .bind(|event: &mut TickEvent| {
            if !event.cancel.is_canceled() {
                info!(tick = event.tick, "tick applied");
            }
            Ok(())
        });

    let mut starting = ServerStartingEvent {
        region: "overworld".to_string(),
    };
    global.events.publish(&mut starting)?;

    for tick in 0..4u64 {
        let mut event = TickEvent {
            tick,
            ..TickEvent::default()
        };
        global.events.publish(&mut event)?;
    }

    // The tick consumer unsubscribes before shutdown.
    ticks_handle.close();

    let mut stopping = ServerStoppingEvent;
    global.events.publish(&mut stopping)?;

    info!(stats = ?global.events.stats(), "shutting down");
    Ok(())
}
