//! Session facade
//!
//! One `Controller` per channel session. It owns the registry, parser,
//! queue and scheduler, and is driven from a single task: transports hand
//! their messages over channels, the session loop calls the `handle_*`
//! entry points and `tick`. Nothing in here is shared or locked.

use std::time::Instant;

use tracing::{debug, info};

use crate::dispatch::DispatchQueue;
use crate::events::{EventDefinition, EventRegistry};
use crate::scheduler::Scheduler;
use crate::trigger::{Intent, NormalizedMessage, ReplySink, TriggerParser};

/// Event toggled to a paid cost while a hype train is active
pub const HYPE_TRAIN_EVENT: &str = "HypeTrain";

/// Hype-train lifecycle notices from the pub/sub feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HypePhase {
    Started,
    LevelUp,
    Ended,
}

pub struct Controller {
    registry: EventRegistry,
    parser: TriggerParser,
    queue: DispatchQueue,
    scheduler: Scheduler,
    replies: Box<dyn ReplySink + Send>,
    hype_active: bool,
    hype_level: u32,
    hype_event_cost: u32,
}

impl Controller {
    pub fn new(
        parser: TriggerParser,
        replies: Box<dyn ReplySink + Send>,
        max_pending: usize,
        hype_event_cost: u32,
    ) -> Self {
        Self {
            registry: EventRegistry::new(),
            parser,
            queue: DispatchQueue::new(max_pending),
            scheduler: Scheduler::new(),
            replies,
            hype_active: false,
            hype_level: 1,
            hype_event_cost,
        }
    }

    // ── registry passthroughs ──────────────────────────────────────────────

    pub fn register(&mut self, id: impl Into<String>, definition: EventDefinition) -> bool {
        self.registry.register(id, definition)
    }

    pub fn unregister(&mut self, id: &str) -> bool {
        self.registry.unregister(id)
    }

    pub fn set_cost(&mut self, id: &str, new_cost: u32) -> bool {
        self.registry.set_cost(id, new_cost)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.registry.contains(id)
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn hype_active(&self) -> bool {
        self.hype_active
    }

    pub fn hype_level(&self) -> u32 {
        self.hype_level
    }

    // ── session entry points ───────────────────────────────────────────────

    /// Feed one chat message through the trigger rules.
    pub fn handle_chat(&mut self, msg: &NormalizedMessage) {
        let intent = self
            .parser
            .parse_chat(msg, &self.registry, self.replies.as_mut());
        if let Some(intent) = intent {
            self.apply(intent, msg.payload_text.clone());
        }
    }

    /// Feed one decoded pub/sub notification.
    pub fn handle_pubsub(&mut self, msg: &NormalizedMessage) {
        if let Some(intent) = self.parser.parse_pubsub(msg) {
            self.apply(intent, msg.payload_text.clone());
        }
    }

    /// React to a hype-train phase change.
    ///
    /// Start makes the `HypeTrain` event biddable at the configured cost and
    /// re-announces prices; each level-up queues the completion event for the
    /// level just finished; end restores the cost to 0 and resets the level.
    pub fn handle_hype(&mut self, phase: HypePhase) {
        match phase {
            HypePhase::Started => {
                self.hype_active = true;
                self.registry.set_cost(HYPE_TRAIN_EVENT, self.hype_event_cost);
                self.queue.lookup_named(
                    &self.registry,
                    "HypeTrainStart",
                    "!!!HYPETRAIN STARTED!!!",
                    None,
                );
                for line in self.registry.price_lines() {
                    self.replies.reply(line);
                }
                info!(cost = self.hype_event_cost, "hype train started");
            }
            HypePhase::LevelUp => {
                let id = format!("HypeTrainLevel{}Completed", self.hype_level);
                let invoker = format!("!!!LEVEL {} HYPETRAIN!!!", self.hype_level);
                self.queue.lookup_named(&self.registry, &id, &invoker, None);
                info!(level = self.hype_level, "hype train level complete");
                self.hype_level += 1;
            }
            HypePhase::Ended => {
                self.hype_active = false;
                self.hype_level = 1;
                self.registry.set_cost(HYPE_TRAIN_EVENT, 0);
                self.queue.lookup_named(
                    &self.registry,
                    "HypeTrainEnd",
                    "!!!HYPETRAIN FINISHED!!!",
                    None,
                );
                info!("hype train finished");
            }
        }
    }

    /// Advance cooldowns and admit at most one invocation.
    pub fn tick(&mut self, now: Instant) {
        self.scheduler
            .tick(now, &mut self.queue, &mut self.registry);
    }

    /// Send a line to the channel as the logged-in account.
    pub fn say(&mut self, line: impl Into<String>) {
        self.replies.reply(line.into());
    }

    fn apply(&mut self, intent: Intent, payload: Option<String>) {
        match intent {
            Intent::Named { id, invoker } => {
                debug!(event_id = %id, invoker = %invoker, "named trigger");
                self.queue.lookup_named(&self.registry, &id, &invoker, payload);
            }
            Intent::Amount { bits, invoker } => {
                debug!(bits, invoker = %invoker, "amount trigger");
                self.queue.lookup_amount(&self.registry, bits, &invoker, payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use crate::trigger::AuthPolicy;

    use super::*;

    #[derive(Clone, Default)]
    struct SharedSink(Arc<Mutex<Vec<String>>>);

    impl ReplySink for SharedSink {
        fn reply(&mut self, line: String) {
            self.0.lock().unwrap().push(line);
        }
    }

    impl SharedSink {
        fn lines(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn make_controller(hype_event_cost: u32) -> (Controller, SharedSink) {
        let auth = AuthPolicy::new("StreamerGuy", "Streamlabs", vec!["ModAlice".to_string()]);
        let parser = TriggerParser::new(
            auth,
            "12345",
            "(?<user>.*) just tipped (?<donation>.*)!",
        )
        .unwrap();
        let sink = SharedSink::default();
        let controller = Controller::new(parser, Box::new(sink.clone()), 128, hype_event_cost);
        (controller, sink)
    }

    fn logging_event(log: &Log, cost: u32) -> EventDefinition {
        let log = Arc::clone(log);
        EventDefinition::simple(cost, 0.0, move |id, user| {
            log.lock().unwrap().push(format!("{id}<-{user}"));
            Ok(())
        })
    }

    fn chat(user: &str, text: &str) -> NormalizedMessage {
        NormalizedMessage::chat(user, "tmi.twitch.tv", text)
    }

    #[test]
    fn test_chat_command_runs_event_on_next_tick() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (mut controller, _sink) = make_controller(0);
        controller.register("Laser", logging_event(&log, 150));

        controller.handle_chat(&chat("StreamerGuy", "!eLaser"));
        assert_eq!(controller.pending(), 1);

        controller.tick(Instant::now());
        assert_eq!(log.lock().unwrap().clone(), vec!["Laser<-StreamerGuy"]);
        assert_eq!(controller.pending(), 0);
    }

    #[test]
    fn test_unauthorized_chat_changes_nothing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (mut controller, sink) = make_controller(0);
        controller.register("Laser", logging_event(&log, 150));

        controller.handle_chat(&chat("rando", "!eLaser"));
        controller.handle_chat(&chat("rando", "!allevents"));

        assert_eq!(controller.pending(), 0);
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_price_listing_is_public() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (mut controller, sink) = make_controller(0);
        controller.register("Laser", logging_event(&log, 150));

        controller.handle_chat(&chat("rando", "!events"));
        assert_eq!(sink.lines(), vec!["[ Laser ]: 150 bits"]);
    }

    #[test]
    fn test_pubsub_bits_selects_by_amount() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (mut controller, _sink) = make_controller(0);
        controller.register("Small", logging_event(&log, 100));
        controller.register("Big", logging_event(&log, 1000));

        let msg = NormalizedMessage {
            user: "Cheerer".to_string(),
            trigger_text: "700".to_string(),
            host: "channel-bits-events-v2.12345".to_string(),
            payload_text: Some("cheer700 go".to_string()),
        };
        controller.handle_pubsub(&msg);
        controller.tick(Instant::now());

        assert_eq!(log.lock().unwrap().clone(), vec!["Small<-Cheerer"]);
    }

    #[test]
    fn test_hype_start_prices_the_train_and_announces() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (mut controller, sink) = make_controller(500);
        controller.register(HYPE_TRAIN_EVENT, logging_event(&log, 0));
        controller.register("HypeTrainStart", logging_event(&log, 0));

        controller.handle_hype(HypePhase::Started);

        assert!(controller.hype_active());
        assert_eq!(
            controller.registry().get(HYPE_TRAIN_EVENT).unwrap().bit_cost,
            500
        );
        // Price list now includes the train itself
        assert_eq!(sink.lines(), vec!["[ HypeTrain ]: 500 bits"]);

        controller.tick(Instant::now());
        assert_eq!(
            log.lock().unwrap().clone(),
            vec!["HypeTrainStart<-!!!HYPETRAIN STARTED!!!"]
        );
    }

    #[test]
    fn test_hype_levels_count_up_from_one() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (mut controller, _sink) = make_controller(0);
        controller.register("HypeTrainLevel1Completed", logging_event(&log, 0));
        controller.register("HypeTrainLevel2Completed", logging_event(&log, 0));

        controller.handle_hype(HypePhase::Started);
        controller.handle_hype(HypePhase::LevelUp);
        controller.handle_hype(HypePhase::LevelUp);
        assert_eq!(controller.hype_level(), 3);

        let t0 = Instant::now();
        controller.tick(t0);
        controller.tick(t0 + Duration::from_millis(100));

        assert_eq!(
            log.lock().unwrap().clone(),
            vec![
                "HypeTrainLevel1Completed<-!!!LEVEL 1 HYPETRAIN!!!",
                "HypeTrainLevel2Completed<-!!!LEVEL 2 HYPETRAIN!!!",
            ]
        );
    }

    #[test]
    fn test_hype_end_resets_cost_and_level() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (mut controller, _sink) = make_controller(500);
        controller.register(HYPE_TRAIN_EVENT, logging_event(&log, 0));
        controller.register("HypeTrainEnd", logging_event(&log, 0));

        controller.handle_hype(HypePhase::Started);
        controller.handle_hype(HypePhase::LevelUp);
        controller.handle_hype(HypePhase::Ended);

        assert!(!controller.hype_active());
        assert_eq!(controller.hype_level(), 1);
        assert_eq!(
            controller.registry().get(HYPE_TRAIN_EVENT).unwrap().bit_cost,
            0
        );

        // Level1 completion was never registered, so its trigger is
        // discarded at queue time and only the end event fires
        let t0 = Instant::now();
        controller.tick(t0);
        controller.tick(t0 + Duration::from_millis(100));
        assert_eq!(
            log.lock().unwrap().clone(),
            vec!["HypeTrainEnd<-!!!HYPETRAIN FINISHED!!!"]
        );
    }

    #[test]
    fn test_say_reaches_the_reply_sink() {
        let (mut controller, sink) = make_controller(0);
        controller.say("ModBot Connected.");
        assert_eq!(sink.lines(), vec!["ModBot Connected."]);
    }
}
