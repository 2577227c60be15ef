//! Session loop - wires the transports to the controller
//!
//! Architecture:
//! - chat client task and pub/sub reader thread feed mpsc channels
//! - the session task owns the `Controller` and is its only writer
//! - console commands arrive on their own channel from the stdin thread
//! - replies flow back to chat through a bounded outbound channel

use std::path::Path;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use chatfx_core::{
    ActionError, AppConfig, CatalogEntry, CatalogVariant, ChatConfig, Controller, EventDefinition,
    NormalizedMessage, PubSubConfig, PubSubUpdate, ReplySink, TriggerParser, load_catalog,
    run_chat_client, spawn_pubsub_client,
};

use crate::console::ConsoleCommand;
use crate::oauth::Credentials;

const CHANNEL_CAPACITY: usize = 64;

// ─────────────────────────────────────────────────────────────────────────────
// Reply sink
// ─────────────────────────────────────────────────────────────────────────────

/// Forwards controller replies to the chat client's outbound channel.
struct ChannelSink {
    outbound: mpsc::Sender<String>,
}

impl ReplySink for ChannelSink {
    fn reply(&mut self, line: String) {
        if let Err(error) = self.outbound.try_send(line) {
            warn!(%error, "chat reply dropped");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Catalog bridge
// ─────────────────────────────────────────────────────────────────────────────

fn fill_template(template: &str, event_id: &str, invoker: &str, text: &str) -> String {
    template
        .replace("{event}", event_id)
        .replace("{user}", invoker)
        .replace("{text}", text)
}

fn announce_line(
    sender: &mpsc::Sender<String>,
    template: Option<&str>,
    event_id: &str,
    invoker: &str,
    text: &str,
) -> Result<(), ActionError> {
    let Some(template) = template else {
        return Ok(());
    };
    let line = fill_template(template, event_id, invoker, text);
    sender
        .try_send(line)
        .map_err(|error| format!("announcement dropped: {error}").into())
}

/// Turn a catalog entry into a definition whose callbacks log and send
/// templated chat announcements.
fn definition_from_entry(entry: &CatalogEntry, replies: mpsc::Sender<String>) -> EventDefinition {
    match entry.variant {
        CatalogVariant::Simple => {
            let announce = entry.announce.clone();
            EventDefinition::simple(
                entry.bit_cost,
                entry.cooldown_secs,
                move |event_id, invoker| {
                    info!(event_id = %event_id, invoker = %invoker, "event fired");
                    announce_line(&replies, announce.as_deref(), event_id, invoker, "")
                },
            )
        }
        CatalogVariant::Timed => {
            let announce = entry.announce.clone();
            let expire_announce = entry.expire_announce.clone();
            let expire_id = entry.id.clone();
            let expire_replies = replies.clone();
            EventDefinition::timed(
                entry.bit_cost,
                entry.cooldown_secs,
                entry.effect_secs,
                move |event_id, invoker| {
                    info!(event_id = %event_id, invoker = %invoker, "timed event started");
                    announce_line(&replies, announce.as_deref(), event_id, invoker, "")
                },
                move || {
                    info!(event_id = %expire_id, "timed event ended");
                    announce_line(
                        &expire_replies,
                        expire_announce.as_deref(),
                        &expire_id,
                        "",
                        "",
                    )
                },
            )
        }
        CatalogVariant::DataBound => {
            let announce = entry.announce.clone();
            EventDefinition::data_bound(
                entry.bit_cost,
                entry.cooldown_secs,
                move |event_id, invoker| {
                    // The data callback carries the announcement; without
                    // viewer text there is nothing to fill {text} with
                    info!(event_id = %event_id, invoker = %invoker, "event fired");
                    Ok(())
                },
                move |event_id, invoker, text| {
                    announce_line(&replies, announce.as_deref(), event_id, invoker, text)
                },
            )
        }
    }
}

/// Load the catalog file and register every entry. A missing file starts
/// an empty registry; an unreadable or invalid one is an error.
fn register_catalog(
    controller: &mut Controller,
    path: &Path,
    replies: &mpsc::Sender<String>,
) -> Result<usize, String> {
    if !path.exists() {
        warn!(path = %path.display(), "no event catalog, starting with an empty registry");
        return Ok(0);
    }

    let entries = load_catalog(path).map_err(|e| e.to_string())?;
    let mut registered = 0;
    for entry in &entries {
        let definition = definition_from_entry(entry, replies.clone());
        if controller.register(entry.id.clone(), definition) {
            registered += 1;
        }
    }

    info!(registered, path = %path.display(), "event catalog loaded");
    Ok(registered)
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the controller and everything wired to it for one run.
pub struct Session {
    controller: Controller,
    chat_rx: mpsc::Receiver<NormalizedMessage>,
    pubsub_rx: mpsc::Receiver<PubSubUpdate>,
    commands: mpsc::Receiver<ConsoleCommand>,
    replies: mpsc::Sender<String>,
    streamer: String,
    tick_interval: Duration,
}

impl Session {
    /// Build the controller, load the catalog and spawn both transport
    /// clients.
    pub fn start(
        config: &AppConfig,
        credentials: &Credentials,
        commands: mpsc::Receiver<ConsoleCommand>,
    ) -> Result<Self, String> {
        let (chat_tx, chat_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (pubsub_tx, pubsub_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let parser = TriggerParser::new(
            config.auth_policy(&credentials.login),
            &credentials.user_id,
            &config.tips_pattern,
        )
        .map_err(|e| e.to_string())?;

        let sink = ChannelSink {
            outbound: outbound_tx.clone(),
        };
        let mut controller = Controller::new(
            parser,
            Box::new(sink),
            config.max_pending,
            config.hype_train_event_cost,
        );

        register_catalog(&mut controller, Path::new(&config.events_file), &outbound_tx)?;

        let chat_config = ChatConfig {
            server: config.chat_server.clone(),
            port: config.chat_port,
            token: credentials.access_token.clone(),
            login: credentials.login.clone(),
        };
        tokio::spawn(run_chat_client(chat_config, chat_tx, outbound_rx));

        let pubsub_config = PubSubConfig {
            url: config.pubsub_url.clone(),
            channel_id: credentials.user_id.clone(),
            auth_token: credentials.access_token.clone(),
        };
        spawn_pubsub_client(pubsub_config, pubsub_tx);

        Ok(Self {
            controller,
            chat_rx,
            pubsub_rx,
            commands,
            replies: outbound_tx,
            streamer: credentials.login.clone(),
            // interval() panics on zero
            tick_interval: Duration::from_millis(config.tick_interval_ms.max(1)),
        })
    }

    /// Run until the console quits or disappears. Dropping the session's
    /// channel ends is what tells both clients to shut down.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.controller.tick(Instant::now()),
                Some(msg) = self.chat_rx.recv() => self.controller.handle_chat(&msg),
                Some(update) = self.pubsub_rx.recv() => match update {
                    PubSubUpdate::Delivery(msg) => self.controller.handle_pubsub(&msg),
                    PubSubUpdate::Hype(phase) => self.controller.handle_hype(phase),
                },
                command = self.commands.recv() => match command {
                    Some(ConsoleCommand::Quit) | None => break,
                    Some(command) => self.handle_command(command),
                },
            }
        }

        info!("session closed");
    }

    fn handle_command(&mut self, command: ConsoleCommand) {
        match command {
            ConsoleCommand::Events => {
                for line in self.controller.registry().catalog_lines() {
                    println!("{line}");
                }
                println!("{} events registered", self.controller.registry().len());
            }
            ConsoleCommand::Register {
                id,
                bits,
                cooldown,
                announce,
            } => {
                let entry = CatalogEntry {
                    id: id.clone(),
                    bit_cost: bits,
                    cooldown_secs: cooldown.max(0.0),
                    variant: CatalogVariant::Simple,
                    effect_secs: 0.0,
                    announce,
                    expire_announce: None,
                };
                let definition = definition_from_entry(&entry, self.replies.clone());
                if self.controller.register(id.clone(), definition) {
                    println!("registered [ {id} ]");
                } else {
                    println!("[ {id} ] is already registered");
                }
            }
            ConsoleCommand::Unregister { id } => {
                if self.controller.unregister(&id) {
                    println!("unregistered [ {id} ]");
                } else {
                    println!("[ {id} ] is not registered");
                }
            }
            ConsoleCommand::Cost { id, bits } => {
                if self.controller.set_cost(&id, bits) {
                    println!("[ {id} ]: {bits} bits");
                } else {
                    println!("[ {id} ] is not registered");
                }
            }
            ConsoleCommand::Say { text } => self.controller.say(text.join(" ")),
            ConsoleCommand::Inject { user, text } => {
                let user = user.unwrap_or_else(|| self.streamer.clone());
                let msg = NormalizedMessage::chat(user, "console", text.join(" "));
                self.controller.handle_chat(&msg);
            }
            ConsoleCommand::Status => self.print_status(),
            // The run loop breaks on Quit before dispatching here
            ConsoleCommand::Quit => {}
        }
    }

    fn print_status(&self) {
        let now = Instant::now();
        let scheduler = self.controller.scheduler();

        println!("pending invocations: {}", self.controller.pending());
        for id in scheduler.running_ids() {
            let remaining = scheduler.running_remaining(id, now).unwrap_or_default();
            println!("running  [ {id} ]: {:.1}s left", remaining.as_secs_f32());
        }
        for id in scheduler.cooldown_ids() {
            let remaining = scheduler.cooldown_remaining(id, now).unwrap_or_default();
            println!("cooldown [ {id} ]: {:.1}s left", remaining.as_secs_f32());
        }
        if self.controller.hype_active() {
            println!("hype train active, level {}", self.controller.hype_level());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatfx_core::{DispatchQueue, EventRegistry, Scheduler};

    fn entry(id: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            bit_cost: 100,
            cooldown_secs: 5.0,
            variant: CatalogVariant::Simple,
            effect_secs: 0.0,
            announce: None,
            expire_announce: None,
        }
    }

    #[test]
    fn test_template_substitution() {
        assert_eq!(
            fill_template("{user} fired {event}: {text}", "Laser", "Alice", "pew"),
            "Alice fired Laser: pew"
        );
        assert_eq!(fill_template("no placeholders", "Laser", "Alice", ""), "no placeholders");
    }

    #[test]
    fn test_simple_entry_announces_on_admission() {
        let (tx, mut rx) = mpsc::channel(8);
        let catalog_entry = CatalogEntry {
            announce: Some("{user} fired {event}!".to_string()),
            ..entry("Laser")
        };

        let mut registry = EventRegistry::new();
        registry.register("Laser", definition_from_entry(&catalog_entry, tx));

        let mut queue = DispatchQueue::new(8);
        queue.lookup_named(&registry, "Laser", "Alice", None);

        let mut scheduler = Scheduler::new();
        scheduler.tick(Instant::now(), &mut queue, &mut registry);

        assert_eq!(rx.try_recv().unwrap(), "Alice fired Laser!");
    }

    #[test]
    fn test_timed_entry_announces_start_and_end() {
        let (tx, mut rx) = mpsc::channel(8);
        let catalog_entry = CatalogEntry {
            variant: CatalogVariant::Timed,
            effect_secs: 30.0,
            announce: Some("{user} summoned the fog".to_string()),
            expire_announce: Some("the fog lifts".to_string()),
            ..entry("Fog")
        };

        let mut registry = EventRegistry::new();
        registry.register("Fog", definition_from_entry(&catalog_entry, tx));

        let mut queue = DispatchQueue::new(8);
        queue.lookup_named(&registry, "Fog", "Alice", None);

        let mut scheduler = Scheduler::new();
        let start = Instant::now();
        scheduler.tick(start, &mut queue, &mut registry);
        assert_eq!(rx.try_recv().unwrap(), "Alice summoned the fog");

        // Past the running period the cleanup callback announces the end
        scheduler.tick(start + Duration::from_secs(31), &mut queue, &mut registry);
        assert_eq!(rx.try_recv().unwrap(), "the fog lifts");
    }

    #[test]
    fn test_data_bound_entry_announces_viewer_text() {
        let (tx, mut rx) = mpsc::channel(8);
        let catalog_entry = CatalogEntry {
            variant: CatalogVariant::DataBound,
            announce: Some("{user} says: {text}".to_string()),
            ..entry("Broadcast")
        };

        let mut registry = EventRegistry::new();
        registry.register("Broadcast", definition_from_entry(&catalog_entry, tx));

        let mut queue = DispatchQueue::new(8);
        queue.lookup_named(&registry, "Broadcast", "Alice", Some("hi chat".to_string()));

        let mut scheduler = Scheduler::new();
        scheduler.tick(Instant::now(), &mut queue, &mut registry);

        assert_eq!(rx.try_recv().unwrap(), "Alice says: hi chat");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_data_bound_entry_without_payload_stays_silent() {
        let (tx, mut rx) = mpsc::channel(8);
        let catalog_entry = CatalogEntry {
            variant: CatalogVariant::DataBound,
            announce: Some("{user} says: {text}".to_string()),
            ..entry("Broadcast")
        };

        let mut registry = EventRegistry::new();
        registry.register("Broadcast", definition_from_entry(&catalog_entry, tx));

        let mut queue = DispatchQueue::new(8);
        queue.lookup_named(&registry, "Broadcast", "Alice", None);

        let mut scheduler = Scheduler::new();
        scheduler.tick(Instant::now(), &mut queue, &mut registry);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_full_reply_channel_does_not_panic() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut sink = ChannelSink { outbound: tx };
        sink.reply("first".to_string());
        sink.reply("second".to_string());

        assert_eq!(rx.try_recv().unwrap(), "first");
        assert!(rx.try_recv().is_err());
    }
}
