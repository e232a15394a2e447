//! The pump task: the only place the engine is mutated while serving

use crate::game::{AdminCommand, Engine, FeedbackRequest, FeedbackResponse, GameOptions, Outbound};
use crate::server::messages::Inbound;
use crate::{Result, SimError};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// Default a suspended choice after this long; None waits forever
    pub feedback_timeout: Option<Duration>,
    /// Outbound events buffered per subscriber
    pub broadcast_capacity: usize,
}

impl PumpConfig {
    /// Pump settings carried in the game options
    pub fn from_options(options: &GameOptions) -> Self {
        PumpConfig {
            feedback_timeout: options.feedback_timeout_ms.map(Duration::from_millis),
            ..PumpConfig::default()
        }
    }
}

impl Default for PumpConfig {
    fn default() -> Self {
        PumpConfig {
            feedback_timeout: None,
            broadcast_capacity: 1024,
        }
    }
}

/// Cloneable handle connections use to talk to the pump
#[derive(Clone)]
pub struct ServerHandle {
    inbound: mpsc::UnboundedSender<Inbound>,
    events: broadcast::Sender<Outbound>,
    engine: Arc<Mutex<Engine>>,
}

impl ServerHandle {
    pub fn send(&self, message: Inbound) -> Result<()> {
        self.inbound
            .send(message)
            .map_err(|_| SimError::InvalidAction("the server has stopped".into()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.events.subscribe()
    }

    /// Shared engine, for read-only inspection between actions
    pub fn engine(&self) -> Arc<Mutex<Engine>> {
        Arc::clone(&self.engine)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(Inbound::Shutdown)
    }
}

/// Start the pump on the current tokio runtime
///
/// Subscribe through the returned handle before sending anything to be sure
/// no event is missed. The task ends on [`Inbound::Shutdown`] or when every
/// handle is dropped.
pub fn spawn(engine: Engine, config: PumpConfig) -> (ServerHandle, JoinHandle<Result<()>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (events, _) = broadcast::channel(config.broadcast_capacity.max(1));
    let engine = Arc::new(Mutex::new(engine));
    let handle = ServerHandle {
        inbound: tx,
        events: events.clone(),
        engine: Arc::clone(&engine),
    };
    let task = tokio::spawn(run_pump(engine, rx, events, config));
    (handle, task)
}

/// Pending feedback with the instant it defaults
struct Wait {
    request: FeedbackRequest,
    deadline: Option<Instant>,
}

async fn run_pump(
    engine: Arc<Mutex<Engine>>,
    mut rx: mpsc::UnboundedReceiver<Inbound>,
    events: broadcast::Sender<Outbound>,
    config: PumpConfig,
) -> Result<()> {
    let mut deferred: VecDeque<Inbound> = VecDeque::new();
    let mut wait: Option<Wait> = None;
    publish(&mut *engine.lock().await, &events);

    loop {
        let awaiting = engine.lock().await.awaiting().cloned();
        wait = match (awaiting, wait.take()) {
            (Some(request), Some(w)) if w.request.token == request.token => Some(w),
            (Some(request), _) => Some(Wait {
                deadline: config.feedback_timeout.map(|d| Instant::now() + d),
                request,
            }),
            (None, _) => None,
        };

        let message = match &wait {
            Some(w) => {
                if let Some(pos) = deferred.iter().position(|m| m.settles(&w.request)) {
                    deferred.remove(pos)
                } else {
                    let next = match w.deadline {
                        Some(deadline) => tokio::time::timeout_at(deadline, rx.recv()).await.ok(),
                        None => Some(rx.recv().await),
                    };
                    match next {
                        // Timed out: the addressee gets the default
                        None => Some(Inbound::Feedback {
                            player: w.request.player,
                            response: FeedbackResponse {
                                token: w.request.token,
                                choice: w.request.kind.default_choice(),
                            },
                        }),
                        Some(None) => None,
                        Some(Some(m)) if m.settles(&w.request) => Some(m),
                        Some(Some(m)) => {
                            deferred.push_back(m);
                            continue;
                        }
                    }
                }
            }
            None => match deferred.pop_front() {
                Some(m) => Some(m),
                None => rx.recv().await,
            },
        };

        let Some(message) = message else {
            break;
        };
        if message == Inbound::Shutdown {
            break;
        }
        let mut guard = engine.lock().await;
        dispatch(&mut guard, message)?;
        publish(&mut guard, &events);
    }
    Ok(())
}

/// Run one message to completion
///
/// Internal errors are reported and the phase is forced on, so one broken
/// resolution cannot wedge the game.
fn dispatch(engine: &mut Engine, message: Inbound) -> Result<()> {
    let result = match message {
        Inbound::Action { player, action } => engine.handle_action(player, action).map(|_| ()),
        Inbound::Feedback { player, response } => engine.resume_feedback(player, response).map(|_| ()),
        Inbound::Connect(player) => engine.player_connected(player),
        Inbound::Disconnect(player) => engine.player_disconnected(player).map(|_| ()),
        Inbound::Admin(command) => engine.admin(command).map(|_| ()),
        Inbound::Shutdown => Ok(()),
    };
    if let Err(e) = result {
        engine
            .state
            .logger
            .minimal(&format!("Error in {}: {}; forcing the phase on", engine.phase(), e));
        engine.admin(AdminCommand::ForceAdvancePhase)?;
    }
    Ok(())
}

fn publish(engine: &mut Engine, events: &broadcast::Sender<Outbound>) {
    for event in engine.drain_outbox() {
        // No subscribers is not an error
        let _ = events.send(event);
    }
}
