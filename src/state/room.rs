//! One actor per room.
//!
//! The actor owns the lobby and, once three humans are in, the game session.
//! Everything that touches room state arrives as a `RoomMessage`: client
//! actions, phase timers and replies from the non-human participant. Clients
//! learn about changes through a broadcast of `RoomEvent`s and fetch their
//! own filtered view afterwards.

use super::lobby::Lobby;
use super::registry::RoomRegistry;
use super::session::GameSession;
use super::visibility::{lobby_view, RoomView};
use crate::config::GameConfig;
use crate::error::{ActionError, JoinError};
use crate::participant::{interpret, MoveRequest, ParticipantBrain};
use crate::scheduler::{PhaseTimer, TimerKind};
use crate::types::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinSet;
use tokio::time::Instant;

const ROOM_CHANNEL_SIZE: usize = 64;
const EVENT_CHANNEL_SIZE: usize = 64;

/// Something a human seat asks the room to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeatAction {
    Describe(String),
    Chat(String),
    Vote(SeatId),
    Guess(SeatId),
    Advance,
}

impl SeatAction {
    fn rejected_in_lobby(&self) -> ActionError {
        let expected = match self {
            SeatAction::Describe(_) => GamePhase::Description,
            SeatAction::Chat(_) => GamePhase::Discussion,
            SeatAction::Vote(_) => GamePhase::Voting,
            SeatAction::Guess(_) => GamePhase::GuessPhase,
            SeatAction::Advance => return ActionError::CannotAdvance(GamePhase::Lobby),
        };
        ActionError::WrongPhase {
            expected,
            actual: GamePhase::Lobby,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// Room state changed; re-fetch views
    Updated { version: u64 },
    /// The room is gone for good
    Closed { reason: String },
}

/// Public summary of a room, safe to show to anyone with the code
#[derive(Debug, Clone, Serialize)]
pub struct RoomStatus {
    pub code: RoomCode,
    pub phase: GamePhase,
    pub players: Vec<String>,
    pub seats_needed: usize,
    pub cycle: Option<u32>,
}

#[derive(Debug)]
pub enum RoomMessage {
    Join {
        display_name: String,
        respond_to: oneshot::Sender<Result<SeatId, JoinError>>,
    },
    Leave {
        seat_id: SeatId,
    },
    Action {
        seat_id: SeatId,
        action: SeatAction,
        respond_to: oneshot::Sender<Result<(), ActionError>>,
    },
    GetView {
        seat_id: SeatId,
        respond_to: oneshot::Sender<Result<RoomView, ActionError>>,
    },
    GetStatus {
        respond_to: oneshot::Sender<RoomStatus>,
    },
    ParticipantReply {
        request_id: RequestId,
        mv: Option<ParticipantMove>,
    },
    TimerFired {
        kind: TimerKind,
        cycle: u32,
    },
}

impl RoomMessage {
    /// Messages that count as human activity for the idle timeout
    fn is_activity(&self) -> bool {
        matches!(
            self,
            RoomMessage::Join { .. } | RoomMessage::Leave { .. } | RoomMessage::Action { .. }
        )
    }
}

enum RoomState {
    Lobby(Lobby),
    Playing(GameSession),
}

struct RoomActor {
    code: RoomCode,
    receiver: mpsc::Receiver<RoomMessage>,
    self_sender: mpsc::Sender<RoomMessage>,
    events: broadcast::Sender<RoomEvent>,
    config: Arc<GameConfig>,
    brain: Arc<dyn ParticipantBrain>,
    state: RoomState,
    lobby_version: u64,
    last_published: u64,
    /// Humans currently seated
    present: BTreeSet<SeatId>,
    timer: PhaseTimer,
    participant_tasks: JoinSet<()>,
}

/// Ask the participant for a move in the background and report back
fn spawn_participant_move(
    tasks: &mut JoinSet<()>,
    brain: Arc<dyn ParticipantBrain>,
    sender: mpsc::Sender<RoomMessage>,
    timeout: Duration,
    request: MoveRequest,
) {
    let MoveRequest {
        request_id,
        context,
    } = request;
    tracing::debug!(request.id = request_id, kind = ?context.kind, "Requesting participant move");

    tasks.spawn(async move {
        let mv = match tokio::time::timeout(timeout, brain.request_move(&context)).await {
            Ok(Ok(text)) => {
                let mv = interpret(&context, &text);
                if mv.is_none() {
                    tracing::warn!(request.id = request_id, "Participant reply unusable: {:?}", text);
                }
                mv
            }
            Ok(Err(e)) => {
                tracing::warn!(request.id = request_id, error = %e, "Participant request failed");
                None
            }
            Err(_) => {
                tracing::warn!(request.id = request_id, "Participant request timed out after {:?}", timeout);
                None
            }
        };

        if sender
            .send(RoomMessage::ParticipantReply { request_id, mv })
            .await
            .is_err()
        {
            tracing::debug!(request.id = request_id, "Room gone, dropping participant reply");
        }
    });
}

impl RoomActor {
    fn state_version(&self) -> u64 {
        match &self.state {
            RoomState::Lobby(_) => self.lobby_version,
            RoomState::Playing(session) => self.lobby_version + session.version(),
        }
    }

    fn close(&self, reason: &str) {
        tracing::info!(reason, "Closing room");
        let _ = self.events.send(RoomEvent::Closed {
            reason: reason.to_string(),
        });
    }

    /// Returns true when the actor should stop
    fn handle_message(&mut self, msg: RoomMessage) -> bool {
        let mut shutdown = false;
        match msg {
            RoomMessage::Join {
                display_name,
                respond_to,
            } => {
                let result = self.handle_join(&display_name);
                let _ = respond_to.send(result);
            }
            RoomMessage::Leave { seat_id } => {
                shutdown = self.handle_leave(&seat_id);
            }
            RoomMessage::Action {
                seat_id,
                action,
                respond_to,
            } => {
                let result = self.handle_action(&seat_id, action);
                if let Err(e) = &result {
                    tracing::debug!(seat.id = %seat_id, error = %e, "Action rejected");
                }
                let _ = respond_to.send(result);
            }
            RoomMessage::GetView {
                seat_id,
                respond_to,
            } => {
                let _ = respond_to.send(self.view(&seat_id));
            }
            RoomMessage::GetStatus { respond_to } => {
                let _ = respond_to.send(self.status());
            }
            RoomMessage::ParticipantReply { request_id, mv } => {
                if let RoomState::Playing(session) = &mut self.state {
                    if let Err(e) = session.apply_participant_move(request_id, mv) {
                        tracing::debug!(request.id = request_id, error = %e, "Discarding participant reply");
                    }
                }
            }
            RoomMessage::TimerFired { kind, cycle } => {
                if let RoomState::Playing(session) = &mut self.state {
                    let applied = match kind {
                        TimerKind::Discussion => session.expire_discussion(cycle),
                        TimerKind::Results => session.expire_results(cycle),
                    };
                    tracing::debug!(?kind, cycle, applied, "Phase timer fired");
                }
            }
        }

        if !shutdown {
            self.after_change();
        }
        shutdown
    }

    fn handle_join(&mut self, display_name: &str) -> Result<SeatId, JoinError> {
        let lobby = match &mut self.state {
            RoomState::Lobby(lobby) => lobby,
            RoomState::Playing(_) => return Err(JoinError::GameInProgress),
        };
        let seat_id = lobby.join(display_name)?;
        self.lobby_version += 1;
        self.present.insert(seat_id.clone());
        tracing::info!(seat.id = %seat_id, name = %display_name.trim(), "Player joined");

        if lobby.is_full() {
            let rng = StdRng::from_rng(&mut rand::rng());
            match GameSession::new(self.code.clone(), lobby.members().to_vec(), &self.config, rng) {
                Ok(session) => {
                    tracing::info!("Lobby full, game started");
                    self.state = RoomState::Playing(session);
                }
                Err(e) => tracing::error!(error = %e, "Failed to start game"),
            }
        }
        Ok(seat_id)
    }

    fn handle_leave(&mut self, seat_id: &SeatId) -> bool {
        if !self.present.remove(seat_id) {
            return false;
        }
        let session = match &mut self.state {
            RoomState::Lobby(lobby) => {
                lobby.leave(seat_id);
                self.lobby_version += 1;
                tracing::info!(seat.id = %seat_id, "Player left the lobby");
                if !lobby.is_empty() {
                    return false;
                }
                self.close("All players have left");
                return true;
            }
            RoomState::Playing(session) => &*session,
        };

        if session.is_finished() {
            if !self.present.is_empty() {
                return false;
            }
            self.close("All players have left");
            return true;
        }

        let name = session
            .seat(seat_id)
            .map(|s| s.display_name.clone())
            .unwrap_or_default();
        self.close(&format!("{} left the game", name));
        true
    }

    fn handle_action(&mut self, seat_id: &SeatId, action: SeatAction) -> Result<(), ActionError> {
        if !self.present.contains(seat_id) {
            return Err(ActionError::UnknownSeat);
        }
        let session = match &mut self.state {
            RoomState::Lobby(_) => return Err(action.rejected_in_lobby()),
            RoomState::Playing(session) => session,
        };
        match action {
            SeatAction::Describe(text) => session.submit_description(seat_id, &text),
            SeatAction::Chat(text) => session.submit_discussion_message(seat_id, &text),
            SeatAction::Vote(target) => session.submit_vote(seat_id, &target),
            SeatAction::Guess(target) => session.submit_guess(seat_id, &target),
            SeatAction::Advance => session.advance_phase().map(|phase| {
                tracing::info!(seat.id = %seat_id, ?phase, "Phase advanced by player");
            }),
        }
    }

    fn view(&self, seat_id: &SeatId) -> Result<RoomView, ActionError> {
        match &self.state {
            RoomState::Lobby(lobby) if lobby.contains(seat_id) => {
                Ok(RoomView::Lobby(lobby_view(&self.code, lobby)))
            }
            RoomState::Lobby(_) => Err(ActionError::UnknownSeat),
            RoomState::Playing(session) => session.view_for(seat_id).map(RoomView::Game),
        }
    }

    fn status(&self) -> RoomStatus {
        match &self.state {
            RoomState::Lobby(lobby) => {
                let view = lobby_view(&self.code, lobby);
                RoomStatus {
                    code: self.code.clone(),
                    phase: GamePhase::Lobby,
                    players: view.members.into_iter().map(|m| m.display_name).collect(),
                    seats_needed: view.seats_needed,
                    cycle: None,
                }
            }
            RoomState::Playing(session) => RoomStatus {
                code: self.code.clone(),
                phase: session.phase(),
                players: session
                    .seats()
                    .iter()
                    .map(|s| s.display_name.clone())
                    .collect(),
                seats_needed: 0,
                cycle: Some(session.cycle()),
            },
        }
    }

    /// Keep timers and participant requests in step with the session, then
    /// tell subscribers if anything changed
    fn after_change(&mut self) {
        if let RoomState::Playing(session) = &mut self.state {
            let cycle = session.cycle();
            let wanted = match session.phase() {
                GamePhase::Discussion => Some((TimerKind::Discussion, self.config.discussion_duration)),
                GamePhase::Results => self
                    .config
                    .results_duration
                    .map(|after| (TimerKind::Results, after)),
                _ => None,
            };
            match wanted {
                Some((kind, after)) => {
                    if !self.timer.is_armed_for(kind, cycle) {
                        self.timer.arm(
                            kind,
                            cycle,
                            after,
                            self.self_sender.clone(),
                            RoomMessage::TimerFired { kind, cycle },
                        );
                    }
                }
                None => self.timer.cancel(),
            }

            while let Some(request) = session.next_move_request() {
                spawn_participant_move(
                    &mut self.participant_tasks,
                    self.brain.clone(),
                    self.self_sender.clone(),
                    self.config.participant_timeout,
                    request,
                );
            }
        }

        let version = self.state_version();
        if version != self.last_published {
            self.last_published = version;
            // No subscribers is fine
            let _ = self.events.send(RoomEvent::Updated { version });
        }
    }
}

#[tracing::instrument(skip(actor, registry), fields(room.code = %actor.code))]
async fn run_room_actor(mut actor: RoomActor, registry: RoomRegistry) {
    tracing::info!("Room actor started");

    let idle_timeout = actor.config.room_idle_timeout;
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            maybe_msg = actor.receiver.recv() => {
                match maybe_msg {
                    Some(msg) => {
                        if msg.is_activity() {
                            last_activity = Instant::now();
                        }
                        if actor.handle_message(msg) {
                            break;
                        }
                    }
                    None => {
                        tracing::info!("Room channel closed. Shutting down");
                        break;
                    }
                }
            }
            Some(joined) = actor.participant_tasks.join_next() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Participant task failed");
                }
            }
            _ = tokio::time::sleep_until(last_activity + idle_timeout) => {
                actor.close("Room closed after inactivity");
                break;
            }
        }
    }

    tracing::info!("Room actor stopping");
    registry.remove(&actor.code).await;
    actor.timer.cancel();
    actor.participant_tasks.abort_all();
}

/// Cheap, cloneable entry point into a room actor
#[derive(Clone, Debug)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomMessage>,
    events: broadcast::Sender<RoomEvent>,
    code: RoomCode,
}

impl RoomHandle {
    pub fn spawn(
        code: RoomCode,
        config: Arc<GameConfig>,
        brain: Arc<dyn ParticipantBrain>,
        registry: RoomRegistry,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(ROOM_CHANNEL_SIZE);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let actor = RoomActor {
            code: code.clone(),
            receiver,
            self_sender: sender.clone(),
            events: events.clone(),
            config,
            brain,
            state: RoomState::Lobby(Lobby::new()),
            lobby_version: 1,
            last_published: 0,
            present: BTreeSet::new(),
            timer: PhaseTimer::new(),
            participant_tasks: JoinSet::new(),
        };
        tokio::spawn(run_room_actor(actor, registry));

        Self {
            sender,
            events,
            code,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    pub async fn join(&self, display_name: String) -> Result<SeatId, JoinError> {
        let (respond_to, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::Join {
                display_name,
                respond_to,
            })
            .await
            .map_err(|_| JoinError::RoomNotFound)?;
        rx.await.map_err(|_| JoinError::RoomNotFound)?
    }

    pub async fn leave(&self, seat_id: SeatId) {
        if self
            .sender
            .send(RoomMessage::Leave { seat_id })
            .await
            .is_err()
        {
            tracing::debug!(room.code = %self.code, "Leave sent to stopped room");
        }
    }

    pub async fn act(&self, seat_id: SeatId, action: SeatAction) -> Result<(), ActionError> {
        let (respond_to, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::Action {
                seat_id,
                action,
                respond_to,
            })
            .await
            .map_err(|_| ActionError::RoomClosed)?;
        rx.await.map_err(|_| ActionError::RoomClosed)?
    }

    pub async fn view(&self, seat_id: SeatId) -> Result<RoomView, ActionError> {
        let (respond_to, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::GetView {
                seat_id,
                respond_to,
            })
            .await
            .map_err(|_| ActionError::RoomClosed)?;
        rx.await.map_err(|_| ActionError::RoomClosed)?
    }

    pub async fn status(&self) -> Option<RoomStatus> {
        let (respond_to, rx) = oneshot::channel();
        self.sender
            .send(RoomMessage::GetStatus { respond_to })
            .await
            .ok()?;
        rx.await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::OfflineParticipant;

    fn registry_with(config: GameConfig) -> RoomRegistry {
        RoomRegistry::new(Arc::new(config), Arc::new(OfflineParticipant))
    }

    async fn fill(room: &RoomHandle) -> Vec<SeatId> {
        let mut seats = Vec::new();
        for name in ["Alice", "Bob", "Carol"] {
            seats.push(room.join(name.to_string()).await.unwrap());
        }
        seats
    }

    #[tokio::test]
    async fn test_third_join_starts_game() {
        let registry = registry_with(GameConfig::default());
        let room = registry.create_room().await;
        let alice = room.join("Alice".to_string()).await.unwrap();

        match room.view(alice.clone()).await.unwrap() {
            RoomView::Lobby(lobby) => assert_eq!(lobby.seats_needed, 2),
            RoomView::Game(_) => panic!("game started too early"),
        }

        room.join("Bob".to_string()).await.unwrap();
        room.join("Carol".to_string()).await.unwrap();

        match room.view(alice).await.unwrap() {
            RoomView::Game(view) => {
                assert_eq!(view.phase, GamePhase::Description);
                assert_eq!(view.seats.len(), 4);
            }
            RoomView::Lobby(_) => panic!("game did not start"),
        }
        assert_eq!(
            room.join("Dave".to_string()).await.unwrap_err(),
            JoinError::GameInProgress
        );
    }

    #[tokio::test]
    async fn test_lobby_rejections() {
        let registry = registry_with(GameConfig::default());
        let room = registry.create_room().await;
        let alice = room.join("Alice".to_string()).await.unwrap();

        assert_eq!(
            room.join("ALICE".to_string()).await.unwrap_err(),
            JoinError::DuplicateName
        );
        assert_eq!(
            room.act(alice.clone(), SeatAction::Advance).await.unwrap_err(),
            ActionError::CannotAdvance(GamePhase::Lobby)
        );
        assert!(matches!(
            room.act(alice, SeatAction::Chat("hi".into())).await,
            Err(ActionError::WrongPhase { .. })
        ));
        assert_eq!(
            room.act("stranger".into(), SeatAction::Advance).await.unwrap_err(),
            ActionError::UnknownSeat
        );
    }

    #[tokio::test]
    async fn test_lobby_leave_frees_seat() {
        let registry = registry_with(GameConfig::default());
        let room = registry.create_room().await;
        let alice = room.join("Alice".to_string()).await.unwrap();
        room.join("Bob".to_string()).await.unwrap();
        room.leave(alice.clone()).await;

        let status = room.status().await.unwrap();
        assert_eq!(status.players, vec!["Bob".to_string()]);
        assert_eq!(status.seats_needed, 2);
        assert_eq!(room.view(alice).await.unwrap_err(), ActionError::UnknownSeat);
    }

    #[tokio::test]
    async fn test_empty_lobby_is_torn_down() {
        let registry = registry_with(GameConfig::default());
        let room = registry.create_room().await;
        let mut events = room.subscribe();
        let alice = room.join("Alice".to_string()).await.unwrap();
        room.leave(alice).await;

        loop {
            match events.recv().await.unwrap() {
                RoomEvent::Closed { reason } => {
                    assert_eq!(reason, "All players have left");
                    break;
                }
                RoomEvent::Updated { .. } => continue,
            }
        }
        for _ in 0..50 {
            if registry.room_count().await == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(registry.room_count().await, 0);
        assert!(room.status().await.is_none());
        assert!(registry.get(room.code()).await.is_none());
    }

    #[tokio::test]
    async fn test_leaving_mid_game_closes_room() {
        let registry = registry_with(GameConfig::default());
        let room = registry.create_room().await;
        let seats = fill(&room).await;
        let mut events = room.subscribe();

        room.leave(seats[1].clone()).await;

        loop {
            match events.recv().await.unwrap() {
                RoomEvent::Closed { reason } => {
                    assert_eq!(reason, "Bob left the game");
                    break;
                }
                RoomEvent::Updated { .. } => continue,
            }
        }
        assert_eq!(
            room.act(seats[0].clone(), SeatAction::Advance).await.unwrap_err(),
            ActionError::RoomClosed
        );

        // The actor deregisters itself on the way out
        for _ in 0..50 {
            if registry.room_count().await == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_room_shuts_down() {
        let config = GameConfig {
            room_idle_timeout: Duration::from_secs(60),
            ..GameConfig::default()
        };
        let registry = registry_with(config);
        let room = registry.create_room().await;
        let mut events = room.subscribe();

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(
            events.recv().await.unwrap(),
            RoomEvent::Closed {
                reason: "Room closed after inactivity".to_string()
            }
        );
        assert!(room.status().await.is_none());
    }

    #[test]
    fn test_lobby_rejection_codes() {
        assert_eq!(
            SeatAction::Vote("x".into()).rejected_in_lobby(),
            ActionError::WrongPhase {
                expected: GamePhase::Voting,
                actual: GamePhase::Lobby
            }
        );
    }
}
