//! The action engine: the entry point the transport layer drives.
//!
//! Wraps every session operation and owns the background job queue. Action
//! resolution and NPC turns run as spawned tasks, one per job; an NPC turn
//! that hands over to another NPC enqueues a new job instead of recursing.
//!
//! A resolution job that never gets to run, because its session was
//! cancelled or the engine stopped taking work, settles its action as
//! failed so the actor is not left with an action in flight.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gamemaster_combat::application::command_handlers::{
    self as combat_handlers, CombatStarted,
};
use gamemaster_combat::application::query_handlers as combat_queries;
use gamemaster_combat::domain::commands::{InitiateCombat, ResolveCombatEnd};
use gamemaster_combat::domain::encounter::Encounter;
use gamemaster_combat::domain::events::CombatEndResult;
use gamemaster_core::broadcast::BroadcastPublisher;
use gamemaster_core::clock::SharedClock;
use gamemaster_core::directory::CampaignDirectory;
use gamemaster_core::error::DomainError;
use gamemaster_core::narrator::Narrator;
use gamemaster_core::rng::SharedRng;
use gamemaster_core::state::StateStore;
use gamemaster_core::turn_taker::TurnTaker;
use gamemaster_live_state::application::command_handlers as live_handlers;
use gamemaster_live_state::application::query_handlers as live_queries;
use gamemaster_live_state::domain::commands::ResolveDeathSave;
use gamemaster_live_state::domain::death::DeathSaveResult;
use gamemaster_live_state::domain::events::LiveStateView;
use gamemaster_session::application::command_handlers as session_handlers;
use gamemaster_session::application::query_handlers as session_queries;
use gamemaster_session::domain::commands::{ChangePhase, EndTurn, ReorderTurns};
use gamemaster_session::domain::game_state::GameState;
use gamemaster_session::domain::phase::GamePhase;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::{command_handlers, query_handlers};
use crate::domain::commands::{ExecuteEnemyTurn, ResolveAction, SubmitAction};
use crate::domain::pending_action::PendingAction;

/// Collaborators the engine runs against.
#[derive(Clone)]
pub struct EngineDeps {
    /// Row-locking state persistence.
    pub store: Arc<dyn StateStore>,
    /// Read-only campaign data.
    pub directory: Arc<dyn CampaignDirectory>,
    /// The narration service.
    pub narrator: Arc<dyn Narrator>,
    /// The broadcast gateway.
    pub publisher: Arc<dyn BroadcastPublisher>,
    /// Time source.
    pub clock: SharedClock,
    /// Dice.
    pub rng: SharedRng,
}

/// Background work.
#[derive(Debug, Clone)]
pub enum EngineJob {
    /// Narrate and apply a pending action.
    ResolveAction(ResolveAction),
    /// Run an NPC turn.
    EnemyTurn(ExecuteEnemyTurn),
}

impl EngineJob {
    fn session_id(&self) -> Uuid {
        match self {
            Self::ResolveAction(c) => c.session_id,
            Self::EnemyTurn(c) => c.session_id,
        }
    }
}

/// Cancellation and running-job count of one session. Idle sessions are
/// forgotten; cancelled ones are kept so later jobs are still dropped.
struct SessionJobs {
    token: CancellationToken,
    running: usize,
}

struct EngineInner {
    deps: EngineDeps,
    jobs: mpsc::UnboundedSender<EngineJob>,
    sessions: Mutex<HashMap<Uuid, SessionJobs>>,
    shutdown: CancellationToken,
}

/// Session orchestration with non-blocking action resolution.
#[derive(Clone)]
pub struct ActionEngine {
    inner: Arc<EngineInner>,
}

impl ActionEngine {
    /// Creates the engine and spawns its job worker on the current Tokio
    /// runtime.
    #[must_use]
    pub fn start(deps: EngineDeps) -> Self {
        let (jobs, receiver) = mpsc::unbounded_channel();
        let engine = Self {
            inner: Arc::new(EngineInner {
                deps,
                jobs,
                sessions: Mutex::new(HashMap::new()),
                shutdown: CancellationToken::new(),
            }),
        };
        tokio::spawn(engine.clone().run(receiver));
        engine
    }

    async fn run(self, mut receiver: mpsc::UnboundedReceiver<EngineJob>) {
        info!("action engine started");
        loop {
            tokio::select! {
                () = self.inner.shutdown.cancelled() => break,
                job = receiver.recv() => match job {
                    Some(job) => {
                        let engine = self.clone();
                        tokio::spawn(async move { engine.run_job(job).await });
                    }
                    None => break,
                },
            }
        }
        info!("action engine stopped");
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, SessionJobs>> {
        self.inner
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn session_jobs<'a>(
        &self,
        sessions: &'a mut HashMap<Uuid, SessionJobs>,
        session_id: Uuid,
    ) -> &'a mut SessionJobs {
        sessions.entry(session_id).or_insert_with(|| SessionJobs {
            token: self.inner.shutdown.child_token(),
            running: 0,
        })
    }

    fn begin_job(&self, session_id: Uuid) -> CancellationToken {
        let mut sessions = self.sessions();
        let jobs = self.session_jobs(&mut sessions, session_id);
        jobs.running += 1;
        jobs.token.clone()
    }

    fn end_job(&self, session_id: Uuid) {
        let mut sessions = self.sessions();
        let idle = sessions.get_mut(&session_id).is_some_and(|jobs| {
            jobs.running = jobs.running.saturating_sub(1);
            jobs.running == 0 && !jobs.token.is_cancelled()
        });
        if idle {
            sessions.remove(&session_id);
        }
    }

    fn is_cancelled(&self, session_id: Uuid) -> bool {
        self.inner.shutdown.is_cancelled()
            || self
                .sessions()
                .get(&session_id)
                .is_some_and(|jobs| jobs.token.is_cancelled())
    }

    async fn run_job(&self, job: EngineJob) {
        let session_id = job.session_id();
        let token = self.begin_job(session_id);
        let finished = if token.is_cancelled() {
            warn!(%session_id, "session cancelled; job dropped");
            false
        } else {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    warn!(%session_id, "session cancelled; in-flight job abandoned");
                    false
                }
                () = self.execute(&job) => true,
            }
        };
        if !finished && let EngineJob::ResolveAction(command) = &job {
            if self.inner.shutdown.is_cancelled() {
                info!(
                    %session_id,
                    action_id = %command.action_id,
                    "engine stopping; action left pending for recovery"
                );
            } else {
                self.abandon(command, "session cancelled").await;
            }
        }
        self.end_job(session_id);
    }

    async fn abandon(&self, command: &ResolveAction, reason: &str) {
        let deps = &self.inner.deps;
        if let Err(e) = command_handlers::handle_abandon_action(
            command,
            reason,
            &*deps.clock,
            &*deps.store,
            &*deps.publisher,
        )
        .await
        {
            error!(
                session_id = %command.session_id,
                action_id = %command.action_id,
                error = %e,
                "could not mark abandoned action failed"
            );
        }
    }

    async fn execute(&self, job: &EngineJob) {
        let deps = &self.inner.deps;
        match job {
            EngineJob::ResolveAction(command) => {
                if let Err(e) = command_handlers::handle_resolve_action(
                    command,
                    &*deps.clock,
                    &*deps.store,
                    &*deps.directory,
                    &*deps.narrator,
                    &*deps.publisher,
                )
                .await
                {
                    error!(
                        session_id = %command.session_id,
                        action_id = %command.action_id,
                        error = %e,
                        "action resolution failed"
                    );
                }
            }
            EngineJob::EnemyTurn(command) => {
                match command_handlers::handle_execute_enemy_turn(
                    command,
                    &*deps.clock,
                    &*deps.store,
                    &*deps.directory,
                    &*deps.narrator,
                    &*deps.publisher,
                )
                .await
                {
                    Ok(Some(state)) => {
                        self.schedule_if_npc_turn(&state);
                    }
                    Ok(None) => {}
                    Err(e) => error!(
                        session_id = %command.session_id,
                        participant_id = %command.participant_id,
                        error = %e,
                        "enemy turn failed"
                    ),
                }
            }
        }
    }

    fn enqueue(&self, job: EngineJob) -> bool {
        if self.inner.shutdown.is_cancelled() {
            warn!(session_id = %job.session_id(), "action engine stopped; job not queued");
            return false;
        }
        match self.inner.jobs.send(job) {
            Ok(()) => true,
            Err(e) => {
                warn!(session_id = %e.0.session_id(), "action engine stopped; job not queued");
                false
            }
        }
    }

    /// Queues an NPC turn if `state` has an NPC up in combat. Returns
    /// `true` if a job was queued.
    ///
    /// Nothing is queued for a cancelled session, or when no player is left
    /// in the turn order, which would otherwise chain forever.
    pub fn schedule_if_npc_turn(&self, state: &GameState) -> bool {
        if state.phase != GamePhase::Combat {
            return false;
        }
        let (Some(TurnTaker::Npc { participant_id }), Some(encounter_id)) =
            (state.active_turn_taker, state.active_encounter_id)
        else {
            return false;
        };
        if !state.has_player_turns() {
            warn!(
                session_id = %state.session_id,
                "no player turn-takers remain; enemy turn chain stopped"
            );
            return false;
        }
        if self.is_cancelled(state.session_id) {
            return false;
        }
        self.enqueue(EngineJob::EnemyTurn(ExecuteEnemyTurn {
            correlation_id: Uuid::new_v4(),
            session_id: state.session_id,
            encounter_id,
            participant_id,
        }))
    }

    /// Stops queued and chained jobs of a session. In-flight jobs are
    /// abandoned; their uncommitted transactions roll back and their
    /// actions settle as failed.
    pub fn cancel_session(&self, session_id: Uuid) {
        let mut sessions = self.sessions();
        self.session_jobs(&mut sessions, session_id).token.cancel();
        drop(sessions);
        info!(%session_id, "session jobs cancelled");
    }

    /// Queues resolution of every action a previous process left pending.
    /// Call once, right after [`ActionEngine::start`]. Returns the number of
    /// actions queued.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the pending actions cannot
    /// be read.
    pub async fn recover_pending(&self) -> Result<usize, DomainError> {
        let mut queued = 0;
        for action in query_handlers::list_unsettled_actions(&*self.inner.deps.store).await? {
            let command = ResolveAction {
                correlation_id: Uuid::new_v4(),
                session_id: action.session_id,
                action_id: action.action_id,
            };
            if self.enqueue(EngineJob::ResolveAction(command.clone())) {
                queued += 1;
            } else {
                self.abandon(&command, "action engine stopped").await;
            }
        }
        info!(queued, "pending actions recovered");
        Ok(queued)
    }

    /// Stops the worker and every session's jobs.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
    }

    /// Records a declared action and queues its resolution. Returns before
    /// the narrator is called. If the engine no longer takes work, the
    /// action comes back already failed.
    ///
    /// # Errors
    ///
    /// See [`command_handlers::handle_submit_action`].
    pub async fn submit_action(&self, command: &SubmitAction) -> Result<PendingAction, DomainError> {
        let deps = &self.inner.deps;
        let action = command_handlers::handle_submit_action(
            command,
            &*deps.clock,
            &*deps.store,
            &*deps.directory,
        )
        .await?;
        let resolve = ResolveAction {
            correlation_id: command.correlation_id,
            session_id: command.session_id,
            action_id: action.action_id,
        };
        if self.enqueue(EngineJob::ResolveAction(resolve.clone())) {
            return Ok(action);
        }
        let failed = command_handlers::handle_abandon_action(
            &resolve,
            "action engine stopped",
            &*deps.clock,
            &*deps.store,
            &*deps.publisher,
        )
        .await?;
        Ok(failed.unwrap_or(action))
    }

    /// Ends the active turn, then starts the NPC turn chain if an NPC is
    /// up.
    ///
    /// # Errors
    ///
    /// See [`session_handlers::handle_end_turn`].
    pub async fn end_turn(&self, command: &EndTurn) -> Result<GameState, DomainError> {
        let deps = &self.inner.deps;
        let state = session_handlers::handle_end_turn(
            command,
            &*deps.clock,
            &*deps.store,
            &*deps.directory,
            &*deps.publisher,
        )
        .await?;
        self.schedule_if_npc_turn(&state);
        Ok(state)
    }

    /// Changes the session phase.
    ///
    /// # Errors
    ///
    /// See [`session_handlers::handle_change_phase`].
    pub async fn change_phase(&self, command: &ChangePhase) -> Result<GameState, DomainError> {
        let deps = &self.inner.deps;
        let state = session_handlers::handle_change_phase(
            command,
            &*deps.clock,
            &*deps.store,
            &*deps.directory,
            &*deps.publisher,
        )
        .await?;
        self.schedule_if_npc_turn(&state);
        Ok(state)
    }

    /// Reorders the turn order; an NPC moved into the active slot acts.
    ///
    /// # Errors
    ///
    /// See [`session_handlers::handle_reorder_turns`].
    pub async fn reorder_turns(&self, command: &ReorderTurns) -> Result<GameState, DomainError> {
        let deps = &self.inner.deps;
        let state = session_handlers::handle_reorder_turns(
            command,
            &*deps.clock,
            &*deps.store,
            &*deps.directory,
            &*deps.publisher,
        )
        .await?;
        self.schedule_if_npc_turn(&state);
        Ok(state)
    }

    /// Starts combat; an NPC that wins initiative acts right away.
    ///
    /// # Errors
    ///
    /// See [`combat_handlers::handle_initiate_combat`].
    pub async fn initiate_combat(
        &self,
        command: &InitiateCombat,
    ) -> Result<CombatStarted, DomainError> {
        let deps = &self.inner.deps;
        let started = combat_handlers::handle_initiate_combat(
            command,
            &*deps.clock,
            &*deps.rng,
            &*deps.store,
            &*deps.directory,
            &*deps.publisher,
        )
        .await?;
        self.schedule_if_npc_turn(&started.game_state);
        Ok(started)
    }

    /// Resolves combat and awards experience.
    ///
    /// # Errors
    ///
    /// See [`combat_handlers::handle_resolve_combat_end`].
    pub async fn resolve_combat_end(
        &self,
        command: &ResolveCombatEnd,
    ) -> Result<CombatEndResult, DomainError> {
        let deps = &self.inner.deps;
        combat_handlers::handle_resolve_combat_end(
            command,
            &*deps.clock,
            &*deps.store,
            &*deps.directory,
            &*deps.publisher,
        )
        .await
    }

    /// Rolls a death saving throw.
    ///
    /// # Errors
    ///
    /// See [`live_handlers::handle_resolve_death_save`].
    pub async fn resolve_death_save(
        &self,
        command: &ResolveDeathSave,
    ) -> Result<DeathSaveResult, DomainError> {
        let deps = &self.inner.deps;
        live_handlers::handle_resolve_death_save(
            command,
            &*deps.clock,
            &*deps.rng,
            &*deps.store,
            &*deps.directory,
            &*deps.publisher,
        )
        .await
    }

    /// The session's game state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for an unknown session.
    pub async fn game_state(&self, session_id: Uuid) -> Result<GameState, DomainError> {
        let deps = &self.inner.deps;
        session_queries::get_game_state(session_id, &*deps.clock, &*deps.store, &*deps.directory)
            .await
    }

    /// Live states of the session's characters.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the rows cannot be read.
    pub async fn live_states(&self, session_id: Uuid) -> Result<Vec<LiveStateView>, DomainError> {
        live_queries::get_live_states(session_id, &*self.inner.deps.store).await
    }

    /// A declared action.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for an unknown action.
    pub async fn action(
        &self,
        session_id: Uuid,
        action_id: Uuid,
    ) -> Result<PendingAction, DomainError> {
        query_handlers::get_action(session_id, action_id, &*self.inner.deps.store).await
    }

    /// An encounter.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::NotFound` for an unknown encounter.
    pub async fn encounter(
        &self,
        session_id: Uuid,
        encounter_id: Uuid,
    ) -> Result<Encounter, DomainError> {
        combat_queries::get_encounter(session_id, encounter_id, &*self.inner.deps.store).await
    }
}
