use std::sync::{RwLock, RwLockReadGuard};

use agentspace_common::{
    Agent, Coordinate, Entity, EntityId, EntityKind, GameType, Hazard, Identified, Target, Task,
};
use tracing::{debug, error, info, info_span};

use crate::allocation::{Allocation, AllocationTable, AllocationTables};
use crate::config::SessionConfig;
use crate::error::StateError;
use crate::hazard::HazardHeatMap;
use crate::registry::Registry;
use crate::snapshot::{HazardHitsSnapshot, StateSnapshot};
use crate::sync::{self, Field};

/// Scalar session fields, each behind its own lock.
#[derive(Debug)]
struct Scalars {
    time: Field<f64>,
    edit_mode: Field<bool>,
    in_progress: Field<bool>,
    game_id: Field<Option<String>>,
    game_description: Field<Option<String>>,
    game_type: Field<GameType>,
    allocation_method: Field<String>,
    flocking_enabled: Field<bool>,
    game_centre: Field<Option<Coordinate>>,
    prov_doc: Field<Option<String>>,
    allocation_undo_available: Field<bool>,
    allocation_redo_available: Field<bool>,
}

impl Scalars {
    fn new(config: &SessionConfig) -> Self {
        Self {
            time: Field::new(0.0),
            edit_mode: Field::default(),
            in_progress: Field::default(),
            game_id: Field::default(),
            game_description: Field::default(),
            game_type: Field::default(),
            allocation_method: Field::new(config.default_allocation_method.clone()),
            flocking_enabled: Field::default(),
            game_centre: Field::default(),
            prov_doc: Field::default(),
            allocation_undo_available: Field::default(),
            allocation_redo_available: Field::default(),
        }
    }

    fn reset(&self, config: &SessionConfig) {
        self.time.set(0.0);
        self.edit_mode.set(false);
        self.in_progress.set(false);
        self.game_id.set(None);
        self.game_description.set(None);
        self.game_type.set(GameType::default());
        self.allocation_method.set(config.default_allocation_method.clone());
        self.flocking_enabled.set(false);
        self.game_centre.set(None);
        self.prov_doc.set(None);
        self.allocation_undo_available.set(false);
        self.allocation_redo_available.set(false);
    }
}

/// The authoritative state of one live simulation session.
///
/// Shared between request handlers and the tick driver as an
/// `Arc<WorldState>`; every method takes `&self`.
///
/// # Locking
/// - `session` is a gate: every operation holds it for read, [`WorldState::reset`]
///   holds it for write, so a reset never interleaves with anything else.
/// - Each registry, the completed-task log, the allocation tables, every
///   scalar field and every hazard partition has its own lock.
/// - Lock order is always gate, then one component lock. No operation holds
///   two component locks at once.
#[derive(Debug)]
pub struct WorldState {
    config: SessionConfig,
    session: RwLock<()>,
    agents: RwLock<Registry<Agent>>,
    tasks: RwLock<Registry<Task>>,
    targets: RwLock<Registry<Target>>,
    hazards: RwLock<Registry<Hazard>>,
    completed_tasks: RwLock<Vec<Task>>,
    allocations: RwLock<AllocationTables>,
    hazard_hits: HazardHeatMap,
    scalars: Scalars,
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldState {
    /// Create an empty session with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Create an empty session using `config` for defaults and decay rates.
    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            session: RwLock::new(()),
            agents: RwLock::new(Registry::new(EntityKind::Agent)),
            tasks: RwLock::new(Registry::new(EntityKind::Task)),
            targets: RwLock::new(Registry::new(EntityKind::Target)),
            hazards: RwLock::new(Registry::new(EntityKind::Hazard)),
            completed_tasks: RwLock::new(Vec::new()),
            allocations: RwLock::new(AllocationTables::new()),
            hazard_hits: HazardHeatMap::new(&config),
            scalars: Scalars::new(&config),
            config,
        }
    }

    /// The configuration this session was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn gate(&self) -> RwLockReadGuard<'_, ()> {
        sync::read(&self.session)
    }

    /// Return every collection and scalar to its initial state.
    ///
    /// Atomic with respect to all other operations. Hazard partitions are
    /// cleared in place.
    pub fn reset(&self) {
        let _span = info_span!("session_reset").entered();
        let _gate = sync::write(&self.session);
        sync::write(&self.agents).clear();
        sync::write(&self.tasks).clear();
        sync::write(&self.targets).clear();
        sync::write(&self.hazards).clear();
        sync::write(&self.completed_tasks).clear();
        sync::write(&self.allocations).clear();
        self.hazard_hits.clear();
        self.scalars.reset(&self.config);
        info!("session state reset");
    }

    // --- Entities ---

    /// Add an entity to the registry matching its variant.
    pub fn add(&self, entity: Entity) -> Result<(), StateError> {
        match entity {
            Entity::Agent(agent) => self.add_agent(agent),
            Entity::Task(task) => self.add_task(task),
            Entity::Target(target) => self.add_target(target),
            Entity::Hazard(hazard) => self.add_hazard(hazard),
        }
    }

    /// Remove the entity of `kind` with `id`. Returns false if it was absent.
    pub fn remove(&self, kind: EntityKind, id: &EntityId) -> bool {
        match kind {
            EntityKind::Agent => self.remove_agent(id),
            EntityKind::Task => self.remove_task(id),
            EntityKind::Target => self.remove_target(id),
            EntityKind::Hazard => self.remove_hazard(id),
        }
    }

    /// Look up the entity of `kind` with `id`, cloned out of its registry.
    pub fn get(&self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>, StateError> {
        Ok(match kind {
            EntityKind::Agent => self.agent(id)?.map(Entity::Agent),
            EntityKind::Task => self.task(id)?.map(Entity::Task),
            EntityKind::Target => self.target(id)?.map(Entity::Target),
            EntityKind::Hazard => self.hazard(id)?.map(Entity::Hazard),
        })
    }

    /// Add an agent. Fails with [`StateError::DuplicateId`] if the id is taken.
    pub fn add_agent(&self, agent: Agent) -> Result<(), StateError> {
        self.add_to(&self.agents, agent)
    }

    /// Add a task. Fails with [`StateError::DuplicateId`] if the id is taken.
    pub fn add_task(&self, task: Task) -> Result<(), StateError> {
        self.add_to(&self.tasks, task)
    }

    /// Add a target. Fails with [`StateError::DuplicateId`] if the id is taken.
    pub fn add_target(&self, target: Target) -> Result<(), StateError> {
        self.add_to(&self.targets, target)
    }

    /// Add a hazard. Fails with [`StateError::DuplicateId`] if the id is taken.
    pub fn add_hazard(&self, hazard: Hazard) -> Result<(), StateError> {
        self.add_to(&self.hazards, hazard)
    }

    /// Remove the agent with `id`. Returns false if it was absent.
    pub fn remove_agent(&self, id: &EntityId) -> bool {
        self.remove_from(&self.agents, id)
    }

    /// Remove the task with `id`. Returns false if it was absent.
    pub fn remove_task(&self, id: &EntityId) -> bool {
        self.remove_from(&self.tasks, id)
    }

    /// Remove the target with `id`. Returns false if it was absent.
    pub fn remove_target(&self, id: &EntityId) -> bool {
        self.remove_from(&self.targets, id)
    }

    /// Remove the hazard with `id`. Returns false if it was absent.
    pub fn remove_hazard(&self, id: &EntityId) -> bool {
        self.remove_from(&self.hazards, id)
    }

    /// Clone of the agent with `id`, if present.
    pub fn agent(&self, id: &EntityId) -> Result<Option<Agent>, StateError> {
        self.get_from(&self.agents, id)
    }

    /// Clone of the task with `id`, if present.
    pub fn task(&self, id: &EntityId) -> Result<Option<Task>, StateError> {
        self.get_from(&self.tasks, id)
    }

    /// Clone of the target with `id`, if present.
    pub fn target(&self, id: &EntityId) -> Result<Option<Target>, StateError> {
        self.get_from(&self.targets, id)
    }

    /// Clone of the hazard with `id`, if present.
    pub fn hazard(&self, id: &EntityId) -> Result<Option<Hazard>, StateError> {
        self.get_from(&self.hazards, id)
    }

    /// Edit an agent under the agent registry lock.
    ///
    /// `edit` works on a copy which is committed only if it keeps the same
    /// id; an edit that swaps in another agent fails with
    /// [`StateError::IdChanged`] and leaves the registry untouched.
    /// Returns false if no agent has `id`. `edit` must not call back into
    /// this `WorldState`.
    pub fn update_agent(
        &self,
        id: &EntityId,
        edit: impl FnOnce(&mut Agent),
    ) -> Result<bool, StateError> {
        let _gate = self.gate();
        let mut agents = sync::write(&self.agents);
        let Some(agent) = agents.get_mut(id).inspect_err(log_invariant_violation)? else {
            return Ok(false);
        };
        let mut edited = agent.clone();
        edit(&mut edited);
        if edited.id() != id {
            let err = StateError::IdChanged {
                kind: EntityKind::Agent,
                id: id.clone(),
                new_id: edited.id().clone(),
            };
            log_invariant_violation(&err);
            return Err(err);
        }
        *agent = edited;
        Ok(true)
    }

    /// All agents in insertion order.
    pub fn agents(&self) -> Vec<Agent> {
        self.list(&self.agents)
    }

    /// All open tasks in insertion order.
    pub fn tasks(&self) -> Vec<Task> {
        self.list(&self.tasks)
    }

    /// All targets in insertion order.
    pub fn targets(&self) -> Vec<Target> {
        self.list(&self.targets)
    }

    /// All hazards in insertion order.
    pub fn hazards(&self) -> Vec<Hazard> {
        self.list(&self.hazards)
    }

    /// Append to the completed-task audit trail. Entries are never removed
    /// except by [`WorldState::reset`].
    pub fn add_completed_task(&self, task: Task) {
        let _gate = self.gate();
        debug!(id = %task.id(), "task completed");
        sync::write(&self.completed_tasks).push(task);
    }

    /// The completed-task log, oldest first.
    pub fn completed_tasks(&self) -> Vec<Task> {
        let _gate = self.gate();
        sync::read(&self.completed_tasks).clone()
    }

    fn add_to<T: Identified>(
        &self,
        registry: &RwLock<Registry<T>>,
        item: T,
    ) -> Result<(), StateError> {
        let _gate = self.gate();
        let mut registry = sync::write(registry);
        let id = item.id().clone();
        registry.add(item).inspect_err(log_invariant_violation)?;
        debug!(kind = %registry.kind(), %id, "entity added");
        Ok(())
    }

    fn remove_from<T: Identified>(&self, registry: &RwLock<Registry<T>>, id: &EntityId) -> bool {
        let _gate = self.gate();
        let mut registry = sync::write(registry);
        let removed = registry.remove(id);
        debug!(kind = %registry.kind(), %id, removed, "entity remove");
        removed
    }

    fn get_from<T: Identified + Clone>(
        &self,
        registry: &RwLock<Registry<T>>,
        id: &EntityId,
    ) -> Result<Option<T>, StateError> {
        let _gate = self.gate();
        let registry = sync::read(registry);
        let found = registry.get(id).inspect_err(log_invariant_violation)?;
        Ok(found.cloned())
    }

    fn list<T: Identified + Clone>(&self, registry: &RwLock<Registry<T>>) -> Vec<T> {
        let _gate = self.gate();
        sync::read(registry).to_vec()
    }

    // --- Allocations ---

    /// Copy of one allocation table.
    pub fn allocation_table(&self, table: AllocationTable) -> Allocation {
        let _gate = self.gate();
        sync::read(&self.allocations).get(table).clone()
    }

    /// Replace `table` wholesale. `None` clears it.
    pub fn replace_allocation_table(&self, table: AllocationTable, mapping: Option<Allocation>) {
        let _gate = self.gate();
        let size = mapping.as_ref().map_or(0, Allocation::len);
        sync::write(&self.allocations).replace(table, mapping);
        debug!(?table, size, "allocation table replaced");
    }

    /// The confirmed agent-to-task allocation.
    pub fn allocation(&self) -> Allocation {
        self.allocation_table(AllocationTable::Confirmed)
    }

    /// Replace the confirmed allocation.
    pub fn set_allocation(&self, allocation: Allocation) {
        self.replace_allocation_table(AllocationTable::Confirmed, Some(allocation));
    }

    /// The provisional allocation awaiting confirmation.
    pub fn temp_allocation(&self) -> Allocation {
        self.allocation_table(AllocationTable::Provisional)
    }

    /// Install a provisional allocation, or clear it with `None`.
    pub fn set_temp_allocation(&self, allocation: Option<Allocation>) {
        self.replace_allocation_table(AllocationTable::Provisional, allocation);
    }

    /// Assignments dropped from the confirmed allocation.
    pub fn dropped_allocation(&self) -> Allocation {
        self.allocation_table(AllocationTable::Dropped)
    }

    /// Replace the dropped-assignment table.
    pub fn set_dropped_allocation(&self, allocation: Allocation) {
        self.replace_allocation_table(AllocationTable::Dropped, Some(allocation));
    }

    // --- Hazard hits ---

    /// Register a hazard hit by wire category code. Returns whether a hit was
    /// stored; `false` reports an unrecognized code, which is logged and
    /// otherwise ignored.
    pub fn add_hazard_hit(&self, code: i32, location: Coordinate) -> bool {
        let _gate = self.gate();
        self.hazard_hits.register_hit(code, location)
    }

    /// Apply one tick of decay to every hazard hit. Returns the number expired.
    pub fn decay_hazard_hits(&self) -> usize {
        let _span = info_span!("hazard_decay").entered();
        let _gate = self.gate();
        self.hazard_hits.decay_tick()
    }

    /// Per-category view of every live hazard hit.
    pub fn hazard_hits(&self) -> HazardHitsSnapshot {
        let _gate = self.gate();
        self.hazard_hits.snapshot()
    }

    // --- Scalars ---

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        let _gate = self.gate();
        self.scalars.time.get()
    }

    /// Overwrite the simulation time.
    pub fn set_time(&self, time: f64) {
        let _gate = self.gate();
        self.scalars.time.set(time);
    }

    /// Add `delta` to the session time atomically. Returns the new time.
    pub fn increment_time(&self, delta: f64) -> f64 {
        let _gate = self.gate();
        self.scalars.time.update(|time| {
            *time += delta;
            *time
        })
    }

    /// Whether the session is being edited rather than run.
    pub fn is_edit_mode(&self) -> bool {
        let _gate = self.gate();
        self.scalars.edit_mode.get()
    }

    pub fn set_edit_mode(&self, edit_mode: bool) {
        let _gate = self.gate();
        self.scalars.edit_mode.set(edit_mode);
    }

    /// Whether a game is currently running.
    pub fn is_in_progress(&self) -> bool {
        let _gate = self.gate();
        self.scalars.in_progress.get()
    }

    pub fn set_in_progress(&self, in_progress: bool) {
        let _gate = self.gate();
        self.scalars.in_progress.set(in_progress);
    }

    /// Identifier of the loaded game, if any.
    pub fn game_id(&self) -> Option<String> {
        let _gate = self.gate();
        self.scalars.game_id.get()
    }

    pub fn set_game_id(&self, game_id: impl Into<String>) {
        let _gate = self.gate();
        self.scalars.game_id.set(Some(game_id.into()));
    }

    /// Human-readable description of the loaded game.
    pub fn game_description(&self) -> Option<String> {
        let _gate = self.gate();
        self.scalars.game_description.get()
    }

    pub fn set_game_description(&self, description: impl Into<String>) {
        let _gate = self.gate();
        self.scalars.game_description.set(Some(description.into()));
    }

    /// Whether the loaded game is a sandbox or a scenario.
    pub fn game_type(&self) -> GameType {
        let _gate = self.gate();
        self.scalars.game_type.get()
    }

    pub fn set_game_type(&self, game_type: GameType) {
        let _gate = self.gate();
        self.scalars.game_type.set(game_type);
    }

    /// Name of the allocation method handlers should request.
    pub fn allocation_method(&self) -> String {
        let _gate = self.gate();
        self.scalars.allocation_method.get()
    }

    pub fn set_allocation_method(&self, method: impl Into<String>) {
        let _gate = self.gate();
        self.scalars.allocation_method.set(method.into());
    }

    /// Whether agents flock when idle.
    pub fn is_flocking_enabled(&self) -> bool {
        let _gate = self.gate();
        self.scalars.flocking_enabled.get()
    }

    pub fn set_flocking_enabled(&self, enabled: bool) {
        let _gate = self.gate();
        self.scalars.flocking_enabled.set(enabled);
    }

    /// Map centre of the loaded game.
    pub fn game_centre(&self) -> Option<Coordinate> {
        let _gate = self.gate();
        self.scalars.game_centre.get()
    }

    pub fn set_game_centre(&self, centre: Coordinate) {
        let _gate = self.gate();
        self.scalars.game_centre.set(Some(centre));
    }

    /// Provenance document describing how the session evolved.
    pub fn prov_doc(&self) -> Option<String> {
        let _gate = self.gate();
        self.scalars.prov_doc.get()
    }

    /// Store the serialized provenance document.
    pub fn set_prov_doc(&self, doc: impl Into<String>) {
        let _gate = self.gate();
        self.scalars.prov_doc.set(Some(doc.into()));
    }

    /// Whether an allocation change can be undone.
    pub fn is_allocation_undo_available(&self) -> bool {
        let _gate = self.gate();
        self.scalars.allocation_undo_available.get()
    }

    pub fn set_allocation_undo_available(&self, available: bool) {
        let _gate = self.gate();
        self.scalars.allocation_undo_available.set(available);
    }

    /// Whether an undone allocation change can be redone.
    pub fn is_allocation_redo_available(&self) -> bool {
        let _gate = self.gate();
        self.scalars.allocation_redo_available.get()
    }

    pub fn set_allocation_redo_available(&self, available: bool) {
        let _gate = self.gate();
        self.scalars.allocation_redo_available.set(available);
    }

    // --- Snapshot ---

    /// Copy out the whole session for serialization.
    pub fn snapshot(&self) -> StateSnapshot {
        let _gate = self.gate();
        let s = &self.scalars;
        let (allocation, temp_allocation, dropped_allocation) = {
            let tables = sync::read(&self.allocations);
            (
                tables.get(AllocationTable::Confirmed).clone(),
                tables.get(AllocationTable::Provisional).clone(),
                tables.get(AllocationTable::Dropped).clone(),
            )
        };
        StateSnapshot {
            game_id: s.game_id.get(),
            game_description: s.game_description.get(),
            game_type: s.game_type.get(),
            game_centre: s.game_centre.get(),
            allocation_method: s.allocation_method.get(),
            flocking_enabled: s.flocking_enabled.get(),
            time: s.time.get(),
            edit_mode: s.edit_mode.get(),
            in_progress: s.in_progress.get(),
            prov_doc: s.prov_doc.get(),
            allocation_undo_available: s.allocation_undo_available.get(),
            allocation_redo_available: s.allocation_redo_available.get(),
            agents: sync::read(&self.agents).to_vec(),
            tasks: sync::read(&self.tasks).to_vec(),
            completed_tasks: sync::read(&self.completed_tasks).clone(),
            targets: sync::read(&self.targets).to_vec(),
            hazards: sync::read(&self.hazards).to_vec(),
            allocation,
            temp_allocation,
            dropped_allocation,
            hazard_hits: self.hazard_hits.snapshot(),
        }
    }
}

fn log_invariant_violation(err: &StateError) {
    error!(%err, "entity registry invariant violated");
}
