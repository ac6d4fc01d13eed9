use std::collections::BTreeMap;
use std::sync::Arc;

use gridspace_common::{EntityId, Point, WorldPoint};
use gridspace_grid::{GridConfig, GridError, WorldGrid};
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentKind};

/// Errors from simulation operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("unknown agent {0}")]
    UnknownAgent(EntityId),
    #[error("position {0} is outside the world")]
    OutOfWorld(WorldPoint),
}

/// An event record produced by every mutation to the simulation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimEvent {
    /// Agent was spawned at a position.
    Spawned {
        id: EntityId,
        kind: AgentKind,
        position: WorldPoint,
    },
    /// Agent was despawned from its last position.
    Despawned { id: EntityId, position: WorldPoint },
    /// Agent moved, possibly across a cell boundary.
    Moved {
        id: EntityId,
        from: WorldPoint,
        to: WorldPoint,
    },
    /// Simulation advanced one tick with the given seed.
    Stepped { tick: u64, seed: u64 },
}

/// Result of moving an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movement {
    pub from_cell: usize,
    pub to_cell: usize,
    /// Candidate cells between the two positions, `None` where no cell exists.
    pub span: Vec<Option<usize>>,
}

impl Movement {
    pub fn crossed_cells(&self) -> bool {
        self.from_cell != self.to_cell
    }
}

#[derive(Debug, Clone)]
struct AgentState {
    agent: Arc<Agent>,
    position: WorldPoint,
    cell: usize,
}

/// A deterministic world of agents placed on a [`WorldGrid`].
///
/// The grid only tracks membership; this type is the caller that remembers
/// where each agent is and re-homes it when it crosses a cell boundary.
/// Agents are kept in a BTreeMap so iteration order, and therefore stepping,
/// is reproducible across platforms.
#[derive(Debug)]
pub struct Simulation {
    grid: WorldGrid<Arc<Agent>>,
    agents: BTreeMap<EntityId, AgentState>,
    next_id: i64,
    tick: u64,
    seed: u64,
    event_log: Vec<SimEvent>,
}

impl Simulation {
    /// Create an empty simulation over a freshly built grid.
    pub fn new(config: GridConfig, seed: u64) -> Result<Self, SimError> {
        Ok(Self {
            grid: WorldGrid::new(config)?,
            agents: BTreeMap::new(),
            next_id: 1,
            tick: 0,
            seed,
            event_log: Vec::new(),
        })
    }

    pub fn grid(&self) -> &WorldGrid<Arc<Agent>> {
        &self.grid
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Agent ids in ascending order.
    pub fn agent_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.agents.keys().copied()
    }

    pub fn agent(&self, id: EntityId) -> Option<&Arc<Agent>> {
        self.agents.get(&id).map(|s| &s.agent)
    }

    pub fn position(&self, id: EntityId) -> Option<WorldPoint> {
        self.agents.get(&id).map(|s| s.position)
    }

    /// Id of the cell currently holding the agent.
    pub fn cell_of(&self, id: EntityId) -> Option<usize> {
        self.agents.get(&id).map(|s| s.cell)
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.event_log
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Spawn a new agent at `position` and return its id.
    pub fn spawn(&mut self, kind: AgentKind, position: WorldPoint) -> Result<EntityId, SimError> {
        let id = EntityId(self.next_id);
        self.spawn_with_id(id, kind, position)?;
        Ok(id)
    }

    /// Spawn an agent with a specific id (used for replay).
    pub fn spawn_with_id(
        &mut self,
        id: EntityId,
        kind: AgentKind,
        position: WorldPoint,
    ) -> Result<(), SimError> {
        if self.agents.contains_key(&id) {
            return Err(GridError::AlreadyExists { id }.into());
        }
        let cell = self
            .grid
            .cell_at(&position)
            .ok_or(SimError::OutOfWorld(position))?;
        let agent = Arc::new(Agent::new(id, kind));
        cell.add_entity(Arc::clone(&agent))?;
        let cell = cell.id();

        self.agents.insert(
            id,
            AgentState {
                agent,
                position,
                cell,
            },
        );
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        self.event_log.push(SimEvent::Spawned { id, kind, position });
        tracing::debug!(%id, ?kind, %position, cell, "agent spawned");
        Ok(())
    }

    /// Remove an agent from its cell and the simulation.
    pub fn despawn(&mut self, id: EntityId) -> Option<Arc<Agent>> {
        let state = self.agents.remove(&id)?;
        if let Some(cell) = self.grid.cell_by_id(state.cell) {
            cell.remove_entity(id);
        }
        self.event_log.push(SimEvent::Despawned {
            id,
            position: state.position,
        });
        tracing::debug!(%id, "agent despawned");
        Some(state.agent)
    }

    /// Move an agent, re-homing it if it crosses into another cell.
    pub fn move_agent(&mut self, id: EntityId, to: WorldPoint) -> Result<Movement, SimError> {
        let to_cell = self.grid.cell_at(&to).ok_or(SimError::OutOfWorld(to))?;
        let state = self.agents.get_mut(&id).ok_or(SimError::UnknownAgent(id))?;
        let from = state.position;
        let from_cell = state.cell;

        if to_cell.id() != from_cell {
            // Add first so a failed add leaves the agent where it was.
            to_cell.add_entity(Arc::clone(&state.agent))?;
            if let Some(old) = self.grid.cell_by_id(from_cell) {
                old.remove_entity(id);
            }
            state.cell = to_cell.id();
            tracing::trace!(%id, from_cell, to_cell = to_cell.id(), "agent re-homed");
        }
        state.position = to;

        let span = self
            .grid
            .cell_span(&from, &to)
            .into_iter()
            .map(|c| c.map(|c| c.id()))
            .collect();

        self.event_log.push(SimEvent::Moved { id, from, to });
        Ok(Movement {
            from_cell,
            to_cell: to_cell.id(),
            span,
        })
    }

    /// Ids of agents visited by a neighborhood query around `focus`, sorted.
    pub fn nearby<Q: Point>(&self, focus: &Q, radius: i32) -> Vec<EntityId> {
        let mut ids = Vec::new();
        self.grid.range_entities(focus, radius, |agent| {
            ids.push(agent.id);
            Ok::<(), ()>(())
        });
        ids.sort_unstable();
        ids
    }

    /// Advance one tick: every agent takes a seeded random step of at most one
    /// world unit per axis, clamped to the world.
    pub fn step(&mut self) -> Result<(), SimError> {
        let _span = tracing::info_span!("sim_step", tick = self.tick + 1).entered();
        self.tick += 1;
        self.seed = splitmix64(self.seed);

        let max_x = self.grid.width() - 1;
        let max_y = self.grid.height() - 1;
        let moves: Vec<(EntityId, WorldPoint)> = self
            .agents
            .iter()
            .filter_map(|(id, state)| {
                let r = splitmix64(self.seed ^ (id.0 as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15));
                let dx = (r % 3) as i32 - 1;
                let dy = ((r >> 32) % 3) as i32 - 1;
                let to = WorldPoint::new(
                    (state.position.x + dx).clamp(0, max_x),
                    (state.position.y + dy).clamp(0, max_y),
                );
                (to != state.position).then_some((*id, to))
            })
            .collect();

        let mut crossings = 0usize;
        for (id, to) in moves {
            if self.move_agent(id, to)?.crossed_cells() {
                crossings += 1;
            }
        }

        self.event_log.push(SimEvent::Stepped {
            tick: self.tick,
            seed: self.seed,
        });
        tracing::trace!(tick = self.tick, crossings, "step complete");
        Ok(())
    }

    /// Rebuild a simulation by replaying an event log onto a fresh grid.
    pub fn replay(config: GridConfig, events: &[SimEvent]) -> Result<Self, SimError> {
        let mut sim = Self::new(config, 0)?;
        for event in events {
            match event {
                SimEvent::Spawned { id, kind, position } => {
                    sim.spawn_with_id(*id, *kind, *position)?;
                }
                SimEvent::Despawned { id, .. } => {
                    sim.despawn(*id);
                }
                SimEvent::Moved { id, to, .. } => {
                    sim.move_agent(*id, *to)?;
                }
                SimEvent::Stepped { tick, seed } => {
                    sim.tick = *tick;
                    sim.seed = *seed;
                }
            }
        }
        sim.event_log.clear();
        Ok(sim)
    }

    /// Deterministic FNV-1a hash of tick, seed, and every agent's placement.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&mut h, &self.tick.to_le_bytes());
        mix(&mut h, &self.seed.to_le_bytes());
        for (id, state) in &self.agents {
            mix(&mut h, &id.0.to_le_bytes());
            mix(&mut h, &[state.agent.kind_tag()]);
            mix(&mut h, &state.position.x.to_le_bytes());
            mix(&mut h, &state.position.y.to_le_bytes());
            mix(&mut h, &(state.cell as u64).to_le_bytes());
        }
        h
    }
}

/// Splitmix64 step, used both to advance the seed and to derive per-agent moves.
fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
