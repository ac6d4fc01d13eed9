use gridspace_common::{Entity, EntityId};
use serde::{Deserialize, Serialize};

/// What an agent is. The grid does not care; hosts filter on it in visitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    Npc,
    Monster,
    Item,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [AgentKind::Npc, AgentKind::Monster, AgentKind::Item];

    fn tag(self) -> u8 {
        match self {
            AgentKind::Npc => 0,
            AgentKind::Monster => 1,
            AgentKind::Item => 2,
        }
    }
}

/// Identity record stored in grid cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: EntityId,
    pub kind: AgentKind,
}

impl Agent {
    pub fn new(id: EntityId, kind: AgentKind) -> Self {
        Self { id, kind }
    }

    pub(crate) fn kind_tag(&self) -> u8 {
        self.kind.tag()
    }
}

impl Entity for Agent {
    fn id(&self) -> EntityId {
        self.id
    }
}
