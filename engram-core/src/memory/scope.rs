use serde::{Deserialize, Serialize};

/// Every entity in Engram is scoped by `(tenant_id, agent_id)`. Store
/// queries must treat this pair as the row key space (spec §4.2).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub tenant_id: String,
    pub agent_id: String,
}

impl Scope {
    pub fn new(tenant_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            agent_id: agent_id.into(),
        }
    }
}
