use serde::{Deserialize, Serialize};

/// Domain-defined grouping a consumer releases under, used only for
/// unsatisfiable-wait detection.
///
/// Two consumers whose scopes a registry judges to overlap are waiting on
/// each other's permits; if their aggregate demand exceeds the constraint's
/// capacity, the wait can never resolve. What counts as overlapping is the
/// backend's call (e.g. "same pipeline execution") via
/// `ConstraintRegistry::overlapping_scope`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerScope {
    pub entity_type: String,
    pub entity_id: String,
}

impl ConsumerScope {
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }
}

/// Caller-supplied context carried by a registration.
///
/// The two concrete fields cover the known uses: a release scope for
/// deadlock detection and the opt-in queue cap. `extra` is an escape hatch
/// for registry backends that need scratch state on the registration (the
/// reference backend keeps its retry counter there); the policy layer never
/// interprets it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsumerContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ConsumerScope>,
    #[serde(default)]
    pub enforce_queue_cap: bool,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ConsumerContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scope(mut self, scope: ConsumerScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Turn away this registration instead of queueing it once the unit's
    /// blocked line reaches [`BLOCKED_QUEUE_CAP`](crate::constants::BLOCKED_QUEUE_CAP).
    pub fn with_queue_cap(mut self) -> Self {
        self.enforce_queue_cap = true;
        self
    }
}
