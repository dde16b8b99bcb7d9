use serde::{Deserialize, Serialize};

use crate::models::ConsumerId;

/// Result of a promotion scan: which blocked consumers can run now.
///
/// A transient computation result, never persisted. `used_permits` is the
/// unit's occupancy at scan time; `consumer_ids` lists, in submission order,
/// the blocked consumers that fit on top of it. The caller is responsible
/// for actually promoting each id through `consumer_unblocked`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnableConsumers {
    pub used_permits: u32,
    pub consumer_ids: Vec<ConsumerId>,
}

impl RunnableConsumers {
    pub fn is_empty(&self) -> bool {
        self.consumer_ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.consumer_ids.len()
    }
}
