//! Operator attribution for audit trails and ledger entries.

use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Who performed an operation. `user_id = None` denotes a system action
/// (scheduled monitor runs, order-timeout sweeps, etc.).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Option<UserId>,
}

impl Actor {
    pub fn user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn system() -> Self {
        Self { user_id: None }
    }

    pub fn is_system(&self) -> bool {
        self.user_id.is_none()
    }
}

impl Default for Actor {
    fn default() -> Self {
        Self::system()
    }
}
