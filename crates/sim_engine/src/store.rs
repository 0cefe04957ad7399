//! In-memory plan book.
//!
//! Shared store for the plans the engine simulates against. The write
//! lock is the per-plan serialization point: every cadence decision and
//! earnings credit runs inside `with_plan_mut`, so two concurrent
//! authorizations for the same plan can never interleave.

use std::collections::HashMap;
use std::sync::Arc;

use common::{Error, Plan, Result};
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct PlanBook {
    inner: Arc<RwLock<HashMap<String, Plan>>>,
}

impl PlanBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, plan: Plan) {
        self.inner.write().await.insert(plan.id.clone(), plan);
    }

    /// Cloned snapshot of one plan.
    pub async fn get(&self, plan_id: &str) -> Result<Plan> {
        self.inner
            .read()
            .await
            .get(plan_id)
            .cloned()
            .ok_or_else(|| Error::PlanNotFound(plan_id.to_string()))
    }

    /// Cloned snapshot of every plan.
    pub async fn all(&self) -> Vec<Plan> {
        self.inner.read().await.values().cloned().collect()
    }

    /// Mutate one plan under the write lock, returning the closure's
    /// result. Cadence checks and credits go through here.
    pub async fn with_plan_mut<T>(
        &self,
        plan_id: &str,
        f: impl FnOnce(&mut Plan) -> Result<T>,
    ) -> Result<T> {
        let mut plans = self.inner.write().await;
        let plan = plans
            .get_mut(plan_id)
            .ok_or_else(|| Error::PlanNotFound(plan_id.to_string()))?;
        f(plan)
    }

    /// How many other active plans the same user holds (the allocator's
    /// operation-count boost input).
    pub async fn other_active_plans(&self, user_id: &str, excluding_plan: &str) -> usize {
        self.inner
            .read()
            .await
            .values()
            .filter(|p| p.user_id == user_id && p.id != excluding_plan && p.is_active())
            .count()
    }
}
