use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;

use crate::models::TripPlan;

#[derive(Debug, Default)]
struct SessionState {
    plan: Option<TripPlan>,
    advice: Option<String>,
}

/// The trip currently on screen.
///
/// Every calculation takes a ticket from [`TripSession::begin`]; a finished
/// plan is kept only if its ticket is still the newest one handed out, so a
/// slow response can never overwrite the result of a later request.
#[derive(Debug, Default)]
pub struct TripSession {
    latest: AtomicU64,
    state: RwLock<SessionState>,
}

impl TripSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the generation number for a new calculation.
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == generation
    }

    /// Stores `plan` if no newer calculation was started; returns whether it was kept.
    pub async fn commit(&self, plan: TripPlan) -> bool {
        let mut state = self.state.write().await;
        if !self.is_current(plan.generation) {
            tracing::debug!(
                "discarding stale plan #{} (latest is #{})",
                plan.generation,
                self.latest.load(Ordering::SeqCst)
            );
            return false;
        }
        state.plan = Some(plan);
        state.advice = None;
        true
    }

    pub async fn current(&self) -> Option<TripPlan> {
        self.state.read().await.plan.clone()
    }

    /// Clears the trip and invalidates every calculation still in flight.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        self.latest.fetch_add(1, Ordering::SeqCst);
        *state = SessionState::default();
    }

    /// The current plan together with the advice cached for it, read atomically.
    pub async fn current_with_advice(&self) -> Option<(TripPlan, Option<String>)> {
        let state = self.state.read().await;
        let plan = state.plan.clone()?;
        Some((plan, state.advice.clone()))
    }

    /// Remembers advice for the plan it was generated for, if that plan is still shown.
    pub async fn store_advice(&self, generation: u64, advice: String) -> bool {
        let mut state = self.state.write().await;
        let matches = state
            .plan
            .as_ref()
            .is_some_and(|plan| plan.generation == generation);
        if matches {
            state.advice = Some(advice);
        }
        matches
    }
}
