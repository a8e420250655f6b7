//! Dispute Resolution Controller
//!
//! OPEN → (confirm) → RESOLVING → RESOLVED_BUYER | RESOLVED_SELLER.
//! The status only moves after the backend acknowledges; a failure drops
//! back to the confirmation step so the operator can retry.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ConsoleError, Result};
use crate::models::dispute::{DisputeStatus, Party};
use crate::services::backend_api::BackendApi;
use crate::services::notifications::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPhase {
    Idle,
    /// Confirmation dialog is open
    Confirming,
    /// Award request in flight; award buttons are disabled
    Resolving(Party),
}

#[derive(Debug)]
struct ResolutionState {
    status: DisputeStatus,
    phase: ResolutionPhase,
}

#[derive(Debug, Clone)]
pub struct ResolutionController {
    dispute_id: String,
    state: Arc<Mutex<ResolutionState>>,
}

/// Puts the dialog back into `Confirming` if the request never completes
struct ResolvingGuard<'a> {
    state: &'a Mutex<ResolutionState>,
    armed: bool,
}

impl Drop for ResolvingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.state.lock();
            if matches!(state.phase, ResolutionPhase::Resolving(_)) {
                state.phase = ResolutionPhase::Confirming;
            }
        }
    }
}

impl ResolutionController {
    pub fn new(dispute_id: impl Into<String>, status: DisputeStatus) -> Self {
        Self {
            dispute_id: dispute_id.into(),
            state: Arc::new(Mutex::new(ResolutionState { status, phase: ResolutionPhase::Idle })),
        }
    }

    pub fn dispute_id(&self) -> &str {
        &self.dispute_id
    }

    pub fn status(&self) -> DisputeStatus {
        self.state.lock().status
    }

    pub fn phase(&self) -> ResolutionPhase {
        self.state.lock().phase
    }

    /// Whether the "Resolve Dispute" action is offered
    pub fn can_resolve(&self) -> bool {
        let state = self.state.lock();
        state.status == DisputeStatus::Open && !matches!(state.phase, ResolutionPhase::Resolving(_))
    }

    pub fn is_confirming(&self) -> bool {
        !matches!(self.phase(), ResolutionPhase::Idle)
    }

    pub fn open_confirmation(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.status.is_terminal() {
            return Err(ConsoleError::AlreadyTerminal(state.status.to_string()));
        }
        if state.phase == ResolutionPhase::Idle {
            state.phase = ResolutionPhase::Confirming;
        }
        Ok(())
    }

    /// Closing the dialog is ignored while a request is in flight
    pub fn cancel_confirmation(&self) {
        let mut state = self.state.lock();
        if state.phase == ResolutionPhase::Confirming {
            state.phase = ResolutionPhase::Idle;
        }
    }

    /// Take a fresher status from a reloaded dispute. Never moves a terminal
    /// status back to OPEN.
    pub fn sync_status(&self, status: DisputeStatus) {
        let mut state = self.state.lock();
        if state.status.is_terminal() && !status.is_terminal() {
            warn!(
                "Dispute {}: ignoring stale status {} (already {})",
                self.dispute_id, status, state.status
            );
            return;
        }
        state.status = status;
        if status.is_terminal() && state.phase == ResolutionPhase::Confirming {
            state.phase = ResolutionPhase::Idle;
        }
    }

    /// Award the escrow to `party`. Must be called from the confirmation step.
    pub async fn resolve(
        &self,
        api: &dyn BackendApi,
        notifier: &dyn Notifier,
        party: Party,
    ) -> Result<DisputeStatus> {
        {
            let mut state = self.state.lock();
            if let ResolutionPhase::Resolving(_) = state.phase {
                return Err(ConsoleError::ResolutionInFlight);
            }
            if state.status.is_terminal() {
                return Err(ConsoleError::AlreadyTerminal(state.status.to_string()));
            }
            if state.phase != ResolutionPhase::Confirming {
                return Err(ConsoleError::ConfirmationRequired);
            }
            state.phase = ResolutionPhase::Resolving(party);
        }
        let mut guard = ResolvingGuard { state: &self.state, armed: true };

        match api.resolve_dispute(&self.dispute_id, party).await {
            Ok(reported) => {
                let status = match reported {
                    Some(status) if status.is_terminal() => status,
                    Some(status) => {
                        warn!(
                            "Dispute {}: backend acknowledged award but reported {}",
                            self.dispute_id, status
                        );
                        party.awarded_status()
                    }
                    None => party.awarded_status(),
                };

                {
                    let mut state = self.state.lock();
                    state.status = status;
                    state.phase = ResolutionPhase::Idle;
                }
                guard.armed = false;

                info!("Dispute {} resolved: {}", self.dispute_id, status);
                notifier.success(&format!("Dispute resolved: Escrow released to {}", party.label()));
                Ok(status)
            }
            Err(e) => {
                warn!("Dispute {} resolution failed: {}", self.dispute_id, e);
                self.state.lock().phase = ResolutionPhase::Confirming;
                guard.armed = false;
                notifier.error(&e.user_message());
                Err(e)
            }
        }
    }
}
