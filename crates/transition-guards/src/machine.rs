//! Transition authorization machine.
//!
//! Checks run in a fixed order and stop at the first failure: state lookup,
//! command, edge, then authorization. Callers and auditors rely on that
//! order, so a request with two defects always reports the earlier one.

use gate_core::{
    AuthorizationModel, Command, Credentials, DecisionCode, DecisionCoded, ProtocolSpec, StateId,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub current: StateId,
    /// `None` is a command-only action that leaves the state unchanged.
    pub target: Option<StateId>,
    pub command: Command,
    pub credentials: Credentials,
}

impl TransitionRequest {
    pub fn transition(
        current: impl Into<StateId>,
        target: impl Into<StateId>,
        command: impl Into<Command>,
        credentials: Credentials,
    ) -> Self {
        Self {
            current: current.into(),
            target: Some(target.into()),
            command: command.into(),
            credentials,
        }
    }

    pub fn command_only(
        current: impl Into<StateId>,
        command: impl Into<Command>,
        credentials: Credentials,
    ) -> Self {
        Self {
            current: current.into(),
            target: None,
            command: command.into(),
            credentials,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionGrant {
    /// `SUCCESS` or `AUTH_EXEMPT`.
    pub code: DecisionCode,
    pub role_matches: usize,
    pub required_threshold: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("state `{state}` is not defined in the protocol graph")]
    StateUndefined { state: StateId },
    #[error("command `{command}` is not allowed in state `{state}`")]
    CommandDisallowed { state: StateId, command: Command },
    #[error("`{from}` has no edge to `{to}`")]
    TransitionInvalid { from: StateId, to: StateId },
    #[error("{matched} of {required} required role signatures present")]
    AuthInsufficient { matched: usize, required: u32 },
}

impl TransitionError {
    /// Role-match count, when the authorization step was reached.
    pub fn role_matches(&self) -> Option<usize> {
        match self {
            TransitionError::AuthInsufficient { matched, .. } => Some(*matched),
            _ => None,
        }
    }
}

impl DecisionCoded for TransitionError {
    fn code(&self) -> DecisionCode {
        match self {
            TransitionError::StateUndefined { .. } => DecisionCode::StateUndefined,
            TransitionError::CommandDisallowed { .. } => DecisionCode::CommandDisallowed,
            TransitionError::TransitionInvalid { .. } => DecisionCode::TransitionInvalid,
            TransitionError::AuthInsufficient { .. } => DecisionCode::AuthInsufficient,
        }
    }
}

pub fn validate(
    request: &TransitionRequest,
    protocol: &ProtocolSpec,
    auth: &AuthorizationModel,
) -> Result<TransitionGrant, TransitionError> {
    let rule = protocol
        .rule(&request.current)
        .ok_or_else(|| TransitionError::StateUndefined {
            state: request.current.clone(),
        })?;

    if !rule.allowed_commands.contains(&request.command) {
        return Err(TransitionError::CommandDisallowed {
            state: request.current.clone(),
            command: request.command.clone(),
        });
    }

    let role_matches = request.credentials.matching(&auth.required_roles);
    let required_threshold = auth.minimum_signature_threshold;

    let Some(target) = &request.target else {
        return Ok(TransitionGrant {
            code: DecisionCode::Success,
            role_matches,
            required_threshold,
        });
    };

    if !rule.next_states.contains(target) {
        return Err(TransitionError::TransitionInvalid {
            from: request.current.clone(),
            to: target.clone(),
        });
    }

    if auth.is_exempt(&request.current, target) {
        return Ok(TransitionGrant {
            code: DecisionCode::AuthExempt,
            role_matches,
            required_threshold,
        });
    }

    if role_matches < required_threshold as usize {
        return Err(TransitionError::AuthInsufficient {
            matched: role_matches,
            required: required_threshold,
        });
    }

    Ok(TransitionGrant {
        code: DecisionCode::Success,
        role_matches,
        required_threshold,
    })
}
