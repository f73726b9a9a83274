use thiserror::Error;

use crate::config::ProfileError;
use crate::constraint::ConstraintError;
use crate::decision::DecisionError;
use crate::eval::context::{CapabilityError, ContextError};
use crate::eval::executor::ExecError;
use crate::eval::expression::EvalError;
use crate::replay::ReplayError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),
    #[error("Eval error: {0}")]
    Eval(#[from] EvalError),
    #[error("Context error: {0}")]
    Context(#[from] ContextError),
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),
    #[error("Constraint error: {0}")]
    Constraint(#[from] ConstraintError),
    #[error("Decision error: {0}")]
    Decision(#[from] DecisionError),
    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type EngineResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
