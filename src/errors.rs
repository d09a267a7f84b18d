use thiserror::Error;

/// Fault raised by an application method. Converted into a JSON-RPC error by
/// the dispatcher and never propagated past it.
#[derive(Debug, Error)]
pub enum MethodError {
    #[error("{message}")]
    Failed { message: String },
    #[error("{message}")]
    InvalidParams { message: String },
}

/// Misconfiguration detected while building a method registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("method '{name}' is already registered")]
    Duplicate { name: String },
    #[error("method name '{name}' is not a valid identifier")]
    InvalidName { name: String },
    #[error("method name '{name}' uses the reserved 'rpc.' prefix")]
    ReservedName { name: String },
}

impl MethodError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for MethodError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_params(format!("Invalid params: {err}"))
    }
}
