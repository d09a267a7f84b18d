//! Method resolution seam between the dispatcher and application code
//!
//! [`Handler`] is the capability the dispatcher needs: look a method up, learn
//! how many arguments it requires, and invoke it. [`MethodRegistry`] implements
//! it with an explicit name-to-function table built at startup.

use std::collections::HashMap;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::errors::{MethodError, RegistryError};
use crate::rpc::codes::RESERVED_PREFIX;
use crate::rpc::request::is_valid_method_name;

pub type MethodFn = Box<dyn Fn(Vec<Value>) -> Result<Value, MethodError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Missing,
    /// Known to the handler but not publicly invocable.
    Hidden,
    Callable { required: usize },
}

pub trait Handler: Send + Sync {
    fn resolve(&self, method: &str) -> Resolution;
    fn invoke(&self, method: &str, params: Vec<Value>) -> Result<Value, MethodError>;
}

struct Entry {
    required: usize,
    public: bool,
    function: MethodFn,
}

#[derive(Default)]
pub struct MethodRegistry {
    methods: HashMap<String, Entry>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a method receiving the raw positional argument list.
    pub fn register<F>(self, name: &str, required: usize, function: F) -> Result<Self, RegistryError>
    where
        F: Fn(Vec<Value>) -> Result<Value, MethodError> + Send + Sync + 'static,
    {
        self.insert(name, required, true, Box::new(function))
    }

    /// Registers a method whose arguments are decoded into `P`. Positional
    /// arguments map onto tuples, e.g. `(i64, i64)`; named arguments arrive as a
    /// one-element tuple holding the mapping. Positional arguments beyond
    /// `required` are dropped when `P` cannot take them, so fixed-size tuples
    /// accept extras. Decode failures are reported as invalid params.
    pub fn register_typed<P, R, F>(
        self,
        name: &str,
        required: usize,
        function: F,
    ) -> Result<Self, RegistryError>
    where
        P: DeserializeOwned + 'static,
        R: Serialize + 'static,
        F: Fn(P) -> Result<R, MethodError> + Send + Sync + 'static,
    {
        let method_name = name.to_string();
        let wrapped = move |params: Vec<Value>| -> Result<Value, MethodError> {
            let decoded = decode_params::<P>(params, required)?;
            let result = function(decoded)?;
            serde_json::to_value(result).map_err(|err| {
                MethodError::failed(format!(
                    "method '{method_name}' returned an unserializable result: {err}"
                ))
            })
        };
        self.insert(name, required, true, Box::new(wrapped))
    }

    /// Registers a method that resolves but is refused to remote callers.
    pub fn register_hidden<F>(
        self,
        name: &str,
        required: usize,
        function: F,
    ) -> Result<Self, RegistryError>
    where
        F: Fn(Vec<Value>) -> Result<Value, MethodError> + Send + Sync + 'static,
    {
        self.insert(name, required, false, Box::new(function))
    }

    fn insert(
        mut self,
        name: &str,
        required: usize,
        public: bool,
        function: MethodFn,
    ) -> Result<Self, RegistryError> {
        if name.starts_with(RESERVED_PREFIX) {
            return Err(RegistryError::ReservedName {
                name: name.to_string(),
            });
        }
        if !is_valid_method_name(name) {
            return Err(RegistryError::InvalidName {
                name: name.to_string(),
            });
        }
        if self.methods.contains_key(name) {
            return Err(RegistryError::Duplicate {
                name: name.to_string(),
            });
        }

        self.methods.insert(
            name.to_string(),
            Entry {
                required,
                public,
                function,
            },
        );
        Ok(self)
    }

    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .methods
            .iter()
            .filter(|(_, entry)| entry.public)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

fn decode_params<P: DeserializeOwned>(
    mut params: Vec<Value>,
    required: usize,
) -> Result<P, MethodError> {
    if params.len() <= required {
        return Ok(serde_json::from_value(Value::Array(params))?);
    }

    match serde_json::from_value(Value::Array(params.clone())) {
        Ok(decoded) => Ok(decoded),
        Err(_) => {
            params.truncate(required);
            Ok(serde_json::from_value(Value::Array(params))?)
        }
    }
}

impl Handler for MethodRegistry {
    fn resolve(&self, method: &str) -> Resolution {
        match self.methods.get(method) {
            None => Resolution::Missing,
            Some(entry) if !entry.public => Resolution::Hidden,
            Some(entry) => Resolution::Callable {
                required: entry.required,
            },
        }
    }

    fn invoke(&self, method: &str, params: Vec<Value>) -> Result<Value, MethodError> {
        match self.methods.get(method) {
            Some(entry) => (entry.function)(params),
            None => Err(MethodError::failed("Method not found.")),
        }
    }
}
