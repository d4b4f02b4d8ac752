//! Template function registry.
//!
//! Template calls (`{{ name(args) }}`) are dispatched by name through a
//! [`FunctionRegistry`]. The registry always holds the built-in functions and
//! is extended once at start-up from the module named by `templateFunctions`.

pub mod builtins;
pub mod module;
#[cfg(feature = "python-bridge")]
pub mod python;

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::{FunctionCallError, FunctionLoadError};

/// Arguments of one template function call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionArgs {
    pub positional: Vec<Value>,
    pub named: IndexMap<String, Value>,
}

impl FunctionArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build arguments from positional text values.
    pub fn from_texts<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            positional: values
                .into_iter()
                .map(|v| Value::String(v.into()))
                .collect(),
            named: IndexMap::new(),
        }
    }

    /// Positional argument `index` rendered as text.
    pub fn text(&self, index: usize) -> Option<String> {
        self.positional.get(index).map(value_text)
    }

    /// Named argument rendered as text.
    pub fn named_text(&self, name: &str) -> Option<String> {
        self.named.get(name).map(value_text)
    }

    /// Positional argument `index` as text, failing if absent.
    ///
    /// # Errors
    /// Returns [`FunctionCallError::InvalidArgs`] naming `function` when the argument is missing
    pub fn require(&self, function: &str, index: usize) -> Result<String, FunctionCallError> {
        self.text(index).ok_or_else(|| FunctionCallError::InvalidArgs {
            function: function.to_string(),
            message: format!("missing positional argument {}", index + 1),
        })
    }

    /// Fail when more than `max` positional arguments were given.
    pub fn at_most(&self, function: &str, max: usize) -> Result<(), FunctionCallError> {
        if self.positional.len() > max {
            return Err(FunctionCallError::InvalidArgs {
                function: function.to_string(),
                message: format!(
                    "expected at most {} arguments, got {}",
                    max,
                    self.positional.len()
                ),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Text form of an argument value. `null` renders as the empty string.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// A callable exposed to templates.
///
/// Functions take positional and named arguments and return text. They must be
/// safe to call from several threads, though the pipeline calls them from one.
pub trait TemplateFunction: Send + Sync {
    /// Invoke the function.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Text substituted into the template
    /// * `Err(FunctionCallError)` - Invocation failed; fails the record
    fn call(&self, args: &FunctionArgs) -> Result<String, FunctionCallError>;
}

impl<F> TemplateFunction for F
where
    F: Fn(&FunctionArgs) -> Result<String, FunctionCallError> + Send + Sync,
{
    fn call(&self, args: &FunctionArgs) -> Result<String, FunctionCallError> {
        self(args)
    }
}

/// Name -> callable lookup table.
pub struct FunctionRegistry {
    functions: HashMap<String, Box<dyn TemplateFunction>>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Create a registry holding every built-in function.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtins::register_builtins(&mut registry);
        registry
    }

    /// Build the registry for a run: built-ins, then the functions of `module`.
    ///
    /// Module functions shadow built-ins of the same name.
    ///
    /// # Arguments
    ///
    /// * `module_path` - Path of the function module, if the specification names one
    ///
    /// # Errors
    ///
    /// Returns error if the module is missing, unreadable, malformed, or of an
    /// unsupported kind
    pub fn load(module_path: Option<&Path>) -> Result<Self, FunctionLoadError> {
        let mut registry = Self::with_builtins();
        let Some(path) = module_path else {
            return Ok(registry);
        };

        if !path.is_file() {
            return Err(FunctionLoadError::NotFound(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let count = match extension.as_deref() {
            Some("yaml") | Some("yml") => module::load_module(path, &mut registry)?,
            Some("py") => load_python(path, &mut registry)?,
            _ => {
                return Err(FunctionLoadError::Unsupported {
                    path: path.to_path_buf(),
                    reason: "expected a .yaml, .yml or .py module".to_string(),
                })
            }
        };

        tracing::debug!(
            "Loaded {} template functions from {}",
            count,
            path.display()
        );
        Ok(registry)
    }

    /// Register a function, replacing any earlier one with the same name.
    pub fn register(&mut self, name: impl Into<String>, func: Box<dyn TemplateFunction>) {
        self.functions.insert(name.into(), func);
    }

    /// Call a registered function.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the registered function
    /// * `args` - Arguments to pass
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - Function result
    /// * `Err(FunctionCallError)` - Unknown name, or the function failed
    pub fn call(&self, name: &str, args: &FunctionArgs) -> Result<String, FunctionCallError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| FunctionCallError::UnknownFunction(name.to_string()))?;

        function.call(args)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.function_names())
            .finish()
    }
}

#[cfg(feature = "python-bridge")]
fn load_python(path: &Path, registry: &mut FunctionRegistry) -> Result<usize, FunctionLoadError> {
    python::load_module(path, registry)
}

#[cfg(not(feature = "python-bridge"))]
fn load_python(path: &Path, _registry: &mut FunctionRegistry) -> Result<usize, FunctionLoadError> {
    Err(FunctionLoadError::Unsupported {
        path: path.to_path_buf(),
        reason: "Python modules require the python-bridge feature".to_string(),
    })
}
