//! Embedded Python function modules.
//!
//! This module is only available when the `python-bridge` feature is enabled.
//!
//! # Feature Gate
//!
//! ```toml
//! [dependencies]
//! rdfcon = { version = "0.1", features = ["python-bridge"] }
//! ```
//!
//! Every public function defined in the module file (names not starting with
//! `_`, defined in the file itself rather than imported) is registered.

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyModule, PyTuple};
use serde_json::Value;
use std::fs;
use std::path::Path;

use super::{FunctionArgs, FunctionRegistry, TemplateFunction};
use crate::error::{FunctionCallError, FunctionLoadError};

/// A Python callable exposed to templates.
pub struct PythonFunction {
    name: String,
    func: Py<PyAny>,
}

impl PythonFunction {
    fn call_python(&self, args: &FunctionArgs) -> Result<String, FunctionCallError> {
        Python::with_gil(|py| {
            let positional = args
                .positional
                .iter()
                .map(|v| json_value_to_py(py, v))
                .collect::<Result<Vec<PyObject>, _>>()
                .map_err(|e| self.failed(e))?;
            let positional = PyTuple::new(py, positional);

            let named = PyDict::new(py);
            for (key, value) in &args.named {
                let py_value = json_value_to_py(py, value).map_err(|e| self.failed(e))?;
                named.set_item(key, py_value).map_err(|e| self.failed(e))?;
            }

            let result = self
                .func
                .call(py, positional, Some(named))
                .map_err(|e| self.failed(e))?;

            let result = result.as_ref(py);
            if result.is_none() {
                return Ok(String::new());
            }
            if let Ok(s) = result.extract::<String>() {
                return Ok(s);
            }
            result
                .str()
                .map(|s| s.to_string())
                .map_err(|e| self.failed(e))
        })
    }

    fn failed(&self, err: impl ToString) -> FunctionCallError {
        FunctionCallError::Failed {
            function: self.name.clone(),
            message: err.to_string(),
        }
    }
}

impl TemplateFunction for PythonFunction {
    fn call(&self, args: &FunctionArgs) -> Result<String, FunctionCallError> {
        self.call_python(args)
    }
}

/// Convert serde_json::Value to PyObject
fn json_value_to_py(py: Python, value: &Value) -> PyResult<PyObject> {
    Ok(match value {
        Value::Null => py.None(),
        Value::Bool(b) => b.into_py(py),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.into_py(py),
            (None, Some(f)) => f.into_py(py),
            _ => n.to_string().into_py(py),
        },
        Value::String(s) => s.into_py(py),
        Value::Array(items) => {
            let items = items
                .iter()
                .map(|v| json_value_to_py(py, v))
                .collect::<PyResult<Vec<PyObject>>>()?;
            items.into_py(py)
        }
        Value::Object(map) => {
            let dict = PyDict::new(py);
            for (k, v) in map {
                dict.set_item(k, json_value_to_py(py, v)?)?;
            }
            dict.into()
        }
    })
}

/// Execute a Python source file and register its public functions.
///
/// # Returns
/// Number of functions registered
///
/// # Errors
/// Returns error if the file can't be read or raises while being executed
pub fn load_module(
    path: &Path,
    registry: &mut FunctionRegistry,
) -> Result<usize, FunctionLoadError> {
    let code = fs::read_to_string(path).map_err(|source| FunctionLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let module_name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("template_functions")
        .to_string();
    let file_name = path.display().to_string();

    let functions = Python::with_gil(|py| -> PyResult<Vec<(String, Py<PyAny>)>> {
        let module = PyModule::from_code(py, &code, &file_name, &module_name)?;
        let inspect = py.import("inspect")?;

        let mut functions = Vec::new();
        for (key, value) in module.dict().iter() {
            let name: String = key.extract()?;
            if name.starts_with('_') {
                continue;
            }
            let is_function: bool = inspect.call_method1("isfunction", (value,))?.extract()?;
            if !is_function {
                continue;
            }
            let defined_here = value
                .getattr("__module__")
                .and_then(|m| m.extract::<String>())
                .map(|m| m == module_name)
                .unwrap_or(false);
            if defined_here {
                functions.push((name, value.into_py(py)));
            }
        }
        Ok(functions)
    })
    .map_err(|e| FunctionLoadError::Invalid {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let count = functions.len();
    for (name, func) in functions {
        registry.register(name.clone(), Box::new(PythonFunction { name, func }));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_python_module() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("films.py");
        fs::write(
            &path,
            "from os.path import join\n\ndef genre(title, default='unknown'):\n    return {'Gattaca': 'science fiction'}.get(title, default)\n\ndef _private():\n    return 'hidden'\n",
        )
        .unwrap();

        let mut registry = FunctionRegistry::new();
        let count = load_module(&path, &mut registry).unwrap();
        assert_eq!(count, 1);
        assert!(registry.has_function("genre"));
        assert!(!registry.has_function("join"));

        let hit = registry.call("genre", &FunctionArgs::from_texts(["Gattaca"])).unwrap();
        assert_eq!(hit, "science fiction");

        let mut args = FunctionArgs::from_texts(["Heat"]);
        args.named.insert("default".to_string(), Value::from("drama"));
        assert_eq!(registry.call("genre", &args).unwrap(), "drama");
    }

    #[test]
    fn test_python_exception_is_call_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.py");
        fs::write(&path, "def boom():\n    raise ValueError('nope')\n").unwrap();

        let mut registry = FunctionRegistry::new();
        load_module(&path, &mut registry).unwrap();
        let err = registry.call("boom", &FunctionArgs::new()).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
