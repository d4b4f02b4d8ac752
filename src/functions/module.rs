//! Declarative function modules.
//!
//! A YAML module lists named functions and how each is implemented:
//!
//! ```yaml
//! functions:
//!   - name: genre
//!     doc: "Genre of a known film"
//!     implementation:
//!       type: lookup
//!       table:
//!         Gattaca: science fiction
//!       default: unknown
//! ```

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{builtins, FunctionArgs, FunctionRegistry, TemplateFunction};
use crate::error::{FunctionCallError, FunctionLoadError};

/// Parsed function module file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionModule {
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
}

/// Function definition from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionDef {
    /// Name templates call the function by
    pub name: String,

    /// Documentation string
    #[serde(default)]
    pub doc: Option<String>,

    pub implementation: Implementation,
}

/// Function implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Implementation {
    /// Alias of a built-in function
    Builtin {
        function: String,
    },

    /// Table lookup keyed by the first argument
    Lookup {
        table: IndexMap<String, String>,

        /// Result for keys missing from the table
        #[serde(default)]
        default: Option<String>,

        #[serde(default)]
        ignore_case: bool,
    },

    /// Text pattern with `{0}`-style positional and `{name}` named slots
    Format {
        pattern: String,
    },

    /// External program; call arguments are appended to `args`
    Command {
        program: String,

        #[serde(default)]
        args: Vec<String>,
    },
}

impl FunctionModule {
    /// Parse a module from YAML text.
    pub fn from_yaml(path: &Path, contents: &str) -> Result<Self, FunctionLoadError> {
        serde_yaml::from_str(contents).map_err(|source| FunctionLoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check names and references.
    ///
    /// Checks:
    /// - Names are identifiers and unique within the module
    /// - Built-in aliases name an existing built-in
    /// - Format patterns close every slot
    /// - Command programs are not empty
    pub fn validate(&self, path: &Path) -> Result<(), FunctionLoadError> {
        let name_re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").map_err(|e| invalid(path, e))?;
        let mut seen = HashSet::new();

        for def in &self.functions {
            if !name_re.is_match(&def.name) {
                return Err(invalid(
                    path,
                    format!("'{}' is not a valid function name", def.name),
                ));
            }
            if !seen.insert(def.name.as_str()) {
                return Err(invalid(path, format!("function '{}' is defined twice", def.name)));
            }

            match &def.implementation {
                Implementation::Builtin { function } => {
                    if !builtins::BUILTIN_NAMES.contains(&function.as_str()) {
                        return Err(invalid(
                            path,
                            format!(
                                "function '{}' aliases unknown built-in '{}'",
                                def.name, function
                            ),
                        ));
                    }
                }
                Implementation::Format { pattern } => {
                    check_format_pattern(pattern).map_err(|message| {
                        invalid(
                            path,
                            format!("function '{}' has a bad pattern: {}", def.name, message),
                        )
                    })?;
                }
                Implementation::Command { program, .. } if program.trim().is_empty() => {
                    return Err(invalid(
                        path,
                        format!("function '{}' has an empty program", def.name),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Turn a definition into a callable.
    fn build(def: FunctionDef, base_dir: &Path) -> Option<Box<dyn TemplateFunction>> {
        let name = def.name;
        let function: Box<dyn TemplateFunction> = match def.implementation {
            Implementation::Builtin { function } => return builtins::builtin(&function),
            Implementation::Lookup {
                table,
                default,
                ignore_case,
            } => Box::new(LookupFunction::new(name, table, default, ignore_case)),
            Implementation::Format { pattern } => Box::new(FormatFunction { name, pattern }),
            Implementation::Command { program, args } => Box::new(CommandFunction {
                name,
                program,
                args,
                working_dir: base_dir.to_path_buf(),
            }),
        };
        Some(function)
    }
}

fn invalid(path: &Path, message: impl ToString) -> FunctionLoadError {
    FunctionLoadError::Invalid {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Load a YAML module and register its functions.
///
/// # Returns
/// Number of functions registered
///
/// # Errors
/// Returns error if the file can't be read, isn't a valid module, or fails validation
pub fn load_module(
    path: &Path,
    registry: &mut FunctionRegistry,
) -> Result<usize, FunctionLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| FunctionLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let module = FunctionModule::from_yaml(path, &contents)?;
    module.validate(path)?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut count = 0;
    for def in module.functions {
        let name = def.name.clone();
        if registry.has_function(&name) {
            tracing::debug!("Function '{}' from {} shadows a built-in", name, path.display());
        }
        if let Some(function) = FunctionModule::build(def, base_dir) {
            registry.register(name, function);
            count += 1;
        }
    }
    Ok(count)
}

struct LookupFunction {
    name: String,
    table: IndexMap<String, String>,
    default: Option<String>,
    ignore_case: bool,
}

impl LookupFunction {
    fn new(
        name: String,
        table: IndexMap<String, String>,
        default: Option<String>,
        ignore_case: bool,
    ) -> Self {
        let table = if ignore_case {
            table
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v))
                .collect()
        } else {
            table
        };
        Self {
            name,
            table,
            default,
            ignore_case,
        }
    }
}

impl TemplateFunction for LookupFunction {
    fn call(&self, args: &FunctionArgs) -> Result<String, FunctionCallError> {
        args.at_most(&self.name, 1)?;
        let key = args.require(&self.name, 0)?;
        let key = if self.ignore_case { key.to_lowercase() } else { key };

        self.table
            .get(key.trim())
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(|| FunctionCallError::Failed {
                function: self.name.clone(),
                message: format!("no entry for '{}'", key),
            })
    }
}

/// Check that every `{slot}` in a format pattern is closed and named.
fn check_format_pattern(pattern: &str) -> Result<(), String> {
    let mut chars = pattern.char_indices().peekable();
    while let Some((at, c)) = chars.next() {
        match c {
            '{' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                chars.next();
            }
            '}' if chars.peek().is_some_and(|&(_, n)| n == '}') => {
                chars.next();
            }
            '{' => {
                let mut slot = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, '{')) | None => {
                            return Err(format!("unterminated slot at byte {}", at))
                        }
                        Some((_, other)) => slot.push(other),
                    }
                }
                if slot.trim().is_empty() {
                    return Err(format!("empty slot at byte {}", at));
                }
            }
            '}' => return Err(format!("unmatched '}}' at byte {}", at)),
            _ => {}
        }
    }
    Ok(())
}

struct FormatFunction {
    name: String,
    pattern: String,
}

impl TemplateFunction for FormatFunction {
    fn call(&self, args: &FunctionArgs) -> Result<String, FunctionCallError> {
        let mut out = String::with_capacity(self.pattern.len());
        let mut chars = self.pattern.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let slot: String = chars.by_ref().take_while(|&c| c != '}').collect();
                    let value = match slot.parse::<usize>() {
                        Ok(index) => args.text(index),
                        Err(_) => args.named_text(&slot),
                    };
                    let value = value.ok_or_else(|| FunctionCallError::InvalidArgs {
                        function: self.name.clone(),
                        message: format!("no argument for slot '{{{}}}'", slot),
                    })?;
                    out.push_str(&value);
                }
                other => out.push(other),
            }
        }
        Ok(out)
    }
}

struct CommandFunction {
    name: String,
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl TemplateFunction for CommandFunction {
    fn call(&self, args: &FunctionArgs) -> Result<String, FunctionCallError> {
        let extra: Vec<String> = (0..args.positional.len())
            .filter_map(|i| args.text(i))
            .collect();

        let output = Command::new(&self.program)
            .args(&self.args)
            .args(&extra)
            .current_dir(&self.working_dir)
            .output()
            .map_err(|e| FunctionCallError::Failed {
                function: self.name.clone(),
                message: format!("failed to run '{}': {}", self.program, e),
            })?;

        if !output.status.success() {
            return Err(FunctionCallError::Failed {
                function: self.name.clone(),
                message: format!(
                    "'{}' exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
