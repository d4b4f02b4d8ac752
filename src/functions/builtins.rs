//! Built-in template functions, registered in every run.

use chrono::Local;
use uuid::Uuid;

use super::{FunctionArgs, FunctionRegistry, TemplateFunction};
use crate::error::FunctionCallError;

/// Names of every built-in function.
pub const BUILTIN_NAMES: &[&str] = &[
    "uuid",
    "current_date",
    "current_datetime",
    "upper",
    "lower",
    "trim",
    "replace",
    "concat",
];

/// Register all built-ins on `registry`.
pub fn register_builtins(registry: &mut FunctionRegistry) {
    for name in BUILTIN_NAMES {
        if let Some(function) = builtin(name) {
            registry.register(*name, function);
        }
    }
}

/// Look up a built-in by name.
pub fn builtin(name: &str) -> Option<Box<dyn TemplateFunction>> {
    let function: Box<dyn TemplateFunction> = match name {
        "uuid" => Box::new(new_uuid),
        "current_date" => Box::new(current_date),
        "current_datetime" => Box::new(current_datetime),
        "upper" => Box::new(|args: &FunctionArgs| unary(args, "upper", |s| s.to_uppercase())),
        "lower" => Box::new(|args: &FunctionArgs| unary(args, "lower", |s| s.to_lowercase())),
        "trim" => Box::new(|args: &FunctionArgs| unary(args, "trim", |s| s.trim().to_string())),
        "replace" => Box::new(replace),
        "concat" => Box::new(concat),
        _ => return None,
    };
    Some(function)
}

/// Random version-4 UUID.
fn new_uuid(args: &FunctionArgs) -> Result<String, FunctionCallError> {
    args.at_most("uuid", 0)?;
    Ok(Uuid::new_v4().to_string())
}

/// Today's local date, `YYYY-MM-DD`.
fn current_date(args: &FunctionArgs) -> Result<String, FunctionCallError> {
    args.at_most("current_date", 0)?;
    Ok(Local::now().format("%Y-%m-%d").to_string())
}

fn current_datetime(args: &FunctionArgs) -> Result<String, FunctionCallError> {
    args.at_most("current_datetime", 0)?;
    Ok(Local::now().format("%Y-%m-%dT%H:%M:%S").to_string())
}

fn unary(
    args: &FunctionArgs,
    name: &str,
    apply: impl Fn(&str) -> String,
) -> Result<String, FunctionCallError> {
    args.at_most(name, 1)?;
    let text = args.require(name, 0)?;
    Ok(apply(&text))
}

/// `replace(text, from, to)`
fn replace(args: &FunctionArgs) -> Result<String, FunctionCallError> {
    args.at_most("replace", 3)?;
    let text = args.require("replace", 0)?;
    let from = args.require("replace", 1)?;
    let to = args.require("replace", 2)?;
    if from.is_empty() {
        return Err(FunctionCallError::InvalidArgs {
            function: "replace".to_string(),
            message: "pattern must not be empty".to_string(),
        });
    }
    Ok(text.replace(&from, &to))
}

/// `concat(a, b, ..., sep="")`
fn concat(args: &FunctionArgs) -> Result<String, FunctionCallError> {
    let separator = args.named_text("sep").unwrap_or_default();
    let parts: Vec<String> = (0..args.positional.len())
        .filter_map(|i| args.text(i))
        .collect();
    Ok(parts.join(&separator))
}
