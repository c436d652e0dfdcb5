//! # Scripting Bridge
//!
//! Adapter between the model front-end and an embedded scripting engine
//! hosting `execute { ... }` blocks. The engine itself is an external
//! collaborator hidden behind [`ScriptEngine`]; the bridge publishes a
//! read-only snapshot of the repository before each block and ingests the
//! block's named results as typed parameters afterwards.
//!
//! An engine instance may be reused across blocks within one session; its
//! internal state carries over so blocks can share helper definitions.

use crate::diagnostics::Diagnostics;
use crate::model::{ModelRepository, Parameter};
use crate::tokenizer::BlockCapture;
use crate::value::{Value, ValueType};
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Failure of one `execute` block.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script exceeded the {0:?} time budget")]
    Timeout(Duration),

    #[error("script runtime error: {0}")]
    Runtime(String),

    #[error("script produced no results mapping")]
    MissingResults,
}

/// Limits the engine is expected to honor while running a block.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScriptLimits {
    pub timeout: Duration,
    pub recursion_limit: usize,
}

/// Read-only view of the repository published to the engine.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Bound scalar parameters as plain values.
    pub parameters: HashMap<String, serde_json::Value>,
    /// Index set ranges, `name -> (start, end)`.
    pub index_sets: HashMap<String, (i64, i64)>,
    /// Declared decision variables: name and dimension count.
    pub variables: Vec<(String, usize)>,
    pub limits: ScriptLimits,
}

/// The embedded engine contract: run one block against a snapshot and
/// return its named outputs.
pub trait ScriptEngine {
    fn run(
        &mut self,
        source: &str,
        snapshot: &Snapshot,
    ) -> Result<HashMap<String, serde_json::Value>, ScriptError>;
}

/// Bridge owning the per-block limits.
#[derive(Debug, Clone)]
pub struct ScriptBridge {
    limits: ScriptLimits,
}

impl ScriptBridge {
    pub fn new(timeout: Duration, recursion_limit: usize) -> Self {
        ScriptBridge {
            limits: ScriptLimits {
                timeout,
                recursion_limit,
            },
        }
    }

    /// Snapshot the current repository state for the engine.
    pub fn snapshot(&self, repo: &ModelRepository) -> Snapshot {
        let mut parameters = HashMap::new();
        for param in repo.parameters() {
            if let Some(value) = param.scalar() {
                let json = match value {
                    Value::Int(v) => serde_json::json!(v),
                    Value::Float(v) => serde_json::json!(v),
                    Value::Str(s) => serde_json::json!(s),
                    Value::Bool(b) => serde_json::json!(b),
                };
                parameters.insert(param.name.clone(), json);
            }
        }
        let mut index_sets = HashMap::new();
        for set in repo.index_sets() {
            index_sets.insert(set.name.clone(), (set.start, set.end));
        }
        let variables = repo
            .variables()
            .map(|v| (v.name.clone(), v.dimensions()))
            .collect();
        Snapshot {
            parameters,
            index_sets,
            variables,
            limits: self.limits,
        }
    }

    /// Run one block and splice its results into the repository. Errors are
    /// recorded against the block's starting line.
    pub fn run_block(
        &self,
        engine: &mut dyn ScriptEngine,
        block: &BlockCapture,
        repo: &mut ModelRepository,
        diags: &mut Diagnostics,
    ) {
        let snapshot = self.snapshot(repo);
        let started = Instant::now();
        let results = match engine.run(&block.body, &snapshot) {
            Ok(results) => results,
            Err(e) => {
                diags.error(block.line, e.to_string(), block.body.trim().to_string());
                return;
            }
        };
        if started.elapsed() > self.limits.timeout {
            diags.error(
                block.line,
                ScriptError::Timeout(self.limits.timeout).to_string(),
                block.body.trim().to_string(),
            );
            return;
        }
        let count = results.len();
        for (name, value) in results {
            match ingest_result(&name, &value) {
                Ok(param) => repo.add_parameter(param),
                Err(e) => diags.error(block.line, e, block.body.trim().to_string()),
            }
        }
        tracing::debug!(
            block = block.name.as_deref().unwrap_or("<anonymous>"),
            results = count,
            "execute block finished"
        );
        diags.success();
    }
}

/// Convert one script output into a bound parameter. Lists flatten to their
/// comma-joined string rendering.
fn ingest_result(name: &str, value: &serde_json::Value) -> Result<Parameter, String> {
    if !crate::parser::is_identifier(name) {
        return Err(format!("script result '{name}' is not a valid identifier"));
    }
    let (vtype, bound) = match value {
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                (ValueType::Int, Value::Int(v))
            } else {
                (
                    ValueType::Float,
                    Value::Float(n.as_f64().unwrap_or_default()),
                )
            }
        }
        serde_json::Value::String(s) => (ValueType::String, Value::Str(s.clone())),
        serde_json::Value::Bool(b) => (ValueType::Bool, Value::Bool(*b)),
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            (ValueType::String, Value::Str(parts.join(",")))
        }
        other => {
            return Err(format!(
                "script result '{name}' has unsupported shape: {other}"
            ))
        }
    };
    let mut param = Parameter::scalar_param(name, vtype, false);
    param
        .set_scalar(bound)
        .map_err(|e| format!("cannot ingest script result '{name}': {e}"))?;
    Ok(param)
}
