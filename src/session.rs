//! # Model Session
//!
//! One parse run: a session owns a repository and a diagnostics collector,
//! and drives the pipeline
//!
//! ```text
//! model text -> tokenizer -> dispatcher -> repository
//! data text  -> binder ----------------------^
//! expansion: templates -> scalar constraints
//! ```
//!
//! The core is single-threaded and synchronous; a UI hosting several
//! concurrent parses must give each its own session.

use crate::config::Config;
use crate::data::bind_data_statement;
use crate::diagnostics::Diagnostics;
use crate::expand::expand_all;
use crate::model::ModelRepository;
use crate::parser::decl::parse_tuple_schema;
use crate::parser::{dispatch_statement, Recognition};
use crate::script::{ScriptBridge, ScriptEngine};
use crate::tokenizer::{split_data_source, split_model_source};
use std::time::Duration;

/// A complete parse session over one model and zero or more data files.
pub struct ModelSession {
    pub repository: ModelRepository,
    pub diagnostics: Diagnostics,
    config: Config,
    engine: Option<Box<dyn ScriptEngine>>,
}

impl ModelSession {
    pub fn new(config: Config) -> Self {
        ModelSession {
            repository: ModelRepository::new(),
            diagnostics: Diagnostics::new(),
            config,
            engine: None,
        }
    }

    /// Install the embedded scripting engine used by `execute` blocks.
    pub fn with_engine(mut self, engine: Box<dyn ScriptEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Parse model statements in file order. Tuple schema blocks are lifted
    /// out first; `execute` blocks run through the scripting bridge before
    /// the remaining statements are dispatched.
    pub fn parse_model(&mut self, source: &str) {
        let split = match split_model_source(source) {
            Ok(split) => split,
            Err(e) => {
                self.diagnostics.error(1, e, String::new());
                return;
            }
        };

        for block in &split.tuple_blocks {
            let name = block.name.clone().unwrap_or_default();
            match parse_tuple_schema(&name, &block.body) {
                Ok(schema) => {
                    self.repository.add_tuple_schema(schema);
                    self.diagnostics.success();
                }
                Err(e) => self.diagnostics.error(block.line, e, block.body.clone()),
            }
        }

        if !split.execute_blocks.is_empty() {
            let bridge = ScriptBridge::new(
                Duration::from_secs(self.config.limits.script_timeout_secs),
                self.config.limits.script_recursion_limit,
            );
            match self.engine.as_mut() {
                Some(engine) => {
                    for block in &split.execute_blocks {
                        bridge.run_block(
                            engine.as_mut(),
                            block,
                            &mut self.repository,
                            &mut self.diagnostics,
                        );
                    }
                }
                None => {
                    for block in &split.execute_blocks {
                        self.diagnostics.error(
                            block.line,
                            "no scripting engine installed for execute block",
                            block.body.trim().to_string(),
                        );
                    }
                }
            }
        }

        let mut accepted = 0usize;
        for stmt in &split.statements {
            match dispatch_statement(
                &stmt.text,
                stmt.line,
                &mut self.repository,
                &self.config.limits,
            ) {
                Recognition::Accepted => {
                    accepted += 1;
                    self.diagnostics.success();
                }
                Recognition::Rejected(message) => {
                    self.diagnostics.error(stmt.line, message, stmt.text.clone());
                }
                Recognition::NotMine => unreachable!("dispatcher always resolves"),
            }
        }
        tracing::info!(
            statements = split.statements.len(),
            accepted,
            errors = self.diagnostics.errors().len(),
            "model parsed"
        );
    }

    /// Bind data statements in file order, after all model statements.
    pub fn bind_data(&mut self, source: &str) {
        for stmt in split_data_source(source) {
            match bind_data_statement(&stmt.text, &mut self.repository) {
                Ok(()) => self.diagnostics.success(),
                Err(e) => self.diagnostics.error(stmt.line, e, stmt.text.clone()),
            }
        }
    }

    /// Expand templates into scalar constraints. Externals still unbound at
    /// this point are reported first.
    pub fn expand(&mut self) {
        let unbound: Vec<String> = self
            .repository
            .parameters()
            .filter(|p| p.external && !p.is_bound())
            .map(|p| p.name.clone())
            .collect();
        for name in unbound {
            self.diagnostics.error(
                0,
                format!("missing binding for external parameter '{name}'"),
                String::new(),
            );
        }
        expand_all(
            &mut self.repository,
            &mut self.diagnostics,
            &self.config.limits,
        );
    }

    /// Full pipeline: parse, bind, expand.
    pub fn compile(&mut self, model: &str, data: Option<&str>) {
        self.parse_model(model);
        if let Some(data) = data {
            self.bind_data(data);
        }
        self.expand();
    }

    /// Human-readable repository report.
    pub fn report(&self) -> String {
        self.repository.generate_report()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Reset the repository and diagnostics, keeping config and engine.
    pub fn clear(&mut self) {
        self.repository.clear();
        self.diagnostics.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ModelSession {
        ModelSession::new(Config::default())
    }

    #[test]
    fn test_compile_scalar_lp() {
        let mut s = session();
        s.compile(
            "dvar float+ x; dvar float+ y;\n\
             maximize 3*x + 5*y;\n\
             c1: x + y <= 10;\n\
             c2: 2*x + y <= 15;",
            None,
        );
        assert!(!s.has_errors(), "{}", s.diagnostics.render());
        assert_eq!(s.repository.equations().len(), 2);
        assert!(s.repository.objective().is_some());
    }

    #[test]
    fn test_data_file_binding_order() {
        let mut s = session();
        s.compile(
            "range I = 1..3;\n\
             dvar float+ x[I];\n\
             float cap[I] = ...;\n\
             forall(i in I) lim[i]: x[i] <= cap[i];",
            Some("cap = [5, 7, 9];"),
        );
        assert!(!s.has_errors(), "{}", s.diagnostics.render());
        assert_eq!(s.repository.equations().len(), 3);
    }

    #[test]
    fn test_missing_external_is_reported() {
        let mut s = session();
        s.compile("float price = ...;", None);
        assert!(s.has_errors());
        assert!(s
            .diagnostics
            .render()
            .contains("missing binding for external parameter 'price'"));
    }

    #[test]
    fn test_errors_do_not_halt_parsing() {
        let mut s = session();
        s.parse_model(
            "dvar float+ x;\n\
             garbage statement here;\n\
             c1: x <= 4;",
        );
        assert!(s.has_errors());
        assert_eq!(s.repository.equations().len(), 1);
        assert!(s.diagnostics.is_partial());
    }

    #[test]
    fn test_execute_without_engine_is_diagnosed() {
        let mut s = session();
        s.parse_model("execute { results.n = 1; }\ndvar float+ x;\nc: x <= 1;");
        assert!(s.has_errors());
        assert!(s
            .diagnostics
            .render()
            .contains("no scripting engine installed"));
    }
}
