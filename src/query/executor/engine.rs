// Query Execution Engine Implementation
//
// This module drives a compiled plan: it allocates the register context,
// opens the operator tree, pulls rows through the result expression and
// assembles them into the statement's result collection.

use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::common::CollectionKind;
use crate::query::executor::context::Environment;
use crate::query::executor::expression::Expr;
use crate::query::executor::operators::OperatorRef;
use crate::query::executor::result::QueryResult;
use crate::value::Value;

/// How row-level type errors are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TypingMode {
    /// Type errors abort the statement
    #[serde(alias = "Legacy")]
    Strict,
    /// Type errors in an expression evaluate to MISSING
    #[default]
    Permissive,
}

/// Configuration for statement execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub typing_mode: TypingMode,

    /// Upper bound on rows a blocking operator may buffer
    pub max_materialized_rows: Option<usize>,

    /// Emit a progress message every N produced rows
    pub log_progress_every: Option<usize>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            typing_mode: TypingMode::Permissive,
            max_materialized_rows: None,
            log_progress_every: None,
        }
    }
}

/// A compiled query: the operator tree, the expression producing each output
/// value from the bound registers, and one entry per declared binding.
pub struct QueryPlan {
    pub root: OperatorRef,
    pub result: Expr,
    /// Register layout of the global scope; `Some(name)` is resolvable by name
    pub bindings: Vec<Option<String>>,
}

impl QueryPlan {
    pub fn new(root: OperatorRef, result: Expr, bindings: Vec<Option<String>>) -> Self {
        QueryPlan { root, result, bindings }
    }
}

impl std::fmt::Debug for QueryPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryPlan")
            .field("result", &self.result)
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum Statement {
    Query(QueryPlan),
    /// An expression with no FROM clause to drive it
    Expression(Expr),
}

pub struct ExecutionEngine {
    config: ExecutionConfig,
}

impl ExecutionEngine {
    pub fn new(config: ExecutionConfig) -> Self {
        ExecutionEngine { config }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Run a statement to completion.
    pub fn execute(&self, statement: Statement) -> QueryResult<Value> {
        match statement {
            Statement::Query(plan) => self.execute_query(plan),
            Statement::Expression(expr) => {
                let mut env = Environment::from_config(Vec::new(), &self.config);
                expr.evaluate(&mut env).inspect_err(|e| error!("Expression evaluation failed: {}", e))
            }
        }
    }

    fn execute_query(&self, plan: QueryPlan) -> QueryResult<Value> {
        let cursor = self.open_cursor(plan)?;
        let kind = cursor.kind();
        let rows = cursor.collect::<QueryResult<Vec<Value>>>()?;
        Ok(match kind {
            CollectionKind::List => Value::list(rows),
            CollectionKind::Bag => Value::bag(rows),
        })
    }

    /// Open the plan and hand back a cursor the caller pulls rows from.
    pub fn open_cursor(&self, plan: QueryPlan) -> QueryResult<ResultCursor> {
        let QueryPlan { root, result, bindings } = plan;
        debug!(
            "Opening query with {} bindings in {:?} mode",
            bindings.len(),
            self.config.typing_mode
        );
        let mut env = Environment::from_config(bindings, &self.config);

        let opened = root.lock().open(&mut env);
        if let Err(e) = opened {
            error!("Query failed during open: {}", e);
            if let Err(close_error) = root.lock().close() {
                warn!("Failed to close operator tree after error: {}", close_error);
            }
            return Err(e);
        }

        let kind = root.lock().output_kind();
        Ok(ResultCursor {
            root,
            result,
            env,
            kind,
            produced: 0,
            log_progress_every: self.config.log_progress_every,
            finished: false,
        })
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new(ExecutionConfig::default())
    }
}

/// Pull-driven access to a query's output. The operator tree is closed when
/// the cursor is exhausted, hits an error, or is dropped.
pub struct ResultCursor {
    root: OperatorRef,
    result: Expr,
    env: Environment,
    kind: CollectionKind,
    produced: usize,
    log_progress_every: Option<usize>,
    finished: bool,
}

impl ResultCursor {
    /// Whether the output is ordered
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// Rows produced so far
    pub fn produced(&self) -> usize {
        self.produced
    }

    fn finish(&mut self) -> QueryResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.root.lock().close()
    }

    fn next_row(&mut self) -> QueryResult<Option<Value>> {
        let advanced = self.root.lock().advance(&mut self.env)?;
        if !advanced {
            return Ok(None);
        }
        let value = self.result.evaluate(&mut self.env)?;
        self.produced += 1;
        if let Some(every) = self.log_progress_every {
            if every > 0 && self.produced % every == 0 {
                debug!("Produced {} rows", self.produced);
            }
        }
        Ok(Some(value))
    }
}

impl Iterator for ResultCursor {
    type Item = QueryResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_row() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => {
                debug!("Query finished with {} rows", self.produced);
                self.finish().err().map(Err)
            }
            Err(e) => {
                error!("Query failed after {} rows: {}", self.produced, e);
                if let Err(close_error) = self.finish() {
                    warn!("Failed to close operator tree after error: {}", close_error);
                }
                Some(Err(e))
            }
        }
    }
}

impl Drop for ResultCursor {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!("Failed to close operator tree: {}", e);
        }
    }
}
