// Project Operator Implementation
//
// Evaluates the projection expressions for every input row and binds each
// result to its slot.

use crate::common::{CollectionKind, SlotId};
use crate::query::executor::context::Environment;
use crate::query::executor::expression::Expr;
use crate::query::executor::operators::{not_open, Operator, OperatorRef};
use crate::query::executor::result::QueryResult;

/// Projection operator
pub struct ProjectOperator {
    /// The input operator
    input: OperatorRef,
    /// Target slot and expression for each projected value
    bindings: Vec<(SlotId, Expr)>,
    /// Whether the operator is initialized
    initialized: bool,
}

impl ProjectOperator {
    pub fn new(input: OperatorRef, bindings: Vec<(SlotId, Expr)>) -> Self {
        ProjectOperator {
            input,
            bindings,
            initialized: false,
        }
    }
}

impl Operator for ProjectOperator {
    fn open(&mut self, env: &mut Environment) -> QueryResult<()> {
        self.input.lock().open(env)?;
        self.initialized = true;
        Ok(())
    }

    fn advance(&mut self, env: &mut Environment) -> QueryResult<bool> {
        if !self.initialized {
            return Err(not_open("Project"));
        }
        if !self.input.lock().advance(env)? {
            return Ok(false);
        }
        for (slot, expr) in &self.bindings {
            let value = expr.evaluate(env)?;
            env.set_slot(*slot, value)?;
        }
        Ok(true)
    }

    fn close(&mut self) -> QueryResult<()> {
        self.initialized = false;
        self.input.lock().close()
    }

    fn output_kind(&self) -> CollectionKind {
        self.input.lock().output_kind()
    }
}
