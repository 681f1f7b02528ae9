//! Per-function code generation state

use std::collections::HashMap;

use crate::env::FunctionSignature;
use crate::scope::ScopeStack;
use crate::types::ValueType;

/// Everything the block processor needs while inside one function body:
/// the signature data, the scope chain, brace balance, the return flag,
/// and the label counters for conditionals and loops.
#[derive(Debug)]
pub struct FunctionEnv {
    pub name: String,
    pub params: Vec<String>,
    pub param_types: HashMap<String, ValueType>,
    pub return_type: ValueType,
    /// Set by the first `return` statement and never cleared.
    pub has_returned: bool,
    /// Count of currently unmatched `{`.
    pub begin_balance: usize,
    ifs: usize,
    whiles: usize,
    /// Labels of the nearest enclosing loop; empty outside any loop.
    pub loop_begin: String,
    pub loop_end: String,
    pub scopes: ScopeStack,
}

impl FunctionEnv {
    pub fn new(signature: &FunctionSignature) -> Self {
        FunctionEnv {
            name: signature.name.clone(),
            params: signature.params.clone(),
            param_types: signature.param_types.clone(),
            return_type: signature.return_type,
            has_returned: false,
            begin_balance: 0,
            ifs: 0,
            whiles: 0,
            loop_begin: String::new(),
            loop_end: String::new(),
            scopes: ScopeStack::new(),
        }
    }

    pub fn in_loop(&self) -> bool {
        !self.loop_end.is_empty()
    }

    /// Mint the jump-over label for the next `if`.
    pub fn next_if_label(&mut self) -> String {
        let label = format!("__{}_if_{}", self.name, self.ifs);
        self.ifs += 1;
        label
    }

    /// Mint the begin/end label pair for the next `while`. Both come from
    /// one fresh counter value and the counter advances past both, so
    /// nested and sequential loops can never collide.
    pub fn next_while_labels(&mut self) -> (String, String) {
        let k = self.whiles;
        self.whiles += 2;
        (
            format!("__{}_begin_while_{}", self.name, k),
            format!("__{}_end_while_{}", self.name, k + 1),
        )
    }

    /// Make `begin`/`end` the current loop labels, returning the previous
    /// pair for `exit_loop` to restore.
    pub fn enter_loop(&mut self, begin: String, end: String) -> (String, String) {
        (
            std::mem::replace(&mut self.loop_begin, begin),
            std::mem::replace(&mut self.loop_end, end),
        )
    }

    pub fn exit_loop(&mut self, saved: (String, String)) {
        self.loop_begin = saved.0;
        self.loop_end = saved.1;
    }
}
