//! Compilation environment: the signature registry
//!
//! Declared function signatures live in a per-compilation table keyed by
//! (possibly namespace-qualified) name. A redundant name -> return-type
//! map is kept alongside for call-site lookups.

use std::collections::HashMap;

use crate::types::ValueType;

/// A declared function: name, return type, and ordered typed parameters.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub name: String,
    pub return_type: ValueType,
    /// Parameter names in declaration order.
    pub params: Vec<String>,
    /// Parameter name -> declared type.
    pub param_types: HashMap<String, ValueType>,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>) -> Self {
        FunctionSignature {
            name: name.into(),
            return_type: ValueType::Void,
            params: Vec::new(),
            param_types: HashMap::new(),
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Declared type of the parameter at `index`.
    pub fn param_type(&self, index: usize) -> Option<ValueType> {
        let name = self.params.get(index)?;
        self.param_types.get(name).copied()
    }

    /// Human-readable header used in diagnostics: `name(int, string)->bool`.
    pub fn header(&self) -> String {
        let types: Vec<String> = self
            .params
            .iter()
            .filter_map(|p| self.param_types.get(p))
            .map(|t| t.to_string())
            .collect();
        format!("{}({})->{}", self.name, types.join(", "), self.return_type)
    }
}

/// Per-compilation table of declared signatures.
#[derive(Debug, Default)]
pub struct CompilationEnv {
    signatures: HashMap<String, FunctionSignature>,
    return_types: HashMap<String, ValueType>,
}

impl CompilationEnv {
    pub fn new() -> Self {
        CompilationEnv::default()
    }

    /// Register a signature. A redeclaration overwrites the previous one.
    pub fn declare(&mut self, signature: FunctionSignature) {
        self.return_types
            .insert(signature.name.clone(), signature.return_type);
        self.signatures.insert(signature.name.clone(), signature);
    }

    pub fn signature(&self, name: &str) -> Option<&FunctionSignature> {
        self.signatures.get(name)
    }

    pub fn return_type(&self, name: &str) -> Option<ValueType> {
        self.return_types.get(name).copied()
    }

    /// Resolve a call target. A name not found directly is retried with a
    /// leading `::`, covering calls into the anonymous namespace.
    pub fn resolve(&self, name: &str) -> Option<&FunctionSignature> {
        self.signatures
            .get(name)
            .or_else(|| self.signatures.get(&format!("::{}", name)))
    }
}
