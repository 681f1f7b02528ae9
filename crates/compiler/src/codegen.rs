//! Single-pass assembly generation
//!
//! Recursive descent over the reduced token stream, emitting VM assembly
//! as each construct is recognized. There is no AST: a function is parsed
//! and emitted in one walk, with a `FunctionEnv` threaded through the
//! block recursion carrying the scope chain, the brace balance, and the
//! label counters. The emit buffer is append-only text; callers only see
//! it after the whole stream compiled cleanly.
//!
//! # Register discipline
//!
//! Register 0 is the return slot. Parameters bind to registers 1..=N in
//! declaration order, and every `var` takes the next register after all
//! symbols currently visible on the scope chain, so registers are unique
//! along any root-to-leaf chain within a function.

use std::fmt::Write as _;

use tracing::debug;

use crate::env::{CompilationEnv, FunctionSignature};
use crate::error::CompileError;
use crate::function::FunctionEnv;
use crate::lexer::{Token, is_identifier, is_integer_literal};
use crate::types::ValueType;

/// Non-fatal findings reported alongside the assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    MissingMain,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::MissingMain => write!(f, "no function named 'main' is defined"),
        }
    }
}

/// Result of a successful compilation.
#[derive(Debug)]
pub struct Compilation {
    pub assembly: String,
    pub warnings: Vec<Warning>,
}

/// The parser/emitter. One instance compiles one token stream.
pub struct CodeGen<'t> {
    tokens: &'t [Token],
    pos: usize,
    env: CompilationEnv,
    output: String,
    warnings: Vec<Warning>,
}

impl<'t> CodeGen<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        CodeGen {
            tokens,
            pos: 0,
            env: CompilationEnv::new(),
            output: String::new(),
            warnings: Vec::new(),
        }
    }

    /// Compile the whole stream. At the top level only `function`,
    /// `namespace`, and blank lines are legal.
    pub fn compile(mut self) -> Result<Compilation, CompileError> {
        while let Some(token) = self.current() {
            if *token == "\n" {
                self.pos += 1;
            } else if *token == "function" {
                self.compile_function(None)?;
            } else if *token == "namespace" {
                self.compile_namespace(None)?;
            } else {
                return Err(self.fault(
                    self.pos,
                    format!("unexpected token at top level: '{}'", token.text),
                ));
            }
        }

        if self.env.signature("main").is_none() {
            self.warnings.push(Warning::MissingMain);
        }

        Ok(Compilation {
            assembly: self.output,
            warnings: self.warnings,
        })
    }

    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    fn current(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn fault(&self, index: usize, message: impl Into<String>) -> CompileError {
        let last = self.tokens.len().saturating_sub(1);
        CompileError::invalid_syntax(index.min(last), message)
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<(), CompileError> {
        match self.current() {
            Some(token) if *token == text => {
                self.pos += 1;
                Ok(())
            }
            Some(token) => Err(self.fault(
                self.pos,
                format!(
                    "expected '{}' {}, got '{}'",
                    text,
                    context,
                    token.text.escape_debug()
                ),
            )),
            None => Err(self.fault(
                self.tokens.len(),
                format!("expected '{}' {}, got end of input", text, context),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Declarators
    // ------------------------------------------------------------------

    /// `function NAME ( [TYPE NAME {, TYPE NAME}] ) [-> TYPE] { body }`
    /// or `... ;` for a forward declaration.
    fn compile_function(&mut self, prefix: Option<&str>) -> Result<(), CompileError> {
        let keyword_index = self.pos;
        self.pos += 1;

        let name_index = self.pos;
        let Some(name_token) = self.advance() else {
            return Err(self.fault(keyword_index, "expected function name after 'function'"));
        };
        if !is_identifier(&name_token.text) {
            return Err(self.fault(
                name_index,
                format!("invalid function name '{}'", name_token.text),
            ));
        }
        let name = match prefix {
            Some(prefix) => format!("{}::{}", prefix, name_token.text),
            None => name_token.text.clone(),
        };

        match self.current() {
            Some(token) if *token == "(" => self.pos += 1,
            _ => {
                return Err(self.fault(
                    name_index,
                    format!("missing parameter list in declaration of '{}'", name),
                ));
            }
        }

        let mut signature = FunctionSignature::new(name.as_str());
        loop {
            let Some(token) = self.current() else {
                return Err(self.fault(
                    self.tokens.len(),
                    format!("unterminated parameter list in declaration of '{}'", name),
                ));
            };
            if *token == ")" {
                self.pos += 1;
                break;
            }
            if !signature.params.is_empty() {
                self.expect(",", "between parameters")?;
            }

            let type_index = self.pos;
            let Some(type_token) = self.advance() else {
                return Err(self.fault(type_index, "expected parameter type"));
            };
            let Some(param_type) =
                ValueType::parse(&type_token.text).filter(|t| t.is_declarable())
            else {
                return Err(self.fault(
                    type_index,
                    format!(
                        "invalid parameter type '{}' in declaration of '{}'",
                        type_token.text, name
                    ),
                ));
            };

            let param_index = self.pos;
            let Some(param_token) = self.advance() else {
                return Err(self.fault(param_index, "expected parameter name"));
            };
            if !is_identifier(&param_token.text) {
                return Err(self.fault(
                    param_index,
                    format!("invalid parameter name '{}'", param_token.text),
                ));
            }
            signature.params.push(param_token.text.clone());
            signature
                .param_types
                .insert(param_token.text.clone(), param_type);
        }

        signature.return_type = ValueType::Void;
        if self.current().is_some_and(|t| *t == "-") {
            let arrow_index = self.pos;
            self.pos += 1;
            match self.current() {
                Some(token) if *token == ">" => self.pos += 1,
                _ => {
                    return Err(self.fault(
                        arrow_index,
                        format!("missing return-type arrow in declaration of '{}'", name),
                    ));
                }
            }
            let return_index = self.pos;
            let Some(return_token) = self.advance() else {
                return Err(self.fault(return_index, "expected return type after '->'"));
            };
            let Some(return_type) =
                ValueType::parse(&return_token.text).filter(|t| t.is_return())
            else {
                return Err(self.fault(
                    return_index,
                    format!(
                        "invalid return type '{}' in declaration of '{}'",
                        return_token.text, name
                    ),
                ));
            };
            signature.return_type = return_type;
        }

        let header = signature.header();
        let mut fun = FunctionEnv::new(&signature);
        self.env.declare(signature);

        match self.current() {
            Some(token) if *token == ";" => {
                self.pos += 1;
                return Ok(());
            }
            Some(token) if *token == "{" => self.pos += 1,
            _ => {
                return Err(self.fault(
                    self.pos,
                    format!("expected '{{' or ';' after signature of '{}'", name),
                ));
            }
        }

        debug!(function = %name, "compiling function body");
        fun.begin_balance += 1;
        writeln!(self.output, ".function: {}", name)?;
        for (index, param) in fun.params.iter().enumerate() {
            let register = index + 1;
            writeln!(self.output, "    .name: {} {}", register, param)?;
            writeln!(self.output, "    arg {} {}", register, index)?;
            fun.scopes
                .declare(param, register, fun.param_types[param], "");
        }

        self.compile_block(&mut fun)?;

        if !fun.has_returned {
            if fun.return_type != ValueType::Void {
                return Err(self.fault(
                    self.pos.saturating_sub(1),
                    format!("function {} does not return a value", header),
                ));
            }
            writeln!(self.output, "    end")?;
        }
        writeln!(self.output, ".end")?;
        writeln!(self.output)?;
        Ok(())
    }

    /// `namespace NAME { ... }`. Declared function names are qualified
    /// with the namespace path; namespaces nest.
    fn compile_namespace(&mut self, prefix: Option<&str>) -> Result<(), CompileError> {
        let keyword_index = self.pos;
        self.pos += 1;

        let name_index = self.pos;
        let Some(name_token) = self.advance() else {
            return Err(self.fault(keyword_index, "expected namespace name after 'namespace'"));
        };
        if !is_identifier(&name_token.text) {
            return Err(self.fault(
                name_index,
                format!("invalid namespace name '{}'", name_token.text),
            ));
        }
        let name = match prefix {
            Some(prefix) => format!("{}::{}", prefix, name_token.text),
            None => name_token.text.clone(),
        };

        self.expect("{", &format!("after namespace '{}'", name))?;
        loop {
            let Some(token) = self.current() else {
                return Err(self.fault(
                    self.tokens.len(),
                    format!("unterminated namespace '{}'", name),
                ));
            };
            if *token == "}" {
                self.pos += 1;
                return Ok(());
            }
            if *token == "\n" {
                self.pos += 1;
            } else if *token == "function" {
                self.compile_function(Some(&name))?;
            } else if *token == "namespace" {
                self.compile_namespace(Some(&name))?;
            } else {
                return Err(self.fault(
                    self.pos,
                    format!(
                        "unexpected token in namespace '{}': '{}'",
                        name, token.text
                    ),
                ));
            }
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Consume statements until the block's closing `}` (or the end of the
    /// stream, for the outermost body of a truncated file).
    fn compile_block(&mut self, fun: &mut FunctionEnv) -> Result<(), CompileError> {
        loop {
            let Some(token) = self.current() else {
                return Ok(());
            };
            if *token == "}" {
                fun.begin_balance = fun.begin_balance.saturating_sub(1);
                self.pos += 1;
                return Ok(());
            }
            if *token == "\n" || *token == ";" {
                self.pos += 1;
            } else if *token == "{" {
                fun.begin_balance += 1;
                self.pos += 1;
                fun.scopes.enter();
                self.compile_block(fun)?;
                fun.scopes.exit();
            } else if *token == "var" {
                self.compile_var(fun)?;
            } else if *token == "return" {
                self.compile_return(fun)?;
            } else if *token == "asm" {
                self.compile_asm()?;
            } else if *token == "break" {
                if !fun.in_loop() {
                    return Err(self.fault(self.pos, "'break' outside of a loop"));
                }
                writeln!(self.output, "    jump {}", fun.loop_end)?;
                self.pos += 1;
            } else if *token == "if" {
                self.compile_if(fun)?;
            } else if *token == "while" {
                self.compile_while(fun)?;
            } else {
                self.compile_call_statement(fun)?;
            }
        }
    }

    /// `var TYPE NAME [= VALUE] ;`
    fn compile_var(&mut self, fun: &mut FunctionEnv) -> Result<(), CompileError> {
        let keyword_index = self.pos;
        self.pos += 1;

        let type_index = self.pos;
        let Some(type_token) = self.advance() else {
            return Err(self.fault(keyword_index, "expected type after 'var'"));
        };
        let Some(declared) = ValueType::parse(&type_token.text).filter(|t| t.is_declarable())
        else {
            return Err(self.fault(
                type_index,
                format!("unknown type '{}' in variable declaration", type_token.text),
            ));
        };

        let name_index = self.pos;
        let Some(name_token) = self.advance() else {
            return Err(self.fault(name_index, "expected variable name"));
        };
        if !is_identifier(&name_token.text) {
            return Err(self.fault(
                name_index,
                format!("invalid variable name '{}'", name_token.text),
            ));
        }
        let name = name_token.text.clone();

        let register = fun.scopes.next_register();
        writeln!(self.output, "    .name: {} {}", register, name)?;

        let (value, value_index) = if self.current().is_some_and(|t| *t == "=") {
            self.pos += 1;
            let index = self.pos;
            let Some(value_token) = self.advance() else {
                return Err(self.fault(index, format!("expected initializer for '{}'", name)));
            };
            (value_token.text.clone(), index)
        } else {
            let Some(default) = declared.default_initializer() else {
                return Err(self.fault(
                    name_index,
                    format!("variable '{}' declared 'auto' requires an initializer", name),
                ));
            };
            (default.to_string(), name_index)
        };

        let recorded = if let Some((source_register, source_type)) = fun.scopes.binding(&value) {
            if source_type != declared && declared != ValueType::Auto {
                return Err(self.fault(
                    value_index,
                    format!(
                        "type mismatch: cannot initialize {} variable '{}' from {} '{}'",
                        declared, name, source_type, value
                    ),
                ));
            }
            writeln!(self.output, "    copy {} {}", register, source_register)?;
            source_type
        } else {
            let ty = if declared == ValueType::Auto {
                match ValueType::infer_literal(&value) {
                    Some(ty) => ty,
                    None => {
                        return Err(self.fault(
                            value_index,
                            format!(
                                "cannot infer type of '{}' from initializer '{}'",
                                name, value
                            ),
                        ));
                    }
                }
            } else {
                declared
            };
            match ty {
                ValueType::Int => writeln!(self.output, "    istore {} {}", register, value)?,
                ValueType::String => {
                    writeln!(self.output, "    strstore {} {}", register, value)?;
                }
                ValueType::Float => writeln!(self.output, "    fstore {} {}", register, value)?,
                ValueType::Bool => match value.as_str() {
                    "false" | "0" => {
                        writeln!(self.output, "    not (not (istore {} 0))", register)?;
                    }
                    "true" | "1" => writeln!(self.output, "    not (istore {} 0)", register)?,
                    other => {
                        return Err(
                            self.fault(value_index, format!("invalid bool literal '{}'", other))
                        );
                    }
                },
                ValueType::Void | ValueType::Auto => {
                    return Err(self.fault(
                        value_index,
                        format!("cannot store a value of type {}", ty),
                    ));
                }
            }
            ty
        };

        fun.scopes.declare(&name, register, recorded, &value);
        self.expect(";", "after variable declaration")?;
        Ok(())
    }

    /// `return [VALUE] ;`
    fn compile_return(&mut self, fun: &mut FunctionEnv) -> Result<(), CompileError> {
        let keyword_index = self.pos;
        self.pos += 1;
        fun.has_returned = true;

        match self.current() {
            Some(token) if *token == ";" => {
                self.pos += 1;
                if fun.return_type != ValueType::Void {
                    return Err(self.fault(
                        keyword_index,
                        format!(
                            "function {} must return a value of type {}",
                            fun.name, fun.return_type
                        ),
                    ));
                }
            }
            Some(token) => {
                let value = token.text.clone();
                let value_index = self.pos;
                self.pos += 1;

                if is_integer_literal(&value) {
                    if fun.return_type != ValueType::Int {
                        return Err(self.fault(
                            value_index,
                            format!(
                                "cannot return integer literal from {} function {}",
                                fun.return_type, fun.name
                            ),
                        ));
                    }
                    if value == "0" {
                        writeln!(self.output, "    izero 0")?;
                    } else {
                        writeln!(self.output, "    istore 0 {}", value)?;
                    }
                } else if let Some((register, ty)) = fun.scopes.binding(&value) {
                    if register != 0 {
                        if ty != fun.return_type {
                            return Err(self.fault(
                                value_index,
                                format!(
                                    "return type mismatch in {}: declared {}, '{}' is {}",
                                    fun.name, fun.return_type, value, ty
                                ),
                            ));
                        }
                        writeln!(self.output, "    move 0 {}", register)?;
                    }
                } else {
                    return Err(self.fault(
                        value_index,
                        format!("cannot return '{}': not a visible name or integer literal", value),
                    ));
                }
                self.expect(";", "after return statement")?;
            }
            None => {
                return Err(self.fault(self.tokens.len(), "unexpected end of input after 'return'"));
            }
        }

        writeln!(self.output, "    end")?;
        Ok(())
    }

    /// `asm ... ;` — the tokens pass through verbatim as one instruction
    /// line, newlines excluded.
    fn compile_asm(&mut self) -> Result<(), CompileError> {
        let keyword_index = self.pos;
        self.pos += 1;

        let mut parts: Vec<&str> = Vec::new();
        loop {
            let Some(token) = self.current() else {
                return Err(self.fault(keyword_index, "unterminated 'asm' statement"));
            };
            if *token == ";" {
                self.pos += 1;
                break;
            }
            if *token != "\n" {
                parts.push(&token.text);
            }
            self.pos += 1;
        }
        writeln!(self.output, "    {}", parts.join(" "))?;
        Ok(())
    }

    /// `if NAME { body }` — no `else` in the language.
    fn compile_if(&mut self, fun: &mut FunctionEnv) -> Result<(), CompileError> {
        self.pos += 1;
        let register = self.condition_register(fun, "if")?;
        let label = fun.next_if_label();

        writeln!(self.output, "    branch {} +1 {}", register, label)?;

        self.expect("{", "after 'if' condition")?;
        fun.begin_balance += 1;
        fun.scopes.enter();
        self.compile_block(fun)?;
        fun.scopes.exit();

        writeln!(self.output, "    .mark: {}", label)?;
        Ok(())
    }

    /// `while NAME { body }`
    fn compile_while(&mut self, fun: &mut FunctionEnv) -> Result<(), CompileError> {
        self.pos += 1;
        let register = self.condition_register(fun, "while")?;
        let (begin, end) = fun.next_while_labels();
        let saved = fun.enter_loop(begin.clone(), end.clone());

        writeln!(self.output, "    .mark: {}", begin)?;
        writeln!(self.output, "    branch {} +1 {}", register, end)?;

        self.expect("{", "after 'while' condition")?;
        fun.begin_balance += 1;
        fun.scopes.enter();
        self.compile_block(fun)?;
        fun.scopes.exit();

        writeln!(self.output, "    jump {}", begin)?;
        writeln!(self.output, "    .mark: {}", end)?;

        fun.exit_loop(saved);
        Ok(())
    }

    /// The condition of `if`/`while`: a name visible on the scope chain.
    fn condition_register(
        &mut self,
        fun: &FunctionEnv,
        construct: &str,
    ) -> Result<usize, CompileError> {
        let index = self.pos;
        let Some(token) = self.advance() else {
            return Err(self.fault(index, format!("expected condition after '{}'", construct)));
        };
        if !is_identifier(&token.text) {
            return Err(self.fault(
                index,
                format!(
                    "expected identifier after '{}', got '{}'",
                    construct,
                    token.text.escape_debug()
                ),
            ));
        }
        match fun.scopes.register_of(&token.text) {
            Some(register) => Ok(register),
            None => Err(self.fault(
                index,
                format!("undeclared name '{}' in condition", token.text),
            )),
        }
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    /// Either `NAME ( args ) ;` or `DEST = NAME ( args ) ;`.
    fn compile_call_statement(&mut self, fun: &mut FunctionEnv) -> Result<(), CompileError> {
        let first_index = self.pos;
        let Some(first) = self.advance() else {
            return Err(self.fault(first_index, "expected a statement"));
        };
        let Some(next) = self.current() else {
            return Err(self.fault(first_index, format!("missing tokens after '{}'", first.text)));
        };

        if *next == "=" {
            let Some((destination, destination_type)) = fun.scopes.binding(&first.text) else {
                return Err(
                    self.fault(first_index, format!("undeclared name '{}'", first.text))
                );
            };
            self.pos += 1;

            let callee_index = self.pos;
            let Some(callee) = self.advance() else {
                return Err(self.fault(callee_index, "expected function name after '='"));
            };
            let signature = match self.env.resolve(&callee.text) {
                Some(signature) => signature.clone(),
                None => {
                    return Err(self.fault(
                        callee_index,
                        format!("call to undeclared function '{}'", callee.text),
                    ));
                }
            };

            let returns = self
                .env
                .return_type(&signature.name)
                .unwrap_or(ValueType::Void);
            if returns != destination_type {
                return Err(self.fault(
                    first_index,
                    format!(
                        "type mismatch: '{}' is {} but {} returns {}",
                        first.text,
                        destination_type,
                        signature.header(),
                        returns
                    ),
                ));
            }

            let registers = self.parse_call_args(fun, &signature, callee_index)?;
            self.emit_call(destination, &signature.name, &registers)?;
        } else {
            let signature = match self.env.resolve(&first.text) {
                Some(signature) => signature.clone(),
                None => {
                    return Err(self.fault(
                        first_index,
                        format!("call to undeclared function '{}'", first.text),
                    ));
                }
            };
            let registers = self.parse_call_args(fun, &signature, first_index)?;
            self.emit_call(0, &signature.name, &registers)?;
        }

        self.expect(";", "after call")?;
        Ok(())
    }

    /// Parse `( [NAME {, NAME}] )`, checking each argument against the
    /// callee's signature. Returns the argument registers in order.
    fn parse_call_args(
        &mut self,
        fun: &FunctionEnv,
        signature: &FunctionSignature,
        callee_index: usize,
    ) -> Result<Vec<usize>, CompileError> {
        self.expect("(", &format!("after '{}'", signature.name))?;

        let mut registers = Vec::new();
        loop {
            let Some(token) = self.current() else {
                return Err(self.fault(
                    self.tokens.len(),
                    format!("unterminated argument list in call to {}", signature.header()),
                ));
            };
            if *token == ")" {
                self.pos += 1;
                break;
            }
            if !registers.is_empty() {
                self.expect(",", &format!("in call to {}", signature.header()))?;
            }

            let argument_index = self.pos;
            let Some(argument) = self.advance() else {
                return Err(self.fault(argument_index, "expected argument name"));
            };
            let Some((register, ty)) = fun.scopes.binding(&argument.text) else {
                return Err(self.fault(
                    argument_index,
                    format!(
                        "undeclared name '{}' in call to {}",
                        argument.text,
                        signature.header()
                    ),
                ));
            };

            let position = registers.len();
            if let Some(expected) = signature.param_type(position) {
                if expected != ValueType::Auto && expected != ty {
                    return Err(self.fault(
                        argument_index,
                        format!(
                            "type mismatch for argument {} in call to {}: expected {}, got {}",
                            position,
                            signature.header(),
                            expected,
                            ty
                        ),
                    ));
                }
            }
            registers.push(register);
        }

        if registers.len() != signature.arity() {
            return Err(self.fault(
                callee_index,
                format!(
                    "invalid number of arguments in call to {}: expected {}, got {}",
                    signature.header(),
                    signature.arity(),
                    registers.len()
                ),
            ));
        }
        Ok(registers)
    }

    /// Emit the argument frame and the call itself.
    fn emit_call(
        &mut self,
        return_register: usize,
        name: &str,
        registers: &[usize],
    ) -> Result<(), CompileError> {
        if registers.is_empty() {
            writeln!(self.output, "    frame 0")?;
        } else {
            let params: Vec<String> = registers
                .iter()
                .enumerate()
                .map(|(index, register)| format!("(param {} {})", index, register))
                .collect();
            writeln!(self.output, "    frame ^[{}]", params.join(" "))?;
        }
        writeln!(self.output, "    call {} {}", return_register, name)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::reducers::reduce;

    fn compile(source: &str) -> Result<Compilation, CompileError> {
        let tokens = reduce(tokenize(source));
        CodeGen::new(&tokens).compile()
    }

    fn assembly(source: &str) -> String {
        compile(source).expect("source should compile").assembly
    }

    fn error(source: &str) -> String {
        compile(source).expect_err("source should not compile").to_string()
    }

    #[test]
    fn test_empty_void_function() {
        let asm = assembly("function f() { }");
        assert!(asm.contains(".function: f\n"));
        assert!(asm.contains("    end\n"));
        assert!(asm.contains(".end\n"));
    }

    #[test]
    fn test_parameters_bind_to_registers() {
        let asm = assembly("function f(int a, string b) { }");
        assert!(asm.contains("    .name: 1 a\n    arg 1 0\n"));
        assert!(asm.contains("    .name: 2 b\n    arg 2 1\n"));
    }

    #[test]
    fn test_integer_initializer_and_return() {
        let asm = assembly("function g() -> int { var int x = 7; return x; }");
        assert!(asm.contains("    .name: 1 x\n"));
        assert!(asm.contains("    istore 1 7\n"));
        assert!(asm.contains("    move 0 1\n"));
        assert!(asm.contains("    end\n"));
        assert!(asm.contains(".end\n"));
    }

    #[test]
    fn test_zero_return_uses_izero() {
        let asm = assembly("function h() -> int { return 0; }");
        assert!(asm.contains("    izero 0\n"));
        assert!(!asm.contains("istore"));
    }

    #[test]
    fn test_nonzero_return_uses_istore() {
        let asm = assembly("function h() -> int { return 42; }");
        assert!(asm.contains("    istore 0 42\n"));
    }

    #[test]
    fn test_call_with_assignment() {
        let asm = assembly(
            "function g() -> int;\n\
             function main() -> int { var int r = 0; r = g(); return r; }",
        );
        assert!(asm.contains("    frame 0\n"));
        assert!(asm.contains("    call 1 g\n"));
        assert!(asm.contains("    move 0 1\n"));
    }

    #[test]
    fn test_bare_call_targets_register_zero() {
        let asm = assembly(
            "function ping() { }\n\
             function main() { ping(); }",
        );
        assert!(asm.contains("    frame 0\n    call 0 ping\n"));
    }

    #[test]
    fn test_call_with_arguments_builds_frame() {
        let asm = assembly(
            "function add(int a, int b) { }\n\
             function main() { var int x = 1; var int y = 2; add(x, y); }",
        );
        assert!(asm.contains("    frame ^[(param 0 1) (param 1 2)]\n"));
        assert!(asm.contains("    call 0 add\n"));
    }

    #[test]
    fn test_if_statement() {
        let asm = assembly("function p(bool c) { if c { } }");
        assert!(asm.contains("    branch 1 +1 __p_if_0\n"));
        assert!(asm.contains("    .mark: __p_if_0\n"));
    }

    #[test]
    fn test_if_labels_are_unique() {
        let asm = assembly("function p(bool c) { if c { } if c { } }");
        assert!(asm.contains("__p_if_0"));
        assert!(asm.contains("__p_if_1"));
    }

    #[test]
    fn test_while_with_break() {
        let asm = assembly("function q(bool c) { while c { break; } }");
        let begin = asm.find("    .mark: __q_begin_while_0\n").unwrap();
        let branch = asm.find("    branch 1 +1 __q_end_while_1\n").unwrap();
        let jump_out = asm.find("    jump __q_end_while_1\n").unwrap();
        let jump_back = asm.find("    jump __q_begin_while_0\n").unwrap();
        let end = asm.find("    .mark: __q_end_while_1\n").unwrap();
        assert!(begin < branch && branch < jump_out && jump_out < jump_back && jump_back < end);
    }

    #[test]
    fn test_nested_while_labels_are_unique() {
        let asm = assembly("function q(bool c) { while c { while c { } } }");
        assert!(asm.contains("__q_begin_while_0"));
        assert!(asm.contains("__q_end_while_1"));
        assert!(asm.contains("__q_begin_while_2"));
        assert!(asm.contains("__q_end_while_3"));
    }

    #[test]
    fn test_break_restores_outer_loop_labels() {
        let asm = assembly(
            "function q(bool c) { while c { while c { break; } break; } }",
        );
        assert!(asm.contains("    jump __q_end_while_3\n"));
        assert!(asm.contains("    jump __q_end_while_1\n"));
    }

    #[test]
    fn test_default_initializers() {
        let asm = assembly(
            "function f() {\n\
             var int i;\n\
             var string s;\n\
             var float g;\n\
             var bool b;\n\
             }",
        );
        assert!(asm.contains("    istore 1 0\n"));
        assert!(asm.contains("    strstore 2 ''\n"));
        assert!(asm.contains("    fstore 3 0.0\n"));
        assert!(asm.contains("    not (not (istore 4 0))\n"));
    }

    #[test]
    fn test_bool_true_initializer() {
        let asm = assembly("function f() { var bool b = true; }");
        assert!(asm.contains("    not (istore 1 0)\n"));
    }

    #[test]
    fn test_string_initializer() {
        let asm = assembly("function f() { var string s = 'hi there'; }");
        assert!(asm.contains("    strstore 1 'hi there'\n"));
    }

    #[test]
    fn test_float_initializer_fuses() {
        let asm = assembly("function f() { var float x = 3.14; }");
        assert!(asm.contains("    fstore 1 3.14\n"));
    }

    #[test]
    fn test_negative_integer_initializer() {
        let asm = assembly("function f() { var int x = -7; }");
        assert!(asm.contains("    istore 1 -7\n"));
    }

    #[test]
    fn test_copy_initializer() {
        let asm = assembly("function f() { var int a = 1; var int b = a; }");
        assert!(asm.contains("    copy 2 1\n"));
    }

    #[test]
    fn test_auto_adopts_source_type() {
        let asm = assembly(
            "function f() -> string {\n\
             var string s = 'x';\n\
             var auto t = s;\n\
             return t;\n\
             }",
        );
        assert!(asm.contains("    copy 2 1\n"));
        assert!(asm.contains("    move 0 2\n"));
    }

    #[test]
    fn test_auto_infers_literal_types() {
        let asm = assembly(
            "function f() {\n\
             var auto i = 9;\n\
             var auto s = 'txt';\n\
             var auto b = false;\n\
             }",
        );
        assert!(asm.contains("    istore 1 9\n"));
        assert!(asm.contains("    strstore 2 'txt'\n"));
        assert!(asm.contains("    not (not (istore 3 0))\n"));
    }

    #[test]
    fn test_nested_block_registers_do_not_collide() {
        let asm = assembly(
            "function f() {\n\
             var int a = 1;\n\
             {\n\
             var int b = 2;\n\
             }\n\
             var int c = 3;\n\
             }",
        );
        assert!(asm.contains("    .name: 1 a\n"));
        assert!(asm.contains("    .name: 2 b\n"));
        // b's scope closed before c was declared, so its register is reused
        assert!(asm.contains("    .name: 2 c\n"));
    }

    #[test]
    fn test_asm_passthrough() {
        let asm = assembly("function f() { asm print 1; }");
        assert!(asm.contains("    print 1\n"));
    }

    #[test]
    fn test_forward_declaration_emits_nothing() {
        let compilation = compile("function g() -> int;").unwrap();
        assert!(compilation.assembly.is_empty());
    }

    #[test]
    fn test_namespace_qualifies_declared_names() {
        let asm = assembly("namespace io { function put() { } }");
        assert!(asm.contains(".function: io::put\n"));
    }

    #[test]
    fn test_nested_namespace_prefixes_join() {
        let asm = assembly("namespace a { namespace b { function f() { } } }");
        assert!(asm.contains(".function: a::b::f\n"));
    }

    #[test]
    fn test_call_into_namespace() {
        let asm = assembly(
            "namespace io { function put() { } }\n\
             function main() { io::put(); }",
        );
        assert!(asm.contains("    call 0 io::put\n"));
    }

    #[test]
    fn test_function_and_end_are_balanced() {
        let asm = assembly(
            "function a() { }\n\
             function b() { }\n\
             function main() { }",
        );
        assert_eq!(asm.matches(".function:").count(), 3);
        assert_eq!(asm.matches("\n.end\n").count(), 3);
    }

    #[test]
    fn test_missing_main_warning() {
        let compilation = compile("function f() { }").unwrap();
        assert_eq!(compilation.warnings, vec![Warning::MissingMain]);

        let compilation = compile("function main() { }").unwrap();
        assert!(compilation.warnings.is_empty());
    }

    #[test]
    fn test_forward_declaration_satisfies_main_check() {
        let compilation = compile("function main() -> int;").unwrap();
        assert!(compilation.warnings.is_empty());
    }

    // ------------------------------------------------------------------
    // Faults
    // ------------------------------------------------------------------

    #[test]
    fn test_return_value_in_void_function_faults() {
        let err = error("function f() { return 1; }");
        assert!(err.contains("cannot return integer literal"), "{}", err);
    }

    #[test]
    fn test_bare_return_in_nonvoid_function_faults() {
        let err = error("function f() -> int { return; }");
        assert!(err.contains("must return a value"), "{}", err);
    }

    #[test]
    fn test_nonvoid_function_without_return_faults() {
        let err = error("function f() -> int { }");
        assert!(err.contains("does not return a value"), "{}", err);
    }

    #[test]
    fn test_break_outside_loop_faults() {
        let err = error("function f() { break; }");
        assert!(err.contains("'break' outside of a loop"), "{}", err);
    }

    #[test]
    fn test_auto_without_initializer_faults() {
        let err = error("function f() { var auto x; }");
        assert!(err.contains("requires an initializer"), "{}", err);
    }

    #[test]
    fn test_call_to_undeclared_function_faults() {
        let err = error("function main() { z(); }");
        assert!(err.contains("call to undeclared function 'z'"), "{}", err);
    }

    #[test]
    fn test_arity_mismatch_faults() {
        let err = error(
            "function f(int a) { }\n\
             function main() { var int x = 0; f(x, x); }",
        );
        assert!(err.contains("invalid number of arguments"), "{}", err);
        assert!(err.contains("f(int)->void"), "{}", err);
    }

    #[test]
    fn test_argument_type_mismatch_faults() {
        let err = error(
            "function f(int a) { }\n\
             function main() { var string s = 'x'; f(s); }",
        );
        assert!(err.contains("expected int, got string"), "{}", err);
    }

    #[test]
    fn test_undeclared_argument_faults() {
        let err = error(
            "function f(int a) { }\n\
             function main() { f(ghost); }",
        );
        assert!(err.contains("undeclared name 'ghost'"), "{}", err);
    }

    #[test]
    fn test_assignment_return_type_mismatch_faults() {
        let err = error(
            "function g() -> string;\n\
             function main() { var int r = 0; r = g(); }",
        );
        assert!(err.contains("returns string"), "{}", err);
    }

    #[test]
    fn test_initializer_type_mismatch_faults() {
        let err = error("function f() { var string s = 'x'; var int n = s; }");
        assert!(err.contains("type mismatch"), "{}", err);
    }

    #[test]
    fn test_uninferable_auto_initializer_faults() {
        let err = error("function f() { var auto x = 3.14; }");
        assert!(err.contains("cannot infer type"), "{}", err);
    }

    #[test]
    fn test_invalid_bool_literal_faults() {
        let err = error("function f() { var bool b = maybe; }");
        assert!(err.contains("invalid bool literal"), "{}", err);
    }

    #[test]
    fn test_undeclared_condition_faults() {
        let err = error("function f() { if ghost { } }");
        assert!(err.contains("undeclared name 'ghost'"), "{}", err);
    }

    #[test]
    fn test_unexpected_top_level_token_faults() {
        let err = error("var int x = 1;");
        assert!(err.contains("unexpected token at top level"), "{}", err);
    }

    #[test]
    fn test_unexpected_token_in_namespace_faults() {
        let err = error("namespace n { var int x = 1; }");
        assert!(err.contains("unexpected token in namespace"), "{}", err);
    }

    #[test]
    fn test_missing_parameter_list_faults() {
        let err = error("function f { }");
        assert!(err.contains("missing parameter list"), "{}", err);
    }

    #[test]
    fn test_broken_return_arrow_faults() {
        let err = error("function f() - int { }");
        assert!(err.contains("missing return-type arrow"), "{}", err);
    }

    #[test]
    fn test_invalid_parameter_type_faults() {
        let err = error("function f(word w) { }");
        assert!(err.contains("invalid parameter type 'word'"), "{}", err);
    }

    #[test]
    fn test_void_parameter_faults() {
        let err = error("function f(void v) { }");
        assert!(err.contains("invalid parameter type 'void'"), "{}", err);
    }

    #[test]
    fn test_auto_return_type_faults() {
        let err = error("function f() -> auto { }");
        assert!(err.contains("invalid return type 'auto'"), "{}", err);
    }

    #[test]
    fn test_missing_tokens_after_name_faults() {
        let err = error("function f() { g");
        assert!(err.contains("missing tokens after 'g'"), "{}", err);
    }

    #[test]
    fn test_fault_carries_token_index() {
        let source = "function f() { break; }";
        let tokens = reduce(tokenize(source));
        let err = CodeGen::new(&tokens).compile().unwrap_err();
        let index = err.token_index().unwrap();
        assert_eq!(tokens[index].text, "break");
    }
}
