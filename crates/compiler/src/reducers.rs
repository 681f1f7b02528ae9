//! Token-stream reductions
//!
//! Each pass is a pure `Vec<Token> -> Vec<Token>` transform; `reduce`
//! composes them in a fixed order. Comment stripping runs first, then the
//! literal fusions, then the `::` passes: a `:`+`:` pair must not be fused
//! before a numeric token has had the chance to absorb its sign or its
//! fractional part. Every pass is idempotent on its own output.

use crate::lexer::{Token, is_identifier, is_integer_literal, is_name, is_number_literal};
use tracing::trace;

/// Run all reduction passes in order.
pub fn reduce(tokens: Vec<Token>) -> Vec<Token> {
    let tokens = strip_comments(tokens);
    trace!(count = tokens.len(), "stripped comments");
    let tokens = fuse_signed_integers(tokens);
    let tokens = fuse_floats(tokens);
    trace!(count = tokens.len(), "fused numeric literals");
    let tokens = fuse_scope_operators(tokens);
    let tokens = fuse_namespaced_names(tokens);
    trace!(count = tokens.len(), "fused namespaced names");
    tokens
}

/// Remove `//` line comments (up to, not including, the newline) and
/// `/* ... */` block comments.
pub fn strip_comments(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i] == "/" && i + 1 < tokens.len() {
            if tokens[i + 1] == "/" {
                i += 2;
                while i < tokens.len() && tokens[i] != "\n" {
                    i += 1;
                }
                continue;
            }
            if tokens[i + 1] == "*" {
                i += 2;
                while i + 1 < tokens.len() && !(tokens[i] == "*" && tokens[i + 1] == "/") {
                    i += 1;
                }
                i = (i + 2).min(tokens.len());
                continue;
            }
        }
        out.push(tokens[i].clone());
        i += 1;
    }
    out
}

/// Fold `= - N` into `= -N`. The sign only fuses directly after an
/// assignment, so a `-` anywhere else stays a token of its own.
pub fn fuse_signed_integers(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let n = out.len();
        if is_integer_literal(&token.text) && n >= 2 && out[n - 1] == "-" && out[n - 2] == "=" {
            out.pop();
            let text = format!("-{}", token.text);
            out.push(token.with_text(text));
        } else {
            out.push(token);
        }
    }
    out
}

/// Fold `N . M` into `N.M`. The integral part may carry a sign fused by
/// the previous pass.
pub fn fuse_floats(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let n = out.len();
        if is_integer_literal(&token.text)
            && n >= 2
            && out[n - 1] == "."
            && is_number_literal(&out[n - 2].text)
        {
            out.pop();
            let whole = out.pop().expect("length checked above");
            let text = format!("{}.{}", whole.text, token.text);
            out.push(token.with_text(text));
        } else {
            out.push(token);
        }
    }
    out
}

/// Fold two consecutive `:` tokens into one `::` token.
pub fn fuse_scope_operators(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i] == ":" && i + 1 < tokens.len() && tokens[i + 1] == ":" {
            out.push(tokens[i].with_text("::".to_string()));
            i += 2;
        } else {
            out.push(tokens[i].clone());
            i += 1;
        }
    }
    out
}

/// Fold `a :: b` into `a::b`, repeating while the pattern holds so that
/// `a :: b :: c` collapses into a single token.
pub fn fuse_namespaced_names(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let joins = tokens[i] == "::"
            && i + 1 < tokens.len()
            && is_identifier(&tokens[i + 1].text)
            && out.last().is_some_and(|t| is_name(&t.text));
        if joins {
            let left = out.pop().expect("checked by is_some_and");
            let text = format!("{}::{}", left.text, tokens[i + 1].text);
            out.push(left.with_text(text));
            i += 2;
        } else {
            out.push(tokens[i].clone());
            i += 1;
        }
    }
    out
}
