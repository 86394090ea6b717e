//! Lints for form-intake.
//!
//! Submitted values may only leave the process through `RequestLog` or
//! `tracing`, where the request id is attached and field values are never
//! formatted.
//!
//! ## Lints
//!
//! - `NO_STDIO_OUTPUT`: forbids `println!`, `eprintln!`, `print!`,
//!   `eprint!` and `dbg!`.

#![feature(rustc_private)]
#![warn(unused_extern_crates)]

extern crate rustc_ast;
extern crate rustc_lint;
extern crate rustc_session;
extern crate rustc_span;

use rustc_ast::{Expr, ExprKind, MacCall, Stmt, StmtKind};
use rustc_lint::{EarlyContext, EarlyLintPass, LintContext};
use rustc_session::{declare_lint_pass, declare_tool_lint};
use rustc_span::Span;

declare_tool_lint! {
    /// **What it does:** Forbids macros that write straight to stdout or
    /// stderr.
    ///
    /// **Why is this bad?** Output written this way carries no request id and
    /// ignores the log filter. A stray `dbg!(&fields)` prints a visitor's
    /// submission verbatim.
    ///
    /// **Example:**
    /// ```rust,ignore
    /// // Bad
    /// eprintln!("append failed: {err}");
    /// dbg!(&envelope);
    ///
    /// // Good
    /// log.error(format_args!("append failed: {err}"));
    /// ```
    pub intake_lints::NO_STDIO_OUTPUT,
    Deny,
    "use of print!, println!, eprint!, eprintln! or dbg!; use RequestLog or tracing"
}

declare_lint_pass!(NoStdioOutput => [NO_STDIO_OUTPUT]);

impl EarlyLintPass for NoStdioOutput {
    fn check_expr(&mut self, cx: &EarlyContext<'_>, expr: &Expr) {
        if let ExprKind::MacCall(mac) = &expr.kind {
            check_macro(cx, mac, expr.span);
        }
    }

    // `println!(..);` in statement position is a macro statement, not an
    // expression.
    fn check_stmt(&mut self, cx: &EarlyContext<'_>, stmt: &Stmt) {
        if let StmtKind::MacCall(mac) = &stmt.kind {
            check_macro(cx, &mac.mac, stmt.span);
        }
    }
}

fn replacement(name: &str) -> Option<&'static str> {
    match name {
        "print" | "println" => Some("RequestLog::info` or `tracing::info!"),
        "eprint" | "eprintln" => Some("RequestLog::error` or `tracing::error!"),
        "dbg" => Some("RequestLog::debug` or `tracing::debug!"),
        _ => None,
    }
}

fn check_macro(cx: &EarlyContext<'_>, mac: &MacCall, span: Span) {
    let segments = &mac.path.segments;
    let Some(last) = segments.last() else {
        return;
    };
    // Bare or `std::`-qualified only; a crate's own `print!` is its business.
    if segments.len() > 1 && segments[0].ident.name.as_str() != "std" {
        return;
    }

    let name = last.ident.name.as_str();
    let Some(suggestion) = replacement(name) else {
        return;
    };

    cx.span_lint(NO_STDIO_OUTPUT, span, |diag| {
        diag.help(format!("use `{suggestion}`"));
        diag.note(format!("`{name}!` output has no request id and may expose field values"));
    });
}

#[unsafe(no_mangle)]
#[allow(unsafe_code)]
pub extern "C" fn register_lints(_sess: &rustc_session::Session, lint_store: &mut rustc_lint::LintStore) {
    lint_store.register_lints(&[&NO_STDIO_OUTPUT]);
    lint_store.register_early_pass(|| Box::new(NoStdioOutput));
}

#[unsafe(no_mangle)]
pub fn dylint_version() -> *mut std::os::raw::c_char {
    std::ffi::CString::new(dylint_linting::DYLINT_VERSION)
        .expect("version string contains null byte")
        .into_raw()
}
