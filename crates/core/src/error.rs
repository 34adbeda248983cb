//! Error & context.
//!
//! A single global error slot holds the most recent fault. Compile-category
//! faults are recoverable: callers check `has_error`/`take_error` and keep
//! going. Runtime-category faults are fatal: the caller is expected to print
//! the formatted banner and abort the process (see [`ErrorCategory::is_fatal`]).
//!
//! A thread-local slot gives FFI-safe error reporting, widened here to a
//! typed error-category taxonomy, plus a bounded error-context stack
//! (`bread_error_context_push`/`pop`) kept for "while checking call to X"
//! style diagnostics.

use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::{Path, PathBuf};

/// Taxonomy of faults a BreadLang program can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCategory {
    TypeMismatch,
    IndexOutOfBounds,
    DivisionByZero,
    UndefinedVariable,
    MemoryAllocation,
    RuntimeError,
    SyntaxError,
    ParseError,
    CompileError,
}

impl ErrorCategory {
    /// Runtime categories abort the process after printing; compile
    /// categories accumulate and fail the pass without aborting.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorCategory::IndexOutOfBounds
                | ErrorCategory::DivisionByZero
                | ErrorCategory::RuntimeError
                | ErrorCategory::MemoryAllocation
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::TypeMismatch => "Type Mismatch",
            ErrorCategory::IndexOutOfBounds => "Index Out of Bounds",
            ErrorCategory::DivisionByZero => "Division by Zero",
            ErrorCategory::UndefinedVariable => "Undefined Variable",
            ErrorCategory::MemoryAllocation => "Memory Allocation Error",
            ErrorCategory::RuntimeError => "Runtime Error",
            ErrorCategory::SyntaxError => "Syntax Error",
            ErrorCategory::ParseError => "Parse Error",
            ErrorCategory::CompileError => "Compile Error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single located fault, as stored in the global error slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreadError {
    pub category: ErrorCategory,
    pub message: String,
    pub file: Option<PathBuf>,
    pub line: usize,
    pub column: usize,
    /// The offending source line, used for the caret banner.
    pub context: Option<String>,
}

impl BreadError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        BreadError {
            category,
            message: message.into(),
            file: None,
            line: 0,
            column: 0,
            context: None,
        }
    }

    pub fn at(mut self, file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        self.file = Some(file.into());
        self.line = line;
        self.column = column;
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Full diagnostic banner:
    /// `"<category> at <file>:<line>:<col>: <message>\nContext: <line-source>\n        ^"`
    pub fn to_banner(&self) -> String {
        let mut out = String::new();
        out.push_str(self.category.as_str());
        if let Some(file) = &self.file {
            out.push_str(&format!(" at {}:{}:{}", file.display(), self.line, self.column));
        }
        out.push_str(&format!(": {}", self.message));
        if let Some(context) = &self.context {
            out.push_str(&format!("\nContext: {}\n", context));
            let caret_pad = self.column.saturating_sub(1);
            out.push_str(&" ".repeat("Context: ".len() + caret_pad));
            out.push('^');
        }
        out
    }
}

impl fmt::Display for BreadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_banner())
    }
}

impl std::error::Error for BreadError {}

/// Bounded "while checking X" context stack, kept from the original C
/// implementation's `bread_error_context_push/pop`. Depth-capped so a
/// runaway recursive checker can't grow this unbounded.
const MAX_ERROR_CONTEXT_DEPTH: usize = 32;

#[derive(Debug, Clone)]
pub struct ErrorContextFrame {
    pub file: Option<PathBuf>,
    pub line: usize,
    pub column: usize,
    pub function: String,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<BreadError>> = const { RefCell::new(None) };
    static COMPILATION_FAILED: Cell<bool> = const { Cell::new(false) };
    static CONTEXT_STACK: RefCell<Vec<ErrorContextFrame>> = const { RefCell::new(Vec::new()) };
}

/// Replace the global error slot, matching `bread_error_set`.
/// Compile categories also set the sticky `compilation_failed` flag.
pub fn set_error(error: BreadError) {
    if error.category.is_fatal() {
        tracing::error!(category = %error.category, "{}", error.message);
    } else {
        tracing::debug!(category = %error.category, "{}", error.message);
        COMPILATION_FAILED.with(|f| f.set(true));
    }
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(error));
}

pub fn clear_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

pub fn has_error() -> bool {
    LAST_ERROR.with(|slot| slot.borrow().is_some())
}

pub fn take_error() -> Option<BreadError> {
    LAST_ERROR.with(|slot| slot.borrow_mut().take())
}

pub fn peek_error() -> Option<BreadError> {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

pub fn compilation_failed() -> bool {
    COMPILATION_FAILED.with(|f| f.get())
}

pub fn mark_compilation_failed() {
    COMPILATION_FAILED.with(|f| f.set(true));
}

pub fn reset_compilation_state() {
    COMPILATION_FAILED.with(|f| f.set(false));
}

/// RAII guard that pushes a context frame on creation and pops it on drop,
/// so "while type-checking call to 'f'" context survives early returns.
pub struct ErrorContextGuard {
    _private: (),
}

impl ErrorContextGuard {
    pub fn push(file: Option<&Path>, line: usize, column: usize, function: impl Into<String>) -> Self {
        CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.len() < MAX_ERROR_CONTEXT_DEPTH {
                stack.push(ErrorContextFrame {
                    file: file.map(Path::to_path_buf),
                    line,
                    column,
                    function: function.into(),
                });
            }
        });
        ErrorContextGuard { _private: () }
    }
}

impl Drop for ErrorContextGuard {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

pub fn current_context() -> Option<ErrorContextFrame> {
    CONTEXT_STACK.with(|stack| stack.borrow().last().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_has_category_location_and_caret() {
        clear_error();
        let err = BreadError::new(ErrorCategory::DivisionByZero, "division by zero")
            .at("main.bread", 5, 9)
            .with_context("let c = a / b");
        let banner = err.to_banner();
        assert!(banner.starts_with("Division by Zero at main.bread:5:9: division by zero"));
        assert!(banner.contains("Context: let c = a / b"));
        assert!(banner.ends_with('^'));
    }

    #[test]
    fn compile_categories_are_not_fatal_and_set_sticky_flag() {
        reset_compilation_state();
        assert!(!compilation_failed());
        set_error(BreadError::new(ErrorCategory::TypeMismatch, "bad type"));
        assert!(compilation_failed());
        assert!(!ErrorCategory::TypeMismatch.is_fatal());
    }

    #[test]
    fn runtime_categories_are_fatal() {
        assert!(ErrorCategory::DivisionByZero.is_fatal());
        assert!(ErrorCategory::IndexOutOfBounds.is_fatal());
        assert!(ErrorCategory::RuntimeError.is_fatal());
        assert!(ErrorCategory::MemoryAllocation.is_fatal());
    }

    #[test]
    fn take_error_clears_slot() {
        set_error(BreadError::new(ErrorCategory::RuntimeError, "boom"));
        assert!(has_error());
        let taken = take_error();
        assert!(taken.is_some());
        assert!(!has_error());
    }

    #[test]
    fn context_guard_pushes_and_pops() {
        assert!(current_context().is_none());
        {
            let _g = ErrorContextGuard::push(None, 1, 1, "checking add");
            let ctx = current_context().expect("context present");
            assert_eq!(ctx.function, "checking add");
        }
        assert!(current_context().is_none());
    }
}
