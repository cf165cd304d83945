//! Lossless parsing for the Jomini/Clausewitz script language.
//!
//! # Example
//!
//! ```
//! use clauser_syntax::{ParseOptions, ParsedSource};
//!
//! let parsed = ParsedSource::parse("color = rgb { 100 200 150 }", ParseOptions::jomini());
//! assert!(!parsed.has_errors());
//! assert_eq!(parsed.syntax().text().to_string(), parsed.source());
//! ```
//!
//! The pipeline is lexer → token source (trivia ownership) → event parser →
//! tree sink (green tree) → red wrappers → typed AST → analysis facts, with
//! every stage's output cached on the [`ParsedSource`] carrier. The same
//! pipeline parses CWTools `.cwt` schema files via
//! [`ParseOptions::schema_dsl`].

pub mod ast;
mod carrier;
pub mod diagnostics;
mod facts;
mod kind;
mod lexer;
mod options;
mod parser;
mod source;
pub mod syntax;

#[cfg(test)]
mod facts_tests;
#[cfg(test)]
mod grammar_tests;
#[cfg(test)]
mod lexer_tests;
#[cfg(test)]
mod scalar_tests;
#[cfg(test)]
mod trivia_tests;

pub use rowan::{TextRange, TextSize};

pub use carrier::ParsedSource;
pub use diagnostics::{Category, Diagnostic, DiagnosticSink, DiagnosticsPrinter, Severity};
pub use facts::{FactId, Facts, FieldFact, ItemFact, ObjectFact, PathSeg, ValueFact};
pub use kind::{ClausewitzLang, SyntaxKind, TokenSet};
pub use lexer::{LexContext, LexOptions, LexOutput, Token, TokenFlags, lex, token_text};
pub use options::{LocalisationCoverage, ParseMode, ParseOptions, UnresolvedPolicy};
pub use source::{BufferedLexer, TokenSource, Trivia, TriviaKind};
pub use syntax::{SyntaxElement, SyntaxNode, SyntaxToken, SyntaxTokenExt, TriviaPiece};
