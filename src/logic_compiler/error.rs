// Compiler Error Handling

use std::fmt;
use std::rc::Rc;

/// File name and 1-based line number of a token or directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: Rc<str>,
    pub line: usize,
}

impl SourceLocation {
    pub fn new(file: Rc<str>, line: usize) -> Self {
        SourceLocation { file, line }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Clone)]
pub enum CompilerError {
    // Lexical errors
    UnterminatedComment(SourceLocation),
    UnterminatedLiteral(SourceLocation),

    // Directive errors
    InvalidDirective(SourceLocation),
    UnknownDirective(String, SourceLocation),
    DirectiveError(String, SourceLocation),
    UnmatchedConditional(String, SourceLocation), // directive, position
    MacroRedefined(String, SourceLocation),
    MacroNotDefined(String, SourceLocation),
    IncludeError(String, String, SourceLocation), // path, reason, position

    // Preprocessor expression errors
    ExpressionError(String, SourceLocation),

    // Parse errors
    ParseError(String, SourceLocation),
    UnexpectedToken(String, SourceLocation),
    ExpectedToken(String, String, SourceLocation), // expected, found, position
    UnexpectedEndOfInput(String, SourceLocation),  // expected, last position
    UnknownCommand(String, SourceLocation),
    WrongArity(String, usize, usize, SourceLocation), // command, expected, found, position
    TypeMismatch(String, String, SourceLocation),     // expected, found, position
    InvalidAssignment(String, SourceLocation),
    InvalidComparison(String, SourceLocation),
    UndefinedSymbol(String, SourceLocation),
    DuplicateSymbol(String, SourceLocation),
    ValueOutOfRange(i64, String, SourceLocation), // value, operand kind, position

    // Code generation errors
    DuplicateLabel(String, SourceLocation),
    UnresolvedLabels(Vec<String>),
    JumpOutOfRange(String),
    CodeGenError(String),

    // IO and configuration errors
    IOError(String),
    ConfigError(String),
}

impl CompilerError {
    /// Source position of the error, when the error came from a token or directive.
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            CompilerError::UnterminatedComment(loc)
            | CompilerError::UnterminatedLiteral(loc)
            | CompilerError::InvalidDirective(loc)
            | CompilerError::UnknownDirective(_, loc)
            | CompilerError::DirectiveError(_, loc)
            | CompilerError::UnmatchedConditional(_, loc)
            | CompilerError::MacroRedefined(_, loc)
            | CompilerError::MacroNotDefined(_, loc)
            | CompilerError::IncludeError(_, _, loc)
            | CompilerError::ExpressionError(_, loc)
            | CompilerError::ParseError(_, loc)
            | CompilerError::UnexpectedToken(_, loc)
            | CompilerError::ExpectedToken(_, _, loc)
            | CompilerError::UnexpectedEndOfInput(_, loc)
            | CompilerError::UnknownCommand(_, loc)
            | CompilerError::WrongArity(_, _, _, loc)
            | CompilerError::TypeMismatch(_, _, loc)
            | CompilerError::InvalidAssignment(_, loc)
            | CompilerError::InvalidComparison(_, loc)
            | CompilerError::UndefinedSymbol(_, loc)
            | CompilerError::DuplicateSymbol(_, loc)
            | CompilerError::ValueOutOfRange(_, _, loc)
            | CompilerError::DuplicateLabel(_, loc) => Some(loc),
            CompilerError::UnresolvedLabels(_)
            | CompilerError::JumpOutOfRange(_)
            | CompilerError::CodeGenError(_)
            | CompilerError::IOError(_)
            | CompilerError::ConfigError(_) => None,
        }
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompilerError::UnterminatedComment(loc) => {
                write!(f, "{}: unterminated block comment", loc)
            }
            CompilerError::UnterminatedLiteral(loc) => {
                write!(f, "{}: unterminated quoted literal", loc)
            }
            CompilerError::InvalidDirective(loc) => {
                write!(f, "{}: invalid directive", loc)
            }
            CompilerError::UnknownDirective(name, loc) => {
                write!(f, "{}: unknown directive '#{}'", loc, name)
            }
            CompilerError::DirectiveError(msg, loc) => {
                write!(f, "{}: {}", loc, msg)
            }
            CompilerError::UnmatchedConditional(directive, loc) => {
                write!(f, "{}: unmatched '#{}'", loc, directive)
            }
            CompilerError::MacroRedefined(name, loc) => {
                write!(f, "{}: macro '{}' is already defined", loc, name)
            }
            CompilerError::MacroNotDefined(name, loc) => {
                write!(f, "{}: macro '{}' is not defined", loc, name)
            }
            CompilerError::IncludeError(path, reason, loc) => {
                write!(f, "{}: cannot include '{}': {}", loc, path, reason)
            }
            CompilerError::ExpressionError(msg, loc) => {
                write!(f, "{}: preprocessor expression error: {}", loc, msg)
            }
            CompilerError::ParseError(msg, loc) => {
                write!(f, "{}: parse error: {}", loc, msg)
            }
            CompilerError::UnexpectedToken(token, loc) => {
                write!(f, "{}: unexpected token '{}'", loc, token)
            }
            CompilerError::ExpectedToken(expected, found, loc) => {
                write!(f, "{}: expected {} but found '{}'", loc, expected, found)
            }
            CompilerError::UnexpectedEndOfInput(expected, loc) => {
                write!(f, "{}: unexpected end of input, expected {}", loc, expected)
            }
            CompilerError::UnknownCommand(name, loc) => {
                write!(f, "{}: unknown command '{}'", loc, name)
            }
            CompilerError::WrongArity(name, expected, found, loc) => {
                write!(
                    f,
                    "{}: '{}' takes {} argument(s), {} given",
                    loc, name, expected, found
                )
            }
            CompilerError::TypeMismatch(expected, found, loc) => {
                write!(f, "{}: type mismatch: expected {}, found {}", loc, expected, found)
            }
            CompilerError::InvalidAssignment(msg, loc) => {
                write!(f, "{}: invalid assignment: {}", loc, msg)
            }
            CompilerError::InvalidComparison(msg, loc) => {
                write!(f, "{}: invalid comparison: {}", loc, msg)
            }
            CompilerError::UndefinedSymbol(symbol, loc) => {
                write!(f, "{}: '{}' not found", loc, symbol)
            }
            CompilerError::DuplicateSymbol(symbol, loc) => {
                write!(f, "{}: '{}' is already defined with a different number", loc, symbol)
            }
            CompilerError::ValueOutOfRange(value, kind, loc) => {
                write!(f, "{}: value {} out of range for {}", loc, value, kind)
            }
            CompilerError::DuplicateLabel(name, loc) => {
                write!(f, "{}: label '{}' is defined more than once", loc, name)
            }
            CompilerError::UnresolvedLabels(names) => {
                write!(f, "unresolved label(s): {}", names.join(", "))
            }
            CompilerError::JumpOutOfRange(msg) => {
                write!(f, "jump out of range: {}", msg)
            }
            CompilerError::CodeGenError(msg) => {
                write!(f, "Code generation error: {}", msg)
            }
            CompilerError::IOError(msg) => {
                write!(f, "IO error: {}", msg)
            }
            CompilerError::ConfigError(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
        }
    }
}

impl std::error::Error for CompilerError {}
