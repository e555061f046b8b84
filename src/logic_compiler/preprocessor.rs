// Logic Source Preprocessor
//
// Runs over the lexed lines in place. Directive lines and skipped conditional
// branches are erased (their tokens cleared), `#include` splices the included
// file's lines in after the directive, and ordinary lines get object-like
// macro expansion.

use crate::logic_compiler::directive_expr;
use crate::logic_compiler::error::{CompilerError, SourceLocation};
use crate::logic_compiler::lexer::{parse_integer, unquote, Lexer, Line, Token, TokenKind};
use crate::logic_compiler::source::SourceLoader;
use crate::logic_compiler::symbols::{parse_code, SymbolTables};
use indexmap::IndexMap;
use std::path::Path;

/// Object-like macros: name -> replacement tokens.
pub type MacroTable = IndexMap<String, Vec<Token>>;

const MAX_INCLUDE_DEPTH: usize = 32;

#[derive(Debug, Clone)]
struct ConditionalFrame {
    directive: String,
    opened_at: SourceLocation,
    else_at: Option<SourceLocation>,
}

pub struct Preprocessor<'a> {
    loader: &'a dyn SourceLoader,
    macros: MacroTable,
    conditionals: Vec<ConditionalFrame>,
    symbols: SymbolTables,
}

impl<'a> Preprocessor<'a> {
    pub fn new(loader: &'a dyn SourceLoader, macros: MacroTable, symbols: SymbolTables) -> Self {
        Preprocessor {
            loader,
            macros,
            conditionals: Vec::new(),
            symbols,
        }
    }

    /// Hand back the macro table and the symbol tables filled by directives.
    pub fn into_parts(self) -> (MacroTable, SymbolTables) {
        (self.macros, self.symbols)
    }

    /// Preprocess source text that claims to live at `path` (used for
    /// diagnostics and for resolving relative includes).
    pub fn process_source(&mut self, source: &str, path: &Path) -> Result<Vec<Token>, CompilerError> {
        let mut lexer = Lexer::new(source, path.display().to_string().into());
        let lines = lexer.tokenize()?;
        self.run(lines)
    }

    fn run(&mut self, mut lines: Vec<Line>) -> Result<Vec<Token>, CompilerError> {
        let mut index = 0;

        while index < lines.len() {
            if is_directive(&lines[index]) {
                index = self.directive(&mut lines, index)?;
            } else {
                let tokens = std::mem::take(&mut lines[index].tokens);
                lines[index].tokens = self.expand(tokens, &mut Vec::new());
                index += 1;
            }
        }

        if let Some(frame) = self.conditionals.last() {
            return Err(CompilerError::UnmatchedConditional(
                frame.directive.clone(),
                frame.opened_at.clone(),
            ));
        }

        let tokens: Vec<Token> = lines.into_iter().flat_map(|line| line.tokens).collect();
        log::debug!("preprocessing produced {} token(s)", tokens.len());
        Ok(tokens)
    }

    /// Execute the directive on `lines[index]`; returns the index to continue from.
    fn directive(&mut self, lines: &mut Vec<Line>, index: usize) -> Result<usize, CompilerError> {
        let tokens = std::mem::take(&mut lines[index].tokens);
        let location = lines[index].location.clone();
        let keyword = match tokens.get(1) {
            Some(token) if token.is_identifier() => token.text.clone(),
            _ => return Err(CompilerError::InvalidDirective(location)),
        };
        let args = &tokens[2..];
        log::trace!("{}: #{}", location, keyword);

        match keyword.as_str() {
            "include" => return self.include(lines, index, args, &location),
            "define" => self.define(args, &location)?,
            "undef" => {
                let name = single_name(args, "#undef", &location)?;
                if self.macros.shift_remove(&name.text).is_none() {
                    return Err(CompilerError::MacroNotDefined(name.text.clone(), location));
                }
            }
            "if" => {
                let taken = directive_expr::evaluate(args, &self.macros, &location)? != 0;
                return self.open_conditional("if", taken, lines, index, location);
            }
            "ifdef" | "ifndef" => {
                let name = single_name(args, &format!("#{}", keyword), &location)?;
                let defined = self.macros.contains_key(&name.text);
                let taken = if keyword == "ifdef" { defined } else { !defined };
                return self.open_conditional(&keyword, taken, lines, index, location);
            }
            "elif" | "else" => {
                let frame = self
                    .conditionals
                    .last_mut()
                    .ok_or_else(|| CompilerError::UnmatchedConditional(keyword.clone(), location.clone()))?;
                if frame.else_at.is_some() {
                    return Err(CompilerError::DirectiveError(
                        format!("#{} after #else", keyword),
                        location,
                    ));
                }
                if keyword == "else" {
                    frame.else_at = Some(location.clone());
                }
                // The active branch just ended: everything up to #endif goes
                return self.skip_conditional(lines, index + 1, false);
            }
            "endif" => {
                if self.conditionals.pop().is_none() {
                    return Err(CompilerError::UnmatchedConditional(keyword, location));
                }
            }
            "message" => self.message(args, &location)?,
            "word" => self.word(args, &location)?,
            "item" => self.item(args, &location)?,
            "pragma" => log::debug!("{}: ignoring #pragma", location),
            _ => return Err(CompilerError::UnknownDirective(keyword, location)),
        }

        Ok(index + 1)
    }

    fn include(
        &mut self,
        lines: &mut Vec<Line>,
        index: usize,
        args: &[Token],
        location: &SourceLocation,
    ) -> Result<usize, CompilerError> {
        let requested = match args {
            [path] if path.is_string() => unquote(&path.text),
            _ => {
                return Err(CompilerError::DirectiveError(
                    "#include expects a quoted file name".to_string(),
                    location.clone(),
                ))
            }
        };

        let depth = lines[index].include_depth + 1;
        if depth > MAX_INCLUDE_DEPTH {
            return Err(CompilerError::IncludeError(
                requested,
                "includes nested too deeply".to_string(),
                location.clone(),
            ));
        }

        let resolved = self.loader.resolve(Path::new(&*location.file), &requested);
        let text = self
            .loader
            .load(&resolved)
            .map_err(|e| CompilerError::IncludeError(requested.clone(), e.to_string(), location.clone()))?;

        let mut lexer = Lexer::new(&text, resolved.display().to_string().into());
        let mut included = lexer.tokenize()?;
        for line in &mut included {
            line.include_depth = depth;
        }

        log::debug!(
            "{}: including {} ({} line(s))",
            location,
            resolved.display(),
            included.len()
        );
        lines.splice(index + 1..index + 1, included);
        Ok(index + 1)
    }

    fn define(&mut self, args: &[Token], location: &SourceLocation) -> Result<(), CompilerError> {
        let (name, body) = match args.split_first() {
            Some((name, body)) if name.is_identifier() => (name, body),
            _ => {
                return Err(CompilerError::DirectiveError(
                    "#define expects a macro name".to_string(),
                    location.clone(),
                ))
            }
        };

        if self.macros.contains_key(&name.text) {
            return Err(CompilerError::MacroRedefined(name.text.clone(), location.clone()));
        }
        self.macros.insert(name.text.clone(), body.to_vec());
        Ok(())
    }

    fn open_conditional(
        &mut self,
        directive: &str,
        taken: bool,
        lines: &mut [Line],
        index: usize,
        location: SourceLocation,
    ) -> Result<usize, CompilerError> {
        self.conditionals.push(ConditionalFrame {
            directive: directive.to_string(),
            opened_at: location,
            else_at: None,
        });

        if taken {
            Ok(index + 1)
        } else {
            self.skip_conditional(lines, index + 1, true)
        }
    }

    /// Erase lines of the current conditional starting at `start`. When
    /// `seeking` is set, stop at the first `#elif` that evaluates true or at
    /// `#else`; otherwise run to the matching `#endif`. Returns the index of
    /// the first line after the stopping directive.
    fn skip_conditional(&mut self, lines: &mut [Line], start: usize, seeking: bool) -> Result<usize, CompilerError> {
        let mut depth = 0usize;

        for index in start..lines.len() {
            let tokens = std::mem::take(&mut lines[index].tokens);
            if !is_directive_tokens(&tokens) {
                continue;
            }
            let keyword = match tokens.get(1) {
                Some(token) if token.is_identifier() => token.text.as_str(),
                _ => continue,
            };
            let location = &lines[index].location;

            match keyword {
                "if" | "ifdef" | "ifndef" => depth += 1,
                "endif" if depth > 0 => depth -= 1,
                "endif" => {
                    self.conditionals.pop();
                    return Ok(index + 1);
                }
                "elif" | "else" if depth == 0 => {
                    let frame = self.current_frame(location)?;
                    if frame.else_at.is_some() {
                        return Err(CompilerError::DirectiveError(
                            format!("#{} after #else", keyword),
                            location.clone(),
                        ));
                    }
                    if keyword == "else" {
                        frame.else_at = Some(location.clone());
                        if seeking {
                            return Ok(index + 1);
                        }
                    } else if seeking && directive_expr::evaluate(&tokens[2..], &self.macros, location)? != 0 {
                        return Ok(index + 1);
                    }
                }
                _ => {}
            }
        }

        let frame = self.current_frame(&lines[start.saturating_sub(1)].location)?;
        Err(CompilerError::UnmatchedConditional(
            frame.directive.clone(),
            frame.opened_at.clone(),
        ))
    }

    fn current_frame(&mut self, location: &SourceLocation) -> Result<&mut ConditionalFrame, CompilerError> {
        self.conditionals.last_mut().ok_or_else(|| {
            CompilerError::CodeGenError(format!("{}: conditional stack is empty", location))
        })
    }

    fn message(&mut self, args: &[Token], location: &SourceLocation) -> Result<(), CompilerError> {
        match args {
            [number, text] if number.kind == TokenKind::Number && text.is_string() => {
                let value = parse_integer(&number.text).ok_or_else(|| malformed("#message", location))?;
                self.symbols.messages.define(value, unquote(&text.text), location)
            }
            _ => Err(malformed("#message", location)),
        }
    }

    fn word(&mut self, args: &[Token], location: &SourceLocation) -> Result<(), CompilerError> {
        let (number, keys) = match args.split_first() {
            Some((number, keys)) if number.kind == TokenKind::Number && !keys.is_empty() => (number, keys),
            _ => return Err(malformed("#word", location)),
        };
        let value = parse_code::<u16>(&number.text, "word number", location)?;

        // key (',' key)*
        for (position, token) in keys.iter().enumerate() {
            if position % 2 == 1 {
                if !token.is(",") || position == keys.len() - 1 {
                    return Err(malformed("#word", location));
                }
                continue;
            }
            let key = symbol_key(token).ok_or_else(|| malformed("#word", location))?;
            self.symbols.words.define(&key, value, location)?;
        }
        Ok(())
    }

    fn item(&mut self, args: &[Token], location: &SourceLocation) -> Result<(), CompilerError> {
        match args {
            [number, key] if number.kind == TokenKind::Number => {
                let value = parse_code::<u8>(&number.text, "item number", location)?;
                let key = symbol_key(key).ok_or_else(|| malformed("#item", location))?;
                self.symbols.items.define(&key, value, location)
            }
            _ => Err(malformed("#item", location)),
        }
    }

    /// Replace macro names by their replacement, rescanning the replacement.
    /// `hidden` holds the macros being expanded so none recurses into itself.
    fn expand(&self, tokens: Vec<Token>, hidden: &mut Vec<String>) -> Vec<Token> {
        let mut out = Vec::with_capacity(tokens.len());

        for token in tokens {
            if token.is_identifier() && !hidden.contains(&token.text) {
                if let Some(body) = self.macros.get(&token.text) {
                    let relocated = body
                        .iter()
                        .map(|t| Token::new(t.kind, t.text.clone(), token.location.clone()))
                        .collect();
                    hidden.push(token.text.clone());
                    out.extend(self.expand(relocated, hidden));
                    hidden.pop();
                    continue;
                }
            }
            out.push(token);
        }

        out
    }
}

fn is_directive(line: &Line) -> bool {
    is_directive_tokens(&line.tokens)
}

fn is_directive_tokens(tokens: &[Token]) -> bool {
    tokens.first().is_some_and(|t| t.is("#"))
}

fn single_name<'t>(args: &'t [Token], directive: &str, location: &SourceLocation) -> Result<&'t Token, CompilerError> {
    match args {
        [name] if name.is_identifier() => Ok(name),
        _ => Err(CompilerError::DirectiveError(
            format!("{} expects a single macro name", directive),
            location.clone(),
        )),
    }
}

fn symbol_key(token: &Token) -> Option<String> {
    match token.kind {
        TokenKind::StringLiteral => Some(unquote(&token.text)),
        TokenKind::Identifier | TokenKind::Number => Some(token.text.clone()),
        _ => None,
    }
}

fn malformed(directive: &str, location: &SourceLocation) -> CompilerError {
    CompilerError::DirectiveError(format!("malformed {}", directive), location.clone())
}

#[cfg(test)]
#[path = "preprocessor_tests.rs"]
mod tests;
