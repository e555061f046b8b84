// AGI Logic Compiler Module
// Preprocesses, parses, lowers and assembles logic source into bytecode

pub mod ast;
pub mod codegen;
pub mod codegen_references;
pub mod commands;
pub mod config;
pub mod directive_expr;
pub mod error;
pub mod lexer;
pub mod lowering;
pub mod output;
pub mod parser;
pub mod preprocessor;
pub mod source;
pub mod symbols;

use std::path::{Path, PathBuf};

pub use error::CompilerError;

use commands::CommandSet;
use config::CompilerConfig;
use output::MessageLayout;
use preprocessor::{MacroTable, Preprocessor};
use source::{FileSystemLoader, SourceLoader};
use symbols::SymbolTables;

/// Result of compiling one logic source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledLogic {
    pub code: Vec<u8>,
    pub messages: MessageLayout,
    /// Front-coded word dictionary (see [`output::encode_words`])
    pub words: Vec<u8>,
}

impl CompiledLogic {
    /// Serialise as: code length (u16 LE), code, highest message number (u8),
    /// one i16 LE offset per message 1..=highest (-1 when unused), message
    /// text block.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CompilerError> {
        let code_len = u16::try_from(self.code.len()).map_err(|_| {
            CompilerError::CodeGenError(format!("logic code is {} bytes, the limit is 65535", self.code.len()))
        })?;
        let highest = self.messages.offsets.len().saturating_sub(1);
        let highest = u8::try_from(highest)
            .map_err(|_| CompilerError::CodeGenError(format!("message number {} exceeds 255", highest)))?;

        let mut bytes = Vec::with_capacity(3 + self.code.len() + 2 * highest as usize + self.messages.block.len());
        bytes.extend_from_slice(&code_len.to_le_bytes());
        bytes.extend_from_slice(&self.code);
        bytes.push(highest);
        for &offset in self.messages.offsets.iter().skip(1) {
            let offset = i16::try_from(offset).map_err(|_| {
                CompilerError::CodeGenError(format!("message offset {} does not fit in 16 bits", offset))
            })?;
            bytes.extend_from_slice(&offset.to_le_bytes());
        }
        bytes.extend_from_slice(&self.messages.block);
        Ok(bytes)
    }
}

/// Main compiler structure
///
/// Holds what every compilation starts from: the command tables, the
/// predefined macros, the word and item tables and the include search path.
/// Each compilation works on its own copy, so compiling the same input twice
/// gives the same output.
#[derive(Debug, Clone)]
pub struct LogicCompiler {
    commands: CommandSet,
    macros: MacroTable,
    symbols: SymbolTables,
    include_paths: Vec<PathBuf>,
}

impl Default for LogicCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl LogicCompiler {
    /// Compiler with the built-in AGI command set and nothing predefined
    pub fn new() -> Self {
        LogicCompiler {
            commands: CommandSet::builtin(),
            macros: MacroTable::new(),
            symbols: SymbolTables::default(),
            include_paths: Vec::new(),
        }
    }

    pub fn with_config(config: &CompilerConfig) -> Result<Self, CompilerError> {
        Ok(LogicCompiler {
            commands: config.command_set()?,
            macros: config.macro_table()?,
            symbols: config.symbol_tables()?,
            include_paths: config.include_paths.clone(),
        })
    }

    /// Predefine a macro as if by `#define name value`.
    pub fn define(&mut self, name: &str, value: &str) -> Result<(), CompilerError> {
        let mut config = CompilerConfig::default();
        config.define(name, value);
        self.macros.extend(config.macro_table()?);
        Ok(())
    }

    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTables {
        &mut self.symbols
    }

    pub fn compile_file(&self, path: &Path) -> Result<CompiledLogic, CompilerError> {
        let loader = FileSystemLoader::new(self.include_paths.clone());
        self.compile(&loader, path)
    }

    /// Compile the file at `path`, reading it and its includes through `loader`.
    pub fn compile(&self, loader: &dyn SourceLoader, path: &Path) -> Result<CompiledLogic, CompilerError> {
        let source = loader.load(path)?;
        self.compile_source(loader, &source, path)
    }

    /// Compile `source` as if it were the contents of `path`.
    pub fn compile_source(
        &self,
        loader: &dyn SourceLoader,
        source: &str,
        path: &Path,
    ) -> Result<CompiledLogic, CompilerError> {
        log::info!("compiling {}", path.display());

        // Phase 1: Preprocessing
        let mut preprocessor = Preprocessor::new(loader, self.macros.clone(), self.symbols.clone());
        let tokens = preprocessor.process_source(source, path)?;
        let (_, mut symbols) = preprocessor.into_parts();

        // Phase 2: Parsing
        let statements = parser::Parser::new(tokens, &self.commands).parse()?;

        // Phase 3: Lowering
        let program = lowering::Lowering::new(&self.commands, &mut symbols).lower_program(statements)?;

        // Phase 4: Code generation
        let code = codegen::LogicCodeGen::new(&self.commands).generate(&program)?;

        // Phase 5: Output assembly
        let messages = output::layout_messages(&symbols.messages);
        let words = output::encode_words(&symbols.words);

        log::info!(
            "{}: {} byte(s) of code, {} message(s)",
            path.display(),
            code.len(),
            messages.offsets.iter().filter(|&&offset| offset >= 0).count()
        );
        Ok(CompiledLogic { code, messages, words })
    }
}
