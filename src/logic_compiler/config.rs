// Compiler configuration
//
// A TOML file naming the resources a compilation uses:
//
//   include_paths = ["include"]
//   dictionary = "words.txt"
//   items = "items.txt"
//   commands = "commands.toml"
//   words_output = "words.tok"
//
//   [defines]
//   ROOM_HALL = "3"
//
// Relative paths in a loaded file are taken relative to the file's directory.

use crate::logic_compiler::commands::CommandSet;
use crate::logic_compiler::error::CompilerError;
use crate::logic_compiler::lexer::Lexer;
use crate::logic_compiler::preprocessor::MacroTable;
use crate::logic_compiler::symbols::SymbolTables;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Macros defined before the first source line
    pub defines: IndexMap<String, String>,
    /// Searched after the including file's directory
    pub include_paths: Vec<PathBuf>,
    pub dictionary: Option<PathBuf>,
    pub items: Option<PathBuf>,
    /// Command table replacing the built-in one
    pub commands: Option<PathBuf>,
    pub words_output: Option<PathBuf>,
}

impl CompilerConfig {
    pub fn from_toml(text: &str) -> Result<Self, CompilerError> {
        toml::from_str(text).map_err(|e| CompilerError::ConfigError(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, CompilerError> {
        let text = read_file(path)?;
        let mut config = Self::from_toml(&text)
            .map_err(|e| CompilerError::ConfigError(format!("{}: {}", path.display(), e)))?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        log::info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        let join = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        self.include_paths.iter_mut().for_each(join);
        self.dictionary.iter_mut().for_each(join);
        self.items.iter_mut().for_each(join);
        self.commands.iter_mut().for_each(join);
        self.words_output.iter_mut().for_each(join);
    }

    /// Add or replace a definition (`-D NAME=VALUE` on the command line).
    pub fn define(&mut self, name: &str, value: &str) {
        self.defines.insert(name.to_string(), value.to_string());
    }

    /// Lex every definition into the initial macro table.
    pub fn macro_table(&self) -> Result<MacroTable, CompilerError> {
        let mut macros = MacroTable::new();
        for (name, value) in &self.defines {
            let mut chars = name.chars();
            let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !valid {
                return Err(CompilerError::ConfigError(format!("invalid macro name '{}'", name)));
            }

            let tokens = Lexer::new(value, format!("<define {}>", name).into())
                .tokenize()?
                .into_iter()
                .flat_map(|line| line.tokens)
                .collect();
            macros.insert(name.clone(), tokens);
        }
        Ok(macros)
    }

    /// Word and item tables from the configured files; empty when none.
    pub fn symbol_tables(&self) -> Result<SymbolTables, CompilerError> {
        let mut symbols = SymbolTables::default();
        if let Some(path) = &self.dictionary {
            let text = read_file(path)?;
            symbols
                .words
                .parse_dictionary(&text, path.display().to_string().into())?;
        }
        if let Some(path) = &self.items {
            let text = read_file(path)?;
            symbols
                .items
                .parse_item_list(&text, path.display().to_string().into())?;
        }
        Ok(symbols)
    }

    pub fn command_set(&self) -> Result<CommandSet, CompilerError> {
        match &self.commands {
            Some(path) => CommandSet::from_toml(&read_file(path)?),
            None => Ok(CommandSet::builtin()),
        }
    }
}

fn read_file(path: &Path) -> Result<String, CompilerError> {
    fs::read_to_string(path).map_err(|e| CompilerError::IOError(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
