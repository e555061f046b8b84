// Message, word and inventory item tables
//
// Messages are numbered text strings referenced from bytecode. Words and items
// map names to numbers; a number may carry several names but a name has
// exactly one number.

use crate::logic_compiler::error::{CompilerError, SourceLocation};
use indexmap::IndexMap;
use std::hash::Hash;
use std::rc::Rc;

pub const MAX_MESSAGE_NUMBER: usize = 255;

#[derive(Debug, Clone)]
pub struct MessageTable {
    texts: Vec<Option<String>>,     // index 0 is reserved
    numbers: IndexMap<String, u8>, // text -> number used for literal substitution
}

impl Default for MessageTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageTable {
    pub fn new() -> Self {
        MessageTable {
            texts: vec![None],
            numbers: IndexMap::new(),
        }
    }

    /// Record an explicitly numbered message (`#message N "text"`).
    pub fn define(
        &mut self,
        number: i64,
        text: String,
        location: &SourceLocation,
    ) -> Result<(), CompilerError> {
        if number < 1 || number as usize > MAX_MESSAGE_NUMBER {
            return Err(CompilerError::ValueOutOfRange(
                number,
                "message number".to_string(),
                location.clone(),
            ));
        }
        let index = number as usize;
        if self.texts.len() <= index {
            self.texts.resize(index + 1, None);
        }

        if let Some(existing) = &self.texts[index] {
            if *existing != text {
                return Err(CompilerError::DirectiveError(
                    format!("message {} is already defined", number),
                    location.clone(),
                ));
            }
        }
        self.texts[index] = Some(text.clone());

        self.numbers.entry(text).or_insert(index as u8);
        Ok(())
    }

    /// Number for a literal used as a message argument, allocating the lowest
    /// free slot the first time the text is seen.
    pub fn number_for(&mut self, text: &str, location: &SourceLocation) -> Result<u8, CompilerError> {
        if let Some(&number) = self.numbers.get(text) {
            return Ok(number);
        }

        let free = (1..=MAX_MESSAGE_NUMBER)
            .find(|&n| self.texts.get(n).map_or(true, |slot| slot.is_none()))
            .ok_or_else(|| {
                CompilerError::DirectiveError(
                    format!("no free message number for \"{}\"", text),
                    location.clone(),
                )
            })?;

        log::debug!("allocated message {} for \"{}\"", free, text);
        self.define(free as i64, text.to_string(), location)?;
        Ok(free as u8)
    }

    pub fn get(&self, number: usize) -> Option<&str> {
        self.texts.get(number).and_then(|slot| slot.as_deref())
    }

    /// Sparse message array, index 0 always empty.
    pub fn texts(&self) -> &[Option<String>] {
        &self.texts
    }

    pub fn highest(&self) -> usize {
        self.texts.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.texts.iter().all(|slot| slot.is_none())
    }
}

/// Name <-> number association used for words (u16) and items (u8).
#[derive(Debug, Clone)]
pub struct SymbolTable<N: Copy + Eq + Hash> {
    by_name: IndexMap<String, N>,
    by_number: IndexMap<N, Vec<String>>,
}

impl<N: Copy + Eq + Hash> Default for SymbolTable<N> {
    fn default() -> Self {
        SymbolTable {
            by_name: IndexMap::new(),
            by_number: IndexMap::new(),
        }
    }
}

impl<N: Copy + Eq + Hash> SymbolTable<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `name` with `number`. Repeating an identical definition is
    /// fine; giving a name a second number is an error.
    pub fn define(&mut self, name: &str, number: N, location: &SourceLocation) -> Result<(), CompilerError> {
        match self.by_name.get(name) {
            Some(&existing) if existing == number => Ok(()),
            Some(_) => Err(CompilerError::DuplicateSymbol(name.to_string(), location.clone())),
            None => {
                self.insert(name, number);
                Ok(())
            }
        }
    }

    /// Associate `name` with `number` unless the name already has a number.
    /// The number always records the name.
    pub fn define_first(&mut self, name: &str, number: N) {
        self.by_name.entry(name.to_string()).or_insert(number);
        let names = self.by_number.entry(number).or_default();
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    fn insert(&mut self, name: &str, number: N) {
        self.by_name.insert(name.to_string(), number);
        self.by_number.entry(number).or_default().push(name.to_string());
    }

    pub fn number_of(&self, name: &str) -> Option<N> {
        self.by_name.get(name).copied()
    }

    pub fn names_of(&self, number: N) -> &[String] {
        self.by_number.get(&number).map_or(&[], |names| names.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, N)> {
        self.by_name.iter().map(|(name, &number)| (name.as_str(), number))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

pub type WordTable = SymbolTable<u16>;
pub type ItemTable = SymbolTable<u8>;

/// The three tables filled while preprocessing and consulted while parsing.
#[derive(Debug, Clone, Default)]
pub struct SymbolTables {
    pub messages: MessageTable,
    pub words: WordTable,
    pub items: ItemTable,
}

impl WordTable {
    /// Load a dictionary listing: one `<code> <word>` per line, blank lines and
    /// lines starting with `*` ignored.
    pub fn parse_dictionary(&mut self, text: &str, file: Rc<str>) -> Result<(), CompilerError> {
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('*') {
                continue;
            }
            let location = SourceLocation::new(file.clone(), index + 1);
            let (code, word) = line.split_once(char::is_whitespace).ok_or_else(|| {
                CompilerError::DirectiveError(format!("malformed dictionary line '{}'", line), location.clone())
            })?;
            let number = parse_code::<u16>(code, "word number", &location)?;
            self.define(word.trim(), number, &location)?;
        }
        log::info!("loaded {} word(s) from {}", self.len(), file);
        Ok(())
    }
}

impl ItemTable {
    /// Load an item list: one `<code>:<name>` per line. The first name given
    /// for a code wins when names repeat.
    pub fn parse_item_list(&mut self, text: &str, file: Rc<str>) -> Result<(), CompilerError> {
        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let location = SourceLocation::new(file.clone(), index + 1);
            let (code, name) = line.split_once(':').ok_or_else(|| {
                CompilerError::DirectiveError(format!("malformed item line '{}'", line), location.clone())
            })?;
            let number = parse_code::<u8>(code.trim(), "item number", &location)?;
            self.define_first(name.trim(), number);
        }
        log::info!("loaded {} item name(s) from {}", self.len(), file);
        Ok(())
    }
}

pub(crate) fn parse_code<N: TryFrom<i64>>(text: &str, kind: &str, location: &SourceLocation) -> Result<N, CompilerError> {
    let value = crate::logic_compiler::lexer::parse_integer(text).ok_or_else(|| {
        CompilerError::DirectiveError(format!("expected {} but found '{}'", kind, text), location.clone())
    })?;
    N::try_from(value).map_err(|_| CompilerError::ValueOutOfRange(value, kind.to_string(), location.clone()))
}

#[cfg(test)]
#[path = "symbols_tests.rs"]
mod tests;
