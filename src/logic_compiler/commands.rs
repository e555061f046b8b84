//! Logic command tables
//!
//! Every action (statement-position) and test (condition-position) command is
//! described by its opcode, its name and the kinds of its parameters. The
//! built-in tables cover the full AGI interpreter command set; a replacement
//! can be loaded from TOML:
//!
//! ```toml
//! [[action]]
//! opcode = 3
//! name = "assignn"
//! params = "vn"
//!
//! [[test]]
//! opcode = 14
//! name = "said"
//! params = "*"
//! ```
//!
//! # Signature characters
//!
//! - `n` number, `v` variable, `f` flag, `m` message, `o` screen object,
//!   `i` inventory item, `s` string, `w` word, `c` controller
//! - `*` alone: any number of word arguments (only `said` uses this)

use crate::logic_compiler::error::{CompilerError, SourceLocation};
use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Number,
    Variable,
    Flag,
    Message,
    Object,
    Item,
    String,
    Word,
    Controller,
}

impl ParamKind {
    pub fn from_code(code: char) -> Option<ParamKind> {
        let kind = match code {
            'n' => ParamKind::Number,
            'v' => ParamKind::Variable,
            'f' => ParamKind::Flag,
            'm' => ParamKind::Message,
            'o' => ParamKind::Object,
            'i' => ParamKind::Item,
            's' => ParamKind::String,
            'w' => ParamKind::Word,
            'c' => ParamKind::Controller,
            _ => return None,
        };
        Some(kind)
    }

    /// Encoded operand width in bytes. Words are little-endian u16.
    pub fn size(self) -> usize {
        match self {
            ParamKind::Word => 2,
            _ => 1,
        }
    }

    pub fn max_value(self) -> i64 {
        match self {
            ParamKind::Word => u16::MAX as i64,
            _ => u8::MAX as i64,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ParamKind::Number => "number",
            ParamKind::Variable => "variable",
            ParamKind::Flag => "flag",
            ParamKind::Message => "message",
            ParamKind::Object => "object",
            ParamKind::Item => "inventory item",
            ParamKind::String => "string",
            ParamKind::Word => "word",
            ParamKind::Controller => "controller",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Params {
    Fixed(Vec<ParamKind>),
    /// Any number of word operands, preceded by a count byte when encoded.
    VariableWords,
}

impl Params {
    pub fn from_signature(signature: &str) -> Option<Params> {
        if signature == "*" {
            return Some(Params::VariableWords);
        }
        signature
            .chars()
            .map(ParamKind::from_code)
            .collect::<Option<Vec<_>>>()
            .map(Params::Fixed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub opcode: u8,
    pub name: String,
    pub params: Params,
}

impl CommandDescriptor {
    pub fn new(opcode: u8, name: &str, signature: &str) -> Result<Self, CompilerError> {
        let params = Params::from_signature(signature).ok_or_else(|| {
            CompilerError::ConfigError(format!(
                "command '{}': invalid parameter signature '{}'",
                name, signature
            ))
        })?;
        Ok(CommandDescriptor {
            opcode,
            name: name.to_string(),
            params,
        })
    }

    pub fn is_variable_arity(&self) -> bool {
        matches!(self.params, Params::VariableWords)
    }

    /// Kind expected at argument `index`.
    pub fn param_kind(&self, index: usize) -> Option<ParamKind> {
        match &self.params {
            Params::Fixed(kinds) => kinds.get(index).copied(),
            Params::VariableWords => Some(ParamKind::Word),
        }
    }

    pub fn arity(&self) -> Option<usize> {
        match &self.params {
            Params::Fixed(kinds) => Some(kinds.len()),
            Params::VariableWords => None,
        }
    }

    /// Fixed-arity commands need exactly their parameter count; variable
    /// arity commands need at least one argument.
    pub fn check_arity(&self, found: usize, location: &SourceLocation) -> Result<(), CompilerError> {
        let expected = match self.arity() {
            Some(expected) if expected != found => expected,
            None if found == 0 => 1,
            _ => return Ok(()),
        };
        Err(CompilerError::WrongArity(
            self.name.clone(),
            expected,
            found,
            location.clone(),
        ))
    }
}

/// Commands of one namespace, looked up by name.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    by_name: IndexMap<String, CommandDescriptor>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: CommandDescriptor) -> Result<(), CompilerError> {
        if self.by_name.contains_key(&descriptor.name) {
            return Err(CompilerError::ConfigError(format!(
                "command '{}' defined twice",
                descriptor.name
            )));
        }
        self.by_name.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    fn from_entries(entries: &[(u8, &str, &str)]) -> Result<Self, CompilerError> {
        let mut table = CommandTable::new();
        for &(opcode, name, signature) in entries {
            table.insert(CommandDescriptor::new(opcode, name, signature)?)?;
        }
        Ok(table)
    }
}

/// The action and test namespaces used by one compilation.
#[derive(Debug, Clone, Default)]
pub struct CommandSet {
    pub actions: CommandTable,
    pub tests: CommandTable,
}

#[derive(Debug, Deserialize)]
struct CommandEntry {
    opcode: u8,
    name: String,
    #[serde(default)]
    params: String,
}

#[derive(Debug, Deserialize)]
struct CommandFile {
    #[serde(default)]
    action: Vec<CommandEntry>,
    #[serde(default)]
    test: Vec<CommandEntry>,
}

impl CommandSet {
    /// The standard AGI command set.
    pub fn builtin() -> CommandSet {
        BUILTIN_COMMANDS.clone()
    }

    pub fn from_toml(text: &str) -> Result<CommandSet, CompilerError> {
        let file: CommandFile =
            toml::from_str(text).map_err(|e| CompilerError::ConfigError(format!("command table: {}", e)))?;

        let mut set = CommandSet::default();
        for entry in &file.action {
            set.actions
                .insert(CommandDescriptor::new(entry.opcode, &entry.name, &entry.params)?)?;
        }
        for entry in &file.test {
            set.tests
                .insert(CommandDescriptor::new(entry.opcode, &entry.name, &entry.params)?)?;
        }
        log::info!(
            "loaded command table: {} action(s), {} test(s)",
            set.actions.len(),
            set.tests.len()
        );
        Ok(set)
    }
}

lazy_static! {
    static ref BUILTIN_COMMANDS: CommandSet = CommandSet {
        actions: builtin_table("action", ACTIONS),
        tests: builtin_table("test", TESTS),
    };
}

fn builtin_table(kind: &str, entries: &[(u8, &str, &str)]) -> CommandTable {
    CommandTable::from_entries(entries).unwrap_or_else(|err| {
        log::error!("built-in {} table is malformed: {}", kind, err);
        CommandTable::new()
    })
}

const ACTIONS: &[(u8, &str, &str)] = &[
    (0, "return", ""),
    (1, "increment", "v"),
    (2, "decrement", "v"),
    (3, "assignn", "vn"),
    (4, "assignv", "vv"),
    (5, "addn", "vn"),
    (6, "addv", "vv"),
    (7, "subn", "vn"),
    (8, "subv", "vv"),
    (9, "lindirectv", "vv"),
    (10, "rindirect", "vv"),
    (11, "lindirectn", "vn"),
    (12, "set", "f"),
    (13, "reset", "f"),
    (14, "toggle", "f"),
    (15, "set.v", "v"),
    (16, "reset.v", "v"),
    (17, "toggle.v", "v"),
    (18, "new.room", "n"),
    (19, "new.room.v", "v"),
    (20, "load.logics", "n"),
    (21, "load.logics.v", "v"),
    (22, "call", "n"),
    (23, "call.v", "v"),
    (24, "load.pic", "v"),
    (25, "draw.pic", "v"),
    (26, "show.pic", ""),
    (27, "discard.pic", "v"),
    (28, "overlay.pic", "v"),
    (29, "show.pri.screen", ""),
    (30, "load.view", "n"),
    (31, "load.view.v", "v"),
    (32, "discard.view", "n"),
    (33, "animate.obj", "o"),
    (34, "unanimate.all", ""),
    (35, "draw", "o"),
    (36, "erase", "o"),
    (37, "position", "onn"),
    (38, "position.v", "ovv"),
    (39, "get.posn", "ovv"),
    (40, "reposition", "ovv"),
    (41, "set.view", "on"),
    (42, "set.view.v", "ov"),
    (43, "set.loop", "on"),
    (44, "set.loop.v", "ov"),
    (45, "fix.loop", "o"),
    (46, "release.loop", "o"),
    (47, "set.cel", "on"),
    (48, "set.cel.v", "ov"),
    (49, "last.cel", "ov"),
    (50, "current.cel", "ov"),
    (51, "current.loop", "ov"),
    (52, "current.view", "ov"),
    (53, "number.of.loops", "ov"),
    (54, "set.priority", "on"),
    (55, "set.priority.v", "ov"),
    (56, "release.priority", "o"),
    (57, "get.priority", "ov"),
    (58, "stop.update", "o"),
    (59, "start.update", "o"),
    (60, "force.update", "o"),
    (61, "ignore.horizon", "o"),
    (62, "observe.horizon", "o"),
    (63, "set.horizon", "n"),
    (64, "object.on.water", "o"),
    (65, "object.on.land", "o"),
    (66, "object.on.anything", "o"),
    (67, "ignore.objs", "o"),
    (68, "observe.objs", "o"),
    (69, "distance", "oov"),
    (70, "stop.cycling", "o"),
    (71, "start.cycling", "o"),
    (72, "normal.cycle", "o"),
    (73, "end.of.loop", "of"),
    (74, "reverse.cycle", "o"),
    (75, "reverse.loop", "of"),
    (76, "cycle.time", "ov"),
    (77, "stop.motion", "o"),
    (78, "start.motion", "o"),
    (79, "step.size", "ov"),
    (80, "step.time", "ov"),
    (81, "move.obj", "onnnf"),
    (82, "move.obj.v", "ovvvf"),
    (83, "follow.ego", "onf"),
    (84, "wander", "o"),
    (85, "normal.motion", "o"),
    (86, "set.dir", "ov"),
    (87, "get.dir", "ov"),
    (88, "ignore.blocks", "o"),
    (89, "observe.blocks", "o"),
    (90, "block", "nnnn"),
    (91, "unblock", ""),
    (92, "get", "i"),
    (93, "get.v", "v"),
    (94, "drop", "i"),
    (95, "put", "iv"),
    (96, "put.v", "vv"),
    (97, "get.room.v", "vv"),
    (98, "load.sound", "n"),
    (99, "sound", "nf"),
    (100, "stop.sound", ""),
    (101, "print", "m"),
    (102, "print.v", "v"),
    (103, "display", "nnm"),
    (104, "display.v", "vvv"),
    (105, "clear.lines", "nnn"),
    (106, "text.screen", ""),
    (107, "graphics", ""),
    (108, "set.cursor.char", "m"),
    (109, "set.text.attribute", "nn"),
    (110, "shake.screen", "n"),
    (111, "configure.screen", "nnn"),
    (112, "status.line.on", ""),
    (113, "status.line.off", ""),
    (114, "set.string", "sm"),
    (115, "get.string", "smnnn"),
    (116, "word.to.string", "sn"),
    (117, "parse", "s"),
    (118, "get.num", "mv"),
    (119, "prevent.input", ""),
    (120, "accept.input", ""),
    (121, "set.key", "nnc"),
    (122, "add.to.pic", "nnnnnnn"),
    (123, "add.to.pic.v", "vvvvvvv"),
    (124, "status", ""),
    (125, "save.game", ""),
    (126, "restore.game", ""),
    (127, "init.disk", ""),
    (128, "restart.game", ""),
    (129, "show.obj", "n"),
    (130, "random", "nnv"),
    (131, "program.control", ""),
    (132, "player.control", ""),
    (133, "obj.status.v", "v"),
    (134, "quit", "n"),
    (135, "show.mem", ""),
    (136, "pause", ""),
    (137, "echo.line", ""),
    (138, "cancel.line", ""),
    (139, "init.joy", ""),
    (140, "toggle.monitor", ""),
    (141, "version", ""),
    (142, "script.size", "n"),
    (143, "set.game.id", "m"),
    (144, "log", "m"),
    (145, "set.scan.start", ""),
    (146, "reset.scan.start", ""),
    (147, "reposition.to", "onn"),
    (148, "reposition.to.v", "ovv"),
    (149, "trace.on", ""),
    (150, "trace.info", "nnn"),
    (151, "print.at", "mnnn"),
    (152, "print.at.v", "vnnn"),
    (153, "discard.view.v", "v"),
    (154, "clear.text.rect", "nnnnn"),
    (155, "set.upper.left", "nn"),
    (156, "set.menu", "m"),
    (157, "set.menu.item", "mc"),
    (158, "submit.menu", ""),
    (159, "enable.item", "c"),
    (160, "disable.item", "c"),
    (161, "menu.input", ""),
    (162, "show.obj.v", "v"),
    (163, "open.dialogue", ""),
    (164, "close.dialogue", ""),
    (165, "mul.n", "vn"),
    (166, "mul.v", "vv"),
    (167, "div.n", "vn"),
    (168, "div.v", "vv"),
    (169, "close.window", ""),
    (170, "set.simple", "n"),
    (171, "push.script", ""),
    (172, "pop.script", ""),
    (173, "hold.key", ""),
    (174, "set.pri.base", "n"),
    (175, "discard.sound", "n"),
    (176, "hide.mouse", ""),
    (177, "allow.menu", "n"),
    (178, "show.mouse", ""),
    (179, "fence.mouse", "nnnn"),
    (180, "mouse.posn", "vv"),
    (181, "release.key", ""),
    (182, "adj.ego.move.to.x.y", ""),
];

const TESTS: &[(u8, &str, &str)] = &[
    (1, "equaln", "vn"),
    (2, "equalv", "vv"),
    (3, "lessn", "vn"),
    (4, "lessv", "vv"),
    (5, "greatern", "vn"),
    (6, "greaterv", "vv"),
    (7, "isset", "f"),
    (8, "issetv", "v"),
    (9, "has", "i"),
    (10, "obj.in.room", "iv"),
    (11, "posn", "onnnn"),
    (12, "controller", "c"),
    (13, "have.key", ""),
    (14, "said", "*"),
    (15, "compare.strings", "ss"),
    (16, "obj.in.box", "onnnn"),
    (17, "center.posn", "onnnn"),
    (18, "right.posn", "onnnn"),
];

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
