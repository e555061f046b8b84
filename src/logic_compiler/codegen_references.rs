use crate::logic_compiler::error::{CompilerError, SourceLocation};
/// Label and jump resolution for logic code generation
///
/// Every jump in logic bytecode is a 2-byte little-endian signed offset
/// measured from the byte after the offset field. Jumps whose target is
/// already known are written directly; jumps to labels not yet emitted are
/// recorded here as patch sites and resolved in one pass once the whole
/// program has been generated.
///
/// # Phases
///
/// 1. **Collection**: labels are defined as they are emitted, forward `goto`
///    sites are recorded with a placeholder in the code
/// 2. **Resolution**: after generation every recorded site is patched against
///    the final label table; labels that never appeared are reported together
use indexmap::{IndexMap, IndexSet};

/// Placeholder written into an offset field until it is patched
pub const PLACEHOLDER_OFFSET: [u8; 2] = [0x00, 0x00];

/// A 2-byte offset field waiting for a label's address
#[derive(Debug, Clone)]
pub struct UnresolvedReference {
    pub label: String,
    pub location: usize, // Byte offset of the offset field in the code
    pub source: SourceLocation,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceContext {
    pub label_addresses: IndexMap<String, usize>,
    pub unresolved_refs: Vec<UnresolvedReference>,
}

impl ReferenceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a label at `address`. A second definition of the same name is
    /// an error at the second definition.
    pub fn define_label(
        &mut self,
        name: &str,
        address: usize,
        source: &SourceLocation,
    ) -> Result<(), CompilerError> {
        if self.label_addresses.contains_key(name) {
            return Err(CompilerError::DuplicateLabel(name.to_string(), source.clone()));
        }
        log::debug!("label '{}' at 0x{:04x}", name, address);
        self.label_addresses.insert(name.to_string(), address);
        Ok(())
    }

    pub fn address_of(&self, name: &str) -> Option<usize> {
        self.label_addresses.get(name).copied()
    }

    /// Record an offset field at `location` to be patched with the address of
    /// `label`.
    pub fn add_unresolved_reference(&mut self, label: &str, location: usize, source: &SourceLocation) {
        log::debug!(
            "forward reference to '{}' at 0x{:04x}",
            label,
            location
        );
        self.unresolved_refs.push(UnresolvedReference {
            label: label.to_string(),
            location,
            source: source.clone(),
        });
    }

    /// Patch every recorded reference. Fails with all missing label names
    /// (each once, in order of first use) when any label was never defined.
    pub fn resolve_references(&mut self, code: &mut [u8]) -> Result<(), CompilerError> {
        let missing: IndexSet<&str> = self
            .unresolved_refs
            .iter()
            .filter(|reference| !self.label_addresses.contains_key(&reference.label))
            .map(|reference| reference.label.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(CompilerError::UnresolvedLabels(
                missing.into_iter().map(str::to_string).collect(),
            ));
        }

        for reference in &self.unresolved_refs {
            let target = self.label_addresses[&reference.label];
            let offset = relative_offset(reference.location, target, &reference.label)?;
            patch_offset(code, reference.location, offset)?;
            log::debug!(
                "patched jump to '{}' at 0x{:04x}: {:+}",
                reference.label,
                reference.location,
                offset
            );
        }

        log::info!(
            "resolved {} forward reference(s) against {} label(s)",
            self.unresolved_refs.len(),
            self.label_addresses.len()
        );
        self.unresolved_refs.clear();
        Ok(())
    }
}

/// Offset stored in the field at `field` so execution continues at `target`.
pub fn relative_offset(field: usize, target: usize, what: &str) -> Result<i16, CompilerError> {
    let distance = target as i64 - (field as i64 + 2);
    i16::try_from(distance).map_err(|_| {
        CompilerError::JumpOutOfRange(format!(
            "jump to {} at 0x{:04x} from 0x{:04x} spans {} bytes",
            what, target, field, distance
        ))
    })
}

/// Overwrite the 2-byte field at `field` with `offset` (little-endian).
pub fn patch_offset(code: &mut [u8], field: usize, offset: i16) -> Result<(), CompilerError> {
    let len = code.len();
    let slot = code.get_mut(field..field + 2).ok_or_else(|| {
        CompilerError::CodeGenError(format!(
            "offset field at 0x{:04x} is outside the {}-byte code buffer",
            field, len
        ))
    })?;
    slot.copy_from_slice(&offset.to_le_bytes());
    Ok(())
}
