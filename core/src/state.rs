//! Session-wide mutable state.
//!
//! Holds the last audit and rewrite results plus the reset generation. Input
//! fields are addressed through [`WidgetKey`]s that embed the generation, so
//! bumping it makes every previously collected input unreachable at once
//! instead of editing values in place.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::models::AuditResult;
use crate::models::RewriteResult;

/// Named result holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Audit,
    Rewrite,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Audit, Slot::Rewrite];
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Audit => f.write_str("audit"),
            Slot::Rewrite => f.write_str("rewrite"),
        }
    }
}

/// User-editable inputs whose identity is tied to the generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputField {
    /// Path of the uploaded file for the audit.
    AuditUpload,
    /// Pasted source for the audit.
    AuditCode,
    /// Draft text for the rewrite.
    RewriteDraft,
}

impl InputField {
    fn prefix(self) -> &'static str {
        match self {
            InputField::AuditUpload => "u",
            InputField::AuditCode => "t",
            InputField::RewriteDraft => "g",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetKey {
    pub field: InputField,
    pub generation: u64,
}

impl fmt::Display for WidgetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.field.prefix(), self.generation)
    }
}

/// Borrowed view of a populated slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotValue<'a> {
    Audit(&'a AuditResult),
    Rewrite(&'a RewriteResult),
}

impl SlotValue<'_> {
    pub fn raw_text(&self) -> &str {
        match self {
            SlotValue::Audit(result) => result.raw_text(),
            SlotValue::Rewrite(result) => result.raw_text(),
        }
    }
}

/// Per-session state. Not shared across sessions and never persisted.
#[derive(Debug, Default)]
pub struct SessionState {
    audit: Option<AuditResult>,
    rewrite: Option<RewriteResult>,
    generation: u64,
    inputs: HashMap<WidgetKey, String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, slot: Slot) -> Option<SlotValue<'_>> {
        match slot {
            Slot::Audit => self.audit.as_ref().map(SlotValue::Audit),
            Slot::Rewrite => self.rewrite.as_ref().map(SlotValue::Rewrite),
        }
    }

    pub fn is_populated(&self, slot: Slot) -> bool {
        self.get(slot).is_some()
    }

    pub fn audit(&self) -> Option<&AuditResult> {
        self.audit.as_ref()
    }

    pub fn rewrite(&self) -> Option<&RewriteResult> {
        self.rewrite.as_ref()
    }

    /// Store a new audit result, replacing any previous one.
    pub fn set_audit(&mut self, result: AuditResult) -> &AuditResult {
        self.audit.insert(result)
    }

    /// Store a new rewrite result, replacing any previous one.
    pub fn set_rewrite(&mut self, result: RewriteResult) -> &RewriteResult {
        self.rewrite.insert(result)
    }

    /// Clear one slot and advance the generation by one.
    pub fn reset_slot(&mut self, slot: Slot) {
        match slot {
            Slot::Audit => self.audit = None,
            Slot::Rewrite => self.rewrite = None,
        }
        self.bump_generation();
        debug!(%slot, generation = self.generation, "reset slot");
    }

    /// Clear every slot, then advance the generation exactly once.
    pub fn reset_all(&mut self) {
        self.audit = None;
        self.rewrite = None;
        self.bump_generation();
        debug!(generation = self.generation, "reset session");
    }

    /// Identity of `field` for the current generation.
    pub fn widget_key(&self, field: InputField) -> WidgetKey {
        WidgetKey {
            field,
            generation: self.generation,
        }
    }

    pub fn set_input(&mut self, field: InputField, value: impl Into<String>) {
        let key = self.widget_key(field);
        self.inputs.insert(key, value.into());
    }

    /// Value of `field` under the current generation; inputs collected
    /// before the last reset are not visible.
    pub fn input(&self, field: InputField) -> Option<&str> {
        self.inputs
            .get(&self.widget_key(field))
            .map(String::as_str)
    }

    fn bump_generation(&mut self) {
        self.generation = self.generation.saturating_add(1);
        let current = self.generation;
        self.inputs.retain(|key, _| key.generation == current);
    }
}
