//! The selector document: a tree of named selectors holding layer-path and
//! animation items, mutated exclusively through undoable operations.

pub(crate) mod node;
pub(crate) mod notify;
pub(crate) mod op;


use std::rc::Rc;

use crate::error::{Error, Result};
use crate::locale::Strings;

use node::{Item, ItemKind, NodeId, Param, Selector};
use notify::{ChangeCallback, ChangeEvent, StateCallback};
use op::{Op, OpType};

/// The document tree plus its scalar fields. Everything here is owned
/// exclusively; external code addresses nodes by id only.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct State {
    pub(crate) version: i32,
    pub(crate) label: String,
    pub(crate) psd_path: String,
    /// `None` means the information line is auto-generated at save time.
    pub(crate) information: Option<String>,
    pub(crate) default_character_id: Option<String>,
    pub(crate) exclusive_support_default: bool,
    pub(crate) selectors: Vec<Selector>,
    /// Next id to hand out. Monotonic for the document's whole lifetime;
    /// neither reset nor load lowers it, so ids are never reused.
    pub(crate) next_id: u32,
}

impl State {
    pub(crate) fn empty(strings: &Strings, next_id: u32) -> Self {
        Self {
            version: 1,
            label: strings.default_label.clone(),
            psd_path: String::new(),
            information: None,
            default_character_id: None,
            exclusive_support_default: true,
            selectors: Vec::new(),
            next_id,
        }
    }

    pub(crate) fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn find_selector(&self, id: NodeId) -> Option<usize> {
        self.selectors.iter().position(|sel| sel.id == id)
    }

    pub(crate) fn find_item(&self, id: NodeId) -> Option<(usize, usize)> {
        for (s, sel) in self.selectors.iter().enumerate() {
            if let Some(i) = sel.items.iter().position(|it| it.id == id) {
                return Some((s, i));
            }
        }
        None
    }

    pub(crate) fn find_param(&self, id: NodeId) -> Option<(usize, usize, usize)> {
        for (s, sel) in self.selectors.iter().enumerate() {
            for (i, item) in sel.items.iter().enumerate() {
                if let Some(p) = item.params().iter().position(|param| param.id == id) {
                    return Some((s, i, p));
                }
            }
        }
        None
    }

    /// Id of the selector after position `idx`, or `NONE` when `idx` is last.
    pub(crate) fn selector_after(&self, idx: usize) -> NodeId {
        match self.selectors.get(idx + 1) {
            Some(sel) => sel.id,
            None => NodeId::NONE,
        }
    }
}

/// Undo and redo stacks plus transaction bookkeeping. Ops on a stack own any
/// detached subtrees they transport; dropping the stack drops the subtrees.
#[derive(Debug, Default)]
struct History {
    undo: Vec<Op>,
    redo: Vec<Op>,
    transaction_depth: u32,
}

impl History {
    fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.transaction_depth = 0;
    }
}

/// A selector document with a transactional undo/redo engine and synchronous
/// change notifications.
///
/// All mutators are all-or-nothing: on error the tree is unchanged, nothing
/// is recorded, and no notification fires. Callbacks run synchronously on the
/// mutating call and must not mutate the document re-entrantly.
pub struct Document {
    pub(crate) state: State,
    history: History,
    pub(crate) strings: Strings,
    change_callback: Option<ChangeCallback>,
    state_callback: Option<StateCallback>,
    pub(crate) modified: bool,
    pub(crate) stored_checksum: u64,
    pub(crate) calculated_checksum: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with the default (English) string table.
    pub fn new() -> Self {
        Self::with_strings(Strings::default())
    }

    /// Create an empty document using the host's localised string table.
    pub fn with_strings(strings: Strings) -> Self {
        Self {
            state: State::empty(&strings, 1),
            history: History::default(),
            strings,
            change_callback: None,
            state_callback: None,
            modified: false,
            stored_checksum: 0,
            calculated_checksum: 0,
        }
    }

    /// Reinitialise to the empty document. Callbacks and the id counter
    /// survive; both history stacks are dropped.
    pub fn reset(&mut self) {
        let next_id = self.state.next_id;
        self.state = State::empty(&self.strings, next_id);
        self.history.clear();
        self.modified = false;
        self.stored_checksum = 0;
        self.calculated_checksum = 0;
        self.notify_change(&ChangeEvent::scalar(OpType::Reset));
        self.notify_state();
    }

    // ---------------------------------------------------------------------
    // Callbacks
    // ---------------------------------------------------------------------

    /// Install the per-operation change callback.
    pub fn set_change_callback(&mut self, callback: impl Fn(&ChangeEvent) + 'static) {
        self.change_callback = Some(Rc::new(callback));
    }

    pub fn clear_change_callback(&mut self) {
        self.change_callback = None;
    }

    /// Install the coarse state callback, fired after every successful state
    /// change (mutation, undo/redo, transaction boundary, save, load).
    pub fn set_state_callback(&mut self, callback: impl Fn() + 'static) {
        self.state_callback = Some(Rc::new(callback));
    }

    pub fn clear_state_callback(&mut self) {
        self.state_callback = None;
    }

    pub(crate) fn notify_change(&mut self, event: &ChangeEvent) {
        if event.op != OpType::Reset {
            self.modified = true;
        }
        if let Some(callback) = self.change_callback.clone() {
            callback(event);
        }
    }

    pub(crate) fn notify_state(&self) {
        if let Some(callback) = self.state_callback.clone() {
            callback();
        }
    }

    // ---------------------------------------------------------------------
    // Scalar accessors
    // ---------------------------------------------------------------------

    pub fn version(&self) -> i32 {
        self.state.version
    }

    pub fn label(&self) -> &str {
        &self.state.label
    }

    pub fn psd_path(&self) -> &str {
        &self.state.psd_path
    }

    /// Custom information text, or `None` when it is auto-generated from the
    /// PSD file name at save time.
    pub fn information(&self) -> Option<&str> {
        self.state.information.as_deref()
    }

    pub fn default_character_id(&self) -> Option<&str> {
        self.state.default_character_id.as_deref()
    }

    pub fn exclusive_support_default(&self) -> bool {
        self.state.exclusive_support_default
    }

    /// True while the document has changes not yet written to disk.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Checksum recorded in the header of the last loaded file.
    pub fn stored_checksum(&self) -> u64 {
        self.stored_checksum
    }

    /// Checksum computed over the body of the last loaded file.
    pub fn calculated_checksum(&self) -> u64 {
        self.calculated_checksum
    }

    /// True when the last loaded file's body matches its recorded checksum.
    /// Loading never fails on a mismatch; the host decides how to warn.
    pub fn verify_checksum(&self) -> bool {
        self.stored_checksum == self.calculated_checksum
    }

    // ---------------------------------------------------------------------
    // Tree accessors
    // ---------------------------------------------------------------------

    pub fn selector_count(&self) -> usize {
        self.state.selectors.len()
    }

    pub fn selector_id_at(&self, index: usize) -> Option<NodeId> {
        self.state.selectors.get(index).map(|sel| sel.id)
    }

    pub fn find_selector(&self, id: NodeId) -> Option<usize> {
        self.state.find_selector(id)
    }

    pub fn selector_name(&self, id: NodeId) -> Option<&str> {
        let idx = self.state.find_selector(id)?;
        Some(self.state.selectors[idx].name.as_str())
    }

    /// Number of items in a selector; zero when the id is unknown.
    pub fn item_count(&self, selector: NodeId) -> usize {
        match self.state.find_selector(selector) {
            Some(idx) => self.state.selectors[idx].items.len(),
            None => 0,
        }
    }

    pub fn item_id_at(&self, selector: NodeId, index: usize) -> Option<NodeId> {
        let idx = self.state.find_selector(selector)?;
        self.state.selectors[idx].items.get(index).map(|it| it.id)
    }

    /// Selector and item position of an item id.
    pub fn find_item(&self, id: NodeId) -> Option<(usize, usize)> {
        self.state.find_item(id)
    }

    pub fn item_name(&self, id: NodeId) -> Option<&str> {
        let (s, i) = self.state.find_item(id)?;
        Some(self.state.selectors[s].items[i].name.as_str())
    }

    /// Layer path of a value item; `None` for animation items.
    pub fn item_value(&self, id: NodeId) -> Option<&str> {
        let (s, i) = self.state.find_item(id)?;
        match &self.state.selectors[s].items[i].kind {
            ItemKind::Value { value } => Some(value),
            ItemKind::Animation { .. } => None,
        }
    }

    /// Script name of an animation item; `None` for value items.
    pub fn item_script_name(&self, id: NodeId) -> Option<&str> {
        let (s, i) = self.state.find_item(id)?;
        match &self.state.selectors[s].items[i].kind {
            ItemKind::Animation { script_name, .. } => Some(script_name),
            ItemKind::Value { .. } => None,
        }
    }

    pub fn item_is_animation(&self, id: NodeId) -> bool {
        match self.state.find_item(id) {
            Some((s, i)) => self.state.selectors[s].items[i].is_animation(),
            None => false,
        }
    }

    /// Number of parameters of an item; zero for value items and unknown ids.
    pub fn param_count(&self, item: NodeId) -> usize {
        match self.state.find_item(item) {
            Some((s, i)) => self.state.selectors[s].items[i].params().len(),
            None => 0,
        }
    }

    pub fn param_id_at(&self, item: NodeId, index: usize) -> Option<NodeId> {
        let (s, i) = self.state.find_item(item)?;
        self.state.selectors[s].items[i]
            .params()
            .get(index)
            .map(|p| p.id)
    }

    /// Selector, item, and parameter position of a parameter id.
    pub fn find_param(&self, id: NodeId) -> Option<(usize, usize, usize)> {
        self.state.find_param(id)
    }

    pub fn param_key(&self, id: NodeId) -> Option<&str> {
        let (s, i, p) = self.state.find_param(id)?;
        Some(self.state.selectors[s].items[i].params()[p].key.as_str())
    }

    pub fn param_value(&self, id: NodeId) -> Option<&str> {
        let (s, i, p) = self.state.find_param(id)?;
        Some(self.state.selectors[s].items[i].params()[p].value.as_str())
    }

    /// Id of the item owning a parameter.
    pub fn param_item_id(&self, id: NodeId) -> Option<NodeId> {
        let (s, i, _) = self.state.find_param(id)?;
        Some(self.state.selectors[s].items[i].id)
    }

    // ---------------------------------------------------------------------
    // Userdata (UI-owned, outside undo and serialisation)
    // ---------------------------------------------------------------------

    pub fn selector_userdata(&self, id: NodeId) -> Option<usize> {
        let idx = self.state.find_selector(id)?;
        Some(self.state.selectors[idx].userdata)
    }

    /// Store an opaque UI value on a selector. Unknown ids are ignored; no
    /// notification fires and the modified flag is untouched.
    pub fn set_selector_userdata(&mut self, id: NodeId, userdata: usize) {
        if let Some(idx) = self.state.find_selector(id) {
            self.state.selectors[idx].userdata = userdata;
        }
    }

    pub fn item_userdata(&self, id: NodeId) -> Option<usize> {
        let (s, i) = self.state.find_item(id)?;
        Some(self.state.selectors[s].items[i].userdata)
    }

    pub fn set_item_userdata(&mut self, id: NodeId, userdata: usize) {
        if let Some((s, i)) = self.state.find_item(id) {
            self.state.selectors[s].items[i].userdata = userdata;
        }
    }

    pub fn param_userdata(&self, id: NodeId) -> Option<usize> {
        let (s, i, p) = self.state.find_param(id)?;
        Some(self.state.selectors[s].items[i].params()[p].userdata)
    }

    pub fn set_param_userdata(&mut self, id: NodeId, userdata: usize) {
        if let Some((s, i, p)) = self.state.find_param(id) {
            if let ItemKind::Animation { params, .. } = &mut self.state.selectors[s].items[i].kind {
                params[p].userdata = userdata;
            }
        }
    }

    // ---------------------------------------------------------------------
    // Scalar mutators
    // ---------------------------------------------------------------------

    pub fn set_label(&mut self, label: &str) -> Result<()> {
        self.commit(Op::SetLabel(label.to_owned()))
    }

    pub fn set_psd_path(&mut self, path: &str) -> Result<()> {
        self.commit(Op::SetPsdPath(path.to_owned()))
    }

    /// Set the information text; `None` switches back to auto-generation.
    pub fn set_information(&mut self, information: Option<&str>) -> Result<()> {
        self.commit(Op::SetInformation(information.map(str::to_owned)))
    }

    pub fn set_default_character_id(&mut self, character_id: Option<&str>) -> Result<()> {
        self.commit(Op::SetDefaultCharacterId(character_id.map(str::to_owned)))
    }

    pub fn set_exclusive_support_default(&mut self, exclusive: bool) -> Result<()> {
        self.commit(Op::SetExclusiveSupportDefault(exclusive))
    }

    // ---------------------------------------------------------------------
    // Selector mutators
    // ---------------------------------------------------------------------

    /// Insert a new selector before `before` (`NONE` or an unknown id appends
    /// at the end). An empty name becomes the localised unnamed-selector
    /// name. Returns the new selector's id.
    pub fn selector_insert(&mut self, before: NodeId, name: &str) -> Result<NodeId> {
        let name = if name.is_empty() {
            self.strings.unnamed_selector.clone()
        } else {
            name.to_owned()
        };
        let id = self.state.allocate_id();
        let selector = Selector {
            id,
            name,
            userdata: 0,
            items: Vec::new(),
        };
        self.commit(Op::SelectorInsert { before, selector })?;
        Ok(id)
    }

    /// Remove a selector with all its items; the subtree is retained by the
    /// undo history.
    pub fn selector_remove(&mut self, id: NodeId) -> Result<()> {
        if self.state.find_selector(id).is_none() {
            return Err(Error::SelectorNotFound(id.0));
        }
        self.commit(Op::SelectorRemove { id })
    }

    pub fn selector_set_name(&mut self, id: NodeId, name: &str) -> Result<()> {
        if self.state.find_selector(id).is_none() {
            return Err(Error::SelectorNotFound(id.0));
        }
        self.commit(Op::SelectorSetName {
            id,
            name: name.to_owned(),
        })
    }

    /// Reorder a selector to sit before `before` (`NONE` = at end). Moving to
    /// the current position succeeds without recording or notifying anything.
    pub fn selector_move(&mut self, id: NodeId, before: NodeId) -> Result<()> {
        let from = self
            .state
            .find_selector(id)
            .ok_or(Error::SelectorNotFound(id.0))?;
        if !would_move_within(from, self.target_selector_index(before)) {
            return Ok(());
        }
        self.commit(Op::SelectorMove { id, before })
    }

    /// True iff `selector_move` with the same arguments would change the
    /// observable order.
    pub fn selector_would_move(&self, id: NodeId, before: NodeId) -> bool {
        let Some(from) = self.state.find_selector(id) else {
            return false;
        };
        would_move_within(from, self.target_selector_index(before))
    }

    fn target_selector_index(&self, before: NodeId) -> usize {
        if before.is_some() {
            self.state
                .find_selector(before)
                .unwrap_or(self.state.selectors.len())
        } else {
            self.state.selectors.len()
        }
    }

    // ---------------------------------------------------------------------
    // Item mutators
    // ---------------------------------------------------------------------

    /// Insert a value item. `before` names either a selector (append at its
    /// end) or an item (insert before it). Returns the new item's id.
    pub fn item_insert_value(&mut self, before: NodeId, name: &str, value: &str) -> Result<NodeId> {
        let (selector, item_before) = self.resolve_item_position(before)?;
        let id = self.state.allocate_id();
        let item = Item {
            id,
            name: name.to_owned(),
            userdata: 0,
            kind: ItemKind::Value {
                value: value.to_owned(),
            },
        };
        self.commit(Op::ItemInsert {
            selector,
            before: item_before,
            item,
        })?;
        Ok(id)
    }

    /// Insert an animation item with an empty parameter list. `before` is
    /// interpreted as in [`Document::item_insert_value`].
    pub fn item_insert_animation(
        &mut self,
        before: NodeId,
        script_name: &str,
        name: &str,
    ) -> Result<NodeId> {
        let (selector, item_before) = self.resolve_item_position(before)?;
        let id = self.state.allocate_id();
        let item = Item {
            id,
            name: name.to_owned(),
            userdata: 0,
            kind: ItemKind::Animation {
                script_name: script_name.to_owned(),
                params: Vec::new(),
            },
        };
        self.commit(Op::ItemInsert {
            selector,
            before: item_before,
            item,
        })?;
        Ok(id)
    }

    pub fn item_remove(&mut self, id: NodeId) -> Result<()> {
        if self.state.find_item(id).is_none() {
            return Err(Error::ItemNotFound(id.0));
        }
        self.commit(Op::ItemRemove { id })
    }

    /// Move an item, possibly across selectors. `before` names either a
    /// selector (append at its end) or an item (insert before it). Moving to
    /// the current position succeeds without recording or notifying anything.
    pub fn item_move(&mut self, id: NodeId, before: NodeId) -> Result<()> {
        let (from_s, from_i) = self.state.find_item(id).ok_or(Error::ItemNotFound(id.0))?;
        let (selector, item_before) = self.resolve_item_position(before)?;
        if !self.item_move_changes_position(from_s, from_i, selector, item_before) {
            return Ok(());
        }
        self.commit(Op::ItemMove {
            id,
            selector,
            before: item_before,
        })
    }

    /// True iff `item_move` with the same arguments would change the
    /// observable order.
    pub fn item_would_move(&self, id: NodeId, before: NodeId) -> bool {
        let Some((from_s, from_i)) = self.state.find_item(id) else {
            return false;
        };
        let Ok((selector, item_before)) = self.resolve_item_position(before) else {
            return false;
        };
        self.item_move_changes_position(from_s, from_i, selector, item_before)
    }

    pub fn item_set_name(&mut self, id: NodeId, name: &str) -> Result<()> {
        if self.state.find_item(id).is_none() {
            return Err(Error::ItemNotFound(id.0));
        }
        self.commit(Op::ItemSetName {
            id,
            name: name.to_owned(),
        })
    }

    /// Replace the layer path of a value item. Fails on animation items.
    pub fn item_set_value(&mut self, id: NodeId, value: &str) -> Result<()> {
        self.commit(Op::ItemSetValue {
            id,
            value: value.to_owned(),
        })
    }

    /// Replace the script name of an animation item. Fails on value items.
    pub fn item_set_script_name(&mut self, id: NodeId, script_name: &str) -> Result<()> {
        self.commit(Op::ItemSetScriptName {
            id,
            script_name: script_name.to_owned(),
        })
    }

    /// Resolve the dual `before` addressing of item inserts and moves into a
    /// destination selector plus an optional in-selector position.
    fn resolve_item_position(&self, before: NodeId) -> Result<(NodeId, NodeId)> {
        if before.is_none() {
            return Err(Error::InvalidPosition(before.0));
        }
        if self.state.find_selector(before).is_some() {
            return Ok((before, NodeId::NONE));
        }
        let (s, _) = self
            .state
            .find_item(before)
            .ok_or(Error::InvalidPosition(before.0))?;
        Ok((self.state.selectors[s].id, before))
    }

    fn item_move_changes_position(
        &self,
        from_s: usize,
        from_i: usize,
        selector: NodeId,
        item_before: NodeId,
    ) -> bool {
        let Some(to_s) = self.state.find_selector(selector) else {
            return false;
        };
        if from_s != to_s {
            return true;
        }
        let items = &self.state.selectors[to_s].items;
        let mut to_i = if item_before.is_some() {
            items
                .iter()
                .position(|it| it.id == item_before)
                .unwrap_or(items.len())
        } else {
            items.len()
        };
        if from_i < to_i {
            to_i -= 1;
        }
        from_i != to_i
    }

    // ---------------------------------------------------------------------
    // Parameter mutators
    // ---------------------------------------------------------------------

    /// Insert a key/value parameter into an animation item, before
    /// `before_param` (`NONE` = at end). The position must belong to the same
    /// item. Returns the new parameter's id.
    pub fn param_insert(
        &mut self,
        item: NodeId,
        before_param: NodeId,
        key: &str,
        value: &str,
    ) -> Result<NodeId> {
        let (s, i) = self.state.find_item(item).ok_or(Error::ItemNotFound(item.0))?;
        if !self.state.selectors[s].items[i].is_animation() {
            return Err(Error::NotAnimationItem(item.0));
        }
        if before_param.is_some() {
            let (ps, pi, _) = self
                .state
                .find_param(before_param)
                .ok_or(Error::ParamNotFound(before_param.0))?;
            if (ps, pi) != (s, i) {
                return Err(Error::ParamOutsideItem(before_param.0, item.0));
            }
        }
        let id = self.state.allocate_id();
        let param = Param {
            id,
            key: key.to_owned(),
            value: value.to_owned(),
            userdata: 0,
        };
        self.commit(Op::ParamInsert {
            item,
            before: before_param,
            param,
        })?;
        Ok(id)
    }

    pub fn param_remove(&mut self, id: NodeId) -> Result<()> {
        if self.state.find_param(id).is_none() {
            return Err(Error::ParamNotFound(id.0));
        }
        self.commit(Op::ParamRemove { id })
    }

    pub fn param_set_key(&mut self, id: NodeId, key: &str) -> Result<()> {
        self.commit(Op::ParamSetKey {
            id,
            key: key.to_owned(),
        })
    }

    pub fn param_set_value(&mut self, id: NodeId, value: &str) -> Result<()> {
        self.commit(Op::ParamSetValue {
            id,
            value: value.to_owned(),
        })
    }

    // ---------------------------------------------------------------------
    // Undo, redo, transactions
    // ---------------------------------------------------------------------

    pub fn can_undo(&self) -> bool {
        !self.history.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.history.redo.is_empty()
    }

    /// Undo the most recent operation or, when the stack top is a
    /// transaction marker, the whole transaction. Returns false when there is
    /// nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        let Some(first) = self.history.undo.pop() else {
            return Ok(false);
        };
        let grouped = matches!(first, Op::TransactionEnd);
        let mut current = first;
        loop {
            let closes_group = matches!(current, Op::TransactionBegin);
            let (inverse, event) = op::apply(&mut self.state, current)?;
            self.notify_change(&event);
            self.history.redo.push(inverse);
            if !grouped || closes_group {
                break;
            }
            match self.history.undo.pop() {
                Some(next) => current = next,
                None => break,
            }
        }
        self.notify_state();
        Ok(true)
    }

    /// Replay the most recently undone operation or transaction. Returns
    /// false when there is nothing to redo.
    pub fn redo(&mut self) -> Result<bool> {
        let Some(first) = self.history.redo.pop() else {
            return Ok(false);
        };
        let grouped = matches!(first, Op::TransactionEnd);
        let mut current = first;
        loop {
            let closes_group = matches!(current, Op::TransactionBegin);
            let (inverse, event) = op::apply(&mut self.state, current)?;
            self.notify_change(&event);
            self.history.undo.push(inverse);
            if !grouped || closes_group {
                break;
            }
            match self.history.redo.pop() {
                Some(next) => current = next,
                None => break,
            }
        }
        self.notify_state();
        Ok(true)
    }

    /// Open a transaction; everything recorded until the matching
    /// `end_transaction` undoes and redoes as one step. Nesting only adjusts
    /// a counter.
    pub fn begin_transaction(&mut self) {
        if self.history.transaction_depth == 0 {
            self.history.redo.clear();
            self.history.undo.push(Op::TransactionBegin);
            self.notify_change(&ChangeEvent::scalar(OpType::TransactionBegin));
            self.notify_state();
        }
        self.history.transaction_depth += 1;
    }

    /// Close the innermost transaction. A transaction that recorded nothing
    /// leaves no trace on the undo stack.
    pub fn end_transaction(&mut self) -> Result<()> {
        if self.history.transaction_depth == 0 {
            return Err(Error::NoTransaction);
        }
        self.history.transaction_depth -= 1;
        if self.history.transaction_depth == 0 {
            if matches!(self.history.undo.last(), Some(Op::TransactionBegin)) {
                self.history.undo.pop();
                // The toolbar lit up on begin; put it back.
                self.notify_state();
                return Ok(());
            }
            self.history.undo.push(Op::TransactionEnd);
            self.notify_change(&ChangeEvent::scalar(OpType::TransactionEnd));
            self.notify_state();
        }
        Ok(())
    }

    /// Drop both history stacks along with any detached subtrees they own.
    pub fn clear_undo_history(&mut self) {
        self.history.undo.clear();
        self.history.redo.clear();
    }

    pub(crate) fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Apply a forward op: mutate, record the inverse, drop the redo tail,
    /// and fire both notifications.
    fn commit(&mut self, op: Op) -> Result<()> {
        let (inverse, event) = op::apply(&mut self.state, op)?;
        self.notify_change(&event);
        self.history.undo.push(inverse);
        self.history.redo.clear();
        self.notify_state();
        Ok(())
    }
}

/// Shared no-op detection for reorders: `to` is the raw target index, which
/// shifts down by one when the element leaves a lower position first.
fn would_move_within(from: usize, mut to: usize) -> bool {
    if from < to {
        to -= 1;
    }
    from != to
}
