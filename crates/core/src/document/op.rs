use std::mem;

use crate::error::{Error, Result};

use super::State;
use super::node::{Item, ItemKind, NodeId, Param, Selector};
use super::notify::ChangeEvent;

/// Discriminant of an applied operation, carried on change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpType {
    SetLabel,
    SetPsdPath,
    SetInformation,
    SetDefaultCharacterId,
    SetExclusiveSupportDefault,
    SelectorInsert,
    SelectorRemove,
    SelectorMove,
    SelectorSetName,
    ItemInsert,
    ItemRemove,
    ItemMove,
    ItemSetName,
    ItemSetValue,
    ItemSetScriptName,
    ParamInsert,
    ParamRemove,
    ParamSetKey,
    ParamSetValue,
    TransactionBegin,
    TransactionEnd,
    /// The whole document was replaced (reset or load); views should rebuild.
    Reset,
}

/// A forward or inverse mutation of the document tree.
///
/// Insert variants own the subtree they will attach. Applying an op consumes
/// it: inserts move their subtree into the tree, removes move the detached
/// subtree out into the synthesised inverse. An op that fails to apply leaves
/// the tree untouched.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Op {
    SetLabel(String),
    SetPsdPath(String),
    SetInformation(Option<String>),
    SetDefaultCharacterId(Option<String>),
    SetExclusiveSupportDefault(bool),
    SelectorInsert {
        before: NodeId,
        selector: Selector,
    },
    SelectorRemove {
        id: NodeId,
    },
    SelectorMove {
        id: NodeId,
        before: NodeId,
    },
    SelectorSetName {
        id: NodeId,
        name: String,
    },
    ItemInsert {
        selector: NodeId,
        before: NodeId,
        item: Item,
    },
    ItemRemove {
        id: NodeId,
    },
    ItemMove {
        id: NodeId,
        selector: NodeId,
        before: NodeId,
    },
    ItemSetName {
        id: NodeId,
        name: String,
    },
    ItemSetValue {
        id: NodeId,
        value: String,
    },
    ItemSetScriptName {
        id: NodeId,
        script_name: String,
    },
    ParamInsert {
        item: NodeId,
        before: NodeId,
        param: Param,
    },
    ParamRemove {
        id: NodeId,
    },
    ParamSetKey {
        id: NodeId,
        key: String,
    },
    ParamSetValue {
        id: NodeId,
        value: String,
    },
    TransactionBegin,
    TransactionEnd,
}

/// Apply `op` to the tree, returning the inverse op and the notification
/// describing the change in the post-mutation tree.
pub(crate) fn apply(state: &mut State, op: Op) -> Result<(Op, ChangeEvent)> {
    match op {
        Op::SetLabel(value) => {
            let prev = mem::replace(&mut state.label, value);
            Ok((Op::SetLabel(prev), ChangeEvent::scalar(OpType::SetLabel)))
        }
        Op::SetPsdPath(value) => {
            let prev = mem::replace(&mut state.psd_path, value);
            Ok((Op::SetPsdPath(prev), ChangeEvent::scalar(OpType::SetPsdPath)))
        }
        Op::SetInformation(value) => {
            let prev = mem::replace(&mut state.information, value);
            Ok((
                Op::SetInformation(prev),
                ChangeEvent::scalar(OpType::SetInformation),
            ))
        }
        Op::SetDefaultCharacterId(value) => {
            let prev = mem::replace(&mut state.default_character_id, value);
            Ok((
                Op::SetDefaultCharacterId(prev),
                ChangeEvent::scalar(OpType::SetDefaultCharacterId),
            ))
        }
        Op::SetExclusiveSupportDefault(value) => {
            let prev = mem::replace(&mut state.exclusive_support_default, value);
            Ok((
                Op::SetExclusiveSupportDefault(prev),
                ChangeEvent::scalar(OpType::SetExclusiveSupportDefault),
            ))
        }
        Op::SelectorInsert { before, selector } => insert_selector(state, before, selector),
        Op::SelectorRemove { id } => remove_selector(state, id),
        Op::SelectorMove { id, before } => move_selector(state, id, before),
        Op::SelectorSetName { id, name } => {
            let idx = state
                .find_selector(id)
                .ok_or(Error::SelectorNotFound(id.0))?;
            let prev = mem::replace(&mut state.selectors[idx].name, name);
            Ok((
                Op::SelectorSetName { id, name: prev },
                ChangeEvent::node(OpType::SelectorSetName, id, NodeId::NONE, NodeId::NONE),
            ))
        }
        Op::ItemInsert {
            selector,
            before,
            item,
        } => insert_item(state, selector, before, item),
        Op::ItemRemove { id } => remove_item(state, id),
        Op::ItemMove {
            id,
            selector,
            before,
        } => move_item(state, id, selector, before),
        Op::ItemSetName { id, name } => {
            let (s, i) = state.find_item(id).ok_or(Error::ItemNotFound(id.0))?;
            let prev = mem::replace(&mut state.selectors[s].items[i].name, name);
            Ok((
                Op::ItemSetName { id, name: prev },
                ChangeEvent::node(OpType::ItemSetName, id, NodeId::NONE, NodeId::NONE),
            ))
        }
        Op::ItemSetValue { id, value } => {
            let (s, i) = state.find_item(id).ok_or(Error::ItemNotFound(id.0))?;
            match &mut state.selectors[s].items[i].kind {
                ItemKind::Value { value: slot } => {
                    let prev = mem::replace(slot, value);
                    Ok((
                        Op::ItemSetValue { id, value: prev },
                        ChangeEvent::node(OpType::ItemSetValue, id, NodeId::NONE, NodeId::NONE),
                    ))
                }
                ItemKind::Animation { .. } => Err(Error::NotValueItem(id.0)),
            }
        }
        Op::ItemSetScriptName { id, script_name } => {
            let (s, i) = state.find_item(id).ok_or(Error::ItemNotFound(id.0))?;
            match &mut state.selectors[s].items[i].kind {
                ItemKind::Animation {
                    script_name: slot, ..
                } => {
                    let prev = mem::replace(slot, script_name);
                    Ok((
                        Op::ItemSetScriptName {
                            id,
                            script_name: prev,
                        },
                        ChangeEvent::node(OpType::ItemSetScriptName, id, NodeId::NONE, NodeId::NONE),
                    ))
                }
                ItemKind::Value { .. } => Err(Error::NotAnimationItem(id.0)),
            }
        }
        Op::ParamInsert {
            item,
            before,
            param,
        } => insert_param(state, item, before, param),
        Op::ParamRemove { id } => remove_param(state, id),
        Op::ParamSetKey { id, key } => {
            let (s, i, p) = state.find_param(id).ok_or(Error::ParamNotFound(id.0))?;
            let item_id = state.selectors[s].items[i].id;
            let params =
                params_mut(&mut state.selectors[s].items[i]).ok_or(Error::ParamNotFound(id.0))?;
            let prev = mem::replace(&mut params[p].key, key);
            Ok((
                Op::ParamSetKey { id, key: prev },
                ChangeEvent::node(OpType::ParamSetKey, id, item_id, NodeId::NONE),
            ))
        }
        Op::ParamSetValue { id, value } => {
            let (s, i, p) = state.find_param(id).ok_or(Error::ParamNotFound(id.0))?;
            let item_id = state.selectors[s].items[i].id;
            let params =
                params_mut(&mut state.selectors[s].items[i]).ok_or(Error::ParamNotFound(id.0))?;
            let prev = mem::replace(&mut params[p].value, value);
            Ok((
                Op::ParamSetValue { id, value: prev },
                ChangeEvent::node(OpType::ParamSetValue, id, item_id, NodeId::NONE),
            ))
        }
        Op::TransactionBegin => Ok((
            Op::TransactionEnd,
            ChangeEvent::scalar(OpType::TransactionBegin),
        )),
        Op::TransactionEnd => Ok((
            Op::TransactionBegin,
            ChangeEvent::scalar(OpType::TransactionEnd),
        )),
    }
}

fn insert_selector(
    state: &mut State,
    before: NodeId,
    selector: Selector,
) -> Result<(Op, ChangeEvent)> {
    let len = state.selectors.len();
    let idx = if before.is_some() {
        state.find_selector(before).unwrap_or(len)
    } else {
        len
    };
    let id = selector.id;
    state.selectors.insert(idx, selector);
    let before_now = state.selector_after(idx);
    Ok((
        Op::SelectorRemove { id },
        ChangeEvent::node(OpType::SelectorInsert, id, NodeId::NONE, before_now),
    ))
}

fn remove_selector(state: &mut State, id: NodeId) -> Result<(Op, ChangeEvent)> {
    let idx = state
        .find_selector(id)
        .ok_or(Error::SelectorNotFound(id.0))?;
    let before_next = state.selector_after(idx);
    let selector = state.selectors.remove(idx);
    Ok((
        Op::SelectorInsert {
            before: before_next,
            selector,
        },
        ChangeEvent::node(OpType::SelectorRemove, id, NodeId::NONE, NodeId::NONE),
    ))
}

fn move_selector(state: &mut State, id: NodeId, before: NodeId) -> Result<(Op, ChangeEvent)> {
    let from = state
        .find_selector(id)
        .ok_or(Error::SelectorNotFound(id.0))?;
    let len = state.selectors.len();
    let mut to = if before.is_some() {
        state.find_selector(before).unwrap_or(len)
    } else {
        len
    };
    if from < to {
        to -= 1;
    }
    // Captured before the move so the inverse lands back at the source slot.
    let reverse_before = state.selector_after(from);
    if from != to {
        let selector = state.selectors.remove(from);
        state.selectors.insert(to, selector);
    }
    let before_now = state.selector_after(to);
    Ok((
        Op::SelectorMove {
            id,
            before: reverse_before,
        },
        ChangeEvent::node(OpType::SelectorMove, id, NodeId::NONE, before_now),
    ))
}

fn insert_item(
    state: &mut State,
    selector: NodeId,
    before: NodeId,
    item: Item,
) -> Result<(Op, ChangeEvent)> {
    let s = state
        .find_selector(selector)
        .ok_or(Error::SelectorNotFound(selector.0))?;
    let items = &mut state.selectors[s].items;
    let idx = if before.is_some() {
        items
            .iter()
            .position(|it| it.id == before)
            .unwrap_or(items.len())
    } else {
        items.len()
    };
    let id = item.id;
    items.insert(idx, item);
    let before_now = state.selectors[s].item_after(idx);
    Ok((
        Op::ItemRemove { id },
        ChangeEvent::node(OpType::ItemInsert, id, selector, before_now),
    ))
}

fn remove_item(state: &mut State, id: NodeId) -> Result<(Op, ChangeEvent)> {
    let (s, i) = state.find_item(id).ok_or(Error::ItemNotFound(id.0))?;
    let parent = state.selectors[s].id;
    let before_next = state.selectors[s].item_after(i);
    let item = state.selectors[s].items.remove(i);
    Ok((
        Op::ItemInsert {
            selector: parent,
            before: before_next,
            item,
        },
        ChangeEvent::node(OpType::ItemRemove, id, parent, NodeId::NONE),
    ))
}

fn move_item(
    state: &mut State,
    id: NodeId,
    selector: NodeId,
    before: NodeId,
) -> Result<(Op, ChangeEvent)> {
    let (from_s, from_i) = state.find_item(id).ok_or(Error::ItemNotFound(id.0))?;
    let to_s = state
        .find_selector(selector)
        .ok_or(Error::SelectorNotFound(selector.0))?;
    let to_len = state.selectors[to_s].items.len();
    let mut to_i = if before.is_some() {
        state.selectors[to_s]
            .items
            .iter()
            .position(|it| it.id == before)
            .unwrap_or(to_len)
    } else {
        to_len
    };
    let reverse_parent = state.selectors[from_s].id;
    let reverse_before = state.selectors[from_s].item_after(from_i);
    if from_s == to_s {
        if from_i < to_i {
            to_i -= 1;
        }
        if from_i != to_i {
            let item = state.selectors[from_s].items.remove(from_i);
            state.selectors[from_s].items.insert(to_i, item);
        }
    } else {
        let item = state.selectors[from_s].items.remove(from_i);
        state.selectors[to_s].items.insert(to_i, item);
    }
    let before_now = state.selectors[to_s].item_after(to_i);
    Ok((
        Op::ItemMove {
            id,
            selector: reverse_parent,
            before: reverse_before,
        },
        ChangeEvent::node(OpType::ItemMove, id, selector, before_now),
    ))
}

fn insert_param(
    state: &mut State,
    item: NodeId,
    before: NodeId,
    param: Param,
) -> Result<(Op, ChangeEvent)> {
    let (s, i) = state.find_item(item).ok_or(Error::ItemNotFound(item.0))?;
    let params = match &mut state.selectors[s].items[i].kind {
        ItemKind::Animation { params, .. } => params,
        ItemKind::Value { .. } => return Err(Error::NotAnimationItem(item.0)),
    };
    let idx = if before.is_some() {
        params
            .iter()
            .position(|p| p.id == before)
            .unwrap_or(params.len())
    } else {
        params.len()
    };
    let id = param.id;
    params.insert(idx, param);
    let before_now = state.selectors[s].items[i].param_after(idx);
    Ok((
        Op::ParamRemove { id },
        ChangeEvent::node(OpType::ParamInsert, id, item, before_now),
    ))
}

fn remove_param(state: &mut State, id: NodeId) -> Result<(Op, ChangeEvent)> {
    let (s, i, p) = state.find_param(id).ok_or(Error::ParamNotFound(id.0))?;
    let item_id = state.selectors[s].items[i].id;
    let before_next = state.selectors[s].items[i].param_after(p);
    let param = params_mut(&mut state.selectors[s].items[i])
        .ok_or(Error::ParamNotFound(id.0))?
        .remove(p);
    Ok((
        Op::ParamInsert {
            item: item_id,
            before: before_next,
            param,
        },
        ChangeEvent::node(OpType::ParamRemove, id, item_id, NodeId::NONE),
    ))
}

/// Parameter list of an animation item; `None` for value items.
fn params_mut(item: &mut Item) -> Option<&mut Vec<Param>> {
    match &mut item.kind {
        ItemKind::Animation { params, .. } => Some(params),
        ItemKind::Value { .. } => None,
    }
}
