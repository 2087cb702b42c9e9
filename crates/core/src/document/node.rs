use std::fmt;

/// Unique identifier of a selector, item, or parameter.
///
/// Ids come from a single per-document counter and are never reused for the
/// lifetime of that document. `NodeId::NONE` (zero) means "no node"; in
/// insertion positions it means "at the end".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn is_some(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A named group of selectable items, presented to the animation runtime as
/// a choice list.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Selector {
    pub id: NodeId,
    pub name: String,
    /// Opaque slot owned by the embedding UI; never interpreted or serialised.
    pub userdata: usize,
    pub items: Vec<Item>,
}

impl Selector {
    /// Id of the item after position `idx`, or `NONE` when `idx` is last.
    pub(crate) fn item_after(&self, idx: usize) -> NodeId {
        match self.items.get(idx + 1) {
            Some(item) => item.id,
            None => NodeId::NONE,
        }
    }
}

/// An entry in a selector: a PSD layer path, or a parameterised animation
/// script invocation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Item {
    pub id: NodeId,
    pub name: String,
    pub userdata: usize,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ItemKind {
    Value {
        value: String,
    },
    Animation {
        script_name: String,
        params: Vec<Param>,
    },
}

impl Item {
    pub(crate) fn is_animation(&self) -> bool {
        matches!(self.kind, ItemKind::Animation { .. })
    }

    /// Name shown in generated choice lists; unnamed animation items fall
    /// back to their script name.
    pub(crate) fn display_name(&self) -> &str {
        if self.name.is_empty() {
            if let ItemKind::Animation { script_name, .. } = &self.kind {
                return script_name;
            }
        }
        &self.name
    }

    /// Parameters of an animation item; empty slice for value items.
    pub(crate) fn params(&self) -> &[Param] {
        match &self.kind {
            ItemKind::Animation { params, .. } => params,
            ItemKind::Value { .. } => &[],
        }
    }

    /// Id of the parameter after position `idx`, or `NONE` when last.
    pub(crate) fn param_after(&self, idx: usize) -> NodeId {
        match self.params().get(idx + 1) {
            Some(param) => param.id,
            None => NodeId::NONE,
        }
    }
}

/// A key/value pair fed to an animation item's script constructor.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Param {
    pub id: NodeId,
    pub key: String,
    pub value: String,
    pub userdata: usize,
}
