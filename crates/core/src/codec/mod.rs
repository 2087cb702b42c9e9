//! Reading and writing selector scripts.
//!
//! A saved file is a metadata line (JSON wrapped in a Lua long comment)
//! followed by the script body the animation runtime executes. Loading only
//! trusts the metadata; the body is re-hashed so the host can warn when the
//! file was edited behind the editor's back. File names starting with `@`
//! select the multi-script layout, which writes a companion parts-override
//! file next to the main one.

mod checksum;
mod header;
mod lua;
mod script;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::document::node::{Item, ItemKind, Param, Selector};
use crate::document::notify::ChangeEvent;
use crate::document::op::OpType;
use crate::document::{Document, State};
use crate::error::{Error, Result};

use header::{METADATA_PREFIX, METADATA_SUFFIX, ParsedHeader, ParsedItem};

impl Document {
    /// True when there is anything worth saving: at least one selector with
    /// at least one item.
    pub fn can_save(&self) -> bool {
        self.state.selectors.iter().any(|sel| !sel.items.is_empty())
    }

    /// Write the document to `path`, truncating any existing file. A file
    /// name starting with `@` also writes the `.obj2` companion next to it;
    /// if that second write fails the main file stays on disk.
    ///
    /// Script content is generated before any file is touched, so a
    /// [`Error::ForbiddenSequence`] failure never creates or truncates files.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        let multiscript = is_multiscript(path);
        let content = if multiscript {
            script::multiscript(&self.state, &self.strings)?
        } else {
            script::single_script(&self.state, &self.strings)?
        };
        fs::write(path, &content)?;

        if multiscript {
            let companion = script::companion_script(&self.state, &self.strings)?;
            fs::write(companion_path(path), &companion)?;
        }

        self.modified = false;
        self.notify_state();
        debug!("saved selector script to {}", path.display());
        Ok(())
    }

    /// Replace the document with the contents of the file at `path`.
    ///
    /// On success the history is cleared, `modified` is false, callbacks
    /// survive, and a single reset change plus a state notification fire.
    /// On any failure the current document is left untouched. A checksum
    /// mismatch is not a failure; query [`Document::verify_checksum`].
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)?;
        let (json, body) = split_metadata(&content)?;
        let parsed = header::parse_metadata(json)?;
        let calculated = checksum::body_checksum(body.as_bytes());

        let stored = parsed.stored_checksum;
        let state = materialize(parsed, &self.strings, self.state.next_id);
        self.stored_checksum = stored;
        self.calculated_checksum = calculated;
        self.state = state;
        self.clear_history();
        self.modified = false;
        self.notify_change(&ChangeEvent::scalar(OpType::Reset));
        self.notify_state();
        debug!("loaded selector script from {}", path.display());
        Ok(())
    }
}

fn is_multiscript(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('@'))
}

/// Path of the parts-override companion: a trailing `.anm2` becomes `.obj2`,
/// anything else gets `.obj2` appended.
fn companion_path(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    match text.strip_suffix(".anm2") {
        Some(stem) => PathBuf::from(format!("{stem}.obj2")),
        None => PathBuf::from(format!("{text}.obj2")),
    }
}

/// Split a file into its metadata JSON and the body the checksum covers.
///
/// The metadata prefix must sit at the start of a line; the JSON ends at the
/// first comment terminator after it. The body starts after the newline that
/// closes the metadata line and may be empty.
fn split_metadata(content: &str) -> Result<(&str, &str)> {
    let mut search = 0;
    let prefix_at = loop {
        let Some(found) = content[search..].find(METADATA_PREFIX) else {
            return Err(Error::InvalidFormat("no metadata line"));
        };
        let at = search + found;
        if at == 0 || content.as_bytes()[at - 1] == b'\n' {
            break at;
        }
        search = at + 1;
    };
    let json_start = prefix_at + METADATA_PREFIX.len();
    let json_len = content[json_start..]
        .find(METADATA_SUFFIX)
        .ok_or(Error::InvalidFormat("unterminated metadata line"))?;
    let json = &content[json_start..json_start + json_len];
    let after = &content[json_start + json_len + METADATA_SUFFIX.len()..];
    let body = match after.find('\n') {
        Some(at) => &after[at + 1..],
        None => "",
    };
    Ok((json, body))
}

/// Build a fresh tree from parsed metadata, assigning ids starting at the
/// document's own counter so ids stay unique across the document lifetime.
fn materialize(parsed: ParsedHeader, strings: &crate::locale::Strings, next_id: u32) -> State {
    let mut state = State::empty(strings, next_id);
    state.version = parsed.version;
    state.psd_path = parsed.psd_path;
    if let Some(label) = parsed.label {
        state.label = label;
    }
    state.exclusive_support_default = parsed.exclusive_support_default;
    state.information = parsed.information;
    state.default_character_id = parsed.default_character_id;

    for sel in parsed.selectors {
        let id = state.allocate_id();
        let mut items = Vec::new();
        for item in sel.items {
            let item_id = state.allocate_id();
            items.push(match item {
                ParsedItem::Value { name, value } => Item {
                    id: item_id,
                    name,
                    userdata: 0,
                    kind: ItemKind::Value { value },
                },
                ParsedItem::Animation {
                    script_name,
                    name,
                    params,
                } => Item {
                    id: item_id,
                    name,
                    userdata: 0,
                    kind: ItemKind::Animation {
                        script_name,
                        params: params
                            .into_iter()
                            .map(|(key, value)| Param {
                                id: state.allocate_id(),
                                key,
                                value,
                                userdata: 0,
                            })
                            .collect(),
                    },
                },
            });
        }
        state.selectors.push(Selector {
            id,
            name: sel.group,
            userdata: 0,
            items,
        });
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use crate::document::node::NodeId;

    fn temp_path(dir: &TempDir, name: &str) -> PathBuf {
        dir.path().join(name)
    }

    /// The document used by most round-trip tests: one selector with two
    /// layer-path items.
    fn basic_document() -> Document {
        let mut doc = Document::new();
        doc.set_psd_path("C:/path/to/test.psd").unwrap();
        let sel = doc.selector_insert(NodeId::NONE, "表情").unwrap();
        doc.item_insert_value(sel, "通常", "レイヤー/表情/通常")
            .unwrap();
        doc.item_insert_value(sel, "笑顔", "レイヤー/表情/笑顔")
            .unwrap();
        doc
    }

    #[test]
    fn round_trip_basic() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "test.anm2");
        let mut doc = basic_document();
        doc.save(&path).unwrap();
        assert!(!doc.is_modified());

        let mut loaded = Document::new();
        loaded.load(&path).unwrap();
        assert_eq!(loaded.version(), 1);
        assert_eq!(loaded.psd_path(), "C:/path/to/test.psd");
        assert_eq!(loaded.selector_count(), 1);
        let sel = loaded.selector_id_at(0).unwrap();
        assert_eq!(loaded.selector_name(sel).unwrap(), "表情");
        assert_eq!(loaded.item_count(sel), 2);
        let first = loaded.item_id_at(sel, 0).unwrap();
        let second = loaded.item_id_at(sel, 1).unwrap();
        assert!(!loaded.item_is_animation(first));
        assert_eq!(loaded.item_name(first).unwrap(), "通常");
        assert_eq!(loaded.item_value(first).unwrap(), "レイヤー/表情/通常");
        assert_eq!(loaded.item_name(second).unwrap(), "笑顔");
        assert_eq!(loaded.item_value(second).unwrap(), "レイヤー/表情/笑顔");
        assert!(!loaded.can_undo());
        assert!(!loaded.can_redo());
        assert!(!loaded.is_modified());
    }

    #[test]
    fn round_trip_animation_params_preserve_order() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "blink.anm2");
        let mut doc = Document::new();
        let sel = doc.selector_insert(NodeId::NONE, "目パチ").unwrap();
        let item = doc
            .item_insert_animation(sel, "PSDToolKit.Blinker", "目パチアニメ")
            .unwrap();
        doc.param_insert(item, NodeId::NONE, "間隔(秒)", "5.00")
            .unwrap();
        doc.param_insert(item, NodeId::NONE, "開き時間(秒)", "0.06")
            .unwrap();
        doc.save(&path).unwrap();

        let mut loaded = Document::new();
        loaded.load(&path).unwrap();
        let sel = loaded.selector_id_at(0).unwrap();
        let item = loaded.item_id_at(sel, 0).unwrap();
        assert!(loaded.item_is_animation(item));
        assert_eq!(loaded.item_script_name(item).unwrap(), "PSDToolKit.Blinker");
        assert_eq!(loaded.item_name(item).unwrap(), "目パチアニメ");
        assert_eq!(loaded.param_count(item), 2);
        let p0 = loaded.param_id_at(item, 0).unwrap();
        let p1 = loaded.param_id_at(item, 1).unwrap();
        assert_eq!(loaded.param_key(p0).unwrap(), "間隔(秒)");
        assert_eq!(loaded.param_value(p0).unwrap(), "5.00");
        assert_eq!(loaded.param_key(p1).unwrap(), "開き時間(秒)");
        assert_eq!(loaded.param_value(p1).unwrap(), "0.06");
    }

    #[test]
    fn empty_selector_skipped_in_body_but_preserved() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "mixed.anm2");
        let mut doc = Document::new();
        doc.selector_insert(NodeId::NONE, "Empty").unwrap();
        let sel = doc.selector_insert(NodeId::NONE, "表情").unwrap();
        doc.item_insert_value(sel, "通常", "レイヤー/通常").unwrap();
        doc.save(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("sel1:Empty"));
        assert_eq!(content.matches("--select@").count(), 1);
        assert!(content.contains("--select@sel2:表情"));
        assert_eq!(content.matches("add_layer_selector").count(), 1);
        assert!(content.contains("add_layer_selector(1,"));

        let mut loaded = Document::new();
        loaded.load(&path).unwrap();
        assert_eq!(loaded.selector_count(), 2);
        let empty = loaded.selector_id_at(0).unwrap();
        assert_eq!(loaded.selector_name(empty).unwrap(), "Empty");
        assert_eq!(loaded.item_count(empty), 0);
    }

    #[test]
    fn checksum_verifies_and_detects_tampering() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "verify.anm2");
        let mut doc = basic_document();
        doc.save(&path).unwrap();

        let mut loaded = Document::new();
        loaded.load(&path).unwrap();
        assert!(loaded.verify_checksum());

        // Flip one byte of the body and reload: load succeeds, verify fails.
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 2;
        bytes[last] = bytes[last].wrapping_add(1);
        fs::write(&path, &bytes).unwrap();
        loaded.load(&path).unwrap();
        assert!(!loaded.verify_checksum());
    }

    #[test]
    fn forbidden_sequence_fails_without_touching_disk() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "forbidden.anm2");
        let mut doc = basic_document();
        let sel = doc.selector_id_at(0).unwrap();
        doc.selector_set_name(sel, "bad]==]name").unwrap();
        assert!(matches!(doc.save(&path), Err(Error::ForbiddenSequence)));
        assert!(!path.exists());
        assert!(doc.is_modified());
    }

    #[test]
    fn second_save_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let first = temp_path(&dir, "first.anm2");
        let second = temp_path(&dir, "second.anm2");
        let mut doc = Document::new();
        doc.set_label("MyChar").unwrap();
        doc.set_psd_path("chara.psd").unwrap();
        doc.set_default_character_id(Some("chara01")).unwrap();
        doc.set_exclusive_support_default(false).unwrap();
        let sel = doc.selector_insert(NodeId::NONE, "口").unwrap();
        doc.item_insert_value(sel, "あ", "レイヤー/口/あ").unwrap();
        let anim = doc
            .item_insert_animation(sel, "PSDToolKit.LipSync", "リップシンク")
            .unwrap();
        doc.param_insert(anim, NodeId::NONE, "speed", "1.0").unwrap();
        doc.selector_insert(NodeId::NONE, "empty").unwrap();
        doc.save(&first).unwrap();

        let mut loaded = Document::new();
        loaded.load(&first).unwrap();
        loaded.save(&second).unwrap();
        assert_eq!(
            fs::read_to_string(&first).unwrap(),
            fs::read_to_string(&second).unwrap()
        );
    }

    #[test]
    fn load_preserves_callbacks_and_fires_reset() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "cb.anm2");
        basic_document().save(&path).unwrap();

        let resets = Rc::new(Cell::new(0));
        let states = Rc::new(Cell::new(0));
        let mut doc = Document::new();
        {
            let resets = resets.clone();
            doc.set_change_callback(move |event| {
                if event.op == OpType::Reset {
                    resets.set(resets.get() + 1);
                }
            });
        }
        {
            let states = states.clone();
            doc.set_state_callback(move || states.set(states.get() + 1));
        }
        doc.load(&path).unwrap();
        assert_eq!(resets.get(), 1);
        assert_eq!(states.get(), 1);
        assert!(!doc.is_modified());
    }

    #[test]
    fn load_failure_leaves_document_untouched() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "broken.anm2");
        fs::write(&path, "just some lua\nno metadata here\n").unwrap();

        let mut doc = basic_document();
        let err = doc.load(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
        assert_eq!(doc.selector_count(), 1);
        assert!(doc.is_modified());
    }

    #[test]
    fn load_requires_line_anchored_prefix() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "anchored.anm2");
        fs::write(
            &path,
            "-- see --[==[PTK:{}]==] for details\n--[==[PTK:{\"version\":1}]==]\nbody\n",
        )
        .unwrap();
        let mut doc = Document::new();
        doc.load(&path).unwrap();
        assert_eq!(doc.version(), 1);
    }

    #[test]
    fn load_continues_id_allocation() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "ids.anm2");
        basic_document().save(&path).unwrap();

        let mut doc = Document::new();
        let burned = doc.selector_insert(NodeId::NONE, "old").unwrap();
        doc.load(&path).unwrap();
        let sel = doc.selector_id_at(0).unwrap();
        assert!(sel.0 > burned.0);
    }

    #[test]
    fn multiscript_save_writes_companion() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "@chara.anm2");
        let mut doc = basic_document();
        doc.set_default_character_id(Some("chara01")).unwrap();
        doc.save(&path).unwrap();

        let main = fs::read_to_string(&path).unwrap();
        assert!(main.starts_with("@Selector\n--[==[PTK:"));

        let companion = fs::read_to_string(temp_path(&dir, "@chara.obj2")).unwrap();
        assert!(companion.starts_with("@OverwriteSelector\n--[==[PTK:"));
        assert!(companion.contains("\"checksum\":\"0000000000000000\""));
        assert!(companion.contains("--value@id:Character ID,\"chara01\"\n"));
        assert!(companion.contains("--select@p1:表情"));

        // The main file still loads as a normal selector script.
        let mut loaded = Document::new();
        loaded.load(&path).unwrap();
        assert_eq!(loaded.selector_count(), 1);
        assert!(loaded.verify_checksum());
    }

    #[test]
    fn companion_path_swaps_or_appends_extension() {
        assert_eq!(
            companion_path(Path::new("/tmp/@a.ptk.anm2")),
            PathBuf::from("/tmp/@a.ptk.obj2")
        );
        assert_eq!(
            companion_path(Path::new("/tmp/@a.script")),
            PathBuf::from("/tmp/@a.script.obj2")
        );
    }

    #[test]
    fn cross_selector_move_empties_source_out_of_body() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "moved.anm2");
        let mut doc = Document::new();
        let src = doc.selector_insert(NodeId::NONE, "src").unwrap();
        let dst = doc.selector_insert(NodeId::NONE, "dst").unwrap();
        let item = doc.item_insert_value(src, "a", "v").unwrap();
        doc.item_move(item, dst).unwrap();
        assert_eq!(doc.item_count(src), 0);
        doc.save(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("--select@sel1:src"));
        assert!(content.contains("--select@sel2:dst"));

        let mut loaded = Document::new();
        loaded.load(&path).unwrap();
        assert_eq!(loaded.selector_count(), 2);
        assert_eq!(loaded.item_count(loaded.selector_id_at(0).unwrap()), 0);
    }

    #[test]
    fn can_save_requires_an_item_somewhere() {
        let mut doc = Document::new();
        assert!(!doc.can_save());
        let sel = doc.selector_insert(NodeId::NONE, "G").unwrap();
        assert!(!doc.can_save());
        doc.item_insert_value(sel, "a", "v").unwrap();
        assert!(doc.can_save());
    }

    #[test]
    fn absent_label_loads_as_default() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "nolabel.anm2");
        fs::write(
            &path,
            "--[==[PTK:{\"version\":1,\"checksum\":\"0000000000000000\",\"selectors\":[]}]==]\n",
        )
        .unwrap();
        let mut doc = Document::new();
        doc.load(&path).unwrap();
        assert_eq!(doc.label(), "PSD");
        assert!(doc.verify_checksum());
    }

    #[test]
    fn save_after_load_keeps_stored_checksum_in_sync() {
        let dir = TempDir::new().unwrap();
        let path = temp_path(&dir, "sync.anm2");
        let mut doc = basic_document();
        doc.save(&path).unwrap();
        let mut loaded = Document::new();
        loaded.load(&path).unwrap();
        assert_eq!(loaded.stored_checksum(), loaded.calculated_checksum());
        assert_ne!(loaded.stored_checksum(), 0);
    }
}
