//! Generation of the Lua-flavoured script text beneath the metadata line.
//!
//! The animation runtime reads the `--label:`/`--select@` marker lines and
//! executes the `psdcall` block; the editor itself only ever reads the
//! metadata line back. Selectors with no items are left out of the body
//! entirely because the runtime cannot handle an empty choice list.

use crate::document::State;
use crate::document::node::{ItemKind, Selector};
use crate::error::Result;
use crate::locale::Strings;

use super::checksum::body_checksum;
use super::header::metadata_line;
use super::lua;

/// Choice lists the parts-override script can address.
const MAX_OVERRIDE_PARTS: usize = 16;

/// Full single-script file: metadata line plus body, with the checksum of
/// the body embedded in the metadata.
pub(crate) fn single_script(state: &State, strings: &Strings) -> Result<String> {
    let body = script_body(state, strings);
    let checksum = body_checksum(body.as_bytes());
    let mut content = metadata_line(state, checksum)?;
    content.push_str(&body);
    Ok(content)
}

/// Multi-script main file: a section name line ahead of the single-script
/// payload.
pub(crate) fn multiscript(state: &State, strings: &Strings) -> Result<String> {
    let mut content = format!("@{}\n", strings.selector_section);
    content.push_str(&single_script(state, strings)?);
    Ok(content)
}

/// Companion parts-override file written next to multi-script saves. Its
/// metadata carries a zero checksum; readers do not verify it.
pub(crate) fn companion_script(state: &State, strings: &Strings) -> Result<String> {
    let mut content = format!("@{}\n", strings.overwrite_section);
    content.push_str(&metadata_line(state, 0)?);
    content.push_str(&parts_override_body(state, strings));
    Ok(content)
}

fn script_body(state: &State, strings: &Strings) -> String {
    let mut body = String::new();
    push_label_line(&mut body, state);
    push_information_line(&mut body, state, strings);
    body.push_str(&format!(
        "--check@exclusive:{},{}\n",
        strings.exclusive_support,
        if state.exclusive_support_default { 1 } else { 0 }
    ));

    // Choice lists keep their original 1-based selector numbering even when
    // empty selectors leave gaps in it.
    for (i, sel) in state.selectors.iter().enumerate() {
        if sel.items.is_empty() {
            continue;
        }
        push_choice_line(&mut body, &format!("sel{}", i + 1), sel, strings);
    }

    let has_choices = state.selectors.iter().any(|sel| !sel.items.is_empty());
    if has_choices {
        body.push_str("require(\"PSDToolKit\").psdcall(function()\n");
        let mut cache_index = 0;
        for (i, sel) in state.selectors.iter().enumerate() {
            if sel.items.is_empty() {
                continue;
            }
            cache_index += 1;
            body.push_str(&format!(
                "require(\"PSDToolKit\").add_layer_selector({cache_index}, function() return {{\n"
            ));
            for item in &sel.items {
                match &item.kind {
                    ItemKind::Value { value } => {
                        body.push_str(&format!("  {},\n", lua::escape(value)));
                    }
                    ItemKind::Animation {
                        script_name,
                        params,
                    } => {
                        body.push_str(&format!("  require(\"{script_name}\").new({{\n"));
                        for param in params {
                            body.push_str(&format!(
                                "    [{}] = {},\n",
                                lua::escape(&param.key),
                                lua::escape(&param.value)
                            ));
                        }
                        body.push_str("  }),\n");
                    }
                }
            }
            body.push_str(&format!(
                "}} end, sel{}, {{exclusive = exclusive ~= 0}})\n",
                i + 1
            ));
        }
        body.push_str("end)\n");
    }

    body
}

fn parts_override_body(state: &State, strings: &Strings) -> String {
    let mut body = String::new();
    push_label_line(&mut body, state);
    push_information_line(&mut body, state, strings);
    body.push_str(&format!(
        "--value@id:{},\"{}\"\n",
        strings.character_id,
        state.default_character_id.as_deref().unwrap_or("")
    ));

    let parts: Vec<&Selector> = state
        .selectors
        .iter()
        .filter(|sel| !sel.items.is_empty())
        .take(MAX_OVERRIDE_PARTS)
        .collect();
    for (k, sel) in parts.iter().copied().enumerate() {
        push_choice_line(&mut body, &format!("p{}", k + 1), sel, strings);
    }

    body.push_str(
        "require(\"PSDToolKit\").psdcall(function()\n  \
         require(\"PSDToolKit\").set_layer_selector_overwriter(id ~= \"\" and id or nil, {\n",
    );
    for k in 1..=parts.len() {
        body.push_str(&format!("    p{k} = p{k} ~= 0 and p{k} or nil,\n"));
    }
    body.push_str("  }, obj)\nend)\n");
    body
}

fn push_label_line(body: &mut String, state: &State) {
    if !state.label.is_empty() {
        body.push_str(&format!("--label:{}\n", state.label));
    }
}

/// The information line: custom text when set, otherwise generated from the
/// PSD file name. No line at all when neither is available.
fn push_information_line(body: &mut String, state: &State, strings: &Strings) {
    match state.information.as_deref() {
        Some(text) if !text.is_empty() => {
            body.push_str(&format!("--information:{text}\n"));
        }
        _ => {
            let file_name = psd_file_name(&state.psd_path);
            if !file_name.is_empty() {
                body.push_str(&format!(
                    "--information:{}\n",
                    strings.information_for(file_name)
                ));
            }
        }
    }
}

/// One `--select@<tag>:` choice list: the group name, a localised "(None)"
/// entry, then every named item as `name=<1-based position>`. Items with an
/// empty display name are omitted but keep their positions reserved.
fn push_choice_line(body: &mut String, tag: &str, sel: &Selector, strings: &Strings) {
    body.push_str(&format!("--select@{}:{}", tag, sel.name));
    body.push_str(&format!(",{}=0", strings.none_item));
    for (j, item) in sel.items.iter().enumerate() {
        let display = item.display_name();
        if !display.is_empty() {
            body.push_str(&format!(",{}={}", lua::sanitize_choice_name(display), j + 1));
        }
    }
    body.push('\n');
}

fn psd_file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::node::{Item, NodeId, Param};

    fn state_with(selectors: Vec<Selector>) -> State {
        let mut state = State::empty(&Strings::default(), 100);
        state.psd_path = "C:\\work\\chara.psd".to_owned();
        state.selectors = selectors;
        state
    }

    fn value_item(id: u32, name: &str, value: &str) -> Item {
        Item {
            id: NodeId(id),
            name: name.to_owned(),
            userdata: 0,
            kind: ItemKind::Value {
                value: value.to_owned(),
            },
        }
    }

    fn selector(id: u32, name: &str, items: Vec<Item>) -> Selector {
        Selector {
            id: NodeId(id),
            name: name.to_owned(),
            userdata: 0,
            items,
        }
    }

    #[test]
    fn body_keeps_original_selector_numbering() {
        let state = state_with(vec![
            selector(1, "Empty", Vec::new()),
            selector(2, "表情", vec![value_item(3, "通常", "レイヤー/通常")]),
        ]);
        let body = script_body(&state, &Strings::default());
        assert!(!body.contains("sel1"));
        assert!(body.contains("--select@sel2:表情,(None)=0,通常=1\n"));
        assert!(body.contains("add_layer_selector(1, function() return {"));
        assert!(body.contains("} end, sel2, {exclusive = exclusive ~= 0})"));
    }

    #[test]
    fn empty_document_body_has_no_psdcall() {
        let state = state_with(vec![selector(1, "Empty", Vec::new())]);
        let body = script_body(&state, &Strings::default());
        assert!(!body.contains("psdcall"));
        assert!(body.contains("--check@exclusive:Exclusive Support,1\n"));
    }

    #[test]
    fn information_generated_from_psd_file_name() {
        let state = state_with(Vec::new());
        let body = script_body(&state, &Strings::default());
        assert!(body.contains("--information:PSD Layer Selector for chara.psd\n"));
    }

    #[test]
    fn custom_information_wins() {
        let mut state = state_with(Vec::new());
        state.information = Some("hand written".to_owned());
        let body = script_body(&state, &Strings::default());
        assert!(body.contains("--information:hand written\n"));
    }

    #[test]
    fn no_information_line_without_psd_or_text() {
        let mut state = state_with(Vec::new());
        state.psd_path = String::new();
        let body = script_body(&state, &Strings::default());
        assert!(!body.contains("--information:"));
    }

    #[test]
    fn unnamed_items_keep_their_choice_positions() {
        let state = state_with(vec![selector(
            1,
            "G",
            vec![
                value_item(2, "a", "v1"),
                value_item(3, "", "v2"),
                value_item(4, "c", "v3"),
            ],
        )]);
        let body = script_body(&state, &Strings::default());
        assert!(body.contains("--select@sel1:G,(None)=0,a=1,c=3\n"));
        // The unnamed item still contributes its value to the Lua table.
        assert!(body.contains("  \"v2\",\n"));
    }

    #[test]
    fn choice_names_are_sanitised() {
        let state = state_with(vec![selector(
            1,
            "G",
            vec![value_item(2, "a=b,c", "v")],
        )]);
        let body = script_body(&state, &Strings::default());
        assert!(body.contains(",a＝b，c=1\n"));
    }

    #[test]
    fn animation_items_emit_constructor_calls() {
        let state = state_with(vec![selector(
            1,
            "目パチ",
            vec![Item {
                id: NodeId(2),
                name: "目パチアニメ".to_owned(),
                userdata: 0,
                kind: ItemKind::Animation {
                    script_name: "PSDToolKit.Blinker".to_owned(),
                    params: vec![Param {
                        id: NodeId(3),
                        key: "間隔(秒)".to_owned(),
                        value: "5.00".to_owned(),
                        userdata: 0,
                    }],
                },
            }],
        )]);
        let body = script_body(&state, &Strings::default());
        assert!(body.contains("  require(\"PSDToolKit.Blinker\").new({\n"));
        assert!(body.contains("    [\"間隔(秒)\"] = \"5.00\",\n"));
        assert!(body.contains("  }),\n"));
    }

    #[test]
    fn parts_override_lists_up_to_sixteen_parts() {
        let selectors: Vec<Selector> = (0..20)
            .map(|i| {
                selector(
                    i + 1,
                    &format!("part{i}"),
                    vec![value_item(100 + i, "x", "v")],
                )
            })
            .collect();
        let state = state_with(selectors);
        let body = parts_override_body(&state, &Strings::default());
        assert!(body.contains("--select@p16:part15"));
        assert!(!body.contains("--select@p17"));
        assert!(body.contains("    p16 = p16 ~= 0 and p16 or nil,\n"));
        assert!(!body.contains("p17 ~= 0"));
        assert!(body.contains("--value@id:Character ID,\"\"\n"));
        assert!(body.contains("set_layer_selector_overwriter(id ~= \"\" and id or nil, {"));
    }

    #[test]
    fn companion_script_carries_zero_checksum() {
        let state = state_with(vec![selector(1, "G", vec![value_item(2, "a", "v")])]);
        let content = companion_script(&state, &Strings::default()).unwrap();
        assert!(content.starts_with("@OverwriteSelector\n--[==[PTK:"));
        assert!(content.contains("\"checksum\":\"0000000000000000\""));
    }

    #[test]
    fn multiscript_prepends_section_name() {
        let state = state_with(vec![selector(1, "G", vec![value_item(2, "a", "v")])]);
        let content = multiscript(&state, &Strings::default()).unwrap();
        assert!(content.starts_with("@Selector\n--[==[PTK:"));
    }
}
