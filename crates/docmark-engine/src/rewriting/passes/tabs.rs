use std::sync::Arc;

use crate::collaborators::TabConditions;
use crate::parsing::parser::EngineKind;
use crate::parsing::token::{TokenKind, TokenTag};
use crate::rewriting::rewriter::Rewriter;

/// Hides tabs whose condition is not active and makes the first visible tab
/// the active one. The group is rebuilt only when something changes.
pub fn tab_visibility(conditions: Arc<dyn TabConditions>) -> Rewriter {
    Rewriter::lambda("tab_visibility", TokenTag::TabGroup, move |_, group| {
        let TokenKind::TabGroup {
            id,
            active,
            children,
        } = &group.kind
        else {
            return Ok(None);
        };

        let mut changed = false;
        let mut first_visible = None;
        let mut items = Vec::with_capacity(children.len());
        for (index, item) in children.iter().enumerate() {
            let TokenKind::TabItem {
                id: item_id,
                condition,
                visible,
                children: item_children,
            } = &item.kind
            else {
                items.push(Arc::clone(item));
                continue;
            };
            let shown = condition
                .as_deref()
                .is_none_or(|c| conditions.is_visible(c));
            if shown && first_visible.is_none() {
                first_visible = Some(index);
            }
            if shown == *visible {
                items.push(Arc::clone(item));
            } else {
                changed = true;
                items.push(item.with_kind(TokenKind::TabItem {
                    id: item_id.clone(),
                    condition: condition.clone(),
                    visible: shown,
                    children: item_children.clone(),
                }));
            }
        }

        let new_active = first_visible.unwrap_or(0);
        if !changed && new_active == *active {
            return Ok(None);
        }
        log::debug!("{}: tab group {id} shows tab {new_active}", group.source);
        Ok(Some(group.with_kind(TokenKind::TabGroup {
            id: id.clone(),
            active: new_active,
            children: items,
        })))
    })
    .for_engine(EngineKind::Dfm)
}
