use crate::canvas::block::Block;
use crate::foundation::ids::BlockId;

#[derive(Clone, Debug, PartialEq)]
/// What the layer panel lists.
pub struct LayerPanel<'a> {
    /// Rows to render, in registry order.
    pub rows: Vec<&'a Block>,
    /// Matching blocks left out because the panel is collapsed.
    pub hidden: usize,
}

/// Blocks whose name contains `query` (case-insensitive). A blank query matches everything.
pub fn filter_layers<'a>(blocks: &'a [Block], query: &str) -> Vec<&'a Block> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return blocks.iter().collect();
    }
    blocks
        .iter()
        .filter(|b| b.name.to_lowercase().contains(&needle))
        .collect()
}

/// Project the block list for the layer panel.
///
/// A search or an expanded panel lists every match. A collapsed panel lists only the active
/// block, or the last match when the active block is filtered out.
pub fn layer_panel<'a>(
    blocks: &'a [Block],
    query: &str,
    expanded: bool,
    active: Option<&BlockId>,
) -> LayerPanel<'a> {
    let matches = filter_layers(blocks, query);
    let total = matches.len();
    let rows = if !query.trim().is_empty() || expanded {
        matches
    } else {
        matches
            .iter()
            .find(|b| Some(&b.id) == active)
            .or(matches.last())
            .map(|b| vec![*b])
            .unwrap_or_default()
    };
    LayerPanel {
        hidden: total - rows.len(),
        rows,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/layers.rs"]
mod tests;
