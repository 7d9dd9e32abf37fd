//! Reading-order sort: columns left to right, rows top to bottom.

use crate::tree::{ContentTree, NodeId};

/// Positioned node used by [`order_positions`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Positioned {
    pub node: NodeId,
    pub x: f32,
    pub y: f32,
}

/// Order positioned nodes into reading order.
///
/// Nodes are stable-sorted by `x`, grouped greedily into columns (a node joins
/// the current column when within `column_threshold` of the column's first
/// member), each column is stable-sorted by `y`, and columns are concatenated.
pub fn order_positions(mut items: Vec<Positioned>, column_threshold: f32) -> Vec<NodeId> {
    items.sort_by(|a, b| a.x.total_cmp(&b.x));

    let mut columns: Vec<Vec<Positioned>> = Vec::new();
    for item in items {
        match columns.last_mut() {
            Some(column)
                if column
                    .first()
                    .is_some_and(|first| (item.x - first.x).abs() <= column_threshold) =>
            {
                column.push(item);
            }
            _ => columns.push(vec![item]),
        }
    }

    let mut ordered = Vec::new();
    for mut column in columns {
        column.sort_by(|a, b| a.y.total_cmp(&b.y));
        ordered.extend(column.into_iter().map(|item| item.node));
    }
    ordered
}

/// Order nodes by their current bounding rectangles.
///
/// Nodes without a layout box sort as if positioned at the origin.
pub fn reading_order<T: ContentTree + ?Sized>(
    tree: &T,
    nodes: &[NodeId],
    column_threshold: f32,
) -> Vec<NodeId> {
    let items = nodes
        .iter()
        .map(|&node| {
            let rect = tree.bounding_rect(node).unwrap_or_default();
            Positioned {
                node,
                x: rect.x,
                y: rect.y,
            }
        })
        .collect();
    order_positions(items, column_threshold)
}
