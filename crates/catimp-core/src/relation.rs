//! Related-product linking across consecutive rows.
//!
//! The linker remembers the last product a batch imported successfully. A
//! row whose relation key equals that product's SKU joins the previous
//! product's whole relation group; any other key links directly to the
//! product carrying that SKU.

use crate::row::RelationRef;

/// A product already written to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedProduct {
    pub id: i64,
    pub sku: String,
}

/// What the relation step should do for the current row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationIntent {
    /// The row has no relation key.
    None,
    /// Link to the previous product and everything already related to it.
    JoinGroup {
        previous: LinkedProduct,
        relation_type: Option<String>,
    },
    /// Link to the product whose SKU is `key`.
    Direct {
        key: String,
        relation_type: Option<String>,
    },
}

/// Accumulator threaded through the rows of one batch.
#[derive(Debug, Clone, Default)]
pub struct RelationLinker {
    previous: Option<LinkedProduct>,
}

impl RelationLinker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn previous(&self) -> Option<&LinkedProduct> {
        self.previous.as_ref()
    }

    #[must_use]
    pub fn intent(&self, relation: Option<&RelationRef>) -> RelationIntent {
        let Some(relation) = relation else {
            return RelationIntent::None;
        };
        let key = relation.key.trim();
        if key.is_empty() {
            return RelationIntent::None;
        }

        match &self.previous {
            Some(previous) if previous.sku == key => RelationIntent::JoinGroup {
                previous: previous.clone(),
                relation_type: relation.relation_type.clone(),
            },
            _ => RelationIntent::Direct {
                key: key.to_string(),
                relation_type: relation.relation_type.clone(),
            },
        }
    }

    /// Records `imported` as the product the next row may refer back to.
    /// Call only after the product itself was saved.
    pub fn advance(&mut self, imported: LinkedProduct) {
        self.previous = Some(imported);
    }
}

/// One directed row of the `relations` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationEdge {
    pub relation_type_id: i64,
    pub relatable_id: i64,
    pub related_to_id: i64,
}

/// Both directions of every `product_id` ↔ target pairing.
///
/// Self-pairings and repeated targets are dropped.
#[must_use]
pub fn symmetric_edges(
    relation_type_id: i64,
    product_id: i64,
    targets: &[i64],
) -> Vec<RelationEdge> {
    let mut seen: Vec<i64> = Vec::with_capacity(targets.len());
    let mut edges = Vec::with_capacity(targets.len() * 2);
    for &target in targets {
        if target == product_id || seen.contains(&target) {
            continue;
        }
        seen.push(target);
        edges.push(RelationEdge {
            relation_type_id,
            relatable_id: product_id,
            related_to_id: target,
        });
        edges.push(RelationEdge {
            relation_type_id,
            relatable_id: target,
            related_to_id: product_id,
        });
    }
    edges
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn relation(key: &str) -> RelationRef {
        RelationRef {
            key: key.to_string(),
            relation_type: Some("40".to_string()),
        }
    }

    fn product(id: i64, sku: &str) -> LinkedProduct {
        LinkedProduct {
            id,
            sku: sku.to_string(),
        }
    }

    #[test]
    fn no_relation_key_means_no_intent() {
        let linker = RelationLinker::new();
        assert_eq!(linker.intent(None), RelationIntent::None);
        assert_eq!(linker.intent(Some(&relation("  "))), RelationIntent::None);
    }

    #[test]
    fn key_matching_previous_joins_group() {
        let mut linker = RelationLinker::new();
        linker.advance(product(1, "A"));
        assert_eq!(
            linker.intent(Some(&relation("A"))),
            RelationIntent::JoinGroup {
                previous: product(1, "A"),
                relation_type: Some("40".to_string()),
            }
        );
    }

    #[test]
    fn other_key_links_directly() {
        let mut linker = RelationLinker::new();
        linker.advance(product(1, "A"));
        assert_eq!(
            linker.intent(Some(&relation("Z"))),
            RelationIntent::Direct {
                key: "Z".to_string(),
                relation_type: Some("40".to_string()),
            }
        );
    }

    #[test]
    fn key_at_start_of_batch_links_directly() {
        let linker = RelationLinker::new();
        assert!(matches!(
            linker.intent(Some(&relation("A"))),
            RelationIntent::Direct { .. }
        ));
    }

    #[test]
    fn advance_replaces_previous() {
        let mut linker = RelationLinker::new();
        linker.advance(product(1, "A"));
        linker.advance(product(2, "B"));
        assert_eq!(linker.previous(), Some(&product(2, "B")));
        assert!(matches!(
            linker.intent(Some(&relation("A"))),
            RelationIntent::Direct { .. }
        ));
    }

    #[test]
    fn symmetric_edges_cover_both_directions() {
        let edges = symmetric_edges(40, 3, &[1, 2]);
        assert_eq!(edges.len(), 4);
        for edge in &edges {
            let reverse = RelationEdge {
                relation_type_id: edge.relation_type_id,
                relatable_id: edge.related_to_id,
                related_to_id: edge.relatable_id,
            };
            assert!(edges.contains(&reverse));
        }
    }

    #[test]
    fn symmetric_edges_skip_self_and_duplicates() {
        let edges = symmetric_edges(40, 3, &[3, 1, 1]);
        assert_eq!(
            edges,
            vec![
                RelationEdge {
                    relation_type_id: 40,
                    relatable_id: 3,
                    related_to_id: 1
                },
                RelationEdge {
                    relation_type_id: 40,
                    relatable_id: 1,
                    related_to_id: 3
                },
            ]
        );
    }

    /// Runs the linker over an in-memory edge set the way the importer does
    /// against the database.
    #[test]
    fn chained_rows_form_a_fully_connected_group() {
        let rows = [(1, "A", None), (2, "B", Some("A")), (3, "C", Some("B"))];
        let mut edges: BTreeSet<RelationEdge> = BTreeSet::new();
        let mut linker = RelationLinker::new();

        for (id, sku, key) in rows {
            let row_relation = key.map(relation);
            match linker.intent(row_relation.as_ref()) {
                RelationIntent::JoinGroup { previous, .. } => {
                    let mut targets = vec![previous.id];
                    targets.extend(
                        edges
                            .iter()
                            .filter(|e| e.relatable_id == previous.id)
                            .map(|e| e.related_to_id),
                    );
                    edges.extend(symmetric_edges(40, id, &targets));
                }
                RelationIntent::Direct { .. } => panic!("every key matches the previous row"),
                RelationIntent::None => {}
            }
            linker.advance(product(id, sku));
        }

        for a in 1..=3 {
            for b in 1..=3 {
                if a == b {
                    continue;
                }
                assert!(
                    edges.contains(&RelationEdge {
                        relation_type_id: 40,
                        relatable_id: a,
                        related_to_id: b
                    }),
                    "missing edge {a} -> {b}"
                );
            }
        }
        assert_eq!(edges.len(), 6);
    }
}
