//! Membership check engine.
//!
//! Answers "is this subject a member of the set `(namespace, object,
//! relation)`?" by walking the tuple graph: a direct match on the set's
//! tuples wins immediately, and SubjectSet subjects with a non-empty
//! relation are expanded recursively. The walk is bounded three ways:
//!
//! - a **depth budget**, resolved per request against the registry's
//!   `max_read_depth` (read per request, never cached here);
//! - a per-query **visited set** of expanded nodes, so cycles terminate
//!   without burning budget;
//! - the store's own **pagination**, iterated page by page so wide sets
//!   never load in one piece.
//!
//! Sub-expansions of a page run concurrently with bounded fan-out. The
//! first `true` short-circuits: dropping the in-flight futures cancels
//! their outstanding store queries at the next suspension point. The
//! first error cancels siblings the same way and propagates. Depth
//! exhaustion and cycle re-entry are not errors; both yield `false`.
use crate::model::{RelationQuery, RelationTuple, Subject};
use crate::registry::NamespaceRegistry;
use crate::store::{RelationTupleStore, StoreError};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

pub struct CheckEngine {
    registry: Arc<NamespaceRegistry>,
    store: Arc<dyn RelationTupleStore>,
}

/// One expandable set in the tuple graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SetNode {
    namespace: String,
    object: Uuid,
    relation: String,
}

impl CheckEngine {
    pub fn new(registry: Arc<NamespaceRegistry>, store: Arc<dyn RelationTupleStore>) -> Self {
        Self { registry, store }
    }

    /// Decide membership of `tuple.subject` in the set denoted by the
    /// tuple's `(namespace, object, relation)`, with at most `max_depth`
    /// indirect expansions.
    pub async fn check_is_member(
        &self,
        tuple: &RelationTuple,
        max_depth: i32,
    ) -> Result<bool, StoreError> {
        let budget = self.effective_budget(max_depth);
        let visited = Mutex::new(HashSet::new());
        let root = SetNode {
            namespace: tuple.namespace.clone(),
            object: tuple.object.uid,
            relation: tuple.relation.clone(),
        };
        let allowed = self
            .subject_in_set(&tuple.subject, root, budget, &visited)
            .await?;
        let label = if allowed { "true" } else { "false" };
        metrics::counter!("lattice_checks_total", "allowed" => label).increment(1);
        Ok(allowed)
    }

    /// The smaller of the caller's depth and the global limit wins; a
    /// non-positive or missing caller value means "use the global limit".
    fn effective_budget(&self, requested: i32) -> u32 {
        let global = self.registry.max_read_depth();
        if requested <= 0 || requested as u32 > global {
            global
        } else {
            requested as u32
        }
    }

    fn subject_in_set<'a>(
        &'a self,
        subject: &'a Subject,
        node: SetNode,
        budget: u32,
        visited: &'a Mutex<HashSet<SetNode>>,
    ) -> BoxFuture<'a, Result<bool, StoreError>> {
        async move {
            // Entering with an exhausted budget answers false without
            // touching the store.
            if budget == 0 {
                metrics::counter!("lattice_check_depth_exhausted_total").increment(1);
                return Ok(false);
            }
            // Cycle avoidance: a node already expanded anywhere in this
            // query cannot contribute a new result.
            if !visited.lock().await.insert(node.clone()) {
                return Ok(false);
            }

            let query = RelationQuery {
                namespace: Some(node.namespace.clone()),
                object: Some(node.object),
                relation: Some(node.relation.clone()),
                subject: None,
            };
            let page_size = self.registry.default_page_size();
            let mut page_token = String::new();
            loop {
                let page = self
                    .store
                    .get_relation_tuples(&query, &page_token, page_size)
                    .await?;

                for stored in &page.tuples {
                    if direct_match(&stored.subject, subject) {
                        return Ok(true);
                    }
                }

                let expansions: Vec<SetNode> = page
                    .tuples
                    .iter()
                    .filter_map(|stored| match &stored.subject {
                        // Only SubjectSets with a concrete relation are
                        // expandable; an empty relation is a bare object
                        // reference and grants nothing transitively.
                        Subject::Set(set) if !set.relation.is_empty() => Some(SetNode {
                            namespace: set.namespace.clone(),
                            object: set.object.uid,
                            relation: set.relation.clone(),
                        }),
                        _ => None,
                    })
                    .collect();

                if !expansions.is_empty() {
                    let mut sub_checks = stream::iter(expansions)
                        .map(|next| self.subject_in_set(subject, next, budget - 1, visited))
                        .buffer_unordered(page_size.max(1));
                    while let Some(result) = sub_checks.next().await {
                        if result? {
                            // Dropping the stream cancels the remaining
                            // sub-checks.
                            return Ok(true);
                        }
                    }
                }

                if page.next_page_token.is_empty() {
                    return Ok(false);
                }
                page_token = page.next_page_token;
            }
        }
        .boxed()
    }
}

fn direct_match(stored: &Subject, wanted: &Subject) -> bool {
    match (stored, wanted) {
        (Subject::Id(stored), Subject::Id(wanted)) => stored == wanted,
        (Subject::Set(stored), Subject::Set(wanted)) => stored == wanted,
        // An empty-relation SubjectSet means "any relation on that
        // object", which admits the object's bare subject id.
        (Subject::Set(stored), Subject::Id(wanted)) => {
            stored.relation.is_empty() && stored.object == *wanted
        }
        (Subject::Id(_), Subject::Set(_)) => false,
    }
}
