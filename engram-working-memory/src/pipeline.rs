use std::collections::{HashMap, HashSet};

use chrono::Utc;
use uuid::Uuid;

use engram_core::memory::{ActivatedItem, ActivationSource, AssociationDirection, NodeKind};
use engram_core::traits::{RecallOptions, ScoringMode};
use engram_providers::Embedder;
use engram_schema::context_match_score;

use crate::service::{ActivateRequest, WorkingMemoryService};

type Items = HashMap<(NodeKind, Uuid), ActivatedItem>;

impl WorkingMemoryService {
    /// Step 1: direct recall from the request's cues (spec §4.9).
    pub(crate) async fn direct(&self, req: &ActivateRequest, items: &mut Items) {
        if req.cues.is_empty() || !self.embedder.is_available() {
            return;
        }
        let joined = req.cues.join(" ");
        let Ok(embedding) = self.embedder.embed(&joined).await else {
            return;
        };

        let opts = RecallOptions {
            top_k: self.config.direct_semantic_top_k,
            min_confidence: 0.0,
            scoring: ScoringMode::Similarity,
            ..RecallOptions::default()
        };
        if let Ok(hits) = self.memories.recall(&req.scope, &embedding, &opts).await {
            for hit in hits {
                if hit.similarity < self.config.direct_semantic_min {
                    continue;
                }
                Self::merge(
                    items,
                    ActivatedItem {
                        node_type: NodeKind::Memory,
                        node_id: hit.memory.id,
                        activation_level: hit.similarity * ActivationSource::Direct.boost(),
                        confidence: hit.memory.confidence,
                        source: ActivationSource::Direct,
                        cue: joined.clone(),
                        slot_position: None,
                    },
                );
            }
        }

        if let Ok(episodes) = self
            .episodes
            .recall_semantic(&req.scope, &embedding, self.config.direct_episodic_min, self.config.direct_episodic_top_k)
            .await
        {
            for hit in episodes {
                Self::merge(
                    items,
                    ActivatedItem {
                        node_type: NodeKind::Episode,
                        node_id: hit.episode.id,
                        activation_level: hit.similarity * ActivationSource::Direct.boost(),
                        confidence: hit.episode.memory_strength as f64,
                        source: ActivationSource::Direct,
                        cue: joined.clone(),
                        slot_position: None,
                    },
                );
            }
        }

        if let Ok(procedures) = self
            .procedures
            .find_by_trigger_similarity(&req.scope, &embedding, self.config.direct_procedural_min)
            .await
        {
            for hit in procedures.into_iter().take(self.config.direct_procedural_top_k) {
                Self::merge(
                    items,
                    ActivatedItem {
                        node_type: NodeKind::Procedure,
                        node_id: hit.procedure.id,
                        activation_level: hit.similarity * ActivationSource::Direct.boost(),
                        confidence: hit.procedure.confidence,
                        source: ActivationSource::Direct,
                        cue: joined.clone(),
                        slot_position: None,
                    },
                );
            }
        }
    }

    /// Step 2: recall driven by the active goal, same thresholds as direct
    /// recall but boosted harder (spec §4.9).
    pub(crate) async fn goal(&self, req: &ActivateRequest, items: &mut Items) {
        let Some(goal) = req.goal.as_ref() else {
            return;
        };
        if !self.embedder.is_available() {
            return;
        }
        let Ok(embedding) = self.embedder.embed(goal).await else {
            return;
        };

        let opts = RecallOptions {
            top_k: self.config.direct_semantic_top_k,
            min_confidence: 0.0,
            scoring: ScoringMode::Similarity,
            ..RecallOptions::default()
        };
        if let Ok(hits) = self.memories.recall(&req.scope, &embedding, &opts).await {
            for hit in hits {
                if hit.similarity < self.config.direct_semantic_min {
                    continue;
                }
                Self::merge(
                    items,
                    ActivatedItem {
                        node_type: NodeKind::Memory,
                        node_id: hit.memory.id,
                        activation_level: hit.similarity * ActivationSource::Goal.boost(),
                        confidence: hit.memory.confidence,
                        source: ActivationSource::Goal,
                        cue: goal.clone(),
                        slot_position: None,
                    },
                );
            }
        }
    }

    /// Step 3: schema-context matching via the shared §4.9.1 formula,
    /// contributing evidence-strength activation (spec §4.9).
    pub(crate) async fn schema(&self, req: &ActivateRequest, items: &mut Items) {
        let Ok(schemas) = self.schemas.list_by_agent(&req.scope).await else {
            return;
        };

        let mut scored: Vec<(f32, Uuid, f64)> = schemas
            .iter()
            .map(|schema| (context_match_score(schema, &req.cues, &req.context), schema.id, schema.confidence))
            .filter(|(score, _, _)| *score >= self.config.schema_min_match_score)
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.config.schema_top_k);

        for (match_score, schema_id, confidence) in scored {
            let activation = (0.5 + 0.1 * match_score).min(1.0) * ActivationSource::Schema.boost();
            Self::merge(
                items,
                ActivatedItem {
                    node_type: NodeKind::Schema,
                    node_id: schema_id,
                    activation_level: activation,
                    confidence,
                    source: ActivationSource::Schema,
                    cue: "schema_context".to_string(),
                    slot_position: None,
                },
            );
        }
    }

    /// Step 4: recently recorded episodes decayed by recency (spec §4.9).
    pub(crate) async fn temporal(&self, req: &ActivateRequest, items: &mut Items) {
        let end = Utc::now();
        let start = end - chrono::Duration::hours(self.config.temporal_lookback_hours);
        let Ok(episodes) = self.episodes.recall_by_time_range(&req.scope, start, end).await else {
            return;
        };

        for episode in episodes {
            let age_hours = (end - episode.occurred_at).num_minutes() as f32 / 60.0;
            let recency = 1.0 - age_hours * self.config.temporal_recency_decay_per_hour;
            if recency < self.config.temporal_floor {
                continue;
            }
            Self::merge(
                items,
                ActivatedItem {
                    node_type: NodeKind::Episode,
                    node_id: episode.id,
                    activation_level: recency * ActivationSource::Temporal.boost(),
                    confidence: episode.memory_strength as f64,
                    source: ActivationSource::Temporal,
                    cue: "recent".to_string(),
                    slot_position: None,
                },
            );
        }
    }

    /// Step 5: spread activation outward from every item already in the
    /// working set, decaying per hop (spec §4.9). Entity nodes are skipped:
    /// `ActivatedItem` has no confidence proxy for an entity beyond its
    /// mentions, which the C7 hybrid-recall entity boost already covers.
    pub(crate) async fn spread(&self, req: &ActivateRequest, items: &mut Items) {
        let mut visited: HashSet<(NodeKind, Uuid)> = items.keys().copied().collect();
        let mut frontier: Vec<(NodeKind, Uuid, f32)> = items.values().map(|item| (item.node_type, item.node_id, item.activation_level)).collect();

        for _ in 0..self.config.spread_max_depth {
            let mut next_frontier = Vec::new();
            for (node_type, node_id, activation) in frontier {
                let Ok(neighbors) = self.graph.get_neighbors(&req.scope, node_type, node_id, AssociationDirection::Outgoing, None).await else {
                    continue;
                };
                for edge in neighbors {
                    if edge.target_type != NodeKind::Memory && edge.target_type != NodeKind::Episode && edge.target_type != NodeKind::Procedure {
                        continue;
                    }
                    let key = (edge.target_type, edge.target_id);
                    if visited.contains(&key) {
                        continue;
                    }
                    let spread_activation = activation * edge.strength * self.config.spread_decay_per_hop;
                    if spread_activation < self.config.spread_floor {
                        continue;
                    }

                    let confidence = self.confidence_of(&req.scope, edge.target_type, edge.target_id).await.unwrap_or(0.5);
                    Self::merge(
                        items,
                        ActivatedItem {
                            node_type: edge.target_type,
                            node_id: edge.target_id,
                            activation_level: spread_activation * ActivationSource::Spread.boost(),
                            confidence,
                            source: ActivationSource::Spread,
                            cue: "spread".to_string(),
                            slot_position: None,
                        },
                    );
                    visited.insert(key);
                    next_frontier.push((edge.target_type, edge.target_id, spread_activation));
                }
            }
            frontier = next_frontier;
            if frontier.is_empty() {
                break;
            }
        }
    }

    async fn confidence_of(&self, scope: &engram_core::memory::Scope, node_type: NodeKind, node_id: Uuid) -> Option<f64> {
        match node_type {
            NodeKind::Memory => self.memories.get(scope, node_id).await.ok().flatten().map(|m| m.confidence),
            NodeKind::Episode => self.episodes.get(scope, node_id).await.ok().flatten().map(|e| e.memory_strength as f64),
            NodeKind::Procedure => self.procedures.get(scope, node_id).await.ok().flatten().map(|p| p.confidence),
            _ => None,
        }
    }
}
