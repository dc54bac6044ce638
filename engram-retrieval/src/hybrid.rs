use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use engram_core::errors::EngramResult;
use engram_core::memory::{AssociationDirection, EntityMention, Memory, NodeKind, RelationKind, Scope};
use engram_core::traits::{EntityStore, GraphStore, MemoryStore, RecallOptions, ScoringMode};
use engram_providers::Embedder;

/// Hop-decay base applied on every graph traversal step (spec §4.7).
const HOP_DECAY: f32 = 0.7;
/// Stage A over-fetches this many times `top_k` before graph expansion.
const VECTOR_OVERFETCH_MULTIPLIER: usize = 2;
/// Only vector hits above this similarity seed the graph BFS (spec §4.7).
const GRAPH_SEED_THRESHOLD: f32 = 0.5;
/// Traversal stops propagating once activation falls below this floor.
const GRAPH_ACTIVATION_FLOOR: f32 = 0.1;
/// Strength boost recorded on every traversed edge (spec §4.7).
const GRAPH_TRAVERSAL_BOOST: f32 = 0.03;
/// Per-entity-link boost weight applied to entity-prefixed recall (spec §4.7).
const ENTITY_BOOST_WEIGHT: f32 = 0.1;

/// Closed relation-specific decay multiplier table combined with
/// `HOP_DECAY` at each traversal step (spec §4.7: "from a closed table").
/// Causal and derived edges carry reasoning forward undamped; thematic
/// edges damp lightly; entity links damp more (a shared entity is a
/// weaker semantic link than an explicit relation); contradictions damp
/// heavily since a contradiction edge is evidence of conflict, not of
/// "more of the same" worth spreading to.
pub struct RelationMultiplier;

impl RelationMultiplier {
    pub fn for_relation(relation: RelationKind) -> f32 {
        match relation {
            RelationKind::Causal => 1.0,
            RelationKind::Derived => 1.0,
            RelationKind::Thematic => 0.9,
            RelationKind::EntityLink => 0.8,
            RelationKind::Contradicts => 0.3,
        }
    }
}

/// Traversal constraints for graph-stage expansion (spec §4.7).
#[derive(Debug, Clone, Default)]
pub struct TraversalConstraints {
    pub relation_filter: Option<Vec<RelationKind>>,
    pub min_edge_strength: Option<f32>,
    pub respect_temporal_order: bool,
    pub max_age: Option<Duration>,
}

/// Input to one hybrid-recall call (spec §4.7).
#[derive(Debug, Clone)]
pub struct HybridRecallRequest {
    pub scope: Scope,
    pub query: String,
    pub vector_weight: f32,
    pub graph_weight: f32,
    pub max_hops: u32,
    pub top_k: usize,
    pub enable_graph: bool,
    pub entity_names: Vec<String>,
    pub constraints: TraversalConstraints,
}

impl Default for HybridRecallRequest {
    fn default() -> Self {
        Self {
            scope: Scope::new(String::new(), String::new()),
            query: String::new(),
            vector_weight: 0.6,
            graph_weight: 0.4,
            max_hops: 2,
            top_k: 10,
            enable_graph: true,
            entity_names: Vec::new(),
            constraints: TraversalConstraints::default(),
        }
    }
}

/// One hybrid-recall result with its component scores (spec §4.7 Stage C).
#[derive(Debug, Clone)]
pub struct RankedMemory {
    pub memory: Memory,
    pub vector_score: f32,
    pub graph_relevance: f32,
    pub final_score: f32,
}

/// Combined vector+graph recall (spec §4.7, component C7).
pub struct HybridRecall {
    memories: Arc<dyn MemoryStore>,
    graph: Arc<dyn GraphStore>,
    entities: Arc<dyn EntityStore>,
    embedder: Arc<dyn Embedder>,
}

impl HybridRecall {
    pub fn new(
        memories: Arc<dyn MemoryStore>,
        graph: Arc<dyn GraphStore>,
        entities: Arc<dyn EntityStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            memories,
            graph,
            entities,
            embedder,
        }
    }

    pub async fn recall(&self, req: &HybridRecallRequest) -> EngramResult<Vec<RankedMemory>> {
        let mut memories_by_id: HashMap<Uuid, Memory> = HashMap::new();
        let mut vector_scores: HashMap<Uuid, f32> = HashMap::new();

        if !self.embedder.is_available() {
            return Ok(Vec::new());
        }
        let embedding = self.embedder.embed(&req.query).await?;

        let opts = RecallOptions {
            top_k: req.top_k * VECTOR_OVERFETCH_MULTIPLIER,
            scoring: ScoringMode::Similarity,
            ..RecallOptions::default()
        };
        for hit in self.memories.recall(&req.scope, &embedding, &opts).await? {
            vector_scores.insert(hit.memory.id, hit.similarity);
            memories_by_id.insert(hit.memory.id, hit.memory);
        }

        let graph_relevance = if req.enable_graph {
            self.expand_graph(req, &vector_scores, &mut memories_by_id).await?
        } else {
            HashMap::new()
        };

        let entity_boost = self.entity_boost(req).await?;

        let mut all_ids: HashSet<Uuid> = vector_scores.keys().copied().collect();
        all_ids.extend(graph_relevance.keys().copied());

        let mut ranked = Vec::with_capacity(all_ids.len());
        for id in all_ids {
            let memory = match memories_by_id.remove(&id) {
                Some(m) => m,
                None => match self.memories.get(&req.scope, id).await? {
                    Some(m) => m,
                    None => continue,
                },
            };
            let vector = vector_scores.get(&id).copied().unwrap_or(0.0);
            let graph = graph_relevance.get(&id).copied().unwrap_or(0.0);
            let mut final_score = req.vector_weight * vector + req.graph_weight * graph;
            if let Some(boost) = entity_boost.get(&id) {
                final_score += boost;
            }
            ranked.push(RankedMemory {
                memory,
                vector_score: vector,
                graph_relevance: graph,
                final_score,
            });
        }

        ranked.sort_by(|a, b| b.final_score.partial_cmp(&a.final_score).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(req.top_k);
        Ok(ranked)
    }

    /// Stage B: BFS from vector seeds whose similarity exceeds the seed
    /// threshold, spreading activation across the association graph.
    async fn expand_graph(
        &self,
        req: &HybridRecallRequest,
        vector_scores: &HashMap<Uuid, f32>,
        memories_by_id: &mut HashMap<Uuid, Memory>,
    ) -> EngramResult<HashMap<Uuid, f32>> {
        let mut graph_relevance: HashMap<Uuid, f32> = HashMap::new();
        let mut visited: HashSet<Uuid> = HashSet::new();
        let mut queue: VecDeque<(Uuid, f32, u32, DateTime<Utc>)> = VecDeque::new();

        for (&seed_id, &similarity) in vector_scores {
            if similarity <= GRAPH_SEED_THRESHOLD {
                continue;
            }
            let created_at = match memories_by_id.get(&seed_id) {
                Some(m) => m.created_at,
                None => match self.memories.get(&req.scope, seed_id).await? {
                    Some(m) => {
                        let created_at = m.created_at;
                        memories_by_id.insert(seed_id, m);
                        created_at
                    }
                    None => continue,
                },
            };
            visited.insert(seed_id);
            queue.push_back((seed_id, 1.0, 0, created_at));
        }

        while let Some((node_id, activation, hop, node_created_at)) = queue.pop_front() {
            if hop >= req.max_hops {
                continue;
            }

            let neighbors = self
                .graph
                .get_neighbors(
                    &req.scope,
                    NodeKind::Memory,
                    node_id,
                    AssociationDirection::Outgoing,
                    req.constraints.relation_filter.as_deref(),
                )
                .await?;

            for edge in neighbors {
                if edge.target_type != NodeKind::Memory || visited.contains(&edge.target_id) {
                    continue;
                }
                if let Some(min_strength) = req.constraints.min_edge_strength {
                    if edge.strength < min_strength {
                        continue;
                    }
                }

                let target = match memories_by_id.get(&edge.target_id) {
                    Some(m) => m.clone(),
                    None => match self.memories.get(&req.scope, edge.target_id).await? {
                        Some(m) => {
                            memories_by_id.insert(edge.target_id, m.clone());
                            m
                        }
                        None => continue,
                    },
                };

                if edge.relation == RelationKind::Causal
                    && req.constraints.respect_temporal_order
                    && target.created_at < node_created_at
                {
                    continue;
                }
                if let Some(max_age) = req.constraints.max_age {
                    if Utc::now() - target.created_at > max_age {
                        continue;
                    }
                }

                let effective_decay = HOP_DECAY * RelationMultiplier::for_relation(edge.relation);
                let new_activation = activation * edge.strength * effective_decay;
                if new_activation < GRAPH_ACTIVATION_FLOOR {
                    continue;
                }

                graph_relevance
                    .entry(edge.target_id)
                    .and_modify(|v| {
                        if new_activation > *v {
                            *v = new_activation;
                        }
                    })
                    .or_insert(new_activation);

                let _ = self.graph.record_traversal(&req.scope, edge.id, GRAPH_TRAVERSAL_BOOST).await;
                visited.insert(edge.target_id);
                queue.push_back((edge.target_id, new_activation, hop + 1, target.created_at));
            }
        }

        Ok(graph_relevance)
    }

    /// Entity-prefixed recall boost: `0.1 · entity_confidence` per
    /// entity-linked memory (spec §4.7). Entities carry no standalone
    /// confidence field, so the per-mention role weight (the same value
    /// used to derive `entity_link` edge strength, spec §4.8 step 4) is
    /// used as the proxy.
    async fn entity_boost(&self, req: &HybridRecallRequest) -> EngramResult<HashMap<Uuid, f32>> {
        let mut boost: HashMap<Uuid, f32> = HashMap::new();

        for name in &req.entity_names {
            for entity in self.entities.find_all_by_name(&req.scope, name).await? {
                for (memory_id, role) in self.entities.memories_mentioning(&req.scope, entity.id).await? {
                    let weight = EntityMention::new(entity.id, memory_id, role).role_weight();
                    *boost.entry(memory_id).or_insert(0.0) += ENTITY_BOOST_WEIGHT * weight;
                }
            }
        }

        Ok(boost)
    }
}
