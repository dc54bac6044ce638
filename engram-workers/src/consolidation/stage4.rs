//! Stage 4 — schema formation (spec §4.11).
//!
//! Greedy single-link clustering over memories, then an LLM pattern
//! oracle per cluster. No incremental clustering state is kept across
//! sweeps: every run reclusters from scratch over the eligible memory
//! set, so a schema already formed from a cluster simply gets its
//! evidence re-merged (a no-op past the first sweep) rather than
//! duplicated, via [`engram_schema::SchemaService::upsert`].

use std::collections::HashSet;

use uuid::Uuid;

use engram_core::errors::EngramResult;
use engram_core::memory::{Association, NodeKind, RelationKind, Scope};
use engram_core::vector::{cosine_similarity, update_centroid};
use engram_providers::llm::ClusterMember;
use engram_schema::{SchemaService, UpsertSchemaRequest};

use super::ConsolidationWorker;

/// A single-link cluster under formation: a running centroid plus the
/// member ids/embeddings that fed it.
struct Cluster {
    centroid: Vec<f32>,
    members: Vec<usize>,
}

impl ConsolidationWorker {
    pub(super) async fn stage4_schema_formation(&self, scope: &Scope) -> EngramResult<()> {
        let now = chrono::Utc::now();
        let candidates: Vec<_> = self
            .memories
            .list_by_agent_for_decay(scope)
            .await?
            .into_iter()
            .filter(|m| !m.archived)
            .filter(|m| m.confidence >= self.config.stage4_min_confidence)
            .filter(|m| (now - m.created_at).num_hours() >= self.config.stage4_min_age_hours)
            .filter(|m| m.embedding.is_some())
            .collect();

        if candidates.len() < self.config.stage4_min_cluster_size {
            return Ok(());
        }

        let clusters = self.cluster_single_link(&candidates);
        let schemas = SchemaService::new(self.schemas.clone());

        for cluster in clusters {
            if cluster.members.len() < self.config.stage4_min_cluster_size {
                continue;
            }

            let members: Vec<&engram_core::memory::Memory> = cluster.members.iter().map(|&i| &candidates[i]).collect();
            let llm_members: Vec<ClusterMember> = members
                .iter()
                .map(|m| ClusterMember {
                    content: m.content.clone(),
                    memory_type: m.memory_type,
                })
                .collect();

            let pattern = match self.llm.detect_schema_pattern(&llm_members).await {
                Ok(Some(p)) => p,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(worker = "consolidation", stage = 4, error = %err, "schema pattern detection failed, skipping cluster");
                    continue;
                }
            };

            let n = members.len();
            let evidence_memories: Vec<Uuid> = members.iter().map(|m| m.id).collect();
            let initial_confidence = (0.5 + 0.05 * n as f64).min(0.8);

            let embedding = match self.embedder.embed(&format!("{}: {}", pattern.name, pattern.description)).await {
                Ok(e) => Some(e),
                Err(err) => {
                    tracing::debug!(worker = "consolidation", stage = 4, error = %err, "schema name embedding failed");
                    None
                }
            };

            let schema = match schemas
                .upsert(UpsertSchemaRequest {
                    scope: scope.clone(),
                    schema_type: pattern.schema_type,
                    name: pattern.name,
                    description: pattern.description,
                    evidence_memories: evidence_memories.clone(),
                    evidence_episodes: Vec::new(),
                    initial_confidence,
                    embedding,
                })
                .await
            {
                Ok(s) => s,
                Err(err) => {
                    tracing::warn!(worker = "consolidation", stage = 4, error = %err, "schema upsert failed, skipping cluster");
                    continue;
                }
            };

            for memory_id in evidence_memories {
                let edge = Association::new(scope.clone(), NodeKind::Memory, memory_id, NodeKind::Schema, schema.id, RelationKind::Derived, 1.0);
                if let Err(err) = self.graph.create_edge(&edge).await {
                    tracing::warn!(worker = "consolidation", stage = 4, schema_id = %schema.id, error = %err, "failed to persist evidence association");
                }
            }
        }

        Ok(())
    }

    /// Greedy single-link clustering at `config.stage4_cluster_similarity`:
    /// each candidate joins the first cluster whose centroid it is similar
    /// enough to, else starts a new one. Centroids fold in new members via
    /// a running average rather than recomputing the full mean each time.
    fn cluster_single_link(&self, candidates: &[engram_core::memory::Memory]) -> Vec<Cluster> {
        let mut clusters: Vec<Cluster> = Vec::new();
        let mut assigned: HashSet<usize> = HashSet::new();

        for (i, memory) in candidates.iter().enumerate() {
            if assigned.contains(&i) {
                continue;
            }
            let Some(embedding) = memory.embedding.as_deref() else { continue };

            let mut joined = false;
            for cluster in clusters.iter_mut() {
                if cosine_similarity(&cluster.centroid, embedding) >= self.config.stage4_cluster_similarity {
                    cluster.centroid = update_centroid(&cluster.centroid, embedding, cluster.members.len());
                    cluster.members.push(i);
                    joined = true;
                    break;
                }
            }
            if !joined {
                clusters.push(Cluster {
                    centroid: embedding.to_vec(),
                    members: vec![i],
                });
            }
            assigned.insert(i);
        }

        clusters
    }
}
