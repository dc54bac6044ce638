use engram_core::memory::{ActivatedItem, NodeKind, WorkingMemorySession};
use engram_core::traits::{EpisodeStore, MemoryStore, ProcedureStore, SchemaStore};

/// Render a working-memory session as grouped text blocks, one per node
/// type, for downstream LLM consumption (spec §4.9). `ActivatedItem`
/// carries only ids and activation metadata, so content is re-fetched
/// from the originating store per item.
pub async fn assemble_context(
    session: &WorkingMemorySession,
    memories: &dyn MemoryStore,
    episodes: &dyn EpisodeStore,
    procedures: &dyn ProcedureStore,
    schemas: &dyn SchemaStore,
) -> String {
    let mut sections: Vec<(&str, Vec<String>)> = vec![
        ("Goal", session.current_goal.iter().cloned().collect()),
        ("Beliefs", Vec::new()),
        ("Episodes", Vec::new()),
        ("Skills", Vec::new()),
        ("Schemas", Vec::new()),
    ];

    for item in &session.items {
        let line = render_item(session, item, memories, episodes, procedures, schemas).await;
        let Some(line) = line else { continue };
        let bucket = match item.node_type {
            NodeKind::Memory => &mut sections[1].1,
            NodeKind::Episode => &mut sections[2].1,
            NodeKind::Procedure => &mut sections[3].1,
            NodeKind::Schema => &mut sections[4].1,
            NodeKind::Entity => continue,
        };
        bucket.push(line);
    }

    let mut out = String::new();
    for (title, lines) in sections {
        if lines.is_empty() {
            continue;
        }
        out.push_str(title);
        out.push_str(":\n");
        for line in lines {
            out.push_str("- ");
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }
    out
}

async fn render_item(
    session: &WorkingMemorySession,
    item: &ActivatedItem,
    memories: &dyn MemoryStore,
    episodes: &dyn EpisodeStore,
    procedures: &dyn ProcedureStore,
    schemas: &dyn SchemaStore,
) -> Option<String> {
    let scope = &session.scope;
    match item.node_type {
        NodeKind::Memory => memories.get(scope, item.node_id).await.ok().flatten().map(|m| m.content),
        NodeKind::Episode => episodes.get(scope, item.node_id).await.ok().flatten().map(|e| e.raw_content),
        NodeKind::Procedure => procedures
            .get(scope, item.node_id)
            .await
            .ok()
            .flatten()
            .map(|p| format!("{} -> {}", p.trigger_pattern, p.action_template)),
        NodeKind::Schema => schemas.get(scope, item.node_id).await.ok().flatten().map(|s| format!("{}: {}", s.name, s.description)),
        NodeKind::Entity => None,
    }
}
