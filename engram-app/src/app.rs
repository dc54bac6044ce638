//! Top-level application object (spec §9 "Global state"): one constructor
//! builds every service and worker over a single store, and `start`/`stop`
//! on the worker set are idempotent, mirroring the teacher's
//! supervisor-owns-tickers shape in `engram_workers::supervisor::Ticker`.

use std::sync::Arc;
use std::time::Duration;

use engram_core::config::EngramConfig;
use engram_core::errors::EngramResult;

use engram_episodic::EpisodeService;
use engram_graph::GraphBuilder;
use engram_learning::FeedbackService;
use engram_memory::MemoryService;
use engram_metacognition::MetacognitiveService;
use engram_policy::PolicyService;
use engram_procedural::ProcedureService;
use engram_retrieval::hybrid::HybridRecall;
use engram_schema::SchemaService;
use engram_storage::Store;
use engram_working_memory::WorkingMemoryService;

use engram_workers::{ConsolidationWorker, DecayWorker, ExpirerWorker, TunerWorker};

use crate::config::AppConfig;
use crate::providers::{build_embedder, build_llm};

/// Every service the core exposes, wired over one store and one pair of
/// providers. Handed out as `Arc<Self>` so request handlers (outside this
/// spec's scope) and the worker set can share it freely.
pub struct App {
    pub store: Arc<Store>,
    pub memory: MemoryService,
    pub episodes: EpisodeService,
    pub procedures: ProcedureService,
    pub schemas: SchemaService,
    pub feedback: FeedbackService,
    pub policy: Arc<PolicyService>,
    pub graph: Arc<GraphBuilder>,
    pub hybrid_recall: HybridRecall,
    pub working_memory: WorkingMemoryService,
    pub metacognition: MetacognitiveService,

    decay_worker: Arc<DecayWorker>,
    consolidation_worker: Arc<ConsolidationWorker>,
    expirer_worker: Arc<ExpirerWorker>,
    tuner_worker: Arc<TunerWorker>,
    config: AppConfig,
}

impl App {
    /// Open the store, construct every provider/service/worker, and return
    /// the wired application. Workers are constructed but not started —
    /// call [`App::start_workers`] once the caller is ready to run them.
    pub fn bootstrap(config: AppConfig, engram_config: EngramConfig) -> EngramResult<Arc<Self>> {
        let store = Arc::new(Store::open(&config.database_url)?);
        Self::bootstrap_with_store(store, config, engram_config)
    }

    /// Same as [`App::bootstrap`] but over a caller-supplied store — used by
    /// tests that want an in-memory database.
    pub fn bootstrap_with_store(store: Arc<Store>, config: AppConfig, engram_config: EngramConfig) -> EngramResult<Arc<Self>> {
        let llm = build_llm(config.llm_provider)?;
        let embedder = build_embedder(config.embedding_provider)?;

        let policy = Arc::new(PolicyService::new(store.clone(), store.clone(), llm.clone(), embedder.clone()));

        let graph = Arc::new(GraphBuilder::new(
            store.clone(),
            store.clone(),
            store.clone(),
            embedder.clone(),
            llm.clone(),
        ));

        let memory = MemoryService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            embedder.clone(),
            llm.clone(),
            policy.clone(),
            graph.clone(),
            engram_config.retrieval.clone(),
        );

        let episodes = EpisodeService::new(store.clone(), store.clone(), embedder.clone(), llm.clone());
        let procedures = ProcedureService::new(store.clone(), embedder.clone());
        let schemas = SchemaService::new(store.clone());
        let feedback = FeedbackService::new(store.clone(), store.clone(), store.clone(), store.clone());
        let hybrid_recall = HybridRecall::new(store.clone(), store.clone(), store.clone(), embedder.clone());
        let working_memory = WorkingMemoryService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            embedder.clone(),
            engram_config.working_memory.clone(),
        );
        let metacognition = MetacognitiveService::new(store.clone(), store.clone(), store.clone(), store.clone());

        let tenants = config.tenant_ids.clone();
        let decay_worker = DecayWorker::new(store.clone(), store.clone(), engram_config.decay.clone(), tenants.clone());
        let consolidation_worker = ConsolidationWorker::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            llm.clone(),
            embedder.clone(),
            engram_config.consolidation.clone(),
            tenants.clone(),
        );
        let expirer_worker = ExpirerWorker::new(store.clone(), store.clone(), tenants.clone());
        let tuner_worker = TunerWorker::new(store.clone(), store.clone(), store.clone(), engram_config.workers.clone(), tenants);

        Ok(Arc::new(Self {
            store,
            memory,
            episodes,
            procedures,
            schemas,
            feedback,
            policy,
            graph,
            hybrid_recall,
            working_memory,
            metacognition,
            decay_worker,
            consolidation_worker,
            expirer_worker,
            tuner_worker,
            config,
        }))
    }

    /// Start all four background workers on the tick/budget defaults from
    /// `WorkerConfig` (spec §6 "Worker tick defaults"). Idempotent per
    /// worker — calling this twice without an intervening `stop_workers`
    /// is a no-op on the already-running workers.
    pub fn start_workers(&self, workers: &engram_core::config::WorkerConfig) {
        self.decay_worker.start(
            Duration::from_secs(workers.decay_tick_secs),
            Duration::from_secs(workers.decay_budget_secs),
        );
        self.consolidation_worker.start(
            Duration::from_secs(workers.consolidation_tick_secs),
            Duration::from_secs(workers.consolidation_budget_secs),
        );
        self.expirer_worker.start(
            Duration::from_secs(workers.expirer_tick_secs),
            Duration::from_secs(workers.expirer_budget_secs),
        );
        self.tuner_worker.start(
            Duration::from_secs(workers.tuner_tick_secs),
            Duration::from_secs(workers.tuner_budget_secs),
        );
    }

    /// Stop every worker, finishing each one's in-flight sweep first (spec
    /// §5 "finishes the in-flight sweep, and joins"). Runs all four stops
    /// concurrently since they share no state beyond the store, which
    /// serializes its own mutations.
    pub async fn stop_workers(&self) {
        tokio::join!(
            self.decay_worker.stop(),
            self.consolidation_worker.stop(),
            self.expirer_worker.stop(),
            self.tuner_worker.stop(),
        );
    }

    /// Wait for a shutdown signal, stop the workers, and return. Implements
    /// the exit contract in spec §6: "SIGINT/SIGTERM → stop workers → drain
    /// HTTP (≤10s) → close store → exit 0" minus the HTTP drain, which
    /// belongs to the (out-of-scope) transport layer.
    pub async fn run_until_shutdown(self: &Arc<Self>, workers: &engram_core::config::WorkerConfig) -> EngramResult<()> {
        self.start_workers(workers);
        wait_for_shutdown_signal().await;
        tracing::info!("shutdown signal received, stopping workers");
        self.stop_workers().await;
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
