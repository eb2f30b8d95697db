pub mod batch;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod deadline;
pub mod detector;
pub mod detectors;
pub mod error;
pub mod expander;
pub mod graph;
pub mod merge;
pub mod order;
pub mod pipeline;
pub mod population;
pub mod registry;
pub mod sublevel;
pub mod view;

pub use batch::{read_batch, run_batch, run_parsed, BatchError, BatchOutcome, BatchRecord, BatchSummary, Verdict};
pub use cache::OrderTableCache;
pub use config::{ConfigError, EngineConfig};
pub use coordinator::{CoordinationResult, CoordinationStatus, Coordinator, Diagnostic};
pub use detector::{Detector, DetectorKind, DetectorResult};
pub use error::{DetectorInitError, EngineError, SnapshotError};
pub use expander::{BoundaryExpander, ExpansionOutcome};
pub use graph::DependencyGraph;
pub use merge::CoordinationStrategy;
pub use order::{Assignment, OrderKey, OrderTable, PositionedSlot};
pub use pipeline::{DecompositionRecord, Pipeline};
pub use population::{GroupExample, GroupPopulationSource, PopulationError, StaticPopulation};
pub use registry::{default_registry, DetectorFactory, DetectorRegistry, LoadedDetector};
pub use sublevel::SublevelDecomposer;
pub use view::SentenceView;
