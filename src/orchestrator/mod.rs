//! Batch orchestration: lifecycle, worker pool, and per-run retry loop
//!
//! The orchestrator owns a single batch's lifecycle:
//! - Validating the config and claiming the running flag
//! - Driving runs sequentially or through a bounded worker pool
//! - Applying the retry policy around each provider call
//! - Honoring cooperative cancellation
//! - Funneling terminal results into shared state and checkpointing
//!   progress best-effort
//!
//! # Example
//!
//! ```ignore
//! use prompt_batch_core::{BatchOrchestratorBuilder, BatchRunConfig, TestCase};
//!
//! let orchestrator = BatchOrchestratorBuilder::new()
//!     .provider(provider)
//!     .validator(validator)
//!     .test_case(TestCase::new("test-1", "Say hello"))
//!     .build()?;
//!
//! let config = BatchRunConfig::new("test-1", "openai", "gpt-4o")
//!     .with_run_count(20)
//!     .with_parallel(4);
//!
//! orchestrator.start(config).await?;
//! println!("{:?}", orchestrator.statistics());
//! ```

mod builder;
mod executor;

pub use builder::BatchOrchestratorBuilder;
pub use executor::BatchOrchestrator;
