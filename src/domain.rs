//! Domain module - tasks, outcomes, normalized records and schema descriptors
//!
//! Everything in here is free of I/O. The infrastructure layer talks to the
//! network and the file system; the application layer wires both together.

pub mod outcome;
pub mod record;
pub mod schema;
pub mod schemas;
pub mod task;

pub use outcome::{FetchFailure, FetchOutcome, PageOutcome, TaskOutcome, TransportErrorKind};
pub use record::{FieldValue, NormalizedRecord};
pub use schema::{ColumnKind, ColumnSpec, DomainSchema, QaRules, RecordContext};
pub use schemas::{schema_for, ProductEndpointMode, ProductSchema, ReviewSchema, SearchSchema};
pub use task::{build_tasks, Domain, KeyInput, RetrievalParams, Task, TaskId};
