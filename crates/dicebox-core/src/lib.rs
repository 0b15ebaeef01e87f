pub mod config;
pub mod error;
pub mod idea;
pub mod io;
pub mod labels;
pub mod pool;
pub mod state;
pub mod types;

pub use error::{DiceboxError, Result};
pub use idea::{IdeaRecord, PregeneratedIdea, Strategy};
pub use labels::{LabelCatalog, ParameterChoice, ParameterQuery};
pub use pool::{GenerateError, IdeaGenerator, IdeaPool, MemoryPool, PoolError};
pub use state::{DiceState, DieStatus};
pub use types::{Axis, DieConfig, DieId, Side, SideReading};
