//! Fitview - pooled fitness statistics for evolutionary populations
//!
//! Computes mean, population variance, standard deviation and extremes over
//! genomes and hybrid populations (populations of populations) in a single
//! pass. View buffers are recycled through a thread-safe [`ViewPool`] so
//! gathering statistics every generation does not churn the allocator.
//!
//! ```
//! use fitview::{Deme, Population, ViewPool};
//!
//! let pool = ViewPool::new();
//! let mut world = Deme::new("world");
//! world.push_deme(Deme::from_genomes("east", [1.0, 2.0, 3.0]));
//! world.push_deme(Deme::from_genomes("west", [4.0, 5.0]));
//!
//! let view = world.view(&pool);
//! assert_eq!(view.len(), 5);
//! assert!((view.mean() - 3.0).abs() < 1e-12);
//! assert!((view.variance().unwrap() - 2.0).abs() < 1e-12);
//! view.release();
//! ```

pub mod error;
pub mod models;
pub mod replay;
pub mod report;
pub mod scanner;
pub mod view;

pub use error::{LoadError, ReplayError, ViewError};
pub use models::{Deme, Entity, Genome, Individual, Member, Population};
pub use view::{PoolStats, Summary, View, ViewPool};
