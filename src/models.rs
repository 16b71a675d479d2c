//! Data models for genomes and populations.
//!
//! The statistics engine only needs two capabilities from the outside world:
//! a genome that reports its fitness, and a population that can summarise
//! itself as a [`View`]. Both are traits here, together with the concrete
//! [`Individual`] and [`Deme`] types used by the command-line tool.

use crate::view::{View, ViewPool};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Anything with a fitness value.
///
/// `fitness` must be pure for the duration of one view construction.
pub trait Genome {
    fn fitness(&self) -> f64;
}

impl Genome for f64 {
    fn fitness(&self) -> f64 {
        *self
    }
}

impl<T: Genome + ?Sized> Genome for &T {
    fn fitness(&self) -> f64 {
        (**self).fitness()
    }
}

impl<T: Genome + ?Sized> Genome for Arc<T> {
    fn fitness(&self) -> f64 {
        (**self).fitness()
    }
}

impl<T: Genome + ?Sized> Genome for Box<T> {
    fn fitness(&self) -> f64 {
        (**self).fitness()
    }
}

/// A collection of genomes that can summarise itself.
///
/// Implementations are expected to build their view through `pool`, usually
/// by calling [`ViewPool::view`] on their own members.
pub trait Population<G> {
    fn view(&self, pool: &ViewPool<G>) -> View<G>;
}

/// One item folded into a view: a leaf genome or a nested population.
#[derive(Debug)]
pub enum Entity<'a, G, P: ?Sized> {
    Genome(G),
    Population(&'a P),
}

impl<G: Clone, P: ?Sized> Clone for Entity<'_, G, P> {
    fn clone(&self) -> Self {
        match self {
            Entity::Genome(g) => Entity::Genome(g.clone()),
            Entity::Population(p) => Entity::Population(p),
        }
    }
}

/// A named genome with a fixed fitness, as read from a population file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub id: String,
    pub fitness: f64,
}

impl Individual {
    pub fn new(id: impl Into<String>, fitness: f64) -> Self {
        Self {
            id: id.into(),
            fitness,
        }
    }
}

impl Genome for Individual {
    fn fitness(&self) -> f64 {
        self.fitness
    }
}

impl fmt::Display for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.fitness)
    }
}

/// A member of a [`Deme`]: either a genome or a nested deme.
#[derive(Debug, Clone)]
pub enum Member<G> {
    Genome(G),
    Deme(Deme<G>),
}

impl<G: Clone> Member<G> {
    /// Borrow this member as an entity for view construction.
    pub fn as_entity(&self) -> Entity<'_, G, Deme<G>> {
        match self {
            Member::Genome(g) => Entity::Genome(g.clone()),
            Member::Deme(d) => Entity::Population(d),
        }
    }
}

/// A hybrid population: an ordered list of genomes and sub-populations.
#[derive(Debug, Clone)]
pub struct Deme<G> {
    pub name: String,
    pub members: Vec<Member<G>>,
}

impl<G> Deme<G> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    /// Creates a flat deme from a list of genomes.
    pub fn from_genomes(name: impl Into<String>, genomes: impl IntoIterator<Item = G>) -> Self {
        Self {
            name: name.into(),
            members: genomes.into_iter().map(Member::Genome).collect(),
        }
    }

    pub fn push_genome(&mut self, genome: G) {
        self.members.push(Member::Genome(genome));
    }

    pub fn push_deme(&mut self, deme: Deme<G>) {
        self.members.push(Member::Deme(deme));
    }

    /// Number of direct members (genomes and sub-demes).
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Total number of genomes, including those inside nested demes.
    pub fn leaf_count(&self) -> usize {
        self.members
            .iter()
            .map(|m| match m {
                Member::Genome(_) => 1,
                Member::Deme(d) => d.leaf_count(),
            })
            .sum()
    }

    /// Nesting depth; a deme with no sub-demes has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .members
            .iter()
            .filter_map(|m| match m {
                Member::Deme(d) => Some(d.depth()),
                Member::Genome(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Visit this deme and every nested deme in pre-order, with its path.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&Path, &'a Deme<G>)) {
        self.walk_from(&PathBuf::from(&self.name), visit);
    }

    fn walk_from<'a>(&'a self, path: &Path, visit: &mut impl FnMut(&Path, &'a Deme<G>)) {
        visit(path, self);
        for member in &self.members {
            if let Member::Deme(d) = member {
                d.walk_from(&path.join(&d.name), visit);
            }
        }
    }
}

impl<G: Genome + Clone> Population<G> for Deme<G> {
    fn view(&self, pool: &ViewPool<G>) -> View<G> {
        pool.view(self.members.iter().map(Member::as_entity))
    }
}
