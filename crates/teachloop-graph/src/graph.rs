//! Validated module-graph index and graph providers.
//!
//! The graph is an index of modules by identifier plus explicit
//! prerequisite-id lists. References are resolved by lookup, never by
//! embedded pointers, so the structure stays acyclic and serializable.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::{Concept, GraphError, Module, Result};

/// Maximum allowed graph file size in bytes (1MB).
pub const MAX_GRAPH_SIZE: u64 = 1024 * 1024;

/// On-disk representation of a pre-built module graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct GraphFile {
    /// Knowledge base this graph belongs to.
    kb_id: String,
    /// Modules in builder order.
    modules: Vec<Module>,
}

/// Validated, immutable module graph for one knowledge base.
///
/// Construction validates identifier uniqueness, prerequisite references,
/// and acyclicity; a constructed graph can be traversed without further
/// checks. Modules are held in `sequence` order.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    kb_id: String,
    modules: Vec<Module>,
    index: HashMap<String, usize>,
}

impl ModuleGraph {
    /// Builds and validates a graph from a module list.
    ///
    /// Modules are sorted by their `sequence` field. Validation checks:
    /// - module ids are unique
    /// - concept ids are unique across the whole graph
    /// - every prerequisite references an existing module
    /// - the prerequisite relation is acyclic
    ///
    /// # Errors
    ///
    /// Returns `DuplicateModule`, `DuplicateConcept`, `UnknownPrerequisite`,
    /// or `PrerequisiteCycle` on the first violation found.
    pub fn new(kb_id: impl Into<String>, mut modules: Vec<Module>) -> Result<Self> {
        modules.sort_by_key(|m| m.sequence);

        let mut index = HashMap::with_capacity(modules.len());
        let mut concept_ids = BTreeSet::new();
        for (i, module) in modules.iter().enumerate() {
            if index.insert(module.id.clone(), i).is_some() {
                return Err(GraphError::DuplicateModule {
                    module_id: module.id.clone(),
                });
            }
            for concept in &module.concepts {
                if !concept_ids.insert(concept.id.clone()) {
                    return Err(GraphError::DuplicateConcept {
                        concept_id: concept.id.clone(),
                    });
                }
            }
        }

        for module in &modules {
            for prerequisite in &module.prerequisites {
                if !index.contains_key(prerequisite) {
                    return Err(GraphError::UnknownPrerequisite {
                        module_id: module.id.clone(),
                        prerequisite: prerequisite.clone(),
                    });
                }
            }
        }

        let graph = Self {
            kb_id: kb_id.into(),
            modules,
            index,
        };
        graph.check_acyclic()?;
        Ok(graph)
    }

    /// Loads a graph from a JSON file produced by the module builder.
    ///
    /// # Errors
    ///
    /// Returns `GraphNotFound` if the file doesn't exist, `GraphTooLarge`
    /// if it exceeds [`MAX_GRAPH_SIZE`], `GraphParseError` on invalid JSON,
    /// and any validation error from [`ModuleGraph::new`].
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let metadata = std::fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GraphError::GraphNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                GraphError::Io(e)
            }
        })?;

        let file_size = metadata.len();
        if file_size > MAX_GRAPH_SIZE {
            return Err(GraphError::GraphTooLarge {
                path: path.to_path_buf(),
                size_kb: file_size / 1024,
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let file: GraphFile =
            serde_json::from_str(&contents).map_err(|e| GraphError::GraphParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        Self::new(file.kb_id, file.modules)
    }

    /// Returns the knowledge base id this graph belongs to.
    #[must_use]
    pub fn kb_id(&self) -> &str {
        &self.kb_id
    }

    /// Returns all modules in sequence order.
    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Returns the module with the given id, if present.
    #[must_use]
    pub fn module(&self, module_id: &str) -> Option<&Module> {
        self.index.get(module_id).and_then(|&i| self.modules.get(i))
    }

    /// Resolves a (module, concept) pair by id.
    #[must_use]
    pub fn concept(&self, module_id: &str, concept_id: &str) -> Option<&Concept> {
        self.module(module_id)?.concept(concept_id)
    }

    /// Total number of concepts across all modules.
    #[must_use]
    pub fn total_concepts(&self) -> usize {
        self.modules.iter().map(|m| m.concepts.len()).sum()
    }

    /// Returns `true` when every concept of `module` is in `completed`.
    ///
    /// Module completion is always derived from completed concepts, never
    /// stored, so it cannot drift.
    #[must_use]
    pub fn module_complete(module: &Module, completed: &BTreeSet<String>) -> bool {
        module.concepts.iter().all(|c| completed.contains(&c.id))
    }

    /// Modules that are incomplete and whose prerequisites are all complete.
    ///
    /// This is the option list the engine presents in the module menu.
    #[must_use]
    pub fn available_modules(&self, completed: &BTreeSet<String>) -> Vec<&Module> {
        self.modules
            .iter()
            .filter(|m| !Self::module_complete(m, completed))
            .filter(|m| {
                m.prerequisites.iter().all(|p| {
                    self.module(p)
                        .is_some_and(|pm| Self::module_complete(pm, completed))
                })
            })
            .collect()
    }

    /// Returns `true` when every module in the graph is complete.
    #[must_use]
    pub fn all_complete(&self, completed: &BTreeSet<String>) -> bool {
        self.modules
            .iter()
            .all(|m| Self::module_complete(m, completed))
    }

    /// Depth-first cycle check over the prerequisite relation.
    fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }

        let mut marks = vec![Mark::Unvisited; self.modules.len()];

        for start in 0..self.modules.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }
            marks[start] = Mark::InProgress;
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];

            while let Some(frame) = stack.last_mut() {
                let (node, edge) = *frame;
                let prerequisites = &self.modules[node].prerequisites;
                if edge < prerequisites.len() {
                    frame.1 += 1;
                    // Prerequisite existence was validated in `new`.
                    let Some(&next) = self.index.get(&prerequisites[edge]) else {
                        continue;
                    };
                    match marks[next] {
                        Mark::InProgress => {
                            return Err(GraphError::PrerequisiteCycle {
                                module_id: self.modules[next].id.clone(),
                            });
                        }
                        Mark::Unvisited => {
                            marks[next] = Mark::InProgress;
                            stack.push((next, 0));
                        }
                        Mark::Done => {}
                    }
                } else {
                    marks[node] = Mark::Done;
                    stack.pop();
                }
            }
        }

        Ok(())
    }
}

// ============================================================================
// Providers
// ============================================================================

/// Read-only source of module graphs, keyed by knowledge base id.
///
/// Graphs are built and persisted by an external module-extraction process;
/// the engine only ever reads them.
pub trait GraphProvider: Send + Sync {
    /// Returns the graph for a knowledge base, if one is registered.
    fn graph(&self, kb_id: &str) -> Option<Arc<ModuleGraph>>;
}

/// In-memory [`GraphProvider`] backed by a map of pre-built graphs.
#[derive(Debug, Default)]
pub struct InMemoryGraphProvider {
    graphs: RwLock<HashMap<String, Arc<ModuleGraph>>>,
}

impl InMemoryGraphProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a graph under its knowledge base id, replacing any
    /// previously registered graph for that kb.
    pub fn insert(&self, graph: ModuleGraph) {
        let mut guard = match self.graphs.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.insert(graph.kb_id().to_string(), Arc::new(graph));
    }
}

impl GraphProvider for InMemoryGraphProvider {
    fn graph(&self, kb_id: &str) -> Option<Arc<ModuleGraph>> {
        let guard = match self.graphs.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.get(kb_id).cloned()
    }
}
