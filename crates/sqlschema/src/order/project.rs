//! Build-order resolution for multi-project workspaces.
//!
//! Second consumer of the topological traversal, with different edge
//! semantics than table ordering: each project contributes a productive and a
//! test artifact. Test artifacts depend on the productive artifact of their
//! own project and on the test artifacts of the project's dependencies;
//! productive artifacts depend only on the productive artifacts of the
//! dependencies. The asymmetry keeps test-only resources of a dependency
//! from shadowing production resources of the depending project.
//!
//! Unlike table ordering, this resolution is deliberately permissive: a
//! cyclic project graph yields a partial order instead of an error, matching
//! the long-standing behaviour build tooling depends on.

use super::topsort_tolerant;

/// A project with its declared dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Project name.
    pub name: String,

    /// Names of the projects this one depends on, in declared order.
    pub dependencies: Vec<String>,
}

impl Project {
    /// Create a project.
    pub fn new(name: impl Into<String>, dependencies: Vec<String>) -> Self {
        Self {
            name: name.into(),
            dependencies,
        }
    }
}

/// Which artifact of a project is meant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The production classes/resources of a project.
    Productive,
    /// The test classes/resources of a project.
    Test,
}

/// One build artifact: a (project, kind) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Artifact {
    /// The owning project name.
    pub project: String,

    /// Productive or test artifact.
    pub kind: ArtifactKind,
}

impl Artifact {
    /// The productive artifact of a project.
    pub fn productive(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            kind: ArtifactKind::Productive,
        }
    }

    /// The test artifact of a project.
    pub fn test(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            kind: ArtifactKind::Test,
        }
    }
}

/// Resolve the build order of the given projects.
///
/// Returns all productive and test artifacts ordered so that every artifact
/// appears after everything it depends on. Dependencies naming no declared
/// project are ignored. Cyclic dependency declarations do not fail; the
/// affected artifacts appear in a partial order.
pub fn build_order(projects: &[Project]) -> Vec<Artifact> {
    let dependencies_of = |artifact: &Artifact| -> Vec<Artifact> {
        let Some(project) = projects.iter().find(|p| p.name == artifact.project) else {
            return Vec::new();
        };
        let declared = project
            .dependencies
            .iter()
            .filter(|name| projects.iter().any(|p| &p.name == *name));
        match artifact.kind {
            ArtifactKind::Productive => declared.map(Artifact::productive).collect(),
            ArtifactKind::Test => {
                let mut result = vec![Artifact::productive(&project.name)];
                result.extend(declared.map(Artifact::test));
                result
            }
        }
    };

    let input: Vec<Artifact> = projects
        .iter()
        .flat_map(|p| [Artifact::productive(&p.name), Artifact::test(&p.name)])
        .collect();

    topsort_tolerant(&dependencies_of, &input, true)
}
