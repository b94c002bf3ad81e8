//! Path queries between two individuals.

use crate::graph::{FamilyGraph, GraphResult, Path, PathKind};

/// Paths from one individual to another.
///
/// Blood and marital toggles filter whole paths by their [`PathKind`] after
/// enumeration. A mixed path is kept while either toggle is on.
pub struct PathQuery<'g> {
    graph: &'g FamilyGraph,
    from: String,
    to: String,
    max_length: usize,
    include_blood: bool,
    include_marital: bool,
    shortest: bool,
}

impl<'g> PathQuery<'g> {
    pub(crate) fn new(graph: &'g FamilyGraph, from: &str, to: &str) -> Self {
        Self {
            graph,
            from: from.to_string(),
            to: to.to_string(),
            max_length: graph.config().default_max_path_length,
            include_blood: true,
            include_marital: true,
            shortest: false,
        }
    }

    /// Zero falls back to the configured default.
    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = if n == 0 { self.graph.config().default_max_path_length } else { n };
        self
    }

    pub fn include_blood(mut self, include: bool) -> Self {
        self.include_blood = include;
        self
    }

    pub fn include_marital(mut self, include: bool) -> Self {
        self.include_marital = include;
        self
    }

    pub fn blood_only(self) -> Self {
        self.include_blood(true).include_marital(false)
    }

    /// Return at most the single shortest path.
    pub fn shortest(mut self) -> Self {
        self.shortest = true;
        self
    }

    fn admits(&self, path: &Path) -> bool {
        match path.kind {
            PathKind::Blood => self.include_blood,
            PathKind::Marital => self.include_marital,
            PathKind::Mixed => self.include_blood || self.include_marital,
        }
    }

    /// The shortest path, regardless of the kind toggles.
    pub fn shortest_path(&self) -> GraphResult<Option<Path>> {
        self.graph.shortest_path(&self.from, &self.to)
    }

    pub fn execute(&self) -> GraphResult<Vec<Path>> {
        if self.shortest {
            let path = self.shortest_path()?;
            return Ok(path.into_iter().filter(|p| self.admits(p)).collect());
        }
        let paths = self.graph.all_paths(&self.from, &self.to, self.max_length)?;
        Ok(paths.into_iter().filter(|p| self.admits(p)).collect())
    }

    pub fn count(&self) -> GraphResult<usize> {
        Ok(self.execute()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures;
    use crate::graph::EdgeKind;

    #[test]
    fn shortest_between_parent_and_child() {
        let graph = fixtures::nuclear_family();
        let paths = graph.query().individual("@I3@").path_to("@I1@").shortest().execute().unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].edge_kinds().collect::<Vec<_>>(), vec![EdgeKind::Famc, EdgeKind::Husb]);
    }

    #[test]
    fn kind_toggles_filter_paths() {
        let graph = fixtures::nuclear_family();
        let q = || graph.query().individual("@I1@").path_to("@I2@");
        let all = q().execute().unwrap();
        assert!(!all.is_empty());
        // spouse to spouse through the family is purely marital
        assert!(all.iter().any(|p| p.kind == PathKind::Marital));
        let blood = q().blood_only().execute().unwrap();
        assert!(blood.iter().all(|p| p.kind != PathKind::Marital));
        assert!(blood.len() < all.len());
        assert_eq!(q().include_blood(false).include_marital(false).count().unwrap(), 0);
    }

    #[test]
    fn length_bound() {
        let graph = fixtures::three_generations();
        let q = || graph.query().individual("@I1@").path_to("@I3@");
        assert_eq!(q().max_length(3).count().unwrap(), 0);
        assert_eq!(q().max_length(4).count().unwrap(), 1);
        assert_eq!(q().max_length(0).count().unwrap(), 1);
    }

    #[test]
    fn missing_endpoint() {
        let graph = fixtures::nuclear_family();
        assert!(graph.query().individual("@I1@").path_to("@X@").execute().is_err());
    }
}
