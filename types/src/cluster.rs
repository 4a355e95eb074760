/// A group of surviving weighted values whose pairwise gaps never exceeded
/// `clusterThreshold`, produced by the cluster analysis step of majority-vote
/// mode (§4.3).
#[derive(Debug, Clone, PartialEq)]
pub struct InputCluster {
    pub centroid: f64,
    /// Indices into the surviving-inputs slice that fed cluster analysis.
    pub members: Vec<usize>,
    /// Sum of member weights.
    pub density: f64,
    /// `density / total_density` across all clusters in the tick.
    pub coherence: f64,
}

impl InputCluster {
    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}
