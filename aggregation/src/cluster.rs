use aggregator_types::{InputCluster, WeightedInput};

/// `density/total` share above which a cluster counts toward bimodality.
const BIMODAL_SHARE_THRESHOLD: f64 = 0.3;

/// Sorts `survivors` ascending and splits them into clusters wherever a gap
/// between consecutive values exceeds `threshold` (§4.3 "Cluster analysis").
/// Clusters come back in ascending-centroid order, which is what
/// [`dominant_cluster`] relies on for its tie-break.
pub fn build_clusters(survivors: &[WeightedInput], threshold: f64) -> Vec<InputCluster> {
    if survivors.is_empty() {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..survivors.len()).collect();
    order.sort_by(|&a, &b| survivors[a].value().partial_cmp(&survivors[b].value()).unwrap());

    let mut clusters = Vec::new();
    let mut current = vec![order[0]];
    for pair in order.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if survivors[next].value() - survivors[prev].value() > threshold {
            clusters.push(finalize(survivors, &current));
            current = vec![next];
        } else {
            current.push(next);
        }
    }
    clusters.push(finalize(survivors, &current));

    let total_density: f64 = clusters.iter().map(|c| c.density).sum();
    for cluster in &mut clusters {
        cluster.coherence = if total_density > 0.0 { cluster.density / total_density } else { 0.0 };
    }
    clusters
}

fn finalize(survivors: &[WeightedInput], members: &[usize]) -> InputCluster {
    let density: f64 = members.iter().map(|&i| survivors[i].weight).sum();
    let centroid = if density > 0.0 {
        members.iter().map(|&i| survivors[i].value() * survivors[i].weight).sum::<f64>() / density
    } else {
        members.iter().map(|&i| survivors[i].value()).sum::<f64>() / members.len() as f64
    };
    InputCluster { centroid, members: members.to_vec(), density, coherence: 0.0 }
}

/// The densest cluster, resolving exact ties by ascending centroid (Open
/// Question O2: "first by ascending centroid"). `clusters` must already be
/// in ascending-centroid order, as returned by [`build_clusters`].
pub fn dominant_cluster(clusters: &[InputCluster]) -> Option<&InputCluster> {
    let max_density = clusters.iter().map(|c| c.density).fold(f64::NEG_INFINITY, f64::max);
    clusters.iter().find(|c| (c.density - max_density).abs() < 1e-12)
}

/// Shannon entropy (log base 2) over cluster density probabilities.
pub fn entropy(clusters: &[InputCluster]) -> f64 {
    let total: f64 = clusters.iter().map(|c| c.density).sum();
    if total <= 0.0 {
        return 0.0;
    }
    -clusters
        .iter()
        .map(|c| c.density / total)
        .filter(|&p| p > 0.0)
        .map(|p| p * p.log2())
        .sum::<f64>()
}

/// True when the two densest clusters each carry more than 30% of the total
/// weight (GLOSSARY: "crowd disagreement rather than noise").
pub fn is_bimodal(clusters: &[InputCluster]) -> bool {
    if clusters.len() < 2 {
        return false;
    }
    let total: f64 = clusters.iter().map(|c| c.density).sum();
    if total <= 0.0 {
        return false;
    }
    let mut shares: Vec<f64> = clusters.iter().map(|c| c.density / total).collect();
    shares.sort_by(|a, b| b.partial_cmp(a).unwrap());
    shares[0] > BIMODAL_SHARE_THRESHOLD && shares[1] > BIMODAL_SHARE_THRESHOLD
}
