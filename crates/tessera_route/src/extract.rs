//! Turns a flow's unordered set of selected links into an ordered route.

use std::collections::HashSet;
use tessera_common::{InternalError, TesseraResult};
use tessera_noc::{LinkId, NocTopology, RouterId};

/// Orders `selected` into a chain from `source` to `sink`.
///
/// The chain starts at the one link whose source router is not the sink of
/// any other selected link and follows sink-to-source adjacency from there.
/// Anything other than a single simple path from `source` to `sink` means the
/// constraint model admitted a malformed route and is reported as an
/// [`InternalError`].
pub fn order_route(
    topology: &NocTopology,
    flow: &str,
    source: RouterId,
    sink: RouterId,
    selected: &[LinkId],
) -> TesseraResult<Vec<LinkId>> {
    if selected.is_empty() {
        if source == sink {
            return Ok(Vec::new());
        }
        return Err(InternalError::new(format!(
            "flow `{flow}` has no links selected between distinct routers"
        )));
    }

    let sinks: HashSet<RouterId> = selected.iter().map(|&l| topology.link(l).sink).collect();
    let mut heads = selected
        .iter()
        .copied()
        .filter(|&l| !sinks.contains(&topology.link(l).source));
    let (Some(head), None) = (heads.next(), heads.next()) else {
        return Err(InternalError::new(format!(
            "flow `{flow}` selected links do not have a unique first link"
        )));
    };

    let mut route = Vec::with_capacity(selected.len());
    let mut visited = HashSet::from([topology.link(head).source]);
    let mut current = head;
    loop {
        let at = topology.link(current).sink;
        if !visited.insert(at) {
            return Err(InternalError::new(format!(
                "flow `{flow}` route visits router {at} twice"
            )));
        }
        route.push(current);
        if route.len() == selected.len() {
            break;
        }
        let mut next = selected
            .iter()
            .copied()
            .filter(|&l| topology.link(l).source == at);
        current = match (next.next(), next.next()) {
            (Some(l), None) => l,
            _ => {
                return Err(InternalError::new(format!(
                    "flow `{flow}` route does not continue uniquely from router {at}"
                )))
            }
        };
    }

    let first = topology.link(route[0]).source;
    let last = topology.link(route[route.len() - 1]).sink;
    if first != source || last != sink {
        return Err(InternalError::new(format!(
            "flow `{flow}` route runs from router {first} to {last}, expected {source} to {sink}"
        )));
    }
    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_noc::{GridLocation, NocTopologyBuilder};

    /// Routers 0..4 on a line with links in both directions.
    fn line() -> NocTopology {
        let mut b = NocTopologyBuilder::new(1.0, 1.0, 1.0);
        let ids: Vec<RouterId> = (0..4)
            .map(|i| b.add_router(i, GridLocation::new(3 * i as i32, 0)).unwrap())
            .collect();
        for w in ids.windows(2) {
            b.add_link(w[0], w[1]).unwrap();
            b.add_link(w[1], w[0]).unwrap();
        }
        b.finish()
    }

    fn link(t: &NocTopology, a: u32, b: u32) -> LinkId {
        t.find_link(RouterId::from_raw(a), RouterId::from_raw(b)).unwrap()
    }

    #[test]
    fn orders_shuffled_chain() {
        let t = line();
        let chain = [link(&t, 0, 1), link(&t, 1, 2), link(&t, 2, 3)];
        let shuffled = [chain[2], chain[0], chain[1]];
        let route = order_route(&t, "f", RouterId::from_raw(0), RouterId::from_raw(3), &shuffled)
            .unwrap();
        assert_eq!(route, chain);
    }

    #[test]
    fn empty_route_for_local_flow() {
        let t = line();
        let r = RouterId::from_raw(2);
        assert!(order_route(&t, "f", r, r, &[]).unwrap().is_empty());
        assert!(order_route(&t, "f", r, RouterId::from_raw(3), &[]).is_err());
    }

    #[test]
    fn rejects_disjoint_segments() {
        let t = line();
        let selected = [link(&t, 0, 1), link(&t, 2, 3)];
        let err = order_route(&t, "f", RouterId::from_raw(0), RouterId::from_raw(3), &selected)
            .unwrap_err();
        assert!(err.message.contains("unique first link"));
    }

    #[test]
    fn rejects_cycle_attached_to_path() {
        let t = line();
        // 0→1→2→1 returns to router 1.
        let selected = [link(&t, 0, 1), link(&t, 1, 2), link(&t, 2, 1)];
        let err = order_route(&t, "f", RouterId::from_raw(0), RouterId::from_raw(2), &selected)
            .unwrap_err();
        assert!(err.message.contains("twice"));
    }

    #[test]
    fn rejects_wrong_endpoints() {
        let t = line();
        let selected = [link(&t, 1, 2)];
        let err = order_route(&t, "f", RouterId::from_raw(0), RouterId::from_raw(2), &selected)
            .unwrap_err();
        assert!(err.message.contains("expected 0 to 2"));
    }
}
