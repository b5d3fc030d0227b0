//! View construction.

use crate::replica::ReplicaInfo;

/// Build the rotation views for one snapshot.
///
/// With `k > 0` readers the result has `k` views; view `i` is a full copy of
/// `entities` in which only the `i`-th reader (in entity order, counted among
/// readers) is active. With no readers the result is a single all-inactive
/// copy, which clients must treat as a valid "no active replica" state.
pub fn build_views(entities: &[ReplicaInfo]) -> Vec<Vec<ReplicaInfo>> {
    let reader_positions: Vec<usize> = entities
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_reader())
        .map(|(idx, _)| idx)
        .collect();

    let base: Vec<ReplicaInfo> = entities
        .iter()
        .cloned()
        .map(|mut e| {
            e.active = false;
            e
        })
        .collect();

    if reader_positions.is_empty() {
        return vec![base];
    }

    reader_positions
        .iter()
        .map(|&pos| {
            let mut view = base.clone();
            view[pos].active = true;
            view
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replica::{ReplicaRole, ReplicaRow};

    fn entity(host: &str, role: ReplicaRole) -> ReplicaInfo {
        let mut info = ReplicaInfo::from_row(&ReplicaRow {
            host: host.into(),
            database: "db1".into(),
            cube_name: "cubeA".into(),
            role_tag: String::new(),
            last_schema_change: String::new(),
        });
        info.role = role;
        info
    }

    #[test]
    fn one_view_per_reader_each_with_one_active_reader() {
        let entities = vec![
            entity("h1", ReplicaRole::Reader),
            entity("h2", ReplicaRole::Writer),
            entity("h3", ReplicaRole::Reader),
        ];
        let views = build_views(&entities);
        assert_eq!(views.len(), 2);

        for view in &views {
            assert_eq!(view.len(), 3);
            let actives: Vec<&ReplicaInfo> = view.iter().filter(|e| e.active).collect();
            assert_eq!(actives.len(), 1);
            assert!(actives[0].is_reader());
        }
        assert!(views[0][0].active && !views[0][2].active);
        assert!(views[1][2].active && !views[1][0].active);
    }

    #[test]
    fn single_reader_scenario() {
        let entities = vec![
            entity("h1", ReplicaRole::Reader),
            entity("h2", ReplicaRole::Writer),
        ];
        let views = build_views(&entities);
        assert_eq!(views.len(), 1);
        assert!(views[0][0].active);
        assert!(!views[0][1].active);
    }

    #[test]
    fn no_readers_yields_single_inactive_view() {
        let entities = vec![
            entity("h1", ReplicaRole::Writer),
            entity("h2", ReplicaRole::Writer),
        ];
        let views = build_views(&entities);
        assert_eq!(views.len(), 1);
        assert!(views[0].iter().all(|e| !e.active));
    }

    #[test]
    fn empty_snapshot_yields_single_empty_view() {
        let views = build_views(&[]);
        assert_eq!(views.len(), 1);
        assert!(views[0].is_empty());
    }

    #[test]
    fn views_are_independent_copies() {
        let entities = vec![
            entity("h1", ReplicaRole::Reader),
            entity("h2", ReplicaRole::Reader),
        ];
        let mut views = build_views(&entities);
        views[0][1].active = true;
        assert!(!views[1][1].active, "mutation leaked across views");
        assert!(!entities[0].active, "mutation leaked into the source list");
    }
}
