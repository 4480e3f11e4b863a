use std::collections::HashSet;

use crate::models::Station;

/// Indices into `stations` of the stations currently holding a tray, in
/// original order. Recomputed from the full list on every snapshot; an index
/// into the result is only meaningful against the list it was computed from.
pub(crate) fn active_indices(stations: &[Station]) -> Vec<usize> {
    stations
        .iter()
        .enumerate()
        .filter(|(_, station)| station.has_tray())
        .map(|(idx, _)| idx)
        .collect()
}

/// Coerce a possibly stale index into `[0, len)`. An index left over from a
/// larger collection falls back to 0 rather than erroring.
pub(crate) fn coerce(index: usize, len: usize) -> usize {
    if index < len { index } else { 0 }
}

/// Position, in the new active subsequence, of the first station that was not
/// active with the same tray in the previous station list. This is the signal
/// that a tray was physically inserted (or swapped) and should preempt the
/// rotation. Returns the first match so simultaneous insertions tie-break
/// deterministically.
pub(crate) fn first_new_active(previous: &[Station], next: &[Station]) -> Option<usize> {
    let previous_pairs: HashSet<(&str, &str)> = previous
        .iter()
        .filter_map(|station| {
            station
                .tray_id
                .as_deref()
                .map(|tray| (station.id.as_str(), tray))
        })
        .collect();

    next.iter()
        .filter_map(|station| {
            station
                .tray_id
                .as_deref()
                .map(|tray| (station.id.as_str(), tray))
        })
        .position(|pair| !previous_pairs.contains(&pair))
}

#[cfg(test)]
mod test {
    use super::*;

    fn station(id: &str, tray: Option<&str>) -> Station {
        Station {
            id: id.into(),
            label: format!("STATION {id}"),
            tray_id: tray.map(Into::into),
            parts: Vec::new(),
        }
    }

    #[test]
    fn test_active_indices_preserve_order() {
        let stations = vec![
            station("1", None),
            station("2", Some("T2")),
            station("3", None),
            station("4", Some("T4")),
        ];
        assert_eq!(active_indices(&stations), vec![1, 3]);
        assert!(active_indices(&[station("1", None)]).is_empty());
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce(0, 3), 0);
        assert_eq!(coerce(2, 3), 2);
        // Stale index from a collection that has since shrunk
        assert_eq!(coerce(3, 3), 0);
        assert_eq!(coerce(7, 2), 0);
        assert_eq!(coerce(0, 0), 0);
    }

    #[test]
    fn test_no_new_active_when_unchanged() {
        let previous = vec![station("1", Some("T1")), station("2", None)];
        let next = previous.clone();
        assert_eq!(first_new_active(&previous, &next), None);
    }

    #[test]
    fn test_inserted_tray_is_detected() {
        let previous = vec![station("1", Some("T1")), station("2", None)];
        let next = vec![station("1", Some("T1")), station("2", Some("T2"))];
        // Station 2 is the second entry of the active subsequence
        assert_eq!(first_new_active(&previous, &next), Some(1));
    }

    #[test]
    fn test_swapped_tray_is_detected() {
        let previous = vec![station("1", Some("T1"))];
        let next = vec![station("1", Some("T9"))];
        assert_eq!(first_new_active(&previous, &next), Some(0));
    }

    #[test]
    fn test_removed_tray_is_not_new() {
        let previous = vec![station("1", Some("T1")), station("2", Some("T2"))];
        let next = vec![station("1", Some("T1")), station("2", None)];
        assert_eq!(first_new_active(&previous, &next), None);
    }

    #[test]
    fn test_simultaneous_insertions_pick_first() {
        let previous = vec![station("1", None), station("2", None), station("3", None)];
        let next = vec![
            station("1", None),
            station("2", Some("T2")),
            station("3", Some("T3")),
        ];
        assert_eq!(first_new_active(&previous, &next), Some(0));
    }
}
