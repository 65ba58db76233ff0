//! Picks the best definition of a resource for a device configuration

use std::cmp::Ordering;

use apk_res_table::{ConfigEntry, ResTableConfig};

use crate::asset_manager::Cookie;

/// Precedence of a source among the registered sources, higher wins ties
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceRank {
    /// `false` for sources marked lower priority
    pub preferred: bool,
    /// Position in the source list
    pub position: usize,
}

/// One configuration-specific definition of a resource in one source
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub cookie: Cookie,
    pub rank: SourceRank,
    pub entry: &'a ConfigEntry,
}

/// Configuration to match against, with the density replaced when overridden
pub fn effective_config(requested: &ResTableConfig, density: Option<u16>) -> ResTableConfig {
    match density {
        Some(density) if density != 0 => ResTableConfig {
            density,
            ..*requested
        },
        _ => *requested,
    }
}

/// Total order of two compatible candidates, `Greater` meaning `a` is preferred
pub(crate) fn compare(a: &Candidate<'_>, b: &Candidate<'_>, requested: &ResTableConfig) -> Ordering {
    let (ac, bc) = (&a.entry.config, &b.entry.config);
    if ac.is_better_than(bc, requested) {
        return Ordering::Greater;
    }
    if bc.is_better_than(ac, requested) {
        return Ordering::Less;
    }

    a.rank
        .cmp(&b.rank)
        .then_with(|| ac.cmp(bc))
        .then_with(|| a.cookie.cmp(&b.cookie))
}

/// Index of the best candidate for `requested`, `None` if no candidate is compatible
///
/// The result does not depend on the order of `candidates`.
pub fn select_best_value(
    candidates: &[Candidate<'_>],
    requested: &ResTableConfig,
    density: Option<u16>,
) -> Option<usize> {
    let requested = effective_config(requested, density);

    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.entry.config.matches(&requested))
        .max_by(|(_, a), (_, b)| compare(a, b, &requested))
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apk_res_table::{EntryData, EntryFlags, Value};
    use proptest::prelude::*;

    fn entry(config: &str, data: i32) -> ConfigEntry {
        ConfigEntry {
            config: config.parse().unwrap(),
            flags: EntryFlags::empty(),
            data: EntryData::Value(Value::int(data)),
        }
    }

    fn candidate(entry: &ConfigEntry, position: usize) -> Candidate<'_> {
        Candidate {
            cookie: Cookie(position as u32),
            rank: SourceRank {
                preferred: true,
                position,
            },
            entry,
        }
    }

    fn selected_data(candidates: &[Candidate<'_>], requested: &str, density: Option<u16>) -> Option<u32> {
        let requested = requested.parse().unwrap();
        select_best_value(candidates, &requested, density).map(|idx| match &candidates[idx].entry.data {
            EntryData::Value(v) => v.data,
            EntryData::Bag(_) => unreachable!(),
        })
    }

    #[test]
    fn nothing_compatible() {
        let entries = [entry("fr", 1), entry("de", 2)];
        let candidates: Vec<_> = entries.iter().map(|e| candidate(e, 0)).collect();
        assert_eq!(selected_data(&candidates, "en", None), None);
        assert_eq!(selected_data(&[], "en", None), None);
    }

    #[test]
    fn nearest_density() {
        let entries = [entry("ldpi", 120), entry("hdpi", 240)];
        let candidates: Vec<_> = entries.iter().map(|e| candidate(e, 0)).collect();

        assert_eq!(selected_data(&candidates, "", Some(180)), Some(240));
        assert_eq!(selected_data(&candidates, "", Some(130)), Some(120));
        assert_eq!(selected_data(&candidates, "", Some(230)), Some(240));
    }

    #[test]
    fn density_override_replaces_requested() {
        let entries = [entry("ldpi", 120), entry("xxhdpi", 480)];
        let candidates: Vec<_> = entries.iter().map(|e| candidate(e, 0)).collect();
        assert_eq!(selected_data(&candidates, "ldpi", None), Some(120));
        assert_eq!(selected_data(&candidates, "ldpi", Some(480)), Some(480));
    }

    #[test]
    fn later_source_wins_ties() {
        let first = entry("", 1);
        let second = entry("", 2);
        let mut candidates = vec![candidate(&first, 0), candidate(&second, 1)];
        assert_eq!(selected_data(&candidates, "", None), Some(2));

        candidates[1].rank.preferred = false;
        assert_eq!(selected_data(&candidates, "", None), Some(1));
    }

    #[test]
    fn more_specific_beats_later_source() {
        let specific = entry("fr", 1);
        let general = entry("", 2);
        let candidates = [candidate(&specific, 0), candidate(&general, 1)];
        assert_eq!(selected_data(&candidates, "fr-rFR", None), Some(1));
    }

    const CONFIGS: [&str; 10] = [
        "", "fr", "fr-rCA", "land", "hdpi", "xhdpi", "v21", "fr-land", "night", "sw600dp",
    ];

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn selection_is_permutation_invariant(
            picks in proptest::sample::subsequence((0..CONFIGS.len()).collect::<Vec<_>>(), 1..CONFIGS.len()),
            sources in proptest::collection::vec(0usize..3, CONFIGS.len()),
            shuffle_seed in any::<u64>(),
            requested in proptest::sample::select(vec!["fr-rCA-land-xhdpi-v28", "en-port-mdpi", "fr-night-sw720dp", ""]),
        ) {
            let entries: Vec<_> = picks.iter().map(|&i| entry(CONFIGS[i], i as i32)).collect();
            let candidates: Vec<_> = entries
                .iter()
                .zip(&picks)
                .map(|(e, &i)| candidate(e, sources[i]))
                .collect();

            let mut shuffled = candidates.clone();
            // deterministic Fisher-Yates driven by the seed
            let mut state = shuffle_seed;
            for i in (1..shuffled.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let j = (state >> 33) as usize % (i + 1);
                shuffled.swap(i, j);
            }

            prop_assert_eq!(
                selected_data(&candidates, requested, None),
                selected_data(&shuffled, requested, None)
            );
        }
    }
}
