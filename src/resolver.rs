//! Songwriter identity resolution.
//!
//! Songwriter credits are free text: the same person shows up as
//! "John Lennon", "Lennon", "J. W. Lennon" or "Lennon John W.". The resolver
//! compares every pair of raw names word by word, merges the ones that refer
//! to the same person into the shortest spelling, flattens merge chains and
//! rewrites every song's credits with the canonical names.
//!
//! Names are scanned in sorted order so the merges discovered, and therefore
//! the canonical names chosen, are reproducible from run to run.

use crate::{Catalog, HarvestError, Result};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Discarded raw name → canonical name it was merged into.
pub type EquivalenceMap = BTreeMap<String, String>;

/// Lowercase, turn `.` and `-` into spaces, collapse runs of spaces and trim.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .replace(['.', '-'], " ")
        .split(' ')
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn name_words(name: &str) -> Vec<String> {
    normalize_name(name)
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether the words of `a` and `b` cancel out until one side is empty.
///
/// Exact matches are cancelled first. Then a word of `a` cancels a word of
/// `b` that equals one of its prefixes ("john" cancels "j"), shortest prefix
/// first.
fn words_absorb(mut a: Vec<String>, mut b: Vec<String>) -> bool {
    while let Some((i, j)) = a
        .iter()
        .enumerate()
        .find_map(|(i, word)| b.iter().position(|other| other == word).map(|j| (i, j)))
    {
        a.remove(i);
        b.remove(j);
    }

    while let Some((i, j)) = a.iter().enumerate().find_map(|(i, word)| {
        word.char_indices()
            .map(|(pos, c)| &word[..pos + c.len_utf8()])
            .find_map(|prefix| b.iter().position(|other| other == prefix))
            .map(|j| (i, j))
    }) {
        a.remove(i);
        b.remove(j);
    }

    a.is_empty() || b.is_empty()
}

/// Whether two raw songwriter names refer to the same person.
///
/// The prefix rule is directional, so both orientations are tried. A name
/// that normalizes to nothing is never equivalent to anything.
///
/// # Examples
///
/// ```rust
/// use lyrics_harvest::resolver::names_equivalent;
///
/// assert!(names_equivalent("John Lennon", "Lennon"));
/// assert!(names_equivalent("J. W. Lennon", "John Lennon"));
/// assert!(names_equivalent("Lennon John W.", "john lennon"));
/// assert!(!names_equivalent("John Lennon", "Paul McCartney"));
/// ```
pub fn names_equivalent(x: &str, y: &str) -> bool {
    let a = name_words(x);
    let b = name_words(y);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    words_absorb(a.clone(), b.clone()) || words_absorb(b, a)
}

/// Order two equivalent names as `(canonical, discarded)`.
///
/// The shorter name (in characters) is canonical; equal lengths fall back to
/// lexicographic order.
fn canonical_order<'a>(x: &'a str, y: &'a str) -> (&'a str, &'a str) {
    let by_length = x.chars().count().cmp(&y.chars().count());
    match by_length.then_with(|| x.cmp(y)) {
        Ordering::Greater => (y, x),
        _ => (x, y),
    }
}

fn find_merge(active: &[String]) -> Option<(String, String)> {
    for (i, x) in active.iter().enumerate() {
        for y in &active[i + 1..] {
            if names_equivalent(x, y) {
                let (keep, discard) = canonical_order(x, y);
                return Some((keep.to_string(), discard.to_string()));
            }
        }
    }
    None
}

/// Merge equivalent names until a full scan finds nothing left to merge.
///
/// Returns the unflattened equivalence map: targets may themselves have been
/// merged away later on. Use [`flatten_equivalences`] before applying it.
pub fn unify_songwriters<I, S>(names: I) -> Result<EquivalenceMap>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut active: Vec<String> = names
        .into_iter()
        .map(Into::into)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let mut equivalences = EquivalenceMap::new();

    let max_passes = active.len() + 1;
    let mut passes = 0;

    loop {
        passes += 1;
        if passes > max_passes {
            return Err(HarvestError::ResolutionNonconvergence(format!(
                "no fixed point after {max_passes} passes over {} names",
                active.len()
            )));
        }

        let Some((keep, discard)) = find_merge(&active) else {
            break;
        };

        log::debug!("Songwriter '{discard}' merged into '{keep}'");
        active.retain(|name| name != &discard);
        equivalences.insert(discard, keep);
    }

    Ok(equivalences)
}

/// Rewrite `X → Y` into `X → map[Y]` until no target is itself a key.
pub fn flatten_equivalences(equivalences: &mut EquivalenceMap) -> Result<()> {
    let max_rewrites = equivalences.len() * equivalences.len() + 1;
    let mut rewrites = 0;

    loop {
        let chained = equivalences.iter().find_map(|(name, target)| {
            equivalences
                .get(target)
                .map(|next| (name.clone(), next.clone()))
        });

        let Some((name, next)) = chained else {
            return Ok(());
        };

        rewrites += 1;
        if rewrites > max_rewrites {
            return Err(HarvestError::ResolutionNonconvergence(format!(
                "equivalence chain through '{name}' does not terminate"
            )));
        }
        equivalences.insert(name, next);
    }
}

/// Map every song's songwriters through `equivalences`.
///
/// Names absent from the map pass through unchanged; names that collapse to
/// the same canonical form are de-duplicated by the set.
pub fn apply_equivalences(catalog: &mut Catalog, equivalences: &EquivalenceMap) {
    for (_, song) in catalog.songs_mut() {
        song.songwriters = std::mem::take(&mut song.songwriters)
            .into_iter()
            .map(|name| equivalences.get(&name).cloned().unwrap_or(name))
            .collect();
    }
}

/// Canonicalize the songwriter credits of every song in the catalog.
///
/// Must run once over the complete song set: canonical choices depend on
/// every raw spelling being present. Returns the flattened map that was
/// applied; running again on the result yields an empty map.
pub fn resolve_songwriters(catalog: &mut Catalog) -> Result<EquivalenceMap> {
    let raw_names: BTreeSet<String> = catalog
        .songs()
        .flat_map(|(_, song)| song.songwriters.iter().cloned())
        .collect();

    let mut equivalences = unify_songwriters(raw_names.iter().cloned())?;
    flatten_equivalences(&mut equivalences)?;

    log::info!(
        "Resolved {} raw songwriter names into {} identities",
        raw_names.len(),
        raw_names.len() - equivalences.len()
    );
    log::debug!("Songwriter equivalences: {equivalences:?}");

    apply_equivalences(catalog, &equivalences);
    Ok(equivalences)
}
