//! Receiving types for reference gene sets and pathway metadata
//!
//! The crate performs no I/O: the host application fetches Key Event (KE)
//! gene mappings and pathway descriptions from its own store and hands them
//! over as [`ReferenceSets`] and [`AopMetadata`]. Gene ids are canonicalized
//! on insertion so they join cleanly against the processed expression data;
//! KE ids are kept as the provider spelled them (trimmed only) because both
//! sides of that join come from the same provider.
//!
//! [`ReferenceCache`] keeps one loaded [`ReferenceSets`] behind a
//! [`RwLock`] with a time-to-live, so concurrent analyses share a single
//! fetch instead of hitting the provider on every request.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fmt::Display;
use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;
use std::time::Instant;

use tracing::debug;
use tracing::info;

use crate::expression::normalize::canonical_id;
use crate::DEFAULT_CACHE_TTL;

/// The reference gene sets of one or more Key Events
///
/// Keys iterate in lexicographic order, which keeps every downstream
/// computation deterministic.
///
/// # Examples
///
/// ```
/// use aopstat::ReferenceSets;
///
/// let mut sets = ReferenceSets::new();
/// sets.insert("KE:1", [" tp53 ", "Brca1"]);
/// sets.insert("KE:1", ["EGFR"]);
///
/// let genes = sets.get("KE:1").unwrap();
/// assert_eq!(genes.len(), 3);
/// assert!(genes.contains("TP53"));
/// assert!(genes.contains("EGFR"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSets {
    sets: BTreeMap<String, HashSet<String>>,
}

impl ReferenceSets {
    /// Creates an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds gene ids to a Key Event's reference set
    ///
    /// Gene ids are canonicalized the same way expression identifiers are
    /// (trimmed, uppercased); blank ids are skipped. Repeated inserts for
    /// the same Key Event merge into one set.
    pub fn insert<I, G>(&mut self, ke_id: &str, genes: I)
    where
        I: IntoIterator<Item = G>,
        G: AsRef<str>,
    {
        let set = self.sets.entry(ke_id.trim().to_string()).or_default();
        set.extend(
            genes
                .into_iter()
                .filter_map(|gene| canonical_id(gene.as_ref())),
        );
    }

    /// Looks up the gene set of a Key Event
    pub fn get(&self, ke_id: &str) -> Option<&HashSet<String>> {
        self.sets.get(ke_id.trim())
    }

    /// Number of Key Events with a reference set
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Returns `true` if no Key Event has a reference set
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Iterates `(Key Event id, gene set)` pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HashSet<String>)> {
        self.sets.iter().map(|(ke_id, genes)| (ke_id.as_str(), genes))
    }

    /// Iterates the Key Event ids in order
    pub fn ke_ids(&self) -> impl Iterator<Item = &str> {
        self.sets.keys().map(String::as_str)
    }
}

/// Position of a Key Event within its pathway
///
/// Display metadata only; the statistics never consume it.
///
/// # Examples
///
/// ```
/// use aopstat::KeKind;
///
/// assert_eq!(KeKind::from_code("MIE"), KeKind::MolecularInitiating);
/// assert_eq!(KeKind::from_code("ao"), KeKind::AdverseOutcome);
/// assert_eq!(KeKind::from_code("KeyEvent"), KeKind::Intermediate);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeKind {
    /// A molecular initiating event, the entry point of the pathway
    MolecularInitiating,
    /// An intermediate Key Event
    Intermediate,
    /// An adverse outcome, the endpoint of the pathway
    AdverseOutcome,
}

impl KeKind {
    /// Parses the provider vocabulary, falling back to [`Self::Intermediate`]
    ///
    /// Recognizes `"MIE"` and `"AO"` case-insensitively; every other code
    /// (including `"KE"` and free-text labels) is an intermediate event.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "MIE" => Self::MolecularInitiating,
            "AO" => Self::AdverseOutcome,
            _ => Self::Intermediate,
        }
    }
}

impl Display for KeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::MolecularInitiating => "MIE",
            Self::Intermediate => "intermediate",
            Self::AdverseOutcome => "AO",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct KeEntry {
    title: String,
    kind: KeKind,
}

/// Display metadata of one Adverse Outcome Pathway
///
/// Names the pathway and the Key Events it consists of, with a title and a
/// [`KeKind`] per event. The enrichment engine tests exactly the Key Events
/// listed here, in id order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AopMetadata {
    aop: String,
    entries: BTreeMap<String, KeEntry>,
}

impl AopMetadata {
    /// Creates metadata for one pathway
    pub fn new<A: Into<String>>(aop: A) -> Self {
        Self {
            aop: aop.into(),
            entries: BTreeMap::new(),
        }
    }

    /// The pathway identifier
    pub fn aop(&self) -> &str {
        &self.aop
    }

    /// Registers a Key Event with its title and kind
    ///
    /// Inserting the same id again overwrites title and kind. A blank (or
    /// all-whitespace) title marks the event untitled; enrichment results
    /// then label it with the Key Event id instead.
    pub fn insert(&mut self, ke_id: &str, title: &str, kind: KeKind) {
        self.entries.insert(
            ke_id.trim().to_string(),
            KeEntry {
                title: title.trim().to_string(),
                kind,
            },
        );
    }

    /// Number of Key Events in the pathway
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the pathway has no Key Events
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if the Key Event belongs to this pathway
    pub fn contains(&self, ke_id: &str) -> bool {
        self.entries.contains_key(ke_id.trim())
    }

    /// Iterates the Key Event ids in order
    pub fn ke_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// The title of a Key Event, if registered
    pub fn title_of(&self, ke_id: &str) -> Option<&str> {
        self.entries.get(ke_id.trim()).map(|entry| entry.title.as_str())
    }

    /// The kind of a Key Event, if registered
    pub fn kind_of(&self, ke_id: &str) -> Option<KeKind> {
        self.entries.get(ke_id.trim()).map(|entry| entry.kind)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    sets: Arc<ReferenceSets>,
    loaded_at: Instant,
}

/// A time-to-live cache for one loaded [`ReferenceSets`]
///
/// Reads take a shared lock; a (re)load takes the exclusive lock and runs
/// the loader while holding it, so concurrent callers wait for one fetch
/// instead of each fetching on their own. A zero time-to-live disables
/// expiry entirely.
///
/// # Examples
///
/// ```
/// use std::convert::Infallible;
///
/// use aopstat::{ReferenceCache, ReferenceSets};
///
/// let cache = ReferenceCache::default();
/// let sets = cache
///     .get_or_load(|| {
///         let mut sets = ReferenceSets::new();
///         sets.insert("KE:1", ["TP53"]);
///         Ok::<_, Infallible>(sets)
///     })
///     .unwrap();
///
/// assert_eq!(sets.len(), 1);
/// assert!(cache.loaded());
/// ```
#[derive(Debug)]
pub struct ReferenceCache {
    slot: RwLock<Option<CacheEntry>>,
    ttl: Duration,
}

impl Default for ReferenceCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl ReferenceCache {
    /// Creates an empty cache with the given time-to-live
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
        }
    }

    /// The configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        self.ttl.is_zero() || entry.loaded_at.elapsed() <= self.ttl
    }

    /// Returns the cached sets if present and not expired
    pub fn get(&self) -> Option<Arc<ReferenceSets>> {
        let slot = self.slot.read().expect("reference cache lock poisoned");
        slot.as_ref()
            .filter(|entry| self.is_fresh(entry))
            .map(|entry| Arc::clone(&entry.sets))
    }

    /// Returns the cached sets, loading them if absent or expired
    ///
    /// # Errors
    ///
    /// Passes the loader's error through; nothing is cached in that case.
    pub fn get_or_load<E, F>(&self, load: F) -> Result<Arc<ReferenceSets>, E>
    where
        F: FnOnce() -> Result<ReferenceSets, E>,
    {
        if let Some(sets) = self.get() {
            return Ok(sets);
        }
        let mut slot = self.slot.write().expect("reference cache lock poisoned");
        // another caller may have loaded while we waited for the write lock
        if let Some(entry) = slot.as_ref() {
            if self.is_fresh(entry) {
                return Ok(Arc::clone(&entry.sets));
            }
        }
        let sets = Arc::new(load()?);
        info!("cached {} reference gene sets", sets.len());
        *slot = Some(CacheEntry {
            sets: Arc::clone(&sets),
            loaded_at: Instant::now(),
        });
        Ok(sets)
    }

    /// Stores freshly loaded sets unconditionally
    pub fn replace(&self, sets: ReferenceSets) -> Arc<ReferenceSets> {
        let sets = Arc::new(sets);
        let mut slot = self.slot.write().expect("reference cache lock poisoned");
        *slot = Some(CacheEntry {
            sets: Arc::clone(&sets),
            loaded_at: Instant::now(),
        });
        sets
    }

    /// Drops the cached entry, if any
    pub fn clear(&self) {
        let mut slot = self.slot.write().expect("reference cache lock poisoned");
        *slot = None;
        debug!("reference cache cleared");
    }

    /// Returns `true` if an entry is present, fresh or not
    pub fn loaded(&self) -> bool {
        self.slot
            .read()
            .expect("reference cache lock poisoned")
            .is_some()
    }

    /// Time since the cached entry was loaded
    pub fn age(&self) -> Option<Duration> {
        let slot = self.slot.read().expect("reference cache lock poisoned");
        slot.as_ref().map(|entry| entry.loaded_at.elapsed())
    }
}
