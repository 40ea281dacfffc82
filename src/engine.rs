//! Matcher engines and the registry the compound evaluator dispatches through.
//!
//! An engine answers one question: does this clause's pattern match the local agent? The
//! compound evaluator doesn't know how any engine works. It only knows the [EngineId] a clause
//! asked for and looks that up in an [EngineRegistry] supplied by the caller.
//!
//! [EngineRegistry::standard] provides the engines that ship with this crate. Callers that need
//! different behavior (e.g. grain lookups backed by a remote cache) can build their own registry
//! with [EngineRegistry::new] and [EngineRegistry::register].

pub mod data;
pub mod glob;
pub mod ipcidr;
pub mod list;
pub mod pcre;
#[cfg(feature = "range")]
pub mod range;

use crate::context::MatchContext;
use indexmap::IndexMap;
use std::fmt::{self, Display};

/// The delimiter used for key paths in grain and pillar clauses when none is given.
pub const DEFAULT_TARGET_DELIM: char = ':';

/// Identifies a matching capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EngineId {
    /// Shell-style glob on the identity. Used for clauses without an engine prefix.
    Glob,
    /// `E@`: regular expression on the identity, anchored at the start.
    Pcre,
    /// `L@`: comma-separated list of identities.
    List,
    /// `G@`: glob match against a grain.
    Grain,
    /// `P@`: regex match against a grain.
    GrainPcre,
    /// `I@`: glob match against a pillar value.
    Pillar,
    /// `J@`: regex match against a pillar value.
    PillarPcre,
    /// `S@`: IP address or CIDR block.
    IpCidr,
    /// `N@`: nodegroup reference. Never dispatched; nodegroups are expanded in place.
    Nodegroup,
    /// `R@`: cluster range expression.
    Range,
}

impl EngineId {
    /// Maps a clause prefix letter to its engine.
    pub fn from_prefix(prefix: char) -> Option<Self> {
        use EngineId::*;
        Some(match prefix {
            'G' => Grain,
            'P' => GrainPcre,
            'I' => Pillar,
            'J' => PillarPcre,
            'L' => List,
            'N' => Nodegroup,
            'S' => IpCidr,
            'E' => Pcre,
            'R' => Range,
            _ => return None,
        })
    }

    /// The clause prefix letter for this engine, or [None] for [EngineId::Glob], which has no
    /// prefix.
    pub fn prefix(self) -> Option<char> {
        use EngineId::*;
        Some(match self {
            Glob => return None,
            Grain => 'G',
            GrainPcre => 'P',
            Pillar => 'I',
            PillarPcre => 'J',
            List => 'L',
            Nodegroup => 'N',
            IpCidr => 'S',
            Pcre => 'E',
            Range => 'R',
        })
    }

    /// Whether clauses for this engine may carry a custom key-path delimiter, as in `G:|@os|x`.
    pub fn accepts_delimiter(self) -> bool {
        matches!(
            self,
            EngineId::Grain | EngineId::GrainPcre | EngineId::Pillar | EngineId::PillarPcre
        )
    }

    /// The engine's conventional name, used in diagnostics.
    pub fn name(self) -> &'static str {
        use EngineId::*;
        match self {
            Glob => "glob",
            Pcre => "pcre",
            List => "list",
            Grain => "grain",
            GrainPcre => "grain_pcre",
            Pillar => "pillar",
            PillarPcre => "pillar_pcre",
            IpCidr => "ipcidr",
            Nodegroup => "nodegroup",
            Range => "range",
        }
    }
}

impl Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix() {
            Some(prefix) => write!(f, "{} ({prefix}@)", self.name()),
            None => f.write_str(self.name()),
        }
    }
}

/// A matching capability that can be registered in an [EngineRegistry].
///
/// Any closure or function with the signature of [Matcher::matches] implements this trait.
///
/// Returning an error is the correct way to report that the engine could not reach a verdict,
/// e.g. because `pattern` is not a valid regular expression. The compound evaluator converts
/// errors into a failed (non-matching) evaluation.
pub trait Matcher: Send + Sync {
    /// Returns whether `pattern` matches the agent described by `ctx`.
    ///
    /// `delimiter` is only ever [Some] for engines where [EngineId::accepts_delimiter] is true,
    /// and only when the clause specified one.
    fn matches(
        &self,
        pattern: &str,
        ctx: &MatchContext,
        delimiter: Option<char>,
    ) -> anyhow::Result<bool>;
}

impl<F> Matcher for F
where
    F: Fn(&str, &MatchContext, Option<char>) -> anyhow::Result<bool> + Send + Sync,
{
    fn matches(
        &self,
        pattern: &str,
        ctx: &MatchContext,
        delimiter: Option<char>,
    ) -> anyhow::Result<bool> {
        self(pattern, ctx, delimiter)
    }
}

/// A capability-keyed table of matcher engines.
#[derive(Default)]
pub struct EngineRegistry {
    engines: IndexMap<EngineId, Box<dyn Matcher>>,
}

impl EngineRegistry {
    /// Creates an empty registry. Every dispatched clause will fail until engines are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry containing every engine that ships with this crate.
    ///
    /// [EngineId::Range] is only present when the `range` feature is enabled.
    /// [EngineId::Nodegroup] is never present, since nodegroups are expanded rather than
    /// dispatched.
    pub fn standard() -> Self {
        let registry = Self::new()
            .with(EngineId::Glob, glob::glob_match)
            .with(EngineId::Pcre, pcre::pcre_match)
            .with(EngineId::List, list::list_match)
            .with(EngineId::Grain, data::grain_match)
            .with(EngineId::GrainPcre, data::grain_pcre_match)
            .with(EngineId::Pillar, data::pillar_match)
            .with(EngineId::PillarPcre, data::pillar_pcre_match)
            .with(EngineId::IpCidr, ipcidr::ipcidr_match);

        #[cfg(feature = "range")]
        let registry = registry.with(EngineId::Range, range::range_match);

        registry
    }

    /// Switches `I@` and `J@` to exact pillar matching: the pillar value must equal the pattern,
    /// ignoring case, with no glob or regex interpretation.
    pub fn with_exact_pillar(self) -> Self {
        self.with(EngineId::Pillar, data::pillar_exact_match)
            .with(EngineId::PillarPcre, data::pillar_exact_match)
    }

    /// Registers `matcher` for `engine`, replacing any matcher already registered for it.
    pub fn register(&mut self, engine: EngineId, matcher: impl Matcher + 'static) {
        let _ = self.engines.insert(engine, Box::new(matcher));
    }

    /// Builder-style version of [Self::register].
    pub fn with(mut self, engine: EngineId, matcher: impl Matcher + 'static) -> Self {
        self.register(engine, matcher);
        self
    }

    /// Removes the matcher for `engine`, if any, and returns whether one was registered.
    pub fn unregister(&mut self, engine: EngineId) -> bool {
        self.engines.shift_remove(&engine).is_some()
    }

    /// Returns the matcher registered for `engine`.
    pub fn get(&self, engine: EngineId) -> Option<&dyn Matcher> {
        self.engines.get(&engine).map(Box::as_ref)
    }

    /// Returns whether a matcher is registered for `engine`.
    pub fn contains(&self, engine: EngineId) -> bool {
        self.engines.contains_key(&engine)
    }

    /// Lists registered engines in registration order.
    pub fn engines(&self) -> impl Iterator<Item = EngineId> + '_ {
        self.engines.keys().copied()
    }
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.engines.keys()).finish()
    }
}
