//! Build phase bitflags.

bitflags::bitflags! {
    /// The phase a [`super::stage::BuildStage`] declares, and the selection
    /// mask a [`super::pipeline::BuildPipeline`] run is given.
    ///
    /// A mask `M` selects a stage `s` iff `s.phase() & M != 0` — the mask is
    /// used as-is, not expanded to "every phase at or below it"; a caller
    /// that wants a cumulative build constructs that mask itself by ORing
    /// together every phase it wants run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Phase: u32 {
        const NONE        = 0;
        const DEPENDENCIES = 1 << 0;
        const DOWNLOADS   = 1 << 1;
        const AUTOGEN     = 1 << 2;
        const CONFIGURE   = 1 << 3;
        const BUILD       = 1 << 4;
        const INSTALL     = 1 << 5;
        const COMMIT      = 1 << 6;
        const EXPORT      = 1 << 7;
        /// Applies to every phase rather than one specific stage.
        const FINAL       = 1 << 8;
    }
}

/// Every declared phase, in strictly increasing order, the order `build`
/// runs stages in (and `clean`/`purge` run in reverse).
pub const ORDERED_PHASES: [Phase; 8] = [
    Phase::DEPENDENCIES,
    Phase::DOWNLOADS,
    Phase::AUTOGEN,
    Phase::CONFIGURE,
    Phase::BUILD,
    Phase::INSTALL,
    Phase::COMMIT,
    Phase::EXPORT,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_selects_only_its_set_bits() {
        let mask = Phase::BUILD | Phase::CONFIGURE | Phase::DOWNLOADS;
        assert!(mask.contains(Phase::CONFIGURE));
        assert!(mask.contains(Phase::DOWNLOADS));
        assert!(mask.contains(Phase::BUILD));
        assert!(!mask.contains(Phase::DEPENDENCIES));
        assert!(!mask.contains(Phase::INSTALL));
    }
}
