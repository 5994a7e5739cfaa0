//! Run stage definitions for the harvest pipeline
//!
//! A run walks the stages strictly in order. Nothing is retained between runs
//! except what the persistence sink holds.

use std::fmt;

/// Represents the current stage of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStage {
    /// Retrieving the listing page and extracting candidates
    FetchListing,

    /// Dropping candidates already present in the store
    FilterDedup,

    /// Fetching detail pages concurrently
    FetchDetails,

    /// Combining listing and detail metadata
    Merge,

    /// Writing merged records to the store
    Persist,

    /// Run finished; summary is final
    Done,
}

impl RunStage {
    /// The stage that follows this one, or None once the run is done
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::FetchListing => Some(Self::FilterDedup),
            Self::FilterDedup => Some(Self::FetchDetails),
            Self::FetchDetails => Some(Self::Merge),
            Self::Merge => Some(Self::Persist),
            Self::Persist => Some(Self::Done),
            Self::Done => None,
        }
    }

    /// Returns true if moving from this stage to `to` is allowed
    ///
    /// Only single forward steps are allowed, except that an empty listing or
    /// an empty filtered cohort may jump straight to `Done`.
    pub fn can_transition_to(&self, to: RunStage) -> bool {
        if self.next() == Some(to) {
            return true;
        }
        matches!(
            (self, to),
            (Self::FetchListing, Self::Done) | (Self::FilterDedup, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchListing => "fetch_listing",
            Self::FilterDedup => "filter_dedup",
            Self::FetchDetails => "fetch_details",
            Self::Merge => "merge",
            Self::Persist => "persist",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_advance_in_order() {
        let mut stage = RunStage::FetchListing;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(stage.can_transition_to(next));
            stage = next;
            seen.push(stage);
        }

        assert_eq!(
            seen,
            vec![
                RunStage::FetchListing,
                RunStage::FilterDedup,
                RunStage::FetchDetails,
                RunStage::Merge,
                RunStage::Persist,
                RunStage::Done,
            ]
        );
    }

    #[test]
    fn test_short_circuit_to_done() {
        assert!(RunStage::FetchListing.can_transition_to(RunStage::Done));
        assert!(RunStage::FilterDedup.can_transition_to(RunStage::Done));

        assert!(!RunStage::FetchDetails.can_transition_to(RunStage::Done));
        assert!(!RunStage::Merge.can_transition_to(RunStage::Done));
    }

    #[test]
    fn test_no_backward_or_skipping_moves() {
        assert!(!RunStage::Persist.can_transition_to(RunStage::FetchDetails));
        assert!(!RunStage::FetchListing.can_transition_to(RunStage::Persist));
        assert!(!RunStage::Done.can_transition_to(RunStage::FetchListing));
    }

    #[test]
    fn test_display() {
        assert_eq!(RunStage::FetchDetails.to_string(), "fetch_details");
        assert_eq!(RunStage::Done.to_string(), "done");
    }
}
