//! Read-only state slices shared with the UI side
//!
//! Only the session loop writes; everything else takes snapshots.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use vmeet_core::pagination::paginate;
use vmeet_core::{FollowMeState, LedgerEntry, PageInfo, PaginationSettings, Roster, SpeakerStatsReport};

/// What the local user currently sees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutState {
    pub filmstrip_visible: bool,
    pub tile_view_enabled: bool,
    pub shared_document_visible: bool,
    pub pagination: PaginationSettings,
    pub page: PageInfo,
}

impl Default for LayoutState {
    fn default() -> Self {
        Self {
            filmstrip_visible: true,
            tile_view_enabled: false,
            shared_document_visible: false,
            pagination: PaginationSettings::default(),
            page: PageInfo::default(),
        }
    }
}

impl LayoutState {
    /// Recompute the page layout for the current roster order
    pub fn repaginate(&mut self, roster: &Roster) {
        self.page = paginate(roster.participants(), &self.pagination);
        self.pagination.current = self.page.current;
        self.pagination.total_pages = self.page.total_pages;
    }
}

/// Local toggles that are not part of the mirrored layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalSettings {
    pub follow_me_enabled: bool,
    pub recording: bool,
}

/// Handles to the conference state published by the session loop
#[derive(Debug, Clone, Default)]
pub struct ConferenceState {
    pub roster: Arc<RwLock<Roster>>,
    pub layout: Arc<RwLock<LayoutState>>,
    pub follow_me: Arc<RwLock<FollowMeState>>,
    pub settings: Arc<RwLock<LocalSettings>>,
    /// Merged speaker ledger, replaced wholesale on every change
    pub speaker_stats: Arc<RwLock<Vec<LedgerEntry>>>,
}

impl ConferenceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn roster(&self) -> Roster {
        self.roster.read().await.clone()
    }

    pub async fn layout(&self) -> LayoutState {
        self.layout.read().await.clone()
    }

    pub async fn follow_me(&self) -> FollowMeState {
        self.follow_me.read().await.clone()
    }

    pub async fn settings(&self) -> LocalSettings {
        *self.settings.read().await
    }

    /// Speaker stats as of now, with live mute state from the roster
    pub async fn speaker_stats_report(&self) -> SpeakerStatsReport {
        let entries = self.speaker_stats.read().await;
        let roster = self.roster.read().await;
        SpeakerStatsReport::build(&entries, &roster, Utc::now())
    }
}
