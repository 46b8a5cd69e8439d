//! Participant pagination for the filmstrip and tile view
//!
//! Ordering is a list of sort keys applied in priority order. Page math is
//! kept deliberately small: the pixel-level layout lives in the UI.

use serde::{Deserialize, Serialize};

use crate::models::{Participant, ParticipantId};

/// One ordering criterion for the participant pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// Video-muted participants go after everyone else
    VideoMuted,
    /// Alphabetical by display name within each group
    DisplayName,
    /// Keep the current (possibly moderator-imposed) order
    UserDefined,
}

/// Pagination settings shared by follow-me
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationSettings {
    pub order: Vec<SortKey>,
    pub current: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            order: vec![SortKey::VideoMuted, SortKey::DisplayName],
            current: 1,
            page_size: 9,
            total_pages: 1,
        }
    }
}

/// Computed page layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub data: Vec<ParticipantId>,
    pub current: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl PageInfo {
    /// Ids shown on the current page
    pub fn current_page(&self) -> &[ParticipantId] {
        let start = self.current.saturating_sub(1) * self.page_size;
        let end = (start + self.page_size).min(self.data.len());
        if start >= end {
            return &[];
        }
        &self.data[start..end]
    }
}

/// Order participants according to `settings.order` and split into pages
pub fn paginate(participants: &[Participant], settings: &PaginationSettings) -> PageInfo {
    let ordered = order_participants(participants, &settings.order);
    let page_size = settings.page_size.max(1);
    let total_pages = ordered.len().div_ceil(page_size).max(1);
    let current = settings.current.clamp(1, total_pages);

    PageInfo {
        data: ordered.into_iter().map(|p| p.id.clone()).collect(),
        current,
        page_size,
        total_pages,
    }
}

fn order_participants<'a>(participants: &'a [Participant], keys: &[SortKey]) -> Vec<&'a Participant> {
    let groups: Vec<Vec<&Participant>> = if keys.contains(&SortKey::VideoMuted) {
        let (unmuted, muted): (Vec<&Participant>, Vec<&Participant>) = participants.iter().partition(|p| !p.video_muted);
        vec![unmuted, muted]
    } else {
        vec![participants.iter().collect()]
    };

    let by_name = keys.contains(&SortKey::DisplayName) && !keys.contains(&SortKey::UserDefined);

    groups
        .into_iter()
        .flat_map(|mut group| {
            if by_name {
                // stable, so equal names keep roster order
                group.sort_by_key(|p| p.display_name.to_lowercase());
            }
            group
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn participant(id: &str, name: &str, video_muted: bool) -> Participant {
        let mut p = Participant::new(id, name, Role::Participant);
        p.video_muted = video_muted;
        p
    }

    fn ids(info: &PageInfo) -> Vec<&str> {
        info.data.iter().map(|id| id.as_str()).collect()
    }

    #[test]
    fn test_video_muted_then_name() {
        let list = vec![
            participant("1", "carol", false),
            participant("2", "bob", true),
            participant("3", "alice", false),
            participant("4", "aaron", true),
        ];
        let info = paginate(&list, &PaginationSettings::default());
        assert_eq!(ids(&info), vec!["3", "1", "4", "2"]);
    }

    #[test]
    fn test_user_defined_keeps_roster_order() {
        let list = vec![
            participant("1", "carol", false),
            participant("2", "alice", false),
        ];
        let settings = PaginationSettings {
            order: vec![SortKey::UserDefined],
            ..Default::default()
        };
        assert_eq!(ids(&paginate(&list, &settings)), vec!["1", "2"]);
    }

    #[test]
    fn test_page_math_clamps_current() {
        let list: Vec<_> = (0..10)
            .map(|i| participant(&i.to_string(), "x", false))
            .collect();
        let settings = PaginationSettings {
            order: vec![SortKey::UserDefined],
            current: 7,
            page_size: 4,
            total_pages: 0,
        };
        let info = paginate(&list, &settings);
        assert_eq!(info.total_pages, 3);
        assert_eq!(info.current, 3);
        assert_eq!(info.current_page().len(), 2);
    }

    #[test]
    fn test_empty_list_has_one_page() {
        let info = paginate(&[], &PaginationSettings::default());
        assert_eq!(info.total_pages, 1);
        assert!(info.current_page().is_empty());
    }
}
