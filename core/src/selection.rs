// Selection and view state
//
// At most one entity is selected at a time: a building or a faculty.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Selection {
    #[default]
    Idle,
    Building(i64),
    Faculty(String),
}

impl Selection {
    pub fn key(&self) -> Option<SelectionKey> {
        match self {
            Selection::Idle => None,
            Selection::Building(id) => Some(SelectionKey::Building(*id)),
            Selection::Faculty(name) => Some(SelectionKey::Faculty(name.clone())),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Selection::Idle)
    }

    pub fn building_id(&self) -> Option<i64> {
        match self {
            Selection::Building(id) => Some(*id),
            _ => None,
        }
    }

    pub fn faculty_name(&self) -> Option<&str> {
        match self {
            Selection::Faculty(name) => Some(name),
            _ => None,
        }
    }

    pub fn panel(&self) -> DetailPanel {
        match self {
            Selection::Idle => DetailPanel::None,
            Selection::Building(_) => DetailPanel::Building,
            Selection::Faculty(_) => DetailPanel::Faculty,
        }
    }
}

/// Identity of a non-idle selection, used to tag in-flight requests
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SelectionKey {
    Building(i64),
    Faculty(String),
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionKey::Building(id) => write!(f, "building:{}", id),
            SelectionKey::Faculty(name) => write!(f, "faculty:{}", name),
        }
    }
}

impl From<SelectionKey> for Selection {
    fn from(key: SelectionKey) -> Self {
        match key {
            SelectionKey::Building(id) => Selection::Building(id),
            SelectionKey::Faculty(name) => Selection::Faculty(name),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailPanel {
    None,
    Building,
    Faculty,
}

/// Selection plus the UI state that depends on it
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    selection: Selection,
    active_floor_tab: usize,
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn active_floor_tab(&self) -> usize {
        self.active_floor_tab
    }

    pub fn is_panel_open(&self) -> bool {
        !self.selection.is_idle()
    }

    pub fn selected_building(&self) -> Option<i64> {
        self.selection.building_id()
    }

    /// Select a building, clearing any faculty selection. Always resets the
    /// floor tab. Returns whether the selection changed.
    pub fn select_building(&mut self, id: i64) -> bool {
        self.active_floor_tab = 0;
        self.transition(Selection::Building(id))
    }

    /// Select a faculty, clearing any building selection
    pub fn select_faculty(&mut self, name: impl Into<String>) -> bool {
        self.active_floor_tab = 0;
        self.transition(Selection::Faculty(name.into()))
    }

    pub fn close(&mut self) -> bool {
        self.active_floor_tab = 0;
        self.transition(Selection::Idle)
    }

    /// Switch floor tab, clamped to the available floors. Only meaningful
    /// while a building is selected.
    pub fn select_floor_tab(&mut self, index: usize, floor_count: usize) -> usize {
        if self.selected_building().is_none() || floor_count == 0 {
            self.active_floor_tab = 0;
        } else {
            self.active_floor_tab = index.min(floor_count - 1);
        }
        self.active_floor_tab
    }

    fn transition(&mut self, next: Selection) -> bool {
        if self.selection == next {
            return false;
        }
        self.selection = next;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn building_then_faculty_keeps_only_faculty() {
        let mut view = ViewState::new();
        assert!(view.select_building(3));
        assert!(view.select_faculty("Eng"));
        assert_eq!(view.selection(), &Selection::Faculty("Eng".into()));
        assert_eq!(view.selected_building(), None);
        assert_eq!(view.selection().panel(), DetailPanel::Faculty);
    }

    #[test]
    fn selecting_building_resets_floor_tab() {
        let mut view = ViewState::new();
        view.select_building(1);
        assert_eq!(view.select_floor_tab(2, 4), 2);
        view.select_building(2);
        assert_eq!(view.active_floor_tab(), 0);
    }

    #[test]
    fn floor_tab_is_clamped() {
        let mut view = ViewState::new();
        view.select_building(1);
        assert_eq!(view.select_floor_tab(9, 3), 2);
        assert_eq!(view.select_floor_tab(1, 0), 0);
    }

    #[test]
    fn close_returns_to_idle() {
        let mut view = ViewState::new();
        assert!(!view.close());
        view.select_faculty("Science");
        assert!(view.is_panel_open());
        assert!(view.close());
        assert!(view.selection().is_idle());
        assert!(!view.is_panel_open());
    }

    #[test]
    fn reselecting_same_entity_is_not_a_change() {
        let mut view = ViewState::new();
        assert!(view.select_building(5));
        assert!(!view.select_building(5));
    }
}
