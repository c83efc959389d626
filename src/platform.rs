//! Target platform catalog and per-session selection

use crate::ui::{Action, Button, Keyboard, Prompt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

const DEFAULT_ICON: &str = "•";

/// A supported publishing target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub id: String,
    pub icon: String,
}

impl Platform {
    pub fn new(id: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            icon: icon.into(),
        }
    }
}

/// The fixed, configured set of platforms a post can target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformCatalog {
    platforms: Vec<Platform>,
}

impl Default for PlatformCatalog {
    fn default() -> Self {
        Self::new(vec![
            Platform::new("Telegram", "📢"),
            Platform::new("Instagram", "📷"),
            Platform::new("VK", "📰"),
        ])
    }
}

impl PlatformCatalog {
    /// Build a catalog; later duplicates of an id are dropped
    pub fn new(platforms: Vec<Platform>) -> Self {
        let mut seen = HashSet::new();
        let platforms = platforms
            .into_iter()
            .filter(|p| !p.id.is_empty() && seen.insert(p.id.clone()))
            .collect();
        Self { platforms }
    }

    /// Parse `Telegram=📢,Instagram=📷,VK` style lists
    pub fn parse(spec: &str) -> Self {
        Self::new(
            spec.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(|entry| match entry.split_once('=') {
                    Some((id, icon)) => Platform::new(id.trim(), icon.trim()),
                    None => Platform::new(entry, DEFAULT_ICON),
                })
                .collect(),
        )
    }

    pub fn contains(&self, id: &str) -> bool {
        self.iter().any(|p| p.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Platform> {
        self.platforms.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    /// Selected ids in catalog order
    pub fn ordered(&self, selection: &PlatformSet) -> Vec<String> {
        self.platforms
            .iter()
            .filter(|p| selection.contains(&p.id))
            .map(|p| p.id.clone())
            .collect()
    }

    /// Render the selector exactly as `selection` stands
    pub fn prompt(&self, selection: &PlatformSet, notice: Option<&str>) -> Prompt {
        let chosen = self.ordered(selection);
        let status = if chosen.is_empty() {
            "📲 Выберите платформы:".to_string()
        } else {
            format!("✅ Выбрано: {}", chosen.join(", "))
        };
        let text = match notice {
            Some(notice) => format!("{notice}\n{status}"),
            None => status,
        };

        let mut keyboard = Keyboard::new();
        for platform in &self.platforms {
            let marker = if selection.contains(&platform.id) {
                "✅"
            } else {
                "▫️"
            };
            keyboard = keyboard.button(
                format!("{marker} {} {}", platform.icon, platform.id),
                Action::TogglePlatform(platform.id.clone()),
            );
        }
        let keyboard = keyboard.row(vec![
            Button::new("✅ Подтвердить", Action::Confirm),
            Button::new("✖️ Отмена", Action::Cancel),
        ]);

        Prompt::new(text, keyboard)
    }
}

/// Platforms chosen for one post; membership only, no order, no duplicates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformSet(HashSet<String>);

impl PlatformSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` if absent, remove it if present. Returns whether it is now selected.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.0.remove(id) {
            false
        } else {
            self.0.insert(id.to_string());
            true
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    #[allow(dead_code)] // For invariant checks
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
