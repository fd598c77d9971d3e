//! Nhóm sự kiện cấp phát theo tác dụng điều trị.

use std::collections::HashMap;

use crate::DispensingEvent;

/// Khóa phân loại: nhãn tác dụng nếu có, ngược lại là tên thuốc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryKey {
    Effect(String),
    Drug(String),
}

impl CategoryKey {
    /// Resolve the category of an event. Returns `None` only for events with
    /// neither label nor drug name, which the normalizer never emits.
    pub fn resolve(event: &DispensingEvent) -> Option<Self> {
        match event.effect_label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => Some(Self::Effect(label.to_string())),
            _ => event
                .drug_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(|name| Self::Drug(name.to_string())),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Effect(label) | Self::Drug(label) => label,
        }
    }
}

/// Events of one category, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectGroup {
    pub key: CategoryKey,
    pub events: Vec<DispensingEvent>,
}

impl EffectGroup {
    pub fn label(&self) -> &str {
        self.key.label()
    }
}

/// Group events by category label. Groups come out in first-seen order; a
/// drug-name key equal to an effect label lands in the same group.
pub fn classify_events(events: &[DispensingEvent]) -> Vec<EffectGroup> {
    let mut groups: Vec<EffectGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for event in events {
        let Some(key) = CategoryKey::resolve(event) else {
            continue;
        };

        match index.get(key.label()) {
            Some(&position) => groups[position].events.push(event.clone()),
            None => {
                index.insert(key.label().to_string(), groups.len());
                groups.push(EffectGroup {
                    key,
                    events: vec![event.clone()],
                });
            }
        }
    }

    tracing::debug!(groups = groups.len(), "classified dispensing events");
    groups
}
