use crate::model::ConfigItem;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum FilterCategory {
    Namespaces,
    Services,
}

impl FilterCategory {
    pub fn title(self) -> &'static str {
        match self {
            Self::Namespaces => "Namespaces",
            Self::Services => "Services",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            Self::Namespaces => "Filter by Namespace",
            Self::Services => "Filter by Service",
        }
    }
}

/// One selectable option within a filter category. `id` is the canonical
/// value used for matching, `title` the display text.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FilterValue {
    pub id: String,
    pub title: String,
}

/// A filter category together with its selectable values, derived from an
/// observed item collection. Stateless after construction.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FilterDefinition {
    pub category: FilterCategory,
    pub filter_values: Vec<FilterValue>,
}

impl FilterDefinition {
    /// True when any of the active value ids matches the item field this
    /// category inspects.
    pub fn matches(&self, item: &impl ConfigItem, active: &[String]) -> bool {
        match self.category {
            FilterCategory::Namespaces => active.iter().any(|value| value == item.namespace()),
            FilterCategory::Services => active.iter().any(|value| value == item.name()),
        }
    }
}

/// Per-view set of selected filter value ids, keyed by category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveFilterSet {
    selected: HashMap<FilterCategory, Vec<String>>,
}

impl ActiveFilterSet {
    pub fn is_empty(&self) -> bool {
        self.selected.values().all(Vec::is_empty)
    }

    pub fn selected(&self, category: FilterCategory) -> &[String] {
        self.selected
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_selected(&self, category: FilterCategory, id: &str) -> bool {
        self.selected(category).iter().any(|value| value == id)
    }

    /// Adds the value to the category's selection, or removes it when
    /// already present.
    pub fn toggle(&mut self, category: FilterCategory, id: &str) {
        let values = self.selected.entry(category).or_default();
        if let Some(position) = values.iter().position(|value| value == id) {
            values.remove(position);
        } else {
            values.push(id.to_string());
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn active_count(&self) -> usize {
        self.selected.values().map(Vec::len).sum()
    }
}

/// Derives the available filter categories and their values from an item
/// collection: distinct namespaces and distinct names, deduplicated and
/// sorted ascending, in fixed category order.
pub fn build_filters<I: ConfigItem>(items: &[I]) -> Vec<FilterDefinition> {
    let mut namespaces = BTreeSet::new();
    let mut services = BTreeSet::new();
    for item in items {
        namespaces.insert(item.namespace().to_string());
        services.insert(item.name().to_string());
    }

    vec![
        FilterDefinition {
            category: FilterCategory::Namespaces,
            filter_values: to_filter_values(namespaces),
        },
        FilterDefinition {
            category: FilterCategory::Services,
            filter_values: to_filter_values(services),
        },
    ]
}

fn to_filter_values(values: BTreeSet<String>) -> Vec<FilterValue> {
    values
        .into_iter()
        .map(|value| FilterValue {
            id: value.clone(),
            title: value,
        })
        .collect()
}

/// Stable filter over `items`: an item survives iff every category with a
/// non-empty selection matches it (OR within a category, AND across
/// categories). Selections for categories with no definition are ignored.
pub fn apply_filters<I: ConfigItem + Clone>(
    items: &[I],
    filters: &[FilterDefinition],
    active: &ActiveFilterSet,
) -> Vec<I> {
    items
        .iter()
        .filter(|item| {
            filters.iter().all(|definition| {
                let selected = active.selected(definition.category);
                selected.is_empty() || definition.matches(*item, selected)
            })
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ActiveFilterSet, FilterCategory, apply_filters, build_filters};
    use crate::model::ZtunnelService;

    fn item(namespace: &str, name: &str) -> ZtunnelService {
        ZtunnelService {
            namespace: namespace.to_string(),
            name: name.to_string(),
            ..ZtunnelService::default()
        }
    }

    #[test]
    fn builder_returns_fixed_categories_in_order() {
        let filters = build_filters(&[item("a", "x"), item("b", "y")]);
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].category, FilterCategory::Namespaces);
        assert_eq!(filters[1].category, FilterCategory::Services);
    }

    #[test]
    fn builder_sorts_and_dedups_values() {
        let items = vec![item("b", "z"), item("a", "z"), item("a", "y")];
        let filters = build_filters(&items);

        let namespaces = filters[0]
            .filter_values
            .iter()
            .map(|value| value.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(namespaces, vec!["a", "b"]);

        let services = filters[1]
            .filter_values
            .iter()
            .map(|value| value.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(services, vec!["y", "z"]);
    }

    #[test]
    fn builder_accepts_empty_input() {
        let filters = build_filters::<ZtunnelService>(&[]);
        assert_eq!(filters.len(), 2);
        assert!(filters[0].filter_values.is_empty());
        assert!(filters[1].filter_values.is_empty());
    }

    #[test]
    fn empty_selection_is_identity() {
        let items = vec![item("b", "z"), item("a", "y")];
        let filters = build_filters(&items);
        let active = ActiveFilterSet::default();

        let filtered = apply_filters(&items, &filters, &active);
        assert_eq!(filtered, items);
    }

    #[test]
    fn or_within_category_and_across_categories() {
        let items = vec![item("a", "x"), item("a", "y"), item("b", "x")];
        let filters = build_filters(&items);

        let mut active = ActiveFilterSet::default();
        active.toggle(FilterCategory::Namespaces, "a");
        active.toggle(FilterCategory::Services, "x");

        let filtered = apply_filters(&items, &filters, &active);
        assert_eq!(filtered, vec![item("a", "x")]);

        active.toggle(FilterCategory::Services, "y");
        let filtered = apply_filters(&items, &filters, &active);
        assert_eq!(filtered, vec![item("a", "x"), item("a", "y")]);
    }

    #[test]
    fn filter_is_stable_and_idempotent() {
        let items = vec![item("b", "x"), item("a", "x"), item("a", "y")];
        let filters = build_filters(&items);
        let mut active = ActiveFilterSet::default();
        active.toggle(FilterCategory::Namespaces, "a");
        active.toggle(FilterCategory::Namespaces, "b");

        let once = apply_filters(&items, &filters, &active);
        assert_eq!(once, items);

        let twice = apply_filters(&once, &filters, &active);
        assert_eq!(twice, once);
    }

    #[test]
    fn selection_without_definition_is_ignored() {
        let items = vec![item("a", "x"), item("b", "y")];
        let namespaces_only = vec![build_filters(&items).remove(0)];

        let mut active = ActiveFilterSet::default();
        active.toggle(FilterCategory::Services, "nothing-matches-this");

        let filtered = apply_filters(&items, &namespaces_only, &active);
        assert_eq!(filtered, items);
    }

    #[test]
    fn toggle_removes_existing_selection() {
        let mut active = ActiveFilterSet::default();
        active.toggle(FilterCategory::Namespaces, "a");
        assert!(active.is_selected(FilterCategory::Namespaces, "a"));
        assert_eq!(active.active_count(), 1);

        active.toggle(FilterCategory::Namespaces, "a");
        assert!(!active.is_selected(FilterCategory::Namespaces, "a"));
        assert!(active.is_empty());
    }
}
