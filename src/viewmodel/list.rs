//! List-backed view model.
//!
//! `ListViewModel<T>` layers item storage, selection tracking and an
//! optional text filter over the [`ViewModel`] base. It is the building
//! block for list, search and tree-grouped surfaces: the host supplies
//! the filter predicate, binds commands to [`clear_search`] and its own
//! reload routine, and derives tree paths with [`group_into_tree`]
//! (typically renotified through `when_property_changed`).
//!
//! [`clear_search`]: ListViewModel::clear_search

use crate::core::{AppContext, Event};

use super::ViewModel;

type Filter<T> = Box<dyn Fn(&T, &str) -> bool + Send + Sync>;

pub struct ListViewModel<T> {
    vm: ViewModel,
    items: Vec<T>,
    selected_item: Option<T>,
    selected_items: Vec<T>,
    search_text: Option<String>,
    filter: Option<Filter<T>>,
    selected_item_changed: Event<Option<T>>,
    data_refreshed: Event<()>,
}

impl<T: Clone + Send + Sync + 'static> ListViewModel<T> {
    pub fn new(ctx: &AppContext) -> Self {
        Self {
            vm: ViewModel::new(ctx),
            items: Vec::new(),
            selected_item: None,
            selected_items: Vec::new(),
            search_text: None,
            filter: None,
            selected_item_changed: Event::new(),
            data_refreshed: Event::new(),
        }
    }

    /// A list whose visible items are narrowed by `filter` whenever a
    /// search text is set.
    pub fn searchable(
        ctx: &AppContext,
        filter: impl Fn(&T, &str) -> bool + Send + Sync + 'static,
    ) -> Self {
        let mut list = Self::new(ctx);
        list.filter = Some(Box::new(filter));
        list
    }

    pub fn vm(&self) -> &ViewModel {
        &self.vm
    }

    pub fn vm_mut(&mut self) -> &mut ViewModel {
        &mut self.vm
    }

    // ----- events -----

    pub fn on_selected_item_changed(&self) -> &Event<Option<T>> {
        &self.selected_item_changed
    }

    pub fn on_data_refreshed(&self) -> &Event<()> {
        &self.data_refreshed
    }

    // ----- items -----

    /// The visible items: everything, or the filtered subset while a
    /// search text is active.
    pub fn items(&self) -> Vec<&T> {
        match (&self.search_text, &self.filter) {
            (Some(text), Some(filter)) if !text.is_empty() => {
                self.items.iter().filter(|item| filter(item, text)).collect()
            }
            _ => self.items.iter().collect(),
        }
    }

    /// The backing items, ignoring any active search.
    pub fn unfiltered_items(&self) -> &[T] {
        &self.items
    }

    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.vm.notify_property_changed("Items", true);
        self.vm.notify_property_changed("ItemCount", true);
    }

    pub fn item_count(&self) -> usize {
        self.items().len()
    }

    /// Display string for the count of visible items.
    pub fn item_count_label(&self) -> String {
        let count = self.item_count();
        let noun = if count == 1 { "item" } else { "items" };
        format!("Found {} {}", count, noun)
    }

    // ----- selection -----

    pub fn selected_item(&self) -> Option<&T> {
        self.selected_item.as_ref()
    }

    /// Always fires, even when reselecting the same item.
    pub fn set_selected_item(&mut self, item: Option<T>) {
        self.selected_item = item;
        self.vm.notify_property_changed("SelectedItem", true);
        self.selected_item_changed.emit(&self.selected_item);
    }

    pub fn selected_items(&self) -> &[T] {
        &self.selected_items
    }

    pub fn set_selected_items(&mut self, items: Vec<T>) {
        self.selected_items = items;
        self.vm.notify_property_changed("SelectedItems", true);
    }

    // ----- search -----

    pub fn search_text(&self) -> Option<&str> {
        self.search_text.as_deref()
    }

    /// Changing the search text renotifies the visible items and count.
    pub fn set_search_text(&mut self, text: Option<String>) {
        self.search_text = text;
        self.vm.notify_property_changed("SearchText", true);
        self.vm.notify_property_changed("Items", true);
        self.vm.notify_property_changed("ItemCount", true);
    }

    /// Clears the search text and the selection; the body a host's
    /// clear-search command wraps.
    pub fn clear_search(&mut self) {
        self.set_search_text(None);
        self.set_selected_item(None);
    }

    /// Hosts call this after reloading the backing data.
    pub fn notify_data_refreshed(&self) {
        self.data_refreshed.emit(&());
    }
}

/// One node of a grouped tree path; leaf items are represented by their
/// group-value chain, not stored on the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub children: Vec<TreeNode>,
}

/// Groups `items` into a tree, one level per key selector, merging equal
/// group values in first-seen order.
pub fn group_into_tree<T>(items: &[T], group_keys: &[&dyn Fn(&T) -> String]) -> Vec<TreeNode> {
    let mut roots: Vec<TreeNode> = Vec::new();
    if group_keys.is_empty() {
        return roots;
    }

    for item in items {
        let mut level = &mut roots;
        for key in group_keys {
            let name = key(item);
            let index = match level.iter().position(|node| node.name == name) {
                Some(index) => index,
                None => {
                    level.push(TreeNode {
                        name,
                        children: Vec::new(),
                    });
                    level.len() - 1
                }
            };
            level = &mut level[index].children;
        }
    }

    roots
}
