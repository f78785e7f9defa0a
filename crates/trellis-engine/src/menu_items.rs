//! Menu item trees.
//!
//! Items of each menu are kept in a flat list in `lft` order. Sibling order is
//! the order of the list; [`MenuItems::renumber`] derives nested-set markers
//! from it.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;
use crate::model::{MenuId, MenuItem, MenuItemId, MenuTarget, PageId};
use crate::nested_set;
use crate::page_tree::PageTree;

/// Nested navigation view of a menu.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuNode {
    pub text: String,
    /// Page path or external URL; `None` if the target page is gone.
    pub href: Option<String>,
    pub page_id: Option<PageId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MenuNode>,
}

/// Items of every menu.
#[derive(Clone, Debug, Default)]
pub struct MenuItems {
    by_menu: HashMap<MenuId, Vec<MenuItem>>,
}

impl MenuItems {
    /// Rebuild from stored items, ordering each menu by its stored markers.
    pub(crate) fn from_items(items: Vec<MenuItem>) -> Self {
        let mut this = Self::default();
        for item in items {
            this.by_menu.entry(item.menu_id).or_default().push(item);
        }
        let menus: Vec<MenuId> = this.by_menu.keys().copied().collect();
        for menu in menus {
            if let Some(items) = this.by_menu.get_mut(&menu) {
                items.sort_by_key(|item| item.lft);
            }
            this.renumber(menu);
        }
        this
    }

    /// Items of a menu in `lft` order.
    #[must_use]
    pub fn items(&self, menu: MenuId) -> &[MenuItem] {
        self.by_menu.get(&menu).map_or(&[], Vec::as_slice)
    }

    /// Total number of items across menus.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_menu.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &MenuItem> {
        self.by_menu.values().flatten()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut MenuItem> {
        self.by_menu.values_mut().flatten()
    }

    /// Menus owning at least one item that points at `page`.
    #[must_use]
    pub fn menus_referencing(&self, page: PageId) -> HashSet<MenuId> {
        self.iter()
            .filter(|item| item.target.page_id() == Some(page))
            .map(|item| item.menu_id)
            .collect()
    }

    /// Remove every item of a menu, returning how many were removed.
    pub(crate) fn clear(&mut self, menu: MenuId) -> usize {
        self.by_menu.remove(&menu).map_or(0, |items| items.len())
    }

    /// Append an item as the last child of `parent` without renumbering.
    ///
    /// Callers building several items call [`renumber`](Self::renumber) once
    /// at the end.
    pub(crate) fn push(
        &mut self,
        menu: MenuId,
        parent: Option<MenuItemId>,
        text: &str,
        target: MenuTarget,
        pages: &PageTree,
    ) -> Result<MenuItemId, ValidationErrors> {
        let items = self.by_menu.entry(menu).or_default();

        let mut errors = ValidationErrors::new();
        if text.trim().is_empty() {
            errors.add("menu_item", "text", "can't be blank");
        }
        match &target {
            MenuTarget::Page(page) if pages.get(*page).is_none() => {
                errors.add("menu_item", "page", "must exist");
            }
            MenuTarget::External(url) if url.trim().is_empty() => {
                errors.add("menu_item", "url", "can't be blank");
            }
            MenuTarget::Page(_) | MenuTarget::External(_) => {}
        }
        if let Some(parent) = parent
            && !items.iter().any(|item| item.id == parent)
        {
            errors.add("menu_item", "parent", "must belong to the same menu");
        }
        errors.into_result()?;

        let id = MenuItemId::generate();
        items.push(MenuItem {
            id,
            menu_id: menu,
            parent_id: parent,
            text: text.to_owned(),
            target,
            depth: 0,
            lft: 0,
            rgt: 0,
        });
        Ok(id)
    }

    /// Recompute markers of a menu's items and sort them by `lft`.
    pub(crate) fn renumber(&mut self, menu: MenuId) {
        let Some(items) = self.by_menu.get_mut(&menu) else {
            return;
        };

        let mut children: HashMap<Option<MenuItemId>, Vec<MenuItemId>> = HashMap::new();
        for item in items.iter() {
            children.entry(item.parent_id).or_default().push(item.id);
        }
        let roots = children.get(&None).cloned().unwrap_or_default();
        let numbered = nested_set::number(&roots, |id| {
            children.get(&Some(id)).cloned().unwrap_or_default()
        });

        let positions: HashMap<MenuItemId, nested_set::Interval> = numbered.into_iter().collect();
        // Items hanging off a missing parent are unreachable and dropped
        items.retain(|item| positions.contains_key(&item.id));
        for item in items.iter_mut() {
            if let Some(interval) = positions.get(&item.id) {
                item.lft = interval.lft;
                item.rgt = interval.rgt;
                item.depth = interval.depth;
            }
        }
        items.sort_by_key(|item| item.lft);
    }

    /// Nested view of a menu, resolving page targets to their current paths.
    #[must_use]
    pub fn nodes(&self, menu: MenuId, pages: &PageTree) -> Vec<MenuNode> {
        let mut children: HashMap<Option<MenuItemId>, Vec<&MenuItem>> = HashMap::new();
        for item in self.items(menu) {
            children.entry(item.parent_id).or_default().push(item);
        }
        build_nodes(None, &children, pages)
    }
}

fn build_nodes(
    parent: Option<MenuItemId>,
    children: &HashMap<Option<MenuItemId>, Vec<&MenuItem>>,
    pages: &PageTree,
) -> Vec<MenuNode> {
    children
        .get(&parent)
        .into_iter()
        .flatten()
        .map(|item| {
            let (href, page_id) = match &item.target {
                MenuTarget::Page(id) => (pages.get(*id).map(|p| p.path.clone()), Some(*id)),
                MenuTarget::External(url) => (Some(url.clone()), None),
            };
            MenuNode {
                text: item.text.clone(),
                href,
                page_id,
                children: build_nodes(Some(item.id), children, pages),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Page, PageStatus, TemplateId};

    fn tree_with_root() -> (PageTree, PageId) {
        let mut tree = PageTree::new();
        let root = tree
            .insert(Page {
                id: PageId::generate(),
                title: "Home".to_owned(),
                path: "/".to_owned(),
                status: PageStatus::Active,
                template_id: TemplateId::generate(),
                parent_id: None,
                depth: 0,
                lft: 0,
                rgt: 0,
                children_count: 0,
                lock_version: 0,
                updated_at: Utc::now(),
            })
            .unwrap();
        (tree, root)
    }

    #[test]
    fn test_push_and_renumber() {
        let (pages, home) = tree_with_root();
        let menu = MenuId::generate();
        let mut items = MenuItems::default();

        let top = items
            .push(menu, None, "Home", MenuTarget::Page(home), &pages)
            .unwrap();
        let docs = items
            .push(
                menu,
                None,
                "Docs",
                MenuTarget::External("https://docs.example.com".to_owned()),
                &pages,
            )
            .unwrap();
        let nested = items
            .push(menu, Some(top), "Nested", MenuTarget::Page(home), &pages)
            .unwrap();
        items.renumber(menu);

        let order: Vec<(MenuItemId, u32, u32, u32)> = items
            .items(menu)
            .iter()
            .map(|i| (i.id, i.lft, i.rgt, i.depth))
            .collect();
        assert_eq!(
            order,
            vec![(top, 1, 4, 0), (nested, 2, 3, 1), (docs, 5, 6, 0)]
        );
    }

    #[test]
    fn test_push_validates_fields() {
        let (pages, _) = tree_with_root();
        let menu = MenuId::generate();
        let mut items = MenuItems::default();

        let err = items
            .push(
                menu,
                Some(MenuItemId::generate()),
                "",
                MenuTarget::Page(PageId::generate()),
                &pages,
            )
            .unwrap_err();

        assert!(err.has("menu_item", "text"));
        assert!(err.has("menu_item", "page"));
        assert!(err.has("menu_item", "parent"));
        assert!(items.items(menu).is_empty());
    }

    #[test]
    fn test_push_rejects_blank_url() {
        let (pages, _) = tree_with_root();
        let mut items = MenuItems::default();

        let err = items
            .push(
                MenuId::generate(),
                None,
                "Blog",
                MenuTarget::External(" ".to_owned()),
                &pages,
            )
            .unwrap_err();

        assert!(err.has("menu_item", "url"));
    }

    #[test]
    fn test_parent_from_other_menu_rejected() {
        let (pages, home) = tree_with_root();
        let mut items = MenuItems::default();
        let other = items
            .push(MenuId::generate(), None, "Home", MenuTarget::Page(home), &pages)
            .unwrap();

        let err = items
            .push(MenuId::generate(), Some(other), "Child", MenuTarget::Page(home), &pages)
            .unwrap_err();

        assert!(err.has("menu_item", "parent"));
    }

    #[test]
    fn test_clear_and_referencing() {
        let (pages, home) = tree_with_root();
        let main = MenuId::generate();
        let footer = MenuId::generate();
        let mut items = MenuItems::default();
        items
            .push(main, None, "Home", MenuTarget::Page(home), &pages)
            .unwrap();
        items
            .push(footer, None, "Home", MenuTarget::Page(home), &pages)
            .unwrap();

        assert_eq!(items.menus_referencing(home), HashSet::from([main, footer]));
        assert_eq!(items.clear(main), 1);
        assert_eq!(items.menus_referencing(home), HashSet::from([footer]));
        assert_eq!(items.clear(main), 0);
    }

    #[test]
    fn test_nodes_resolve_page_paths() {
        let (pages, home) = tree_with_root();
        let menu = MenuId::generate();
        let mut items = MenuItems::default();
        let top = items
            .push(menu, None, "Home", MenuTarget::Page(home), &pages)
            .unwrap();
        items
            .push(
                menu,
                Some(top),
                "Blog",
                MenuTarget::External("https://blog.example.com".to_owned()),
                &pages,
            )
            .unwrap();
        items.renumber(menu);

        let nodes = items.nodes(menu, &pages);

        assert_eq!(
            nodes,
            vec![MenuNode {
                text: "Home".to_owned(),
                href: Some("/".to_owned()),
                page_id: Some(home),
                children: vec![MenuNode {
                    text: "Blog".to_owned(),
                    href: Some("https://blog.example.com".to_owned()),
                    page_id: None,
                    children: Vec::new(),
                }],
            }]
        );
    }

    #[test]
    fn test_from_items_restores_order() {
        let (pages, home) = tree_with_root();
        let menu = MenuId::generate();
        let mut items = MenuItems::default();
        for text in ["One", "Two", "Three"] {
            items
                .push(menu, None, text, MenuTarget::Page(home), &pages)
                .unwrap();
        }
        items.renumber(menu);
        let mut stored: Vec<MenuItem> = items.iter().cloned().collect();
        stored.reverse();

        let restored = MenuItems::from_items(stored);

        let texts: Vec<&str> = restored.items(menu).iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["One", "Two", "Three"]);
    }
}
