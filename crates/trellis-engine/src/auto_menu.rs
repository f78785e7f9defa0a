//! Auto menus: item trees derived from a page subtree.
//!
//! An auto menu is rebuilt from scratch on every regeneration. The root item
//! points at the start page; below it every `active` child page gets an item,
//! in sibling order, down to the menu's depth limit.

use std::collections::HashSet;

use crate::error::ValidationErrors;
use crate::menu_items::MenuItems;
use crate::menus::MenuRegistry;
use crate::model::{Menu, MenuId, MenuItemId, MenuKind, MenuTarget, Page, PageId, PageStatus};
use crate::page_tree::PageTree;

/// Rebuild the items of an auto menu.
///
/// Returns the number of items created, or `None` if the menu is not an auto
/// menu with an existing start page (nothing is touched in that case).
pub(crate) fn regenerate(
    menu: &Menu,
    pages: &PageTree,
    items: &mut MenuItems,
) -> Result<Option<usize>, ValidationErrors> {
    if menu.kind != MenuKind::Auto {
        return Ok(None);
    }
    let Some(start) = menu.start_page_id.and_then(|id| pages.get(id)) else {
        return Ok(None);
    };

    items.clear(menu.id);
    let root = items.push(menu.id, None, &start.title, MenuTarget::Page(start.id), pages)?;
    descend(menu, pages, items, start, root, 0)?;
    items.renumber(menu.id);

    let created = items.items(menu.id).len();
    tracing::debug!(menu = %menu.name, items = created, "Regenerated auto menu");
    Ok(Some(created))
}

fn descend(
    menu: &Menu,
    pages: &PageTree,
    items: &mut MenuItems,
    page: &Page,
    item: MenuItemId,
    level: u32,
) -> Result<(), ValidationErrors> {
    let child_level = level + 1;
    for child in pages
        .children(page.id)
        .filter(|child| child.status == PageStatus::Active)
    {
        let child_item = items.push(
            menu.id,
            Some(item),
            &child.title,
            MenuTarget::Page(child.id),
            pages,
        )?;
        if pages.has_children(child.id) && menu.depth.is_none_or(|depth| child_level < depth) {
            descend(menu, pages, items, child, child_item, child_level)?;
        }
    }
    Ok(())
}

/// Auto menus whose items may change when `page` is saved, sorted by name.
///
/// A menu is affected if its start page is `page` or one of its ancestors, or
/// if one of its items points at `page`.
pub(crate) fn menus_affected_by(
    page: PageId,
    pages: &PageTree,
    menus: &MenuRegistry,
    items: &MenuItems,
) -> Vec<MenuId> {
    let referencing = items.menus_referencing(page);
    let ancestors: HashSet<PageId> = pages.ancestors(page).iter().map(|p| p.id).collect();

    menus
        .sorted()
        .into_iter()
        .filter(|menu| menu.kind == MenuKind::Auto)
        .filter(|menu| {
            referencing.contains(&menu.id)
                || menu
                    .start_page_id
                    .is_some_and(|start| start == page || ancestors.contains(&start))
        })
        .map(|menu| menu.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::TemplateId;

    struct Fixture {
        pages: PageTree,
        start: PageId,
        a: PageId,
        a1: PageId,
        b: PageId,
    }

    fn page(title: &str, path: &str, parent: Option<PageId>) -> Page {
        Page {
            id: PageId::generate(),
            title: title.to_owned(),
            path: path.to_owned(),
            status: PageStatus::Active,
            template_id: TemplateId::generate(),
            parent_id: parent,
            depth: 0,
            lft: 0,
            rgt: 0,
            children_count: 0,
            lock_version: 0,
            updated_at: Utc::now(),
        }
    }

    /// `/` -> `/start` -> [`A` -> [`A1`], `B`]
    fn fixture() -> Fixture {
        let mut pages = PageTree::new();
        let root = pages.insert(page("Home", "/", None)).unwrap();
        let start = pages.insert(page("Start", "/start", Some(root))).unwrap();
        let a = pages.insert(page("A", "/start/a", Some(start))).unwrap();
        let a1 = pages.insert(page("A1", "/start/a/1", Some(a))).unwrap();
        let b = pages.insert(page("B", "/start/b", Some(start))).unwrap();
        Fixture {
            pages,
            start,
            a,
            a1,
            b,
        }
    }

    fn auto_menu(start: PageId, depth: Option<u32>) -> Menu {
        Menu {
            id: MenuId::generate(),
            name: "nav".to_owned(),
            kind: MenuKind::Auto,
            start_page_id: Some(start),
            depth,
            updated_at: Utc::now(),
        }
    }

    fn texts(items: &MenuItems, menu: MenuId) -> Vec<(&str, u32)> {
        items
            .items(menu)
            .iter()
            .map(|i| (i.text.as_str(), i.depth))
            .collect()
    }

    #[test]
    fn test_regenerate_depth_one() {
        let f = fixture();
        let menu = auto_menu(f.start, Some(1));
        let mut items = MenuItems::default();

        let created = regenerate(&menu, &f.pages, &mut items).unwrap();

        assert_eq!(created, Some(3));
        assert_eq!(texts(&items, menu.id), vec![("Start", 0), ("A", 1), ("B", 1)]);
    }

    #[test]
    fn test_regenerate_unbounded() {
        let f = fixture();
        let menu = auto_menu(f.start, None);
        let mut items = MenuItems::default();

        regenerate(&menu, &f.pages, &mut items).unwrap();

        assert_eq!(
            texts(&items, menu.id),
            vec![("Start", 0), ("A", 1), ("A1", 2), ("B", 1)]
        );
        let targets: Vec<Option<PageId>> = items
            .items(menu.id)
            .iter()
            .map(|i| i.target.page_id())
            .collect();
        assert_eq!(
            targets,
            vec![Some(f.start), Some(f.a), Some(f.a1), Some(f.b)]
        );
    }

    #[test]
    fn test_regenerate_depth_zero_lists_direct_children() {
        let f = fixture();
        let menu = auto_menu(f.start, Some(0));
        let mut items = MenuItems::default();

        regenerate(&menu, &f.pages, &mut items).unwrap();

        assert_eq!(texts(&items, menu.id), vec![("Start", 0), ("A", 1), ("B", 1)]);
    }

    #[test]
    fn test_regenerate_skips_inactive_children() {
        let mut f = fixture();
        let mut hidden = f.pages.get(f.a).unwrap().clone();
        hidden.status = PageStatus::Hidden;
        f.pages.replace(hidden).unwrap();
        let menu = auto_menu(f.start, None);
        let mut items = MenuItems::default();

        regenerate(&menu, &f.pages, &mut items).unwrap();

        assert_eq!(texts(&items, menu.id), vec![("Start", 0), ("B", 1)]);
    }

    #[test]
    fn test_regenerate_replaces_previous_items() {
        let f = fixture();
        let menu = auto_menu(f.start, None);
        let mut items = MenuItems::default();
        regenerate(&menu, &f.pages, &mut items).unwrap();
        let first: Vec<MenuItemId> = items.items(menu.id).iter().map(|i| i.id).collect();

        regenerate(&menu, &f.pages, &mut items).unwrap();

        assert_eq!(items.items(menu.id).len(), 4);
        assert!(items.items(menu.id).iter().all(|i| !first.contains(&i.id)));
    }

    #[test]
    fn test_regenerate_static_menu_is_skipped() {
        let f = fixture();
        let mut menu = auto_menu(f.start, None);
        menu.kind = MenuKind::Static;
        let mut items = MenuItems::default();

        assert_eq!(regenerate(&menu, &f.pages, &mut items).unwrap(), None);
        assert!(items.is_empty());
    }

    #[test]
    fn test_regenerate_without_start_page_is_skipped() {
        let f = fixture();
        let mut menu = auto_menu(f.start, None);
        menu.start_page_id = None;
        let mut items = MenuItems::default();

        assert_eq!(regenerate(&menu, &f.pages, &mut items).unwrap(), None);
    }

    #[test]
    fn test_menus_affected_by_ancestor_start_page() {
        let f = fixture();
        let nav = auto_menu(f.start, Some(1));
        let mut other = auto_menu(f.b, None);
        other.name = "other".to_owned();
        let menus = MenuRegistry::from_menus(vec![nav.clone(), other.clone()]);
        let items = MenuItems::default();

        assert_eq!(
            menus_affected_by(f.a1, &f.pages, &menus, &items),
            vec![nav.id]
        );
        assert_eq!(
            menus_affected_by(f.b, &f.pages, &menus, &items),
            vec![nav.id, other.id]
        );
    }

    #[test]
    fn test_menus_affected_by_referencing_item() {
        let f = fixture();
        let mut other = auto_menu(f.b, None);
        other.name = "other".to_owned();
        let menus = MenuRegistry::from_menus(vec![other.clone()]);
        let mut items = MenuItems::default();
        items
            .push(other.id, None, "A", MenuTarget::Page(f.a), &f.pages)
            .unwrap();

        assert_eq!(
            menus_affected_by(f.a, &f.pages, &menus, &items),
            vec![other.id]
        );
    }
}
