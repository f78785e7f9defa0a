//! Keeps menu item text equal to the title of the page it points at.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::menu_items::MenuItems;
use crate::menus::MenuRegistry;
use crate::model::{MenuId, Page};

/// Retitle every item pointing at `page` whose text differs from its title.
///
/// Items keep their position. Menus owning a changed item get `updated_at`
/// set to `now` so cached listings keyed on it go stale. Returns the number of
/// items changed.
pub(crate) fn sync(
    page: &Page,
    items: &mut MenuItems,
    menus: &mut MenuRegistry,
    now: DateTime<Utc>,
) -> usize {
    let mut touched = BTreeSet::<MenuId>::new();
    let mut renamed = 0;

    for item in items
        .iter_mut()
        .filter(|item| item.target.page_id() == Some(page.id) && item.text != page.title)
    {
        item.text.clone_from(&page.title);
        touched.insert(item.menu_id);
        renamed += 1;
    }

    for id in touched {
        if let Some(menu) = menus.get_mut(id) {
            menu.updated_at = now;
        }
    }

    if renamed > 0 {
        tracing::debug!(page = %page.path, renamed, "Synchronized menu item text");
    }
    renamed
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{Menu, MenuKind, MenuTarget, PageId, PageStatus, TemplateId};
    use crate::page_tree::PageTree;

    #[test]
    fn test_sync_renames_items_in_place() {
        let mut pages = PageTree::new();
        let home = pages
            .insert(Page {
                id: PageId::generate(),
                title: "Old".to_owned(),
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
        let created_at = Utc::now() - TimeDelta::hours(1);
        let menu = Menu {
            id: MenuId::generate(),
            name: "footer".to_owned(),
            kind: MenuKind::Static,
            start_page_id: None,
            depth: None,
            updated_at: created_at,
        };
        let untouched = Menu {
            id: MenuId::generate(),
            name: "social".to_owned(),
            updated_at: created_at,
            ..menu.clone()
        };
        let mut menus = MenuRegistry::from_menus(vec![menu.clone(), untouched.clone()]);
        let mut items = MenuItems::default();
        for text in ["First", "Old", "Last"] {
            let target = if text == "Old" {
                MenuTarget::Page(home)
            } else {
                MenuTarget::External(format!("https://example.com/{text}"))
            };
            items.push(menu.id, None, text, target, &pages).unwrap();
        }
        items
            .push(
                untouched.id,
                None,
                "Elsewhere",
                MenuTarget::External("https://example.org".to_owned()),
                &pages,
            )
            .unwrap();
        items.renumber(menu.id);

        let mut renamed_page = pages.get(home).unwrap().clone();
        renamed_page.title = "New".to_owned();
        pages.replace(renamed_page.clone()).unwrap();
        let now = Utc::now();

        let renamed = sync(&renamed_page, &mut items, &mut menus, now);

        assert_eq!(renamed, 1);
        let texts: Vec<&str> = items.items(menu.id).iter().map(|i| i.text.as_str()).collect();
        assert_eq!(texts, vec!["First", "New", "Last"]);
        assert_eq!(menus.get(menu.id).unwrap().updated_at, now);
        assert_eq!(menus.get(untouched.id).unwrap().updated_at, created_at);

        // Nothing left to change
        assert_eq!(sync(&renamed_page, &mut items, &mut menus, now), 0);
    }
}
