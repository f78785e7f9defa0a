//! Menu records.

use std::collections::HashMap;

use crate::error::ValidationErrors;
use crate::model::{Menu, MenuId, MenuKind};
use crate::page_tree::PageTree;

/// Menus keyed by id.
#[derive(Clone, Debug, Default)]
pub struct MenuRegistry {
    menus: HashMap<MenuId, Menu>,
}

impl MenuRegistry {
    pub(crate) fn from_menus(menus: Vec<Menu>) -> Self {
        Self {
            menus: menus.into_iter().map(|m| (m.id, m)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: MenuId) -> Option<&Menu> {
        self.menus.get(&id)
    }

    /// Find a menu by exact name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Menu> {
        self.menus.values().find(|m| m.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.menus.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }

    /// Menus sorted by name.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Menu> {
        let mut menus: Vec<&Menu> = self.menus.values().collect();
        menus.sort_by(|a, b| a.name.cmp(&b.name));
        menus
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Menu> {
        self.menus.values()
    }

    pub(crate) fn get_mut(&mut self, id: MenuId) -> Option<&mut Menu> {
        self.menus.get_mut(&id)
    }

    /// Check a new or changed menu record.
    pub(crate) fn validate(&self, menu: &Menu, pages: &PageTree) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if menu.name.trim().is_empty() {
            errors.add("menu", "name", "can't be blank");
        } else if self
            .get_by_name(&menu.name)
            .is_some_and(|other| other.id != menu.id)
        {
            errors.add("menu", "name", "has already been taken");
        }

        match (menu.kind, menu.start_page_id) {
            (MenuKind::Auto, None) => {
                errors.add("menu", "start_page", "can't be blank for auto menus");
            }
            (MenuKind::Auto, Some(start)) if pages.get(start).is_none() => {
                errors.add("menu", "start_page", "must exist");
            }
            // Static menus may keep a start page around; it is never used
            (MenuKind::Auto | MenuKind::Static, _) => {}
        }

        errors
    }

    /// Insert or replace a menu after validation.
    pub(crate) fn save(&mut self, menu: Menu, pages: &PageTree) -> Result<(), ValidationErrors> {
        self.validate(&menu, pages).into_result()?;
        self.menus.insert(menu.id, menu);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::PageId;

    fn menu(name: &str, kind: MenuKind, start: Option<PageId>) -> Menu {
        Menu {
            id: MenuId::generate(),
            name: name.to_owned(),
            kind,
            start_page_id: start,
            depth: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_save_static_menu() {
        let mut menus = MenuRegistry::default();
        let footer = menu("footer", MenuKind::Static, None);
        let id = footer.id;

        menus.save(footer, &PageTree::new()).unwrap();

        assert_eq!(menus.get_by_name("footer").map(|m| m.id), Some(id));
    }

    #[test]
    fn test_blank_name_rejected() {
        let menus = MenuRegistry::default();

        let errors = menus.validate(&menu(" ", MenuKind::Static, None), &PageTree::new());

        assert!(errors.has("menu", "name"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut menus = MenuRegistry::default();
        menus
            .save(menu("main", MenuKind::Static, None), &PageTree::new())
            .unwrap();

        let errors = menus.validate(&menu("main", MenuKind::Static, None), &PageTree::new());

        assert!(errors.has("menu", "name"));
    }

    #[test]
    fn test_resaving_same_menu_keeps_name() {
        let mut menus = MenuRegistry::default();
        let main = menu("main", MenuKind::Static, None);
        menus.save(main.clone(), &PageTree::new()).unwrap();

        assert!(menus.validate(&main, &PageTree::new()).is_empty());
    }

    #[test]
    fn test_auto_menu_requires_start_page() {
        let menus = MenuRegistry::default();

        let blank = menus.validate(&menu("nav", MenuKind::Auto, None), &PageTree::new());
        let missing = menus.validate(
            &menu("nav", MenuKind::Auto, Some(PageId::generate())),
            &PageTree::new(),
        );

        assert!(blank.has("menu", "start_page"));
        assert_eq!(missing.iter().next().unwrap().message, "must exist");
    }
}
