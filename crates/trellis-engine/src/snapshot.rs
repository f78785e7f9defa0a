//! Immutable engine state.
//!
//! A [`Snapshot`] holds every record the engine manages. Readers share the
//! current snapshot through an `Arc`; writers clone it into a draft, mutate
//! the draft and swap it in on success.

use chrono::{DateTime, Utc};

use crate::blocks::{BlockContents, TemplateRegistry};
use crate::error::ValidationErrors;
use crate::menu_items::{MenuItems, MenuNode};
use crate::menus::MenuRegistry;
use crate::model::{BlockContent, Menu, MenuItem, Page, PageId, Redirect, Template};
use crate::page_tree::PageTree;
use crate::redirect::RedirectLedger;
use crate::snapshot_store::{SNAPSHOT_VERSION, SnapshotError, StoredSnapshot};

/// Complete engine state at one commit.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub(crate) pages: PageTree,
    pub(crate) templates: TemplateRegistry,
    pub(crate) contents: BlockContents,
    pub(crate) menus: MenuRegistry,
    pub(crate) items: MenuItems,
    pub(crate) redirects: RedirectLedger,
    /// Time of the commit that produced this snapshot.
    pub(crate) clock: Option<DateTime<Utc>>,
}

impl Snapshot {
    #[must_use]
    pub fn pages(&self) -> &PageTree {
        &self.pages
    }

    #[must_use]
    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    #[must_use]
    pub fn block_contents(&self) -> &BlockContents {
        &self.contents
    }

    #[must_use]
    pub fn menus(&self) -> &MenuRegistry {
        &self.menus
    }

    #[must_use]
    pub fn menu_items(&self) -> &MenuItems {
        &self.items
    }

    #[must_use]
    pub fn redirects(&self) -> &RedirectLedger {
        &self.redirects
    }

    /// Time of the last commit, if any.
    #[must_use]
    pub fn committed_at(&self) -> Option<DateTime<Utc>> {
        self.clock
    }

    /// Nested navigation view of a menu.
    #[must_use]
    pub fn menu_nodes(&self, menu: &Menu) -> Vec<MenuNode> {
        self.items.nodes(menu.id, &self.pages)
    }

    /// Page checks that need more than the tree: the template must exist.
    pub(crate) fn validate_page(&self, page: &Page) -> ValidationErrors {
        let mut errors = self.pages.validate(page);
        if self.templates.get(page.template_id).is_none() {
            errors.add("page", "template", "must exist");
        }
        errors
    }

    /// Menus whose cached lookup may show `page`.
    pub(crate) fn menus_showing(&self, page: PageId) -> Vec<&Menu> {
        self.items
            .menus_referencing(page)
            .into_iter()
            .filter_map(|id| self.menus.get(id))
            .collect()
    }
}

impl From<&Snapshot> for StoredSnapshot {
    fn from(snapshot: &Snapshot) -> Self {
        let mut templates: Vec<Template> = snapshot.templates.iter().cloned().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));

        let mut block_contents: Vec<BlockContent> = snapshot.contents.iter().cloned().collect();
        block_contents.sort_by_key(|c| (c.page_id, c.block_id));

        let menus: Vec<Menu> = snapshot.menus.sorted().into_iter().cloned().collect();
        let menu_items: Vec<MenuItem> = menus
            .iter()
            .flat_map(|menu| snapshot.items.items(menu.id).iter().cloned())
            .collect();

        Self {
            version: SNAPSHOT_VERSION,
            committed_at: snapshot.clock,
            pages: snapshot.pages.iter().cloned().collect(),
            templates,
            block_contents,
            menus,
            menu_items,
            redirects: snapshot.redirects.iter().cloned().collect::<Vec<Redirect>>(),
        }
    }
}

impl TryFrom<StoredSnapshot> for Snapshot {
    type Error = SnapshotError;

    fn try_from(stored: StoredSnapshot) -> Result<Self, Self::Error> {
        let pages = PageTree::from_pages(stored.pages)?;
        let redirects = RedirectLedger::from_redirects(stored.redirects)
            .map_err(|e| SnapshotError::Corrupt(e.to_string()))?;

        Ok(Self {
            pages,
            templates: TemplateRegistry::from_templates(stored.templates),
            contents: BlockContents::from_contents(stored.block_contents),
            menus: MenuRegistry::from_menus(stored.menus),
            items: MenuItems::from_items(stored.menu_items),
            redirects,
            clock: stored.committed_at,
        })
    }
}
