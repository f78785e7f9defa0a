//! Transactional write surface and cached reads.
//!
//! # Thread Safety
//!
//! `Engine` is designed for concurrent access:
//! - `snapshot()` returns `Arc<Snapshot>` with minimal locking (just Arc clone)
//! - Writes are serialized by `write_lock`; each one clones the current
//!   snapshot into a draft, runs the mutation and the synchronization
//!   pipeline on it, persists it, and only then swaps it in
//! - A failed write drops its draft, so readers never observe partial state
//!
//! # Example
//!
//! ```ignore
//! use trellis_cache::NullCache;
//! use trellis_engine::{Engine, EngineConfig, NewPage, NewTemplate, PageStatus};
//!
//! let engine = Engine::new(EngineConfig::default(), &NullCache)?;
//! let template = engine.register_template(NewTemplate { name: "page".into(), blocks: vec![] })?;
//! let home = engine.create_page(NewPage {
//!     title: "Home".into(),
//!     path: "/".into(),
//!     status: PageStatus::Active,
//!     template_id: template.id,
//!     parent_id: None,
//! })?;
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use trellis_cache::Cache;

use crate::error::{SaveError, TreeError, ValidationErrors};
use crate::menu_cache::MenuCache;
use crate::menu_items::MenuNode;
use crate::model::{
    Block, BlockContent, BlockKind, Menu, MenuId, MenuItem, MenuKind, MenuUpdate, NewMenu,
    NewMenuItem, NewPage, NewRedirect, NewTemplate, Page, PageId, PageUpdate, Redirect,
    RedirectId, RedirectTarget, Template, TemplateId,
};
use crate::page_tree::BreadcrumbItem;
use crate::pipeline::{self, PageSave, SyncContext, SyncReport};
use crate::snapshot::Snapshot;
use crate::snapshot_store::{
    FileSnapshotStore, NullSnapshotStore, SnapshotError, SnapshotStore, StoredSnapshot,
};

/// Configuration for [`Engine`].
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Snapshot file. If `None`, state lives in memory only.
    pub snapshot_path: Option<PathBuf>,
    /// Status code of redirects recorded for page path changes.
    pub default_redirect_status: u16,
    /// Maximum number of redirects followed by one resolution.
    pub max_redirect_hops: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            default_redirect_status: 301,
            max_redirect_hops: 2,
        }
    }
}

/// Result of a committed page save.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PageSaved {
    /// The page as committed.
    pub page: Page,
    /// Derived changes made by the synchronization pipeline.
    pub sync: SyncReport,
}

/// Page hierarchy engine.
///
/// # Thread Safety
///
/// This struct is designed for concurrent access without external locking:
/// - Uses internal `RwLock<Arc<Snapshot>>` for the current state snapshot
/// - Uses `Mutex<()>` for serializing writes
pub struct Engine {
    config: EngineConfig,
    store: Box<dyn SnapshotStore>,
    menu_cache: MenuCache,
    /// Mutex for serializing write transactions.
    write_lock: Mutex<()>,
    /// Current state snapshot (atomically swappable).
    current: RwLock<Arc<Snapshot>>,
}

impl Engine {
    /// Create an engine, loading the configured snapshot file if it exists.
    ///
    /// # Arguments
    ///
    /// * `config` - Engine configuration
    /// * `cache` - Backend for menu fragment caches
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the snapshot file exists but cannot be
    /// read or does not describe a valid page tree.
    pub fn new(config: EngineConfig, cache: &dyn Cache) -> Result<Self, SnapshotError> {
        let store: Box<dyn SnapshotStore> = match &config.snapshot_path {
            Some(path) => Box::new(FileSnapshotStore::new(path.clone())),
            None => Box::new(NullSnapshotStore),
        };
        Self::with_store(config, cache, store)
    }

    /// Create an engine over an explicit snapshot store.
    ///
    /// `config.snapshot_path` is ignored.
    pub fn with_store(
        config: EngineConfig,
        cache: &dyn Cache,
        store: Box<dyn SnapshotStore>,
    ) -> Result<Self, SnapshotError> {
        let snapshot = match store.load()? {
            Some(stored) => Snapshot::try_from(stored)?,
            None => Snapshot::default(),
        };
        tracing::info!(
            pages = snapshot.pages.len(),
            menus = snapshot.menus.len(),
            redirects = snapshot.redirects.len(),
            "Loaded engine state"
        );

        Ok(Self {
            config,
            store,
            menu_cache: MenuCache::new(cache),
            write_lock: Mutex::new(()),
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get current state snapshot.
    ///
    /// Returns an `Arc<Snapshot>` that can be used without holding any lock.
    ///
    /// # Panics
    ///
    /// Panics if the internal `RwLock` is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap())
    }

    /// Run one write transaction.
    ///
    /// `apply` mutates a draft copy of the current snapshot. The draft is
    /// persisted and swapped in only if `apply` and persistence succeed.
    ///
    /// # Panics
    ///
    /// Panics if internal locks are poisoned.
    fn write<T>(
        &self,
        operation: &'static str,
        apply: impl FnOnce(&mut Snapshot, &SyncContext<'_>) -> Result<T, SaveError>,
    ) -> Result<(T, Arc<Snapshot>), SaveError> {
        let _guard = self.write_lock.lock().unwrap();

        let current = self.snapshot();
        let now = next_tick(current.clock);
        let ctx = SyncContext {
            now,
            settings: &self.config,
        };

        let mut draft = (*current).clone();
        draft.clock = Some(now);

        let value = match apply(&mut draft, &ctx) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(operation, error = %e, "Save rejected, changes rolled back");
                return Err(e);
            }
        };

        if let Err(e) = self.store.save(&StoredSnapshot::from(&draft)) {
            tracing::warn!(operation, error = %e, "Failed to persist, changes rolled back");
            return Err(e.into());
        }

        let committed = Arc::new(draft);
        *self.current.write().unwrap() = Arc::clone(&committed);
        self.menu_cache
            .invalidate_committed(&current.menus, &committed.menus);

        tracing::info!(operation, at = %now, "Committed");
        Ok((value, committed))
    }

    /// Run a page write and the synchronization pipeline.
    fn save_page(
        &self,
        operation: &'static str,
        apply: impl FnOnce(&mut Snapshot, &SyncContext<'_>) -> Result<(PageId, Option<String>), SaveError>,
    ) -> Result<PageSaved, SaveError> {
        let (saved, committed) = self.write(operation, |draft, ctx| {
            let (id, previous_path) = apply(draft, ctx)?;
            let save = PageSave {
                page: id,
                previous_path: previous_path.as_deref(),
            };
            let sync = pipeline::on_page_saved(draft, save, ctx)?;
            let page = draft
                .pages
                .get(id)
                .cloned()
                .ok_or(SaveError::PageNotFound(id))?;
            Ok(PageSaved { page, sync })
        })?;

        // Page paths show up in cached navigation trees of menus linking to it
        for menu in committed.menus_showing(saved.page.id) {
            self.menu_cache.invalidate(menu);
        }
        Ok(saved)
    }

    // ========================================================================
    // Templates
    // ========================================================================

    /// Register a template with its block slots.
    pub fn register_template(&self, new: NewTemplate) -> Result<Template, SaveError> {
        let (template, _) = self.write("register_template", |draft, _| {
            let id = draft.templates.register(new)?;
            draft
                .templates
                .get(id)
                .cloned()
                .ok_or(SaveError::TemplateNotFound(id))
        })?;
        Ok(template)
    }

    /// Declare an additional block slot on a template.
    ///
    /// Pages using the template receive a content for it on their next save.
    pub fn add_block(&self, template: TemplateId, key: &str, kind: BlockKind) -> Result<Block, SaveError> {
        let (block, _) = self.write("add_block", |draft, _| {
            let id = draft
                .templates
                .add_block(template, key, kind)?
                .ok_or(SaveError::TemplateNotFound(template))?;
            draft
                .templates
                .get(template)
                .and_then(|t| t.blocks.iter().find(|b| b.id == id))
                .cloned()
                .ok_or(SaveError::TemplateNotFound(template))
        })?;
        Ok(block)
    }

    // ========================================================================
    // Pages
    // ========================================================================

    /// Create a page as the last child of its parent.
    pub fn create_page(&self, new: NewPage) -> Result<PageSaved, SaveError> {
        self.save_page("create_page", |draft, ctx| {
            let page = Page {
                id: PageId::generate(),
                title: new.title,
                path: new.path,
                status: new.status,
                template_id: new.template_id,
                parent_id: new.parent_id,
                depth: 0,
                lft: 0,
                rgt: 0,
                children_count: 0,
                lock_version: 0,
                updated_at: ctx.now,
            };
            draft.validate_page(&page).into_result()?;
            let id = draft.pages.insert(page)?;
            Ok((id, None))
        })
    }

    /// Change a page's attributes.
    ///
    /// A path change leaves a redirect from the old path behind. Descendant
    /// paths are not rewritten.
    pub fn update_page(&self, id: PageId, changes: PageUpdate) -> Result<PageSaved, SaveError> {
        self.save_page("update_page", |draft, ctx| {
            let existing = draft.pages.get(id).ok_or(SaveError::PageNotFound(id))?;
            if let Some(expected) = changes.expected_version
                && expected != existing.lock_version
            {
                return Err(SaveError::Conflict {
                    id,
                    expected,
                    found: existing.lock_version,
                });
            }

            let mut page = existing.clone();
            if let Some(title) = changes.title {
                page.title = title;
            }
            if let Some(path) = changes.path {
                page.path = path;
            }
            if let Some(status) = changes.status {
                page.status = status;
            }
            if let Some(template_id) = changes.template_id {
                page.template_id = template_id;
            }
            page.lock_version += 1;
            page.updated_at = ctx.now;

            draft.validate_page(&page).into_result()?;
            let previous = draft.pages.replace(page)?;
            Ok((id, Some(previous.path)))
        })
    }

    /// Move a page and its subtree under `new_parent`.
    ///
    /// The page lands at `position` among its new siblings, or last if
    /// `position` is `None`.
    pub fn move_page(
        &self,
        id: PageId,
        new_parent: PageId,
        position: Option<usize>,
    ) -> Result<PageSaved, SaveError> {
        self.save_page("move_page", |draft, ctx| {
            let path = draft
                .pages
                .get(id)
                .map(|page| page.path.clone())
                .ok_or(SaveError::PageNotFound(id))?;
            draft.pages.move_page(id, new_parent, position)?;
            draft.pages.touch(id, ctx.now);
            Ok((id, Some(path)))
        })
    }

    // ========================================================================
    // Menus
    // ========================================================================

    /// Create a menu. Auto menus are generated immediately.
    pub fn create_menu(&self, new: NewMenu) -> Result<Menu, SaveError> {
        let (menu, _) = self.write("create_menu", |draft, ctx| {
            let menu = Menu {
                id: MenuId::generate(),
                name: new.name,
                kind: new.kind,
                start_page_id: new.start_page_id,
                depth: new.depth,
                updated_at: ctx.now,
            };
            let id = menu.id;
            draft.menus.save(menu, &draft.pages)?;
            pipeline::regenerate_menu(draft, id, ctx)?;
            draft.menus.get(id).cloned().ok_or(SaveError::MenuNotFound(id))
        })?;
        Ok(menu)
    }

    /// Change a menu's attributes.
    ///
    /// An auto menu is regenerated when its kind, start page or depth
    /// changed; other changes keep its items.
    pub fn update_menu(&self, id: MenuId, changes: MenuUpdate) -> Result<Menu, SaveError> {
        let (menu, _) = self.write("update_menu", |draft, ctx| {
            let existing = draft.menus.get(id).cloned().ok_or(SaveError::MenuNotFound(id))?;

            let mut menu = existing.clone();
            if let Some(name) = changes.name {
                menu.name = name;
            }
            if let Some(kind) = changes.kind {
                menu.kind = kind;
            }
            if let Some(start_page_id) = changes.start_page_id {
                menu.start_page_id = start_page_id;
            }
            if let Some(depth) = changes.depth {
                menu.depth = depth;
            }
            menu.updated_at = ctx.now;

            let structural = menu.kind != existing.kind
                || menu.start_page_id != existing.start_page_id
                || menu.depth != existing.depth;
            draft.menus.save(menu, &draft.pages)?;
            if structural {
                pipeline::regenerate_menu(draft, id, ctx)?;
            }
            draft.menus.get(id).cloned().ok_or(SaveError::MenuNotFound(id))
        })?;
        Ok(menu)
    }

    /// Rebuild an auto menu from the page tree.
    ///
    /// Returns the number of items created.
    pub fn regenerate_menu(&self, id: MenuId) -> Result<usize, SaveError> {
        let (created, _) = self.write("regenerate_menu", |draft, ctx| {
            let menu = draft.menus.get(id).ok_or(SaveError::MenuNotFound(id))?;
            if menu.kind != MenuKind::Auto {
                return Err(ValidationErrors::single("menu", "kind", "must be auto to regenerate").into());
            }
            pipeline::regenerate_menu(draft, id, ctx)?
                .ok_or_else(|| ValidationErrors::single("menu", "start_page", "must exist").into())
        })?;
        Ok(created)
    }

    /// Append an item to a static menu.
    pub fn add_menu_item(&self, menu: MenuId, new: NewMenuItem) -> Result<MenuItem, SaveError> {
        let (item, _) = self.write("add_menu_item", |draft, ctx| {
            let kind = draft
                .menus
                .get(menu)
                .map(|m| m.kind)
                .ok_or(SaveError::MenuNotFound(menu))?;
            if kind == MenuKind::Auto {
                return Err(ValidationErrors::single(
                    "menu_item",
                    "menu",
                    "cannot be edited by hand for auto menus",
                )
                .into());
            }

            let id = draft
                .items
                .push(menu, new.parent_id, &new.text, new.target, &draft.pages)?;
            draft.items.renumber(menu);
            if let Some(owner) = draft.menus.get_mut(menu) {
                owner.updated_at = ctx.now;
            }
            draft
                .items
                .items(menu)
                .iter()
                .find(|item| item.id == id)
                .cloned()
                .ok_or(SaveError::MenuNotFound(menu))
        })?;
        Ok(item)
    }

    /// Flat item listing of a menu in `lft` order.
    ///
    /// Served from the `menu_items` cache while the menu is unchanged.
    /// Returns `None` for unknown menus.
    #[must_use]
    pub fn menu_items_for(&self, menu: MenuId) -> Option<Vec<MenuItem>> {
        let snapshot = self.snapshot();
        let menu = snapshot.menus.get(menu)?;
        Some(
            self.menu_cache
                .items(menu, || snapshot.items.items(menu.id).to_vec()),
        )
    }

    /// Nested navigation tree of a menu looked up by name.
    ///
    /// Served from the `menus` lookup cache while no newer snapshot has been
    /// committed.
    #[must_use]
    pub fn menu_tree(&self, name: &str) -> Option<Vec<MenuNode>> {
        let snapshot = self.snapshot();
        let menu = snapshot.menus.get_by_name(name)?;
        Some(
            self.menu_cache
                .tree(menu, snapshot.committed_at(), || snapshot.menu_nodes(menu)),
        )
    }

    // ========================================================================
    // Redirects
    // ========================================================================

    /// Record a redirect by hand.
    ///
    /// Origin and destination are linked to the pages currently at those
    /// paths, if any.
    pub fn create_redirect(&self, new: NewRedirect) -> Result<Redirect, SaveError> {
        let (redirect, _) = self.write("create_redirect", |draft, ctx| {
            let redirect = Redirect {
                id: RedirectId::generate(),
                origin_page_id: draft.pages.get_by_path(&new.origin_path).map(|p| p.id),
                destination_page_id: draft.pages.get_by_path(&new.destination_path).map(|p| p.id),
                origin_path: new.origin_path,
                destination_path: new.destination_path,
                status_code: new
                    .status_code
                    .unwrap_or(ctx.settings.default_redirect_status),
                visits: 0,
                created_at: ctx.now,
                last_visited_at: None,
            };
            Ok(draft.redirects.record(redirect)?.clone())
        })?;
        Ok(redirect)
    }

    /// Resolve an incoming path against the redirect ledger.
    ///
    /// Visits are counted on every redirect followed. If the updated counters
    /// cannot be persisted the redirect is still answered.
    #[must_use]
    pub fn resolve_redirect(&self, path: &str) -> Option<RedirectTarget> {
        let snapshot = self.snapshot();
        if !snapshot.redirects.contains(path) {
            return None;
        }

        let resolved = self.write("resolve_redirect", |draft, ctx| {
            Ok(draft
                .redirects
                .resolve(path, ctx.settings.max_redirect_hops, ctx.now))
        });
        match resolved {
            Ok((target, _)) => target,
            Err(e) => {
                tracing::warn!(path, error = %e, "Redirect visits not recorded");
                let mut ledger = snapshot.redirects.clone();
                ledger.resolve(path, self.config.max_redirect_hops, Utc::now())
            }
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    #[must_use]
    pub fn page(&self, id: PageId) -> Option<Page> {
        self.snapshot().pages.get(id).cloned()
    }

    #[must_use]
    pub fn page_by_path(&self, path: &str) -> Option<Page> {
        self.snapshot().pages.get_by_path(path).cloned()
    }

    /// Children of a page in sibling order.
    #[must_use]
    pub fn children(&self, id: PageId) -> Vec<Page> {
        self.snapshot().pages.children(id).cloned().collect()
    }

    #[must_use]
    pub fn breadcrumbs(&self, id: PageId) -> Vec<BreadcrumbItem> {
        self.snapshot().pages.breadcrumbs(id)
    }

    /// Block contents of a page in provisioning order.
    #[must_use]
    pub fn block_contents(&self, page: PageId) -> Vec<BlockContent> {
        self.snapshot().contents.for_page(page).to_vec()
    }

    #[must_use]
    pub fn menu(&self, id: MenuId) -> Option<Menu> {
        self.snapshot().menus.get(id).cloned()
    }

    #[must_use]
    pub fn menu_by_name(&self, name: &str) -> Option<Menu> {
        self.snapshot().menus.get_by_name(name).cloned()
    }

    /// All redirects in the order they were recorded.
    #[must_use]
    pub fn redirects(&self) -> Vec<Redirect> {
        self.snapshot().redirects.iter().cloned().collect()
    }

    /// Check the page tree invariants of the current snapshot.
    pub fn verify(&self) -> Result<(), TreeError> {
        self.snapshot().pages.verify()
    }
}

/// Commit time strictly after `last`, so `updated_at` etags always change.
fn next_tick(last: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match last {
        Some(last) if now <= last => last + TimeDelta::microseconds(1),
        _ => now,
    }
}
