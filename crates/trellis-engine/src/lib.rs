//! Page hierarchy and derived-structure synchronization for Trellis.
//!
//! This crate provides:
//! - [`Engine`]: Transactional page, menu and redirect writes over immutable
//!   snapshots
//! - [`PageTree`]: Ordered page hierarchy with nested-set markers
//! - Auto menus rebuilt from page subtrees, menu item text kept in sync with
//!   page titles, and a redirect ledger fed by page path changes
//!
//! Every page save runs the same pipeline on a draft snapshot: block contents
//! are provisioned, menu item text is synchronized, affected auto menus are
//! regenerated, and a redirect is recorded if the path changed. If any stage
//! fails the whole save is rolled back.
//!
//! # Quick Start
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::time::Duration;
//! use trellis_cache::MemoryCache;
//! use trellis_engine::{
//!     BlockKind, Engine, EngineConfig, MenuKind, NewMenu, NewPage, NewTemplate, PageStatus,
//!     PageUpdate,
//! };
//!
//! let cache = MemoryCache::new().with_ttl(Duration::from_secs(600));
//! let engine = Engine::new(EngineConfig::default(), &cache)?;
//! let template = engine.register_template(NewTemplate {
//!     name: "page".into(),
//!     blocks: vec![("body".into(), BlockKind::RichText)],
//! })?;
//! let home = engine.create_page(NewPage {
//!     title: "Home".into(),
//!     path: "/".into(),
//!     status: PageStatus::Active,
//!     template_id: template.id,
//!     parent_id: None,
//! })?;
//! let about = engine.create_page(NewPage {
//!     title: "About".into(),
//!     path: "/about".into(),
//!     status: PageStatus::Active,
//!     template_id: template.id,
//!     parent_id: Some(home.page.id),
//! })?;
//! engine.create_menu(NewMenu {
//!     name: "main".into(),
//!     kind: MenuKind::Auto,
//!     start_page_id: Some(home.page.id),
//!     depth: None,
//! })?;
//!
//! engine.update_page(about.page.id, PageUpdate {
//!     path: Some("/about-us".into()),
//!     ..PageUpdate::default()
//! })?;
//!
//! let target = engine.resolve_redirect("/about").unwrap();
//! assert_eq!(target.destination_path, "/about-us");
//! assert_eq!(engine.menu_tree("main").unwrap()[0].children.len(), 1);
//! # Ok(())
//! # }
//! ```

mod auto_menu;
mod blocks;
mod engine;
mod error;
mod menu_cache;
mod menu_items;
mod menus;
mod model;
mod nested_set;
mod page_tree;
mod pipeline;
mod redirect;
mod snapshot;
mod snapshot_store;
mod text_sync;

pub use blocks::{BlockContents, TemplateRegistry};
pub use engine::{Engine, EngineConfig, PageSaved};
pub use error::{FieldError, SaveError, TreeError, ValidationErrors};
pub use menu_items::{MenuItems, MenuNode};
pub use menus::MenuRegistry;
pub use model::{
    Block, BlockContent, BlockContentId, BlockId, BlockKind, Menu, MenuId, MenuItem, MenuItemId,
    MenuKind, MenuTarget, MenuUpdate, NewMenu, NewMenuItem, NewPage, NewRedirect, NewTemplate,
    Page, PageId, PageStatus, PageUpdate, Redirect, RedirectId, RedirectTarget, Template,
    TemplateId,
};
pub use page_tree::{BreadcrumbItem, PageTree, ROOT_PATH};
pub use pipeline::SyncReport;
pub use redirect::RedirectLedger;
pub use snapshot::Snapshot;
pub use snapshot_store::{
    FileSnapshotStore, NullSnapshotStore, SNAPSHOT_VERSION, SnapshotError, SnapshotStore,
    StoredSnapshot,
};
