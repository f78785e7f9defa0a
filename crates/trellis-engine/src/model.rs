//! Records managed by the engine and the inputs that create or change them.
//!
//! Tree-position fields (`depth`, `lft`, `rgt`, `children_count`) on [`Page`]
//! and [`MenuItem`] are derived: the engine recomputes them after every
//! structural change and ignores caller-provided values.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            /// Underlying UUID.
            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

id_type!(
    /// Identifier of a [`Page`].
    PageId
);
id_type!(
    /// Identifier of a [`Template`].
    TemplateId
);
id_type!(
    /// Identifier of a [`Block`].
    BlockId
);
id_type!(
    /// Identifier of a [`BlockContent`].
    BlockContentId
);
id_type!(
    /// Identifier of a [`Menu`].
    MenuId
);
id_type!(
    /// Identifier of a [`MenuItem`].
    MenuItemId
);
id_type!(
    /// Identifier of a [`Redirect`].
    RedirectId
);

/// Publication status of a page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    /// Published and listed in auto menus.
    #[default]
    Active,
    /// Work in progress.
    Draft,
    /// Reachable by path but left out of navigation.
    Hidden,
    /// Retired.
    Archived,
}

impl PageStatus {
    /// Lowercase name as stored.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Draft => "draft",
            Self::Hidden => "hidden",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the page tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub title: String,
    /// Absolute URL path, always starting with `/`.
    pub path: String,
    pub status: PageStatus,
    pub template_id: TemplateId,
    /// `None` only for the root page (`/`).
    pub parent_id: Option<PageId>,
    /// Number of ancestors.
    pub depth: u32,
    /// Left nested-set marker.
    pub lft: u32,
    /// Right nested-set marker.
    pub rgt: u32,
    pub children_count: u32,
    /// Incremented on every save; used for optimistic concurrency checks.
    pub lock_version: u64,
    pub updated_at: DateTime<Utc>,
}

/// Kind of content slot a block declares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    PlainText,
    RichText,
    Image,
    File,
    Iframe,
    Code,
}

/// A named content slot declared by a template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub template_id: TemplateId,
    /// Unique within the template.
    pub key: String,
    pub kind: BlockKind,
}

/// A page layout declaring a fixed set of block slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    /// Slots in declaration order.
    pub blocks: Vec<Block>,
}

impl Template {
    /// Ids of every declared slot, in declaration order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks.iter().map(|block| block.id)
    }
}

/// The value of one block slot for one page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockContent {
    pub id: BlockContentId,
    pub page_id: PageId,
    pub block_id: BlockId,
    /// Opaque editor payload; `null` until the content layer fills it in.
    pub content: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// Whether a menu is edited by hand or derived from the page tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuKind {
    #[default]
    Static,
    Auto,
}

impl fmt::Display for MenuKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Static => "static",
            Self::Auto => "auto",
        })
    }
}

/// A navigation menu.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    pub id: MenuId,
    pub name: String,
    pub kind: MenuKind,
    /// Required for auto menus.
    pub start_page_id: Option<PageId>,
    /// Levels below the start page to include; `None` means unbounded.
    pub depth: Option<u32>,
    pub updated_at: DateTime<Utc>,
}

/// Where a menu item points.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuTarget {
    Page(PageId),
    External(String),
}

impl MenuTarget {
    /// Referenced page, if any.
    #[must_use]
    pub fn page_id(&self) -> Option<PageId> {
        match self {
            Self::Page(id) => Some(*id),
            Self::External(_) => None,
        }
    }
}

/// A node of a menu's item tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub menu_id: MenuId,
    pub parent_id: Option<MenuItemId>,
    pub text: String,
    pub target: MenuTarget,
    pub depth: u32,
    pub lft: u32,
    pub rgt: u32,
}

/// A recorded path mapping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub id: RedirectId,
    pub origin_path: String,
    pub destination_path: String,
    pub status_code: u16,
    pub visits: u64,
    pub origin_page_id: Option<PageId>,
    pub destination_page_id: Option<PageId>,
    pub created_at: DateTime<Utc>,
    pub last_visited_at: Option<DateTime<Utc>>,
}

/// Outcome of resolving a path against the redirect ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RedirectTarget {
    pub destination_path: String,
    pub status_code: u16,
}

/// Input for creating a page.
#[derive(Clone, Debug)]
pub struct NewPage {
    pub title: String,
    pub path: String,
    pub status: PageStatus,
    pub template_id: TemplateId,
    pub parent_id: Option<PageId>,
}

/// Attribute changes for an existing page. `None` leaves a field unchanged.
///
/// Parent changes go through [`Engine::move_page`](crate::Engine::move_page).
#[derive(Clone, Debug, Default)]
pub struct PageUpdate {
    pub title: Option<String>,
    pub path: Option<String>,
    pub status: Option<PageStatus>,
    pub template_id: Option<TemplateId>,
    /// Reject the update unless the stored `lock_version` equals this value.
    pub expected_version: Option<u64>,
}

/// Input for registering a template.
#[derive(Clone, Debug)]
pub struct NewTemplate {
    pub name: String,
    /// `(key, kind)` pairs in declaration order.
    pub blocks: Vec<(String, BlockKind)>,
}

/// Input for creating a menu.
#[derive(Clone, Debug)]
pub struct NewMenu {
    pub name: String,
    pub kind: MenuKind,
    pub start_page_id: Option<PageId>,
    pub depth: Option<u32>,
}

/// Attribute changes for an existing menu. `None` leaves a field unchanged.
#[derive(Clone, Debug, Default)]
pub struct MenuUpdate {
    pub name: Option<String>,
    pub kind: Option<MenuKind>,
    pub start_page_id: Option<Option<PageId>>,
    pub depth: Option<Option<u32>>,
}

/// Input for adding an item to a static menu.
#[derive(Clone, Debug)]
pub struct NewMenuItem {
    pub text: String,
    pub target: MenuTarget,
    pub parent_id: Option<MenuItemId>,
}

/// Input for recording a redirect by hand.
#[derive(Clone, Debug)]
pub struct NewRedirect {
    pub origin_path: String,
    pub destination_path: String,
    /// Defaults to the configured status when `None`.
    pub status_code: Option<u16>,
}
