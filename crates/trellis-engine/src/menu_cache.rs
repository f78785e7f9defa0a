//! Fragment caching for menu reads.
//!
//! Two independent buckets:
//! - `menu_items`: flat item listing keyed by menu id, validated by an etag
//!   derived from `menu.updated_at`. Any commit that changes a menu bumps that
//!   timestamp, so stale listings are never served.
//! - `menus`: nested navigation tree keyed by `{name}/{id}`, validated by the
//!   commit clock of the snapshot it was built from. Page paths and titles feed
//!   the tree, so a fill from an older snapshot must never match a reader on a
//!   newer one. Entries are also deleted whenever the menu is committed.

use chrono::{DateTime, SecondsFormat, Utc};
use trellis_cache::{Cache, CacheBucket, CacheBucketExt};

use crate::menu_items::MenuNode;
use crate::menus::MenuRegistry;
use crate::model::{Menu, MenuId, MenuItem};

const ITEMS_BUCKET: &str = "menu_items";
const LOOKUP_BUCKET: &str = "menus";

pub(crate) struct MenuCache {
    items: Box<dyn CacheBucket>,
    lookup: Box<dyn CacheBucket>,
}

impl MenuCache {
    pub(crate) fn new(cache: &dyn Cache) -> Self {
        Self {
            items: cache.bucket(ITEMS_BUCKET),
            lookup: cache.bucket(LOOKUP_BUCKET),
        }
    }

    /// Cached item listing of `menu`, computed with `load` on a miss.
    pub(crate) fn items(&self, menu: &Menu, load: impl FnOnce() -> Vec<MenuItem>) -> Vec<MenuItem> {
        self.items
            .get_or_insert_json(&menu.id.to_string(), &etag(menu), load)
    }

    /// Cached navigation tree of `menu` as of the snapshot committed at
    /// `committed_at`, computed with `load` on a miss.
    pub(crate) fn tree(
        &self,
        menu: &Menu,
        committed_at: Option<DateTime<Utc>>,
        load: impl FnOnce() -> Vec<MenuNode>,
    ) -> Vec<MenuNode> {
        self.lookup.get_or_insert_json(
            &lookup_key(&menu.name, menu.id),
            &commit_etag(committed_at),
            load,
        )
    }

    /// Drop lookup entries of every menu committed between `before` and
    /// `after`.
    ///
    /// A menu counts as committed if it is new or its `updated_at` changed.
    /// Renamed menus lose the entries under both names.
    pub(crate) fn invalidate_committed(&self, before: &MenuRegistry, after: &MenuRegistry) {
        for menu in after.iter() {
            let previous = before.get(menu.id);
            if previous.is_some_and(|prev| prev.updated_at == menu.updated_at) {
                continue;
            }

            self.invalidate(menu);
            if let Some(prev) = previous
                && prev.name != menu.name
            {
                self.lookup.invalidate(&lookup_key(&prev.name, menu.id));
            }
        }
    }

    /// Drop the lookup entry of one menu.
    pub(crate) fn invalidate(&self, menu: &Menu) {
        self.lookup.invalidate(&lookup_key(&menu.name, menu.id));
        tracing::debug!(menu = %menu.name, "Invalidated menu lookup cache");
    }
}

fn etag(menu: &Menu) -> String {
    menu.updated_at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

// Never empty: an empty etag would match any stored entry.
fn commit_etag(committed_at: Option<DateTime<Utc>>) -> String {
    committed_at.map_or_else(
        || "uncommitted".to_owned(),
        |at| at.to_rfc3339_opts(SecondsFormat::Nanos, true),
    )
}

fn lookup_key(name: &str, id: MenuId) -> String {
    format!("{name}/{id}")
}
