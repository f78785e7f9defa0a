//! Post-save synchronization of derived structures.
//!
//! Every page create, update and move runs [`on_page_saved`] on the draft
//! snapshot before it is committed. Stages run in a fixed order:
//!
//! 1. Provision block contents for the page's template
//! 2. Retitle menu items pointing at the page
//! 3. Regenerate auto menus whose scope contains the page
//! 4. Record a redirect if the page's path changed
//!
//! The first failing stage aborts the save; the caller drops the draft.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auto_menu;
use crate::engine::EngineConfig;
use crate::error::SaveError;
use crate::model::{MenuId, PageId, RedirectId};
use crate::snapshot::Snapshot;
use crate::text_sync;

/// Inputs shared by every synchronization step of one write.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SyncContext<'a> {
    /// Commit time; strictly greater than the previous commit's.
    pub(crate) now: DateTime<Utc>,
    pub(crate) settings: &'a EngineConfig,
}

/// What the pipeline changed for one page save.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Empty block contents created for missing template slots.
    pub block_contents_created: usize,
    /// Menu items whose text was replaced with the page title.
    pub menu_items_renamed: usize,
    /// Auto menus rebuilt, in name order.
    pub menus_regenerated: Vec<MenuId>,
    /// Redirect recorded for a path change.
    pub redirect: Option<RedirectId>,
}

/// A page save to synchronize.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PageSave<'a> {
    pub(crate) page: PageId,
    /// Path before the save; `None` for newly created pages.
    pub(crate) previous_path: Option<&'a str>,
}

/// Run every synchronization stage for a saved page.
pub(crate) fn on_page_saved(
    draft: &mut Snapshot,
    save: PageSave<'_>,
    ctx: &SyncContext<'_>,
) -> Result<SyncReport, SaveError> {
    let page = draft
        .pages
        .get(save.page)
        .cloned()
        .ok_or(SaveError::PageNotFound(save.page))?;
    let mut report = SyncReport::default();

    let template = draft
        .templates
        .get(page.template_id)
        .ok_or(SaveError::TemplateNotFound(page.template_id))?;
    report.block_contents_created = draft.contents.provision(&page, template, ctx.now);
    tracing::debug!(page = %page.path, created = report.block_contents_created, "Provisioned block contents");

    report.menu_items_renamed = text_sync::sync(&page, &mut draft.items, &mut draft.menus, ctx.now);

    for menu in auto_menu::menus_affected_by(page.id, &draft.pages, &draft.menus, &draft.items) {
        if regenerate_menu(draft, menu, ctx)?.is_some() {
            report.menus_regenerated.push(menu);
        }
    }

    if let Some(previous) = save.previous_path
        && previous != page.path
    {
        let redirect = draft.redirects.record_path_change(
            &page,
            previous,
            ctx.settings.default_redirect_status,
            ctx.now,
        )?;
        report.redirect = Some(redirect.id);
    }

    Ok(report)
}

/// Rebuild an auto menu's items and mark the menu as changed.
///
/// Returns the number of items created, or `None` if the menu was skipped.
pub(crate) fn regenerate_menu(
    draft: &mut Snapshot,
    id: MenuId,
    ctx: &SyncContext<'_>,
) -> Result<Option<usize>, SaveError> {
    let menu = draft.menus.get(id).cloned().ok_or(SaveError::MenuNotFound(id))?;

    let created = auto_menu::regenerate(&menu, &draft.pages, &mut draft.items)?;
    if created.is_some()
        && let Some(menu) = draft.menus.get_mut(id)
    {
        menu.updated_at = ctx.now;
    }
    Ok(created)
}
