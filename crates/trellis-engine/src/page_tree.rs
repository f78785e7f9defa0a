//! Page hierarchy with nested-set positional markers.
//!
//! Pages are stored in an arena keyed by [`PageId`] with materialized, ordered
//! child lists. This provides:
//! - O(1) lookups by id and by path via `path_index`
//! - O(1) ancestor/descendant checks via `lft`/`rgt` range comparison
//! - O(d) breadcrumb building where d is the page depth
//!
//! Every structural mutation (insert, move) goes through this module and ends
//! with a full renumbering, so `lft`, `rgt`, `depth` and `children_count` are
//! always consistent with the child lists.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{TreeError, ValidationErrors};
use crate::model::{Page, PageId};
use crate::nested_set;

/// Path of the single root page.
pub const ROOT_PATH: &str = "/";

/// Breadcrumb navigation item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BreadcrumbItem {
    /// Display title.
    pub title: String,
    /// Link target path.
    pub path: String,
}

/// Ordered page hierarchy.
///
/// Exactly one page (path `/`) has no parent; every other page hangs below
/// it. Sibling order is the insertion order unless changed by
/// [`move_page`](Self::move_page).
#[derive(Clone, Debug, Default)]
pub struct PageTree {
    pages: HashMap<PageId, Page>,
    children: HashMap<PageId, Vec<PageId>>,
    root: Option<PageId>,
    path_index: HashMap<String, PageId>,
    /// Page ids in `lft` order.
    order: Vec<PageId>,
}

impl PageTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a tree from stored pages.
    ///
    /// Sibling order is taken from the stored `lft` markers; markers, depths
    /// and child counts are then recomputed and the result verified.
    ///
    /// # Errors
    ///
    /// Returns a [`TreeError`] if the pages do not form a single rooted tree
    /// with unique paths.
    pub fn from_pages(mut pages: Vec<Page>) -> Result<Self, TreeError> {
        // Parents always precede their children in lft order
        pages.sort_by_key(|page| page.lft);

        let mut tree = Self::new();
        for page in pages {
            if tree.path_index.contains_key(&page.path) {
                return Err(TreeError::DuplicatePath(page.path));
            }
            match page.parent_id {
                None => {
                    if let Some(root) = tree.root {
                        return Err(TreeError::MultipleRoots(root, page.id));
                    }
                    tree.root = Some(page.id);
                }
                Some(parent) => {
                    let Some(siblings) = tree.children.get_mut(&parent) else {
                        return Err(TreeError::MissingParent {
                            page: page.id,
                            parent,
                        });
                    };
                    siblings.push(page.id);
                }
            }
            tree.children.insert(page.id, Vec::new());
            tree.path_index.insert(page.path.clone(), page.id);
            tree.pages.insert(page.id, page);
        }

        tree.renumber();
        tree.verify()?;
        Ok(tree)
    }

    /// Number of pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether the tree has no pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Get page by id.
    #[must_use]
    pub fn get(&self, id: PageId) -> Option<&Page> {
        self.pages.get(&id)
    }

    /// Get page by path (e.g., "/", "/about/team").
    #[must_use]
    pub fn get_by_path(&self, path: &str) -> Option<&Page> {
        self.path_index.get(path).and_then(|id| self.pages.get(id))
    }

    /// The root page, if any page exists.
    #[must_use]
    pub fn root(&self) -> Option<&Page> {
        self.root.and_then(|id| self.pages.get(&id))
    }

    /// Children of a page in sibling order.
    pub fn children(&self, id: PageId) -> impl Iterator<Item = &Page> + '_ {
        self.children
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|child| self.pages.get(child))
    }

    /// Whether a page has at least one child.
    #[must_use]
    pub fn has_children(&self, id: PageId) -> bool {
        self.children.get(&id).is_some_and(|kids| !kids.is_empty())
    }

    /// Ancestors of a page, root first. The page itself is not included.
    #[must_use]
    pub fn ancestors(&self, id: PageId) -> Vec<&Page> {
        let mut ancestors = Vec::new();
        let mut current = self.pages.get(&id).and_then(|page| page.parent_id);
        while let Some(parent_id) = current {
            let Some(parent) = self.pages.get(&parent_id) else {
                break;
            };
            ancestors.push(parent);
            current = parent.parent_id;
        }
        ancestors.reverse();
        ancestors
    }

    /// Whether `id` lies strictly inside the subtree of `ancestor`.
    #[must_use]
    pub fn is_descendant_of(&self, id: PageId, ancestor: PageId) -> bool {
        match (self.pages.get(&id), self.pages.get(&ancestor)) {
            (Some(page), Some(anc)) => anc.lft < page.lft && page.rgt < anc.rgt,
            _ => false,
        }
    }

    /// All pages in pre-order (ascending `lft`).
    pub fn iter(&self) -> impl Iterator<Item = &Page> + '_ {
        self.order.iter().filter_map(|id| self.pages.get(id))
    }

    /// Build breadcrumbs for a page: its ancestors, root first.
    ///
    /// Returns an empty list for the root page and for unknown ids.
    #[must_use]
    pub fn breadcrumbs(&self, id: PageId) -> Vec<BreadcrumbItem> {
        self.ancestors(id)
            .into_iter()
            .map(|page| BreadcrumbItem {
                title: page.title.clone(),
                path: page.path.clone(),
            })
            .collect()
    }

    /// Check a candidate page record against the tree's attribute rules.
    ///
    /// The candidate may be new or a changed copy of a stored page; its own
    /// path does not count as a duplicate.
    #[must_use]
    pub(crate) fn validate(&self, page: &Page) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        if page.title.trim().is_empty() {
            errors.add("page", "title", "can't be blank");
        }

        if page.path.is_empty() {
            errors.add("page", "path", "can't be blank");
        } else if !page.path.starts_with('/') {
            errors.add("page", "path", "must start with /");
        } else if self
            .path_index
            .get(&page.path)
            .is_some_and(|&other| other != page.id)
        {
            errors.add("page", "path", "has already been taken");
        }

        match page.parent_id {
            None if page.path != ROOT_PATH => errors.add("page", "parent", "must exist"),
            None => {}
            Some(_) if page.path == ROOT_PATH => {
                errors.add("page", "parent", "must be blank for the root page");
            }
            Some(parent) if !self.pages.contains_key(&parent) => {
                errors.add("page", "parent", "must exist");
            }
            Some(_) => {}
        }

        errors
    }

    /// Insert a new page as the last child of its parent.
    pub(crate) fn insert(&mut self, page: Page) -> Result<PageId, ValidationErrors> {
        if self.pages.contains_key(&page.id) {
            return Err(ValidationErrors::single("page", "id", "has already been taken"));
        }
        self.validate(&page).into_result()?;

        let id = page.id;
        match page.parent_id {
            Some(parent) => self.children.entry(parent).or_default().push(id),
            None => self.root = Some(id),
        }
        self.children.insert(id, Vec::new());
        self.path_index.insert(page.path.clone(), id);
        self.pages.insert(id, page);

        self.renumber();
        Ok(id)
    }

    /// Replace the attributes of a stored page, returning the previous record.
    ///
    /// Tree-position fields of `page` are ignored; the parent must be
    /// unchanged (use [`move_page`](Self::move_page) for that).
    pub(crate) fn replace(&mut self, mut page: Page) -> Result<Page, ValidationErrors> {
        let Some(existing) = self.pages.get(&page.id) else {
            return Err(ValidationErrors::single("page", "id", "must exist"));
        };
        if existing.parent_id != page.parent_id {
            return Err(ValidationErrors::single(
                "page",
                "parent",
                "can only change through a move",
            ));
        }
        self.validate(&page).into_result()?;

        page.depth = existing.depth;
        page.lft = existing.lft;
        page.rgt = existing.rgt;
        page.children_count = existing.children_count;

        if existing.path != page.path {
            self.path_index.remove(&existing.path);
            self.path_index.insert(page.path.clone(), page.id);
        }

        let previous = self.pages.insert(page.id, page);
        previous.ok_or_else(|| ValidationErrors::single("page", "id", "must exist"))
    }

    /// Move a page (with its subtree) under `new_parent`.
    ///
    /// The page is placed at `position` among its new siblings, or last when
    /// `position` is `None` or past the end. Moving within the same parent
    /// reorders siblings.
    pub(crate) fn move_page(
        &mut self,
        id: PageId,
        new_parent: PageId,
        position: Option<usize>,
    ) -> Result<(), ValidationErrors> {
        let Some(page) = self.pages.get(&id) else {
            return Err(ValidationErrors::single("page", "id", "must exist"));
        };

        let mut errors = ValidationErrors::new();
        let old_parent = page.parent_id;
        if old_parent.is_none() {
            errors.add("page", "parent", "cannot be changed for the root page");
        }
        if !self.pages.contains_key(&new_parent) {
            errors.add("page", "parent", "must exist");
        } else if new_parent == id || self.is_descendant_of(new_parent, id) {
            errors.add(
                "page",
                "parent",
                "cannot be the page itself or one of its descendants",
            );
        }
        errors.into_result()?;

        if let Some(siblings) = old_parent.and_then(|parent| self.children.get_mut(&parent)) {
            siblings.retain(|&child| child != id);
        }
        let siblings = self.children.entry(new_parent).or_default();
        let index = position.map_or(siblings.len(), |p| p.min(siblings.len()));
        siblings.insert(index, id);

        if let Some(page) = self.pages.get_mut(&id) {
            page.parent_id = Some(new_parent);
        }

        self.renumber();
        Ok(())
    }

    /// Record a save of `id` that changed no attributes.
    pub(crate) fn touch(&mut self, id: PageId, now: DateTime<Utc>) {
        if let Some(page) = self.pages.get_mut(&id) {
            page.lock_version += 1;
            page.updated_at = now;
        }
    }

    /// Recompute `lft`, `rgt`, `depth` and `children_count` from child lists.
    fn renumber(&mut self) {
        let roots: Vec<PageId> = self.root.into_iter().collect();
        let children = &self.children;
        let numbered = nested_set::number(&roots, |id| {
            children.get(&id).cloned().unwrap_or_default()
        });

        self.order.clear();
        for (id, interval) in numbered {
            let count = children.get(&id).map_or(0, Vec::len);
            if let Some(page) = self.pages.get_mut(&id) {
                page.lft = interval.lft;
                page.rgt = interval.rgt;
                page.depth = interval.depth;
                page.children_count = u32::try_from(count).unwrap_or(u32::MAX);
            }
            self.order.push(id);
        }
    }

    /// Check every structural invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn verify(&self) -> Result<(), TreeError> {
        if self.pages.is_empty() {
            return Ok(());
        }

        let root_id = self.root.ok_or(TreeError::MissingRoot)?;
        let root = self.pages.get(&root_id).ok_or(TreeError::MissingRoot)?;
        if root.path != ROOT_PATH || root.parent_id.is_some() {
            return Err(TreeError::Invariant {
                page: root_id,
                reason: "root page must have path `/` and no parent".to_owned(),
            });
        }
        if self.order.len() != self.pages.len() {
            return Err(TreeError::Invariant {
                page: root_id,
                reason: format!(
                    "{} pages are unreachable from the root",
                    self.pages.len() - self.order.len()
                ),
            });
        }

        let mut paths = HashSet::new();
        for page in self.pages.values() {
            if !paths.insert(page.path.as_str()) {
                return Err(TreeError::DuplicatePath(page.path.clone()));
            }
            if self.path_index.get(&page.path) != Some(&page.id) {
                return Err(invariant(page, "path index is out of date"));
            }
            if page.lft >= page.rgt {
                return Err(invariant(page, "lft must be less than rgt"));
            }

            match page.parent_id {
                None if page.id != root_id => {
                    return Err(TreeError::MultipleRoots(root_id, page.id));
                }
                None => {}
                Some(parent_id) => {
                    let parent = self.pages.get(&parent_id).ok_or(TreeError::MissingParent {
                        page: page.id,
                        parent: parent_id,
                    })?;
                    if !(parent.lft < page.lft && page.rgt < parent.rgt) {
                        return Err(invariant(page, "markers are not nested inside the parent's"));
                    }
                    if page.depth != parent.depth + 1 {
                        return Err(invariant(page, "depth does not match ancestor count"));
                    }
                }
            }

            let count = self.children.get(&page.id).map_or(0, Vec::len);
            if usize::try_from(page.children_count).ok() != Some(count) {
                return Err(invariant(page, "children_count is out of date"));
            }
        }

        Ok(())
    }
}

fn invariant(page: &Page, reason: &str) -> TreeError {
    TreeError::Invariant {
        page: page.id,
        reason: reason.to_owned(),
    }
}
