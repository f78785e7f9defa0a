//! Templates and per-page block contents.
//!
//! A [`Template`] declares a fixed set of block slots. Every page using the
//! template owns one [`BlockContent`] per slot; [`BlockContents::provision`]
//! creates the missing ones after each page save and never removes contents
//! whose slot disappeared.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::ValidationErrors;
use crate::model::{
    Block, BlockContent, BlockContentId, BlockId, BlockKind, NewTemplate, Page, PageId, Template,
    TemplateId,
};

/// Registered templates keyed by id.
#[derive(Clone, Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<TemplateId, Template>,
}

impl TemplateRegistry {
    pub(crate) fn from_templates(templates: Vec<Template>) -> Self {
        Self {
            templates: templates.into_iter().map(|t| (t.id, t)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: TemplateId) -> Option<&Template> {
        self.templates.get(&id)
    }

    /// Find a template by exact name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Template> {
        self.templates.values().find(|t| t.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Templates sorted by name.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Template> {
        let mut templates: Vec<&Template> = self.templates.values().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        templates
    }

    /// Register a new template with its block slots.
    pub(crate) fn register(&mut self, new: NewTemplate) -> Result<TemplateId, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = new.name.trim();
        if name.is_empty() {
            errors.add("template", "name", "can't be blank");
        } else if self.get_by_name(name).is_some() {
            errors.add("template", "name", "has already been taken");
        }

        let mut keys = HashSet::new();
        for (key, _) in &new.blocks {
            check_block_key(key, &mut keys, &mut errors);
        }
        errors.into_result()?;

        let id = TemplateId::generate();
        let blocks = new
            .blocks
            .into_iter()
            .map(|(key, kind)| Block {
                id: BlockId::generate(),
                template_id: id,
                key,
                kind,
            })
            .collect();
        self.templates.insert(
            id,
            Template {
                id,
                name: name.to_owned(),
                blocks,
            },
        );
        Ok(id)
    }

    /// Declare an additional slot on an existing template.
    ///
    /// Returns `Ok(None)` if the template does not exist.
    pub(crate) fn add_block(
        &mut self,
        template: TemplateId,
        key: &str,
        kind: BlockKind,
    ) -> Result<Option<BlockId>, ValidationErrors> {
        let Some(template) = self.templates.get_mut(&template) else {
            return Ok(None);
        };

        let mut keys: HashSet<&str> = template.blocks.iter().map(|b| b.key.as_str()).collect();
        let mut errors = ValidationErrors::new();
        check_block_key(key, &mut keys, &mut errors);
        errors.into_result()?;

        let id = BlockId::generate();
        template.blocks.push(Block {
            id,
            template_id: template.id,
            key: key.to_owned(),
            kind,
        });
        Ok(Some(id))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }
}

fn check_block_key<'a>(key: &'a str, seen: &mut HashSet<&'a str>, errors: &mut ValidationErrors) {
    if key.trim().is_empty() {
        errors.add("block", "key", "can't be blank");
    } else if !seen.insert(key) {
        errors.add("block", "key", "has already been taken");
    }
}

/// Block contents grouped by page.
#[derive(Clone, Debug, Default)]
pub struct BlockContents {
    by_page: HashMap<PageId, Vec<BlockContent>>,
}

impl BlockContents {
    /// Rebuild from stored contents, keeping the first content per (page, block).
    pub(crate) fn from_contents(contents: Vec<BlockContent>) -> Self {
        let mut this = Self::default();
        for content in contents {
            let slots = this.by_page.entry(content.page_id).or_default();
            if !slots.iter().any(|c| c.block_id == content.block_id) {
                slots.push(content);
            }
        }
        this
    }

    /// Contents of a page in provisioning order.
    #[must_use]
    pub fn for_page(&self, page: PageId) -> &[BlockContent] {
        self.by_page.get(&page).map_or(&[], Vec::as_slice)
    }

    /// Content of one slot of a page.
    #[must_use]
    pub fn get(&self, page: PageId, block: BlockId) -> Option<&BlockContent> {
        self.for_page(page).iter().find(|c| c.block_id == block)
    }

    /// Total number of contents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_page.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &BlockContent> {
        self.by_page.values().flatten()
    }

    /// Create an empty content for every slot of `template` the page lacks.
    ///
    /// Idempotent: a second call with the same template creates nothing.
    /// Returns the number of contents created.
    pub(crate) fn provision(&mut self, page: &Page, template: &Template, now: DateTime<Utc>) -> usize {
        let slots = self.by_page.entry(page.id).or_default();
        let present: HashSet<BlockId> = slots.iter().map(|c| c.block_id).collect();

        let before = slots.len();
        slots.extend(
            template
                .block_ids()
                .filter(|id| !present.contains(id))
                .map(|block_id| BlockContent {
                    id: BlockContentId::generate(),
                    page_id: page.id,
                    block_id,
                    content: serde_json::Value::Null,
                    updated_at: now,
                }),
        );
        slots.len() - before
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::PageStatus;

    fn page_with(template_id: TemplateId) -> Page {
        Page {
            id: PageId::generate(),
            title: "Home".to_owned(),
            path: "/".to_owned(),
            status: PageStatus::Active,
            template_id,
            parent_id: None,
            depth: 0,
            lft: 1,
            rgt: 2,
            children_count: 0,
            lock_version: 0,
            updated_at: Utc::now(),
        }
    }

    fn registry_with_template() -> (TemplateRegistry, TemplateId) {
        let mut registry = TemplateRegistry::default();
        let id = registry
            .register(NewTemplate {
                name: "article".to_owned(),
                blocks: vec![
                    ("body".to_owned(), BlockKind::RichText),
                    ("hero".to_owned(), BlockKind::Image),
                ],
            })
            .unwrap();
        (registry, id)
    }

    #[test]
    fn test_register_template() {
        let (registry, id) = registry_with_template();

        let template = registry.get(id).unwrap();
        let keys: Vec<&str> = template.blocks.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["body", "hero"]);
        assert!(template.blocks.iter().all(|b| b.template_id == id));
        assert_eq!(registry.get_by_name("article").map(|t| t.id), Some(id));
    }

    #[test]
    fn test_register_duplicate_name_rejected() {
        let (mut registry, _) = registry_with_template();

        let err = registry
            .register(NewTemplate {
                name: "article".to_owned(),
                blocks: Vec::new(),
            })
            .unwrap_err();

        assert!(err.has("template", "name"));
    }

    #[test]
    fn test_register_duplicate_block_key_rejected() {
        let mut registry = TemplateRegistry::default();

        let err = registry
            .register(NewTemplate {
                name: "landing".to_owned(),
                blocks: vec![
                    ("body".to_owned(), BlockKind::RichText),
                    ("body".to_owned(), BlockKind::PlainText),
                    (String::new(), BlockKind::Code),
                ],
            })
            .unwrap_err();

        assert_eq!(err.len(), 2);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_add_block_rejects_existing_key() {
        let (mut registry, id) = registry_with_template();

        assert!(registry.add_block(id, "body", BlockKind::Code).is_err());
        assert!(registry.add_block(id, "footer", BlockKind::Code).unwrap().is_some());
        assert_eq!(registry.get(id).unwrap().blocks.len(), 3);
    }

    #[test]
    fn test_add_block_unknown_template() {
        let mut registry = TemplateRegistry::default();

        let added = registry
            .add_block(TemplateId::generate(), "body", BlockKind::Code)
            .unwrap();

        assert_eq!(added, None);
    }

    #[test]
    fn test_provision_creates_empty_contents() {
        let (registry, id) = registry_with_template();
        let template = registry.get(id).unwrap();
        let page = page_with(id);
        let mut contents = BlockContents::default();

        let created = contents.provision(&page, template, Utc::now());

        assert_eq!(created, 2);
        assert!(
            contents
                .for_page(page.id)
                .iter()
                .all(|c| c.content.is_null())
        );
    }

    #[test]
    fn test_provision_is_idempotent() {
        let (registry, id) = registry_with_template();
        let template = registry.get(id).unwrap();
        let page = page_with(id);
        let mut contents = BlockContents::default();

        contents.provision(&page, template, Utc::now());
        let first: Vec<BlockContentId> = contents.for_page(page.id).iter().map(|c| c.id).collect();
        let created = contents.provision(&page, template, Utc::now());

        assert_eq!(created, 0);
        let second: Vec<BlockContentId> = contents.for_page(page.id).iter().map(|c| c.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_provision_keeps_orphaned_contents() {
        let (mut registry, id) = registry_with_template();
        let page = page_with(id);
        let mut contents = BlockContents::default();
        contents.provision(&page, registry.get(id).unwrap(), Utc::now());

        let other = registry
            .register(NewTemplate {
                name: "plain".to_owned(),
                blocks: vec![("text".to_owned(), BlockKind::PlainText)],
            })
            .unwrap();
        let created = contents.provision(&page, registry.get(other).unwrap(), Utc::now());

        assert_eq!(created, 1);
        assert_eq!(contents.for_page(page.id).len(), 3);
    }

    #[test]
    fn test_from_contents_drops_duplicate_slots() {
        let page = PageId::generate();
        let block = BlockId::generate();
        let content = |value: &str| BlockContent {
            id: BlockContentId::generate(),
            page_id: page,
            block_id: block,
            content: serde_json::Value::String(value.to_owned()),
            updated_at: Utc::now(),
        };

        let contents = BlockContents::from_contents(vec![content("first"), content("second")]);

        assert_eq!(contents.len(), 1);
        assert_eq!(
            contents.get(page, block).map(|c| c.content.clone()),
            Some(serde_json::Value::String("first".to_owned()))
        );
    }
}
