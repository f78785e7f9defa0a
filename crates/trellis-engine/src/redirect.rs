//! Redirect ledger: old-to-new path mappings and their resolution.
//!
//! Redirects are append-only. Apart from the visit counter nothing is
//! changed after a redirect is recorded.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::ValidationErrors;
use crate::model::{Page, Redirect, RedirectId, RedirectTarget};

/// All recorded redirects, indexed by origin path.
#[derive(Clone, Debug, Default)]
pub struct RedirectLedger {
    redirects: Vec<Redirect>,
    by_origin: HashMap<String, usize>,
}

impl RedirectLedger {
    /// Rebuild from stored redirects.
    ///
    /// Fails if two redirects share an origin.
    pub(crate) fn from_redirects(redirects: Vec<Redirect>) -> Result<Self, ValidationErrors> {
        let mut ledger = Self::default();
        for redirect in redirects {
            if ledger.by_origin.contains_key(&redirect.origin_path) {
                return Err(ValidationErrors::single(
                    "redirect",
                    "origin_path",
                    format!("`{}` has already been taken", redirect.origin_path),
                ));
            }
            ledger.push(redirect);
        }
        Ok(ledger)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.redirects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.redirects.is_empty()
    }

    /// Redirects in the order they were recorded.
    pub fn iter(&self) -> impl Iterator<Item = &Redirect> {
        self.redirects.iter()
    }

    /// Redirect whose origin is exactly `path`.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&Redirect> {
        self.by_origin.get(path).map(|&index| &self.redirects[index])
    }

    /// Whether any redirect starts at `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.by_origin.contains_key(path)
    }

    /// Check a redirect record before it is recorded.
    pub(crate) fn validate(&self, redirect: &Redirect) -> ValidationErrors {
        let mut errors = ValidationErrors::new();

        check_path(&redirect.origin_path, "origin_path", &mut errors);
        check_path(&redirect.destination_path, "destination_path", &mut errors);
        if self.contains(&redirect.origin_path) {
            errors.add("redirect", "origin_path", "has already been taken");
        }
        if redirect.origin_path == redirect.destination_path {
            errors.add("redirect", "destination_path", "must differ from the origin");
        }
        if !(300..400).contains(&redirect.status_code) {
            errors.add("redirect", "status_code", "must be a 3xx status");
        }

        errors
    }

    /// Validate and append a redirect.
    pub(crate) fn record(&mut self, redirect: Redirect) -> Result<&Redirect, ValidationErrors> {
        self.validate(&redirect).into_result()?;
        let index = self.push(redirect);
        Ok(&self.redirects[index])
    }

    /// Record the redirect left behind when `page` moved away from `old_path`.
    pub(crate) fn record_path_change(
        &mut self,
        page: &Page,
        old_path: &str,
        status_code: u16,
        now: DateTime<Utc>,
    ) -> Result<&Redirect, ValidationErrors> {
        let redirect = Redirect {
            id: RedirectId::generate(),
            origin_path: old_path.to_owned(),
            destination_path: page.path.clone(),
            status_code,
            visits: 0,
            origin_page_id: Some(page.id),
            destination_page_id: Some(page.id),
            created_at: now,
            last_visited_at: None,
        };
        let recorded = self.record(redirect)?;
        tracing::info!(
            from = %recorded.origin_path,
            to = %recorded.destination_path,
            status = recorded.status_code,
            "Recorded redirect for moved page"
        );
        Ok(recorded)
    }

    /// Resolve `path`, counting a visit on every redirect followed.
    ///
    /// Follows at most `max_hops` redirects and stops at the first one already
    /// followed in this resolution. Answers with the destination and status of
    /// the last redirect followed, or `None` if no redirect starts at `path`.
    pub(crate) fn resolve(
        &mut self,
        path: &str,
        max_hops: u32,
        now: DateTime<Utc>,
    ) -> Option<RedirectTarget> {
        let mut seen = HashSet::new();
        let mut current = path.to_owned();
        let mut target = None;

        for _ in 0..max_hops {
            let Some(&index) = self.by_origin.get(&current) else {
                break;
            };
            if !seen.insert(index) {
                tracing::warn!(path, at = %current, "Redirect cycle detected");
                break;
            }

            let redirect = &mut self.redirects[index];
            redirect.visits += 1;
            redirect.last_visited_at = Some(now);
            current.clone_from(&redirect.destination_path);
            target = Some(RedirectTarget {
                destination_path: redirect.destination_path.clone(),
                status_code: redirect.status_code,
            });
        }

        target
    }

    fn push(&mut self, redirect: Redirect) -> usize {
        let index = self.redirects.len();
        self.by_origin.insert(redirect.origin_path.clone(), index);
        self.redirects.push(redirect);
        index
    }
}

fn check_path(path: &str, field: &'static str, errors: &mut ValidationErrors) {
    if path.trim().is_empty() {
        errors.add("redirect", field, "can't be blank");
    } else if !path.starts_with('/') {
        errors.add("redirect", field, "must start with /");
    }
}
