/**
 * Case Study Routes
 */
use std::sync::Arc;

use super::resource::{require_slug, require_text, trim, trim_opt, Resource};
use crate::db::models::{CaseStudy, CaseStudyDraft, CaseStudyPatch};
use crate::error::ApiResult;
use crate::store::{Repository, Store};

fn clean_results(results: &mut Vec<String>) {
    results.retain_mut(|r| {
        *r = r.trim().to_string();
        !r.is_empty()
    });
}

impl Resource for CaseStudy {
    const PUBLIC_READ: bool = true;

    fn repo(store: &Store) -> &Arc<dyn Repository<Self>> {
        &store.case_studies
    }

    fn validate_draft(draft: &mut CaseStudyDraft) -> ApiResult<()> {
        trim(&mut draft.title);
        trim(&mut draft.slug);
        trim(&mut draft.client_name);
        trim_opt(&mut draft.image_url);
        clean_results(&mut draft.results);
        require_text("title", &draft.title)?;
        require_text("client_name", &draft.client_name)?;
        require_slug(&draft.slug)
    }

    fn validate_patch(&self, patch: &mut CaseStudyPatch) -> ApiResult<()> {
        if let Some(title) = &patch.title {
            require_text("title", title)?;
        }
        if let Some(slug) = &patch.slug {
            require_slug(slug)?;
        }
        if let Some(results) = patch.results.as_mut() {
            clean_results(results);
        }
        Ok(())
    }

    fn is_public(&self) -> bool {
        self.published
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_cleans_results_and_checks_slug() {
        let mut draft = CaseStudyDraft {
            title: "Payroll overhaul".to_string(),
            slug: "payroll-overhaul".to_string(),
            client_name: "Kilimanjaro Bank".to_string(),
            industry: String::new(),
            category: String::new(),
            challenge: String::new(),
            solution: String::new(),
            results: vec![" Zero findings ".to_string(), "  ".to_string()],
            image_url: None,
            published: true,
            featured: false,
            sort_order: 1,
        };
        CaseStudy::validate_draft(&mut draft).unwrap();
        assert_eq!(draft.results, vec!["Zero findings".to_string()]);

        draft.slug = "Payroll Overhaul".to_string();
        assert!(CaseStudy::validate_draft(&mut draft).is_err());
    }
}
