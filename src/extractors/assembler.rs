// src/extractors/assembler.rs
use crate::course::Course;
use crate::extractors::document::{text_of, CoursePage, Searchable};
use crate::extractors::fields::dates::{extract_application_dates, extract_start_dates};
use crate::extractors::fields::language::extract_language_requirements;
use crate::extractors::fields::locations::extract_locations;
use crate::extractors::fields::modules::extract_modules;
use crate::extractors::fields::text::{
    extract_about, extract_description, extract_entry_requirements, extract_study_level, extract_title,
    extract_university_title,
};
use crate::extractors::fields::tuition::extract_tuitions;
use crate::extractors::fields::{soft, FieldContext};
use crate::extractors::patterns::recognize_qualifications;
use crate::extractors::reference::ReferenceCache;
use crate::rules::SiteRules;

/// Records produced from one page, plus the count of drafts that failed
/// validation.
#[derive(Debug, Default)]
pub struct AssemblyReport {
    pub courses: Vec<Course>,
    pub dropped: usize,
}

/// Runs every field extractor once per qualification a page advertises.
pub struct CourseAssembler<'a> {
    site: &'a SiteRules,
    cache: &'a ReferenceCache,
}

impl<'a> CourseAssembler<'a> {
    pub fn new(site: &'a SiteRules, cache: &'a ReferenceCache) -> Self {
        Self { site, cache }
    }

    /// Degree tokens for the page: the listing's hint, then the listing
    /// title, then the page heading, then the configured qualification
    /// sources. The first text that yields any token decides.
    pub fn qualifications(&self, page: &CoursePage) -> Vec<String> {
        let fields = &self.site.fields;
        let html = &page.html;

        let routed = [page.request.qualification.clone(), page.request.title.clone()];
        let heading = fields.title.first(&html).map(text_of);
        let sources = fields.qualification_source.iter().map(|css| {
            html.select_all(css.selector())
                .into_iter()
                .map(text_of)
                .collect::<Vec<_>>()
                .join(" ")
        });

        routed
            .into_iter()
            .flatten()
            .chain(heading)
            .chain(sources)
            .map(|text| recognize_qualifications(&text))
            .find(|found| !found.is_empty())
            .unwrap_or_default()
    }

    pub fn assemble(&self, page: &CoursePage) -> AssemblyReport {
        let mut report = AssemblyReport::default();

        let qualifications = self.qualifications(page);
        if qualifications.is_empty() {
            tracing::info!("No recognised qualification at {}; no records emitted", page.url());
            return report;
        }
        let multiple = qualifications.len() > 1;

        for qualification in &qualifications {
            let ctx = FieldContext {
                page,
                site: self.site,
                cache: self.cache,
                qualification,
                multiple,
            };
            match draft(&ctx).validate() {
                Ok(course) => report.courses.push(course),
                Err(err) => {
                    tracing::warn!("Dropping {} record for {}: {}", qualification, page.url(), err);
                    report.dropped += 1;
                }
            }
        }

        tracing::debug!(
            "{}: {} record(s) for [{}]",
            page.url(),
            report.courses.len(),
            qualifications.join(", ")
        );
        report
    }
}

fn draft(ctx: &FieldContext) -> Course {
    Course {
        link: Some(ctx.page.url().to_string()),
        title: soft("title", extract_title(ctx)),
        study_level: extract_study_level(ctx),
        qualification: Some(ctx.qualification.to_string()),
        university_title: soft("university_title", extract_university_title(ctx)),
        locations: soft("locations", extract_locations(ctx)),
        description: soft("description", extract_description(ctx)),
        about: soft("about", extract_about(ctx)),
        start_dates: soft("start_dates", extract_start_dates(ctx)),
        application_dates: soft("application_dates", extract_application_dates(ctx)),
        entry_requirements: soft("entry_requirements", extract_entry_requirements(ctx)),
        language_requirements: soft("language_requirements", extract_language_requirements(ctx)),
        modules: soft("modules", extract_modules(ctx)),
        tuitions: soft("tuitions", extract_tuitions(ctx)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{Date, LanguageRequirement, Location, Tuition};
    use crate::crawl::models::CourseRequest;

    const PAGE: &str = r##"
        <html><body>
        <h1 class="course-title">Data Science MSc / PGDip</h1>
        <div class="overview"><p>Learn to work with data.</p></div>
        <div class="key-details">
          <a class="accordion-link">MSc Data Science</a>
          <table><tr><td>Start date</td><td>Sep 2024</td></tr>
                 <tr><td>Location</td><td>Bay Campus</td></tr></table>
          <a class="accordion-link">PGDip Data Science</a>
          <table><tr><td>Start date</td><td>Jan 2025</td></tr>
                 <tr><td>Location</td><td>Singleton Campus</td></tr></table>
        </div>
        <div class="fees">
          <a class="accordion-link">MSc Data Science</a>
          <div class="card"><div class="card-header"><a>Full Time 1 Year</a></div>
            <table><tr><td>£12,500</td></tr></table></div>
          <a class="accordion-link">PGDip Data Science</a>
          <div class="card"><div class="card-header"><a>Full Time 9 Months</a></div>
            <table><tr><td>£8,000</td></tr></table></div>
        </div>
        <section id="entry-requirements"><p>IELTS 6.5 overall.</p></section>
        </body></html>
    "##;

    const RULES: &str = r##"{
        "site_id": "demo",
        "university_title": "Demo University",
        "study_level": "Postgraduate",
        "fields": {
            "qualification_labels": "a.accordion-link",
            "title": ["h1.course-title"],
            "description": [".overview p"],
            "entry_requirements": ["#entry-requirements"],
            "locations": { "items": [".key-details td"], "label_keywords": ["location"] },
            "start_dates": { "items": [".key-details td"] },
            "application_dates": { "sections": ["#application-deadlines"] },
            "language": { "sections": ["#entry-requirements"] },
            "tuitions": {
                "categories": [{ "rows": ".fees .card", "label": "UK" }],
                "header": ".card-header a",
                "fee_items": "td"
            }
        }
    }"##;

    fn page() -> CoursePage {
        CoursePage::parse(PAGE, CourseRequest::new("https://example.ac.uk/data-science"))
    }

    #[test]
    fn test_one_record_per_qualification_without_leakage() {
        let site = SiteRules::from_json(RULES).unwrap();
        let cache = ReferenceCache::new();
        let page = page();
        let assembler = CourseAssembler::new(&site, &cache);

        assert_eq!(assembler.qualifications(&page), vec!["MSc", "PGDip"]);

        let report = assembler.assemble(&page);
        assert_eq!(report.dropped, 0);
        assert_eq!(report.courses.len(), 2);

        let msc = &report.courses[0];
        assert_eq!(msc.qualification.as_deref(), Some("MSc"));
        assert_eq!(msc.title, "Data Science MSc / PGDip");
        assert_eq!(msc.university_title, "Demo University");
        assert_eq!(msc.study_level.as_deref(), Some("Postgraduate"));
        assert_eq!(msc.link.as_deref(), Some("https://example.ac.uk/data-science"));
        assert_eq!(msc.locations, vec![Location::new("Bay Campus")]);
        assert_eq!(msc.start_dates, vec![Date::new("Sep 2024")]);
        assert_eq!(msc.language_requirements, vec![LanguageRequirement::english("IELTS", "6.5")]);
        assert_eq!(
            msc.tuitions,
            vec![Tuition {
                study_mode: Some("Full-time".to_string()),
                duration: Some("1 Year".to_string()),
                student_category: Some("UK".to_string()),
                fee: Some("£12,500".to_string()),
            }]
        );
        assert!(msc.application_dates.is_empty());
        assert!(msc.modules.is_empty());

        let pgdip = &report.courses[1];
        assert_eq!(pgdip.locations, vec![Location::new("Singleton Campus")]);
        assert_eq!(pgdip.start_dates, vec![Date::new("Jan 2025")]);
        assert_eq!(pgdip.tuitions.len(), 1);
        assert_eq!(pgdip.tuitions[0].fee.as_deref(), Some("£8,000"));
        assert_eq!(pgdip.tuitions[0].duration.as_deref(), Some("9 Months"));
    }

    #[test]
    fn test_cached_default_application_dates_are_used_verbatim() {
        let site = SiteRules::from_json(RULES).unwrap();
        let cache = ReferenceCache::new();
        cache.populate_default_application_dates(vec![Date::new("1 August 2024")]);

        let report = CourseAssembler::new(&site, &cache).assemble(&page());
        for course in &report.courses {
            assert_eq!(course.application_dates, vec![Date::new("1 August 2024")]);
        }
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let site = SiteRules::from_json(RULES).unwrap();
        let cache = ReferenceCache::new();
        let page = page();
        let assembler = CourseAssembler::new(&site, &cache);

        let first = serde_json::to_string(&assembler.assemble(&page).courses).unwrap();
        let second = serde_json::to_string(&assembler.assemble(&page).courses).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_listing_hint_takes_precedence() {
        let site = SiteRules::from_json(RULES).unwrap();
        let cache = ReferenceCache::new();
        let request = CourseRequest::new("https://example.ac.uk/data-science").with_qualification("MSc");
        let page = CoursePage::parse(PAGE, request);

        let report = CourseAssembler::new(&site, &cache).assemble(&page);
        assert_eq!(report.courses.len(), 1);
        // Single qualification: no disambiguation, so both campuses apply
        assert_eq!(
            report.courses[0].locations,
            vec![Location::new("Bay Campus"), Location::new("Singleton Campus")]
        );
    }

    #[test]
    fn test_unrecognised_and_invalid_pages() {
        let site = SiteRules::from_json(RULES).unwrap();
        let cache = ReferenceCache::new();
        let bare = CoursePage::parse(
            "<h1 class='course-title'>Certificate in Welsh</h1>",
            CourseRequest::new("https://example.ac.uk/welsh"),
        );
        let report = CourseAssembler::new(&site, &cache).assemble(&bare);
        assert!(report.courses.is_empty());
        assert_eq!(report.dropped, 0);

        let nameless = SiteRules::from_json(&RULES.replace("Demo University", " ")).unwrap();
        let report = CourseAssembler::new(&nameless, &cache).assemble(&page());
        assert!(report.courses.is_empty());
        assert_eq!(report.dropped, 2);
    }
}
