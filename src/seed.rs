//! Seed catalog: every `(page, section, block_key)` the site expects, with
//! its default copy. The same table backs the page resolver's defaults.

use serde_json::{json, Value};

use crate::blocks::BlockType;
use crate::db::models::NewContentBlock;
use crate::store::{Store, StoreResult};

fn block(
    page: &str,
    section: &str,
    block_type: BlockType,
    block_key: &str,
    sort_order: i32,
    content: Value,
) -> NewContentBlock {
    NewContentBlock {
        page: page.to_string(),
        section: section.to_string(),
        block_type,
        block_key: block_key.to_string(),
        content,
        sort_order,
    }
}

fn text(page: &str, section: &str, block_key: &str, sort_order: i32, copy: &str) -> NewContentBlock {
    block(page, section, BlockType::Text, block_key, sort_order, json!({ "text": copy }))
}

fn global() -> Vec<NewContentBlock> {
    use BlockType::*;
    let p = "global";
    vec![
        block(p, "header", BrandName, "brand", 1, json!({
            "name": "ESHRM",
            "tagline": "Excellence in Strategic HR Management",
            "logo": "/images/logo.svg"
        })),
        block(p, "header", Navigation, "main_nav", 2, json!({
            "items": [
                { "label": "Home", "href": "/" },
                { "label": "About", "href": "/about" },
                { "label": "Services", "href": "/services" },
                { "label": "Case Studies", "href": "/case-studies" },
                { "label": "Insights", "href": "/insights" },
                { "label": "Contact", "href": "/contact" }
            ]
        })),
        block(p, "header", CtaButtons, "header_cta", 3, json!({
            "primary": { "text": "Book a Consultation", "url": "/booking", "variant": "primary" }
        })),
        block(p, "footer", BrandName, "brand", 1, json!({
            "name": "ESHRM",
            "tagline": "Strategic HR partners for growing African organisations"
        })),
        text(p, "footer", "description", 2,
            "We help organisations build high-performing teams through people strategy, compliance and leadership development."),
        block(p, "footer", Links, "quick_links", 3, json!({
            "title": "Quick Links",
            "links": [
                { "label": "About Us", "href": "/about" },
                { "label": "Case Studies", "href": "/case-studies" },
                { "label": "Insights", "href": "/insights" },
                { "label": "Contact", "href": "/contact" }
            ]
        })),
        block(p, "footer", Links, "service_links", 4, json!({
            "title": "Services",
            "links": [
                { "label": "HR Strategy", "href": "/services/hr-strategy" },
                { "label": "Talent Acquisition", "href": "/services/talent-acquisition" },
                { "label": "Payroll & Compliance", "href": "/services/payroll-compliance" },
                { "label": "Training & Development", "href": "/services/training-development" }
            ]
        })),
        block(p, "footer", ContactInfo, "contact", 5, json!({
            "email": "info@eshrm.africa",
            "phone": "+234 800 000 0000",
            "address": "Victoria Island, Lagos, Nigeria",
            "hours": "Mon - Fri, 8:00 - 17:00"
        })),
        block(p, "footer", SocialLinks, "social", 6, json!({
            "linkedin": "https://www.linkedin.com/company/eshrm",
            "twitter": "https://twitter.com/eshrm",
            "facebook": "https://www.facebook.com/eshrm",
            "instagram": "https://www.instagram.com/eshrm"
        })),
        text(p, "footer", "copyright", 7, "© ESHRM. All rights reserved."),
    ]
}

fn home() -> Vec<NewContentBlock> {
    use BlockType::*;
    let p = "home";
    vec![
        text(p, "hero", "title", 1, "Transforming Workplaces Across Africa"),
        text(p, "hero", "subtitle", 2,
            "Strategic HR consulting that aligns your people with your business goals."),
        block(p, "hero", CtaButtons, "cta", 3, json!({
            "primary": { "text": "Book a Consultation", "url": "/booking", "variant": "primary" },
            "secondary": { "text": "Our Services", "url": "/services", "variant": "outline" }
        })),
        block(p, "hero", Image, "image", 4, json!({
            "url": "/images/hero.jpg",
            "alt": "HR consultants in a strategy session"
        })),
        block(p, "trust", TrustIndicators, "indicators", 1, json!({
            "title": "Trusted by leading organisations",
            "indicators": ["SHRM certified consultants", "15+ years of experience", "Pan-African delivery"]
        })),
        block(p, "stats", StatsItem, "clients", 1, json!({ "value": "250", "suffix": "+", "label": "Clients served" })),
        block(p, "stats", StatsItem, "years", 2, json!({ "value": "15", "suffix": "+", "label": "Years of experience" })),
        block(p, "stats", StatsItem, "countries", 3, json!({ "value": "12", "label": "Countries" })),
        block(p, "stats", StatsItem, "satisfaction", 4, json!({ "value": "98", "suffix": "%", "label": "Client satisfaction" })),
        text(p, "services", "title", 1, "What We Do"),
        block(p, "services", ServicesList, "list", 2, json!({
            "title": "Core services",
            "services": ["HR Strategy & Advisory", "Talent Acquisition", "Payroll & Compliance", "Training & Development", "Performance Management"]
        })),
        text(p, "testimonials", "title", 1, "What Our Clients Say"),
        block(p, "testimonials", Testimonial, "testimonial_1", 2, json!({
            "quote": "ESHRM rebuilt our performance framework in three months. Engagement scores are up across every department.",
            "author": "Ngozi Adeyemi",
            "title": "Head of People",
            "company": "Sahel Logistics",
            "rating": 5
        })),
        block(p, "testimonials", Testimonial, "testimonial_2", 3, json!({
            "quote": "Their payroll compliance review saved us from costly penalties.",
            "author": "David Mensah",
            "title": "Finance Director",
            "company": "Gold Coast Foods",
            "rating": 5
        })),
        text(p, "clients", "title", 1, "Our Clients"),
        block(p, "clients", Client, "client_1", 2, json!({ "name": "Sahel Logistics", "logo": "/images/clients/sahel.png" })),
        block(p, "clients", Client, "client_2", 3, json!({ "name": "Gold Coast Foods", "logo": "/images/clients/goldcoast.png" })),
        block(p, "clients", Client, "client_3", 4, json!({ "name": "Kilimanjaro Bank", "logo": "/images/clients/kilimanjaro.png" })),
        text(p, "process", "title", 1, "How We Work"),
        block(p, "process", ProcessStep, "discover", 2, json!({ "step": 1, "title": "Discover", "description": "We assess your current people practices and business goals." })),
        block(p, "process", ProcessStep, "design", 3, json!({ "step": 2, "title": "Design", "description": "We design HR solutions tailored to your organisation." })),
        block(p, "process", ProcessStep, "deliver", 4, json!({ "step": 3, "title": "Deliver", "description": "We implement alongside your team with clear milestones." })),
        block(p, "process", ProcessStep, "sustain", 5, json!({ "step": 4, "title": "Sustain", "description": "We measure outcomes and refine for lasting impact." })),
        block(p, "africa", AfricaFocus, "focus", 1, json!({
            "title": "Built for Africa",
            "description": "We understand the labour laws, cultures and talent markets of the countries we serve.",
            "image": "/images/africa-map.svg"
        })),
        text(p, "cta", "title", 1, "Ready to transform your workplace?"),
        block(p, "cta", Button, "button", 2, json!({ "text": "Get in touch", "url": "/contact", "variant": "primary" })),
    ]
}

fn about() -> Vec<NewContentBlock> {
    use BlockType::*;
    let p = "about";
    vec![
        text(p, "hero", "title", 1, "About ESHRM"),
        text(p, "hero", "subtitle", 2, "People-first HR consulting with a pan-African outlook."),
        text(p, "story", "title", 1, "Our Story"),
        text(p, "story", "content", 2,
            "Founded by HR practitioners, ESHRM partners with organisations to turn people strategy into measurable business results."),
        block(p, "story", Image, "image", 3, json!({ "url": "/images/about-team.jpg", "alt": "The ESHRM team" })),
        text(p, "mission", "mission", 1, "To empower organisations to attract, develop and retain exceptional talent."),
        text(p, "mission", "vision", 2, "To be Africa's most trusted partner in strategic human resource management."),
        text(p, "values", "title", 1, "Our Values"),
        block(p, "values", Feature, "excellence", 2, json!({ "title": "Excellence", "description": "We hold our work to the highest professional standards.", "icon": "award" })),
        block(p, "values", Feature, "integrity", 3, json!({ "title": "Integrity", "description": "We act honestly and keep our clients' trust.", "icon": "shield" })),
        block(p, "values", Feature, "innovation", 4, json!({ "title": "Innovation", "description": "We bring modern HR practice to every engagement.", "icon": "lightbulb" })),
        block(p, "values", Feature, "collaboration", 5, json!({ "title": "Collaboration", "description": "We work as one team with the people we serve.", "icon": "users" })),
        text(p, "team", "title", 1, "Leadership Team"),
        block(p, "team", TeamMember, "team_member_1", 2, json!({
            "name": "Esther Okafor",
            "role": "Managing Partner",
            "bio": "Two decades leading HR transformation in financial services.",
            "image": "/images/team/esther.jpg",
            "expertise_areas": ["HR Strategy", "Organisational Design"]
        })),
        block(p, "team", TeamMember, "team_member_2", 3, json!({
            "name": "Kwame Asante",
            "role": "Director, Talent",
            "bio": "Builds recruitment and assessment programmes for high-growth firms.",
            "image": "/images/team/kwame.jpg",
            "expertise_areas": ["Talent Acquisition", "Assessment Centres"]
        })),
        block(p, "team", TeamMember, "team_member_3", 4, json!({
            "name": "Fatima Bello",
            "role": "Head of Compliance",
            "bio": "Specialist in labour law, payroll and statutory compliance.",
            "image": "/images/team/fatima.jpg",
            "expertise_areas": ["Labour Law", "Payroll"]
        })),
        text(p, "why_choose_us", "title", 1, "Why Choose Us"),
        block(p, "why_choose_us", Reason, "local_expertise", 2, json!({ "title": "Local expertise", "description": "Consultants on the ground in every market we serve." })),
        block(p, "why_choose_us", Reason, "proven_results", 3, json!({ "title": "Proven results", "description": "Engagements measured against agreed business outcomes." })),
        block(p, "why_choose_us", Reason, "tailored", 4, json!({ "title": "Tailored solutions", "description": "No templates: every programme fits your organisation." })),
    ]
}

fn contact() -> Vec<NewContentBlock> {
    use BlockType::*;
    let p = "contact";
    vec![
        text(p, "hero", "title", 1, "Contact Us"),
        text(p, "hero", "subtitle", 2, "Tell us about your HR challenges and we will get back to you within one business day."),
        block(p, "details", ContactDetail, "email", 1, json!({ "label": "Email", "value": "info@eshrm.africa", "icon": "mail", "link": "mailto:info@eshrm.africa" })),
        block(p, "details", ContactDetail, "phone", 2, json!({ "label": "Phone", "value": "+234 800 000 0000", "icon": "phone", "link": "tel:+2348000000000" })),
        block(p, "details", ContactDetail, "address", 3, json!({ "label": "Office", "value": "Victoria Island, Lagos, Nigeria", "icon": "map-pin" })),
        block(p, "details", ContactDetail, "hours", 4, json!({ "label": "Hours", "value": "Mon - Fri, 8:00 - 17:00", "icon": "clock" })),
        text(p, "faq", "title", 1, "Frequently Asked Questions"),
        block(p, "faq", Faq, "engagement", 2, json!({ "question": "How does an engagement start?", "answer": "With a free consultation to understand your goals." })),
        block(p, "faq", Faq, "countries", 3, json!({ "question": "Which countries do you cover?", "answer": "We deliver across West, East and Southern Africa." })),
        block(p, "faq", Faq, "size", 4, json!({ "question": "Do you work with small businesses?", "answer": "Yes, we scale our services to organisations of every size." })),
    ]
}

fn services() -> Vec<NewContentBlock> {
    use BlockType::*;
    let p = "services";
    vec![
        text(p, "hero", "title", 1, "Our Services"),
        text(p, "hero", "subtitle", 2, "End-to-end HR solutions for every stage of growth."),
        block(p, "categories", Categories, "list", 1, json!({
            "title": "Browse by area",
            "categories": ["Strategy", "Talent", "Compliance", "Learning"]
        })),
        block(p, "cta", Contact, "contact", 1, json!({
            "title": "Not sure where to start?",
            "description": "Speak to a consultant about the right service for your team.",
            "email": "info@eshrm.africa",
            "phone": "+234 800 000 0000"
        })),
    ]
}

fn case_studies() -> Vec<NewContentBlock> {
    use BlockType::*;
    let p = "case-studies";
    vec![
        text(p, "hero", "title", 1, "Case Studies"),
        text(p, "hero", "subtitle", 2, "Real results for organisations across Africa."),
        block(p, "featured", CaseStudy, "logistics_performance", 1, json!({
            "title": "Rebuilding performance management",
            "client": "Sahel Logistics",
            "industry": "Logistics",
            "summary": "A new performance framework rolled out to 1,200 staff.",
            "results": ["32% rise in engagement", "Review cycle cut from 8 to 3 weeks"]
        })),
        block(p, "featured", CaseStudy, "bank_compliance", 2, json!({
            "title": "Payroll compliance overhaul",
            "client": "Kilimanjaro Bank",
            "industry": "Financial services",
            "summary": "Statutory payroll audit and remediation across four countries.",
            "results": ["Zero compliance findings in the next audit"]
        })),
    ]
}

fn insights() -> Vec<NewContentBlock> {
    use BlockType::*;
    let p = "insights";
    vec![
        text(p, "hero", "title", 1, "Insights"),
        text(p, "hero", "subtitle", 2, "Perspectives on people strategy, leadership and the future of work."),
        block(p, "categories", Categories, "list", 1, json!({
            "categories": ["Leadership", "Compliance", "Talent", "Culture"]
        })),
    ]
}

/// Every seeded block, in page order
pub fn catalog() -> Vec<NewContentBlock> {
    [global(), home(), about(), contact(), services(), case_studies(), insights()]
        .into_iter()
        .flatten()
        .collect()
}

/// Seeded blocks for one page, used as rendering defaults
pub fn defaults_for(page: &str) -> Vec<NewContentBlock> {
    catalog().into_iter().filter(|b| b.page == page).collect()
}

/// Upsert the whole catalog. Safe to run repeatedly.
pub async fn seed(store: &Store) -> StoreResult<usize> {
    let blocks = catalog();
    let count = blocks.len();
    for block in blocks {
        store.content.upsert(block).await?;
    }
    tracing::info!(blocks = count, backend = store.backend_name(), "Content blocks seeded");
    Ok(count)
}
