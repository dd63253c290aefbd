//! # Views
//!
//! Askama templates and the flat view models they render. Domain values are
//! converted here so templates only deal with strings, numbers and flags.

use askama::Template;
use domains::form::DATE_FORMAT;
use domains::{Advert, Application, Field, FieldError, Page};
use services::AdvertForm;

const DISPLAY_DATE: &str = "%Y-%m-%d %H:%M";
const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct ImageView {
    pub url: String,
    pub alt: String,
}

#[derive(Debug, Clone)]
pub struct AdvertCard {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub date: String,
    pub content: String,
    pub excerpt: String,
    pub published: bool,
    pub image: Option<ImageView>,
    pub categories: Vec<String>,
    pub application_count: u32,
    pub slug: String,
    pub updated_at: Option<String>,
}

impl AdvertCard {
    pub fn from_advert(advert: &Advert) -> Self {
        let content = advert.content().to_string();
        let mut excerpt: String = content.chars().take(EXCERPT_CHARS).collect();
        if excerpt.len() < content.len() {
            excerpt.push('…');
        }
        Self {
            id: advert.id().map(|id| id.get()).unwrap_or_default(),
            title: advert.title().to_string(),
            author: advert.author().to_string(),
            date: advert.date().format(DISPLAY_DATE).to_string(),
            content,
            excerpt,
            published: advert.published(),
            image: advert.image().map(|image| ImageView {
                url: image.url.clone(),
                alt: image.alt.clone(),
            }),
            categories: advert.categories().iter().map(|c| c.name.clone()).collect(),
            application_count: advert.application_count(),
            slug: advert.slug().to_string(),
            updated_at: advert
                .updated_at()
                .map(|at| at.format(DISPLAY_DATE).to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageLink {
    pub number: u64,
    pub current: bool,
}

#[derive(Debug, Clone)]
pub struct ApplicationView {
    pub id: String,
    pub author: String,
    pub content: String,
}

impl ApplicationView {
    pub fn from_application(application: &Application) -> Self {
        Self {
            id: application.id().to_string(),
            author: application.author().to_string(),
            content: application.content().to_string(),
        }
    }
}

/// Values and messages of the application form on the advert page.
#[derive(Debug, Clone, Default)]
pub struct ApplicationFormView {
    pub author: String,
    pub content: String,
    pub author_errors: Vec<String>,
    pub content_errors: Vec<String>,
}

impl ApplicationFormView {
    pub fn rejected(author: &str, content: &str, errors: &[FieldError]) -> Self {
        Self {
            author: author.to_string(),
            content: content.to_string(),
            author_errors: messages_for(errors, Field::Author),
            content_errors: messages_for(errors, Field::Content),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryChoice {
    pub id: i64,
    pub name: String,
    pub selected: bool,
}

fn messages_for(errors: &[FieldError], field: Field) -> Vec<String> {
    errors
        .iter()
        .filter(|e| e.field == field)
        .map(|e| e.message.clone())
        .collect()
}

/// The add/edit form, flattened.
#[derive(Debug, Clone)]
pub struct AdvertFormView {
    pub date: String,
    pub title: String,
    pub author: String,
    pub content: String,
    pub show_published: bool,
    pub published: bool,
    pub image_url: String,
    pub image_alt: String,
    pub categories: Vec<CategoryChoice>,
    pub date_errors: Vec<String>,
    pub title_errors: Vec<String>,
    pub author_errors: Vec<String>,
    pub content_errors: Vec<String>,
    pub published_errors: Vec<String>,
    pub image_errors: Vec<String>,
    pub category_errors: Vec<String>,
}

impl AdvertFormView {
    pub fn from_form(form: &AdvertForm) -> Self {
        let values = &form.values;
        let errors = &form.errors;
        Self {
            date: values
                .date
                .clone()
                .unwrap_or_else(|| chrono::Utc::now().format(DATE_FORMAT).to_string()),
            title: values.title.clone(),
            author: values.author.clone(),
            content: values.content.clone(),
            show_published: form.shows(Field::Published),
            published: values.published,
            image_url: values.image_url.clone(),
            image_alt: values.image_alt.clone(),
            categories: form
                .choices
                .iter()
                .filter_map(|c| {
                    c.id.map(|id| CategoryChoice {
                        id: id.get(),
                        name: c.name.clone(),
                        selected: values.selects(Some(id)),
                    })
                })
                .collect(),
            date_errors: messages_for(errors, Field::Date),
            title_errors: messages_for(errors, Field::Title),
            author_errors: messages_for(errors, Field::Author),
            content_errors: messages_for(errors, Field::Content),
            published_errors: messages_for(errors, Field::Published),
            image_errors: messages_for(errors, Field::Image),
            category_errors: messages_for(errors, Field::Categories),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub adverts: Vec<AdvertCard>,
    pub pages: Vec<PageLink>,
    pub signed_in: Option<String>,
}

impl IndexTemplate {
    pub fn new(page: &Page<Advert>, signed_in: Option<String>) -> Self {
        Self {
            adverts: page.items.iter().map(AdvertCard::from_advert).collect(),
            pages: (1..=page.total_pages)
                .map(|number| PageLink {
                    number,
                    current: number == page.page,
                })
                .collect(),
            signed_in,
        }
    }
}

#[derive(Template)]
#[template(path = "view.html")]
pub struct ViewTemplate {
    pub advert: AdvertCard,
    pub applications: Vec<ApplicationView>,
    pub application_form: ApplicationFormView,
    pub signed_in: Option<String>,
}

#[derive(Template)]
#[template(path = "form.html")]
pub struct FormTemplate {
    pub heading: String,
    pub action: String,
    pub form: AdvertFormView,
    pub signed_in: Option<String>,
}

#[derive(Template)]
#[template(path = "delete.html")]
pub struct DeleteTemplate {
    pub advert: AdvertCard,
    pub signed_in: Option<String>,
}

#[derive(Template)]
#[template(path = "menu.html")]
pub struct MenuTemplate {
    pub adverts: Vec<AdvertCard>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub heading: String,
    pub message: String,
    pub signed_in: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{AdvertId, Category, CategoryId, Image, Pagination};
    use std::collections::BTreeSet;

    fn advert() -> Advert {
        let mut advert = Advert::new();
        advert.assign_id(AdvertId(4));
        advert.set_title("Recherche développeur <Rust>");
        advert.set_author("Alexandre");
        advert.set_content("Poste à Lyon.");
        advert.set_image(Some(Image::new("http://example.com/a.png", "Logo")));
        advert.add_category(Category {
            id: Some(CategoryId(1)),
            name: "Réseau".into(),
        });
        advert
    }

    #[test]
    fn index_escapes_and_links_pages() {
        let pagination = Pagination::resolve(2, 1, 3).unwrap();
        let page = Page::new(vec![advert()], &pagination);
        let html = IndexTemplate::new(&page, None).render().unwrap();

        assert!(html.contains("Recherche développeur"));
        assert!(!html.contains("<Rust>"));
        assert!(html.contains("href=\"/advert/view/4\""));
        assert!(html.contains("href=\"/advert/3\""));
        assert!(html.contains("Réseau"));
    }

    #[test]
    fn form_hides_published_when_not_editable() {
        let mut fields: BTreeSet<Field> = domains::form::editable_fields(None);
        fields.remove(&Field::Published);
        let form = AdvertForm {
            advert_id: Some(AdvertId(4)),
            fields,
            values: domains::form::AdvertSubmission::from_advert(&advert()),
            errors: vec![FieldError::new(Field::Title, "Trop court")],
            choices: vec![Category {
                id: Some(CategoryId(1)),
                name: "Réseau".into(),
            }],
        };
        let view = AdvertFormView::from_form(&form);
        assert!(!view.show_published);
        assert_eq!(view.title_errors, vec!["Trop court".to_string()]);
        assert!(view.categories[0].selected);

        let html = FormTemplate {
            heading: "Edit advert".into(),
            action: "/advert/edit/4".into(),
            form: view,
            signed_in: Some("alexandre".into()),
        }
        .render()
        .unwrap();
        assert!(!html.contains("name=\"published\""));
        assert!(html.contains("Trop court"));
    }

    #[test]
    fn long_content_is_shortened_on_cards() {
        let mut long = advert();
        long.set_content("x".repeat(500));
        let card = AdvertCard::from_advert(&long);
        assert_eq!(card.excerpt.chars().count(), EXCERPT_CHARS + 1);
    }
}
